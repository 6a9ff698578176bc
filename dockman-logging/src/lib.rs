//! Tracing subscriber setup for the DockMan binary.
//!
//! Configured entirely from the environment:
//!
//! - `LOG_LEVEL`: default filter when `RUST_LOG` is unset (`info`)
//! - `LOG_OUTPUT`: `console`, `file` or `both` (`file`)
//! - `LOG_FORMAT`: `human` or `json` (`human`)
//! - `LOG_FILE_PATH`: log file, rolled daily (`~/.dockman/dockman.log`)

use std::{
    env,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::MakeWriter, prelude::*, registry, EnvFilter};

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    File,
    Both,
    Off,
}

impl LogOutput {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "console" => LogOutput::Console,
            "both" => LogOutput::Both,
            "off" | "none" => LogOutput::Off,
            _ => LogOutput::File,
        }
    }

    fn console(&self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }

    fn file(&self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

/// Logging settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub output: LogOutput,
    pub json: bool,
    pub file_path: PathBuf,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let output = LogOutput::parse(&lookup("LOG_OUTPUT").unwrap_or_else(|| "file".to_string()));
        let json = lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));
        let file_path = lookup("LOG_FILE_PATH")
            .map(PathBuf::from)
            .or_else(|| dockman_core::user_paths::log_file_path().ok())
            .unwrap_or_else(|| PathBuf::from("dockman.log"));

        Self {
            level,
            output,
            json,
            file_path,
        }
    }
}

// Writes every line to both sinks; used when LOG_OUTPUT=both.
struct Tee<A, B> {
    a: A,
    b: B,
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let res_a = self.a.write(buf);
        let res_b = self.b.write(buf);
        res_a.or(res_b)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.a.flush()?;
        self.b.flush()
    }
}

#[derive(Clone)]
struct MakeTee<A, B> {
    make_a: A,
    make_b: B,
}

impl<'a, A, B> MakeWriter<'a> for MakeTee<A, B>
where
    A: MakeWriter<'a>,
    B: MakeWriter<'a>,
{
    type Writer = Tee<A::Writer, B::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        Tee {
            a: self.make_a.make_writer(),
            b: self.make_b.make_writer(),
        }
    }
}

fn env_filter(level: &str) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    for directive in ["tokio=warn", "duct=warn"] {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }
    filter
}

fn file_writer(path: &Path) -> (tracing_appender::non_blocking::NonBlocking, WorkerGuard) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().unwrap_or("dockman.log".as_ref());
    let _ = std::fs::create_dir_all(dir);
    tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file_name))
}

/// Initializes the global tracing subscriber based on environment variables.
///
/// Returns the file writer guard when logging to a file; the caller must keep
/// it alive for buffered lines to be flushed. Calling this twice is harmless.
pub fn init_subscriber() -> Option<WorkerGuard> {
    let settings = LogSettings::from_env();
    let subscriber = registry().with(env_filter(&settings.level));
    let mut guard = None;

    let result = match (settings.output.console(), settings.output.file()) {
        (true, true) => {
            let (non_blocking, g) = file_writer(&settings.file_path);
            guard = Some(g);
            let writer = MakeTee {
                make_a: io::stderr,
                make_b: non_blocking,
            };
            let layer = tracing_subscriber::fmt::layer().with_writer(writer);
            if settings.json {
                subscriber.with(layer.json()).try_init()
            } else {
                subscriber.with(layer).try_init()
            }
        }
        (true, false) => {
            let layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);
            if settings.json {
                subscriber.with(layer.json()).try_init()
            } else {
                subscriber.with(layer).try_init()
            }
        }
        (false, true) => {
            let (non_blocking, g) = file_writer(&settings.file_path);
            guard = Some(g);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking);
            if settings.json {
                subscriber.with(layer.json()).try_init()
            } else {
                subscriber.with(layer).try_init()
            }
        }
        (false, false) => subscriber.try_init(),
    };

    if let Err(e) = result {
        tracing::debug!("Tracing subscriber already installed: {}", e);
    }

    guard
}
