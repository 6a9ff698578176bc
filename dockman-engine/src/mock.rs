//! Scripted command runner for tests.
//!
//! Rules map a command prefix (the argument vector joined with spaces, without
//! the program name) to a canned [`CommandOutput`]. One-shot rules are consumed
//! first in the order they were added; among persistent rules the last match
//! wins. Unmatched commands fail, so a test notices every unexpected call.

use dockman_core::{CommandOutput, CommandRunner, DockerCommand};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Rule {
    prefix: String,
    output: CommandOutput,
    once: bool,
    used: bool,
}

#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, prefix: &str, output: CommandOutput, once: bool) -> Self {
        self.add_rule(prefix, output, once);
        self
    }

    /// Answer every command starting with `prefix`.
    pub fn on(self, prefix: &str, output: CommandOutput) -> Self {
        self.push(prefix, output, false)
    }

    /// Answer the next command starting with `prefix`, once.
    pub fn on_once(self, prefix: &str, output: CommandOutput) -> Self {
        self.push(prefix, output, true)
    }

    /// Fail every command starting with `prefix` with exit code 1.
    pub fn fail(self, prefix: &str, stderr: &str) -> Self {
        self.push(prefix, CommandOutput::failure(prefix, stderr, Some(1)), false)
    }

    /// Sleep this long inside every `run`, to hold a worker busy.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Add a rule after the runner has been shared.
    pub fn add_rule(&self, prefix: &str, output: CommandOutput, once: bool) {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(Rule {
                prefix: prefix.to_string(),
                output,
                once,
                used: false,
            });
        }
    }

    /// Every command run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    fn respond(&self, line: &str) -> Option<CommandOutput> {
        let mut rules = self.rules.lock().ok()?;

        if let Some(rule) = rules
            .iter_mut()
            .find(|r| r.once && !r.used && line.starts_with(&r.prefix))
        {
            rule.used = true;
            return Some(rule.output.clone());
        }

        rules
            .iter()
            .rev()
            .find(|r| !r.once && line.starts_with(&r.prefix))
            .map(|r| r.output.clone())
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &DockerCommand) -> CommandOutput {
        let line = command.argv().join(" ");
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line.clone());
        }
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }

        match self.respond(&line) {
            Some(output) => CommandOutput {
                command: command.render(self.program()),
                ..output
            },
            None => CommandOutput::failure(
                command.render(self.program()),
                format!("no scripted response for '{}'", line),
                Some(127),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_rules_take_precedence_then_expire() {
        let runner = ScriptedRunner::new()
            .on("info", CommandOutput::success("info", "steady"))
            .on_once("info", CommandOutput::success("info", "first"));
        let info = DockerCommand::new().subcommand("info");

        assert_eq!(runner.run(&info).stdout, "first");
        assert_eq!(runner.run(&info).stdout, "steady");
        assert_eq!(runner.calls(), vec!["info", "info"]);
    }

    #[test]
    fn test_unmatched_command_fails() {
        let runner = ScriptedRunner::new();
        let output = runner.run(&DockerCommand::new().subcommand("ps"));
        assert!(!output.ok);
        assert_eq!(output.command, "docker ps");
    }
}
