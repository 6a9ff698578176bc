// External crates
use clap::Parser;
use dockman_core::{dm_error, DockError};
use tracing::info;

// Local modules
mod cli;
mod commands;
mod output;

use cli::Args;
use commands::execute_command;

#[tokio::main]
async fn main() {
    let log_guard = dockman_logging::init_subscriber();
    let args = Args::parse();
    info!("Starting dockman {:?}", args.command);

    if let Err(e) = execute_command(args).await {
        match e.downcast_ref::<DockError>() {
            Some(dock_error) => {
                dm_error!("{}", dock_error.user_friendly());
            }
            None => {
                dm_error!("{:#}", e);
            }
        }
        // Flush buffered log lines before exiting
        drop(log_guard);
        std::process::exit(1);
    }
}
