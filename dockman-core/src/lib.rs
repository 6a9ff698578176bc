pub mod command;
pub mod error;
pub mod kind;
pub mod output_macros;
pub mod user_paths;
pub mod validation;

// Re-export the pieces every other crate reaches for
pub use command::{CommandOutput, CommandRunner, DockerCli, DockerCommand};
pub use error::{DockError, ParseError, Result, ValidationError};
pub use kind::ResourceKind;
pub use validation::{is_valid_identifier, validate_identifier, validate_name};
