//! Error types
//!
//! Every failure the engine can hit is a typed value whose `Display` text is
//! what gets reported back to the user. Nothing here is ever raised past
//! [`crate::engine::run`].

use crate::permissions::PermissionLevel;

/// Errors surfaced while executing a command
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("You need {required} permissions to use `{name}`")]
    PermissionDenied {
        name: String,
        required: PermissionLevel,
    },

    #[error("Command `{0}` is not available on this platform")]
    UnsupportedPlatform(String),

    #[error("Command `{0}` cannot be used as a subcommand")]
    NotSubcommand(String),

    #[error("Subcommands nested deeper than {0} levels")]
    DepthExceeded(usize),

    #[error("Command `{name}` took too long to execute (limit: {seconds}s)")]
    Timeout { name: String, seconds: u64 },

    #[error("Usage: {0}")]
    Usage(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Process failed: {0}")]
    Process(String),

    #[error("Failed to deliver message: {0}")]
    Delivery(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Markov(#[from] MarkovError),
}

impl CommandError {
    /// Usage error from a syntax string
    pub fn usage(syntax: impl Into<String>) -> Self {
        Self::Usage(syntax.into())
    }

    /// Invalid argument error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Errors from registry mutations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Command `{0}` already exists")]
    AlreadyExists(String),

    #[error("Command `{0}` does not exist")]
    NotFound(String),

    #[error("Command `{0}` is built in and cannot be changed")]
    NativeImmutable(String),

    #[error("Invalid command name: {0:?}")]
    InvalidName(String),
}

/// Errors from Markov model queries
#[derive(Debug, thiserror::Error)]
pub enum MarkovError {
    #[error("Invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Result type for command execution
pub type CommandResult<T> = std::result::Result<T, CommandError>;
