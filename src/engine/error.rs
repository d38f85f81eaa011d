//! Step failure types

use crate::adapters::AdapterError;

/// Why a step failed. The display text becomes the step's error message.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Command exited with code {0}")]
    CommandFailed(i32),

    #[error("Command terminated by signal")]
    CommandTerminated,

    #[error("Failed to execute command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Adapter \"{0}\" not found")]
    AdapterNotFound(String),

    #[error("Action \"{action}\" not found in adapter \"{adapter}\"")]
    ActionNotFound { adapter: String, action: String },

    #[error(transparent)]
    Action(#[from] AdapterError),
}
