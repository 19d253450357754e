use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Servo rejected command {msg_id}: {error}")]
    CommandFailed { msg_id: u16, error: String },

    #[error("Tracking loop cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;

// Helper functions for creating errors
impl TrackerError {
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        TrackerError::InvalidConfiguration(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        TrackerError::MalformedMessage(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        TrackerError::Transport(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        TrackerError::Protocol(msg.into())
    }

    /// Whether this error should terminate the tracking loop rather than
    /// just fail the current command cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TrackerError::InvalidConfiguration(_)
                | TrackerError::Transport(_)
                | TrackerError::Io(_)
        )
    }
}
