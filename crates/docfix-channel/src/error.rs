//! Error types for the remote script channel.

/// Errors produced by [`RemoteScriptChannel`](crate::RemoteScriptChannel).
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel is not connected")]
    NotConnected,

    #[error("connect to {target} failed: {reason}")]
    Connect { target: String, reason: String },

    #[error("call {id} timed out after {timeout_ms}ms")]
    Timeout { id: u64, timeout_ms: u64 },

    #[error("remote error: {message}")]
    Remote { message: String },

    #[error("channel closed before call {id} resolved")]
    Closed { id: u64 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChannelError {
    /// Whether this error came from a call that never received an answer.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type for channel operations.
pub type ChannelResult<T> = std::result::Result<T, ChannelError>;
