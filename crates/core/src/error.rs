/// Result alias that carries the custom [`PlayerError`] type.
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// Free-form message for failures that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Serialisation failures for persisted snapshots, configs and wire data.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// A shared singleton lock was poisoned by a panicking holder.
    #[error("{0} has been poisoned")]
    Poisoned(&'static str),
    #[error("audio output: {0}")]
    Output(#[from] OutputError),
    /// The analysis tap could not be attached to the audio output yet.
    #[error("audio analysis graph is unavailable")]
    GraphUnavailable,
}

impl PlayerError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for PlayerError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for PlayerError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

/// Failures reported by an [`AudioOutput`](crate::AudioOutput).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutputError {
    /// The platform refused to start audio without a user gesture.
    #[error("playback blocked by autoplay policy")]
    Blocked,
    /// The stream could not be fetched or decoded.
    #[error("stream failed: {0}")]
    Network(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl OutputError {
    /// Policy rejections are recoverable on the next interaction; everything
    /// else needs the user to reselect the track.
    pub fn is_policy(&self) -> bool {
        matches!(self, Self::Blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_blocked_counts_as_policy() {
        assert!(OutputError::Blocked.is_policy());
        assert!(!OutputError::Network("timeout".into()).is_policy());
        assert!(!OutputError::Unsupported("codec".into()).is_policy());
    }

    #[test]
    fn output_errors_convert_into_player_errors() {
        let err: PlayerError = OutputError::Network("404".into()).into();
        assert_eq!(format!("{err}"), "audio output: stream failed: 404");
    }
}
