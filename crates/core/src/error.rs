/// Result alias that carries the custom [`LyricVizError`] type.
pub type Result<T> = std::result::Result<T, LyricVizError>;

/// Common error type for the core crate.
///
/// Malformed cue lines and failed lookups are deliberately absent: the
/// parser skips bad lines and the synchronizer returns `None`, neither of
/// which is an error condition.
#[derive(Debug, thiserror::Error)]
pub enum LyricVizError {
    /// Free-form failure that does not warrant its own variant.
    #[error("{0}")]
    Message(String),
    /// A caller handed a subsystem input outside its documented domain.
    #[error("{0}")]
    InvalidInput(&'static str),
    /// Wrapper around standard IO errors (cue file, config file).
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Forward-transform failure inside the spectrum analyser.
    #[error("{0}")]
    Fft(#[from] realfft::FftError),
    /// Audio capture could not be acquired: permission denied, no input
    /// device, or the stream failed to build or start.
    #[error("audio capture unavailable: {0}")]
    CaptureUnavailable(String),
    /// A platform capability the feature depends on is absent entirely.
    #[error("unsupported capability: {0}")]
    UnsupportedCapability(String),
}

impl LyricVizError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for LyricVizError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for LyricVizError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
