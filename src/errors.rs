use thiserror::Error;

#[derive(Debug, Error)]
pub enum PushError {
    /// The platform cannot carry the push transport (e.g. no WebRTC support)
    #[error("Capability error: {0}")]
    Capability(String),
    #[error("Permission denied error: {0}")]
    PermissionDenied(String),
    /// Some step of the start sequence failed
    #[error("Stream start error: {0}")]
    StreamStart(String),
    #[error("Control channel degraded: {0}")]
    ChannelDegraded(String),
    #[error("Upload error: {0}")]
    Upload(String),
    /// No encoder/decoder surface is available for resizing the image
    #[error("Canvas unsupported error: {0}")]
    CanvasUnsupported(String),
    #[error("Device error: {0}")]
    Device(String),
    #[error("Camera control error: {0}")]
    Control(String),
    #[error("Operation already in progress: {0}")]
    Busy(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by a vendor SDK call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {message}")]
pub struct SdkError {
    pub operation: String,
    pub message: String,
}

impl SdkError {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PushError>;
