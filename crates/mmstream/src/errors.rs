pub type StreamResult<T> = Result<T, StreamError>;

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Bad path or mode string.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation needs a capability the stream was not opened with.
    #[error("operation not permitted on a stream opened with {0} access")]
    PermissionDenied(crate::enums::Access),

    /// The platform cannot report a usable page size.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// A size or offset does not fit in a signed 64-bit file offset.
    #[error("file too large")]
    FileTooLarge,

    /// A seek target resolved outside `0..=end`.
    #[error("position {position} out of range (end={end})")]
    OutOfRange { position: i128, end: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// The closest `std::io::ErrorKind` for this error.
    #[must_use]
    pub fn kind(&self) -> std::io::ErrorKind {
        match self {
            StreamError::InvalidArgument(_) | StreamError::OutOfRange { .. } => {
                std::io::ErrorKind::InvalidInput
            }
            StreamError::PermissionDenied(_) => std::io::ErrorKind::PermissionDenied,
            StreamError::Unsupported(_) => std::io::ErrorKind::Unsupported,
            StreamError::FileTooLarge => std::io::ErrorKind::FileTooLarge,
            StreamError::Io(e) => e.kind(),
        }
    }
}

impl From<StreamError> for std::io::Error {
    fn from(value: StreamError) -> Self {
        match value {
            StreamError::Io(e) => e,
            other => std::io::Error::new(other.kind(), other),
        }
    }
}
