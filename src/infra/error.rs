//! Error types for CMS recipient and accumulation operations.
//!
//! Four kinds are kept apart:
//! - [`ProtocolError`]: expected protocol failures (bad key, unsupported
//!   algorithm, malformed request).
//! - [`RuntimeProtocolError`]: caller misuse, e.g. consuming single-use
//!   content twice.
//! - [`StreamError`]: a primitive failed while bytes were streamed into it.
//! - [`AttributeGenerationError`]: an attribute table could not be built.
//!
//! [`CmsError`] is the umbrella returned by most operations.

use std::error::Error as StdError;
use std::io;

use thiserror::Error;

/// Boxed underlying cause carried by the error kinds.
pub type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// Result type for CMS operations
pub type CmsResult<T> = Result<T, CmsError>;

/// Checked protocol-level failure.
#[derive(Error, Debug, miette::Diagnostic)]
#[error("{message}")]
pub struct ProtocolError {
    message: String,
    #[source]
    cause: Option<Cause>,
}

impl ProtocolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Programming-error failure, e.g. reusing a single-use content object.
#[derive(Error, Debug, miette::Diagnostic)]
#[error("{message}")]
pub struct RuntimeProtocolError {
    message: String,
    #[source]
    cause: Option<Cause>,
}

impl RuntimeProtocolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure surfaced while streaming bytes through a digest, MAC or
/// signature primitive.
///
/// Carries the primitive's own error as cause. Sinks hand it to the I/O
/// layer through `From<StreamError> for io::Error`.
#[derive(Error, Debug, miette::Diagnostic)]
#[error("{message}")]
pub struct StreamError {
    message: String,
    #[source]
    cause: Option<Cause>,
}

impl StreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Borrow the `StreamError` carried inside an I/O error, if any.
    #[must_use]
    pub fn from_io_ref(error: &io::Error) -> Option<&StreamError> {
        error.get_ref().and_then(|inner| inner.downcast_ref::<StreamError>())
    }
}

impl From<StreamError> for io::Error {
    fn from(error: StreamError) -> Self {
        io::Error::new(io::ErrorKind::Other, error)
    }
}

/// Failure while deriving a signed or unsigned attribute table.
#[derive(Error, Debug, miette::Diagnostic)]
#[error("{message}")]
pub struct AttributeGenerationError {
    message: String,
    #[source]
    cause: Option<Cause>,
}

impl AttributeGenerationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Umbrella error for CMS operations
#[derive(Error, Debug, miette::Diagnostic)]
pub enum CmsError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Misuse(#[from] RuntimeProtocolError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    AttributeGeneration(#[from] AttributeGenerationError),

    #[error("IO error: {0}")]
    Io(#[source] io::Error),
}

impl CmsError {
    /// Shorthand for a [`ProtocolError`] without cause.
    pub fn protocol(message: impl Into<String>) -> Self {
        CmsError::Protocol(ProtocolError::new(message))
    }

    #[must_use]
    pub fn is_misuse(&self) -> bool {
        matches!(self, CmsError::Misuse(_))
    }
}

impl From<io::Error> for CmsError {
    fn from(error: io::Error) -> Self {
        if StreamError::from_io_ref(&error).is_none() {
            return CmsError::Io(error);
        }
        match error.into_inner().map(|inner| inner.downcast::<StreamError>()) {
            Some(Ok(stream)) => CmsError::Stream(*stream),
            // The inner value was checked above; fall back to a plain I/O error
            // carrying the original message if the downcast ever disagrees.
            Some(Err(other)) => CmsError::Io(io::Error::new(io::ErrorKind::Other, other)),
            None => CmsError::Io(io::Error::new(
                io::ErrorKind::Other,
                "stream error without payload",
            )),
        }
    }
}

impl From<der::Error> for CmsError {
    fn from(error: der::Error) -> Self {
        CmsError::Protocol(ProtocolError::with_cause("ASN.1 encoding error", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CmsError::protocol("unsupported key encryption algorithm");
        assert_eq!(error.to_string(), "unsupported key encryption algorithm");

        let error = CmsError::from(RuntimeProtocolError::new("can only be used once"));
        assert_eq!(error.to_string(), "can only be used once");
        assert!(error.is_misuse());
    }

    #[test]
    fn test_cause_is_exposed_through_source() {
        let inner = io::Error::new(io::ErrorKind::InvalidData, "bad block");
        let error = ProtocolError::with_cause("unwrap failed", inner);
        let source = error.source().expect("cause present");
        assert_eq!(source.to_string(), "bad block");

        assert!(ProtocolError::new("no cause").source().is_none());
    }

    #[test]
    fn test_misuse_carries_optional_cause() {
        let inner = io::Error::new(io::ErrorKind::Other, "source already drained");
        let error = RuntimeProtocolError::with_cause("can only be used once", inner);
        assert_eq!(error.message(), "can only be used once");
        assert_eq!(
            error.source().map(ToString::to_string).as_deref(),
            Some("source already drained")
        );
        assert!(RuntimeProtocolError::new("can only be used once").source().is_none());
    }

    #[test]
    fn test_stream_error_survives_io_round_trip() {
        let stream = StreamError::with_cause("signature update failed", "engine finalised");
        let io_error: io::Error = stream.into();
        assert!(StreamError::from_io_ref(&io_error).is_some());

        match CmsError::from(io_error) {
            CmsError::Stream(e) => {
                assert_eq!(e.message(), "signature update failed");
                assert_eq!(e.source().map(ToString::to_string).as_deref(), Some("engine finalised"));
            }
            other => panic!("Expected Stream error, got: {other:?}"),
        }
    }

    #[test]
    fn test_plain_io_error_stays_io() {
        let io_error = io::Error::new(io::ErrorKind::UnexpectedEof, "short read");
        assert!(matches!(CmsError::from(io_error), CmsError::Io(_)));
    }
}
