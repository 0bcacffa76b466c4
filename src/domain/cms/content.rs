//! Message payload abstraction.
//!
//! Content is exposed either by push ([`CmsProcessable::write_to`]) or by
//! pull ([`CmsReadable::input_stream`]). Push-style content may be written
//! any number of times; [`SingleUseContent`] allows exactly one consumption
//! across both paths, even with concurrent callers.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use der::asn1::ObjectIdentifier;

use crate::domain::constants;
use crate::infra::error::{CmsResult, RuntimeProtocolError};

/// Default read buffer for file-backed content.
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Opaque view of the payload a content object wraps.
#[derive(Debug, Clone, Copy)]
pub enum ContentRef<'a> {
    Bytes(&'a [u8]),
    File(&'a Path),
    /// A pull-style source; the bytes are only reachable by consuming it.
    Stream,
    Absent,
}

/// Push-style content.
pub trait CmsProcessable {
    /// Copy the full payload into `sink`, in original byte order.
    fn write_to(&self, sink: &mut dyn Write) -> CmsResult<()>;

    fn content(&self) -> ContentRef<'_>;
}

/// Content that also carries its content-type identifier.
pub trait CmsTypedData: CmsProcessable {
    fn content_type(&self) -> ObjectIdentifier;
}

/// Pull-style content. `None` means there is no payload.
pub trait CmsReadable {
    fn input_stream(&self) -> CmsResult<Option<Box<dyn Read + Send>>>;
}

/// In-memory payload, reusable.
#[derive(Clone, PartialEq, Eq)]
pub struct ProcessableBytes {
    content_type: ObjectIdentifier,
    bytes: Vec<u8>,
}

impl ProcessableBytes {
    /// `id-data` content.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self::with_content_type(constants::ID_DATA, bytes)
    }

    pub fn with_content_type(content_type: ObjectIdentifier, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type,
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for ProcessableBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ProcessableBytes(type={}, len={})",
            self.content_type,
            self.bytes.len()
        )
    }
}

impl CmsProcessable for ProcessableBytes {
    fn write_to(&self, sink: &mut dyn Write) -> CmsResult<()> {
        sink.write_all(&self.bytes)?;
        Ok(())
    }

    fn content(&self) -> ContentRef<'_> {
        ContentRef::Bytes(&self.bytes)
    }
}

impl CmsTypedData for ProcessableBytes {
    fn content_type(&self) -> ObjectIdentifier {
        self.content_type
    }
}

impl CmsReadable for ProcessableBytes {
    fn input_stream(&self) -> CmsResult<Option<Box<dyn Read + Send>>> {
        Ok(Some(Box::new(Cursor::new(self.bytes.clone()))))
    }
}

/// File-backed payload, re-read from disk on every write.
#[derive(Debug, Clone)]
pub struct ProcessableFile {
    content_type: ObjectIdentifier,
    path: PathBuf,
    buffer_size: usize,
}

impl ProcessableFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            content_type: constants::ID_DATA,
            path: path.into(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: ObjectIdentifier) -> Self {
        self.content_type = content_type;
        self
    }

    /// Read buffer size; zero is treated as one byte.
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CmsProcessable for ProcessableFile {
    fn write_to(&self, sink: &mut dyn Write) -> CmsResult<()> {
        let mut file = File::open(&self.path)?;
        let mut buffer = vec![0u8; self.buffer_size];
        loop {
            let read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            sink.write_all(&buffer[..read])?;
        }
        Ok(())
    }

    fn content(&self) -> ContentRef<'_> {
        ContentRef::File(&self.path)
    }
}

impl CmsTypedData for ProcessableFile {
    fn content_type(&self) -> ObjectIdentifier {
        self.content_type
    }
}

impl CmsReadable for ProcessableFile {
    fn input_stream(&self) -> CmsResult<Option<Box<dyn Read + Send>>> {
        let file = File::open(&self.path)?;
        Ok(Some(Box::new(BufReader::with_capacity(self.buffer_size, file))))
    }
}

/// Detached or suppressed content: nothing to write, no stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsentContent {
    content_type: ObjectIdentifier,
}

impl AbsentContent {
    #[must_use]
    pub fn new() -> Self {
        Self {
            content_type: constants::ID_DATA,
        }
    }

    #[must_use]
    pub fn with_content_type(content_type: ObjectIdentifier) -> Self {
        Self { content_type }
    }
}

impl Default for AbsentContent {
    fn default() -> Self {
        Self::new()
    }
}

impl CmsProcessable for AbsentContent {
    fn write_to(&self, _sink: &mut dyn Write) -> CmsResult<()> {
        Ok(())
    }

    fn content(&self) -> ContentRef<'_> {
        ContentRef::Absent
    }
}

impl CmsTypedData for AbsentContent {
    fn content_type(&self) -> ObjectIdentifier {
        self.content_type
    }
}

impl CmsReadable for AbsentContent {
    fn input_stream(&self) -> CmsResult<Option<Box<dyn Read + Send>>> {
        Ok(None)
    }
}

/// Pull-style source that may be consumed exactly once.
///
/// The source is held in a mutex-guarded `Option`; whichever of
/// [`CmsReadable::input_stream`] or [`CmsProcessable::write_to`] takes it
/// first wins, every later call fails with [`RuntimeProtocolError`].
/// `write_to` drops (closes) the source when the copy ends; a caller taking
/// the stream owns it from then on.
pub struct SingleUseContent {
    content_type: ObjectIdentifier,
    source: Mutex<Option<Box<dyn Read + Send>>>,
}

impl SingleUseContent {
    pub fn new(source: impl Read + Send + 'static) -> Self {
        Self::with_content_type(constants::ID_DATA, source)
    }

    pub fn with_content_type(
        content_type: ObjectIdentifier,
        source: impl Read + Send + 'static,
    ) -> Self {
        Self {
            content_type,
            source: Mutex::new(Some(Box::new(source))),
        }
    }

    #[must_use]
    pub fn is_used(&self) -> bool {
        self.source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn take_source(&self) -> Result<Box<dyn Read + Send>, RuntimeProtocolError> {
        let mut guard = self.source.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .take()
            .ok_or_else(|| RuntimeProtocolError::new("can only be used once"))
    }
}

impl fmt::Debug for SingleUseContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SingleUseContent(type={}, used={})",
            self.content_type,
            self.is_used()
        )
    }
}

impl CmsProcessable for SingleUseContent {
    fn write_to(&self, sink: &mut dyn Write) -> CmsResult<()> {
        let mut source = self.take_source()?;
        let copied = io::copy(&mut source, sink);
        drop(source);
        copied?;
        Ok(())
    }

    fn content(&self) -> ContentRef<'_> {
        ContentRef::Stream
    }
}

impl CmsTypedData for SingleUseContent {
    fn content_type(&self) -> ObjectIdentifier {
        self.content_type
    }
}

impl CmsReadable for SingleUseContent {
    fn input_stream(&self) -> CmsResult<Option<Box<dyn Read + Send>>> {
        Ok(Some(self.take_source()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_can_be_written_repeatedly() {
        let content = ProcessableBytes::new(b"hello".to_vec());
        let mut first = Vec::new();
        let mut second = Vec::new();
        content.write_to(&mut first).unwrap();
        content.write_to(&mut second).unwrap();
        assert_eq!(first, b"hello");
        assert_eq!(first, second);
        assert_eq!(content.content_type(), constants::ID_DATA);
    }

    #[test]
    fn absent_content_is_empty() {
        let content = AbsentContent::new();
        let mut sink = Vec::new();
        content.write_to(&mut sink).unwrap();
        assert!(sink.is_empty());
        assert!(content.input_stream().unwrap().is_none());
        assert!(matches!(content.content(), ContentRef::Absent));
    }

    #[test]
    fn single_use_stream_then_write_fails() {
        let content = SingleUseContent::new(Cursor::new(vec![1u8, 2, 3]));
        assert!(!content.is_used());
        let mut stream = content.input_stream().unwrap().expect("stream present");
        let mut read = Vec::new();
        stream.read_to_end(&mut read).unwrap();
        assert_eq!(read, vec![1, 2, 3]);
        assert!(content.is_used());

        let err = content.write_to(&mut Vec::new()).unwrap_err();
        assert!(err.is_misuse());
        assert_eq!(err.to_string(), "can only be used once");
    }

    #[test]
    fn single_use_write_then_stream_fails() {
        let content = SingleUseContent::new(Cursor::new(vec![9u8; 4]));
        let mut sink = Vec::new();
        content.write_to(&mut sink).unwrap();
        assert_eq!(sink, vec![9u8; 4]);
        let err = content.input_stream().err().expect("second consumption must fail");
        assert!(err.is_misuse());
    }
}
