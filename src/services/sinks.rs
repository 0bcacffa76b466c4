//! Accumulating byte sinks.
//!
//! Each sink borrows a primitive engine for one streaming pass and forwards
//! every write straight into the engine's update. Nothing is buffered, so
//! content of any size streams through in constant extra memory. Engine
//! failures are reported as [`StreamError`] carried inside `io::Error`.

use std::io::{self, Write};

use crate::adapters::primitives::{DigestEngine, MacEngine, SignatureEngine};
use crate::infra::error::StreamError;

/// Forwards writes into a digest engine.
pub struct DigestSink<'e> {
    engine: &'e mut dyn DigestEngine,
}

impl<'e> DigestSink<'e> {
    pub fn new(engine: &'e mut dyn DigestEngine) -> Self {
        Self { engine }
    }
}

impl Write for DigestSink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.engine
            .update(buf)
            .map_err(|e| StreamError::with_cause("digest update failed", e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Forwards writes into a MAC engine.
pub struct MacSink<'e> {
    engine: &'e mut dyn MacEngine,
}

impl<'e> MacSink<'e> {
    pub fn new(engine: &'e mut dyn MacEngine) -> Self {
        Self { engine }
    }
}

impl Write for MacSink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.engine
            .update(buf)
            .map_err(|e| StreamError::with_cause("MAC update failed", e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Forwards writes into a signature engine.
///
/// An engine in the wrong state (already finalised, never initialised)
/// surfaces as a [`StreamError`] whose source is the engine's error.
pub struct SignatureSink<'e> {
    engine: &'e mut dyn SignatureEngine,
}

impl<'e> SignatureSink<'e> {
    pub fn new(engine: &'e mut dyn SignatureEngine) -> Self {
        Self { engine }
    }
}

impl Write for SignatureSink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.engine
            .update(buf)
            .map_err(|e| StreamError::with_cause("signature update failed", e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Discards everything; never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl Write for NullSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes every chunk to both sinks, first then second.
pub struct TeeSink<A: Write, B: Write> {
    first: A,
    second: B,
}

impl<A: Write, B: Write> TeeSink<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn into_inner(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: Write, B: Write> Write for TeeSink<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        self.second.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::primitives::{OpenSslProvider, PrimitiveError, PrimitiveProvider};
    use crate::domain::crypto::HashAlgorithm;

    struct SpentEngine;

    impl SignatureEngine for SpentEngine {
        fn update(&mut self, _data: &[u8]) -> Result<(), PrimitiveError> {
            Err(PrimitiveError::NotInitialized("signature engine"))
        }
    }

    #[test]
    fn digest_sink_forwards_bytes() {
        let mut engine = OpenSslProvider.digest(HashAlgorithm::Sha256).unwrap();
        let mut sink = DigestSink::new(engine.as_mut());
        sink.write_all(b"ab").unwrap();
        sink.write_all(b"c").unwrap();
        assert_eq!(
            hex::encode(engine.finish().unwrap()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn signature_sink_wraps_state_errors() {
        let mut engine = SpentEngine;
        let mut sink = SignatureSink::new(&mut engine);
        let err = sink.write(b"data").unwrap_err();
        let stream = StreamError::from_io_ref(&err).expect("stream error carried");
        assert_eq!(stream.message(), "signature update failed");
        let cause = std::error::Error::source(stream).expect("cause preserved");
        assert_eq!(cause.to_string(), "signature engine is not initialized");
    }

    #[test]
    fn null_sink_accepts_everything() {
        let mut sink = NullSink;
        assert_eq!(sink.write(&[0u8; 4096]).unwrap(), 4096);
        assert_eq!(sink.write(&[]).unwrap(), 0);
        sink.flush().unwrap();
    }
}
