use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

use crate::error::{Result, StreamError};

/// Reference point for [`ByteStream::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl Whence {
    pub const SEEK_SET: i32 = 0;
    pub const SEEK_CUR: i32 = 1;
    pub const SEEK_END: i32 = 2;
}

impl TryFrom<i32> for Whence {
    type Error = StreamError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            Whence::SEEK_SET => Ok(Whence::Start),
            Whence::SEEK_CUR => Ok(Whence::Current),
            Whence::SEEK_END => Ok(Whence::End),
            other => Err(StreamError::InvalidArgument(format!(
                "invalid whence value: {}",
                other
            ))),
        }
    }
}

/// Passing this to [`ByteStream::read`] reads everything up to end-of-stream.
pub const READ_ALL: i64 = -1;

/// File-like random-access byte stream.
///
/// Consumers that only need "something readable and seekable" should depend
/// on this trait rather than on a concrete stream type.
pub trait ByteStream {
    /// Read up to `size` bytes from the current position. A negative `size`
    /// reads all remaining bytes. Returns fewer bytes than requested (possibly
    /// none) at end-of-stream.
    fn read(&mut self, size: i64) -> Result<Vec<u8>>;

    /// Move the position relative to `whence`. Targets past the end clamp to
    /// the end; negative targets are rejected.
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<()>;

    fn tell(&self) -> u64;

    fn seekable(&self) -> bool {
        true
    }

    /// Release held resources. Calling this more than once is a no-op.
    fn close(&mut self);
}

/// Positional byte-source abstraction.
pub trait ByteSource {
    /// Read `buf.len()` bytes starting at `offset` into `buf`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;
}

impl<S: ByteStream> ByteSource for S {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let offset = i64::try_from(offset)
            .map_err(|_| StreamError::InvalidArgument(format!("offset out of range: {}", offset)))?;
        let size = i64::try_from(buf.len())
            .map_err(|_| StreamError::InvalidArgument("buffer too large".to_string()))?;
        self.seek(offset, Whence::Start)?;
        let bytes = self.read(size)?;
        if bytes.len() < buf.len() {
            return Err(StreamError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "short read at offset {}: wanted {} bytes, got {}",
                    offset,
                    buf.len(),
                    bytes.len()
                ),
            )));
        }
        buf.copy_from_slice(&bytes);
        Ok(())
    }
}

/// An open handle onto one backing file.
pub trait SegmentHandle: Read + Seek + Sized {
    fn open_segment(path: &Path) -> io::Result<Self>;
}

impl SegmentHandle for File {
    fn open_segment(path: &Path) -> io::Result<Self> {
        File::open(path)
    }
}
