use std::cmp::min;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use log::{debug, trace, warn};

use crate::error::{Result, StreamError};
use crate::io::{ByteStream, SegmentHandle, Whence};
use crate::segment::{Location, Segment, SegmentTable};

/// An ordered list of files read as one contiguous, seekable byte stream.
///
/// Only the backing file under the cursor is open at any time. `pos` is the
/// logical offset; `file_offset` is where the open handle sits inside
/// `table[current_index]`.
#[derive(Debug)]
pub struct MultiFileStream<H: SegmentHandle = File> {
    table: SegmentTable,
    current_index: usize,
    handle: Option<H>,
    file_offset: u64,
    pos: u64,
    closed: bool,
}

impl MultiFileStream<File> {
    /// Open `paths` as one stream backed by plain file handles.
    pub fn open<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self::from_paths(paths)
    }
}

impl<H: SegmentHandle> MultiFileStream<H> {
    pub fn from_paths<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self::from_table(SegmentTable::from_paths(paths)?)
    }

    /// Build a stream over an existing table and open its first file.
    pub fn from_table(table: SegmentTable) -> Result<Self> {
        let mut stream = Self {
            table,
            current_index: 0,
            handle: None,
            file_offset: 0,
            pos: 0,
            closed: false,
        };
        stream.switch_to(0, 0)?;
        Ok(stream)
    }

    pub fn total_size(&self) -> u64 {
        self.table.total_size()
    }

    pub fn len(&self) -> u64 {
        self.table.total_size()
    }

    pub fn is_empty(&self) -> bool {
        self.table.total_size() == 0
    }

    pub fn remaining(&self) -> u64 {
        self.table.total_size().saturating_sub(self.pos)
    }

    pub fn segments(&self) -> &[Segment] {
        self.table.segments()
    }

    pub fn table(&self) -> &SegmentTable {
        &self.table
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn tell(&self) -> u64 {
        self.pos
    }

    pub fn seekable(&self) -> bool {
        true
    }

    /// Read up to `size` bytes; a negative `size` reads everything left.
    pub fn read(&mut self, size: i64) -> Result<Vec<u8>> {
        self.ensure_open()?;

        let remaining = self.remaining();
        if size == 0 || remaining == 0 {
            return Ok(Vec::new());
        }

        let wanted = if size < 0 {
            remaining
        } else {
            min(size as u64, remaining)
        };
        let wanted = usize::try_from(wanted).map_err(|_| {
            StreamError::InvalidArgument(format!("read of {} bytes does not fit in memory", wanted))
        })?;

        let mut out = vec![0u8; wanted];
        let (n, outcome) = self.fill(&mut out);
        outcome?;
        out.truncate(n);
        Ok(out)
    }

    /// Fill `buf` from the current position, crossing file boundaries as
    /// needed. Returns the number of bytes written, which is short only at
    /// end-of-stream, when the last file yields less than its recorded size,
    /// or when a later file fails after some bytes were already copied. In
    /// that last case the error is reported by the next call instead.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;

        match self.fill(buf) {
            (0, Err(e)) => Err(e),
            (filled, Err(e)) => {
                debug!("returning {} bytes, deferring error: {}", filled, e);
                Ok(filled)
            }
            (filled, Ok(())) => Ok(filled),
        }
    }

    /// Copy into `buf` until it is full or the stream ends. Always reports
    /// how many bytes were copied (and consumed), even when it stops on an
    /// error.
    fn fill(&mut self, buf: &mut [u8]) -> (usize, Result<()>) {
        let total = self.table.total_size();
        let mut filled = 0usize;

        while filled < buf.len() && self.pos < total {
            let file_size = self.table.segments()[self.current_index].size;
            let left_in_file = file_size.saturating_sub(self.file_offset);
            let outstanding = (buf.len() - filled) as u64;
            let to_read = min(outstanding, left_in_file) as usize;

            let n = if to_read == 0 {
                0
            } else {
                match self.read_handle(&mut buf[filled..filled + to_read]) {
                    Ok(n) => n,
                    Err(e) => return (filled, Err(e)),
                }
            };

            if n == 0 {
                if left_in_file > 0 {
                    warn!(
                        "{} ended {} bytes before its recorded size",
                        self.table.segments()[self.current_index].path.display(),
                        left_in_file
                    );
                }
                if self.current_index + 1 >= self.table.len() {
                    break;
                }
                if let Err(e) = self.switch_to(self.current_index + 1, 0) {
                    return (filled, Err(e));
                }
                continue;
            }

            trace!(
                "read {} bytes from segment {} at logical offset {}",
                n,
                self.current_index,
                self.pos
            );
            filled += n;
            self.pos += n as u64;
            self.file_offset += n as u64;
        }

        (filled, Ok(()))
    }

    /// Seek relative to `whence`. On error the cursor is left untouched.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<()> {
        let base = match whence {
            Whence::Start => 0i128,
            Whence::Current => self.pos as i128,
            Whence::End => self.table.total_size() as i128,
        };
        self.seek_to(base + offset as i128)?;
        Ok(())
    }

    /// Release the open handle. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.handle = None;
        self.closed = true;
        debug!("closed stream at logical offset {}", self.pos);
    }

    fn seek_to(&mut self, target: i128) -> Result<u64> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        if target < 0 {
            return Err(StreamError::InvalidArgument(format!(
                "negative seek position: {}",
                target
            )));
        }

        let total = self.table.total_size();
        let target = if target > total as i128 {
            total
        } else {
            target as u64
        };

        let Location { index, offset } = self.table.locate(target);
        match self.handle.as_mut() {
            Some(handle) if index == self.current_index => {
                handle
                    .seek(SeekFrom::Start(offset))
                    .map_err(|e| StreamError::resource(&self.table.segments()[index].path, e))?;
                self.file_offset = offset;
            }
            _ => self.switch_to(index, offset)?,
        }

        self.pos = target;
        Ok(target)
    }

    /// Replace the open handle with one on `index`, positioned at `offset`.
    /// The previous handle is released first so that at most one is open.
    fn switch_to(&mut self, index: usize, offset: u64) -> Result<()> {
        self.handle = None;

        let path = &self.table.segments()[index].path;
        let mut handle = H::open_segment(path).map_err(|e| StreamError::resource(path, e))?;
        if offset > 0 {
            handle
                .seek(SeekFrom::Start(offset))
                .map_err(|e| StreamError::resource(path, e))?;
        }

        debug!(
            "switched to segment {} ({}) at offset {}",
            index,
            path.display(),
            offset
        );

        self.handle = Some(handle);
        self.current_index = index;
        self.file_offset = offset;
        Ok(())
    }

    /// Reopen the current file if an earlier switch failed part way.
    fn ensure_open(&mut self) -> Result<()> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        if self.handle.is_none() {
            self.switch_to(self.current_index, self.file_offset)?;
        }
        Ok(())
    }

    fn read_handle(&mut self, buf: &mut [u8]) -> Result<usize> {
        let handle = self.handle.as_mut().ok_or(StreamError::Closed)?;
        loop {
            match handle.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(StreamError::Io(e)),
            }
        }
    }
}

impl<H: SegmentHandle> ByteStream for MultiFileStream<H> {
    fn read(&mut self, size: i64) -> Result<Vec<u8>> {
        MultiFileStream::read(self, size)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<()> {
        MultiFileStream::seek(self, offset, whence)
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn close(&mut self) {
        MultiFileStream::close(self)
    }
}

impl<H: SegmentHandle> Read for MultiFileStream<H> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_into(buf).map_err(io::Error::from)
    }
}

impl<H: SegmentHandle> Seek for MultiFileStream<H> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(off) => off as i128,
            SeekFrom::Current(off) => self.pos as i128 + off as i128,
            SeekFrom::End(off) => self.table.total_size() as i128 + off as i128,
        };
        self.seek_to(target).map_err(io::Error::from)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.pos)
    }
}

impl<H: SegmentHandle> Drop for MultiFileStream<H> {
    fn drop(&mut self) {
        self.close();
    }
}
