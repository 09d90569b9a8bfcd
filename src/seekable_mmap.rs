use std::cmp::min;
use std::fs::File;
use std::io::{Read, Result as IoResult, Seek, SeekFrom};
use std::path::Path;

use log::warn;
use memmap2::Mmap;

use crate::io::SegmentHandle;

/// Memory-mapped backing handle for `MultiFileStream<SeekableMmap>`.
///
/// Keeps its own cursor over the mapping. Before each read the file is
/// stat'ed and the read is capped at its current length, so a file that
/// shrank since it was mapped gives a short read instead of touching pages
/// past its end. A truncation racing with the copy itself can still raise
/// SIGBUS; use the plain `File` handle when backing files may be rewritten
/// while the stream is open.
#[derive(Debug)]
pub struct SeekableMmap {
    file: File,
    // None for zero-length files, which cannot be mapped.
    mmap: Option<Mmap>,
    pos: usize,
}

impl SeekableMmap {
    /// Map `file` read-only.
    pub fn open(file: File) -> IoResult<Self> {
        if file.metadata()?.len() == 0 {
            return Ok(Self {
                file,
                mmap: None,
                pos: 0,
            });
        }
        // SAFETY: the mapping is read-only and `read` never copies past the
        // file's current length.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            file,
            mmap: Some(mmap),
            pos: 0,
        })
    }

    /// Length of the mapping taken at open time.
    pub fn len(&self) -> usize {
        self.mapped().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn mapped(&self) -> &[u8] {
        match &self.mmap {
            Some(mmap) => &mmap[..],
            None => &[],
        }
    }

    /// Bytes of the mapping still backed by the file right now.
    fn live_len(&self) -> IoResult<usize> {
        let on_disk = self.file.metadata()?.len();
        let on_disk = usize::try_from(on_disk).unwrap_or(usize::MAX);
        if on_disk < self.len() {
            warn!(
                "mapped file shrank from {} to {} bytes",
                self.len(),
                on_disk
            );
        }
        Ok(min(on_disk, self.len()))
    }
}

impl SegmentHandle for SeekableMmap {
    fn open_segment(path: &Path) -> IoResult<Self> {
        SeekableMmap::open(File::open(path)?)
    }
}

impl Read for SeekableMmap {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        if buf.is_empty() || self.pos >= self.len() {
            return Ok(0);
        }
        let end = self.live_len()?;
        if self.pos >= end {
            return Ok(0);
        }
        let to_read = min(end - self.pos, buf.len());
        buf[..to_read].copy_from_slice(&self.mapped()[self.pos..self.pos + to_read]);
        self.pos += to_read;
        Ok(to_read)
    }
}

impl Seek for SeekableMmap {
    fn seek(&mut self, how: SeekFrom) -> IoResult<u64> {
        let new = match how {
            SeekFrom::Start(off) => off as i128,
            SeekFrom::End(off) => (self.len() as i128) + (off as i128),
            SeekFrom::Current(off) => (self.pos as i128) + (off as i128),
        };

        if new < 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "invalid seek to a negative position",
            ));
        }

        self.pos = usize::try_from(new).unwrap_or(usize::MAX);
        Ok(self.pos as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_and_seeks_within_mapping() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"defg").unwrap();
        tmp.flush().unwrap();

        let mut handle = SeekableMmap::open_segment(tmp.path()).unwrap();
        assert_eq!(handle.len(), 4);

        handle.seek(SeekFrom::Start(1)).unwrap();
        let mut buf = [0u8; 8];
        let n = handle.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"efg");
        assert_eq!(handle.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn truncated_file_gives_short_read() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"defghijk").unwrap();
        tmp.flush().unwrap();

        let mut handle = SeekableMmap::open_segment(tmp.path()).unwrap();
        assert_eq!(handle.len(), 8);
        tmp.as_file().set_len(3).unwrap();

        let mut buf = [0u8; 8];
        let n = handle.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"def");
        assert_eq!(handle.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn zero_length_file_maps_to_empty() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut handle = SeekableMmap::open_segment(tmp.path()).unwrap();
        assert!(handle.is_empty());
        assert_eq!(handle.seek(SeekFrom::End(0)).unwrap(), 0);

        let mut buf = [0u8; 4];
        assert_eq!(handle.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn negative_seek_is_rejected() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut handle = SeekableMmap::open_segment(tmp.path()).unwrap();
        let err = handle.seek(SeekFrom::Current(-1)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }
}
