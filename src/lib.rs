//! Read an ordered list of files as one contiguous, randomly seekable byte
//! stream, as though they had been concatenated end to end.

pub mod error;
pub mod io;
pub mod scope;
pub mod seekable_mmap;
pub mod segment;
pub mod stream;

pub use error::{Result, StreamError};
pub use io::{ByteSource, ByteStream, SegmentHandle, Whence, READ_ALL};
pub use scope::{with_stream, StreamGuard};
pub use seekable_mmap::SeekableMmap;
pub use segment::{Location, Segment, SegmentTable};
pub use stream::MultiFileStream;
