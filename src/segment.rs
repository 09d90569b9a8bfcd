use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Result, StreamError};

/// One backing file and the size it had when the table was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub path: PathBuf,
    pub size: u64,
}

/// Where a logical offset lands: backing-file index plus in-file offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub index: usize,
    pub offset: u64,
}

/// Ordered backing files with a cumulative-size index.
///
/// `prefix_sum[i]` is the logical offset at which segment `i` starts, and
/// `prefix_sum[len]` is the total size. Sizes are never refreshed.
#[derive(Debug, Clone)]
pub struct SegmentTable {
    segments: Vec<Segment>,
    prefix_sum: Vec<u64>,
}

impl SegmentTable {
    /// Stat every path once, in order.
    pub fn from_paths<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut segments = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let meta = fs::metadata(path).map_err(|e| StreamError::resource(path, e))?;
            segments.push(Segment {
                path: path.to_path_buf(),
                size: meta.len(),
            });
        }
        Self::new(segments)
    }

    pub fn new(segments: Vec<Segment>) -> Result<Self> {
        if segments.is_empty() {
            return Err(StreamError::InvalidArgument(
                "at least one backing file is required".to_string(),
            ));
        }

        let mut prefix_sum = Vec::with_capacity(segments.len() + 1);
        prefix_sum.push(0u64);
        let mut total = 0u64;
        for segment in &segments {
            total = total.checked_add(segment.size).ok_or_else(|| {
                StreamError::InvalidArgument("total size overflows u64".to_string())
            })?;
            prefix_sum.push(total);
        }

        debug!(
            "segment table: {} files, {} bytes total",
            segments.len(),
            total
        );

        Ok(Self {
            segments,
            prefix_sum,
        })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.prefix_sum[self.segments.len()]
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn last_index(&self) -> usize {
        self.segments.len() - 1
    }

    /// Map a logical offset to a backing file.
    ///
    /// Picks the first segment whose cumulative end is past `offset`, so
    /// zero-length segments are skipped. Offsets at or past the total size
    /// land at the end of the last segment.
    pub fn locate(&self, offset: u64) -> Location {
        // prefix_sum[0] == 0 <= offset, so pos >= 1.
        let pos = self.prefix_sum.partition_point(|&start| start <= offset);

        if pos > self.segments.len() {
            let index = self.last_index();
            return Location {
                index,
                offset: self.segments[index].size,
            };
        }

        let index = pos - 1;
        Location {
            index,
            offset: offset - self.prefix_sum[index],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(sizes: &[u64]) -> SegmentTable {
        let segments = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| Segment {
                path: PathBuf::from(format!("part.{:03}", i)),
                size,
            })
            .collect();
        SegmentTable::new(segments).unwrap()
    }

    fn loc(index: usize, offset: u64) -> Location {
        Location { index, offset }
    }

    #[test]
    fn locate_within_and_across_boundaries() {
        let t = table(&[3, 4]);
        assert_eq!(t.total_size(), 7);
        assert_eq!(t.locate(0), loc(0, 0));
        assert_eq!(t.locate(2), loc(0, 2));
        assert_eq!(t.locate(3), loc(1, 0));
        assert_eq!(t.locate(6), loc(1, 3));
    }

    #[test]
    fn locate_end_lands_on_last_file_end() {
        let t = table(&[3, 4]);
        assert_eq!(t.locate(7), loc(1, 4));
        assert_eq!(t.locate(100), loc(1, 4));
    }

    #[test]
    fn locate_skips_zero_length_files() {
        let t = table(&[0, 3, 0, 0, 4]);
        assert_eq!(t.locate(0), loc(1, 0));
        assert_eq!(t.locate(2), loc(1, 2));
        assert_eq!(t.locate(3), loc(4, 0));
        assert_eq!(t.locate(7), loc(4, 4));
    }

    #[test]
    fn zero_length_last_file_is_only_an_end_landing() {
        let t = table(&[3, 0]);
        assert_eq!(t.locate(2), loc(0, 2));
        assert_eq!(t.locate(3), loc(1, 0));

        let empty = table(&[0, 0]);
        assert_eq!(empty.total_size(), 0);
        assert_eq!(empty.locate(0), loc(1, 0));
    }

    #[test]
    fn empty_file_list_is_rejected() {
        let err = SegmentTable::new(Vec::new()).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn size_overflow_is_rejected() {
        let segments = vec![
            Segment {
                path: PathBuf::from("a"),
                size: u64::MAX,
            },
            Segment {
                path: PathBuf::from("b"),
                size: 1,
            },
        ];
        assert!(SegmentTable::new(segments).is_err());
    }
}
