use std::io;
use std::path::PathBuf;

/// Errors surfaced by the concatenated stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("IO Error on {}: {source}", .path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),
    #[error("Stream is closed")]
    Closed,
}

impl StreamError {
    pub(crate) fn resource(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StreamError::Resource {
            path: path.into(),
            source,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, StreamError::InvalidArgument(_))
    }
}

impl From<StreamError> for io::Error {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::Io(inner) => inner,
            StreamError::Resource { path, source } => io::Error::new(
                source.kind(),
                format!("{}: {}", path.display(), source),
            ),
            StreamError::InvalidArgument(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            StreamError::Closed => io::Error::new(io::ErrorKind::NotConnected, "stream is closed"),
        }
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_maps_to_invalid_input() {
        let err: io::Error = StreamError::InvalidArgument("negative".to_string()).into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn resource_keeps_kind_and_path() {
        let err = StreamError::resource(
            "/missing/part.001",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("part.001"));

        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn closed_is_not_an_argument_error() {
        assert!(!StreamError::Closed.is_invalid_argument());
        assert!(StreamError::InvalidArgument("bad whence".to_string()).is_invalid_argument());
    }
}
