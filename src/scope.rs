use std::ops::{Deref, DerefMut};

use crate::io::ByteStream;

/// Owns a stream for the duration of a scope and closes it when dropped,
/// including on early return and unwinding.
#[derive(Debug)]
pub struct StreamGuard<S: ByteStream> {
    stream: S,
}

impl<S: ByteStream> StreamGuard<S> {
    pub fn acquire(stream: S) -> Self {
        Self { stream }
    }
}

impl<S: ByteStream> Deref for StreamGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.stream
    }
}

impl<S: ByteStream> DerefMut for StreamGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.stream
    }
}

impl<S: ByteStream> Drop for StreamGuard<S> {
    fn drop(&mut self) {
        self.stream.close();
    }
}

/// Run `f` with `stream`, then close it on every exit path.
pub fn with_stream<S, T, F>(stream: S, f: F) -> T
where
    S: ByteStream,
    F: FnOnce(&mut S) -> T,
{
    let mut guard = StreamGuard::acquire(stream);
    f(&mut *guard)
}
