use std::num::NonZeroUsize;

use crate::{errors::Error, Result};

/// Number of identifiers submitted in one delete call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkSize(NonZeroUsize);

impl ChunkSize {
    pub fn new(n: usize) -> Result<Self> {
        NonZeroUsize::new(n)
            .map(Self)
            .ok_or_else(|| Error::Config("delete chunk size must be greater than 0".to_string()))
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self(NonZeroUsize::MIN.saturating_add(99))
    }
}

/// Lazily split `items` into contiguous runs of `size`, the last one possibly shorter.
pub fn chunks<T>(items: &[T], size: ChunkSize) -> std::slice::Chunks<'_, T> {
    items.chunks(size.get())
}
