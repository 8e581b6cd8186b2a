//! Reusable sample buffer backing the outbound chunk.
//!
//! Storage for `capacity` samples is reserved once. Resizing to a different
//! chunk size within that capacity never reallocates.

use dynid_common::messages::{DataChunk, Sample};

/// Fixed-capacity set of six parallel sample arrays.
#[derive(Debug)]
pub struct SampleBuffer {
    chunk: DataChunk,
    resizes: u64,
}

impl SampleBuffer {
    /// Empty buffer with room for `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            chunk: DataChunk::with_capacity(capacity),
            resizes: 0,
        }
    }

    /// Current length in samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.chunk.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunk.is_empty()
    }

    /// Reserved capacity in samples.
    pub fn capacity(&self) -> usize {
        self.chunk.capacity()
    }

    /// Number of times the length changed.
    pub fn resize_count(&self) -> u64 {
        self.resizes
    }

    /// Prepare for a session of `chunksize` samples.
    ///
    /// Resizes if the length differs, otherwise zeroes the samples in place.
    /// Either way any partially filled chunk is discarded. Returns `true` if
    /// the buffer was resized.
    pub fn prepare(&mut self, chunksize: usize) -> bool {
        if self.chunk.len() != chunksize {
            self.chunk.resize(chunksize);
            self.resizes += 1;
            true
        } else {
            self.chunk.zero();
            false
        }
    }

    /// Write one sample. `slot` must be `< len()`.
    #[inline]
    pub fn write(&mut self, slot: usize, sample: Sample) {
        self.chunk.set(slot, sample);
    }

    /// The chunk as it will be published.
    #[inline]
    pub fn chunk(&self) -> &DataChunk {
        &self.chunk
    }
}
