//! Outbound chunk egress.
//!
//! The controller hands each completed chunk to a [`ChunkSink`] by reference.
//! Publishing is fire-and-forget: a sink must not block and must not fail
//! back into the control path.
//!
//! [`chunk_channel`] provides the RT-safe sink used by the binary: a fixed
//! pool of pre-allocated chunks cycles between the RT thread and a consumer
//! thread, so publishing only copies samples into recycled storage.
//!
//! ```text
//!   RT thread                         consumer thread
//!   ChannelSink::publish ──filled──▶  ChunkReceiver::recv
//!        ▲                                   │
//!        └────────────── free ◀── recycle ───┘
//! ```

use std::time::Duration;

pub use crossbeam_channel::RecvTimeoutError;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use dynid_common::messages::DataChunk;

/// Destination for completed chunks.
pub trait ChunkSink {
    /// Publish a completed chunk. Must not block.
    fn publish(&mut self, chunk: &DataChunk);
}

/// Collects every chunk by cloning it. Allocates; for tests and offline use.
impl ChunkSink for Vec<DataChunk> {
    fn publish(&mut self, chunk: &DataChunk) {
        self.push(chunk.clone());
    }
}

/// Publish / drop counters of a [`ChannelSink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Chunks handed to the consumer.
    pub published: u64,
    /// Chunks dropped because no pooled chunk was free or the consumer is gone.
    pub dropped: u64,
}

/// RT side of a pooled chunk channel.
pub struct ChannelSink {
    filled_tx: Sender<DataChunk>,
    free_rx: Receiver<DataChunk>,
    free_tx: Sender<DataChunk>,
    stats: SinkStats,
}

/// Consumer side of a pooled chunk channel.
pub struct ChunkReceiver {
    filled_rx: Receiver<DataChunk>,
    free_tx: Sender<DataChunk>,
}

/// Create a pooled chunk channel.
///
/// `pool_size` chunks, each with room for `chunk_capacity` samples, are
/// allocated up front. At most `pool_size` chunks are in flight; further
/// publishes are dropped until the consumer recycles one.
pub fn chunk_channel(pool_size: usize, chunk_capacity: usize) -> (ChannelSink, ChunkReceiver) {
    let pool_size = pool_size.max(1);
    let (filled_tx, filled_rx) = crossbeam_channel::bounded(pool_size);
    let (free_tx, free_rx) = crossbeam_channel::bounded(pool_size);

    for _ in 0..pool_size {
        // Cannot fail: the channel was created with exactly this capacity.
        let _ = free_tx.try_send(DataChunk::with_capacity(chunk_capacity));
    }

    let sink = ChannelSink {
        filled_tx,
        free_rx,
        free_tx: free_tx.clone(),
        stats: SinkStats::default(),
    };
    let receiver = ChunkReceiver { filled_rx, free_tx };
    (sink, receiver)
}

impl ChannelSink {
    pub fn stats(&self) -> SinkStats {
        self.stats
    }
}

impl ChunkSink for ChannelSink {
    fn publish(&mut self, chunk: &DataChunk) {
        let mut slot = match self.free_rx.try_recv() {
            Ok(slot) => slot,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                self.stats.dropped += 1;
                return;
            }
        };

        slot.copy_from(chunk);

        match self.filled_tx.try_send(slot) {
            Ok(()) => self.stats.published += 1,
            Err(TrySendError::Full(slot)) | Err(TrySendError::Disconnected(slot)) => {
                let _ = self.free_tx.try_send(slot);
                self.stats.dropped += 1;
            }
        }
    }
}

impl ChunkReceiver {
    /// Wait for the next chunk. `None` once the sink is dropped and drained.
    pub fn recv(&self) -> Option<DataChunk> {
        self.filled_rx.recv().ok()
    }

    /// Wait up to `timeout` for the next chunk.
    ///
    /// `Disconnected` once the sink is dropped and the channel drained.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<DataChunk, RecvTimeoutError> {
        self.filled_rx.recv_timeout(timeout)
    }

    /// Next chunk if one is ready.
    pub fn try_recv(&self) -> Option<DataChunk> {
        self.filled_rx.try_recv().ok()
    }

    /// Return a chunk to the pool once consumed.
    pub fn recycle(&self, chunk: DataChunk) {
        let _ = self.free_tx.try_send(chunk);
    }
}
