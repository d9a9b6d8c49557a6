// SPDX-License-Identifier: Apache-2.0
//! Pooled segment sequences and the thread-local scratch buffer.
//!
//! The pool and the scratch are the only process-wide resources in the
//! codec. Both are lazily initialized; the scratch degrades to a plain
//! allocation on platforms without thread-local storage support.

use std::cell::RefCell;
use std::sync::{Mutex, OnceLock};

use crate::writer::Sink;

/// Size of a freshly allocated pool segment.
const SEGMENT_SIZE: usize = 32 * 1024;

/// Capacity of the per-thread scratch buffer.
pub const SCRATCH_SIZE: usize = 64 * 1024;

/// Upper bound on segments retained by the pool across all threads.
const POOL_RETAIN: usize = 64;

/// Process-wide, thread-safe pool of byte segments.
#[derive(Debug, Default)]
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
}

static POOL: OnceLock<BufferPool> = OnceLock::new();

impl BufferPool {
    /// The process-wide pool instance.
    pub fn global() -> &'static Self {
        POOL.get_or_init(Self::default)
    }

    /// Rents an empty sequence; the caller owns it exclusively until it
    /// is dropped, at which point its segments return to the pool.
    pub fn rent(&'static self) -> PooledSequence {
        PooledSequence {
            pool: self,
            segments: Vec::new(),
            len: 0,
        }
    }

    fn take_segment(&self) -> Vec<u8> {
        let reclaimed = match self.free.lock() {
            Ok(mut free) => free.pop(),
            Err(poisoned) => poisoned.into_inner().pop(),
        };
        reclaimed.unwrap_or_else(|| Vec::with_capacity(SEGMENT_SIZE))
    }

    fn give_back(&self, mut segments: Vec<Vec<u8>>) {
        let mut free = match self.free.lock() {
            Ok(free) => free,
            Err(poisoned) => poisoned.into_inner(),
        };
        while free.len() < POOL_RETAIN {
            match segments.pop() {
                Some(mut seg) => {
                    seg.clear();
                    free.push(seg);
                }
                None => break,
            }
        }
    }
}

/// A rented chain of byte segments behaving as one logical buffer.
///
/// Total length is tracked directly; segments iterate in write order.
#[derive(Debug)]
pub struct PooledSequence {
    pool: &'static BufferPool,
    segments: Vec<Vec<u8>>,
    len: usize,
}

impl PooledSequence {
    /// Total number of bytes written.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether no bytes have been written.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates the segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &[u8]> {
        self.segments.iter().map(Vec::as_slice)
    }

    /// Copies the sequence into one contiguous vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for seg in &self.segments {
            out.extend_from_slice(seg);
        }
        out
    }

    fn writable(&mut self, incoming: usize) -> &mut Vec<u8> {
        let needs_new = match self.segments.last() {
            Some(last) => !last.is_empty() && last.len() + incoming > last.capacity(),
            None => true,
        };
        if needs_new {
            let seg = self.pool.take_segment();
            self.segments.push(seg);
        }
        let idx = self.segments.len() - 1;
        &mut self.segments[idx]
    }
}

impl Sink for PooledSequence {
    fn put(&mut self, bytes: &[u8]) {
        self.writable(bytes.len()).extend_from_slice(bytes);
        self.len += bytes.len();
    }
}

impl Drop for PooledSequence {
    fn drop(&mut self) {
        self.pool.give_back(std::mem::take(&mut self.segments));
    }
}

thread_local! {
    static SCRATCH: RefCell<Option<Vec<u8>>> = const { RefCell::new(None) };
}

/// Serialization sink backed by the per-thread scratch buffer.
///
/// Small outputs land entirely in the scratch and are copied out exactly
/// once; outputs that outgrow the scratch spill transparently into a pool
/// rental.
#[derive(Debug)]
pub struct ScratchSink {
    local: Vec<u8>,
    spill: Option<PooledSequence>,
}

impl ScratchSink {
    /// Borrows the current thread's scratch buffer (allocating it on
    /// first use).
    #[must_use]
    pub fn acquire() -> Self {
        let local = SCRATCH
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_else(|| Vec::with_capacity(SCRATCH_SIZE));
        Self {
            local,
            spill: None,
        }
    }

    /// Total bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.local.len() + self.spill.as_ref().map_or(0, PooledSequence::len)
    }

    /// Whether nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the output into an exactly-sized vector and releases the
    /// scratch back to the thread.
    #[must_use]
    pub fn into_vec(mut self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(&self.local);
        if let Some(spill) = &self.spill {
            for seg in spill.segments() {
                out.extend_from_slice(seg);
            }
        }
        self.spill = None;
        out
    }
}

impl Sink for ScratchSink {
    fn put(&mut self, bytes: &[u8]) {
        if let Some(spill) = &mut self.spill {
            spill.put(bytes);
            return;
        }
        if self.local.len() + bytes.len() <= SCRATCH_SIZE {
            self.local.extend_from_slice(bytes);
        } else {
            let mut spill = BufferPool::global().rent();
            spill.put(bytes);
            self.spill = Some(spill);
        }
    }
}

impl Drop for ScratchSink {
    fn drop(&mut self) {
        let mut local = std::mem::take(&mut self.local);
        if local.capacity() >= SCRATCH_SIZE {
            local.clear();
            local.truncate(0);
            SCRATCH.with(|slot| {
                let mut slot = slot.borrow_mut();
                if slot.is_none() {
                    *slot = Some(local);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pooled_sequence_tracks_length_across_segments() {
        let mut seq = BufferPool::global().rent();
        let chunk = vec![0xabu8; 20 * 1024];
        seq.put(&chunk);
        seq.put(&chunk);
        seq.put(&chunk);
        assert_eq!(seq.len(), 60 * 1024);
        assert_eq!(seq.to_vec().len(), 60 * 1024);
        assert!(seq.segments().count() >= 2);
    }

    #[test]
    fn rented_segments_are_reclaimed() {
        let before;
        {
            let mut seq = BufferPool::global().rent();
            seq.put(&[1, 2, 3]);
            before = seq.segments().count();
        }
        // The returned segment is reusable by the next rental.
        let mut seq = BufferPool::global().rent();
        seq.put(&[4, 5, 6]);
        assert_eq!(seq.segments().count(), before);
        assert_eq!(seq.to_vec(), vec![4, 5, 6]);
    }

    #[test]
    fn scratch_handles_small_outputs_without_spilling() {
        let mut sink = ScratchSink::acquire();
        sink.put(b"hello");
        assert_eq!(sink.len(), 5);
        assert_eq!(sink.into_vec(), b"hello");
    }

    #[test]
    fn scratch_spills_transparently_on_overflow() {
        let mut sink = ScratchSink::acquire();
        let chunk = vec![0x5au8; SCRATCH_SIZE / 2 + 1];
        sink.put(&chunk);
        sink.put(&chunk);
        assert_eq!(sink.len(), chunk.len() * 2);
        let out = sink.into_vec();
        assert_eq!(out.len(), chunk.len() * 2);
        assert!(out.iter().all(|b| *b == 0x5a));
    }
}
