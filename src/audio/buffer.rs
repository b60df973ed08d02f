//! Bounded sample buffer for one recording.
//!
//! When the buffer is full, new samples push the oldest ones out, so a
//! recording that runs past its limit keeps its most recent part.
//!
//! # Example
//!
//! ```rust
//! use artwork_audio::audio::RecordingBuffer;
//!
//! let mut buf = RecordingBuffer::new(4);
//! buf.extend_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
//! assert_eq!(buf.take(), vec![2.0, 3.0, 4.0, 5.0]);
//! ```

use std::collections::VecDeque;

/// Fixed-capacity FIFO of mono `f32` samples.
#[derive(Debug, Clone)]
pub struct RecordingBuffer {
    samples: VecDeque<f32>,
    capacity: usize,
    /// Samples dropped because the buffer was full.
    overflowed: usize,
}

impl RecordingBuffer {
    /// Create a buffer holding at most `capacity` samples (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(1 << 20)),
            capacity,
            overflowed: 0,
        }
    }

    /// Append `data`, dropping the oldest samples beyond capacity.
    pub fn extend_from_slice(&mut self, data: &[f32]) {
        let data = if data.len() > self.capacity {
            let skipped = data.len() - self.capacity;
            self.overflowed += skipped;
            &data[skipped..]
        } else {
            data
        };

        let excess = (self.samples.len() + data.len()).saturating_sub(self.capacity);
        if excess > 0 {
            self.samples.drain(..excess);
            self.overflowed += excess;
        }
        self.samples.extend(data.iter().copied());
    }

    /// Remove and return all samples in chronological order.
    pub fn take(&mut self) -> Vec<f32> {
        self.overflowed = 0;
        self.samples.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of samples lost to overflow since the last [`take`](Self::take).
    pub fn overflowed(&self) -> usize {
        self.overflowed
    }

    /// Buffered duration in seconds at `sample_rate` Hz mono.
    pub fn duration_secs(&self, sample_rate: u32) -> f32 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / sample_rate as f32
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
