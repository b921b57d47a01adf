//! Lookahead gain buffer
//!
//! Delays the signal so that a gain computed from newer audio is applied to
//! older audio before it leaves the normalizer. Storage is planar, one ring
//! per channel, but all rings share one write position and one fill count:
//! the gain is computed jointly from every channel, so they must stay in
//! lockstep.

use crate::error::{NormalizeError, Result};

/// Fixed-capacity ring buffer applying gain on the way out
///
/// # Example
///
/// ```
/// use soul_normalize::LookaheadBuffer;
///
/// let mut buffer = LookaheadBuffer::new(1, 4).unwrap();
///
/// let mut block = [1.0_f32, 2.0, 3.0, 4.0];
/// // The first block only fills the buffer
/// assert!(!buffer.push_and_pull([&mut block[..]], 4, 1.0));
///
/// let mut block = [5.0_f32, 6.0, 7.0, 8.0];
/// assert!(buffer.push_and_pull([&mut block[..]], 4, 0.5));
/// assert_eq!(block, [0.5, 1.0, 1.5, 2.0]);
/// ```
#[derive(Debug)]
pub struct LookaheadBuffer {
    /// One ring per channel, each `capacity` samples long
    storage: Vec<Vec<f32>>,
    capacity: usize,
    /// Next write position, shared by all channels
    head: usize,
    /// Resident samples that have not been emitted yet
    count: usize,
    /// Set once the buffer has produced output since the last resize or clear
    primed: bool,
}

impl LookaheadBuffer {
    /// Create a buffer holding `capacity` frames for each of `channels`
    ///
    /// A capacity of zero disables the lookahead; the buffer then only
    /// applies gain.
    pub fn new(channels: usize, capacity: usize) -> Result<Self> {
        Ok(Self {
            storage: Self::allocate(channels, capacity)?,
            capacity,
            head: 0,
            count: 0,
            primed: false,
        })
    }

    fn allocate(channels: usize, capacity: usize) -> Result<Vec<Vec<f32>>> {
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(channels)
            .map_err(|_| NormalizeError::Allocation { frames: capacity })?;
        for _ in 0..channels {
            let mut ring = Vec::new();
            ring.try_reserve_exact(capacity)
                .map_err(|_| NormalizeError::Allocation { frames: capacity })?;
            ring.resize(capacity, 0.0);
            storage.push(ring);
        }
        Ok(storage)
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        self.storage.len()
    }

    /// Capacity in frames
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames currently held back
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether the buffer has produced output since the last resize or clear
    ///
    /// This does not promise that the next call emits. A block longer than
    /// the free space emits as many frames as it writes, so if nothing was
    /// resident the buffer is empty afterwards and smaller blocks fill it up
    /// again before output resumes.
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Reallocate for a new capacity, dropping all buffered audio
    ///
    /// If the new storage cannot be allocated the current buffer is kept
    /// untouched and an error is returned.
    pub fn resize(&mut self, capacity: usize) -> Result<()> {
        let storage = Self::allocate(self.storage.len(), capacity)?;
        self.storage = storage;
        self.capacity = capacity;
        self.head = 0;
        self.count = 0;
        self.primed = false;
        Ok(())
    }

    /// Drop all buffered audio, keeping the capacity
    pub fn clear(&mut self) {
        for ring in &mut self.storage {
            ring.fill(0.0);
        }
        self.head = 0;
        self.count = 0;
        self.primed = false;
    }

    #[inline]
    fn advance(&self, cursor: usize) -> usize {
        let next = cursor + 1;
        if next == self.capacity {
            0
        } else {
            next
        }
    }

    /// Push `frame_count` new frames and pull out delayed, gain-adjusted ones
    ///
    /// Each channel slice is used both as input and as output: the first
    /// `frame_count` samples are read as new audio and overwritten with the
    /// delayed audio multiplied by `gain`. Slices must hold at least
    /// `frame_count` samples, one slice per channel.
    ///
    /// Returns `false` while the buffer is still filling. In that case the
    /// whole call was absorbed and the slices contain no usable output.
    /// Returns `true` once the slices hold a complete block to emit.
    pub fn push_and_pull<'a, I>(&mut self, channels: I, frame_count: usize, gain: f32) -> bool
    where
        I: IntoIterator<Item = &'a mut [f32]>,
    {
        if self.capacity == 0 {
            for samples in channels {
                for sample in &mut samples[..frame_count] {
                    *sample *= gain;
                }
            }
            self.primed = true;
            return true;
        }

        // An empty block reports whether output has started
        if frame_count == 0 {
            return self.primed;
        }

        let free = self.capacity - self.count;
        let fill = frame_count.min(free);

        for (channel, samples) in channels.into_iter().enumerate().take(self.storage.len()) {
            let mut cursor = self.head;

            // Free slots take new samples without emitting anything
            for &sample in &samples[..fill] {
                self.storage[channel][cursor] = sample;
                cursor = self.advance(cursor);
            }
            if frame_count <= free {
                continue;
            }

            // Every further sample displaces the oldest resident one, which is
            // written out `free` positions behind the read position
            for read in fill..frame_count {
                let displaced =
                    std::mem::replace(&mut self.storage[channel][cursor], samples[read]);
                samples[read - free] = displaced * gain;
                cursor = self.advance(cursor);
            }

            // The tail of the block is joined with resident samples that were
            // not displaced during this call
            for sample in &mut samples[frame_count - free..frame_count] {
                *sample = self.storage[channel][cursor] * gain;
                cursor = self.advance(cursor);
            }
        }

        self.head = (self.head + frame_count) % self.capacity;

        if frame_count <= free {
            self.count += frame_count;
            false
        } else {
            // Emitted as many frames as were written, residency is unchanged
            if !self.primed {
                tracing::trace!(
                    capacity = self.capacity,
                    resident = self.count,
                    "Lookahead buffer primed"
                );
            }
            self.primed = true;
            true
        }
    }
}
