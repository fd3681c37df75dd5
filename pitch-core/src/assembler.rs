//! # Frame Assembler
//!
//! Turns an ordered stream of signed 16-bit little-endian mono PCM bytes,
//! delivered in arbitrarily sized chunks, into fixed-size frames of
//! normalized samples.
//!
//! ## Behaviour
//! - No resampling and no overlap between frames
//! - Partial frames stay buffered until more bytes arrive
//! - Chunk boundaries never need to line up with sample or frame boundaries

use log::warn;

/// Bytes per 16-bit sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Divisor mapping `i16` samples onto [-1, 1].
const I16_SCALE: f32 = 32768.0;

/// Accumulates incoming bytes and slices them into analysis frames.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    frame_size: usize,
    pending: Vec<u8>,
}

impl FrameAssembler {
    /// Creates an assembler producing frames of `frame_size` samples.
    pub fn new(frame_size: usize) -> Self {
        Self {
            frame_size,
            pending: Vec::with_capacity(frame_size * BYTES_PER_SAMPLE * 2),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn frame_bytes(&self) -> usize {
        self.frame_size * BYTES_PER_SAMPLE
    }

    /// Appends a chunk of raw bytes.
    ///
    /// # Returns
    /// The number of complete frames now ready to be taken.
    pub fn push(&mut self, bytes: &[u8]) -> usize {
        self.pending.extend_from_slice(bytes);
        self.ready_frames()
    }

    /// Number of complete frames currently buffered.
    pub fn ready_frames(&self) -> usize {
        if self.frame_size == 0 {
            return 0;
        }
        self.pending.len() / self.frame_bytes()
    }

    /// Number of buffered bytes that do not yet form a complete frame.
    pub fn pending_bytes(&self) -> usize {
        if self.frame_size == 0 {
            return self.pending.len();
        }
        self.pending.len() % self.frame_bytes()
    }

    /// Moves the oldest complete frame into `frame`, replacing its contents.
    ///
    /// `frame` is reused across calls so the steady state allocates nothing.
    ///
    /// # Returns
    /// * `true` - `frame` now holds exactly `frame_size` samples in [-1, 1]
    /// * `false` - Not enough bytes buffered; `frame` is left untouched
    pub fn next_frame(&mut self, frame: &mut Vec<f32>) -> bool {
        let frame_bytes = self.frame_bytes();
        if frame_bytes == 0 || self.pending.len() < frame_bytes {
            return false;
        }

        frame.clear();
        frame.extend(
            self.pending[..frame_bytes]
                .chunks_exact(BYTES_PER_SAMPLE)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / I16_SCALE),
        );

        // Remove the consumed frame from the front of the buffer.
        self.pending.drain(..frame_bytes);
        true
    }

    /// Drains every complete frame currently buffered into owned vectors.
    pub fn drain_frames(&mut self) -> Vec<Vec<f32>> {
        let mut frames = Vec::with_capacity(self.ready_frames());
        let mut frame = Vec::with_capacity(self.frame_size);
        while self.next_frame(&mut frame) {
            frames.push(std::mem::replace(
                &mut frame,
                Vec::with_capacity(self.frame_size),
            ));
        }
        frames
    }

    /// Signals that the byte source has permanently ended.
    ///
    /// Complete frames are left for the caller to take. A trailing partial
    /// frame (including an odd dangling byte) can never be completed and is
    /// discarded.
    ///
    /// # Returns
    /// The number of bytes discarded.
    pub fn finish(&mut self) -> usize {
        let leftover = self.pending_bytes();
        if leftover > 0 {
            warn!("Discarding {} trailing bytes at end of stream", leftover);
            let keep = self.pending.len() - leftover;
            self.pending.truncate(keep);
        }
        leftover
    }

    /// Drops every buffered byte.
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}
