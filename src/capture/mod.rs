//! Camera frame-buffer queue boundary
//!
//! The camera driver exposes its frames as a queue of filled buffer
//! segments: the consumer dequeues a segment, copies it out, and returns
//! the buffer to the driver's free pool so it can be refilled while the
//! rest of the frame is still arriving. [`FrameSource`] is that boundary;
//! [`SegmentQueue`] is its in-process realization and [`PatternCamera`]
//! a synthetic producer for development and tests.

mod pattern;
mod queue;

pub use pattern::{PatternCamera, PatternConfig};
pub use queue::{DriverEndpoint, SegmentQueue, StopHandle};

use bytes::BytesMut;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("frame source stopped")]
    Stopped,

    #[error("driver queue disconnected")]
    Disconnected,
}

/// One filled buffer segment from the camera's queue
///
/// A frame may span several segments; every segment redundantly carries the
/// declared total length of the frame it belongs to.
#[derive(Debug)]
pub struct FrameSegment {
    payload: BytesMut,
    frame_total_len: usize,
    timestamp_ms: u64,
}

impl FrameSegment {
    pub fn new(payload: BytesMut, frame_total_len: usize, timestamp_ms: u64) -> Self {
        Self {
            payload,
            frame_total_len,
            timestamp_ms,
        }
    }

    /// Valid bytes carried by this segment
    pub fn bytes(&self) -> &[u8] {
        &self.payload
    }

    /// Number of valid bytes in this segment
    pub fn used_len(&self) -> usize {
        self.payload.len()
    }

    /// Declared total length of the frame under assembly
    pub fn frame_total_len(&self) -> usize {
        self.frame_total_len
    }

    /// Driver timestamp, milliseconds since stream start
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub(crate) fn into_payload(self) -> BytesMut {
        self.payload
    }
}

/// Blocking access to the driver's segment queue
pub trait FrameSource {
    /// Blocks until the next filled segment is available.
    ///
    /// This is the pipeline's cancellation point: implementations return
    /// [`CaptureError::Stopped`] once their stop handle is raised instead
    /// of waiting forever.
    fn dequeue(&mut self) -> Result<FrameSegment, CaptureError>;

    /// Returns a consumed segment's buffer to the driver's free pool.
    ///
    /// Must be called as soon as the segment has been copied out; the
    /// driver cannot refill a buffer it does not own.
    fn recycle(&mut self, segment: FrameSegment);

    /// Largest frame this source will ever declare, in bytes
    fn max_frame_len(&self) -> usize;
}
