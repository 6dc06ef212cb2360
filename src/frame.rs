//! Frame reassembly from driver queue segments

use thiserror::Error;
use tracing::trace;

use crate::capture::{CaptureError, FrameSegment, FrameSource};

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("frame of {needed} bytes exceeds buffer capacity {capacity}")]
    CapacityExceeded { needed: usize, capacity: usize },

    #[error("segment declares frame length {seen}, first segment declared {declared}")]
    TotalMismatch { declared: usize, seen: usize },

    #[error("segments overran declared frame length {declared} (copied {copied})")]
    Overrun { declared: usize, copied: usize },

    #[error("driver declared a zero-length frame")]
    EmptyFrame,

    #[error(transparent)]
    Source(#[from] CaptureError),
}

/// Fixed-capacity frame buffer, allocated once and reused across frames
///
/// The only append path is bounds-checked: a copy that would pass the
/// capacity fails instead of writing out of bounds, leaving the valid
/// prefix intact.
#[derive(Debug)]
pub struct FrameBuffer {
    data: Box<[u8]>,
    len: usize,
}

impl FrameBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Valid bytes assembled so far
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Appends `bytes`, failing before any write if capacity would be passed
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> Result<(), AssembleError> {
        let end = self.len + bytes.len();
        if end > self.capacity() {
            return Err(AssembleError::CapacityExceeded {
                needed: end,
                capacity: self.capacity(),
            });
        }

        self.data[self.len..end].copy_from_slice(bytes);
        self.len = end;
        Ok(())
    }
}

/// Reassembles one complete frame from `source` into `buffer`
///
/// The first segment's declared total fixes the target length; segments are
/// copied in dequeue order and their buffers recycled immediately after the
/// copy, so the driver can refill them while assembly continues. On success
/// `buffer.as_slice()` spans exactly the declared frame.
pub fn assemble_frame<S: FrameSource>(
    source: &mut S,
    buffer: &mut FrameBuffer,
) -> Result<(), AssembleError> {
    buffer.clear();

    let first = source.dequeue()?;
    let declared = first.frame_total_len();
    let timestamp_ms = first.timestamp_ms();

    if declared == 0 {
        source.recycle(first);
        return Err(AssembleError::EmptyFrame);
    }
    if declared > buffer.capacity() {
        source.recycle(first);
        return Err(AssembleError::CapacityExceeded {
            needed: declared,
            capacity: buffer.capacity(),
        });
    }

    copy_segment(source, buffer, first, declared)?;

    while buffer.len() < declared {
        let segment = source.dequeue()?;
        if segment.frame_total_len() != declared {
            let seen = segment.frame_total_len();
            source.recycle(segment);
            return Err(AssembleError::TotalMismatch { declared, seen });
        }
        copy_segment(source, buffer, segment, declared)?;
    }

    trace!(len = buffer.len(), timestamp_ms, "frame assembled");
    Ok(())
}

/// Copies one segment into the buffer and recycles it
fn copy_segment<S: FrameSource>(
    source: &mut S,
    buffer: &mut FrameBuffer,
    segment: FrameSegment,
    declared: usize,
) -> Result<(), AssembleError> {
    if buffer.len() + segment.used_len() > declared {
        let copied = buffer.len() + segment.used_len();
        source.recycle(segment);
        return Err(AssembleError::Overrun { declared, copied });
    }

    let result = buffer.extend_from_slice(segment.bytes());
    source.recycle(segment);
    result
}
