//! In-process realization of the driver's segment queue

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tracing::trace;

use super::{CaptureError, FrameSegment, FrameSource};

// How often blocked waits re-check the stop flag
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Raises the stop flag shared by both halves of a [`SegmentQueue`]
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Consumer half of the driver queue
///
/// Holds the filled-segment channel and the free-buffer return channel.
/// Backpressure is structural: only the pooled buffers exist, so the
/// producer stalls until the consumer recycles one.
pub struct SegmentQueue {
    filled_rx: Receiver<FrameSegment>,
    free_tx: Sender<BytesMut>,
    stop: Arc<AtomicBool>,
    max_frame_len: usize,
}

/// Producer half of the driver queue
///
/// Handed to whatever fills buffers — a driver integration thread or the
/// synthetic pattern camera.
pub struct DriverEndpoint {
    filled_tx: Sender<FrameSegment>,
    free_rx: Receiver<BytesMut>,
    stop: Arc<AtomicBool>,
}

impl SegmentQueue {
    /// Creates a queue pair with `pool` buffers of `segment_len` bytes each,
    /// all seeded into the free pool.
    ///
    /// `max_frame_len` is the largest frame the producer will ever declare;
    /// sessions validate their buffer capacity against it at start.
    pub fn with_pool(
        pool: usize,
        segment_len: usize,
        max_frame_len: usize,
    ) -> (Self, DriverEndpoint, StopHandle) {
        let (filled_tx, filled_rx) = mpsc::channel();
        let (free_tx, free_rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));

        for _ in 0..pool {
            free_tx
                .send(BytesMut::with_capacity(segment_len))
                .expect("free pool receiver alive at construction");
        }

        let queue = Self {
            filled_rx,
            free_tx,
            stop: Arc::clone(&stop),
            max_frame_len,
        };
        let endpoint = DriverEndpoint {
            filled_tx,
            free_rx,
            stop: Arc::clone(&stop),
        };
        (queue, endpoint, StopHandle(stop))
    }
}

impl FrameSource for SegmentQueue {
    fn dequeue(&mut self) -> Result<FrameSegment, CaptureError> {
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return Err(CaptureError::Stopped);
            }

            match self.filled_rx.recv_timeout(STOP_POLL_INTERVAL) {
                Ok(segment) => {
                    trace!(
                        used = segment.used_len(),
                        total = segment.frame_total_len(),
                        "segment dequeued"
                    );
                    return Ok(segment);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(CaptureError::Disconnected),
            }
        }
    }

    fn recycle(&mut self, segment: FrameSegment) {
        let mut buffer = segment.into_payload();
        buffer.clear();
        // Producer already gone means the pool is draining; nothing to do.
        let _ = self.free_tx.send(buffer);
    }

    fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

impl DriverEndpoint {
    /// Blocks until a free buffer is available or the queue is stopped
    pub fn acquire(&self) -> Result<BytesMut, CaptureError> {
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return Err(CaptureError::Stopped);
            }

            match self.free_rx.recv_timeout(STOP_POLL_INTERVAL) {
                Ok(buffer) => return Ok(buffer),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(CaptureError::Disconnected),
            }
        }
    }

    /// Submits a filled segment to the consumer
    pub fn submit(&self, segment: FrameSegment) -> Result<(), CaptureError> {
        self.filled_tx
            .send(segment)
            .map_err(|_| CaptureError::Disconnected)
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_round_trip() {
        let (mut queue, endpoint, _stop) = SegmentQueue::with_pool(2, 64, 1024);

        let mut buffer = endpoint.acquire().unwrap();
        buffer.extend_from_slice(b"hello");
        endpoint
            .submit(FrameSegment::new(buffer, 5, 0))
            .unwrap();

        let segment = queue.dequeue().unwrap();
        assert_eq!(segment.bytes(), b"hello");
        assert_eq!(segment.used_len(), 5);
        assert_eq!(segment.frame_total_len(), 5);

        queue.recycle(segment);

        // Recycled buffer comes back empty with its capacity intact
        let buffer = endpoint.acquire().unwrap();
        assert!(buffer.is_empty());
        assert!(buffer.capacity() >= 64);
    }

    #[test]
    fn test_stop_unblocks_dequeue() {
        let (mut queue, _endpoint, stop) = SegmentQueue::with_pool(1, 64, 1024);

        stop.stop();
        match queue.dequeue() {
            Err(CaptureError::Stopped) => {}
            other => panic!("expected Stopped, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_stop_unblocks_acquire() {
        let (_queue, endpoint, stop) = SegmentQueue::with_pool(1, 64, 1024);

        // Drain the single pooled buffer, then stop
        let _held = endpoint.acquire().unwrap();
        stop.stop();
        assert!(matches!(endpoint.acquire(), Err(CaptureError::Stopped)));
    }

    #[test]
    fn test_disconnected_producer() {
        let (mut queue, endpoint, _stop) = SegmentQueue::with_pool(1, 64, 1024);

        drop(endpoint);
        assert!(matches!(queue.dequeue(), Err(CaptureError::Disconnected)));
    }

    #[test]
    fn test_max_frame_len() {
        let (queue, _endpoint, _stop) = SegmentQueue::with_pool(1, 64, 40_000);
        assert_eq!(queue.max_frame_len(), 40_000);
    }
}
