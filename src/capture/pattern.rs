//! Synthetic test-pattern camera
//!
//! Stands in for real capture hardware: a producer thread synthesizes
//! minimal JPEG frames at a configured rate and pushes them through a
//! [`SegmentQueue`] in driver-sized chunks. Real hardware integrates by
//! feeding a [`DriverEndpoint`] the same way.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::queue::{DriverEndpoint, SegmentQueue, StopHandle};
use super::{CaptureError, FrameSegment, FrameSource};
use crate::config::Config;

/// Pattern camera configuration
#[derive(Debug, Clone)]
pub struct PatternConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub segment_len: usize,
    pub pool: usize,
    pub max_frame_len: usize,
}

impl From<&Config> for PatternConfig {
    fn from(config: &Config) -> Self {
        let cfg = &config.mjpeg_http;
        Self {
            width: cfg.camera.width,
            height: cfg.camera.height,
            fps: cfg.camera.fps,
            segment_len: cfg.camera.segment_len,
            pool: cfg.camera.pool,
            max_frame_len: cfg.stream.max_frame_len,
        }
    }
}

/// Synthetic camera emitting deterministic JPEG test frames
pub struct PatternCamera {
    queue: SegmentQueue,
    stop: StopHandle,
    producer: Option<thread::JoinHandle<()>>,
}

impl PatternCamera {
    /// Spawns the producer thread and returns the consumer side
    pub fn spawn(config: PatternConfig) -> Self {
        let (queue, endpoint, stop) =
            SegmentQueue::with_pool(config.pool, config.segment_len, config.max_frame_len);

        info!(
            resolution = %format!("{}x{}", config.width, config.height),
            fps = %config.fps,
            segment_len = %config.segment_len,
            pool = %config.pool,
            "Starting pattern camera"
        );

        let producer = thread::Builder::new()
            .name("pattern-camera".to_string())
            .spawn(move || produce(config, endpoint))
            .expect("failed to spawn pattern camera thread");

        Self {
            queue,
            stop,
            producer: Some(producer),
        }
    }

    /// Handle that stops both producer and consumer
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}

impl FrameSource for PatternCamera {
    fn dequeue(&mut self) -> Result<FrameSegment, CaptureError> {
        self.queue.dequeue()
    }

    fn recycle(&mut self, segment: FrameSegment) {
        self.queue.recycle(segment);
    }

    fn max_frame_len(&self) -> usize {
        self.queue.max_frame_len()
    }
}

impl Drop for PatternCamera {
    fn drop(&mut self) {
        self.stop.stop();
        if let Some(producer) = self.producer.take() {
            let _ = producer.join();
        }
    }
}

fn produce(config: PatternConfig, endpoint: DriverEndpoint) {
    let period = Duration::from_secs(1) / config.fps.max(1);
    let start = Instant::now();
    let mut index = 0u64;

    loop {
        if endpoint.is_stopped() {
            break;
        }

        let tick = Instant::now();
        let frame = pattern_jpeg(index, payload_len(&config, index));
        let timestamp_ms = start.elapsed().as_millis() as u64;

        if push_frame(&endpoint, &frame, config.segment_len, timestamp_ms).is_err() {
            break;
        }
        index += 1;

        let elapsed = tick.elapsed();
        if elapsed < period {
            thread::sleep(period - elapsed);
        }
    }

    debug!(frames = index, "Pattern camera producer stopped");
}

/// Splits one frame into pooled segments, blocking on the free pool
fn push_frame(
    endpoint: &DriverEndpoint,
    frame: &[u8],
    segment_len: usize,
    timestamp_ms: u64,
) -> Result<(), CaptureError> {
    for chunk in frame.chunks(segment_len) {
        let mut buffer = endpoint.acquire()?;
        buffer.extend_from_slice(chunk);
        endpoint.submit(FrameSegment::new(buffer, frame.len(), timestamp_ms))?;
    }
    Ok(())
}

/// Payload length for frame `index`, varied slightly to exercise reassembly
fn payload_len(config: &PatternConfig, index: u64) -> usize {
    let base = (config.width as usize * config.height as usize) / 20;
    let vary = (index % 4) as usize * 61;
    (base + vary).clamp(16, config.max_frame_len.saturating_sub(4))
}

/// Minimal JPEG frame: SOI marker, deterministic payload, EOI marker
fn pattern_jpeg(index: u64, payload_len: usize) -> Vec<u8> {
    let mut jpeg = Vec::with_capacity(payload_len + 4);
    jpeg.extend_from_slice(&[0xFF, 0xD8]); // SOI
    jpeg.extend((0..payload_len).map(|i| ((i as u64 + index * 31) % 256) as u8));
    jpeg.extend_from_slice(&[0xFF, 0xD9]); // EOI
    jpeg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{assemble_frame, FrameBuffer};

    fn small_config() -> PatternConfig {
        PatternConfig {
            width: 64,
            height: 64,
            fps: 60,
            segment_len: 128,
            pool: 3,
            max_frame_len: 4096,
        }
    }

    #[test]
    fn test_pattern_jpeg_markers() {
        let jpeg = pattern_jpeg(0, 100);
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
        assert_eq!(jpeg.len(), 104);
    }

    #[test]
    fn test_payload_len_bounded() {
        let config = small_config();
        for index in 0..8 {
            let len = payload_len(&config, index);
            assert!(len >= 16);
            assert!(len <= config.max_frame_len - 4);
        }
    }

    #[test]
    fn test_frames_assemble_from_camera() {
        let mut camera = PatternCamera::spawn(small_config());
        let mut buffer = FrameBuffer::with_capacity(4096);

        for _ in 0..2 {
            assemble_frame(&mut camera, &mut buffer).unwrap();
            let frame = buffer.as_slice();
            assert_eq!(&frame[..2], &[0xFF, 0xD8]);
            assert_eq!(&frame[frame.len() - 2..], &[0xFF, 0xD9]);
        }
    }

    #[test]
    fn test_stop_ends_stream() {
        let mut camera = PatternCamera::spawn(small_config());
        camera.stop_handle().stop();

        // Producer winds down; dequeue reports the stop instead of blocking
        assert!(matches!(camera.dequeue(), Err(CaptureError::Stopped)));
    }
}
