//! Multipart streaming session
//!
//! One session serves one accepted connection: preamble once, delimiter
//! once, then assemble-and-send parts until the peer disconnects or the
//! frame source fails. The session owns the frame buffer for its whole
//! lifetime; nothing here is shared between connections.

mod stats;

pub use stats::SessionStats;

use std::io::{self, ErrorKind, Write};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use crate::capture::FrameSource;
use crate::frame::{assemble_frame, AssembleError, FrameBuffer};
use crate::http;

// Progress summary cadence, in frames
const STATS_LOG_INTERVAL: u64 = 100;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("frame buffer capacity {capacity} is below the source's maximum frame length {max_frame_len}")]
    BufferTooSmall {
        capacity: usize,
        max_frame_len: usize,
    },

    #[error("frame assembly failed: {0}")]
    Assemble(#[from] AssembleError),

    #[error("send failed: {0}")]
    Io(#[from] io::Error),
}

/// Sends the whole slice, retrying short writes until done.
///
/// A send may transmit fewer bytes than requested; the remaining tail is
/// retried in order. Interrupted writes are retried silently, a zero-length
/// write means the peer stopped accepting data.
pub fn write_fully<W: Write>(writer: &mut W, mut bytes: &[u8]) -> io::Result<()> {
    while !bytes.is_empty() {
        match writer.write(bytes) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "peer stopped accepting data",
                ))
            }
            Ok(n) => bytes = &bytes[n..],
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Per-connection multipart streaming state machine
pub struct StreamSession {
    buffer: FrameBuffer,
    frame_delay: Duration,
    stats: SessionStats,
}

impl StreamSession {
    /// Creates a session owning a frame buffer of `capacity` bytes
    pub fn new(capacity: usize, frame_delay: Duration) -> Self {
        Self {
            buffer: FrameBuffer::with_capacity(capacity),
            frame_delay,
            stats: SessionStats::default(),
        }
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Streams frames to `conn` until an unrecoverable error.
    ///
    /// Errors abort before the next protocol element is started, so a
    /// partial part is never followed by more output. The returned error is
    /// the reason the session ended; the caller closes the connection.
    pub fn run<C, S>(&mut self, conn: &mut C, source: &mut S) -> Result<(), SessionError>
    where
        C: Write,
        S: FrameSource,
    {
        let capacity = self.buffer.capacity();
        let max_frame_len = source.max_frame_len();
        if capacity < max_frame_len {
            return Err(SessionError::BufferTooSmall {
                capacity,
                max_frame_len,
            });
        }

        self.send(conn, http::PREAMBLE.as_bytes())?;
        self.send(conn, http::DELIMITER.as_bytes())?;
        conn.flush()?;

        let mut last_report = (Instant::now(), self.stats.clone());

        loop {
            assemble_frame(source, &mut self.buffer)?;

            let started = Instant::now();
            let header = http::render_part_header(self.buffer.len());
            self.send(conn, header.as_bytes())?;
            self.send_frame_body(conn)?;
            self.send(conn, http::DELIMITER.as_bytes())?;
            conn.flush()?;

            self.stats.frames_sent += 1;
            self.stats.bytes_sent += self.buffer.len() as u64;

            debug!(
                frame_len = self.buffer.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "frame transmitted"
            );

            if self.stats.frames_sent % STATS_LOG_INTERVAL == 0 {
                let (since, previous) = &last_report;
                let elapsed = since.elapsed().as_secs_f64();
                info!(
                    frames = self.stats.frames_sent,
                    fps = %format!("{:.1}", self.stats.calculate_fps(previous, elapsed)),
                    kbps = %format!(
                        "{:.0}",
                        self.stats.calculate_bitrate_kbps(previous, elapsed)
                    ),
                    "Streaming progress"
                );
                last_report = (Instant::now(), self.stats.clone());
            }

            if !self.frame_delay.is_zero() {
                thread::sleep(self.frame_delay);
            }
        }
    }

    fn send<C: Write>(&mut self, conn: &mut C, bytes: &[u8]) -> Result<(), SessionError> {
        write_fully(conn, bytes).map_err(|e| {
            self.stats.send_errors += 1;
            SessionError::Io(e)
        })
    }

    // Split out so the borrow of the buffer does not overlap `send`'s
    // mutable borrow of the stats.
    fn send_frame_body<C: Write>(&mut self, conn: &mut C) -> Result<(), SessionError> {
        match write_fully(conn, self.buffer.as_slice()) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.stats.send_errors += 1;
                Err(SessionError::Io(e))
            }
        }
    }
}
