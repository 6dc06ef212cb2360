//! Sequential accept loop
//!
//! One connection at a time: accept, discard the request, stream until the
//! session ends, close, accept again. Accept failures are logged and
//! retried; nothing that happens on one connection outlives it.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use tracing::{info, warn};

use crate::capture::{CaptureError, FrameSource};
use crate::config::Config;
use crate::frame::AssembleError;
use crate::http::{discard_request, RequestOutcome};
use crate::stream::{SessionError, StreamSession};

/// Single-client MJPEG-over-HTTP server
pub struct Server {
    listener: TcpListener,
    buffer_capacity: usize,
    frame_delay: Duration,
}

impl Server {
    /// Binds the listener on all interfaces at the configured port
    pub fn bind(config: &Config) -> io::Result<Self> {
        let cfg = &config.mjpeg_http;
        let listener = TcpListener::bind(("0.0.0.0", cfg.server.port))?;

        Ok(Self {
            listener,
            buffer_capacity: cfg.stream.max_frame_len,
            frame_delay: cfg.stream.frame_delay(),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves connections sequentially until the frame source is stopped.
    ///
    /// Every error on a connection ends that connection only; the loop
    /// returns once the source reports it has been stopped via its stop
    /// handle.
    pub fn run<S: FrameSource>(&self, source: &mut S) -> io::Result<()> {
        let mut counter = 0u64;

        loop {
            let (mut conn, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "Accept failed, continuing");
                    continue;
                }
            };

            counter += 1;
            info!(connection = counter, peer = %peer, "Client connected");

            match discard_request(&mut conn) {
                Ok(RequestOutcome::HeadersEnded) => {
                    let mut session =
                        StreamSession::new(self.buffer_capacity, self.frame_delay);
                    let ended = session.run(&mut conn, source);
                    let stats = session.stats();
                    match &ended {
                        Err(SessionError::Assemble(AssembleError::Source(
                            CaptureError::Stopped,
                        ))) => {
                            info!(peer = %peer, "Frame source stopped, shutting down");
                            return Ok(());
                        }
                        Err(reason) => info!(
                            peer = %peer,
                            frames = stats.frames_sent,
                            bytes = stats.bytes_sent,
                            reason = %reason,
                            "Session ended"
                        ),
                        Ok(()) => info!(
                            peer = %peer,
                            frames = stats.frames_sent,
                            "Session ended"
                        ),
                    }
                }
                Ok(RequestOutcome::PeerClosed) => {
                    info!(peer = %peer, "Peer closed before completing its request");
                }
                Err(e) => {
                    warn!(peer = %peer, error = %e, "Error receiving request");
                }
            }

            // Dropping the stream closes the socket
            info!(peer = %peer, "Connection closed");
        }
    }
}
