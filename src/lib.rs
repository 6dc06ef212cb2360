//! Single-client MJPEG streaming over HTTP `multipart/x-mixed-replace`
//!
//! This library reassembles variably-chunked camera frame-buffer segments
//! into complete JPEG frames and streams them to one HTTP client at a time:
//! - Fixed-capacity frame reassembly with structural bounds checks
//! - Byte-exact multipart framing (preamble, part headers, delimiters)
//! - Fully blocking, single-threaded pipeline with structural backpressure
//! - Queue-pair frame source boundary mirroring driver buffer pools
//!
//! # Example
//!
//! ```no_run
//! use rust_mjpeg_http::capture::{PatternCamera, PatternConfig};
//! use rust_mjpeg_http::{Config, Server};
//!
//! let config = Config::default();
//! let mut camera = PatternCamera::spawn(PatternConfig::from(&config));
//! let server = Server::bind(&config).unwrap();
//! server.run(&mut camera).unwrap();
//! ```

pub mod capture;
pub mod config;
pub mod frame;
pub mod http;
pub mod server;
pub mod stream;

// Re-exports for convenience
pub use capture::{DriverEndpoint, FrameSegment, FrameSource, SegmentQueue, StopHandle};
pub use config::Config;
pub use frame::{assemble_frame, AssembleError, FrameBuffer};
pub use server::Server;
pub use stream::{SessionStats, StreamSession};
