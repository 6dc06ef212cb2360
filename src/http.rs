//! HTTP request discard and multipart wire format
//!
//! The server never interprets the client's request; it only scans for the
//! end of the header block so the client does not see a connection reset
//! from unread data. The response side is a byte-for-byte
//! `multipart/x-mixed-replace` contract.

use std::io::{self, ErrorKind, Read};

use tracing::trace;

/// Boundary token separating successive frames
pub const BOUNDARY_TOKEN: &str = "123456789000000000000987654321";

/// Response preamble, sent once per connection.
///
/// Ends with a single CRLF: the leading CRLF of the first delimiter
/// completes the header block.
pub const PREAMBLE: &str = concat!(
    "HTTP/1.1 200 OK\r\n",
    "Access-Control-Allow-Origin: *\r\n",
    "Content-Type: multipart/x-mixed-replace; boundary=",
    "123456789000000000000987654321",
    "\r\n"
);

/// Delimiter between parts (and before the first part)
pub const DELIMITER: &str = concat!("\r\n--", "123456789000000000000987654321", "\r\n");

const PART_HEADER_PREFIX: &str = "Content-Type: image/jpeg\r\nContent-Length: ";

/// Renders the per-part header block for a frame of `len` bytes
pub fn render_part_header(len: usize) -> String {
    format!("{}{}\r\n\r\n", PART_HEADER_PREFIX, len)
}

/// Progress through the CR LF CR LF end-of-headers sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    Start,
    Cr,
    CrLf,
    CrLfCr,
}

/// Outcome of feeding one byte to the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProgress {
    More(HeaderState),
    Done,
}

impl HeaderState {
    /// Pure transition function for one request byte.
    ///
    /// Any mismatching byte resets to `Start` and is not re-examined, so a
    /// CR that breaks a partial match does not itself begin a new one.
    pub fn feed(self, byte: u8) -> HeaderProgress {
        match (self, byte) {
            (HeaderState::Start, b'\r') => HeaderProgress::More(HeaderState::Cr),
            (HeaderState::Cr, b'\n') => HeaderProgress::More(HeaderState::CrLf),
            (HeaderState::CrLf, b'\r') => HeaderProgress::More(HeaderState::CrLfCr),
            (HeaderState::CrLfCr, b'\n') => HeaderProgress::Done,
            _ => HeaderProgress::More(HeaderState::Start),
        }
    }
}

/// How the request-discard phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Full `\r\n\r\n` seen; the response may begin
    HeadersEnded,
    /// Peer closed before completing its header block
    PeerClosed,
}

/// Reads and discards the client's request up to the end of its headers.
///
/// Single-byte blocking reads; interrupted and would-block reads are
/// retried silently, a zero-length read reports [`RequestOutcome::PeerClosed`]
/// and any other I/O failure propagates.
pub fn discard_request<R: Read>(conn: &mut R) -> io::Result<RequestOutcome> {
    let mut state = HeaderState::Start;
    let mut byte = [0u8; 1];

    loop {
        match conn.read(&mut byte) {
            Ok(0) => return Ok(RequestOutcome::PeerClosed),
            Ok(_) => match state.feed(byte[0]) {
                HeaderProgress::Done => {
                    trace!("request headers discarded");
                    return Ok(RequestOutcome::HeadersEnded);
                }
                HeaderProgress::More(next) => state = next,
            },
            Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {
                continue
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scan(bytes: &[u8]) -> Option<usize> {
        let mut state = HeaderState::Start;
        for (i, &b) in bytes.iter().enumerate() {
            match state.feed(b) {
                HeaderProgress::Done => return Some(i),
                HeaderProgress::More(next) => state = next,
            }
        }
        None
    }

    #[test]
    fn test_detects_terminator_exactly() {
        assert_eq!(scan(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"), Some(26));
    }

    #[test]
    fn test_empty_header_block() {
        assert_eq!(scan(b"\r\n\r\n"), Some(3));
    }

    #[test]
    fn test_incomplete_terminator_never_completes() {
        assert_eq!(scan(b"GET / HTTP/1.1\r\n\r"), None);
        assert_eq!(scan(b"\r\n\r"), None);
        assert_eq!(scan(b"no terminator at all"), None);
    }

    #[test]
    fn test_mismatch_resets_without_reexamination() {
        // The second CR breaks the match and does not itself start one,
        // so CR CR LF CR LF never completes...
        assert_eq!(scan(b"\r\r\n\r\n"), None);
        // ...while a later clean CRLFCRLF does.
        assert_eq!(scan(b"\r\r\n\r\nX\r\n\r\n"), Some(9));
    }

    #[test]
    fn test_lone_lf_resets() {
        assert_eq!(scan(b"\r\n\n\r\n"), None);
    }

    #[test]
    fn test_discard_request_completes() {
        let mut conn = Cursor::new(b"GET / HTTP/1.1\r\nHost: x\r\n\r\nTRAILING".to_vec());
        let outcome = discard_request(&mut conn).unwrap();
        assert_eq!(outcome, RequestOutcome::HeadersEnded);

        // Exactly the header block was consumed
        assert_eq!(conn.position(), 27);
    }

    #[test]
    fn test_discard_request_peer_closed() {
        let mut conn = Cursor::new(b"GET / HTTP/1.1\r\n".to_vec());
        let outcome = discard_request(&mut conn).unwrap();
        assert_eq!(outcome, RequestOutcome::PeerClosed);
    }

    #[test]
    fn test_wire_constants_consistent() {
        assert!(PREAMBLE.contains(BOUNDARY_TOKEN));
        assert!(PREAMBLE.ends_with("\r\n"));
        assert!(!PREAMBLE.ends_with("\r\n\r\n"));
        assert_eq!(DELIMITER, format!("\r\n--{}\r\n", BOUNDARY_TOKEN));
    }

    #[test]
    fn test_part_header_rendering() {
        assert_eq!(
            render_part_header(15364),
            "Content-Type: image/jpeg\r\nContent-Length: 15364\r\n\r\n"
        );
        assert_eq!(
            render_part_header(0),
            "Content-Type: image/jpeg\r\nContent-Length: 0\r\n\r\n"
        );
    }
}
