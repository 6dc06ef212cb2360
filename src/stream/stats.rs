//! Streaming session statistics

use serde::{Deserialize, Serialize};

/// Statistics for one multipart streaming session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStats {
    /// Total frames fully transmitted
    pub frames_sent: u64,

    /// Total frame-body bytes transmitted
    pub bytes_sent: u64,

    /// Number of failed sends
    pub send_errors: u64,
}

impl SessionStats {
    /// Calculates frame rate based on delta
    pub fn calculate_fps(&self, previous: &Self, elapsed_secs: f64) -> f64 {
        if elapsed_secs == 0.0 {
            return 0.0;
        }

        let frames_delta = self.frames_sent.saturating_sub(previous.frames_sent);
        frames_delta as f64 / elapsed_secs
    }

    /// Calculates bitrate in kbps based on delta
    pub fn calculate_bitrate_kbps(&self, previous: &Self, elapsed_secs: f64) -> f64 {
        if elapsed_secs == 0.0 {
            return 0.0;
        }

        let bytes_delta = self.bytes_sent.saturating_sub(previous.bytes_sent);
        (bytes_delta as f64 * 8.0) / elapsed_secs / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_fps() {
        let prev = SessionStats {
            frames_sent: 100,
            ..Default::default()
        };

        let current = SessionStats {
            frames_sent: 130,
            ..Default::default()
        };

        let fps = current.calculate_fps(&prev, 1.0);
        assert_eq!(fps, 30.0);
    }

    #[test]
    fn test_calculate_bitrate() {
        let prev = SessionStats {
            bytes_sent: 0,
            ..Default::default()
        };

        let current = SessionStats {
            bytes_sent: 125_000, // 125KB in 1 second = 1000 kbps
            ..Default::default()
        };

        let bitrate = current.calculate_bitrate_kbps(&prev, 1.0);
        assert_eq!(bitrate, 1000.0);
    }

    #[test]
    fn test_zero_elapsed() {
        let stats = SessionStats::default();
        assert_eq!(stats.calculate_fps(&stats, 0.0), 0.0);
        assert_eq!(stats.calculate_bitrate_kbps(&stats, 0.0), 0.0);
    }
}
