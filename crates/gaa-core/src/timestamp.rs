//! Timestamp tracking with strict monotonicity enforcement.
//!
//! All engine entry points take caller-provided microsecond timestamps;
//! consolidating them here prevents time-travel bugs between the control
//! tick and the duration-based safety checks.

use serde::{Deserialize, Serialize};

/// Seconds between two microsecond timestamps.
pub fn dt_sec(now_us: i64, then_us: i64) -> f32 {
    (now_us - then_us) as f32 / 1_000_000.0
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TimestampLog {
    /// Last control tick timestamp.
    pub last_control: Option<i64>,
    /// Last render-side advance timestamp.
    pub last_advance: Option<i64>,
    /// Session start timestamp.
    pub session_start: Option<i64>,
}

impl TimestampLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a control tick, returning the delta since the previous one
    /// in seconds (0.0 on the first tick). Rejects regressions.
    pub fn update_control(&mut self, ts_us: i64) -> Result<f32, String> {
        Self::check_monotonic(self.last_control, ts_us, "control")?;
        let dt = self.last_control.map(|last| dt_sec(ts_us, last)).unwrap_or(0.0);
        self.last_control = Some(ts_us);
        Ok(dt)
    }

    /// Record a ramp-advance step, returning the delta in seconds.
    pub fn update_advance(&mut self, ts_us: i64) -> Result<f32, String> {
        Self::check_monotonic(self.last_advance, ts_us, "advance")?;
        let dt = self.last_advance.map(|last| dt_sec(ts_us, last)).unwrap_or(0.0);
        self.last_advance = Some(ts_us);
        Ok(dt)
    }

    pub fn start_session(&mut self, ts_us: i64) {
        if self.session_start.is_none() {
            self.session_start = Some(ts_us);
        }
    }

    pub fn end_session(&mut self) {
        self.session_start = None;
    }

    /// Elapsed session time in seconds, 0.0 when no session is running.
    pub fn session_duration(&self, now_us: i64) -> f32 {
        self.session_start.map(|s| dt_sec(now_us, s)).unwrap_or(0.0)
    }

    fn check_monotonic(last: Option<i64>, now: i64, context: &str) -> Result<(), String> {
        if let Some(last) = last {
            if now < last {
                return Err(format!(
                    "timestamp regression in {}: now={} < last={}",
                    context, now, last
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regression_is_rejected() {
        let mut log = TimestampLog::new();
        assert!(log.update_control(1_000).is_ok());
        assert!(log.update_control(2_000).is_ok());
        let err = log.update_control(1_500).unwrap_err();
        assert!(err.contains("regression"));
    }

    #[test]
    fn control_delta() {
        let mut log = TimestampLog::new();
        assert_eq!(log.update_control(1_000_000).unwrap(), 0.0);
        assert_eq!(log.update_control(1_500_000).unwrap(), 0.5);
    }

    #[test]
    fn session_duration_tracks_start() {
        let mut log = TimestampLog::new();
        log.start_session(1_000_000);
        // A second start does not reset the origin.
        log.start_session(5_000_000);
        assert_eq!(log.session_duration(2_500_000), 1.5);
        log.end_session();
        assert_eq!(log.session_duration(9_000_000), 0.0);
    }
}
