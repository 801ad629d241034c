//! Threshold-based safety monitoring.
//!
//! Caller-driven metric checks over audio, visual, breathing, and session
//! duration. Exceedances surface as categorized, deduplicated alerts —
//! expected operating conditions, never errors — and clear when the metric
//! returns below threshold. Threshold comparisons are strict `>`: the
//! boundary value itself is safe.

use std::collections::HashMap;
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SafetySection;
use crate::timestamp::dt_sec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertCategory {
    Audio,
    Visual,
    Breathing,
    Duration,
}

impl AlertCategory {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Visual => "visual",
            Self::Breathing => "breathing",
            Self::Duration => "duration",
        }
    }
}

/// Ordered so `max` yields the worse severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertSeverity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SafetyLevel {
    Safe,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyAlert {
    pub category: AlertCategory,
    pub severity: AlertSeverity,
    pub message: String,
    pub ts_us: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyStatus {
    pub level: SafetyLevel,
    pub active_alerts: Vec<SafetyAlert>,
}

type AlertCallback = Box<dyn Fn(&SafetyAlert) + Send + Sync>;

pub struct SafetyMonitor {
    config: SafetySection,
    /// Per-category timestamp of the last fired alert, for dedup.
    last_fired_us: HashMap<AlertCategory, i64>,
    /// Currently-exceeded categories and their alerts.
    active: HashMap<AlertCategory, SafetyAlert>,
    /// Bounded record of everything fired this session.
    history: VecDeque<SafetyAlert>,
    subscribers: Vec<AlertCallback>,
    /// Set by `start_monitoring`; duration checks no-op while unset.
    monitoring_since_us: Option<i64>,
}

impl SafetyMonitor {
    pub fn new(config: SafetySection) -> Self {
        Self {
            config,
            last_fired_us: HashMap::new(),
            active: HashMap::new(),
            history: VecDeque::new(),
            subscribers: Vec::new(),
            monitoring_since_us: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SafetySection::default())
    }

    /// Register a push subscriber. Alerts are delivered synchronously at
    /// fire time, never swallowed or delayed.
    pub fn on_alert(&mut self, callback: impl Fn(&SafetyAlert) + Send + Sync + 'static) {
        self.subscribers.push(Box::new(callback));
    }

    /// Arm the session-duration timer. Audio/visual/breathing checks are
    /// caller-driven and unaffected.
    pub fn start_monitoring(&mut self, ts_us: i64) {
        if self.monitoring_since_us.is_none() {
            self.monitoring_since_us = Some(ts_us);
            debug!(ts_us, "duration monitoring started");
        }
    }

    /// Cancel the duration timer; no duration alert fires afterwards.
    pub fn stop_monitoring(&mut self) {
        self.monitoring_since_us = None;
        self.active.remove(&AlertCategory::Duration);
        debug!("duration monitoring stopped");
    }

    /// Sample the live output buffer: normalized peak above the critical
    /// threshold, RMS above the warning threshold.
    pub fn update_audio_metrics(&mut self, buffer: &[f32], ts_us: i64) {
        if buffer.is_empty() {
            return;
        }
        let peak = buffer.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        let rms = (buffer.iter().map(|s| s * s).sum::<f32>() / buffer.len() as f32).sqrt();

        if peak > self.config.audio_peak_critical {
            self.raise(
                AlertCategory::Audio,
                AlertSeverity::Critical,
                format!("audio peak {:.3} exceeds safe level", peak),
                ts_us,
            );
        } else if rms > self.config.audio_rms_warning {
            self.raise(
                AlertCategory::Audio,
                AlertSeverity::Warning,
                format!("audio RMS {:.3} is sustained above comfort level", rms),
                ts_us,
            );
        } else {
            self.clear(AlertCategory::Audio);
        }
    }

    /// Flash rates above 3 Hz are a photosensitive-seizure risk.
    pub fn update_visual_metrics(
        &mut self,
        flash_rate_hz: f32,
        brightness: f32,
        contrast: f32,
        ts_us: i64,
    ) {
        if flash_rate_hz > self.config.flash_rate_critical_hz {
            self.raise(
                AlertCategory::Visual,
                AlertSeverity::Critical,
                format!(
                    "flash rate {:.1} Hz is in the seizure-risk band (brightness {:.2}, contrast {:.2})",
                    flash_rate_hz, brightness, contrast
                ),
                ts_us,
            );
        } else {
            self.clear(AlertCategory::Visual);
        }
    }

    pub fn update_breathing_metrics(&mut self, breaths_per_minute: f32, ts_us: i64) {
        if breaths_per_minute > self.config.breathing_critical_bpm {
            self.raise(
                AlertCategory::Breathing,
                AlertSeverity::Critical,
                format!("breathing pace {:.1} bpm is too fast", breaths_per_minute),
                ts_us,
            );
        } else {
            self.clear(AlertCategory::Breathing);
        }
    }

    /// Duration check against the armed timer; inert unless
    /// `start_monitoring` ran and `stop_monitoring` has not.
    pub fn update_duration(&mut self, now_us: i64) {
        let Some(start) = self.monitoring_since_us else {
            return;
        };
        let elapsed_min = dt_sec(now_us, start) / 60.0;
        if elapsed_min > self.config.duration_critical_min {
            self.raise(
                AlertCategory::Duration,
                AlertSeverity::Critical,
                format!("session has run {:.0} minutes; end it now", elapsed_min),
                now_us,
            );
        } else if elapsed_min > self.config.duration_warning_min {
            self.raise(
                AlertCategory::Duration,
                AlertSeverity::Warning,
                format!("session has run {:.0} minutes; consider winding down", elapsed_min),
                now_us,
            );
        }
    }

    /// Max severity across active alerts plus the alerts themselves.
    pub fn status(&self) -> SafetyStatus {
        let level = self
            .active
            .values()
            .map(|a| match a.severity {
                AlertSeverity::Warning => SafetyLevel::Warning,
                AlertSeverity::Critical => SafetyLevel::Critical,
            })
            .max()
            .unwrap_or(SafetyLevel::Safe);
        SafetyStatus {
            level,
            active_alerts: self.active.values().cloned().collect(),
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &SafetyAlert> {
        self.history.iter()
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring_since_us.is_some()
    }

    fn raise(
        &mut self,
        category: AlertCategory,
        severity: AlertSeverity,
        message: String,
        ts_us: i64,
    ) {
        // Deduplicate within the window, unless severity escalated past the
        // active alert (a critical must never wait out a warning's window).
        if let Some(&last) = self.last_fired_us.get(&category) {
            let within_window = dt_sec(ts_us, last) < self.config.dedup_window_sec;
            let escalated = self
                .active
                .get(&category)
                .map(|a| severity > a.severity)
                .unwrap_or(false);
            if within_window && !escalated {
                return;
            }
        }

        let alert = SafetyAlert {
            category,
            severity,
            message,
            ts_us,
        };
        warn!(
            category = category.name(),
            severity = ?alert.severity,
            %alert.message,
            "safety alert"
        );
        self.last_fired_us.insert(category, ts_us);
        self.active.insert(category, alert.clone());
        self.history.push_back(alert.clone());
        while self.history.len() > self.config.max_history {
            self.history.pop_front();
        }
        for subscriber in &self.subscribers {
            subscriber(&alert);
        }
    }

    fn clear(&mut self, category: AlertCategory) {
        if self.active.remove(&category).is_some() {
            debug!(category = category.name(), "safety alert cleared");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const MIN_US: i64 = 60_000_000;

    fn monitor() -> SafetyMonitor {
        SafetyMonitor::with_defaults()
    }

    fn buffer_with_peak(peak: f32) -> Vec<f32> {
        let mut buf = vec![0.0f32; 256];
        buf[17] = peak;
        buf
    }

    #[test]
    fn audio_boundary_is_safe_above_is_critical() {
        let mut m = monitor();
        m.update_audio_metrics(&buffer_with_peak(0.89), 0);
        assert_eq!(m.status().level, SafetyLevel::Safe);

        m.update_audio_metrics(&buffer_with_peak(0.95), 1_000_000);
        assert_eq!(m.status().level, SafetyLevel::Critical);
    }

    #[test]
    fn audio_exact_boundary_value_is_safe() {
        let mut m = monitor();
        m.update_audio_metrics(&buffer_with_peak(0.90), 0);
        assert_eq!(m.status().level, SafetyLevel::Safe);
    }

    #[test]
    fn sustained_rms_is_a_warning() {
        let mut m = monitor();
        let buf = vec![0.8f32; 256];
        m.update_audio_metrics(&buf, 0);
        let status = m.status();
        assert_eq!(status.level, SafetyLevel::Warning);
        assert_eq!(status.active_alerts[0].category, AlertCategory::Audio);
    }

    #[test]
    fn visual_boundary_semantics_are_strict() {
        let mut m = monitor();
        m.update_visual_metrics(3.0, 0.5, 0.5, 0);
        assert_eq!(m.status().level, SafetyLevel::Safe);
        m.update_visual_metrics(3.1, 0.5, 0.5, 1_000_000);
        assert_eq!(m.status().level, SafetyLevel::Critical);
    }

    #[test]
    fn rapid_repeats_fire_exactly_one_callback() {
        let mut m = monitor();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        m.on_alert(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        m.update_visual_metrics(5.0, 0.9, 0.9, 1_000);
        m.update_visual_metrics(5.0, 0.9, 0.9, 2_000);
        m.update_visual_metrics(5.0, 0.9, 0.9, 3_000);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn alert_refires_after_dedup_window() {
        let mut m = monitor();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        m.on_alert(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        m.update_breathing_metrics(40.0, 0);
        m.update_breathing_metrics(40.0, 6_000_000); // past the 5 s window
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn escalation_is_not_deduplicated() {
        let mut m = monitor();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        m.on_alert(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        m.update_audio_metrics(&vec![0.8f32; 256], 0); // RMS warning
        m.update_audio_metrics(&buffer_with_peak(0.99), 1_000); // peak critical
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(m.status().level, SafetyLevel::Critical);
    }

    #[test]
    fn recovery_clears_the_alert() {
        let mut m = monitor();
        m.update_breathing_metrics(40.0, 0);
        assert_eq!(m.status().level, SafetyLevel::Critical);
        m.update_breathing_metrics(12.0, 1_000_000);
        assert_eq!(m.status().level, SafetyLevel::Safe);
        assert!(m.status().active_alerts.is_empty());
        // History still remembers the exceedance.
        assert_eq!(m.history().count(), 1);
    }

    #[test]
    fn duration_marks_fire_in_order_and_not_before() {
        let mut m = monitor();
        m.start_monitoring(0);
        m.update_duration(19 * MIN_US);
        assert_eq!(m.status().level, SafetyLevel::Safe);
        m.update_duration(21 * MIN_US);
        let status = m.status();
        assert_eq!(status.level, SafetyLevel::Warning);
        assert_eq!(status.active_alerts[0].category, AlertCategory::Duration);
        m.update_duration(46 * MIN_US);
        assert_eq!(m.status().level, SafetyLevel::Critical);
    }

    #[test]
    fn stopped_monitor_fires_no_duration_alert() {
        let mut m = monitor();
        m.start_monitoring(0);
        m.stop_monitoring();
        m.update_duration(60 * MIN_US);
        assert_eq!(m.status().level, SafetyLevel::Safe);
    }

    #[test]
    fn duration_without_start_is_inert() {
        let mut m = monitor();
        m.update_duration(90 * MIN_US);
        assert_eq!(m.status().level, SafetyLevel::Safe);
    }

    #[test]
    fn history_is_bounded() {
        let mut cfg = SafetySection::default();
        cfg.max_history = 3;
        cfg.dedup_window_sec = 0.5;
        let mut m = SafetyMonitor::new(cfg);
        for i in 0..10 {
            m.update_breathing_metrics(40.0, i * 1_000_000);
        }
        assert!(m.history().count() <= 3);
    }
}
