//! Edge-triggered low/high alerts.
//!
//! Each side is a two-state latch: it fires once on entering its region and
//! re-arms silently on leaving it. Disabling alerts clears both latches
//! without emitting anything, so re-enabling while still in a region fires
//! again.

use std::fmt;

use serde::Serialize;

use crate::settings::AlertThresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertKind {
    Low,
    High,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlertKind::Low => "LOW",
            AlertKind::High => "HIGH",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub percentage: f32,
    pub threshold: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertState {
    pub low_active: bool,
    pub high_active: bool,
}

impl AlertState {
    /// Advance both latches for a new percentage and return the alerts that
    /// fired on this transition.
    pub fn evaluate(&mut self, percentage: f32, thresholds: &AlertThresholds) -> Vec<AlertEvent> {
        if !thresholds.alerts_enabled {
            *self = AlertState::default();
            return Vec::new();
        }

        let mut events = Vec::new();

        let low = f32::from(thresholds.low_percent);
        if percentage <= low {
            if !self.low_active {
                self.low_active = true;
                events.push(AlertEvent {
                    kind: AlertKind::Low,
                    percentage,
                    threshold: thresholds.low_percent,
                });
            }
        } else {
            self.low_active = false;
        }

        let high = f32::from(thresholds.high_percent);
        if percentage >= high {
            if !self.high_active {
                self.high_active = true;
                events.push(AlertEvent {
                    kind: AlertKind::High,
                    percentage,
                    threshold: thresholds.high_percent,
                });
            }
        } else {
            self.high_active = false;
        }

        events
    }
}
