//! Outlier rejection and smoothing.
//!
//! Each tick's three pings are reduced to their median, which rejects a
//! single spike or dropout. Accepted medians go into a circular buffer whose
//! mean is the smoothed distance.

use crate::ranging::Reading;

/// Median of three readings. Invalid readings order below every valid one,
/// so two or more invalid pings make the median invalid.
pub fn median_of_three(readings: [Reading; 3]) -> Reading {
    let mut r = readings;
    r.sort_by(|a, b| order_key(*a).total_cmp(&order_key(*b)));
    r[1]
}

#[inline]
fn order_key(r: Reading) -> f32 {
    r.cm().unwrap_or(f32::NEG_INFINITY)
}

/// Fixed-size circular buffer of accepted distances.
///
/// Slots that were never written hold 0 and are skipped by the mean.
#[derive(Debug, Clone)]
pub struct SmoothingFilter {
    slots: Vec<f32>,
    next: usize,
}

impl SmoothingFilter {
    pub fn new(window: usize) -> Self {
        Self {
            slots: vec![0.0; window.max(1)],
            next: 0,
        }
    }

    pub fn window(&self) -> usize {
        self.slots.len()
    }

    /// Reallocate to `window` slots, dropping every stored sample. Returns
    /// false (and keeps the contents) when the size is unchanged.
    pub fn resize(&mut self, window: usize) -> bool {
        let window = window.max(1);
        if window == self.slots.len() {
            return false;
        }
        self.slots = vec![0.0; window];
        self.next = 0;
        true
    }

    /// Store `cm` over the oldest slot. Non-positive or non-finite values
    /// are refused.
    pub fn push(&mut self, cm: f32) -> bool {
        if !(cm.is_finite() && cm > 0.0) {
            return false;
        }
        self.slots[self.next] = cm;
        self.next = (self.next + 1) % self.slots.len();
        true
    }

    /// Number of slots currently contributing to the mean.
    pub fn populated(&self) -> usize {
        self.slots.iter().filter(|v| **v > 0.0).count()
    }

    /// Mean of the populated slots, or `None` if there are none.
    pub fn estimate(&self) -> Option<f32> {
        let (sum, n) = self
            .slots
            .iter()
            .filter(|v| **v > 0.0)
            .fold((0.0f64, 0u32), |(s, n), v| (s + f64::from(*v), n + 1));
        if n == 0 {
            None
        } else {
            Some((sum / f64::from(n)) as f32)
        }
    }
}
