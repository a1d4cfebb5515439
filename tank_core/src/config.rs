//! Runtime configuration for the ranging front end.
//!
//! Separate from the TOML-deserialized config in `tank_config`; see
//! `conversions` for the bridge.

use std::time::Duration;

/// Pings taken per tick; the median of these feeds the smoothing buffer.
pub const SAMPLES_PER_TICK: usize = 3;

#[derive(Debug, Clone)]
pub struct RangingCfg {
    /// Max wait for one echo (ms).
    pub echo_timeout_ms: u64,
    /// Pause between the pings of one tick (ms).
    pub inter_sample_delay_ms: u64,
}

impl Default for RangingCfg {
    fn default() -> Self {
        Self {
            echo_timeout_ms: 30,
            inter_sample_delay_ms: 10,
        }
    }
}

impl RangingCfg {
    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }

    pub fn inter_sample_delay(&self) -> Duration {
        Duration::from_millis(self.inter_sample_delay_ms)
    }
}
