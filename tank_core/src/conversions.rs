//! `From` implementations bridging `tank_config` types to `tank_core` types.

use crate::config::RangingCfg;

impl From<&tank_config::SensorCfg> for RangingCfg {
    fn from(c: &tank_config::SensorCfg) -> Self {
        Self {
            echo_timeout_ms: c.echo_timeout_ms,
            inter_sample_delay_ms: c.inter_sample_delay_ms,
        }
    }
}
