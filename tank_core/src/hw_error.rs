//! Maps `Box<dyn Error>` from trait boundaries to typed `LevelError`.
//!
//! The traits in `tank_traits` use `Box<dyn Error + Send + Sync>`; this module
//! converts those to our typed error enum, with an optional feature-gated path
//! for `tank_hardware::HwError` downcasting.

use crate::error::LevelError;

/// Map a trait-boundary error to a typed `LevelError`.
///
/// Known hardware errors are downcast first, then string heuristics apply.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> LevelError {
    #[cfg(feature = "hardware-errors")]
    {
        use tank_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::EchoTimeout => LevelError::Timeout,
                HwError::AddressOutOfRange { .. }
                | HwError::CommitFailed(_)
                | HwError::Io(_) => LevelError::Storage(hw.to_string()),
                HwError::Gpio(_) => LevelError::HardwareFault(hw.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        LevelError::Timeout
    } else {
        LevelError::Hardware(s)
    }
}

/// Like [`map_hw_error`], but storage-side failures that are not otherwise
/// recognized are reported as `Storage`.
pub fn map_storage_error(e: &(dyn std::error::Error + 'static)) -> LevelError {
    match map_hw_error(e) {
        LevelError::Hardware(s) | LevelError::HardwareFault(s) => LevelError::Storage(s),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_timeout_text_maps_to_timeout() {
        let e = std::io::Error::other("echo timeout on pin 18");
        assert!(matches!(map_hw_error(&e), LevelError::Timeout));
    }

    #[test]
    fn unknown_storage_error_maps_to_storage() {
        let e = std::io::Error::other("flash busy");
        assert!(matches!(map_storage_error(&e), LevelError::Storage(_)));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hardware_errors_are_downcast() {
        use tank_hardware::error::HwError;
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(HwError::EchoTimeout);
        assert!(matches!(map_hw_error(&*boxed), LevelError::Timeout));
        let boxed: Box<dyn std::error::Error + Send + Sync> =
            Box::new(HwError::Gpio("pin busy".into()));
        assert!(matches!(map_hw_error(&*boxed), LevelError::HardwareFault(_)));
        let boxed: Box<dyn std::error::Error + Send + Sync> =
            Box::new(HwError::CommitFailed("flash".into()));
        assert!(matches!(map_hw_error(&*boxed), LevelError::Storage(_)));
    }
}
