//! Utility functions for `std::time`.

use std::time::{Duration, SystemTime};

/// Extension trait providing additional functionality for [SystemTime].
pub trait SystemTimeExt {
    /// Returns the duration since the Unix epoch.
    ///
    /// Panics if the system time is before the Unix epoch.
    fn epoch(&self) -> Duration;

    /// Returns the number of milliseconds (rounded down) since the Unix epoch.
    ///
    /// Panics if the system time is before the Unix epoch.
    /// Saturates at [u64::MAX].
    fn epoch_millis(&self) -> u64;

    /// Returns the timeslot containing this time for slots of `slot` length.
    ///
    /// Panics if `slot` is shorter than one millisecond.
    fn timeslot(&self, slot: Duration) -> u64;
}

impl SystemTimeExt for SystemTime {
    fn epoch(&self) -> Duration {
        self.duration_since(std::time::UNIX_EPOCH)
            .expect("failed to calculate time since epoch")
    }

    fn epoch_millis(&self) -> u64 {
        self.epoch().as_millis().min(u64::MAX as u128) as u64
    }

    fn timeslot(&self, slot: Duration) -> u64 {
        let slot = slot.as_millis() as u64;
        assert!(slot > 0, "timeslot must be at least 1ms");
        self.epoch_millis() / slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    #[test]
    fn test_epoch() {
        let time = UNIX_EPOCH + Duration::from_millis(1_500);
        assert_eq!(time.epoch(), Duration::from_millis(1_500));
        assert_eq!(time.epoch_millis(), 1_500);
    }

    #[test]
    fn test_timeslot() {
        let slot = Duration::from_secs(2);
        assert_eq!(UNIX_EPOCH.timeslot(slot), 0);
        assert_eq!((UNIX_EPOCH + Duration::from_millis(1_999)).timeslot(slot), 0);
        assert_eq!((UNIX_EPOCH + Duration::from_secs(2)).timeslot(slot), 1);
        assert_eq!((UNIX_EPOCH + Duration::from_secs(21)).timeslot(slot), 10);
    }

    #[test]
    #[should_panic(expected = "failed to calculate time since epoch")]
    fn test_before_epoch() {
        let time = UNIX_EPOCH - Duration::from_secs(1);
        time.epoch();
    }
}
