//! Types for use as [crate::Read::Cfg].

use core::ops::{Bound, RangeBounds};

/// Configuration for limiting the length of a decoded collection.
///
/// # Examples
///
/// ```
/// use shardbft_codec::RangeCfg;
///
/// let cfg = RangeCfg::from(0..=1024);
/// assert!(cfg.contains(500));
/// assert!(!cfg.contains(2000));
///
/// let cfg = RangeCfg::from(1..);
/// assert!(cfg.contains(1));
/// assert!(!cfg.contains(0));
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct RangeCfg {
    start: Bound<usize>,
    end: Bound<usize>,
}

impl RangeCfg {
    /// Creates a new `RangeCfg` from any range over `usize`.
    pub fn new(range: impl RangeBounds<usize>) -> Self {
        Self {
            start: range.start_bound().cloned(),
            end: range.end_bound().cloned(),
        }
    }

    /// Creates a `RangeCfg` that only admits exactly `len` items.
    pub fn exact(len: usize) -> Self {
        Self::new(len..=len)
    }

    /// Returns whether `len` is admitted by the configured range.
    pub fn contains(&self, len: usize) -> bool {
        (self.start, self.end).contains(&len)
    }
}

macro_rules! impl_from_range {
    ($range:ty) => {
        impl From<$range> for RangeCfg {
            fn from(range: $range) -> Self {
                Self::new(range)
            }
        }
    };
}

impl_from_range!(core::ops::Range<usize>);
impl_from_range!(core::ops::RangeInclusive<usize>);
impl_from_range!(core::ops::RangeFrom<usize>);
impl_from_range!(core::ops::RangeTo<usize>);
impl_from_range!(core::ops::RangeToInclusive<usize>);
impl_from_range!(core::ops::RangeFull);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_cfg() {
        let cfg = RangeCfg::from(2..5);
        assert!(!cfg.contains(1));
        assert!(cfg.contains(2));
        assert!(cfg.contains(4));
        assert!(!cfg.contains(5));

        let cfg = RangeCfg::from(..);
        assert!(cfg.contains(0));
        assert!(cfg.contains(usize::MAX));

        let cfg = RangeCfg::exact(3);
        assert!(cfg.contains(3));
        assert!(!cfg.contains(2));
        assert!(!cfg.contains(4));
    }
}
