// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use core::{fmt, ops, time::Duration};

/// An absolute point in time, measured from the owning clock's epoch.
///
/// Timestamps are opaque and only meaningful when compared against others
/// sourced from the same clock; they are not related to calendar time.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// Creates a `Timestamp` from a `Duration` since the clock's epoch
    #[inline]
    pub const fn from_duration(duration: Duration) -> Self {
        Self(duration)
    }

    /// The `Duration` since the clock's epoch
    #[inline]
    pub const fn as_duration(self) -> Duration {
        self.0
    }

    /// True when this point is at or before `now`
    #[inline]
    pub fn has_elapsed(self, now: Timestamp) -> bool {
        self <= now
    }

    #[inline]
    pub fn checked_add(self, duration: Duration) -> Option<Self> {
        self.0.checked_add(duration).map(Self)
    }

    #[inline]
    pub fn checked_sub(self, duration: Duration) -> Option<Self> {
        self.0.checked_sub(duration).map(Self)
    }

    /// The `Duration` elapsed since `earlier`, or zero if `earlier` is
    /// more recent
    #[inline]
    pub fn saturating_duration_since(self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl ops::Add<Duration> for Timestamp {
    type Output = Self;

    #[inline]
    fn add(self, duration: Duration) -> Self {
        Self(self.0 + duration)
    }
}

impl ops::AddAssign<Duration> for Timestamp {
    #[inline]
    fn add_assign(&mut self, duration: Duration) {
        self.0 += duration;
    }
}

impl ops::Sub for Timestamp {
    type Output = Duration;

    #[inline]
    fn sub(self, earlier: Self) -> Duration {
        self.0 - earlier.0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({:?})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic() {
        let base = Timestamp::from_duration(Duration::from_millis(100));
        let later = base + Duration::from_millis(50);

        assert_eq!(later - base, Duration::from_millis(50));
        assert!(base.has_elapsed(later));
        assert!(!later.has_elapsed(base));
        assert_eq!(
            base.saturating_duration_since(later),
            Duration::ZERO,
            "earlier-since-later saturates to zero"
        );
    }
}
