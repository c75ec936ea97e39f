// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::time::Timestamp;
use core::task::Poll;

/// A component-owned timer.
///
/// The timer does not trigger anything by itself; owners expose their
/// earliest expiration through `next_expiration` and the session polls it.
///
/// Note: the timer doesn't implement Copy to ensure it isn't accidentally
///       moved with an armed expiration left behind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Timer {
    expiration: Option<Timestamp>,
}

impl Timer {
    /// Arms the timer to expire at the given time
    #[inline]
    pub fn set(&mut self, time: Timestamp) {
        self.expiration = Some(time);
    }

    /// Disarms the timer; a cancelled timer no longer reports as expired
    #[inline]
    pub fn cancel(&mut self) {
        self.expiration = None;
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.expiration.is_some()
    }

    #[inline]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        match self.expiration {
            Some(expiration) => expiration.has_elapsed(now),
            None => false,
        }
    }

    #[inline]
    pub fn next_expiration(&self) -> Option<Timestamp> {
        self.expiration
    }

    /// Notifies the timer of the current time; if expired, the timer is
    /// disarmed and `Ready` is returned
    #[inline]
    pub fn poll_expiration(&mut self, now: Timestamp) -> Poll<()> {
        if self.is_expired(now) {
            self.cancel();
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{Clock, NoopClock};
    use core::time::Duration;

    #[test]
    fn arm_and_cancel() {
        let now = NoopClock.get_time();
        let mut timer = Timer::default();

        assert!(!timer.is_armed());
        timer.set(now + Duration::from_millis(10));
        assert!(timer.is_armed());
        assert!(!timer.is_expired(now));

        timer.cancel();
        assert!(!timer.is_armed());
        assert!(!timer.is_expired(now + Duration::from_secs(1)));
    }

    #[test]
    fn poll_disarms_on_expiry() {
        let mut now = NoopClock.get_time();
        let mut timer = Timer::default();
        timer.set(now + Duration::from_millis(100));

        assert!(timer.poll_expiration(now).is_pending());
        assert!(timer.is_armed());

        now += Duration::from_millis(100);
        assert!(timer.poll_expiration(now).is_ready());
        assert!(!timer.is_armed());
    }
}
