// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Egress rate limiting.
//!
//! The pacer grants a byte budget of `elapsed-since-epoch x rate` and
//! compares it against what the transaction has already flushed in the
//! epoch. When the flushed amount runs ahead of the budget, the pacer
//! arms its own wake timer for the catch-up point and the flush path
//! backs off; the session polls the timer and calls back on expiry. The
//! epoch restarts when the rate changes and when egress resumes after a
//! pause, so a stall never accumulates a burst allowance.

use core::time::Duration;
use htx_core::time::{Timer, Timestamp};

#[derive(Debug, Default)]
pub(crate) struct Pacer {
    bytes_per_ms: u64,
    epoch: Option<Timestamp>,
    sent_in_epoch: u64,
    wake_timer: Timer,
}

impl Pacer {
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.bytes_per_ms > 0
    }

    /// Sets the rate in bytes per millisecond; zero disables pacing
    pub fn set_rate(&mut self, bytes_per_ms: u64, now: Timestamp) {
        self.bytes_per_ms = bytes_per_ms;
        self.restart(now);
    }

    /// Restarts the epoch, forgetting the flushed amount
    pub fn restart(&mut self, now: Timestamp) {
        self.epoch = self.is_enabled().then_some(now);
        self.sent_in_epoch = 0;
        self.wake_timer.cancel();
    }

    /// Checks whether a flush may proceed.
    ///
    /// On denial the wake timer is armed and the required delay is
    /// returned.
    pub fn check(&mut self, now: Timestamp) -> Result<(), Duration> {
        if !self.is_enabled() {
            return Ok(());
        }
        let epoch = *self.epoch.get_or_insert(now);
        let elapsed_ms = now.saturating_duration_since(epoch).as_millis() as u64;
        let budget = elapsed_ms.saturating_mul(self.bytes_per_ms);
        if self.sent_in_epoch <= budget {
            return Ok(());
        }
        let over_budget = self.sent_in_epoch - budget;
        let delay_ms = over_budget.div_ceil(self.bytes_per_ms);
        let delay = Duration::from_millis(delay_ms);
        self.wake_timer.set(now + delay);
        Err(delay)
    }

    /// Accounts flushed body bytes against the epoch
    pub fn on_egress(&mut self, bytes: u64, now: Timestamp) {
        if !self.is_enabled() {
            return;
        }
        self.epoch.get_or_insert(now);
        self.sent_in_epoch = self.sent_in_epoch.saturating_add(bytes);
    }

    /// Consumes an expired wake timer; true when the wake fired
    pub fn on_timeout(&mut self, now: Timestamp) -> bool {
        self.wake_timer.poll_expiration(now).is_ready()
    }

    #[inline]
    pub fn next_expiration(&self) -> Option<Timestamp> {
        self.wake_timer.next_expiration()
    }

    pub fn cancel(&mut self) {
        self.wake_timer.cancel();
    }
}
