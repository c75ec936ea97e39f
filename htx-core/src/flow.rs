// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Credit-based flow control.
//!
//! A [`Window`] tracks how many body bytes one direction of a transaction
//! may still move. `reserve` spends credit, `free` returns it (capped at
//! the configured capacity), and `set_capacity` applies a signed capacity
//! delta the way an HTTP/2 SETTINGS change does: the available credit
//! moves by `new - old` and may transiently go negative when the peer
//! shrinks the window below the outstanding amount. New reservations are
//! blocked until the debt drains.

use core::fmt;

/// The largest representable window, per the HTTP/2 flow-control limit
pub const MAX_WINDOW: u32 = (1 << 31) - 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// A reservation exceeded the available credit
    Exhausted { requested: u64, available: u64 },
    /// A capacity change pushed the window outside the representable range
    Overflow,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted {
                requested,
                available,
            } => write!(
                f,
                "window exhausted: requested {requested} with {available} available"
            ),
            Self::Overflow => write!(f, "window delta overflowed the representable range"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Window {
    capacity: u32,
    // widened for delta math; negative while the peer has shrunk the
    // window below the outstanding amount
    available: i64,
}

impl Window {
    #[inline]
    pub fn new(capacity: u32) -> Self {
        debug_assert!(capacity <= MAX_WINDOW);
        Self {
            capacity,
            available: i64::from(capacity),
        }
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Credit currently spendable by `reserve`
    #[inline]
    pub fn available(&self) -> u64 {
        self.available.max(0) as u64
    }

    /// Credit reserved and not yet freed
    #[inline]
    pub fn outstanding(&self) -> u64 {
        (i64::from(self.capacity) - self.available).max(0) as u64
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.available <= 0
    }

    /// Spends `amount` bytes of credit.
    ///
    /// Fails without mutating when the request exceeds the available
    /// credit.
    #[inline]
    pub fn reserve(&mut self, amount: u64) -> Result<(), Error> {
        if amount > self.available() {
            return Err(Error::Exhausted {
                requested: amount,
                available: self.available(),
            });
        }
        self.available -= amount as i64;
        Ok(())
    }

    /// Returns `amount` bytes of credit, saturating at the capacity
    #[inline]
    pub fn free(&mut self, amount: u64) {
        self.available = self
            .available
            .saturating_add(amount.min(u64::from(MAX_WINDOW)) as i64)
            .min(i64::from(self.capacity));
    }

    /// Adjusts the capacity, shifting the available credit by the delta.
    ///
    /// The shift is how HTTP/2 applies `SETTINGS_INITIAL_WINDOW_SIZE`
    /// changes to live streams. Errors when the new capacity or the
    /// shifted credit leaves the representable range; the window is
    /// untouched on error.
    pub fn set_capacity(&mut self, capacity: u32) -> Result<(), Error> {
        if capacity > MAX_WINDOW {
            return Err(Error::Overflow);
        }
        let delta = i64::from(capacity) - i64::from(self.capacity);
        let available = self.available.checked_add(delta).ok_or(Error::Overflow)?;
        if available > i64::from(MAX_WINDOW) {
            return Err(Error::Overflow);
        }
        self.capacity = capacity;
        self.available = available;
        Ok(())
    }
}
