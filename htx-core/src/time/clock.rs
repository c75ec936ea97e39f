// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::time::Timestamp;

/// A source of the current time
pub trait Clock {
    fn get_time(&self) -> Timestamp;
}

/// A clock frozen at the epoch, for contexts where time never advances
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopClock;

impl Clock for NoopClock {
    #[inline]
    fn get_time(&self) -> Timestamp {
        Timestamp::default()
    }
}

impl<C: Clock> Clock for &C {
    #[inline]
    fn get_time(&self) -> Timestamp {
        (**self).get_time()
    }
}

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;
    use core::time::Duration;

    /// A manually advanced clock for deterministic tests
    #[derive(Clone, Debug, Default)]
    pub struct Clock {
        now: Timestamp,
    }

    impl Clock {
        #[inline]
        pub fn inc_by(&mut self, duration: Duration) {
            self.now += duration;
        }
    }

    impl super::Clock for Clock {
        #[inline]
        fn get_time(&self) -> Timestamp {
            self.now
        }
    }
}
