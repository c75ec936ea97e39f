// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Structured events emitted by the engine.
//!
//! Sessions install a [`Subscriber`] to observe transaction lifecycle and
//! back-pressure activity. Every method has a no-op default, so the
//! compiler erases anything a subscriber does not consume; the engine
//! treats emission as fire-and-forget and never reads anything back.

use crate::{
    error::Error,
    transaction::{Direction, TransactionId},
};
use core::time::Duration;

/// All event types which can be emitted from this library
pub trait Event: core::fmt::Debug {
    const NAME: &'static str;
}

macro_rules! events {
    ($(
        $(#[doc = $doc:literal])*
        $name:literal => struct $ident:ident $(<$lt:lifetime>)? {
            $(pub $field:ident: $ty:ty,)*
        }
    )*) => {
        $(
            $(#[doc = $doc])*
            #[derive(Clone, Debug)]
            pub struct $ident $(<$lt>)? {
                $(pub $field: $ty,)*
            }

            impl $(<$lt>)? Event for $ident $(<$lt>)? {
                const NAME: &'static str = $name;
            }
        )*
    };
}

events!(
    /// A transaction was attached to its session
    "transaction:opened" => struct TransactionOpened {
        pub id: TransactionId,
        pub direction: Direction,
    }
    /// A transaction detached from handler and transport
    "transaction:closed" => struct TransactionClosed {
        pub id: TransactionId,
    }
    /// A fatal error terminated a transaction
    "transaction:error" => struct TransactionError<'a> {
        pub id: TransactionId,
        pub error: &'a Error,
    }
    /// The idle timer expired
    "transaction:timeout" => struct TransactionTimeout {
        pub id: TransactionId,
        pub idle: Duration,
    }
    /// Send-window credit changed
    "transaction:flow_control_updated" => struct FlowControlUpdated {
        pub id: TransactionId,
        pub available: u64,
    }
    /// An egress flush was withheld by the rate limiter
    "transaction:egress_rate_limited" => struct EgressRateLimited {
        pub id: TransactionId,
        pub delay: Duration,
    }
    /// The handler paused ingress delivery
    "transaction:ingress_paused" => struct IngressPaused {
        pub id: TransactionId,
    }
    /// Ingress delivery resumed
    "transaction:ingress_resumed" => struct IngressResumed {
        pub id: TransactionId,
    }
);

/// Sessions implement `Subscriber` to consume engine telemetry.
///
/// The default implementation of every method is a no-op.
pub trait Subscriber {
    fn on_transaction_opened(&mut self, event: &TransactionOpened) {
        let _ = event;
    }

    fn on_transaction_closed(&mut self, event: &TransactionClosed) {
        let _ = event;
    }

    fn on_transaction_error(&mut self, event: &TransactionError) {
        let _ = event;
    }

    fn on_transaction_timeout(&mut self, event: &TransactionTimeout) {
        let _ = event;
    }

    fn on_flow_control_updated(&mut self, event: &FlowControlUpdated) {
        let _ = event;
    }

    fn on_egress_rate_limited(&mut self, event: &EgressRateLimited) {
        let _ = event;
    }

    fn on_ingress_paused(&mut self, event: &IngressPaused) {
        let _ = event;
    }

    fn on_ingress_resumed(&mut self, event: &IngressResumed) {
        let _ = event;
    }
}

/// A subscriber that discards everything
impl Subscriber for () {}

macro_rules! forward {
    ($($method:ident, $event:ty;)*) => {
        impl<A, B> Subscriber for (A, B)
        where
            A: Subscriber,
            B: Subscriber,
        {
            $(
                fn $method(&mut self, event: &$event) {
                    self.0.$method(event);
                    self.1.$method(event);
                }
            )*
        }
    };
}

forward!(
    on_transaction_opened, TransactionOpened;
    on_transaction_closed, TransactionClosed;
    on_transaction_error, TransactionError<'_>;
    on_transaction_timeout, TransactionTimeout;
    on_flow_control_updated, FlowControlUpdated;
    on_egress_rate_limited, EgressRateLimited;
    on_ingress_paused, IngressPaused;
    on_ingress_resumed, IngressResumed;
);

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;

    /// Records event names and transaction ids in arrival order
    #[derive(Clone, Debug, Default)]
    pub struct Subscriber {
        pub events: Vec<(&'static str, TransactionId)>,
    }

    impl Subscriber {
        pub fn names(&self) -> Vec<&'static str> {
            self.events.iter().map(|(name, _)| *name).collect()
        }
    }

    impl super::Subscriber for Subscriber {
        fn on_transaction_opened(&mut self, event: &TransactionOpened) {
            self.events.push((TransactionOpened::NAME, event.id));
        }

        fn on_transaction_closed(&mut self, event: &TransactionClosed) {
            self.events.push((TransactionClosed::NAME, event.id));
        }

        fn on_transaction_error(&mut self, event: &TransactionError) {
            self.events.push((TransactionError::NAME, event.id));
        }

        fn on_transaction_timeout(&mut self, event: &TransactionTimeout) {
            self.events.push((TransactionTimeout::NAME, event.id));
        }

        fn on_flow_control_updated(&mut self, event: &FlowControlUpdated) {
            self.events.push((FlowControlUpdated::NAME, event.id));
        }

        fn on_egress_rate_limited(&mut self, event: &EgressRateLimited) {
            self.events.push((EgressRateLimited::NAME, event.id));
        }

        fn on_ingress_paused(&mut self, event: &IngressPaused) {
            self.events.push((IngressPaused::NAME, event.id));
        }

        fn on_ingress_resumed(&mut self, event: &IngressResumed) {
            self.events.push((IngressResumed::NAME, event.id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_composition_forwards() {
        let mut pair = (testing::Subscriber::default(), testing::Subscriber::default());
        let id = TransactionId::new(1);

        pair.on_transaction_opened(&TransactionOpened {
            id,
            direction: Direction::Downstream,
        });
        pair.on_transaction_closed(&TransactionClosed { id });

        for recorder in [&pair.0, &pair.1] {
            assert_eq!(
                recorder.names(),
                vec!["transaction:opened", "transaction:closed"]
            );
        }
    }
}
