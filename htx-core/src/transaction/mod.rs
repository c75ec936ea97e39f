// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Transaction-level datatypes: identifiers, direction, and the dual
//! ingress/egress state machines.

mod id;
pub mod state;

pub use id::{Initiator, TransactionId};

/// The role a transaction plays on its session.
///
/// A `Downstream` transaction faces a client (it receives requests and
/// sends responses); an `Upstream` transaction faces a server. The
/// direction is fixed at creation and decides which side of the exchange
/// each state machine models.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Upstream,
    Downstream,
}

impl Direction {
    #[inline]
    pub fn is_upstream(self) -> bool {
        matches!(self, Self::Upstream)
    }

    #[inline]
    pub fn is_downstream(self) -> bool {
        matches!(self, Self::Downstream)
    }

    /// The initiator whose transactions count as locally initiated for
    /// this direction
    #[inline]
    pub fn local_initiator(self) -> Initiator {
        match self {
            Self::Upstream => Initiator::Client,
            Self::Downstream => Initiator::Server,
        }
    }
}
