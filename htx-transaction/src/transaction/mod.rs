// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The transaction engine: state, dispatch, flow control, and the traits
//! at its seams.

mod config;
mod deferred_egress;
mod deferred_ingress;
mod handler;
mod pacer;
mod scheduler;
mod transaction_impl;
mod transport;

#[cfg(test)]
mod tests;

pub use config::{Config, ExAttributes, ValidationError};
#[cfg(any(test, feature = "testing"))]
pub use scheduler::testing::FifoScheduler;
pub use handler::Handler;
pub use scheduler::{Priority, PriorityHandle, Scheduler};
pub use transaction_impl::{PushAttributes, Transaction};
pub use transport::Transport;

use htx_core::{event, time::Timestamp};

/// The collaborators a session hands to every transaction entry point.
///
/// The engine is single-threaded per session; the context is a bundle of
/// `&mut` references rather than owned state so that one transport, one
/// scheduler, and one subscriber can be shared by every transaction on
/// the session without interior mutability.
pub struct Context<'a> {
    pub transport: &'a mut dyn Transport,
    pub scheduler: &'a mut dyn Scheduler,
    pub events: &'a mut dyn event::Subscriber,
    /// The session's current time, sampled once per event-loop turn
    pub now: Timestamp,
}
