// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Per-stream HTTP transaction engine.
//!
//! A [`transaction::Transaction`] sits between a protocol codec (behind
//! the [`transaction::Transport`] trait) and an application handler
//! (behind the [`transaction::Handler`] trait). It validates event
//! ordering against a dual ingress/egress state machine, buffers and
//! flow-controls body bytes in both directions, and coordinates
//! pause/resume between the remote window, local buffer budgets, and the
//! handler.
//!
//! The engine never blocks and never owns a socket: the session drives
//! every entry point on its own event loop, and anything that awaits
//! external progress is expressed through timers the session polls or
//! through the external priority queue behind
//! [`transaction::Scheduler`].

pub mod transaction;

pub use transaction::{
    Config, Context, ExAttributes, Handler, Priority, PriorityHandle, PushAttributes, Scheduler,
    Transaction, Transport, ValidationError,
};
