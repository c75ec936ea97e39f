// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The seam to the codec/session below the engine.
//!
//! Everything here is non-blocking: `send_*` operations hand bytes to the
//! session's write path and return how many were accepted for framing;
//! back-pressure flows through `on_egress_paused_by_transport` on the
//! transaction, never through blocking. Optional codec capabilities
//! default to an unsupported-operation error, which is non-fatal and
//! leaves transaction state untouched.

use crate::transaction::scheduler::Priority;
use bytes::Bytes;
use htx_core::{
    error::{Error, ErrorCode},
    message::{Headers, MessageHead},
    transaction::TransactionId,
};
use std::net::SocketAddr;

pub type Result<T = usize> = core::result::Result<T, Error>;

pub trait Transport {
    /// Stops the codec from reading more ingress for this transaction
    fn pause_ingress(&mut self, id: TransactionId);

    fn resume_ingress(&mut self, id: TransactionId);

    /// Observes an idle-timeout expiry before the abort is emitted
    fn transaction_timeout(&mut self, id: TransactionId);

    /// The transaction is quiescent and about to be destroyed
    fn detach(&mut self, id: TransactionId);

    fn send_headers(&mut self, id: TransactionId, message: &MessageHead, eom: bool) -> Result;

    fn send_body(
        &mut self,
        id: TransactionId,
        chunk: Bytes,
        eom: bool,
        track_last_byte: bool,
    ) -> Result;

    fn send_chunk_header(&mut self, id: TransactionId, length: u64) -> Result;

    fn send_chunk_terminator(&mut self, id: TransactionId) -> Result;

    fn send_eom(&mut self, id: TransactionId, trailers: Option<&Headers>) -> Result;

    fn send_abort(&mut self, id: TransactionId, code: ErrorCode) -> Result;

    fn send_priority(&mut self, id: TransactionId, priority: Priority) -> Result;

    fn send_window_update(&mut self, id: TransactionId, delta: u32) -> Result;

    /// A transaction has egress queued; the session should schedule a
    /// write pass
    fn notify_pending_egress(&mut self);

    /// Bytes delivered to the handler, for session-level window
    /// accounting
    fn notify_ingress_body_processed(&mut self, bytes: u64);

    /// Signed change in buffered-but-unsent egress, for session-level
    /// buffer accounting
    fn notify_egress_body_buffered(&mut self, delta: i64);

    /// Visits the unconsumed ingress body without consuming it
    fn peek(
        &mut self,
        id: TransactionId,
        visitor: &mut dyn FnMut(u64, &[u8]),
    ) -> Result<()> {
        let _ = (id, visitor);
        Err(Error::unsupported("peek"))
    }

    /// Consumes previously peeked ingress bytes
    fn consume(&mut self, id: TransactionId, bytes: u64) -> Result<()> {
        let _ = (id, bytes);
        Err(Error::unsupported("consume"))
    }

    /// Sender-side partial reliability: advertises that body below
    /// `offset` will not be sent
    fn skip_body_to(&mut self, id: TransactionId, offset: u64) -> Result<()> {
        let _ = (id, offset);
        Err(Error::unsupported("skip_body_to"))
    }

    /// Receiver-side partial reliability: advertises that body below
    /// `offset` is no longer wanted
    fn reject_body_to(&mut self, id: TransactionId, offset: u64) -> Result<()> {
        let _ = (id, offset);
        Err(Error::unsupported("reject_body_to"))
    }

    /// Requests a delivery callback once the byte at `offset` reaches the
    /// wire
    fn track_egress_body_delivery(&mut self, id: TransactionId, offset: u64) -> Result<()> {
        let _ = (id, offset);
        Err(Error::unsupported("track_egress_body_delivery"))
    }

    /// Whether the codec multiplexes transactions; non-multiplexed codecs
    /// need chunk framing emitted on the wire
    fn is_multiplexing(&self) -> bool {
        true
    }

    /// Whether the session is shutting down and refusing new work
    fn is_draining(&self) -> bool {
        false
    }

    /// Whether early data on this transport is safe to replay
    fn is_replay_safe(&self) -> bool {
        true
    }

    fn local_address(&self) -> Option<SocketAddr> {
        None
    }

    fn peer_address(&self) -> Option<SocketAddr> {
        None
    }
}
