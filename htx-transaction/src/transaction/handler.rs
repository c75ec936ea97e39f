// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The seam to the application above the engine.
//!
//! Handler callbacks borrow the transaction and the session context for
//! the duration of the call, so a handler can answer an ingress event
//! with egress operations (`txn.send_headers(ctx, ..)`) or pause ingress
//! from inside the callback. Callbacks arrive in the exact order events
//! arrived from the codec.
//!
//! Resuming a paused transaction is driven through the session
//! (`Transaction::resume_ingress`), since the drain re-enters these
//! callbacks.

use crate::transaction::{Context, Transaction};
use bytes::Bytes;
use htx_core::{
    error::{Error, ErrorCode},
    message::{Headers, MessageHead},
    transaction::TransactionId,
};

pub trait Handler {
    /// Called once at attach time with the transaction's identifier
    fn set_transaction(&mut self, id: TransactionId) {
        let _ = id;
    }

    fn on_headers_complete(
        &mut self,
        txn: &mut Transaction,
        ctx: &mut Context<'_>,
        message: MessageHead,
    );

    fn on_body(&mut self, txn: &mut Transaction, ctx: &mut Context<'_>, chunk: Bytes);

    /// Body delivery in partially reliable mode; the offset is the
    /// position of the chunk's first byte in the stream
    fn on_body_with_offset(
        &mut self,
        txn: &mut Transaction,
        ctx: &mut Context<'_>,
        offset: u64,
        chunk: Bytes,
    ) {
        let _ = offset;
        self.on_body(txn, ctx, chunk);
    }

    fn on_chunk_header(&mut self, txn: &mut Transaction, ctx: &mut Context<'_>, length: u64) {
        let _ = (txn, ctx, length);
    }

    fn on_chunk_complete(&mut self, txn: &mut Transaction, ctx: &mut Context<'_>) {
        let _ = (txn, ctx);
    }

    fn on_trailers(&mut self, txn: &mut Transaction, ctx: &mut Context<'_>, trailers: Headers) {
        let _ = (txn, ctx, trailers);
    }

    fn on_eom(&mut self, txn: &mut Transaction, ctx: &mut Context<'_>);

    /// The ingress message switched protocols; subsequent bytes arrive as
    /// body
    fn on_upgrade(&mut self, txn: &mut Transaction, ctx: &mut Context<'_>, protocol: String) {
        let _ = (txn, ctx, protocol);
    }

    /// A fatal error terminated the transaction. No further ingress
    /// callbacks follow; `detach_transaction` still arrives exactly once.
    fn on_error(&mut self, error: Error);

    /// The session received a GOAWAY covering this transaction's side
    fn on_goaway(&mut self, code: ErrorCode) {
        let _ = code;
    }

    fn on_egress_paused(&mut self, txn: &mut Transaction, ctx: &mut Context<'_>) {
        let _ = (txn, ctx);
    }

    fn on_egress_resumed(&mut self, txn: &mut Transaction, ctx: &mut Context<'_>) {
        let _ = (txn, ctx);
    }

    /// The peer promised a pushed transaction associated with this one
    fn on_pushed_transaction(
        &mut self,
        txn: &mut Transaction,
        ctx: &mut Context<'_>,
        pushed: TransactionId,
    ) {
        let _ = (txn, ctx, pushed);
    }

    /// The peer opened an extended transaction on this control stream
    fn on_ex_transaction(
        &mut self,
        txn: &mut Transaction,
        ctx: &mut Context<'_>,
        ex: TransactionId,
    ) {
        let _ = (txn, ctx, ex);
    }

    /// Partially reliable ingress started delivering unframed body
    fn on_unframed_body_started(
        &mut self,
        txn: &mut Transaction,
        ctx: &mut Context<'_>,
        offset: u64,
    ) {
        let _ = (txn, ctx, offset);
    }

    /// A `peek` visit over unconsumed ingress body
    fn on_body_peek(&mut self, offset: u64, chunk: &[u8]) {
        let _ = (offset, chunk);
    }

    /// The peer's sender skipped body below `offset`
    fn on_body_skipped(&mut self, txn: &mut Transaction, ctx: &mut Context<'_>, offset: u64) {
        let _ = (txn, ctx, offset);
    }

    /// The peer's receiver rejected body below `offset`
    fn on_body_rejected(&mut self, txn: &mut Transaction, ctx: &mut Context<'_>, offset: u64) {
        let _ = (txn, ctx, offset);
    }

    /// The terminal callback: the transaction has detached and must not
    /// be used again. Delivered exactly once per transaction.
    fn detach_transaction(&mut self);
}
