// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A test environment for a single [`Transaction`]: a recording mock
//! transport and handler, the FIFO scheduler, an event recorder, and a
//! manually advanced clock, plus helpers that assemble a [`Context`] per
//! entry call the way a session would.

use crate::transaction::{
    Config, Context, FifoScheduler, Handler, Priority, Transaction, Transport,
};
use bytes::Bytes;
use htx_core::{
    error::{Error, ErrorCode},
    event,
    message::{Headers, MessageHead},
    time::{testing::Clock, Clock as _},
    transaction::{Direction, TransactionId},
};

#[derive(Clone, Debug, PartialEq)]
pub enum TransportOp {
    PauseIngress,
    ResumeIngress,
    Timeout,
    Detach(TransactionId),
    SendHeaders { status: Option<u16>, eom: bool },
    SendBody { bytes: Bytes, eom: bool },
    SendChunkHeader(u64),
    SendChunkTerminator,
    SendEom { trailers: Option<Headers> },
    SendAbort { id: TransactionId, code: ErrorCode },
    SendPriority(Priority),
    SendWindowUpdate(u32),
    SkipBodyTo(u64),
    RejectBodyTo(u64),
    Consume(u64),
    TrackDelivery(u64),
}

#[derive(Debug, Default)]
pub struct MockTransport {
    pub ops: Vec<TransportOp>,
    pub multiplexing: bool,
    pub draining: bool,
    pub fail_sends: bool,
    pub supports_partial_reliability: bool,
    pub supports_delivery_tracking: bool,
    /// `Some` enables peek/consume; regions are `(offset, bytes)`
    pub peek_data: Option<Vec<(u64, Vec<u8>)>>,
    pub pending_egress_notices: u32,
    pub ingress_processed: u64,
    pub egress_buffered: i64,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            multiplexing: true,
            ..Self::default()
        }
    }

    fn check_write(&self) -> Result<(), Error> {
        if self.fail_sends {
            Err(Error::transport("write refused"))
        } else {
            Ok(())
        }
    }
}

impl Transport for MockTransport {
    fn pause_ingress(&mut self, _id: TransactionId) {
        self.ops.push(TransportOp::PauseIngress);
    }

    fn resume_ingress(&mut self, _id: TransactionId) {
        self.ops.push(TransportOp::ResumeIngress);
    }

    fn transaction_timeout(&mut self, _id: TransactionId) {
        self.ops.push(TransportOp::Timeout);
    }

    fn detach(&mut self, id: TransactionId) {
        self.ops.push(TransportOp::Detach(id));
    }

    fn send_headers(
        &mut self,
        _id: TransactionId,
        message: &MessageHead,
        eom: bool,
    ) -> Result<usize, Error> {
        self.check_write()?;
        self.ops.push(TransportOp::SendHeaders {
            status: message.status(),
            eom,
        });
        Ok(message.encoded_size())
    }

    fn send_body(
        &mut self,
        _id: TransactionId,
        chunk: Bytes,
        eom: bool,
        _track_last_byte: bool,
    ) -> Result<usize, Error> {
        self.check_write()?;
        let length = chunk.len();
        self.ops.push(TransportOp::SendBody { bytes: chunk, eom });
        Ok(length)
    }

    fn send_chunk_header(&mut self, _id: TransactionId, length: u64) -> Result<usize, Error> {
        self.check_write()?;
        self.ops.push(TransportOp::SendChunkHeader(length));
        Ok(8)
    }

    fn send_chunk_terminator(&mut self, _id: TransactionId) -> Result<usize, Error> {
        self.check_write()?;
        self.ops.push(TransportOp::SendChunkTerminator);
        Ok(2)
    }

    fn send_eom(
        &mut self,
        _id: TransactionId,
        trailers: Option<&Headers>,
    ) -> Result<usize, Error> {
        self.check_write()?;
        self.ops.push(TransportOp::SendEom {
            trailers: trailers.cloned(),
        });
        Ok(0)
    }

    fn send_abort(&mut self, id: TransactionId, code: ErrorCode) -> Result<usize, Error> {
        self.ops.push(TransportOp::SendAbort { id, code });
        Ok(0)
    }

    fn send_priority(&mut self, _id: TransactionId, priority: Priority) -> Result<usize, Error> {
        self.check_write()?;
        self.ops.push(TransportOp::SendPriority(priority));
        Ok(5)
    }

    fn send_window_update(&mut self, _id: TransactionId, delta: u32) -> Result<usize, Error> {
        self.check_write()?;
        self.ops.push(TransportOp::SendWindowUpdate(delta));
        Ok(4)
    }

    fn notify_pending_egress(&mut self) {
        self.pending_egress_notices += 1;
    }

    fn notify_ingress_body_processed(&mut self, bytes: u64) {
        self.ingress_processed += bytes;
    }

    fn notify_egress_body_buffered(&mut self, delta: i64) {
        self.egress_buffered += delta;
    }

    fn peek(
        &mut self,
        _id: TransactionId,
        visitor: &mut dyn FnMut(u64, &[u8]),
    ) -> Result<(), Error> {
        let Some(regions) = self.peek_data.as_ref() else {
            return Err(Error::unsupported("peek"));
        };
        for (offset, bytes) in regions {
            visitor(*offset, bytes);
        }
        Ok(())
    }

    fn consume(&mut self, _id: TransactionId, bytes: u64) -> Result<(), Error> {
        if self.peek_data.is_none() {
            return Err(Error::unsupported("consume"));
        }
        self.ops.push(TransportOp::Consume(bytes));
        Ok(())
    }

    fn skip_body_to(&mut self, _id: TransactionId, offset: u64) -> Result<(), Error> {
        if !self.supports_partial_reliability {
            return Err(Error::unsupported("skip_body_to"));
        }
        self.ops.push(TransportOp::SkipBodyTo(offset));
        Ok(())
    }

    fn reject_body_to(&mut self, _id: TransactionId, offset: u64) -> Result<(), Error> {
        if !self.supports_partial_reliability {
            return Err(Error::unsupported("reject_body_to"));
        }
        self.ops.push(TransportOp::RejectBodyTo(offset));
        Ok(())
    }

    fn track_egress_body_delivery(
        &mut self,
        _id: TransactionId,
        offset: u64,
    ) -> Result<(), Error> {
        if !self.supports_delivery_tracking {
            return Err(Error::unsupported("track_egress_body_delivery"));
        }
        self.ops.push(TransportOp::TrackDelivery(offset));
        Ok(())
    }

    fn is_multiplexing(&self) -> bool {
        self.multiplexing
    }

    fn is_draining(&self) -> bool {
        self.draining
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum HandlerEvent {
    Attached(TransactionId),
    HeadersComplete { status: Option<u16> },
    Body(Bytes),
    BodyWithOffset { offset: u64, bytes: Bytes },
    ChunkHeader(u64),
    ChunkComplete,
    Trailers(Headers),
    Eom,
    Upgrade(String),
    Error(Error),
    Goaway(ErrorCode),
    EgressPaused,
    EgressResumed,
    Pushed(TransactionId),
    Ex(TransactionId),
    UnframedBodyStarted(u64),
    BodyPeek { offset: u64, bytes: Vec<u8> },
    BodySkipped(u64),
    BodyRejected(u64),
    Detached,
}

#[derive(Debug, Default)]
pub struct MockHandler {
    pub events: Vec<HandlerEvent>,
    /// Pause ingress from inside `on_headers_complete`
    pub pause_on_headers: bool,
    /// Pause ingress from inside the next `on_body` only
    pub pause_on_body_once: bool,
}

impl MockHandler {
    /// The recorded events excluding the attach marker
    pub fn callbacks(&self) -> Vec<HandlerEvent> {
        self.events
            .iter()
            .filter(|event| !matches!(event, HandlerEvent::Attached(_)))
            .cloned()
            .collect()
    }
}

impl Handler for MockHandler {
    fn set_transaction(&mut self, id: TransactionId) {
        self.events.push(HandlerEvent::Attached(id));
    }

    fn on_headers_complete(
        &mut self,
        txn: &mut Transaction,
        ctx: &mut Context<'_>,
        message: MessageHead,
    ) {
        self.events.push(HandlerEvent::HeadersComplete {
            status: message.status(),
        });
        if self.pause_on_headers {
            txn.pause_ingress(ctx);
        }
    }

    fn on_body(&mut self, txn: &mut Transaction, ctx: &mut Context<'_>, chunk: Bytes) {
        self.events.push(HandlerEvent::Body(chunk));
        if self.pause_on_body_once {
            self.pause_on_body_once = false;
            txn.pause_ingress(ctx);
        }
    }

    fn on_body_with_offset(
        &mut self,
        _txn: &mut Transaction,
        _ctx: &mut Context<'_>,
        offset: u64,
        chunk: Bytes,
    ) {
        self.events
            .push(HandlerEvent::BodyWithOffset { offset, bytes: chunk });
    }

    fn on_chunk_header(&mut self, _txn: &mut Transaction, _ctx: &mut Context<'_>, length: u64) {
        self.events.push(HandlerEvent::ChunkHeader(length));
    }

    fn on_chunk_complete(&mut self, _txn: &mut Transaction, _ctx: &mut Context<'_>) {
        self.events.push(HandlerEvent::ChunkComplete);
    }

    fn on_trailers(&mut self, _txn: &mut Transaction, _ctx: &mut Context<'_>, trailers: Headers) {
        self.events.push(HandlerEvent::Trailers(trailers));
    }

    fn on_eom(&mut self, _txn: &mut Transaction, _ctx: &mut Context<'_>) {
        self.events.push(HandlerEvent::Eom);
    }

    fn on_upgrade(&mut self, _txn: &mut Transaction, _ctx: &mut Context<'_>, protocol: String) {
        self.events.push(HandlerEvent::Upgrade(protocol));
    }

    fn on_error(&mut self, error: Error) {
        self.events.push(HandlerEvent::Error(error));
    }

    fn on_goaway(&mut self, code: ErrorCode) {
        self.events.push(HandlerEvent::Goaway(code));
    }

    fn on_egress_paused(&mut self, _txn: &mut Transaction, _ctx: &mut Context<'_>) {
        self.events.push(HandlerEvent::EgressPaused);
    }

    fn on_egress_resumed(&mut self, _txn: &mut Transaction, _ctx: &mut Context<'_>) {
        self.events.push(HandlerEvent::EgressResumed);
    }

    fn on_pushed_transaction(
        &mut self,
        _txn: &mut Transaction,
        _ctx: &mut Context<'_>,
        pushed: TransactionId,
    ) {
        self.events.push(HandlerEvent::Pushed(pushed));
    }

    fn on_ex_transaction(
        &mut self,
        _txn: &mut Transaction,
        _ctx: &mut Context<'_>,
        ex: TransactionId,
    ) {
        self.events.push(HandlerEvent::Ex(ex));
    }

    fn on_unframed_body_started(
        &mut self,
        _txn: &mut Transaction,
        _ctx: &mut Context<'_>,
        offset: u64,
    ) {
        self.events.push(HandlerEvent::UnframedBodyStarted(offset));
    }

    fn on_body_peek(&mut self, offset: u64, chunk: &[u8]) {
        self.events.push(HandlerEvent::BodyPeek {
            offset,
            bytes: chunk.to_vec(),
        });
    }

    fn on_body_skipped(&mut self, _txn: &mut Transaction, _ctx: &mut Context<'_>, offset: u64) {
        self.events.push(HandlerEvent::BodySkipped(offset));
    }

    fn on_body_rejected(&mut self, _txn: &mut Transaction, _ctx: &mut Context<'_>, offset: u64) {
        self.events.push(HandlerEvent::BodyRejected(offset));
    }

    fn detach_transaction(&mut self) {
        self.events.push(HandlerEvent::Detached);
    }
}

/// Holds a transaction together with mock collaborators
pub struct TestEnvironment {
    pub transport: MockTransport,
    pub scheduler: FifoScheduler,
    pub events: event::testing::Subscriber,
    pub handler: MockHandler,
    pub clock: Clock,
    pub txn: Transaction,
}

impl TestEnvironment {
    pub const DEFAULT_ID: u64 = 1;

    pub fn new(direction: Direction, config: Config) -> Self {
        Self::with_id(TransactionId::new(Self::DEFAULT_ID), direction, config)
    }

    pub fn with_id(id: TransactionId, direction: Direction, config: Config) -> Self {
        let mut transport = MockTransport::new();
        let mut scheduler = FifoScheduler::default();
        let mut events = event::testing::Subscriber::default();
        let mut handler = MockHandler::default();
        let clock = Clock::default();

        let txn = {
            let mut ctx = Context {
                transport: &mut transport,
                scheduler: &mut scheduler,
                events: &mut events,
                now: clock.get_time(),
            };
            Transaction::new(&mut ctx, &mut handler, id, direction, config)
        };

        Self {
            transport,
            scheduler,
            events,
            handler,
            clock,
            txn,
        }
    }

    pub fn downstream() -> Self {
        Self::new(Direction::Downstream, Config::default())
    }

    pub fn upstream() -> Self {
        Self::new(Direction::Upstream, Config::default())
    }

    pub fn with_ctx<R>(
        &mut self,
        f: impl FnOnce(&mut Transaction, &mut Context<'_>, &mut MockHandler) -> R,
    ) -> R {
        let mut ctx = Context {
            transport: &mut self.transport,
            scheduler: &mut self.scheduler,
            events: &mut self.events,
            now: self.clock.get_time(),
        };
        f(&mut self.txn, &mut ctx, &mut self.handler)
    }

    //= session-driven entry points =======================================

    pub fn ingress_headers(&mut self, message: MessageHead) {
        self.with_ctx(|txn, ctx, handler| txn.on_ingress_headers(ctx, handler, message));
    }

    pub fn ingress_body(&mut self, data: &'static [u8]) {
        let chunk = Bytes::from_static(data);
        self.with_ctx(|txn, ctx, handler| txn.on_ingress_body(ctx, handler, chunk));
    }

    pub fn ingress_eom(&mut self) {
        self.with_ctx(|txn, ctx, handler| txn.on_ingress_eom(ctx, handler));
    }

    pub fn window_update(&mut self, delta: u32) {
        self.with_ctx(|txn, ctx, handler| txn.on_ingress_window_update(ctx, handler, delta));
    }

    pub fn write_ready(&mut self, max_bytes: u64) -> bool {
        self.with_ctx(|txn, ctx, handler| txn.on_write_ready(ctx, handler, max_bytes, 1.0))
    }

    pub fn resume(&mut self) {
        self.with_ctx(|txn, ctx, handler| txn.resume_ingress(ctx, handler));
    }

    pub fn timeout(&mut self) {
        self.with_ctx(|txn, ctx, handler| txn.on_timeout(ctx, handler));
    }

    pub fn rate_limit_timeout(&mut self) {
        self.with_ctx(|txn, ctx, handler| txn.on_rate_limit_timeout(ctx, handler));
    }

    pub fn poll(&mut self) {
        self.with_ctx(|txn, ctx, handler| txn.poll_events(ctx, handler));
    }

    //= handler-facing operations, driven at the session level ============

    pub fn send_headers(&mut self, message: MessageHead) -> Result<(), Error> {
        self.with_ctx(|txn, ctx, _| txn.send_headers(ctx, message, false))
    }

    pub fn send_headers_with_eom(&mut self, message: MessageHead) -> Result<(), Error> {
        self.with_ctx(|txn, ctx, _| txn.send_headers_with_eom(ctx, message))
    }

    pub fn send_body(&mut self, data: &'static [u8]) -> Result<(), Error> {
        let chunk = Bytes::from_static(data);
        self.with_ctx(|txn, ctx, _| txn.send_body(ctx, chunk))
    }

    pub fn send_eom(&mut self) -> Result<(), Error> {
        self.with_ctx(|txn, ctx, _| txn.send_eom(ctx))
    }

    //= assertions ========================================================

    pub fn assert_transport_ops(&self, expected: &[TransportOp]) {
        assert_eq!(self.transport.ops, expected, "transport op mismatch");
    }

    pub fn assert_handler_events(&self, expected: &[HandlerEvent]) {
        assert_eq!(
            self.handler.callbacks(),
            expected,
            "handler event mismatch"
        );
    }

    pub fn assert_detached(&self) {
        assert!(self.txn.is_detached(), "the transaction should be detached");
        assert!(
            self.transport.ops.contains(&TransportOp::Detach(self.txn.id())),
            "the transport should observe the detach"
        );
        assert_eq!(
            self.handler.events.last(),
            Some(&HandlerEvent::Detached),
            "detach_transaction should be the terminal callback"
        );
    }
}
