// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The per-stream transaction.
//!
//! A `Transaction` multiplexes three concerns that must stay consistent
//! under adversarial ordering: protocol-level state validity (the dual
//! state machines), end-to-end flow control (windows, buffers, pacing),
//! and cooperative back-pressure with the handler (pause/resume in both
//! directions).
//!
//! # Dispatch model
//!
//! Session-driven entry points (`on_ingress_*`, `on_write_ready`,
//! timeouts, `resume_ingress`) take the handler and run under a
//! destruction guard: the call depth is incremented on entry and
//! decremented on exit, and deferred work — queued ingress events after a
//! resume, pause/resume/error notices, and the final detach — only runs
//! when the depth returns to zero. Handler-facing operations (`send_*`,
//! `pause_ingress`, priority and partial-reliability calls) take no
//! handler so they can be issued from inside a handler callback; any
//! handler notification they produce is queued and delivered at the
//! boundary of the enclosing entry point (or the session's next
//! `poll_events`).

use crate::transaction::{
    config::{Config, ExAttributes},
    deferred_egress::{DeferredEgress, EgressOp},
    deferred_ingress::{DeferredIngress, IngressEvent},
    handler::Handler,
    pacer::Pacer,
    scheduler::{Priority, PriorityHandle},
    Context,
};
use bytes::Bytes;
use core::time::Duration;
use hashbrown::HashSet;
use htx_core::{
    error::{Error, ErrorCode, ErrorDirection, Kind},
    event,
    flow::Window,
    message::{Headers, MessageHead},
    time::{Timer, Timestamp},
    transaction::{
        state::{Egress, Ingress},
        Direction, TransactionId,
    },
};
use smallvec::SmallVec;

/// Attributes the session needs to construct a pushed transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PushAttributes {
    pub assoc_stream_id: TransactionId,
    pub priority: Priority,
}

/// A handler notification produced while the handler was the active
/// caller, delivered at the dispatch boundary
#[derive(Clone, Copy, Debug)]
enum Notice {
    EgressPaused,
    EgressResumed,
    Error(Error),
}

pub struct Transaction {
    id: TransactionId,
    direction: Direction,

    ingress_state: Ingress,
    egress_state: Egress,

    flow_control: bool,
    recv_window: Window,
    send_window: Window,

    deferred_ingress: Option<DeferredIngress>,
    deferred_egress: DeferredEgress,
    eom_queued: bool,
    trailers: Option<Headers>,

    pacer: Pacer,
    egress_rate_limited: bool,

    max_deferred_ingress: usize,
    egress_buffer_limit: usize,

    idle_timeout: Option<Duration>,
    idle_timer: Timer,

    ingress_paused: bool,
    egress_paused_by_transport: bool,
    handler_egress_paused: bool,
    in_resume: bool,
    notices: SmallVec<[Notice; 4]>,

    aborted: bool,
    detached: bool,
    call_depth: u32,
    pending_byte_events: u32,

    priority: Priority,
    priority_handle: Option<PriorityHandle>,
    cumulative_weight_ratio: f64,
    egress_calls: u64,

    expected_ingress_length: Option<u64>,
    remaining_ingress_length: Option<u64>,
    expected_response_length: Option<u64>,
    actual_response_length: u64,
    last_response_status: u16,

    ingress_body_offset: u64,
    ingress_body_delivered: u64,
    egress_body_bytes_committed: u64,
    partially_reliable: bool,
    egress_headers_delivered: bool,

    assoc_stream_id: Option<TransactionId>,
    ex_attributes: Option<ExAttributes>,
    pushed_transactions: HashSet<TransactionId>,
    ex_transactions: HashSet<TransactionId>,
}

impl Transaction {
    pub fn new(
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        id: TransactionId,
        direction: Direction,
        config: Config,
    ) -> Self {
        let mut ingress_state = Ingress::default();
        let mut egress_state = Egress::default();
        if let Some(ex) = config.ex_attributes {
            if ex.unidirectional {
                // the remote side of a unidirectional ex transaction never
                // sends; the local side never receives
                if id.initiator() == direction.local_initiator() {
                    ingress_state = Ingress::ReceivingDone;
                } else {
                    egress_state = Egress::SendingDone;
                }
            }
        }

        let priority_handle = Some(ctx.scheduler.add(id, config.priority));
        ctx.events
            .on_transaction_opened(&event::TransactionOpened { id, direction });
        handler.set_transaction(id);

        Self {
            id,
            direction,
            ingress_state,
            egress_state,
            flow_control: config.use_flow_control,
            recv_window: Window::new(config.recv_initial_window),
            send_window: Window::new(config.send_initial_window),
            deferred_ingress: None,
            deferred_egress: DeferredEgress::default(),
            eom_queued: false,
            trailers: None,
            pacer: Pacer::default(),
            egress_rate_limited: false,
            max_deferred_ingress: config.max_deferred_ingress,
            egress_buffer_limit: config.egress_buffer_limit,
            idle_timeout: config.idle_timeout,
            idle_timer: Timer::default(),
            ingress_paused: false,
            egress_paused_by_transport: false,
            handler_egress_paused: false,
            in_resume: false,
            notices: SmallVec::new(),
            aborted: false,
            detached: false,
            call_depth: 0,
            pending_byte_events: 0,
            priority: config.priority,
            priority_handle,
            cumulative_weight_ratio: 0.0,
            egress_calls: 0,
            expected_ingress_length: None,
            remaining_ingress_length: None,
            expected_response_length: None,
            actual_response_length: 0,
            last_response_status: 0,
            ingress_body_offset: 0,
            ingress_body_delivered: 0,
            egress_body_bytes_committed: 0,
            partially_reliable: false,
            egress_headers_delivered: false,
            assoc_stream_id: config.assoc_stream_id,
            ex_attributes: config.ex_attributes,
            pushed_transactions: HashSet::new(),
            ex_transactions: HashSet::new(),
        }
    }

    // ----- accessors -----

    #[inline]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn ingress_state(&self) -> &Ingress {
        &self.ingress_state
    }

    #[inline]
    pub fn egress_state(&self) -> &Egress {
        &self.egress_state
    }

    #[inline]
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    #[inline]
    pub fn is_ingress_paused(&self) -> bool {
        self.ingress_paused
    }

    #[inline]
    pub fn is_egress_rate_limited(&self) -> bool {
        self.egress_rate_limited
    }

    #[inline]
    pub fn is_handler_egress_paused(&self) -> bool {
        self.handler_egress_paused
    }

    #[inline]
    pub fn is_pushed(&self) -> bool {
        self.assoc_stream_id.is_some()
    }

    #[inline]
    pub fn is_partially_reliable(&self) -> bool {
        self.partially_reliable
    }

    #[inline]
    pub fn assoc_stream_id(&self) -> Option<TransactionId> {
        self.assoc_stream_id
    }

    #[inline]
    pub fn ex_attributes(&self) -> Option<ExAttributes> {
        self.ex_attributes
    }

    #[inline]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    #[inline]
    pub fn last_response_status(&self) -> u16 {
        self.last_response_status
    }

    #[inline]
    pub fn expected_ingress_length(&self) -> Option<u64> {
        self.expected_ingress_length
    }

    #[inline]
    pub fn pending_byte_events(&self) -> u32 {
        self.pending_byte_events
    }

    #[inline]
    pub fn send_window(&self) -> &Window {
        &self.send_window
    }

    #[inline]
    pub fn recv_window(&self) -> &Window {
        &self.recv_window
    }

    #[inline]
    pub fn deferred_ingress_bytes(&self) -> usize {
        self.deferred_ingress
            .as_ref()
            .map_or(0, DeferredIngress::bytes)
    }

    #[inline]
    pub fn deferred_egress_bytes(&self) -> u64 {
        self.deferred_egress.body_bytes()
    }

    /// Body or EOM waiting for a write pass
    #[inline]
    pub fn has_pending_egress(&self) -> bool {
        !self.deferred_egress.is_empty() || self.eom_queued
    }

    /// Scheduling statistics accumulated by `on_write_ready`
    #[inline]
    pub fn egress_stats(&self) -> (f64, u64) {
        (self.cumulative_weight_ratio, self.egress_calls)
    }

    /// The earliest point either owned timer fires
    pub fn next_timeout(&self) -> Option<Timestamp> {
        match (
            self.idle_timer.next_expiration(),
            self.pacer.next_expiration(),
        ) {
            (Some(idle), Some(wake)) => Some(idle.min(wake)),
            (idle, wake) => idle.or(wake),
        }
    }

    // ----- destruction guard -----

    fn enter(&mut self) {
        self.call_depth += 1;
    }

    fn exit(&mut self, ctx: &mut Context<'_>, handler: &mut dyn Handler) {
        debug_assert!(self.call_depth > 0);
        self.call_depth -= 1;
        if self.call_depth > 0 {
            return;
        }
        self.drain_deferred_ingress(ctx, handler);
        self.deliver_notices(ctx, handler);
        self.maybe_detach(ctx, handler);
    }

    /// Runs any deferred work at a safe point: queued ingress events,
    /// pending handler notices, and detach. Sessions call this after
    /// driving handler-facing operations outside a dispatch.
    pub fn poll_events(&mut self, ctx: &mut Context<'_>, handler: &mut dyn Handler) {
        self.enter();
        self.exit(ctx, handler);
    }

    fn deliver_notices(&mut self, ctx: &mut Context<'_>, handler: &mut dyn Handler) {
        while !self.notices.is_empty() {
            let notice = self.notices.remove(0);
            match notice {
                Notice::EgressPaused => handler.on_egress_paused(self, ctx),
                Notice::EgressResumed => handler.on_egress_resumed(self, ctx),
                Notice::Error(error) => {
                    if self.should_notify_error(&error) {
                        handler.on_error(error);
                    }
                }
            }
        }
    }

    fn maybe_detach(&mut self, ctx: &mut Context<'_>, handler: &mut dyn Handler) {
        if self.detached || self.call_depth > 0 || self.pending_byte_events > 0 {
            return;
        }
        if !(self.ingress_state.is_terminal() && self.egress_state.is_terminal()) {
            return;
        }
        self.detached = true;
        debug_assert!(self.deferred_egress.is_empty());
        self.idle_timer.cancel();
        self.pacer.cancel();
        if let Some(handle) = self.priority_handle.take() {
            ctx.scheduler.remove(handle);
        }
        ctx.transport.detach(self.id);
        handler.detach_transaction();
        ctx.events
            .on_transaction_closed(&event::TransactionClosed { id: self.id });
    }

    // ----- ingress dispatch -----

    pub fn on_ingress_headers(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        message: MessageHead,
    ) {
        self.enter();
        if let Err(error) = self.ingress_headers(ctx, handler, message) {
            self.fail(ctx, error);
        }
        self.exit(ctx, handler);
    }

    pub fn on_ingress_body(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        chunk: Bytes,
    ) {
        self.enter();
        if let Err(error) = self.ingress_body(ctx, handler, chunk) {
            self.fail(ctx, error);
        }
        self.exit(ctx, handler);
    }

    pub fn on_ingress_chunk_header(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        length: u64,
    ) {
        self.enter();
        if let Err(error) = self.ingress_chunk_header(ctx, handler, length) {
            self.fail(ctx, error);
        }
        self.exit(ctx, handler);
    }

    pub fn on_ingress_chunk_complete(&mut self, ctx: &mut Context<'_>, handler: &mut dyn Handler) {
        self.enter();
        if let Err(error) = self.ingress_chunk_complete(ctx, handler) {
            self.fail(ctx, error);
        }
        self.exit(ctx, handler);
    }

    pub fn on_ingress_trailers(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        trailers: Headers,
    ) {
        self.enter();
        if let Err(error) = self.ingress_trailers(ctx, handler, trailers) {
            self.fail(ctx, error);
        }
        self.exit(ctx, handler);
    }

    pub fn on_ingress_upgrade(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        protocol: String,
    ) {
        self.enter();
        if let Err(error) = self.ingress_upgrade(ctx, handler, protocol) {
            self.fail(ctx, error);
        }
        self.exit(ctx, handler);
    }

    pub fn on_ingress_eom(&mut self, ctx: &mut Context<'_>, handler: &mut dyn Handler) {
        self.enter();
        if let Err(error) = self.ingress_eom(ctx, handler) {
            self.fail(ctx, error);
        }
        self.exit(ctx, handler);
    }

    fn ingress_suppressed(&self) -> bool {
        self.aborted || self.detached
    }

    fn ingress_rejected(reason: &'static str) -> Error {
        Error::protocol(reason).with_direction(ErrorDirection::Ingress)
    }

    fn ingress_headers(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        message: MessageHead,
    ) -> Result<(), Error> {
        if self.ingress_suppressed() {
            return Ok(());
        }
        self.refresh_idle_timer(ctx.now);

        // interim responses repeat headers without an SM transition; the
        // table keeps the single Start transition
        let repeated_interim = self.direction.is_upstream()
            && self.ingress_state.is_headers_received()
            && (100..200).contains(&self.last_response_status)
            && matches!(message, MessageHead::Response(_));
        if !repeated_interim {
            self.ingress_state
                .on_headers()
                .map_err(|_| Self::ingress_rejected("headers not expected in this state"))?;
        }

        if let Some(status) = message.status() {
            self.record_response_status(status, ErrorDirection::Ingress)?;
        }
        if !message.is_informational() {
            self.expected_ingress_length = message.content_length();
            self.remaining_ingress_length = message.content_length();
        }

        if self.must_queue() {
            return self.defer_event(IngressEvent::Headers(message));
        }
        handler.on_headers_complete(self, ctx, message);
        Ok(())
    }

    fn ingress_body(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        chunk: Bytes,
    ) -> Result<(), Error> {
        if self.ingress_suppressed() {
            return Ok(());
        }
        self.refresh_idle_timer(ctx.now);
        self.ingress_state
            .on_body()
            .map_err(|_| Self::ingress_rejected("body not expected in this state"))?;

        let length = chunk.len() as u64;
        if self.flow_control {
            self.recv_window.reserve(length).map_err(|_| {
                Error::new(
                    Kind::Protocol,
                    ErrorCode::FlowControlError,
                    ErrorDirection::Ingress,
                    "receive window exceeded",
                )
            })?;
        }
        if let Some(remaining) = self.remaining_ingress_length.as_mut() {
            if length > *remaining {
                return Err(Self::ingress_rejected("body exceeds content-length"));
            }
            *remaining -= length;
        }
        self.ingress_body_offset += length;

        if self.must_queue() {
            return self.defer_event(IngressEvent::Body(chunk));
        }
        self.deliver_body(ctx, handler, chunk)
    }

    fn ingress_chunk_header(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        length: u64,
    ) -> Result<(), Error> {
        if self.ingress_suppressed() {
            return Ok(());
        }
        self.refresh_idle_timer(ctx.now);
        if self.partially_reliable {
            return Err(Self::ingress_rejected(
                "chunked framing is incompatible with partial reliability",
            ));
        }
        self.ingress_state
            .on_chunk_header()
            .map_err(|_| Self::ingress_rejected("chunk header not expected in this state"))?;

        if self.must_queue() {
            return self.defer_event(IngressEvent::ChunkHeader(length));
        }
        handler.on_chunk_header(self, ctx, length);
        Ok(())
    }

    fn ingress_chunk_complete(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
    ) -> Result<(), Error> {
        if self.ingress_suppressed() {
            return Ok(());
        }
        self.refresh_idle_timer(ctx.now);
        self.ingress_state
            .on_chunk_complete()
            .map_err(|_| Self::ingress_rejected("chunk terminator without an open chunk"))?;

        if self.must_queue() {
            return self.defer_event(IngressEvent::ChunkComplete);
        }
        handler.on_chunk_complete(self, ctx);
        Ok(())
    }

    fn ingress_trailers(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        trailers: Headers,
    ) -> Result<(), Error> {
        if self.ingress_suppressed() {
            return Ok(());
        }
        self.refresh_idle_timer(ctx.now);
        if self.partially_reliable {
            return Err(Self::ingress_rejected(
                "trailers are incompatible with partial reliability",
            ));
        }
        self.ingress_state
            .on_trailers()
            .map_err(|_| Self::ingress_rejected("trailers not expected in this state"))?;

        if self.must_queue() {
            return self.defer_event(IngressEvent::Trailers(trailers));
        }
        handler.on_trailers(self, ctx, trailers);
        Ok(())
    }

    fn ingress_upgrade(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        protocol: String,
    ) -> Result<(), Error> {
        if self.ingress_suppressed() {
            return Ok(());
        }
        self.refresh_idle_timer(ctx.now);
        self.ingress_state
            .on_upgrade()
            .map_err(|_| Self::ingress_rejected("upgrade not expected in this state"))?;

        if self.must_queue() {
            return self.defer_event(IngressEvent::Upgrade(protocol));
        }
        handler.on_upgrade(self, ctx, protocol);
        Ok(())
    }

    fn ingress_eom(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
    ) -> Result<(), Error> {
        if self.ingress_suppressed() {
            return Ok(());
        }
        self.refresh_idle_timer(ctx.now);
        self.ingress_state
            .on_eom()
            .map_err(|_| Self::ingress_rejected("end-of-message not expected in this state"))?;
        if let Some(remaining) = self.remaining_ingress_length {
            if remaining != 0 {
                return Err(Self::ingress_rejected("body shorter than content-length"));
            }
        }

        if self.must_queue() {
            return self.defer_event(IngressEvent::Eom);
        }
        self.deliver_eom(ctx, handler)
    }

    // ----- deferral -----

    fn must_queue(&self) -> bool {
        self.ingress_paused
            || self
                .deferred_ingress
                .as_ref()
                .is_some_and(|queue| !queue.is_empty())
    }

    fn defer_event(&mut self, event: IngressEvent) -> Result<(), Error> {
        let queue = self.deferred_ingress.get_or_insert_with(Default::default);
        queue.push(event);
        // with flow control on, withheld acknowledgements stall the peer
        // before the budget is reachable; without it the budget is the
        // only backstop
        if queue.bytes() > self.max_deferred_ingress && !self.flow_control {
            return Err(Error::resource("ingress buffer full").with_direction(ErrorDirection::Ingress));
        }
        Ok(())
    }

    fn drain_deferred_ingress(&mut self, ctx: &mut Context<'_>, handler: &mut dyn Handler) {
        if self.in_resume || self.ingress_paused || self.aborted || self.detached {
            return;
        }
        if self.deferred_ingress.as_ref().is_none_or(DeferredIngress::is_empty) {
            return;
        }
        self.in_resume = true;
        // hold the guard across callbacks: the handler may pause or abort
        // mid-drain
        self.call_depth += 1;
        while !(self.ingress_paused || self.aborted || self.detached) {
            let Some(event) = self.deferred_ingress.as_mut().and_then(DeferredIngress::pop)
            else {
                break;
            };
            if let Err(error) = self.dispatch_deferred(ctx, handler, event) {
                self.fail(ctx, error);
                break;
            }
        }
        self.call_depth -= 1;
        self.in_resume = false;
    }

    fn dispatch_deferred(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        event: IngressEvent,
    ) -> Result<(), Error> {
        match event {
            IngressEvent::Headers(message) => {
                handler.on_headers_complete(self, ctx, message);
                Ok(())
            }
            IngressEvent::Body(chunk) => self.deliver_body(ctx, handler, chunk),
            IngressEvent::ChunkHeader(length) => {
                handler.on_chunk_header(self, ctx, length);
                Ok(())
            }
            IngressEvent::ChunkComplete => {
                handler.on_chunk_complete(self, ctx);
                Ok(())
            }
            IngressEvent::Trailers(trailers) => {
                handler.on_trailers(self, ctx, trailers);
                Ok(())
            }
            IngressEvent::Upgrade(protocol) => {
                handler.on_upgrade(self, ctx, protocol);
                Ok(())
            }
            IngressEvent::Eom => self.deliver_eom(ctx, handler),
        }
    }

    fn deliver_body(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        chunk: Bytes,
    ) -> Result<(), Error> {
        let length = chunk.len() as u64;
        let offset = self.ingress_body_delivered;
        self.ingress_body_delivered += length;
        if self.partially_reliable {
            handler.on_body_with_offset(self, ctx, offset, chunk);
        } else {
            handler.on_body(self, ctx, chunk);
        }
        self.ack_ingress(ctx, length)
    }

    /// Acknowledges delivered bytes: session bookkeeping always, peer
    /// re-crediting only when flow control is on
    fn ack_ingress(&mut self, ctx: &mut Context<'_>, length: u64) -> Result<(), Error> {
        ctx.transport.notify_ingress_body_processed(length);
        if self.flow_control && length > 0 {
            self.recv_window.free(length);
            ctx.transport
                .send_window_update(self.id, length.min(u64::from(u32::MAX)) as u32)?;
        }
        Ok(())
    }

    fn deliver_eom(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
    ) -> Result<(), Error> {
        handler.on_eom(self, ctx);
        if self.aborted || self.detached {
            // the handler tore the transaction down inside the callback
            return Ok(());
        }
        self.ingress_state.on_eom_flushed().map_err(|_| {
            Error::new(
                Kind::Protocol,
                ErrorCode::InternalError,
                ErrorDirection::Ingress,
                "end-of-message flushed twice",
            )
        })?;
        // the read side is complete
        self.idle_timer.cancel();
        Ok(())
    }

    fn record_response_status(
        &mut self,
        status: u16,
        direction: ErrorDirection,
    ) -> Result<(), Error> {
        if self.last_response_status >= 200 {
            return Err(Error::protocol("final status already recorded").with_direction(direction));
        }
        self.last_response_status = status;
        Ok(())
    }

    // ----- pause / resume -----

    /// Handler-facing: stop delivering ingress callbacks and start
    /// queueing events
    pub fn pause_ingress(&mut self, ctx: &mut Context<'_>) {
        if self.ingress_paused || self.aborted || self.detached {
            return;
        }
        self.ingress_paused = true;
        ctx.transport.pause_ingress(self.id);
        ctx.events
            .on_ingress_paused(&event::IngressPaused { id: self.id });
    }

    /// Session-facing: resume delivery and drain the deferred queue. The
    /// drain re-enters handler callbacks, so resumption is driven through
    /// the session rather than from inside a callback.
    pub fn resume_ingress(&mut self, ctx: &mut Context<'_>, handler: &mut dyn Handler) {
        self.enter();
        if self.ingress_paused && !(self.aborted || self.detached) {
            self.ingress_paused = false;
            ctx.transport.resume_ingress(self.id);
            ctx.events
                .on_ingress_resumed(&event::IngressResumed { id: self.id });
        }
        self.exit(ctx, handler);
    }

    pub fn on_egress_paused_by_transport(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
    ) {
        self.enter();
        if !self.egress_paused_by_transport {
            self.egress_paused_by_transport = true;
            self.queue_egress_pause();
        }
        self.exit(ctx, handler);
    }

    pub fn on_egress_resumed_by_transport(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
    ) {
        self.enter();
        if self.egress_paused_by_transport {
            self.egress_paused_by_transport = false;
            // a stall must not accumulate a pacing burst
            self.pacer.restart(ctx.now);
            self.evaluate_egress_pause_state();
            if self.has_pending_egress() {
                self.request_egress(ctx);
            }
        }
        self.exit(ctx, handler);
    }

    fn evaluate_egress_pause_state(&mut self) {
        let window_blocked =
            self.flow_control && self.send_window.is_exhausted() && self.has_pending_egress();
        let buffer_full = self.deferred_egress.body_bytes() as usize >= self.egress_buffer_limit;
        if self.egress_paused_by_transport || window_blocked || buffer_full {
            self.queue_egress_pause();
        } else {
            self.queue_egress_resume();
        }
    }

    fn queue_egress_pause(&mut self) {
        if self.handler_egress_paused || self.aborted || self.detached {
            return;
        }
        self.handler_egress_paused = true;
        self.notices.push(Notice::EgressPaused);
    }

    fn queue_egress_resume(&mut self) {
        if !self.handler_egress_paused {
            return;
        }
        self.handler_egress_paused = false;
        self.notices.push(Notice::EgressResumed);
    }

    // ----- egress operations -----

    fn check_egress_open(&self) -> Result<(), Error> {
        if self.aborted || self.detached || self.egress_state.is_terminal() {
            return Err(Error::new(
                Kind::Protocol,
                ErrorCode::StreamClosed,
                ErrorDirection::Egress,
                "egress on a closed transaction",
            ));
        }
        Ok(())
    }

    fn egress_fatal(&mut self, ctx: &mut Context<'_>, error: Error) -> Error {
        self.fail(ctx, error);
        error
    }

    pub fn send_headers_with_eom(
        &mut self,
        ctx: &mut Context<'_>,
        message: MessageHead,
    ) -> Result<(), Error> {
        self.send_headers(ctx, message, true)
    }

    /// Headers are never flow controlled: they go to the transport
    /// immediately
    pub fn send_headers(
        &mut self,
        ctx: &mut Context<'_>,
        message: MessageHead,
        eom: bool,
    ) -> Result<(), Error> {
        self.check_egress_open()?;
        let informational = message.is_informational();
        if informational && eom {
            let error = Error::protocol("interim response cannot end the message")
                .with_direction(ErrorDirection::Egress);
            return Err(self.egress_fatal(ctx, error));
        }

        let repeated_interim = self.direction.is_downstream()
            && self.egress_state.is_headers_sent()
            && (100..200).contains(&self.last_response_status)
            && matches!(message, MessageHead::Response(_));
        if !repeated_interim {
            self.egress_state.on_send_headers().map_err(|_| {
                self.egress_fatal(
                    ctx,
                    Error::protocol("headers already sent").with_direction(ErrorDirection::Egress),
                )
            })?;
        }

        if let Some(status) = message.status() {
            if self.direction.is_downstream() {
                if let Err(error) = self.record_response_status(status, ErrorDirection::Egress) {
                    return Err(self.egress_fatal(ctx, error));
                }
            }
        }
        if !informational {
            self.expected_response_length = message.content_length();
        }

        ctx.transport
            .send_headers(self.id, &message, eom)
            .map_err(|error| self.egress_fatal(ctx, error))?;
        self.egress_headers_delivered = true;
        self.refresh_idle_timer(ctx.now);

        if eom {
            if let Some(expected) = self.expected_response_length {
                if expected != 0 {
                    let error = Error::protocol("content-length promised a body")
                        .with_direction(ErrorDirection::Egress);
                    return Err(self.egress_fatal(ctx, error));
                }
            }
            let done = self
                .egress_state
                .on_send_eom()
                .and_then(|_| self.egress_state.on_eom_flushed());
            debug_assert!(done.is_ok());
        }
        Ok(())
    }

    /// Appends body to the deferred buffer and requests scheduling; body
    /// is never written synchronously
    pub fn send_body(&mut self, ctx: &mut Context<'_>, chunk: Bytes) -> Result<(), Error> {
        self.check_egress_open()?;
        self.egress_state.on_send_body().map_err(|_| {
            self.egress_fatal(
                ctx,
                Error::protocol("body not expected in this state")
                    .with_direction(ErrorDirection::Egress),
            )
        })?;

        let length = chunk.len() as u64;
        self.actual_response_length += length;
        self.deferred_egress.push_body(chunk);
        if length > 0 {
            ctx.transport.notify_egress_body_buffered(length as i64);
        }
        self.request_egress(ctx);
        if self.deferred_egress.body_bytes() as usize >= self.egress_buffer_limit {
            self.queue_egress_pause();
        }
        Ok(())
    }

    pub fn send_chunk_header(&mut self, ctx: &mut Context<'_>, length: u64) -> Result<(), Error> {
        self.check_egress_open()?;
        if self.partially_reliable {
            let error = Error::protocol("chunked framing is incompatible with partial reliability")
                .with_direction(ErrorDirection::Egress);
            return Err(self.egress_fatal(ctx, error));
        }
        self.egress_state.on_send_chunk_header().map_err(|_| {
            self.egress_fatal(
                ctx,
                Error::protocol("chunk header not expected in this state")
                    .with_direction(ErrorDirection::Egress),
            )
        })?;
        if !ctx.transport.is_multiplexing() {
            self.deferred_egress.push_chunk_header(length);
        }
        Ok(())
    }

    pub fn send_chunk_terminator(&mut self, ctx: &mut Context<'_>) -> Result<(), Error> {
        self.check_egress_open()?;
        self.egress_state.on_send_chunk_terminator().map_err(|_| {
            self.egress_fatal(
                ctx,
                Error::protocol("chunk terminator without an open chunk")
                    .with_direction(ErrorDirection::Egress),
            )
        })?;
        if !ctx.transport.is_multiplexing() {
            self.deferred_egress.push_chunk_terminator();
            self.request_egress(ctx);
        }
        Ok(())
    }

    /// Trailers are held and flushed together with the end-of-message
    pub fn send_trailers(&mut self, ctx: &mut Context<'_>, trailers: Headers) -> Result<(), Error> {
        self.check_egress_open()?;
        if self.partially_reliable {
            let error = Error::protocol("trailers are incompatible with partial reliability")
                .with_direction(ErrorDirection::Egress);
            return Err(self.egress_fatal(ctx, error));
        }
        self.egress_state.on_send_trailers().map_err(|_| {
            self.egress_fatal(
                ctx,
                Error::protocol("trailers not expected in this state")
                    .with_direction(ErrorDirection::Egress),
            )
        })?;
        self.trailers = Some(trailers);
        Ok(())
    }

    pub fn send_eom(&mut self, ctx: &mut Context<'_>) -> Result<(), Error> {
        self.check_egress_open()?;
        if let Some(expected) = self.expected_response_length {
            if self.actual_response_length != expected {
                let error = Error::protocol("body does not match content-length")
                    .with_direction(ErrorDirection::Egress);
                return Err(self.egress_fatal(ctx, error));
            }
        }
        self.egress_state.on_send_eom().map_err(|_| {
            self.egress_fatal(
                ctx,
                Error::protocol("end-of-message not expected in this state")
                    .with_direction(ErrorDirection::Egress),
            )
        })?;
        self.eom_queued = true;
        self.request_egress(ctx);
        Ok(())
    }

    fn request_egress(&mut self, ctx: &mut Context<'_>) {
        if let Some(handle) = self.priority_handle {
            ctx.scheduler.set_pending_egress(handle);
        }
        ctx.transport.notify_pending_egress();
    }

    // ----- flush -----

    /// One scheduled write pass. Returns whether work remains; the caller
    /// decides whether to re-enqueue.
    pub fn on_write_ready(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        max_bytes: u64,
        weight_ratio: f64,
    ) -> bool {
        self.enter();
        let more = match self.flush(ctx, max_bytes, weight_ratio) {
            Ok(more) => more,
            Err(error) => {
                self.fail(ctx, error);
                false
            }
        };
        self.exit(ctx, handler);
        more
    }

    fn flush(
        &mut self,
        ctx: &mut Context<'_>,
        max_bytes: u64,
        weight_ratio: f64,
    ) -> Result<bool, Error> {
        if self.aborted || self.detached {
            return Ok(false);
        }
        if self.egress_paused_by_transport {
            return Ok(self.has_pending_egress());
        }

        match self.pacer.check(ctx.now) {
            Ok(()) => self.egress_rate_limited = false,
            Err(delay) => {
                self.egress_rate_limited = true;
                ctx.events.on_egress_rate_limited(&event::EgressRateLimited {
                    id: self.id,
                    delay,
                });
                // stay out of the runnable set until the wake fires
                if let Some(handle) = self.priority_handle {
                    ctx.scheduler.clear_pending_egress(handle);
                }
                return Ok(true);
            }
        }

        let window_available = if self.flow_control {
            self.send_window.available()
        } else {
            u64::MAX
        };
        let budget = max_bytes.min(window_available);
        let mut sent_body: u64 = 0;
        let mut eom_sent = false;

        while let Some(op) = self.deferred_egress.next_op(budget - sent_body) {
            match op {
                EgressOp::ChunkHeader(length) => {
                    ctx.transport.send_chunk_header(self.id, length)?;
                }
                EgressOp::ChunkTerminator => {
                    ctx.transport.send_chunk_terminator(self.id)?;
                }
                EgressOp::Body(chunk) => {
                    let length = chunk.len() as u64;
                    let eom = self.eom_queued
                        && self.trailers.is_none()
                        && self.deferred_egress.is_empty();
                    ctx.transport.send_body(self.id, chunk, eom, false)?;
                    sent_body += length;
                    eom_sent |= eom;
                }
            }
        }

        if sent_body > 0 {
            if self.flow_control {
                let reserved = self.send_window.reserve(sent_body);
                debug_assert!(reserved.is_ok(), "flush exceeded the send window");
                ctx.events.on_flow_control_updated(&event::FlowControlUpdated {
                    id: self.id,
                    available: self.send_window.available(),
                });
            }
            self.pacer.on_egress(sent_body, ctx.now);
            self.egress_body_bytes_committed += sent_body;
            ctx.transport.notify_egress_body_buffered(-(sent_body as i64));
            self.refresh_idle_timer(ctx.now);
        }

        if self.deferred_egress.is_empty() && self.eom_queued {
            if !eom_sent {
                let trailers = self.trailers.take();
                ctx.transport.send_eom(self.id, trailers.as_ref())?;
            }
            self.eom_queued = false;
            self.trailers = None;
            let done = self.egress_state.on_eom_flushed();
            debug_assert!(done.is_ok(), "EOM flushed without being queued");
        }

        self.cumulative_weight_ratio += weight_ratio;
        self.egress_calls += 1;

        self.evaluate_egress_pause_state();
        let more = self.has_pending_egress();
        if !more {
            if let Some(handle) = self.priority_handle {
                ctx.scheduler.clear_pending_egress(handle);
            }
        }
        Ok(more)
    }

    // ----- windows -----

    pub fn on_ingress_window_update(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        delta: u32,
    ) {
        self.enter();
        if self.flow_control && !(self.aborted || self.detached) {
            self.send_window.free(u64::from(delta));
            ctx.events.on_flow_control_updated(&event::FlowControlUpdated {
                id: self.id,
                available: self.send_window.available(),
            });
            if self.has_pending_egress() && !self.send_window.is_exhausted() {
                self.request_egress(ctx);
            }
        }
        self.exit(ctx, handler);
    }

    /// A settings-level change to the send window capacity
    pub fn on_send_window_capacity(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        capacity: u32,
    ) {
        self.enter();
        if self.flow_control && !(self.aborted || self.detached) {
            if self.send_window.set_capacity(capacity).is_err() {
                let error = Error::new(
                    Kind::Protocol,
                    ErrorCode::FlowControlError,
                    ErrorDirection::Egress,
                    "send window capacity overflowed",
                );
                self.fail(ctx, error);
            } else {
                ctx.events.on_flow_control_updated(&event::FlowControlUpdated {
                    id: self.id,
                    available: self.send_window.available(),
                });
            }
        }
        self.exit(ctx, handler);
    }

    // ----- timers -----

    fn refresh_idle_timer(&mut self, now: Timestamp) {
        if self.ingress_state.is_terminal() {
            self.idle_timer.cancel();
            return;
        }
        if let Some(timeout) = self.idle_timeout {
            self.idle_timer.set(now + timeout);
        }
    }

    pub fn on_timeout(&mut self, ctx: &mut Context<'_>, handler: &mut dyn Handler) {
        self.enter();
        if self.idle_timer.poll_expiration(ctx.now).is_ready() {
            ctx.events.on_transaction_timeout(&event::TransactionTimeout {
                id: self.id,
                idle: self.idle_timeout.unwrap_or_default(),
            });
            ctx.transport.transaction_timeout(self.id);
            self.fail(ctx, Error::timeout());
        }
        self.exit(ctx, handler);
    }

    pub fn on_rate_limit_timeout(&mut self, ctx: &mut Context<'_>, handler: &mut dyn Handler) {
        self.enter();
        if self.pacer.on_timeout(ctx.now) {
            self.egress_rate_limited = false;
            if self.has_pending_egress() && !(self.aborted || self.detached) {
                self.request_egress(ctx);
            }
        }
        self.exit(ctx, handler);
    }

    pub fn set_egress_rate_limit(&mut self, ctx: &mut Context<'_>, bytes_per_ms: u64) {
        self.pacer.set_rate(bytes_per_ms, ctx.now);
    }

    // ----- priority -----

    /// Updates the local priority and emits a priority frame; a repeated
    /// identical update is suppressed
    pub fn update_and_send_priority(
        &mut self,
        ctx: &mut Context<'_>,
        priority: Priority,
    ) -> Result<(), Error> {
        if self.aborted || self.detached || priority == self.priority {
            return Ok(());
        }
        self.update_priority(ctx, priority);
        ctx.transport.send_priority(self.id, priority)?;
        Ok(())
    }

    /// A priority update from the peer: applied locally, nothing emitted
    pub fn on_priority_update(&mut self, ctx: &mut Context<'_>, priority: Priority) {
        if self.aborted || self.detached {
            return;
        }
        self.update_priority(ctx, priority);
    }

    fn update_priority(&mut self, ctx: &mut Context<'_>, priority: Priority) {
        self.priority = priority;
        if let Some(handle) = self.priority_handle {
            ctx.scheduler.update(handle, priority);
        }
    }

    // ----- abort and errors -----

    /// Handler-facing abort: tears the transaction down without an error
    /// callback (the handler initiated it)
    pub fn send_abort(&mut self, ctx: &mut Context<'_>, code: ErrorCode) -> Result<(), Error> {
        if self.aborted || self.detached {
            return Ok(());
        }
        self.teardown(ctx);
        let result = if self.egress_state.is_terminal() {
            Ok(0)
        } else {
            ctx.transport.send_abort(self.id, code)
        };
        // teardown completes even when the abort frame fails to write
        self.finish_teardown(ctx);
        result.map(|_| ())
    }

    /// Peer reset: terminal, but nothing is echoed back
    pub fn on_ingress_abort(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        code: ErrorCode,
    ) {
        self.enter();
        if !(self.aborted || self.detached) {
            self.fail_with(ctx, Error::peer_abort(code), false);
        }
        self.exit(ctx, handler);
    }

    pub fn on_ingress_goaway(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        code: ErrorCode,
    ) {
        self.enter();
        if !(self.aborted || self.detached) {
            handler.on_goaway(code);
        }
        self.exit(ctx, handler);
    }

    fn fail(&mut self, ctx: &mut Context<'_>, error: Error) {
        self.fail_with(ctx, error, true);
    }

    fn fail_with(&mut self, ctx: &mut Context<'_>, error: Error, send_abort: bool) {
        if self.aborted || self.detached {
            return;
        }
        debug_assert!(error.is_fatal());
        ctx.events.on_transaction_error(&event::TransactionError {
            id: self.id,
            error: &error,
        });
        self.teardown(ctx);
        if send_abort && !self.egress_state.is_terminal() {
            let _ = ctx.transport.send_abort(self.id, error.code());
        }
        self.finish_teardown(ctx);
        self.notices.push(Notice::Error(error));
    }

    /// Clears buffered state ahead of the abort frame
    fn teardown(&mut self, ctx: &mut Context<'_>) {
        self.idle_timer.cancel();
        self.pacer.cancel();
        if let Some(queue) = self.deferred_ingress.as_mut() {
            queue.clear();
        }
        let buffered = self.deferred_egress.body_bytes();
        if buffered > 0 {
            ctx.transport.notify_egress_body_buffered(-(buffered as i64));
        }
        self.deferred_egress.clear();
        self.trailers = None;
        self.eom_queued = false;
    }

    /// Pins both state machines terminal and cascades to sub-transactions
    fn finish_teardown(&mut self, ctx: &mut Context<'_>) {
        self.aborted = true;
        for child in self.pushed_transactions.drain() {
            let _ = ctx.transport.send_abort(child, ErrorCode::Cancel);
        }
        for child in self.ex_transactions.drain() {
            let _ = ctx.transport.send_abort(child, ErrorCode::Cancel);
        }
        self.ingress_state = Ingress::ReceivingDone;
        self.egress_state = Egress::SendingDone;
        if let Some(handle) = self.priority_handle {
            ctx.scheduler.clear_pending_egress(handle);
        }
    }

    fn should_notify_error(&self, error: &Error) -> bool {
        let Some(ex) = self.ex_attributes else {
            return true;
        };
        if !ex.unidirectional {
            return true;
        }
        // only the live direction of a unidirectional ex transaction
        // surfaces errors
        let active = if self.id.initiator() == self.direction.local_initiator() {
            ErrorDirection::Egress
        } else {
            ErrorDirection::Ingress
        };
        error.direction().covers(active)
    }

    // ----- push and ex sub-transactions -----

    /// Validates a server push and records the child; the session
    /// constructs the pushed transaction from the returned attributes
    pub fn new_pushed_transaction(
        &mut self,
        ctx: &mut Context<'_>,
        pushed: TransactionId,
    ) -> Result<PushAttributes, Error> {
        self.check_egress_open()?;
        if !self.direction.is_downstream() {
            return Err(Error::protocol("only downstream transactions push")
                .with_direction(ErrorDirection::Egress));
        }
        if self.egress_state.is_finishing() {
            return Err(Error::protocol("push after the response completed")
                .with_direction(ErrorDirection::Egress));
        }
        if self.partially_reliable {
            let error = Error::protocol("push is incompatible with partial reliability")
                .with_direction(ErrorDirection::Egress);
            return Err(self.egress_fatal(ctx, error));
        }
        if ctx.transport.is_draining() {
            return Err(Error::new(
                Kind::Transport,
                ErrorCode::RefusedStream,
                ErrorDirection::Egress,
                "session is draining",
            ));
        }
        self.pushed_transactions.insert(pushed);
        Ok(PushAttributes {
            assoc_stream_id: self.id,
            priority: self.priority,
        })
    }

    /// Records an extended child bound to this control stream
    pub fn new_ex_transaction(
        &mut self,
        _ctx: &mut Context<'_>,
        ex: TransactionId,
        unidirectional: bool,
    ) -> Result<ExAttributes, Error> {
        if self.aborted || self.detached {
            return Err(Error::new(
                Kind::Protocol,
                ErrorCode::StreamClosed,
                ErrorDirection::Both,
                "ex transaction on a closed control stream",
            ));
        }
        self.ex_transactions.insert(ex);
        Ok(ExAttributes {
            control_stream: self.id,
            unidirectional,
        })
    }

    /// The peer promised a pushed transaction associated with this one
    pub fn on_ingress_pushed(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        pushed: TransactionId,
    ) {
        self.enter();
        if !self.ingress_suppressed() {
            if self.direction.is_upstream() {
                self.pushed_transactions.insert(pushed);
                handler.on_pushed_transaction(self, ctx, pushed);
            } else {
                self.fail(
                    ctx,
                    Self::ingress_rejected("push promise received on the pushing side"),
                );
            }
        }
        self.exit(ctx, handler);
    }

    /// The peer opened an extended transaction on this control stream
    pub fn on_ingress_ex(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        ex: TransactionId,
    ) {
        self.enter();
        if !self.ingress_suppressed() {
            self.ex_transactions.insert(ex);
            handler.on_ex_transaction(self, ctx, ex);
        }
        self.exit(ctx, handler);
    }

    /// A pushed or ex child completed on its own; it no longer needs a
    /// cascaded abort
    pub fn on_child_closed(&mut self, child: TransactionId) {
        self.pushed_transactions.remove(&child);
        self.ex_transactions.remove(&child);
    }

    #[inline]
    pub fn pushed_transactions(&self) -> impl Iterator<Item = TransactionId> + '_ {
        self.pushed_transactions.iter().copied()
    }

    #[inline]
    pub fn ex_transactions(&self) -> impl Iterator<Item = TransactionId> + '_ {
        self.ex_transactions.iter().copied()
    }

    // ----- partial reliability -----

    /// Switches to partially reliable body transfer; signaled by the
    /// codec at first headers
    pub fn enable_partial_reliability(&mut self) -> Result<(), Error> {
        if self.aborted || self.detached {
            return Err(Error::new(
                Kind::Protocol,
                ErrorCode::StreamClosed,
                ErrorDirection::Both,
                "partial reliability on a closed transaction",
            ));
        }
        if self.ingress_state.is_chunked()
            || self.egress_state.is_chunked()
            || self.trailers.is_some()
            || self.assoc_stream_id.is_some()
            || !self.pushed_transactions.is_empty()
        {
            return Err(Error::protocol(
                "partial reliability is incompatible with chunked framing, trailers, and push",
            ));
        }
        self.partially_reliable = true;
        Ok(())
    }

    /// Sender side: advertise that body below `offset` will be skipped.
    /// Returns the accepted offset.
    pub fn skip_body_to(&mut self, ctx: &mut Context<'_>, offset: u64) -> Result<u64, Error> {
        self.check_egress_open()?;
        if !self.partially_reliable {
            return Err(Error::unsupported("skip_body_to without partial reliability"));
        }
        if !self.egress_headers_delivered {
            return Err(Error::protocol("skip before headers were sent")
                .with_direction(ErrorDirection::Egress));
        }
        let committed = self.egress_body_bytes_committed;
        let target = offset.max(committed);
        ctx.transport.skip_body_to(self.id, target)?;
        self.trim_egress_below(ctx, target);
        Ok(self.egress_body_bytes_committed)
    }

    /// Receiver side: advertise that body below `offset` is unwanted.
    /// Returns the advertised offset.
    pub fn reject_body_to(&mut self, ctx: &mut Context<'_>, offset: u64) -> Result<u64, Error> {
        if self.aborted || self.detached {
            return Err(Error::new(
                Kind::Protocol,
                ErrorCode::StreamClosed,
                ErrorDirection::Ingress,
                "reject on a closed transaction",
            ));
        }
        if !self.partially_reliable {
            return Err(Error::unsupported("reject_body_to without partial reliability"));
        }
        let target = offset.max(self.ingress_body_offset);
        ctx.transport.reject_body_to(self.id, target)?;
        self.ingress_body_offset = target;
        self.ingress_body_delivered = self.ingress_body_delivered.max(target);
        Ok(target)
    }

    /// The peer's sender skipped body below `offset`
    pub fn on_ingress_body_skipped(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        offset: u64,
    ) {
        self.enter();
        if !self.ingress_suppressed() {
            if self.partially_reliable {
                self.ingress_body_offset = self.ingress_body_offset.max(offset);
                self.ingress_body_delivered = self.ingress_body_delivered.max(offset);
                handler.on_body_skipped(self, ctx, offset);
            } else {
                self.fail(
                    ctx,
                    Self::ingress_rejected("body skip without partial reliability"),
                );
            }
        }
        self.exit(ctx, handler);
    }

    /// The peer's receiver rejected body below `offset`: buffered bytes
    /// under it will never be sent
    pub fn on_ingress_body_rejected(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        offset: u64,
    ) {
        self.enter();
        if !self.ingress_suppressed() {
            if self.partially_reliable {
                self.trim_egress_below(ctx, offset);
                handler.on_body_rejected(self, ctx, offset);
            } else {
                self.fail(
                    ctx,
                    Self::ingress_rejected("body reject without partial reliability"),
                );
            }
        }
        self.exit(ctx, handler);
    }

    /// Partially reliable ingress started delivering unframed body
    pub fn on_ingress_unframed_body_started(
        &mut self,
        ctx: &mut Context<'_>,
        handler: &mut dyn Handler,
        offset: u64,
    ) {
        self.enter();
        if !self.ingress_suppressed() {
            if self.partially_reliable {
                handler.on_unframed_body_started(self, ctx, offset);
            } else {
                self.fail(
                    ctx,
                    Self::ingress_rejected("unframed body without partial reliability"),
                );
            }
        }
        self.exit(ctx, handler);
    }

    fn trim_egress_below(&mut self, ctx: &mut Context<'_>, offset: u64) {
        let committed = self.egress_body_bytes_committed;
        if offset <= committed {
            return;
        }
        let trimmed = self.deferred_egress.trim_front(offset - committed);
        if trimmed > 0 {
            ctx.transport.notify_egress_body_buffered(-(trimmed as i64));
        }
        self.egress_body_bytes_committed = offset;
    }

    // ----- peek / consume / delivery tracking -----

    /// Visits unconsumed ingress body without consuming it, forwarding
    /// each region to the handler's `on_body_peek`
    pub fn peek(&mut self, ctx: &mut Context<'_>, handler: &mut dyn Handler) -> Result<(), Error> {
        if self.aborted || self.detached {
            return Err(Error::new(
                Kind::Protocol,
                ErrorCode::StreamClosed,
                ErrorDirection::Ingress,
                "peek on a closed transaction",
            ));
        }
        ctx.transport
            .peek(self.id, &mut |offset, chunk| handler.on_body_peek(offset, chunk))
    }

    /// Consumes previously peeked bytes, re-crediting the peer
    pub fn consume(&mut self, ctx: &mut Context<'_>, bytes: u64) -> Result<(), Error> {
        if self.aborted || self.detached {
            return Err(Error::new(
                Kind::Protocol,
                ErrorCode::StreamClosed,
                ErrorDirection::Ingress,
                "consume on a closed transaction",
            ));
        }
        ctx.transport.consume(self.id, bytes)?;
        self.ack_ingress(ctx, bytes)
    }

    /// Registers last-byte delivery tracking; detach waits for the ack
    pub fn track_egress_delivery(&mut self, ctx: &mut Context<'_>) -> Result<(), Error> {
        self.check_egress_open()?;
        ctx.transport
            .track_egress_body_delivery(self.id, self.actual_response_length)?;
        self.pending_byte_events += 1;
        Ok(())
    }

    pub fn on_egress_delivery_acked(&mut self, ctx: &mut Context<'_>, handler: &mut dyn Handler) {
        self.enter();
        self.pending_byte_events = self.pending_byte_events.saturating_sub(1);
        self.exit(ctx, handler);
    }
}
