// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The dual per-transaction state machines.
//!
//! Each transaction runs one [`Ingress`] and one [`Egress`] machine. The
//! tables below encode the wire grammar: headers exactly once, then either
//! regular body, a repeatable chunk group, or an upgrade, an optional
//! trailer block, and a terminal end-of-message. An `on_eom_flushed` event
//! moves the machine to its terminal state once the end-of-message has
//! been delivered to the far side (handler for ingress, transport for
//! egress).
//!
//! Repeated headers for 1xx interim responses are deliberately absent from
//! these tables; the transaction layer short-circuits the machine for that
//! single case (see `htx-transaction`), keeping the tables a faithful
//! cross-product of the grammar.

use crate::state::{event, is};

//   o
//   | on_headers
//   v
// HeadersReceived ──on_body──────────> RegularBodyReceived ─┐
//   │  │  │                                 │ on_body (loop) │
//   │  │  └─on_chunk_header─> ChunkHeaderReceived            │
//   │  │                          │ on_body                  │
//   │  │                          v                          │
//   │  │                    ChunkBodyReceived ─on_chunk_complete─> ChunkCompleted
//   │  │                                                    (on_chunk_header reopens)
//   │  └─on_upgrade─> UpgradeComplete (on_body loops)
//   └─on_trailers──> TrailersReceived
//
// on_eom from any non-terminal post-headers state => EomQueued
// on_eom_flushed: EomQueued => ReceivingDone (terminal)

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Ingress {
    #[default]
    Start,
    HeadersReceived,
    RegularBodyReceived,
    ChunkHeaderReceived,
    ChunkBodyReceived,
    ChunkCompleted,
    TrailersReceived,
    UpgradeComplete,
    EomQueued,
    ReceivingDone,
}

impl Ingress {
    is!(is_start, Start);
    is!(is_headers_received, HeadersReceived);
    is!(is_upgraded, UpgradeComplete);
    is!(is_eom_queued, EomQueued);
    is!(is_terminal, ReceivingDone);
    is!(
        /// True once the end-of-message has been observed, whether or not
        /// it has reached the handler yet
        is_finishing,
        EomQueued | ReceivingDone
    );
    is!(
        is_chunked,
        ChunkHeaderReceived | ChunkBodyReceived | ChunkCompleted
    );

    event! {
        on_headers(Start => HeadersReceived);
        on_body(
            HeadersReceived | RegularBodyReceived => RegularBodyReceived,
            ChunkHeaderReceived | ChunkBodyReceived => ChunkBodyReceived,
            UpgradeComplete => UpgradeComplete,
        );
        on_chunk_header(HeadersReceived | ChunkCompleted => ChunkHeaderReceived);
        on_chunk_complete(ChunkBodyReceived => ChunkCompleted);
        on_trailers(HeadersReceived | RegularBodyReceived | ChunkCompleted => TrailersReceived);
        on_upgrade(HeadersReceived => UpgradeComplete);
        on_eom(
            HeadersReceived | RegularBodyReceived | ChunkHeaderReceived | ChunkBodyReceived
                | ChunkCompleted | TrailersReceived | UpgradeComplete => EomQueued,
        );
        on_eom_flushed(EomQueued => ReceivingDone);
    }
}

//   o
//   | on_send_headers
//   v
// HeadersSent ──on_send_body────> RegularBodySent (on_send_body loops)
//   │  │
//   │  └─on_send_chunk_header─> ChunkHeaderSent ─on_send_body─> ChunkBodySent
//   │             ^                                   │ on_send_chunk_terminator
//   │             └────────── ChunkTerminatorSent <───┘
//   └─on_send_trailers (also from RegularBodySent / ChunkTerminatorSent)
//
// on_send_eom: HeadersSent | RegularBodySent | ChunkTerminatorSent | TrailersSent => EomQueued
// on_eom_flushed: EomQueued => SendingDone (terminal)

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Egress {
    #[default]
    Start,
    HeadersSent,
    RegularBodySent,
    ChunkHeaderSent,
    ChunkBodySent,
    ChunkTerminatorSent,
    TrailersSent,
    EomQueued,
    SendingDone,
}

impl Egress {
    is!(is_start, Start);
    is!(is_headers_sent, HeadersSent);
    is!(is_eom_queued, EomQueued);
    is!(is_terminal, SendingDone);
    is!(
        /// True once the end-of-message has been queued or flushed
        is_finishing,
        EomQueued | SendingDone
    );
    is!(
        is_chunked,
        ChunkHeaderSent | ChunkBodySent | ChunkTerminatorSent
    );

    event! {
        on_send_headers(Start => HeadersSent);
        on_send_body(
            HeadersSent | RegularBodySent => RegularBodySent,
            ChunkHeaderSent | ChunkBodySent => ChunkBodySent,
        );
        on_send_chunk_header(HeadersSent | ChunkTerminatorSent => ChunkHeaderSent);
        on_send_chunk_terminator(ChunkBodySent => ChunkTerminatorSent);
        on_send_trailers(HeadersSent | RegularBodySent | ChunkTerminatorSent => TrailersSent);
        on_send_eom(
            HeadersSent | RegularBodySent | ChunkTerminatorSent | TrailersSent => EomQueued,
        );
        on_eom_flushed(EomQueued => SendingDone);
    }
}
