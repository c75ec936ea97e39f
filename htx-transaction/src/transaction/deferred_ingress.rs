// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Ingress events buffered while the handler has paused reception.
//!
//! The queue is created lazily on the first buffered event and drained in
//! FIFO order on resume. Ordering is preserved across event types: once
//! anything is queued, every later event queues behind it.

use bytes::Bytes;
use htx_core::message::{Headers, MessageHead};
use std::collections::VecDeque;

#[derive(Debug)]
pub(crate) enum IngressEvent {
    Headers(MessageHead),
    Body(Bytes),
    ChunkHeader(u64),
    ChunkComplete,
    Trailers(Headers),
    Upgrade(String),
    Eom,
}

impl IngressEvent {
    /// The bytes this event holds against the deferred-ingress budget
    fn cost(&self) -> usize {
        match self {
            Self::Headers(message) => message.encoded_size(),
            Self::Body(chunk) => chunk.len(),
            Self::Trailers(trailers) => trailers.encoded_size(),
            Self::ChunkHeader(_) | Self::ChunkComplete | Self::Upgrade(_) | Self::Eom => 0,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct DeferredIngress {
    queue: VecDeque<IngressEvent>,
    bytes: usize,
}

impl DeferredIngress {
    pub fn push(&mut self, event: IngressEvent) {
        self.bytes += event.cost();
        self.queue.push_back(event);
    }

    pub fn pop(&mut self) -> Option<IngressEvent> {
        let event = self.queue.pop_front()?;
        self.bytes -= event.cost();
        Some(event)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Bytes currently held against the budget
    #[inline]
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_and_budget() {
        let mut queue = DeferredIngress::default();
        assert!(queue.is_empty());

        queue.push(IngressEvent::Body(Bytes::from_static(b"hello")));
        queue.push(IngressEvent::ChunkComplete);
        queue.push(IngressEvent::Eom);
        assert_eq!(queue.bytes(), 5);

        assert!(matches!(queue.pop(), Some(IngressEvent::Body(_))));
        assert_eq!(queue.bytes(), 0);
        assert!(matches!(queue.pop(), Some(IngressEvent::ChunkComplete)));
        assert!(matches!(queue.pop(), Some(IngressEvent::Eom)));
        assert!(queue.pop().is_none());
    }
}
