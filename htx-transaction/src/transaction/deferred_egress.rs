// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Outbound body not yet accepted by the transport.
//!
//! The buffer is an ordered operation queue: body byte segments
//! interleaved with chunk-framing markers. Markers are only recorded when
//! the codec is not multiplexing (HTTP/1.x); they cost nothing against
//! flow control or pacing, which see body bytes only. The flush path
//! consumes a prefix bounded by a body-byte budget, splitting a segment
//! mid-way when the budget lands inside it.

use bytes::{Buf, Bytes};
use std::collections::VecDeque;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum EgressOp {
    ChunkHeader(u64),
    Body(Bytes),
    ChunkTerminator,
}

#[derive(Debug, Default)]
pub(crate) struct DeferredEgress {
    ops: VecDeque<EgressOp>,
    body_bytes: u64,
}

impl DeferredEgress {
    pub fn push_body(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.body_bytes += chunk.len() as u64;
        self.ops.push_back(EgressOp::Body(chunk));
    }

    pub fn push_chunk_header(&mut self, length: u64) {
        self.ops.push_back(EgressOp::ChunkHeader(length));
    }

    pub fn push_chunk_terminator(&mut self) {
        self.ops.push_back(EgressOp::ChunkTerminator);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[inline]
    pub fn body_bytes(&self) -> u64 {
        self.body_bytes
    }

    pub fn clear(&mut self) {
        self.ops.clear();
        self.body_bytes = 0;
    }

    /// Takes the next flushable operation, spending at most `max_body`
    /// body bytes.
    ///
    /// Markers are always flushable; a body segment larger than the
    /// budget is split and its remainder stays at the front. Returns
    /// `None` when the queue is empty or the budget blocks the front
    /// segment.
    pub fn next_op(&mut self, max_body: u64) -> Option<EgressOp> {
        match self.ops.front_mut()? {
            EgressOp::ChunkHeader(_) | EgressOp::ChunkTerminator => self.ops.pop_front(),
            EgressOp::Body(chunk) => {
                if max_body == 0 {
                    return None;
                }
                if chunk.len() as u64 <= max_body {
                    let op = self.ops.pop_front();
                    if let Some(EgressOp::Body(chunk)) = &op {
                        self.body_bytes -= chunk.len() as u64;
                    }
                    op
                } else {
                    let piece = chunk.split_to(max_body as usize);
                    self.body_bytes -= piece.len() as u64;
                    Some(EgressOp::Body(piece))
                }
            }
        }
    }

    /// Drops up to `bytes` body bytes from the front, for
    /// partial-reliability skip. The buffer must not hold chunk markers
    /// (chunked framing and partial reliability are mutually exclusive).
    pub fn trim_front(&mut self, mut bytes: u64) -> u64 {
        let mut trimmed = 0;
        while bytes > 0 {
            match self.ops.front_mut() {
                Some(EgressOp::Body(chunk)) => {
                    let take = (chunk.len() as u64).min(bytes);
                    if take == chunk.len() as u64 {
                        self.ops.pop_front();
                    } else {
                        chunk.advance(take as usize);
                    }
                    self.body_bytes -= take;
                    bytes -= take;
                    trimmed += take;
                }
                Some(_) => {
                    debug_assert!(false, "chunk markers cannot coexist with trim");
                    break;
                }
                None => break,
            }
        }
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budgeted_prefix_consume() {
        let mut buffer = DeferredEgress::default();
        buffer.push_body(Bytes::from_static(b"hello world"));
        assert_eq!(buffer.body_bytes(), 11);

        // the budget lands mid-segment; the segment splits
        let op = buffer.next_op(5).unwrap();
        assert_eq!(op, EgressOp::Body(Bytes::from_static(b"hello")));
        assert_eq!(buffer.body_bytes(), 6);

        assert!(buffer.next_op(0).is_none());

        let op = buffer.next_op(100).unwrap();
        assert_eq!(op, EgressOp::Body(Bytes::from_static(b" world")));
        assert!(buffer.is_empty());
    }

    #[test]
    fn markers_bypass_the_budget() {
        let mut buffer = DeferredEgress::default();
        buffer.push_chunk_header(4);
        buffer.push_body(Bytes::from_static(b"data"));
        buffer.push_chunk_terminator();

        assert_eq!(buffer.next_op(0), Some(EgressOp::ChunkHeader(4)));
        // the body is blocked until credit appears
        assert_eq!(buffer.next_op(0), None);
        assert_eq!(
            buffer.next_op(4),
            Some(EgressOp::Body(Bytes::from_static(b"data")))
        );
        assert_eq!(buffer.next_op(0), Some(EgressOp::ChunkTerminator));
        assert!(buffer.is_empty());
    }

    #[test]
    fn trim_front_spans_segments() {
        let mut buffer = DeferredEgress::default();
        buffer.push_body(Bytes::from_static(b"abc"));
        buffer.push_body(Bytes::from_static(b"defg"));

        assert_eq!(buffer.trim_front(5), 5);
        assert_eq!(buffer.body_bytes(), 2);
        assert_eq!(
            buffer.next_op(10),
            Some(EgressOp::Body(Bytes::from_static(b"fg")))
        );

        // trimming past the end stops at the buffered amount
        buffer.push_body(Bytes::from_static(b"x"));
        assert_eq!(buffer.trim_front(10), 1);
        assert!(buffer.is_empty());
    }
}
