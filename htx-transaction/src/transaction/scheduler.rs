// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The seam to the session's priority queue.
//!
//! The queue itself lives outside the engine: transactions only register,
//! deregister, and flip their pending-egress bit. The session traverses
//! runnable entries in priority order and calls `on_write_ready` on each;
//! nothing here decides scheduling.

use htx_core::transaction::TransactionId;

/// HTTP/2-style priority: dependency, weight, and the exclusive bit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Priority {
    /// The transaction this one depends on; zero means the root
    pub dependency: TransactionId,
    pub weight: u8,
    pub exclusive: bool,
}

impl Priority {
    pub const DEFAULT_WEIGHT: u8 = 16;

    pub const fn new() -> Self {
        Self {
            dependency: TransactionId::new(0),
            weight: Self::DEFAULT_WEIGHT,
            exclusive: false,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::new()
    }
}

/// An opaque reference into the external priority queue.
///
/// Handles are issued by [`Scheduler::add`] and are only meaningful to
/// the scheduler that produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PriorityHandle(u64);

impl PriorityHandle {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// The external priority queue's interface.
///
/// The engine guarantees it only sets pending-egress on handles it
/// obtained from `add` and not yet passed to `remove`.
pub trait Scheduler {
    /// Registers a transaction; the returned handle identifies it until
    /// `remove`
    fn add(&mut self, id: TransactionId, priority: Priority) -> PriorityHandle;

    fn remove(&mut self, handle: PriorityHandle);

    /// Re-parents or re-weights an entry
    fn update(&mut self, handle: PriorityHandle, priority: Priority);

    /// Marks the entry runnable: it has bytes or an EOM to flush
    fn set_pending_egress(&mut self, handle: PriorityHandle);

    fn clear_pending_egress(&mut self, handle: PriorityHandle);

    fn is_enqueued(&self, handle: PriorityHandle) -> bool;
}

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;

    #[derive(Debug)]
    struct Entry {
        handle: PriorityHandle,
        id: TransactionId,
        priority: Priority,
        pending: bool,
    }

    /// A first-come-first-served scheduler, sufficient to drive the
    /// engine in tests; priorities are recorded but not acted on.
    #[derive(Debug, Default)]
    pub struct FifoScheduler {
        next_handle: u64,
        entries: Vec<Entry>,
    }

    impl FifoScheduler {
        /// The ids currently marked runnable, in registration order
        pub fn pending(&self) -> Vec<TransactionId> {
            self.entries
                .iter()
                .filter(|entry| entry.pending)
                .map(|entry| entry.id)
                .collect()
        }

        pub fn priority_of(&self, id: TransactionId) -> Option<Priority> {
            self.entries
                .iter()
                .find(|entry| entry.id == id)
                .map(|entry| entry.priority)
        }

        pub fn contains(&self, id: TransactionId) -> bool {
            self.entries.iter().any(|entry| entry.id == id)
        }

        fn position(&self, handle: PriorityHandle) -> Option<usize> {
            self.entries.iter().position(|entry| entry.handle == handle)
        }
    }

    impl Scheduler for FifoScheduler {
        fn add(&mut self, id: TransactionId, priority: Priority) -> PriorityHandle {
            self.next_handle += 1;
            let handle = PriorityHandle::new(self.next_handle);
            self.entries.push(Entry {
                handle,
                id,
                priority,
                pending: false,
            });
            handle
        }

        fn remove(&mut self, handle: PriorityHandle) {
            if let Some(index) = self.position(handle) {
                self.entries.remove(index);
            }
        }

        fn update(&mut self, handle: PriorityHandle, priority: Priority) {
            if let Some(index) = self.position(handle) {
                self.entries[index].priority = priority;
            }
        }

        fn set_pending_egress(&mut self, handle: PriorityHandle) {
            if let Some(index) = self.position(handle) {
                self.entries[index].pending = true;
            }
        }

        fn clear_pending_egress(&mut self, handle: PriorityHandle) {
            if let Some(index) = self.position(handle) {
                self.entries[index].pending = false;
            }
        }

        fn is_enqueued(&self, handle: PriorityHandle) -> bool {
            self.position(handle)
                .map(|index| self.entries[index].pending)
                .unwrap_or(false)
        }
    }
}
