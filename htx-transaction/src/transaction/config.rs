// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::transaction::scheduler::Priority;
use core::{fmt, time::Duration};
use htx_core::{flow, transaction::TransactionId};

/// Attributes binding an extended transaction to its control stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExAttributes {
    pub control_stream: TransactionId,
    pub unidirectional: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidationError(pub(crate) &'static str);

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration: {}", self.0)
    }
}

impl std::error::Error for ValidationError {}

/// Construction-time options for a transaction.
///
/// Every option has a default; setters validate at call time and reject
/// out-of-range values instead of clamping.
#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) use_flow_control: bool,
    pub(crate) recv_initial_window: u32,
    pub(crate) send_initial_window: u32,
    pub(crate) max_deferred_ingress: usize,
    pub(crate) egress_buffer_limit: usize,
    pub(crate) idle_timeout: Option<Duration>,
    pub(crate) priority: Priority,
    pub(crate) assoc_stream_id: Option<TransactionId>,
    pub(crate) ex_attributes: Option<ExAttributes>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! setter {
    ($(#[doc = $doc:literal])* $name:ident, $field:ident, $inner:ty $(, |$value:ident| $validation:block)?) => {
        $(#[doc = $doc])*
        pub fn $name(mut self, value: $inner) -> Result<Self, ValidationError> {
            $(
                let $value = &value;
                $validation
            )?
            self.$field = value;
            Ok(self)
        }
    };
}

impl Config {
    /// The default window for either direction when flow control is on
    pub const DEFAULT_INITIAL_WINDOW: u32 = 65_535;
    /// The default deferred-ingress budget
    pub const DEFAULT_MAX_DEFERRED_INGRESS: usize = 64 * 1024;
    /// The default egress buffer limit before the handler is paused
    pub const DEFAULT_EGRESS_BUFFER_LIMIT: usize = 64 * 1024;

    pub const fn new() -> Self {
        Self {
            use_flow_control: false,
            recv_initial_window: Self::DEFAULT_INITIAL_WINDOW,
            send_initial_window: Self::DEFAULT_INITIAL_WINDOW,
            max_deferred_ingress: Self::DEFAULT_MAX_DEFERRED_INGRESS,
            egress_buffer_limit: Self::DEFAULT_EGRESS_BUFFER_LIMIT,
            idle_timeout: None,
            priority: Priority::new(),
            assoc_stream_id: None,
            ex_attributes: None,
        }
    }

    setter!(
        /// Enables per-transaction flow control in both directions
        with_flow_control,
        use_flow_control,
        bool
    );

    setter!(
        /// The initial receive window; bounded by the HTTP/2 window limit
        with_recv_initial_window,
        recv_initial_window,
        u32,
        |value| {
            if *value > flow::MAX_WINDOW {
                return Err(ValidationError("receive window exceeds the flow-control limit"));
            }
        }
    );

    setter!(
        /// The initial send window; bounded by the HTTP/2 window limit
        with_send_initial_window,
        send_initial_window,
        u32,
        |value| {
            if *value > flow::MAX_WINDOW {
                return Err(ValidationError("send window exceeds the flow-control limit"));
            }
        }
    );

    setter!(
        /// The byte budget for events buffered while ingress is paused
        with_max_deferred_ingress,
        max_deferred_ingress,
        usize,
        |value| {
            if *value == 0 {
                return Err(ValidationError("deferred-ingress budget must be non-zero"));
            }
        }
    );

    setter!(
        /// The buffered egress level at which the handler is paused
        with_egress_buffer_limit,
        egress_buffer_limit,
        usize,
        |value| {
            if *value == 0 {
                return Err(ValidationError("egress buffer limit must be non-zero"));
            }
        }
    );

    setter!(
        /// The idle timeout; absent means the transport default applies
        with_idle_timeout,
        idle_timeout,
        Option<Duration>,
        |value| {
            if matches!(value, Some(timeout) if timeout.is_zero()) {
                return Err(ValidationError("idle timeout must be non-zero"));
            }
        }
    );

    setter!(
        /// The initial priority
        with_priority,
        priority,
        Priority
    );

    setter!(
        /// Marks this transaction as pushed, associated with the given
        /// stream
        with_assoc_stream_id,
        assoc_stream_id,
        Option<TransactionId>
    );

    setter!(
        /// Marks this transaction as extended, bound to a control stream
        with_ex_attributes,
        ex_attributes,
        Option<ExAttributes>
    );
}
