// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Macros for building deterministic state machines out of plain enums.
//!
//! A machine declares its transition table with [`event`]: one method per
//! event, one `valid-set => target` rule per arm. Events received in a
//! state with no matching rule return [`Error::InvalidTransition`] and
//! leave the state untouched.

use core::fmt;

pub type Result<T> = core::result::Result<(), Error<T>>;

/// Generates one event method per declaration.
///
/// ```ignore
/// event! {
///     on_fin(Recv | SizeKnown => DataRecvd);
/// }
/// ```
#[macro_export]
#[doc(hidden)]
macro_rules! __state_event__ {
    ($(
        $(#[doc = $doc:literal])*
        $event:ident (
            $(
                $($valid:ident)|* => $target:ident
            ),*
            $(,)?
        );
    )*) => {
        $(
            $(#[doc = $doc])*
            #[inline]
            pub fn $event(&mut self) -> $crate::state::Result<Self> {
                match self {
                    $(
                        $(Self::$valid)|* => {
                            *self = Self::$target;
                            Ok(())
                        }
                    )*
                    _ => Err($crate::state::Error::InvalidTransition {
                        current: self.clone(),
                        event: stringify!($event),
                    }),
                }
            }
        )*
    };
}

pub use crate::__state_event__ as event;

/// Generates a predicate method matching one or more states.
#[macro_export]
#[doc(hidden)]
macro_rules! __state_is__ {
    ($(#[doc = $doc:literal])* $function:ident, $($state:ident)|+) => {
        $(
            #[doc = $doc]
        )*
        #[inline]
        pub fn $function(&self) -> bool {
            matches!(self, $(Self::$state)|*)
        }
    };
}

pub use crate::__state_is__ as is;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error<T> {
    InvalidTransition { current: T, event: &'static str },
}

impl<T> Error<T> {
    /// The name of the rejected event
    pub fn event(&self) -> &'static str {
        match self {
            Self::InvalidTransition { event, .. } => event,
        }
    }
}

impl<T: fmt::Debug> fmt::Display for Error<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition { current, event } => {
                write!(f, "invalid event {event:?} for state {current:?}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl<T: fmt::Debug> std::error::Error for Error<T> {}
