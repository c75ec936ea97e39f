// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Transaction error values.
//!
//! Errors are plain values carrying a kind (the failure taxonomy), a wire
//! error code (the closed HTTP/2 enumeration), a direction tag, and a
//! static reason. Fatal errors drive the abort path in the engine;
//! [`Kind::Unsupported`] is the one non-fatal kind and is returned to the
//! caller without touching transaction state.

use core::fmt;

macro_rules! error_codes {
    ($(
        $(#[doc = $doc:literal])*
        $variant:ident = $code:literal, $name:literal;
    )*) => {
        /// Wire-level error codes, the closed HTTP/2 enumeration.
        ///
        /// `0x4` (settings timeout) is a session-level code and never
        /// surfaces from a transaction.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum ErrorCode {
            $(
                $(#[doc = $doc])*
                $variant = $code,
            )*
        }

        impl ErrorCode {
            #[inline]
            pub const fn code(self) -> u32 {
                self as u32
            }

            pub fn from_code(code: u32) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)*
                    _ => None,
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }
    };
}

error_codes!(
    /// Graceful termination in the absence of any error
    NoError = 0x0, "NO_ERROR";
    /// The peer violated the protocol in a way no more specific code covers
    ProtocolError = 0x1, "PROTOCOL_ERROR";
    /// An unexpected internal failure
    InternalError = 0x2, "INTERNAL_ERROR";
    /// Flow-control accounting was violated
    FlowControlError = 0x3, "FLOW_CONTROL_ERROR";
    /// A frame arrived for a transaction that is already closed
    StreamClosed = 0x5, "STREAM_CLOSED";
    /// A frame had an invalid size
    FrameSizeError = 0x6, "FRAME_SIZE_ERROR";
    /// The transaction was refused before any application processing
    RefusedStream = 0x7, "REFUSED_STREAM";
    /// The transaction is no longer needed
    Cancel = 0x8, "CANCEL";
    /// Header compression state cannot be maintained
    CompressionError = 0x9, "COMPRESSION_ERROR";
    /// A tunnelled connection was reset or could not be established
    ConnectError = 0xa, "CONNECT_ERROR";
    /// The peer is exhibiting behavior that may generate excessive load
    EnhanceYourCalm = 0xb, "ENHANCE_YOUR_CALM";
    /// Transport properties do not meet minimum security requirements
    InadequateSecurity = 0xc, "INADEQUATE_SECURITY";
    /// HTTP/1.1 is required for this request
    Http11Required = 0xd, "HTTP_1_1_REQUIRED";
);

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The failure taxonomy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Invalid event ordering, length mismatch, window violation, or an
    /// incompatible feature combination
    Protocol,
    /// The transport refused or lost the underlying connection
    Transport,
    /// The idle timer expired
    Timeout,
    /// The peer reset this transaction or covered it with a GOAWAY
    PeerAbort,
    /// A buffer exceeded its configured budget
    Resource,
    /// The codec does not implement the requested capability; non-fatal
    Unsupported,
}

/// The side of the exchange an error applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorDirection {
    Ingress,
    Egress,
    Both,
}

impl ErrorDirection {
    /// Whether an error tagged with `self` affects the given side
    #[inline]
    pub fn covers(self, other: ErrorDirection) -> bool {
        matches!(self, ErrorDirection::Both) || self == other
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Error {
    kind: Kind,
    code: ErrorCode,
    direction: ErrorDirection,
    reason: &'static str,
}

impl Error {
    #[inline]
    pub const fn new(
        kind: Kind,
        code: ErrorCode,
        direction: ErrorDirection,
        reason: &'static str,
    ) -> Self {
        Self {
            kind,
            code,
            direction,
            reason,
        }
    }

    #[inline]
    pub const fn protocol(reason: &'static str) -> Self {
        Self::new(
            Kind::Protocol,
            ErrorCode::ProtocolError,
            ErrorDirection::Both,
            reason,
        )
    }

    #[inline]
    pub const fn transport(reason: &'static str) -> Self {
        Self::new(
            Kind::Transport,
            ErrorCode::InternalError,
            ErrorDirection::Both,
            reason,
        )
    }

    #[inline]
    pub const fn timeout() -> Self {
        Self::new(
            Kind::Timeout,
            ErrorCode::Cancel,
            ErrorDirection::Ingress,
            "transaction idle timeout expired",
        )
    }

    #[inline]
    pub const fn peer_abort(code: ErrorCode) -> Self {
        Self::new(
            Kind::PeerAbort,
            code,
            ErrorDirection::Both,
            "peer aborted the transaction",
        )
    }

    #[inline]
    pub const fn resource(reason: &'static str) -> Self {
        Self::new(
            Kind::Resource,
            ErrorCode::EnhanceYourCalm,
            ErrorDirection::Both,
            reason,
        )
    }

    #[inline]
    pub const fn unsupported(operation: &'static str) -> Self {
        Self::new(
            Kind::Unsupported,
            ErrorCode::InternalError,
            ErrorDirection::Both,
            operation,
        )
    }

    #[inline]
    pub const fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = code;
        self
    }

    #[inline]
    pub const fn with_direction(mut self, direction: ErrorDirection) -> Self {
        self.direction = direction;
        self
    }

    #[inline]
    pub const fn with_reason(mut self, reason: &'static str) -> Self {
        self.reason = reason;
        self
    }

    #[inline]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    #[inline]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    #[inline]
    pub const fn direction(&self) -> ErrorDirection {
        self.direction
    }

    #[inline]
    pub const fn reason(&self) -> &'static str {
        self.reason
    }

    /// Fatal errors terminate the transaction; the only non-fatal kind is
    /// an unsupported-operation result
    #[inline]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self.kind, Kind::Unsupported)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.direction {
            ErrorDirection::Ingress => "ingress",
            ErrorDirection::Egress => "egress",
            ErrorDirection::Both => "transaction",
        };
        if self.reason.is_empty() {
            write!(f, "{side} error ({})", self.code)
        } else {
            write!(f, "{side} error ({}): {}", self.code, self.reason)
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trip() {
        for code in [
            ErrorCode::NoError,
            ErrorCode::ProtocolError,
            ErrorCode::InternalError,
            ErrorCode::FlowControlError,
            ErrorCode::StreamClosed,
            ErrorCode::FrameSizeError,
            ErrorCode::RefusedStream,
            ErrorCode::Cancel,
            ErrorCode::CompressionError,
            ErrorCode::ConnectError,
            ErrorCode::EnhanceYourCalm,
            ErrorCode::InadequateSecurity,
            ErrorCode::Http11Required,
        ] {
            assert_eq!(ErrorCode::from_code(code.code()), Some(code));
        }
        // the settings-timeout code point is session-level and excluded
        assert_eq!(ErrorCode::from_code(0x4), None);
        assert_eq!(ErrorCode::from_code(0xe), None);
    }

    #[test]
    fn direction_coverage() {
        assert!(ErrorDirection::Both.covers(ErrorDirection::Ingress));
        assert!(ErrorDirection::Both.covers(ErrorDirection::Egress));
        assert!(ErrorDirection::Ingress.covers(ErrorDirection::Ingress));
        assert!(!ErrorDirection::Ingress.covers(ErrorDirection::Egress));
    }

    #[test]
    fn fatality() {
        assert!(Error::protocol("x").is_fatal());
        assert!(Error::timeout().is_fatal());
        assert!(!Error::unsupported("peek").is_fatal());
    }

    #[test]
    fn display() {
        let error = Error::protocol("body before headers").with_direction(ErrorDirection::Ingress);
        assert_eq!(
            error.to_string(),
            "ingress error (PROTOCOL_ERROR): body before headers"
        );
    }
}
