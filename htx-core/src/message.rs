// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Minimal request/response model used at the handler and transport seams.
//!
//! The engine treats header blocks as opaque payload: the only fields it
//! reads are the response status class and the content length. Codecs
//! translate between this model and their wire form.

use core::fmt;

/// An ordered header block.
///
/// Names compare case-insensitively on lookup; insertion order is
/// preserved for the codec.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Approximate in-memory size, used for deferred-ingress budgeting
    pub fn encoded_size(&self) -> usize {
        self.entries
            .iter()
            // name, value, separator and terminator overhead
            .map(|(name, value)| name.len() + value.len() + 4)
            .sum()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub headers: Headers,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: Headers,
}

/// A request or response head, as produced by a codec or a handler
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageHead {
    Request(RequestHead),
    Response(ResponseHead),
}

impl MessageHead {
    pub fn request(
        method: impl Into<String>,
        target: impl Into<String>,
        headers: Headers,
    ) -> Self {
        Self::Request(RequestHead {
            method: method.into(),
            target: target.into(),
            headers,
        })
    }

    pub fn response(status: u16, headers: Headers) -> Self {
        Self::Response(ResponseHead { status, headers })
    }

    #[inline]
    pub fn headers(&self) -> &Headers {
        match self {
            Self::Request(request) => &request.headers,
            Self::Response(response) => &response.headers,
        }
    }

    #[inline]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request(_) => None,
            Self::Response(response) => Some(response.status),
        }
    }

    /// True for 1xx interim responses
    #[inline]
    pub fn is_informational(&self) -> bool {
        matches!(self.status(), Some(status) if (100..200).contains(&status))
    }

    #[inline]
    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// True for requests establishing a tunnel
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Request(request) if request.method.eq_ignore_ascii_case("CONNECT"))
    }

    /// The declared body length, if the header parses cleanly
    pub fn content_length(&self) -> Option<u64> {
        self.headers()
            .get("content-length")
            .and_then(|value| value.trim().parse().ok())
    }

    /// Approximate in-memory size, used for deferred-ingress budgeting
    pub fn encoded_size(&self) -> usize {
        let line = match self {
            Self::Request(request) => request.method.len() + request.target.len() + 12,
            Self::Response(_) => 16,
        };
        line + self.headers().encoded_size()
    }
}

impl fmt::Display for MessageHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(request) => write!(f, "{} {}", request.method, request.target),
            Self::Response(response) => write!(f, "{}", response.status),
        }
    }
}
