// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

mod test_environment;

pub(crate) use test_environment::*;

use htx_core::message::{Headers, MessageHead};

pub(crate) fn get_request() -> MessageHead {
    MessageHead::request("GET", "/x", Headers::new())
}

pub(crate) fn post_request(content_length: u64) -> MessageHead {
    let headers: Headers = [("content-length", content_length.to_string())]
        .into_iter()
        .collect();
    MessageHead::request("POST", "/x", headers)
}

pub(crate) fn connect_request() -> MessageHead {
    MessageHead::request("CONNECT", "example.com:443", Headers::new())
}

pub(crate) fn response(status: u16) -> MessageHead {
    MessageHead::response(status, Headers::new())
}

pub(crate) fn response_with_length(status: u16, content_length: u64) -> MessageHead {
    let headers: Headers = [("content-length", content_length.to_string())]
        .into_iter()
        .collect();
    MessageHead::response(status, headers)
}
