// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tailstatd library
//!
//! This module exposes the TSSP/1.0 query protocol for use by status clients.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod protocol;

pub use protocol::{
    parse_request, respond, site_dump, untaint, ProtocolError, Request, Resource, Status,
    DEFAULT_TIMEOUT, MAX_REQUEST_SIZE, PROTOCOL,
};
