// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TSSP/1.0, the status query protocol.
//!
//! A client sends one line, `<METHOD> <RESOURCE> [<ARG>] TSSP/1.0`, and
//! reads a status line followed by zero or more CRLF-terminated rows. The
//! server closes the connection after every response.

use regex::Regex;
use tracing::warn;
use tsd_storage::WorkflowState;

#[path = "protocol_rows.rs"]
mod rows;
#[path = "protocol_wire.rs"]
mod wire;

pub use rows::{job_row, site_dump, site_rows_in};
pub use wire::{read_request, write_response, ProtocolError, DEFAULT_TIMEOUT, MAX_REQUEST_SIZE};

/// Protocol token expected as the last word of every request.
pub const PROTOCOL: &str = "TSSP/1.0";

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NoContent,
    BadRequest,
    MethodNotAllowed,
    NotImplemented,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NoContent => 204,
            Status::BadRequest => 400,
            Status::MethodNotAllowed => 405,
            Status::NotImplemented => 501,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NoContent => "No Content",
            Status::BadRequest => "Bad request",
            Status::MethodNotAllowed => "Method not allowed",
            Status::NotImplemented => "Not implemented",
        }
    }

    /// `TSSP/1.0 200 OK\r\n`
    pub fn line(&self) -> String {
        format!("{} {} {}\r\n", PROTOCOL, self.code(), self.reason())
    }
}

/// Queryable resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Job,
    Site,
}

impl Resource {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "job" => Some(Resource::Job),
            "site" => Some(Resource::Site),
            _ => None,
        }
    }
}

/// A parsed request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Query {
        resource: Resource,
        /// `*`, an exact key or a regular expression. `None` means all.
        pattern: Option<String>,
    },
    /// Answered with a bare status line.
    Rejected(Status),
}

/// Drop every character outside the identifier/path-safe set.
///
/// The set is `-`, ASCII `A` through `z` (which takes in `[ \ ] ^ _` and
/// backtick), digits, whitespace and `. , [ ] ^ * ? / +`.
pub fn untaint(raw: &str) -> String {
    raw.chars()
        .filter(|c| {
            matches!(
                c,
                '-' | 'A'..='z'
                    | '0'..='9'
                    | ' '
                    | '\t'
                    | '\n'
                    | '\r'
                    | '\x0b'
                    | '\x0c'
                    | '.'
                    | ','
                    | '*'
                    | '?'
                    | '/'
                    | '+'
            )
        })
        .collect()
}

/// Parse the raw bytes of one request.
pub fn parse_request(raw: &[u8]) -> Request {
    let text = String::from_utf8_lossy(raw);
    let clean = untaint(text.trim());
    let tokens: Vec<&str> = clean.split_whitespace().collect();

    let [method, resource, rest @ ..] = tokens.as_slice() else {
        return Request::Rejected(Status::NoContent);
    };
    let Some((proto, args)) = rest.split_last() else {
        return Request::Rejected(Status::NoContent);
    };

    if *proto != PROTOCOL {
        return Request::Rejected(Status::BadRequest);
    }
    if !method.eq_ignore_ascii_case("GET") {
        return Request::Rejected(Status::MethodNotAllowed);
    }
    match Resource::parse(resource) {
        Some(resource) => Request::Query {
            resource,
            pattern: args.first().map(|s| s.to_string()),
        },
        None => Request::Rejected(Status::NotImplemented),
    }
}

/// Keys selected by `pattern`: all for `None` or `*`, the exact key when
/// present, otherwise every key the pattern matches as a regex.
pub fn select<'a>(keys: impl Iterator<Item = &'a str>, pattern: Option<&str>) -> Vec<&'a str> {
    let keys: Vec<&str> = keys.collect();
    let pattern = match pattern {
        None | Some("*") => return keys,
        Some(p) => p,
    };
    if let Some(key) = keys.iter().copied().find(|k| *k == pattern) {
        return vec![key];
    }
    match Regex::new(pattern) {
        Ok(re) => keys.into_iter().filter(|k| re.is_match(k)).collect(),
        Err(e) => {
            warn!(pattern, error = %e, "ignoring invalid query pattern");
            Vec::new()
        }
    }
}

/// Full response text for `request` against the current state.
pub fn respond(state: &WorkflowState, request: &Request) -> String {
    respond_in(&chrono::Local, state, request)
}

pub fn respond_in<Tz>(tz: &Tz, state: &WorkflowState, request: &Request) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let (resource, pattern) = match request {
        Request::Rejected(status) => return status.line(),
        Request::Query { resource, pattern } => (*resource, pattern.as_deref()),
    };

    let mut out = Status::Ok.line();
    match resource {
        Resource::Job => {
            for job_id in select(state.job_records().map(|(k, _)| k), pattern) {
                if let Some(record) = state.job_record(job_id) {
                    out.push_str(&job_row(record));
                }
            }
        }
        Resource::Site => {
            for name in select(state.sites().map(|(k, _)| k), pattern) {
                if let Some(info) = state.site(name) {
                    out.push_str(&site_rows_in(tz, name, info, &state.waiting().rows(name)));
                }
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
