// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metrics written to the daemon log.

use super::MetricsSink;

/// Writes each event as one `info` record with target `tailstatd::metrics`.
///
/// Fields are rendered as `key=value` pairs in the order given.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingMetricsSink;

impl TracingMetricsSink {
    pub fn new() -> Self {
        Self
    }
}

/// `k1=v1 k2=v2`, quoting values that contain whitespace.
pub(crate) fn render_fields(fields: &[(&str, String)]) -> String {
    fields
        .iter()
        .map(|(k, v)| {
            if v.is_empty() || v.contains(char::is_whitespace) {
                format!("{k}={v:?}")
            } else {
                format!("{k}={v}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl MetricsSink for TracingMetricsSink {
    fn emit(&self, event: &str, fields: &[(&str, String)]) {
        tracing::info!(
            target: "tailstatd::metrics",
            event,
            fields = %render_fields(fields),
        );
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
