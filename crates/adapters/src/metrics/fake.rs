// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake metrics sink for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::MetricsSink;
use parking_lot::Mutex;
use std::sync::Arc;

/// Recorded metrics event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsCall {
    pub event: String,
    pub fields: Vec<(String, String)>,
}

impl MetricsCall {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Sink that records every event
#[derive(Clone, Default)]
pub struct FakeMetricsSink {
    calls: Arc<Mutex<Vec<MetricsCall>>>,
}

impl FakeMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<MetricsCall> {
        self.calls.lock().clone()
    }

    /// Names of the recorded events, in order.
    pub fn events(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.event.clone()).collect()
    }
}

impl MetricsSink for FakeMetricsSink {
    fn emit(&self, event: &str, fields: &[(&str, String)]) {
        self.calls.lock().push(MetricsCall {
            event: event.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });
    }
}
