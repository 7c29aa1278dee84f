// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submit file parsing.

use std::sync::LazyLock;

use regex::Regex;
use tsd_core::JobPlan;

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("constant regex pattern is valid")
}

static RSL_LINE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)^\s*globusrsl\W"));
static RSL_PAIR: LazyLock<Regex> = LazyLock::new(|| compile(r"\(([^)]+)\)"));
static SITE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"^\s*\+(?:pegasus|wf)_(?:site|resource)\s*=\s*(['"])(\S+)"#)
});
static SITE_COMMENT: LazyLock<Regex> = LazyLock::new(|| compile(r"^#!\s+site=(\S+)"));
static JOB_CLASS: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^\s*\+pegasus_job_class\s*=\s*(\S+)"));
static TRANSFORMATION: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^\s*\+pegasus_wf_xformation\s*=\s*(\S+)"));

/// RSL keys (minus `-` and `_`, lowercased) that declare a time limit.
const TIME_KEYS: &[&str] = &["maxcputime", "maxtime", "maxwalltime"];

/// Placeholder the planner leaves when no site was selected.
const UNSET_SITE: &str = "!!SITE!!";

/// Human-readable name of a numeric `+pegasus_job_class`.
pub fn job_class_name(raw: &str) -> Option<&'static str> {
    let name = match raw.trim().parse::<u32>().ok()? {
        0 => "unassigned",
        1 => "compute",
        2 => "stage-in",
        3 => "stage-out",
        4 => "replica registration",
        5 => "inter pool",
        6 => "create dir",
        7 => "staged compute",
        8 => "cleanup",
        9 => "symlink stage-in job",
        _ => return None,
    };
    Some(name)
}

/// Extract walltime, site, job class and transformation from a submit file.
///
/// Each line is matched against the RSL, site attribute, site comment, job
/// class and transformation forms in that order; the first form that
/// matches claims the line. Later lines override earlier ones, except the
/// walltime which keeps the largest declared limit.
pub fn parse_submit_file(text: &str) -> JobPlan {
    let mut plan = JobPlan::default();

    for line in text.lines() {
        if RSL_LINE.is_match(line) {
            for limit in rsl_time_limits(line) {
                plan.walltime_minutes = Some(plan.walltime_minutes.map_or(limit, |m| m.max(limit)));
            }
        } else if let Some(site) = site_attribute(line) {
            plan.site = Some(site.to_string());
        } else if let Some(caps) = SITE_COMMENT.captures(line) {
            plan.site = Some(caps[1].to_string());
        } else if let Some(caps) = JOB_CLASS.captures(line) {
            if let Some(name) = job_class_name(&caps[1]) {
                plan.job_type = Some(name.to_string());
            }
        } else if let Some(caps) = TRANSFORMATION.captures(line) {
            plan.transformation = Some(caps[1].trim_matches('"').to_string());
        }
    }

    if plan.site.as_deref() == Some(UNSET_SITE) {
        plan.site = None;
    }
    plan
}

fn rsl_time_limits(line: &str) -> impl Iterator<Item = u64> + '_ {
    RSL_PAIR.captures_iter(line).filter_map(|caps| {
        let (key, value) = caps.get(1)?.as_str().split_once('=')?;
        let key: String = key
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        if TIME_KEYS.contains(&key.trim()) {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// `+pegasus_site = "X"` style attribute. The value must be closed by the
/// same quote that opened it; the quote nearest the end of the token wins.
fn site_attribute(line: &str) -> Option<&str> {
    let caps = SITE_ATTR.captures(line)?;
    let quote = caps.get(1)?.as_str();
    let token = caps.get(2)?.as_str();
    let end = token.rfind(quote).filter(|end| *end > 0)?;
    Some(&token[..end])
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
