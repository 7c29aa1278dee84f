// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tsd_core::WaitBucket;

fn plan(site: &str, minutes: u64) -> JobPlan {
    JobPlan {
        walltime_minutes: Some(minutes),
        site: Some(site.to_string()),
        job_type: Some("compute".into()),
        transformation: None,
    }
}

fn ev(job: &str, kind: &str, qid: &str) -> JobEvent {
    JobEvent::new(job, kind).with_queue_id(qid)
}

struct Harness {
    state: WorkflowState,
    lines: Vec<String>,
}

impl Harness {
    fn new() -> Self {
        Self {
            state: WorkflowState::new("wf-1"),
            lines: Vec::new(),
        }
    }

    fn apply(&mut self, stamp: i64, event: JobEvent) -> Recorded {
        self.state.record_event(stamp, &event, None, &mut self.lines)
    }

    fn submit(&mut self, stamp: i64, job: &str, qid: &str, plan: Option<JobPlan>) -> Recorded {
        self.state
            .record_event(stamp, &ev(job, names::SUBMIT, qid), plan, &mut self.lines)
    }

    fn assert_exclusive(&self) {
        for job in self.state.pending().keys() {
            assert!(
                !self.state.running().contains_key(job),
                "{job} is both pending and running"
            );
        }
    }
}

#[test]
fn submit_registers_job_and_caches_plan() {
    let mut h = Harness::new();
    let rec = h.submit(100, "A", "1.0", Some(plan("S1", 2)));

    assert_eq!(rec.registration, Some(Registration::New(1)));
    assert_eq!(rec.record.to_string(), "100 A SUBMIT 1.0 S1 120");

    let job = h.state.workflow.job("A").unwrap();
    assert_eq!(job.state, "SUBMIT");
    assert_eq!(job.site.as_deref(), Some("S1"));
    assert_eq!(job.walltime, Some(120));
    assert_eq!(job.job_type.as_deref(), Some("compute"));
    assert_eq!(h.lines, vec!["100 A SUBMIT 1.0 S1 120".to_string()]);
}

#[test]
fn submit_without_plan_has_no_site_or_walltime() {
    let mut h = Harness::new();
    let rec = h.submit(100, "A", "1.0", None);
    assert_eq!(rec.record.to_string(), "100 A SUBMIT 1.0 - -");
    assert_eq!(h.state.sites().count(), 0);
}

#[test]
fn pre_script_registers_and_submit_reuses_registration() {
    let mut h = Harness::new();
    let pre = h.apply(90, JobEvent::new("A", names::PRE_SCRIPT_STARTED));
    assert_eq!(pre.registration, Some(Registration::New(1)));

    h.apply(95, JobEvent::new("A", names::PRE_SCRIPT_SUCCESS).with_status(0));
    let sub = h.submit(100, "A", "1.0", Some(plan("S1", 1)));
    assert_eq!(sub.registration, Some(Registration::Existing(1)));
    assert_eq!(h.state.workflow.len(), 1);
}

#[test]
fn events_for_unregistered_jobs_are_still_logged() {
    let mut h = Harness::new();
    let rec = h.apply(100, ev("ghost", names::EXECUTE, "9.0"));

    assert!(h.state.workflow.job("ghost").is_none());
    assert_eq!(rec.record.to_string(), "100 ghost EXECUTE 9.0 - -");
    assert!(h.state.running().contains_key("ghost"));
}

#[test]
fn pending_then_running_moves_between_sets() {
    let mut h = Harness::new();
    h.submit(100, "A", "1.0", Some(plan("S1", 1)));

    h.apply(110, ev("A", names::GLOBUS_SUBMIT, "1.0"));
    assert_eq!(
        h.state.pending().get("A"),
        Some(&QueueEntry {
            stamp: 110,
            queue_id: Some("1.0".into()),
            walltime: Some(60),
            site: Some("S1".into()),
        })
    );
    h.assert_exclusive();

    h.apply(150, ev("A", names::EXECUTE, "1.0"));
    assert!(!h.state.pending().contains_key("A"));
    assert_eq!(h.state.running().get("A").map(|e| e.stamp), Some(150));
    h.assert_exclusive();

    h.apply(300, ev("A", names::JOB_TERMINATED, "1.0"));
    assert!(h.state.running().is_empty());
    assert!(h.state.pending().is_empty());
}

#[test]
fn repeated_pending_event_keeps_first_entry() {
    let mut h = Harness::new();
    h.submit(100, "A", "1.0", Some(plan("S1", 1)));
    h.apply(110, ev("A", names::GLOBUS_SUBMIT, "1.0"));
    h.apply(130, ev("A", names::GRID_SUBMIT, "1.0"));

    assert_eq!(h.state.pending().get("A").map(|e| e.stamp), Some(110));
    h.apply(170, ev("A", names::EXECUTE, "1.0"));
    assert_eq!(
        h.state.waiting().bucket("S1", 170 / 60),
        Some(WaitBucket { count: 1, sum: 60 })
    );
}

#[test]
fn repeated_running_event_keeps_first_entry() {
    let mut h = Harness::new();
    h.apply(100, ev("A", names::EXECUTE, "1.0"));
    h.apply(200, ev("A", names::JOB_SUSPENDED, "1.0"));
    h.apply(300, ev("A", names::JOB_UNSUSPENDED, "1.0"));
    assert_eq!(h.state.running().get("A").map(|e| e.stamp), Some(100));
}

#[test]
fn two_jobs_leaving_pending_in_one_minute_share_a_bucket() {
    let mut h = Harness::new();
    let base = 60 * 28_000_000;
    h.submit(base - 100, "A", "1.0", Some(plan("siteA", 1)));
    h.submit(base - 100, "B", "2.0", Some(plan("siteA", 1)));
    h.apply(base - 50, ev("A", names::GLOBUS_SUBMIT, "1.0"));
    h.apply(base - 20, ev("B", names::GLOBUS_SUBMIT, "2.0"));

    h.apply(base + 5, ev("A", names::EXECUTE, "1.0"));
    h.apply(base + 40, ev("B", names::EXECUTE, "2.0"));

    let d1 = 55;
    let d2 = 60;
    assert_eq!(
        h.state.waiting().bucket("siteA", base / 60),
        Some(WaitBucket {
            count: 2,
            sum: d1 + d2
        })
    );
}

#[test]
fn leaving_pending_without_site_does_not_aggregate() {
    let mut h = Harness::new();
    h.apply(100, ev("A", names::GLOBUS_SUBMIT, "1.0"));
    h.apply(160, ev("A", names::EXECUTE, "1.0"));
    assert_eq!(h.state.sites().count(), 0);
    assert!(h.state.pending().is_empty());
}

#[test]
fn unsubmitted_event_clears_cached_plan() {
    let mut h = Harness::new();
    h.submit(100, "A", "1.0", Some(plan("S1", 1)));
    h.apply(110, JobEvent::new("A", names::UN_READY));
    let rec = h.apply(120, ev("A", names::EXECUTE, "1.0"));
    assert_eq!(rec.record.site, None);
    assert_eq!(rec.record.walltime, None);
}

#[test]
fn pending_entry_falls_back_to_last_known_queue_id() {
    let mut h = Harness::new();
    h.submit(100, "A", "7.0", None);
    h.apply(110, JobEvent::new("A", names::GRID_SUBMIT));
    assert_eq!(
        h.state
            .pending()
            .get("A")
            .and_then(|e| e.queue_id.as_deref()),
        Some("7.0")
    );
}

#[test]
fn site_counters_follow_jobs() {
    let mut h = Harness::new();
    h.submit(100, "A", "1.0", Some(plan("S1", 1)));
    h.submit(100, "B", "2.0", Some(plan("S1", 1)));
    h.apply(110, ev("A", names::GLOBUS_SUBMIT, "1.0"));
    h.apply(111, ev("B", names::GLOBUS_SUBMIT, "2.0"));
    h.apply(120, ev("A", names::EXECUTE, "1.0"));

    let site = h.state.site("S1").unwrap();
    assert_eq!(site.count(SiteState::Pending), 1);
    assert_eq!(site.count(SiteState::Running), 1);
    assert_eq!(site.count(SiteState::Other), 0);
    assert_eq!(site.mtime, 120);

    h.apply(200, JobEvent::new("A", names::POST_SCRIPT_SUCCESS).with_status(0));
    let site = h.state.site("S1").unwrap();
    assert_eq!(site.count(SiteState::Running), 0);
    assert_eq!(site.count(SiteState::Succeeded), 1);
    assert_eq!(site.mtime_succ, Some(200));
}

#[test]
fn post_success_is_tracked_as_done() {
    let mut h = Harness::new();
    h.apply(200, JobEvent::new("A", names::POST_SCRIPT_SUCCESS).with_status(0));
    assert_eq!(h.state.done().get("A"), Some(&200));
}

#[yare::parameterized(
    exit_42         = { 42, false, true },
    exit_1          = { 1, false, false },
    exhausted_retry = { 1, true, true },
)]
fn permanent_failure(status: i32, exhausted: bool, expected: bool) {
    let mut h = Harness::new();
    if exhausted {
        h.state.flag_retries("A", 3);
    }
    let rec = h.apply(
        300,
        JobEvent::new("A", names::POST_SCRIPT_FAILURE).with_status(status),
    );
    assert_eq!(rec.permanent_failure, expected);
    assert_eq!(rec.record.addon.as_deref(), Some(status.to_string().as_str()));
}

#[test]
fn job_records_keep_last_event_in_first_seen_order() {
    let mut h = Harness::new();
    h.submit(100, "B", "2.0", None);
    h.submit(101, "A", "1.0", None);
    h.apply(150, ev("B", names::EXECUTE, "2.0"));

    let rows: Vec<String> = h
        .state
        .job_records()
        .map(|(_, r)| r.to_string())
        .collect();
    assert_eq!(rows, vec!["150 B EXECUTE 2.0 - -", "101 A SUBMIT 1.0 - -"]);
    assert_eq!(h.state.seen("B"), 2);
    assert_eq!(h.lines.len(), 3);
}

#[test]
fn mutual_exclusion_over_mixed_sequence() {
    let mut h = Harness::new();
    let kinds = [
        names::SUBMIT,
        names::GLOBUS_SUBMIT,
        names::EXECUTE,
        names::JOB_SUSPENDED,
        names::GRID_SUBMIT,
        names::GLOBUS_RESOURCE_DOWN,
        names::JOB_TERMINATED,
        names::GLOBUS_SUBMIT,
    ];
    for (i, kind) in kinds.iter().enumerate() {
        for job in ["A", "B"] {
            h.apply(100 + i as i64, ev(job, kind, "1.0"));
            h.assert_exclusive();
        }
    }
}
