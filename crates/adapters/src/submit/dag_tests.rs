// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

const DAG: &str = "\
JOB ID000001 mProject_ID000001.sub
JOB ID000002 mDiff_ID000002.sub DONE
job create_dir create_dir.sub
SCRIPT POST ID000001 /bin/exitpost ID000001.out
PARENT ID000001 CHILD ID000002
";

#[test]
fn done_jobs_are_skipped() {
    let files = DagSubmitFiles::parse(DAG, Path::new("/run"));
    assert_eq!(files.len(), 2);
    assert_eq!(
        files.submit_file("ID000001"),
        Some(Path::new("/run/mProject_ID000001.sub"))
    );
    assert_eq!(files.submit_file("ID000002"), None);
    assert_eq!(
        files.submit_file("create_dir"),
        Some(Path::new("/run/create_dir.sub"))
    );
}

#[yare::parameterized(
    plain   = { "/run/blackdiamond-0.dag.dagman.out", "/other/blackdiamond-0.dag" },
    rescue  = { "/run/wf.dag.rescue.dagman.out", "/other/wf.dag.rescue" },
    no_ext  = { "/run/strange", "/other/strange" },
)]
fn dag_path(out: &str, expected: &str) {
    assert_eq!(
        dag_path_for(Path::new(out), Path::new("/other")),
        PathBuf::from(expected)
    );
}

#[test]
fn out_stem_strips_suffix() {
    assert_eq!(out_stem(Path::new("/r/a.dag.dagman.out")), "a.dag");
    assert_eq!(out_stem(Path::new("/r/plain.txt")), "plain.txt");
}

#[test]
fn missing_dag_yields_empty_table() {
    let dir = TempDir::new().unwrap();
    let files = DagSubmitFiles::load(&dir.path().join("nope.dag"), dir.path());
    assert!(files.is_empty());
}

#[test]
fn plan_reads_submit_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("wf.dag"), "JOB A a.sub\nJOB B b.sub\n").unwrap();
    std::fs::write(
        dir.path().join("a.sub"),
        "globusrsl = (maxwalltime=5)\n+pegasus_site = \"S1\"\n",
    )
    .unwrap();
    let files = DagSubmitFiles::load(&dir.path().join("wf.dag"), dir.path());

    let plan = files.plan("A", i64::MAX).unwrap();
    assert_eq!(plan.walltime_minutes, Some(5));
    assert_eq!(plan.site.as_deref(), Some("S1"));

    // listed but never written
    assert_eq!(files.plan("B", i64::MAX), None);
    // not in the DAG
    assert_eq!(files.plan("C", i64::MAX), None);
}

#[test]
fn submit_file_newer_than_event_is_skipped() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.sub"), "+pegasus_site = \"S1\"\n").unwrap();
    let files = DagSubmitFiles::parse("JOB A a.sub\n", dir.path());

    assert_eq!(files.plan("A", 0), None);
}
