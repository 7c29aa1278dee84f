//! Command-line argument specs

use crate::prelude::*;

#[test]
fn help_names_the_daemon() {
    tailstatd()
        .args(&["--help"])
        .passes()
        .stdout_has("tailstatd")
        .stdout_has("--replay");
}

#[test]
fn version_is_printed() {
    tailstatd()
        .args(&["--version"])
        .passes()
        .stdout_has(env!("CARGO_PKG_VERSION"));
}

#[test]
fn missing_out_file_argument_is_a_usage_error() {
    tailstatd().args(&["-n"]).exits(2).stderr_has("Usage");
}

#[test]
fn bad_conf_value_is_fatal() {
    let run = RunDir::with_out(&as_strs(&diamond(0)));
    tailstatd()
        .args(&["-n", "-r", "-C", "starve.threshold=soon"])
        .arg(run.out())
        .exits(42)
        .stderr_has("starve.threshold");
}

#[test]
fn malformed_conf_pair_is_fatal() {
    let run = RunDir::with_out(&as_strs(&diamond(0)));
    tailstatd()
        .args(&["-n", "-r", "-C", "no-equals-sign"])
        .arg(run.out())
        .exits(42);
}
