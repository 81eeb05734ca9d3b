use std::path::PathBuf;

use quill::output::OutputBuffer;
use quill::{RunConfiguration, Runner};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

fn run_fixture(args: &[&str]) -> (i32, String) {
    let args: Vec<String> = args
        .iter()
        .map(|a| match a.strip_suffix(".ql") {
            Some(_) => fixture(a).display().to_string(),
            None => a.to_string(),
        })
        .collect();
    let buffer = OutputBuffer::default();
    let mut runner = Runner::with_output(RunConfiguration::from_args(&args), buffer.clone());
    let code = runner.run().expect("batch run should not fail to start");
    (code, buffer.contents())
}

#[test]
fn fixture_assignments() {
    let (code, output) = run_fixture(&["assignments.ql"]);
    assert_eq!(code, 0);
    assert_eq!(output, include_str!("../fixtures/assignments.expected"));
}

#[test]
fn fixture_fizzbuzz() {
    let (code, output) = run_fixture(&["fizzbuzz.ql"]);
    assert_eq!(code, 0);
    assert_eq!(output, include_str!("../fixtures/fizzbuzz.expected"));
}

#[test]
fn fixture_fibonacci() {
    let (code, output) = run_fixture(&["fib.ql"]);
    assert_eq!(code, 0);
    assert_eq!(output, include_str!("../fixtures/fib.expected"));
}

#[test]
fn fixture_watch_total() {
    let (code, output) = run_fixture(&["watch=total", "watch_total.ql"]);
    assert_eq!(code, 0);
    assert_eq!(output, include_str!("../fixtures/watch_total.expected"));
}

#[test]
fn fixture_watch_flag_after_script() {
    let (_, before) = run_fixture(&["watch=total", "watch_total.ql"]);
    let (_, after) = run_fixture(&["watch_total.ql", "watch=total"]);
    assert_eq!(before, after);
}

#[test]
fn fixture_without_watch_has_no_notifications() {
    let (code, output) = run_fixture(&["watch_total.ql"]);
    assert_eq!(code, 0);
    assert_eq!(output, "6\n");
}
