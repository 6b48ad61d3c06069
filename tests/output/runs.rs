use crate::plain;
use benchtrack::model::RunState;
use benchtrack::output::{RunRow, print_runs};
use time::macros::datetime;

fn row(run_id: &str, state: RunState, active: bool) -> RunRow {
    RunRow {
        run_id: run_id.to_string(),
        model: "opus".to_string(),
        state,
        completed: 5,
        total: 8,
        passed: 4,
        failed: 1,
        start_time: Some(datetime!(2025-05-06 07:08:09 UTC)),
        duration_seconds: None,
        active,
    }
}

#[test]
fn print_runs_empty() {
    let mut out = Vec::new();
    print_runs(&mut out, &[]).expect("print runs");
    assert!(plain(out).contains("No benchmark runs recorded yet."));
}

#[test]
fn print_runs_rows() {
    let mut finished = row("older", RunState::Completed, false);
    finished.duration_seconds = Some(90.0);

    let mut out = Vec::new();
    print_runs(&mut out, &[row("current", RunState::Paused, true), finished])
        .expect("print runs");
    let text = plain(out);

    assert!(text.contains("current paused (active)"));
    assert!(text.contains("older completed"));
    assert!(!text.contains("older completed (active)"));
    assert!(text.contains("model: opus"));
    assert!(text.contains("exercises: 5/8 (passed 4, failed 1)"));
    assert!(text.contains("started (UTC): 2025-05-06 07:08:09"));
    assert!(text.contains("duration: -"));
    assert!(text.contains("duration: 1m 30s"));
}
