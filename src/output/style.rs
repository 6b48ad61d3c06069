use crate::model::{ExerciseStatus, RunState};
use std::sync::atomic::{AtomicBool, Ordering};

static COLORS_ENABLED: AtomicBool = AtomicBool::new(true);

pub fn configure(no_color: bool) {
    let mut enabled = !no_color;

    if std::env::var_os("NO_COLOR").is_some() {
        enabled = false;
    }

    if let Ok(term) = std::env::var("TERM")
        && term.eq_ignore_ascii_case("dumb")
    {
        enabled = false;
    }

    if std::env::var("CLICOLOR_FORCE").ok().as_deref() == Some("1") {
        enabled = true;
    }

    COLORS_ENABLED.store(enabled, Ordering::Relaxed);
}

fn style(code: &str, text: &str) -> String {
    if text.is_empty() || !COLORS_ENABLED.load(Ordering::Relaxed) {
        return text.to_string();
    }

    format!("\x1b[{code}m{text}\x1b[0m")
}

pub fn bold(text: &str) -> String {
    style("1", text)
}

pub fn muted(text: &str) -> String {
    style("2", text)
}

pub fn accent(text: &str) -> String {
    style("36", text)
}

pub fn success(text: &str) -> String {
    style("32", text)
}

pub fn failure(text: &str) -> String {
    style("31", text)
}

pub fn warning(text: &str) -> String {
    style("33", text)
}

pub fn info(text: &str) -> String {
    style("96", text)
}

pub fn number(text: &str) -> String {
    style("96", text)
}

pub fn path(text: &str) -> String {
    style("94", text)
}

pub fn run_state(state: RunState) -> String {
    let text = state.as_str();
    match state {
        RunState::Initializing | RunState::Paused => warning(text),
        RunState::Running => info(text),
        RunState::Completed => success(text),
        RunState::Failed | RunState::Cancelled => failure(text),
    }
}

pub fn exercise_status(status: ExerciseStatus) -> String {
    let text = status.as_str();
    match status {
        ExerciseStatus::Pending | ExerciseStatus::Skipped => muted(text),
        ExerciseStatus::Running => info(text),
        ExerciseStatus::Passed => success(text),
        ExerciseStatus::Failed | ExerciseStatus::Error => failure(text),
    }
}

/// Success rates at or above 80% read as good, 60% as fair.
pub fn success_rate(rate: f64) -> String {
    let text = format!("{rate}%");
    if rate >= 80.0 {
        success(&text)
    } else if rate >= 60.0 {
        warning(&text)
    } else {
        failure(&text)
    }
}
