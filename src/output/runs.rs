use crate::model::{BenchmarkRun, RunState};
use crate::output::{accent, format_seconds, info, muted, number, run_state};
use std::io::Write;
use time::OffsetDateTime;

#[derive(Debug, Clone)]
pub struct RunRow {
    pub run_id: String,
    pub model: String,
    pub state: RunState,
    pub completed: u32,
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub start_time: Option<OffsetDateTime>,
    pub duration_seconds: Option<f64>,
    pub active: bool,
}

impl RunRow {
    pub fn from_run(run: &BenchmarkRun, active: bool) -> Self {
        Self {
            run_id: run.run_id.clone(),
            model: run.model.clone(),
            state: run.state,
            completed: run.completed_exercises,
            total: run.total_exercises,
            passed: run.passed_exercises,
            failed: run.failed_exercises,
            start_time: run.start_time,
            duration_seconds: run.duration_seconds,
            active,
        }
    }
}

pub fn print_runs(mut w: impl Write, rows: &[RunRow]) -> std::io::Result<()> {
    if rows.is_empty() {
        writeln!(w, "{} No benchmark runs recorded yet.", info("i"))?;
        return Ok(());
    }

    for (idx, row) in rows.iter().enumerate() {
        let marker = if row.active {
            format!(" {}", muted("(active)"))
        } else {
            String::new()
        };

        let started = row
            .start_time
            .and_then(|ts| {
                ts.format(&time::macros::format_description!(
                    "[year]-[month]-[day] [hour]:[minute]:[second]"
                ))
                .ok()
            })
            .unwrap_or_else(|| "-".to_string());

        let duration = row
            .duration_seconds
            .map(format_seconds)
            .unwrap_or_else(|| "-".to_string());

        writeln!(w, "{} {}{}", accent(&row.run_id), run_state(row.state), marker)?;
        writeln!(w, "  model: {}", row.model)?;
        writeln!(
            w,
            "  exercises: {}/{} (passed {}, failed {})",
            number(&row.completed.to_string()),
            number(&row.total.to_string()),
            row.passed,
            row.failed
        )?;
        writeln!(w, "  started (UTC): {}", started)?;
        writeln!(w, "  duration: {}", number(&duration))?;

        if idx + 1 < rows.len() {
            writeln!(w)?;
        }
    }

    Ok(())
}
