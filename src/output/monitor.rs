use crate::output::{
    BAR_WIDTH, accent, bold, failure, format_count, format_eta, info, muted, number, path,
    progress_bar, run_state, success, success_rate, warning,
};
use crate::stats::{Progress, Statistics};
use std::io::Write;
use std::time::Duration;

const RULE: &str = "============================================================";

pub fn print_header(mut w: impl Write, auto_detect: bool) -> std::io::Result<()> {
    writeln!(w, "{RULE}")?;
    writeln!(w, "{}", bold("BENCHMARK TRACKING MONITOR"))?;
    if auto_detect {
        writeln!(w, "{}", muted("(auto-detecting new runs)"))?;
    }
    writeln!(w, "{RULE}")
}

pub fn print_footer(mut w: impl Write, auto_detect: bool, interval: Duration) -> std::io::Result<()> {
    let every = humantime::format_duration(interval).to_string();
    let label = if auto_detect {
        "auto-refresh every"
    } else {
        "refreshing every"
    };
    writeln!(w)?;
    writeln!(w, "{}", muted(&format!("[{label} {every}, Ctrl+C to exit]")))
}

/// Shown while no state directory has been found yet.
pub fn print_waiting(mut w: impl Write, ticks: u64) -> std::io::Result<()> {
    let dots = ".".repeat((ticks % 4) as usize);
    writeln!(w)?;
    writeln!(w, "{} Waiting for benchmark to start{dots}", info("…"))?;
    writeln!(w)?;
    writeln!(w, "No active benchmark found.")
}

/// Shown when a state directory is watched but holds no active run.
pub fn print_idle(mut w: impl Write, watching: Option<&str>) -> std::io::Result<()> {
    writeln!(w)?;
    if let Some(name) = watching {
        writeln!(w, "Monitoring: {}", path(name))?;
    }
    writeln!(w, "{} Benchmark completed or not yet started", warning("||"))?;
    writeln!(w)?;
    writeln!(w, "Waiting for new activity...")
}

pub fn print_frame(
    mut w: impl Write,
    progress: &Progress,
    stats: Option<&Statistics>,
) -> std::io::Result<()> {
    writeln!(w)?;
    writeln!(w, "Run ID: {}", accent(&progress.run_id))?;
    writeln!(w, "State: {}", run_state(progress.state))?;
    writeln!(w, "Model: {}", progress.model)?;
    writeln!(w, "Languages: {}", progress.languages.join(", "))?;

    if let Some(current) = &progress.current_exercise {
        writeln!(w)?;
        writeln!(w, "{} Currently running: {}", info(">"), accent(current))?;
    }

    let counts = &progress.progress;
    writeln!(w)?;
    writeln!(
        w,
        "Progress: [{}] {}/{} ({}%)",
        progress_bar(counts.completed, counts.total, BAR_WIDTH),
        counts.completed,
        counts.total,
        counts.percentage
    )?;
    writeln!(w, "{} Passed: {}", success("ok"), number(&counts.passed.to_string()))?;
    writeln!(w, "{} Failed: {}", failure("x"), number(&counts.failed.to_string()))?;

    if let Some(remaining) = progress.timing.estimated_remaining
        && remaining > 0.0
    {
        writeln!(w)?;
        writeln!(w, "Estimated time remaining: {}", number(&format_eta(remaining)))?;
    }

    let Some(stats) = stats else {
        return Ok(());
    };

    writeln!(w)?;
    writeln!(w, "Success rate: {}", success_rate(stats.overall.success_rate))?;

    if !stats.by_language.is_empty() {
        writeln!(w)?;
        writeln!(w, "By language:")?;
        for (language, lang) in &stats.by_language {
            writeln!(
                w,
                "  {}: {}% ({}/{})",
                language, lang.success_rate, lang.passed, lang.total
            )?;
        }
    }

    if stats.metrics.total_cost > 0.0 {
        writeln!(w)?;
        writeln!(
            w,
            "Total cost: {}",
            number(&format!("${:.4}", stats.metrics.total_cost))
        )?;
        writeln!(
            w,
            "Total tokens: {}",
            number(&format_count(stats.metrics.total_tokens))
        )?;
    }

    Ok(())
}
