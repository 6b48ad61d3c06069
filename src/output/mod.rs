mod monitor;
mod runs;
mod style;

pub use monitor::{print_footer, print_frame, print_header, print_idle, print_waiting};
pub use runs::{RunRow, print_runs};
pub use style::{
    accent, bold, configure, exercise_status, failure, info, muted, number, path, run_state,
    success, success_rate, warning,
};

pub const BAR_WIDTH: usize = 30;

pub fn progress_bar(completed: u32, total: u32, width: usize) -> String {
    let filled = (width as u64 * u64::from(completed) / u64::from(total.max(1))) as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

pub fn format_eta(seconds: f64) -> String {
    let whole = seconds.max(0.0) as u64;
    format!("{}m {}s", whole / 60, whole % 60)
}

pub fn format_seconds(seconds: f64) -> String {
    if seconds < 60.0 {
        return format!("{seconds:.2}s");
    }

    let whole = seconds as u64;
    let (hours, rest) = (whole / 3600, whole % 3600);
    if hours > 0 {
        format!("{hours}h {}m {}s", rest / 60, rest % 60)
    } else {
        format!("{}m {}s", rest / 60, rest % 60)
    }
}

/// Groups digits in thousands: `12345` becomes `12,345`.
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}
