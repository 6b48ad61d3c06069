//! Read-only polling view over a tracker state directory.
//!
//! The monitor never writes state. It binds its own [`Tracker`] to the
//! directory it watches and only uses the tracker's loading and aggregation.
//! Every frame re-reads the state file through [`Tracker::refresh`];
//! progress and statistics are read as two independent snapshots.

use crate::output;
use crate::tracker::Tracker;
use regex::Regex;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const DEFAULT_BASE_DIR: &str = "tmp.benchmarks";
pub const DEFAULT_STATE_SUBDIR: &str = ".tracker";
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

static RUN_DIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2}").expect("valid regex")
});

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub state_dir: Option<PathBuf>,
    pub base_dir: PathBuf,
    pub state_subdir: String,
    pub refresh_interval: Duration,
    pub auto_detect: bool,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            state_dir: None,
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            state_subdir: DEFAULT_STATE_SUBDIR.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            auto_detect: true,
        }
    }
}

/// Latest benchmark directory under `base`. Directory names start with a
/// `YYYY-MM-DD-HH-MM-SS` stamp, so the greatest name is the newest run.
pub fn find_latest_run_dir(base: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(base).ok()?;

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_dir()))
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| RUN_DIR_RE.is_match(name))
        })
        .map(|entry| entry.path())
        .max_by(|a, b| a.file_name().cmp(&b.file_name()))
}

#[derive(Debug)]
pub struct Monitor {
    options: MonitorOptions,
    tracker: Option<Tracker>,
    watched_dir: Option<PathBuf>,
    last_detect: Option<Instant>,
    idle_ticks: u64,
}

impl Monitor {
    pub fn new(options: MonitorOptions) -> Self {
        Self {
            options,
            tracker: None,
            watched_dir: None,
            last_detect: None,
            idle_ticks: 0,
        }
    }

    /// Benchmark directory picked by auto-detection, if any.
    pub fn watched_dir(&self) -> Option<&Path> {
        self.watched_dir.as_deref()
    }

    pub fn tracker(&self) -> Option<&Tracker> {
        self.tracker.as_ref()
    }

    /// Renders one frame. Never fails on missing state; only write errors
    /// are returned.
    pub fn tick(&mut self, mut w: impl Write) -> io::Result<()> {
        self.detect(&mut w)?;
        self.bind_explicit();

        output::print_header(&mut w, self.options.auto_detect)?;

        match &self.tracker {
            None => {
                self.idle_ticks += 1;
                output::print_waiting(&mut w, self.idle_ticks)?;
            }
            Some(tracker) => {
                tracker.refresh();

                match tracker.progress() {
                    Some(progress) => {
                        let stats = tracker.statistics();
                        output::print_frame(&mut w, &progress, stats.as_ref())?;
                    }
                    None => {
                        let name = match &self.watched_dir {
                            Some(dir) => dir
                                .file_name()
                                .map(|name| name.to_string_lossy().into_owned()),
                            None => Some(tracker.state_dir().display().to_string()),
                        };
                        output::print_idle(&mut w, name.as_deref())?;
                    }
                }
            }
        }

        output::print_footer(&mut w, self.options.auto_detect, self.options.refresh_interval)
    }

    /// Clears the terminal and redraws every refresh interval until the
    /// process is interrupted.
    pub fn run(&mut self) -> io::Result<()> {
        info!(
            auto_detect = self.options.auto_detect,
            interval = %humantime::format_duration(self.options.refresh_interval),
            "monitor started"
        );

        loop {
            {
                let mut out = io::stdout().lock();
                out.write_all(CLEAR_SCREEN.as_bytes())?;
                self.tick(&mut out)?;
                out.flush()?;
            }
            thread::sleep(self.options.refresh_interval);
        }
    }

    fn detect(&mut self, mut w: impl Write) -> io::Result<()> {
        let due = self.tracker.is_none()
            || self
                .last_detect
                .is_none_or(|at| at.elapsed() >= self.options.refresh_interval);
        if !self.options.auto_detect || !due {
            return Ok(());
        }

        if let Some(latest) = find_latest_run_dir(&self.options.base_dir)
            && self.watched_dir.as_deref() != Some(latest.as_path())
        {
            let state_dir = latest.join(&self.options.state_subdir);
            if state_dir.is_dir() {
                match Tracker::new(&state_dir) {
                    Ok(tracker) => {
                        if self.watched_dir.is_some() {
                            let name = latest
                                .file_name()
                                .map(|name| name.to_string_lossy().into_owned())
                                .unwrap_or_default();
                            writeln!(w, "Switching to new benchmark: {}", output::path(&name))?;
                        }
                        info!(dir = %latest.display(), "watching benchmark directory");
                        self.tracker = Some(tracker);
                        self.watched_dir = Some(latest);
                        self.idle_ticks = 0;
                    }
                    Err(err) => warn!("cannot open {}: {err}", state_dir.display()),
                }
            }
        }

        self.last_detect = Some(Instant::now());
        Ok(())
    }

    fn bind_explicit(&mut self) {
        if self.tracker.is_some() {
            return;
        }

        let Some(state_dir) = &self.options.state_dir else {
            return;
        };

        match Tracker::new(state_dir) {
            Ok(tracker) => self.tracker = Some(tracker),
            Err(err) => warn!("cannot open {}: {err}", state_dir.display()),
        }
    }
}
