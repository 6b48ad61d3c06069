use crate::error::{Result, TrackerError};
use crate::model::{
    BenchmarkRun, DEFAULT_MAX_ATTEMPTS, ExerciseResult, ExerciseStatus, MetricValue, Metrics,
    RunState, exercise_key, seconds_between,
};
use crate::stats::{self, Progress, Statistics};
use crate::store::{self, StateStore};
use crate::version;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;
use tracing::{error, info, warn};

static RUN_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,127}$").expect("valid regex"));

/// Parameters for [`Tracker::start_run`].
#[derive(Debug, Clone)]
pub struct NewRun {
    pub run_id: String,
    pub model: String,
    pub languages: Vec<String>,
    pub total_exercises: u32,
    pub config: BTreeMap<String, serde_json::Value>,
}

impl NewRun {
    pub fn new<I, S>(
        run_id: impl Into<String>,
        model: impl Into<String>,
        languages: I,
        total_exercises: u32,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            run_id: run_id.into(),
            model: model.into(),
            languages: languages.into_iter().map(Into::into).collect(),
            total_exercises,
            config: BTreeMap::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// Result of one exercise attempt, passed to [`Tracker::complete_exercise`].
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub passed: bool,
    pub error_message: Option<String>,
    pub metrics: Metrics,
}

impl Outcome {
    pub fn passed() -> Self {
        Self {
            passed: true,
            ..Self::default()
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.metrics.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub tracker_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub run: BenchmarkRun,
    pub progress: Progress,
    pub statistics: Statistics,
}

impl Report {
    fn from_run(run: &BenchmarkRun) -> Self {
        Self {
            metadata: ReportMetadata {
                generated_at: OffsetDateTime::now_utc(),
                tracker_version: version::VALUE.to_string(),
            },
            run: run.clone(),
            progress: stats::progress(run),
            statistics: stats::statistics(run),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    current_run: Option<BenchmarkRun>,
    state_file: Option<PathBuf>,
    run_history: Vec<BenchmarkRun>,
}

impl Inner {
    fn active_run_mut(&mut self) -> Result<&mut BenchmarkRun> {
        self.current_run.as_mut().ok_or(TrackerError::NoActiveRun)
    }

    /// Write failures are logged, never returned: the in-memory run stays
    /// authoritative when the disk is unavailable.
    fn persist(&self, store: &StateStore) {
        let (Some(run), Some(path)) = (&self.current_run, &self.state_file) else {
            return;
        };

        if let Err(err) = store.save(path, run) {
            error!(run_id = %run.run_id, path = %path.display(), "failed to save state: {err}");
        }
    }
}

/// Authoritative, crash-recoverable state of the benchmark run in progress.
///
/// One lock guards the in-memory run and the state-file write that follows
/// every mutation. Share across threads with `Arc<Tracker>`.
#[derive(Debug)]
pub struct Tracker {
    store: StateStore,
    inner: Mutex<Inner>,
}

impl Tracker {
    /// Opens `state_dir`, creating it if needed, and recovers the most
    /// recent run that is neither completed nor cancelled.
    pub fn new(state_dir: impl Into<PathBuf>) -> Result<Self> {
        let store = StateStore::new(state_dir);
        store.ensure_dir()?;

        let tracker = Self {
            store,
            inner: Mutex::new(Inner::default()),
        };
        tracker.reload();

        info!(state_dir = %tracker.store.dir().display(), "tracker initialized");
        Ok(tracker)
    }

    pub fn state_dir(&self) -> &Path {
        self.store.dir()
    }

    pub fn state_file(&self) -> Option<PathBuf> {
        self.lock().state_file.clone()
    }

    pub fn current_run(&self) -> Option<BenchmarkRun> {
        self.lock().current_run.clone()
    }

    pub fn run_history(&self) -> Vec<BenchmarkRun> {
        self.lock().run_history.clone()
    }

    /// Rescans the state directory and rebuilds history. An active run found
    /// on disk becomes the current run. Otherwise the bound state file is
    /// re-read, so a run that finished elsewhere shows its final state.
    /// Returns whether an active run was found.
    pub fn reload(&self) -> bool {
        let (active, history) = recover(&self.store);

        if let Some((run, path)) = active {
            info!(run_id = %run.run_id, "loaded existing run");
            let mut inner = self.lock();
            inner.run_history = history;
            inner.current_run = Some(run);
            inner.state_file = Some(path);
            return true;
        }

        let bound = self.state_file().and_then(|path| load_logged(&path));
        let mut inner = self.lock();
        inner.run_history = history;
        if let Some(run) = bound {
            inner.run_history.retain(|old| old.run_id != run.run_id);
            inner.current_run = Some(run);
        }
        false
    }

    /// Picks up state written by another process. The bound state file is
    /// re-read first and replaces the current run while it is still active;
    /// otherwise this falls back to [`Tracker::reload`]. Returns whether a
    /// run, active or finished, is loaded afterwards.
    pub fn refresh(&self) -> bool {
        if let Some(run) = self.state_file().and_then(|path| load_logged(&path))
            && !run.state.is_retired()
        {
            self.lock().current_run = Some(run);
            return true;
        }

        self.reload();
        self.lock().current_run.is_some()
    }

    pub fn start_run(&self, new_run: NewRun) -> Result<BenchmarkRun> {
        if !is_valid_run_id(&new_run.run_id) {
            return Err(TrackerError::InvalidRunId(new_run.run_id));
        }

        let mut inner = self.lock();
        let path = self.store.run_path(&new_run.run_id);

        let owned = inner
            .current_run
            .as_ref()
            .is_some_and(|run| run.run_id == new_run.run_id);
        if !owned && path.exists() {
            match StateStore::load(&path) {
                Ok(existing) if !existing.state.is_terminal() => {
                    return Err(TrackerError::RunConflict(new_run.run_id));
                }
                Ok(_) => {}
                Err(err) => warn!("overwriting unreadable state file: {err}"),
            }
        }

        if let Some(previous) = inner.current_run.take() {
            if !previous.state.is_terminal() {
                warn!(run_id = %previous.run_id, state = %previous.state, "replacing unfinished run");
            }
            if previous.run_id != new_run.run_id {
                inner.run_history.push(previous);
            }
        }

        let run = BenchmarkRun {
            run_id: new_run.run_id,
            state: RunState::Initializing,
            model: new_run.model,
            languages: new_run.languages,
            total_exercises: new_run.total_exercises,
            completed_exercises: 0,
            passed_exercises: 0,
            failed_exercises: 0,
            start_time: Some(OffsetDateTime::now_utc()),
            end_time: None,
            duration_seconds: None,
            current_exercise: None,
            exercises: BTreeMap::new(),
            config: new_run.config,
        };

        inner.current_run = Some(run.clone());
        inner.state_file = Some(path);
        inner.persist(&self.store);

        info!(run_id = %run.run_id, model = %run.model, total = run.total_exercises, "started benchmark run");
        Ok(run)
    }

    pub fn update_state(&self, next: RunState) -> Result<()> {
        let mut inner = self.lock();
        let run = inner.active_run_mut()?;
        apply_state(run, next)?;
        inner.persist(&self.store);

        info!(state = %next, "benchmark state updated");
        Ok(())
    }

    /// Marks an exercise as running. Re-starting a key counts a new attempt.
    pub fn start_exercise(&self, name: &str, language: &str, max_attempts: u32) -> Result<()> {
        let mut inner = self.lock();
        let run = inner.active_run_mut()?;
        if run.state.is_terminal() {
            return Err(TrackerError::InvalidTransition {
                from: run.state,
                to: RunState::Running,
            });
        }

        let key = exercise_key(language, name);
        let exercise = run.exercises.entry(key.clone()).or_insert_with(|| {
            let mut exercise = ExerciseResult::new(name, language);
            exercise.max_attempts = max_attempts;
            exercise
        });

        exercise.status = ExerciseStatus::Running;
        exercise.start_time = Some(OffsetDateTime::now_utc());
        exercise.end_time = None;
        exercise.duration_seconds = None;
        exercise.attempts += 1;
        let (attempts, limit) = (exercise.attempts, exercise.max_attempts);

        run.current_exercise = Some(key.clone());
        apply_state(run, RunState::Running)?;
        inner.persist(&self.store);

        info!(exercise = %key, "started exercise (attempt {attempts}/{limit})");
        Ok(())
    }

    /// Same as [`Tracker::start_exercise`] with the default attempt limit.
    pub fn start_exercise_default(&self, name: &str, language: &str) -> Result<()> {
        self.start_exercise(name, language, DEFAULT_MAX_ATTEMPTS)
    }

    /// Records the outcome of a started exercise. Not idempotent: each call
    /// increments the run counters, even for a key that already completed.
    pub fn complete_exercise(&self, name: &str, language: &str, outcome: Outcome) -> Result<()> {
        let mut inner = self.lock();
        let run = inner.active_run_mut()?;

        let key = exercise_key(language, name);
        let exercise = run
            .exercises
            .get_mut(&key)
            .ok_or_else(|| TrackerError::ExerciseNotFound(key.clone()))?;

        let now = OffsetDateTime::now_utc();
        exercise.end_time = Some(now);
        if let Some(start) = exercise.start_time {
            exercise.duration_seconds = Some(seconds_between(start, now));
        }

        exercise.status = if outcome.passed {
            ExerciseStatus::Passed
        } else {
            ExerciseStatus::Failed
        };
        exercise.error_message = outcome.error_message;
        exercise.metrics.extend(outcome.metrics);

        if outcome.passed {
            run.passed_exercises += 1;
        } else {
            run.failed_exercises += 1;
        }
        run.completed_exercises += 1;
        run.current_exercise = None;

        let finished =
            run.completed_exercises >= run.total_exercises && !run.state.is_terminal();
        if finished {
            apply_state(run, RunState::Completed)?;
        }
        inner.persist(&self.store);

        let verdict = if outcome.passed { "PASSED" } else { "FAILED" };
        info!(exercise = %key, "completed exercise - {verdict}");
        if finished {
            info!("all exercises completed, benchmark state updated to completed");
        }
        Ok(())
    }

    /// Sets an exercise status outside the start/complete pair, for outcomes
    /// such as skipped or errored exercises. Run counters are left alone.
    pub fn set_exercise_status(
        &self,
        name: &str,
        language: &str,
        status: ExerciseStatus,
        error_message: Option<String>,
    ) -> Result<()> {
        if matches!(
            status,
            ExerciseStatus::Running | ExerciseStatus::Passed | ExerciseStatus::Failed
        ) {
            return Err(TrackerError::UnsupportedStatus(status));
        }

        let mut inner = self.lock();
        let run = inner.active_run_mut()?;

        let key = exercise_key(language, name);
        let exercise = run
            .exercises
            .entry(key.clone())
            .or_insert_with(|| ExerciseResult::new(name, language));

        if exercise.status == ExerciseStatus::Running {
            let now = OffsetDateTime::now_utc();
            exercise.end_time = Some(now);
            exercise.duration_seconds = exercise.start_time.map(|start| seconds_between(start, now));
        }
        exercise.status = status;
        if error_message.is_some() {
            exercise.error_message = error_message;
        }

        if run.current_exercise.as_deref() == Some(key.as_str()) {
            run.current_exercise = None;
        }
        inner.persist(&self.store);

        info!(exercise = %key, status = %status, "exercise status set");
        Ok(())
    }

    /// `None` when no run is active.
    pub fn progress(&self) -> Option<Progress> {
        self.lock().current_run.as_ref().map(stats::progress)
    }

    /// `None` when no run is active.
    pub fn statistics(&self) -> Option<Statistics> {
        self.lock().current_run.as_ref().map(stats::statistics)
    }

    /// Writes run, progress and statistics as one JSON document, by default
    /// to `report_{run_id}.json` in the state directory.
    pub fn export_report(&self, output_path: Option<&Path>) -> Result<PathBuf> {
        let report = {
            let inner = self.lock();
            let run = inner.current_run.as_ref().ok_or(TrackerError::NoActiveRun)?;
            Report::from_run(run)
        };

        let path = match output_path {
            Some(path) => path.to_path_buf(),
            None => self.store.report_path(&report.run.run_id),
        };

        store::write_json_atomic(&path, &report)?;
        info!(path = %path.display(), "exported report");
        Ok(path)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ids name the state file, so they must stay a plain file name that the
/// directory scan does not mistake for a report.
fn is_valid_run_id(run_id: &str) -> bool {
    RUN_ID_RE.is_match(run_id) && !run_id.starts_with(store::REPORT_PREFIX)
}

fn apply_state(run: &mut BenchmarkRun, next: RunState) -> Result<()> {
    if !run.state.can_transition_to(next) {
        return Err(TrackerError::InvalidTransition {
            from: run.state,
            to: next,
        });
    }

    run.state = next;
    let now = OffsetDateTime::now_utc();

    if next == RunState::Running {
        if run.start_time.is_none() {
            run.start_time = Some(now);
        }
    } else if next.is_terminal() {
        run.end_time = Some(now);
        if let Some(start) = run.start_time {
            run.duration_seconds = Some(seconds_between(start, now));
        }
    }

    Ok(())
}

fn load_logged(path: &Path) -> Option<BenchmarkRun> {
    match StateStore::load(path) {
        Ok(run) => Some(run),
        Err(err) => {
            warn!("failed to reload state file {}: {err}", path.display());
            None
        }
    }
}

type Recovered = (Option<(BenchmarkRun, PathBuf)>, Vec<BenchmarkRun>);

fn recover(store: &StateStore) -> Recovered {
    let files = match store.list_state_files() {
        Ok(files) => files,
        Err(err) => {
            warn!("failed to scan state directory: {err}");
            return (None, Vec::new());
        }
    };

    let mut active = None;
    let mut history = Vec::new();

    for path in files {
        let run = match StateStore::load(&path) {
            Ok(run) => run,
            Err(err) => {
                warn!("failed to load state file {}: {err}", path.display());
                continue;
            }
        };

        if active.is_none() && !run.state.is_retired() {
            check_consistency(&run);
            active = Some((run, path));
        } else {
            history.push(run);
        }
    }

    (active, history)
}

fn check_consistency(run: &BenchmarkRun) {
    if run.completed_exercises != run.passed_exercises + run.failed_exercises {
        warn!(
            run_id = %run.run_id,
            "completed count {} does not equal passed {} + failed {}",
            run.completed_exercises, run.passed_exercises, run.failed_exercises
        );
    }

    let (passed, failed) = run.tally_exercises();
    if passed != run.passed_exercises || failed != run.failed_exercises {
        warn!(
            run_id = %run.run_id,
            "counters (passed {}, failed {}) differ from exercise records (passed {passed}, failed {failed})",
            run.passed_exercises, run.failed_exercises
        );
    }
}
