use crate::app_error::AppError;
use crate::config::{self, DEFAULT_CONFIG_PATH, DEFAULT_CONFIG_TEMPLATE, Settings};
use crate::model::{BenchmarkRun, DEFAULT_MAX_ATTEMPTS, ExerciseStatus, MetricValue, RunState};
use crate::monitor::{Monitor, MonitorOptions};
use crate::output::{self, RunRow};
use crate::stats::{Progress, Statistics};
use crate::tracker::{NewRun, Outcome, Tracker};
use crate::version;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Generator, generate};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(
    name = "benchtrack",
    version = version::VALUE,
    about = "Progress tracking and live monitoring for benchmark runs",
    styles = clap_styles()
)]
struct Cli {
    #[arg(long = "no-color", global = true)]
    no_color: bool,
    /// Config file (default ./benchtrack.yml, optional)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a default config file
    Init(InitArgs),
    /// Check the config file
    Validate(ValidateArgs),
    /// Watch benchmark progress until interrupted
    Monitor(MonitorArgs),
    /// Print progress and statistics of the active run once
    Status(StatusArgs),
    /// List the active run and finished runs in a state directory
    Runs(RunsArgs),
    /// Export a JSON report of the active run
    Report(ReportArgs),
    /// Record run and exercise events from scripts
    Track(TrackArgs),
    Version,
    Completion(CompletionArgs),
}

#[derive(Debug, Args)]
struct InitArgs {
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct MonitorArgs {
    /// State directory to watch; auto-detected when omitted
    state_dir: Option<PathBuf>,
    /// Directory holding timestamped benchmark directories
    #[arg(long)]
    base_dir: Option<PathBuf>,
    /// Refresh interval, in seconds or as a duration like "10s"
    #[arg(long)]
    interval: Option<String>,
    #[arg(long = "no-auto-detect")]
    no_auto_detect: bool,
}

#[derive(Debug, Args)]
struct StatusArgs {
    #[arg(long)]
    state_dir: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct RunsArgs {
    #[arg(long)]
    state_dir: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ReportArgs {
    #[arg(long)]
    state_dir: Option<PathBuf>,
    /// Report path (default <state_dir>/report_<run_id>.json)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct TrackArgs {
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: TrackCommand,
}

#[derive(Debug, Subcommand)]
enum TrackCommand {
    /// Start a new run
    StartRun {
        #[arg(long)]
        run_id: String,
        #[arg(long)]
        model: String,
        #[arg(long = "language", required = true)]
        languages: Vec<String>,
        #[arg(long)]
        total: u32,
        /// Run configuration entry; values are parsed as JSON when possible
        #[arg(id = "set", long = "set", value_name = "KEY=VALUE")]
        config: Vec<String>,
    },
    /// Move the active run to another state
    State {
        #[arg(value_enum)]
        state: StateArg,
    },
    /// Mark an exercise as running
    Start {
        name: String,
        #[arg(long)]
        language: String,
        #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
        max_attempts: u32,
    },
    /// Record the outcome of a running exercise
    Complete {
        name: String,
        #[arg(value_enum)]
        verdict: Verdict,
        #[arg(long)]
        language: String,
        #[arg(long)]
        error: Option<String>,
        #[arg(long = "metric", value_name = "KEY=VALUE")]
        metrics: Vec<String>,
    },
    /// Mark an exercise as pending, skipped or errored
    SetStatus {
        name: String,
        #[arg(value_enum)]
        status: DirectStatus,
        #[arg(long)]
        language: String,
        #[arg(long)]
        error: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StateArg {
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl From<StateArg> for RunState {
    fn from(value: StateArg) -> Self {
        match value {
            StateArg::Running => RunState::Running,
            StateArg::Paused => RunState::Paused,
            StateArg::Completed => RunState::Completed,
            StateArg::Failed => RunState::Failed,
            StateArg::Cancelled => RunState::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Verdict {
    Passed,
    Failed,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DirectStatus {
    Pending,
    Skipped,
    Error,
}

impl From<DirectStatus> for ExerciseStatus {
    fn from(value: DirectStatus) -> Self {
        match value {
            DirectStatus::Pending => ExerciseStatus::Pending,
            DirectStatus::Skipped => ExerciseStatus::Skipped,
            DirectStatus::Error => ExerciseStatus::Error,
        }
    }
}

#[derive(Debug, Args)]
struct CompletionArgs {
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

fn clap_styles() -> Styles {
    Styles::plain()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Cyan.on_default())
        .valid(AnsiColor::Cyan.on_default())
        .invalid(AnsiColor::Cyan.on_default())
        .context(AnsiColor::White.on_default())
        .context_value(AnsiColor::Cyan.on_default())
}

pub fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    output::configure(cli.no_color);

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init(args) => run_init(config_path, args),
        Commands::Validate(args) => run_validate(config_path, args),
        Commands::Monitor(args) => run_monitor(&load_settings(config_path)?, args),
        Commands::Status(args) => run_status(&load_settings(config_path)?, args),
        Commands::Runs(args) => run_runs(&load_settings(config_path)?, args),
        Commands::Report(args) => run_report(&load_settings(config_path)?, args),
        Commands::Track(args) => run_track(&load_settings(config_path)?, args),
        Commands::Version => {
            println!("{}", version::VALUE);
            Ok(())
        }
        Commands::Completion(args) => run_completion(args),
    }
}

fn run_init(config_path: Option<&Path>, args: InitArgs) -> Result<(), AppError> {
    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));

    if path.exists() && !args.force {
        return Err(AppError::usage(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .map_err(|e| AppError::internal(format!("write {}: {e}", path.display())))?;

    println!("created {}", output::path(&path.display().to_string()));
    Ok(())
}

fn run_validate(config_path: Option<&Path>, args: ValidateArgs) -> Result<(), AppError> {
    #[derive(Serialize)]
    struct Issue<'a> {
        field: &'a str,
        message: &'a str,
    }

    #[derive(Serialize)]
    struct ValidateOutput<'a> {
        valid: bool,
        config: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        issues: Option<Vec<Issue<'a>>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<&'a str>,
    }

    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    let path_text = path.display().to_string();

    let cfg = match config::parse(path) {
        Ok(cfg) => cfg,
        Err(err) => {
            if args.json {
                let output = ValidateOutput {
                    valid: false,
                    config: &path_text,
                    issues: None,
                    error: Some(&err),
                };
                print_json(&output, "validate")?;
            }
            return Err(AppError::usage(err));
        }
    };

    match config::validate(&cfg) {
        Ok(()) => {
            if args.json {
                let output = ValidateOutput {
                    valid: true,
                    config: &path_text,
                    issues: None,
                    error: None,
                };
                print_json(&output, "validate")?;
            } else {
                println!("valid {}", output::path(&path_text));
            }
            Ok(())
        }
        Err(err) => {
            let message = err.to_string();
            if args.json {
                let output = ValidateOutput {
                    valid: false,
                    config: &path_text,
                    issues: Some(
                        err.issues
                            .iter()
                            .map(|issue| Issue {
                                field: &issue.field,
                                message: &issue.message,
                            })
                            .collect(),
                    ),
                    error: Some(&message),
                };
                print_json(&output, "validate")?;
            }
            Err(AppError::usage(message))
        }
    }
}

/// A missing default config means built-in defaults; a missing explicit
/// `--config` is a usage error.
fn load_settings(config_path: Option<&Path>) -> Result<Settings, AppError> {
    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));

    if !path.exists() {
        if config_path.is_some() {
            return Err(AppError::usage(format!(
                "config file {} not found",
                output::path(&path.display().to_string())
            )));
        }
        return Ok(Settings::default());
    }

    let cfg = config::load(path).map_err(|err| {
        if err.starts_with("read config:") {
            AppError::internal(err)
        } else {
            AppError::usage(err)
        }
    })?;
    cfg.resolve().map_err(AppError::usage)
}

fn open_tracker(settings: &Settings, state_dir: Option<PathBuf>) -> Result<Tracker, AppError> {
    let dir = state_dir.unwrap_or_else(|| settings.state_dir.clone());
    Ok(Tracker::new(dir)?)
}

fn run_monitor(settings: &Settings, args: MonitorArgs) -> Result<(), AppError> {
    let auto_detect = settings.auto_detect && !args.no_auto_detect;

    if args.state_dir.is_none() && !auto_detect {
        return Err(AppError::usage(
            "a state directory is required when auto-detection is disabled",
        ));
    }

    let refresh_interval = match args.interval.as_deref() {
        Some(text) => config::parse_interval(text).map_err(AppError::usage)?,
        None => settings.refresh_interval,
    };

    let mut monitor = Monitor::new(MonitorOptions {
        state_dir: args.state_dir,
        base_dir: args.base_dir.unwrap_or_else(|| settings.base_dir.clone()),
        state_subdir: settings.state_subdir.clone(),
        refresh_interval,
        auto_detect,
    });

    monitor
        .run()
        .map_err(|e| AppError::internal(format!("render monitor: {e}")))
}

#[derive(Serialize)]
struct StatusJson {
    active: bool,
    progress: Option<Progress>,
    statistics: Option<Statistics>,
}

fn run_status(settings: &Settings, args: StatusArgs) -> Result<(), AppError> {
    let tracker = open_tracker(settings, args.state_dir)?;
    let progress = tracker.progress();
    let statistics = tracker.statistics();

    if args.json {
        let payload = StatusJson {
            active: progress.is_some(),
            progress,
            statistics,
        };
        return print_json(&payload, "status");
    }

    let mut stdout = io::stdout().lock();
    match progress {
        Some(progress) => output::print_frame(&mut stdout, &progress, statistics.as_ref()),
        None => {
            let dir = tracker.state_dir().display().to_string();
            output::print_idle(&mut stdout, Some(dir.as_str()))
        }
    }
    .map_err(|e| AppError::internal(format!("print status: {e}")))
}

#[derive(Serialize)]
struct RunsJson {
    current: Option<BenchmarkRun>,
    history: Vec<BenchmarkRun>,
}

fn run_runs(settings: &Settings, args: RunsArgs) -> Result<(), AppError> {
    let tracker = open_tracker(settings, args.state_dir)?;
    let current = tracker.current_run();
    let history = tracker.run_history();

    if args.json {
        return print_json(&RunsJson { current, history }, "runs");
    }

    let rows: Vec<RunRow> = current
        .iter()
        .map(|run| RunRow::from_run(run, true))
        .chain(history.iter().map(|run| RunRow::from_run(run, false)))
        .collect();

    output::print_runs(io::stdout().lock(), &rows)
        .map_err(|e| AppError::internal(format!("print runs: {e}")))
}

fn run_report(settings: &Settings, args: ReportArgs) -> Result<(), AppError> {
    let tracker = open_tracker(settings, args.state_dir)?;
    let path = tracker.export_report(args.output.as_deref())?;

    println!(
        "{} report written to {}",
        output::success("ok"),
        output::path(&path.display().to_string())
    );
    Ok(())
}

fn run_track(settings: &Settings, args: TrackArgs) -> Result<(), AppError> {
    let tracker = open_tracker(settings, args.state_dir)?;

    match args.command {
        TrackCommand::StartRun {
            run_id,
            model,
            languages,
            total,
            config,
        } => {
            let mut new_run = NewRun::new(run_id, model, languages, total);
            for entry in &config {
                let (key, value) = split_pair(entry, "--set")?;
                new_run = new_run.with_config(key, parse_config_value(value));
            }
            let run = tracker.start_run(new_run)?;
            println!(
                "{} started run {} ({} exercises)",
                output::success("ok"),
                output::accent(&run.run_id),
                run.total_exercises
            );
        }
        TrackCommand::State { state } => {
            let state = RunState::from(state);
            tracker.update_state(state)?;
            println!("{} run state {}", output::success("ok"), output::run_state(state));
        }
        TrackCommand::Start {
            name,
            language,
            max_attempts,
        } => {
            tracker.start_exercise(&name, &language, max_attempts)?;
            println!("{} started {language}/{name}", output::success("ok"));
        }
        TrackCommand::Complete {
            name,
            verdict,
            language,
            error,
            metrics,
        } => {
            let mut outcome = match verdict {
                Verdict::Passed => Outcome::passed(),
                Verdict::Failed => Outcome::failed(),
            };
            if let Some(message) = error {
                outcome = outcome.with_error(message);
            }
            for entry in &metrics {
                let (key, value) = split_pair(entry, "--metric")?;
                outcome = outcome.with_metric(key, parse_metric_value(value));
            }

            tracker.complete_exercise(&name, &language, outcome)?;
            let label = match verdict {
                Verdict::Passed => output::success("passed"),
                Verdict::Failed => output::failure("failed"),
            };
            println!("{} {language}/{name} {label}", output::success("ok"));
        }
        TrackCommand::SetStatus {
            name,
            status,
            language,
            error,
        } => {
            let status = ExerciseStatus::from(status);
            tracker.set_exercise_status(&name, &language, status, error)?;
            println!(
                "{} {language}/{name} {}",
                output::success("ok"),
                output::exercise_status(status)
            );
        }
    }

    Ok(())
}

fn split_pair<'a>(entry: &'a str, flag: &str) -> Result<(&'a str, &'a str), AppError> {
    match entry.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(AppError::usage(format!(
            "{flag} expects KEY=VALUE, got {entry:?}"
        ))),
    }
}

fn parse_config_value(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string()))
}

fn parse_metric_value(text: &str) -> MetricValue {
    let trimmed = text.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return MetricValue::Int(int);
    }
    match trimmed.parse::<f64>() {
        Ok(float) if float.is_finite() => MetricValue::Float(float),
        _ => MetricValue::Text(text.to_string()),
    }
}

fn print_json<T: Serialize>(value: &T, what: &str) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)
        .map_err(|e| AppError::internal(format!("encode {what} json: {e}")))?;
    writeln!(stdout).map_err(|e| AppError::internal(format!("write output: {e}")))
}

fn run_completion(args: CompletionArgs) -> Result<(), AppError> {
    let mut cmd = Cli::command();
    let mut stdout = io::stdout().lock();

    match args.shell {
        Shell::Bash => generate_completion(clap_complete::shells::Bash, &mut cmd, &mut stdout),
        Shell::Zsh => generate_completion(clap_complete::shells::Zsh, &mut cmd, &mut stdout),
        Shell::Fish => generate_completion(clap_complete::shells::Fish, &mut cmd, &mut stdout),
        Shell::Powershell => {
            generate_completion(clap_complete::shells::PowerShell, &mut cmd, &mut stdout)
        }
    }
    .map_err(|e| AppError::internal(format!("generate completion: {e}")))
}

fn generate_completion<G: Generator>(
    generator: G,
    cmd: &mut clap::Command,
    writer: &mut impl Write,
) -> Result<(), io::Error> {
    generate(generator, cmd, "benchtrack", writer);
    writer.flush()
}
