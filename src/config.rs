use crate::monitor::{DEFAULT_BASE_DIR, DEFAULT_REFRESH_INTERVAL, DEFAULT_STATE_SUBDIR};
use crate::store::DEFAULT_STATE_DIR;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

pub const CURRENT_VERSION: i32 = 1;
pub const DEFAULT_CONFIG_PATH: &str = "./benchtrack.yml";

pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"version: 1

# where a driver writes run state files
state_dir: "tmp.benchmarks/.tracker"

# monitor auto-detection: newest <base_dir>/YYYY-MM-DD-HH-MM-SS*/<state_subdir>
base_dir: "tmp.benchmarks"
state_subdir: ".tracker"

monitor:
  refresh_interval: "5s"
  auto_detect: true
"#;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub version: i32,
    pub state_dir: String,
    pub base_dir: String,
    pub state_subdir: String,
    pub monitor: MonitorSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorSection {
    pub refresh_interval: String,
    pub auto_detect: Option<bool>,
}

/// Fully resolved settings, with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub state_dir: PathBuf,
    pub base_dir: PathBuf,
    pub state_subdir: String,
    pub refresh_interval: Duration,
    pub auto_detect: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            state_subdir: DEFAULT_STATE_SUBDIR.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            auto_detect: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    pub issues: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F: Into<String>, M: Into<String>>(&mut self, field: F, message: M) {
        self.issues.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(first) = self.issues.first() {
            write!(
                f,
                "configuration validation failed: {}: {}",
                first.field, first.message
            )
        } else {
            write!(f, "configuration validation failed")
        }
    }
}

impl std::error::Error for ValidationErrors {}

pub fn load(path: &Path) -> Result<Config, String> {
    let cfg = parse(path)?;
    validate(&cfg).map_err(|e| e.to_string())?;
    Ok(cfg)
}

pub fn parse(path: &Path) -> Result<Config, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("read config: {e}"))?;
    let cfg: Config = serde_yaml::from_str(&text).map_err(|e| format!("parse config yaml: {e}"))?;
    Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<(), ValidationErrors> {
    let mut issues = ValidationErrors::new();

    if cfg.version != CURRENT_VERSION {
        issues.add("version", format!("must be {CURRENT_VERSION}"));
    }

    if !cfg.state_subdir.is_empty() && !is_single_component(&cfg.state_subdir) {
        issues.add("state_subdir", "must be a single directory name");
    }

    if !cfg.monitor.refresh_interval.is_empty()
        && let Err(err) = parse_interval(&cfg.monitor.refresh_interval)
    {
        issues.add("monitor.refresh_interval", err);
    }

    if issues.has_issues() {
        Err(issues)
    } else {
        Ok(())
    }
}

impl Config {
    pub fn resolve(&self) -> Result<Settings, String> {
        let defaults = Settings::default();

        let refresh_interval = if self.monitor.refresh_interval.is_empty() {
            defaults.refresh_interval
        } else {
            parse_interval(&self.monitor.refresh_interval)
                .map_err(|e| format!("monitor.refresh_interval: {e}"))?
        };

        Ok(Settings {
            state_dir: non_empty_path(&self.state_dir).unwrap_or(defaults.state_dir),
            base_dir: non_empty_path(&self.base_dir).unwrap_or(defaults.base_dir),
            state_subdir: if self.state_subdir.is_empty() {
                defaults.state_subdir
            } else {
                self.state_subdir.clone()
            },
            refresh_interval,
            auto_detect: self.monitor.auto_detect.unwrap_or(defaults.auto_detect),
        })
    }
}

/// Accepts bare seconds (`"5"`) or a humantime duration (`"1m 30s"`).
pub fn parse_interval(text: &str) -> Result<Duration, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("interval is required".to_string());
    }

    let interval = if trimmed.chars().all(|c| c.is_ascii_digit()) {
        let secs: u64 = trimmed
            .parse()
            .map_err(|e| format!("invalid interval {trimmed:?}: {e}"))?;
        Duration::from_secs(secs)
    } else {
        humantime::parse_duration(trimmed)
            .map_err(|e| format!("invalid interval {trimmed:?}: {e}"))?
    };

    if interval.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }

    Ok(interval)
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    if value.trim().is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

fn is_single_component(value: &str) -> bool {
    let mut components = Path::new(value).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
