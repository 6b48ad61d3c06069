use crate::error::{Result, TrackerError};
use crate::model::BenchmarkRun;
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tracing::debug;

pub const DEFAULT_STATE_DIR: &str = "tmp.benchmarks/.tracker";
pub const REPORT_PREFIX: &str = "report_";

/// One JSON file per run inside a state directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            TrackerError::io(format!("create state directory {}", self.dir.display()), e)
        })
    }

    pub fn run_path(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{run_id}.json"))
    }

    pub fn report_path(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{REPORT_PREFIX}{run_id}.json"))
    }

    pub fn save(&self, path: &Path, run: &BenchmarkRun) -> Result<()> {
        write_json_atomic(path, run)?;
        debug!(path = %path.display(), run_id = %run.run_id, "saved run state");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<BenchmarkRun> {
        let text = fs::read_to_string(path)
            .map_err(|e| TrackerError::io(format!("read state file {}", path.display()), e))?;
        serde_json::from_str(&text)
            .map_err(|e| TrackerError::json(format!("parse state file {}", path.display()), e))
    }

    /// Run state files, most recently modified first.
    pub fn list_state_files(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(TrackerError::io(
                    format!("read state directory {}", self.dir.display()),
                    err,
                ));
            }
        };

        let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();

        for entry in entries {
            let Ok(entry) = entry else {
                continue;
            };
            let path = entry.path();
            if !is_state_file(&path) {
                continue;
            }

            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((modified, path));
        }

        files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        Ok(files.into_iter().map(|(_, path)| path).collect())
    }
}

fn is_state_file(path: &Path) -> bool {
    if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
        return false;
    }

    match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => !name.starts_with(REPORT_PREFIX) && !name.starts_with('.'),
        None => false,
    }
}

/// Writes `value` to a temp file next to `path` and renames it into place,
/// so concurrent readers see either the old or the new document.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let tmp = NamedTempFile::new_in(parent)
        .map_err(|e| TrackerError::io(format!("create temp file in {}", parent.display()), e))?;

    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|e| TrackerError::json(format!("serialize {}", path.display()), e))?;
        writer
            .write_all(b"\n")
            .and_then(|_| writer.flush())
            .map_err(|e| TrackerError::io(format!("write {}", path.display()), e))?;
    }

    tmp.as_file()
        .sync_all()
        .map_err(|e| TrackerError::io(format!("sync {}", path.display()), e))?;
    tmp.persist(path)
        .map_err(|e| TrackerError::io(format!("replace {}", path.display()), e.error))?;
    Ok(())
}
