use crate::model::{ExerciseStatus, RunState};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("no active benchmark run")]
    NoActiveRun,

    #[error("exercise {0} not found in current run")]
    ExerciseNotFound(String),

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: RunState, to: RunState },

    #[error("exercise status {0} is set by start/complete, not directly")]
    UnsupportedStatus(ExerciseStatus),

    #[error("run {0:?} already has an active state file")]
    RunConflict(String),

    #[error("invalid run id {0:?}: use letters, digits, '.', '_' or '-'")]
    InvalidRunId(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TrackerError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;
