use crate::error::TrackerError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    RuntimeFailure = 1,
    Usage = 2,
    Internal = 3,
}

/// CLI-facing error: a message for stderr plus the process exit code.
#[derive(Debug)]
pub struct AppError {
    code: ExitCode,
    message: String,
}

impl AppError {
    pub fn usage<T: Into<String>>(message: T) -> Self {
        Self::new(ExitCode::Usage, message)
    }

    pub fn runtime<T: Into<String>>(message: T) -> Self {
        Self::new(ExitCode::RuntimeFailure, message)
    }

    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::new(ExitCode::Internal, message)
    }

    fn new<T: Into<String>>(code: ExitCode, message: T) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> i32 {
        self.code as i32
    }
}

impl From<TrackerError> for AppError {
    fn from(err: TrackerError) -> Self {
        let code = match &err {
            TrackerError::InvalidRunId(_) | TrackerError::UnsupportedStatus(_) => ExitCode::Usage,
            TrackerError::Io { .. } | TrackerError::Json { .. } => ExitCode::Internal,
            TrackerError::NoActiveRun
            | TrackerError::ExerciseNotFound(_)
            | TrackerError::InvalidTransition { .. }
            | TrackerError::RunConflict(_) => ExitCode::RuntimeFailure,
        };
        Self::new(code, err.to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}
