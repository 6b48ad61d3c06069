//! Derived views over a [`BenchmarkRun`]. Everything here is a pure function
//! of one run snapshot; the tracker decides when to take that snapshot.

use crate::model::{BenchmarkRun, ExerciseStatus, RunState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

pub const TOKENS_METRIC: &str = "total_tokens";
pub const COST_METRIC: &str = "cost";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub run_id: String,
    pub state: RunState,
    pub model: String,
    pub languages: Vec<String>,
    pub current_exercise: Option<String>,
    pub progress: ProgressCounts,
    pub timing: ProgressTiming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressCounts {
    pub completed: u32,
    pub total: u32,
    pub percentage: f64,
    pub passed: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressTiming {
    #[serde(with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
    pub duration_seconds: Option<f64>,
    pub estimated_remaining: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub run_id: String,
    pub overall: OverallStats,
    pub by_language: BTreeMap<String, LanguageStats>,
    pub metrics: MetricTotals,
    pub timing: TimingStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub success_rate: f64,
    pub total_exercises: u32,
    pub completed: u32,
    pub passed: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageStats {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTotals {
    pub total_tokens: u64,
    pub total_cost: f64,
    pub avg_tokens_per_exercise: f64,
    pub avg_cost_per_exercise: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingStats {
    pub total_duration_seconds: Option<f64>,
    pub avg_exercise_duration: Option<f64>,
}

pub fn progress(run: &BenchmarkRun) -> Progress {
    let percentage = if run.total_exercises > 0 {
        let raw = f64::from(run.completed_exercises) / f64::from(run.total_exercises) * 100.0;
        round_to(raw.min(100.0), 2)
    } else {
        0.0
    };

    Progress {
        run_id: run.run_id.clone(),
        state: run.state,
        model: run.model.clone(),
        languages: run.languages.clone(),
        current_exercise: run.current_exercise.clone(),
        progress: ProgressCounts {
            completed: run.completed_exercises,
            total: run.total_exercises,
            percentage,
            passed: run.passed_exercises,
            failed: run.failed_exercises,
        },
        timing: ProgressTiming {
            start_time: run.start_time,
            duration_seconds: run.duration_seconds,
            estimated_remaining: estimate_remaining(run),
        },
    }
}

pub fn statistics(run: &BenchmarkRun) -> Statistics {
    let mut by_language: BTreeMap<String, LanguageStats> = BTreeMap::new();
    let mut total_tokens: u64 = 0;
    let mut total_cost = 0.0;

    for exercise in run.exercises.values() {
        let entry = by_language.entry(exercise.language.clone()).or_default();
        entry.total += 1;
        match exercise.status {
            ExerciseStatus::Passed => entry.passed += 1,
            ExerciseStatus::Failed => entry.failed += 1,
            _ => {}
        }

        let tokens = exercise
            .metrics
            .get(TOKENS_METRIC)
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        total_tokens += tokens.max(0.0).round() as u64;
        total_cost += exercise
            .metrics
            .get(COST_METRIC)
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
    }

    for stats in by_language.values_mut() {
        stats.success_rate = round_to(f64::from(stats.passed) / f64::from(stats.total) * 100.0, 2);
    }

    let divisor = f64::from(run.completed_exercises.max(1));

    Statistics {
        run_id: run.run_id.clone(),
        overall: OverallStats {
            success_rate: round_to(f64::from(run.passed_exercises) / divisor * 100.0, 2),
            total_exercises: run.total_exercises,
            completed: run.completed_exercises,
            passed: run.passed_exercises,
            failed: run.failed_exercises,
        },
        by_language,
        metrics: MetricTotals {
            total_tokens,
            total_cost: round_to(total_cost, 4),
            avg_tokens_per_exercise: round_to(total_tokens as f64 / divisor, 2),
            avg_cost_per_exercise: round_to(total_cost / divisor, 4),
        },
        timing: TimingStats {
            total_duration_seconds: run.duration_seconds,
            avg_exercise_duration: avg_exercise_duration(run),
        },
    }
}

/// Mean over every exercise with a recorded, non-zero duration, whatever its
/// status. Leftovers from a crashed attempt are included.
pub fn avg_exercise_duration(run: &BenchmarkRun) -> Option<f64> {
    let durations: Vec<f64> = run
        .exercises
        .values()
        .filter_map(|ex| ex.duration_seconds)
        .filter(|d| *d != 0.0)
        .collect();

    if durations.is_empty() {
        return None;
    }

    Some(round_to(
        durations.iter().sum::<f64>() / durations.len() as f64,
        2,
    ))
}

pub fn estimate_remaining(run: &BenchmarkRun) -> Option<f64> {
    if run.completed_exercises == 0 {
        return None;
    }

    let avg = avg_exercise_duration(run).filter(|avg| *avg != 0.0)?;
    let remaining = run.total_exercises.saturating_sub(run.completed_exercises);
    Some(round_to(avg * f64::from(remaining), 2))
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}
