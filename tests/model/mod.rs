use benchtrack::model::{
    BenchmarkRun, ExerciseResult, ExerciseStatus, MetricValue, RunState, exercise_key,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use time::macros::datetime;

fn sample_run() -> BenchmarkRun {
    let mut exercise = ExerciseResult::new("leap", "go");
    exercise.status = ExerciseStatus::Failed;
    exercise.start_time = Some(datetime!(2025-01-02 03:04:05.123456789 UTC));
    exercise.end_time = Some(datetime!(2025-01-02 03:04:07.5 UTC));
    exercise.duration_seconds = Some(2.376543211);
    exercise.attempts = 2;
    exercise.error_message = Some("Test timeout".to_string());
    exercise
        .metrics
        .insert("total_tokens".to_string(), MetricValue::Int(1200));
    exercise
        .metrics
        .insert("cost".to_string(), MetricValue::Float(0.015));
    exercise
        .metrics
        .insert("model".to_string(), MetricValue::Text("sonnet".to_string()));

    let mut exercises = BTreeMap::new();
    exercises.insert(exercise.key(), exercise);
    exercises.insert(
        exercise_key("python", "two-fer"),
        ExerciseResult::new("two-fer", "python"),
    );

    let mut config = BTreeMap::new();
    config.insert("threads".to_string(), json!(4));
    config.insert("tries".to_string(), json!({"max": 2}));

    BenchmarkRun {
        run_id: "2025-01-02-run".to_string(),
        state: RunState::Running,
        model: "modelX".to_string(),
        languages: vec!["go".to_string(), "python".to_string()],
        total_exercises: 5,
        completed_exercises: 1,
        passed_exercises: 0,
        failed_exercises: 1,
        start_time: Some(OffsetDateTime::now_utc()),
        end_time: None,
        duration_seconds: None,
        current_exercise: Some("python/two-fer".to_string()),
        exercises,
        config,
    }
}

#[test]
fn run_round_trips_through_json() {
    let run = sample_run();
    let text = serde_json::to_string_pretty(&run).expect("serialize");
    let back: BenchmarkRun = serde_json::from_str(&text).expect("deserialize");
    assert_eq!(back, run);
}

#[test]
fn enums_serialize_as_lowercase_strings() {
    let run = sample_run();
    let value: Value = serde_json::to_value(&run).expect("to value");

    assert_eq!(value["state"], "running");
    assert_eq!(value["exercises"]["go/leap"]["status"], "failed");
    assert_eq!(value["exercises"]["python/two-fer"]["status"], "pending");
    assert_eq!(value["exercises"]["python/two-fer"]["start_time"], Value::Null);
    assert_eq!(value["exercises"]["go/leap"]["metrics"]["total_tokens"], 1200);
}

#[test]
fn unknown_state_string_is_rejected() {
    let mut value = serde_json::to_value(sample_run()).expect("to value");
    value["state"] = json!("sleeping");
    assert!(serde_json::from_value::<BenchmarkRun>(value).is_err());

    let mut value = serde_json::to_value(sample_run()).expect("to value");
    value["exercises"]["go/leap"]["status"] = json!("PASSED");
    assert!(serde_json::from_value::<BenchmarkRun>(value).is_err());
}

#[test]
fn exercise_defaults_fill_missing_fields() {
    let exercise: ExerciseResult =
        serde_json::from_value(json!({"name": "bob", "language": "rust", "status": "pending"}))
            .expect("deserialize");

    assert_eq!(exercise.attempts, 0);
    assert_eq!(exercise.max_attempts, 3);
    assert!(exercise.metrics.is_empty());
    assert_eq!(exercise.key(), "rust/bob");
}

#[test]
fn terminal_states_cannot_be_left() {
    for state in [RunState::Completed, RunState::Failed, RunState::Cancelled] {
        assert!(state.is_terminal());
        for next in [
            RunState::Initializing,
            RunState::Running,
            RunState::Paused,
            RunState::Completed,
        ] {
            assert!(!state.can_transition_to(next), "{state} -> {next}");
        }
    }
}

#[test]
fn lifecycle_transitions() {
    assert!(RunState::Initializing.can_transition_to(RunState::Running));
    assert!(RunState::Running.can_transition_to(RunState::Paused));
    assert!(RunState::Paused.can_transition_to(RunState::Running));
    assert!(RunState::Paused.can_transition_to(RunState::Cancelled));
    assert!(RunState::Initializing.can_transition_to(RunState::Failed));
    assert!(!RunState::Initializing.can_transition_to(RunState::Paused));
    assert!(!RunState::Running.can_transition_to(RunState::Initializing));
}

#[test]
fn only_completed_and_cancelled_runs_are_retired() {
    assert!(RunState::Completed.is_retired());
    assert!(RunState::Cancelled.is_retired());
    assert!(!RunState::Failed.is_retired());
    assert!(!RunState::Paused.is_retired());
}

#[test]
fn metric_values_are_untagged() {
    let metrics: BTreeMap<String, MetricValue> =
        serde_json::from_value(json!({"a": 3, "b": 0.5, "c": "x"})).expect("deserialize");

    assert_eq!(metrics["a"], MetricValue::Int(3));
    assert_eq!(metrics["b"], MetricValue::Float(0.5));
    assert_eq!(metrics["c"], MetricValue::Text("x".to_string()));
    assert_eq!(metrics["a"].as_f64(), Some(3.0));
    assert_eq!(metrics["c"].as_f64(), None);
}
