pub mod app_error;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod output;
pub mod stats;
pub mod store;
pub mod tracker;
pub mod version;

pub use error::{Result, TrackerError};
pub use model::{BenchmarkRun, ExerciseResult, ExerciseStatus, MetricValue, RunState};
pub use tracker::{NewRun, Outcome, Tracker};

pub fn run() -> i32 {
    logging::init();

    match cli::run_cli() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            err.code()
        }
    }
}
