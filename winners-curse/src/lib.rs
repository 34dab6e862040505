//! Winner's Curse Simulation Engine
//!
//! Monte Carlo estimation of how often the apparent best of several noisy
//! candidates overstates its own true value. Selection, ground-truth models,
//! trial evaluation and summary statistics live here; experiment catalogs and
//! reporting live in the runner crate.

pub mod config;
pub mod error;
pub mod experiment;
pub mod model;
pub mod numbers;
pub mod selector;
pub mod summary;
pub mod trial;

// Re-export commonly used types
pub use config::{
    ConfidenceConfig, ConfidenceMethod, DEFAULT_ITERATIONS, DEFAULT_SEED, ParameterFloor,
    SimulationConfig,
};
pub use error::SimulationError;
pub use experiment::{Experiment, OutcomeSequence, derive_stream_seed, run_experiment, run_trials};
pub use model::{
    BinomialArms, CurveKind, CurveModel, DroneRange, GaussianArms, GenerativeModel, ModelSpec,
    Observation, ParameterNoise, PeakingCurve, ResponseCurve,
};
pub use numbers::linspace;
pub use selector::select_best;
pub use summary::{
    ProportionInterval, Summary, SweepPoint, proportion_interval, summarize, sweep, sweep_spec,
};
pub use trial::{TrialOutcome, Verdict, run_trial};
