//! Experiment configuration shared by the aggregator and the reporter.
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// Default number of simulated trials per experiment.
pub const DEFAULT_ITERATIONS: usize = 10_000;
/// Default seed for the experiment generator.
pub const DEFAULT_SEED: u64 = 1234;
/// Default floor applied to perturbed model parameters.
pub const DEFAULT_PARAMETER_FLOOR: f64 = 0.01;
/// Two-sided z-score for a 95% interval.
pub const DEFAULT_Z: f64 = 1.96;

/// Lower bound applied to sampled model parameters.
///
/// Perturbed parameters (and negative standard deviations) below the floor are
/// replaced by the floor so response curves stay well defined. Trials where
/// this happens are flagged so the clamp rate stays auditable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterFloor(pub f64);

impl ParameterFloor {
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Clamp `value` to the floor, reporting whether the clamp fired.
    #[must_use]
    pub fn apply(self, value: f64) -> (f64, bool) {
        if value < self.0 {
            (self.0, true)
        } else {
            (value, false)
        }
    }
}

impl Default for ParameterFloor {
    fn default() -> Self {
        Self(DEFAULT_PARAMETER_FLOOR)
    }
}

/// Binomial proportion interval formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceMethod {
    /// Normal approximation `p ± z·sqrt(p(1-p)/n)`
    #[default]
    Wald,
    /// Wilson score interval
    Wilson,
}

/// Configuration for the interval reported around the overestimation rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    #[serde(default)]
    pub method: ConfidenceMethod,
    /// Z-score of the two-sided interval.
    ///
    /// - `1.96` ≈ 95%
    /// - `2.58` ≈ 99%
    #[serde(default = "ConfidenceConfig::default_z")]
    pub z: f64,
}

impl ConfidenceConfig {
    const fn default_z() -> f64 {
        DEFAULT_Z
    }
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            method: ConfidenceMethod::default(),
            z: DEFAULT_Z,
        }
    }
}

/// Top-level knobs for a simulated experiment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "SimulationConfig::default_iterations")]
    pub iterations: usize,
    #[serde(default = "SimulationConfig::default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub parameter_floor: ParameterFloor,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
}

impl SimulationConfig {
    const fn default_iterations() -> usize {
        DEFAULT_ITERATIONS
    }

    const fn default_seed() -> u64 {
        DEFAULT_SEED
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_parameter_floor(mut self, floor: f64) -> Self {
        self.parameter_floor = ParameterFloor(floor);
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: ConfidenceConfig) -> Self {
        self.confidence = confidence;
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidIterationCount`] for zero iterations and
    /// [`SimulationError::InvalidParameter`] for a non-finite floor or a
    /// non-positive z-score.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.iterations == 0 {
            return Err(SimulationError::InvalidIterationCount(self.iterations));
        }
        let floor = self.parameter_floor.value();
        if !floor.is_finite() {
            return Err(SimulationError::invalid(
                "parameter_floor",
                floor,
                "must be finite",
            ));
        }
        let z = self.confidence.z;
        if !(z.is_finite() && z > 0.0) {
            return Err(SimulationError::invalid(
                "confidence.z",
                z,
                "must be finite and positive",
            ));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            seed: DEFAULT_SEED,
            parameter_floor: ParameterFloor::default(),
            confidence: ConfidenceConfig::default(),
        }
    }
}
