//! Discrete arm models: binomial success rates and Gaussian sample means.
use rand::RngCore;
use rand_distr::{Binomial, Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use super::{GenerativeModel, Observation};
use crate::config::ParameterFloor;
use crate::error::SimulationError;
use crate::numbers::{count_to_f64, u64_to_f64};

/// K arms with success probabilities `probabilities`, each tried `trials` times.
///
/// The observed score of an arm is its empirical success rate, so observed
/// and true values share the denominator `trials` and exact ties with the
/// truth are reachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinomialArms {
    pub trials: u64,
    pub probabilities: Vec<f64>,
}

impl BinomialArms {
    #[must_use]
    pub const fn new(trials: u64, probabilities: Vec<f64>) -> Self {
        Self {
            trials,
            probabilities,
        }
    }
}

impl GenerativeModel for BinomialArms {
    fn candidate_count(&self) -> usize {
        self.probabilities.len()
    }

    fn validate(&self) -> Result<(), SimulationError> {
        if self.probabilities.is_empty() {
            return Err(SimulationError::EmptyCandidates);
        }
        if self.trials == 0 {
            return Err(SimulationError::invalid(
                "trials",
                0.0,
                "at least one trial per arm is required",
            ));
        }
        if let Some(&p) = self
            .probabilities
            .iter()
            .find(|p| !(0.0..=1.0).contains(*p))
        {
            return Err(SimulationError::invalid(
                "probabilities",
                p,
                "must lie in [0, 1]",
            ));
        }
        Ok(())
    }

    fn true_value(&self, candidate: usize) -> Option<f64> {
        self.probabilities.get(candidate).copied()
    }

    fn observe(
        &self,
        rng: &mut dyn RngCore,
        _floor: ParameterFloor,
    ) -> Result<Observation, SimulationError> {
        let denom = u64_to_f64(self.trials);
        let mut scores = Vec::with_capacity(self.probabilities.len());
        for &p in &self.probabilities {
            let dist = Binomial::new(self.trials, p)
                .map_err(|_| SimulationError::invalid("probabilities", p, "must lie in [0, 1]"))?;
            let successes = dist.sample(&mut *rng);
            scores.push(u64_to_f64(successes) / denom);
        }
        Ok(Observation {
            scores,
            clamped: false,
        })
    }
}

/// K arms with Gaussian outcomes, observed through `samples_per_arm` draws each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianArms {
    pub means: Vec<f64>,
    pub std_devs: Vec<f64>,
    pub samples_per_arm: usize,
}

impl GaussianArms {
    #[must_use]
    pub const fn new(means: Vec<f64>, std_devs: Vec<f64>, samples_per_arm: usize) -> Self {
        Self {
            means,
            std_devs,
            samples_per_arm,
        }
    }
}

impl GenerativeModel for GaussianArms {
    fn candidate_count(&self) -> usize {
        self.means.len()
    }

    fn validate(&self) -> Result<(), SimulationError> {
        if self.means.is_empty() {
            return Err(SimulationError::EmptyCandidates);
        }
        SimulationError::check_len("std_devs", self.means.len(), self.std_devs.len())?;
        if self.samples_per_arm == 0 {
            return Err(SimulationError::invalid(
                "samples_per_arm",
                0.0,
                "at least one sample per arm is required",
            ));
        }
        if let Some(&mean) = self.means.iter().find(|m| !m.is_finite()) {
            return Err(SimulationError::invalid("means", mean, "must be finite"));
        }
        if let Some(&sd) = self.std_devs.iter().find(|sd| !sd.is_finite()) {
            return Err(SimulationError::invalid("std_devs", sd, "must be finite"));
        }
        Ok(())
    }

    fn true_value(&self, candidate: usize) -> Option<f64> {
        self.means.get(candidate).copied()
    }

    fn observe(
        &self,
        rng: &mut dyn RngCore,
        floor: ParameterFloor,
    ) -> Result<Observation, SimulationError> {
        SimulationError::check_len("std_devs", self.means.len(), self.std_devs.len())?;
        let denom = count_to_f64(self.samples_per_arm);
        let mut clamped = false;
        let mut scores = Vec::with_capacity(self.means.len());
        for (&mean, &sd) in self.means.iter().zip(&self.std_devs) {
            // A negative deviation is a degenerate input; it is floored, not rejected.
            let sd = if sd < 0.0 {
                clamped = true;
                floor.value()
            } else {
                sd
            };
            let mut total = 0.0;
            for _ in 0..self.samples_per_arm {
                let z: f64 = StandardNormal.sample(&mut *rng);
                total += mean + sd * z;
            }
            scores.push(total / denom);
        }
        Ok(Observation { scores, clamped })
    }
}
