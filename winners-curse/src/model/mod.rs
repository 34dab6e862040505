//! Ground-truth generators that produce one noisy observation per candidate.
//!
//! The evaluator only needs two things from a model: the true value of a
//! candidate and a fresh noisy score for every candidate. Everything else
//! (binomial counts, Gaussian sample means, perturbed response curves) stays
//! behind [`GenerativeModel`].
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::ParameterFloor;
use crate::error::SimulationError;

pub mod arms;
pub mod curve;

pub use arms::{BinomialArms, GaussianArms};
pub use curve::{CurveKind, CurveModel, DroneRange, ParameterNoise, PeakingCurve, ResponseCurve};

/// Noisy scores for every candidate from a single simulated trial.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub scores: Vec<f64>,
    /// Whether any sampled parameter fell below the floor and was clamped.
    pub clamped: bool,
}

/// Source of noisy observations around a fixed, known truth.
pub trait GenerativeModel {
    /// Number of candidates K.
    fn candidate_count(&self) -> usize;

    /// Check parameter shapes and domains.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::ShapeMismatch`] when parameter vectors disagree
    /// in length, and other variants for empty or out-of-domain inputs.
    fn validate(&self) -> Result<(), SimulationError>;

    /// Ground-truth value of `candidate`, or `None` when out of range.
    fn true_value(&self, candidate: usize) -> Option<f64>;

    /// Draw one noisy score per candidate.
    ///
    /// # Errors
    ///
    /// Returns an error when the model is invalid; callers are expected to
    /// have run [`GenerativeModel::validate`] first.
    fn observe(
        &self,
        rng: &mut dyn RngCore,
        floor: ParameterFloor,
    ) -> Result<Observation, SimulationError>;

    /// All true values in candidate order.
    fn true_values(&self) -> Vec<f64> {
        (0..self.candidate_count())
            .filter_map(|candidate| self.true_value(candidate))
            .collect()
    }
}

/// Serializable description of any supported ground-truth model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Binomial(BinomialArms),
    Gaussian(GaussianArms),
    Curve(CurveModel),
}

impl ModelSpec {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Binomial(_) => "binomial",
            Self::Gaussian(_) => "gaussian",
            Self::Curve(model) => model.curve.label(),
        }
    }

    /// Copy of this model at a different noise level, for sweeps.
    ///
    /// Only parametric curve models have a continuous noise knob (their
    /// `error_scale`); arm models are swept by building them directly.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidParameter`] for arm models or a
    /// negative / non-finite level.
    pub fn at_noise_level(&self, level: f64) -> Result<Self, SimulationError> {
        match self {
            Self::Curve(model) => {
                let scaled = model.clone().with_error_scale(level);
                scaled.validate()?;
                Ok(Self::Curve(scaled))
            }
            Self::Binomial(_) | Self::Gaussian(_) => Err(SimulationError::invalid(
                "noise_level",
                level,
                "only parametric curve models sweep over an error scale",
            )),
        }
    }
}

impl GenerativeModel for ModelSpec {
    fn candidate_count(&self) -> usize {
        match self {
            Self::Binomial(model) => model.candidate_count(),
            Self::Gaussian(model) => model.candidate_count(),
            Self::Curve(model) => model.candidate_count(),
        }
    }

    fn validate(&self) -> Result<(), SimulationError> {
        match self {
            Self::Binomial(model) => model.validate(),
            Self::Gaussian(model) => model.validate(),
            Self::Curve(model) => model.validate(),
        }
    }

    fn true_value(&self, candidate: usize) -> Option<f64> {
        match self {
            Self::Binomial(model) => model.true_value(candidate),
            Self::Gaussian(model) => model.true_value(candidate),
            Self::Curve(model) => model.true_value(candidate),
        }
    }

    fn observe(
        &self,
        rng: &mut dyn RngCore,
        floor: ParameterFloor,
    ) -> Result<Observation, SimulationError> {
        match self {
            Self::Binomial(model) => model.observe(rng, floor),
            Self::Gaussian(model) => model.observe(rng, floor),
            Self::Curve(model) => model.observe(rng, floor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_spec_deserializes_each_kind() {
        let binomial: ModelSpec =
            serde_json::from_str(r#"{"kind": "binomial", "trials": 10, "probabilities": [0.1, 0.5]}"#)
                .unwrap();
        assert_eq!(binomial.label(), "binomial");
        assert_eq!(binomial.candidate_count(), 2);

        let gaussian: ModelSpec = serde_json::from_str(
            r#"{"kind": "gaussian", "means": [10, 9], "std_devs": [2, 2], "samples_per_arm": 10}"#,
        )
        .unwrap();
        assert_eq!(gaussian.true_value(1), Some(9.0));

        let curve: ModelSpec = serde_json::from_str(
            r#"{
                "kind": "curve",
                "curve": "peaking",
                "parameters": [3, 5, 1],
                "query_points": [4, 5, 6],
                "error_scale": 0.5,
                "noise": {"mode": "absolute", "weights": [1, 1, 0.1]}
            }"#,
        )
        .unwrap();
        assert_eq!(curve.label(), "peaking");
        assert!(curve.validate().is_ok());
        assert_eq!(curve.true_value(1), Some(3.0));
    }

    #[test]
    fn noise_level_only_applies_to_curves() {
        let arms = ModelSpec::Binomial(BinomialArms::new(10, vec![0.5, 0.5]));
        assert!(matches!(
            arms.at_noise_level(0.5),
            Err(SimulationError::InvalidParameter { field: "noise_level", .. })
        ));

        let curve = ModelSpec::Curve(CurveModel::peaking(3.0, 5.0, 1.0, vec![5.0], 0.0));
        let ModelSpec::Curve(scaled) = curve.at_noise_level(0.75).unwrap() else {
            panic!("curve stays a curve");
        };
        assert!((scaled.error_scale - 0.75).abs() < f64::EPSILON);
        assert!(curve.at_noise_level(-1.0).is_err());
    }
}
