//! Single simulated trial: observe, select, compare against the truth.
use std::cmp::Ordering;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::ParameterFloor;
use crate::error::SimulationError;
use crate::model::GenerativeModel;
use crate::selector::select_best;

/// How the predicted value of the selected candidate compares with its truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Predicted value below the true value
    Underestimated,
    /// Predicted value exactly equal to the true value
    Accurate,
    /// Predicted value above the true value
    Overestimated,
}

impl Verdict {
    /// Classify `predicted` against `truth`.
    ///
    /// Exact equality is its own verdict. It is routinely reached by binomial
    /// arms (shared denominator) and by any model at zero noise. Returns
    /// `None` when either side is NaN.
    #[must_use]
    pub fn classify(predicted: f64, truth: f64) -> Option<Self> {
        Some(match predicted.partial_cmp(&truth)? {
            Ordering::Less => Self::Underestimated,
            Ordering::Equal => Self::Accurate,
            Ordering::Greater => Self::Overestimated,
        })
    }

    /// Signed code used by tabular exports: -1, 0 or 1.
    #[must_use]
    pub const fn code(self) -> i8 {
        match self {
            Self::Underestimated => -1,
            Self::Accurate => 0,
            Self::Overestimated => 1,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Underestimated => write!(f, "underestimated"),
            Self::Accurate => write!(f, "accurate"),
            Self::Overestimated => write!(f, "overestimated"),
        }
    }
}

/// Result of one simulated trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub verdict: Verdict,
    /// Index of the candidate the selector picked.
    pub selected: usize,
    /// Observed value at the selected candidate.
    pub predicted: f64,
    /// True value at the same candidate.
    pub truth: f64,
    /// Whether a sampled parameter was floored during this trial.
    pub clamped: bool,
}

impl TrialOutcome {
    /// `predicted - truth`; positive when the trial overestimated.
    #[must_use]
    pub fn bias(&self) -> f64 {
        self.predicted - self.truth
    }
}

/// Run one trial against `model`.
///
/// The true value is read at the candidate the noisy observation selected;
/// the truth is never re-optimized.
///
/// # Errors
///
/// Returns the model's validation error before any draw is made, or a
/// selector error when the observation contains NaN scores.
pub fn run_trial<M>(
    model: &M,
    rng: &mut dyn RngCore,
    floor: ParameterFloor,
) -> Result<TrialOutcome, SimulationError>
where
    M: GenerativeModel + ?Sized,
{
    model.validate()?;
    evaluate_trial(model, rng, floor)
}

/// Trial body without validation, for callers that validated once up front.
pub(crate) fn evaluate_trial<M>(
    model: &M,
    rng: &mut dyn RngCore,
    floor: ParameterFloor,
) -> Result<TrialOutcome, SimulationError>
where
    M: GenerativeModel + ?Sized,
{
    let observation = model.observe(rng, floor)?;
    SimulationError::check_len(
        "observation",
        model.candidate_count(),
        observation.scores.len(),
    )?;
    let selected = select_best(&observation.scores, &mut *rng)?;
    let predicted = observation.scores[selected];
    let truth = model
        .true_value(selected)
        .ok_or(SimulationError::EmptyCandidates)?;
    if !truth.is_finite() {
        return Err(SimulationError::NonFiniteTruth { index: selected });
    }
    let verdict = Verdict::classify(predicted, truth)
        .ok_or(SimulationError::NonFiniteScore { index: selected })?;
    Ok(TrialOutcome {
        verdict,
        selected,
        predicted,
        truth,
        clamped: observation.clamped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BinomialArms, CurveModel, GaussianArms, Observation};
    use crate::numbers::linspace;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    /// Fixed observation so the comparison logic can be checked directly.
    struct Scripted {
        truth: Vec<f64>,
        observed: Vec<f64>,
    }

    impl GenerativeModel for Scripted {
        fn candidate_count(&self) -> usize {
            self.truth.len()
        }

        fn validate(&self) -> Result<(), SimulationError> {
            SimulationError::check_len("observed", self.truth.len(), self.observed.len())
        }

        fn true_value(&self, candidate: usize) -> Option<f64> {
            self.truth.get(candidate).copied()
        }

        fn observe(
            &self,
            _rng: &mut dyn RngCore,
            _floor: ParameterFloor,
        ) -> Result<Observation, SimulationError> {
            Ok(Observation {
                scores: self.observed.clone(),
                clamped: false,
            })
        }
    }

    #[test]
    fn classify_covers_all_three_verdicts() {
        assert_eq!(Verdict::classify(0.4, 0.5), Some(Verdict::Underestimated));
        assert_eq!(Verdict::classify(0.5, 0.5), Some(Verdict::Accurate));
        assert_eq!(Verdict::classify(0.6, 0.5), Some(Verdict::Overestimated));
        assert_eq!(Verdict::classify(0.5, f64::NAN), None);
        assert_eq!(Verdict::classify(f64::NAN, 0.5), None);
        assert_eq!(Verdict::Underestimated.code(), -1);
        assert_eq!(Verdict::Overestimated.to_string(), "overestimated");
    }

    #[test]
    fn truth_is_read_at_the_selected_candidate() {
        // Candidate 1 looks best but is truly worse than candidate 0.
        let model = Scripted {
            truth: vec![0.9, 0.2],
            observed: vec![0.5, 0.6],
        };
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let outcome = run_trial(&model, &mut rng, ParameterFloor::default()).unwrap();
        assert_eq!(outcome.selected, 1);
        assert!((outcome.truth - 0.2).abs() < f64::EPSILON);
        assert_eq!(outcome.verdict, Verdict::Overestimated);
        assert!((outcome.bias() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn nan_truth_at_the_selected_candidate_is_an_error() {
        let model = Scripted {
            truth: vec![f64::NAN, 0.2],
            observed: vec![0.9, 0.1],
        };
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let err = run_trial(&model, &mut rng, ParameterFloor::default()).unwrap_err();
        assert_eq!(err, SimulationError::NonFiniteTruth { index: 0 });
    }

    #[test]
    fn infinite_truth_is_an_error() {
        let model = Scripted {
            truth: vec![0.1, f64::INFINITY],
            observed: vec![0.1, 0.9],
        };
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let err = run_trial(&model, &mut rng, ParameterFloor::default()).unwrap_err();
        assert_eq!(err, SimulationError::NonFiniteTruth { index: 1 });
    }

    #[test]
    fn shape_mismatch_fails_before_sampling() {
        let model = GaussianArms::new(vec![10.0, 10.0, 10.0], vec![2.0, 2.0], 10);
        let mut rng = ChaCha20Rng::seed_from_u64(31);
        let mut twin = rng.clone();
        let err = run_trial(&model, &mut rng, ParameterFloor::default()).unwrap_err();
        assert!(matches!(err, SimulationError::ShapeMismatch { .. }));
        assert_eq!(rng.next_u64(), twin.next_u64());
    }

    #[test]
    fn binomial_trials_reach_accurate() {
        let model = BinomialArms::new(2, vec![0.5, 0.5]);
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let accurate = (0..200)
            .map(|_| run_trial(&model, &mut rng, ParameterFloor::default()).unwrap())
            .filter(|outcome| outcome.verdict == Verdict::Accurate)
            .count();
        assert!(accurate > 0);
    }

    #[test]
    fn noiseless_peaking_curve_selects_the_true_optimum() {
        let model = CurveModel::peaking(3.0, 5.0, 1.0, linspace(0.0, 10.0, 101), 0.0);
        let mut rng = ChaCha20Rng::seed_from_u64(12);
        let outcome = run_trial(&model, &mut rng, ParameterFloor::default()).unwrap();
        assert_eq!(outcome.selected, 50);
        assert_eq!(outcome.verdict, Verdict::Accurate);
        assert!((outcome.predicted - 3.0).abs() < f64::EPSILON);
    }
}
