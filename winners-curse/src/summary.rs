//! Verdict proportions, bias statistics and noise sweeps with confidence bounds.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{ConfidenceConfig, ConfidenceMethod, SimulationConfig};
use crate::error::SimulationError;
use crate::experiment::Experiment;
use crate::model::{GenerativeModel, ModelSpec};
use crate::numbers::{count_to_f64, fraction};
use crate::trial::{TrialOutcome, Verdict};

/// Aggregate view of an outcome sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub trials: usize,
    pub underestimated: usize,
    pub accurate: usize,
    pub overestimated: usize,
    pub under_fraction: f64,
    pub accurate_fraction: f64,
    pub over_fraction: f64,
    /// Trials in which a sampled parameter was floored.
    pub clamped: usize,
    pub mean_predicted: f64,
    pub mean_truth: f64,
    /// Mean of `predicted - truth` over all trials.
    pub mean_bias: f64,
    pub bias_std_dev: f64,
    /// How often each candidate index was selected.
    pub selection_counts: BTreeMap<usize, usize>,
}

impl Summary {
    #[must_use]
    pub const fn count(&self, verdict: Verdict) -> usize {
        match verdict {
            Verdict::Underestimated => self.underestimated,
            Verdict::Accurate => self.accurate,
            Verdict::Overestimated => self.overestimated,
        }
    }

    #[must_use]
    pub const fn fraction(&self, verdict: Verdict) -> f64 {
        match verdict {
            Verdict::Underestimated => self.under_fraction,
            Verdict::Accurate => self.accurate_fraction,
            Verdict::Overestimated => self.over_fraction,
        }
    }

    /// Share of trials that selected `candidate`.
    #[must_use]
    pub fn selection_share(&self, candidate: usize) -> f64 {
        let count = self.selection_counts.get(&candidate).copied().unwrap_or(0);
        fraction(count, self.trials)
    }

    /// Interval around the overestimation rate.
    #[must_use]
    pub fn over_interval(&self, confidence: &ConfidenceConfig) -> ProportionInterval {
        proportion_interval(self.overestimated, self.trials, confidence)
    }
}

/// Verdict proportions and bias statistics for `outcomes`.
///
/// # Errors
///
/// Returns [`SimulationError::EmptyOutcomes`] when `outcomes` is empty.
pub fn summarize(outcomes: &[TrialOutcome]) -> Result<Summary, SimulationError> {
    if outcomes.is_empty() {
        return Err(SimulationError::EmptyOutcomes);
    }
    let mut counts = [0usize; 3];
    let mut clamped = 0usize;
    let mut predicted = RunningStats::default();
    let mut truth = RunningStats::default();
    let mut bias = RunningStats::default();
    let mut selection_counts = BTreeMap::new();
    for outcome in outcomes {
        let slot = match outcome.verdict {
            Verdict::Underestimated => 0,
            Verdict::Accurate => 1,
            Verdict::Overestimated => 2,
        };
        counts[slot] += 1;
        if outcome.clamped {
            clamped += 1;
        }
        predicted.add(outcome.predicted);
        truth.add(outcome.truth);
        bias.add(outcome.bias());
        *selection_counts.entry(outcome.selected).or_insert(0) += 1;
    }
    let trials = outcomes.len();
    Ok(Summary {
        trials,
        underestimated: counts[0],
        accurate: counts[1],
        overestimated: counts[2],
        under_fraction: fraction(counts[0], trials),
        accurate_fraction: fraction(counts[1], trials),
        over_fraction: fraction(counts[2], trials),
        clamped,
        mean_predicted: predicted.mean(),
        mean_truth: truth.mean(),
        mean_bias: bias.mean(),
        bias_std_dev: bias.std_dev(),
        selection_counts,
    })
}

/// Welford accumulator for mean and sample variance.
#[derive(Debug, Default, Clone)]
struct RunningStats {
    count: usize,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / count_to_f64(self.count);
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    const fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    fn variance(&self) -> f64 {
        if self.count > 1 {
            self.m2 / count_to_f64(self.count - 1)
        } else {
            0.0
        }
    }

    fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Two-sided interval around a Bernoulli proportion, clamped into `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProportionInterval {
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
}

impl ProportionInterval {
    #[must_use]
    pub fn half_width(&self) -> f64 {
        (self.upper - self.lower) / 2.0
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        (self.lower..=self.upper).contains(&value)
    }
}

/// Confidence interval for `successes` out of `trials` Bernoulli draws.
///
/// With zero trials the interval is the uninformative `[0, 1]` around `0.5`.
/// The bounds always bracket the point estimate.
#[must_use]
pub fn proportion_interval(
    successes: usize,
    trials: usize,
    confidence: &ConfidenceConfig,
) -> ProportionInterval {
    if trials == 0 {
        return ProportionInterval {
            estimate: 0.5,
            lower: 0.0,
            upper: 1.0,
        };
    }
    let n = count_to_f64(trials);
    let p_hat = fraction(successes.min(trials), trials);
    let z = if confidence.z.is_finite() && confidence.z > 0.0 {
        confidence.z
    } else {
        crate::config::DEFAULT_Z
    };

    let (lo, hi) = match confidence.method {
        ConfidenceMethod::Wald => {
            let rad = z * (p_hat * (1.0 - p_hat) / n).sqrt();
            (p_hat - rad, p_hat + rad)
        }
        ConfidenceMethod::Wilson => {
            // center = (p + z^2/(2n)) / (1 + z^2/n)
            // radius = z * sqrt(p(1-p)/n + z^2/(4n^2)) / (1 + z^2/n)
            let z2 = z * z;
            let denom = 1.0 + z2 / n;
            let center = (p_hat + z2 / (2.0 * n)) / denom;
            let rad = (z * ((p_hat * (1.0 - p_hat) / n) + (z2 / (4.0 * n * n))).sqrt()) / denom;
            (center - rad, center + rad)
        }
    };
    ProportionInterval {
        estimate: p_hat,
        lower: lo.clamp(0.0, 1.0).min(p_hat),
        upper: hi.clamp(0.0, 1.0).max(p_hat),
    }
}

/// One row of a noise sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub noise_level: f64,
    pub over_fraction: f64,
    pub lower: f64,
    pub upper: f64,
    pub summary: Summary,
}

/// Run an experiment at every noise level and bound its overestimation rate.
///
/// `build` produces the model for a given noise level. Each level draws from
/// its own generator stream derived from `config.seed` and the level value,
/// so adding, removing or reordering levels leaves the other rows unchanged.
///
/// # Errors
///
/// Returns [`SimulationError::EmptyNoiseLevels`] for an empty level list,
/// [`SimulationError::InvalidParameter`] for a non-finite level, and any
/// configuration, model or trial error.
pub fn sweep<M, F>(
    mut build: F,
    noise_levels: &[f64],
    config: &SimulationConfig,
) -> Result<Vec<SweepPoint>, SimulationError>
where
    M: GenerativeModel,
    F: FnMut(f64) -> Result<M, SimulationError>,
{
    if noise_levels.is_empty() {
        return Err(SimulationError::EmptyNoiseLevels);
    }
    config.validate()?;
    if let Some(&level) = noise_levels.iter().find(|level| !level.is_finite()) {
        return Err(SimulationError::invalid(
            "noise_level",
            level,
            "must be finite",
        ));
    }

    let mut points = Vec::with_capacity(noise_levels.len());
    for &level in noise_levels {
        let model = build(level)?;
        let stream = sweep_stream_tag(level);
        let mut experiment = Experiment::with_stream(model, *config, &stream)?;
        let summary = experiment.run()?.summarize()?;
        let interval = summary.over_interval(&config.confidence);
        log::info!(
            "noise level {level:.4}: over {:.4} [{:.4}, {:.4}]",
            interval.estimate,
            interval.lower,
            interval.upper
        );
        points.push(SweepPoint {
            noise_level: level,
            over_fraction: summary.over_fraction,
            lower: interval.lower,
            upper: interval.upper,
            summary,
        });
    }
    Ok(points)
}

/// [`sweep`] over the error scale of a serializable model.
///
/// # Errors
///
/// Returns the errors of [`sweep`] and of [`ModelSpec::at_noise_level`].
pub fn sweep_spec(
    model: &ModelSpec,
    noise_levels: &[f64],
    config: &SimulationConfig,
) -> Result<Vec<SweepPoint>, SimulationError> {
    sweep(|level| model.at_noise_level(level), noise_levels, config)
}

fn sweep_stream_tag(level: f64) -> Vec<u8> {
    let mut tag = b"sweep:".to_vec();
    tag.extend_from_slice(&level.to_bits().to_le_bytes());
    tag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BinomialArms, CurveModel};
    use crate::numbers::linspace;

    fn outcome(verdict: Verdict, selected: usize, predicted: f64, truth: f64) -> TrialOutcome {
        TrialOutcome {
            verdict,
            selected,
            predicted,
            truth,
            clamped: false,
        }
    }

    #[test]
    fn summarize_counts_and_fractions() {
        let outcomes = vec![
            outcome(Verdict::Overestimated, 0, 0.7, 0.5),
            outcome(Verdict::Overestimated, 1, 0.6, 0.5),
            outcome(Verdict::Underestimated, 1, 0.4, 0.5),
            outcome(Verdict::Accurate, 0, 0.5, 0.5),
        ];
        let summary = summarize(&outcomes).unwrap();
        assert_eq!(summary.trials, 4);
        assert_eq!(summary.count(Verdict::Overestimated), 2);
        assert!((summary.over_fraction - 0.5).abs() < f64::EPSILON);
        assert!((summary.fraction(Verdict::Accurate) - 0.25).abs() < f64::EPSILON);
        let total = summary.under_fraction + summary.accurate_fraction + summary.over_fraction;
        assert!((total - 1.0).abs() < 1e-9);
        assert!((summary.mean_bias - 0.05).abs() < 1e-12);
        assert!((summary.mean_truth - 0.5).abs() < 1e-12);
        assert_eq!(summary.selection_counts.get(&1), Some(&2));
        assert!((summary.selection_share(0) - 0.5).abs() < f64::EPSILON);
        assert!((summary.selection_share(7) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn summarize_rejects_empty() {
        assert_eq!(summarize(&[]), Err(SimulationError::EmptyOutcomes));
    }

    #[test]
    fn running_stats_matches_closed_form() {
        let mut stats = RunningStats::default();
        for value in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.add(value);
        }
        assert!((stats.mean() - 5.0).abs() < 1e-12);
        assert!((stats.variance() - 32.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn wald_interval_matches_normal_approximation() {
        let interval = proportion_interval(5_000, 10_000, &ConfidenceConfig::default());
        assert!((interval.estimate - 0.5).abs() < f64::EPSILON);
        assert!((interval.half_width() - 1.96 * 0.005).abs() < 1e-9);
    }

    #[test]
    fn intervals_bracket_the_estimate_at_the_edges() {
        for method in [ConfidenceMethod::Wald, ConfidenceMethod::Wilson] {
            let confidence = ConfidenceConfig { method, z: 1.96 };
            for (k, n) in [(0, 100), (100, 100), (1, 3), (37, 1000)] {
                let interval = proportion_interval(k, n, &confidence);
                assert!(interval.lower <= interval.estimate, "{method:?} {k}/{n}");
                assert!(interval.estimate <= interval.upper, "{method:?} {k}/{n}");
                assert!((0.0..=1.0).contains(&interval.lower));
                assert!((0.0..=1.0).contains(&interval.upper));
            }
        }
    }

    #[test]
    fn wilson_is_wider_than_zero_at_the_boundary() {
        let confidence = ConfidenceConfig {
            method: ConfidenceMethod::Wilson,
            z: 1.96,
        };
        let interval = proportion_interval(0, 50, &confidence);
        assert!(interval.upper > 0.0);
        assert!(interval.contains(0.0));
    }

    #[test]
    fn zero_trials_is_uninformative() {
        let interval = proportion_interval(0, 0, &ConfidenceConfig::default());
        assert_eq!((interval.lower, interval.upper), (0.0, 1.0));
    }

    #[test]
    fn sweep_validates_inputs() {
        let config = SimulationConfig::default().with_iterations(10);
        let build = |_level: f64| -> Result<BinomialArms, SimulationError> {
            Ok(BinomialArms::new(10, vec![0.5, 0.5]))
        };
        assert_eq!(
            sweep(build, &[], &config),
            Err(SimulationError::EmptyNoiseLevels)
        );
        assert!(matches!(
            sweep(build, &[f64::NAN], &config),
            Err(SimulationError::InvalidParameter { field: "noise_level", .. })
        ));
        assert_eq!(
            sweep(build, &[0.1], &config.with_iterations(0)),
            Err(SimulationError::InvalidIterationCount(0))
        );
    }

    #[test]
    fn sweep_rows_do_not_depend_on_their_neighbours() {
        let model = ModelSpec::Curve(CurveModel::peaking(
            3.0,
            5.0,
            1.0,
            linspace(0.0, 10.0, 101),
            0.1,
        ));
        let config = SimulationConfig::default().with_iterations(300);
        let both = sweep_spec(&model, &[0.2, 0.6], &config).unwrap();
        let alone = sweep_spec(&model, &[0.6], &config).unwrap();
        assert_eq!(both[1], alone[0]);
        for point in &both {
            assert!(point.lower <= point.over_fraction && point.over_fraction <= point.upper);
        }
    }
}
