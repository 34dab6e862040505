//! Parametric response curves evaluated over a finite set of query points.
//!
//! A trial perturbs the true curve parameters, floors any parameter that
//! drops below [`ParameterFloor`], and scores every query point under the
//! perturbed curve. The true value of a query point is the unperturbed curve
//! evaluated at that point.
use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use super::{GenerativeModel, Observation};
use crate::config::ParameterFloor;
use crate::error::SimulationError;

/// Closed-form response `f(params, x)`.
pub trait ResponseCurve {
    /// Names of the parameters in the order `evaluate` expects them.
    fn parameter_names(&self) -> &'static [&'static str];

    /// Response at query point `x`, or `None` when `params` does not have
    /// exactly `parameter_names().len()` entries.
    fn evaluate(&self, params: &[f64], x: f64) -> Option<f64>;
}

/// Gaussian-shaped dose–response curve peaking at `mid` with value `height`.
///
/// Equivalent to a normal pdf with mean `mid` and deviation `spread`, rescaled
/// so the pdf at `mid` equals `height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeakingCurve;

impl ResponseCurve for PeakingCurve {
    fn parameter_names(&self) -> &'static [&'static str] {
        &["height", "mid", "spread"]
    }

    fn evaluate(&self, params: &[f64], x: f64) -> Option<f64> {
        let &[height, mid, spread] = params else {
            return None;
        };
        let offset = (x - mid) / spread;
        Some(height * (-0.5 * offset * offset).exp())
    }
}

/// Flight distance of a battery-powered drone as a function of battery size.
///
/// `s(b) = (f - g(m + b)) b / ((m + b) a)` with forward force `f`, frame mass
/// `m`, gravity `g` and battery drain rate `a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DroneRange;

impl DroneRange {
    /// Battery size maximizing range in closed form: `-m + sqrt(f m / g)`.
    ///
    /// `None` unless `params` is `(force, mass, gravity, drain)`.
    #[must_use]
    pub fn optimal_battery(params: &[f64]) -> Option<f64> {
        let &[force, mass, gravity, _drain] = params else {
            return None;
        };
        let root = (force * mass / gravity).sqrt();
        Some((-mass + root).max(-mass - root))
    }
}

impl ResponseCurve for DroneRange {
    fn parameter_names(&self) -> &'static [&'static str] {
        &["force", "mass", "gravity", "drain"]
    }

    fn evaluate(&self, params: &[f64], battery: f64) -> Option<f64> {
        let &[force, mass, gravity, drain] = params else {
            return None;
        };
        let loaded = mass + battery;
        Some((force - gravity * loaded) * battery / (loaded * drain))
    }
}

/// Serializable choice of response curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    Peaking,
    Drone,
}

impl CurveKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Peaking => "peaking",
            Self::Drone => "drone",
        }
    }
}

impl ResponseCurve for CurveKind {
    fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            Self::Peaking => PeakingCurve.parameter_names(),
            Self::Drone => DroneRange.parameter_names(),
        }
    }

    fn evaluate(&self, params: &[f64], x: f64) -> Option<f64> {
        match self {
            Self::Peaking => PeakingCurve.evaluate(params, x),
            Self::Drone => DroneRange.evaluate(params, x),
        }
    }
}

/// How the error scale maps to a per-parameter standard deviation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ParameterNoise {
    /// `sd_i = error_scale * weights[i]`
    Absolute { weights: Vec<f64> },
    /// `sd_i = error_scale * |true_i|`
    Relative,
}

impl ParameterNoise {
    fn std_dev(&self, index: usize, true_value: f64, error_scale: f64) -> f64 {
        match self {
            Self::Absolute { weights } => error_scale * weights.get(index).copied().unwrap_or(0.0),
            Self::Relative => error_scale * true_value.abs(),
        }
    }
}

/// Parametric-curve ground truth scored over `query_points`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveModel {
    pub curve: CurveKind,
    pub parameters: Vec<f64>,
    pub query_points: Vec<f64>,
    pub error_scale: f64,
    pub noise: ParameterNoise,
}

impl CurveModel {
    /// Dose–response model with noise weights `[1, 1, 0.1]` on
    /// `(height, mid, spread)`.
    #[must_use]
    pub fn peaking(
        height: f64,
        mid: f64,
        spread: f64,
        doses: Vec<f64>,
        error_scale: f64,
    ) -> Self {
        Self {
            curve: CurveKind::Peaking,
            parameters: vec![height, mid, spread],
            query_points: doses,
            error_scale,
            noise: ParameterNoise::Absolute {
                weights: vec![1.0, 1.0, 0.1],
            },
        }
    }

    /// Drone model with noise proportional to each true parameter.
    #[must_use]
    pub fn drone(
        force: f64,
        mass: f64,
        gravity: f64,
        drain: f64,
        batteries: Vec<f64>,
        error_scale: f64,
    ) -> Self {
        Self {
            curve: CurveKind::Drone,
            parameters: vec![force, mass, gravity, drain],
            query_points: batteries,
            error_scale,
            noise: ParameterNoise::Relative,
        }
    }

    #[must_use]
    pub fn with_error_scale(mut self, error_scale: f64) -> Self {
        self.error_scale = error_scale;
        self
    }

    /// Curve values under `params` at every query point.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::ShapeMismatch`] when `params` does not match
    /// the curve's parameter count.
    pub fn response(&self, params: &[f64]) -> Result<Vec<f64>, SimulationError> {
        self.query_points
            .iter()
            .map(|&x| {
                self.curve.evaluate(params, x).ok_or(SimulationError::ShapeMismatch {
                    what: "curve parameters",
                    expected: self.curve.parameter_names().len(),
                    actual: params.len(),
                })
            })
            .collect()
    }

    /// Draw perturbed parameters, flooring each one.
    ///
    /// Returns the parameters and whether any of them was clamped.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::ShapeMismatch`] when the noise weights do not
    /// match the parameter count.
    pub fn perturb(
        &self,
        rng: &mut dyn RngCore,
        floor: ParameterFloor,
    ) -> Result<(Vec<f64>, bool), SimulationError> {
        if let ParameterNoise::Absolute { weights } = &self.noise {
            SimulationError::check_len("noise weights", self.parameters.len(), weights.len())?;
        }
        let mut clamped = false;
        let estimated = self
            .parameters
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                let sd = self.noise.std_dev(index, value, self.error_scale);
                let z: f64 = StandardNormal.sample(&mut *rng);
                let (floored, hit) = floor.apply(value + sd * z);
                clamped |= hit;
                floored
            })
            .collect();
        Ok((estimated, clamped))
    }
}

impl GenerativeModel for CurveModel {
    fn candidate_count(&self) -> usize {
        self.query_points.len()
    }

    fn validate(&self) -> Result<(), SimulationError> {
        SimulationError::check_len(
            "curve parameters",
            self.curve.parameter_names().len(),
            self.parameters.len(),
        )?;
        if let ParameterNoise::Absolute { weights } = &self.noise {
            SimulationError::check_len("noise weights", self.parameters.len(), weights.len())?;
            if let Some(&weight) = weights.iter().find(|w| !(w.is_finite() && **w >= 0.0)) {
                return Err(SimulationError::invalid(
                    "noise weights",
                    weight,
                    "must be finite and non-negative",
                ));
            }
        }
        if self.query_points.is_empty() {
            return Err(SimulationError::EmptyCandidates);
        }
        if !(self.error_scale.is_finite() && self.error_scale >= 0.0) {
            return Err(SimulationError::invalid(
                "error_scale",
                self.error_scale,
                "must be finite and non-negative",
            ));
        }
        if let Some(&value) = self.parameters.iter().find(|v| !v.is_finite()) {
            return Err(SimulationError::invalid(
                "curve parameters",
                value,
                "must be finite",
            ));
        }
        if let Some(&x) = self.query_points.iter().find(|x| !x.is_finite()) {
            return Err(SimulationError::invalid(
                "query_points",
                x,
                "must be finite",
            ));
        }
        // Only sampled parameters are floored; the true curve must be
        // well defined as given (e.g. spread = 0 or drain = 0 is not).
        if let Some(value) = self.response(&self.parameters)?
            .into_iter()
            .find(|value| !value.is_finite())
        {
            return Err(SimulationError::invalid(
                "true values",
                value,
                "curve must be finite at every query point",
            ));
        }
        Ok(())
    }

    fn true_value(&self, candidate: usize) -> Option<f64> {
        self.query_points
            .get(candidate)
            .and_then(|&x| self.curve.evaluate(&self.parameters, x))
    }

    fn observe(
        &self,
        rng: &mut dyn RngCore,
        floor: ParameterFloor,
    ) -> Result<Observation, SimulationError> {
        let (estimated, clamped) = self.perturb(rng, floor)?;
        Ok(Observation {
            scores: self.response(&estimated)?,
            clamped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numbers::linspace;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn peaking_curve_peaks_at_height() {
        let params = [3.0, 5.0, 1.0];
        assert_eq!(PeakingCurve.evaluate(&params, 5.0), Some(3.0));
        let left = PeakingCurve.evaluate(&params, 4.0).unwrap();
        let right = PeakingCurve.evaluate(&params, 6.0).unwrap();
        assert!((left - right).abs() < 1e-12);
        // One spread away the pdf ratio is exp(-1/2).
        assert!((left - 3.0 * (-0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn drone_optimum_matches_grid_search() {
        let params = [250.0, 1.0, 10.0, 1.0];
        let best = DroneRange::optimal_battery(&params).unwrap();
        assert!((best - 4.0).abs() < 1e-12);
        assert!((DroneRange.evaluate(&params, best).unwrap() - 160.0).abs() < 1e-9);

        let grid = linspace(0.1, 20.0, 200);
        let (arg, _) = grid
            .iter()
            .filter_map(|&b| DroneRange.evaluate(&params, b).map(|s| (b, s)))
            .fold((0.0, f64::NEG_INFINITY), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
        assert!((arg - best).abs() < 0.11);
    }

    #[test]
    fn zero_error_scale_reproduces_truth() {
        let model = CurveModel::peaking(3.0, 5.0, 1.0, linspace(0.0, 10.0, 101), 0.0);
        model.validate().unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let obs = model.observe(&mut rng, ParameterFloor::default()).unwrap();
        assert!(!obs.clamped);
        assert_eq!(obs.scores, model.true_values());
    }

    #[test]
    fn perturbed_parameters_respect_the_floor() {
        let model = CurveModel::peaking(0.02, 0.02, 0.02, vec![0.0, 1.0], 5.0);
        let floor = ParameterFloor(0.01);
        let mut rng = ChaCha20Rng::seed_from_u64(21);
        let mut any_clamped = false;
        for _ in 0..200 {
            let (params, clamped) = model.perturb(&mut rng, floor).unwrap();
            assert!(params.iter().all(|&p| p >= 0.01));
            any_clamped |= clamped;
        }
        assert!(any_clamped);
    }

    #[test]
    fn relative_noise_scales_with_parameter_magnitude() {
        let model = CurveModel::drone(250.0, 1.0, 10.0, 1.0, vec![4.0], 0.0);
        let noise = &model.noise;
        assert!((noise.std_dev(0, 250.0, 0.1) - 25.0).abs() < 1e-12);
        assert!((noise.std_dev(2, -10.0, 0.5) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn validation_catches_shape_problems() {
        let mut model = CurveModel::peaking(3.0, 5.0, 1.0, vec![5.0], 0.5);
        model.parameters.push(1.0);
        assert_eq!(
            model.validate(),
            Err(SimulationError::ShapeMismatch {
                what: "curve parameters",
                expected: 3,
                actual: 4,
            })
        );

        let mut model = CurveModel::peaking(3.0, 5.0, 1.0, vec![5.0], 0.5);
        model.noise = ParameterNoise::Absolute {
            weights: vec![1.0],
        };
        assert!(matches!(
            model.validate(),
            Err(SimulationError::ShapeMismatch { what: "noise weights", .. })
        ));

        let empty = CurveModel::peaking(3.0, 5.0, 1.0, Vec::new(), 0.5);
        assert_eq!(empty.validate(), Err(SimulationError::EmptyCandidates));

        let negative = CurveModel::peaking(3.0, 5.0, 1.0, vec![5.0], -0.5);
        assert!(matches!(
            negative.validate(),
            Err(SimulationError::InvalidParameter { field: "error_scale", .. })
        ));
    }

    #[test]
    fn short_parameter_slices_evaluate_to_none() {
        assert_eq!(DroneRange::optimal_battery(&[1.0]), None);
        assert_eq!(PeakingCurve.evaluate(&[1.0], 0.0), None);
        assert_eq!(DroneRange.evaluate(&[250.0, 1.0, 10.0], 4.0), None);
        let model = CurveModel::peaking(3.0, 5.0, 1.0, vec![5.0], 0.0);
        assert!(matches!(
            model.response(&[3.0, 5.0]),
            Err(SimulationError::ShapeMismatch { what: "curve parameters", .. })
        ));
    }

    #[test]
    fn degenerate_true_curves_are_rejected() {
        // Zero spread gives 0/0 at the midpoint.
        let flat = CurveModel::peaking(3.0, 5.0, 0.0, vec![4.0, 5.0, 6.0], 0.5);
        assert!(matches!(
            flat.validate(),
            Err(SimulationError::InvalidParameter { field: "true values", .. })
        ));

        let no_drain = CurveModel::drone(250.0, 1.0, 10.0, 0.0, vec![2.0, 4.0], 0.1);
        assert!(matches!(
            no_drain.validate(),
            Err(SimulationError::InvalidParameter { field: "true values", .. })
        ));

        let weightless = CurveModel::drone(250.0, -1.0, 10.0, 1.0, vec![1.0], 0.1);
        assert!(matches!(
            weightless.validate(),
            Err(SimulationError::InvalidParameter { field: "true values", .. })
        ));
    }
}
