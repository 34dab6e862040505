//! Repeated trials over one model with an explicit, seeded generator.
use hmac::{Hmac, Mac};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::{ParameterFloor, SimulationConfig};
use crate::error::SimulationError;
use crate::model::GenerativeModel;
use crate::summary::{Summary, summarize};
use crate::trial::{TrialOutcome, Verdict, evaluate_trial};

/// Trial outcomes in the order they were simulated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutcomeSequence {
    outcomes: Vec<TrialOutcome>,
}

impl OutcomeSequence {
    #[must_use]
    pub const fn new(outcomes: Vec<TrialOutcome>) -> Self {
        Self { outcomes }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[TrialOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<TrialOutcome> {
        self.outcomes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrialOutcome> {
        self.outcomes.iter()
    }

    /// Verdicts in trial order.
    pub fn verdicts(&self) -> impl Iterator<Item = Verdict> + '_ {
        self.outcomes.iter().map(|outcome| outcome.verdict)
    }

    /// Selected candidate indices in trial order.
    pub fn selections(&self) -> impl Iterator<Item = usize> + '_ {
        self.outcomes.iter().map(|outcome| outcome.selected)
    }

    /// Predicted values at the selected candidates in trial order.
    pub fn predicted_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.outcomes.iter().map(|outcome| outcome.predicted)
    }

    /// Proportions of each verdict.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::EmptyOutcomes`] for an empty sequence.
    pub fn summarize(&self) -> Result<Summary, SimulationError> {
        summarize(&self.outcomes)
    }
}

impl<'a> IntoIterator for &'a OutcomeSequence {
    type Item = &'a TrialOutcome;
    type IntoIter = std::slice::Iter<'a, TrialOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.iter()
    }
}

impl FromIterator<TrialOutcome> for OutcomeSequence {
    fn from_iter<I: IntoIterator<Item = TrialOutcome>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Run `iterations` independent trials drawing from `rng`.
///
/// The model is validated once before the first draw.
///
/// # Errors
///
/// Returns [`SimulationError::InvalidIterationCount`] for zero iterations, the
/// model's validation error, or any trial error.
pub fn run_trials<M>(
    model: &M,
    rng: &mut dyn RngCore,
    floor: ParameterFloor,
    iterations: usize,
) -> Result<OutcomeSequence, SimulationError>
where
    M: GenerativeModel + ?Sized,
{
    if iterations == 0 {
        return Err(SimulationError::InvalidIterationCount(iterations));
    }
    model.validate()?;
    let mut outcomes = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        outcomes.push(evaluate_trial(model, rng, floor)?);
    }
    let clamped = outcomes.iter().filter(|outcome| outcome.clamped).count();
    if clamped * 10 >= iterations {
        log::warn!("{clamped} of {iterations} trials floored a sampled parameter");
    } else if clamped > 0 {
        log::debug!("{clamped} of {iterations} trials floored a sampled parameter");
    }
    Ok(OutcomeSequence::new(outcomes))
}

/// Run a full experiment with a generator seeded from `config.seed`.
///
/// Identical model, configuration and seed always produce the same sequence.
///
/// # Errors
///
/// Returns configuration, validation or trial errors.
pub fn run_experiment<M>(
    model: &M,
    config: &SimulationConfig,
) -> Result<OutcomeSequence, SimulationError>
where
    M: GenerativeModel + ?Sized,
{
    config.validate()?;
    let mut rng = ChaCha20Rng::seed_from_u64(config.seed);
    log::debug!(
        "running {} trials over {} candidates (seed {})",
        config.iterations,
        model.candidate_count(),
        config.seed
    );
    run_trials(model, &mut rng, config.parameter_floor, config.iterations)
}

/// A model paired with the generator that drives it.
///
/// Successive calls to [`Experiment::run`] continue the same random stream,
/// so batches can be drawn incrementally without repeating trials.
#[derive(Debug, Clone)]
pub struct Experiment<M> {
    model: M,
    config: SimulationConfig,
    rng: ChaCha20Rng,
}

impl<M: GenerativeModel> Experiment<M> {
    /// Validate `model` and `config` and seed the generator from `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns configuration or model validation errors.
    pub fn new(model: M, config: SimulationConfig) -> Result<Self, SimulationError> {
        Self::with_rng_seed(model, config, config.seed)
    }

    /// Like [`Experiment::new`] but seeded from an independent stream derived
    /// from `config.seed` and `stream`.
    ///
    /// # Errors
    ///
    /// Returns configuration or model validation errors.
    pub fn with_stream(
        model: M,
        config: SimulationConfig,
        stream: &[u8],
    ) -> Result<Self, SimulationError> {
        Self::with_rng_seed(model, config, derive_stream_seed(config.seed, stream))
    }

    fn with_rng_seed(
        model: M,
        config: SimulationConfig,
        rng_seed: u64,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        model.validate()?;
        Ok(Self {
            model,
            config,
            rng: ChaCha20Rng::seed_from_u64(rng_seed),
        })
    }

    #[must_use]
    pub const fn model(&self) -> &M {
        &self.model
    }

    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run `config.iterations` trials.
    ///
    /// # Errors
    ///
    /// Returns any trial error.
    pub fn run(&mut self) -> Result<OutcomeSequence, SimulationError> {
        self.run_batch(self.config.iterations)
    }

    /// Run `iterations` trials, continuing the generator stream.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidIterationCount`] for zero iterations,
    /// or any trial error.
    pub fn run_batch(&mut self, iterations: usize) -> Result<OutcomeSequence, SimulationError> {
        run_trials(
            &self.model,
            &mut self.rng,
            self.config.parameter_floor,
            iterations,
        )
    }

    /// Run one trial, continuing the generator stream.
    ///
    /// # Errors
    ///
    /// Returns any trial error.
    pub fn step(&mut self) -> Result<TrialOutcome, SimulationError> {
        evaluate_trial(&self.model, &mut self.rng, self.config.parameter_floor)
    }
}

/// Derive an independent generator seed for a named stream.
///
/// HMAC-SHA256 keyed by the user seed over `domain_tag`, truncated to 64 bits.
#[must_use]
pub fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
