use anyhow::{Context, Result};
use serde::Serialize;
use std::time::{Duration, Instant};

use winners_curse::{
    ModelSpec, ProportionInterval, SimulationConfig, Summary, SweepPoint, run_experiment,
    sweep_spec,
};

use crate::presets::ExperimentSpec;

/// Everything the reports need about one finished experiment.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    pub name: String,
    pub description: String,
    pub model: ModelSpec,
    pub config: SimulationConfig,
    pub outcome: ExperimentOutcome,
    #[serde(skip)]
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExperimentOutcome {
    Single {
        summary: Summary,
        over_interval: ProportionInterval,
    },
    Sweep {
        points: Vec<SweepPoint>,
    },
}

pub fn run_spec(spec: &ExperimentSpec) -> Result<ExperimentReport> {
    let start = Instant::now();
    log::debug!("running experiment {}", spec.name);
    let outcome = match &spec.sweep {
        Some(levels) => {
            let points = sweep_spec(&spec.model, levels, &spec.config)
                .with_context(|| format!("sweep {} failed", spec.name))?;
            ExperimentOutcome::Sweep { points }
        }
        None => {
            let summary = run_experiment(&spec.model, &spec.config)
                .and_then(|outcomes| outcomes.summarize())
                .with_context(|| format!("experiment {} failed", spec.name))?;
            let over_interval = summary.over_interval(&spec.config.confidence);
            ExperimentOutcome::Single {
                summary,
                over_interval,
            }
        }
    };
    Ok(ExperimentReport {
        name: spec.name.clone(),
        description: spec.description.clone(),
        model: spec.model.clone(),
        config: spec.config,
        outcome,
        duration: start.elapsed(),
    })
}
