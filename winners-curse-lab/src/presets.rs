//! Named experiment catalog and JSON experiment files.
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

use winners_curse::{
    BinomialArms, CurveKind, CurveModel, GaussianArms, ModelSpec, ParameterNoise,
    SimulationConfig, linspace,
};

use crate::util::format_list;

/// One runnable experiment: a model, its configuration and optional noise sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub model: ModelSpec,
    #[serde(default)]
    pub config: SimulationConfig,
    /// Error-scale levels to sweep; curve models only.
    #[serde(default)]
    pub sweep: Option<Vec<f64>>,
}

impl ExperimentSpec {
    fn new(name: impl Into<String>, model: ModelSpec) -> Self {
        let description = describe_model(&model);
        Self {
            name: name.into(),
            description,
            model,
            config: SimulationConfig::default(),
            sweep: None,
        }
    }

    fn with_sweep(mut self, levels: Vec<f64>) -> Self {
        self.sweep = Some(levels);
        self
    }

    /// Apply command-line overrides on top of the spec's own configuration.
    #[must_use]
    pub fn with_overrides(mut self, seed: Option<u64>, iterations: Option<usize>) -> Self {
        if let Some(seed) = seed {
            self.config.seed = seed;
        }
        if let Some(iterations) = iterations {
            self.config.iterations = iterations;
        }
        self
    }
}

const BINOMIAL_CASES: &[(u64, &[f64])] = &[
    (10, &[0.5, 0.5]),
    (100, &[0.5, 0.5]),
    (10, &[0.6, 0.7]),
    (100, &[0.6, 0.7]),
    (10, &[0.1, 0.9]),
    (100, &[0.1, 0.9]),
    (10, &[0.5, 0.5, 0.5]),
    (100, &[0.5, 0.5, 0.5]),
    (20, &[0.5, 0.6, 0.7]),
    (10, &[0.1, 0.1, 0.5]),
    (10, &[0.0, 0.0, 0.5]),
];

const GAUSSIAN_CASES: &[(usize, [f64; 2], [f64; 2])] = &[
    (10, [10.0, 10.0], [2.0, 2.0]),
    (100, [10.0, 10.0], [2.0, 2.0]),
    (10, [10.0, 9.0], [2.0, 2.0]),
    (100, [10.0, 9.0], [2.0, 2.0]),
    (10, [10.0, 10.0], [4.0, 4.0]),
    (100, [10.0, 10.0], [4.0, 4.0]),
    (10, [10.0, 9.0], [4.0, 4.0]),
    (100, [10.0, 9.0], [4.0, 4.0]),
    (10, [50.0, 20.0], [2.0, 2.0]),
    (100, [50.0, 20.0], [2.0, 2.0]),
];

/// Dose grid `0, 0.1, ..., 10`.
pub fn dose_grid() -> Vec<f64> {
    linspace(0.0, 10.0, 101)
}

/// Battery grid `0.1, 0.2, ..., 20`.
pub fn battery_grid() -> Vec<f64> {
    linspace(0.1, 20.0, 200)
}

pub fn catalog() -> Vec<ExperimentSpec> {
    let mut experiments = Vec::new();

    for &(trials, probabilities) in BINOMIAL_CASES {
        let name = format!("binomial-n{trials}-p{}", percent_tag(probabilities));
        let model = ModelSpec::Binomial(BinomialArms::new(trials, probabilities.to_vec()));
        experiments.push(ExperimentSpec::new(name, model));
    }

    for &(samples, means, std_devs) in GAUSSIAN_CASES {
        let name = format!(
            "gaussian-n{samples}-m{}-sd{}",
            integer_tag(&means),
            integer_tag(&std_devs)
        );
        let model = ModelSpec::Gaussian(GaussianArms::new(
            means.to_vec(),
            std_devs.to_vec(),
            samples,
        ));
        experiments.push(ExperimentSpec::new(name, model));
    }

    experiments.push(ExperimentSpec::new(
        "peaking-noiseless",
        ModelSpec::Curve(CurveModel::peaking(3.0, 5.0, 1.0, dose_grid(), 0.0)),
    ));
    experiments.push(ExperimentSpec::new(
        "peaking-single",
        ModelSpec::Curve(CurveModel::peaking(3.0, 5.0, 1.0, dose_grid(), 0.5)),
    ));
    experiments.push(
        ExperimentSpec::new(
            "peaking-sweep",
            ModelSpec::Curve(CurveModel::peaking(3.0, 5.0, 1.0, dose_grid(), 0.0)),
        )
        .with_sweep(linspace(0.01, 1.0, 11)),
    );
    experiments.push(ExperimentSpec::new(
        "drone-single",
        ModelSpec::Curve(CurveModel::drone(
            250.0,
            1.0,
            10.0,
            1.0,
            battery_grid(),
            0.5,
        )),
    ));
    experiments.push(
        ExperimentSpec::new(
            "drone-sweep",
            ModelSpec::Curve(CurveModel::drone(
                250.0,
                1.0,
                10.0,
                1.0,
                battery_grid(),
                0.0,
            )),
        )
        .with_sweep(linspace(0.01, 2.0, 51)),
    );

    experiments
}

pub fn list_experiments() -> Vec<(String, String)> {
    catalog()
        .into_iter()
        .map(|spec| {
            let summary = match &spec.sweep {
                Some(levels) => format!("{} (sweep over {} levels)", spec.description, levels.len()),
                None => spec.description,
            };
            (spec.name, summary)
        })
        .collect()
}

pub fn find_experiment(name: &str) -> Option<ExperimentSpec> {
    catalog().into_iter().find(|spec| spec.name == name)
}

/// Resolve preset names, expanding the `all` keyword.
///
/// Unknown names are returned separately so the caller can report them.
pub fn expand_experiments(names: &[String]) -> (Vec<ExperimentSpec>, Vec<String>) {
    let mut resolved = Vec::new();
    let mut unknown = Vec::new();
    for name in names {
        if name == "all" {
            resolved.extend(catalog());
        } else if let Some(spec) = find_experiment(name) {
            resolved.push(spec);
        } else {
            unknown.push(name.clone());
        }
    }
    (resolved, unknown)
}

/// Load experiments from a JSON file holding one spec or an array of specs.
pub fn load_experiments(path: &Path) -> Result<Vec<ExperimentSpec>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_experiments(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse_experiments(raw: &str) -> Result<Vec<ExperimentSpec>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Box<ExperimentSpec>),
        Many(Vec<ExperimentSpec>),
    }

    let mut specs = match serde_json::from_str::<OneOrMany>(raw)? {
        OneOrMany::One(spec) => vec![*spec],
        OneOrMany::Many(specs) => specs,
    };
    if specs.is_empty() {
        bail!("experiment file contains no experiments");
    }
    for spec in &mut specs {
        if spec.description.is_empty() {
            spec.description = describe_model(&spec.model);
        }
    }
    Ok(specs)
}

/// Human-readable parameter line for a model.
pub fn describe_model(model: &ModelSpec) -> String {
    match model {
        ModelSpec::Binomial(arms) => format!(
            "binomial n = {}, probability vector = {}",
            arms.trials,
            format_list(&arms.probabilities)
        ),
        ModelSpec::Gaussian(arms) => format!(
            "gaussian n = {}, mean vector = {}, deviation vector = {}",
            arms.samples_per_arm,
            format_list(&arms.means),
            format_list(&arms.std_devs)
        ),
        ModelSpec::Curve(curve) => {
            let noise = match &curve.noise {
                ParameterNoise::Absolute { weights } => format!("weights {}", format_list(weights)),
                ParameterNoise::Relative => "relative".to_string(),
            };
            let grid = match (curve.query_points.first(), curve.query_points.last()) {
                (Some(first), Some(last)) => {
                    format!("{} points in [{first}, {last}]", curve.query_points.len())
                }
                _ => "no points".to_string(),
            };
            let kind = match curve.curve {
                CurveKind::Peaking => "peaking dose-response",
                CurveKind::Drone => "drone range",
            };
            format!(
                "{kind} params = {}, {grid}, error scale = {} ({noise})",
                format_list(&curve.parameters),
                curve.error_scale
            )
        }
    }
}

fn percent_tag(values: &[f64]) -> String {
    let parts: Vec<String> = values
        .iter()
        .map(|p| format!("{:02}", (p * 100.0).round()))
        .collect();
    parts.join("-")
}

fn integer_tag(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{}", v.round())).collect();
    parts.join("-")
}
