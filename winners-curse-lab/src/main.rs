mod presets;
mod reports;
mod runner;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use presets::{ExperimentSpec, expand_experiments, list_experiments, load_experiments};
use runner::{ExperimentReport, run_spec};
use util::split_csv;

#[derive(Debug, Parser)]
#[command(name = "winners-curse-lab", version)]
#[command(about = "Monte Carlo experiments on the winner's curse of noisy selection")]
struct Args {
    /// Experiments to run (comma-separated preset names, or `all`)
    #[arg(long, default_value = "binomial-n100-p50-50")]
    experiments: String,

    /// List all available experiments and exit
    #[arg(long)]
    list_experiments: bool,

    /// JSON file with one experiment or an array of experiments (replaces presets)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the seed of every experiment
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of trials of every experiment
    #[arg(long)]
    iterations: Option<usize>,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_experiments(&args)? {
        return Ok(());
    }

    if prints_banner(&args) {
        announce_banner();
    }

    let start_time = Instant::now();
    let (specs, unknown) = resolve_experiments(&args)?;
    for name in &unknown {
        eprintln!("⚠️  Unknown experiment: {}", name.yellow());
    }

    let (reports, failures) = run_experiments(&args, &specs);
    write_reports(&args, &reports, start_time)?;

    if !unknown.is_empty() || failures > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_experiments(args: &Args) -> Result<bool> {
    if !args.list_experiments {
        return Ok(false);
    }
    let mut sink = ReportSink::open(args.output.as_deref())?;
    writeln!(sink, "Available experiments:")?;
    for (key, description) in list_experiments() {
        writeln!(sink, "  {key:30} - {description}")?;
    }
    sink.finish()?;
    Ok(true)
}

/// Machine-readable reports on stdout stay clean of decoration.
fn prints_banner(args: &Args) -> bool {
    args.output.is_some() || args.report == "console"
}

fn announce_banner() {
    println!("{}", "🎯 Winner's Curse Lab".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn resolve_experiments(args: &Args) -> Result<(Vec<ExperimentSpec>, Vec<String>)> {
    let (specs, unknown) = if let Some(path) = &args.config {
        (load_experiments(path)?, Vec::new())
    } else {
        expand_experiments(&split_csv(&args.experiments))
    };
    let specs = specs
        .into_iter()
        .map(|spec| spec.with_overrides(args.seed, args.iterations))
        .collect();
    Ok((specs, unknown))
}

fn run_experiments(args: &Args, specs: &[ExperimentSpec]) -> (Vec<ExperimentReport>, usize) {
    let mut reports = Vec::with_capacity(specs.len());
    let mut failures = 0;
    for spec in specs {
        if args.verbose {
            eprintln!("▶ {} ({})", spec.name.bold(), spec.description);
        }
        match run_spec(spec) {
            Ok(report) => {
                if args.verbose {
                    eprintln!("✅ {} - {:?}", spec.name.green(), report.duration);
                }
                reports.push(report);
            }
            Err(e) => {
                failures += 1;
                eprintln!("❌ {}: {:#}", spec.name.red(), e);
            }
        }
    }
    (reports, failures)
}

fn write_reports(args: &Args, reports: &[ExperimentReport], start_time: Instant) -> Result<()> {
    let mut sink = ReportSink::open(args.output.as_deref())?;

    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut sink, reports)?,
        "markdown" => {
            if reports.is_empty() {
                writeln!(
                    &mut sink,
                    "# Winner's Curse Experiment Results\n\n_No experiments executed._"
                )?;
            } else {
                reports::generate_markdown_report(&mut sink, reports)?;
            }
        }
        "csv" => reports::generate_csv_report(&mut sink, reports)?,
        _ => {
            let duration = start_time.elapsed();
            if reports.is_empty() {
                writeln!(&mut sink, "No experiments executed.")?;
            } else {
                reports::generate_console_report(&mut sink, reports, duration)?;
            }
            writeln!(&mut sink, "🏁 Total time: {duration:?}")?;
        }
    }

    sink.finish()
}

/// Destination of a report: stdout, or a file created up front so a bad
/// `--output` path fails before any experiment runs.
struct ReportSink {
    writer: Box<dyn Write>,
    path: Option<PathBuf>,
}

impl ReportSink {
    fn open(path: Option<&Path>) -> Result<Self> {
        let writer: Box<dyn Write> = match path {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                Box::new(BufWriter::new(file))
            }
            None => Box::new(BufWriter::new(stdout())),
        };
        Ok(Self {
            writer,
            path: path.map(Path::to_path_buf),
        })
    }

    fn destination(&self) -> String {
        self.path
            .as_ref()
            .map_or_else(|| "stdout".to_string(), |path| path.display().to_string())
    }

    /// Flush everything written so far; errors name the destination.
    fn finish(mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("failed to write report to {}", self.destination()))?;
        log::debug!("report written to {}", self.destination());
        Ok(())
    }
}

impl Write for ReportSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}
