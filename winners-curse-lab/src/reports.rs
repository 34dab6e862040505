use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use winners_curse::{ConfidenceConfig, ConfidenceMethod, Summary, SweepPoint, Verdict};

use crate::runner::{ExperimentOutcome, ExperimentReport};

const VERDICT_LABELS: [(Verdict, &str); 3] = [
    (Verdict::Underestimated, "under"),
    (Verdict::Accurate, "accurate"),
    (Verdict::Overestimated, "over"),
];

fn interval_label(confidence: &ConfidenceConfig) -> String {
    let method = match confidence.method {
        ConfidenceMethod::Wald => "wald",
        ConfidenceMethod::Wilson => "wilson",
    };
    format!("{method}, z = {}", confidence.z)
}

fn selection_line(summary: &Summary) -> String {
    let parts: Vec<String> = summary
        .selection_counts
        .iter()
        .map(|(candidate, count)| format!("{candidate}: {count}"))
        .collect();
    parts.join(", ")
}

pub fn generate_console_report<W: Write + ?Sized>(
    writer: &mut W,
    reports: &[ExperimentReport],
    total_duration: Duration,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(
        writer,
        "{}",
        "📊 Experiment Results Summary".bright_cyan().bold()
    )?;
    writeln!(writer, "{}", "==============================".cyan())?;
    writeln!(writer, "Experiments: {}", reports.len())?;
    writeln!(writer, "Total time: {total_duration:?}")?;
    writeln!(writer)?;

    for report in reports {
        writeln!(writer, "{}", report.name.bold())?;
        writeln!(writer, "   For {}", report.description)?;
        writeln!(
            writer,
            "   seed {}, {} trials, floor {}",
            report.config.seed,
            report.config.iterations,
            report.config.parameter_floor.value()
        )?;
        match &report.outcome {
            ExperimentOutcome::Single {
                summary,
                over_interval,
            } => {
                for (verdict, label) in VERDICT_LABELS {
                    let line = format!(
                        "{label}: {:.4} = {}/{}",
                        summary.fraction(verdict),
                        summary.count(verdict),
                        summary.trials
                    );
                    let line = match verdict {
                        Verdict::Overestimated => line.red(),
                        Verdict::Underestimated => line.blue(),
                        Verdict::Accurate => line.normal(),
                    };
                    writeln!(writer, "   {line}")?;
                }
                writeln!(
                    writer,
                    "   over interval ({}): [{:.4}, {:.4}]",
                    interval_label(&report.config.confidence),
                    over_interval.lower,
                    over_interval.upper
                )?;
                writeln!(
                    writer,
                    "   mean predicted {:.4}, mean truth {:.4}, bias {:+.4} ± {:.4}",
                    summary.mean_predicted,
                    summary.mean_truth,
                    summary.mean_bias,
                    summary.bias_std_dev
                )?;
                writeln!(writer, "   selections: {}", selection_line(summary))?;
                if summary.clamped > 0 {
                    writeln!(
                        writer,
                        "   {}",
                        format!("clamped trials: {}", summary.clamped).yellow()
                    )?;
                }
            }
            ExperimentOutcome::Sweep { points } => {
                writeln!(
                    writer,
                    "   over interval: {}",
                    interval_label(&report.config.confidence)
                )?;
                writeln!(
                    writer,
                    "   {:>10} {:>8} {:>8} {:>8} {:>8}",
                    "scale", "over", "lower", "upper", "clamped"
                )?;
                for point in points {
                    writeln!(
                        writer,
                        "   {:>10.4} {:>8.4} {:>8.4} {:>8.4} {:>8}",
                        point.noise_level,
                        point.over_fraction,
                        point.lower,
                        point.upper,
                        point.summary.clamped
                    )?;
                }
            }
        }
        writeln!(writer, "   time: {:?}", report.duration)?;
        writeln!(writer)?;
    }
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(
    writer: &mut W,
    reports: &[ExperimentReport],
) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, reports)?;
    writeln!(writer)?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    writer: &mut W,
    reports: &[ExperimentReport],
) -> Result<()> {
    writeln!(writer, "# Winner's Curse Experiment Results\n")?;

    for report in reports {
        writeln!(writer, "## {}\n", report.name)?;
        writeln!(writer, "- **Model**: {}", report.description)?;
        writeln!(writer, "- **Seed**: {}", report.config.seed)?;
        writeln!(writer, "- **Trials**: {}", report.config.iterations)?;
        writeln!(
            writer,
            "- **Interval**: {}\n",
            interval_label(&report.config.confidence)
        )?;
        match &report.outcome {
            ExperimentOutcome::Single {
                summary,
                over_interval,
            } => {
                writeln!(writer, "| Verdict | Fraction | Count |")?;
                writeln!(writer, "|---|---|---|")?;
                for (verdict, label) in VERDICT_LABELS {
                    writeln!(
                        writer,
                        "| {label} | {:.4} | {}/{} |",
                        summary.fraction(verdict),
                        summary.count(verdict),
                        summary.trials
                    )?;
                }
                writeln!(writer)?;
                writeln!(
                    writer,
                    "- **Over interval**: [{:.4}, {:.4}]",
                    over_interval.lower, over_interval.upper
                )?;
                writeln!(
                    writer,
                    "- **Mean bias**: {:+.4} ± {:.4}",
                    summary.mean_bias, summary.bias_std_dev
                )?;
                writeln!(writer, "- **Selections**: {}", selection_line(summary))?;
                writeln!(writer, "- **Clamped trials**: {}", summary.clamped)?;
            }
            ExperimentOutcome::Sweep { points } => {
                writeln!(writer, "| Error scale | Over | Lower | Upper | Clamped |")?;
                writeln!(writer, "|---|---|---|---|---|")?;
                for point in points {
                    writeln!(
                        writer,
                        "| {:.4} | {:.4} | {:.4} | {:.4} | {} |",
                        point.noise_level,
                        point.over_fraction,
                        point.lower,
                        point.upper,
                        point.summary.clamped
                    )?;
                }
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

const CSV_HEADER: &str = "experiment,model,noise_level,trials,underestimated,accurate,overestimated,\
under_fraction,accurate_fraction,over_fraction,over_lower,over_upper,\
mean_predicted,mean_bias,bias_std_dev,clamped";

fn write_csv_row<W: Write + ?Sized>(
    writer: &mut W,
    report: &ExperimentReport,
    noise_level: Option<f64>,
    summary: &Summary,
    bounds: (f64, f64),
) -> Result<()> {
    let level = noise_level.map(|level| level.to_string()).unwrap_or_default();
    writeln!(
        writer,
        "{},{},{},{},{},{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{}",
        report.name,
        report.model.label(),
        level,
        summary.trials,
        summary.underestimated,
        summary.accurate,
        summary.overestimated,
        summary.under_fraction,
        summary.accurate_fraction,
        summary.over_fraction,
        bounds.0,
        bounds.1,
        summary.mean_predicted,
        summary.mean_bias,
        summary.bias_std_dev,
        summary.clamped
    )?;
    Ok(())
}

/// One row per single experiment and one row per sweep level.
pub fn generate_csv_report<W: Write + ?Sized>(
    writer: &mut W,
    reports: &[ExperimentReport],
) -> Result<()> {
    writeln!(writer, "{CSV_HEADER}")?;
    for report in reports {
        match &report.outcome {
            ExperimentOutcome::Single {
                summary,
                over_interval,
            } => write_csv_row(
                writer,
                report,
                None,
                summary,
                (over_interval.lower, over_interval.upper),
            )?,
            ExperimentOutcome::Sweep { points } => {
                for SweepPoint {
                    noise_level,
                    lower,
                    upper,
                    summary,
                    ..
                } in points
                {
                    write_csv_row(writer, report, Some(*noise_level), summary, (*lower, *upper))?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::find_experiment;
    use crate::runner::run_spec;

    fn sample_reports() -> Vec<ExperimentReport> {
        let single = find_experiment("binomial-n10-p50-50")
            .unwrap()
            .with_overrides(Some(3), Some(100));
        let mut sweep = find_experiment("drone-sweep")
            .unwrap()
            .with_overrides(Some(3), Some(40));
        sweep.sweep = Some(vec![0.05, 0.5]);
        vec![run_spec(&single).unwrap(), run_spec(&sweep).unwrap()]
    }

    fn render(
        f: impl Fn(&mut Vec<u8>, &[ExperimentReport]) -> Result<()>,
    ) -> String {
        let mut buffer = Vec::new();
        f(&mut buffer, &sample_reports()).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn console_report_prints_textual_summary() {
        colored::control::set_override(false);
        let content = render(|w, r| generate_console_report(w, r, Duration::from_millis(5)));
        assert!(content.contains("Experiment Results Summary"));
        assert!(content.contains("For binomial n = 10, probability vector = [0.5, 0.5]"));
        assert!(content.contains("/100"));
        assert!(content.contains("under: "));
        assert!(content.contains("scale"));
    }

    #[test]
    fn json_report_round_trips_through_serde_value() {
        let content = render(|w, r| generate_json_report(w, r));
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["outcome"]["kind"], "single");
        assert_eq!(entries[1]["outcome"]["points"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn markdown_report_has_tables() {
        let content = render(|w, r| generate_markdown_report(w, r));
        assert!(content.starts_with("# Winner's Curse Experiment Results"));
        assert!(content.contains("| Verdict | Fraction | Count |"));
        assert!(content.contains("| Error scale | Over | Lower | Upper | Clamped |"));
    }

    #[test]
    fn csv_report_has_one_row_per_result() {
        let content = render(|w, r| generate_csv_report(w, r));
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1 + 1 + 2);
        assert!(lines[0].starts_with("experiment,model,noise_level"));
        let columns = lines[0].split(',').count();
        assert!(lines.iter().all(|line| line.split(',').count() == columns));
        assert!(lines[1].starts_with("binomial-n10-p50-50,binomial,,100,"));
        assert!(lines[2].starts_with("drone-sweep,drone,0.05,40,"));
    }
}
