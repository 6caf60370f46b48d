use clap::Parser;
use iriscode::database::load_class_directories;
use iriscode::{evaluate, EvalConfig, EvalReport, MatchConfig, MetricKind, TemplateDatabase};
use rayon::prelude::*;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "IrisCode sweep runner (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

/// Evenly sampled closed parameter range.
#[derive(Debug, Deserialize, Clone, Copy)]
struct RangeConfig {
    min: f64,
    max: f64,
    count: usize,
}

impl RangeConfig {
    fn fixed(value: f64) -> Self {
        Self {
            min: value,
            max: value,
            count: 1,
        }
    }

    fn sample(&self, index: usize) -> f64 {
        if self.count <= 1 {
            self.min
        } else {
            self.min + (self.max - self.min) * index as f64 / (self.count - 1) as f64
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    enroll_dir: String,
    probe_dir: String,
    code_file: String,
    confidence_file: String,
    output_dir: String,
    /// One of "Hamming", "E(Hamming)", "FBD", "Hamming_FBD".
    metric: String,
    fbr: RangeConfig,
    alpha: RangeConfig,
    theta_tolerance: f64,
    roc_points: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enroll_dir: String::new(),
            probe_dir: String::new(),
            code_file: "code.png".to_string(),
            confidence_file: "confidence.png".to_string(),
            output_dir: "runs".to_string(),
            metric: "Hamming".to_string(),
            fbr: RangeConfig {
                min: 0.0,
                max: 0.5,
                count: 1,
            },
            alpha: RangeConfig {
                min: 0.0,
                max: 1.0,
                count: 1,
            },
            theta_tolerance: 0.05,
            roc_points: 100,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("iriscode=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.enroll_dir.is_empty() || config.probe_dir.is_empty() {
        return Err("enroll_dir and probe_dir must be set in the config".into());
    }

    let kind = MetricKind::parse(&config.metric)?;
    // Axes the metric does not use collapse to a single sample.
    let fbr_axis = if kind.uses_fbr() {
        config.fbr
    } else {
        RangeConfig::fixed(config.fbr.min)
    };
    let alpha_axis = if kind.uses_alpha() {
        config.alpha
    } else {
        RangeConfig::fixed(config.alpha.min)
    };

    let database: TemplateDatabase =
        TemplateDatabase::load_directory(&config.enroll_dir, &config.code_file, &config.confidence_file)?;
    let probes = load_class_directories(&config.probe_dir, &config.code_file, &config.confidence_file)?;
    eprintln!(
        "enrolled {} entries ({} classes), {} probes",
        database.len(),
        database.class_count(),
        probes.len()
    );

    fs::create_dir_all(&config.output_dir)?;

    let mut combos = Vec::new();
    for i_fbr in 0..fbr_axis.count.max(1) {
        for i_alpha in 0..alpha_axis.count.max(1) {
            combos.push((i_fbr, i_alpha));
        }
    }

    // Independent runs: each worker owns a private database copy, so the
    // single-slot FBR cache is never shared.
    combos
        .par_iter()
        .map_init(
            || database.clone(),
            |db, &(i_fbr, i_alpha)| -> Result<(), String> {
                let fbr = fbr_axis.sample(i_fbr);
                let alpha = alpha_axis.sample(i_alpha);
                let metric = kind.with_alpha(alpha).map_err(|e| e.to_string())?;
                let match_cfg = MatchConfig {
                    metric,
                    fbr,
                    theta_tolerance: config.theta_tolerance,
                };
                let eval_cfg = EvalConfig {
                    roc_points: config.roc_points,
                };
                let report = evaluate(db, &probes, &match_cfg, &eval_cfg)
                    .map_err(|e| e.to_string())?;
                let path =
                    Path::new(&config.output_dir).join(format!("run_f{i_fbr}_a{i_alpha}.txt"));
                write_run(&path, fbr, alpha, &report).map_err(|e| e.to_string())
            },
        )
        .collect::<Result<Vec<()>, String>>()?;

    eprintln!("wrote {} runs to {}", combos.len(), config.output_dir);
    Ok(())
}

/// Serializes one run as named numeric-matrix literals.
fn write_run(path: &Path, fbr: f64, alpha: f64, report: &EvalReport) -> std::io::Result<()> {
    let mut out = String::new();
    push_vector(&mut out, "fbr", &[fbr]);
    push_vector(&mut out, "alpha", &[alpha]);
    push_matrix(&mut out, "distances", &report.distances);
    push_index_vector(&mut out, "ranks", &report.ranks);
    push_index_vector(&mut out, "truth", &report.truth);
    push_vector(&mut out, "cmc", &report.cmc);
    push_vector(&mut out, "roc_thresholds", &report.roc_thresholds);
    push_vector(&mut out, "verification_rate", &report.verification_rate);
    push_vector(&mut out, "false_match_rate", &report.false_match_rate);
    push_vector(
        &mut out,
        "enrollment_failure_rate",
        &[report.failure_rate()],
    );
    fs::write(path, out)
}

fn push_vector(out: &mut String, name: &str, values: &[f64]) {
    out.push_str(name);
    out.push_str(" = [");
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{value}"));
    }
    out.push_str("];\n");
}

fn push_index_vector(out: &mut String, name: &str, values: &[usize]) {
    let as_f64: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    push_vector(out, name, &as_f64);
}

fn push_matrix(out: &mut String, name: &str, rows: &[Vec<f64>]) {
    out.push_str(name);
    out.push_str(" = [");
    for (r, row) in rows.iter().enumerate() {
        if r > 0 {
            out.push_str("; ");
        }
        for (c, value) in row.iter().enumerate() {
            if c > 0 {
                out.push(' ');
            }
            out.push_str(&format!("{value}"));
        }
    }
    out.push_str("];\n");
}
