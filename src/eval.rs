//! Recognition evaluation: CMC and ROC aggregation over a probe set.
//!
//! Every probe is matched against the full database; genuine distances
//! (entry class equals probe class) and impostor distances feed an ROC sweep
//! over evenly spaced thresholds, and per-probe ranks feed the cumulative
//! match characteristic. Probes whose genuine candidates all carry the
//! sentinel distance `1.0` are enrollment failures: excluded from the rate
//! denominators and reported separately.

use crate::database::{LabelledTemplate, TemplateDatabase};
use crate::matching::{match_prepared, MatchConfig, PackedProbe, Ranking};
use crate::packed::Word;
use crate::trace::{trace_event, trace_span};
use crate::util::{IrisCodeError, IrisCodeResult};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Evaluation parameters beyond the per-probe matching config.
#[derive(Clone, Copy, Debug)]
pub struct EvalConfig {
    /// Number of evenly spaced ROC thresholds in `[0, 1]`.
    pub roc_points: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self { roc_points: 100 }
    }
}

/// Aggregated results of one evaluation run.
#[derive(Clone, Debug)]
pub struct EvalReport {
    /// Registered distance of every probe (rows) against every entry (columns).
    pub distances: Vec<Vec<f64>>,
    /// Rank of the true class per probe (entry count when absent).
    pub ranks: Vec<usize>,
    /// Enrollment index of the first entry of each probe's class, or the
    /// entry count when the class is not enrolled.
    pub truth: Vec<usize>,
    /// `cmc[r]` = fraction of counted probes ranked at position `<= r`.
    pub cmc: Vec<f64>,
    /// ROC threshold axis, evenly spaced over `[0, 1]`.
    pub roc_thresholds: Vec<f64>,
    /// Fraction of genuine distances below each threshold.
    pub verification_rate: Vec<f64>,
    /// Fraction of impostor distances below each threshold.
    pub false_match_rate: Vec<f64>,
    /// Probes excluded as enrollment failures.
    pub enrollment_failures: usize,
    /// Total probes presented.
    pub probe_count: usize,
}

impl EvalReport {
    /// Enrollment-failure fraction over the presented probes.
    pub fn failure_rate(&self) -> f64 {
        if self.probe_count == 0 {
            0.0
        } else {
            self.enrollment_failures as f64 / self.probe_count as f64
        }
    }
}

/// Runs the matcher over a labelled probe set and aggregates CMC/ROC curves.
pub fn evaluate<W: Word>(
    db: &mut TemplateDatabase<W>,
    probes: &[LabelledTemplate],
    match_cfg: &MatchConfig,
    eval_cfg: &EvalConfig,
) -> IrisCodeResult<EvalReport> {
    if eval_cfg.roc_points < 2 {
        return Err(IrisCodeError::InvalidParameter {
            name: "roc_points",
            reason: "need at least 2 thresholds",
        });
    }

    let _span = trace_span!("evaluate", probes = probes.len(), entries = db.len()).entered();
    db.prepare(match_cfg.fbr)?;

    let rankings = rank_probes(db, probes, match_cfg)?;

    let entry_count = db.len();
    let entry_classes: Vec<&str> = db.entries().map(|e| e.class()).collect();

    let mut distances = Vec::with_capacity(probes.len());
    let mut ranks = Vec::with_capacity(probes.len());
    let mut truth = Vec::with_capacity(probes.len());
    let mut genuine = Vec::new();
    let mut impostor = Vec::new();
    let mut rank_hits = vec![0u64; entry_count + 1];
    let mut failures = 0usize;
    let mut counted = 0u64;

    for (probe, ranking) in probes.iter().zip(&rankings) {
        let truth_idx = entry_classes
            .iter()
            .position(|&class| class == probe.class)
            .unwrap_or(entry_count);
        truth.push(truth_idx);

        match ranking {
            Some(ranking) => {
                let row: Vec<f64> = ranking.scores.iter().map(|s| s.distance).collect();
                let genuine_row: Vec<f64> = ranking
                    .scores
                    .iter()
                    .filter(|s| entry_classes[s.entry] == probe.class)
                    .map(|s| s.distance)
                    .collect();
                // A probe whose genuine candidates all sit at the sentinel
                // cannot be verified: enrollment failure.
                let failed = !genuine_row.is_empty() && genuine_row.iter().all(|&d| d >= 1.0);
                if failed {
                    failures += 1;
                } else {
                    counted += 1;
                    rank_hits[ranking.rank.min(entry_count)] += 1;
                    genuine.extend(genuine_row);
                    impostor.extend(
                        ranking
                            .scores
                            .iter()
                            .filter(|s| entry_classes[s.entry] != probe.class)
                            .map(|s| s.distance),
                    );
                }
                distances.push(row);
                ranks.push(ranking.rank);
            }
            None => {
                // The probe itself failed to load.
                failures += 1;
                distances.push(vec![1.0; entry_count]);
                ranks.push(entry_count);
            }
        }
    }

    let cmc = cumulative_rank_distribution(&rank_hits[..entry_count], counted);
    let (roc_thresholds, verification_rate, false_match_rate) =
        roc_curves(&genuine, &impostor, eval_cfg.roc_points);

    trace_event!(
        "evaluation_done",
        failures = failures,
        genuine = genuine.len(),
        impostor = impostor.len()
    );

    Ok(EvalReport {
        distances,
        ranks,
        truth,
        cmc,
        roc_thresholds,
        verification_rate,
        false_match_rate,
        enrollment_failures: failures,
        probe_count: probes.len(),
    })
}

fn rank_probes<W: Word>(
    db: &TemplateDatabase<W>,
    probes: &[LabelledTemplate],
    match_cfg: &MatchConfig,
) -> IrisCodeResult<Vec<Option<Ranking>>> {
    let rank_one = |probe: &LabelledTemplate| -> IrisCodeResult<Option<Ranking>> {
        match probe.template.as_ref() {
            Some(template) => {
                let packed = PackedProbe::new(template, &probe.class, match_cfg.fbr)?;
                match_prepared(db, &packed, match_cfg).map(Some)
            }
            None => Ok(None),
        }
    };

    #[cfg(feature = "rayon")]
    {
        probes.par_iter().map(rank_one).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        probes.iter().map(rank_one).collect()
    }
}

/// Cumulative fraction of probes ranked at or below each position.
fn cumulative_rank_distribution(rank_hits: &[u64], counted: u64) -> Vec<f64> {
    let mut cmc = Vec::with_capacity(rank_hits.len());
    let mut cumulative = 0u64;
    for &hits in rank_hits {
        cumulative += hits;
        cmc.push(if counted == 0 {
            0.0
        } else {
            cumulative as f64 / counted as f64
        });
    }
    cmc
}

fn roc_curves(genuine: &[f64], impostor: &[f64], points: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut thresholds = Vec::with_capacity(points);
    let mut verification = Vec::with_capacity(points);
    let mut false_match = Vec::with_capacity(points);
    for step in 0..points {
        let threshold = step as f64 / (points - 1) as f64;
        thresholds.push(threshold);
        verification.push(fraction_below(genuine, threshold));
        false_match.push(fraction_below(impostor, threshold));
    }
    (thresholds, verification, false_match)
}

fn fraction_below(distances: &[f64], threshold: f64) -> f64 {
    if distances.is_empty() {
        return 0.0;
    }
    let below = distances.iter().filter(|&&d| d < threshold).count();
    below as f64 / distances.len() as f64
}
