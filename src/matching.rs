//! Per-probe matching and ranking.
//!
//! A probe is registered against every enrolled entry, distances are
//! stable-sorted ascending and the rank of the probe's true class is read
//! off the sorted order. Entries without a usable packed representation keep
//! their slot with the sentinel distance `1.0`, so database cardinality is
//! stable across probes.

use crate::database::TemplateDatabase;
use crate::distance::Metric;
use crate::packed::Word;
use crate::registration::{registering, RegistrationInput, RotationScratch};
use crate::template::{IrisTemplate, PackedBundle};
use crate::threshold::fragile_bit_threshold;
use crate::trace::{trace_event, trace_span};
use crate::util::{IrisCodeError, IrisCodeResult};

/// Parameters of one matching run.
#[derive(Clone, Copy, Debug)]
pub struct MatchConfig {
    /// Distance metric to minimize during registration.
    pub metric: Metric,
    /// Fragile-bit rate used to derive per-template stable thresholds.
    pub fbr: f64,
    /// Maximum angular misalignment as a fraction of the template width;
    /// the search window is `[-round(f * width), round(f * width))`.
    pub theta_tolerance: f64,
}

impl MatchConfig {
    fn validate(&self) -> IrisCodeResult<()> {
        if !(0.0..=1.0).contains(&self.fbr) {
            return Err(IrisCodeError::InvalidParameter {
                name: "fbr",
                reason: "must lie in [0, 1]",
            });
        }
        if !(0.0..=1.0).contains(&self.theta_tolerance) {
            return Err(IrisCodeError::InvalidParameter {
                name: "theta_tolerance",
                reason: "must lie in [0, 1]",
            });
        }
        Ok(())
    }

    /// Angular search window for a template of the given width.
    pub fn theta_window(&self, width: usize) -> (i32, i32) {
        let half = (self.theta_tolerance * width as f64).round() as i32;
        if half == 0 {
            (0, 1)
        } else {
            (-half, half)
        }
    }
}

/// Distance of one probe against one enrolled entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntryScore {
    /// Enrollment index of the entry.
    pub entry: usize,
    /// Registered distance, `1.0` on failure.
    pub distance: f64,
    /// Angular offset that achieved the distance.
    pub theta: i32,
    /// False when the comparison failed at every offset (or the entry is
    /// unmatchable).
    pub ok: bool,
}

/// Full ranking of one probe against the database.
#[derive(Clone, Debug)]
pub struct Ranking {
    /// Per-entry scores in enrollment order.
    pub scores: Vec<EntryScore>,
    /// Entry indices sorted ascending by distance (stable: ties keep
    /// enrollment order).
    pub order: Vec<usize>,
    /// Position of the first entry matching the probe's class in `order`,
    /// or the entry count when the class is absent.
    pub rank: usize,
}

/// A probe packed once for repeated matching at a fixed FBR.
pub struct PackedProbe<'a, W: Word> {
    template: &'a IrisTemplate,
    class: &'a str,
    bundle: PackedBundle<W>,
}

impl<'a, W: Word> PackedProbe<'a, W> {
    /// Derives the probe's own stable threshold for `fbr` and packs it.
    pub fn new(template: &'a IrisTemplate, class: &'a str, fbr: f64) -> IrisCodeResult<Self> {
        let threshold = fragile_bit_threshold(template.confidence().view(), fbr)?;
        let bundle = PackedBundle::pack(template, threshold)?;
        Ok(Self {
            template,
            class,
            bundle,
        })
    }

    /// Returns the probe's class label.
    pub fn class(&self) -> &str {
        self.class
    }
}

/// Matches one probe against every enrolled entry.
///
/// Prepares the database for `cfg.fbr` (single-slot cache, destructive on
/// FBR change), packs the probe with its own threshold and ranks the
/// registered distances.
pub fn match_probe<W: Word>(
    db: &mut TemplateDatabase<W>,
    probe: &IrisTemplate,
    probe_class: &str,
    cfg: &MatchConfig,
) -> IrisCodeResult<Ranking> {
    cfg.validate()?;
    db.prepare(cfg.fbr)?;
    let packed = PackedProbe::new(probe, probe_class, cfg.fbr)?;
    match_prepared(db, &packed, cfg)
}

/// Matches a pre-packed probe against a database already prepared for
/// `cfg.fbr`. Read-only on the database, so probes can run concurrently.
pub fn match_prepared<W: Word>(
    db: &TemplateDatabase<W>,
    probe: &PackedProbe<'_, W>,
    cfg: &MatchConfig,
) -> IrisCodeResult<Ranking> {
    cfg.validate()?;
    let _span = trace_span!("match_probe", entries = db.len()).entered();

    let (theta_min, theta_max) = cfg.theta_window(probe.template.width());
    let probe_input = RegistrationInput {
        template: probe.template,
        packed: &probe.bundle,
    };

    let mut scratch = RotationScratch::new();
    let mut scores = Vec::with_capacity(db.len());
    for (index, entry) in db.entries().enumerate() {
        let score = match (entry.template(), entry.packed()) {
            (Some(template), Some(packed)) => {
                let registration = registering(
                    cfg.metric,
                    probe_input,
                    RegistrationInput { template, packed },
                    theta_min,
                    theta_max,
                    &mut scratch,
                )?;
                EntryScore {
                    entry: index,
                    distance: registration.distance,
                    theta: registration.theta,
                    ok: registration.ok,
                }
            }
            // Unmatchable entries keep their slot with the sentinel distance.
            _ => EntryScore {
                entry: index,
                distance: 1.0,
                theta: 0,
                ok: false,
            },
        };
        scores.push(score);
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&l, &r| scores[l].distance.total_cmp(&scores[r].distance));

    let rank = order
        .iter()
        .position(|&idx| {
            db.entry(idx)
                .map(|entry| entry.class() == probe.class)
                .unwrap_or(false)
        })
        .unwrap_or(db.len());

    trace_event!("probe_ranked", rank = rank);
    Ok(Ranking {
        scores,
        order,
        rank,
    })
}
