//! Brute-force angular registration search.
//!
//! Registration finds the integer column offset that best aligns two
//! templates before comparing them: every offset in `[theta_min, theta_max)`
//! is tried in increasing order and the first strictly-better distance wins,
//! so ties keep the lowest theta.

use crate::distance::{self, DistanceScore, Metric};
use crate::packed::Word;
use crate::template::{IrisTemplate, PackedBundle};
use crate::trace::{trace_event, trace_span};
use crate::util::{IrisCodeError, IrisCodeResult};

/// Sentinel initial best distance, above every reachable metric value.
const INVALID_DISTANCE: f64 = 2.0;

/// One template in both representations, as registration needs them.
///
/// Bit-packed metrics rotate and compare the packed bundle; `E(Hamming)` is
/// evaluated straight on the byte planes at a column offset.
#[derive(Clone, Copy)]
pub struct RegistrationInput<'a, W: Word> {
    /// Raw byte planes.
    pub template: &'a IrisTemplate,
    /// Packed representation of the same sample.
    pub packed: &'a PackedBundle<W>,
}

/// Result of one registration search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Registration {
    /// Best distance found, `1.0` when no offset produced a valid overlap.
    pub distance: f64,
    /// Offset achieving the best distance; `0` when `ok` is false.
    pub theta: i32,
    /// False when every candidate offset failed (no jointly-valid bits).
    pub ok: bool,
}

/// Reusable rotated-copy buffer for the per-theta evaluation.
///
/// Owning the scratch at the call site keeps the inner loop allocation-free
/// and keeps concurrent searches from sharing mutable state.
pub struct RotationScratch<W: Word> {
    rotated: Option<PackedBundle<W>>,
}

impl<W: Word> RotationScratch<W> {
    /// Creates an empty scratch; buffers are sized on first use.
    pub fn new() -> Self {
        Self { rotated: None }
    }

    fn ensure(&mut self, shape: &PackedBundle<W>) -> &mut PackedBundle<W> {
        let needs_resize = self
            .rotated
            .as_ref()
            .map_or(true, |r| !r.same_shape(shape));
        if needs_resize {
            self.rotated = Some(shape.clone());
        }
        self.rotated.as_mut().expect("scratch was just populated")
    }
}

impl<W: Word> Default for RotationScratch<W> {
    fn default() -> Self {
        Self::new()
    }
}

/// Searches `[theta_min, theta_max)` for the offset of `b` minimizing the
/// metric distance to `a`.
///
/// Offsets are tried in increasing order; only strictly smaller distances
/// replace the incumbent. Returns `ok = false` when the metric failed at
/// every offset.
pub fn registering<W: Word>(
    metric: Metric,
    a: RegistrationInput<'_, W>,
    b: RegistrationInput<'_, W>,
    theta_min: i32,
    theta_max: i32,
    scratch: &mut RotationScratch<W>,
) -> IrisCodeResult<Registration> {
    if theta_min >= theta_max {
        return Err(IrisCodeError::InvalidParameter {
            name: "theta range",
            reason: "theta_min must be below theta_max",
        });
    }

    let _span = trace_span!(
        "registering",
        theta_min = theta_min,
        theta_max = theta_max
    )
    .entered();

    let mut best = INVALID_DISTANCE;
    let mut best_theta = 0i32;
    let mut any_valid = false;
    for theta in theta_min..theta_max {
        let score = evaluate_at(metric, a, b, theta, scratch)?;
        if !score.valid {
            continue;
        }
        any_valid = true;
        if score.value < best {
            best = score.value;
            best_theta = theta;
        }
    }

    if !any_valid {
        trace_event!("registering_failed", theta_min = theta_min, theta_max = theta_max);
        return Ok(Registration {
            distance: 1.0,
            theta: 0,
            ok: false,
        });
    }
    Ok(Registration {
        distance: best,
        theta: best_theta,
        ok: true,
    })
}

/// Evaluates the metric with `b` rotated by `theta` columns.
pub fn evaluate_at<W: Word>(
    metric: Metric,
    a: RegistrationInput<'_, W>,
    b: RegistrationInput<'_, W>,
    theta: i32,
    scratch: &mut RotationScratch<W>,
) -> IrisCodeResult<DistanceScore> {
    match metric {
        Metric::HammingExpectation => distance::hamming_expectation(a.template, b.template, theta),
        Metric::Hamming | Metric::Fbd | Metric::HammingFbd { .. } => {
            let rotated = scratch.ensure(b.packed);
            b.packed.rotate_into(theta, rotated)?;
            match metric {
                Metric::Hamming => distance::hamming(a.packed, rotated),
                Metric::Fbd => distance::fragile_bit(a.packed, rotated),
                Metric::HammingFbd { alpha } => {
                    distance::hamming_fragile_bit(a.packed, rotated, alpha)
                }
                Metric::HammingExpectation => unreachable!("handled above"),
            }
        }
    }
}
