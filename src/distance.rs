//! Distance metrics over aligned template bundles.
//!
//! All bit-packed metrics count over the jointly non-occluded positions
//! `n = popcount(valid1 AND valid2)` and report a distance in `[0, 1]`. A
//! zero joint overlap is not an error: the metric reports `valid = false`
//! with the maximally-dissimilar sentinel distance `1.0`, and callers
//! propagate that value instead of crashing (degenerate-overlap contract).
//!
//! `E(Hamming)` is the one metric that bypasses bit-packing: it works on the
//! raw byte planes, turning each confidence value into a bit-flip
//! probability and accumulating the expected disagreement.

use crate::packed::{check_same_shape, Word};
use crate::template::{IrisTemplate, PackedBundle};
use crate::util::{IrisCodeError, IrisCodeResult};

/// Outcome of one distance evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceScore {
    /// Distance in `[0, 1]`; `1.0` when the comparison failed.
    pub value: f64,
    /// False when the two templates share no jointly-valid position.
    pub valid: bool,
}

impl DistanceScore {
    /// The degenerate-overlap sentinel: maximally dissimilar, not valid.
    pub const FAILED: DistanceScore = DistanceScore {
        value: 1.0,
        valid: false,
    };

    fn from_ratio(numerator: f64, n: u64) -> Self {
        if n == 0 {
            return Self::FAILED;
        }
        Self {
            value: numerator / n as f64,
            valid: true,
        }
    }
}

/// Metric family selected by name, without parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricKind {
    /// Plain fractional Hamming distance over jointly-valid bits.
    Hamming,
    /// Fragile-bit distance: fraction of jointly-valid bits not stable in both.
    Fbd,
    /// Weighted combination `alpha * FBD + (1 - alpha) * Hamming`.
    HammingFbd,
    /// Probabilistic expectation of the Hamming distance from raw confidences.
    HammingExpectation,
}

impl MetricKind {
    /// Parses one of the supported metric names:
    /// `"Hamming"`, `"E(Hamming)"`, `"FBD"`, `"Hamming_FBD"`.
    pub fn parse(name: &str) -> IrisCodeResult<Self> {
        match name {
            "Hamming" => Ok(Self::Hamming),
            "E(Hamming)" => Ok(Self::HammingExpectation),
            "FBD" => Ok(Self::Fbd),
            "Hamming_FBD" => Ok(Self::HammingFbd),
            _ => Err(IrisCodeError::UnknownMetric {
                name: name.to_string(),
            }),
        }
    }

    /// True when the metric depends on the fragile-bit rate.
    pub fn uses_fbr(&self) -> bool {
        matches!(self, Self::Fbd | Self::HammingFbd)
    }

    /// True when the metric depends on the mixing weight alpha.
    pub fn uses_alpha(&self) -> bool {
        matches!(self, Self::HammingFbd)
    }

    /// Attaches parameters, validating alpha for the weighted metric.
    pub fn with_alpha(self, alpha: f64) -> IrisCodeResult<Metric> {
        if self == Self::HammingFbd && !(0.0..=1.0).contains(&alpha) {
            return Err(IrisCodeError::InvalidParameter {
                name: "alpha",
                reason: "must lie in [0, 1]",
            });
        }
        Ok(match self {
            Self::Hamming => Metric::Hamming,
            Self::Fbd => Metric::Fbd,
            Self::HammingFbd => Metric::HammingFbd { alpha },
            Self::HammingExpectation => Metric::HammingExpectation,
        })
    }
}

/// Fully parameterized distance metric.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Metric {
    /// Plain fractional Hamming distance.
    Hamming,
    /// Fragile-bit distance.
    Fbd,
    /// `alpha * FBD + (1 - alpha) * Hamming`.
    HammingFbd {
        /// Mixing weight in `[0, 1]`.
        alpha: f64,
    },
    /// Expectation variant working on raw confidence planes.
    HammingExpectation,
}

impl Metric {
    /// Returns the metric family.
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Hamming => MetricKind::Hamming,
            Self::Fbd => MetricKind::Fbd,
            Self::HammingFbd { .. } => MetricKind::HammingFbd,
            Self::HammingExpectation => MetricKind::HammingExpectation,
        }
    }
}

/// Raw numerators shared by the bit-packed metrics, accumulated in one pass.
struct PackedCounts {
    /// Jointly-valid bit count.
    n: u64,
    /// Differing code bits among jointly-valid positions.
    hamming: u64,
    /// Jointly-valid positions not stable in both templates.
    fragile: u64,
}

fn packed_counts<W: Word>(
    a: &PackedBundle<W>,
    b: &PackedBundle<W>,
) -> IrisCodeResult<PackedCounts> {
    check_same_shape(a.code(), b.code())?;

    let mut n = 0u64;
    let mut hamming = 0u64;
    let mut stable_both = 0u64;
    let words = a.code().words().len();
    for i in 0..words {
        let v = a.valid().words()[i] & b.valid().words()[i];
        n += u64::from(v.popcount());
        hamming += u64::from(((a.code().words()[i] ^ b.code().words()[i]) & v).popcount());
        stable_both += u64::from((a.stable().words()[i] & b.stable().words()[i] & v).popcount());
    }
    Ok(PackedCounts {
        n,
        hamming,
        fragile: n - stable_both,
    })
}

/// Fractional Hamming distance over jointly-valid bits.
pub fn hamming<W: Word>(a: &PackedBundle<W>, b: &PackedBundle<W>) -> IrisCodeResult<DistanceScore> {
    let counts = packed_counts(a, b)?;
    Ok(DistanceScore::from_ratio(counts.hamming as f64, counts.n))
}

/// Fragile-bit distance: fraction of jointly-valid bits that are not stable
/// in both templates.
pub fn fragile_bit<W: Word>(
    a: &PackedBundle<W>,
    b: &PackedBundle<W>,
) -> IrisCodeResult<DistanceScore> {
    let counts = packed_counts(a, b)?;
    Ok(DistanceScore::from_ratio(counts.fragile as f64, counts.n))
}

/// Weighted combination `alpha * FBD + (1 - alpha) * Hamming`, computed from
/// the two raw numerators in a single pass over the planes.
pub fn hamming_fragile_bit<W: Word>(
    a: &PackedBundle<W>,
    b: &PackedBundle<W>,
    alpha: f64,
) -> IrisCodeResult<DistanceScore> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(IrisCodeError::InvalidParameter {
            name: "alpha",
            reason: "must lie in [0, 1]",
        });
    }
    let counts = packed_counts(a, b)?;
    if counts.n == 0 {
        return Ok(DistanceScore::FAILED);
    }
    let n = counts.n as f64;
    let value = alpha * (counts.fragile as f64 / n) + (1.0 - alpha) * (counts.hamming as f64 / n);
    Ok(DistanceScore { value, valid: true })
}

/// Expected Hamming distance from raw confidence planes, with template `b`
/// cyclically offset by `theta` columns.
///
/// Per pixel valid in both, the per-side bit-flip probability is
/// `p = 0.5 * (255 - confidence) / 255`; agreeing code bits contribute
/// `p1*q2 + q1*p2`, disagreeing bits `q1*q2 + p1*p2`, normalized by the
/// jointly-valid pixel count.
pub fn hamming_expectation(
    a: &IrisTemplate,
    b: &IrisTemplate,
    theta: i32,
) -> IrisCodeResult<DistanceScore> {
    if !a.same_shape(b) {
        return Err(IrisCodeError::ShapeMismatch {
            left_width: a.width(),
            left_height: a.height(),
            right_width: b.width(),
            right_height: b.height(),
        });
    }

    let width = a.width();
    let k = i64::from(theta).rem_euclid(width as i64) as usize;
    let mut n = 0u64;
    let mut sum = 0.0f64;
    for row in 0..a.height() {
        let code_a = a.code().view().row(row).expect("row in bounds");
        let conf_a = a.confidence().view().row(row).expect("row in bounds");
        let code_b = b.code().view().row(row).expect("row in bounds");
        let conf_b = b.confidence().view().row(row).expect("row in bounds");
        for col in 0..width {
            let src = (col + k) % width;
            let (ca, cb) = (conf_a[col], conf_b[src]);
            if ca == 0 || cb == 0 {
                continue;
            }
            n += 1;
            let p1 = 0.5 * f64::from(255 - ca) / 255.0;
            let p2 = 0.5 * f64::from(255 - cb) / 255.0;
            let (q1, q2) = (1.0 - p1, 1.0 - p2);
            sum += if (code_a[col] > 0) == (code_b[src] > 0) {
                p1 * q2 + q1 * p2
            } else {
                q1 * q2 + p1 * p2
            };
        }
    }

    if n == 0 {
        return Ok(DistanceScore::FAILED);
    }
    Ok(DistanceScore {
        value: sum / n as f64,
        valid: true,
    })
}

#[cfg(test)]
mod tests {
    use super::{DistanceScore, MetricKind};

    #[test]
    fn metric_names_parse_exactly() {
        assert_eq!(MetricKind::parse("Hamming").unwrap(), MetricKind::Hamming);
        assert_eq!(
            MetricKind::parse("E(Hamming)").unwrap(),
            MetricKind::HammingExpectation
        );
        assert_eq!(MetricKind::parse("FBD").unwrap(), MetricKind::Fbd);
        assert_eq!(
            MetricKind::parse("Hamming_FBD").unwrap(),
            MetricKind::HammingFbd
        );
        assert!(MetricKind::parse("hamming").is_err());
        assert!(MetricKind::parse("ZNCC").is_err());
    }

    #[test]
    fn alpha_is_validated_for_weighted_metric_only() {
        assert!(MetricKind::HammingFbd.with_alpha(1.5).is_err());
        assert!(MetricKind::HammingFbd.with_alpha(0.5).is_ok());
        assert!(MetricKind::Hamming.with_alpha(7.0).is_ok());
    }

    #[test]
    fn failed_sentinel_is_maximal() {
        assert_eq!(DistanceScore::FAILED.value, 1.0);
        assert!(!DistanceScore::FAILED.valid);
    }
}
