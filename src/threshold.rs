//! Per-template fragile-bit threshold derivation.
//!
//! The fragile-bit rate (FBR) is the target fraction of valid bits to treat
//! as low-confidence. The threshold is read off the cumulative confidence
//! histogram: the smallest value whose CDF reaches the requested rate.
//! Polarity is deliberate and matches the source system: a bit is *stable*
//! when `confidence >= threshold`, so the FBR controls the excluded fraction.

use crate::grid::GridView;
use crate::util::{IrisCodeError, IrisCodeResult};

/// Derives the stable-bit threshold for one confidence plane.
///
/// Builds a 256-bin histogram over pixels with `confidence > 0` (bin 0 stays
/// empty), normalizes the running sum to a CDF and returns the smallest bin
/// index in `1..=255` whose CDF reaches `fbr`. Returns 255 when the plane has
/// no valid pixels at all.
pub fn fragile_bit_threshold(confidence: GridView<'_>, fbr: f64) -> IrisCodeResult<u8> {
    if !(0.0..=1.0).contains(&fbr) {
        return Err(IrisCodeError::InvalidParameter {
            name: "fbr",
            reason: "must lie in [0, 1]",
        });
    }

    let mut histogram = [0u64; 256];
    for row in 0..confidence.height() {
        let values = confidence.row(row).expect("row in bounds");
        for &value in values {
            if value > 0 {
                histogram[value as usize] += 1;
            }
        }
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return Ok(255);
    }

    let mut cumulative = 0u64;
    for bin in 1..=255usize {
        cumulative += histogram[bin];
        if cumulative as f64 / total as f64 >= fbr {
            return Ok(bin as u8);
        }
    }
    // The CDF reaches 1.0 at bin 255, which satisfies any fbr <= 1.
    Ok(255)
}

#[cfg(test)]
mod tests {
    use super::fragile_bit_threshold;
    use crate::grid::OwnedGrid;

    fn plane(values: &[u8]) -> OwnedGrid {
        OwnedGrid::new(values.to_vec(), values.len(), 1).unwrap()
    }

    #[test]
    fn empty_plane_yields_max_threshold() {
        let grid = plane(&[0, 0, 0, 0]);
        assert_eq!(fragile_bit_threshold(grid.view(), 0.5).unwrap(), 255);
    }

    #[test]
    fn threshold_hits_requested_fraction() {
        // Four valid pixels at 10, 20, 30, 40.
        let grid = plane(&[10, 20, 30, 40, 0]);
        assert_eq!(fragile_bit_threshold(grid.view(), 0.25).unwrap(), 10);
        assert_eq!(fragile_bit_threshold(grid.view(), 0.5).unwrap(), 20);
        assert_eq!(fragile_bit_threshold(grid.view(), 1.0).unwrap(), 40);
    }

    #[test]
    fn zero_fbr_keeps_every_valid_bit_stable() {
        let grid = plane(&[50, 100, 150]);
        let threshold = fragile_bit_threshold(grid.view(), 0.0).unwrap();
        assert!(threshold <= 50);
    }

    #[test]
    fn threshold_is_monotonic_in_fbr() {
        let grid = plane(&[3, 9, 9, 27, 81, 81, 81, 243, 0, 0]);
        let mut last = 0u8;
        for step in 0..=20 {
            let fbr = step as f64 / 20.0;
            let threshold = fragile_bit_threshold(grid.view(), fbr).unwrap();
            assert!(threshold >= last, "fbr {fbr}: {threshold} < {last}");
            last = threshold;
        }
    }

    #[test]
    fn out_of_range_fbr_is_rejected() {
        let grid = plane(&[1, 2, 3]);
        assert!(fragile_bit_threshold(grid.view(), -0.1).is_err());
        assert!(fragile_bit_threshold(grid.view(), 1.1).is_err());
    }
}
