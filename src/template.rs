//! Iris template bundles.
//!
//! An [`IrisTemplate`] holds the two byte planes delivered by the feature
//! extractor: the code plane (feature bits) and the confidence plane. A
//! [`PackedBundle`] is its bit-packed form: three planes of identical shape
//! where `code[i]` is the feature bit, `valid[i] = confidence[i] > 0` marks
//! non-occluded cells and `stable[i] = confidence[i] >= threshold` marks
//! high-confidence cells.
//!
//! `stable` does not imply `valid` (a zero-confidence cell passes a zero
//! threshold), so every consumer must AND with `valid` explicitly.

use crate::grid::OwnedGrid;
use crate::packed::rotate::rotate_into;
use crate::packed::{PackedPlane, Word};
use crate::util::{IrisCodeError, IrisCodeResult};

/// Byte-plane template pair produced by the feature extractor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IrisTemplate {
    code: OwnedGrid,
    confidence: OwnedGrid,
}

impl IrisTemplate {
    /// Builds a template from same-shaped code and confidence planes.
    pub fn new(code: OwnedGrid, confidence: OwnedGrid) -> IrisCodeResult<Self> {
        if code.width() != confidence.width() || code.height() != confidence.height() {
            return Err(IrisCodeError::ShapeMismatch {
                left_width: code.width(),
                left_height: code.height(),
                right_width: confidence.width(),
                right_height: confidence.height(),
            });
        }
        Ok(Self { code, confidence })
    }

    /// Returns the angular sample count.
    pub fn width(&self) -> usize {
        self.code.width()
    }

    /// Returns the radial sample count.
    pub fn height(&self) -> usize {
        self.code.height()
    }

    /// Returns the code byte plane.
    pub fn code(&self) -> &OwnedGrid {
        &self.code
    }

    /// Returns the confidence byte plane.
    pub fn confidence(&self) -> &OwnedGrid {
        &self.confidence
    }

    /// Returns true when both templates have identical shape.
    pub fn same_shape(&self, other: &IrisTemplate) -> bool {
        self.width() == other.width() && self.height() == other.height()
    }
}

/// Bit-packed template triple: code, valid and stable planes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedBundle<W: Word> {
    code: PackedPlane<W>,
    valid: PackedPlane<W>,
    stable: PackedPlane<W>,
}

impl<W: Word> PackedBundle<W> {
    /// Packs a template with the given stable-bit threshold.
    ///
    /// A code byte `> 0` packs as bit 1, mirroring the `valid` predicate on
    /// the confidence plane.
    pub fn pack(template: &IrisTemplate, stable_threshold: u8) -> IrisCodeResult<Self> {
        let code = PackedPlane::pack_bytes(template.code().view(), |b| b > 0)?;
        let valid = PackedPlane::pack_bytes(template.confidence().view(), |b| b > 0)?;
        let stable =
            PackedPlane::pack_bytes(template.confidence().view(), |b| b >= stable_threshold)?;
        Ok(Self {
            code,
            valid,
            stable,
        })
    }

    /// Rebuilds only the stable plane for a new threshold, leaving the code
    /// and valid planes untouched.
    pub fn repack_stable(
        &mut self,
        template: &IrisTemplate,
        stable_threshold: u8,
    ) -> IrisCodeResult<()> {
        if template.width() != self.width() || template.height() != self.height() {
            return Err(IrisCodeError::ShapeMismatch {
                left_width: self.width(),
                left_height: self.height(),
                right_width: template.width(),
                right_height: template.height(),
            });
        }
        self.stable =
            PackedPlane::pack_bytes(template.confidence().view(), |b| b >= stable_threshold)?;
        Ok(())
    }

    /// Rotates all three planes by `theta` columns into `dst`.
    pub fn rotate_into(&self, theta: i32, dst: &mut PackedBundle<W>) -> IrisCodeResult<()> {
        rotate_into(&self.code, theta, &mut dst.code)?;
        rotate_into(&self.valid, theta, &mut dst.valid)?;
        rotate_into(&self.stable, theta, &mut dst.stable)?;
        Ok(())
    }

    /// Returns the angular sample count.
    pub fn width(&self) -> usize {
        self.code.width()
    }

    /// Returns the radial sample count.
    pub fn height(&self) -> usize {
        self.code.height()
    }

    /// Returns the number of storage words per row.
    pub fn words_per_row(&self) -> usize {
        self.code.words_per_row()
    }

    /// Returns the packed code plane.
    pub fn code(&self) -> &PackedPlane<W> {
        &self.code
    }

    /// Returns the packed validity (non-occlusion) plane.
    pub fn valid(&self) -> &PackedPlane<W> {
        &self.valid
    }

    /// Returns the packed stable-bit plane.
    pub fn stable(&self) -> &PackedPlane<W> {
        &self.stable
    }

    /// Returns true when both bundles have identical shape.
    pub fn same_shape(&self, other: &PackedBundle<W>) -> bool {
        self.code.same_shape(&other.code)
    }
}

#[cfg(test)]
mod tests {
    use super::{IrisTemplate, PackedBundle};
    use crate::grid::OwnedGrid;

    fn template_4x2(code: [u8; 8], confidence: [u8; 8]) -> IrisTemplate {
        IrisTemplate::new(
            OwnedGrid::new(code.to_vec(), 4, 2).unwrap(),
            OwnedGrid::new(confidence.to_vec(), 4, 2).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_mismatched_planes() {
        let code = OwnedGrid::zeros(4, 2).unwrap();
        let confidence = OwnedGrid::zeros(4, 3).unwrap();
        assert!(IrisTemplate::new(code, confidence).is_err());
    }

    #[test]
    fn pack_derives_valid_and_stable_from_confidence() {
        let tpl = template_4x2([1, 0, 255, 0, 1, 1, 0, 0], [0, 10, 200, 255, 90, 0, 50, 130]);
        let bundle = PackedBundle::<u8>::pack(&tpl, 100).unwrap();
        for (i, (&conf, &code)) in tpl
            .confidence()
            .data()
            .iter()
            .zip(tpl.code().data())
            .enumerate()
        {
            let (col, row) = (i % 4, i / 4);
            assert_eq!(bundle.valid().bit(col, row), conf > 0);
            assert_eq!(bundle.stable().bit(col, row), conf >= 100);
            assert_eq!(bundle.code().bit(col, row), code > 0);
        }
    }

    #[test]
    fn repack_stable_keeps_code_and_valid() {
        let tpl = template_4x2([1, 0, 1, 0, 0, 1, 0, 1], [5, 50, 150, 250, 0, 120, 80, 200]);
        let mut bundle = PackedBundle::<u16>::pack(&tpl, 100).unwrap();
        let code_before = bundle.code().clone();
        let valid_before = bundle.valid().clone();
        bundle.repack_stable(&tpl, 200).unwrap();
        assert_eq!(bundle.code(), &code_before);
        assert_eq!(bundle.valid(), &valid_before);
        assert!(bundle.stable().bit(3, 0));
        assert!(!bundle.stable().bit(2, 0));
    }

    #[test]
    fn zero_threshold_marks_occluded_cells_stable() {
        // stable does not imply valid: consumers must AND with valid.
        let tpl = template_4x2([0; 8], [0, 1, 2, 3, 0, 0, 0, 0]);
        let bundle = PackedBundle::<u32>::pack(&tpl, 0).unwrap();
        assert!(bundle.stable().bit(0, 0));
        assert!(!bundle.valid().bit(0, 0));
    }
}
