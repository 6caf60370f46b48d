//! Bit-packed template planes.
//!
//! One plane stores one bit per grid cell in `height` independent rows of
//! fixed-width words. Bit order within a row is significant: column 0 is the
//! most significant bit of word 0 and increasing column index moves toward
//! less significant bits, continuing into subsequent words. When the width is
//! not a multiple of the word size, the trailing bits of the last word of
//! every row are zero and never contribute to any count.

use crate::grid::{GridView, OwnedGrid};
use crate::util::{IrisCodeError, IrisCodeResult};

pub mod rotate;
mod word;

pub use word::Word;

/// One packed bit plane with `height` rows of `words_per_row` words.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedPlane<W: Word> {
    words: Vec<W>,
    width: usize,
    height: usize,
    words_per_row: usize,
}

impl<W: Word> PackedPlane<W> {
    /// Packs a plane from a per-cell predicate, iterating columns left to
    /// right within each row.
    ///
    /// Each new bit enters at the least significant position of an
    /// accumulator, left-shifting the bits packed before it; a partial last
    /// word is finally left-shifted so its valid bits occupy the high end.
    pub fn from_fn<F>(width: usize, height: usize, mut bit: F) -> IrisCodeResult<Self>
    where
        F: FnMut(usize, usize) -> bool,
    {
        if width == 0 || height == 0 {
            return Err(IrisCodeError::InvalidDimensions { width, height });
        }
        let words_per_row = width.div_ceil(W::BITS);
        let total = words_per_row
            .checked_mul(height)
            .ok_or(IrisCodeError::InvalidDimensions { width, height })?;

        let mut words = Vec::with_capacity(total);
        for row in 0..height {
            let mut acc = W::ZERO;
            let mut filled = 0usize;
            for col in 0..width {
                acc = (acc << 1) | if bit(col, row) { W::LSB } else { W::ZERO };
                filled += 1;
                if filled == W::BITS {
                    words.push(acc);
                    acc = W::ZERO;
                    filled = 0;
                }
            }
            if filled > 0 {
                words.push(acc << (W::BITS - filled) as u32);
            }
        }
        debug_assert_eq!(words.len(), total);

        Ok(Self {
            words,
            width,
            height,
            words_per_row,
        })
    }

    /// Packs a byte plane, mapping every byte satisfying `pred` to bit 1.
    pub fn pack_bytes<F>(plane: GridView<'_>, mut pred: F) -> IrisCodeResult<Self>
    where
        F: FnMut(u8) -> bool,
    {
        Self::from_fn(plane.width(), plane.height(), |col, row| {
            // Shape was validated by the view constructor.
            pred(plane.get(col, row).unwrap_or(0))
        })
    }

    /// Creates an all-zero plane of the given shape.
    pub fn zeros(width: usize, height: usize) -> IrisCodeResult<Self> {
        Self::from_fn(width, height, |_, _| false)
    }

    /// Unpacks into a byte plane of `0`/`1` values (exact inverse of
    /// [`PackedPlane::from_fn`] for binary input).
    pub fn unpack(&self) -> OwnedGrid {
        let mut data = Vec::with_capacity(self.width * self.height);
        for row in 0..self.height {
            for col in 0..self.width {
                data.push(u8::from(self.bit(col, row)));
            }
        }
        OwnedGrid::new(data, self.width, self.height).expect("packed shape is valid")
    }

    /// Returns the angular sample count.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the radial sample count.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of storage words per row.
    pub fn words_per_row(&self) -> usize {
        self.words_per_row
    }

    /// Returns the full word buffer in row-major order.
    ///
    /// Padding bits are guaranteed zero, so whole-buffer bitwise reductions
    /// over two same-shaped planes are exact.
    pub fn words(&self) -> &[W] {
        &self.words
    }

    pub(crate) fn words_mut(&mut self) -> &mut [W] {
        &mut self.words
    }

    /// Returns the words of one row.
    pub fn row_words(&self, row: usize) -> &[W] {
        let start = row * self.words_per_row;
        &self.words[start..start + self.words_per_row]
    }

    /// Returns the bit at `(column, row)`.
    pub fn bit(&self, column: usize, row: usize) -> bool {
        debug_assert!(column < self.width && row < self.height);
        let word = self.words[row * self.words_per_row + column / W::BITS];
        let shift = (W::BITS - 1 - column % W::BITS) as u32;
        (word >> shift) & W::LSB != W::ZERO
    }

    /// Mask of the valid (non-padding) bits of the last word in a row.
    pub(crate) fn tail_mask(&self) -> W {
        let rem = self.width % W::BITS;
        if rem == 0 {
            W::ONES
        } else {
            W::ONES << (W::BITS - rem) as u32
        }
    }

    /// Returns true when both planes have identical width and height.
    pub fn same_shape(&self, other: &PackedPlane<W>) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Total number of set bits in the plane.
    pub fn count_ones(&self) -> u64 {
        self.words.iter().map(|w| u64::from(w.popcount())).sum()
    }
}

/// Shape-mismatch check shared by the bitwise reductions.
pub(crate) fn check_same_shape<W: Word>(
    a: &PackedPlane<W>,
    b: &PackedPlane<W>,
) -> IrisCodeResult<()> {
    if !a.same_shape(b) {
        return Err(IrisCodeError::ShapeMismatch {
            left_width: a.width(),
            left_height: a.height(),
            right_width: b.width(),
            right_height: b.height(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::PackedPlane;

    #[test]
    fn column_zero_is_msb_of_word_zero() {
        let plane = PackedPlane::<u8>::from_fn(8, 1, |col, _| col == 0).unwrap();
        assert_eq!(plane.words(), &[0b1000_0000u8]);
    }

    #[test]
    fn partial_last_word_is_left_aligned() {
        // width 5: bits occupy the top 5 positions, tail is zero.
        let plane = PackedPlane::<u8>::from_fn(5, 1, |col, _| col == 4).unwrap();
        assert_eq!(plane.words(), &[0b0000_1000u8]);
        assert_eq!(plane.words_per_row(), 1);
    }

    #[test]
    fn rows_are_word_aligned() {
        let plane = PackedPlane::<u8>::from_fn(5, 3, |_, row| row == 1).unwrap();
        assert_eq!(plane.words(), &[0b0000_0000, 0b1111_1000, 0b0000_0000]);
    }

    #[test]
    fn bit_accessor_matches_packing_order() {
        let plane = PackedPlane::<u16>::from_fn(21, 2, |col, row| (col + row) % 3 == 0).unwrap();
        for row in 0..2 {
            for col in 0..21 {
                assert_eq!(plane.bit(col, row), (col + row) % 3 == 0);
            }
        }
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(PackedPlane::<u32>::from_fn(0, 4, |_, _| false).is_err());
        assert!(PackedPlane::<u32>::from_fn(4, 0, |_, _| false).is_err());
    }
}
