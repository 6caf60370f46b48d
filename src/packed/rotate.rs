//! Cyclic angular rotation of packed planes.
//!
//! Every row is rotated independently by the same column offset; rotation
//! never moves bits between rows and never changes the plane shape. The shift
//! is performed as two multiword shifts recombined with bitwise OR, followed
//! by re-masking the trailing unused bits of the last word of every row.

use crate::packed::{check_same_shape, PackedPlane, Word};
use crate::util::IrisCodeResult;

/// Rotates `src` by `theta` columns into `dst` (same shape required).
///
/// Positive `theta` moves content toward lower column indices (a left cyclic
/// rotation); negative values rotate the other way. The effective offset is
/// `theta mod width`.
pub fn rotate_into<W: Word>(
    src: &PackedPlane<W>,
    theta: i32,
    dst: &mut PackedPlane<W>,
) -> IrisCodeResult<()> {
    check_same_shape(src, dst)?;

    let width = src.width();
    let k = (i64::from(theta)).rem_euclid(width as i64) as usize;
    if k == 0 {
        dst.words_mut().copy_from_slice(src.words());
        return Ok(());
    }

    let wpr = src.words_per_row();
    let tail = src.tail_mask();
    for row in 0..src.height() {
        let start = row * wpr;
        let src_row = &src.words()[start..start + wpr];
        for i in 0..wpr {
            let word = shifted_left(src_row, i, k) | shifted_right(src_row, i, width - k);
            dst.words_mut()[start + i] = word;
        }
        dst.words_mut()[start + wpr - 1] = dst.words()[start + wpr - 1] & tail;
    }
    Ok(())
}

/// Rotates `src` by `theta` columns into a fresh plane.
pub fn rotated<W: Word>(src: &PackedPlane<W>, theta: i32) -> PackedPlane<W> {
    let mut dst = src.clone();
    rotate_into(src, theta, &mut dst).expect("clone preserves shape");
    dst
}

/// Word `i` of the row bit-string logically shifted left by `bits`.
#[inline]
fn shifted_left<W: Word>(row: &[W], i: usize, bits: usize) -> W {
    let whole = bits / W::BITS;
    let rem = (bits % W::BITS) as u32;
    let hi = row.get(i + whole).copied().unwrap_or(W::ZERO);
    if rem == 0 {
        hi
    } else {
        let lo = row.get(i + whole + 1).copied().unwrap_or(W::ZERO);
        (hi << rem) | (lo >> (W::BITS as u32 - rem))
    }
}

/// Word `i` of the row bit-string logically shifted right by `bits`.
#[inline]
fn shifted_right<W: Word>(row: &[W], i: usize, bits: usize) -> W {
    let whole = bits / W::BITS;
    let rem = (bits % W::BITS) as u32;
    let lo = i
        .checked_sub(whole)
        .and_then(|idx| row.get(idx).copied())
        .unwrap_or(W::ZERO);
    if rem == 0 {
        lo
    } else {
        let hi = i
            .checked_sub(whole + 1)
            .and_then(|idx| row.get(idx).copied())
            .unwrap_or(W::ZERO);
        (lo >> rem) | (hi << (W::BITS as u32 - rem))
    }
}
