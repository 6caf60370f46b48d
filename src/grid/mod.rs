//! Byte grids delivered by the feature extractor.
//!
//! `GridView` is a borrowed 2D view into a 1D byte buffer with an explicit
//! stride. The stride counts elements between the starts of consecutive rows,
//! so a stride larger than the width represents padded rows. The width is the
//! angular sample count and the height the radial sample count (possibly
//! doubled when real/imaginary filter responses are interleaved).

use crate::util::{IrisCodeError, IrisCodeResult};

#[cfg(feature = "image-io")]
pub mod io;

/// Borrowed 2D byte-plane view with an explicit stride.
#[derive(Copy, Clone)]
pub struct GridView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a> GridView<'a> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [u8], width: usize, height: usize) -> IrisCodeResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [u8], width: usize, height: usize, stride: usize) -> IrisCodeResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(IrisCodeError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the angular sample count.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the radial sample count.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the element at `(column, row)` if it is within bounds.
    pub fn get(&self, column: usize, row: usize) -> Option<u8> {
        if column >= self.width || row >= self.height {
            return None;
        }
        let idx = row.checked_mul(self.stride)?.checked_add(column)?;
        self.data.get(idx).copied()
    }

    /// Returns a contiguous slice for `row` with length `width`.
    pub fn row(&self, row: usize) -> Option<&'a [u8]> {
        if row >= self.height {
            return None;
        }
        let start = row.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }

    /// Returns true when the two views have identical width and height.
    pub fn same_shape(&self, other: &GridView<'_>) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// Owned contiguous byte plane.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedGrid {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl OwnedGrid {
    /// Creates an owned plane from a contiguous buffer of exactly
    /// `width * height` bytes.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> IrisCodeResult<Self> {
        let needed = required_len(width, height, width)?;
        if data.len() < needed {
            return Err(IrisCodeError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(IrisCodeError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Creates a zero-filled plane.
    pub fn zeros(width: usize, height: usize) -> IrisCodeResult<Self> {
        required_len(width, height, width)?;
        Ok(Self {
            data: vec![0u8; width * height],
            width,
            height,
        })
    }

    /// Returns the angular sample count.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the radial sample count.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the backing buffer in row-major order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a mutable reference to the backing buffer.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Returns a borrowed view of the plane.
    pub fn view(&self) -> GridView<'_> {
        GridView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> IrisCodeResult<usize> {
    if width == 0 || height == 0 {
        return Err(IrisCodeError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(IrisCodeError::InvalidStride { width, stride });
    }
    let needed = (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(IrisCodeError::InvalidDimensions { width, height })?;
    Ok(needed)
}

#[cfg(test)]
mod tests {
    use super::{GridView, OwnedGrid};

    #[test]
    fn view_rejects_short_buffer() {
        let data = vec![0u8; 5];
        assert!(GridView::from_slice(&data, 3, 2).is_err());
    }

    #[test]
    fn strided_view_reads_rows() {
        let data: Vec<u8> = (0..12).collect();
        let view = GridView::new(&data, 3, 3, 4).unwrap();
        assert_eq!(view.row(1).unwrap(), &[4, 5, 6]);
        assert_eq!(view.get(2, 2), Some(10));
        assert_eq!(view.get(3, 0), None);
    }

    #[test]
    fn owned_grid_rejects_zero_dims() {
        assert!(OwnedGrid::zeros(0, 4).is_err());
        assert!(OwnedGrid::zeros(4, 0).is_err());
    }
}
