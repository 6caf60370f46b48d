//! Convenience helpers for loading template rasters via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Enrolled templates are
//! persisted as grayscale rasters: one code image and one confidence image
//! per class.

use crate::grid::OwnedGrid;
use crate::util::{IrisCodeError, IrisCodeResult};
use std::path::Path;

/// Creates an owned plane from a grayscale image buffer.
pub fn grid_from_gray_image(img: &image::GrayImage) -> IrisCodeResult<OwnedGrid> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    OwnedGrid::new(img.as_raw().clone(), width, height)
}

/// Loads an image from disk and converts it to a grayscale owned plane.
pub fn load_gray_plane<P: AsRef<Path>>(path: P) -> IrisCodeResult<OwnedGrid> {
    let img = image::open(path).map_err(|err| IrisCodeError::ImageIo {
        reason: err.to_string(),
    })?;
    grid_from_gray_image(&img.to_luma8())
}
