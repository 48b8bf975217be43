//! Reference rasters for the pixel-value selection strategies.

use crate::model::Point;
use crate::selection::candidate::Candidate;
use image::GrayImage;
use std::path::{Path, PathBuf};

/// Extensions probed for the reference image of a candidate, in order.
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "tif", "tiff"];

/// Grey-level image a time point was annotated on.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pixels: GrayImage,
}

impl ReferenceImage {
    /// Opens the image at `path`, converting it to 8-bit grey levels.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, image::ImageError> {
        Ok(Self::from_gray(image::open(path)?.to_luma8()))
    }

    pub fn from_gray(pixels: GrayImage) -> Self {
        Self { pixels }
    }

    /// Returns the first existing image sharing the stem of `candidate`.
    pub fn locate(candidate: &Candidate) -> Option<PathBuf> {
        IMAGE_EXTENSIONS.iter()
            .map(|extension| candidate.sibling_with_extension(extension))
            .find(|path| path.is_file())
    }

    /// Grey level at the pixel containing `point`, or `None` outside the image.
    pub fn value_at(&self, point: Point) -> Option<f64> {
        if point.x < 0.0 || point.y < 0.0 || !point.x.is_finite() || !point.y.is_finite() {
            return None;
        }

        let (x, y) = (point.x as u32, point.y as u32);
        if x >= self.pixels.width() || y >= self.pixels.height() {
            return None;
        }

        Some(f64::from(self.pixels.get_pixel(x, y).0[0]))
    }

    /// Smallest `|value - target|` over the points inside the image.
    pub fn closest_distance<I: IntoIterator<Item = Point>>(&self, points: I, target: f64) -> Option<f64> {
        points.into_iter()
            .filter_map(|point| self.value_at(point))
            .map(|value| (value - target).abs())
            .min_by(f64::total_cmp)
    }
}
