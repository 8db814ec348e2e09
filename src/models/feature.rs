use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, ItemError};

use super::{CatalogItem, ItemId};

/// Target size every image is resized to before feature extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Cover size used by the poster catalog
    pub const POSTER: Resolution = Resolution {
        width: 67,
        height: 98,
    };

    pub fn new(width: u32, height: u32) -> AppResult<Self> {
        if width == 0 || height == 0 {
            return Err(AppError::InvalidInput(format!(
                "target resolution must be non-zero, got {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::POSTER
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A decoded image resized to the configured [`Resolution`]
///
/// `Empty` stands in for anything that could not produce pixels. Extractors
/// refuse it, so it can never be scored as a black image.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedImage {
    Empty,
    Pixels(RgbImage),
}

impl NormalizedImage {
    pub fn is_empty(&self) -> bool {
        matches!(self, NormalizedImage::Empty)
    }

    pub fn pixels(&self) -> Option<&RgbImage> {
        match self {
            NormalizedImage::Empty => None,
            NormalizedImage::Pixels(image) => Some(image),
        }
    }
}

/// Fixed-length numeric summary of an image
///
/// Only vectors produced by the same extractor are comparable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn dot(&self, other: &FeatureVector) -> f64 {
        self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum()
    }

    /// Euclidean norm
    pub fn magnitude(&self) -> f64 {
        self.0.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// A catalog item with the feature vector of its cover
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredItem {
    pub item: CatalogItem,
    pub features: FeatureVector,
}

impl ScoredItem {
    pub fn new(item: CatalogItem, features: FeatureVector) -> Self {
        Self { item, features }
    }
}

/// A catalog item that could not be featured in this run
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    pub item_id: ItemId,
    pub image_reference: String,
    pub error: ItemError,
}

/// Result of one pass over the catalog
///
/// Both lists are sorted by item id regardless of completion order.
#[derive(Debug, Clone, Default)]
pub struct CatalogRun {
    pub scored: Vec<ScoredItem>,
    pub failures: Vec<ItemFailure>,
    /// True when the run was cut short by a cancellation signal
    pub cancelled: bool,
}

impl CatalogRun {
    pub fn total(&self) -> usize {
        self.scored.len() + self.failures.len()
    }
}
