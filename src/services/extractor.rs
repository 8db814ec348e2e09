use crate::{
    error::ExtractError,
    models::{FeatureVector, NormalizedImage},
};

/// Feature policy: reduces a normalized image to a fixed-length vector
///
/// Implementations must be pure. The pipeline and the recommender only rely
/// on `dimensions()` agreeing between the query and the catalog.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, image: &NormalizedImage) -> Result<FeatureVector, ExtractError>;

    /// Stable policy name, used in cache keys and logs
    fn name(&self) -> &str;

    fn dimensions(&self) -> usize;
}

/// Mean intensity per channel, in R, G, B order on the 0-255 scale
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanColorExtractor;

impl FeatureExtractor for MeanColorExtractor {
    fn extract(&self, image: &NormalizedImage) -> Result<FeatureVector, ExtractError> {
        let pixels = image.pixels().ok_or(ExtractError::EmptyImage)?;

        let count = (pixels.width() as u64) * (pixels.height() as u64);
        if count == 0 {
            return Err(ExtractError::EmptyImage);
        }

        let mut sums = [0u64; 3];
        for pixel in pixels.pixels() {
            for (sum, channel) in sums.iter_mut().zip(pixel.0.iter()) {
                *sum += *channel as u64;
            }
        }

        Ok(FeatureVector::new(
            sums.iter().map(|sum| *sum as f64 / count as f64).collect(),
        ))
    }

    fn name(&self) -> &str {
        "mean_rgb"
    }

    fn dimensions(&self) -> usize {
        3
    }
}

/// Per-channel color histogram, each channel normalized to sum to 1
///
/// Layout is all red bins, then green, then blue.
#[derive(Debug, Clone)]
pub struct ColorHistogramExtractor {
    bins_per_channel: usize,
    name: String,
}

impl ColorHistogramExtractor {
    /// `bins_per_channel` is clamped to 1..=256
    pub fn new(bins_per_channel: usize) -> Self {
        let bins_per_channel = bins_per_channel.clamp(1, 256);
        Self {
            bins_per_channel,
            name: format!("histogram{}", bins_per_channel),
        }
    }

    fn bin_for(&self, value: u8) -> usize {
        (value as usize * self.bins_per_channel) / 256
    }
}

impl FeatureExtractor for ColorHistogramExtractor {
    fn extract(&self, image: &NormalizedImage) -> Result<FeatureVector, ExtractError> {
        let pixels = image.pixels().ok_or(ExtractError::EmptyImage)?;

        let count = (pixels.width() as u64) * (pixels.height() as u64);
        if count == 0 {
            return Err(ExtractError::EmptyImage);
        }

        let bins = self.bins_per_channel;
        let mut histogram = vec![0u64; bins * 3];
        for pixel in pixels.pixels() {
            for (channel, value) in pixel.0.iter().enumerate() {
                histogram[channel * bins + self.bin_for(*value)] += 1;
            }
        }

        Ok(FeatureVector::new(
            histogram
                .into_iter()
                .map(|hits| hits as f64 / count as f64)
                .collect(),
        ))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        self.bins_per_channel * 3
    }
}
