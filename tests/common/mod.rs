#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cover_match::{
    error::FetchError,
    models::{CatalogItem, NormalizedImage},
    services::{
        extractor::MeanColorExtractor, fetcher::ImageFetcher, pipeline::CatalogPipeline,
    },
};
use image::{ImageFormat, Rgb, RgbImage};

/// Encodes a solid-color PNG
pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb(color));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encode png");
    bytes.into_inner()
}

/// Serves solid images for `color:r,g,b`; anything else is unreachable
pub struct SolidColorFetcher;

pub fn parse_color(reference: &str) -> Result<[u8; 3], FetchError> {
    let channels = reference
        .strip_prefix("color:")
        .ok_or_else(|| FetchError::Unreachable(format!("no route to {}", reference)))?;

    let parsed: Vec<u8> = channels
        .split(',')
        .map(|c| c.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|e| FetchError::DecodeFailed(e.to_string()))?;

    match parsed.as_slice() {
        [r, g, b] => Ok([*r, *g, *b]),
        _ => Err(FetchError::DecodeFailed(format!("bad color {}", channels))),
    }
}

pub fn solid(color: [u8; 3]) -> NormalizedImage {
    NormalizedImage::Pixels(RgbImage::from_pixel(6, 6, Rgb(color)))
}

#[async_trait]
impl ImageFetcher for SolidColorFetcher {
    async fn fetch(&self, reference: &str) -> Result<NormalizedImage, FetchError> {
        parse_color(reference).map(solid)
    }
}

/// Sleeps per fetch and records the peak number of concurrent fetches
pub struct TrackingFetcher {
    pub delay: Duration,
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
}

impl TrackingFetcher {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for TrackingFetcher {
    async fn fetch(&self, reference: &str) -> Result<NormalizedImage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        parse_color(reference).map(solid)
    }
}

pub fn movie(id: i64, reference: &str) -> CatalogItem {
    CatalogItem::new(id, format!("Movie {}", id), "Drama", reference)
}

pub fn color_pipeline(limit: usize) -> CatalogPipeline {
    CatalogPipeline::new(
        Arc::new(SolidColorFetcher),
        Arc::new(MeanColorExtractor),
        limit,
    )
    .expect("valid pipeline")
}
