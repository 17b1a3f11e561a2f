// service/watermark_service.rs
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, ImageOutputFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use reqwest::Client;
use rusttype::{Font, Scale};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    dtos::functiondtos::WatermarkResultDto,
    service::storage::{StorageBackend, StorageError},
};

pub const WATERMARK_BUCKET: &str = "property-images";
pub const WATERMARK_PREFIX: &str = "watermarked";

const MARK_OPACITY: f32 = 0.35;
const MARK_COLOR: [u8; 3] = [255, 255, 255];
const MAX_SOURCE_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("Failed to fetch source image: {0}")]
    Fetch(String),

    #[error("Source image could not be decoded: {0}")]
    Decode(String),

    #[error("Watermarked image could not be encoded: {0}")]
    Encode(String),

    #[error("Watermark font unavailable: {0}")]
    FontUnavailable(String),

    #[error("Failed to store watermarked image: {0}")]
    Upload(#[from] StorageError),

    #[error("Only images held in our storage can be watermarked: {0}")]
    ForeignSource(String),

    #[error("Watermark worker stopped: {0}")]
    Worker(String),
}

#[async_trait]
pub trait Watermarker: Send + Sync {
    async fn watermark(&self, image_url: &str) -> Result<WatermarkResultDto, WatermarkError>;
}

pub struct WatermarkService {
    client: Client,
    storage: Arc<dyn StorageBackend>,
    font: Option<Font<'static>>,
    text: String,
}

impl WatermarkService {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        font_path: &str,
        text: &str,
        timeout: Duration,
    ) -> Self {
        let font = match std::fs::read(font_path) {
            Ok(bytes) => {
                let font = Font::try_from_vec(bytes);
                if font.is_none() {
                    tracing::warn!("Watermark font at {} is not a valid TrueType font", font_path);
                }
                font
            }
            Err(e) => {
                tracing::warn!("Watermark font {} could not be read: {}", font_path, e);
                None
            }
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            storage,
            font,
            text: text.to_string(),
        }
    }

    async fn fetch_image(&self, image_url: &str) -> Result<Vec<u8>, WatermarkError> {
        let response = self
            .client
            .get(image_url)
            .send()
            .await
            .map_err(|e| WatermarkError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WatermarkError::Fetch(format!(
                "{} answered {}",
                image_url,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| WatermarkError::Fetch(e.to_string()))?;

        if bytes.len() > MAX_SOURCE_BYTES {
            return Err(WatermarkError::Fetch(format!(
                "source image is {} bytes, above the {} byte limit",
                bytes.len(),
                MAX_SOURCE_BYTES
            )));
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Watermarker for WatermarkService {
    async fn watermark(&self, image_url: &str) -> Result<WatermarkResultDto, WatermarkError> {
        if !self.storage.owns_url(image_url) {
            return Err(WatermarkError::ForeignSource(image_url.to_string()));
        }

        let font = self
            .font
            .clone()
            .ok_or_else(|| WatermarkError::FontUnavailable("no font loaded".to_string()))?;

        let source = self.fetch_image(image_url).await?;
        let png = render_watermark(source, font, self.text.clone()).await?;

        let key = format!("{}/{}.png", WATERMARK_PREFIX, Uuid::new_v4());
        let watermarked_url = self
            .storage
            .upload(WATERMARK_BUCKET, &key, png, "image/png")
            .await?;

        tracing::info!("Watermarked {} -> {}", image_url, watermarked_url);

        Ok(WatermarkResultDto {
            watermarked_url,
            original_url: image_url.to_string(),
        })
    }
}

/// Decodes, stamps and re-encodes on the blocking pool.
pub async fn render_watermark(
    source: Vec<u8>,
    font: Font<'static>,
    text: String,
) -> Result<Vec<u8>, WatermarkError> {
    tokio::task::spawn_blocking(move || {
        let image =
            image::load_from_memory(&source).map_err(|e| WatermarkError::Decode(e.to_string()))?;
        encode_png(&stamp(&image, &font, &text))
    })
    .await
    .map_err(|e| WatermarkError::Worker(e.to_string()))?
}

/// Draws one large centred mark and two smaller corner marks, blended over
/// the original pixels at `MARK_OPACITY`.
pub fn stamp(image: &DynamicImage, font: &Font<'_>, text: &str) -> RgbaImage {
    let (width, height) = image.dimensions();
    let mut base = image.to_rgba8();
    if width == 0 || height == 0 || text.trim().is_empty() {
        return base;
    }

    let mut layer = RgbaImage::new(width, height);
    let white = Rgba([255, 255, 255, 255]);
    let short_side = width.min(height) as f32;

    // Large centred mark, shrunk until it fits 90% of the width.
    let mut scale = Scale::uniform((short_side * 0.15).max(12.0));
    let (mut text_w, mut text_h) = text_size(scale, font, text);
    let max_w = width as f32 * 0.9;
    if text_w as f32 > max_w && text_w > 0 {
        let factor = max_w / text_w as f32;
        scale = Scale::uniform((scale.x * factor).max(6.0));
        let (w, h) = text_size(scale, font, text);
        text_w = w;
        text_h = h;
    }
    let x = (width as i32 - text_w) / 2;
    let y = (height as i32 - text_h) / 2;
    draw_text_mut(&mut layer, white, x, y, scale, font, text);

    // Corner marks
    let small = Scale::uniform((short_side * 0.05).max(8.0));
    let (small_w, small_h) = text_size(small, font, text);
    let margin = (short_side * 0.03) as i32;
    draw_text_mut(&mut layer, white, margin, margin, small, font, text);
    draw_text_mut(
        &mut layer,
        white,
        width as i32 - small_w - margin,
        height as i32 - small_h - margin,
        small,
        font,
        text,
    );

    for (x, y, pixel) in base.enumerate_pixels_mut() {
        let coverage = layer.get_pixel(x, y)[3] as f32 / 255.0;
        if coverage <= 0.0 {
            continue;
        }
        let alpha = coverage * MARK_OPACITY;
        for channel in 0..3 {
            let blended = pixel[channel] as f32 * (1.0 - alpha) + MARK_COLOR[channel] as f32 * alpha;
            pixel[channel] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }

    base
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, WatermarkError> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut buffer, ImageOutputFormat::Png)
        .map_err(|e| WatermarkError::Encode(e.to_string()))?;
    Ok(buffer.into_inner())
}

pub fn is_watermarked(url: &str) -> bool {
    url.contains(&format!("/{}/", WATERMARK_PREFIX))
}

/// Source to display for a freshly uploaded property photo. Already
/// watermarked or external URLs pass through; any watermark failure falls
/// back to the original URL without surfacing an error.
pub async fn resolve_display_source(
    watermarker: &dyn Watermarker,
    storage: &dyn StorageBackend,
    source: String,
) -> String {
    if source.is_empty() || is_watermarked(&source) || !storage.owns_url(&source) {
        return source;
    }

    match watermarker.watermark(&source).await {
        Ok(result) => result.watermarked_url,
        Err(e) => {
            tracing::warn!("Watermark failed for {}, keeping original: {}", source, e);
            source
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::service::storage::LocalStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct FailingWatermarker {
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl Watermarker for FailingWatermarker {
        async fn watermark(&self, _image_url: &str) -> Result<WatermarkResultDto, WatermarkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(WatermarkError::Fetch("connection refused".to_string()))
        }
    }

    pub struct SuffixWatermarker;

    #[async_trait]
    impl Watermarker for SuffixWatermarker {
        async fn watermark(&self, image_url: &str) -> Result<WatermarkResultDto, WatermarkError> {
            let name = image_url.rsplit('/').next().unwrap_or_default();
            Ok(WatermarkResultDto {
                watermarked_url: format!("http://storage.test/files/property-images/watermarked/{}", name),
                original_url: image_url.to_string(),
            })
        }
    }

    fn test_font() -> Font<'static> {
        let bytes = std::fs::read(FONT_PATH).expect("bundled font");
        Font::try_from_vec(bytes).expect("valid font")
    }

    const FONT_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/fonts/watermark.ttf");

    fn local_storage() -> LocalStorage {
        LocalStorage::new(std::env::temp_dir(), "http://storage.test".to_string())
    }

    #[test]
    fn stamp_keeps_dimensions_and_only_lightens_pixels() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(320, 200, Rgba([40, 60, 80, 255])));
        let stamped = stamp(&source, &test_font(), "INMOBILIARIA");

        assert_eq!(stamped.dimensions(), (320, 200));

        let mut changed = 0;
        for pixel in stamped.pixels() {
            assert!(pixel[0] >= 40 && pixel[1] >= 60 && pixel[2] >= 80);
            assert_eq!(pixel[3], 255);
            if pixel[0] != 40 {
                changed += 1;
            }
        }
        assert!(changed > 0, "mark must touch some pixels");

        // Untouched centre-left edge stays the original colour.
        assert_eq!(*stamped.get_pixel(0, 100), Rgba([40, 60, 80, 255]));
    }

    #[test]
    fn encoded_output_is_png() {
        let image = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let bytes = encode_png(&image).unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[tokio::test]
    async fn failing_watermark_falls_back_to_original_source() {
        let watermarker = FailingWatermarker { calls: AtomicUsize::new(0) };
        let source = "http://storage.test/files/property-images/a.jpg".to_string();

        let shown = resolve_display_source(&watermarker, &local_storage(), source.clone()).await;

        assert_eq!(shown, source);
        assert_eq!(watermarker.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn external_and_already_marked_sources_are_not_watermarked() {
        let watermarker = FailingWatermarker { calls: AtomicUsize::new(0) };
        let storage = local_storage();

        let external = "https://images.example.com/casa.jpg".to_string();
        assert_eq!(
            resolve_display_source(&watermarker, &storage, external.clone()).await,
            external
        );

        let marked = "http://storage.test/files/property-images/watermarked/x.png".to_string();
        assert_eq!(
            resolve_display_source(&watermarker, &storage, marked.clone()).await,
            marked
        );

        assert_eq!(watermarker.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_watermark_swaps_the_source() {
        let shown = resolve_display_source(
            &SuffixWatermarker,
            &local_storage(),
            "http://storage.test/files/property-images/b.jpg".to_string(),
        )
        .await;
        assert_eq!(shown, "http://storage.test/files/property-images/watermarked/b.jpg");
    }

    #[tokio::test]
    async fn sources_outside_our_storage_are_refused() {
        let service = WatermarkService::new(
            Arc::new(local_storage()),
            FONT_PATH,
            "INMOBILIARIA",
            Duration::from_secs(1),
        );

        for url in [
            "http://169.254.169.254/latest/meta-data/",
            "http://localhost:5432/",
            "https://images.example.com/casa.jpg",
        ] {
            let err = service.watermark(url).await.unwrap_err();
            assert!(matches!(err, WatermarkError::ForeignSource(_)), "{} must be refused", url);
        }
    }

    #[tokio::test]
    async fn rendering_produces_png_from_encoded_source() {
        let source = encode_png(&RgbaImage::from_pixel(120, 80, Rgba([10, 20, 30, 255]))).unwrap();

        let png = render_watermark(source, test_font(), "INMOBILIARIA".to_string())
            .await
            .unwrap();

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.dimensions(), (120, 80));
    }

    #[tokio::test]
    async fn undecodable_source_is_a_decode_error() {
        let err = render_watermark(b"not an image".to_vec(), test_font(), "X".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, WatermarkError::Decode(_)));
    }
}
