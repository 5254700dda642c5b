//! Pixel work on fetched and generated images
//!
//! Everything here is CPU bound and synchronous; callers run it through
//! [`blocking`] so the runtime threads stay free.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage, imageops::FilterType};

use crate::error::{ImageGenError, Result};

/// Run image work on the blocking pool
pub(crate) async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        tracing::error!(error = %e, "image task panicked");
        ImageGenError::InternalError(None)
    })?
}

/// Flatten, fit and center an input image on an opaque canvas, as PNG
pub(crate) fn normalize(bytes: &[u8], width: u32, height: u32, background: [u8; 3]) -> Result<Vec<u8>> {
    let source = image::load_from_memory(bytes)
        .map_err(|e| ImageGenError::InvalidRequest(format!("Cannot decode input image: {e}")))?;

    let flattened = flatten(&source.to_rgba8(), background);
    let fitted = DynamicImage::ImageRgb8(flattened)
        .resize(width, height, FilterType::Lanczos3)
        .to_rgb8();

    let mut canvas = RgbImage::from_pixel(width, height, Rgb(background));
    let x = i64::from((width - fitted.width()) / 2);
    let y = i64::from((height - fitted.height()) / 2);
    image::imageops::overlay(&mut canvas, &fitted, x, y);

    encode_png(&DynamicImage::ImageRgb8(canvas))
}

/// Alpha-composite every pixel onto a solid background
fn flatten(rgba: &RgbaImage, background: [u8; 3]) -> RgbImage {
    let mut flattened = RgbImage::new(rgba.width(), rgba.height());

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend = |channel: u8, bg: u8| -> u8 {
            #[allow(clippy::cast_possible_truncation)]
            let mixed = ((u16::from(channel) * alpha) + (u16::from(bg) * (255 - alpha))) / 255;
            mixed as u8
        };

        flattened.put_pixel(
            x,
            y,
            Rgb([
                blend(pixel[0], background[0]),
                blend(pixel[1], background[1]),
                blend(pixel[2], background[2]),
            ]),
        );
    }

    flattened
}

/// Fully transparent PNG: the whole image is editable
pub(crate) fn transparent_mask(width: u32, height: u32) -> Result<Vec<u8>> {
    encode_png(&DynamicImage::ImageRgba8(RgbaImage::new(width, height)))
}

/// Scale a caller-supplied mask to the canvas, keeping its alpha channel
pub(crate) fn fit_mask(bytes: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mask = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| ImageGenError::InvalidRequest(format!("Cannot decode mask: {e}")))?
        .to_rgba8();

    let mask = if mask.dimensions() == (width, height) {
        mask
    } else {
        image::imageops::resize(&mask, width, height, FilterType::Nearest)
    };

    encode_png(&DynamicImage::ImageRgba8(mask))
}

/// Re-encode provider output as PNG unless it already is one
pub(crate) fn ensure_png(bytes: Vec<u8>) -> Result<Vec<u8>> {
    match image::guess_format(&bytes) {
        Ok(ImageFormat::Png) => Ok(bytes),
        _ => {
            let decoded =
                image::load_from_memory(&bytes).map_err(|e| ImageGenError::UndecodableImage(e.to_string()))?;
            encode_png(&decoded)
        }
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());

    image.write_to(&mut buffer, ImageFormat::Png).map_err(|e| {
        tracing::error!(error = %e, "PNG encoding failed");
        ImageGenError::InternalError(None)
    })?;

    Ok(buffer.into_inner())
}
