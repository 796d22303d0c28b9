use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, GenericImageView, RgbImage};

/// Default quality for frames sent to the server and snapshots on disk.
pub const JPEG_QUALITY: u8 = 90;

/// Decode a JPEG into packed RGB8 pixels and its dimensions.
pub fn decode_jpeg(bytes: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
    if bytes.is_empty() {
        return Err(anyhow!("empty jpeg payload"));
    }
    let image = image::load_from_memory(bytes).context("decode jpeg")?;
    let (width, height) = image.dimensions();
    let rgb = image.into_rgb8();
    Ok((rgb.into_raw(), width, height))
}

/// Encode an RGB8 image as JPEG.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .context("encode jpeg")?;
    Ok(bytes)
}
