//! PVRTC and ATC decoding using texture2ddecoder.
use log::warn;

use crate::{div_round_up, Format, ImageError};

/// Decompress a `width` x `height` PVRTC or ATC surface to RGBA8.
///
/// Surfaces smaller than [Format::min_dimensions] are decoded at the minimum dimensions and cropped.
pub fn decode_surface(
    format: Format,
    width: u32,
    height: u32,
    data: &[u8],
    rgba: &mut [u8],
) -> Result<(), ImageError> {
    let (block_width, block_height) = format
        .block_dimensions()
        .ok_or(ImageError::UnsupportedFormat { format })?;
    let (min_width, min_height) = format.min_dimensions().unwrap_or((block_width, block_height));

    let expected_size =
        format
            .surface_size(width, height, 1)
            .ok_or(ImageError::PixelCountWouldOverflow {
                width,
                height,
                depth: 1,
            })?;
    if data.len() < expected_size {
        return Err(ImageError::NotEnoughData {
            expected: expected_size,
            actual: data.len(),
        });
    }

    let expected_rgba_size = width as usize * height as usize * 4;
    if rgba.len() < expected_rgba_size {
        return Err(ImageError::NotEnoughData {
            expected: expected_rgba_size,
            actual: rgba.len(),
        });
    }

    let padded_width =
        div_round_up(width.max(min_width) as usize, block_width as usize) * block_width as usize;
    let padded_height =
        div_round_up(height.max(min_height) as usize, block_height as usize) * block_height as usize;

    // Pixels are packed as little endian BGRA.
    let mut pixels = vec![0u32; padded_width * padded_height];
    let data = &data[..expected_size];
    let result = match format {
        Format::PvrtcRgb2 | Format::PvrtcRgba2 => {
            texture2ddecoder::decode_pvrtc_2bpp(data, padded_width, padded_height, &mut pixels)
        }
        Format::PvrtcRgb4 | Format::PvrtcRgba4 => {
            texture2ddecoder::decode_pvrtc_4bpp(data, padded_width, padded_height, &mut pixels)
        }
        Format::AtcRgb => {
            texture2ddecoder::decode_atc_rgb4(data, padded_width, padded_height, &mut pixels)
        }
        Format::AtcRgbaInterpolated => {
            texture2ddecoder::decode_atc_rgba8(data, padded_width, padded_height, &mut pixels)
        }
        Format::AtcRgbaExplicit => {
            decode_atc_explicit_alpha(data, padded_width, padded_height, &mut pixels)
        }
        _ => return Err(ImageError::UnsupportedFormat { format }),
    };
    result.map_err(|reason| {
        warn!("Failed to decode {format:?} surface: {reason}");
        ImageError::NotEnoughData {
            expected: expected_size,
            actual: data.len(),
        }
    })?;

    let opaque = matches!(
        format,
        Format::PvrtcRgb2 | Format::PvrtcRgb4 | Format::AtcRgb
    );
    for (y, row) in rgba[..expected_rgba_size]
        .chunks_exact_mut(width as usize * 4)
        .enumerate()
    {
        for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
            let [b, g, r, a] = pixels[y * padded_width + x].to_le_bytes();
            pixel.copy_from_slice(&[r, g, b, if opaque { 255 } else { a }]);
        }
    }

    Ok(())
}

/// ATC color blocks preceded by 4-bit explicit alpha like DXT3.
fn decode_atc_explicit_alpha(
    data: &[u8],
    width: usize,
    height: usize,
    pixels: &mut [u32],
) -> Result<(), &'static str> {
    let blocks_x = width / 4;
    let blocks_y = height / 4;

    let mut color = [0u32; 16];
    for (i, block) in data.chunks_exact(16).take(blocks_x * blocks_y).enumerate() {
        texture2ddecoder::decode_atc_rgb4(&block[8..], 4, 4, &mut color)?;

        let (block_x, block_y) = (i % blocks_x, i / blocks_x);
        for y in 0..4 {
            let alpha_row = u16::from_le_bytes([block[y * 2], block[y * 2 + 1]]);
            for x in 0..4 {
                let alpha = ((alpha_row >> (4 * x)) & 0xF) as u8 * 17;
                let [b, g, r, _] = color[y * 4 + x].to_le_bytes();
                pixels[(block_y * 4 + y) * width + block_x * 4 + x] =
                    u32::from_le_bytes([b, g, r, alpha]);
            }
        }
    }
    Ok(())
}
