//! Conversions between formats through the canonical [Format::Rgba8] and [Format::Rgba32F].
use log::{debug, warn};

use crate::{
    bcn::{self, decode::decode_blocks, encode::encode_blocks},
    etc::{self, EtcOptions},
    pvrtc,
    rgba::{read_rgba32f, write_rgba32f},
    Format, Image, ImageError, Quality,
};

impl<T: AsRef<[u8]>> Image<T> {
    /// Converts every mipmap and slice to `format`.
    ///
    /// Compressed images are decompressed first. Conversions go through [Format::Rgba32F]
    /// if either format needs more than 8 bits per channel and [Format::Rgba8] otherwise.
    /// If `regenerate_mipmaps` is `true`, the result has the full mipmap chain
    /// generated from the base level. `quality` only affects compressed targets.
    pub fn convert_format(
        &self,
        format: Format,
        regenerate_mipmaps: bool,
        quality: Quality,
    ) -> Result<Image, ImageError> {
        self.convert_format_with_options(format, regenerate_mipmaps, quality, &quality.into())
    }

    /// Same as [Image::convert_format] with explicit settings for ETC and EAC targets.
    pub fn convert_format_with_options(
        &self,
        format: Format,
        regenerate_mipmaps: bool,
        quality: Quality,
        etc_options: &EtcOptions,
    ) -> Result<Image, ImageError> {
        self.validate()?;

        if format == self.format && !regenerate_mipmaps {
            return Ok(self.to_owned_image());
        }

        // Avoid a round trip through the canonical format when filtering is supported directly.
        if format == self.format && format.element_type().is_some() {
            let mut image = self.to_owned_image();
            image.generate_mipmaps()?;
            return Ok(image);
        }

        let intermediate = if self.format.needs_float() || format.needs_float() {
            Format::Rgba32F
        } else {
            Format::Rgba8
        };
        debug!(
            "Converting {:?} to {:?} through {:?}",
            self.format, format, intermediate
        );

        let mut image = self.to_canonical(intermediate)?;
        if regenerate_mipmaps {
            image.generate_mipmaps()?;
        }

        if format.is_compressed() {
            let source = convert_uncompressed(&image, format.canonical())?;
            let mut compressed = Image::new(
                source.width,
                source.height,
                source.depth,
                source.num_slices,
                source.num_mipmaps,
                format,
            )?;
            compressed.gamma_space = source.gamma_space;
            compressed.flags = source.flags;
            compress_image_with_options(&source, &mut compressed, quality, etc_options)?;
            Ok(compressed)
        } else {
            convert_uncompressed(&image, format)
        }
    }

    /// Decompresses if needed and converts to the uncompressed `canonical` format.
    fn to_canonical(&self, canonical: Format) -> Result<Image, ImageError> {
        if self.format.is_compressed() {
            let mut decompressed = self.with_data(self.format.canonical(), Vec::new());
            decompressed.data = vec![0u8; decompressed.mem_required()];
            decompress_image(self, &mut decompressed)?;
            convert_uncompressed(&decompressed, canonical)
        } else {
            convert_uncompressed(self, canonical)
        }
    }
}

/// Packs and unpacks rows through RGBA8 or RGBA32F depending on the formats.
fn convert_uncompressed<T: AsRef<[u8]>>(
    image: &Image<T>,
    format: Format,
) -> Result<Image, ImageError> {
    if image.format == format {
        return Ok(image.to_owned_image());
    }

    let source = image.format.info();
    let target = format.info();
    let unsupported = || {
        warn!(
            "No unpack and pack functions to convert {:?} to {:?}.",
            image.format, format
        );
        ImageError::UnsupportedConversion {
            from: image.format,
            to: format,
        }
    };

    let (unpack, pack, canonical_size) = if image.format.needs_float() || format.needs_float() {
        (source.unpack_rgba32f, target.pack_rgba32f, 16)
    } else {
        (source.unpack_rgba8, target.pack_rgba8, 4)
    };
    let (unpack, pack) = unpack.zip(pack).ok_or_else(unsupported)?;

    let mut converted = Image::new(
        image.width,
        image.height,
        image.depth,
        image.num_slices,
        image.num_mipmaps,
        format,
    )?;
    converted.gamma_space = image.gamma_space;
    converted.flags = image.flags;

    let source_size = source.size as usize;
    let target_size = target.size as usize;

    for level in 0..image.num_mipmaps {
        let width = image.mip_width(level) as usize;
        let mut row = vec![0u8; width * canonical_size];

        for slice in 0..image.num_slices {
            let source_data = image.get(level, slice).ok_or(ImageError::MipmapDataOutOfBounds {
                slice,
                mipmap: level,
            })?;
            let target_data =
                converted
                    .get_mut(level, slice)
                    .ok_or(ImageError::MipmapDataOutOfBounds {
                        slice,
                        mipmap: level,
                    })?;

            // Rows of every depth layer are contiguous.
            for (source_row, target_row) in source_data
                .chunks_exact(width * source_size)
                .zip(target_data.chunks_exact_mut(width * target_size))
            {
                unpack(source_row, &mut row, width);
                pack(&row, target_row, width);
            }
        }
    }

    Ok(converted)
}

fn check_layout<T, U>(
    source: &Image<T>,
    target: &Image<U>,
    expected: Format,
    actual: Format,
) -> Result<(), ImageError>
where
    T: AsRef<[u8]>,
    U: AsRef<[u8]>,
{
    if expected != actual {
        return Err(ImageError::FormatMismatch { expected, actual });
    }
    if source.dimensions() != target.dimensions() {
        return Err(ImageError::DimensionMismatch {
            expected: source.dimensions(),
            actual: target.dimensions(),
        });
    }
    source.validate()?;
    target.validate()
}

/// Compresses every mipmap and slice of `source` into the already allocated `target`.
///
/// The source must be in the [Format::canonical] format of the target format
/// and have the same dimensions, slices, and mipmaps.
/// ETC and EAC formats use the effort and jobs from `quality`.
pub fn compress_image<T: AsRef<[u8]>>(
    source: &Image<T>,
    target: &mut Image,
    quality: Quality,
) -> Result<(), ImageError> {
    compress_image_with_options(source, target, quality, &quality.into())
}

/// Same as [compress_image] with explicit settings for ETC and EAC formats.
///
/// The `etc_options` jobs also control the threads used for DXT and BC4/BC5 formats.
pub fn compress_image_with_options<T: AsRef<[u8]>>(
    source: &Image<T>,
    target: &mut Image,
    quality: Quality,
    etc_options: &EtcOptions,
) -> Result<(), ImageError> {
    if !target.format.is_compressed() {
        return Err(ImageError::UnsupportedFormat {
            format: target.format,
        });
    }
    check_layout(source, target, target.format.canonical(), source.format)?;

    let format = target.format;
    let pool = etc_options.thread_pool();
    debug!(
        "Compressing {} mipmaps and {} slices to {:?}",
        source.num_mipmaps, source.num_slices, format
    );

    let pixel_size = source.format.info().size as usize;
    for level in 0..source.num_mipmaps {
        let width = source.mip_width(level);
        let height = source.mip_height(level);
        let rgba_layer_size = width as usize * height as usize * pixel_size;
        let block_layer_size =
            format
                .surface_size(width, height, 1)
                .ok_or(ImageError::PixelCountWouldOverflow {
                    width,
                    height,
                    depth: 1,
                })?;

        for slice in 0..source.num_slices {
            let rgba = source.get(level, slice).ok_or(ImageError::MipmapDataOutOfBounds {
                slice,
                mipmap: level,
            })?;
            let blocks = target
                .get_mut(level, slice)
                .ok_or(ImageError::MipmapDataOutOfBounds {
                    slice,
                    mipmap: level,
                })?;

            for (rgba, blocks) in rgba
                .chunks_exact(rgba_layer_size)
                .zip(blocks.chunks_exact_mut(block_layer_size))
            {
                let compressed = compress_surface(
                    format,
                    width,
                    height,
                    rgba,
                    quality,
                    etc_options,
                    pool.as_ref(),
                )?;
                blocks.copy_from_slice(&compressed);
            }
        }
    }

    Ok(())
}

fn compress_surface(
    format: Format,
    width: u32,
    height: u32,
    rgba: &[u8],
    quality: Quality,
    options: &EtcOptions,
    pool: Option<&rayon::ThreadPool>,
) -> Result<Vec<u8>, ImageError> {
    match format {
        Format::Dxt1 => encode_blocks::<bcn::Dxt1, u8>(width, height, rgba, &quality, pool),
        Format::Dxt3 => encode_blocks::<bcn::Dxt3, u8>(width, height, rgba, &quality, pool),
        Format::Dxt5 => encode_blocks::<bcn::Dxt5, u8>(width, height, rgba, &quality, pool),
        Format::Bc4 => encode_blocks::<bcn::Bc4, u8>(width, height, rgba, &quality, pool),
        Format::Bc5 => encode_blocks::<bcn::Bc5, u8>(width, height, rgba, &quality, pool),
        Format::Etc1 => encode_blocks::<etc::Etc1, u8>(width, height, rgba, options, pool),
        Format::Etc2Rgb => encode_blocks::<etc::Etc2Rgb, u8>(width, height, rgba, options, pool),
        Format::Etc2Rgba => {
            encode_blocks::<etc::Etc2Rgba, u8>(width, height, rgba, options, pool)
        }
        Format::Etc2RgbA1 => {
            encode_blocks::<etc::Etc2RgbA1, u8>(width, height, rgba, options, pool)
        }
        Format::EacR11 => encode_blocks::<etc::EacR11, f32>(width, height, rgba, options, pool),
        Format::EacR11Snorm => {
            encode_blocks::<etc::EacR11Snorm, f32>(width, height, rgba, options, pool)
        }
        Format::EacRg11 => encode_blocks::<etc::EacRg11, f32>(width, height, rgba, options, pool),
        Format::EacRg11Snorm => {
            encode_blocks::<etc::EacRg11Snorm, f32>(width, height, rgba, options, pool)
        }
        _ => {
            warn!("Compressing to {format:?} is not supported.");
            Err(ImageError::UnsupportedFormat { format })
        }
    }
}

/// Decompresses every mipmap and slice of `source` into the already allocated `target`.
///
/// The target must be in the [Format::canonical] format of the source format
/// and have the same dimensions, slices, and mipmaps.
pub fn decompress_image<T: AsRef<[u8]>>(
    source: &Image<T>,
    target: &mut Image,
) -> Result<(), ImageError> {
    if !source.format.is_compressed() {
        return Err(ImageError::UnsupportedFormat {
            format: source.format,
        });
    }
    check_layout(source, target, source.format.canonical(), target.format)?;

    let format = source.format;
    let pixel_size = target.format.info().size as usize;
    for level in 0..source.num_mipmaps {
        let width = source.mip_width(level);
        let height = source.mip_height(level);
        let rgba_layer_size = width as usize * height as usize * pixel_size;
        let block_layer_size =
            format
                .surface_size(width, height, 1)
                .ok_or(ImageError::PixelCountWouldOverflow {
                    width,
                    height,
                    depth: 1,
                })?;

        for slice in 0..source.num_slices {
            let blocks = source.get(level, slice).ok_or(ImageError::MipmapDataOutOfBounds {
                slice,
                mipmap: level,
            })?;
            let rgba = target
                .get_mut(level, slice)
                .ok_or(ImageError::MipmapDataOutOfBounds {
                    slice,
                    mipmap: level,
                })?;

            for (blocks, rgba) in blocks
                .chunks_exact(block_layer_size)
                .zip(rgba.chunks_exact_mut(rgba_layer_size))
            {
                decompress_surface(format, width, height, blocks, rgba)?;
            }
        }
    }

    Ok(())
}

fn decompress_surface(
    format: Format,
    width: u32,
    height: u32,
    data: &[u8],
    rgba: &mut [u8],
) -> Result<(), ImageError> {
    match format {
        Format::Dxt1 => decode_blocks::<bcn::Dxt1, u8>(width, height, data, rgba),
        Format::Dxt3 => decode_blocks::<bcn::Dxt3, u8>(width, height, data, rgba),
        Format::Dxt5 => decode_blocks::<bcn::Dxt5, u8>(width, height, data, rgba),
        Format::Bc4 => decode_blocks::<bcn::Bc4, u8>(width, height, data, rgba),
        Format::Bc5 => decode_blocks::<bcn::Bc5, u8>(width, height, data, rgba),
        Format::Etc1 => decode_blocks::<etc::Etc1, u8>(width, height, data, rgba),
        Format::Etc2Rgb => decode_blocks::<etc::Etc2Rgb, u8>(width, height, data, rgba),
        Format::Etc2Rgba => decode_blocks::<etc::Etc2Rgba, u8>(width, height, data, rgba),
        Format::Etc2RgbA1 => decode_blocks::<etc::Etc2RgbA1, u8>(width, height, data, rgba),
        Format::EacR11 => decode_blocks::<etc::EacR11, f32>(width, height, data, rgba),
        Format::EacR11Snorm => decode_blocks::<etc::EacR11Snorm, f32>(width, height, data, rgba),
        Format::EacRg11 => decode_blocks::<etc::EacRg11, f32>(width, height, data, rgba),
        Format::EacRg11Snorm => {
            decode_blocks::<etc::EacRg11Snorm, f32>(width, height, data, rgba)
        }
        Format::PvrtcRgb2
        | Format::PvrtcRgba2
        | Format::PvrtcRgb4
        | Format::PvrtcRgba4
        | Format::AtcRgb
        | Format::AtcRgbaExplicit
        | Format::AtcRgbaInterpolated => pvrtc::decode_surface(format, width, height, data, rgba),
        _ => Err(ImageError::UnsupportedFormat { format }),
    }
}

/// Decompresses an EAC RG11 normal map and reconstructs Z in the blue channel.
///
/// The red and green channels are the X and Y components and Z is `sqrt(|1 - x^2 - y^2|)`.
pub fn decompress_eac_rg11_normal<T: AsRef<[u8]>>(
    source: &Image<T>,
    target: &mut Image,
) -> Result<(), ImageError> {
    if !matches!(source.format, Format::EacRg11 | Format::EacRg11Snorm) {
        return Err(ImageError::FormatMismatch {
            expected: Format::EacRg11,
            actual: source.format,
        });
    }
    decompress_image(source, target)?;

    for pixel in target.data.chunks_exact_mut(16) {
        let [x, y, _, a] = read_rgba32f(pixel);
        let z = (1.0 - x * x - y * y).abs().sqrt();
        write_rgba32f(pixel, [x, y, z, a]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use strum::IntoEnumIterator;

    fn rgba8(width: u32, height: u32, num_mipmaps: u32, rgba: [u8; 4]) -> Image {
        let mut image = Image::new_2d(width, height, num_mipmaps, Format::Rgba8).unwrap();
        for pixel in image.data.chunks_exact_mut(4) {
            pixel.copy_from_slice(&rgba);
        }
        image
    }

    #[test]
    fn same_format_is_unchanged() {
        for format in Format::iter() {
            let mut image = Image::new_2d(8, 8, 1, format).unwrap();
            for (i, b) in image.data.iter_mut().enumerate() {
                *b = (i % 7) as u8;
            }
            let converted = image.convert_format(format, false, Quality::Fast).unwrap();
            assert_eq!(image, converted, "{format:?}");
        }
    }

    #[test]
    fn rgba8_to_bgra8() {
        let image = rgba8(2, 2, 1, [1, 2, 3, 4]);
        let converted = image
            .convert_format(Format::Bgra8, false, Quality::Normal)
            .unwrap();
        assert_eq!(Format::Bgra8, converted.format);
        assert_eq!([3u8, 2, 1, 4].repeat(4), converted.data);
    }

    #[test]
    fn rgba8_to_rgba32f() {
        let image = rgba8(1, 1, 1, [0, 255, 51, 255]);
        let converted = image
            .convert_format(Format::Rgba32F, false, Quality::Normal)
            .unwrap();
        assert_eq!([0.0, 1.0, 0.2, 1.0], read_rgba32f(&converted.data));
    }

    #[test]
    fn rgba8_to_dxt1_regenerate_mipmaps() {
        let image = rgba8(8, 4, 1, [132, 130, 66, 255]);
        let dxt1 = image
            .convert_format(Format::Dxt1, true, Quality::Normal)
            .unwrap();
        assert_eq!(4, dxt1.num_mipmaps);
        // 2x1 blocks, then 1 block for each of 4x2, 2x1, and 1x1.
        assert_eq!(8 * 2 + 8 * 3, dxt1.data.len());

        let decoded = dxt1
            .convert_format(Format::Rgba8, false, Quality::Normal)
            .unwrap();
        assert_eq!(rgba8(8, 4, 4, [132, 130, 66, 255]).data, decoded.data);
    }

    #[test]
    fn rgba8_to_etc1_flat() {
        let image = rgba8(4, 4, 1, [138, 70, 206, 255]);
        let etc1 = image
            .convert_format(Format::Etc1, false, Quality::Normal)
            .unwrap();
        assert_eq!(8, etc1.data.len());

        let decoded = etc1
            .convert_format(Format::Rgba8, false, Quality::Normal)
            .unwrap();
        assert_eq!(image.data, decoded.data);
    }

    #[test]
    fn dxt5_to_etc2_rgba() {
        let image = rgba8(4, 4, 1, [132, 130, 66, 77]);
        let dxt5 = image
            .convert_format(Format::Dxt5, false, Quality::Fast)
            .unwrap();
        let etc2 = dxt5
            .convert_format(Format::Etc2Rgba, false, Quality::Fast)
            .unwrap();
        let decoded = etc2
            .convert_format(Format::Rgba8, false, Quality::Fast)
            .unwrap();
        for (expected, actual) in image.data.chunks_exact(4).zip(decoded.data.chunks_exact(4)) {
            for c in 0..3 {
                assert!(expected[c].abs_diff(actual[c]) <= 6);
            }
            assert_eq!(expected[3], actual[3]);
        }
    }

    #[test]
    fn rgba32f_to_eac_r11() {
        let mut image = Image::new_2d(4, 4, 1, Format::Rgba32F).unwrap();
        for pixel in image.data.chunks_exact_mut(16) {
            write_rgba32f(pixel, [0.5, 0.0, 0.0, 1.0]);
        }
        let eac = image
            .convert_format(Format::EacR11, false, Quality::Normal)
            .unwrap();
        let decoded = eac
            .convert_format(Format::Rgba32F, false, Quality::Normal)
            .unwrap();
        for pixel in decoded.data.chunks_exact(16) {
            let [r, g, b, a] = read_rgba32f(pixel);
            assert!((r - 0.5).abs() < 0.001);
            assert_eq!([0.0, 0.0, 1.0], [g, b, a]);
        }
    }

    #[test]
    fn pvrtc_to_rgba8() {
        let image = Image::new_2d(8, 8, 1, Format::PvrtcRgb4).unwrap();
        let decoded = image
            .convert_format(Format::Rgba8, false, Quality::Normal)
            .unwrap();
        assert_eq!(8 * 8 * 4, decoded.data.len());
        assert!(decoded.data.chunks_exact(4).all(|p| p[3] == 255));
    }

    #[test]
    fn compress_to_pvrtc_unsupported() {
        let image = rgba8(8, 8, 1, [0, 0, 0, 255]);
        let result = image.convert_format(Format::PvrtcRgba4, false, Quality::Normal);
        assert!(matches!(
            result,
            Err(ImageError::UnsupportedFormat {
                format: Format::PvrtcRgba4
            })
        ));
    }

    #[test]
    fn regenerate_mipmaps_same_format() {
        let image = rgba8(4, 4, 1, [10, 20, 30, 40]);
        let converted = image
            .convert_format(Format::Rgba8, true, Quality::Normal)
            .unwrap();
        assert_eq!(3, converted.num_mipmaps);
        assert_eq!([10u8, 20, 30, 40].repeat(16 + 4 + 1), converted.data);
    }

    #[test]
    fn compress_image_format_mismatch() {
        let source = Image::new_2d(4, 4, 1, Format::Rgba32F).unwrap();
        let mut target = Image::new_2d(4, 4, 1, Format::Dxt1).unwrap();
        let result = compress_image(&source, &mut target, Quality::Fast);
        assert!(matches!(
            result,
            Err(ImageError::FormatMismatch {
                expected: Format::Rgba8,
                actual: Format::Rgba32F
            })
        ));
    }

    #[test]
    fn compress_image_dimension_mismatch() {
        let source = Image::new_2d(4, 4, 1, Format::Rgba8).unwrap();
        let mut target = Image::new_2d(8, 4, 1, Format::Dxt5).unwrap();
        let result = compress_image(&source, &mut target, Quality::Fast);
        assert!(matches!(
            result,
            Err(ImageError::DimensionMismatch {
                expected: (4, 4, 1, 1, 1),
                actual: (8, 4, 1, 1, 1)
            })
        ));
    }

    #[test]
    fn compress_image_cube_map_slices() {
        let mut source = Image::new(4, 4, 1, 6, 1, Format::Rgba8).unwrap();
        for slice in 0..6 {
            let value = slice as u8 * 40;
            for pixel in source.get_mut(0, slice).unwrap().chunks_exact_mut(4) {
                pixel.copy_from_slice(&[value, value, value, 255]);
            }
        }
        let mut target = Image::new(4, 4, 1, 6, 1, Format::Bc4).unwrap();
        let options = EtcOptions {
            effort: 0,
            jobs: 2,
        };
        compress_image_with_options(&source, &mut target, Quality::Normal, &options).unwrap();

        let mut decoded = Image::new(4, 4, 1, 6, 1, Format::Rgba8).unwrap();
        decompress_image(&target, &mut decoded).unwrap();
        for slice in 0..6 {
            let value = slice as u8 * 40;
            for pixel in decoded.get(0, slice).unwrap().chunks_exact(4) {
                assert_eq!([value, 0, 0, 255], pixel);
            }
        }
    }

    #[test]
    fn compress_volume_layers() {
        let mut source = Image::new(4, 4, 2, 1, 1, Format::Rgba8).unwrap();
        for pixel in source.data[..64].chunks_exact_mut(4) {
            pixel[3] = 255;
        }
        source.data[64..].fill(255);
        let mut target = Image::new(4, 4, 2, 1, 1, Format::Dxt1).unwrap();
        compress_image(&source, &mut target, Quality::Fast).unwrap();
        assert_eq!(16, target.data.len());

        let mut decoded = Image::new(4, 4, 2, 1, 1, Format::Rgba8).unwrap();
        decompress_image(&target, &mut decoded).unwrap();
        assert!(decoded.data[..64].chunks_exact(4).all(|p| p == [0, 0, 0, 255]));
        assert!(decoded.data[64..].iter().all(|b| *b == 255));
    }

    #[test]
    fn decompress_image_wrong_target() {
        let source = Image::new_2d(4, 4, 1, Format::EacRg11).unwrap();
        let mut target = Image::new_2d(4, 4, 1, Format::Rgba8).unwrap();
        let result = decompress_image(&source, &mut target);
        assert!(matches!(
            result,
            Err(ImageError::FormatMismatch {
                expected: Format::Rgba32F,
                actual: Format::Rgba8
            })
        ));
    }

    #[test]
    fn decompress_uncompressed_source() {
        let source = Image::new_2d(4, 4, 1, Format::Rgba8).unwrap();
        let mut target = Image::new_2d(4, 4, 1, Format::Rgba8).unwrap();
        assert!(matches!(
            decompress_image(&source, &mut target),
            Err(ImageError::UnsupportedFormat {
                format: Format::Rgba8
            })
        ));
    }

    #[test]
    fn eac_rg11_normal_z() {
        let mut source = Image::new_2d(4, 4, 1, Format::Rgba32F).unwrap();
        for pixel in source.data.chunks_exact_mut(16) {
            write_rgba32f(pixel, [0.0, 0.0, 0.0, 1.0]);
        }
        let mut compressed = Image::new_2d(4, 4, 1, Format::EacRg11Snorm).unwrap();
        compress_image(&source, &mut compressed, Quality::Fast).unwrap();

        let mut normal = Image::new_2d(4, 4, 1, Format::Rgba32F).unwrap();
        decompress_eac_rg11_normal(&compressed, &mut normal).unwrap();
        for pixel in normal.data.chunks_exact(16) {
            let [x, y, z, a] = read_rgba32f(pixel);
            assert!(x.abs() < 0.002 && y.abs() < 0.002);
            assert!((z - 1.0).abs() < 0.001);
            assert_eq!(1.0, a);
        }
    }

    #[test]
    fn eac_rg11_normal_wrong_format() {
        let source = Image::new_2d(4, 4, 1, Format::EacR11).unwrap();
        let mut target = Image::new_2d(4, 4, 1, Format::Rgba32F).unwrap();
        assert!(matches!(
            decompress_eac_rg11_normal(&source, &mut target),
            Err(ImageError::FormatMismatch {
                expected: Format::EacRg11,
                actual: Format::EacR11
            })
        ));
    }

    #[test]
    fn rgb565_to_rgba8() {
        let image = Image::from_data(1, 1, 1, 1, 1, Format::Rgb565, vec![0x1F, 0xF8]).unwrap();
        let converted = image
            .convert_format(Format::Rgba8, false, Quality::Normal)
            .unwrap();
        assert_eq!(vec![255, 0, 255, 255], converted.data);
    }
}
