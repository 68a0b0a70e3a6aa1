//! Windows bitmaps with a `BITMAPINFOHEADER` or newer info header.
use log::debug;

use crate::{
    file::{malformed, unsupported, ByteReader},
    rgba::unorm5_to_unorm8,
    ContainerFormat, Format, GammaSpace, Image, ImageError, Quality,
};

const FILE_HEADER_SIZE: u32 = 14;
const INFO_HEADER_SIZE: u32 = 40;
const BI_RGB: u32 = 0;

fn row_stride(width: u32, bits_per_pixel: u16) -> usize {
    (width as usize * bits_per_pixel as usize + 31) / 32 * 4
}

impl Image {
    /// Loads the bytes of a BMP file.
    ///
    /// 8-bit palette, 16-bit X1R5G5B5, and 24-bit files load as [Format::Rgb8].
    /// 32-bit files load as [Format::Rgba8].
    pub fn from_bmp(data: &[u8]) -> Result<Image, ImageError> {
        let container = ContainerFormat::Bmp;
        let mut reader = ByteReader::new(container, data);

        if reader.array::<2>()? != *b"BM" {
            return Err(malformed(container, "missing BM signature"));
        }
        let _file_size = reader.u32()?;
        let _reserved = reader.u32()?;
        let data_offset = reader.u32()?;

        let info_size = reader.u32()?;
        if info_size < INFO_HEADER_SIZE {
            return Err(unsupported(
                container,
                format!("info header size {info_size} is smaller than {INFO_HEADER_SIZE}"),
            ));
        }
        let width = reader.i32()?;
        let height = reader.i32()?;
        let _planes = reader.u16()?;
        let bits_per_pixel = reader.u16()?;
        let compression = reader.u32()?;
        let _image_size = reader.u32()?;
        let _x_pixels_per_meter = reader.i32()?;
        let _y_pixels_per_meter = reader.i32()?;
        let colors_used = reader.u32()?;
        let _colors_important = reader.u32()?;

        if width <= 0 || height == 0 {
            return Err(malformed(
                container,
                format!("invalid dimensions {width} x {height}"),
            ));
        }
        if compression != BI_RGB {
            return Err(unsupported(
                container,
                format!("compression {compression} is not supported"),
            ));
        }

        // Positive heights store rows from bottom to top.
        let bottom_up = height > 0;
        let width = width.unsigned_abs();
        let height = height.unsigned_abs();

        let format = match bits_per_pixel {
            8 | 16 | 24 => Format::Rgb8,
            32 => Format::Rgba8,
            _ => {
                return Err(unsupported(
                    container,
                    format!("{bits_per_pixel} bits per pixel is not supported"),
                ))
            }
        };

        let palette: Vec<[u8; 3]> = if bits_per_pixel == 8 {
            let count = if colors_used == 0 { 256 } else { colors_used.min(256) };
            reader.seek((FILE_HEADER_SIZE + info_size) as usize)?;
            (0..count)
                .map(|_| reader.array::<4>().map(|[b, g, r, _]| [r, g, b]))
                .collect::<Result<_, _>>()?
        } else {
            Vec::new()
        };

        let stride = row_stride(width, bits_per_pixel);
        reader.seek(data_offset as usize)?;
        let pixels = reader.bytes(stride * height as usize).map_err(|_| {
            malformed(
                container,
                format!("pixel data for {width} x {height} extends past the end of the file"),
            )
        })?;

        let mut image = Image::new_2d(width, height, 1, format)?;
        image.gamma_space = GammaSpace::Srgb;
        let pixel_size = format.info().size as usize;

        for (y, row) in image
            .data
            .chunks_exact_mut(width as usize * pixel_size)
            .enumerate()
        {
            let source_y = if bottom_up {
                height as usize - 1 - y
            } else {
                y
            };
            let source = &pixels[source_y * stride..(source_y + 1) * stride];

            match bits_per_pixel {
                8 => {
                    for (pixel, index) in row.chunks_exact_mut(3).zip(source) {
                        let color = palette.get(*index as usize).ok_or_else(|| {
                            malformed(container, format!("palette index {index} out of range"))
                        })?;
                        pixel.copy_from_slice(color);
                    }
                }
                16 => {
                    for (pixel, bytes) in row.chunks_exact_mut(3).zip(source.chunks_exact(2)) {
                        let value = u16::from_le_bytes([bytes[0], bytes[1]]);
                        pixel.copy_from_slice(&[
                            unorm5_to_unorm8((value >> 10) & 0x1F),
                            unorm5_to_unorm8((value >> 5) & 0x1F),
                            unorm5_to_unorm8(value & 0x1F),
                        ]);
                    }
                }
                24 => {
                    for (pixel, bgr) in row.chunks_exact_mut(3).zip(source.chunks_exact(3)) {
                        pixel.copy_from_slice(&[bgr[2], bgr[1], bgr[0]]);
                    }
                }
                _ => {
                    for (pixel, bgra) in row.chunks_exact_mut(4).zip(source.chunks_exact(4)) {
                        pixel.copy_from_slice(&[bgra[2], bgra[1], bgra[0], bgra[3]]);
                    }
                }
            }
        }

        debug!("Loaded {width} x {height} BMP with {bits_per_pixel} bits per pixel");
        Ok(image)
    }
}

impl<T: AsRef<[u8]>> Image<T> {
    /// Saves the base level of the first slice as a BMP file.
    ///
    /// [Format::Rgb8] saves as 24-bit, [Format::Rgba8] and [Format::Bgra8] as 32-bit,
    /// and [Format::L8] as 8-bit with a grayscale palette.
    /// Other formats are converted to [Format::Rgba8] first.
    pub fn to_bmp(&self) -> Result<Vec<u8>, ImageError> {
        self.validate()?;
        match self.format {
            Format::Rgb8 | Format::Rgba8 | Format::Bgra8 | Format::L8 => {
                let base = self.get_or_err(0, 0)?;
                Ok(write_bmp(self.width, self.height, self.format, base))
            }
            _ => {
                debug!("Converting {:?} to Rgba8 for BMP", self.format);
                let rgba = self.convert_format(Format::Rgba8, false, Quality::Normal)?;
                let base = rgba.get_or_err(0, 0)?;
                Ok(write_bmp(rgba.width, rgba.height, rgba.format, base))
            }
        }
    }
}

fn write_bmp(width: u32, height: u32, format: Format, data: &[u8]) -> Vec<u8> {
    let (bits_per_pixel, palette_size) = match format {
        Format::L8 => (8u16, 256 * 4),
        Format::Rgb8 => (24, 0),
        _ => (32, 0),
    };
    let stride = row_stride(width, bits_per_pixel);
    let data_offset = FILE_HEADER_SIZE + INFO_HEADER_SIZE + palette_size;
    let image_size = (stride * height as usize) as u32;

    let mut bytes = Vec::with_capacity((data_offset + image_size) as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&(data_offset + image_size).to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&data_offset.to_le_bytes());

    bytes.extend_from_slice(&INFO_HEADER_SIZE.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&bits_per_pixel.to_le_bytes());
    bytes.extend_from_slice(&BI_RGB.to_le_bytes());
    bytes.extend_from_slice(&image_size.to_le_bytes());
    // 72 DPI
    bytes.extend_from_slice(&2835i32.to_le_bytes());
    bytes.extend_from_slice(&2835i32.to_le_bytes());
    bytes.extend_from_slice(&(palette_size / 4).to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    if format == Format::L8 {
        for i in 0..=255u8 {
            bytes.extend_from_slice(&[i, i, i, 0]);
        }
    }

    let pixel_size = format.info().size as usize;
    let row_size = width as usize * pixel_size;
    for row in data.chunks_exact(row_size).take(height as usize).rev() {
        let start = bytes.len();
        match format {
            Format::Rgb8 => {
                for rgb in row.chunks_exact(3) {
                    bytes.extend_from_slice(&[rgb[2], rgb[1], rgb[0]]);
                }
            }
            Format::Rgba8 => {
                for rgba in row.chunks_exact(4) {
                    bytes.extend_from_slice(&[rgba[2], rgba[1], rgba[0], rgba[3]]);
                }
            }
            _ => bytes.extend_from_slice(row),
        }
        bytes.resize(start + stride, 0);
    }

    bytes
}
