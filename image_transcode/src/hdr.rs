//! Radiance RGBE files with flat or run length encoded scanlines.
use log::{debug, warn};

use crate::{
    file::{malformed, unsupported, ByteReader},
    div_round_up, ContainerFormat, Format, GammaSpace, Image, ImageError, ImageFlags,
};

const MIN_RLE_WIDTH: u32 = 8;
const MAX_RLE_WIDTH: u32 = 0x7FFF;
const MAX_RUN: usize = 127;

impl Image {
    /// Loads the bytes of a Radiance HDR file as [Format::Rgbe8].
    pub fn from_hdr(data: &[u8]) -> Result<Image, ImageError> {
        let container = ContainerFormat::Hdr;
        let mut reader = ByteReader::new(container, data);

        let signature = read_line(&mut reader)?;
        if !signature.starts_with("#?") {
            return Err(malformed(container, "missing #? signature"));
        }

        // Header variables end with a blank line.
        loop {
            let line = read_line(&mut reader)?;
            if line.is_empty() {
                break;
            }
            if let Some(format) = line.strip_prefix("FORMAT=") {
                if format.trim() != "32-bit_rle_rgbe" {
                    return Err(unsupported(
                        container,
                        format!("pixel format {format} is not supported"),
                    ));
                }
            }
        }

        let resolution = read_line(&mut reader)?;
        let (width, height, bottom_up) = parse_resolution(&resolution).ok_or_else(|| {
            unsupported(
                container,
                format!("resolution {resolution:?} is not supported"),
            )
        })?;

        let min_size = min_scanline_size(width).saturating_mul(height as usize);
        if reader.remaining().len() < min_size {
            return Err(malformed(
                container,
                format!(
                    "{width} x {height} pixels need at least {min_size} bytes but found {}",
                    reader.remaining().len()
                ),
            ));
        }

        let mut image = Image::new_2d(width, height, 1, Format::Rgbe8)?;
        image.gamma_space = GammaSpace::Linear;
        image.flags |= ImageFlags::LINEAR_SPACE;

        let scanline_size = width as usize * 4;
        for y in 0..height as usize {
            let target_y = if bottom_up {
                height as usize - 1 - y
            } else {
                y
            };
            let scanline =
                &mut image.data[target_y * scanline_size..(target_y + 1) * scanline_size];
            read_scanline(&mut reader, width, scanline)?;
        }

        debug!("Loaded {width} x {height} HDR");
        Ok(image)
    }
}

impl<T: AsRef<[u8]>> Image<T> {
    /// Saving Radiance HDR files is not implemented and always returns an error.
    pub fn to_hdr(&self) -> Result<Vec<u8>, ImageError> {
        warn!("Saving HDR files is not implemented.");
        Err(ImageError::UnimplementedOperation {
            operation: "saving HDR files",
        })
    }
}

/// The smallest encoding of a scanline, which is a full width repeat run in each channel for RLE.
fn min_scanline_size(width: u32) -> usize {
    if (MIN_RLE_WIDTH..=MAX_RLE_WIDTH).contains(&width) {
        4 + 4 * 2 * div_round_up(width as usize, MAX_RUN)
    } else {
        width as usize * 4
    }
}

/// Reads a line without the trailing newline.
fn read_line(reader: &mut ByteReader) -> Result<String, ImageError> {
    let remaining = reader.remaining();
    let end = remaining
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| malformed(ContainerFormat::Hdr, "header ended before the pixel data"))?;
    let line = reader.bytes(end + 1)?;
    Ok(String::from_utf8_lossy(&line[..end])
        .trim_end_matches('\r')
        .to_string())
}

/// Parses `-Y height +X width` or `+Y height +X width`.
fn parse_resolution(line: &str) -> Option<(u32, u32, bool)> {
    let parts: Vec<_> = line.split_whitespace().collect();
    match parts.as_slice() {
        [y, height, "+X", width] => {
            let bottom_up = match *y {
                "-Y" => false,
                "+Y" => true,
                _ => return None,
            };
            Some((width.parse().ok()?, height.parse().ok()?, bottom_up))
        }
        _ => None,
    }
}

fn read_scanline(
    reader: &mut ByteReader,
    width: u32,
    scanline: &mut [u8],
) -> Result<(), ImageError> {
    let is_rle = (MIN_RLE_WIDTH..=MAX_RLE_WIDTH).contains(&width)
        && reader.remaining().get(..2) == Some([2u8, 2].as_slice());
    if !is_rle {
        scanline.copy_from_slice(reader.bytes(scanline.len())?);
        return Ok(());
    }

    let [_, _, hi, lo] = reader.array::<4>()?;
    let encoded_width = u16::from_be_bytes([hi, lo]) as u32;
    if encoded_width != width {
        return Err(malformed(
            ContainerFormat::Hdr,
            format!("scanline width {encoded_width} does not match image width {width}"),
        ));
    }

    // Each channel is encoded separately.
    let width = width as usize;
    for channel in 0..4 {
        let mut x = 0;
        while x < width {
            let count = reader.u8()? as usize;
            let (run, is_repeat) = if count > 128 {
                (count - 128, true)
            } else {
                (count, false)
            };
            if run == 0 || x + run > width {
                return Err(malformed(
                    ContainerFormat::Hdr,
                    format!("run of {run} at {x} does not fit scanline width {width}"),
                ));
            }

            if is_repeat {
                let value = reader.u8()?;
                for i in x..x + run {
                    scanline[i * 4 + channel] = value;
                }
            } else {
                for (i, value) in reader.bytes(run)?.iter().enumerate() {
                    scanline[(x + i) * 4 + channel] = *value;
                }
            }
            x += run;
        }
    }

    Ok(())
}
