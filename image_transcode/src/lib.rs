//! # image_transcode
//! image_transcode loads, stores, and converts raster images between uncompressed,
//! block compressed, and floating point HDR pixel formats.
//!
//! Every [Image] stores its mipmaps and array slices in a single buffer.
//! Conversions go through one of two canonical formats, [Format::Rgba8] or [Format::Rgba32F],
//! using the row functions in [rgba] and the block compressors and decompressors.
//!
//! # Getting Started
//! ```rust no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use image_transcode::{Format, Image, Quality};
//!
//! let bytes = std::fs::read("cat.bmp")?;
//! let image = Image::load_from_memory("cat.bmp", &bytes)?;
//!
//! // Generate the full mipmap chain and compress to ETC2.
//! let etc = image.convert_format(Format::Etc2Rgba, true, Quality::Normal)?;
//! std::fs::write("cat.pvr", etc.to_pvr()?)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//! Interop with [image::RgbaImage] and [image::Rgba32FImage] requires the default `image` feature.
//! The `serde` feature derives serialization for the public value types.
mod bcn;
mod bmp;
mod convert;
mod cube;
mod dds;
mod error;
mod etc;
mod file;
mod format;
mod gamma;
mod hdr;
mod mipmap;
mod pvr;
mod pvrtc;
mod resize;
pub mod rgba;
mod sample;
mod surface;
mod texel;

#[cfg(feature = "image")]
mod rgbaimage;

pub use convert::{
    compress_image, compress_image_with_options, decompress_eac_rg11_normal, decompress_image,
};
pub use cube::{cube_map_to_face_coords, face_to_cube_map_coords, CubeFace};
pub use error::ImageError;
pub use etc::EtcOptions;
pub use file::ContainerFormat;
pub use format::{ElementType, Format, FormatType, ImageFormatInfo};
pub use gamma::GammaSpace;
pub use resize::ResizeFilter;
pub use surface::{Image, ImageFlags};

pub use ddsfile;

#[cfg(feature = "image")]
pub use image;

/// The conversion quality when converting to compressed formats.
///
/// Higher quality settings run significantly slower.
/// Block compressed formats use a fixed compression ratio,
/// so lower quality settings do not use less space than slower ones.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Quality {
    /// Faster exports with slightly lower quality.
    Fast,
    /// Normal export speed and quality.
    #[default]
    Normal,
    /// Slower exports for slightly higher quality.
    HighQuality,
}

/// The number of mipmaps in a full chain down to 1x1 for the largest dimension.
pub fn max_mipmap_count(max_dimension: u32) -> u32 {
    // log2(x) + 1
    u32::BITS - max_dimension.leading_zeros()
}

/// The number of mipmaps in a full chain for a `width` x `height` x `depth` image.
pub fn max_mipmap_levels(width: u32, height: u32, depth: u32) -> u32 {
    max_mipmap_count(width.max(height).max(depth))
}

/// Calculates the dimension in pixels of `mipmap` from the base level dimension `base_dimension`.
///
/// This halves each level with a floor of 1 pixel.
pub fn mip_dimension(base_dimension: u32, mipmap: u32) -> u32 {
    base_dimension.checked_shr(mipmap).unwrap_or(0).max(1)
}

fn div_round_up(x: usize, d: usize) -> usize {
    (x + d - 1) / d
}
