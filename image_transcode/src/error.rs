use thiserror::Error;

// Dimension tuples are width, height, depth, slices, and mipmaps.

use crate::{ContainerFormat, Format};

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image dimensions {width} x {height} x {depth} contain no pixels")]
    ZeroSizedImage { width: u32, height: u32, depth: u32 },

    #[error("image pixel count {width} x {height} x {depth} would overflow")]
    PixelCountWouldOverflow { width: u32, height: u32, depth: u32 },

    #[error("expected image to have at least {expected} bytes but found {actual}")]
    NotEnoughData { expected: usize, actual: usize },

    #[error("{mipmaps} mipmaps exceeds the maximum expected mipmap count of {max_mipmaps}")]
    UnexpectedMipmapCount { mipmaps: u32, max_mipmaps: u32 },

    #[error("failed to get image data for slice {slice} mipmap {mipmap}")]
    MipmapDataOutOfBounds { slice: u32, mipmap: u32 },

    #[error("expected format {expected:?} but found {actual:?}")]
    FormatMismatch { expected: Format, actual: Format },

    #[error("expected image dimensions {expected:?} but found {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32, u32, u32, u32),
        actual: (u32, u32, u32, u32, u32),
    },

    #[error("the operation is not supported for format {format:?}")]
    UnsupportedFormat { format: Format },

    #[error("converting from {from:?} to {to:?} is not supported")]
    UnsupportedConversion { from: Format, to: Format },

    #[error("malformed {container:?} data: {reason}")]
    MalformedContainer {
        container: ContainerFormat,
        reason: String,
    },

    #[error("{name} is not a recognized BMP, DDS, HDR, or PVR file")]
    UnrecognizedContainer { name: String },

    #[error("unsupported {container:?} pixel format: {reason}")]
    UnsupportedContainerFormat {
        container: ContainerFormat,
        reason: String,
    },

    #[error("{operation} is not implemented")]
    UnimplementedOperation { operation: &'static str },

    #[error("invalid cube map faces: {reason}")]
    InvalidCubeFaces { reason: String },

    #[error("error reading or writing image data")]
    Io(#[from] std::io::Error),

    #[error("error reading or writing DDS")]
    Dds(#[from] ddsfile::Error),
}
