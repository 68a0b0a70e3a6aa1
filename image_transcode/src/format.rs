use bitflags::bitflags;
use strum::{EnumCount, EnumIter};

use crate::div_round_up;
use crate::rgba::*;

/// The encoding of the pixel data in an [Image](crate::Image).
///
/// Uncompressed formats convert through [ImageFormatInfo] row functions.
/// Compressed formats convert only through the block compressors and decompressors.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, EnumIter, EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Format {
    R8,
    R8Snorm,
    Rg8,
    Rg8Snorm,
    Rgb8,
    Bgr8,
    Rgba8,
    Rgba8Snorm,
    Bgra8,
    L8,
    L8A8,
    A8,
    Rgba4,
    Bgra4,
    Rgb565,
    Rgba5551,
    Bgra5551,
    L16,
    R16,
    R16Snorm,
    Rg16,
    Rg16Snorm,
    Rgba16,
    Rgba16Snorm,
    R16F,
    Rg16F,
    Rgba16F,
    R32F,
    Rg32F,
    Rgb32F,
    Rgba32F,
    Rg11b10F,
    Rgb9e5,
    Rgbe8,
    D16,
    D24S8,
    D32F,
    Dxt1,
    Dxt3,
    Dxt5,
    Bc4,
    Bc5,
    Etc1,
    Etc2Rgb,
    Etc2Rgba,
    Etc2RgbA1,
    EacR11,
    EacR11Snorm,
    EacRg11,
    EacRg11Snorm,
    PvrtcRgb2,
    PvrtcRgba2,
    PvrtcRgb4,
    PvrtcRgba4,
    AtcRgb,
    AtcRgbaExplicit,
    AtcRgbaInterpolated,
}

bitflags! {
    /// Properties of a [Format] that affect how it can be processed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FormatType: u32 {
        const COMPRESSED = 1 << 0;
        const PACKED = 1 << 1;
        const FLOAT = 1 << 2;
        const HALF = 1 << 3;
        const DEPTH = 1 << 4;
        const DEPTH_STENCIL = 1 << 5;
        const SNORM = 1 << 6;
    }
}

/// Static metadata for a [Format].
///
/// Uncompressed formats have all four row functions.
/// Compressed formats have none.
#[derive(Debug, Clone, Copy)]
pub struct ImageFormatInfo {
    pub format: Format,
    pub name: &'static str,
    /// The size in bytes of a pixel or a compressed block.
    pub size: u32,
    pub num_components: u32,
    pub red_bits: u32,
    pub green_bits: u32,
    pub blue_bits: u32,
    pub alpha_bits: u32,
    pub flags: FormatType,
    pub unpack_rgba8: Option<RowFn>,
    pub pack_rgba8: Option<RowFn>,
    pub unpack_rgba32f: Option<RowFn>,
    pub pack_rgba32f: Option<RowFn>,
}

/// The element type of formats with byte aligned channels.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ElementType {
    U8,
    F16,
    F32,
}

macro_rules! uncompressed {
    ($format:ident, $name:literal, $pixel:ty, $n:literal, [$r:literal, $g:literal, $b:literal, $a:literal], $flags:expr) => {
        ImageFormatInfo {
            format: Format::$format,
            name: $name,
            size: <$pixel as Pixel>::SIZE as u32,
            num_components: $n,
            red_bits: $r,
            green_bits: $g,
            blue_bits: $b,
            alpha_bits: $a,
            flags: $flags,
            unpack_rgba8: Some(unpack_rgba8::<$pixel> as RowFn),
            pack_rgba8: Some(pack_rgba8::<$pixel> as RowFn),
            unpack_rgba32f: Some(unpack_rgba32f::<$pixel> as RowFn),
            pack_rgba32f: Some(pack_rgba32f::<$pixel> as RowFn),
        }
    };
}

macro_rules! compressed {
    ($format:ident, $name:literal, $size:literal, $n:literal, [$r:literal, $g:literal, $b:literal, $a:literal], $flags:expr) => {
        ImageFormatInfo {
            format: Format::$format,
            name: $name,
            size: $size,
            num_components: $n,
            red_bits: $r,
            green_bits: $g,
            blue_bits: $b,
            alpha_bits: $a,
            flags: FormatType::COMPRESSED.union($flags),
            unpack_rgba8: None,
            pack_rgba8: None,
            unpack_rgba32f: None,
            pack_rgba32f: None,
        }
    };
}

const NONE: FormatType = FormatType::empty();
const PACKED: FormatType = FormatType::PACKED;
const SNORM: FormatType = FormatType::SNORM;
const HALF: FormatType = FormatType::HALF;
const FLOAT: FormatType = FormatType::FLOAT;

// Entries must stay in the same order as the Format variants.
static FORMAT_INFO: [ImageFormatInfo; Format::COUNT] = [
    uncompressed!(R8, "R8", R8, 1, [8, 0, 0, 0], NONE),
    uncompressed!(R8Snorm, "R8_SNORM", R8Snorm, 1, [8, 0, 0, 0], SNORM),
    uncompressed!(Rg8, "RG8", Rg8, 2, [8, 8, 0, 0], NONE),
    uncompressed!(Rg8Snorm, "RG8_SNORM", Rg8Snorm, 2, [8, 8, 0, 0], SNORM),
    uncompressed!(Rgb8, "RGB8", Rgb8, 3, [8, 8, 8, 0], NONE),
    uncompressed!(Bgr8, "BGR8", Bgr8, 3, [8, 8, 8, 0], NONE),
    uncompressed!(Rgba8, "RGBA8", Rgba8, 4, [8, 8, 8, 8], NONE),
    uncompressed!(Rgba8Snorm, "RGBA8_SNORM", Rgba8Snorm, 4, [8, 8, 8, 8], SNORM),
    uncompressed!(Bgra8, "BGRA8", Bgra8, 4, [8, 8, 8, 8], NONE),
    uncompressed!(L8, "L8", L8, 1, [8, 0, 0, 0], NONE),
    uncompressed!(L8A8, "L8A8", L8A8, 2, [8, 0, 0, 8], NONE),
    uncompressed!(A8, "A8", A8, 1, [0, 0, 0, 8], NONE),
    uncompressed!(Rgba4, "RGBA4", Rgba4, 4, [4, 4, 4, 4], PACKED),
    uncompressed!(Bgra4, "BGRA4", Bgra4, 4, [4, 4, 4, 4], PACKED),
    uncompressed!(Rgb565, "RGB565", Rgb565, 3, [5, 6, 5, 0], PACKED),
    uncompressed!(Rgba5551, "RGBA5551", Rgba5551, 4, [5, 5, 5, 1], PACKED),
    uncompressed!(Bgra5551, "BGRA5551", Bgra5551, 4, [5, 5, 5, 1], PACKED),
    uncompressed!(L16, "L16", L16, 1, [16, 0, 0, 0], NONE),
    uncompressed!(R16, "R16", R16, 1, [16, 0, 0, 0], NONE),
    uncompressed!(R16Snorm, "R16_SNORM", R16Snorm, 1, [16, 0, 0, 0], SNORM),
    uncompressed!(Rg16, "RG16", Rg16, 2, [16, 16, 0, 0], NONE),
    uncompressed!(Rg16Snorm, "RG16_SNORM", Rg16Snorm, 2, [16, 16, 0, 0], SNORM),
    uncompressed!(Rgba16, "RGBA16", Rgba16, 4, [16, 16, 16, 16], NONE),
    uncompressed!(Rgba16Snorm, "RGBA16_SNORM", Rgba16Snorm, 4, [16, 16, 16, 16], SNORM),
    uncompressed!(R16F, "R16F", R16F, 1, [16, 0, 0, 0], HALF),
    uncompressed!(Rg16F, "RG16F", Rg16F, 2, [16, 16, 0, 0], HALF),
    uncompressed!(Rgba16F, "RGBA16F", Rgba16F, 4, [16, 16, 16, 16], HALF),
    uncompressed!(R32F, "R32F", R32F, 1, [32, 0, 0, 0], FLOAT),
    uncompressed!(Rg32F, "RG32F", Rg32F, 2, [32, 32, 0, 0], FLOAT),
    uncompressed!(Rgb32F, "RGB32F", Rgb32F, 3, [32, 32, 32, 0], FLOAT),
    uncompressed!(Rgba32F, "RGBA32F", Rgba32F, 4, [32, 32, 32, 32], FLOAT),
    uncompressed!(Rg11b10F, "RG11B10F", Rg11b10F, 3, [11, 11, 10, 0], FLOAT.union(PACKED)),
    uncompressed!(Rgb9e5, "RGB9E5", Rgb9e5, 3, [9, 9, 9, 0], FLOAT.union(PACKED)),
    uncompressed!(Rgbe8, "RGBE8", Rgbe8, 3, [8, 8, 8, 0], FLOAT.union(PACKED)),
    uncompressed!(D16, "D16", R16, 1, [16, 0, 0, 0], FormatType::DEPTH),
    uncompressed!(D24S8, "D24S8", D24S8, 2, [24, 8, 0, 0], FormatType::DEPTH_STENCIL.union(PACKED)),
    uncompressed!(D32F, "D32F", R32F, 1, [32, 0, 0, 0], FormatType::DEPTH.union(FLOAT)),
    compressed!(Dxt1, "DXT1", 8, 4, [5, 6, 5, 1], NONE),
    compressed!(Dxt3, "DXT3", 16, 4, [5, 6, 5, 4], NONE),
    compressed!(Dxt5, "DXT5", 16, 4, [5, 6, 5, 8], NONE),
    compressed!(Bc4, "BC4", 8, 1, [8, 0, 0, 0], NONE),
    compressed!(Bc5, "BC5", 16, 2, [8, 8, 0, 0], NONE),
    compressed!(Etc1, "ETC1", 8, 3, [8, 8, 8, 0], NONE),
    compressed!(Etc2Rgb, "ETC2_RGB", 8, 3, [8, 8, 8, 0], NONE),
    compressed!(Etc2Rgba, "ETC2_RGBA", 16, 4, [8, 8, 8, 8], NONE),
    compressed!(Etc2RgbA1, "ETC2_RGB_A1", 8, 4, [8, 8, 8, 1], NONE),
    compressed!(EacR11, "EAC_R11", 8, 1, [11, 0, 0, 0], NONE),
    compressed!(EacR11Snorm, "EAC_R11_SNORM", 8, 1, [11, 0, 0, 0], SNORM),
    compressed!(EacRg11, "EAC_RG11", 16, 2, [11, 11, 0, 0], NONE),
    compressed!(EacRg11Snorm, "EAC_RG11_SNORM", 16, 2, [11, 11, 0, 0], SNORM),
    compressed!(PvrtcRgb2, "PVRTC_RGB_2BPP", 8, 3, [8, 8, 8, 0], NONE),
    compressed!(PvrtcRgba2, "PVRTC_RGBA_2BPP", 8, 4, [8, 8, 8, 8], NONE),
    compressed!(PvrtcRgb4, "PVRTC_RGB_4BPP", 8, 3, [8, 8, 8, 0], NONE),
    compressed!(PvrtcRgba4, "PVRTC_RGBA_4BPP", 8, 4, [8, 8, 8, 8], NONE),
    compressed!(AtcRgb, "ATC_RGB", 8, 3, [5, 6, 5, 0], NONE),
    compressed!(AtcRgbaExplicit, "ATC_RGBA_EXPLICIT", 16, 4, [5, 6, 5, 4], NONE),
    compressed!(AtcRgbaInterpolated, "ATC_RGBA_INTERPOLATED", 16, 4, [5, 6, 5, 8], NONE),
];

impl Format {
    /// Returns the static metadata for this format.
    pub fn info(self) -> &'static ImageFormatInfo {
        &FORMAT_INFO[self as usize]
    }

    pub fn is_compressed(self) -> bool {
        self.info().flags.contains(FormatType::COMPRESSED)
    }

    /// The dimensions in pixels of a compressed block or `None` for uncompressed formats.
    pub fn block_dimensions(self) -> Option<(u32, u32)> {
        match self {
            Format::PvrtcRgb2 | Format::PvrtcRgba2 => Some((8, 4)),
            f if f.is_compressed() => Some((4, 4)),
            _ => None,
        }
    }

    /// The smallest dimensions in pixels that can be stored for a compressed format.
    ///
    /// Smaller mipmaps still use the storage of the minimum dimensions.
    pub fn min_dimensions(self) -> Option<(u32, u32)> {
        match self {
            Format::PvrtcRgb2 | Format::PvrtcRgba2 => Some((16, 8)),
            Format::PvrtcRgb4 | Format::PvrtcRgba4 => Some((8, 8)),
            f => f.block_dimensions(),
        }
    }

    /// Returns `true` if this format can not be converted through RGBA8 without loss.
    pub fn needs_float(self) -> bool {
        let info = self.info();
        info.flags
            .intersects(FormatType::FLOAT | FormatType::HALF | FormatType::SNORM)
            || [info.red_bits, info.green_bits, info.blue_bits, info.alpha_bits]
                .iter()
                .any(|b| *b > 8)
    }

    /// The uncompressed format used for conversions and block compression.
    pub fn canonical(self) -> Format {
        if self.needs_float() {
            Format::Rgba32F
        } else {
            Format::Rgba8
        }
    }

    /// The element type for formats that can be filtered per channel.
    pub fn element_type(self) -> Option<ElementType> {
        match self {
            Format::R8
            | Format::Rg8
            | Format::Rgb8
            | Format::Bgr8
            | Format::Rgba8
            | Format::Bgra8
            | Format::L8
            | Format::L8A8
            | Format::A8 => Some(ElementType::U8),
            Format::R16F | Format::Rg16F | Format::Rgba16F => Some(ElementType::F16),
            Format::R32F | Format::Rg32F | Format::Rgb32F | Format::Rgba32F => {
                Some(ElementType::F32)
            }
            _ => None,
        }
    }

    /// The index of the alpha component within a pixel if present.
    pub fn alpha_component(self) -> Option<usize> {
        match self {
            Format::Rgba8 | Format::Bgra8 | Format::Rgba16F | Format::Rgba32F => Some(3),
            Format::L8A8 => Some(1),
            Format::A8 => Some(0),
            _ => None,
        }
    }

    /// The size in bytes of a `width` x `height` x `depth` surface in this format.
    ///
    /// Compressed dimensions are rounded up to whole blocks after applying [Format::min_dimensions].
    pub fn surface_size(self, width: u32, height: u32, depth: u32) -> Option<usize> {
        let size = self.info().size as usize;
        match (self.block_dimensions(), self.min_dimensions()) {
            (Some((block_width, block_height)), Some((min_width, min_height))) => {
                let blocks_x = div_round_up(width.max(min_width) as usize, block_width as usize);
                let blocks_y =
                    div_round_up(height.max(min_height) as usize, block_height as usize);
                blocks_x
                    .checked_mul(blocks_y)?
                    .checked_mul(depth as usize)?
                    .checked_mul(size)
            }
            _ => (width as usize)
                .checked_mul(height as usize)?
                .checked_mul(depth as usize)?
                .checked_mul(size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use strum::IntoEnumIterator;

    #[test]
    fn info_matches_enum_order() {
        for format in Format::iter() {
            assert_eq!(format, format.info().format);
        }
    }

    #[test]
    fn compressed_formats_have_no_row_functions() {
        for format in Format::iter() {
            let info = format.info();
            let has_row_functions = info.unpack_rgba8.is_some()
                && info.pack_rgba8.is_some()
                && info.unpack_rgba32f.is_some()
                && info.pack_rgba32f.is_some();
            let has_no_row_functions = info.unpack_rgba8.is_none()
                && info.pack_rgba8.is_none()
                && info.unpack_rgba32f.is_none()
                && info.pack_rgba32f.is_none();

            if format.is_compressed() {
                assert!(has_no_row_functions, "{format:?}");
                assert!(format.block_dimensions().is_some(), "{format:?}");
            } else {
                assert!(has_row_functions, "{format:?}");
                assert!(format.block_dimensions().is_none(), "{format:?}");
            }
        }
    }

    #[test]
    fn atc_block_dimensions() {
        assert_eq!(Some((4, 4)), Format::AtcRgb.block_dimensions());
        assert_eq!(Some((4, 4)), Format::AtcRgbaExplicit.min_dimensions());
    }

    #[test]
    fn pvrtc_min_dimensions() {
        assert_eq!(Some(32), Format::PvrtcRgba4.surface_size(1, 1, 1));
        assert_eq!(Some(32), Format::PvrtcRgb2.surface_size(1, 1, 1));
        assert_eq!(Some(8 * 4 * 8), Format::PvrtcRgb2.surface_size(64, 16, 1));
    }

    #[test]
    fn surface_size_dxt1_1x1() {
        assert_eq!(Some(8), Format::Dxt1.surface_size(1, 1, 1));
        assert_eq!(Some(16), Format::Dxt5.surface_size(3, 3, 1));
        assert_eq!(Some(32), Format::Dxt1.surface_size(5, 5, 1));
    }

    #[test]
    fn surface_size_uncompressed() {
        assert_eq!(Some(4 * 3 * 2 * 12), Format::Rgb32F.surface_size(4, 3, 2));
        assert_eq!(None, Format::Rgba32F.surface_size(u32::MAX, u32::MAX, u32::MAX));
    }

    #[test]
    fn float_formats() {
        assert!(Format::EacR11.needs_float());
        assert!(Format::Rgba8Snorm.needs_float());
        assert!(Format::R16.needs_float());
        assert!(Format::Rgbe8.needs_float());
        assert!(!Format::Dxt5.needs_float());
        assert!(!Format::Rgb565.needs_float());
        assert_eq!(Format::Rgba32F, Format::EacRg11Snorm.canonical());
        assert_eq!(Format::Rgba8, Format::Etc1.canonical());
    }
}
