//! PowerVR textures.
//!
//! Version 2 files have a 52 byte header ending in the `PVR!` tag and store each surface
//! with all of its mipmaps before the next surface.
//! Version 3 files have a 52 byte header followed by metadata and store data by mipmap,
//! then surface, then face, then depth layer.
//! Version 3 is used for saving.
use log::debug;

use crate::{
    file::{malformed, unsupported, ByteReader},
    ContainerFormat, Format, GammaSpace, Image, ImageError, ImageFlags,
};

const PVR3_VERSION: u32 = u32::from_le_bytes(*b"PVR\x03");
const PVR2_TAG: u32 = u32::from_le_bytes(*b"PVR!");
const PVR2_HEADER_SIZE: u32 = 52;

// Legacy pixel types in the low byte of the version 2 flags.
const PVR2_RGBA_4444: u32 = 0x10;
const PVR2_RGBA_5551: u32 = 0x11;
const PVR2_RGBA_8888: u32 = 0x12;
const PVR2_RGB_565: u32 = 0x13;
const PVR2_RGB_888: u32 = 0x15;
const PVR2_I_8: u32 = 0x16;
const PVR2_AI_88: u32 = 0x17;
const PVR2_PVRTC_2: u32 = 0x18;
const PVR2_PVRTC_4: u32 = 0x19;
const PVR2_BGRA_8888: u32 = 0x1A;
const PVR2_A_8: u32 = 0x1B;
const PVR2_DXT1: u32 = 0x20;
const PVR2_DXT3: u32 = 0x22;
const PVR2_DXT5: u32 = 0x24;
const PVR2_ETC1: u32 = 0x36;

const PVR2_TWIDDLED: u32 = 0x200;
const PVR2_CUBE_MAP: u32 = 0x1000;
const PVR2_VOLUME: u32 = 0x4000;

/// The channel type field of version 3 headers.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum ChannelType {
    Unorm,
    Snorm,
    Float,
}

impl ChannelType {
    fn from_pvr3(value: u32) -> Option<Self> {
        match value {
            0 | 2 | 4 | 6 | 8 | 10 => Some(Self::Unorm),
            1 | 3 | 5 | 7 | 9 | 11 => Some(Self::Snorm),
            12 | 13 => Some(Self::Float),
            _ => None,
        }
    }

    fn to_pvr3(self, bits: u8) -> u32 {
        match (self, bits) {
            (Self::Unorm, 16) => 4,
            (Self::Snorm, 16) => 5,
            (Self::Unorm, _) => 0,
            (Self::Snorm, _) => 1,
            (Self::Float, _) => 12,
        }
    }
}

/// Compressed format codes with the high 32 bits of the pixel format set to zero.
const COMPRESSED_FORMATS: &[(Format, u64, ChannelType)] = &[
    (Format::PvrtcRgb2, 0, ChannelType::Unorm),
    (Format::PvrtcRgba2, 1, ChannelType::Unorm),
    (Format::PvrtcRgb4, 2, ChannelType::Unorm),
    (Format::PvrtcRgba4, 3, ChannelType::Unorm),
    (Format::Etc1, 6, ChannelType::Unorm),
    (Format::Dxt1, 7, ChannelType::Unorm),
    (Format::Dxt3, 9, ChannelType::Unorm),
    (Format::Dxt5, 11, ChannelType::Unorm),
    (Format::Bc4, 12, ChannelType::Unorm),
    (Format::Bc5, 13, ChannelType::Unorm),
    (Format::Rgb9e5, 19, ChannelType::Float),
    (Format::Etc2Rgb, 22, ChannelType::Unorm),
    (Format::Etc2Rgba, 23, ChannelType::Unorm),
    (Format::Etc2RgbA1, 24, ChannelType::Unorm),
    (Format::EacR11, 25, ChannelType::Unorm),
    (Format::EacR11Snorm, 25, ChannelType::Snorm),
    (Format::EacRg11, 26, ChannelType::Unorm),
    (Format::EacRg11Snorm, 26, ChannelType::Snorm),
];

/// Channel names and bits per channel for formats with a generated pixel format.
///
/// Packed channels are listed from the most significant bits.
const GENERATED_FORMATS: &[(Format, &[u8], &[u8], ChannelType)] = &[
    (Format::R8, b"r", &[8], ChannelType::Unorm),
    (Format::R8Snorm, b"r", &[8], ChannelType::Snorm),
    (Format::Rg8, b"rg", &[8, 8], ChannelType::Unorm),
    (Format::Rg8Snorm, b"rg", &[8, 8], ChannelType::Snorm),
    (Format::Rgb8, b"rgb", &[8, 8, 8], ChannelType::Unorm),
    (Format::Bgr8, b"bgr", &[8, 8, 8], ChannelType::Unorm),
    (Format::Rgba8, b"rgba", &[8, 8, 8, 8], ChannelType::Unorm),
    (Format::Rgba8Snorm, b"rgba", &[8, 8, 8, 8], ChannelType::Snorm),
    (Format::Bgra8, b"bgra", &[8, 8, 8, 8], ChannelType::Unorm),
    (Format::L8, b"l", &[8], ChannelType::Unorm),
    (Format::L8A8, b"la", &[8, 8], ChannelType::Unorm),
    (Format::A8, b"a", &[8], ChannelType::Unorm),
    (Format::Rgba4, b"rgba", &[4, 4, 4, 4], ChannelType::Unorm),
    (Format::Bgra4, b"argb", &[4, 4, 4, 4], ChannelType::Unorm),
    (Format::Rgb565, b"rgb", &[5, 6, 5], ChannelType::Unorm),
    (Format::Rgba5551, b"rgba", &[5, 5, 5, 1], ChannelType::Unorm),
    (Format::Bgra5551, b"argb", &[1, 5, 5, 5], ChannelType::Unorm),
    (Format::L16, b"l", &[16], ChannelType::Unorm),
    (Format::R16, b"r", &[16], ChannelType::Unorm),
    (Format::R16Snorm, b"r", &[16], ChannelType::Snorm),
    (Format::Rg16, b"rg", &[16, 16], ChannelType::Unorm),
    (Format::Rg16Snorm, b"rg", &[16, 16], ChannelType::Snorm),
    (Format::Rgba16, b"rgba", &[16, 16, 16, 16], ChannelType::Unorm),
    (Format::Rgba16Snorm, b"rgba", &[16, 16, 16, 16], ChannelType::Snorm),
    (Format::R16F, b"r", &[16], ChannelType::Float),
    (Format::Rg16F, b"rg", &[16, 16], ChannelType::Float),
    (Format::Rgba16F, b"rgba", &[16, 16, 16, 16], ChannelType::Float),
    (Format::R32F, b"r", &[32], ChannelType::Float),
    (Format::Rg32F, b"rg", &[32, 32], ChannelType::Float),
    (Format::Rgb32F, b"rgb", &[32, 32, 32], ChannelType::Float),
    (Format::Rgba32F, b"rgba", &[32, 32, 32, 32], ChannelType::Float),
    (Format::Rg11b10F, b"bgr", &[10, 11, 11], ChannelType::Float),
    (Format::D16, b"d", &[16], ChannelType::Unorm),
    (Format::D32F, b"d", &[32], ChannelType::Float),
];

fn generated_pixel_format(names: &[u8], bits: &[u8]) -> u64 {
    let mut name_bytes = [0u8; 4];
    let mut bit_bytes = [0u8; 4];
    name_bytes[..names.len()].copy_from_slice(names);
    bit_bytes[..bits.len()].copy_from_slice(bits);
    u32::from_le_bytes(name_bytes) as u64 | (u32::from_le_bytes(bit_bytes) as u64) << 32
}

fn format_from_pvr3(pixel_format: u64, channel_type: ChannelType) -> Option<Format> {
    if pixel_format >> 32 == 0 {
        // Unsigned and signed EAC share a code.
        COMPRESSED_FORMATS
            .iter()
            .filter(|(_, code, _)| *code == pixel_format)
            .find(|(_, _, t)| *t == channel_type)
            .or_else(|| {
                COMPRESSED_FORMATS
                    .iter()
                    .find(|(_, code, _)| *code == pixel_format)
            })
            .map(|(format, _, _)| *format)
    } else {
        GENERATED_FORMATS
            .iter()
            .find(|(_, names, bits, t)| {
                generated_pixel_format(names, bits) == pixel_format && *t == channel_type
            })
            .map(|(format, _, _, _)| *format)
    }
}

fn format_to_pvr3(format: Format) -> Option<(u64, u32)> {
    COMPRESSED_FORMATS
        .iter()
        .find(|(f, _, _)| *f == format)
        .map(|(_, code, t)| (*code, t.to_pvr3(8)))
        .or_else(|| {
            GENERATED_FORMATS
                .iter()
                .find(|(f, _, _, _)| *f == format)
                .map(|(_, names, bits, t)| {
                    (generated_pixel_format(names, bits), t.to_pvr3(bits[0]))
                })
        })
}

fn format_from_pvr2(pixel_type: u32, has_alpha: bool) -> Option<Format> {
    match pixel_type {
        PVR2_RGBA_4444 => Some(Format::Rgba4),
        PVR2_RGBA_5551 => Some(Format::Rgba5551),
        PVR2_RGBA_8888 => Some(Format::Rgba8),
        PVR2_RGB_565 => Some(Format::Rgb565),
        PVR2_RGB_888 => Some(Format::Rgb8),
        PVR2_I_8 => Some(Format::L8),
        PVR2_AI_88 => Some(Format::L8A8),
        PVR2_PVRTC_2 if has_alpha => Some(Format::PvrtcRgba2),
        PVR2_PVRTC_2 => Some(Format::PvrtcRgb2),
        PVR2_PVRTC_4 if has_alpha => Some(Format::PvrtcRgba4),
        PVR2_PVRTC_4 => Some(Format::PvrtcRgb4),
        PVR2_BGRA_8888 => Some(Format::Bgra8),
        PVR2_A_8 => Some(Format::A8),
        PVR2_DXT1 => Some(Format::Dxt1),
        PVR2_DXT3 => Some(Format::Dxt3),
        PVR2_DXT5 => Some(Format::Dxt5),
        PVR2_ETC1 => Some(Format::Etc1),
        _ => None,
    }
}

impl Image {
    /// Loads the bytes of a version 2 or version 3 PVR file.
    pub fn from_pvr(data: &[u8]) -> Result<Image, ImageError> {
        let mut reader = ByteReader::new(ContainerFormat::Pvr, data);
        match reader.u32()? {
            PVR3_VERSION => load_pvr3(&mut reader),
            PVR2_HEADER_SIZE => load_pvr2(&mut reader),
            _ => Err(malformed(ContainerFormat::Pvr, "unrecognized header")),
        }
    }
}

fn load_pvr3(reader: &mut ByteReader) -> Result<Image, ImageError> {
    let container = ContainerFormat::Pvr;

    let _flags = reader.u32()?;
    let pixel_format = reader.u64()?;
    let color_space = reader.u32()?;
    let channel_type = reader.u32()?;
    let height = reader.u32()?;
    let width = reader.u32()?;
    let depth = reader.u32()?;
    let num_surfaces = reader.u32()?;
    let num_faces = reader.u32()?;
    let num_mipmaps = reader.u32()?;
    let metadata_size = reader.u32()?;

    let format = ChannelType::from_pvr3(channel_type)
        .and_then(|t| format_from_pvr3(pixel_format, t))
        .ok_or_else(|| {
            unsupported(
                container,
                format!("pixel format {pixel_format:#x} with channel type {channel_type}"),
            )
        })?;

    let num_slices = num_surfaces
        .checked_mul(num_faces)
        .ok_or_else(|| malformed(container, "too many surfaces"))?;

    reader.bytes(metadata_size as usize)?;

    // Data is already ordered by mipmap and then slice.
    let mut image = Image::layout(
        width,
        height,
        depth,
        num_slices,
        num_mipmaps.max(1),
        format,
    )
    .allocate(container, reader.remaining().len())?;
    let size = image.mem_required();
    image.data.copy_from_slice(reader.bytes(size)?);

    image.gamma_space = if color_space == 1 {
        GammaSpace::Srgb
    } else {
        GammaSpace::Linear
    };
    image
        .flags
        .set(ImageFlags::LINEAR_SPACE, color_space != 1);
    image.flags.set(ImageFlags::CUBE_MAP, num_faces == 6);

    debug!("Loaded {width} x {height} x {depth} PVR3 with format {format:?}");
    Ok(image)
}

fn load_pvr2(reader: &mut ByteReader) -> Result<Image, ImageError> {
    let container = ContainerFormat::Pvr;

    let height = reader.u32()?;
    let width = reader.u32()?;
    let num_mipmaps = reader.u32()?;
    let flags = reader.u32()?;
    let _data_size = reader.u32()?;
    let _bits_per_pixel = reader.u32()?;
    let _red_mask = reader.u32()?;
    let _green_mask = reader.u32()?;
    let _blue_mask = reader.u32()?;
    let alpha_mask = reader.u32()?;
    let tag = reader.u32()?;
    let num_surfaces = reader.u32()?;

    if tag != PVR2_TAG {
        return Err(malformed(container, "missing PVR! tag"));
    }

    let pixel_type = flags & 0xFF;
    let format = format_from_pvr2(pixel_type, alpha_mask != 0).ok_or_else(|| {
        unsupported(container, format!("legacy pixel type {pixel_type:#x}"))
    })?;
    if flags & PVR2_TWIDDLED != 0 && !format.is_compressed() {
        return Err(unsupported(
            container,
            "twiddled uncompressed data is not supported",
        ));
    }

    let is_cube_map = flags & PVR2_CUBE_MAP != 0;
    let num_surfaces = match (is_cube_map, num_surfaces) {
        (true, _) => 6,
        (false, 0) => 1,
        (false, n) => n,
    };
    // Volume textures store depth layers as surfaces.
    let (depth, num_slices) = if flags & PVR2_VOLUME != 0 {
        (num_surfaces, 1)
    } else {
        (1, num_surfaces)
    };

    // The mipmap count does not include the base level.
    let mut image = Image::layout(
        width,
        height,
        depth,
        num_slices,
        num_mipmaps.saturating_add(1),
        format,
    )
    .allocate(container, reader.remaining().len())?;

    // Reorder each slice and its mipmaps to the mipmap major layout.
    for slice in 0..num_slices {
        for level in 0..image.num_mipmaps {
            let size = image.slice_size(level);
            let offset = image.offset(level, slice);
            image.data[offset..offset + size].copy_from_slice(reader.bytes(size)?);
        }
    }
    image.flags.set(ImageFlags::CUBE_MAP, is_cube_map);

    debug!("Loaded {width} x {height} PVR2 with format {format:?}");
    Ok(image)
}

impl<T: AsRef<[u8]>> Image<T> {
    /// Saves the image as a version 3 PVR file.
    ///
    /// Cube maps with 6 slices per surface are saved with 6 faces.
    pub fn to_pvr(&self) -> Result<Vec<u8>, ImageError> {
        self.validate()?;
        let (pixel_format, channel_type) = format_to_pvr3(self.format).ok_or_else(|| {
            unsupported(
                ContainerFormat::Pvr,
                format!("{:?} can not be saved", self.format),
            )
        })?;

        let (num_surfaces, num_faces) = if self.is_cube_map() && self.num_slices % 6 == 0 {
            (self.num_slices / 6, 6u32)
        } else {
            (self.num_slices, 1u32)
        };
        let color_space = u32::from(self.gamma_space == GammaSpace::Srgb);

        let size = self.mem_required();
        let mut bytes = Vec::with_capacity(52 + size);
        bytes.extend_from_slice(&PVR3_VERSION.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&pixel_format.to_le_bytes());
        bytes.extend_from_slice(&color_space.to_le_bytes());
        bytes.extend_from_slice(&channel_type.to_le_bytes());
        bytes.extend_from_slice(&self.height.to_le_bytes());
        bytes.extend_from_slice(&self.width.to_le_bytes());
        bytes.extend_from_slice(&self.depth.to_le_bytes());
        bytes.extend_from_slice(&num_surfaces.to_le_bytes());
        bytes.extend_from_slice(&num_faces.to_le_bytes());
        bytes.extend_from_slice(&self.num_mipmaps.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&self.data.as_ref()[..size]);
        Ok(bytes)
    }
}
