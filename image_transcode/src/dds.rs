use ddsfile::{
    AlphaMode, Caps2, D3D10ResourceDimension, D3DFormat, Dds, DxgiFormat, FourCC, MiscFlag,
    NewD3dParams, NewDxgiParams,
};
use log::debug;

use crate::{
    file::{malformed, unsupported},
    ContainerFormat, Format, GammaSpace, Image, ImageError, ImageFlags,
};

impl Image {
    /// Loads the bytes of a DDS file.
    pub fn from_dds_bytes(data: &[u8]) -> Result<Image, ImageError> {
        if !data.starts_with(b"DDS ") {
            return Err(malformed(ContainerFormat::Dds, "missing DDS signature"));
        }
        let mut reader = data;
        let dds = Dds::read(&mut reader)?;
        Image::from_dds(&dds)
    }

    /// Copies every layer and mipmap of `dds` into a new image.
    ///
    /// Cube maps have 6 slices for each array layer.
    pub fn from_dds(dds: &Dds) -> Result<Image, ImageError> {
        let (format, gamma_space) = dds_format(dds).ok_or_else(|| {
            unsupported(
                ContainerFormat::Dds,
                format!(
                    "DXGI {:?}, D3D {:?}, FourCC {:?}",
                    dds.get_dxgi_format(),
                    dds.get_d3d_format(),
                    dds.header.spf.fourcc
                ),
            )
        })?;

        let is_cube_map = dds.header.caps2.contains(Caps2::CUBEMAP)
            || dds
                .header10
                .as_ref()
                .map(|h| h.misc_flag.contains(MiscFlag::TEXTURECUBE))
                .unwrap_or_default();
        let faces = if is_cube_map { 6 } else { 1 };
        let layers = dds.header10.as_ref().map(|h| h.array_size).unwrap_or(1);
        let num_slices = layers.max(1) * faces;

        let mut image = Image::layout(
            dds.get_width(),
            dds.get_height(),
            dds.get_depth().max(1),
            num_slices,
            dds.get_num_mipmap_levels().max(1),
            format,
        )
        .allocate(ContainerFormat::Dds, dds.data.len())?;
        image.gamma_space = gamma_space;
        image
            .flags
            .set(ImageFlags::LINEAR_SPACE, gamma_space == GammaSpace::Linear);
        image.flags.set(ImageFlags::CUBE_MAP, is_cube_map);

        // DDS stores each layer with all of its mipmaps.
        let mut offset = 0;
        for slice in 0..image.num_slices {
            for level in 0..image.num_mipmaps {
                let size = image.slice_size(level);
                let target = image.offset(level, slice);
                image.data[target..target + size].copy_from_slice(&dds.data[offset..offset + size]);
                offset += size;
            }
        }

        debug!(
            "Loaded {} x {} x {} DDS with {} slices and format {:?}",
            image.width, image.height, image.depth, image.num_slices, format
        );
        Ok(image)
    }
}

impl<T: AsRef<[u8]>> Image<T> {
    /// Creates a DDS file with every slice and mipmap.
    ///
    /// Formats with a DXGI equivalent use the DX10 header and the rest use legacy D3D formats.
    pub fn to_dds(&self) -> Result<Dds, ImageError> {
        self.validate()?;

        let is_cube_map = self.is_cube_map() && self.num_slices % 6 == 0;
        let layers = if is_cube_map {
            self.num_slices / 6
        } else {
            self.num_slices
        };
        let depth = (self.depth > 1).then_some(self.depth);

        let mut dds = if let Some(format) = dxgi_format(self.format, self.gamma_space) {
            Dds::new_dxgi(NewDxgiParams {
                height: self.height,
                width: self.width,
                depth,
                format,
                mipmap_levels: (self.num_mipmaps > 1).then_some(self.num_mipmaps),
                array_layers: (layers > 1).then_some(layers),
                caps2: None,
                is_cubemap: is_cube_map,
                resource_dimension: if self.depth > 1 {
                    D3D10ResourceDimension::Texture3D
                } else {
                    D3D10ResourceDimension::Texture2D
                },
                alpha_mode: AlphaMode::Straight,
            })?
        } else if let Some(format) = d3d_format(self.format) {
            if layers > 1 {
                return Err(unsupported(
                    ContainerFormat::Dds,
                    format!("array textures require a DXGI format but found {:?}", self.format),
                ));
            }
            Dds::new_d3d(NewD3dParams {
                height: self.height,
                width: self.width,
                depth,
                format,
                mipmap_levels: (self.num_mipmaps > 1).then_some(self.num_mipmaps),
                caps2: is_cube_map.then_some(
                    Caps2::CUBEMAP
                        | Caps2::CUBEMAP_POSITIVEX
                        | Caps2::CUBEMAP_NEGATIVEX
                        | Caps2::CUBEMAP_POSITIVEY
                        | Caps2::CUBEMAP_NEGATIVEY
                        | Caps2::CUBEMAP_POSITIVEZ
                        | Caps2::CUBEMAP_NEGATIVEZ,
                ),
            })?
        } else {
            return Err(unsupported(
                ContainerFormat::Dds,
                format!("{:?} can not be saved", self.format),
            ));
        };

        let mut data = Vec::with_capacity(self.mem_required());
        for slice in 0..self.num_slices {
            for level in 0..self.num_mipmaps {
                data.extend_from_slice(self.get_or_err(level, slice)?);
            }
        }
        dds.data = data;

        Ok(dds)
    }
}

fn dds_format(dds: &Dds) -> Option<(Format, GammaSpace)> {
    // The format can be DXGI, D3D, or specified in the FOURCC.
    let dxgi = dds.get_dxgi_format();
    let d3d = dds.get_d3d_format();
    let fourcc = dds.header.spf.fourcc.as_ref();

    dxgi.and_then(format_from_dxgi)
        .or_else(|| d3d.and_then(format_from_d3d).map(|f| (f, GammaSpace::Linear)))
        .or_else(|| {
            fourcc
                .and_then(format_from_fourcc)
                .map(|f| (f, GammaSpace::Linear))
        })
}

fn format_from_dxgi(format: DxgiFormat) -> Option<(Format, GammaSpace)> {
    let srgb = |f| Some((f, GammaSpace::Srgb));
    let linear = |f| Some((f, GammaSpace::Linear));
    match format {
        DxgiFormat::R8_UNorm => linear(Format::R8),
        DxgiFormat::R8_SNorm => linear(Format::R8Snorm),
        DxgiFormat::R8G8_UNorm => linear(Format::Rg8),
        DxgiFormat::R8G8_SNorm => linear(Format::Rg8Snorm),
        DxgiFormat::R8G8B8A8_UNorm => linear(Format::Rgba8),
        DxgiFormat::R8G8B8A8_UNorm_sRGB => srgb(Format::Rgba8),
        DxgiFormat::R8G8B8A8_SNorm => linear(Format::Rgba8Snorm),
        DxgiFormat::B8G8R8A8_UNorm => linear(Format::Bgra8),
        DxgiFormat::B8G8R8A8_UNorm_sRGB => srgb(Format::Bgra8),
        DxgiFormat::A8_UNorm => linear(Format::A8),
        DxgiFormat::B4G4R4A4_UNorm => linear(Format::Bgra4),
        DxgiFormat::B5G6R5_UNorm => linear(Format::Rgb565),
        DxgiFormat::B5G5R5A1_UNorm => linear(Format::Bgra5551),
        DxgiFormat::R16_UNorm => linear(Format::R16),
        DxgiFormat::R16_SNorm => linear(Format::R16Snorm),
        DxgiFormat::R16G16_UNorm => linear(Format::Rg16),
        DxgiFormat::R16G16_SNorm => linear(Format::Rg16Snorm),
        DxgiFormat::R16G16B16A16_UNorm => linear(Format::Rgba16),
        DxgiFormat::R16G16B16A16_SNorm => linear(Format::Rgba16Snorm),
        DxgiFormat::R16_Float => linear(Format::R16F),
        DxgiFormat::R16G16_Float => linear(Format::Rg16F),
        DxgiFormat::R16G16B16A16_Float => linear(Format::Rgba16F),
        DxgiFormat::R32_Float => linear(Format::R32F),
        DxgiFormat::R32G32_Float => linear(Format::Rg32F),
        DxgiFormat::R32G32B32_Float => linear(Format::Rgb32F),
        DxgiFormat::R32G32B32A32_Float => linear(Format::Rgba32F),
        DxgiFormat::R11G11B10_Float => linear(Format::Rg11b10F),
        DxgiFormat::R9G9B9E5_SharedExp => linear(Format::Rgb9e5),
        DxgiFormat::D16_UNorm => linear(Format::D16),
        DxgiFormat::D24_UNorm_S8_UInt => linear(Format::D24S8),
        DxgiFormat::D32_Float => linear(Format::D32F),
        DxgiFormat::BC1_UNorm => linear(Format::Dxt1),
        DxgiFormat::BC1_UNorm_sRGB => srgb(Format::Dxt1),
        DxgiFormat::BC2_UNorm => linear(Format::Dxt3),
        DxgiFormat::BC2_UNorm_sRGB => srgb(Format::Dxt3),
        DxgiFormat::BC3_UNorm => linear(Format::Dxt5),
        DxgiFormat::BC3_UNorm_sRGB => srgb(Format::Dxt5),
        DxgiFormat::BC4_UNorm => linear(Format::Bc4),
        DxgiFormat::BC5_UNorm => linear(Format::Bc5),
        _ => None,
    }
}

fn dxgi_format(format: Format, gamma_space: GammaSpace) -> Option<DxgiFormat> {
    let srgb = gamma_space == GammaSpace::Srgb;
    match format {
        Format::R8 => Some(DxgiFormat::R8_UNorm),
        Format::R8Snorm => Some(DxgiFormat::R8_SNorm),
        Format::Rg8 => Some(DxgiFormat::R8G8_UNorm),
        Format::Rg8Snorm => Some(DxgiFormat::R8G8_SNorm),
        Format::Rgba8 if srgb => Some(DxgiFormat::R8G8B8A8_UNorm_sRGB),
        Format::Rgba8 => Some(DxgiFormat::R8G8B8A8_UNorm),
        Format::Rgba8Snorm => Some(DxgiFormat::R8G8B8A8_SNorm),
        Format::Bgra8 if srgb => Some(DxgiFormat::B8G8R8A8_UNorm_sRGB),
        Format::Bgra8 => Some(DxgiFormat::B8G8R8A8_UNorm),
        Format::A8 => Some(DxgiFormat::A8_UNorm),
        Format::Bgra4 => Some(DxgiFormat::B4G4R4A4_UNorm),
        Format::Rgb565 => Some(DxgiFormat::B5G6R5_UNorm),
        Format::Bgra5551 => Some(DxgiFormat::B5G5R5A1_UNorm),
        Format::R16 => Some(DxgiFormat::R16_UNorm),
        Format::R16Snorm => Some(DxgiFormat::R16_SNorm),
        Format::Rg16 => Some(DxgiFormat::R16G16_UNorm),
        Format::Rg16Snorm => Some(DxgiFormat::R16G16_SNorm),
        Format::Rgba16 => Some(DxgiFormat::R16G16B16A16_UNorm),
        Format::Rgba16Snorm => Some(DxgiFormat::R16G16B16A16_SNorm),
        Format::R16F => Some(DxgiFormat::R16_Float),
        Format::Rg16F => Some(DxgiFormat::R16G16_Float),
        Format::Rgba16F => Some(DxgiFormat::R16G16B16A16_Float),
        Format::R32F => Some(DxgiFormat::R32_Float),
        Format::Rg32F => Some(DxgiFormat::R32G32_Float),
        Format::Rgb32F => Some(DxgiFormat::R32G32B32_Float),
        Format::Rgba32F => Some(DxgiFormat::R32G32B32A32_Float),
        Format::Rg11b10F => Some(DxgiFormat::R11G11B10_Float),
        Format::Rgb9e5 => Some(DxgiFormat::R9G9B9E5_SharedExp),
        Format::D16 => Some(DxgiFormat::D16_UNorm),
        Format::D24S8 => Some(DxgiFormat::D24_UNorm_S8_UInt),
        Format::D32F => Some(DxgiFormat::D32_Float),
        Format::Dxt1 if srgb => Some(DxgiFormat::BC1_UNorm_sRGB),
        Format::Dxt1 => Some(DxgiFormat::BC1_UNorm),
        Format::Dxt3 if srgb => Some(DxgiFormat::BC2_UNorm_sRGB),
        Format::Dxt3 => Some(DxgiFormat::BC2_UNorm),
        Format::Dxt5 if srgb => Some(DxgiFormat::BC3_UNorm_sRGB),
        Format::Dxt5 => Some(DxgiFormat::BC3_UNorm),
        Format::Bc4 => Some(DxgiFormat::BC4_UNorm),
        Format::Bc5 => Some(DxgiFormat::BC5_UNorm),
        _ => None,
    }
}

fn format_from_d3d(format: D3DFormat) -> Option<Format> {
    match format {
        D3DFormat::DXT1 => Some(Format::Dxt1),
        D3DFormat::DXT2 | D3DFormat::DXT3 => Some(Format::Dxt3),
        D3DFormat::DXT4 | D3DFormat::DXT5 => Some(Format::Dxt5),
        D3DFormat::A8B8G8R8 => Some(Format::Rgba8),
        D3DFormat::A8R8G8B8 => Some(Format::Bgra8),
        // D3D names list channels from the most significant bits.
        D3DFormat::R8G8B8 => Some(Format::Bgr8),
        D3DFormat::R5G6B5 => Some(Format::Rgb565),
        D3DFormat::A1R5G5B5 => Some(Format::Bgra5551),
        D3DFormat::A4R4G4B4 => Some(Format::Bgra4),
        D3DFormat::L8 => Some(Format::L8),
        D3DFormat::A8L8 => Some(Format::L8A8),
        D3DFormat::L16 => Some(Format::L16),
        D3DFormat::A8 => Some(Format::A8),
        _ => None,
    }
}

fn d3d_format(format: Format) -> Option<D3DFormat> {
    match format {
        Format::Bgr8 => Some(D3DFormat::R8G8B8),
        Format::L8 => Some(D3DFormat::L8),
        Format::L8A8 => Some(D3DFormat::A8L8),
        Format::L16 => Some(D3DFormat::L16),
        _ => None,
    }
}

const BC4U: u32 = u32::from_le_bytes(*b"BC4U");
const ATI1: u32 = u32::from_le_bytes(*b"ATI1");
const BC5U: u32 = u32::from_le_bytes(*b"BC5U");
const ATI2: u32 = u32::from_le_bytes(*b"ATI2");
const ETC1: u32 = u32::from_le_bytes(*b"ETC1");
const ATC: u32 = u32::from_le_bytes(*b"ATC ");
const ATCA: u32 = u32::from_le_bytes(*b"ATCA");
const ATCI: u32 = u32::from_le_bytes(*b"ATCI");

fn format_from_fourcc(fourcc: &FourCC) -> Option<Format> {
    match fourcc.0 {
        FourCC::DXT1 => Some(Format::Dxt1),
        FourCC::DXT2 | FourCC::DXT3 => Some(Format::Dxt3),
        FourCC::DXT4 | FourCC::DXT5 => Some(Format::Dxt5),
        ATI1 | BC4U => Some(Format::Bc4),
        ATI2 | BC5U => Some(Format::Bc5),
        ETC1 => Some(Format::Etc1),
        ATC => Some(Format::AtcRgb),
        ATCA => Some(Format::AtcRgbaExplicit),
        ATCI => Some(Format::AtcRgbaInterpolated),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(image: &Image) -> Vec<u8> {
        let mut bytes = Vec::new();
        image.to_dds().unwrap().write(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn rgba8_4x4_round_trip() {
        let data: Vec<u8> = (0..64).collect();
        let image = Image::from_data(4, 4, 1, 1, 1, Format::Rgba8, data.clone()).unwrap();
        let loaded = Image::from_dds_bytes(&write(&image)).unwrap();

        assert_eq!(Format::Rgba8, loaded.format);
        assert_eq!((4, 4, 1, 1, 1), loaded.dimensions());
        assert_eq!(data, loaded.data);
    }

    #[test]
    fn dxt5_srgb_mipmaps_round_trip() {
        let mut image = Image::new_2d(8, 8, 0, Format::Dxt5).unwrap();
        image.gamma_space = GammaSpace::Srgb;
        for (i, b) in image.data.iter_mut().enumerate() {
            *b = i as u8;
        }

        let dds = image.to_dds().unwrap();
        assert_eq!(Some(DxgiFormat::BC3_UNorm_sRGB), dds.get_dxgi_format());

        let loaded = Image::from_dds(&dds).unwrap();
        assert_eq!(4, loaded.num_mipmaps);
        assert_eq!(GammaSpace::Srgb, loaded.gamma_space);
        assert_eq!(image.data, loaded.data);
    }

    #[test]
    fn array_layers_reordered() {
        // 2 slices with 2x2 and 1x1 mipmaps.
        let image = Image::from_data(
            2,
            2,
            1,
            2,
            2,
            Format::R8,
            vec![1, 1, 1, 1, 3, 3, 3, 3, 2, 4],
        )
        .unwrap();

        let dds = image.to_dds().unwrap();
        assert_eq!(vec![1, 1, 1, 1, 2, 3, 3, 3, 3, 4], dds.data);

        let loaded = Image::from_dds(&dds).unwrap();
        assert_eq!(image.data, loaded.data);
    }

    #[test]
    fn cube_map_round_trip() {
        let mut image = Image::new(4, 4, 1, 6, 1, Format::Bc4).unwrap();
        image.flags |= ImageFlags::CUBE_MAP;
        for (i, b) in image.data.iter_mut().enumerate() {
            *b = i as u8;
        }

        let loaded = Image::from_dds_bytes(&write(&image)).unwrap();
        assert!(loaded.is_cube_map());
        assert_eq!(6, loaded.num_slices);
        assert_eq!(image.data, loaded.data);
    }

    #[test]
    fn legacy_bgr8() {
        let image = Image::from_data(1, 1, 1, 1, 1, Format::Bgr8, vec![1, 2, 3]).unwrap();
        let dds = image.to_dds().unwrap();
        assert_eq!(None, dds.get_dxgi_format());

        let loaded = Image::from_dds(&dds).unwrap();
        assert_eq!(Format::Bgr8, loaded.format);
        assert_eq!(vec![1, 2, 3], loaded.data);
    }

    #[test]
    fn unsupported_save() {
        let image = Image::new_2d(4, 4, 1, Format::Etc1).unwrap();
        assert!(matches!(
            image.to_dds(),
            Err(ImageError::UnsupportedContainerFormat {
                container: ContainerFormat::Dds,
                ..
            })
        ));
    }

    #[test]
    fn missing_signature() {
        assert!(matches!(
            Image::from_dds_bytes(&[0u8; 128]),
            Err(ImageError::MalformedContainer { .. })
        ));
    }

    #[test]
    fn huge_dimensions_small_file() {
        let image = Image::new_2d(4, 4, 1, Format::Rgba8).unwrap();
        let mut bytes = write(&image);
        bytes[12..16].copy_from_slice(&65536u32.to_le_bytes());
        bytes[16..20].copy_from_slice(&65536u32.to_le_bytes());
        assert!(matches!(
            Image::from_dds_bytes(&bytes),
            Err(ImageError::MalformedContainer { .. })
        ));
    }

    #[test]
    fn truncated_data() {
        let image = Image::new_2d(4, 4, 1, Format::Rgba8).unwrap();
        let mut dds = image.to_dds().unwrap();
        dds.data.truncate(60);
        assert!(matches!(
            Image::from_dds(&dds),
            Err(ImageError::MalformedContainer { .. })
        ));
    }
}
