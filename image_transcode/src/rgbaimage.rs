use image::{Rgba32FImage, RgbaImage};

use crate::{Format, GammaSpace, Image, ImageError, ImageFlags, Quality};

impl Image {
    /// Creates a 2D [Format::Rgba8] image with a single mipmap in sRGB space.
    pub fn from_rgba8_image(image: &RgbaImage) -> Image {
        Image {
            width: image.width(),
            height: image.height(),
            depth: 1,
            num_slices: 1,
            num_mipmaps: 1,
            format: Format::Rgba8,
            gamma_space: GammaSpace::Srgb,
            flags: ImageFlags::empty(),
            data: image.as_raw().clone(),
        }
    }

    /// Creates a 2D [Format::Rgba32F] image with a single mipmap in linear space.
    pub fn from_rgba32f_image(image: &Rgba32FImage) -> Image {
        Image {
            width: image.width(),
            height: image.height(),
            depth: 1,
            num_slices: 1,
            num_mipmaps: 1,
            format: Format::Rgba32F,
            gamma_space: GammaSpace::Linear,
            flags: ImageFlags::LINEAR_SPACE,
            data: bytemuck::cast_slice::<f32, u8>(image.as_raw().as_slice()).to_vec(),
        }
    }
}

impl<T: AsRef<[u8]>> Image<T> {
    /// Decodes `level` of `slice` to RGBA8.
    ///
    /// Depth layers of 3D images are stacked vertically from top to bottom.
    pub fn to_rgba8_image(&self, level: u32, slice: u32) -> Result<RgbaImage, ImageError> {
        let (width, height, data) = self.rgba_level(Format::Rgba8, level, slice)?;
        let data_length = data.len();
        RgbaImage::from_raw(width, height, data).ok_or(ImageError::NotEnoughData {
            expected: width as usize * height as usize * 4,
            actual: data_length,
        })
    }

    /// Decodes `level` of `slice` to RGBA32F.
    ///
    /// Depth layers of 3D images are stacked vertically from top to bottom.
    pub fn to_rgba32f_image(&self, level: u32, slice: u32) -> Result<Rgba32FImage, ImageError> {
        let (width, height, data) = self.rgba_level(Format::Rgba32F, level, slice)?;
        let data: Vec<f32> = data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        let data_length = data.len() * 4;
        Rgba32FImage::from_raw(width, height, data).ok_or(ImageError::NotEnoughData {
            expected: width as usize * height as usize * 16,
            actual: data_length,
        })
    }

    fn rgba_level(
        &self,
        format: Format,
        level: u32,
        slice: u32,
    ) -> Result<(u32, u32, Vec<u8>), ImageError> {
        let converted = self.convert_format(format, false, Quality::Normal)?;
        let data = converted.get_or_err(level, slice)?.to_vec();
        Ok((
            converted.mip_width(level),
            converted.mip_height(level) * converted.mip_depth(level),
            data,
        ))
    }
}
