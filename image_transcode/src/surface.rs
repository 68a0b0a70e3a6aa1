use bitflags::bitflags;

use crate::{
    max_mipmap_levels, mip_dimension,
    rgba::{read_rgba32f, write_rgba32f},
    Format, GammaSpace, ImageError,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ImageFlags: u32 {
        /// The 6 slices are the faces of a cube map in the order +X, -X, +Y, -Y, +Z, -Z.
        const CUBE_MAP = 1 << 0;
        /// The color data is known to be in linear space.
        const LINEAR_SPACE = 1 << 1;
    }
}

/// An image with a pixel format known at runtime.
///
/// The buffer type `T` is usually `Vec<u8>` for owned data or `&[u8]` for borrowed data.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Image<T = Vec<u8>> {
    /// The width of the base mipmap in pixels.
    pub width: u32,
    /// The height of the base mipmap in pixels.
    pub height: u32,
    /// The depth of the base mipmap in pixels.
    /// This should be `1` for 2D images.
    pub depth: u32,
    /// The number of array slices in the image.
    /// This should be `1` for most images and `6` for cube maps.
    pub num_slices: u32,
    /// The number of mipmaps in the image.
    /// All slices have the same number of mipmaps.
    pub num_mipmaps: u32,
    /// The format of the bytes in [data](#structfield.data).
    pub format: Format,
    pub gamma_space: GammaSpace,
    pub flags: ImageFlags,
    /// The combined image data ordered by mipmap and then slice without additional padding.
    ///
    /// An image with S slices and M mipmaps would have the following layout:
    /// Mip 0 Slice 0, Mip 0 Slice 1, ..., Mip M-1 Slice S-1
    pub data: T,
}

impl<T> Image<T> {
    pub fn mip_width(&self, level: u32) -> u32 {
        mip_dimension(self.width, level)
    }

    pub fn mip_height(&self, level: u32) -> u32 {
        mip_dimension(self.height, level)
    }

    pub fn mip_depth(&self, level: u32) -> u32 {
        mip_dimension(self.depth, level)
    }

    /// The size in bytes of a single slice of mipmap `level`.
    ///
    /// Compressed formats round up to whole blocks and the format's minimum dimensions.
    pub fn slice_size(&self, level: u32) -> usize {
        self.checked_slice_size(level).unwrap_or(usize::MAX)
    }

    /// The size in bytes of `count` mipmaps for a single slice starting at mipmap `first`.
    pub fn size(&self, first: u32, count: u32) -> usize {
        (first..first.saturating_add(count))
            .map(|level| self.slice_size(level))
            .fold(0usize, |acc, s| acc.saturating_add(s))
    }

    /// The size in bytes of all mipmaps and slices.
    pub fn mem_required(&self) -> usize {
        self.size(0, self.num_mipmaps)
            .saturating_mul(self.num_slices as usize)
    }

    /// The offset in bytes of `slice` for mipmap `level`.
    pub fn offset(&self, level: u32, slice: u32) -> usize {
        self.size(0, level)
            .saturating_mul(self.num_slices as usize)
            .saturating_add((slice as usize).saturating_mul(self.slice_size(level)))
    }

    pub fn is_compressed(&self) -> bool {
        self.format.is_compressed()
    }

    pub fn is_cube_map(&self) -> bool {
        self.flags.contains(ImageFlags::CUBE_MAP)
    }

    fn checked_slice_size(&self, level: u32) -> Option<usize> {
        self.format.surface_size(
            self.mip_width(level),
            self.mip_height(level),
            self.mip_depth(level),
        )
    }

    fn checked_mem_required(&self) -> Option<usize> {
        let mut total = 0usize;
        for level in 0..self.num_mipmaps {
            total = total.checked_add(self.checked_slice_size(level)?)?;
        }
        total.checked_mul(self.num_slices as usize)
    }

    /// Checks the dimensions and mipmap count without checking the data length.
    pub(crate) fn validate_dimensions(&self) -> Result<(), ImageError> {
        if self.width == 0 || self.height == 0 || self.depth == 0 || self.num_slices == 0 {
            return Err(ImageError::ZeroSizedImage {
                width: self.width,
                height: self.height,
                depth: self.depth,
            });
        }

        let max_mipmaps = max_mipmap_levels(self.width, self.height, self.depth);
        if self.num_mipmaps == 0 || self.num_mipmaps > max_mipmaps {
            return Err(ImageError::UnexpectedMipmapCount {
                mipmaps: self.num_mipmaps,
                max_mipmaps,
            });
        }

        self.checked_mem_required()
            .ok_or(ImageError::PixelCountWouldOverflow {
                width: self.width,
                height: self.height,
                depth: self.depth,
            })?;

        Ok(())
    }

    /// Returns the dimensions, slices, and mipmaps for comparing image layouts.
    pub(crate) fn dimensions(&self) -> (u32, u32, u32, u32, u32) {
        (
            self.width,
            self.height,
            self.depth,
            self.num_slices,
            self.num_mipmaps,
        )
    }

    /// Creates an image with the same dimensions and gamma but a different buffer and format.
    pub(crate) fn with_data<U>(&self, format: Format, data: U) -> Image<U> {
        Image {
            width: self.width,
            height: self.height,
            depth: self.depth,
            num_slices: self.num_slices,
            num_mipmaps: self.num_mipmaps,
            format,
            gamma_space: self.gamma_space,
            flags: self.flags,
            data,
        }
    }
}

impl Image<Vec<u8>> {
    /// Creates a zero initialized image.
    ///
    /// A `num_mipmaps` of `0` allocates the full mipmap chain.
    pub fn new(
        width: u32,
        height: u32,
        depth: u32,
        num_slices: u32,
        num_mipmaps: u32,
        format: Format,
    ) -> Result<Self, ImageError> {
        let num_mipmaps = if num_mipmaps == 0 {
            max_mipmap_levels(width, height, depth)
        } else {
            num_mipmaps
        };

        let mut image = Image {
            width,
            height,
            depth,
            num_slices,
            num_mipmaps,
            format,
            gamma_space: GammaSpace::Linear,
            flags: ImageFlags::empty(),
            data: Vec::new(),
        };
        image.validate_dimensions()?;
        image.data = vec![0u8; image.mem_required()];
        Ok(image)
    }

    /// Creates a zero initialized 2D image with a single slice.
    pub fn new_2d(
        width: u32,
        height: u32,
        num_mipmaps: u32,
        format: Format,
    ) -> Result<Self, ImageError> {
        Self::new(width, height, 1, 1, num_mipmaps, format)
    }
}

impl Image<()> {
    /// Describes the dimensions of an image without allocating any data.
    pub(crate) fn layout(
        width: u32,
        height: u32,
        depth: u32,
        num_slices: u32,
        num_mipmaps: u32,
        format: Format,
    ) -> Self {
        Image {
            width,
            height,
            depth,
            num_slices,
            num_mipmaps,
            format,
            gamma_space: GammaSpace::Linear,
            flags: ImageFlags::empty(),
            data: (),
        }
    }
}

impl<'a> Image<&'a [u8]> {
    /// Creates an image that borrows `data` without copying.
    pub fn init_from_memory(
        width: u32,
        height: u32,
        num_slices: u32,
        num_mipmaps: u32,
        format: Format,
        data: &'a [u8],
    ) -> Result<Self, ImageError> {
        Image::from_data(width, height, 1, num_slices, num_mipmaps, format, data)
    }
}

impl<T: AsRef<[u8]>> Image<T> {
    /// Creates an image from existing data after checking that `data` is large enough.
    #[allow(clippy::too_many_arguments)]
    pub fn from_data(
        width: u32,
        height: u32,
        depth: u32,
        num_slices: u32,
        num_mipmaps: u32,
        format: Format,
        data: T,
    ) -> Result<Self, ImageError> {
        let image = Image {
            width,
            height,
            depth,
            num_slices,
            num_mipmaps,
            format,
            gamma_space: GammaSpace::Linear,
            flags: ImageFlags::empty(),
            data,
        };
        image.validate()?;
        Ok(image)
    }

    /// Checks the dimensions and that the data has enough bytes for every mipmap and slice.
    pub fn validate(&self) -> Result<(), ImageError> {
        self.validate_dimensions()?;

        let expected = self.mem_required();
        let actual = self.data.as_ref().len();
        if actual < expected {
            return Err(ImageError::NotEnoughData { expected, actual });
        }
        Ok(())
    }

    /// Get the range of image data corresponding to the specified `level` and `slice`.
    ///
    /// The dimensions of the returned data should be calculated using [mip_dimension].
    /// Returns [None] if the expected range is not fully contained within the buffer.
    pub fn get(&self, level: u32, slice: u32) -> Option<&[u8]> {
        if level >= self.num_mipmaps || slice >= self.num_slices {
            return None;
        }
        let offset = self.offset(level, slice);
        let size = self.checked_slice_size(level)?;
        self.data.as_ref().get(offset..offset.checked_add(size)?)
    }

    /// Copies the data into a new image that owns its buffer.
    pub fn to_owned_image(&self) -> Image<Vec<u8>> {
        self.with_data(self.format, self.data.as_ref().to_vec())
    }

    pub(crate) fn get_or_err(&self, level: u32, slice: u32) -> Result<&[u8], ImageError> {
        self.get(level, slice)
            .ok_or(ImageError::MipmapDataOutOfBounds {
                slice,
                mipmap: level,
            })
    }

    /// Converts the color channels of every pixel to `gamma_space`.
    ///
    /// Alpha is unchanged.
    pub fn convert_gamma_space(&self, gamma_space: GammaSpace) -> Result<Image, ImageError> {
        let mut image = self.to_owned_image();
        if gamma_space != self.gamma_space {
            let source = self.gamma_space;
            image.map_pixels(|[r, g, b, a]| {
                let [r, g, b] = [r, g, b].map(|c| gamma_space.from_linear(source.to_linear(c)));
                [r, g, b, a]
            })?;
        }
        image.gamma_space = gamma_space;
        image
            .flags
            .set(ImageFlags::LINEAR_SPACE, gamma_space == GammaSpace::Linear);
        Ok(image)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Image<T> {
    /// Get the mutable range of image data corresponding to the specified `level` and `slice`.
    pub fn get_mut(&mut self, level: u32, slice: u32) -> Option<&mut [u8]> {
        if level >= self.num_mipmaps || slice >= self.num_slices {
            return None;
        }
        let offset = self.offset(level, slice);
        let size = self.checked_slice_size(level)?;
        self.data.as_mut().get_mut(offset..offset.checked_add(size)?)
    }

    /// Mirrors every mipmap and slice horizontally.
    pub fn flip_x(&mut self) -> Result<(), ImageError> {
        self.flip_rows(|row, width, pixel_size| {
            for x in 0..width / 2 {
                let mirrored = width - 1 - x;
                for b in 0..pixel_size {
                    row.swap(x * pixel_size + b, mirrored * pixel_size + b);
                }
            }
        })
    }

    /// Mirrors every mipmap and slice vertically.
    pub fn flip_y(&mut self) -> Result<(), ImageError> {
        if self.is_compressed() {
            return Err(ImageError::UnsupportedFormat {
                format: self.format,
            });
        }

        let pixel_size = self.format.info().size as usize;
        for level in 0..self.num_mipmaps {
            let row_size = self.mip_width(level) as usize * pixel_size;
            let height = self.mip_height(level) as usize;
            let layer_size = row_size * height;
            for slice in 0..self.num_slices {
                let data = self
                    .get_mut(level, slice)
                    .ok_or(ImageError::MipmapDataOutOfBounds {
                        slice,
                        mipmap: level,
                    })?;

                for layer in data.chunks_exact_mut(layer_size) {
                    for y in 0..height / 2 {
                        let (top, bottom) = layer.split_at_mut((height - 1 - y) * row_size);
                        top[y * row_size..(y + 1) * row_size]
                            .swap_with_slice(&mut bottom[..row_size]);
                    }
                }
            }
        }
        Ok(())
    }

    /// Multiplies the color channels of every pixel by alpha.
    pub fn premultiply_alpha(&mut self) -> Result<(), ImageError> {
        self.map_pixels(|[r, g, b, a]| [r * a, g * a, b * a, a])
    }

    fn flip_rows(&mut self, f: impl Fn(&mut [u8], usize, usize)) -> Result<(), ImageError> {
        if self.is_compressed() {
            return Err(ImageError::UnsupportedFormat {
                format: self.format,
            });
        }

        let pixel_size = self.format.info().size as usize;
        for level in 0..self.num_mipmaps {
            let width = self.mip_width(level) as usize;
            for slice in 0..self.num_slices {
                let data = self
                    .get_mut(level, slice)
                    .ok_or(ImageError::MipmapDataOutOfBounds {
                        slice,
                        mipmap: level,
                    })?;
                for row in data.chunks_exact_mut(width * pixel_size) {
                    f(row, width, pixel_size);
                }
            }
        }
        Ok(())
    }

    /// Applies `f` to every pixel through the canonical RGBA32F representation.
    fn map_pixels(&mut self, f: impl Fn([f32; 4]) -> [f32; 4]) -> Result<(), ImageError> {
        const CHUNK_PIXELS: usize = 1024;

        let info = self.format.info();
        let (Some(unpack), Some(pack)) = (info.unpack_rgba32f, info.pack_rgba32f) else {
            return Err(ImageError::UnsupportedFormat {
                format: self.format,
            });
        };

        let expected = self.mem_required();
        let actual = self.data.as_ref().len();
        let data = self
            .data
            .as_mut()
            .get_mut(..expected)
            .ok_or(ImageError::NotEnoughData { expected, actual })?;

        let pixel_size = info.size as usize;
        let mut rgba = vec![0u8; CHUNK_PIXELS * 16];
        for pixels in data.chunks_mut(CHUNK_PIXELS * pixel_size) {
            let count = pixels.len() / pixel_size;
            unpack(pixels, &mut rgba, count);
            for rgba in rgba.chunks_exact_mut(16).take(count) {
                let value = f(read_rgba32f(rgba));
                write_rgba32f(rgba, value);
            }
            pack(&rgba, pixels, count);
        }
        Ok(())
    }
}

impl<T: Default> Image<T> {
    /// Releases the data and resets the dimensions.
    ///
    /// Clearing an already cleared image has no effect.
    pub fn clear(&mut self) {
        self.data = T::default();
        self.width = 0;
        self.height = 0;
        self.depth = 0;
        self.num_slices = 0;
        self.num_mipmaps = 0;
        self.flags = ImageFlags::empty();
    }
}
