use crate::{surface::Image, texel::Texels, GammaSpace, ImageError};

/// The resampling filter for [Image::resize].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Bilinear,
    /// Catmull-Rom with 4x4 taps.
    Bicubic,
}

impl<T: AsRef<[u8]>> Image<T> {
    /// Resamples the base level of every slice and depth layer to `width` x `height`.
    ///
    /// The mipmaps are regenerated if the image has more than one mipmap.
    /// Only formats with `u8`, `f16`, or `f32` channels are supported.
    pub fn resize(
        &self,
        width: u32,
        height: u32,
        filter: ResizeFilter,
    ) -> Result<Image, ImageError> {
        // Values are resampled as stored without gamma correction.
        let texels =
            Texels::new(self.format, GammaSpace::Linear).ok_or(ImageError::UnsupportedFormat {
                format: self.format,
            })?;
        self.validate()?;

        let mut resized = Image::new(width, height, self.depth, self.num_slices, 1, self.format)?;
        resized.gamma_space = self.gamma_space;
        resized.flags = self.flags;

        let source_size = (self.width as usize, self.height as usize);
        let target_size = (width as usize, height as usize);
        let source_layer_size = self.width as usize * self.height as usize * texels.pixel_size();
        let target_layer_size = width as usize * height as usize * texels.pixel_size();

        for slice in 0..self.num_slices {
            let source = self.get_or_err(0, slice)?;
            let target = resized
                .get_mut(0, slice)
                .ok_or(ImageError::MipmapDataOutOfBounds { slice, mipmap: 0 })?;

            for (source, target) in source
                .chunks_exact(source_layer_size)
                .zip(target.chunks_exact_mut(target_layer_size))
            {
                resample(&texels, source, source_size, target, target_size, filter);
            }
        }

        if self.num_mipmaps > 1 {
            resized.generate_mipmaps()?;
        }

        Ok(resized)
    }
}

fn resample(
    texels: &Texels,
    source: &[u8],
    (source_width, source_height): (usize, usize),
    target: &mut [u8],
    (target_width, target_height): (usize, usize),
    filter: ResizeFilter,
) {
    let components = texels.components();
    let scale_x = source_width as f32 / target_width as f32;
    let scale_y = source_height as f32 / target_height as f32;

    let mut pixel = [0.0f32; 4];
    for y in 0..target_height {
        for x in 0..target_width {
            let mut output = [0.0f32; 4];
            match filter {
                ResizeFilter::Nearest => {
                    let sx = (((x as f32 + 0.5) * scale_x) as usize).min(source_width - 1);
                    let sy = (((y as f32 + 0.5) * scale_y) as usize).min(source_height - 1);
                    texels.read(source, sy * source_width + sx, &mut output);
                }
                ResizeFilter::Bilinear | ResizeFilter::Bicubic => {
                    let fx = (x as f32 + 0.5) * scale_x - 0.5;
                    let fy = (y as f32 + 0.5) * scale_y - 0.5;
                    let x0 = fx.floor();
                    let y0 = fy.floor();

                    let (taps_x, weights_x) = taps(filter, x0 as isize, fx - x0, source_width);
                    let (taps_y, weights_y) = taps(filter, y0 as isize, fy - y0, source_height);

                    for (sy, wy) in taps_y.iter().zip(weights_y) {
                        for (sx, wx) in taps_x.iter().zip(weights_x) {
                            let weight = wx * wy;
                            if weight == 0.0 {
                                continue;
                            }
                            texels.read(source, sy * source_width + sx, &mut pixel);
                            for c in 0..components {
                                output[c] += pixel[c] * weight;
                            }
                        }
                    }
                }
            }
            texels.write(target, y * target_width + x, &output);
        }
    }
}

/// Clamped sample indices and weights along one axis.
fn taps(filter: ResizeFilter, i: isize, t: f32, len: usize) -> ([usize; 4], [f32; 4]) {
    let clamp = |i: isize| i.clamp(0, len as isize - 1) as usize;
    let indices = [clamp(i - 1), clamp(i), clamp(i + 1), clamp(i + 2)];
    let weights = match filter {
        ResizeFilter::Bicubic => catmull_rom(t),
        _ => [0.0, 1.0 - t, t, 0.0],
    };
    (indices, weights)
}

fn catmull_rom(t: f32) -> [f32; 4] {
    [
        ((-0.5 * t + 1.0) * t - 0.5) * t,
        (1.5 * t - 2.5) * t * t + 1.0,
        ((-1.5 * t + 2.0) * t + 0.5) * t,
        (0.5 * t - 0.5) * t * t,
    ]
}
