use log::warn;
use rayon::prelude::*;

use crate::{max_mipmap_levels, surface::Image, texel::Texels, ImageError};

impl Image<Vec<u8>> {
    /// Regenerates the full mipmap chain for every slice from the base level.
    ///
    /// Each level averages a 2x2x2 footprint of the previous level.
    /// `u8` images in sRGB or Pow22 space are averaged in linear space.
    /// Compressed and packed formats are not supported.
    pub fn generate_mipmaps(&mut self) -> Result<(), ImageError> {
        let Some(texels) = Texels::new(self.format, self.gamma_space) else {
            warn!(
                "Mipmaps can only be generated for u8, f16, or f32 channels but found {:?}.",
                self.format
            );
            return Err(ImageError::UnsupportedFormat {
                format: self.format,
            });
        };
        self.validate()?;

        // The base level of every slice is at the start regardless of the mipmap count.
        let base_size = self.slice_size(0) * self.num_slices as usize;
        self.num_mipmaps = max_mipmap_levels(self.width, self.height, self.depth);
        self.data.truncate(base_size);
        self.data.resize(self.mem_required(), 0);

        for level in 1..self.num_mipmaps {
            let source = (
                self.mip_width(level - 1) as usize,
                self.mip_height(level - 1) as usize,
                self.mip_depth(level - 1) as usize,
            );
            let target = (
                self.mip_width(level) as usize,
                self.mip_height(level) as usize,
                self.mip_depth(level) as usize,
            );

            for slice in 0..self.num_slices {
                let source_offset = self.offset(level - 1, slice);
                let source_size = self.slice_size(level - 1);
                let target_offset = self.offset(level, slice);
                let target_size = self.slice_size(level);

                // Levels are stored in increasing order, so the previous level is before the target.
                let (previous, next) = self.data.split_at_mut(target_offset);
                downsample(
                    &texels,
                    &previous[source_offset..source_offset + source_size],
                    source,
                    &mut next[..target_size],
                    target,
                );
            }
        }

        Ok(())
    }
}

/// Box filters `source` into `target` with clamped edges for odd or single pixel dimensions.
fn downsample(
    texels: &Texels,
    source: &[u8],
    (source_width, source_height, source_depth): (usize, usize, usize),
    target: &mut [u8],
    (target_width, target_height, _): (usize, usize, usize),
) {
    let row_size = target_width * texels.pixel_size();
    let components = texels.components();

    target
        .par_chunks_mut(row_size)
        .enumerate()
        .for_each(|(row, target_row)| {
            let y = row % target_height;
            let z = row / target_height;

            let xs = |x: usize| [x * 2, (x * 2 + 1).min(source_width - 1)];
            let ys = [y * 2, (y * 2 + 1).min(source_height - 1)];
            let zs = [z * 2, (z * 2 + 1).min(source_depth - 1)];

            let mut value = [0.0f32; 4];
            for x in 0..target_width {
                let mut sum = [0.0f32; 4];
                for sz in zs {
                    for sy in ys {
                        for sx in xs(x) {
                            let pixel = (sz * source_height + sy) * source_width + sx;
                            texels.read(source, pixel, &mut value);
                            for c in 0..components {
                                sum[c] += value[c];
                            }
                        }
                    }
                }
                texels.write(target_row, x, &sum.map(|s| s / 8.0));
            }
        });
}
