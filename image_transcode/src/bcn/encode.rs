use rayon::prelude::*;

use crate::{div_round_up, rgba::Channel, ImageError, Quality};

use super::{
    alpha::{compress_alpha_block, compress_explicit_alpha},
    color::{compress_color_block, ColorMode},
    flatten, Bc4, Bc5, Block, Dxt1, Dxt3, Dxt5, BLOCK_HEIGHT, BLOCK_WIDTH, CHANNELS,
};

pub trait BlockEncode<Pixel> {
    type CompressedBlock: Block;
    type Settings: Sync;

    // The 4x4 pixels are in row-major ordering.
    fn compress_block(
        pixels: &[[Pixel; BLOCK_WIDTH]; BLOCK_HEIGHT],
        settings: &Self::Settings,
    ) -> Self::CompressedBlock;
}

fn channel(pixels: &[[[u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT], c: usize) -> [u8; 16] {
    flatten(pixels).map(|p| p[c])
}

impl BlockEncode<[u8; 4]> for Dxt1 {
    type CompressedBlock = [u8; 8];
    type Settings = Quality;

    fn compress_block(pixels: &[[[u8; 4]; 4]; 4], quality: &Quality) -> [u8; 8] {
        compress_color_block(&flatten(pixels), ColorMode::Dxt1, *quality)
    }
}

impl BlockEncode<[u8; 4]> for Dxt3 {
    type CompressedBlock = [u8; 16];
    type Settings = Quality;

    fn compress_block(pixels: &[[[u8; 4]; 4]; 4], quality: &Quality) -> [u8; 16] {
        let mut block = [0u8; 16];
        block[..8].copy_from_slice(&compress_explicit_alpha(&channel(pixels, 3)));
        block[8..].copy_from_slice(&compress_color_block(
            &flatten(pixels),
            ColorMode::FourColor,
            *quality,
        ));
        block
    }
}

impl BlockEncode<[u8; 4]> for Dxt5 {
    type CompressedBlock = [u8; 16];
    type Settings = Quality;

    fn compress_block(pixels: &[[[u8; 4]; 4]; 4], quality: &Quality) -> [u8; 16] {
        let mut block = [0u8; 16];
        block[..8].copy_from_slice(&compress_alpha_block(&channel(pixels, 3), *quality));
        block[8..].copy_from_slice(&compress_color_block(
            &flatten(pixels),
            ColorMode::FourColor,
            *quality,
        ));
        block
    }
}

impl BlockEncode<[u8; 4]> for Bc4 {
    type CompressedBlock = [u8; 8];
    type Settings = Quality;

    fn compress_block(pixels: &[[[u8; 4]; 4]; 4], quality: &Quality) -> [u8; 8] {
        compress_alpha_block(&channel(pixels, 0), *quality)
    }
}

impl BlockEncode<[u8; 4]> for Bc5 {
    type CompressedBlock = [u8; 16];
    type Settings = Quality;

    fn compress_block(pixels: &[[[u8; 4]; 4]; 4], quality: &Quality) -> [u8; 16] {
        let mut block = [0u8; 16];
        block[..8].copy_from_slice(&compress_alpha_block(&channel(pixels, 0), *quality));
        block[8..].copy_from_slice(&compress_alpha_block(&channel(pixels, 1), *quality));
        block
    }
}

/// Compress a `width` x `height` RGBA surface with channels of type `T` into blocks.
///
/// Partial blocks at the edges repeat the last row and column.
/// Block rows are compressed on `pool` if present and on the calling thread otherwise.
pub fn encode_blocks<F, T>(
    width: u32,
    height: u32,
    rgba: &[u8],
    settings: &F::Settings,
    pool: Option<&rayon::ThreadPool>,
) -> Result<Vec<u8>, ImageError>
where
    F: BlockEncode<[T; 4]>,
    T: Channel,
{
    let blocks_x = div_round_up(width as usize, BLOCK_WIDTH);
    let blocks_y = div_round_up(height as usize, BLOCK_HEIGHT);

    let row_size = blocks_x
        .checked_mul(F::CompressedBlock::SIZE_IN_BYTES)
        .ok_or(ImageError::PixelCountWouldOverflow {
            width,
            height,
            depth: 1,
        })?;
    let output_size = row_size
        .checked_mul(blocks_y)
        .ok_or(ImageError::PixelCountWouldOverflow {
            width,
            height,
            depth: 1,
        })?;

    let expected_rgba_size = width as usize * height as usize * CHANNELS * T::SIZE;
    if rgba.len() < expected_rgba_size {
        return Err(ImageError::NotEnoughData {
            expected: expected_rgba_size,
            actual: rgba.len(),
        });
    }

    let mut output = vec![0u8; output_size];
    if output.is_empty() {
        return Ok(output);
    }

    let encode_row = |(block_y, row): (usize, &mut [u8])| {
        for (block_x, out) in row
            .chunks_exact_mut(F::CompressedBlock::SIZE_IN_BYTES)
            .enumerate()
        {
            let pixels = get_rgba_block::<T>(
                rgba,
                block_x * BLOCK_WIDTH,
                block_y * BLOCK_HEIGHT,
                width as usize,
                height as usize,
            );
            let block = F::compress_block(&pixels, settings);
            out.copy_from_slice(block.as_bytes());
        }
    };

    match pool {
        Some(pool) => pool.install(|| {
            output
                .par_chunks_mut(row_size)
                .enumerate()
                .for_each(encode_row)
        }),
        None => output.chunks_mut(row_size).enumerate().for_each(encode_row),
    }

    Ok(output)
}

fn get_rgba_block<T: Channel>(
    surface: &[u8],
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> [[[T; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT] {
    std::array::from_fn(|row| {
        std::array::from_fn(|column| {
            // Clamp to the edge for partial blocks.
            let px = (x + column).min(width - 1);
            let py = (y + row).min(height - 1);
            let start = (py * width + px) * CHANNELS * T::SIZE;
            std::array::from_fn(|i| T::read(&surface[start + i * T::SIZE..]))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bcn::decode::{decode_blocks, BlockDecode};

    const QUALITIES: [Quality; 3] = [Quality::Fast, Quality::Normal, Quality::HighQuality];

    fn round_trip<F>(width: u32, height: u32, rgba: &[u8], quality: Quality) -> Vec<u8>
    where
        F: BlockEncode<[u8; 4], Settings = Quality> + BlockDecode<[u8; 4]>,
    {
        let blocks = encode_blocks::<F, u8>(width, height, rgba, &quality, None).unwrap();
        let mut decoded = vec![0u8; width as usize * height as usize * 4];
        decode_blocks::<F, u8>(width, height, &blocks, &mut decoded).unwrap();
        decoded
    }

    #[test]
    fn get_rgba_block_clamps_edges() {
        // 2x1 pixels with red values 1 and 2.
        let surface = [1u8, 0, 0, 0, 2, 0, 0, 0];
        let block = get_rgba_block::<u8>(&surface, 0, 0, 2, 1);
        for row in block {
            assert_eq!([1, 2, 2, 2], row.map(|p| p[0]));
        }
    }

    #[test]
    fn dxt1_flat_exact() {
        let rgba = [132u8, 130, 66, 255].repeat(16);
        for quality in QUALITIES {
            assert_eq!(rgba, round_trip::<Dxt1>(4, 4, &rgba, quality));
        }
    }

    #[test]
    fn dxt5_flat_exact() {
        let rgba = [132u8, 130, 66, 77].repeat(6 * 5);
        for quality in QUALITIES {
            assert_eq!(rgba, round_trip::<Dxt5>(6, 5, &rgba, quality));
        }
    }

    #[test]
    fn dxt3_alpha_4_bit() {
        let rgba = [132u8, 130, 66, 0x88].repeat(16);
        assert_eq!(rgba, round_trip::<Dxt3>(4, 4, &rgba, Quality::Normal));
    }

    #[test]
    fn dxt1_transparent() {
        let mut rgba = [255u8, 255, 255, 255].repeat(16);
        rgba[4..8].copy_from_slice(&[255, 255, 255, 0]);
        let decoded = round_trip::<Dxt1>(4, 4, &rgba, Quality::Normal);
        assert_eq!([0, 0, 0, 0], decoded[4..8]);
        assert_eq!([255, 255, 255, 255], decoded[..4]);
    }

    #[test]
    fn bc4_bc5_channels() {
        let rgba = [50u8, 150, 250, 10].repeat(16);
        assert_eq!(
            [50u8, 0, 0, 255].repeat(16),
            round_trip::<Bc4>(4, 4, &rgba, Quality::Fast)
        );
        assert_eq!(
            [50u8, 150, 0, 255].repeat(16),
            round_trip::<Bc5>(4, 4, &rgba, Quality::Fast)
        );
    }

    #[test]
    fn encode_1x1() {
        let blocks =
            encode_blocks::<Dxt5, u8>(1, 1, &[1, 2, 3, 4], &Quality::Fast, None).unwrap();
        assert_eq!(16, blocks.len());
    }

    #[test]
    fn encode_with_pool() {
        let rgba: Vec<u8> = (0..16 * 12 * 4).map(|i| (i % 251) as u8).collect();
        let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let parallel =
            encode_blocks::<Dxt5, u8>(16, 12, &rgba, &Quality::Normal, Some(&pool)).unwrap();
        let serial = encode_blocks::<Dxt5, u8>(16, 12, &rgba, &Quality::Normal, None).unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn encode_not_enough_data() {
        let result = encode_blocks::<Dxt1, u8>(4, 4, &[0u8; 60], &Quality::Fast, None);
        assert!(matches!(
            result,
            Err(ImageError::NotEnoughData {
                expected: 64,
                actual: 60
            })
        ));
    }
}
