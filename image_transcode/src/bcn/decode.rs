use crate::{div_round_up, rgba::Channel, ImageError};

use super::{Bc4, Bc5, Block, Dxt1, Dxt3, Dxt5, BLOCK_HEIGHT, BLOCK_WIDTH, CHANNELS};

pub trait BlockDecode<Pixel> {
    type CompressedBlock: Block;

    // The decoded 4x4 pixel blocks are in row-major ordering.
    // Fixing the length should reduce the amount of bounds checking.
    fn decompress_block(block: &Self::CompressedBlock) -> [[Pixel; BLOCK_WIDTH]; BLOCK_HEIGHT];
}

impl BlockDecode<[u8; 4]> for Dxt1 {
    type CompressedBlock = [u8; 8];

    fn decompress_block(block: &[u8; 8]) -> [[[u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT] {
        let mut decompressed = [[[0u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT];

        blockdec_rs::bc1(
            block,
            bytemuck::cast_slice_mut(&mut decompressed),
            BLOCK_WIDTH * CHANNELS,
        );

        decompressed
    }
}

impl BlockDecode<[u8; 4]> for Dxt3 {
    type CompressedBlock = [u8; 16];

    fn decompress_block(block: &[u8; 16]) -> [[[u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT] {
        let mut decompressed = [[[0u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT];

        blockdec_rs::bc2(
            block,
            bytemuck::cast_slice_mut(&mut decompressed),
            BLOCK_WIDTH * CHANNELS,
        );

        decompressed
    }
}

impl BlockDecode<[u8; 4]> for Dxt5 {
    type CompressedBlock = [u8; 16];

    fn decompress_block(block: &[u8; 16]) -> [[[u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT] {
        let mut decompressed = [[[0u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT];

        blockdec_rs::bc3(
            block,
            bytemuck::cast_slice_mut(&mut decompressed),
            BLOCK_WIDTH * CHANNELS,
        );

        decompressed
    }
}

impl BlockDecode<[u8; 4]> for Bc4 {
    type CompressedBlock = [u8; 8];

    fn decompress_block(block: &[u8; 8]) -> [[[u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT] {
        // BC4 stores a single channel, so each decompressed pixel is 1 byte.
        let mut decompressed_r = [[0u8; BLOCK_WIDTH]; BLOCK_HEIGHT];

        blockdec_rs::bc4(
            block,
            bytemuck::cast_slice_mut(&mut decompressed_r),
            BLOCK_WIDTH,
        );

        // Missing channels follow the same convention as uncompressed red formats.
        decompressed_r.map(|row| row.map(|r| [r, 0, 0, 255]))
    }
}

impl BlockDecode<[u8; 4]> for Bc5 {
    type CompressedBlock = [u8; 16];

    fn decompress_block(block: &[u8; 16]) -> [[[u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT] {
        let mut decompressed_rg = [[[0u8; 2]; BLOCK_WIDTH]; BLOCK_HEIGHT];

        blockdec_rs::bc5(
            block,
            bytemuck::cast_slice_mut(&mut decompressed_rg),
            BLOCK_WIDTH * 2,
        );

        decompressed_rg.map(|row| row.map(|[r, g]| [r, g, 0, 255]))
    }
}

/// Decompress the blocks in `data` to a `width` x `height` RGBA surface with channels of type `T`.
pub fn decode_blocks<F, T>(
    width: u32,
    height: u32,
    data: &[u8],
    rgba: &mut [u8],
) -> Result<(), ImageError>
where
    F: BlockDecode<[T; 4]>,
    T: Channel,
{
    let blocks_x = div_round_up(width as usize, BLOCK_WIDTH);
    let blocks_y = div_round_up(height as usize, BLOCK_HEIGHT);

    // Validate surface dimensions to check for potential overflow.
    let expected_size = blocks_x
        .checked_mul(blocks_y)
        .and_then(|b| b.checked_mul(F::CompressedBlock::SIZE_IN_BYTES))
        .ok_or(ImageError::PixelCountWouldOverflow {
            width,
            height,
            depth: 1,
        })?;

    // Mipmap dimensions do not need to be multiples of the block dimensions.
    // A mipmap of size 1x1 pixels can still be decoded.
    if data.len() < expected_size {
        return Err(ImageError::NotEnoughData {
            expected: expected_size,
            actual: data.len(),
        });
    }

    let expected_rgba_size = width as usize * height as usize * CHANNELS * T::SIZE;
    if rgba.len() < expected_rgba_size {
        return Err(ImageError::NotEnoughData {
            expected: expected_rgba_size,
            actual: rgba.len(),
        });
    }

    // Blocks are in row-major order.
    for block_y in 0..blocks_y {
        for block_x in 0..blocks_x {
            let offset = (block_y * blocks_x + block_x) * F::CompressedBlock::SIZE_IN_BYTES;
            let block = F::CompressedBlock::read_block(data, offset);
            let decompressed_block = F::decompress_block(&block);

            put_rgba_block(
                rgba,
                &decompressed_block,
                block_x * BLOCK_WIDTH,
                block_y * BLOCK_HEIGHT,
                width as usize,
                height as usize,
            );
        }
    }

    Ok(())
}

fn put_rgba_block<T: Channel>(
    surface: &mut [u8],
    pixels: &[[[T; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT],
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) {
    // The edges won't always have full blocks.
    for (row, row_pixels) in pixels.iter().enumerate().take(BLOCK_HEIGHT.min(height - y)) {
        for (column, pixel) in row_pixels
            .iter()
            .enumerate()
            .take(BLOCK_WIDTH.min(width - x))
        {
            let start = ((y + row) * width + x + column) * CHANNELS * T::SIZE;
            for (i, c) in pixel.iter().enumerate() {
                c.write(&mut surface[start + i * T::SIZE..]);
            }
        }
    }
}
