//! Block iteration shared by every 4x4 block format and the DXT and BC4/BC5 codecs.
mod alpha;
mod color;
pub(crate) mod decode;
pub(crate) mod encode;

pub const BLOCK_WIDTH: usize = 4;
pub const BLOCK_HEIGHT: usize = 4;
pub const CHANNELS: usize = 4;

pub struct Dxt1;
pub struct Dxt3;
pub struct Dxt5;
pub struct Bc4;
pub struct Bc5;

/// The 16 pixels of a block in row-major order.
pub(crate) fn flatten<P: Copy>(pixels: &[[P; BLOCK_WIDTH]; BLOCK_HEIGHT]) -> [P; 16] {
    std::array::from_fn(|i| pixels[i / BLOCK_WIDTH][i % BLOCK_WIDTH])
}

/// A compressed block with a fixed size in bytes.
pub trait Block: Sized {
    const SIZE_IN_BYTES: usize;

    fn read_block(data: &[u8], offset: usize) -> Self;
    fn as_bytes(&self) -> &[u8];
}

impl<const N: usize> Block for [u8; N] {
    const SIZE_IN_BYTES: usize = N;

    fn read_block(data: &[u8], offset: usize) -> Self {
        let mut block = [0u8; N];
        block.copy_from_slice(&data[offset..offset + N]);
        block
    }

    fn as_bytes(&self) -> &[u8] {
        self
    }
}
