//! ETC1, ETC2, and EAC block codecs.
mod color;
mod eac;

use log::warn;

use crate::{
    bcn::{
        decode::BlockDecode, encode::BlockEncode, flatten, BLOCK_HEIGHT, BLOCK_WIDTH, CHANNELS,
    },
    Quality,
};

use color::{compress_color_block, ColorVariant};
use eac::{compress_eac_block, EacChannel};

pub struct Etc1;
pub struct Etc2Rgb;
pub struct Etc2Rgba;
pub struct Etc2RgbA1;
pub struct EacR11;
pub struct EacR11Snorm;
pub struct EacRg11;
pub struct EacRg11Snorm;

/// Settings for the ETC and EAC encoders.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EtcOptions {
    /// The amount of searching from 0 (fastest) to 100 (best quality).
    pub effort: u8,
    /// The number of threads encoding block rows.
    /// Values of 0 or 1 encode on the calling thread.
    pub jobs: usize,
}

impl From<Quality> for EtcOptions {
    fn from(quality: Quality) -> Self {
        Self {
            effort: match quality {
                Quality::Fast => 0,
                Quality::Normal => 40,
                Quality::HighQuality => 100,
            },
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl Default for EtcOptions {
    fn default() -> Self {
        Quality::default().into()
    }
}

impl EtcOptions {
    pub(crate) fn thread_pool(&self) -> Option<rayon::ThreadPool> {
        if self.jobs <= 1 {
            return None;
        }

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!("Encoding on the calling thread after failing to create a thread pool: {e}");
                None
            }
        }
    }
}

fn decode_rgba8(
    f: fn(&[u8], &mut [u8], usize),
    block: &[u8],
) -> [[[u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT] {
    let mut decompressed = [[[0u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT];
    f(
        block,
        bytemuck::cast_slice_mut(&mut decompressed),
        BLOCK_WIDTH * CHANNELS,
    );
    decompressed
}

impl BlockDecode<[u8; 4]> for Etc1 {
    type CompressedBlock = [u8; 8];

    fn decompress_block(block: &[u8; 8]) -> [[[u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT] {
        decode_rgba8(blockdec_rs::etc1, block)
    }
}

impl BlockDecode<[u8; 4]> for Etc2Rgb {
    type CompressedBlock = [u8; 8];

    fn decompress_block(block: &[u8; 8]) -> [[[u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT] {
        decode_rgba8(blockdec_rs::etc2_rgb, block)
    }
}

impl BlockDecode<[u8; 4]> for Etc2RgbA1 {
    type CompressedBlock = [u8; 8];

    fn decompress_block(block: &[u8; 8]) -> [[[u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT] {
        decode_rgba8(blockdec_rs::etc2_rgb_a1, block)
    }
}

impl BlockDecode<[u8; 4]> for Etc2Rgba {
    type CompressedBlock = [u8; 16];

    fn decompress_block(block: &[u8; 16]) -> [[[u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT] {
        decode_rgba8(blockdec_rs::etc2_rgba, block)
    }
}

fn decode_r11(block: &[u8], is_signed: bool) -> [[[f32; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT] {
    let mut decompressed_r = [[0.0f32; BLOCK_WIDTH]; BLOCK_HEIGHT];
    blockdec_rs::eac_r11(
        block,
        bytemuck::cast_slice_mut(&mut decompressed_r),
        BLOCK_WIDTH,
        is_signed,
    );
    decompressed_r.map(|row| row.map(|r| [r, 0.0, 0.0, 1.0]))
}

fn decode_rg11(block: &[u8], is_signed: bool) -> [[[f32; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT] {
    let mut decompressed_rg = [[[0.0f32; 2]; BLOCK_WIDTH]; BLOCK_HEIGHT];
    blockdec_rs::eac_rg11(
        block,
        bytemuck::cast_slice_mut(&mut decompressed_rg),
        BLOCK_WIDTH * 2,
        is_signed,
    );
    decompressed_rg.map(|row| row.map(|[r, g]| [r, g, 0.0, 1.0]))
}

impl BlockDecode<[f32; 4]> for EacR11 {
    type CompressedBlock = [u8; 8];

    fn decompress_block(block: &[u8; 8]) -> [[[f32; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT] {
        decode_r11(block, false)
    }
}

impl BlockDecode<[f32; 4]> for EacR11Snorm {
    type CompressedBlock = [u8; 8];

    fn decompress_block(block: &[u8; 8]) -> [[[f32; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT] {
        decode_r11(block, true)
    }
}

impl BlockDecode<[f32; 4]> for EacRg11 {
    type CompressedBlock = [u8; 16];

    fn decompress_block(block: &[u8; 16]) -> [[[f32; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT] {
        decode_rg11(block, false)
    }
}

impl BlockDecode<[f32; 4]> for EacRg11Snorm {
    type CompressedBlock = [u8; 16];

    fn decompress_block(block: &[u8; 16]) -> [[[f32; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT] {
        decode_rg11(block, true)
    }
}

impl BlockEncode<[u8; 4]> for Etc1 {
    type CompressedBlock = [u8; 8];
    type Settings = EtcOptions;

    fn compress_block(pixels: &[[[u8; 4]; 4]; 4], options: &EtcOptions) -> [u8; 8] {
        compress_color_block(&flatten(pixels), ColorVariant::Etc1, options.effort)
    }
}

impl BlockEncode<[u8; 4]> for Etc2Rgb {
    type CompressedBlock = [u8; 8];
    type Settings = EtcOptions;

    fn compress_block(pixels: &[[[u8; 4]; 4]; 4], options: &EtcOptions) -> [u8; 8] {
        compress_color_block(&flatten(pixels), ColorVariant::Etc2, options.effort)
    }
}

impl BlockEncode<[u8; 4]> for Etc2RgbA1 {
    type CompressedBlock = [u8; 8];
    type Settings = EtcOptions;

    fn compress_block(pixels: &[[[u8; 4]; 4]; 4], options: &EtcOptions) -> [u8; 8] {
        compress_color_block(&flatten(pixels), ColorVariant::PunchThrough, options.effort)
    }
}

impl BlockEncode<[u8; 4]> for Etc2Rgba {
    type CompressedBlock = [u8; 16];
    type Settings = EtcOptions;

    fn compress_block(pixels: &[[[u8; 4]; 4]; 4], options: &EtcOptions) -> [u8; 16] {
        let pixels = flatten(pixels);
        let alpha = pixels.map(|p| p[3] as i32);

        let mut block = [0u8; 16];
        block[..8].copy_from_slice(&compress_eac_block(
            &alpha,
            EacChannel::Alpha,
            options.effort,
        ));
        block[8..].copy_from_slice(&compress_color_block(
            &pixels,
            ColorVariant::Etc2,
            options.effort,
        ));
        block
    }
}

/// Quantizes a channel to the 11-bit range of `channel`.
fn channel_11(pixels: &[[f32; 4]; 16], c: usize, channel: EacChannel) -> [i32; 16] {
    pixels.map(|p| match channel {
        EacChannel::Signed11 => (p[c].clamp(-1.0, 1.0) * 1023.0).round() as i32,
        _ => (p[c].clamp(0.0, 1.0) * 2047.0).round() as i32,
    })
}

fn encode_r11(pixels: &[[[f32; 4]; 4]; 4], channel: EacChannel, effort: u8) -> [u8; 8] {
    let pixels = flatten(pixels);
    compress_eac_block(&channel_11(&pixels, 0, channel), channel, effort)
}

fn encode_rg11(pixels: &[[[f32; 4]; 4]; 4], channel: EacChannel, effort: u8) -> [u8; 16] {
    let pixels = flatten(pixels);
    let mut block = [0u8; 16];
    block[..8].copy_from_slice(&compress_eac_block(
        &channel_11(&pixels, 0, channel),
        channel,
        effort,
    ));
    block[8..].copy_from_slice(&compress_eac_block(
        &channel_11(&pixels, 1, channel),
        channel,
        effort,
    ));
    block
}

impl BlockEncode<[f32; 4]> for EacR11 {
    type CompressedBlock = [u8; 8];
    type Settings = EtcOptions;

    fn compress_block(pixels: &[[[f32; 4]; 4]; 4], options: &EtcOptions) -> [u8; 8] {
        encode_r11(pixels, EacChannel::Unsigned11, options.effort)
    }
}

impl BlockEncode<[f32; 4]> for EacR11Snorm {
    type CompressedBlock = [u8; 8];
    type Settings = EtcOptions;

    fn compress_block(pixels: &[[[f32; 4]; 4]; 4], options: &EtcOptions) -> [u8; 8] {
        encode_r11(pixels, EacChannel::Signed11, options.effort)
    }
}

impl BlockEncode<[f32; 4]> for EacRg11 {
    type CompressedBlock = [u8; 16];
    type Settings = EtcOptions;

    fn compress_block(pixels: &[[[f32; 4]; 4]; 4], options: &EtcOptions) -> [u8; 16] {
        encode_rg11(pixels, EacChannel::Unsigned11, options.effort)
    }
}

impl BlockEncode<[f32; 4]> for EacRg11Snorm {
    type CompressedBlock = [u8; 16];
    type Settings = EtcOptions;

    fn compress_block(pixels: &[[[f32; 4]; 4]; 4], options: &EtcOptions) -> [u8; 16] {
        encode_rg11(pixels, EacChannel::Signed11, options.effort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bcn::{decode::decode_blocks, encode::encode_blocks};

    fn options(effort: u8) -> EtcOptions {
        EtcOptions { effort, jobs: 1 }
    }

    fn to_f32(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    #[test]
    fn options_from_quality() {
        assert_eq!(0, EtcOptions::from(Quality::Fast).effort);
        assert_eq!(40, EtcOptions::from(Quality::Normal).effort);
        assert_eq!(100, EtcOptions::from(Quality::HighQuality).effort);
        assert!(EtcOptions::default().jobs >= 1);
    }

    #[test]
    fn single_job_uses_calling_thread() {
        assert!(options(0).thread_pool().is_none());
        assert!(EtcOptions { effort: 0, jobs: 2 }.thread_pool().is_some());
    }

    #[test]
    fn etc1_flat_block_exact() {
        let rgba = [138u8, 70, 206, 255].repeat(16);
        let blocks = encode_blocks::<Etc1, u8>(4, 4, &rgba, &options(40), None).unwrap();
        assert_eq!(8, blocks.len());

        let mut decoded = vec![0u8; 64];
        decode_blocks::<Etc1, u8>(4, 4, &blocks, &mut decoded).unwrap();
        assert_eq!(rgba, decoded);
    }

    #[test]
    fn etc2_rgba_flat_exact() {
        let rgba = [138u8, 70, 206, 99].repeat(5 * 7);
        let pool = EtcOptions { effort: 100, jobs: 2 }.thread_pool();
        let blocks =
            encode_blocks::<Etc2Rgba, u8>(5, 7, &rgba, &options(100), pool.as_ref()).unwrap();
        assert_eq!(2 * 2 * 16, blocks.len());

        let mut decoded = vec![0u8; rgba.len()];
        decode_blocks::<Etc2Rgba, u8>(5, 7, &blocks, &mut decoded).unwrap();
        assert_eq!(rgba, decoded);
    }

    #[test]
    fn etc2_rgb_a1_alpha() {
        let mut rgba = [132u8, 66, 255, 255].repeat(16);
        rgba[3] = 0;
        let blocks = encode_blocks::<Etc2RgbA1, u8>(4, 4, &rgba, &options(40), None).unwrap();

        let mut decoded = vec![0u8; 64];
        decode_blocks::<Etc2RgbA1, u8>(4, 4, &blocks, &mut decoded).unwrap();
        assert_eq!([0, 0, 0, 0], decoded[..4]);
        assert_eq!([132, 66, 255, 255], decoded[4..8]);
    }

    #[test]
    fn eac_r11_flat() {
        let rgba: Vec<u8> = bytemuck::cast_slice(&[1.0f32, 0.5, 0.25, 1.0].repeat(16)).to_vec();
        let blocks = encode_blocks::<EacR11, f32>(4, 4, &rgba, &options(0), None).unwrap();

        let mut decoded = vec![0u8; rgba.len()];
        decode_blocks::<EacR11, f32>(4, 4, &blocks, &mut decoded).unwrap();
        let decoded = to_f32(&decoded);
        for pixel in decoded.chunks_exact(4) {
            assert_eq!([1.0, 0.0, 0.0, 1.0], pixel);
        }
    }

    #[test]
    fn eac_rg11_snorm_flat() {
        let rgba: Vec<u8> = bytemuck::cast_slice(&[-1.0f32, 0.0, 0.0, 1.0].repeat(16)).to_vec();
        let blocks = encode_blocks::<EacRg11Snorm, f32>(4, 4, &rgba, &options(0), None).unwrap();
        assert_eq!(16, blocks.len());

        let mut decoded = vec![0u8; rgba.len()];
        decode_blocks::<EacRg11Snorm, f32>(4, 4, &blocks, &mut decoded).unwrap();
        let decoded = to_f32(&decoded);
        for pixel in decoded.chunks_exact(4) {
            assert_eq!([-1.0, 0.0, 0.0, 1.0], pixel);
        }
    }

    #[test]
    fn eac_r11_gradient() {
        let values: Vec<f32> = (0..64)
            .flat_map(|i| [i as f32 / 630.0, 0.0, 0.0, 1.0])
            .collect();
        let rgba: Vec<u8> = bytemuck::cast_slice(&values).to_vec();
        let blocks = encode_blocks::<EacR11, f32>(8, 8, &rgba, &options(40), None).unwrap();

        let mut decoded = vec![0u8; rgba.len()];
        decode_blocks::<EacR11, f32>(8, 8, &blocks, &mut decoded).unwrap();
        let decoded = to_f32(&decoded);
        for (expected, actual) in values.chunks_exact(4).zip(decoded.chunks_exact(4)) {
            approx::assert_abs_diff_eq!(expected[0], actual[0], epsilon = 0.01);
        }
    }
}
