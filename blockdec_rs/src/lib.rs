#![no_std]
//! Safe, no_std, pure Rust decoders for 4x4 texture blocks.
//!
//! The BCn decoders follow [bcdec](https://github.com/iOrange/bcdec).
//! The ETC and EAC decoders follow the Khronos data format specification.
//!
//! Each decoder writes a single 4x4 block starting at the beginning of `decompressed_block`.
//! Rows are `destination_pitch` elements apart.
mod etc;

pub use etc::{
    eac_r11, eac_rg11, etc1, etc2_rgb, etc2_rgb_a1, etc2_rgba, extend_4, extend_5, EAC_MODIFIERS,
    ETC1_MODIFIERS, ETC2_DISTANCES,
};

/// Decodes a BC1 (DXT1) block to RGBA8.
pub fn bc1(compressed_block: &[u8], decompressed_block: &mut [u8], destination_pitch: usize) {
    color_block(
        compressed_block,
        decompressed_block,
        destination_pitch,
        false,
    )
}

/// Decodes a BC2 (DXT3) block to RGBA8.
pub fn bc2(compressed_block: &[u8], decompressed_block: &mut [u8], destination_pitch: usize) {
    color_block(
        &compressed_block[8..],
        decompressed_block,
        destination_pitch,
        true,
    );
    sharp_alpha_block(compressed_block, decompressed_block, destination_pitch);
}

/// Decodes a BC3 (DXT5) block to RGBA8.
pub fn bc3(compressed_block: &[u8], decompressed_block: &mut [u8], destination_pitch: usize) {
    color_block(
        &compressed_block[8..],
        decompressed_block,
        destination_pitch,
        true,
    );
    smooth_alpha_block(
        compressed_block,
        &mut decompressed_block[3..],
        destination_pitch,
        4,
    );
}

/// Decodes a BC4 (ATI1) block to a single 8-bit channel.
pub fn bc4(compressed_block: &[u8], decompressed_block: &mut [u8], destination_pitch: usize) {
    smooth_alpha_block(compressed_block, decompressed_block, destination_pitch, 1);
}

/// Decodes a BC5 (ATI2, DXN) block to two interleaved 8-bit channels.
pub fn bc5(compressed_block: &[u8], decompressed_block: &mut [u8], destination_pitch: usize) {
    smooth_alpha_block(compressed_block, decompressed_block, destination_pitch, 2);
    smooth_alpha_block(
        &compressed_block[8..],
        &mut decompressed_block[1..],
        destination_pitch,
        2,
    );
}

/// Expands a 5-bit channel of a 565 endpoint to 8 bits.
#[inline]
pub fn expand_565_r(c: u16) -> u8 {
    ((((c >> 11) & 0x1F) as u32 * 527 + 23) >> 6) as u8
}

#[inline]
pub fn expand_565_g(c: u16) -> u8 {
    ((((c >> 5) & 0x3F) as u32 * 259 + 33) >> 6) as u8
}

#[inline]
pub fn expand_565_b(c: u16) -> u8 {
    (((c & 0x1F) as u32 * 527 + 23) >> 6) as u8
}

fn color_block(
    compressed_block: &[u8],
    decompressed_block: &mut [u8],
    destination_pitch: usize,
    only_opaque_mode: bool,
) {
    let mut ref_colors = [[0u8; 4]; 4];

    let c0 = u16::from_le_bytes([compressed_block[0], compressed_block[1]]);
    let c1 = u16::from_le_bytes([compressed_block[2], compressed_block[3]]);

    // Expand 565 ref colors to 888
    let r0 = expand_565_r(c0) as u32;
    let g0 = expand_565_g(c0) as u32;
    let b0 = expand_565_b(c0) as u32;
    ref_colors[0] = [r0 as u8, g0 as u8, b0 as u8, 255u8];

    let r1 = expand_565_r(c1) as u32;
    let g1 = expand_565_g(c1) as u32;
    let b1 = expand_565_b(c1) as u32;
    ref_colors[1] = [r1 as u8, g1 as u8, b1 as u8, 255u8];

    if c0 > c1 || only_opaque_mode {
        // Standard BC1 mode (also BC3 color block uses ONLY this mode)
        // color_2 = 2/3*color_0 + 1/3*color_1
        // color_3 = 1/3*color_0 + 2/3*color_1
        let r = (2 * r0 + r1 + 1) / 3;
        let g = (2 * g0 + g1 + 1) / 3;
        let b = (2 * b0 + b1 + 1) / 3;
        ref_colors[2] = [r as u8, g as u8, b as u8, 255u8];

        let r = (r0 + 2 * r1 + 1) / 3;
        let g = (g0 + 2 * g1 + 1) / 3;
        let b = (b0 + 2 * b1 + 1) / 3;
        ref_colors[3] = [r as u8, g as u8, b as u8, 255u8];
    } else {
        // Punch-through alpha mode
        // color_2 = 1/2*color_0 + 1/2*color_1;
        // color_3 = 0;
        let r = (r0 + r1 + 1) >> 1;
        let g = (g0 + g1 + 1) >> 1;
        let b = (b0 + b1 + 1) >> 1;
        ref_colors[2] = [r as u8, g as u8, b as u8, 255u8];

        ref_colors[3] = [0u8; 4];
    }

    let mut color_indices = u32::from_le_bytes([
        compressed_block[4],
        compressed_block[5],
        compressed_block[6],
        compressed_block[7],
    ]);

    for i in 0..4 {
        for j in 0..4 {
            let idx = color_indices & 0x03;
            let start = i * destination_pitch + j * 4;
            decompressed_block[start..start + 4].copy_from_slice(&ref_colors[idx as usize]);
            color_indices >>= 2;
        }
    }
}

fn sharp_alpha_block(
    compressed_block: &[u8],
    decompressed_block: &mut [u8],
    destination_pitch: usize,
) {
    for i in 0..4 {
        let alpha = u16::from_le_bytes([compressed_block[i * 2], compressed_block[i * 2 + 1]]);
        for j in 0..4 {
            let index = i * destination_pitch + j * 4 + 3;
            decompressed_block[index] = ((alpha >> (4 * j)) & 0x0F) as u8 * 17;
        }
    }
}

/// Returns the 8 entry palette for a BC3 alpha or BC4 channel block.
pub fn smooth_alpha_palette(alpha0: u8, alpha1: u8) -> [u8; 8] {
    let a0 = alpha0 as u32;
    let a1 = alpha1 as u32;
    let mut alpha = [a0, a1, 0, 0, 0, 0, 0, 0];

    if a0 > a1 {
        // 6 interpolated alpha values.
        alpha[2] = (6 * a0 + a1 + 1) / 7;
        alpha[3] = (5 * a0 + 2 * a1 + 1) / 7;
        alpha[4] = (4 * a0 + 3 * a1 + 1) / 7;
        alpha[5] = (3 * a0 + 4 * a1 + 1) / 7;
        alpha[6] = (2 * a0 + 5 * a1 + 1) / 7;
        alpha[7] = (a0 + 6 * a1 + 1) / 7;
    } else {
        // 4 interpolated alpha values.
        alpha[2] = (4 * a0 + a1 + 1) / 5;
        alpha[3] = (3 * a0 + 2 * a1 + 1) / 5;
        alpha[4] = (2 * a0 + 3 * a1 + 1) / 5;
        alpha[5] = (a0 + 4 * a1 + 1) / 5;
        alpha[6] = 0x00;
        alpha[7] = 0xFF;
    }

    alpha.map(|a| a as u8)
}

fn smooth_alpha_block(
    compressed_block: &[u8],
    decompressed_block: &mut [u8],
    destination_pitch: usize,
    pixel_size: usize,
) {
    let alpha = smooth_alpha_palette(compressed_block[0], compressed_block[1]);

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&compressed_block[..8]);
    let mut indices = u64::from_le_bytes(bytes) >> 16;
    for i in 0..4 {
        for j in 0..4 {
            let index = i * destination_pitch + j * pixel_size;
            decompressed_block[index] = alpha[(indices & 0x07) as usize];
            indices >>= 3;
        }
    }
}
