//! Single channel blocks for DXT3 and DXT5 alpha and BC4 and BC5 channels.
use blockdec_rs::smooth_alpha_palette;

use crate::Quality;

/// Quantizes 16 alpha values to the 4-bit explicit alpha of DXT3.
pub fn compress_explicit_alpha(values: &[u8; 16]) -> [u8; 8] {
    let mut block = [0u8; 8];
    for (row, bytes) in values.chunks_exact(4).zip(block.chunks_exact_mut(2)) {
        let mut bits = 0u16;
        for (i, a) in row.iter().enumerate() {
            let a4 = ((*a as u32 * 15 + 135) >> 8) as u16;
            bits |= a4 << (4 * i);
        }
        bytes.copy_from_slice(&bits.to_le_bytes());
    }
    block
}

/// Encodes 16 values with two endpoints and 3-bit indices.
///
/// Faster quality settings only use the 8 value interpolation mode.
/// Higher quality settings also try the 6 value mode with explicit 0 and 255
/// and inset endpoints.
pub fn compress_alpha_block(values: &[u8; 16], quality: Quality) -> [u8; 8] {
    let min = values.iter().copied().min().unwrap_or(0);
    let max = values.iter().copied().max().unwrap_or(0);

    if min == max {
        // Index 0 reproduces the value exactly.
        return pack(max, min, [0; 16]);
    }

    let mut best = encode(values, max, min);

    if quality != Quality::Fast {
        // The 6 value mode reserves two indices for 0 and 255.
        let inner = values.iter().copied().filter(|a| *a != 0 && *a != 255);
        let inner_min = inner.clone().min();
        let inner_max = inner.max();
        let (low, high) = match (inner_min, inner_max) {
            (Some(low), Some(high)) => (low, high),
            _ => (0, 0),
        };
        best = best_of(best, encode(values, low, high));

        if quality == Quality::HighQuality {
            // Palette entries are biased towards the endpoints, so insetting can reduce error.
            for inset_high in 0..4u8 {
                for inset_low in 0..4u8 {
                    let a0 = max.saturating_sub(inset_high);
                    let a1 = min.saturating_add(inset_low);
                    if a0 > a1 {
                        best = best_of(best, encode(values, a0, a1));
                    }

                    let a0 = low.saturating_add(inset_low);
                    let a1 = high.saturating_sub(inset_high);
                    if a0 <= a1 {
                        best = best_of(best, encode(values, a0, a1));
                    }
                }
            }
        }
    }

    best.0
}

fn best_of(a: ([u8; 8], u32), b: ([u8; 8], u32)) -> ([u8; 8], u32) {
    if b.1 < a.1 {
        b
    } else {
        a
    }
}

fn encode(values: &[u8; 16], a0: u8, a1: u8) -> ([u8; 8], u32) {
    let palette = smooth_alpha_palette(a0, a1);

    let mut indices = [0u8; 16];
    let mut error = 0;
    for (index, value) in indices.iter_mut().zip(values) {
        let (i, e) = palette
            .iter()
            .enumerate()
            .map(|(i, p)| (i as u8, (*p as i32 - *value as i32).pow(2) as u32))
            .min_by_key(|(_, e)| *e)
            .unwrap_or((0, 0));
        *index = i;
        error += e;
    }

    (pack(a0, a1, indices), error)
}

fn pack(a0: u8, a1: u8, indices: [u8; 16]) -> [u8; 8] {
    let mut bits = 0u64;
    for (i, index) in indices.iter().enumerate() {
        bits |= (*index as u64 & 0x7) << (3 * i);
    }

    let mut block = [0u8; 8];
    block[0] = a0;
    block[1] = a1;
    block[2..].copy_from_slice(&bits.to_le_bytes()[..6]);
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(block: &[u8; 8]) -> [u8; 16] {
        let mut values = [0u8; 16];
        blockdec_rs::bc4(block, &mut values, 4);
        values
    }

    #[test]
    fn explicit_alpha_nibbles() {
        let mut values = [255u8; 16];
        values[1] = 0;
        values[4] = 128;
        let block = compress_explicit_alpha(&values);
        assert_eq!([0x0F, 0xFF, 0xF8, 0xFF], block[..4]);
    }

    #[test]
    fn flat_alpha_exact() {
        for quality in [Quality::Fast, Quality::Normal, Quality::HighQuality] {
            let block = compress_alpha_block(&[77; 16], quality);
            assert_eq!([77; 16], decode(&block));
        }
    }

    #[test]
    fn two_values_exact() {
        let mut values = [10u8; 16];
        values[5] = 250;
        for quality in [Quality::Fast, Quality::Normal, Quality::HighQuality] {
            let block = compress_alpha_block(&values, quality);
            assert_eq!(values, decode(&block));
        }
    }

    #[test]
    fn six_value_mode_extremes() {
        // 0 and 255 are exact in the 6 value mode even with values in between.
        let mut values = [0u8; 16];
        for (i, v) in values.iter_mut().enumerate() {
            *v = match i % 3 {
                0 => 0,
                1 => 255,
                _ => 100,
            };
        }
        let block = compress_alpha_block(&values, Quality::Normal);
        assert!(block[0] <= block[1]);
        assert_eq!(values, decode(&block));
    }

    #[test]
    fn gradient_error_bounded() {
        let values: [u8; 16] = std::array::from_fn(|i| (i * 17) as u8);
        let block = compress_alpha_block(&values, Quality::HighQuality);
        for (expected, actual) in values.iter().zip(decode(&block)) {
            assert!((*expected as i32 - actual as i32).abs() <= 22);
        }
    }
}
