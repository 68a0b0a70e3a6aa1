// Bit layouts from the Khronos Data Format Specification, sections "ETC1" and "ETC2".
// Blocks are stored as big-endian 64-bit words.
// Pixel indices are column-major with pixel (x, y) at bit x * 4 + y.

/// Intensity modifier pairs shared by ETC1 and ETC2.
pub const ETC1_MODIFIERS: [[i32; 2]; 8] = [
    [2, 8],
    [5, 17],
    [9, 29],
    [13, 42],
    [18, 60],
    [24, 80],
    [33, 106],
    [47, 183],
];

/// Distances for the ETC2 T and H modes.
pub const ETC2_DISTANCES: [i32; 8] = [3, 6, 11, 16, 23, 32, 41, 64];

/// Modifier tables for EAC alpha, R11 and RG11 blocks.
pub const EAC_MODIFIERS: [[i32; 8]; 16] = [
    [-3, -6, -9, -15, 2, 5, 8, 14],
    [-3, -7, -10, -13, 2, 6, 9, 12],
    [-2, -5, -8, -13, 1, 4, 7, 12],
    [-2, -4, -6, -13, 1, 3, 5, 12],
    [-3, -6, -8, -12, 2, 5, 7, 11],
    [-3, -7, -9, -11, 2, 6, 8, 10],
    [-4, -7, -8, -11, 3, 6, 7, 10],
    [-3, -5, -8, -11, 2, 4, 7, 10],
    [-2, -6, -8, -10, 1, 5, 7, 9],
    [-2, -5, -8, -10, 1, 4, 7, 9],
    [-2, -4, -8, -10, 1, 3, 7, 9],
    [-2, -5, -7, -10, 1, 4, 6, 9],
    [-3, -4, -7, -10, 2, 3, 6, 9],
    [-1, -2, -3, -10, 0, 1, 2, 9],
    [-4, -6, -8, -9, 3, 5, 7, 8],
    [-3, -5, -7, -9, 2, 4, 6, 8],
];

#[derive(Clone, Copy, PartialEq)]
enum Variant {
    Etc1,
    Etc2,
    Etc2PunchThrough,
}

/// Decodes an ETC1 block to RGBA8.
pub fn etc1(compressed_block: &[u8], decompressed_block: &mut [u8], destination_pitch: usize) {
    color_block(
        compressed_block,
        decompressed_block,
        destination_pitch,
        Variant::Etc1,
    );
}

/// Decodes an ETC2 RGB block to RGBA8.
pub fn etc2_rgb(compressed_block: &[u8], decompressed_block: &mut [u8], destination_pitch: usize) {
    color_block(
        compressed_block,
        decompressed_block,
        destination_pitch,
        Variant::Etc2,
    );
}

/// Decodes an ETC2 RGB block with punch-through alpha to RGBA8.
pub fn etc2_rgb_a1(
    compressed_block: &[u8],
    decompressed_block: &mut [u8],
    destination_pitch: usize,
) {
    color_block(
        compressed_block,
        decompressed_block,
        destination_pitch,
        Variant::Etc2PunchThrough,
    );
}

/// Decodes an ETC2 RGBA block (EAC alpha followed by ETC2 RGB) to RGBA8.
pub fn etc2_rgba(compressed_block: &[u8], decompressed_block: &mut [u8], destination_pitch: usize) {
    color_block(
        &compressed_block[8..],
        decompressed_block,
        destination_pitch,
        Variant::Etc2,
    );
    alpha_block(compressed_block, decompressed_block, destination_pitch);
}

/// Decodes an EAC R11 block to normalized floats.
///
/// Unsigned values are in `[0, 1]` and signed values are in `[-1, 1]`.
pub fn eac_r11(
    compressed_block: &[u8],
    decompressed_block: &mut [f32],
    destination_pitch: usize,
    is_signed: bool,
) {
    r11_block(
        compressed_block,
        decompressed_block,
        destination_pitch,
        1,
        is_signed,
    );
}

/// Decodes an EAC RG11 block to two interleaved normalized float channels.
pub fn eac_rg11(
    compressed_block: &[u8],
    decompressed_block: &mut [f32],
    destination_pitch: usize,
    is_signed: bool,
) {
    r11_block(
        compressed_block,
        decompressed_block,
        destination_pitch,
        2,
        is_signed,
    );
    r11_block(
        &compressed_block[8..],
        &mut decompressed_block[1..],
        destination_pitch,
        2,
        is_signed,
    );
}

/// Extends a 4-bit channel to 8 bits.
#[inline]
pub fn extend_4(x: u32) -> i32 {
    (x * 17) as i32
}

/// Extends a 5-bit channel to 8 bits.
#[inline]
pub fn extend_5(x: u32) -> i32 {
    ((x << 3) | (x >> 2)) as i32
}

#[inline]
fn extend_6(x: u32) -> i32 {
    ((x << 2) | (x >> 4)) as i32
}

#[inline]
fn extend_7(x: u32) -> i32 {
    ((x << 1) | (x >> 6)) as i32
}

#[inline]
fn sign_extend_3(x: u32) -> i32 {
    ((x << 29) as i32) >> 29
}

#[inline]
fn clamp_u8(x: i32) -> u8 {
    x.clamp(0, 255) as u8
}

fn read_u64(compressed_block: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&compressed_block[..8]);
    u64::from_be_bytes(bytes)
}

#[inline]
fn selector(bits: u64, x: usize, y: usize) -> usize {
    let i = x * 4 + y;
    let msb = (bits >> (16 + i)) & 1;
    let lsb = (bits >> i) & 1;
    ((msb << 1) | lsb) as usize
}

#[inline]
fn put(decompressed_block: &mut [u8], destination_pitch: usize, x: usize, y: usize, c: [u8; 4]) {
    let start = y * destination_pitch + x * 4;
    decompressed_block[start..start + 4].copy_from_slice(&c);
}

fn color_block(
    compressed_block: &[u8],
    decompressed_block: &mut [u8],
    destination_pitch: usize,
    variant: Variant,
) {
    let bits = read_u64(compressed_block);

    let diff_bit = (bits >> 33) & 1 == 1;
    let flip = (bits >> 32) & 1 == 1;

    // The punch-through variant reuses the diff bit as an opaque flag
    // and always decodes with the differential layout.
    let (differential, opaque) = match variant {
        Variant::Etc2PunchThrough => (true, diff_bit),
        _ => (diff_bit, true),
    };

    let (base1, base2) = if differential {
        let r = ((bits >> 59) & 0x1F) as i32;
        let dr = sign_extend_3(((bits >> 56) & 0x7) as u32);
        let g = ((bits >> 51) & 0x1F) as i32;
        let dg = sign_extend_3(((bits >> 48) & 0x7) as u32);
        let b = ((bits >> 43) & 0x1F) as i32;
        let db = sign_extend_3(((bits >> 40) & 0x7) as u32);

        if variant != Variant::Etc1 {
            if !(0..32).contains(&(r + dr)) {
                t_mode(bits, decompressed_block, destination_pitch, opaque);
                return;
            }
            if !(0..32).contains(&(g + dg)) {
                h_mode(bits, decompressed_block, destination_pitch, opaque);
                return;
            }
            if !(0..32).contains(&(b + db)) {
                planar_mode(bits, decompressed_block, destination_pitch);
                return;
            }
        }

        (
            [extend_5(r as u32), extend_5(g as u32), extend_5(b as u32)],
            [
                extend_5((r + dr) as u32 & 0x1F),
                extend_5((g + dg) as u32 & 0x1F),
                extend_5((b + db) as u32 & 0x1F),
            ],
        )
    } else {
        (
            [
                extend_4(((bits >> 60) & 0xF) as u32),
                extend_4(((bits >> 52) & 0xF) as u32),
                extend_4(((bits >> 44) & 0xF) as u32),
            ],
            [
                extend_4(((bits >> 56) & 0xF) as u32),
                extend_4(((bits >> 48) & 0xF) as u32),
                extend_4(((bits >> 40) & 0xF) as u32),
            ],
        )
    };

    let table1 = ((bits >> 37) & 0x7) as usize;
    let table2 = ((bits >> 34) & 0x7) as usize;

    for y in 0..4 {
        for x in 0..4 {
            let second = if flip { y >= 2 } else { x >= 2 };
            let (base, table) = if second {
                (base2, table2)
            } else {
                (base1, table1)
            };
            let [small, large] = ETC1_MODIFIERS[table];

            let modifier = match (selector(bits, x, y), opaque) {
                (2, false) => {
                    put(decompressed_block, destination_pitch, x, y, [0u8; 4]);
                    continue;
                }
                (0, false) => 0,
                (0, true) => small,
                (1, _) => large,
                (2, true) => -small,
                _ => -large,
            };

            let color = [
                clamp_u8(base[0] + modifier),
                clamp_u8(base[1] + modifier),
                clamp_u8(base[2] + modifier),
                255u8,
            ];
            put(decompressed_block, destination_pitch, x, y, color);
        }
    }
}

fn paint_block(
    bits: u64,
    paint_colors: [[u8; 4]; 4],
    decompressed_block: &mut [u8],
    destination_pitch: usize,
    opaque: bool,
) {
    for y in 0..4 {
        for x in 0..4 {
            let index = selector(bits, x, y);
            let color = if !opaque && index == 2 {
                [0u8; 4]
            } else {
                paint_colors[index]
            };
            put(decompressed_block, destination_pitch, x, y, color);
        }
    }
}

fn offset_color(c: [i32; 3], d: i32) -> [u8; 4] {
    [clamp_u8(c[0] + d), clamp_u8(c[1] + d), clamp_u8(c[2] + d), 255u8]
}

fn t_mode(bits: u64, decompressed_block: &mut [u8], destination_pitch: usize, opaque: bool) {
    let r1 = (((bits >> 57) & 0xC) | ((bits >> 56) & 0x3)) as u32;
    let g1 = ((bits >> 52) & 0xF) as u32;
    let b1 = ((bits >> 48) & 0xF) as u32;
    let r2 = ((bits >> 44) & 0xF) as u32;
    let g2 = ((bits >> 40) & 0xF) as u32;
    let b2 = ((bits >> 36) & 0xF) as u32;
    let distance = ETC2_DISTANCES[(((bits >> 33) & 0x6) | ((bits >> 32) & 0x1)) as usize];

    let c1 = [extend_4(r1), extend_4(g1), extend_4(b1)];
    let c2 = [extend_4(r2), extend_4(g2), extend_4(b2)];

    let paint_colors = [
        offset_color(c1, 0),
        offset_color(c2, distance),
        offset_color(c2, 0),
        offset_color(c2, -distance),
    ];
    paint_block(
        bits,
        paint_colors,
        decompressed_block,
        destination_pitch,
        opaque,
    );
}

fn h_mode(bits: u64, decompressed_block: &mut [u8], destination_pitch: usize, opaque: bool) {
    let r1 = ((bits >> 59) & 0xF) as u32;
    let g1 = (((bits >> 55) & 0xE) | ((bits >> 52) & 0x1)) as u32;
    let b1 = (((bits >> 48) & 0x8) | ((bits >> 47) & 0x7)) as u32;
    let r2 = ((bits >> 43) & 0xF) as u32;
    let g2 = ((bits >> 39) & 0xF) as u32;
    let b2 = ((bits >> 35) & 0xF) as u32;

    // The lowest distance bit is implied by the order of the base colors.
    let order = ((r1 << 8) | (g1 << 4) | b1) >= ((r2 << 8) | (g2 << 4) | b2);
    let index = ((bits >> 32) & 0x4) | ((bits >> 31) & 0x2) | order as u64;
    let distance = ETC2_DISTANCES[index as usize];

    let c1 = [extend_4(r1), extend_4(g1), extend_4(b1)];
    let c2 = [extend_4(r2), extend_4(g2), extend_4(b2)];

    let paint_colors = [
        offset_color(c1, distance),
        offset_color(c1, -distance),
        offset_color(c2, distance),
        offset_color(c2, -distance),
    ];
    paint_block(
        bits,
        paint_colors,
        decompressed_block,
        destination_pitch,
        opaque,
    );
}

fn planar_mode(bits: u64, decompressed_block: &mut [u8], destination_pitch: usize) {
    let ro = extend_6(((bits >> 57) & 0x3F) as u32);
    let go = extend_7((((bits >> 50) & 0x40) | ((bits >> 49) & 0x3F)) as u32);
    let bo = extend_6(
        (((bits >> 43) & 0x20) | ((bits >> 40) & 0x18) | ((bits >> 39) & 0x7)) as u32,
    );
    let rh = extend_6((((bits >> 33) & 0x3E) | ((bits >> 32) & 0x1)) as u32);
    let gh = extend_7(((bits >> 25) & 0x7F) as u32);
    let bh = extend_6(((bits >> 19) & 0x3F) as u32);
    let rv = extend_6(((bits >> 13) & 0x3F) as u32);
    let gv = extend_7(((bits >> 6) & 0x7F) as u32);
    let bv = extend_6((bits & 0x3F) as u32);

    for y in 0..4 {
        for x in 0..4 {
            let (xi, yi) = (x as i32, y as i32);
            let channel = |o: i32, h: i32, v: i32| {
                clamp_u8((xi * (h - o) + yi * (v - o) + 4 * o + 2) >> 2)
            };
            let color = [
                channel(ro, rh, rv),
                channel(go, gh, gv),
                channel(bo, bh, bv),
                255u8,
            ];
            put(decompressed_block, destination_pitch, x, y, color);
        }
    }
}

/// The fields shared by EAC alpha and R11 blocks.
struct EacBlock {
    base: u8,
    multiplier: i32,
    table: usize,
    indices: u64,
}

impl EacBlock {
    fn read(compressed_block: &[u8]) -> Self {
        let bits = read_u64(compressed_block);
        Self {
            base: compressed_block[0],
            multiplier: (compressed_block[1] >> 4) as i32,
            table: (compressed_block[1] & 0xF) as usize,
            indices: bits & 0xFFFF_FFFF_FFFF,
        }
    }

    fn modifier(&self, x: usize, y: usize) -> i32 {
        let i = x * 4 + y;
        let index = (self.indices >> (45 - 3 * i)) & 0x7;
        EAC_MODIFIERS[self.table][index as usize]
    }
}

fn alpha_block(compressed_block: &[u8], decompressed_block: &mut [u8], destination_pitch: usize) {
    let block = EacBlock::read(compressed_block);
    for y in 0..4 {
        for x in 0..4 {
            let alpha = block.base as i32 + block.modifier(x, y) * block.multiplier;
            decompressed_block[y * destination_pitch + x * 4 + 3] = clamp_u8(alpha);
        }
    }
}

fn r11_block(
    compressed_block: &[u8],
    decompressed_block: &mut [f32],
    destination_pitch: usize,
    pixel_size: usize,
    is_signed: bool,
) {
    let block = EacBlock::read(compressed_block);
    for y in 0..4 {
        for x in 0..4 {
            let modifier = block.modifier(x, y);
            // A multiplier of 0 scales the modifier by 1/8 instead.
            let delta = if block.multiplier == 0 {
                modifier
            } else {
                modifier * block.multiplier * 8
            };

            let value = if is_signed {
                let base = (block.base as i8 as i32).max(-127);
                (base * 8 + delta).clamp(-1023, 1023) as f32 / 1023.0
            } else {
                (block.base as i32 * 8 + 4 + delta).clamp(0, 2047) as f32 / 2047.0
            };
            decompressed_block[y * destination_pitch + x * pixel_size] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(f: fn(&[u8], &mut [u8], usize), block: &[u8]) -> [[u8; 4]; 16] {
        let mut rgba = [0u8; 64];
        f(block, &mut rgba, 16);
        let mut pixels = [[0u8; 4]; 16];
        for (pixel, chunk) in pixels.iter_mut().zip(rgba.chunks_exact(4)) {
            pixel.copy_from_slice(chunk);
        }
        pixels
    }

    #[test]
    fn etc1_individual_mode() {
        // Both sub blocks use base color 0x88, 0x44, 0xCC with table 0.
        let block = [0x88, 0x44, 0xCC, 0x00, 0, 0, 0, 0];
        for pixel in decode(etc1, &block) {
            assert_eq!([138, 70, 206, 255], pixel);
        }
    }

    #[test]
    fn etc1_individual_mode_negative_large_modifier() {
        // Every selector set to 3 uses -8 with table 0.
        let block = [0x88, 0x44, 0xCC, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];
        for pixel in decode(etc1, &block) {
            assert_eq!([128, 60, 196, 255], pixel);
        }
    }

    #[test]
    fn etc1_differential_mode() {
        // R = 16, G = 8, B = 31 with a blue delta of -1 for the right sub block.
        let block = [0x80, 0x40, 0xFF, 0x02, 0, 0, 0, 0];
        let pixels = decode(etc1, &block);
        for y in 0..4 {
            for x in 0..4 {
                let expected = if x < 2 {
                    [134, 68, 255, 255]
                } else {
                    [134, 68, 249, 255]
                };
                assert_eq!(expected, pixels[y * 4 + x]);
            }
        }
    }

    #[test]
    fn etc1_flip_splits_rows() {
        let block = [0x80, 0x40, 0xFF, 0x03, 0, 0, 0, 0];
        let pixels = decode(etc1, &block);
        assert_eq!([134, 68, 255, 255], pixels[4]);
        assert_eq!([134, 68, 249, 255], pixels[8]);
    }

    #[test]
    fn etc2_punch_through_transparent() {
        // Differential layout with the opaque bit cleared and every selector set to 2.
        let block = [0x80, 0x40, 0xF8, 0x00, 0xFF, 0xFF, 0x00, 0x00];
        for pixel in decode(etc2_rgb_a1, &block) {
            assert_eq!([0, 0, 0, 0], pixel);
        }
    }

    #[test]
    fn etc2_punch_through_zero_modifier() {
        let block = [0x80, 0x40, 0xF8, 0x00, 0, 0, 0, 0];
        for pixel in decode(etc2_rgb_a1, &block) {
            assert_eq!([132, 66, 255, 255], pixel);
        }
    }

    #[test]
    fn etc2_rgba_alpha() {
        let mut block = [0u8; 16];
        // Base 100, multiplier 2, table 13, every index 7 adds 9 * 2.
        block[0] = 100;
        block[1] = 0x2D;
        block[2..8].fill(0xFF);
        block[8..16].copy_from_slice(&[0x88, 0x44, 0xCC, 0x00, 0, 0, 0, 0]);
        for pixel in decode(etc2_rgba, &block) {
            assert_eq!([138, 70, 206, 118], pixel);
        }
    }

    #[test]
    fn eac_r11_unsigned_flat() {
        // Table 13 index 4 has a modifier of 0.
        let block = [255, 0x1D, 0x92, 0x49, 0x24, 0x92, 0x49, 0x24];
        let mut r = [0.0f32; 16];
        eac_r11(&block, &mut r, 4, false);
        for value in r {
            // 255 * 8 + 4
            assert_eq!(2044.0 / 2047.0, value);
        }
    }

    #[test]
    fn eac_rg11_signed() {
        let mut block = [0u8; 16];
        block[0] = 0x81;
        block[1] = 0x1D;
        block[2..8].copy_from_slice(&[0x92, 0x49, 0x24, 0x92, 0x49, 0x24]);
        block[8] = 0;
        block[9] = 0x1D;
        block[10..16].copy_from_slice(&[0x92, 0x49, 0x24, 0x92, 0x49, 0x24]);
        let mut rg = [0.0f32; 32];
        eac_rg11(&block, &mut rg, 8, true);
        for pixel in rg.chunks_exact(2) {
            assert_eq!([-1016.0 / 1023.0, 0.0], pixel);
        }
    }
}
