//! ETC1 and ETC2 RGB color blocks.
//!
//! Blocks are built from the individual and differential sub block modes.
//! ETC2 also tries the planar mode for smooth gradients.
//! The T and H modes are never emitted.
use blockdec_rs::{extend_4, extend_5, ETC1_MODIFIERS};
use glam::{Mat3, Vec3};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ColorVariant {
    Etc1,
    Etc2,
    /// ETC2 with 1-bit alpha, which only has the differential layout.
    PunchThrough,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Mode {
    Individual,
    Differential,
}

impl Mode {
    fn max(self) -> i32 {
        match self {
            Mode::Individual => 15,
            Mode::Differential => 31,
        }
    }

    fn expand(self, q: i32) -> i32 {
        match self {
            Mode::Individual => extend_4(q as u32),
            Mode::Differential => extend_5(q as u32),
        }
    }
}

/// Encodes the RGB channels of 16 row-major pixels.
///
/// [ColorVariant::PunchThrough] encodes pixels with alpha below 128 as transparent.
/// Higher `effort` searches more base colors.
pub fn compress_color_block(pixels: &[[u8; 4]; 16], variant: ColorVariant, effort: u8) -> [u8; 8] {
    let transparent: [bool; 16] =
        std::array::from_fn(|i| variant == ColorVariant::PunchThrough && pixels[i][3] < 128);
    let opaque = !transparent.contains(&true);

    if transparent.iter().all(|t| *t) {
        // Zero base and deltas with the opaque bit cleared and every selector set to 2.
        return 0x0000_0000_FFFF_0000u64.to_be_bytes();
    }

    let first = pixels[0];
    if opaque && pixels.iter().all(|p| p[..3] == first[..3]) {
        return solid_block([first[0] as i32, first[1] as i32, first[2] as i32], variant);
    }

    let mut best: Option<(u32, [u8; 8])> = None;
    let mut consider = |error: u32, block: [u8; 8]| {
        if best.map(|(e, _)| error < e).unwrap_or(true) {
            best = Some((error, block));
        }
    };

    for flip in [false, true] {
        let subs = [
            SubBlock::new(pixels, &transparent, flip, false),
            SubBlock::new(pixels, &transparent, flip, true),
        ];

        if variant != ColorVariant::PunchThrough {
            let fits = [
                best_fit(&subs[0], Mode::Individual, effort, true, None),
                best_fit(&subs[1], Mode::Individual, effort, true, None),
            ];
            consider(
                fits[0].error + fits[1].error,
                pack(Mode::Individual, flip, &fits, false),
            );
        }

        let fits = differential_fits(&subs, effort, opaque);
        consider(
            fits[0].error + fits[1].error,
            pack(Mode::Differential, flip, &fits, opaque),
        );
    }

    if variant == ColorVariant::Etc2 {
        let (error, block) = planar_block(pixels, effort);
        consider(error, block);
    }

    best.map(|(_, block)| block).unwrap_or_default()
}

/// Searches every table, selector, and base color for a single color.
fn solid_block(color: [i32; 3], variant: ColorVariant) -> [u8; 8] {
    let modes: &[Mode] = match variant {
        ColorVariant::PunchThrough => &[Mode::Differential],
        _ => &[Mode::Individual, Mode::Differential],
    };

    let mut best: Option<(u32, Mode, Fit)> = None;
    for mode in modes {
        for (table, [small, large]) in ETC1_MODIFIERS.iter().enumerate() {
            for (selector, modifier) in [*small, *large, -small, -large].into_iter().enumerate() {
                let mut base = [0i32; 3];
                let mut error = 0u32;
                for c in 0..3 {
                    let (q, e) = (0..=mode.max())
                        .map(|q| (q, ((mode.expand(q) + modifier).clamp(0, 255) - color[c]).pow(2)))
                        .min_by_key(|(_, e)| *e)
                        .unwrap_or((0, 0));
                    base[c] = q;
                    error += e as u32;
                }

                if best.map(|(e, _, _)| error < e).unwrap_or(true) {
                    let fit = Fit {
                        error,
                        base,
                        table,
                        selectors: [selector as u8; 8],
                    };
                    best = Some((error, *mode, fit));
                }
            }
        }
    }

    match best {
        Some((_, mode, fit)) => pack(mode, false, &[fit, fit], true),
        None => [0u8; 8],
    }
}

/// The pixels of one half of the block.
struct SubBlock {
    colors: [[i32; 3]; 8],
    transparent: [bool; 8],
}

impl SubBlock {
    fn new(pixels: &[[u8; 4]; 16], transparent: &[bool; 16], flip: bool, second: bool) -> Self {
        let positions = sub_block_positions(flip, second);
        Self {
            colors: positions.map(|(x, y)| {
                let p = pixels[y * 4 + x];
                [p[0] as i32, p[1] as i32, p[2] as i32]
            }),
            transparent: positions.map(|(x, y)| transparent[y * 4 + x]),
        }
    }

    fn average(&self) -> Vec3 {
        self.mean(|c, _| Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32))
            .unwrap_or(Vec3::ZERO)
    }

    /// The average color with each pixel's modifier removed.
    fn recentered(&self, fit: &Fit, opaque: bool) -> Option<Vec3> {
        let modifiers = modifiers(fit.table, opaque);
        self.mean(|c, i| {
            let m = modifiers[fit.selectors[i] as usize].unwrap_or(0) as f32;
            Vec3::new(c[0] as f32 - m, c[1] as f32 - m, c[2] as f32 - m)
        })
    }

    fn mean(&self, f: impl Fn(&[i32; 3], usize) -> Vec3) -> Option<Vec3> {
        let (sum, count) = self
            .colors
            .iter()
            .zip(self.transparent)
            .enumerate()
            .filter(|(_, (_, t))| !t)
            .fold((Vec3::ZERO, 0), |(sum, count), (i, (c, _))| {
                (sum + f(c, i), count + 1)
            });
        (count > 0).then(|| sum / count as f32)
    }
}

/// The (x, y) coordinates of a sub block in selector order.
fn sub_block_positions(flip: bool, second: bool) -> [(usize, usize); 8] {
    let mut positions = [(0, 0); 8];
    let mut n = 0;
    for x in 0..4 {
        for y in 0..4 {
            let in_second = if flip { y >= 2 } else { x >= 2 };
            if in_second == second {
                positions[n] = (x, y);
                n += 1;
            }
        }
    }
    positions
}

/// Modifiers for each selector with `None` for the transparent selector.
fn modifiers(table: usize, opaque: bool) -> [Option<i32>; 4] {
    let [small, large] = ETC1_MODIFIERS[table];
    if opaque {
        [Some(small), Some(large), Some(-small), Some(-large)]
    } else {
        [Some(0), Some(large), None, Some(-large)]
    }
}

#[derive(Debug, Clone, Copy)]
struct Fit {
    error: u32,
    /// Quantized base color.
    base: [i32; 3],
    table: usize,
    selectors: [u8; 8],
}

fn better(a: Fit, b: Fit) -> Fit {
    if b.error < a.error {
        b
    } else {
        a
    }
}

/// Finds the best table and selectors for a quantized base color.
fn fit(sub: &SubBlock, base: [i32; 3], mode: Mode, opaque: bool) -> Fit {
    let color = base.map(|c| mode.expand(c));

    let mut best = Fit {
        error: u32::MAX,
        base,
        table: 0,
        selectors: [0; 8],
    };
    for table in 0..ETC1_MODIFIERS.len() {
        let modifiers = modifiers(table, opaque);

        let mut error = 0;
        let mut selectors = [0u8; 8];
        for (i, (c, transparent)) in sub.colors.iter().zip(sub.transparent).enumerate() {
            if transparent {
                selectors[i] = 2;
                continue;
            }

            let (s, e) = modifiers
                .iter()
                .enumerate()
                .filter_map(|(s, m)| m.map(|m| (s as u8, color_error(color, m, c))))
                .min_by_key(|(_, e)| *e)
                .unwrap_or((0, 0));
            selectors[i] = s;
            error += e;
        }

        if error < best.error {
            best = Fit {
                error,
                base,
                table,
                selectors,
            };
        }
    }
    best
}

fn color_error(base: [i32; 3], modifier: i32, c: &[i32; 3]) -> u32 {
    (0..3)
        .map(|i| ((base[i] + modifier).clamp(0, 255) - c[i]).pow(2) as u32)
        .sum()
}

fn quantize(c: Vec3, max: i32) -> [i32; 3] {
    c.to_array()
        .map(|v| ((v * max as f32 / 255.0).round() as i32).clamp(0, max))
}

/// Fits a sub block with base colors limited to `range` for each channel if present.
fn best_fit(
    sub: &SubBlock,
    mode: Mode,
    effort: u8,
    opaque: bool,
    range: Option<[(i32, i32); 3]>,
) -> Fit {
    let clamp_base = |q: [i32; 3]| -> [i32; 3] {
        std::array::from_fn(|c| {
            let (lo, hi) = range.map(|r| r[c]).unwrap_or((0, mode.max()));
            q[c].clamp(lo, hi)
        })
    };

    let start = clamp_base(quantize(sub.average(), mode.max()));
    let mut best = fit(sub, start, mode, opaque);

    if effort >= 70 {
        for dr in -1..=1 {
            for dg in -1..=1 {
                for db in -1..=1 {
                    let q = clamp_base([start[0] + dr, start[1] + dg, start[2] + db]);
                    if q != start {
                        best = better(best, fit(sub, q, mode, opaque));
                    }
                }
            }
        }
    }

    if effort >= 40 {
        if let Some(target) = sub.recentered(&best, opaque) {
            let q = clamp_base(quantize(target, mode.max()));
            if q != best.base {
                best = better(best, fit(sub, q, mode, opaque));
            }
        }
    }

    best
}

/// Fits both sub blocks with the second base color within the 3-bit signed delta of the first.
fn differential_fits(subs: &[SubBlock; 2], effort: u8, opaque: bool) -> [Fit; 2] {
    let mode = Mode::Differential;
    let a = best_fit(&subs[0], mode, effort, opaque, None);
    let b = best_fit(&subs[1], mode, effort, opaque, None);
    if (0..3).all(|c| (-4..=3).contains(&(b.base[c] - a.base[c]))) {
        return [a, b];
    }

    let b_constrained = best_fit(&subs[1], mode, effort, opaque, Some(delta_range(a.base, -4, 3)));
    let a_constrained = best_fit(&subs[0], mode, effort, opaque, Some(delta_range(b.base, -3, 4)));
    if a.error + b_constrained.error <= a_constrained.error + b.error {
        [a, b_constrained]
    } else {
        [a_constrained, b]
    }
}

fn delta_range(base: [i32; 3], lo: i32, hi: i32) -> [(i32, i32); 3] {
    base.map(|c| ((c + lo).max(0), (c + hi).min(31)))
}

/// Packs the sub blocks with `diff_flag` in bit 33 for the differential layout.
fn pack(mode: Mode, flip: bool, fits: &[Fit; 2], diff_flag: bool) -> [u8; 8] {
    let [a, b] = fits;
    let a_base = a.base.map(|c| c as u64);
    let b_base = b.base.map(|c| c as u64);

    let mut bits = match mode {
        Mode::Individual => {
            a_base[0] << 60
                | b_base[0] << 56
                | a_base[1] << 52
                | b_base[1] << 48
                | a_base[2] << 44
                | b_base[2] << 40
        }
        Mode::Differential => {
            let d: [u64; 3] = std::array::from_fn(|c| (b.base[c] - a.base[c]) as u64 & 0x7);
            a_base[0] << 59
                | d[0] << 56
                | a_base[1] << 51
                | d[1] << 48
                | a_base[2] << 43
                | d[2] << 40
                | (diff_flag as u64) << 33
        }
    };
    bits |= (a.table as u64) << 37 | (b.table as u64) << 34 | (flip as u64) << 32;

    for (second, fit) in [false, true].into_iter().zip(fits) {
        for ((x, y), s) in sub_block_positions(flip, second).iter().zip(fit.selectors) {
            let i = x * 4 + y;
            let s = s as u64;
            bits |= ((s >> 1) & 1) << (16 + i) | (s & 1) << i;
        }
    }

    bits.to_be_bytes()
}

fn extend_6(x: i32) -> i32 {
    (x << 2) | (x >> 4)
}

fn extend_7(x: i32) -> i32 {
    (x << 1) | (x >> 6)
}

fn sign_extend_3(x: u64) -> i32 {
    (((x << 61) as i64) >> 61) as i32
}

/// Least squares fit of the origin, horizontal, and vertical colors.
fn planar_block(pixels: &[[u8; 4]; 16], effort: u8) -> (u32, [u8; 8]) {
    let mut normal = Mat3::ZERO;
    let mut rhs = [Vec3::ZERO; 3];
    for y in 0..4 {
        for x in 0..4 {
            let f = Vec3::new(
                1.0 - (x + y) as f32 / 4.0,
                x as f32 / 4.0,
                y as f32 / 4.0,
            );
            normal += Mat3::from_cols(f * f.x, f * f.y, f * f.z);
            for (c, rhs) in rhs.iter_mut().enumerate() {
                *rhs += f * pixels[y * 4 + x][c] as f32;
            }
        }
    }
    let inverse = normal.inverse();

    // Indexed by channel and then origin, horizontal, vertical.
    let maxes = [63, 127, 63];
    let mut q: [[i32; 3]; 3] = std::array::from_fn(|c| {
        (inverse * rhs[c])
            .to_array()
            .map(|v| ((v * maxes[c] as f32 / 255.0).round() as i32).clamp(0, maxes[c]))
    });
    let mut error = planar_error(pixels, &q);

    if effort >= 70 {
        for c in 0..3 {
            for i in 0..3 {
                for delta in [-1, 1] {
                    let mut candidate = q;
                    candidate[c][i] = (q[c][i] + delta).clamp(0, maxes[c]);
                    let candidate_error = planar_error(pixels, &candidate);
                    if candidate_error < error {
                        q = candidate;
                        error = candidate_error;
                    }
                }
            }
        }
    }

    (error, pack_planar(&q))
}

fn planar_error(pixels: &[[u8; 4]; 16], q: &[[i32; 3]; 3]) -> u32 {
    let expanded: [[i32; 3]; 3] = std::array::from_fn(|c| {
        q[c].map(|v| if c == 1 { extend_7(v) } else { extend_6(v) })
    });

    let mut error = 0;
    for y in 0..4 {
        for x in 0..4 {
            for (c, [o, h, v]) in expanded.iter().enumerate() {
                let value = ((x * (h - o) + y * (v - o) + 4 * o + 2) >> 2).clamp(0, 255);
                error += (value - pixels[(y * 4 + x) as usize][c] as i32).pow(2) as u32;
            }
        }
    }
    error
}

fn pack_planar(q: &[[i32; 3]; 3]) -> [u8; 8] {
    let [[ro, rh, rv], [go, gh, gv], [bo, bh, bv]] = q.map(|c| c.map(|v| v as u64));

    let mut bits = ro << 57
        | (go >> 6) << 56
        | (go & 0x3F) << 49
        | (bo >> 5) << 48
        | ((bo >> 3) & 0x3) << 43
        | (bo & 0x7) << 39
        | (rh >> 1) << 34
        | 1 << 33
        | (rh & 0x1) << 32
        | gh << 25
        | bh << 19
        | rv << 13
        | gv << 6
        | bv;

    // Unused bits keep the red and green differential sums in range
    // and push the blue sum out of range to select the planar mode.
    let r = (ro >> 2) as i32;
    let dr = sign_extend_3((ro & 0x3) << 1 | go >> 6);
    if r + dr < 0 {
        bits |= 1 << 63;
    }

    let g = ((go >> 2) & 0xF) as i32;
    let dg = sign_extend_3((go & 0x3) << 1 | bo >> 5);
    if g + dg < 0 {
        bits |= 1 << 55;
    }

    let b_low = (bo >> 3) & 0x3;
    let db_low = (bo >> 1) & 0x3;
    if b_low + db_low < 4 {
        bits |= 1 << 42;
    } else {
        bits |= 0x7 << 45;
    }

    bits.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EFFORTS: [u8; 3] = [0, 40, 100];

    fn decode(f: fn(&[u8], &mut [u8], usize), block: &[u8; 8]) -> [[u8; 4]; 16] {
        let mut rgba = [[0u8; 4]; 16];
        f(block, bytemuck::cast_slice_mut(&mut rgba), 16);
        rgba
    }

    fn max_error(a: &[[u8; 4]; 16], b: &[[u8; 4]; 16]) -> i32 {
        a.iter()
            .zip(b)
            .flat_map(|(a, b)| (0..3).map(|c| (a[c] as i32 - b[c] as i32).abs()))
            .max()
            .unwrap()
    }

    #[test]
    fn etc1_flat_block_exact() {
        let pixels = [[138u8, 70, 206, 255]; 16];
        for effort in EFFORTS {
            let block = compress_color_block(&pixels, ColorVariant::Etc1, effort);
            assert_eq!(pixels, decode(blockdec_rs::etc1, &block));
        }
    }

    #[test]
    fn etc2_flat_block_exact() {
        let pixels = [[132u8, 66, 255, 255]; 16];
        for effort in EFFORTS {
            let block = compress_color_block(&pixels, ColorVariant::Etc2, effort);
            assert_eq!(pixels, decode(blockdec_rs::etc2_rgb, &block));
        }
    }

    #[test]
    fn flat_block_close() {
        for value in (0..=255u8).step_by(5) {
            let pixels = [[value, 255 - value, value / 2, 255]; 16];
            let block = compress_color_block(&pixels, ColorVariant::Etc1, 0);
            assert!(max_error(&pixels, &decode(blockdec_rs::etc1, &block)) <= 6);
        }
    }

    #[test]
    fn two_halves() {
        // Distinct colors in the left and right halves.
        let pixels: [[u8; 4]; 16] = std::array::from_fn(|i| {
            if i % 4 < 2 {
                [200, 30, 30, 255]
            } else {
                [30, 30, 200, 255]
            }
        });
        for effort in EFFORTS {
            let block = compress_color_block(&pixels, ColorVariant::Etc1, effort);
            assert!(max_error(&pixels, &decode(blockdec_rs::etc1, &block)) <= 8);
        }
    }

    #[test]
    fn etc2_planar_gradient() {
        let pixels: [[u8; 4]; 16] = std::array::from_fn(|i| {
            let x = (i % 4) as u8;
            let y = (i / 4) as u8;
            [40 + x * 20, 10 + y * 30, 100 + x * 10 + y * 10, 255]
        });
        for effort in EFFORTS {
            let block = compress_color_block(&pixels, ColorVariant::Etc2, effort);
            assert!(max_error(&pixels, &decode(blockdec_rs::etc2_rgb, &block)) <= 6);
        }
    }

    #[test]
    fn planar_selects_planar_mode() {
        // Every channel near the extremes of the differential sums.
        for q in [
            [[0, 0, 0], [0, 0, 0], [0, 0, 0]],
            [[63, 63, 63], [127, 127, 127], [63, 63, 63]],
            [[3, 40, 20], [1, 100, 3], [32, 0, 63]],
        ] {
            let block = pack_planar(&q);
            let bits = u64::from_be_bytes(block);
            let r = ((bits >> 59) & 0x1F) as i32 + sign_extend_3((bits >> 56) & 0x7);
            let g = ((bits >> 51) & 0x1F) as i32 + sign_extend_3((bits >> 48) & 0x7);
            let b = ((bits >> 43) & 0x1F) as i32 + sign_extend_3((bits >> 40) & 0x7);
            assert!((0..32).contains(&r));
            assert!((0..32).contains(&g));
            assert!(!(0..32).contains(&b));
            assert_eq!(1, (bits >> 33) & 1);
        }
    }

    #[test]
    fn planar_error_matches_decoder() {
        let pixels: [[u8; 4]; 16] = std::array::from_fn(|i| [(i * 13) as u8, 200, (i * 7) as u8, 255]);
        let (error, block) = planar_block(&pixels, 100);
        let decoded = decode(blockdec_rs::etc2_rgb, &block);
        let expected: u32 = pixels
            .iter()
            .zip(&decoded)
            .flat_map(|(a, b)| (0..3).map(|c| (a[c] as i32 - b[c] as i32).pow(2) as u32))
            .sum();
        assert_eq!(expected, error);
    }

    #[test]
    fn punch_through_transparent() {
        let pixels: [[u8; 4]; 16] = std::array::from_fn(|i| {
            if i % 4 < 2 {
                [132, 66, 255, 255]
            } else {
                [0, 0, 0, 0]
            }
        });
        for effort in EFFORTS {
            let block = compress_color_block(&pixels, ColorVariant::PunchThrough, effort);
            assert_eq!(pixels, decode(blockdec_rs::etc2_rgb_a1, &block));
        }
    }

    #[test]
    fn punch_through_fully_transparent() {
        let pixels = [[10u8, 20, 30, 0]; 16];
        let block = compress_color_block(&pixels, ColorVariant::PunchThrough, 0);
        assert_eq!([[0u8; 4]; 16], decode(blockdec_rs::etc2_rgb_a1, &block));
    }

    #[test]
    fn punch_through_opaque_gradient() {
        let pixels: [[u8; 4]; 16] = std::array::from_fn(|i| [(i * 16) as u8, 128, 64, 255]);
        let block = compress_color_block(&pixels, ColorVariant::PunchThrough, 100);
        let decoded = decode(blockdec_rs::etc2_rgb_a1, &block);
        assert!(decoded.iter().all(|p| p[3] == 255));
        assert!(max_error(&pixels, &decoded) <= 64);
    }
}
