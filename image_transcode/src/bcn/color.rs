//! DXT color endpoint selection.
use blockdec_rs::{expand_565_b, expand_565_g, expand_565_r};
use glam::{Mat3, Vec3};
use lazy_static::lazy_static;

use crate::Quality;

/// How the decoder interprets the endpoint order of a color block.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ColorMode {
    /// DXT1 where `c0 <= c1` selects 3 colors and transparent black.
    Dxt1,
    /// DXT3 and DXT5 always interpolate 4 colors.
    FourColor,
}

/// Endpoint pairs whose interpolated color best matches each 8-bit value.
struct SingleColor {
    four: [[u8; 2]; 256],
    three: [[u8; 2]; 256],
}

lazy_static! {
    static ref SINGLE_COLOR_5: SingleColor = SingleColor::new(32, expand5);
    static ref SINGLE_COLOR_6: SingleColor = SingleColor::new(64, expand6);
}

fn expand5(x: u8) -> u8 {
    expand_565_b(x as u16)
}

fn expand6(x: u8) -> u8 {
    expand_565_g((x as u16) << 5)
}

impl SingleColor {
    fn new(levels: u8, expand: fn(u8) -> u8) -> Self {
        Self {
            four: single_color_table(levels, expand, |a, b| (2 * a + b + 1) / 3),
            three: single_color_table(levels, expand, |a, b| (a + b + 1) / 2),
        }
    }

    fn endpoints(&self, value: u8, three_color: bool) -> [u8; 2] {
        if three_color {
            self.three[value as usize]
        } else {
            self.four[value as usize]
        }
    }
}

fn single_color_table(
    levels: u8,
    expand: fn(u8) -> u8,
    interpolate: fn(u32, u32) -> u32,
) -> [[u8; 2]; 256] {
    let mut table = [[0u8; 2]; 256];
    for (value, entry) in table.iter_mut().enumerate() {
        // Prefer closer endpoints for the same error.
        let mut best = (u32::MAX, u32::MAX);
        for a in 0..levels {
            for b in 0..levels {
                let ea = expand(a) as u32;
                let eb = expand(b) as u32;
                let error = interpolate(ea, eb).abs_diff(value as u32);
                let key = (error, ea.abs_diff(eb));
                if key < best {
                    best = key;
                    *entry = [a, b];
                }
            }
        }
    }
    table
}

/// Encodes the RGB channels of 16 pixels as two 565 endpoints and 2-bit indices.
///
/// [ColorMode::Dxt1] encodes pixels with alpha below 128 as transparent.
pub fn compress_color_block(pixels: &[[u8; 4]; 16], mode: ColorMode, quality: Quality) -> [u8; 8] {
    let transparent: [bool; 16] =
        std::array::from_fn(|i| mode == ColorMode::Dxt1 && pixels[i][3] < 128);
    let three_color = transparent.contains(&true);

    let colors: Vec<Vec3> = pixels
        .iter()
        .zip(transparent)
        .filter(|(_, t)| !t)
        .map(|(p, _)| Vec3::new(p[0] as f32, p[1] as f32, p[2] as f32))
        .collect();

    let block = BlockPixels {
        pixels,
        transparent: &transparent,
        mode,
        three_color,
    };

    let Some(first) = colors.first() else {
        return block.encode(0, 0).0;
    };

    if colors.iter().all(|c| c == first) {
        let color = [first.x as u8, first.y as u8, first.z as u8];
        let mut best = block.encode_single_color(color, three_color);
        // Some values are only reachable with the 3 color midpoint.
        if mode == ColorMode::Dxt1 && !three_color {
            best = best_of(best, block.encode_single_color(color, true));
        }
        return best.0;
    }

    let (mean, axis) = principal_axis(&colors);

    // Range fit along the principal axis.
    let (min_t, max_t) = colors
        .iter()
        .map(|c| (*c - mean).dot(axis))
        .fold((f32::MAX, f32::MIN), |(lo, hi), t| (lo.min(t), hi.max(t)));
    let mut best = block.encode_rgb(mean + axis * min_t, mean + axis * max_t);

    if quality != Quality::Fast {
        // Refine the endpoints for the current index assignment.
        for _ in 0..2 {
            let weights = block.weights(&best.0);
            if let Some((start, end)) = least_squares(&colors, &weights) {
                best = best_of(best, block.encode_rgb(start, end));
            }
        }
    }

    if quality == Quality::HighQuality {
        let clusters = if three_color {
            [0.0, 0.5, 1.0, 1.0]
        } else {
            [0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0]
        };
        if let Some((start, end)) = cluster_fit(&colors, axis, clusters) {
            best = best_of(best, block.encode_rgb(start, end));
        }
    }

    best.0
}

struct BlockPixels<'a> {
    pixels: &'a [[u8; 4]; 16],
    transparent: &'a [bool; 16],
    mode: ColorMode,
    three_color: bool,
}

impl BlockPixels<'_> {
    fn encode_rgb(&self, start: Vec3, end: Vec3) -> ([u8; 8], u32) {
        self.encode(to_565(start), to_565(end))
    }

    fn encode_single_color(&self, [r, g, b]: [u8; 3], three_color: bool) -> ([u8; 8], u32) {
        let r = SINGLE_COLOR_5.endpoints(r, three_color);
        let g = SINGLE_COLOR_6.endpoints(g, three_color);
        let b = SINGLE_COLOR_5.endpoints(b, three_color);
        let c0 = pack_565(r[0], g[0], b[0]);
        let c1 = pack_565(r[1], g[1], b[1]);
        self.encode_ordered(c0, c1, three_color)
    }

    fn encode(&self, c0: u16, c1: u16) -> ([u8; 8], u32) {
        self.encode_ordered(c0, c1, self.three_color)
    }

    /// Orders the endpoints for the decoder mode and picks the nearest palette entry for each pixel.
    fn encode_ordered(&self, c0: u16, c1: u16, three_color: bool) -> ([u8; 8], u32) {
        let (c0, c1) = if self.mode == ColorMode::Dxt1 && three_color {
            (c0.min(c1), c0.max(c1))
        } else {
            (c0.max(c1), c0.min(c1))
        };
        let four_color = self.four_color(c0, c1);
        let palette = palette(c0, c1, four_color);
        let count = if four_color { 4 } else { 3 };

        let mut indices = 0u32;
        let mut error = 0u32;
        for (i, (pixel, transparent)) in self.pixels.iter().zip(self.transparent).enumerate() {
            let index = if *transparent {
                3
            } else {
                let (index, e) = palette[..count]
                    .iter()
                    .enumerate()
                    .map(|(j, p)| (j as u32, distance(p, pixel)))
                    .min_by_key(|(_, e)| *e)
                    .unwrap_or((0, 0));
                error += e;
                index
            };
            indices |= index << (2 * i);
        }

        let mut block = [0u8; 8];
        block[0..2].copy_from_slice(&c0.to_le_bytes());
        block[2..4].copy_from_slice(&c1.to_le_bytes());
        block[4..8].copy_from_slice(&indices.to_le_bytes());
        (block, error)
    }

    fn four_color(&self, c0: u16, c1: u16) -> bool {
        self.mode == ColorMode::FourColor || c0 > c1
    }

    /// The interpolation weight of the second endpoint for each opaque pixel.
    fn weights(&self, block: &[u8; 8]) -> Vec<f32> {
        let c0 = u16::from_le_bytes([block[0], block[1]]);
        let c1 = u16::from_le_bytes([block[2], block[3]]);
        let indices = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);
        let weights = if self.four_color(c0, c1) {
            [0.0, 1.0, 1.0 / 3.0, 2.0 / 3.0]
        } else {
            [0.0, 1.0, 0.5, 0.0]
        };

        self.transparent
            .iter()
            .enumerate()
            .filter(|(_, t)| !**t)
            .map(|(i, _)| weights[((indices >> (2 * i)) & 0x3) as usize])
            .collect()
    }
}

fn best_of(a: ([u8; 8], u32), b: ([u8; 8], u32)) -> ([u8; 8], u32) {
    if b.1 < a.1 {
        b
    } else {
        a
    }
}

fn distance(a: &[i32; 3], b: &[u8; 4]) -> u32 {
    (0..3)
        .map(|i| (a[i] - b[i] as i32).pow(2) as u32)
        .sum()
}

fn expand_565(c: u16) -> [i32; 3] {
    [
        expand_565_r(c) as i32,
        expand_565_g(c) as i32,
        expand_565_b(c) as i32,
    ]
}

/// The colors the decoder produces for each index.
fn palette(c0: u16, c1: u16, four_color: bool) -> [[i32; 3]; 4] {
    let e0 = expand_565(c0);
    let e1 = expand_565(c1);
    if four_color {
        [
            e0,
            e1,
            std::array::from_fn(|i| (2 * e0[i] + e1[i] + 1) / 3),
            std::array::from_fn(|i| (e0[i] + 2 * e1[i] + 1) / 3),
        ]
    } else {
        [
            e0,
            e1,
            std::array::from_fn(|i| (e0[i] + e1[i] + 1) / 2),
            [0; 3],
        ]
    }
}

fn pack_565(r: u8, g: u8, b: u8) -> u16 {
    (r as u16) << 11 | (g as u16) << 5 | b as u16
}

fn to_565(c: Vec3) -> u16 {
    let c = c.clamp(Vec3::ZERO, Vec3::splat(255.0));
    pack_565(
        (c.x * 31.0 / 255.0).round() as u8,
        (c.y * 63.0 / 255.0).round() as u8,
        (c.z * 31.0 / 255.0).round() as u8,
    )
}

/// The mean and the direction of greatest variance.
fn principal_axis(colors: &[Vec3]) -> (Vec3, Vec3) {
    let mean = colors.iter().copied().sum::<Vec3>() / colors.len() as f32;

    let mut covariance = Mat3::ZERO;
    for c in colors {
        let d = *c - mean;
        covariance += Mat3::from_cols(d * d.x, d * d.y, d * d.z);
    }

    // Start from the column with the largest variance to avoid an orthogonal initial guess.
    let diagonal = Vec3::new(covariance.x_axis.x, covariance.y_axis.y, covariance.z_axis.z);
    let mut axis = if diagonal.x >= diagonal.y && diagonal.x >= diagonal.z {
        covariance.x_axis
    } else if diagonal.y >= diagonal.z {
        covariance.y_axis
    } else {
        covariance.z_axis
    };

    for _ in 0..8 {
        axis = covariance * axis;
        let length = axis.length();
        if length < 1e-6 {
            return (mean, Vec3::ONE.normalize());
        }
        axis /= length;
    }

    (mean, axis)
}

struct Sums {
    alpha2: f32,
    beta2: f32,
    alpha_beta: f32,
    alpha_x: Vec3,
    beta_x: Vec3,
}

impl Sums {
    fn new() -> Self {
        Self {
            alpha2: 0.0,
            beta2: 0.0,
            alpha_beta: 0.0,
            alpha_x: Vec3::ZERO,
            beta_x: Vec3::ZERO,
        }
    }

    /// Adds `count` colors summing to `sum` with weight `t` for the second endpoint.
    fn add(&mut self, t: f32, count: f32, sum: Vec3) {
        let a = 1.0 - t;
        self.alpha2 += a * a * count;
        self.beta2 += t * t * count;
        self.alpha_beta += a * t * count;
        self.alpha_x += sum * a;
        self.beta_x += sum * t;
    }

    /// Endpoints minimizing the squared error for the fixed weights.
    fn solve(&self) -> Option<(Vec3, Vec3)> {
        let det = self.alpha2 * self.beta2 - self.alpha_beta * self.alpha_beta;
        if det.abs() < 1e-6 {
            return None;
        }
        let start = (self.alpha_x * self.beta2 - self.beta_x * self.alpha_beta) / det;
        let end = (self.beta_x * self.alpha2 - self.alpha_x * self.alpha_beta) / det;
        let max = Vec3::splat(255.0);
        Some((start.clamp(Vec3::ZERO, max), end.clamp(Vec3::ZERO, max)))
    }

    /// The squared error for the endpoints without the constant sum of squared colors.
    fn error(&self, start: Vec3, end: Vec3) -> f32 {
        start.dot(start) * self.alpha2
            + end.dot(end) * self.beta2
            + 2.0 * start.dot(end) * self.alpha_beta
            - 2.0 * start.dot(self.alpha_x)
            - 2.0 * end.dot(self.beta_x)
    }
}

fn least_squares(colors: &[Vec3], weights: &[f32]) -> Option<(Vec3, Vec3)> {
    let mut sums = Sums::new();
    for (c, t) in colors.iter().zip(weights) {
        sums.add(*t, 1.0, *c);
    }
    sums.solve()
}

/// Tries every ordered partition of the colors sorted along `axis` into 4 clusters.
fn cluster_fit(colors: &[Vec3], axis: Vec3, clusters: [f32; 4]) -> Option<(Vec3, Vec3)> {
    let mut sorted = colors.to_vec();
    sorted.sort_by(|a, b| a.dot(axis).total_cmp(&b.dot(axis)));

    let n = sorted.len();
    let mut prefix = vec![Vec3::ZERO; n + 1];
    for (i, c) in sorted.iter().enumerate() {
        prefix[i + 1] = prefix[i] + *c;
    }

    let mut best: Option<(f32, (Vec3, Vec3))> = None;
    for i in 0..=n {
        for j in i..=n {
            for k in j..=n {
                let bounds = [(0, i), (i, j), (j, k), (k, n)];
                let mut sums = Sums::new();
                for (t, (start, end)) in clusters.iter().zip(bounds) {
                    sums.add(*t, (end - start) as f32, prefix[end] - prefix[start]);
                }

                if let Some((start, end)) = sums.solve() {
                    let error = sums.error(start, end);
                    if best.map(|(e, _)| error < e).unwrap_or(true) {
                        best = Some((error, (start, end)));
                    }
                }
            }
        }
    }

    best.map(|(_, endpoints)| endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUALITIES: [Quality; 3] = [Quality::Fast, Quality::Normal, Quality::HighQuality];

    fn decode(block: &[u8; 8], mode: ColorMode) -> [[u8; 4]; 16] {
        let mut rgba = [[0u8; 4]; 16];
        match mode {
            ColorMode::Dxt1 => blockdec_rs::bc1(block, bytemuck::cast_slice_mut(&mut rgba), 16),
            ColorMode::FourColor => {
                let mut full = [0u8; 16];
                full[8..].copy_from_slice(block);
                blockdec_rs::bc3(&full, bytemuck::cast_slice_mut(&mut rgba), 16);
                for p in &mut rgba {
                    p[3] = 255;
                }
            }
        }
        rgba
    }

    fn total_error(a: &[[u8; 4]; 16], b: &[[u8; 4]; 16]) -> u32 {
        a.iter()
            .zip(b)
            .map(|(a, b)| (0..3).map(|i| (a[i] as i32 - b[i] as i32).pow(2) as u32).sum::<u32>())
            .sum()
    }

    #[test]
    fn flat_block_exact() {
        let pixels = [[132u8, 130, 66, 255]; 16];
        for quality in QUALITIES {
            for mode in [ColorMode::Dxt1, ColorMode::FourColor] {
                let block = compress_color_block(&pixels, mode, quality);
                assert_eq!(pixels, decode(&block, mode));
            }
        }
    }

    /// The 8-bit values the decoder can produce from a flat block in each palette mode.
    fn reachable(levels: u8, expand: fn(u8) -> u8, three_color: bool) -> [bool; 256] {
        let mut values = [false; 256];
        for a in 0..levels {
            for b in 0..levels {
                let ea = expand(a) as u32;
                let eb = expand(b) as u32;
                values[ea as usize] = true;
                let mid = if three_color {
                    (ea + eb + 1) / 2
                } else {
                    (2 * ea + eb + 1) / 3
                };
                values[mid as usize] = true;
            }
        }
        values
    }

    fn assert_flat_exact(color: [u8; 3], mode: ColorMode) {
        let pixels = [[color[0], color[1], color[2], 255]; 16];
        let block = compress_color_block(&pixels, mode, Quality::Normal);
        assert_eq!(pixels, decode(&block, mode), "{mode:?} {color:?}");
    }

    #[test]
    fn flat_representable_values_exact() {
        let four_5 = reachable(32, expand5, false);
        let four_6 = reachable(64, expand6, false);
        let three_5 = reachable(32, expand5, true);
        let three_6 = reachable(64, expand6, true);

        for v in 0..=255u8 {
            let i = v as usize;
            if four_5[i] {
                assert_flat_exact([v, 0, 0], ColorMode::FourColor);
                assert_flat_exact([0, 0, v], ColorMode::FourColor);
            }
            if four_6[i] {
                assert_flat_exact([0, v, 0], ColorMode::FourColor);
            }
            if four_5[i] && four_6[i] {
                assert_flat_exact([v, v, v], ColorMode::FourColor);
            }

            if four_5[i] || three_5[i] {
                assert_flat_exact([v, 0, 0], ColorMode::Dxt1);
                assert_flat_exact([0, 0, v], ColorMode::Dxt1);
            }
            if four_6[i] || three_6[i] {
                assert_flat_exact([0, v, 0], ColorMode::Dxt1);
            }
            if (four_5[i] && four_6[i]) || (three_5[i] && three_6[i]) {
                assert_flat_exact([v, v, v], ColorMode::Dxt1);
            }
        }
    }

    #[test]
    fn flat_red_uses_three_color_midpoint() {
        // 4 is halfway between the 5-bit endpoints 0 and 8.
        let pixels = [[4u8, 0, 0, 255]; 16];
        let block = compress_color_block(&pixels, ColorMode::Dxt1, Quality::Normal);
        assert_eq!(pixels, decode(&block, ColorMode::Dxt1));
        let c0 = u16::from_le_bytes([block[0], block[1]]);
        let c1 = u16::from_le_bytes([block[2], block[3]]);
        assert!(c0 <= c1);
    }

    #[test]
    fn transparent_pixels() {
        let mut pixels = [[255u8, 0, 0, 255]; 16];
        pixels[3] = [0, 255, 0, 0];
        pixels[10] = [0, 0, 255, 127];
        for quality in QUALITIES {
            let block = compress_color_block(&pixels, ColorMode::Dxt1, quality);
            let decoded = decode(&block, ColorMode::Dxt1);
            assert_eq!([0, 0, 0, 0], decoded[3]);
            assert_eq!([0, 0, 0, 0], decoded[10]);
            assert_eq!([255, 0, 0, 255], decoded[0]);
        }
    }

    #[test]
    fn fully_transparent() {
        let pixels = [[10u8, 20, 30, 0]; 16];
        let block = compress_color_block(&pixels, ColorMode::Dxt1, Quality::Normal);
        assert_eq!([[0u8; 4]; 16], decode(&block, ColorMode::Dxt1));
    }

    #[test]
    fn two_colors_exact() {
        // Both colors are representable as 565 endpoints.
        let mut pixels = [[255u8, 255, 255, 255]; 16];
        for p in pixels.iter_mut().step_by(3) {
            *p = [0, 0, 0, 255];
        }
        for quality in QUALITIES {
            let block = compress_color_block(&pixels, ColorMode::FourColor, quality);
            assert_eq!(pixels, decode(&block, ColorMode::FourColor));
        }
    }

    #[test]
    fn higher_quality_not_worse() {
        let pixels: [[u8; 4]; 16] = std::array::from_fn(|i| {
            let x = (i % 4) as u8;
            let y = (i / 4) as u8;
            [x * 60 + y * 5, 200 - y * 40, x * y * 12, 255]
        });

        let errors = QUALITIES.map(|quality| {
            let block = compress_color_block(&pixels, ColorMode::FourColor, quality);
            total_error(&pixels, &decode(&block, ColorMode::FourColor))
        });
        assert!(errors[1] <= errors[0]);
        assert!(errors[2] <= errors[1]);
    }

    #[test]
    fn gradient_error_bounded() {
        let pixels: [[u8; 4]; 16] = std::array::from_fn(|i| {
            let v = (i * 16) as u8;
            [v, v / 2, 255 - v, 255]
        });
        for quality in QUALITIES {
            let block = compress_color_block(&pixels, ColorMode::Dxt1, quality);
            for (expected, actual) in pixels.iter().zip(decode(&block, ColorMode::Dxt1)) {
                for c in 0..3 {
                    assert!((expected[c] as i32 - actual[c] as i32).abs() <= 24);
                }
            }
        }
    }
}
