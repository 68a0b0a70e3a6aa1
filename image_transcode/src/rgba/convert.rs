use half::f16;

/// A single component of an uncompressed pixel stored in little-endian byte order.
pub trait Channel: Copy {
    const SIZE: usize;

    fn read(bytes: &[u8]) -> Self;
    fn write(self, bytes: &mut [u8]);

    fn to_unorm8(self) -> u8;
    fn from_unorm8(u: u8) -> Self;
    fn to_f32(self) -> f32;
    fn from_f32(f: f32) -> Self;
    const ZERO: Self;
}

impl Channel for u8 {
    const SIZE: usize = 1;
    const ZERO: Self = 0;

    fn read(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn write(self, bytes: &mut [u8]) {
        bytes[0] = self;
    }

    fn to_unorm8(self) -> u8 {
        self
    }

    fn from_unorm8(u: u8) -> Self {
        u
    }

    fn to_f32(self) -> f32 {
        self as f32 / 255.0
    }

    fn from_f32(f: f32) -> Self {
        float_to_unorm8(f)
    }
}

impl Channel for i8 {
    const SIZE: usize = 1;
    const ZERO: Self = 0;

    fn read(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }

    fn write(self, bytes: &mut [u8]) {
        bytes[0] = self as u8;
    }

    fn to_unorm8(self) -> u8 {
        snorm8_to_unorm8(self as u8)
    }

    fn from_unorm8(u: u8) -> Self {
        unorm8_to_snorm8(u) as i8
    }

    fn to_f32(self) -> f32 {
        snorm8_to_float(self as u8)
    }

    fn from_f32(f: f32) -> Self {
        float_to_snorm8(f)
    }
}

impl Channel for u16 {
    const SIZE: usize = 2;
    const ZERO: Self = 0;

    fn read(bytes: &[u8]) -> Self {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }

    fn write(self, bytes: &mut [u8]) {
        bytes[..2].copy_from_slice(&self.to_le_bytes());
    }

    fn to_unorm8(self) -> u8 {
        unorm16_to_unorm8(self)
    }

    fn from_unorm8(u: u8) -> Self {
        unorm8_to_unorm16(u)
    }

    fn to_f32(self) -> f32 {
        self as f32 / 65535.0
    }

    fn from_f32(f: f32) -> Self {
        float_to_unorm(f, 65535) as u16
    }
}

impl Channel for i16 {
    const SIZE: usize = 2;
    const ZERO: Self = 0;

    fn read(bytes: &[u8]) -> Self {
        i16::from_le_bytes([bytes[0], bytes[1]])
    }

    fn write(self, bytes: &mut [u8]) {
        bytes[..2].copy_from_slice(&self.to_le_bytes());
    }

    fn to_unorm8(self) -> u8 {
        snorm16_to_unorm8(self as u16)
    }

    fn from_unorm8(u: u8) -> Self {
        unorm8_to_snorm16(u)
    }

    fn to_f32(self) -> f32 {
        snorm16_to_float(self as u16)
    }

    fn from_f32(f: f32) -> Self {
        float_to_snorm16(f)
    }
}

impl Channel for f16 {
    const SIZE: usize = 2;
    const ZERO: Self = f16::ZERO;

    fn read(bytes: &[u8]) -> Self {
        f16::from_le_bytes([bytes[0], bytes[1]])
    }

    fn write(self, bytes: &mut [u8]) {
        bytes[..2].copy_from_slice(&self.to_le_bytes());
    }

    fn to_unorm8(self) -> u8 {
        float_to_unorm8(self.to_f32())
    }

    fn from_unorm8(u: u8) -> Self {
        f16::from_f32(u as f32 / 255.0)
    }

    fn to_f32(self) -> f32 {
        f16::to_f32(self)
    }

    fn from_f32(f: f32) -> Self {
        f16::from_f32(f)
    }
}

impl Channel for f32 {
    const SIZE: usize = 4;
    const ZERO: Self = 0.0;

    fn read(bytes: &[u8]) -> Self {
        f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn write(self, bytes: &mut [u8]) {
        bytes[..4].copy_from_slice(&self.to_le_bytes());
    }

    fn to_unorm8(self) -> u8 {
        float_to_unorm8(self)
    }

    fn from_unorm8(u: u8) -> Self {
        u as f32 / 255.0
    }

    fn to_f32(self) -> f32 {
        self
    }

    fn from_f32(f: f32) -> Self {
        f
    }
}

/// Quantizes `x` to `[0, max]` after clamping to `[0, 1]`.
pub fn float_to_unorm(x: f32, max: u32) -> u32 {
    // NaN compares false and maps to 0.
    if x > 0.0 {
        (x.min(1.0) * max as f32 + 0.5) as u32
    } else {
        0
    }
}

pub fn float_to_unorm8(x: f32) -> u8 {
    float_to_unorm(x, 255) as u8
}

// Signed values are biased by 128 so -128 maps to 0 and 127 maps to 255.
pub fn snorm8_to_unorm8(x: u8) -> u8 {
    x ^ 0x80
}

pub fn unorm8_to_snorm8(x: u8) -> u8 {
    x ^ 0x80
}

pub fn snorm8_to_float(x: u8) -> f32 {
    (x as i8) as f32 / 128.0
}

pub fn float_to_snorm8(x: f32) -> i8 {
    (x.clamp(-1.0, 1.0) * 128.0).floor().min(127.0) as i8
}

pub fn snorm16_to_float(x: u16) -> f32 {
    (x as i16) as f32 / 32768.0
}

pub fn float_to_snorm16(x: f32) -> i16 {
    (x.clamp(-1.0, 1.0) * 32768.0).floor().min(32767.0) as i16
}

pub fn snorm16_to_unorm8(x: u16) -> u8 {
    unorm16_to_unorm8(x ^ 0x8000)
}

pub fn unorm8_to_snorm16(x: u8) -> i16 {
    (unorm8_to_unorm16(x) ^ 0x8000) as i16
}

// https://rundevelopment.github.io/blog/fast-unorm-conversions
pub fn unorm1_to_unorm8(x: u16) -> u8 {
    (x & 0x1) as u8 * 255
}

pub fn unorm4_to_unorm8(x: u16) -> u8 {
    (x & 0xF) as u8 * 17
}

pub fn unorm5_to_unorm8(x: u16) -> u8 {
    let x = (x & 0x1F) as u8;
    (x << 3) | (x >> 2)
}

pub fn unorm6_to_unorm8(x: u16) -> u8 {
    let x = (x & 0x3F) as u8;
    (x << 2) | (x >> 4)
}

/// Truncates an 8-bit value to its `bits` most significant bits.
pub fn unorm8_to_unorm(x: u8, bits: u32) -> u16 {
    (x >> (8 - bits)) as u16
}

pub fn unorm16_to_unorm8(x: u16) -> u8 {
    ((x as u32 * 255 + 32895) >> 16) as u8
}

pub fn unorm8_to_unorm16(x: u8) -> u16 {
    x as u16 * 257
}

pub fn unorm24_to_float(x: u32) -> f32 {
    (x & 0xFFFFFF) as f32 / 16777215.0
}

pub fn float_to_unorm24(x: f32) -> u32 {
    float_to_unorm(x, 0xFFFFFF)
}

// Unsigned 11 and 10 bit floats share the exponent layout of f16 without a sign bit.
pub fn float11_to_float(x: u32) -> f32 {
    f16::from_bits(((x & 0x7FF) << 4) as u16).to_f32()
}

pub fn float_to_float11(x: f32) -> u32 {
    if x > 0.0 {
        (f16::from_f32(x).to_bits() >> 4) as u32 & 0x7FF
    } else {
        0
    }
}

pub fn float10_to_float(x: u32) -> f32 {
    f16::from_bits(((x & 0x3FF) << 5) as u16).to_f32()
}

pub fn float_to_float10(x: f32) -> u32 {
    if x > 0.0 {
        (f16::from_f32(x).to_bits() >> 5) as u32 & 0x3FF
    } else {
        0
    }
}

const RGB9E5_EXPONENT_BIAS: i32 = 15;
const RGB9E5_MANTISSA_BITS: i32 = 9;
const RGB9E5_MAX: f32 = 65408.0;

/// Decodes a shared exponent value with 9-bit mantissas and a 5-bit exponent.
pub fn rgb9e5_to_float(x: u32) -> [f32; 3] {
    let exponent = (x >> 27) as i32 - RGB9E5_EXPONENT_BIAS - RGB9E5_MANTISSA_BITS;
    let scale = 2f32.powi(exponent);
    [
        (x & 0x1FF) as f32 * scale,
        ((x >> 9) & 0x1FF) as f32 * scale,
        ((x >> 18) & 0x1FF) as f32 * scale,
    ]
}

pub fn float_to_rgb9e5(rgb: [f32; 3]) -> u32 {
    let rgb = rgb.map(|c| if c > 0.0 { c.min(RGB9E5_MAX) } else { 0.0 });
    let max = rgb[0].max(rgb[1]).max(rgb[2]);

    let mut exponent = if max > 0.0 {
        (max.log2().floor() as i32).max(-RGB9E5_EXPONENT_BIAS - 1) + 1 + RGB9E5_EXPONENT_BIAS
    } else {
        0
    };
    let mut scale = 2f32.powi(exponent - RGB9E5_EXPONENT_BIAS - RGB9E5_MANTISSA_BITS);

    // Rounding the largest channel may overflow the mantissa.
    if (max / scale + 0.5).floor() as u32 == 1 << RGB9E5_MANTISSA_BITS {
        scale *= 2.0;
        exponent += 1;
    }

    let [r, g, b] = rgb.map(|c| ((c / scale + 0.5).floor() as u32).min(0x1FF));
    (exponent.clamp(0, 31) as u32) << 27 | b << 18 | g << 9 | r
}

/// Decodes a Radiance RGBE pixel.
pub fn rgbe_to_float(rgbe: [u8; 4]) -> [f32; 3] {
    if rgbe[3] == 0 {
        [0.0; 3]
    } else {
        // 2^(e - 128) / 256
        let scale = 2f32.powi(rgbe[3] as i32 - 136);
        [
            rgbe[0] as f32 * scale,
            rgbe[1] as f32 * scale,
            rgbe[2] as f32 * scale,
        ]
    }
}

pub fn float_to_rgbe(rgb: [f32; 3]) -> [u8; 4] {
    let max = rgb[0].max(rgb[1]).max(rgb[2]);
    if max < 1e-32 {
        return [0; 4];
    }

    let (mantissa, exponent) = frexp(max);
    let scale = mantissa * 256.0 / max;
    let [r, g, b] = rgb.map(|c| (c.max(0.0) * scale) as u8);
    [r, g, b, (exponent + 128).clamp(0, 255) as u8]
}

/// Splits `x` into a mantissa in `[0.5, 1)` and a power of two exponent.
pub fn frexp(x: f32) -> (f32, i32) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let exponent = x.abs().log2().floor() as i32 + 1;
    let mut mantissa = x / 2f32.powi(exponent);
    let mut exponent = exponent;
    // Correct for rounding in log2 near powers of two.
    if mantissa.abs() >= 1.0 {
        mantissa *= 0.5;
        exponent += 1;
    } else if mantissa.abs() < 0.5 {
        mantissa *= 2.0;
        exponent -= 1;
    }
    (mantissa, exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn unorm4_to_unorm8_reference(x: u16) -> u8 {
        (x as f32 / 15.0 * 255.0).round() as u8
    }

    fn unorm5_to_unorm8_reference(x: u16) -> u8 {
        (x as f32 / 31.0 * 255.0).round() as u8
    }

    fn unorm16_to_unorm8_reference(x: u16) -> u8 {
        (x as f32 / 65535.0 * 255.0).round() as u8
    }

    #[test]
    fn convert_unorm4_to_unorm8() {
        for i in 0..=15 {
            assert_eq!(unorm4_to_unorm8(i), unorm4_to_unorm8_reference(i));
        }
    }

    #[test]
    fn convert_unorm5_to_unorm8() {
        // Bit replication stays within one of exact rounding.
        for i in 0..=31 {
            let diff = unorm5_to_unorm8(i) as i32 - unorm5_to_unorm8_reference(i) as i32;
            assert!(diff.abs() <= 1);
        }
        assert_eq!(255, unorm5_to_unorm8(31));
        assert_eq!(255, unorm6_to_unorm8(63));
    }

    #[test]
    fn unorm_bit_replication_inverse() {
        for i in 0..=15 {
            assert_eq!(i, unorm8_to_unorm(unorm4_to_unorm8(i), 4));
        }
        for i in 0..=31 {
            assert_eq!(i, unorm8_to_unorm(unorm5_to_unorm8(i), 5));
        }
        for i in 0..=63 {
            assert_eq!(i, unorm8_to_unorm(unorm6_to_unorm8(i), 6));
        }
    }

    #[test]
    fn convert_unorm16_to_unorm8() {
        for i in 0..=65535 {
            assert_eq!(unorm16_to_unorm8(i), unorm16_to_unorm8_reference(i));
        }
    }

    #[test]
    fn snorm8_unorm8_inverse() {
        for i in 0..=255 {
            assert_eq!(i, unorm8_to_snorm8(snorm8_to_unorm8(i)));
        }
        assert_eq!(0, snorm8_to_unorm8(0x80));
        assert_eq!(255, snorm8_to_unorm8(0x7F));
    }

    #[test]
    fn snorm8_float_inverse() {
        for i in 0..=255u8 {
            assert_eq!(i as i8, float_to_snorm8(snorm8_to_float(i)));
        }
    }

    #[test]
    fn float_to_snorm8_asymmetric() {
        assert_eq!(127, float_to_snorm8(1.0));
        assert_eq!(-128, float_to_snorm8(-1.0));
        assert_eq!(-128, float_to_snorm8(-2.0));
        assert_eq!(-1, float_to_snorm8(-0.001));
    }

    #[test]
    fn snorm16_float_inverse() {
        for i in 0..=65535u16 {
            assert_eq!(i as i16, float_to_snorm16(snorm16_to_float(i)));
        }
    }

    #[test]
    fn float_to_unorm8_clamps() {
        assert_eq!(0, float_to_unorm8(-1.0));
        assert_eq!(255, float_to_unorm8(2.0));
        assert_eq!(0, float_to_unorm8(f32::NAN));
        for i in 0..=255u8 {
            assert_eq!(i, float_to_unorm8(i as f32 / 255.0));
        }
    }

    #[test]
    fn float11_round_trip() {
        for i in 0..0x7C0 {
            assert_eq!(i, float_to_float11(float11_to_float(i)));
        }
        for i in 0..0x3E0 {
            assert_eq!(i, float_to_float10(float10_to_float(i)));
        }
    }

    #[test]
    fn rgb9e5_values() {
        let rgb = rgb9e5_to_float(float_to_rgb9e5([1.0, 0.5, 0.25]));
        assert_relative_eq!(1.0, rgb[0]);
        assert_relative_eq!(0.5, rgb[1]);
        assert_relative_eq!(0.25, rgb[2]);

        assert_eq!([0.0; 3], rgb9e5_to_float(float_to_rgb9e5([-1.0, 0.0, 0.0])));

        // Values above the largest mantissa and exponent saturate.
        let rgb = rgb9e5_to_float(float_to_rgb9e5([100000.0, 256.0, 0.0]));
        assert_relative_eq!(RGB9E5_MAX, rgb[0]);
        assert_relative_eq!(256.0, rgb[1]);
    }

    #[test]
    fn rgbe_values() {
        assert_eq!([0.0; 3], rgbe_to_float([0, 0, 0, 0]));
        assert_eq!([0, 0, 0, 0], float_to_rgbe([0.0; 3]));

        let rgb = rgbe_to_float(float_to_rgbe([1.0, 0.5, 0.25]));
        assert_relative_eq!(1.0, rgb[0], epsilon = 0.01);
        assert_relative_eq!(0.5, rgb[1], epsilon = 0.01);
        assert_relative_eq!(0.25, rgb[2], epsilon = 0.01);
    }

    #[test]
    fn frexp_power_of_two() {
        assert_eq!((0.5, 1), frexp(1.0));
        assert_eq!((0.5, 3), frexp(4.0));
        assert_eq!((0.75, 2), frexp(3.0));
    }
}
