//! Per-format pixel types and row conversions to and from the canonical RGBA8 and RGBA32F layouts.
use std::marker::PhantomData;

use half::f16;

mod convert;
pub use convert::*;

/// A row conversion of `num_pixels` pixels from `src` to `dst`.
///
/// Canonical RGBA32F rows are little-endian `f32` bytes.
pub type RowFn = fn(&[u8], &mut [u8], usize);

/// A pixel with a fixed size in bytes.
pub trait Pixel: Sized {
    const SIZE: usize;

    fn read(bytes: &[u8]) -> Self;
    fn write(&self, bytes: &mut [u8]);
}

pub trait ToRgba<T> {
    fn to_rgba(&self) -> [T; 4];
}

pub trait FromRgba<T> {
    fn from_rgba(rgba: [T; 4]) -> Self;
}

/// Maps stored components to RGBA.
pub trait Layout {
    /// The stored component for each of R, G, B, A or `None` if missing.
    const SOURCES: [Option<usize>; 4];
    /// The RGBA channel written to each stored component.
    const STORED: &'static [usize];
}

macro_rules! layout {
    ($name:ident, $sources:expr, $stored:expr) => {
        pub struct $name;

        impl Layout for $name {
            const SOURCES: [Option<usize>; 4] = $sources;
            const STORED: &'static [usize] = &$stored;
        }
    };
}

layout!(R, [Some(0), None, None, None], [0]);
layout!(Rg, [Some(0), Some(1), None, None], [0, 1]);
layout!(Rgb, [Some(0), Some(1), Some(2), None], [0, 1, 2]);
layout!(Bgr, [Some(2), Some(1), Some(0), None], [2, 1, 0]);
layout!(Rgba, [Some(0), Some(1), Some(2), Some(3)], [0, 1, 2, 3]);
layout!(Bgra, [Some(2), Some(1), Some(0), Some(3)], [2, 1, 0, 3]);
layout!(L, [Some(0), Some(0), Some(0), None], [0]);
layout!(La, [Some(0), Some(0), Some(0), Some(1)], [0, 3]);
layout!(A, [None, None, None, Some(0)], [3]);

/// A pixel where every stored component uses the same channel type `C`.
pub struct Channels<C, L> {
    components: [C; 4],
    layout: PhantomData<L>,
}

impl<C: Channel, L: Layout> Channels<C, L> {
    fn new(components: [C; 4]) -> Self {
        Self {
            components,
            layout: PhantomData,
        }
    }
}

impl<C: Channel, L: Layout> Pixel for Channels<C, L> {
    const SIZE: usize = C::SIZE * L::STORED.len();

    fn read(bytes: &[u8]) -> Self {
        let mut components = [C::ZERO; 4];
        for (i, c) in components.iter_mut().enumerate().take(L::STORED.len()) {
            *c = C::read(&bytes[i * C::SIZE..]);
        }
        Self::new(components)
    }

    fn write(&self, bytes: &mut [u8]) {
        for (i, c) in self.components.iter().enumerate().take(L::STORED.len()) {
            c.write(&mut bytes[i * C::SIZE..]);
        }
    }
}

impl<C: Channel, L: Layout> ToRgba<u8> for Channels<C, L> {
    fn to_rgba(&self) -> [u8; 4] {
        let mut rgba = [0u8, 0u8, 0u8, 255u8];
        for (channel, source) in rgba.iter_mut().zip(L::SOURCES) {
            if let Some(i) = source {
                *channel = self.components[i].to_unorm8();
            }
        }
        rgba
    }
}

impl<C: Channel, L: Layout> FromRgba<u8> for Channels<C, L> {
    fn from_rgba(rgba: [u8; 4]) -> Self {
        let mut components = [C::ZERO; 4];
        for (c, channel) in components.iter_mut().zip(L::STORED) {
            *c = C::from_unorm8(rgba[*channel]);
        }
        Self::new(components)
    }
}

impl<C: Channel, L: Layout> ToRgba<f32> for Channels<C, L> {
    fn to_rgba(&self) -> [f32; 4] {
        let mut rgba = [0.0, 0.0, 0.0, 1.0];
        for (channel, source) in rgba.iter_mut().zip(L::SOURCES) {
            if let Some(i) = source {
                *channel = self.components[i].to_f32();
            }
        }
        rgba
    }
}

impl<C: Channel, L: Layout> FromRgba<f32> for Channels<C, L> {
    fn from_rgba(rgba: [f32; 4]) -> Self {
        let mut components = [C::ZERO; 4];
        for (c, channel) in components.iter_mut().zip(L::STORED) {
            *c = C::from_f32(rgba[*channel]);
        }
        Self::new(components)
    }
}

pub type R8 = Channels<u8, R>;
pub type R8Snorm = Channels<i8, R>;
pub type Rg8 = Channels<u8, Rg>;
pub type Rg8Snorm = Channels<i8, Rg>;
pub type Rgb8 = Channels<u8, Rgb>;
pub type Bgr8 = Channels<u8, Bgr>;
pub type Rgba8 = Channels<u8, Rgba>;
pub type Rgba8Snorm = Channels<i8, Rgba>;
pub type Bgra8 = Channels<u8, Bgra>;
pub type L8 = Channels<u8, L>;
pub type L8A8 = Channels<u8, La>;
pub type A8 = Channels<u8, A>;
pub type L16 = Channels<u16, L>;
pub type R16 = Channels<u16, R>;
pub type R16Snorm = Channels<i16, R>;
pub type Rg16 = Channels<u16, Rg>;
pub type Rg16Snorm = Channels<i16, Rg>;
pub type Rgba16 = Channels<u16, Rgba>;
pub type Rgba16Snorm = Channels<i16, Rgba>;
pub type R16F = Channels<f16, R>;
pub type Rg16F = Channels<f16, Rg>;
pub type Rgba16F = Channels<f16, Rgba>;
pub type R32F = Channels<f32, R>;
pub type Rg32F = Channels<f32, Rg>;
pub type Rgb32F = Channels<f32, Rgb>;
pub type Rgba32F = Channels<f32, Rgba>;

/// Bit offsets and widths of each RGBA channel in a 16-bit packed pixel.
pub trait PackedLayout {
    /// `(shift, bits)` for R, G, B, A with `bits == 0` for missing channels.
    const FIELDS: [(u32, u32); 4];
}

/// A 16-bit little-endian pixel with sub-byte unorm channels.
pub struct Packed<L> {
    value: u16,
    layout: PhantomData<L>,
}

macro_rules! packed_layout {
    ($name:ident, $fields:expr) => {
        pub struct $name;

        impl PackedLayout for $name {
            const FIELDS: [(u32, u32); 4] = $fields;
        }
    };
}

// GL style layouts with red in the most significant bits.
packed_layout!(Rgba4Layout, [(12, 4), (8, 4), (4, 4), (0, 4)]);
packed_layout!(Rgba5551Layout, [(11, 5), (6, 5), (1, 5), (0, 1)]);
// DXGI style layouts with blue in the least significant bits.
packed_layout!(Bgra4Layout, [(8, 4), (4, 4), (0, 4), (12, 4)]);
packed_layout!(Rgb565Layout, [(11, 5), (5, 6), (0, 5), (0, 0)]);
packed_layout!(Bgra5551Layout, [(10, 5), (5, 5), (0, 5), (15, 1)]);

pub type Rgba4 = Packed<Rgba4Layout>;
pub type Bgra4 = Packed<Bgra4Layout>;
pub type Rgb565 = Packed<Rgb565Layout>;
pub type Rgba5551 = Packed<Rgba5551Layout>;
pub type Bgra5551 = Packed<Bgra5551Layout>;

impl<L: PackedLayout> Packed<L> {
    fn new(value: u16) -> Self {
        Self {
            value,
            layout: PhantomData,
        }
    }

    fn field(&self, (shift, bits): (u32, u32)) -> u16 {
        (self.value >> shift) & ((1 << bits) - 1)
    }
}

fn expand_unorm(x: u16, bits: u32) -> u8 {
    match bits {
        1 => unorm1_to_unorm8(x),
        4 => unorm4_to_unorm8(x),
        5 => unorm5_to_unorm8(x),
        6 => unorm6_to_unorm8(x),
        _ => x as u8,
    }
}

impl<L: PackedLayout> Pixel for Packed<L> {
    const SIZE: usize = 2;

    fn read(bytes: &[u8]) -> Self {
        Self::new(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn write(&self, bytes: &mut [u8]) {
        bytes[..2].copy_from_slice(&self.value.to_le_bytes());
    }
}

impl<L: PackedLayout> ToRgba<u8> for Packed<L> {
    fn to_rgba(&self) -> [u8; 4] {
        L::FIELDS.map(|(shift, bits)| {
            if bits == 0 {
                255u8
            } else {
                expand_unorm(self.field((shift, bits)), bits)
            }
        })
    }
}

impl<L: PackedLayout> FromRgba<u8> for Packed<L> {
    fn from_rgba(rgba: [u8; 4]) -> Self {
        let mut value = 0u16;
        for (channel, (shift, bits)) in rgba.into_iter().zip(L::FIELDS) {
            if bits > 0 {
                value |= unorm8_to_unorm(channel, bits) << shift;
            }
        }
        Self::new(value)
    }
}

impl<L: PackedLayout> ToRgba<f32> for Packed<L> {
    fn to_rgba(&self) -> [f32; 4] {
        L::FIELDS.map(|(shift, bits)| {
            if bits == 0 {
                1.0
            } else {
                self.field((shift, bits)) as f32 / ((1 << bits) - 1) as f32
            }
        })
    }
}

impl<L: PackedLayout> FromRgba<f32> for Packed<L> {
    fn from_rgba(rgba: [f32; 4]) -> Self {
        let mut value = 0u16;
        for (channel, (shift, bits)) in rgba.into_iter().zip(L::FIELDS) {
            if bits > 0 {
                value |= (float_to_unorm(channel, (1 << bits) - 1) as u16) << shift;
            }
        }
        Self::new(value)
    }
}

/// A 32-bit little-endian pixel decoded through floats.
pub trait FloatPacked: Sized {
    fn from_bits(bits: u32) -> Self;
    fn to_bits(&self) -> u32;
    fn to_rgba_f32(&self) -> [f32; 4];
    fn from_rgba_f32(rgba: [f32; 4]) -> Self;
}

macro_rules! float_packed_impl {
    ($($ty:ty),*) => {
        $(
            impl Pixel for $ty {
                const SIZE: usize = 4;

                fn read(bytes: &[u8]) -> Self {
                    Self::from_bits(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
                }

                fn write(&self, bytes: &mut [u8]) {
                    bytes[..4].copy_from_slice(&self.to_bits().to_le_bytes());
                }
            }

            impl ToRgba<f32> for $ty {
                fn to_rgba(&self) -> [f32; 4] {
                    self.to_rgba_f32()
                }
            }

            impl FromRgba<f32> for $ty {
                fn from_rgba(rgba: [f32; 4]) -> Self {
                    Self::from_rgba_f32(rgba)
                }
            }

            impl ToRgba<u8> for $ty {
                fn to_rgba(&self) -> [u8; 4] {
                    self.to_rgba_f32().map(float_to_unorm8)
                }
            }

            impl FromRgba<u8> for $ty {
                fn from_rgba(rgba: [u8; 4]) -> Self {
                    Self::from_rgba_f32(rgba.map(|u| u as f32 / 255.0))
                }
            }
        )*
    };
}

/// Unsigned float11 red and green and float10 blue.
pub struct Rg11b10F(u32);

/// Three 9-bit mantissas with a shared 5-bit exponent.
pub struct Rgb9e5(u32);

/// Radiance RGBE with 8-bit mantissas and a shared 8-bit exponent.
pub struct Rgbe8([u8; 4]);

/// 24-bit unorm depth with an 8-bit stencil in the high bits.
pub struct D24S8(u32);

float_packed_impl!(Rg11b10F, Rgb9e5, Rgbe8, D24S8);

impl FloatPacked for Rg11b10F {
    fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    fn to_bits(&self) -> u32 {
        self.0
    }

    fn to_rgba_f32(&self) -> [f32; 4] {
        [
            float11_to_float(self.0),
            float11_to_float(self.0 >> 11),
            float10_to_float(self.0 >> 22),
            1.0,
        ]
    }

    fn from_rgba_f32(rgba: [f32; 4]) -> Self {
        Self(
            float_to_float11(rgba[0])
                | float_to_float11(rgba[1]) << 11
                | float_to_float10(rgba[2]) << 22,
        )
    }
}

impl FloatPacked for Rgb9e5 {
    fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    fn to_bits(&self) -> u32 {
        self.0
    }

    fn to_rgba_f32(&self) -> [f32; 4] {
        let [r, g, b] = rgb9e5_to_float(self.0);
        [r, g, b, 1.0]
    }

    fn from_rgba_f32(rgba: [f32; 4]) -> Self {
        Self(float_to_rgb9e5([rgba[0], rgba[1], rgba[2]]))
    }
}

impl FloatPacked for Rgbe8 {
    fn from_bits(bits: u32) -> Self {
        Self(bits.to_le_bytes())
    }

    fn to_bits(&self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    fn to_rgba_f32(&self) -> [f32; 4] {
        let [r, g, b] = rgbe_to_float(self.0);
        [r, g, b, 1.0]
    }

    fn from_rgba_f32(rgba: [f32; 4]) -> Self {
        Self(float_to_rgbe([rgba[0], rgba[1], rgba[2]]))
    }
}

impl FloatPacked for D24S8 {
    fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    fn to_bits(&self) -> u32 {
        self.0
    }

    fn to_rgba_f32(&self) -> [f32; 4] {
        [
            unorm24_to_float(self.0),
            (self.0 >> 24) as f32 / 255.0,
            0.0,
            1.0,
        ]
    }

    fn from_rgba_f32(rgba: [f32; 4]) -> Self {
        Self(float_to_unorm24(rgba[0]) | (float_to_unorm8(rgba[1]) as u32) << 24)
    }
}

pub fn unpack_rgba8<P: Pixel + ToRgba<u8>>(src: &[u8], dst: &mut [u8], num_pixels: usize) {
    for (s, d) in src
        .chunks_exact(P::SIZE)
        .zip(dst.chunks_exact_mut(4))
        .take(num_pixels)
    {
        d.copy_from_slice(&P::read(s).to_rgba());
    }
}

pub fn pack_rgba8<P: Pixel + FromRgba<u8>>(src: &[u8], dst: &mut [u8], num_pixels: usize) {
    for (s, d) in src
        .chunks_exact(4)
        .zip(dst.chunks_exact_mut(P::SIZE))
        .take(num_pixels)
    {
        P::from_rgba([s[0], s[1], s[2], s[3]]).write(d);
    }
}

pub fn unpack_rgba32f<P: Pixel + ToRgba<f32>>(src: &[u8], dst: &mut [u8], num_pixels: usize) {
    for (s, d) in src
        .chunks_exact(P::SIZE)
        .zip(dst.chunks_exact_mut(16))
        .take(num_pixels)
    {
        write_rgba32f(d, P::read(s).to_rgba());
    }
}

pub fn pack_rgba32f<P: Pixel + FromRgba<f32>>(src: &[u8], dst: &mut [u8], num_pixels: usize) {
    for (s, d) in src
        .chunks_exact(16)
        .zip(dst.chunks_exact_mut(P::SIZE))
        .take(num_pixels)
    {
        P::from_rgba(read_rgba32f(s)).write(d);
    }
}

/// Reads a canonical RGBA32F pixel from 16 little-endian bytes.
pub fn read_rgba32f(bytes: &[u8]) -> [f32; 4] {
    [
        f32::read(&bytes[0..]),
        f32::read(&bytes[4..]),
        f32::read(&bytes[8..]),
        f32::read(&bytes[12..]),
    ]
}

pub fn write_rgba32f(bytes: &mut [u8], rgba: [f32; 4]) {
    for (i, c) in rgba.into_iter().enumerate() {
        c.write(&mut bytes[i * 4..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba8_from<P: Pixel + ToRgba<u8>>(data: &[u8]) -> Vec<u8> {
        let num_pixels = data.len() / P::SIZE;
        let mut rgba = vec![0u8; num_pixels * 4];
        unpack_rgba8::<P>(data, &mut rgba, num_pixels);
        rgba
    }

    fn from_rgba8<P: Pixel + FromRgba<u8>>(rgba: &[u8]) -> Vec<u8> {
        let num_pixels = rgba.len() / 4;
        let mut data = vec![0u8; num_pixels * P::SIZE];
        pack_rgba8::<P>(rgba, &mut data, num_pixels);
        data
    }

    fn rgbaf32_from<P: Pixel + ToRgba<f32>>(data: &[u8]) -> Vec<f32> {
        let num_pixels = data.len() / P::SIZE;
        let mut rgba = vec![0u8; num_pixels * 16];
        unpack_rgba32f::<P>(data, &mut rgba, num_pixels);
        rgba.chunks_exact(4).map(f32::read).collect()
    }

    #[test]
    fn rgba8_from_r8() {
        assert_eq!(vec![1, 0, 0, 255, 2, 0, 0, 255], rgba8_from::<R8>(&[1, 2]));
    }

    #[test]
    fn rgba8_from_l8a8() {
        assert_eq!(vec![7, 7, 7, 9], rgba8_from::<L8A8>(&[7, 9]));
    }

    #[test]
    fn rgba8_from_a8() {
        assert_eq!(vec![0, 0, 0, 9], rgba8_from::<A8>(&[9]));
    }

    #[test]
    fn rgba8_from_bgra8() {
        assert_eq!(vec![3, 2, 1, 4], rgba8_from::<Bgra8>(&[1, 2, 3, 4]));
    }

    #[test]
    fn bgr8_from_rgba8() {
        assert_eq!(vec![3, 2, 1], from_rgba8::<Bgr8>(&[1, 2, 3, 4]));
    }

    #[test]
    fn l8_from_rgba8() {
        assert_eq!(vec![1], from_rgba8::<L8>(&[1, 2, 3, 4]));
    }

    #[test]
    fn rgba8_from_rgba4() {
        // R in the high nibble.
        assert_eq!(vec![255, 136, 17, 0], rgba8_from::<Rgba4>(&[0x10, 0xF8]));
    }

    #[test]
    fn rgba8_from_bgra4() {
        // DXGI B4G4R4A4 with alpha in the high nibble.
        assert_eq!(vec![136, 17, 0, 255], rgba8_from::<Bgra4>(&[0x10, 0xF8]));
    }

    #[test]
    fn rgba8_from_rgb565() {
        assert_eq!(vec![255, 0, 0, 255], rgba8_from::<Rgb565>(&[0x00, 0xF8]));
        assert_eq!(vec![0, 255, 0, 255], rgba8_from::<Rgb565>(&[0xE0, 0x07]));
        assert_eq!(vec![0, 0, 255, 255], rgba8_from::<Rgb565>(&[0x1F, 0x00]));
    }

    #[test]
    fn rgba8_from_bgra5551() {
        assert_eq!(vec![0, 0, 0, 255], rgba8_from::<Bgra5551>(&[0x00, 0x80]));
        assert_eq!(vec![255, 0, 0, 0], rgba8_from::<Bgra5551>(&[0x00, 0x7C]));
    }

    #[test]
    fn rgb565_from_rgba8_truncates() {
        // 0xFF >> 3 and 0x07 >> 2
        assert_eq!(vec![0x21, 0xF8], from_rgba8::<Rgb565>(&[0xFF, 0x07, 0x0F, 0]));
    }

    #[test]
    fn rgbaf32_from_r8_snorm() {
        assert_eq!(
            vec![-1.0, 0.0, 0.0, 1.0, 0.5, 0.0, 0.0, 1.0],
            rgbaf32_from::<R8Snorm>(&[0x80, 64])
        );
    }

    #[test]
    fn rgbaf32_from_rgba16f() {
        let data: Vec<u8> = [1.0f32, 0.5, -2.0, 0.25]
            .into_iter()
            .flat_map(|f| f16::from_f32(f).to_le_bytes())
            .collect();
        assert_eq!(vec![1.0, 0.5, -2.0, 0.25], rgbaf32_from::<Rgba16F>(&data));
    }

    #[test]
    fn rgbaf32_from_d24s8() {
        let rgba = rgbaf32_from::<D24S8>(&0xFFFFFFFFu32.to_le_bytes());
        assert_eq!(vec![1.0, 1.0, 0.0, 1.0], rgba);
    }

    #[test]
    fn pack_zero_pixels() {
        let mut dst = [0u8; 0];
        pack_rgba8::<Rgba4>(&[], &mut dst, 0);
        unpack_rgba32f::<Rgb9e5>(&[], &mut dst, 0);
    }

    #[test]
    fn pack_rgba32f_clamps_unorm() {
        let mut src = [0u8; 16];
        write_rgba32f(&mut src, [2.0, -1.0, 0.5, 1.0]);
        let mut dst = [0u8; 4];
        pack_rgba32f::<Rgba8>(&src, &mut dst, 1);
        assert_eq!([255, 0, 128, 255], dst);
    }
}
