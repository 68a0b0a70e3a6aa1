//! Per channel access for formats with byte aligned `u8`, `f16`, or `f32` channels.
use half::f16;

use crate::{rgba::float_to_unorm8, ElementType, Format, GammaSpace};

/// Reads and writes individual channels as `f32`.
///
/// `u8` channels are normalized to `0.0` to `1.0`.
/// Color channels of `u8` formats are decoded to linear when `gamma` is not linear.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Texels {
    element: ElementType,
    components: usize,
    alpha: Option<usize>,
    gamma: GammaSpace,
}

impl Texels {
    pub fn new(format: Format, gamma: GammaSpace) -> Option<Self> {
        let element = format.element_type()?;
        let element_size = match element {
            ElementType::U8 => 1,
            ElementType::F16 => 2,
            ElementType::F32 => 4,
        };
        Some(Self {
            element,
            components: format.info().size as usize / element_size,
            alpha: format.alpha_component(),
            gamma: match element {
                ElementType::U8 => gamma,
                _ => GammaSpace::Linear,
            },
        })
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn pixel_size(&self) -> usize {
        match self.element {
            ElementType::U8 => self.components,
            ElementType::F16 => self.components * 2,
            ElementType::F32 => self.components * 4,
        }
    }

    /// Reads the channels of `pixel` into the first [Texels::components] values of `out`.
    pub fn read(&self, data: &[u8], pixel: usize, out: &mut [f32]) {
        let start = pixel * self.pixel_size();
        for (c, value) in out.iter_mut().enumerate().take(self.components) {
            *value = match self.element {
                ElementType::U8 => {
                    let x = data[start + c];
                    if self.is_color(c) {
                        self.gamma.to_linear_u8(x)
                    } else {
                        x as f32 / 255.0
                    }
                }
                ElementType::F16 => {
                    let i = start + c * 2;
                    f16::from_le_bytes([data[i], data[i + 1]]).to_f32()
                }
                ElementType::F32 => {
                    let i = start + c * 4;
                    f32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]])
                }
            };
        }
    }

    /// Writes the first [Texels::components] values clamped to the range of the channel type.
    pub fn write(&self, data: &mut [u8], pixel: usize, values: &[f32]) {
        let start = pixel * self.pixel_size();
        for (c, value) in values.iter().enumerate().take(self.components) {
            match self.element {
                ElementType::U8 => {
                    data[start + c] = if self.is_color(c) {
                        self.gamma.from_linear_u8(*value)
                    } else {
                        float_to_unorm8(*value)
                    };
                }
                ElementType::F16 => {
                    let i = start + c * 2;
                    let value = value.clamp(f16::MIN.to_f32(), f16::MAX.to_f32());
                    data[i..i + 2].copy_from_slice(&f16::from_f32(value).to_le_bytes());
                }
                ElementType::F32 => {
                    let i = start + c * 4;
                    data[i..i + 4].copy_from_slice(&value.to_le_bytes());
                }
            }
        }
    }

    fn is_color(&self, component: usize) -> bool {
        self.gamma != GammaSpace::Linear && self.alpha != Some(component)
    }
}
