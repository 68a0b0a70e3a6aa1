use lazy_static::lazy_static;

/// The nonlinear encoding of stored color values.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GammaSpace {
    #[default]
    Linear,
    Srgb,
    /// A pure power curve with an exponent of 2.2.
    Pow22,
}

lazy_static! {
    static ref SRGB_TO_LINEAR: [f32; 256] = table(srgb_to_linear);
    static ref POW22_TO_LINEAR: [f32; 256] = table(pow22_to_linear);
}

fn table(f: fn(f32) -> f32) -> [f32; 256] {
    let mut values = [0.0; 256];
    for (i, v) in values.iter_mut().enumerate() {
        *v = f(i as f32 / 255.0);
    }
    values
}

fn srgb_to_linear(x: f32) -> f32 {
    if x <= 0.04045 {
        x / 12.92
    } else {
        ((x + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(x: f32) -> f32 {
    if x <= 0.0031308 {
        x * 12.92
    } else {
        1.055 * x.powf(1.0 / 2.4) - 0.055
    }
}

fn pow22_to_linear(x: f32) -> f32 {
    x.powf(2.2)
}

fn linear_to_pow22(x: f32) -> f32 {
    x.powf(1.0 / 2.2)
}

impl GammaSpace {
    /// Decodes an 8-bit value in this space to a linear value in `[0, 1]`.
    pub fn to_linear_u8(self, x: u8) -> f32 {
        match self {
            GammaSpace::Linear => x as f32 / 255.0,
            GammaSpace::Srgb => SRGB_TO_LINEAR[x as usize],
            GammaSpace::Pow22 => POW22_TO_LINEAR[x as usize],
        }
    }

    /// Encodes a linear value to an 8-bit value in this space.
    pub fn from_linear_u8(self, x: f32) -> u8 {
        crate::rgba::float_to_unorm8(self.from_linear(x.clamp(0.0, 1.0)))
    }

    pub fn to_linear(self, x: f32) -> f32 {
        match self {
            GammaSpace::Linear => x,
            GammaSpace::Srgb => srgb_to_linear(x),
            GammaSpace::Pow22 => pow22_to_linear(x.max(0.0)),
        }
    }

    pub fn from_linear(self, x: f32) -> f32 {
        match self {
            GammaSpace::Linear => x,
            GammaSpace::Srgb => linear_to_srgb(x),
            GammaSpace::Pow22 => linear_to_pow22(x.max(0.0)),
        }
    }
}
