//! EAC blocks for ETC2 alpha and the R11 and RG11 channels.
use blockdec_rs::EAC_MODIFIERS;

/// The decoded range of an EAC block.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EacChannel {
    /// 8-bit alpha in `0..=255`.
    Alpha,
    /// 11-bit unsigned values in `0..=2047`.
    Unsigned11,
    /// 11-bit signed values in `-1023..=1023`.
    Signed11,
}

impl EacChannel {
    fn decode(self, base: i32, multiplier: i32, modifier: i32) -> i32 {
        match self {
            EacChannel::Alpha => (base + modifier * multiplier).clamp(0, 255),
            EacChannel::Unsigned11 => {
                (base * 8 + 4 + self.step(multiplier) * modifier).clamp(0, 2047)
            }
            EacChannel::Signed11 => {
                (base.max(-127) * 8 + self.step(multiplier) * modifier).clamp(-1023, 1023)
            }
        }
    }

    /// The decoded difference for each unit of a modifier.
    fn step(self, multiplier: i32) -> i32 {
        match self {
            EacChannel::Alpha => multiplier,
            // A multiplier of 0 uses the modifiers directly.
            _ if multiplier == 0 => 1,
            _ => multiplier * 8,
        }
    }

    fn scale(self) -> i32 {
        match self {
            EacChannel::Alpha => 1,
            _ => 8,
        }
    }

    fn bias(self) -> i32 {
        match self {
            EacChannel::Unsigned11 => 4,
            _ => 0,
        }
    }

    fn base_range(self) -> (i32, i32) {
        match self {
            EacChannel::Signed11 => (-127, 127),
            _ => (0, 255),
        }
    }

    fn min_multiplier(self) -> i32 {
        match self {
            EacChannel::Alpha => 1,
            _ => 0,
        }
    }
}

/// Encodes 16 row-major values in the decoded range of `channel`.
///
/// Higher `effort` searches more base values and multipliers.
pub fn compress_eac_block(values: &[i32; 16], channel: EacChannel, effort: u8) -> [u8; 8] {
    let min = values.iter().copied().min().unwrap_or(0);
    let max = values.iter().copied().max().unwrap_or(0);

    let radius = match effort {
        0..=39 => 0,
        40..=69 => 1,
        _ => 2,
    };

    let mut best: Option<(u32, [u8; 8])> = None;
    for (table, modifiers) in EAC_MODIFIERS.iter().enumerate() {
        let low = modifiers.iter().copied().min().unwrap_or(0);
        let high = modifiers.iter().copied().max().unwrap_or(0);

        // Scale the table to cover the value range.
        let spread = ((max - min) as f32 / ((high - low) * channel.scale()) as f32).round() as i32;
        let mut multipliers: Vec<i32> = (spread - 1 - radius..=spread + 1 + radius)
            .filter(|m| (channel.min_multiplier()..=15).contains(m))
            .collect();
        if channel.min_multiplier() == 0 && !multipliers.contains(&0) {
            multipliers.push(0);
        }

        for multiplier in multipliers {
            let step = channel.step(multiplier);
            let center = (min + max) as f32 / 2.0
                - channel.bias() as f32
                - (low + high) as f32 * step as f32 / 2.0;
            let start = (center / channel.scale() as f32).round() as i32;

            let (lowest, highest) = channel.base_range();
            for base in (start - radius..=start + radius).map(|b| b.clamp(lowest, highest)) {
                let (error, block) = encode(values, channel, base, multiplier, table);
                if best.map(|(e, _)| error < e).unwrap_or(true) {
                    best = Some((error, block));
                }
                if error == 0 {
                    return block;
                }
            }
        }
    }

    best.map(|(_, block)| block).unwrap_or_default()
}

fn encode(
    values: &[i32; 16],
    channel: EacChannel,
    base: i32,
    multiplier: i32,
    table: usize,
) -> (u32, [u8; 8]) {
    let mut indices = 0u64;
    let mut error = 0u32;
    for y in 0..4 {
        for x in 0..4 {
            let value = values[y * 4 + x];
            let (index, e) = EAC_MODIFIERS[table]
                .iter()
                .enumerate()
                .map(|(i, m)| {
                    let decoded = channel.decode(base, multiplier, *m);
                    (i as u64, (decoded - value).unsigned_abs().pow(2))
                })
                .min_by_key(|(_, e)| *e)
                .unwrap_or((0, 0));
            error += e;
            indices |= index << (45 - 3 * (x * 4 + y));
        }
    }

    let mut block = [0u8; 8];
    // Signed bases are stored in two's complement.
    block[0] = base as u8;
    block[1] = ((multiplier as u8) << 4) | table as u8;
    block[2..].copy_from_slice(&indices.to_be_bytes()[2..]);
    (error, block)
}
