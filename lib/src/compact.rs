use crate::U256;

/// Outcome of decoding a compact-encoded target.
///
/// The three observations are independent; callers must inspect
/// `negative` and `overflow` before trusting `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandedBits {
    pub target: U256,
    /// The sign bit in the mantissa was set.
    pub negative: bool,
    /// The exponent would push the mantissa past 256 bits.
    pub overflow: bool,
}

/// Decodes the 4-byte compact form: one exponent byte followed by a
/// 3-byte mantissa whose top bit is the sign.
pub fn expand(bits: u32) -> ExpandedBits {
    let size = (bits >> 24) as usize;
    let mut word = bits & 0x007f_ffff;
    // For small exponents the mantissa shifts in place, and the flags
    // below observe the shifted value: a mantissa that shifts to zero
    // carries no sign.
    let target = if size <= 3 {
        word >>= 8 * (3 - size);
        U256::from(word)
    } else {
        U256::from(word) << (8 * (size - 3))
    };
    ExpandedBits {
        target,
        negative: word != 0 && bits & 0x0080_0000 != 0,
        overflow: word != 0
            && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32)),
    }
}

/// Encodes canonically: the smallest exponent whose 3-byte mantissa
/// still carries the value's top bits. The sign bit stays clear, so a
/// mantissa whose top bit would be set is shifted down a byte.
///
/// Values with more than 3 significant mantissa bytes lose their
/// low-order bytes here; that precision loss is part of the format.
pub fn compress(target: U256) -> u32 {
    let mut size = (target.bits() + 7) / 8;
    let mut compact = if size <= 3 {
        target.low_u64() << (8 * (3 - size))
    } else {
        (target >> (8 * (size - 3))).low_u64()
    };
    if compact & 0x0080_0000 != 0 {
        compact >>= 8;
        size += 1;
    }
    compact as u32 | (size as u32) << 24
}
