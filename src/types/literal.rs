use super::primitive::Primitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralError {
    /// Not a valid digit sequence for its radix.
    Malformed,
    /// Outside the 128-bit signed range.
    TooLarge,
}

/// A parsed integer literal: magnitude and sign, before any width is picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerLiteral {
    pub magnitude: u128,
    pub negative: bool,
}

/// Width picked for an integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralWidth {
    pub primary: Primitive,
    /// Smallest signed type that also holds a non-negative literal.
    pub secondary: Option<Primitive>,
}

impl IntegerLiteral {
    /// Parse decimal, `0x` hex or `0b` binary digits. Underscores are
    /// separators.
    pub fn parse(digits: &str, negative: bool) -> Result<Self, LiteralError> {
        let (radix, body) = if let Some(rest) = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
        {
            (16, rest)
        } else if let Some(rest) = digits
            .strip_prefix("0b")
            .or_else(|| digits.strip_prefix("0B"))
        {
            (2, rest)
        } else {
            (10, digits)
        };

        let mut magnitude: u128 = 0;
        let mut seen_digit = false;
        for c in body.chars() {
            if c == '_' {
                continue;
            }
            let d = c.to_digit(radix).ok_or(LiteralError::Malformed)?;
            magnitude = magnitude
                .checked_mul(radix as u128)
                .and_then(|m| m.checked_add(d as u128))
                .ok_or(LiteralError::TooLarge)?;
            seen_digit = true;
        }
        if !seen_digit {
            return Err(LiteralError::Malformed);
        }

        let limit = if negative {
            1u128 << 127
        } else {
            i128::MAX as u128
        };
        if magnitude > limit {
            return Err(LiteralError::TooLarge);
        }

        Ok(Self {
            magnitude,
            negative: negative && magnitude != 0,
        })
    }

    /// Smallest type holding the literal; see [`LiteralWidth`].
    pub fn width(&self) -> LiteralWidth {
        if self.negative {
            let primary = Primitive::SIGNED
                .into_iter()
                .find(|p| self.magnitude <= 1u128 << (bits(*p) - 1))
                .unwrap_or(Primitive::I128);
            return LiteralWidth {
                primary,
                secondary: None,
            };
        }

        let primary = Primitive::UNSIGNED
            .into_iter()
            .find(|p| self.magnitude <= max_unsigned(*p))
            .unwrap_or(Primitive::U128);
        let secondary = Primitive::SIGNED
            .into_iter()
            .find(|p| self.magnitude < 1u128 << (bits(*p) - 1));

        LiteralWidth { primary, secondary }
    }

    /// Two's complement little-endian bytes of the literal at `primitive`'s
    /// width.
    pub fn to_le_bytes(&self, primitive: Primitive) -> Vec<u8> {
        let value = if self.negative {
            (self.magnitude as i128).wrapping_neg()
        } else {
            self.magnitude as i128
        };
        value.to_le_bytes()[..primitive.size() as usize].to_vec()
    }
}

fn bits(p: Primitive) -> u32 {
    p.size() as u32 * 8
}

fn max_unsigned(p: Primitive) -> u128 {
    if bits(p) == 128 {
        u128::MAX
    } else {
        (1u128 << bits(p)) - 1
    }
}

/// A float literal typed at the narrowest float width that holds it exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatLiteral {
    pub value: f64,
    pub primitive: Primitive,
}

impl FloatLiteral {
    pub fn parse(text: &str, negative: bool) -> Result<Self, LiteralError> {
        let cleaned: String = text.chars().filter(|c| *c != '_').collect();
        let value: f64 = cleaned.parse().map_err(|_| LiteralError::Malformed)?;
        if !value.is_finite() {
            return Err(LiteralError::TooLarge);
        }
        let value = if negative { -value } else { value };

        let as_f32 = value as f32;
        let primitive = if f32_from_f16_bits(f16_bits_from_f32(as_f32)) as f64 == value {
            Primitive::F16
        } else if as_f32 as f64 == value {
            Primitive::F32
        } else {
            Primitive::F64
        };

        Ok(Self { value, primitive })
    }
}

/// A char literal must be exactly one UTF-16 code unit.
pub fn parse_char(text: &str) -> Result<u16, LiteralError> {
    let mut chars = text.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return Err(LiteralError::Malformed);
    };
    let mut units = [0u16; 2];
    match c.encode_utf16(&mut units) {
        [unit] => Ok(*unit),
        _ => Err(LiteralError::Malformed),
    }
}

/// IEEE 754 binary16 bits for an f32. Subnormal results flush to zero.
pub fn f16_bits_from_f32(f: f32) -> u16 {
    let bits = f.to_bits();
    let sign = (bits >> 16) & 0x8000;
    let exp = (bits >> 23) & 0xFF;
    let mant = bits & 0x7F_FFFF;

    if exp == 0xFF {
        return (sign | 0x7C00 | if mant != 0 { 0x200 } else { 0 }) as u16;
    }
    if exp == 0 && mant == 0 {
        return sign as u16;
    }
    let exp16 = exp as i32 - 127 + 15;
    if exp16 >= 31 {
        return (sign | 0x7C00) as u16;
    }
    if exp16 <= 0 {
        return sign as u16;
    }
    (sign | ((exp16 as u32) << 10) | (mant >> 13)) as u16
}

pub fn f32_from_f16_bits(bits: u16) -> f32 {
    let sign = ((bits & 0x8000) as u32) << 16;
    let exp = (bits >> 10) & 0x1F;
    let mant = (bits & 0x03FF) as u32;

    let out = if exp == 0 {
        if mant == 0 {
            sign
        } else {
            let mut e: i32 = -14;
            let mut m = mant;
            while m & 0x0400 == 0 {
                m <<= 1;
                e -= 1;
            }
            m &= 0x03FF;
            sign | (((e + 127) as u32) << 23) | (m << 13)
        }
    } else if exp == 0x1F {
        sign | 0x7F80_0000 | (mant << 13)
    } else {
        sign | (((exp as i32 - 15 + 127) as u32) << 23) | (mant << 13)
    };
    f32::from_bits(out)
}
