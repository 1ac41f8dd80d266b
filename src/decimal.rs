use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::DecimalError;

/// Largest scale a `fixedDec(N)` type may declare.
pub const MAX_SCALE: u8 = 18;

const POW10: [i64; 19] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
    100_000_000_000,
    1_000_000_000_000,
    10_000_000_000_000,
    100_000_000_000_000,
    1_000_000_000_000_000,
    10_000_000_000_000_000,
    100_000_000_000_000_000,
    1_000_000_000_000_000_000,
];

/// A fixed-point decimal: `mantissa * 10^-scale`.
///
/// Equality and ordering are numeric, so `1.0` (mantissa 10, scale 1)
/// equals `1` (mantissa 1, scale 0).
#[derive(Debug, Clone, Copy)]
pub struct FixedDec {
    mantissa: i64,
    scale: u8,
}

impl FixedDec {
    pub fn new(mantissa: i64, scale: u8) -> Result<Self, DecimalError> {
        if scale > MAX_SCALE {
            return Err(DecimalError::ScaleTooLarge(scale as u32));
        }
        Ok(FixedDec { mantissa, scale })
    }

    pub fn from_int(value: i64) -> Self {
        FixedDec {
            mantissa: value,
            scale: 0,
        }
    }

    pub fn mantissa(&self) -> i64 {
        self.mantissa
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Express the same number with `scale` fractional digits.
    ///
    /// Raising the scale fails only on overflow. Lowering it fails unless
    /// the dropped digits are all zero; there is no rounding.
    pub fn rescale(&self, scale: u8) -> Result<FixedDec, DecimalError> {
        if scale > MAX_SCALE {
            return Err(DecimalError::ScaleTooLarge(scale as u32));
        }
        let mantissa = match scale.cmp(&self.scale) {
            Ordering::Equal => self.mantissa,
            Ordering::Greater => {
                let factor = POW10[(scale - self.scale) as usize];
                self.mantissa
                    .checked_mul(factor)
                    .ok_or(DecimalError::Overflow {
                        mantissa: self.mantissa,
                        from: self.scale,
                        to: scale,
                    })?
            }
            Ordering::Less => {
                let factor = POW10[(self.scale - scale) as usize];
                if self.mantissa % factor != 0 {
                    return Err(DecimalError::Inexact {
                        mantissa: self.mantissa,
                        from: self.scale,
                        to: scale,
                    });
                }
                self.mantissa / factor
            }
        };
        Ok(FixedDec { mantissa, scale })
    }

    /// Drop trailing fractional zeros.
    pub fn normalize(&self) -> FixedDec {
        let mut d = *self;
        while d.scale > 0 && d.mantissa % 10 == 0 {
            d.mantissa /= 10;
            d.scale -= 1;
        }
        d
    }

    fn aligned(&self, other: &FixedDec) -> (i128, i128) {
        let scale = self.scale.max(other.scale);
        let a = self.mantissa as i128 * POW10[(scale - self.scale) as usize] as i128;
        let b = other.mantissa as i128 * POW10[(scale - other.scale) as usize] as i128;
        (a, b)
    }
}

impl PartialEq for FixedDec {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = self.aligned(other);
        a == b
    }
}

impl Eq for FixedDec {}

impl PartialOrd for FixedDec {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FixedDec {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = self.aligned(other);
        a.cmp(&b)
    }
}

impl Hash for FixedDec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let n = self.normalize();
        n.mantissa.hash(state);
        n.scale.hash(state);
    }
}

impl fmt::Display for FixedDec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.mantissa);
        }
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let abs = self.mantissa.unsigned_abs();
        let factor = POW10[self.scale as usize] as u64;
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            abs / factor,
            abs % factor,
            width = self.scale as usize
        )
    }
}

impl FromStr for FixedDec {
    type Err = DecimalError;

    /// Parse `-12.345`; the scale is the number of fractional digits written.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = || DecimalError::Parse(s.to_string());
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(parse_err());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(parse_err());
        }
        if frac_part.len() > MAX_SCALE as usize {
            return Err(DecimalError::ScaleTooLarge(frac_part.len() as u32));
        }

        let mut mantissa: i64 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            let digit = (b - b'0') as i64;
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| if negative { m.checked_sub(digit) } else { m.checked_add(digit) })
                .ok_or_else(parse_err)?;
        }
        Ok(FixedDec {
            mantissa,
            scale: frac_part.len() as u8,
        })
    }
}

impl From<i64> for FixedDec {
    fn from(value: i64) -> Self {
        FixedDec::from_int(value)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for FixedDec {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for FixedDec {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(m: i64, s: u8) -> FixedDec {
        FixedDec::new(m, s).unwrap()
    }

    #[test]
    fn test_rescale_up_and_down() {
        let d = dec(100, 0).rescale(7).unwrap();
        assert_eq!((d.mantissa(), d.scale()), (1_000_000_000, 7));
        let back = d.rescale(0).unwrap();
        assert_eq!((back.mantissa(), back.scale()), (100, 0));
    }

    #[test]
    fn test_rescale_rejects_lossy_and_overflow() {
        assert!(matches!(dec(12345, 3).rescale(2), Err(DecimalError::Inexact { .. })));
        assert!(matches!(dec(i64::MAX, 0).rescale(1), Err(DecimalError::Overflow { .. })));
        assert!(matches!(dec(1, 0).rescale(19), Err(DecimalError::ScaleTooLarge(19))));
    }

    #[test]
    fn test_display() {
        assert_eq!(dec(12345, 2).to_string(), "123.45");
        assert_eq!(dec(-5, 3).to_string(), "-0.005");
        assert_eq!(dec(42, 0).to_string(), "42");
        assert_eq!(dec(i64::MIN, 18).to_string(), "-9.223372036854775808");
    }

    #[test]
    fn test_parse() {
        let d: FixedDec = "-12.340".parse().unwrap();
        assert_eq!((d.mantissa(), d.scale()), (-12340, 3));
        assert_eq!("7".parse::<FixedDec>().unwrap(), dec(7, 0));
        assert_eq!(".5".parse::<FixedDec>().unwrap(), dec(5, 1));
        assert!("1.2.3".parse::<FixedDec>().is_err());
        assert!("abc".parse::<FixedDec>().is_err());
        assert!("".parse::<FixedDec>().is_err());
    }

    #[test]
    fn test_numeric_equality_and_order() {
        assert_eq!(dec(10, 1), dec(1, 0));
        assert!(dec(15, 1) > dec(1, 0));
        assert!(dec(-1, 0) < dec(0, 5));

        use std::collections::HashSet;
        let set: HashSet<FixedDec> = [dec(100, 2), dec(1, 0)].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
