//! Expression types and the C arithmetic conversion rules.
//!
//! Every expression token gets a [`ValueType`] during tokenization: leaves
//! from their declarations or literal forms, operators by the usual
//! promotion and conversion rules. Widths come from the configured
//! [`Platform`].

use std::fmt;

use num_bigint::BigInt;
use num_traits::One;

use crate::{platform::Platform, symbols::TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Signed,
    Unsigned,
    Unknown,
}

/// Fundamental type categories, ordered by integer conversion rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BaseType {
    Unknown,
    Void,
    Bool,
    Char,
    Short,
    Int,
    Long,
    LongLong,
    Float,
    Double,
    LongDouble,
    /// A user-defined class/struct/union/enum.
    Record(TypeId),
}

/// The resolved type of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueType {
    pub sign: Sign,
    pub base: BaseType,
    /// Levels of pointer indirection.
    pub pointer: u8,
    pub is_const: bool,
    pub reference: bool,
}

impl ValueType {
    #[must_use]
    pub fn new(sign: Sign, base: BaseType) -> Self {
        Self {
            sign,
            base,
            pointer: 0,
            is_const: false,
            reference: false,
        }
    }

    #[must_use]
    pub fn signed_int() -> Self {
        Self::new(Sign::Signed, BaseType::Int)
    }

    #[must_use]
    pub fn unsigned_int() -> Self {
        Self::new(Sign::Unsigned, BaseType::Int)
    }

    #[must_use]
    pub fn bool_type() -> Self {
        Self::new(Sign::Unknown, BaseType::Bool)
    }

    #[must_use]
    pub fn double_type() -> Self {
        Self::new(Sign::Signed, BaseType::Double)
    }

    #[must_use]
    pub fn pointer_to(mut self) -> Self {
        self.pointer = self.pointer.saturating_add(1);
        self
    }

    #[must_use]
    pub fn is_pointer(&self) -> bool {
        self.pointer > 0
    }

    #[must_use]
    pub fn is_integral(&self) -> bool {
        !self.is_pointer()
            && matches!(
                self.base,
                BaseType::Bool | BaseType::Char | BaseType::Short | BaseType::Int | BaseType::Long | BaseType::LongLong
            )
    }

    #[must_use]
    pub fn is_floating(&self) -> bool {
        !self.is_pointer() && matches!(self.base, BaseType::Float | BaseType::Double | BaseType::LongDouble)
    }

    #[must_use]
    pub fn is_bool(&self) -> bool {
        !self.is_pointer() && self.base == BaseType::Bool
    }

    #[must_use]
    pub fn is_arithmetic(&self) -> bool {
        self.is_integral() || self.is_floating()
    }

    /// Storage size in bytes on the given platform. `None` for records and
    /// unknown types.
    #[must_use]
    pub fn sizeof_bytes(&self, platform: &Platform) -> Option<u64> {
        if self.is_pointer() {
            return Some(u64::from(platform.sizeof_pointer));
        }
        let bytes = match self.base {
            BaseType::Bool | BaseType::Char => 1,
            BaseType::Short => platform.sizeof_short,
            BaseType::Int => platform.sizeof_int,
            BaseType::Long => platform.sizeof_long,
            BaseType::LongLong => platform.sizeof_long_long,
            BaseType::Float => 4,
            BaseType::Double => 8,
            BaseType::LongDouble => 16,
            BaseType::Void | BaseType::Record(_) | BaseType::Unknown => return None,
        };
        Some(u64::from(bytes))
    }

    /// Width in bits, for shift and overflow checks.
    #[must_use]
    pub fn bits(&self, platform: &Platform) -> Option<u32> {
        self.sizeof_bytes(platform).map(|b| u32::try_from(b * 8).unwrap_or(u32::MAX))
    }

    /// Effective signedness, resolving plain `char` per the platform.
    #[must_use]
    pub fn effective_sign(&self, platform: &Platform) -> Sign {
        match self.sign {
            Sign::Unknown if self.base == BaseType::Char => {
                if platform.char_is_signed {
                    Sign::Signed
                } else {
                    Sign::Unsigned
                }
            }
            Sign::Unknown if self.is_integral() => Sign::Signed,
            s => s,
        }
    }

    /// Largest representable value for integral types.
    #[must_use]
    pub fn max_value(&self, platform: &Platform) -> Option<BigInt> {
        if !self.is_integral() {
            return None;
        }
        let bits = self.bits(platform)?;
        if self.base == BaseType::Bool {
            return Some(BigInt::one());
        }
        let value_bits = match self.effective_sign(platform) {
            Sign::Unsigned => bits,
            _ => bits - 1,
        };
        Some((BigInt::one() << value_bits) - 1)
    }

    /// Smallest representable value for integral types.
    #[must_use]
    pub fn min_value(&self, platform: &Platform) -> Option<BigInt> {
        if !self.is_integral() {
            return None;
        }
        let bits = self.bits(platform)?;
        match self.effective_sign(platform) {
            Sign::Unsigned => Some(BigInt::from(0)),
            _ if self.base == BaseType::Bool => Some(BigInt::from(0)),
            _ => Some(-(BigInt::one() << (bits - 1))),
        }
    }

    /// Integer promotion: integral types with rank below `int` promote to
    /// `signed int`.
    #[must_use]
    pub fn promoted(&self) -> Self {
        if self.is_integral() && self.base < BaseType::Int {
            return Self::signed_int();
        }
        *self
    }

    /// Usual arithmetic conversions for a binary operator, including the
    /// pointer arithmetic rules: `ptr + int → ptr`, `ptr - ptr → ptrdiff`.
    #[must_use]
    pub fn common_type(a: &Self, b: &Self, platform: &Platform) -> Self {
        if a.is_pointer() && b.is_pointer() {
            // ptr - ptr → ptrdiff_t.
            let base = if platform.sizeof_pointer == platform.sizeof_long { BaseType::Long } else { BaseType::LongLong };
            return Self::new(Sign::Signed, base);
        }
        if a.is_pointer() {
            return Self {
                reference: false,
                ..*a
            };
        }
        if b.is_pointer() {
            return Self {
                reference: false,
                ..*b
            };
        }
        if a.is_floating() || b.is_floating() {
            let base = a.base.max(b.base).max(BaseType::Float);
            return Self::new(Sign::Signed, base);
        }
        let pa = a.promoted();
        let pb = b.promoted();
        let base = pa.base.max(pb.base);
        let sign = if pa.effective_sign(platform) == Sign::Unsigned || pb.effective_sign(platform) == Sign::Unsigned {
            // The unsigned operand wins when ranks are equal; a higher-rank
            // signed type that can represent the whole unsigned range wins
            // otherwise. Equal storage widths keep unsigned.
            let higher = if pa.base >= pb.base { &pa } else { &pb };
            let lower = if pa.base >= pb.base { &pb } else { &pa };
            if higher.effective_sign(platform) == Sign::Unsigned {
                Sign::Unsigned
            } else if higher.bits(platform) > lower.bits(platform) {
                Sign::Signed
            } else {
                Sign::Unsigned
            }
        } else {
            Sign::Signed
        };
        Self::new(sign, base)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            write!(f, "const ")?;
        }
        match self.sign {
            Sign::Unsigned => write!(f, "unsigned ")?,
            Sign::Signed if matches!(self.base, BaseType::Char) => write!(f, "signed ")?,
            _ => {}
        }
        let base = match self.base {
            BaseType::Unknown => "?",
            BaseType::Void => "void",
            BaseType::Bool => "bool",
            BaseType::Char => "char",
            BaseType::Short => "short",
            BaseType::Int => "int",
            BaseType::Long => "long",
            BaseType::LongLong => "long long",
            BaseType::Float => "float",
            BaseType::Double => "double",
            BaseType::LongDouble => "long double",
            BaseType::Record(_) => "record",
        };
        write!(f, "{base}")?;
        for _ in 0..self.pointer {
            write!(f, " *")?;
        }
        if self.reference {
            write!(f, " &")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_and_common_type() {
        let platform = Platform::unix64();
        let c = ValueType::new(Sign::Unknown, BaseType::Char);
        assert_eq!(c.promoted(), ValueType::signed_int());

        let u = ValueType::unsigned_int();
        let i = ValueType::signed_int();
        assert_eq!(ValueType::common_type(&u, &i, &platform).sign, Sign::Unsigned);

        let l = ValueType::new(Sign::Signed, BaseType::Long);
        assert_eq!(ValueType::common_type(&u, &l, &platform).sign, Sign::Signed);
    }

    #[test]
    fn pointer_arithmetic() {
        let platform = Platform::unix64();
        let p = ValueType::signed_int().pointer_to();
        let i = ValueType::signed_int();
        assert!(ValueType::common_type(&p, &i, &platform).is_pointer());
        let diff = ValueType::common_type(&p, &p, &platform);
        assert!(!diff.is_pointer());
        assert_eq!(diff.base, BaseType::Long);
    }

    #[test]
    fn ranges() {
        let platform = Platform::unix64();
        let i = ValueType::signed_int();
        assert_eq!(i.max_value(&platform).unwrap(), BigInt::from(i32::MAX));
        assert_eq!(i.min_value(&platform).unwrap(), BigInt::from(i32::MIN));
        let u = ValueType::unsigned_int();
        assert_eq!(u.max_value(&platform).unwrap(), BigInt::from(u32::MAX));
    }
}
