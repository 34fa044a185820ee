//! Integer value ranges tracked per variable path
//!
//! A [`ValueRange`] is an inclusive `i64` interval. Ranges are built from
//! literals, widened to the whole range of a type when nothing better is
//! known, and unioned when control flow merges.
//!
//! `unsigned long` and pointers are modelled as `0..=i64::MAX`; the top half
//! of the 64-bit unsigned space is folded into that bound.

use crate::parser::ast::{BaseType, Type};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueRange {
    min: i64,
    max: i64,
}

/// Bounds that print by name rather than by value
const NAMED_BOUNDS: &[(i64, &str)] = &[
    (i64::MIN, "s64min"),
    (i64::MAX, "s64max"),
    (i32::MIN as i64, "s32min"),
    (i32::MAX as i64, "s32max"),
    (u32::MAX as i64, "u32max"),
    (i16::MIN as i64, "s16min"),
    (i16::MAX as i64, "s16max"),
    (u16::MAX as i64, "u16max"),
];

impl ValueRange {
    /// `min` and `max` are swapped if given out of order
    pub fn new(min: i64, max: i64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn exact(value: i64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// `0-1`, the value of a comparison or logical operator
    pub fn boolean() -> Self {
        Self::new(0, 1)
    }

    /// Every value an object of type `ty` can hold
    pub fn whole(ty: &Type) -> Self {
        if ty.pointer_depth > 0 || ty.is_array() {
            return Self::new(0, i64::MAX);
        }
        match ty.base {
            BaseType::Char => Self::new(i8::MIN as i64, i8::MAX as i64),
            BaseType::UnsignedChar => Self::new(0, u8::MAX as i64),
            BaseType::Short => Self::new(i16::MIN as i64, i16::MAX as i64),
            BaseType::UnsignedShort => Self::new(0, u16::MAX as i64),
            BaseType::Int => Self::new(i32::MIN as i64, i32::MAX as i64),
            BaseType::UnsignedInt => Self::new(0, u32::MAX as i64),
            BaseType::UnsignedLong => Self::new(0, i64::MAX),
            BaseType::Long | BaseType::Void | BaseType::Struct(_) => Self::new(i64::MIN, i64::MAX),
        }
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn is_exact(&self) -> bool {
        self.min == self.max
    }

    pub fn as_exact(&self) -> Option<i64> {
        self.is_exact().then_some(self.min)
    }

    pub fn contains(&self, other: &ValueRange) -> bool {
        self.min <= other.min && other.max <= self.max
    }

    /// Smallest range covering both
    pub fn union(&self, other: &ValueRange) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn add(&self, other: &ValueRange) -> Option<Self> {
        Some(Self::new(
            self.min.checked_add(other.min)?,
            self.max.checked_add(other.max)?,
        ))
    }

    pub fn sub(&self, other: &ValueRange) -> Option<Self> {
        Some(Self::new(
            self.min.checked_sub(other.max)?,
            self.max.checked_sub(other.min)?,
        ))
    }

    pub fn mul(&self, other: &ValueRange) -> Option<Self> {
        let products = [
            self.min.checked_mul(other.min)?,
            self.min.checked_mul(other.max)?,
            self.max.checked_mul(other.min)?,
            self.max.checked_mul(other.max)?,
        ];
        let min = products.iter().copied().min()?;
        let max = products.iter().copied().max()?;
        Some(Self::new(min, max))
    }

    pub fn negate(&self) -> Option<Self> {
        Some(Self::new(self.max.checked_neg()?, self.min.checked_neg()?))
    }

    /// Range after conversion to `ty`: kept when it fits, else the whole
    /// range of `ty`
    pub fn cast_to(&self, ty: &Type) -> Self {
        let whole = Self::whole(ty);
        if whole.contains(self) {
            *self
        } else if let Some(value) = self.as_exact() {
            Self::exact(truncate(value, ty))
        } else {
            whole
        }
    }
}

/// Two's complement wrap of an exact value into an integer type
fn truncate(value: i64, ty: &Type) -> i64 {
    if ty.pointer_depth > 0 {
        return value;
    }
    match ty.base {
        BaseType::Char => value as i8 as i64,
        BaseType::UnsignedChar => value as u8 as i64,
        BaseType::Short => value as i16 as i64,
        BaseType::UnsignedShort => value as u16 as i64,
        BaseType::Int => value as i32 as i64,
        BaseType::UnsignedInt => value as u32 as i64,
        BaseType::UnsignedLong => value & i64::MAX,
        _ => value,
    }
}

fn fmt_bound(value: i64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some((_, name)) = NAMED_BOUNDS.iter().find(|(bound, _)| *bound == value) {
        write!(f, "{}", name)
    } else if value < 0 {
        write!(f, "({})", value)
    } else {
        write!(f, "{}", value)
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_bound(self.min, f)?;
        if !self.is_exact() {
            write!(f, "-")?;
            fmt_bound(self.max, f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> Type {
        Type::new(BaseType::Int)
    }

    #[test]
    fn test_display() {
        assert_eq!(ValueRange::exact(5).to_string(), "5");
        assert_eq!(ValueRange::exact(-3).to_string(), "(-3)");
        assert_eq!(ValueRange::new(-1, 9).to_string(), "(-1)-9");
        assert_eq!(ValueRange::whole(&int()).to_string(), "s32min-s32max");
        assert_eq!(
            ValueRange::whole(&Type::new(BaseType::UnsignedInt)).to_string(),
            "0-u32max"
        );
        assert_eq!(ValueRange::whole(&Type::new(BaseType::Char)).to_string(), "(-128)-127");
    }

    #[test]
    fn test_arithmetic() {
        let a = ValueRange::new(1, 3);
        let b = ValueRange::new(-2, 2);

        assert_eq!(a.add(&b), Some(ValueRange::new(-1, 5)));
        assert_eq!(a.sub(&b), Some(ValueRange::new(-1, 5)));
        assert_eq!(a.mul(&b), Some(ValueRange::new(-6, 6)));
        assert_eq!(ValueRange::exact(i64::MAX).add(&ValueRange::exact(1)), None);
        assert_eq!(ValueRange::exact(i64::MIN).negate(), None);
    }

    #[test]
    fn test_cast_to() {
        let char_type = Type::new(BaseType::Char);

        assert_eq!(ValueRange::exact(7).cast_to(&char_type), ValueRange::exact(7));
        assert_eq!(ValueRange::exact(300).cast_to(&char_type), ValueRange::exact(44));
        assert_eq!(
            ValueRange::new(0, 1000).cast_to(&char_type),
            ValueRange::whole(&char_type)
        );
    }

    #[test]
    fn test_union() {
        let merged = ValueRange::exact(1).union(&ValueRange::exact(9));
        assert_eq!(merged, ValueRange::new(1, 9));
        assert!(merged.contains(&ValueRange::exact(4)));
        assert!(!merged.is_exact());
    }
}
