//! Predicate functions for testing instruction fields.
//!
//! This module defines the field tests used by encoding recipes and encoding table entries, and
//! the `InstPredicate` expression tree built from them.
//!
//! The predicates that operate on integer fields use `Into<i64>` as a shared trait bound. This
//! bound is implemented by all the native integer types as well as `Imm64`.

use crate::ir::{InstructionData, InstructionFormat, IntCC};
use core::fmt;

/// Check that `x` is the same as `y`.
pub fn is_equal<T: Eq + Copy, O: Into<T> + Copy>(x: T, y: O) -> bool {
    x == y.into()
}

/// Check that `x` can be represented as a `wd`-bit signed integer with `sc` low zero bits.
pub fn is_signed_int<T: Into<i64>>(x: T, wd: u8, sc: u8) -> bool {
    debug_assert!(sc < wd && wd <= 64);
    let s = x.into();
    s == (s >> sc << (64 - wd + sc) >> (64 - wd))
}

/// Check that `x` can be represented as a `wd`-bit unsigned integer with `sc` low zero bits.
pub fn is_unsigned_int<T: Into<i64>>(x: T, wd: u8, sc: u8) -> bool {
    debug_assert!(sc < wd && wd <= 64);
    let u = x.into() as u64;
    // Bit-mask of the permitted bits.
    let m = (u64::MAX >> (64 - wd)) & !((1 << sc) - 1);
    u == (u & m)
}

/// A predicate over the fields of an instruction.
///
/// Encoding table entries and recipes use these to decide if they can encode an instruction
/// with its actual operand values. Field tests on a field the instruction doesn't have are false.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InstPredicate {
    /// The `imm` field is a `width`-bit signed integer with `scale` low zero bits.
    IsSignedInt {
        /// Number of bits available.
        width: u8,
        /// Number of low bits that must be zero.
        scale: u8,
    },
    /// The `imm` field is a `width`-bit unsigned integer with `scale` low zero bits.
    IsUnsignedInt {
        /// Number of bits available.
        width: u8,
        /// Number of low bits that must be zero.
        scale: u8,
    },
    /// The `cond` field is equal to the given condition code.
    IsCond(IntCC),
    /// Both predicates hold.
    And(Box<InstPredicate>, Box<InstPredicate>),
    /// At least one of the predicates holds.
    Or(Box<InstPredicate>, Box<InstPredicate>),
    /// The predicate doesn't hold.
    Not(Box<InstPredicate>),
}

impl InstPredicate {
    /// The immediate fits in a signed field of `width` bits.
    pub fn signed_imm(width: u8) -> Self {
        InstPredicate::IsSignedInt { width, scale: 0 }
    }

    /// The immediate fits in an unsigned field of `width` bits.
    pub fn unsigned_imm(width: u8) -> Self {
        InstPredicate::IsUnsignedInt { width, scale: 0 }
    }

    /// The condition code is `cond`.
    pub fn cond(cond: IntCC) -> Self {
        InstPredicate::IsCond(cond)
    }

    /// Combine with `other` so that both must hold.
    pub fn and(self, other: Self) -> Self {
        InstPredicate::And(Box::new(self), Box::new(other))
    }

    /// Combine with `other` so that either may hold.
    pub fn or(self, other: Self) -> Self {
        InstPredicate::Or(Box::new(self), Box::new(other))
    }

    /// Negate this predicate.
    pub fn not(self) -> Self {
        InstPredicate::Not(Box::new(self))
    }

    /// Evaluate this predicate against the fields of `inst`.
    pub fn eval(&self, inst: &InstructionData) -> bool {
        match self {
            InstPredicate::IsSignedInt { width, scale } => inst
                .imm_value()
                .is_some_and(|imm| is_signed_int(imm, *width, *scale)),
            InstPredicate::IsUnsignedInt { width, scale } => inst
                .imm_value()
                .is_some_and(|imm| is_unsigned_int(imm, *width, *scale)),
            InstPredicate::IsCond(cc) => inst.cond_code().is_some_and(|c| is_equal(*cc, c)),
            InstPredicate::And(a, b) => a.eval(inst) && b.eval(inst),
            InstPredicate::Or(a, b) => a.eval(inst) || b.eval(inst),
            InstPredicate::Not(a) => !a.eval(inst),
        }
    }

    /// Does `format` have every field tested by this predicate?
    pub fn applies_to(&self, format: InstructionFormat) -> bool {
        match self {
            InstPredicate::IsSignedInt { .. } | InstPredicate::IsUnsignedInt { .. } => {
                format.has_imm()
            }
            InstPredicate::IsCond(_) => format.has_cond(),
            InstPredicate::And(a, b) | InstPredicate::Or(a, b) => {
                a.applies_to(format) && b.applies_to(format)
            }
            InstPredicate::Not(a) => a.applies_to(format),
        }
    }
}

impl fmt::Display for InstPredicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InstPredicate::IsSignedInt { width, scale: 0 } => write!(f, "imm:s{width}"),
            InstPredicate::IsSignedInt { width, scale } => write!(f, "imm:s{width}/{scale}"),
            InstPredicate::IsUnsignedInt { width, scale: 0 } => write!(f, "imm:u{width}"),
            InstPredicate::IsUnsignedInt { width, scale } => write!(f, "imm:u{width}/{scale}"),
            InstPredicate::IsCond(cc) => write!(f, "cond=={cc}"),
            InstPredicate::And(a, b) => write!(f, "({a} && {b})"),
            InstPredicate::Or(a, b) => write!(f, "({a} || {b})"),
            InstPredicate::Not(a) => write!(f, "!{a}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;
    use crate::ir::{Imm64, Opcode, Value};
    use proptest::prelude::*;

    #[test]
    fn cvt_u32() {
        let x1 = 0u32;
        let x2 = 1u32;
        let x3 = 0xffff_fff0u32;

        assert!(is_signed_int(x1, 1, 0));
        assert!(is_signed_int(x1, 2, 1));
        assert!(is_signed_int(x2, 2, 0));
        assert!(!is_signed_int(x2, 2, 1));

        // `u32` doesn't sign-extend when converted to `i64`.
        assert!(!is_signed_int(x3, 8, 0));

        assert!(is_unsigned_int(x1, 1, 0));
        assert!(is_unsigned_int(x1, 8, 4));
        assert!(is_unsigned_int(x2, 1, 0));
        assert!(!is_unsigned_int(x2, 8, 4));
        assert!(!is_unsigned_int(x3, 1, 0));
        assert!(is_unsigned_int(x3, 32, 4));
    }

    #[test]
    fn cvt_imm64() {
        let x1 = Imm64::new(-8);
        let x2 = Imm64::new(8);

        assert!(is_signed_int(x1, 16, 2));
        assert!(is_signed_int(x2, 16, 2));
        assert!(!is_signed_int(x1, 16, 4));
        assert!(!is_signed_int(x2, 16, 4));
    }

    #[test]
    fn signed_boundaries() {
        assert!(is_signed_int(32767, 16, 0));
        assert!(is_signed_int(-32768, 16, 0));
        assert!(!is_signed_int(32768, 16, 0));
        assert!(!is_signed_int(-32769, 16, 0));
        assert!(is_signed_int(i64::MIN, 64, 0));
        assert!(is_unsigned_int(-1, 64, 0));
        assert!(is_unsigned_int(0xffff, 16, 0));
        assert!(!is_unsigned_int(0x10000, 16, 0));
        assert!(!is_unsigned_int(-1, 16, 0));
    }

    proptest! {
        #[test]
        fn signed_range_matches_arithmetic(x in any::<i64>(), wd in 2u8..=63) {
            let lo = -(1i64 << (wd - 1));
            let hi = (1i64 << (wd - 1)) - 1;
            prop_assert_eq!(is_signed_int(x, wd, 0), lo <= x && x <= hi);
        }

        #[test]
        fn signed_range_accepts_every_16bit(x in -32768i64..=32767) {
            prop_assert!(is_signed_int(x, 16, 0));
        }
    }

    #[test]
    fn inst_predicates() {
        let v0 = Value::new(0);
        let cmp = |cond, imm| InstructionData::IntCompareImm {
            opcode: Opcode::IcmpImm,
            cond,
            arg: v0,
            imm: Imm64::new(imm),
        };

        let slt16 = InstPredicate::cond(IntCC::SignedLessThan).and(InstPredicate::signed_imm(16));
        assert!(slt16.eval(&cmp(IntCC::SignedLessThan, -4)));
        assert!(!slt16.eval(&cmp(IntCC::SignedLessThan, 40000)));
        assert!(!slt16.eval(&cmp(IntCC::Equal, -4)));
        assert_eq!(slt16.to_string(), "(cond==slt && imm:s16)");

        let either = InstPredicate::cond(IntCC::Equal).or(InstPredicate::cond(IntCC::NotEqual));
        assert!(either.eval(&cmp(IntCC::NotEqual, 0)));
        assert!(!either.eval(&cmp(IntCC::UnsignedLessThan, 0)));
        assert!(either.clone().not().eval(&cmp(IntCC::UnsignedLessThan, 0)));

        // Field tests on a missing field are false.
        let add = InstructionData::Binary {
            opcode: Opcode::Iadd,
            args: [v0, v0],
        };
        assert!(!InstPredicate::signed_imm(16).eval(&add));
        assert!(!InstPredicate::signed_imm(16).applies_to(add.format()));
        assert!(either.applies_to(InstructionFormat::BranchIcmp));
        assert!(!either.applies_to(InstructionFormat::BinaryImm));
    }
}
