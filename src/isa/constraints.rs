//! Operand constraints for encoding recipes.
//!
//! An encoding recipe specifies how an instruction is encoded as binary machine code, but it only
//! works if the operands and results satisfy certain constraints. Constraints on immediate
//! operands are checked by instruction predicates when the recipe is chosen.
//!
//! It is the register allocator's job to make sure that the register constraints on value operands
//! are satisfied.

use crate::binemit::CodeOffset;
use crate::isa::{RegClass, RegUnit};
use crate::predicates::{InstPredicate, is_signed_int, is_unsigned_int};
use crate::result::BuildError;
use core::fmt;

/// Register constraint for a single value operand or instruction result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperandConstraint {
    /// The kind of constraint.
    pub kind: ConstraintKind,

    /// The register class of the operand.
    ///
    /// This applies to all kinds of constraints, but with slightly different meaning.
    pub regclass: RegClass,
}

impl OperandConstraint {
    /// A register from `regclass`.
    pub fn reg(regclass: RegClass) -> Self {
        Self {
            kind: ConstraintKind::Reg,
            regclass,
        }
    }

    /// The fixed register `unit` in `regclass`.
    pub fn fixed(regclass: RegClass, unit: RegUnit) -> Self {
        Self {
            kind: ConstraintKind::FixedReg(unit),
            regclass,
        }
    }

    /// A stack slot holding a value normally kept in `regclass`.
    pub fn stack(regclass: RegClass) -> Self {
        Self {
            kind: ConstraintKind::Stack,
            regclass,
        }
    }

    /// Does a register operand in `regunit` satisfy this constraint?
    pub fn accepts_reg(&self, regunit: RegUnit) -> bool {
        match self.kind {
            ConstraintKind::Reg => self.regclass.contains(regunit),
            ConstraintKind::FixedReg(unit) => unit == regunit,
            ConstraintKind::Stack => false,
        }
    }
}

/// The different kinds of operand constraints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    /// This operand or result must be a register from the given register class.
    Reg,

    /// This operand or result must be a fixed register.
    ///
    /// The constraint's `regclass` field is the register class containing the fixed register.
    FixedReg(RegUnit),

    /// This operand must be a value in a stack slot.
    ///
    /// The constraint's `regclass` field is the register class that would normally be used to load
    /// and store values of this type.
    Stack,
}

/// How an immediate operand is interpreted by a recipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signedness {
    /// Two's complement.
    Signed,
    /// Zero-extended.
    Unsigned,
    /// Either interpretation; the bit pattern is what matters.
    Either,
}

/// Shape of the immediate field of a recipe.
///
/// A recipe for a format with an immediate must declare how many bits it can encode. An
/// immediate that doesn't fit makes the recipe unusable for the instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImmShape {
    /// Width of the field in bits.
    pub width: u8,
    /// Interpretation of the field.
    pub signedness: Signedness,
}

impl ImmShape {
    /// A signed field of `width` bits.
    pub const fn signed(width: u8) -> Self {
        Self {
            width,
            signedness: Signedness::Signed,
        }
    }

    /// An unsigned field of `width` bits.
    pub const fn unsigned(width: u8) -> Self {
        Self {
            width,
            signedness: Signedness::Unsigned,
        }
    }

    /// A field of `width` bits that holds signed or unsigned values.
    pub const fn either(width: u8) -> Self {
        Self {
            width,
            signedness: Signedness::Either,
        }
    }

    /// Can `imm` be encoded in this field?
    pub fn fits(&self, imm: i64) -> bool {
        match self.signedness {
            Signedness::Signed => is_signed_int(imm, self.width, 0),
            Signedness::Unsigned => is_unsigned_int(imm, self.width, 0),
            Signedness::Either => {
                is_signed_int(imm, self.width, 0) || is_unsigned_int(imm, self.width, 0)
            }
        }
    }

    /// The equivalent instruction predicate.
    pub fn predicate(&self) -> InstPredicate {
        match self.signedness {
            Signedness::Signed => InstPredicate::signed_imm(self.width),
            Signedness::Unsigned => InstPredicate::unsigned_imm(self.width),
            Signedness::Either => {
                InstPredicate::signed_imm(self.width).or(InstPredicate::unsigned_imm(self.width))
            }
        }
    }
}

impl fmt::Display for ImmShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let prefix = match self.signedness {
            Signedness::Signed => "s",
            Signedness::Unsigned => "u",
            Signedness::Either => "i",
        };
        write!(f, "{prefix}{}", self.width)
    }
}

/// Constraints on the range of a branch instruction.
///
/// A branch instruction usually encodes its destination as a signed n-bit offset from an origin.
/// The origin depends on the ISA and the specific instruction:
///
/// - RISC-V uses the address of the branch instruction, `origin = 0`.
/// - MIPS computes conditional branches relative to the delay slot, `origin = 4`.
///
/// The displacement is `dest - (branch + origin)` bytes. It must have `min_bits` low zero bits,
/// which are not encoded, and fit in a signed field of `max_bits` bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BranchRange {
    /// Offset in bytes from the address of the branch instruction to the origin used for computing
    /// the branch displacement.
    pub origin: u8,

    /// Number of low zero bits the displacement must have.
    pub min_bits: u8,

    /// Width in bits of the signed displacement, including the `min_bits` implied zero bits.
    pub max_bits: u8,
}

impl BranchRange {
    /// Describe a branch range, checking that `min_bits < max_bits <= 64`.
    ///
    /// Equal widths leave no encoded bit, and `is_signed_int` requires `sc < wd` for the range
    /// check, so they are rejected too.
    pub fn new(origin: u8, min_bits: u8, max_bits: u8) -> Result<Self, BuildError> {
        if min_bits >= max_bits || max_bits > 64 {
            return Err(BuildError::BadBranchRange { min_bits, max_bits });
        }
        Ok(Self {
            origin,
            min_bits,
            max_bits,
        })
    }

    /// The displacement from a branch at `branch` to `dest`, in bytes.
    pub fn displacement(self, branch: CodeOffset, dest: CodeOffset) -> i64 {
        i64::from(dest) - i64::from(branch) - i64::from(self.origin)
    }

    /// Determine if this branch range can represent the range from `branch` to `dest`, where
    /// `branch` is the code offset of the branch instruction itself.
    pub fn contains(self, branch: CodeOffset, dest: CodeOffset) -> bool {
        is_signed_int(self.displacement(branch, dest), self.max_bits, self.min_bits)
    }
}
