//! Instruction formats and opcodes.
//!
//! The `instructions` module contains definitions for instruction formats, opcodes, and the
//! in-memory representation of IR instructions.
//!
//! Only the subset of instructions that the MIPS encoding tables care about is modeled here.

use core::fmt::{self, Display, Formatter};
use core::str::FromStr;
use smallvec::SmallVec;
#[cfg(feature = "enable-serde")]
use serde_derive::{Deserialize, Serialize};

use crate::ir::condcodes::IntCC;
use crate::ir::entities::{Block, Value};
use crate::ir::immediates::Imm64;

/// An instruction format.
///
/// Every opcode has a corresponding instruction format which determines the operands it takes.
/// Encoding recipes are defined against a format.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum InstructionFormat {
    /// No operands.
    Nullary,
    /// One value operand.
    Unary,
    /// One immediate operand.
    UnaryImm,
    /// Two value operands.
    Binary,
    /// One value operand and one immediate.
    BinaryImm,
    /// A condition code and two value operands.
    IntCompare,
    /// A condition code, one value operand, and one immediate.
    IntCompareImm,
    /// One value operand and a destination block.
    Branch,
    /// A condition code, two value operands, and a destination block.
    BranchIcmp,
    /// A destination block.
    Jump,
    /// A variable number of value operands.
    MultiAry,
}

impl InstructionFormat {
    /// Number of fixed value operands in this format.
    ///
    /// Formats with a value list have none.
    pub fn num_value_operands(self) -> usize {
        use self::InstructionFormat::*;
        match self {
            Nullary | UnaryImm | Jump | MultiAry => 0,
            Unary | BinaryImm | IntCompareImm | Branch => 1,
            Binary | IntCompare | BranchIcmp => 2,
        }
    }

    /// Does this format carry a variable-length list of value operands?
    pub fn has_value_list(self) -> bool {
        self == InstructionFormat::MultiAry
    }

    /// Does this format have an `imm` field?
    pub fn has_imm(self) -> bool {
        use self::InstructionFormat::*;
        matches!(self, UnaryImm | BinaryImm | IntCompareImm)
    }

    /// Does this format have a `cond` field?
    pub fn has_cond(self) -> bool {
        use self::InstructionFormat::*;
        matches!(self, IntCompare | IntCompareImm | BranchIcmp)
    }

    /// Does this format have a destination block?
    pub fn is_branch(self) -> bool {
        use self::InstructionFormat::*;
        matches!(self, Branch | BranchIcmp | Jump)
    }
}

impl Display for InstructionFormat {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An instruction opcode.
///
/// All instructions have an opcode which determines the instruction format and the semantics.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub enum Opcode {
    /// `nop`.
    Nop,
    /// `jump block`.
    Jump,
    /// `brz x, block`.
    Brz,
    /// `brnz x, block`.
    Brnz,
    /// `br_icmp cond, x, y, block`.
    BrIcmp,
    /// `return args`.
    Return,
    /// `a = iconst N`.
    Iconst,
    /// `a = copy x`.
    Copy,
    /// `a = spill x`.
    Spill,
    /// `a = fill x`.
    Fill,
    /// `a = iadd x, y`.
    Iadd,
    /// `a = isub x, y`.
    Isub,
    /// `a = imul x, y`.
    Imul,
    /// `a = band x, y`.
    Band,
    /// `a = bor x, y`.
    Bor,
    /// `a = bxor x, y`.
    Bxor,
    /// `a = ishl x, y`.
    Ishl,
    /// `a = ushr x, y`.
    Ushr,
    /// `a = sshr x, y`.
    Sshr,
    /// `a = iadd_imm x, N`.
    IaddImm,
    /// `a = band_imm x, N`.
    BandImm,
    /// `a = bor_imm x, N`.
    BorImm,
    /// `a = bxor_imm x, N`.
    BxorImm,
    /// `a = ishl_imm x, N`.
    IshlImm,
    /// `a = ushr_imm x, N`.
    UshrImm,
    /// `a = sshr_imm x, N`.
    SshrImm,
    /// `a = icmp cond, x, y`.
    Icmp,
    /// `a = icmp_imm cond, x, N`.
    IcmpImm,
}

const OPCODE_NAMES: [(Opcode, &str); 28] = [
    (Opcode::Nop, "nop"),
    (Opcode::Jump, "jump"),
    (Opcode::Brz, "brz"),
    (Opcode::Brnz, "brnz"),
    (Opcode::BrIcmp, "br_icmp"),
    (Opcode::Return, "return"),
    (Opcode::Iconst, "iconst"),
    (Opcode::Copy, "copy"),
    (Opcode::Spill, "spill"),
    (Opcode::Fill, "fill"),
    (Opcode::Iadd, "iadd"),
    (Opcode::Isub, "isub"),
    (Opcode::Imul, "imul"),
    (Opcode::Band, "band"),
    (Opcode::Bor, "bor"),
    (Opcode::Bxor, "bxor"),
    (Opcode::Ishl, "ishl"),
    (Opcode::Ushr, "ushr"),
    (Opcode::Sshr, "sshr"),
    (Opcode::IaddImm, "iadd_imm"),
    (Opcode::BandImm, "band_imm"),
    (Opcode::BorImm, "bor_imm"),
    (Opcode::BxorImm, "bxor_imm"),
    (Opcode::IshlImm, "ishl_imm"),
    (Opcode::UshrImm, "ushr_imm"),
    (Opcode::SshrImm, "sshr_imm"),
    (Opcode::Icmp, "icmp"),
    (Opcode::IcmpImm, "icmp_imm"),
];

impl Opcode {
    /// Get the instruction format for this opcode.
    pub fn format(self) -> InstructionFormat {
        use self::Opcode::*;
        match self {
            Nop => InstructionFormat::Nullary,
            Jump => InstructionFormat::Jump,
            Brz | Brnz => InstructionFormat::Branch,
            BrIcmp => InstructionFormat::BranchIcmp,
            Return => InstructionFormat::MultiAry,
            Iconst => InstructionFormat::UnaryImm,
            Copy | Spill | Fill => InstructionFormat::Unary,
            Iadd | Isub | Imul | Band | Bor | Bxor | Ishl | Ushr | Sshr => {
                InstructionFormat::Binary
            }
            IaddImm | BandImm | BorImm | BxorImm | IshlImm | UshrImm | SshrImm => {
                InstructionFormat::BinaryImm
            }
            Icmp => InstructionFormat::IntCompare,
            IcmpImm => InstructionFormat::IntCompareImm,
        }
    }

    /// Get the number of results produced by this opcode.
    pub fn num_results(self) -> usize {
        use self::Opcode::*;
        match self {
            Nop | Jump | Brz | Brnz | BrIcmp | Return => 0,
            _ => 1,
        }
    }

    /// Is this instruction polymorphic?
    ///
    /// Monomorphic instructions have the controlling type `INVALID`.
    pub fn is_polymorphic(self) -> bool {
        !matches!(self, Opcode::Nop | Opcode::Jump | Opcode::Return)
    }

    /// True for all branch or jump instructions.
    pub fn is_branch(self) -> bool {
        self.format().is_branch()
    }

    /// Get the textual name of this opcode.
    pub fn name(self) -> &'static str {
        OPCODE_NAMES
            .iter()
            .find(|(op, _)| *op == self)
            .map_or("<unknown>", |(_, name)| name)
    }

    /// Iterate over all opcodes.
    pub fn all() -> impl Iterator<Item = Opcode> {
        OPCODE_NAMES.iter().map(|(op, _)| *op)
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Opcode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, &'static str> {
        OPCODE_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(op, _)| *op)
            .ok_or("Unknown opcode")
    }
}

/// Contents of an instruction.
///
/// Every variant must contain an `opcode` field. The variant is determined by the opcode's
/// instruction format.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs, reason = "field names are self-explanatory")]
pub enum InstructionData {
    Nullary {
        opcode: Opcode,
    },
    Unary {
        opcode: Opcode,
        arg: Value,
    },
    UnaryImm {
        opcode: Opcode,
        imm: Imm64,
    },
    Binary {
        opcode: Opcode,
        args: [Value; 2],
    },
    BinaryImm {
        opcode: Opcode,
        arg: Value,
        imm: Imm64,
    },
    IntCompare {
        opcode: Opcode,
        cond: IntCC,
        args: [Value; 2],
    },
    IntCompareImm {
        opcode: Opcode,
        cond: IntCC,
        arg: Value,
        imm: Imm64,
    },
    Branch {
        opcode: Opcode,
        arg: Value,
        destination: Block,
    },
    BranchIcmp {
        opcode: Opcode,
        cond: IntCC,
        args: [Value; 2],
        destination: Block,
    },
    Jump {
        opcode: Opcode,
        destination: Block,
    },
    MultiAry {
        opcode: Opcode,
        args: SmallVec<[Value; 4]>,
    },
}

impl InstructionData {
    /// Get the opcode of this instruction.
    pub fn opcode(&self) -> Opcode {
        match *self {
            Self::Nullary { opcode }
            | Self::Unary { opcode, .. }
            | Self::UnaryImm { opcode, .. }
            | Self::Binary { opcode, .. }
            | Self::BinaryImm { opcode, .. }
            | Self::IntCompare { opcode, .. }
            | Self::IntCompareImm { opcode, .. }
            | Self::Branch { opcode, .. }
            | Self::BranchIcmp { opcode, .. }
            | Self::Jump { opcode, .. }
            | Self::MultiAry { opcode, .. } => opcode,
        }
    }

    /// Get the instruction format of this instruction's contents.
    pub fn format(&self) -> InstructionFormat {
        match self {
            Self::Nullary { .. } => InstructionFormat::Nullary,
            Self::Unary { .. } => InstructionFormat::Unary,
            Self::UnaryImm { .. } => InstructionFormat::UnaryImm,
            Self::Binary { .. } => InstructionFormat::Binary,
            Self::BinaryImm { .. } => InstructionFormat::BinaryImm,
            Self::IntCompare { .. } => InstructionFormat::IntCompare,
            Self::IntCompareImm { .. } => InstructionFormat::IntCompareImm,
            Self::Branch { .. } => InstructionFormat::Branch,
            Self::BranchIcmp { .. } => InstructionFormat::BranchIcmp,
            Self::Jump { .. } => InstructionFormat::Jump,
            Self::MultiAry { .. } => InstructionFormat::MultiAry,
        }
    }

    /// Get the value arguments to this instruction.
    pub fn arguments(&self) -> &[Value] {
        match self {
            Self::Nullary { .. } | Self::UnaryImm { .. } | Self::Jump { .. } => &[],
            Self::Unary { arg, .. }
            | Self::BinaryImm { arg, .. }
            | Self::IntCompareImm { arg, .. }
            | Self::Branch { arg, .. } => core::slice::from_ref(arg),
            Self::Binary { args, .. }
            | Self::IntCompare { args, .. }
            | Self::BranchIcmp { args, .. } => args,
            Self::MultiAry { args, .. } => args,
        }
    }

    /// Get the immediate operand of this instruction, if it has one.
    pub fn imm_value(&self) -> Option<i64> {
        match *self {
            Self::UnaryImm { imm, .. }
            | Self::BinaryImm { imm, .. }
            | Self::IntCompareImm { imm, .. } => Some(imm.bits()),
            _ => None,
        }
    }

    /// Get the condition code of this instruction, if it has one.
    pub fn cond_code(&self) -> Option<IntCC> {
        match *self {
            Self::IntCompare { cond, .. }
            | Self::IntCompareImm { cond, .. }
            | Self::BranchIcmp { cond, .. } => Some(cond),
            _ => None,
        }
    }

    /// Get the destination block of a branch or jump.
    pub fn branch_destination(&self) -> Option<Block> {
        match *self {
            Self::Branch { destination, .. }
            | Self::BranchIcmp { destination, .. }
            | Self::Jump { destination, .. } => Some(destination),
            _ => None,
        }
    }
}
