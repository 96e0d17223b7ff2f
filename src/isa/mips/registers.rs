//! MIPS register descriptions.
//!
//! Register units are numbered bank by bank: the 32 integer registers first, then the 32
//! floating point registers, then `hi` and `lo`.

use crate::isa::registers::{RegBank, RegClass, RegInfo, RegInfoBuilder, RegNames, RegUnit};
use crate::result::BuildError;

/// Names of the integer registers, in encoding order.
const INT_NAMES: [&str; 32] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7", "t4", "t5", "t6",
    "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "t8", "t9", "k0", "k1", "gp", "sp", "s8",
    "ra",
];

/// The hard-wired zero register.
pub const ZERO: RegUnit = 0;
/// Assembler temporary.
pub const AT: RegUnit = 1;
/// First result register.
pub const V0: RegUnit = 2;
/// First argument register.
pub const A0: RegUnit = 4;
/// Reserved for the kernel.
pub const K0: RegUnit = 26;
/// Reserved for the kernel.
pub const K1: RegUnit = 27;
/// Global pointer.
pub const GP: RegUnit = 28;
/// Stack pointer.
pub const SP: RegUnit = 29;
/// Link register holding the return address.
pub const RA: RegUnit = 31;
/// First floating point register.
pub const F0: RegUnit = 32;
/// Multiply/divide result, high half.
pub const HI: RegUnit = 64;
/// Multiply/divide result, low half.
pub const LO: RegUnit = 65;

/// The register description of the MIPS family, with its register classes.
#[derive(Clone, Debug)]
pub struct Registers {
    /// Banks and classes.
    pub info: RegInfo,
    /// General purpose registers.
    pub gpr: RegClass,
    /// Floating point registers.
    pub fpr: RegClass,
    /// The `hi` and `lo` registers written by multiplications.
    pub hilo: RegClass,
}

/// Define the MIPS registers.
///
/// Both CPU modes share this description. The registers of MIPS64 are wider, but they are the
/// same units.
pub fn define() -> Result<Registers, BuildError> {
    let mut regs = RegInfoBuilder::new();
    let int_regs = regs.add_bank(
        RegBank::new("IntRegs", 32, RegNames::Explicit(&INT_NAMES), true)?.with_hardwired(ZERO)?,
    )?;
    let float_regs = regs.add_bank(RegBank::new("FloatRegs", 32, RegNames::Prefix("f"), true)?)?;
    let hilo_regs = regs.add_bank(RegBank::new(
        "HiLoRegs",
        2,
        RegNames::Explicit(&["hi", "lo"]),
        false,
    )?)?;

    let gpr = regs.add_class("GPR", int_regs)?;
    let fpr = regs.add_class("FPR", float_regs)?;
    let hilo = regs.add_class("HILO", hilo_regs)?;

    Ok(Registers {
        info: regs.finish(),
        gpr,
        fpr,
        hilo,
    })
}

/// Get the 5-bit register field of a unit in the integer or floating point banks.
pub(crate) fn field(unit: RegUnit) -> u32 {
    u32::from(unit) & 0x1f
}
