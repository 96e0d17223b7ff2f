//! Encoding tables for MIPS.
//!
//! Both CPU modes have the 32-bit encodings. MIPS64 adds the doubleword variants for `i64`.

use super::binemit::{op, opf};
use super::recipes::RecipeGroup;
use crate::ir::types::{F32, F64, I32, I64, INVALID};
use crate::ir::{IntCC, Opcode, Type};
use crate::isa::enc_tables::{CpuModeBuilder, LegalizePolicy};
use crate::isa::{CpuMode, Legalize};
use crate::predicates::InstPredicate;
use crate::result::BuildError;
use crate::settings::SettingGroup;

// Major opcodes.
const SPECIAL: u32 = 0b000000;
const REGIMM: u32 = 0b000001;
const SPECIAL2: u32 = 0b011100;
const J: u32 = 0b000010;
const BEQ: u32 = 0b000100;
const BNE: u32 = 0b000101;
const ADDIU: u32 = 0b001001;
const SLTI: u32 = 0b001010;
const SLTIU: u32 = 0b001011;
const ANDI: u32 = 0b001100;
const ORI: u32 = 0b001101;
const XORI: u32 = 0b001110;
const LUI: u32 = 0b001111;
const DADDIU: u32 = 0b011001;
const LW: u32 = 0b100011;
const SW: u32 = 0b101011;
const LD: u32 = 0b110111;
const SD: u32 = 0b111111;

/// Opcodes that differ between words and doublewords.
struct Widths {
    addu: u32,
    addiu: u32,
    subu: u32,
    sllv: u32,
    srlv: u32,
    srav: u32,
    sll: u32,
    srl: u32,
    sra: u32,
    mult_g: u32,
    load: u32,
    store: u32,
}

const WORD: Widths = Widths {
    addu: opf(SPECIAL, 0b100001),
    addiu: op(ADDIU),
    subu: opf(SPECIAL, 0b100011),
    sllv: opf(SPECIAL, 0b000100),
    srlv: opf(SPECIAL, 0b000110),
    srav: opf(SPECIAL, 0b000111),
    sll: opf(SPECIAL, 0b000000),
    srl: opf(SPECIAL, 0b000010),
    sra: opf(SPECIAL, 0b000011),
    mult_g: opf(SPECIAL2, 0b010000),
    load: op(LW),
    store: op(SW),
};

const DOUBLEWORD: Widths = Widths {
    addu: opf(SPECIAL, 0b101101),
    addiu: op(DADDIU),
    subu: opf(SPECIAL, 0b101111),
    sllv: opf(SPECIAL, 0b010100),
    srlv: opf(SPECIAL, 0b010110),
    srav: opf(SPECIAL, 0b010111),
    sll: opf(SPECIAL, 0b111000),
    srl: opf(SPECIAL, 0b111010),
    sra: opf(SPECIAL, 0b111011),
    mult_g: opf(SPECIAL2, 0b010001),
    load: op(LD),
    store: op(SD),
};

/// Register the integer encodings for values of type `ty`.
fn define_int(mode: &mut CpuModeBuilder<'_>, g: &RecipeGroup, ty: Type, w: &Widths) {
    use Opcode::*;

    mode.enc(Iadd, ty, g.r, w.addu);
    mode.enc(IaddImm, ty, g.i, w.addiu);
    mode.enc(Isub, ty, g.r, w.subu);

    mode.enc(Band, ty, g.r, opf(SPECIAL, 0b100100));
    mode.enc(Bor, ty, g.r, opf(SPECIAL, 0b100101));
    mode.enc(Bxor, ty, g.r, opf(SPECIAL, 0b100110));
    mode.enc(BandImm, ty, g.iu, op(ANDI));
    mode.enc(BorImm, ty, g.iu, op(ORI));
    mode.enc(BxorImm, ty, g.iu, op(XORI));

    mode.enc(Ishl, ty, g.rshift, w.sllv);
    mode.enc(Ushr, ty, g.rshift, w.srlv);
    mode.enc(Sshr, ty, g.rshift, w.srav);
    mode.enc(IshlImm, ty, g.rshamt, w.sll);
    mode.enc(UshrImm, ty, g.rshamt, w.srl);
    mode.enc(SshrImm, ty, g.rshamt, w.sra);

    // Only "less than" has a direct encoding. Other conditions are legalized.
    let slt = InstPredicate::cond(IntCC::SignedLessThan);
    let ult = InstPredicate::cond(IntCC::UnsignedLessThan);
    mode.enc(Icmp, ty, g.ricmp, opf(SPECIAL, 0b101010))
        .inst_predicate(slt.clone());
    mode.enc(Icmp, ty, g.ricmp, opf(SPECIAL, 0b101011))
        .inst_predicate(ult.clone());
    mode.enc(IcmpImm, ty, g.iicmp, op(SLTI)).inst_predicate(slt);
    mode.enc(IcmpImm, ty, g.iicmp, op(SLTIU)).inst_predicate(ult);

    mode.enc(Iconst, ty, g.iz, w.addiu);
    mode.enc(Iconst, ty, g.iuz, op(ORI));
    let lui = mode.enc(Iconst, ty, g.ilui, op(LUI));
    if ty.bits() > 32 {
        // `lui` sign-extends bit 31 into the upper half of the register.
        lui.inst_predicate(InstPredicate::signed_imm(32));
    }

    mode.enc(Copy, ty, g.rmov, opf(SPECIAL, 0b100101));

    mode.enc(Brz, ty, g.icz, op(BEQ));
    mode.enc(Brnz, ty, g.icz, op(BNE));
    mode.enc(BrIcmp, ty, g.ic, op(BEQ))
        .inst_predicate(InstPredicate::cond(IntCC::Equal));
    mode.enc(BrIcmp, ty, g.ic, op(BNE))
        .inst_predicate(InstPredicate::cond(IntCC::NotEqual));

    // Loongson `mult.g` writes the low half of the product to a GPR.
    mode.enc(Imul, ty, g.r, w.mult_g).isa_predicate("use_lext");

    mode.enc(Spill, ty, g.gpsp, w.store);
    mode.enc(Fill, ty, g.gpfi, w.load);
}

/// Register the encodings of monomorphic instructions.
fn define_control(mode: &mut CpuModeBuilder<'_>, g: &RecipeGroup) {
    // `bgez $zero` first. Branch relaxation switches to `j` when the destination is too far.
    mode.enc(Opcode::Jump, INVALID, g.icrz, opf(REGIMM, 0b00001));
    mode.enc(Opcode::Jump, INVALID, g.j, op(J));
    mode.enc(Opcode::Return, INVALID, g.rret, opf(SPECIAL, 0b001000));
    mode.enc(Opcode::Nop, INVALID, g.rnop, opf(SPECIAL, 0b000000));
}

/// Define the `MIPS32` CPU mode.
pub fn define_mips32(g: &RecipeGroup, settings: &SettingGroup) -> Result<CpuMode, BuildError> {
    let mut legalize = LegalizePolicy::new(Legalize::Expand, Legalize::Narrow);
    for ty in [I32, F32, F64] {
        legalize.legalize_type(ty, Legalize::Expand)?;
    }

    let mut mode = CpuModeBuilder::new("MIPS32", &g.recipes, settings, legalize);
    define_int(&mut mode, g, I32, &WORD);
    define_control(&mut mode, g);
    mode.finish()
}

/// Define the `MIPS64` CPU mode.
pub fn define_mips64(g: &RecipeGroup, settings: &SettingGroup) -> Result<CpuMode, BuildError> {
    let mut legalize = LegalizePolicy::new(Legalize::Expand, Legalize::Narrow);
    for ty in [I32, I64, F32, F64] {
        legalize.legalize_type(ty, Legalize::Expand)?;
    }

    let mut mode = CpuModeBuilder::new("MIPS64", &g.recipes, settings, legalize);
    define_int(&mut mode, g, I32, &WORD);
    define_int(&mut mode, g, I64, &DOUBLEWORD);
    define_control(&mut mode, g);
    mode.finish()
}
