//! MIPS encoding recipes.
//!
//! All recipes produce 32-bit words. The encoding bits from the tables supply the opcode and
//! function fields, see `binemit`.

use super::binemit::{op, put_i, put_i_regimm, put_iu, put_j, put_r, put_rshamt};
use super::registers::{RA, Registers, ZERO};
use crate::binemit::CodeSink;
use crate::ir::InstructionFormat;
use crate::isa::{EmitContext, ImmShape, OperandConstraint, RecipeBuilder, RecipeIndex, Recipes};
use crate::predicates::InstPredicate;
use crate::result::{BuildError, CodegenResult};

/// `ori`, the second half of `Ilui`.
const ORI: u32 = op(0b001101);

/// Conditional branches count 16 bits of words from the delay slot.
const COND_BRANCH_RANGE: (u8, u8, u8) = (4, 2, 18);

/// The 26-bit word index of `j`, measured from the jump itself.
const JUMP_RANGE: (u8, u8, u8) = (0, 2, 28);

/// The MIPS recipes, with a handle for each.
#[derive(Clone, Debug)]
#[allow(missing_docs, reason = "fields are named after the recipes")]
pub struct RecipeGroup {
    /// All recipes, indexed by the handles below.
    pub recipes: Recipes,

    pub r: RecipeIndex,
    pub rshift: RecipeIndex,
    pub rshamt: RecipeIndex,
    pub ricmp: RecipeIndex,
    pub rmov: RecipeIndex,
    pub rnop: RecipeIndex,
    pub rret: RecipeIndex,
    pub i: RecipeIndex,
    pub iu: RecipeIndex,
    pub iicmp: RecipeIndex,
    pub iz: RecipeIndex,
    pub iuz: RecipeIndex,
    pub ilui: RecipeIndex,
    pub ic: RecipeIndex,
    pub icz: RecipeIndex,
    pub icrz: RecipeIndex,
    pub j: RecipeIndex,
    pub gpsp: RecipeIndex,
    pub gpfi: RecipeIndex,
}

impl RecipeGroup {
    /// Find a recipe by name.
    pub fn by_name(&self, name: &str) -> Option<RecipeIndex> {
        self.recipes
            .iter()
            .find(|(_, r)| r.name() == name)
            .map(|(index, _)| index)
    }
}

/// Define the MIPS recipes over the registers in `regs`.
pub fn define(regs: &Registers) -> Result<RecipeGroup, BuildError> {
    use InstructionFormat::*;

    let gpr = OperandConstraint::reg(regs.gpr);
    let mut recipes = Recipes::new();
    let mut add = |builder: RecipeBuilder| -> Result<RecipeIndex, BuildError> {
        Ok(recipes.push(builder.build()?))
    };

    // R-type with the shift amount from the encoding bits.
    let r = add(RecipeBuilder::new("R", Binary, 4)
        .operands_in(vec![gpr, gpr])
        .operands_out(vec![gpr])
        .emit(emit_r))?;

    // Variable shifts put the shifted value in `rt` and the amount in `rs`.
    let rshift = add(RecipeBuilder::new("Rshift", Binary, 4)
        .operands_in(vec![gpr, gpr])
        .operands_out(vec![gpr])
        .emit(emit_rshift))?;

    let rshamt = add(RecipeBuilder::new("Rshamt", BinaryImm, 4)
        .operands_in(vec![gpr])
        .operands_out(vec![gpr])
        .imm(ImmShape::unsigned(5))
        .emit(emit_rshamt))?;

    let ricmp = add(RecipeBuilder::new("Ricmp", IntCompare, 4)
        .operands_in(vec![gpr, gpr])
        .operands_out(vec![gpr])
        .emit(emit_r))?;

    // Register copy as `or rd, rs, $zero`.
    let rmov = add(RecipeBuilder::new("Rmov", Unary, 4)
        .operands_in(vec![gpr])
        .operands_out(vec![gpr])
        .emit(emit_rmov))?;

    let rnop = add(RecipeBuilder::new("Rnop", Nullary, 4).emit(emit_rnop))?;

    // `jr $ra`. The return address is not an operand of the instruction: the recipe reads the
    // link register by its fixed unit number. This is the only recipe that depends on the
    // calling convention this way, and it assumes nothing has clobbered `$ra`.
    let rret = add(RecipeBuilder::new("Rret", MultiAry, 4).emit(emit_rret))?;

    let i = add(RecipeBuilder::new("I", BinaryImm, 4)
        .operands_in(vec![gpr])
        .operands_out(vec![gpr])
        .imm(ImmShape::signed(16))
        .emit(emit_i))?;

    // Logical immediates are zero-extended.
    let iu = add(RecipeBuilder::new("Iu", BinaryImm, 4)
        .operands_in(vec![gpr])
        .operands_out(vec![gpr])
        .imm(ImmShape::unsigned(16))
        .emit(emit_iu))?;

    let iicmp = add(RecipeBuilder::new("Iicmp", IntCompareImm, 4)
        .operands_in(vec![gpr])
        .operands_out(vec![gpr])
        .imm(ImmShape::signed(16))
        .emit(emit_i))?;

    // Constants. `Iz`, `Iuz`, and `Ilui` accept disjoint sets of immediates which together
    // cover all 32-bit values, signed or unsigned.
    let iz = add(RecipeBuilder::new("Iz", UnaryImm, 4)
        .operands_out(vec![gpr])
        .imm(ImmShape::signed(16))
        .emit(emit_iz))?;

    let iuz = add(RecipeBuilder::new("Iuz", UnaryImm, 4)
        .operands_out(vec![gpr])
        .imm(ImmShape::unsigned(16))
        .inst_predicate(InstPredicate::signed_imm(16).not())
        .emit(emit_iuz))?;

    let ilui = add(RecipeBuilder::new("Ilui", UnaryImm, 8)
        .operands_out(vec![gpr])
        .imm(ImmShape::either(32))
        .inst_predicate(
            InstPredicate::signed_imm(16)
                .or(InstPredicate::unsigned_imm(16))
                .not(),
        )
        .emit(emit_ilui))?;

    let ic = add(RecipeBuilder::new("Ic", BranchIcmp, 4)
        .operands_in(vec![gpr, gpr])
        .branch_range(COND_BRANCH_RANGE)
        .emit(emit_ic))?;

    // Branch on a register compared with `$zero`.
    let icz = add(RecipeBuilder::new("Icz", Branch, 4)
        .operands_in(vec![gpr])
        .branch_range(COND_BRANCH_RANGE)
        .emit(emit_icz))?;

    // Unconditional `b`, a `REGIMM` branch testing `$zero`. Shorter range than `J`.
    let icrz = add(RecipeBuilder::new("Icrz", Jump, 4)
        .branch_range(COND_BRANCH_RANGE)
        .emit(emit_icrz))?;

    let j = add(RecipeBuilder::new("J", Jump, 4)
        .branch_range(JUMP_RANGE)
        .emit(emit_j))?;

    // Spill and fill need a frame layout to address stack slots, so they have no emitter.
    let gpsp = add(RecipeBuilder::new("GPsp", Unary, 4)
        .operands_in(vec![gpr])
        .operands_out(vec![OperandConstraint::stack(regs.gpr)]))?;
    let gpfi = add(RecipeBuilder::new("GPfi", Unary, 4)
        .operands_in(vec![OperandConstraint::stack(regs.gpr)])
        .operands_out(vec![gpr]))?;

    Ok(RecipeGroup {
        recipes,
        r,
        rshift,
        rshamt,
        ricmp,
        rmov,
        rnop,
        rret,
        i,
        iu,
        iicmp,
        iz,
        iuz,
        ilui,
        ic,
        icz,
        icrz,
        j,
        gpsp,
        gpfi,
    })
}

fn emit_r(ctx: &EmitContext<'_>, sink: &mut dyn CodeSink) -> CodegenResult<()> {
    put_r(ctx.bits, ctx.ins[0], ctx.ins[1], ctx.outs[0], sink);
    Ok(())
}

fn emit_rshift(ctx: &EmitContext<'_>, sink: &mut dyn CodeSink) -> CodegenResult<()> {
    put_r(ctx.bits, ctx.ins[1], ctx.ins[0], ctx.outs[0], sink);
    Ok(())
}

fn emit_rshamt(ctx: &EmitContext<'_>, sink: &mut dyn CodeSink) -> CodegenResult<()> {
    put_rshamt(ctx.bits, ctx.ins[0], ctx.outs[0], ctx.imm, sink);
    Ok(())
}

fn emit_rmov(ctx: &EmitContext<'_>, sink: &mut dyn CodeSink) -> CodegenResult<()> {
    put_r(ctx.bits, ctx.ins[0], ZERO, ctx.outs[0], sink);
    Ok(())
}

fn emit_rnop(ctx: &EmitContext<'_>, sink: &mut dyn CodeSink) -> CodegenResult<()> {
    put_r(ctx.bits, ZERO, ZERO, ZERO, sink);
    Ok(())
}

fn emit_rret(ctx: &EmitContext<'_>, sink: &mut dyn CodeSink) -> CodegenResult<()> {
    put_r(ctx.bits, RA, ZERO, ZERO, sink);
    Ok(())
}

fn emit_i(ctx: &EmitContext<'_>, sink: &mut dyn CodeSink) -> CodegenResult<()> {
    put_i(ctx.bits, ctx.ins[0], ctx.outs[0], ctx.imm, sink);
    Ok(())
}

fn emit_iu(ctx: &EmitContext<'_>, sink: &mut dyn CodeSink) -> CodegenResult<()> {
    put_iu(ctx.bits, ctx.ins[0], ctx.outs[0], ctx.imm, sink);
    Ok(())
}

fn emit_iz(ctx: &EmitContext<'_>, sink: &mut dyn CodeSink) -> CodegenResult<()> {
    put_i(ctx.bits, ZERO, ctx.outs[0], ctx.imm, sink);
    Ok(())
}

fn emit_iuz(ctx: &EmitContext<'_>, sink: &mut dyn CodeSink) -> CodegenResult<()> {
    put_iu(ctx.bits, ZERO, ctx.outs[0], ctx.imm, sink);
    Ok(())
}

fn emit_ilui(ctx: &EmitContext<'_>, sink: &mut dyn CodeSink) -> CodegenResult<()> {
    let rt = ctx.outs[0];
    put_iu(ctx.bits, ZERO, rt, (ctx.imm >> 16) & 0xffff, sink);
    put_iu(ORI, rt, rt, ctx.imm & 0xffff, sink);
    Ok(())
}

fn emit_ic(ctx: &EmitContext<'_>, sink: &mut dyn CodeSink) -> CodegenResult<()> {
    let disp = ctx.displacement()?;
    put_i(ctx.bits, ctx.ins[0], ctx.ins[1], disp >> 2, sink);
    Ok(())
}

fn emit_icz(ctx: &EmitContext<'_>, sink: &mut dyn CodeSink) -> CodegenResult<()> {
    let disp = ctx.displacement()?;
    put_i(ctx.bits, ctx.ins[0], ZERO, disp >> 2, sink);
    Ok(())
}

fn emit_icrz(ctx: &EmitContext<'_>, sink: &mut dyn CodeSink) -> CodegenResult<()> {
    let disp = ctx.displacement()?;
    put_i_regimm(ctx.bits, ZERO, disp >> 2, sink);
    Ok(())
}

fn emit_j(ctx: &EmitContext<'_>, sink: &mut dyn CodeSink) -> CodegenResult<()> {
    let disp = ctx.displacement()?;
    put_j(ctx.bits, disp >> 2, sink);
    Ok(())
}
