//! MIPS Instruction Set Architecture.
//!
//! The 32-bit and 64-bit CPU modes share their registers and recipes. The mode is chosen from
//! the architecture of the target triple.

mod abi;
pub mod binemit;
mod enc_tables;
mod recipes;
pub mod registers;
pub mod settings;

use self::recipes::RecipeGroup;
use self::registers::Registers;
use crate::binemit::CodeSink;
use crate::ir::{Function, Inst, InstructionData, Type, Value};
use crate::isa::Builder as IsaBuilder;
use crate::isa::{
    ConstraintKind, CpuMode, EmitContext, EncInfo, Encodings, Legalize, OperandConstraint, Recipe,
    RegClass, RegInfo, RegUnit, TargetIsa,
};
use crate::regalloc::RegisterSet;
use crate::result::{BuildError, CodegenError, CodegenResult};
use crate::settings as shared_settings;
use core::fmt;
use log::debug;
use smallvec::SmallVec;
use std::sync::Arc;
use target_lexicon::{Architecture, Triple};

/// Everything defined for the target, shared by both CPU modes.
struct Definitions {
    regs: Registers,
    recipes: RecipeGroup,
    mips32: CpuMode,
    mips64: CpuMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Variant {
    Mips32,
    Mips64,
}

struct Isa {
    triple: Triple,
    isa_flags: settings::Flags,
    defs: Arc<Definitions>,
    variant: Variant,
}

/// Get an ISA builder for creating MIPS targets.
pub fn isa_builder(triple: Triple) -> IsaBuilder {
    IsaBuilder::new(triple, settings::builder(), isa_constructor)
}

fn isa_constructor(
    triple: Triple,
    builder: shared_settings::Builder,
) -> Result<Box<dyn TargetIsa>, BuildError> {
    Ok(Box::new(Isa::new(triple, builder)?))
}

impl Isa {
    fn new(triple: Triple, builder: shared_settings::Builder) -> Result<Self, BuildError> {
        let isa_flags = settings::Flags::new(builder)?;
        let regs = registers::define()?;
        let recipes = recipes::define(&regs)?;
        let group = isa_flags.flags().template();
        let mips32 = enc_tables::define_mips32(&recipes, group)?;
        let mips64 = enc_tables::define_mips64(&recipes, group)?;

        let variant = match triple.architecture {
            Architecture::Mips64(_) => Variant::Mips64,
            _ => Variant::Mips32,
        };
        debug!(
            "mips target for {triple}: {variant:?}, use_lext = {}",
            isa_flags.use_lext()
        );

        Ok(Self {
            triple,
            isa_flags,
            defs: Arc::new(Definitions {
                regs,
                recipes,
                mips32,
                mips64,
            }),
            variant,
        })
    }

    fn mode(&self) -> &CpuMode {
        match self.variant {
            Variant::Mips32 => &self.defs.mips32,
            Variant::Mips64 => &self.defs.mips64,
        }
    }

    /// Collect the register units of `values`, checking them against `constraints`.
    ///
    /// Stack operands are checked but produce no unit. Results may not be written to a
    /// hard-wired register, and every constraint needs exactly one value.
    fn bind(
        &self,
        func: &Function,
        recipe: &Recipe,
        constraints: &[OperandConstraint],
        values: &[Value],
        results: bool,
    ) -> CodegenResult<SmallVec<[RegUnit; 2]>> {
        if constraints.len() != values.len() {
            return Err(CodegenError::OperandCount {
                recipe: recipe.name(),
                kind: if results { "outputs" } else { "inputs" },
                expected: constraints.len(),
                found: values.len(),
            });
        }
        let mut units = SmallVec::new();
        for (constraint, &value) in constraints.iter().zip(values) {
            let loc = func.value_loc(value);
            let bad = || CodegenError::BadOperandLocation {
                recipe: recipe.name(),
                value,
            };
            match constraint.kind {
                ConstraintKind::Stack => {
                    loc.stack().ok_or_else(bad)?;
                }
                ConstraintKind::Reg | ConstraintKind::FixedReg(_) => {
                    let unit = loc
                        .reg()
                        .filter(|&unit| constraint.accepts_reg(unit))
                        .ok_or_else(bad)?;
                    if results && self.defs.regs.info.is_hardwired(unit) {
                        return Err(bad());
                    }
                    units.push(unit);
                }
            }
        }
        Ok(units)
    }
}

impl TargetIsa for Isa {
    fn name(&self) -> &'static str {
        "mips"
    }

    fn triple(&self) -> &Triple {
        &self.triple
    }

    fn cpu_mode(&self) -> &'static str {
        self.mode().name()
    }

    fn isa_flags(&self) -> &shared_settings::Flags {
        self.isa_flags.flags()
    }

    fn has_delay_slot(&self) -> bool {
        true
    }

    fn register_info(&self) -> &RegInfo {
        &self.defs.regs.info
    }

    fn encoding_info(&self) -> EncInfo<'_> {
        EncInfo {
            recipes: &self.defs.recipes.recipes,
        }
    }

    fn legal_encodings<'a>(
        &'a self,
        inst: &'a InstructionData,
        ctrl_type: Type,
    ) -> Encodings<'a> {
        self.mode().legal_encodings(
            &self.defs.recipes.recipes,
            inst,
            ctrl_type,
            self.isa_flags.predicate_view(),
        )
    }

    fn legalize_action(&self, ctrl_type: Type) -> Legalize {
        self.mode().legalize_policy().action_for(ctrl_type)
    }

    fn regclass_for_abi_type(&self, ty: Type) -> RegClass {
        abi::regclass_for_abi_type(&self.defs.regs, ty)
    }

    fn allocatable_registers(&self) -> RegisterSet {
        abi::allocatable_registers(&self.defs.regs)
    }

    fn emit_inst(
        &self,
        func: &Function,
        inst: Inst,
        sink: &mut dyn CodeSink,
    ) -> CodegenResult<()> {
        let enc = func.encodings[inst];
        let recipe = self
            .encoding_info()
            .recipe(enc)
            .ok_or(CodegenError::Unencoded(inst))?;
        let data = func.inst_data(inst);
        let ins = self.bind(func, recipe, recipe.ins(), data.arguments(), false)?;
        let outs = self.bind(func, recipe, recipe.outs(), func.inst_results(inst), true)?;

        let ctx = EmitContext {
            recipe: recipe.name(),
            bits: enc.bits(),
            ins: &ins,
            outs: &outs,
            imm: data.imm_value().unwrap_or(0),
            offset: sink.offset(),
            dest: data
                .branch_destination()
                .map_or(0, |block| func.offsets[block]),
            branch_range: recipe.branch_range(),
        };
        recipe.emit(&ctx, sink)?;
        debug_assert_eq!(
            sink.offset() - ctx.offset,
            u32::from(recipe.base_size()),
            "recipe {} emitted the wrong size",
            recipe.name()
        );
        Ok(())
    }
}

impl fmt::Display for Isa {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.isa_flags)
    }
}
