//! Legalize instructions.
//!
//! A legal instruction is one that can be mapped directly to a machine code instruction for the
//! target ISA. The `legalize_function()` function takes as input any function and transforms it
//! into an equivalent function using only legal instructions.
//!
//! The characteristics of legal instructions depend on the target ISA, so any given instruction
//! can be legal for one ISA and illegal for another.
//!
//! The rewrites themselves are not part of this crate. They are provided by a `Legalizer`, which
//! receives each instruction without an encoding together with the action selected by the
//! legalization policy of the target. Besides driving the rewrites, `legalize_function` fills out
//! the `function.encodings` map which provides a legal encoding for every instruction.
//!
//! The legalizer does not deal with register allocation constraints. These constraints are derived
//! from the encoding recipes, and solved later by the register allocator.

use crate::ir::{Function, Inst};
use crate::isa::{Legalize, TargetIsa};
use crate::result::{CodegenError, CodegenResult};
use log::trace;

/// Number of consecutive rewrites without a newly encoded instruction before legalization is
/// considered to be looping.
const MAX_REWRITES: usize = 256;

/// Rewrites an instruction that has no encoding into legal instructions.
pub trait Legalizer {
    /// Rewrite `inst` in `func` according to `action`.
    ///
    /// The rewrite may replace `inst`, insert new instructions before it, or remove it. The
    /// rewritten instructions are encoded again, and legalized again if needed. Return `false` if
    /// the instruction can't be legalized.
    fn legalize(&mut self, func: &mut Function, inst: Inst, action: Legalize) -> bool;
}

impl<F> Legalizer for F
where
    F: FnMut(&mut Function, Inst, Legalize) -> bool,
{
    fn legalize(&mut self, func: &mut Function, inst: Inst, action: Legalize) -> bool {
        self(func, inst, action)
    }
}

/// Legalize `func` for `isa`, assigning an encoding to every instruction.
///
/// Instructions are visited in layout order. An instruction without a legal encoding is handed to
/// `legalizer` and the instructions at its position are visited again. Legalization fails with
/// `CodegenError::LegalizationStuck` when the legalizer gives up, when it leaves the instruction
/// unchanged, or when rewrites keep producing instructions that can't be encoded.
pub fn legalize_function(
    func: &mut Function,
    isa: &dyn TargetIsa,
    legalizer: &mut dyn Legalizer,
) -> CodegenResult<()> {
    let mut block_index = 0;
    while let Some(block) = func.blocks().nth(block_index) {
        block_index += 1;
        let mut pos = 0;
        let mut rewrites = 0;
        while let Some(&inst) = func.block_insts(block).get(pos) {
            let (opcode, action) = match isa.encode(func.inst_data(inst), func.ctrl_type(inst)) {
                Ok(enc) => {
                    func.encodings[inst] = enc;
                    pos += 1;
                    rewrites = 0;
                    continue;
                }
                Err(CodegenError::NoEncoding { opcode, action, .. }) => (opcode, action),
                Err(err) => return Err(err),
            };

            rewrites += 1;
            if rewrites > MAX_REWRITES {
                return Err(CodegenError::LegalizationStuck(opcode));
            }

            trace!("legalizing {} {}: {}", action, inst, func.inst_data(inst).opcode());
            let before = (
                func.inst_data(inst).clone(),
                func.ctrl_type(inst),
                func.block_insts(block).to_vec(),
            );
            if !legalizer.legalize(func, inst, action) {
                return Err(CodegenError::LegalizationStuck(opcode));
            }
            let unchanged = *func.inst_data(inst) == before.0
                && func.ctrl_type(inst) == before.1
                && func.block_insts(block) == &before.2[..];
            if unchanged {
                return Err(CodegenError::LegalizationStuck(opcode));
            }
        }
    }
    Ok(())
}
