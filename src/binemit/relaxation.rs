//! Block offsets and branch ranges.
//!
//! Branch words carry a displacement to their destination block, so every block header offset
//! must be final before the first word is written. `compute_offsets` lays out the blocks and
//! fills in `func.offsets`.
//!
//! A branch whose destination is out of reach may switch to another legal encoding with the same
//! operand constraints and a longer range. When there is none, the caller has to rewrite the
//! branch and `CodegenError::BranchRange` is returned. No filler instruction is ever inserted:
//! displacements are measured from the origin each branch recipe declares.

use crate::binemit::CodeOffset;
use crate::ir::{Block, Function, Inst};
use crate::isa::{EncInfo, Encoding, TargetIsa};
use crate::result::{CodegenError, CodegenResult};
use log::{debug, trace};

/// Relax branches and compute the final layout of block headers in `func`.
///
/// Fill in the `func.offsets` table so the function is ready for binary emission, and return the
/// total code size. Every instruction must already have an encoding.
pub fn compute_offsets(func: &mut Function, isa: &dyn TargetIsa) -> CodegenResult<CodeOffset> {
    let encinfo = isa.encoding_info();
    let blocks: Vec<Block> = func.blocks().collect();

    for &block in &blocks {
        for &inst in func.block_insts(block) {
            if !func.encodings[inst].is_legal() {
                return Err(CodegenError::Unencoded(inst));
            }
        }
    }

    // First, compute initial offsets for every block.
    func.offsets.clear();
    let mut offset: CodeOffset = 0;
    for &block in &blocks {
        func.offsets[block] = offset;
        for &inst in func.block_insts(block) {
            offset = advance(offset, &encinfo, func.encodings[inst])?;
        }
    }

    // Then, run the relaxation algorithm until it converges.
    let mut go_again = true;
    while go_again {
        go_again = false;
        offset = 0;

        for &block in &blocks {
            // Record the offset for `block` and make sure we iterate until offsets are stable.
            if func.offsets[block] != offset {
                func.offsets[block] = offset;
                go_again = true;
            }

            for i in 0..func.block_insts(block).len() {
                let inst = func.block_insts(block)[i];
                let enc = func.encodings[inst];

                // See if this is a branch with a range and a destination, and if the target is in
                // range.
                let range = encinfo.recipe(enc).and_then(|r| r.branch_range());
                let dest = func.inst_data(inst).branch_destination();
                if let (Some(range), Some(dest)) = (range, dest) {
                    let dest_offset = func.offsets[dest];
                    if !range.contains(offset, dest_offset) {
                        let relaxed = relax_branch(func, inst, offset, dest_offset, isa)?;
                        if relaxed != enc {
                            func.encodings[inst] = relaxed;
                            go_again = true;
                        }
                    }
                }

                offset = advance(offset, &encinfo, func.encodings[inst])?;
            }
        }
    }

    trace!("{}: {} bytes of code", func.name, offset);
    Ok(offset)
}

fn advance(offset: CodeOffset, encinfo: &EncInfo<'_>, enc: Encoding) -> CodegenResult<CodeOffset> {
    offset
        .checked_add(CodeOffset::from(encinfo.byte_size(enc)))
        .ok_or(CodegenError::CodeTooLarge)
}

/// Find an encoding of the branch `inst` that can cover the range `offset - dest_offset`.
fn relax_branch(
    func: &Function,
    inst: Inst,
    offset: CodeOffset,
    dest_offset: CodeOffset,
    isa: &dyn TargetIsa,
) -> CodegenResult<Encoding> {
    let encinfo = isa.encoding_info();
    let current = func.encodings[inst];
    debug!(
        "Relaxing [{}] {} for {:#x}-{:#x} range",
        encinfo.display(current),
        inst,
        offset,
        dest_offset
    );

    let constraints = |enc| {
        encinfo
            .recipe(enc)
            .map(|r| (r.ins().to_vec(), r.outs().to_vec()))
    };
    let current_constraints = constraints(current);

    // Pick the smallest encoding that can handle the branch range.
    isa.legal_encodings(func.inst_data(inst), func.ctrl_type(inst))
        .filter(|&enc| {
            let in_range = encinfo
                .recipe(enc)
                .and_then(|r| r.branch_range())
                .is_some_and(|range| range.contains(offset, dest_offset));
            if !in_range {
                debug!("  trying [{}]: out of range", encinfo.display(enc));
                false
            } else if constraints(enc) != current_constraints {
                // The register allocator has already bound the operands for the current
                // constraints.
                debug!("  trying [{}]: constraints differ", encinfo.display(enc));
                false
            } else {
                debug!("  trying [{}]: OK", encinfo.display(enc));
                true
            }
        })
        .min_by_key(|&enc| encinfo.byte_size(enc))
        .ok_or_else(|| {
            let displacement = encinfo
                .recipe(current)
                .and_then(|r| r.branch_range())
                .map_or(i64::from(dest_offset) - i64::from(offset), |range| {
                    range.displacement(offset, dest_offset)
                });
            CodegenError::BranchRange {
                recipe: encinfo.recipe_name(current),
                displacement,
            }
        })
}
