//! Binary machine code emission.
//!
//! The `binemit` module contains code for translating encoded instructions into binary machine
//! code. Emission happens in two passes: `compute_offsets` fixes the offset of every block and
//! checks that all branches reach their destination, then `emit_function` writes the
//! instruction words.

mod memorysink;
mod relaxation;

pub use self::memorysink::MemoryCodeSink;
pub use self::relaxation::compute_offsets;

use crate::ir::Function;
use crate::isa::TargetIsa;
use crate::result::{CodegenError, CodegenResult};

/// Offset in bytes from the beginning of the function.
///
/// Cranelift can be used as a cross compiler, so we don't want to use a type like `usize` which
/// depends on the *host* platform, not the *target* platform.
pub type CodeOffset = u32;

/// Abstract interface for adding bytes to the code segment.
///
/// A `CodeSink` will receive all of the machine code for a function.
pub trait CodeSink {
    /// Get the current position.
    fn offset(&self) -> CodeOffset;

    /// Add 1 byte to the code section.
    fn put1(&mut self, _: u8);

    /// Add 2 bytes to the code section.
    fn put2(&mut self, _: u16);

    /// Add 4 bytes to the code section.
    fn put4(&mut self, _: u32);

    /// Add 8 bytes to the code section.
    fn put8(&mut self, _: u64);
}

/// Emit a function to `sink`.
///
/// The function must have been passed through `compute_offsets` first, and the sink must start
/// at offset 0. On failure, the contents of the sink are incomplete and should be discarded.
pub fn emit_function(
    func: &Function,
    isa: &dyn TargetIsa,
    sink: &mut dyn CodeSink,
) -> CodegenResult<()> {
    for block in func.blocks() {
        debug_assert_eq!(func.offsets[block], sink.offset());
        for &inst in func.block_insts(block) {
            if !func.encodings[inst].is_legal() {
                return Err(CodegenError::Unencoded(inst));
            }
            isa.emit_inst(func, inst, sink)?;
        }
    }
    Ok(())
}

/// Compute offsets for `func` and emit it into a new buffer in the byte order of `isa`.
pub fn emit_to_memory(func: &mut Function, isa: &dyn TargetIsa) -> CodegenResult<Vec<u8>> {
    let size = compute_offsets(func, isa)?;
    let mut sink = MemoryCodeSink::for_triple(isa.triple());
    sink.reserve(size);
    emit_function(func, isa, &mut sink)?;
    debug_assert_eq!(sink.offset(), size);
    Ok(sink.into_data())
}
