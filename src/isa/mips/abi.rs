//! MIPS ABI register conventions.
//!
//! Argument assignment is left to the caller. This module only knows which registers the
//! allocator must stay away from and which class holds each kind of ABI value.

use super::registers::{AT, GP, K0, K1, Registers, SP};
use crate::ir::Type;
use crate::isa::RegClass;
use crate::regalloc::RegisterSet;

/// Get register class for a type appearing in a legalized signature.
pub fn regclass_for_abi_type(regs: &Registers, ty: Type) -> RegClass {
    if ty.is_float() { regs.fpr } else { regs.gpr }
}

/// Get the registers the allocator may use.
///
/// `$zero` is hard-wired and never part of the set.
pub fn allocatable_registers(regs: &Registers) -> RegisterSet {
    let mut set = RegisterSet::allocatable(&regs.info);
    set.take(regs.gpr, AT); // Assembler temporary.
    set.take(regs.gpr, K0); // Reserved for the kernel.
    set.take(regs.gpr, K1);
    set.take(regs.gpr, GP); // Global pointer.
    set.take(regs.gpr, SP); // Stack pointer.
    // %ra is the link register which is available for allocation.
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types;
    use crate::isa::mips::registers::{self, RA, V0, ZERO};

    #[test]
    fn reserved() {
        let regs = registers::define().unwrap();
        let set = allocatable_registers(&regs);
        for reg in [ZERO, AT, K0, K1, GP, SP] {
            assert!(!set.is_avail(reg), "{reg}");
        }
        assert!(set.is_avail(V0));
        assert!(set.is_avail(RA));
        assert_eq!(set.iter(regs.gpr).len(), 26);
        assert_eq!(set.iter(regs.fpr).len(), 32);
    }

    #[test]
    fn zero_is_never_freed() {
        let regs = registers::define().unwrap();
        let mut set = RegisterSet::empty();
        set.free(regs.gpr, V0);
        assert!(set.is_avail(V0));

        let mut set = allocatable_registers(&regs);
        set.free(regs.gpr, AT);
        assert!(set.is_avail(AT));
        assert!(set.iter(regs.gpr).all(|r| r != ZERO));
    }

    #[test]
    fn abi_classes() {
        let regs = registers::define().unwrap();
        assert_eq!(regclass_for_abi_type(&regs, types::I32), regs.gpr);
        assert_eq!(regclass_for_abi_type(&regs, types::I64), regs.gpr);
        assert_eq!(regclass_for_abi_type(&regs, types::F64), regs.fpr);
    }
}
