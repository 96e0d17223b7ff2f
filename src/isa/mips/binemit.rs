//! Emitting binary MIPS machine code.
//!
//! Encoding bits in the tables are `(shamt << 12) | (funct << 6) | opcode`. The word writers
//! below split them up again and add the register and immediate fields.

use crate::binemit::CodeSink;
use crate::isa::RegUnit;
use crate::isa::mips::registers::field;
use crate::predicates::{is_signed_int, is_unsigned_int};

/// Encoding bits for an instruction identified by its major opcode alone.
pub const fn op(opcode: u32) -> u32 {
    opf(opcode, 0)
}

/// Encoding bits for an instruction with a function code, like the `SPECIAL` group.
pub const fn opf(opcode: u32, funct: u32) -> u32 {
    opfs(opcode, funct, 0)
}

/// Encoding bits with a fixed shift amount as well.
///
/// Panics when a field doesn't fit, which makes it a compile error in a constant.
pub const fn opfs(opcode: u32, funct: u32, shamt: u32) -> u32 {
    assert!(opcode <= 0b11_1111, "opcode is 6 bits");
    assert!(funct <= 0b11_1111, "funct is 6 bits");
    assert!(shamt <= 0b1_1111, "shamt is 5 bits");
    (shamt << 12) | (funct << 6) | opcode
}

/// Decompose encoding bits into `(opcode, funct, shamt)`.
pub fn decompose_bits(bits: u32) -> (u32, u32, u32) {
    let opcode = bits & 0x3f;
    let funct = (bits >> 6) & 0x3f;
    let shamt = (bits >> 12) & 0x1f;
    (opcode, funct, shamt)
}

/// R-type instructions with the shift amount from the encoding bits.
///
///   31     25  20  15  10    5
///   opcode rs  rt  rd  shamt funct
///       26  21  16  11     6     0
pub fn put_r(bits: u32, rs: RegUnit, rt: RegUnit, rd: RegUnit, sink: &mut dyn CodeSink) {
    let (opcode, funct, shamt) = decompose_bits(bits);
    internal_put_r(opcode, funct, shamt, field(rs), field(rt), field(rd), sink);
}

/// R-type shift instructions with an immediate shift amount. The `rs` field is zero.
pub fn put_rshamt(bits: u32, rt: RegUnit, rd: RegUnit, shamt: i64, sink: &mut dyn CodeSink) {
    debug_assert!(is_unsigned_int(shamt, 5, 0), "shamt out of range {shamt:#x}");
    let (opcode, funct, _) = decompose_bits(bits);
    let shamt = (shamt & 0x1f) as u32;
    internal_put_r(opcode, funct, shamt, 0, field(rt), field(rd), sink);
}

fn internal_put_r(
    opcode: u32,
    funct: u32,
    shamt: u32,
    rs: u32,
    rt: u32,
    rd: u32,
    sink: &mut dyn CodeSink,
) {
    let mut i = funct;
    i |= shamt << 6;
    i |= rd << 11;
    i |= rt << 16;
    i |= rs << 21;
    i |= opcode << 26;

    sink.put4(i);
}

/// I-type instructions with a sign-extended immediate.
///
///   31     25  20  15
///   opcode rs  rt  immediate
///       26  21  16         0
pub fn put_i(bits: u32, rs: RegUnit, rt: RegUnit, imm: i64, sink: &mut dyn CodeSink) {
    debug_assert!(is_signed_int(imm, 16, 0), "IMM out of range {imm:#x}");
    let (opcode, _, _) = decompose_bits(bits);
    internal_put_i(opcode, field(rs), field(rt), (imm & 0xffff) as u32, sink);
}

/// I-type instructions with a zero-extended immediate.
pub fn put_iu(bits: u32, rs: RegUnit, rt: RegUnit, imm: i64, sink: &mut dyn CodeSink) {
    debug_assert!(is_unsigned_int(imm, 16, 0), "IMM out of range {imm:#x}");
    let (opcode, _, _) = decompose_bits(bits);
    internal_put_i(opcode, field(rs), field(rt), (imm & 0xffff) as u32, sink);
}

/// `REGIMM` I-type instructions, where the `rt` field selects the operation.
///
/// The selector is kept in the `funct` position of the encoding bits.
pub fn put_i_regimm(bits: u32, rs: RegUnit, imm: i64, sink: &mut dyn CodeSink) {
    debug_assert!(is_signed_int(imm, 16, 0), "IMM out of range {imm:#x}");
    let (opcode, rt, _) = decompose_bits(bits);
    internal_put_i(opcode, field(rs), rt, (imm & 0xffff) as u32, sink);
}

fn internal_put_i(opcode: u32, rs: u32, rt: u32, imm: u32, sink: &mut dyn CodeSink) {
    let mut i = imm;
    i |= rt << 16;
    i |= rs << 21;
    i |= opcode << 26;

    sink.put4(i);
}

/// J-type instructions.
///
///   31     25
///   opcode index
///       26     0
///
/// `index` is a word index that must fit in 26 bits, signed or not.
pub fn put_j(bits: u32, index: i64, sink: &mut dyn CodeSink) {
    debug_assert!(
        is_signed_int(index, 26, 0) || is_unsigned_int(index, 26, 0),
        "index out of range {index:#x}"
    );
    let (opcode, _, _) = decompose_bits(bits);

    let mut i = (index & 0x3ff_ffff) as u32;
    i |= opcode << 26;

    sink.put4(i);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binemit::MemoryCodeSink;
    use crate::isa::mips::registers::{A0, RA, V0, ZERO};
    use proptest::prelude::*;
    use target_lexicon::Endianness;

    fn word(emit: impl FnOnce(&mut dyn CodeSink)) -> u32 {
        let mut sink = MemoryCodeSink::new(Endianness::Big);
        emit(&mut sink);
        let bytes: [u8; 4] = sink.data().try_into().unwrap();
        u32::from_be_bytes(bytes)
    }

    #[test]
    fn known_words() {
        // addu $v0, $a0, $a1
        assert_eq!(
            word(|s| put_r(opf(0, 0b100001), A0, A0 + 1, V0, s)),
            0x0085_1021
        );
        // addiu $v0, $a0, -10
        assert_eq!(word(|s| put_i(op(0b001001), A0, V0, -10, s)), 0x2482_fff6);
        // jr $ra
        assert_eq!(
            word(|s| put_r(opf(0, 0b001000), RA, ZERO, ZERO, s)),
            0x03e0_0008
        );
        // sll $v0, $a0, 4
        assert_eq!(word(|s| put_rshamt(opf(0, 0), A0, V0, 4, s)), 0x0004_1100);
        // lui $v0, 0x8000
        assert_eq!(
            word(|s| put_iu(op(0b001111), ZERO, V0, 0x8000, s)),
            0x3c02_8000
        );
        // j with word index 0x40
        assert_eq!(word(|s| put_j(op(0b000010), 0x40, s)), 0x0800_0040);
        // nop
        assert_eq!(word(|s| put_r(opf(0, 0), ZERO, ZERO, ZERO, s)), 0);
        // bgez $a0, -1
        assert_eq!(
            word(|s| put_i_regimm(opf(0b000001, 0b00001), A0, -1, s)),
            0x0481_ffff
        );
        // bltz $zero, 3
        assert_eq!(
            word(|s| put_i_regimm(opf(0b000001, 0b00000), ZERO, 3, s)),
            0x0400_0003
        );
    }

    #[test]
    fn fixed_shamt_from_bits() {
        // dsll32 $v0, $a0, 1 can also be written with the shift amount in the bits.
        assert_eq!(
            word(|s| put_r(opfs(0, 0b111100, 1), ZERO, A0, V0, s)),
            0x0004_107c
        );
    }

    #[test]
    fn negative_index() {
        assert_eq!(word(|s| put_j(op(0b000010), -1, s)), 0x0bff_ffff);
    }

    #[test]
    #[should_panic(expected = "funct is 6 bits")]
    fn funct_overflow() {
        opf(0, 64);
    }

    #[test]
    #[should_panic(expected = "opcode is 6 bits")]
    fn opcode_overflow() {
        op(0b100_0000);
    }

    #[test]
    #[should_panic(expected = "shamt is 5 bits")]
    fn shamt_overflow() {
        opfs(0, 0, 32);
    }

    proptest! {
        #[test]
        fn bits_round_trip(opcode in 0u32..64, funct in 0u32..64, shamt in 0u32..32) {
            prop_assert_eq!(decompose_bits(opfs(opcode, funct, shamt)), (opcode, funct, shamt));
            prop_assert_eq!(decompose_bits(opf(opcode, funct)), (opcode, funct, 0));
            prop_assert_eq!(decompose_bits(op(opcode)), (opcode, 0, 0));
        }

        #[test]
        fn signed_immediate_field(imm in -0x8000i64..0x8000) {
            let w = word(|s| put_i(op(0b001001), ZERO, V0, imm, s));
            prop_assert_eq!(i64::from(w as u16 as i16), imm);
        }
    }
}
