use core::str::FromStr;
use cranelift_mips::binemit::{compute_offsets, emit_to_memory};
use cranelift_mips::entity::EntityRef;
use cranelift_mips::ir::types::I32;
use cranelift_mips::ir::*;
use cranelift_mips::isa::mips::registers::{A0, V0, ZERO};
use cranelift_mips::isa::{self, Legalize, TargetIsa};
use cranelift_mips::{CodegenError, legalize_function};
use smallvec::SmallVec;
use target_lexicon::Triple;

fn isa(triple: &str) -> Box<dyn TargetIsa> {
    isa::lookup(Triple::from_str(triple).unwrap())
        .unwrap()
        .finish()
        .unwrap()
}

fn no_rewrites(_: &mut Function, inst: Inst, action: Legalize) -> bool {
    panic!("unexpected legalization of {inst} by {action}")
}

fn encode(func: &mut Function, isa: &dyn TargetIsa) {
    legalize_function(func, isa, &mut no_rewrites).unwrap();
}

fn iconst(imm: i64) -> InstructionData {
    InstructionData::UnaryImm {
        opcode: Opcode::Iconst,
        imm: Imm64::new(imm),
    }
}

fn nop() -> InstructionData {
    InstructionData::Nullary {
        opcode: Opcode::Nop,
    }
}

fn ret() -> InstructionData {
    InstructionData::MultiAry {
        opcode: Opcode::Return,
        args: SmallVec::new(),
    }
}

fn brz(arg: Value, destination: Block) -> InstructionData {
    InstructionData::Branch {
        opcode: Opcode::Brz,
        arg,
        destination,
    }
}

fn jump(destination: Block) -> InstructionData {
    InstructionData::Jump {
        opcode: Opcode::Jump,
        destination,
    }
}

fn words(code: &[u8], from_bytes: fn([u8; 4]) -> u32) -> Vec<u32> {
    code.chunks(4)
        .map(|w| from_bytes(w.try_into().unwrap()))
        .collect()
}

/// ```text
/// block0:
///     v0 = iconst.i32 0x0001_2345   ; %v0
///     v1 = iadd_imm v0, -1          ; %a0
///     brz v1, block1
/// block1:
///     return
/// ```
fn small_function() -> Function {
    let mut func = Function::with_name("small");
    let block0 = func.create_block();
    let block1 = func.create_block();
    let v0 = func.make_value(I32);
    let v1 = func.make_value(I32);
    func.append_inst(block0, iconst(0x1_2345), I32, &[v0]);
    func.append_inst(
        block0,
        InstructionData::BinaryImm {
            opcode: Opcode::IaddImm,
            arg: v0,
            imm: Imm64::new(-1),
        },
        I32,
        &[v1],
    );
    func.append_inst(block0, brz(v1, block1), I32, &[]);
    func.append_inst(block1, ret(), types::INVALID, &[]);
    func.set_value_loc(v0, ValueLoc::Reg(V0));
    func.set_value_loc(v1, ValueLoc::Reg(A0));
    func
}

const SMALL_WORDS: [u32; 5] = [
    0x3c02_0001, // lui $v0, 0x1
    0x3442_2345, // ori $v0, $v0, 0x2345
    0x2444_ffff, // addiu $a0, $v0, -1
    0x1080_0000, // beq $a0, $zero, +0
    0x03e0_0008, // jr $ra
];

#[test]
fn big_endian_function() {
    let isa = isa("mips-unknown-linux-gnu");
    let mut func = small_function();
    encode(&mut func, &*isa);
    let code = emit_to_memory(&mut func, &*isa).unwrap();
    assert_eq!(code.len(), 20);
    assert_eq!(&code[..4], &[0x3c, 0x02, 0x00, 0x01]);
    assert_eq!(words(&code, u32::from_be_bytes), SMALL_WORDS);
    assert_eq!(func.offsets[Block::new(1)], 16);
}

#[test]
fn little_endian_function() {
    let isa = isa("mips64el-unknown-linux-gnuabi64");
    let mut func = small_function();
    encode(&mut func, &*isa);
    let code = emit_to_memory(&mut func, &*isa).unwrap();
    assert_eq!(&code[16..], &[0x08, 0x00, 0xe0, 0x03]);
    assert_eq!(words(&code, u32::from_le_bytes), SMALL_WORDS);
}

/// A `brz` at `before` bytes of nops, followed by `between` nops before its destination.
fn branch_over(before: usize, between: usize) -> Function {
    let mut func = Function::with_name("branch");
    let block0 = func.create_block();
    let block1 = func.create_block();
    let v0 = func.make_value(I32);
    func.set_value_loc(v0, ValueLoc::Reg(A0));
    for _ in 0..before / 4 {
        func.append_inst(block0, nop(), types::INVALID, &[]);
    }
    func.append_inst(block0, brz(v0, block1), I32, &[]);
    for _ in 0..between {
        func.append_inst(block0, nop(), types::INVALID, &[]);
    }
    func.append_inst(block1, ret(), types::INVALID, &[]);
    func
}

#[test]
fn branch_offset_field() {
    let isa = isa("mips-unknown-linux-gnu");
    let mut func = branch_over(0x100, 7);
    encode(&mut func, &*isa);
    let code = emit_to_memory(&mut func, &*isa).unwrap();
    assert_eq!(func.offsets[Block::new(1)], 0x120);
    let words = words(&code, u32::from_be_bytes);
    // beq $a0, $zero, 7
    assert_eq!(words[0x40], 0x1080_0007);
    assert!(words[0x41..0x48].iter().all(|&w| w == 0));
}

#[test]
fn longest_branch() {
    let isa = isa("mips-unknown-linux-gnu");
    let mut func = branch_over(0, 0x7fff);
    encode(&mut func, &*isa);
    let code = emit_to_memory(&mut func, &*isa).unwrap();
    assert_eq!(words(&code, u32::from_be_bytes)[0], 0x1080_7fff);
}

#[test]
fn branch_out_of_range() {
    let isa = isa("mips-unknown-linux-gnu");
    let mut func = branch_over(0, 0x8000);
    encode(&mut func, &*isa);
    assert_eq!(
        compute_offsets(&mut func, &*isa),
        Err(CodegenError::BranchRange {
            recipe: "Icz",
            displacement: 0x2_0000,
        })
    );
}

#[test]
fn jumps() {
    let isa = isa("mipsel-unknown-linux-gnu");
    let mut func = Function::with_name("jumps");
    let block0 = func.create_block();
    let block1 = func.create_block();
    let block2 = func.create_block();
    func.append_inst(block0, jump(block2), types::INVALID, &[]);
    func.append_inst(block1, jump(block0), types::INVALID, &[]);
    func.append_inst(block2, jump(block1), types::INVALID, &[]);
    encode(&mut func, &*isa);
    let code = emit_to_memory(&mut func, &*isa).unwrap();
    // b +1; b -2; b -2
    assert_eq!(
        words(&code, u32::from_le_bytes),
        [0x0401_0001, 0x0401_fffe, 0x0401_fffe]
    );
}

/// A `jump` over `between` nops.
fn jump_over(between: usize) -> Function {
    let mut func = Function::with_name("far");
    let block0 = func.create_block();
    let block1 = func.create_block();
    func.append_inst(block0, jump(block1), types::INVALID, &[]);
    for _ in 0..between {
        func.append_inst(block0, nop(), types::INVALID, &[]);
    }
    func.append_inst(block1, ret(), types::INVALID, &[]);
    func
}

#[test]
fn far_jumps_are_relaxed() {
    let isa = isa("mips-unknown-linux-gnu");
    let encinfo = isa.encoding_info();
    let jump = Inst::new(0);

    let mut near = jump_over(0x7fff);
    encode(&mut near, &*isa);
    assert_eq!(encinfo.recipe_name(near.encodings[jump]), "Icrz");
    let code = emit_to_memory(&mut near, &*isa).unwrap();
    assert_eq!(encinfo.recipe_name(near.encodings[jump]), "Icrz");
    // bgez $zero, 0x7fff
    assert_eq!(words(&code, u32::from_be_bytes)[0], 0x0401_7fff);

    let mut far = jump_over(0x8000);
    encode(&mut far, &*isa);
    assert_eq!(encinfo.recipe_name(far.encodings[jump]), "Icrz");
    let code = emit_to_memory(&mut far, &*isa).unwrap();
    assert_eq!(encinfo.recipe_name(far.encodings[jump]), "J");
    assert_eq!(far.offsets[Block::new(1)], 0x2_0004);
    // j with word index 0x8001
    assert_eq!(words(&code, u32::from_be_bytes)[0], 0x0800_8001);
}

#[test]
fn stack_slots_are_not_emitted() {
    let isa = isa("mips-unknown-linux-gnu");
    let mut func = Function::with_name("spill");
    let block = func.create_block();
    let v0 = func.make_value(I32);
    let v1 = func.make_value(I32);
    let spill = InstructionData::Unary {
        opcode: Opcode::Spill,
        arg: v0,
    };
    func.append_inst(block, spill, I32, &[v1]);
    func.set_value_loc(v0, ValueLoc::Reg(A0));
    func.set_value_loc(v1, ValueLoc::Stack(StackSlot::new(0)));
    encode(&mut func, &*isa);
    assert_eq!(
        emit_to_memory(&mut func, &*isa),
        Err(CodegenError::UnimplementedRecipe("GPsp"))
    );

    // The constraints are checked before the missing emitter is noticed.
    func.set_value_loc(v1, ValueLoc::Reg(V0));
    assert_eq!(
        emit_to_memory(&mut func, &*isa),
        Err(CodegenError::BadOperandLocation {
            recipe: "GPsp",
            value: v1,
        })
    );
}

#[test]
fn missing_encoding() {
    let isa = isa("mips-unknown-linux-gnu");
    let mut func = small_function();
    assert_eq!(
        compute_offsets(&mut func, &*isa),
        Err(CodegenError::Unencoded(Inst::new(0)))
    );
}

#[test]
fn unassigned_operand() {
    let isa = isa("mips-unknown-linux-gnu");
    let mut func = small_function();
    encode(&mut func, &*isa);
    let v1 = Value::new(1);
    func.set_value_loc(v1, ValueLoc::Unassigned);
    assert_eq!(
        emit_to_memory(&mut func, &*isa),
        Err(CodegenError::BadOperandLocation { recipe: "I", value: v1 })
    );
}

#[test]
fn legalize_then_emit() {
    let isa = isa("mips-unknown-linux-gnu");
    let mut func = Function::with_name("expand");
    let block = func.create_block();
    let v0 = func.make_value(I32);
    let v1 = func.make_value(I32);
    let add = func.append_inst(
        block,
        InstructionData::BinaryImm {
            opcode: Opcode::IaddImm,
            arg: v0,
            imm: Imm64::new(0x1_2345),
        },
        I32,
        &[v1],
    );

    // Materialize the immediate that doesn't fit `addiu`.
    let mut actions = Vec::new();
    let mut expand = |func: &mut Function, inst: Inst, action: Legalize| {
        actions.push(action);
        let InstructionData::BinaryImm { opcode, arg, imm } = *func.inst_data(inst) else {
            return false;
        };
        assert_eq!(opcode, Opcode::IaddImm);
        let ty = func.ctrl_type(inst);
        let tmp = func.make_value(ty);
        func.set_value_loc(tmp, ValueLoc::Reg(V0 + 1));
        func.insert_inst_before(inst, iconst(imm.bits()), ty, &[tmp]);
        func.replace_inst(
            inst,
            InstructionData::Binary {
                opcode: Opcode::Iadd,
                args: [arg, tmp],
            },
            ty,
        );
        true
    };
    legalize_function(&mut func, &*isa, &mut expand).unwrap();
    assert_eq!(actions, [Legalize::Expand]);
    assert_eq!(func.block_insts(block).len(), 2);
    assert_eq!(func.block_insts(block)[1], add);

    func.set_value_loc(v0, ValueLoc::Reg(A0));
    func.set_value_loc(v1, ValueLoc::Reg(V0));
    let code = emit_to_memory(&mut func, &*isa).unwrap();
    assert_eq!(
        words(&code, u32::from_be_bytes),
        [
            0x3c03_0001, // lui $v1, 0x1
            0x3463_2345, // ori $v1, $v1, 0x2345
            0x0083_1021, // addu $v0, $a0, $v1
        ]
    );
}

#[test]
fn narrow_on_mips32() {
    let isa = isa("mipsel-unknown-linux-gnu");
    let mut func = Function::with_name("narrow");
    let block = func.create_block();
    let v0 = func.make_value(types::I64);
    func.append_inst(block, iconst(1), types::I64, &[v0]);

    let mut seen = None;
    let mut give_up = |_: &mut Function, _: Inst, action: Legalize| {
        seen = Some(action);
        false
    };
    assert_eq!(
        legalize_function(&mut func, &*isa, &mut give_up),
        Err(CodegenError::LegalizationStuck(Opcode::Iconst))
    );
    assert_eq!(seen, Some(Legalize::Narrow));
}

#[test]
fn zero_register_results_are_rejected() {
    let isa = isa("mips-unknown-linux-gnu");
    let mut func = small_function();
    encode(&mut func, &*isa);
    func.set_value_loc(Value::new(0), ValueLoc::Reg(ZERO));
    assert_eq!(
        emit_to_memory(&mut func, &*isa),
        Err(CodegenError::BadOperandLocation {
            recipe: "Ilui",
            value: Value::new(0),
        })
    );
}
