use core::str::FromStr;
use cranelift_mips::entity::EntityRef;
use cranelift_mips::ir::types::{I32, I64};
use cranelift_mips::ir::*;
use cranelift_mips::isa::{self, Legalize, LookupError, TargetIsa};
use cranelift_mips::settings::{Configurable, SetError};
use cranelift_mips::{CodegenError, CodegenResult};
use proptest::prelude::*;
use target_lexicon::{
    Architecture, BinaryFormat, Environment, Mips64Architecture, OperatingSystem, PointerWidth,
    Triple, Vendor,
};

const TRIPLES: [&str; 6] = [
    "mips-unknown-linux-gnu",
    "mipsel-unknown-linux-gnu",
    "mipsisa32r6-unknown-linux-gnu",
    "mips64-unknown-linux-gnuabi64",
    "mips64el-unknown-linux-gnuabi64",
    "mipsisa64r6el-unknown-linux-gnuabi64",
];

fn isa_with(triple: &str, lext: Option<(bool, bool)>) -> Box<dyn TargetIsa> {
    let mut b = isa::lookup(Triple::from_str(triple).unwrap()).unwrap();
    if let Some((supports, enable)) = lext {
        b.set("supports_lext", &supports.to_string()).unwrap();
        b.set("enable_lext", &enable.to_string()).unwrap();
    }
    b.finish().unwrap()
}

fn recipe_of(isa: &dyn TargetIsa, enc: CodegenResult<isa::Encoding>) -> Option<&'static str> {
    enc.ok().map(|e| isa.encoding_info().recipe_name(e))
}

fn iconst(imm: i64) -> InstructionData {
    InstructionData::UnaryImm {
        opcode: Opcode::Iconst,
        imm: Imm64::new(imm),
    }
}

fn binary(opcode: Opcode) -> InstructionData {
    InstructionData::Binary {
        opcode,
        args: [Value::new(0), Value::new(1)],
    }
}

fn binary_imm(opcode: Opcode, imm: i64) -> InstructionData {
    InstructionData::BinaryImm {
        opcode,
        arg: Value::new(0),
        imm: Imm64::new(imm),
    }
}

/// A sample of instructions covering every format with an encoding.
fn samples(imm: i64) -> Vec<InstructionData> {
    let v0 = Value::new(0);
    let v1 = Value::new(1);
    let block = Block::new(1);
    let mut insts = vec![
        iconst(imm),
        InstructionData::Unary {
            opcode: Opcode::Copy,
            arg: v0,
        },
        InstructionData::IntCompareImm {
            opcode: Opcode::IcmpImm,
            cond: IntCC::UnsignedLessThan,
            arg: v0,
            imm: Imm64::new(imm),
        },
        InstructionData::BranchIcmp {
            opcode: Opcode::BrIcmp,
            cond: IntCC::NotEqual,
            args: [v0, v1],
            destination: block,
        },
        InstructionData::Branch {
            opcode: Opcode::Brnz,
            arg: v0,
            destination: block,
        },
    ];
    for opcode in [
        Opcode::Iadd,
        Opcode::Isub,
        Opcode::Imul,
        Opcode::Band,
        Opcode::Bxor,
        Opcode::Sshr,
    ] {
        insts.push(binary(opcode));
    }
    for opcode in [
        Opcode::IaddImm,
        Opcode::BandImm,
        Opcode::BorImm,
        Opcode::UshrImm,
    ] {
        insts.push(binary_imm(opcode, imm));
    }
    insts
}

#[test]
fn lookup_errors() {
    assert_eq!(
        isa::lookup_by_name("riscv64gc-unknown-linux-gnu").err(),
        Some(LookupError::Unsupported)
    );
    let b = isa::lookup_by_name("mipsel-unknown-linux-gnu").unwrap();
    assert_eq!(b.triple().to_string(), "mipsel-unknown-linux-gnu");
}

#[test]
fn cpu_modes() {
    for triple in TRIPLES {
        let isa = isa_with(triple, None);
        let arch = triple.split('-').next().unwrap();
        let expected = if arch.contains("64") {
            "MIPS64"
        } else {
            "MIPS32"
        };
        assert_eq!(isa.cpu_mode(), expected, "{triple}");
        assert!(isa.has_delay_slot());
    }
}

#[test]
fn mode_follows_architecture() {
    // A 64-bit CPU running a 32-bit pointer ABI, like n32.
    let triple = Triple {
        architecture: Architecture::Mips64(Mips64Architecture::Mips64el),
        vendor: Vendor::Unknown,
        operating_system: OperatingSystem::Linux,
        environment: Environment::GnuIlp32,
        binary_format: BinaryFormat::Elf,
    };
    assert_eq!(triple.pointer_width(), Ok(PointerWidth::U32));
    let isa = isa::lookup(triple).unwrap().finish().unwrap();
    assert_eq!(isa.cpu_mode(), "MIPS64");
    assert!(isa.encode(&iconst(-1), I64).is_ok());
}

#[test]
fn builder_settings() {
    let mut b = isa::lookup_by_name("mips64el-unknown-linux-gnuabi64").unwrap();
    assert_eq!(b.value("supports_lext"), Some(false));
    assert_eq!(b.value("enable_lext"), Some(true));
    assert_eq!(b.value("use_lext"), None);
    b.enable("supports_lext").unwrap();
    assert_eq!(b.value("supports_lext"), Some(true));
    assert_eq!(
        b.set("has_fpu", "true"),
        Err(SetError::BadName("has_fpu".to_string()))
    );
    assert!(matches!(b.set("enable_lext", "2"), Err(SetError::BadValue(_))));

    let isa = b.finish().unwrap();
    assert_eq!(isa.isa_flags().predicate("use_lext"), Some(true));
}

#[test]
fn lext_gating() {
    let imul = binary(Opcode::Imul);
    for (lext, expected) in [
        (None, None),
        (Some((false, true)), None),
        (Some((true, false)), None),
        (Some((false, false)), None),
        (Some((true, true)), Some("R")),
    ] {
        let isa = isa_with("mips64-unknown-linux-gnuabi64", lext);
        assert_eq!(recipe_of(&*isa, isa.encode(&imul, I32)), expected, "{lext:?}");
        assert_eq!(recipe_of(&*isa, isa.encode(&imul, I64)), expected, "{lext:?}");
    }
}

#[test]
fn variant_isolation() {
    let m32 = isa_with("mips-unknown-linux-gnu", Some((true, true)));
    let m64 = isa_with("mips64-unknown-linux-gnuabi64", Some((true, true)));
    for inst in samples(7) {
        assert_eq!(
            m32.encode(&inst, I64),
            Err(CodegenError::NoEncoding {
                opcode: inst.opcode(),
                ctrl_type: I64,
                action: Legalize::Narrow,
            })
        );
        assert!(m64.encode(&inst, I64).is_ok(), "{}", inst.opcode());

        // The 32-bit encodings are the same in both modes.
        assert_eq!(m32.encode(&inst, I32), m64.encode(&inst, I32));
        assert!(m32.encode(&inst, I32).is_ok(), "{}", inst.opcode());
    }
}

#[test]
fn floats_are_expanded() {
    let isa = isa_with("mips-unknown-linux-gnu", None);
    assert_eq!(isa.legalize_action(types::F32), Legalize::Expand);
    assert_eq!(isa.legalize_action(types::F64), Legalize::Expand);
    assert_eq!(isa.legalize_action(types::I8), Legalize::Narrow);
    assert_eq!(isa.legalize_action(types::INVALID), Legalize::Expand);
}

#[test]
fn shared_between_threads() {
    let isa = isa_with("mips64el-unknown-linux-gnuabi64", None);
    let isa: &dyn TargetIsa = &*isa;
    let expected = isa.encode(&iconst(0x8000), I64).unwrap();
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                s.spawn(move || {
                    let mine = isa.encode(&iconst(0x8000), I64).unwrap();
                    let other = isa.encode(&iconst(i), I32).unwrap();
                    (mine, isa.encoding_info().recipe_name(other))
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), (expected, "Iz"));
        }
    });
}

proptest! {
    #[test]
    fn constants_have_one_encoding(
        imm in prop_oneof![any::<i32>().prop_map(i64::from), any::<u32>().prop_map(i64::from)]
    ) {
        let isa = isa_with("mips-unknown-linux-gnu", None);
        let inst = iconst(imm);
        let expected = if (-0x8000..0x8000).contains(&imm) {
            "Iz"
        } else if (0..0x1_0000).contains(&imm) {
            "Iuz"
        } else {
            "Ilui"
        };
        prop_assert_eq!(isa.legal_encodings(&inst, I32).count(), 1);
        prop_assert_eq!(recipe_of(&*isa, isa.encode(&inst, I32)), Some(expected));
    }

    #[test]
    fn wide_constants_are_rejected(imm in 0x1_0000_0000i64..) {
        let isa = isa_with("mips64-unknown-linux-gnuabi64", None);
        prop_assert_eq!(isa.legal_encodings(&iconst(imm), I32).count(), 0);
        prop_assert_eq!(isa.legal_encodings(&iconst(imm), I64).count(), 0);
        prop_assert_eq!(isa.legal_encodings(&iconst(-imm), I64).count(), 0);
    }

    #[test]
    fn lookup_is_deterministic(
        triple in prop::sample::select(TRIPLES.to_vec()),
        lext in any::<Option<(bool, bool)>>(),
        imm in any::<i64>(),
        ty in prop::sample::select(vec![I32, I64])
    ) {
        let first = isa_with(triple, lext);
        let second = isa_with(triple, lext);
        prop_assert_eq!(first.to_string(), second.to_string());
        for inst in samples(imm) {
            let a = first.encode(&inst, ty);
            prop_assert_eq!(&a, &second.encode(&inst, ty));
            prop_assert!(first.legal_encodings(&inst, ty).count() <= 1);
            if let Ok(enc) = a {
                prop_assert_eq!(first.legal_encodings(&inst, ty).next(), Some(enc));
            }
        }
    }
}
