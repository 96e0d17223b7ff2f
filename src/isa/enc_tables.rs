//! Support types for the encoding tables of a target ISA.
//!
//! Each CPU mode of a target has its own table of encodings, built once by a `CpuModeBuilder`
//! and then sealed into an immutable `CpuMode`. A lookup tries the entries for an opcode and
//! controlling type in registration order and yields those whose predicates hold.

use crate::entity::EntityRef;
use crate::ir::{InstructionData, Opcode, Type, types};
use crate::isa::Legalize;
use crate::isa::encoding::Encoding;
use crate::isa::recipe::{RecipeIndex, Recipes};
use crate::predicates::InstPredicate;
use crate::result::BuildError;
use crate::settings::{PredicateView, SettingGroup, SettingPredicateNumber};
use core::fmt;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// How to legalize instructions that have no encoding in a CPU mode.
///
/// Monomorphic instructions always use the `monomorphic` action. Polymorphic instructions use
/// the action configured for their controlling type, or the default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegalizePolicy {
    monomorphic: Legalize,
    default: Legalize,
    typed: FxHashMap<Type, Legalize>,
}

impl LegalizePolicy {
    /// Create a policy with no per-type actions.
    pub fn new(monomorphic: Legalize, default: Legalize) -> Self {
        Self {
            monomorphic,
            default,
            typed: FxHashMap::default(),
        }
    }

    /// Use `action` for instructions controlled by `ty`.
    pub fn legalize_type(&mut self, ty: Type, action: Legalize) -> Result<(), BuildError> {
        if ty.is_invalid() || self.typed.contains_key(&ty) {
            return Err(BuildError::DuplicateLegalize(ty));
        }
        self.typed.insert(ty, action);
        Ok(())
    }

    /// The action for instructions whose controlling type is `ctrl_type`.
    ///
    /// `types::INVALID` selects the monomorphic action.
    pub fn action_for(&self, ctrl_type: Type) -> Legalize {
        if ctrl_type == types::INVALID {
            self.monomorphic
        } else {
            self.typed.get(&ctrl_type).copied().unwrap_or(self.default)
        }
    }

    /// The monomorphic action.
    pub fn monomorphic(&self) -> Legalize {
        self.monomorphic
    }

    /// The action for types without a specific action.
    pub fn default_action(&self) -> Legalize {
        self.default
    }
}

/// One entry in the encoding table of a CPU mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodingEntry {
    /// The encoded opcode.
    pub opcode: Opcode,
    /// The controlling type, `INVALID` for monomorphic opcodes.
    pub ctrl_type: Type,
    /// Recipe used to emit the instruction.
    pub recipe: RecipeIndex,
    /// Recipe-specific encoding bits.
    pub bits: u32,
    /// Additional predicate on the instruction fields.
    pub inst_predicate: Option<InstPredicate>,
    /// Setting predicate that must hold for the entry to be used.
    pub isa_predicate: Option<SettingPredicateNumber>,
}

impl EncodingEntry {
    /// The encoding produced by this entry.
    pub fn encoding(&self) -> Encoding {
        Encoding::new(self.recipe, self.bits)
    }
}

/// An entry being registered, with its setting predicate still named.
#[derive(Clone, Debug)]
pub struct PendingEncoding {
    opcode: Opcode,
    ctrl_type: Type,
    recipe: RecipeIndex,
    bits: u32,
    inst_predicate: Option<InstPredicate>,
    isa_predicate: Option<&'static str>,
}

impl PendingEncoding {
    /// Only use this encoding when `predicate` holds for the instruction.
    pub fn inst_predicate(&mut self, predicate: InstPredicate) -> &mut Self {
        self.inst_predicate = Some(match self.inst_predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Only use this encoding when the setting or setting predicate `name` is true.
    pub fn isa_predicate(&mut self, name: &'static str) -> &mut Self {
        self.isa_predicate = Some(name);
        self
    }
}

/// Builder for the encoding table of one CPU mode.
///
/// Entries are checked against their recipes and the setting group when the mode is finished.
pub struct CpuModeBuilder<'a> {
    name: &'static str,
    recipes: &'a Recipes,
    settings: &'a SettingGroup,
    legalize: LegalizePolicy,
    entries: Vec<PendingEncoding>,
}

impl<'a> CpuModeBuilder<'a> {
    /// Start a CPU mode named `name` with encodings using `recipes`, gated by predicates from
    /// `settings`.
    pub fn new(
        name: &'static str,
        recipes: &'a Recipes,
        settings: &'a SettingGroup,
        legalize: LegalizePolicy,
    ) -> Self {
        Self {
            name,
            recipes,
            settings,
            legalize,
            entries: Vec::new(),
        }
    }

    /// Add an encoding of `opcode.ctrl_type` with `recipe` and `bits`.
    pub fn enc(
        &mut self,
        opcode: Opcode,
        ctrl_type: Type,
        recipe: RecipeIndex,
        bits: u32,
    ) -> &mut PendingEncoding {
        self.entries.push(PendingEncoding {
            opcode,
            ctrl_type,
            recipe,
            bits,
            inst_predicate: None,
            isa_predicate: None,
        });
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    /// Access the legalization policy.
    pub fn legalize(&mut self) -> &mut LegalizePolicy {
        &mut self.legalize
    }

    fn check(&self, pending: PendingEncoding) -> Result<EncodingEntry, BuildError> {
        let PendingEncoding {
            opcode,
            ctrl_type,
            recipe,
            bits,
            inst_predicate,
            isa_predicate,
        } = pending;

        let r = self
            .recipes
            .get(recipe)
            .ok_or(BuildError::UnknownRecipe(recipe.index()))?;

        if r.format() != opcode.format() {
            return Err(BuildError::FormatMismatch {
                opcode,
                recipe: r.name(),
            });
        }
        if r.outs().len() != opcode.num_results() {
            return Err(BuildError::ArityMismatch {
                recipe: r.name(),
                kind: "outputs",
                declared: r.outs().len(),
                expected: opcode.num_results(),
            });
        }
        if opcode.is_polymorphic() == ctrl_type.is_invalid() {
            return Err(BuildError::BadControllingType { opcode, ctrl_type });
        }
        if let Some(p) = &inst_predicate {
            if !p.applies_to(opcode.format()) {
                return Err(BuildError::PredicateFormat {
                    opcode,
                    predicate: p.to_string(),
                });
            }
        }
        let isa_predicate = match isa_predicate {
            Some(name) => Some(
                self.settings
                    .predicate_number(name)
                    .ok_or(BuildError::UnknownPredicate(name))?,
            ),
            None => None,
        };

        Ok(EncodingEntry {
            opcode,
            ctrl_type,
            recipe,
            bits,
            inst_predicate,
            isa_predicate,
        })
    }

    /// Check all entries and seal the CPU mode.
    pub fn finish(self) -> Result<CpuMode, BuildError> {
        let mut entries = Vec::with_capacity(self.entries.len());
        let mut index: FxHashMap<(Opcode, Type), SmallVec<[usize; 4]>> = FxHashMap::default();
        for pending in self.entries.iter().cloned() {
            let entry = self.check(pending)?;
            index
                .entry((entry.opcode, entry.ctrl_type))
                .or_default()
                .push(entries.len());
            entries.push(entry);
        }
        log::trace!(
            "sealed cpu mode {} with {} encodings",
            self.name,
            entries.len()
        );
        Ok(CpuMode {
            name: self.name,
            entries,
            index,
            legalize: self.legalize,
        })
    }
}

/// The sealed encoding table and legalization policy of one CPU mode.
#[derive(Clone)]
pub struct CpuMode {
    name: &'static str,
    entries: Vec<EncodingEntry>,
    index: FxHashMap<(Opcode, Type), SmallVec<[usize; 4]>>,
    legalize: LegalizePolicy,
}

impl CpuMode {
    /// Name of this CPU mode.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// All entries in registration order.
    pub fn entries(&self) -> &[EncodingEntry] {
        &self.entries
    }

    /// The legalization policy of this mode.
    pub fn legalize_policy(&self) -> &LegalizePolicy {
        &self.legalize
    }

    /// Iterate over the legal encodings of `inst` with controlling type `ctrl_type`.
    ///
    /// Encodings are produced in registration order. An entry is skipped when its setting
    /// predicate is false in `view`, when its instruction predicate is false, or when its recipe
    /// doesn't accept the operands of `inst`.
    pub fn legal_encodings<'a>(
        &'a self,
        recipes: &'a Recipes,
        inst: &'a InstructionData,
        ctrl_type: Type,
        view: PredicateView<'a>,
    ) -> Encodings<'a> {
        let candidates = self
            .index
            .get(&(inst.opcode(), ctrl_type))
            .map_or(&[][..], |v| &v[..]);
        Encodings {
            mode: self,
            recipes,
            inst,
            view,
            candidates,
        }
    }
}

impl fmt::Debug for CpuMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CpuMode")
            .field("name", &self.name)
            .field("entries", &self.entries.len())
            .field("legalize", &self.legalize)
            .finish()
    }
}

/// An iterator over legal encodings for an instruction.
#[derive(Clone)]
pub struct Encodings<'a> {
    mode: &'a CpuMode,
    recipes: &'a Recipes,
    inst: &'a InstructionData,
    view: PredicateView<'a>,
    candidates: &'a [usize],
}

impl<'a> Encodings<'a> {
    fn matches(&self, entry: &EncodingEntry) -> bool {
        if let Some(p) = entry.isa_predicate {
            if !self.view.test(usize::from(p)) {
                return false;
            }
        }
        if let Some(p) = &entry.inst_predicate {
            if !p.eval(self.inst) {
                return false;
            }
        }
        self.recipes
            .get(entry.recipe)
            .is_some_and(|recipe| recipe.accepts(self.inst))
    }
}

impl Iterator for Encodings<'_> {
    type Item = Encoding;

    fn next(&mut self) -> Option<Encoding> {
        while let Some((&first, rest)) = self.candidates.split_first() {
            self.candidates = rest;
            let entry = &self.mode.entries[first];
            if self.matches(entry) {
                return Some(entry.encoding());
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.candidates.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::{I32, I64};
    use crate::ir::{Imm64, InstructionFormat, IntCC, Value};
    use crate::isa::constraints::{ImmShape, OperandConstraint};
    use crate::isa::recipe::RecipeBuilder;
    use crate::isa::registers::{RegBank, RegInfoBuilder, RegNames};
    use crate::settings::{Builder, Configurable, Flags, SettingGroupBuilder};
    use std::sync::Arc;

    struct Fixture {
        recipes: Recipes,
        r: RecipeIndex,
        i: RecipeIndex,
        iconst: RecipeIndex,
        settings: Arc<SettingGroup>,
    }

    fn fixture() -> Fixture {
        let mut regs = RegInfoBuilder::new();
        let bank = regs
            .add_bank(RegBank::new("Ints", 8, RegNames::Prefix("r"), true).unwrap())
            .unwrap();
        let gpr = regs.add_class("GPR", bank).unwrap();
        let reg = OperandConstraint::reg(gpr);

        let mut recipes = Recipes::new();
        let r = recipes.push(
            RecipeBuilder::new("R", InstructionFormat::Binary, 4)
                .operands_in(vec![reg, reg])
                .operands_out(vec![reg])
                .build()
                .unwrap(),
        );
        let i = recipes.push(
            RecipeBuilder::new("I", InstructionFormat::BinaryImm, 4)
                .operands_in(vec![reg])
                .operands_out(vec![reg])
                .imm(ImmShape::signed(16))
                .build()
                .unwrap(),
        );
        let iconst = recipes.push(
            RecipeBuilder::new("Iz", InstructionFormat::UnaryImm, 4)
                .operands_out(vec![reg])
                .imm(ImmShape::signed(16))
                .build()
                .unwrap(),
        );

        let mut group = SettingGroupBuilder::new("test");
        let ext = group.add_bool("has_ext", "Extension.", false);
        group.add_predicate("use_ext", ext);
        Fixture {
            recipes,
            r,
            i,
            iconst,
            settings: Arc::new(group.build().unwrap()),
        }
    }

    fn binary(opcode: Opcode) -> InstructionData {
        InstructionData::Binary {
            opcode,
            args: [Value::new(0), Value::new(1)],
        }
    }

    fn iadd_imm(imm: i64) -> InstructionData {
        InstructionData::BinaryImm {
            opcode: Opcode::IaddImm,
            arg: Value::new(0),
            imm: Imm64::new(imm),
        }
    }

    #[test]
    fn legalize_policy() {
        let mut policy = LegalizePolicy::new(Legalize::Expand, Legalize::Narrow);
        policy.legalize_type(I32, Legalize::Expand).unwrap();
        assert_eq!(
            policy.legalize_type(I32, Legalize::Narrow),
            Err(BuildError::DuplicateLegalize(I32))
        );
        assert_eq!(policy.action_for(types::INVALID), Legalize::Expand);
        assert_eq!(policy.action_for(I32), Legalize::Expand);
        assert_eq!(policy.action_for(I64), Legalize::Narrow);
        assert_eq!(policy.action_for(types::I8), Legalize::Narrow);
    }

    #[test]
    fn registration_order() {
        let fx = fixture();
        let mut mode = CpuModeBuilder::new(
            "test",
            &fx.recipes,
            &fx.settings,
            LegalizePolicy::new(Legalize::Expand, Legalize::Narrow),
        );
        mode.enc(Opcode::Iadd, I32, fx.r, 0x21);
        mode.enc(Opcode::Iadd, I32, fx.r, 0x2d).isa_predicate("use_ext");
        mode.enc(Opcode::IaddImm, I32, fx.i, 0x09);
        let mode = mode.finish().unwrap();
        assert_eq!(mode.entries().len(), 3);

        let flags = Flags::new(Builder::new(fx.settings.clone()));
        let inst = binary(Opcode::Iadd);
        let encs: Vec<_> = mode
            .legal_encodings(&fx.recipes, &inst, I32, flags.predicate_view())
            .map(|e| e.bits())
            .collect();
        assert_eq!(encs, [0x21]);

        let mut builder = Builder::new(fx.settings.clone());
        builder.enable("has_ext").unwrap();
        let flags = Flags::new(builder);
        let encs: Vec<_> = mode
            .legal_encodings(&fx.recipes, &inst, I32, flags.predicate_view())
            .map(|e| e.bits())
            .collect();
        assert_eq!(encs, [0x21, 0x2d]);

        // Wrong type, wrong opcode.
        assert_eq!(
            mode.legal_encodings(&fx.recipes, &inst, I64, flags.predicate_view())
                .count(),
            0
        );
        let isub = binary(Opcode::Isub);
        assert_eq!(
            mode.legal_encodings(&fx.recipes, &isub, I32, flags.predicate_view())
                .count(),
            0
        );
    }

    #[test]
    fn recipe_rejects_immediate() {
        let fx = fixture();
        let mut mode = CpuModeBuilder::new(
            "test",
            &fx.recipes,
            &fx.settings,
            LegalizePolicy::new(Legalize::Expand, Legalize::Narrow),
        );
        mode.enc(Opcode::IaddImm, I32, fx.i, 0x09);
        let mode = mode.finish().unwrap();
        let flags = Flags::new(Builder::new(fx.settings.clone()));

        let small = iadd_imm(-32768);
        assert_eq!(
            mode.legal_encodings(&fx.recipes, &small, I32, flags.predicate_view())
                .next(),
            Some(Encoding::new(fx.i, 0x09))
        );
        let big = iadd_imm(32768);
        assert_eq!(
            mode.legal_encodings(&fx.recipes, &big, I32, flags.predicate_view())
                .next(),
            None
        );
    }

    #[test]
    fn entry_predicates() {
        let fx = fixture();
        let mut mode = CpuModeBuilder::new(
            "test",
            &fx.recipes,
            &fx.settings,
            LegalizePolicy::new(Legalize::Expand, Legalize::Narrow),
        );
        mode.enc(Opcode::IaddImm, I32, fx.i, 0x09)
            .inst_predicate(InstPredicate::unsigned_imm(8));
        let mode = mode.finish().unwrap();
        let flags = Flags::new(Builder::new(fx.settings.clone()));
        let view = flags.predicate_view();
        assert_eq!(
            mode.legal_encodings(&fx.recipes, &iadd_imm(255), I32, view)
                .count(),
            1
        );
        assert_eq!(
            mode.legal_encodings(&fx.recipes, &iadd_imm(-1), I32, view)
                .count(),
            0
        );
    }

    fn finish_one(
        fx: &Fixture,
        f: impl FnOnce(&mut CpuModeBuilder<'_>),
    ) -> Result<(), BuildError> {
        let policy = LegalizePolicy::new(Legalize::Expand, Legalize::Narrow);
        let mut mode = CpuModeBuilder::new("test", &fx.recipes, &fx.settings, policy);
        f(&mut mode);
        mode.finish().map(|_| ())
    }

    #[test]
    fn bad_entries() {
        let fx = fixture();
        assert_eq!(
            finish_one(&fx, |m| {
                m.enc(Opcode::Iadd, I32, fx.i, 0);
            }),
            Err(BuildError::FormatMismatch {
                opcode: Opcode::Iadd,
                recipe: "I"
            })
        );
        assert_eq!(
            finish_one(&fx, |m| {
                m.enc(Opcode::Iadd, I32, RecipeIndex::new(17), 0);
            }),
            Err(BuildError::UnknownRecipe(17))
        );
        assert_eq!(
            finish_one(&fx, |m| {
                m.enc(Opcode::Iadd, types::INVALID, fx.r, 0);
            }),
            Err(BuildError::BadControllingType {
                opcode: Opcode::Iadd,
                ctrl_type: types::INVALID
            })
        );
        assert_eq!(
            finish_one(&fx, |m| {
                m.enc(Opcode::Iadd, I32, fx.r, 0).isa_predicate("nope");
            }),
            Err(BuildError::UnknownPredicate("nope"))
        );
        assert!(matches!(
            finish_one(&fx, |m| {
                m.enc(Opcode::Iadd, I32, fx.r, 0)
                    .inst_predicate(InstPredicate::cond(IntCC::Equal));
            }),
            Err(BuildError::PredicateFormat {
                opcode: Opcode::Iadd,
                ..
            })
        ));
        assert_eq!(
            finish_one(&fx, |m| {
                m.enc(Opcode::Iconst, I32, fx.iconst, 0);
            }),
            Ok(())
        );
    }
}
