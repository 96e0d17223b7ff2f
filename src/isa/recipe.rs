//! Encoding recipes.
//!
//! A recipe describes how an instruction of a given format is turned into machine code: which
//! registers its operands must live in, which immediates it can represent, how many bytes it
//! produces, and the function that writes those bytes.
//!
//! Many different instructions can be encoded by the same recipe, but they must all have the same
//! instruction format. The encoding bits stored in the encoding table supply the opcode fields
//! that distinguish them.

use crate::binemit::{CodeOffset, CodeSink};
use crate::entity::{PrimaryMap, entity_impl};
use crate::ir::{InstructionData, InstructionFormat};
use crate::isa::RegUnit;
use crate::isa::constraints::{BranchRange, ConstraintKind, ImmShape, OperandConstraint};
use crate::predicates::InstPredicate;
use crate::result::{BuildError, CodegenError, CodegenResult};
use core::fmt;

/// Emission function for a recipe.
///
/// Emitters are pure functions of the context: they write the same bytes for the same bound
/// registers, immediate, and offsets.
pub type EmitFn = fn(&EmitContext<'_>, &mut dyn CodeSink) -> CodegenResult<()>;

/// Everything an emission function needs to know about the instruction being emitted.
#[derive(Clone, Debug)]
pub struct EmitContext<'a> {
    /// Name of the recipe being emitted.
    pub recipe: &'static str,
    /// The encoding bits from the encoding table.
    pub bits: u32,
    /// Register units bound to the register operands, in operand order.
    pub ins: &'a [RegUnit],
    /// Register units bound to the register results, in result order.
    pub outs: &'a [RegUnit],
    /// The immediate operand, or 0 if the format doesn't have one.
    pub imm: i64,
    /// Code offset of this instruction.
    pub offset: CodeOffset,
    /// Code offset of the branch destination, or 0 if this isn't a branch.
    pub dest: CodeOffset,
    /// The branch range of the recipe.
    pub branch_range: Option<BranchRange>,
}

impl EmitContext<'_> {
    /// Get the branch displacement in bytes, checking that it is in range.
    ///
    /// The displacement is `dest - offset - origin` where `origin` is the fixed adjustment of the
    /// recipe's branch range.
    pub fn displacement(&self) -> CodegenResult<i64> {
        match self.branch_range {
            Some(range) => {
                let displacement = range.displacement(self.offset, self.dest);
                if range.contains(self.offset, self.dest) {
                    Ok(displacement)
                } else {
                    Err(CodegenError::BranchRange {
                        recipe: self.recipe,
                        displacement,
                    })
                }
            }
            None => Ok(i64::from(self.dest) - i64::from(self.offset)),
        }
    }
}

/// An opaque reference to a recipe in a target's recipe table.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecipeIndex(u32);
entity_impl!(RecipeIndex, "recipe");

/// All the recipes of a target.
pub type Recipes = PrimaryMap<RecipeIndex, Recipe>;

/// A recipe for encoding instructions with a given format.
///
/// Recipes are immutable once built.
#[derive(Clone)]
pub struct Recipe {
    name: &'static str,
    format: InstructionFormat,
    base_size: u8,
    ins: Vec<OperandConstraint>,
    outs: Vec<OperandConstraint>,
    imm: Option<ImmShape>,
    predicate: Option<InstPredicate>,
    branch_range: Option<BranchRange>,
    emit: Option<EmitFn>,
}

impl Recipe {
    /// Short mnemonic name for this recipe.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Associated instruction format.
    pub fn format(&self) -> InstructionFormat {
        self.format
    }

    /// Number of bytes in the binary encoded instruction.
    pub fn base_size(&self) -> u8 {
        self.base_size
    }

    /// Constraints for the instruction's fixed value operands.
    pub fn ins(&self) -> &[OperandConstraint] {
        &self.ins
    }

    /// Constraints for the instruction's fixed results.
    pub fn outs(&self) -> &[OperandConstraint] {
        &self.outs
    }

    /// Shape of the immediate field, for formats with an immediate.
    pub fn imm_shape(&self) -> Option<ImmShape> {
        self.imm
    }

    /// Range of the branch displacement, for branch recipes.
    pub fn branch_range(&self) -> Option<BranchRange> {
        self.branch_range
    }

    /// The complete applicability predicate: the immediate shape combined with any extra
    /// predicate given to the builder.
    pub fn predicate(&self) -> Option<&InstPredicate> {
        self.predicate.as_ref()
    }

    /// Can this recipe encode the operand values of `inst`?
    ///
    /// A recipe that rejects an instruction makes its encoding table entry non-matching.
    pub fn accepts(&self, inst: &InstructionData) -> bool {
        inst.format() == self.format && self.predicate.as_ref().is_none_or(|p| p.eval(inst))
    }

    /// Does this recipe have an emission function?
    pub fn is_implemented(&self) -> bool {
        self.emit.is_some()
    }

    /// Emit the instruction described by `ctx`.
    pub fn emit(&self, ctx: &EmitContext<'_>, sink: &mut dyn CodeSink) -> CodegenResult<()> {
        match self.emit {
            Some(emit) => emit(ctx, sink),
            None => Err(CodegenError::UnimplementedRecipe(self.name)),
        }
    }
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Recipe")
            .field("name", &self.name)
            .field("format", &self.format)
            .field("base_size", &self.base_size)
            .field("ins", &self.ins)
            .field("outs", &self.outs)
            .field("imm", &self.imm)
            .field("branch_range", &self.branch_range)
            .field("implemented", &self.emit.is_some())
            .finish()
    }
}

/// Builder for a `Recipe`.
///
/// The operand shapes are checked against the instruction format when the recipe is built.
#[derive(Clone)]
pub struct RecipeBuilder {
    name: &'static str,
    format: InstructionFormat,
    base_size: u8,
    ins: Vec<OperandConstraint>,
    outs: Vec<OperandConstraint>,
    imm: Option<ImmShape>,
    inst_predicate: Option<InstPredicate>,
    branch_range: Option<(u8, u8, u8)>,
    emit: Option<EmitFn>,
}

impl RecipeBuilder {
    /// Start describing recipe `name` for `format`, producing `base_size` bytes.
    pub fn new(name: &'static str, format: InstructionFormat, base_size: u8) -> Self {
        Self {
            name,
            format,
            base_size,
            ins: Vec::new(),
            outs: Vec::new(),
            imm: None,
            inst_predicate: None,
            branch_range: None,
            emit: None,
        }
    }

    /// Set the constraints of the value operands.
    pub fn operands_in(mut self, constraints: Vec<OperandConstraint>) -> Self {
        self.ins = constraints;
        self
    }

    /// Set the constraints of the results.
    pub fn operands_out(mut self, constraints: Vec<OperandConstraint>) -> Self {
        self.outs = constraints;
        self
    }

    /// Set the shape of the immediate field.
    pub fn imm(mut self, shape: ImmShape) -> Self {
        self.imm = Some(shape);
        self
    }

    /// Add a predicate on the instruction fields, on top of the immediate shape.
    pub fn inst_predicate(mut self, predicate: InstPredicate) -> Self {
        self.inst_predicate = Some(predicate);
        self
    }

    /// Set the `(origin, min_bits, max_bits)` range of a branch recipe.
    pub fn branch_range(mut self, range: (u8, u8, u8)) -> Self {
        self.branch_range = Some(range);
        self
    }

    /// Set the emission function.
    ///
    /// A recipe without one can be selected, but fails at emission time.
    pub fn emit(mut self, emit: EmitFn) -> Self {
        self.emit = Some(emit);
        self
    }

    /// Check the recipe against its format and freeze it.
    pub fn build(self) -> Result<Recipe, BuildError> {
        let format = self.format;

        // The number of input constraints must match the number of format input operands.
        let expected = format.num_value_operands();
        if self.ins.len() != expected {
            return Err(BuildError::ArityMismatch {
                recipe: self.name,
                kind: "inputs",
                declared: self.ins.len(),
                expected,
            });
        }

        if format.has_imm() != self.imm.is_some() {
            return Err(BuildError::ShapeMismatch {
                recipe: self.name,
                reason: if format.has_imm() {
                    "format has an immediate but no immediate shape is given"
                } else {
                    "immediate shape given for a format without an immediate"
                },
            });
        }
        if let Some(shape) = self.imm {
            if shape.width == 0 || shape.width > 64 {
                return Err(BuildError::FieldOverflow {
                    field: "immediate width",
                    value: u32::from(shape.width),
                    width: 64,
                });
            }
        }

        if format.is_branch() != self.branch_range.is_some() {
            return Err(BuildError::ShapeMismatch {
                recipe: self.name,
                reason: if format.is_branch() {
                    "branch format without a branch range"
                } else {
                    "branch range given for a format without a destination"
                },
            });
        }
        let branch_range = match self.branch_range {
            Some((origin, min_bits, max_bits)) => {
                Some(BranchRange::new(origin, min_bits, max_bits)?)
            }
            None => None,
        };

        let misplaced_fixed = |c: &OperandConstraint| {
            matches!(c.kind, ConstraintKind::FixedReg(unit) if !c.regclass.contains(unit))
        };
        if self.ins.iter().chain(&self.outs).any(misplaced_fixed) {
            return Err(BuildError::ShapeMismatch {
                recipe: self.name,
                reason: "fixed register outside of its register class",
            });
        }

        if let Some(p) = &self.inst_predicate {
            if !p.applies_to(format) {
                return Err(BuildError::ShapeMismatch {
                    recipe: self.name,
                    reason: "instruction predicate tests a field the format doesn't have",
                });
            }
        }

        let predicate = match (self.imm.map(|shape| shape.predicate()), self.inst_predicate) {
            (Some(a), Some(b)) => Some(a.and(b)),
            (a, b) => a.or(b),
        };

        Ok(Recipe {
            name: self.name,
            format,
            base_size: self.base_size,
            ins: self.ins,
            outs: self.outs,
            imm: self.imm,
            predicate,
            branch_range,
            emit: self.emit,
        })
    }
}
