//! Result and error types representing the outcome of building a target or encoding a function.

use crate::ir::{Inst, Opcode, Type, Value};
use crate::isa::Legalize;
use thiserror::Error;

/// A compilation error.
///
/// When an instruction or a function can't be encoded, one of these error codes is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    /// No encoding table entry matches the instruction.
    ///
    /// This is recoverable: the caller should rewrite the instruction with the indicated
    /// legalization action and try again.
    #[error("no encoding for {opcode}.{ctrl_type}, legalize by {action}")]
    NoEncoding {
        /// Opcode of the rejected instruction.
        opcode: Opcode,
        /// Controlling type of the rejected instruction.
        ctrl_type: Type,
        /// The legalization policy configured for `ctrl_type`.
        action: Legalize,
    },

    /// A branch displacement doesn't fit the range of its recipe.
    ///
    /// This is only discovered after all block offsets are final. The branch must be rewritten
    /// into a form with a longer range.
    #[error("branch displacement {displacement} is out of range for recipe {recipe}")]
    BranchRange {
        /// Name of the branch recipe.
        recipe: &'static str,
        /// The byte displacement that didn't fit.
        displacement: i64,
    },

    /// The selected recipe has no emitter yet.
    #[error("recipe {0} is not implemented")]
    UnimplementedRecipe(&'static str),

    /// An operand or result is not in a location accepted by the recipe constraints.
    #[error("{value} is not in a location allowed by recipe {recipe}")]
    BadOperandLocation {
        /// Name of the recipe.
        recipe: &'static str,
        /// The misplaced value.
        value: Value,
    },

    /// An instruction has a different number of operands or results than its recipe binds.
    #[error("recipe {recipe} binds {expected} {kind} but the instruction has {found}")]
    OperandCount {
        /// Name of the recipe.
        recipe: &'static str,
        /// `"inputs"` or `"outputs"`.
        kind: &'static str,
        /// Count declared by the recipe.
        expected: usize,
        /// Count found on the instruction.
        found: usize,
    },

    /// An instruction reached binary emission without an encoding.
    #[error("{0} has no encoding")]
    Unencoded(Inst),

    /// Legalization of an instruction made no progress.
    #[error("legalizing {0} makes no progress")]
    LegalizationStuck(Opcode),

    /// The code size for the function is too large.
    ///
    /// Offsets are 32 bits wide. If the function doesn't fit, compilation fails.
    #[error("Code for function is too large")]
    CodeTooLarge,
}

/// A convenient alias for a `Result` that uses `CodegenError` as the error type.
pub type CodegenResult<T> = Result<T, CodegenError>;

/// An error in the definition of a target.
///
/// These are reported while a target ISA is being built, never while compiling code. They always
/// represent a bug in the target description.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A register bank was declared without units.
    #[error("register bank {0} has no units")]
    EmptyRegBank(&'static str),

    /// A register bank was given fewer explicit names than it has units.
    #[error("register bank {bank} has {units} units but only {names} names")]
    MissingRegNames {
        /// Bank name.
        bank: &'static str,
        /// Number of units in the bank.
        units: u16,
        /// Number of names supplied.
        names: usize,
    },

    /// A hard-wired unit is outside of its bank.
    #[error("hard-wired unit {unit} is outside register bank {bank}")]
    BadHardwiredUnit {
        /// Bank name.
        bank: &'static str,
        /// Bank-relative unit number.
        unit: u16,
    },

    /// The register units don't fit in a unit mask.
    #[error("too many register units: {0}")]
    TooManyRegUnits(usize),

    /// A register class refers to a bank that doesn't exist.
    #[error("register class {0} refers to an unknown bank")]
    UnknownRegBank(&'static str),

    /// A value doesn't fit in the instruction field reserved for it.
    #[error("{field} value {value:#x} doesn't fit in {width} bits")]
    FieldOverflow {
        /// Name of the field.
        field: &'static str,
        /// The rejected value.
        value: u32,
        /// Width of the field in bits.
        width: u8,
    },

    /// A recipe declares a different number of operands than its format provides.
    #[error("recipe {recipe} has {declared} {kind}, but {expected} are required")]
    ArityMismatch {
        /// Recipe name.
        recipe: &'static str,
        /// Either "inputs" or "outputs".
        kind: &'static str,
        /// Declared by the recipe.
        declared: usize,
        /// Required by the format or the opcode.
        expected: usize,
    },

    /// A recipe's operand shapes are inconsistent with its instruction format.
    #[error("recipe {recipe}: {reason}")]
    ShapeMismatch {
        /// Recipe name.
        recipe: &'static str,
        /// What is wrong with the shape.
        reason: &'static str,
    },

    /// An encoding binds an opcode to a recipe for a different instruction format.
    #[error("{opcode} can't be encoded with recipe {recipe}")]
    FormatMismatch {
        /// The opcode being encoded.
        opcode: Opcode,
        /// Recipe name.
        recipe: &'static str,
    },

    /// An encoding has a controlling type that doesn't suit its opcode.
    ///
    /// Polymorphic opcodes need a concrete type, monomorphic ones use `INVALID`.
    #[error("{opcode} can't be encoded for type {ctrl_type}")]
    BadControllingType {
        /// The opcode being encoded.
        opcode: Opcode,
        /// The rejected controlling type.
        ctrl_type: Type,
    },

    /// A branch range is inconsistent.
    #[error("invalid branch range: min_bits {min_bits}, max_bits {max_bits}")]
    BadBranchRange {
        /// Alignment bits.
        min_bits: u8,
        /// Signed displacement width.
        max_bits: u8,
    },

    /// An encoding refers to a setting predicate that doesn't exist.
    #[error("unknown setting predicate {0}")]
    UnknownPredicate(&'static str),

    /// An encoding refers to a recipe that doesn't exist.
    #[error("unknown recipe index {0}")]
    UnknownRecipe(usize),

    /// An operand predicate tests a field that the instruction format doesn't have.
    #[error("{opcode} has no field tested by {predicate}")]
    PredicateFormat {
        /// The opcode being encoded.
        opcode: Opcode,
        /// Description of the predicate.
        predicate: String,
    },

    /// A legalization action was configured twice.
    #[error("legalization action for {0} is already set")]
    DuplicateLegalize(Type),

    /// Two settings or predicates share a name.
    #[error("duplicate setting name {0}")]
    DuplicateSetting(&'static str),
}
