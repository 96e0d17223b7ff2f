//! Instruction Set Architectures.
//!
//! The `isa` module provides a `TargetIsa` trait which provides the behavior specialization needed
//! by the ISA-independent code generator. The MIPS family is the only instruction set supported
//! by this crate, in its 32-bit and 64-bit CPU modes.
//!
//! # Constructing a `TargetIsa` instance
//!
//! The target ISA is built from the following information:
//!
//! - The target triple. The architecture selects the CPU mode.
//! - Values for ISA-specific settings.
//!
//! The `isa::lookup()` function is the main entry point which returns an `isa::Builder`
//! appropriate for the requested ISA:
//!
//! ```
//! use cranelift_mips::isa;
//! use cranelift_mips::settings::Configurable;
//! use core::str::FromStr;
//! use target_lexicon::Triple;
//!
//! let triple = Triple::from_str("mips64el-unknown-linux-gnuabi64").unwrap();
//! match isa::lookup(triple) {
//!     Err(_) => {
//!         // The MIPS target ISA is not available.
//!     }
//!     Ok(mut isa_builder) => {
//!         isa_builder.set("supports_lext", "on").unwrap();
//!         let isa = isa_builder.finish().unwrap();
//!         assert_eq!(isa.cpu_mode(), "MIPS64");
//!     }
//! }
//! ```
//!
//! The configured target ISA trait object is a `Box<dyn TargetIsa>` which can be used for multiple
//! concurrent function compilations.

pub use crate::isa::constraints::{
    BranchRange, ConstraintKind, ImmShape, OperandConstraint, Signedness,
};
pub use crate::isa::enc_tables::{CpuMode, Encodings, LegalizePolicy};
pub use crate::isa::encoding::{EncInfo, Encoding};
pub use crate::isa::recipe::{EmitContext, EmitFn, Recipe, RecipeBuilder, RecipeIndex, Recipes};
pub use crate::isa::registers::{RegClass, RegInfo, RegUnit};

use crate::binemit::CodeSink;
use crate::ir::{Function, Inst, InstructionData, Type};
use crate::regalloc::RegisterSet;
use crate::result::{BuildError, CodegenError, CodegenResult};
use crate::settings::{self, Configurable, SetError, SetResult};
use core::fmt;
use core::str::FromStr;
use target_lexicon::{Architecture, Triple};

#[cfg(feature = "enable-serde")]
use serde_derive::{Deserialize, Serialize};

#[cfg(feature = "mips")]
pub mod mips;

pub mod constraints;
pub mod enc_tables;
pub mod encoding;
pub mod recipe;
pub mod registers;

/// Returns a builder that can create a corresponding `TargetIsa`
/// or `Err(LookupError::SupportDisabled)` if not enabled.
macro_rules! isa_builder {
    ($name: ident, $cfg_terms: tt, $triple: ident) => {{
        #[cfg $cfg_terms]
        {
            Ok($name::isa_builder($triple))
        }
        #[cfg(not $cfg_terms)]
        {
            Err(LookupError::SupportDisabled)
        }
    }};
}

/// Look for an ISA for the given `triple`.
/// Return a builder that can create a corresponding `TargetIsa`.
pub fn lookup(triple: Triple) -> Result<Builder, LookupError> {
    match triple.architecture {
        Architecture::Mips32(_) | Architecture::Mips64(_) => {
            isa_builder!(mips, (feature = "mips"), triple)
        }
        _ => Err(LookupError::Unsupported),
    }
}

/// Look for a supported ISA with the given `name`.
/// Return a builder that can create a corresponding `TargetIsa`.
pub fn lookup_by_name(name: &str) -> Result<Builder, LookupError> {
    let triple = Triple::from_str(name).map_err(|_| LookupError::Unsupported)?;
    lookup(triple)
}

/// Describes reason for target lookup failure
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum LookupError {
    /// Support for this target was disabled in the current build.
    SupportDisabled,

    /// Support for this target has not yet been implemented.
    Unsupported,
}

impl std::error::Error for LookupError {}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LookupError::SupportDisabled => write!(f, "Support for this target is disabled"),
            LookupError::Unsupported => {
                write!(f, "Support for this target has not been implemented yet")
            }
        }
    }
}

/// Builder for a `TargetIsa`.
/// Modify the ISA-specific settings before creating the `TargetIsa` trait object with `finish`.
#[derive(Clone)]
pub struct Builder {
    triple: Triple,
    setup: Result<settings::Builder, BuildError>,
    constructor: fn(Triple, settings::Builder) -> Result<Box<dyn TargetIsa>, BuildError>,
}

impl Builder {
    /// Create a builder for `triple`.
    ///
    /// A malformed settings group is reported by `finish`.
    #[cfg_attr(
        not(feature = "mips"),
        allow(dead_code, reason = "only used by enabled targets")
    )]
    pub(crate) fn new(
        triple: Triple,
        setup: Result<settings::Builder, BuildError>,
        constructor: fn(Triple, settings::Builder) -> Result<Box<dyn TargetIsa>, BuildError>,
    ) -> Self {
        Self {
            triple,
            setup,
            constructor,
        }
    }

    /// Gets the triple for the builder.
    pub fn triple(&self) -> &Triple {
        &self.triple
    }

    /// Get the current value of an ISA-specific boolean setting.
    pub fn value(&self, name: &str) -> Option<bool> {
        self.setup.as_ref().ok()?.value(name)
    }

    /// Define the registers, recipes and encoding tables of the target and freeze them with the
    /// configured settings into a `TargetIsa` trait object.
    ///
    /// An error here is a bug in the target description, not in the settings.
    pub fn finish(self) -> Result<Box<dyn TargetIsa>, BuildError> {
        (self.constructor)(self.triple, self.setup?)
    }

    fn setup(&mut self, name: &str) -> SetResult<&mut settings::Builder> {
        self.setup
            .as_mut()
            .map_err(|_| SetError::BadName(name.to_string()))
    }
}

impl Configurable for Builder {
    fn set(&mut self, name: &str, value: &str) -> SetResult<()> {
        self.setup(name)?.set(name, value)
    }

    fn enable(&mut self, name: &str) -> SetResult<()> {
        self.setup(name)?.enable(name)
    }
}

/// After determining that an instruction doesn't have an encoding, how should we proceed to
/// legalize it?
///
/// The action is chosen by the `LegalizePolicy` of the CPU mode from the controlling type of the
/// instruction. The rewrite itself is done by a `Legalizer`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub enum Legalize {
    /// Split the instruction into instructions operating on a narrower type.
    Narrow,
    /// Expand the instruction into a sequence of other instructions.
    Expand,
}

impl fmt::Display for Legalize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Legalize::Narrow => "narrow",
            Legalize::Expand => "expand",
        })
    }
}

/// Methods that are specialized to a target ISA.
///
/// Implies a Display trait that shows the ISA-specific flags.
pub trait TargetIsa: fmt::Display + Send + Sync {
    /// Get the name of this ISA.
    fn name(&self) -> &'static str;

    /// Get the target triple that was used to make this trait object.
    fn triple(&self) -> &Triple;

    /// Get the name of the CPU mode selected by the triple.
    fn cpu_mode(&self) -> &'static str;

    /// Get the ISA-dependent flag values that were used to make this trait object.
    fn isa_flags(&self) -> &settings::Flags;

    /// Does a control transfer on this ISA execute the following instruction before the
    /// destination?
    ///
    /// Filling the delay slot is up to the caller. The encodings never insert a filler.
    fn has_delay_slot(&self) -> bool {
        false
    }

    /// Get a data structure describing the registers in this ISA.
    fn register_info(&self) -> &RegInfo;

    /// Get an object that can display and size encodings of this ISA.
    fn encoding_info(&self) -> EncInfo<'_>;

    /// Get an iterator over the legal encodings of `inst` in the current CPU mode.
    ///
    /// Encodings are produced in registration order, only including those enabled by the current
    /// settings.
    fn legal_encodings<'a>(&'a self, inst: &'a InstructionData, ctrl_type: Type)
    -> Encodings<'a>;

    /// Get the legalization action for an instruction with controlling type `ctrl_type` that has
    /// no legal encoding.
    fn legalize_action(&self, ctrl_type: Type) -> Legalize;

    /// Encode an instruction after determining it is legal.
    ///
    /// If `inst` can legally be encoded in this ISA, produce the corresponding `Encoding` object.
    /// Otherwise, return `CodegenError::NoEncoding` with the action that should be used to
    /// legalize it.
    ///
    /// This is also the main entry point for determining if an instruction is legal.
    fn encode(&self, inst: &InstructionData, ctrl_type: Type) -> CodegenResult<Encoding> {
        match self.legal_encodings(inst, ctrl_type).next() {
            Some(enc) => Ok(enc),
            None => {
                let action = self.legalize_action(ctrl_type);
                log::trace!(
                    "no {} encoding for {}.{}, {}",
                    self.cpu_mode(),
                    inst.opcode(),
                    ctrl_type,
                    action
                );
                Err(CodegenError::NoEncoding {
                    opcode: inst.opcode(),
                    ctrl_type,
                    action,
                })
            }
        }
    }

    /// Get the register class that should be used to represent an ABI argument or return value
    /// of type `ty`.
    fn regclass_for_abi_type(&self, ty: Type) -> RegClass;

    /// Get the set of allocatable registers.
    ///
    /// Reserved registers are removed from the set, and hard-wired registers are never in it.
    fn allocatable_registers(&self) -> RegisterSet;

    /// Emit binary machine code for a single instruction into `sink`.
    ///
    /// The instruction must have an encoding in `func.encodings`, and its operands must be in
    /// locations allowed by the recipe. Branch destinations are read from `func.offsets`.
    fn emit_inst(&self, func: &Function, inst: Inst, sink: &mut dyn CodeSink)
    -> CodegenResult<()>;
}

impl fmt::Debug for &dyn TargetIsa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TargetIsa {{ triple: {:?}, cpu_mode: {} }}",
            self.triple(),
            self.cpu_mode()
        )
    }
}
