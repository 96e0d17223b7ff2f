//! Representation of IR functions.
//!
//! This is the part of the intermediate representation the encoding layer consumes: typed
//! instructions with their operands, and the register assignments made for them.

pub mod condcodes;
pub mod entities;
pub mod function;
pub mod immediates;
pub mod instructions;
pub mod types;

pub use crate::ir::condcodes::IntCC;
pub use crate::ir::entities::{Block, Inst, StackSlot, Value};
pub use crate::ir::function::{Function, ValueLoc};
pub use crate::ir::immediates::Imm64;
pub use crate::ir::instructions::{InstructionData, InstructionFormat, Opcode};
pub use crate::ir::types::Type;
