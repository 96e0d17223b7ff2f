//! Cranelift MIPS instruction encodings.
//!
//! This crate contains the instruction-encoding layer of a code generator for the MIPS family
//! of processors. Given an architecture-independent instruction it finds a legal encoding for
//! the configured target, and it knows how to emit the exact instruction words for it.
//!
//! The entry point is [`isa::lookup`], which returns a configurable [`isa::Builder`] for a
//! target triple. Finishing the builder produces an immutable [`isa::TargetIsa`] that can be
//! shared between compilation threads.

#![deny(missing_docs, trivial_numeric_casts, unused_extern_crates)]
#![warn(unused_import_braces)]

pub use crate::legalizer::{Legalizer, legalize_function};
pub use crate::result::{BuildError, CodegenError, CodegenResult};

pub use cranelift_entity as entity;

pub mod binemit;
pub mod ir;
pub mod isa;
pub mod legalizer;
pub mod predicates;
pub mod regalloc;
pub mod settings;

mod result;

/// Version number of the cranelift-mips crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
