//! Register allocation.
//!
//! The allocator itself is not part of this crate. This module holds the register set the
//! allocator works from.

pub mod register_set;

pub use self::register_set::RegisterSet;
