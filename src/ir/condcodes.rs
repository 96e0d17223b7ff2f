//! Condition codes for integer comparisons.
//!
//! `icmp_imm` and `br_icmp` carry one of these. MIPS encodes `slt`/`ult` comparisons against an
//! immediate and `eq`/`ne` branches directly; the other codes are left to legalization.

use core::fmt;
#[cfg(feature = "enable-serde")]
use serde_derive::{Deserialize, Serialize};

/// How two integers are compared.
///
/// Orderings come in a signed and an unsigned flavor.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub enum IntCC {
    /// `==`.
    Equal,
    /// `!=`.
    NotEqual,
    /// Signed `<`.
    SignedLessThan,
    /// Signed `>=`.
    SignedGreaterThanOrEqual,
    /// Signed `>`.
    SignedGreaterThan,
    /// Signed `<=`.
    SignedLessThanOrEqual,
    /// Unsigned `<`.
    UnsignedLessThan,
    /// Unsigned `>=`.
    UnsignedGreaterThanOrEqual,
    /// Unsigned `>`.
    UnsignedGreaterThan,
    /// Unsigned `<=`.
    UnsignedLessThanOrEqual,
}

impl IntCC {
    /// The short name used when printing instructions.
    pub fn to_static_str(self) -> &'static str {
        match self {
            Self::Equal => "eq",
            Self::NotEqual => "ne",
            Self::SignedLessThan => "slt",
            Self::SignedGreaterThanOrEqual => "sge",
            Self::SignedGreaterThan => "sgt",
            Self::SignedLessThanOrEqual => "sle",
            Self::UnsignedLessThan => "ult",
            Self::UnsignedGreaterThanOrEqual => "uge",
            Self::UnsignedGreaterThan => "ugt",
            Self::UnsignedLessThanOrEqual => "ule",
        }
    }
}

impl fmt::Display for IntCC {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.to_static_str())
    }
}
