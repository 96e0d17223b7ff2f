//! Common types for the IR.

use core::fmt::{self, Debug, Display, Formatter};
#[cfg(feature = "enable-serde")]
use serde_derive::{Deserialize, Serialize};

/// The type of an SSA value.
///
/// The `INVALID` type isn't a real type, and is used as a placeholder in the IR where a type
/// field is present but no type is needed, such as the controlling type variable for a
/// non-polymorphic instruction.
///
/// Only scalar types are modeled; the encoding layer has no vector instructions.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct Type(u8);

/// Not a valid type. Can't be loaded or stored. Can't be part of a SIMD vector.
pub const INVALID: Type = Type(0);

/// An integer type with 8 bits.
pub const I8: Type = Type(0x74);

/// An integer type with 16 bits.
pub const I16: Type = Type(0x75);

/// An integer type with 32 bits.
pub const I32: Type = Type(0x76);

/// An integer type with 64 bits.
pub const I64: Type = Type(0x77);

/// An integer type with 128 bits.
pub const I128: Type = Type(0x78);

/// A 32-bit floating point type represented in the IEEE 754-2008 *binary32* interchange format.
pub const F32: Type = Type(0x7a);

/// A 64-bit floating point type represented in the IEEE 754-2008 *binary64* interchange format.
pub const F64: Type = Type(0x7b);

impl Type {
    /// Get the number of bits in a value of this type, or 0 for `INVALID`.
    pub fn bits(self) -> u32 {
        match self {
            I8 => 8,
            I16 => 16,
            I32 | F32 => 32,
            I64 | F64 => 64,
            I128 => 128,
            _ => 0,
        }
    }

    /// Get the number of bytes used to store this type in memory.
    pub fn bytes(self) -> u32 {
        (self.bits() + 7) / 8
    }

    /// Get an integer type with the requested number of bits.
    pub fn int(bits: u16) -> Option<Self> {
        match bits {
            8 => Some(I8),
            16 => Some(I16),
            32 => Some(I32),
            64 => Some(I64),
            128 => Some(I128),
            _ => None,
        }
    }

    /// Is this the INVALID type?
    pub fn is_invalid(self) -> bool {
        self == INVALID
    }

    /// Is this a scalar integer type?
    pub fn is_int(self) -> bool {
        matches!(self, I8 | I16 | I32 | I64 | I128)
    }

    /// Is this a scalar floating point type?
    pub fn is_float(self) -> bool {
        matches!(self, F32 | F64)
    }

    /// Get a type with the same number of lanes as this type, but with half the number of bits in
    /// each lane.
    ///
    /// Returns `None` for types that can't be narrowed.
    pub fn half_width(self) -> Option<Self> {
        match self {
            I16 => Some(I8),
            I32 => Some(I16),
            I64 => Some(I32),
            I128 => Some(I64),
            F64 => Some(F32),
            _ => None,
        }
    }

    /// Get a type with the same number of lanes as this type, but with double the number of bits
    /// in each lane.
    pub fn double_width(self) -> Option<Self> {
        match self {
            I8 => Some(I16),
            I16 => Some(I32),
            I32 => Some(I64),
            I64 => Some(I128),
            F32 => Some(F64),
            _ => None,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.is_int() {
            write!(f, "i{}", self.bits())
        } else if self.is_float() {
            write!(f, "f{}", self.bits())
        } else {
            f.write_str("invalid")
        }
    }
}

impl Debug for Type {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.is_invalid() {
            f.write_str("types::INVALID")
        } else {
            write!(f, "types::{}", self.to_string().to_uppercase())
        }
    }
}
