//! The `Encoding` struct.

use crate::entity::EntityRef;
use crate::isa::recipe::{Recipe, RecipeIndex, Recipes};
use core::fmt;

#[cfg(feature = "enable-serde")]
use serde_derive::{Deserialize, Serialize};

/// Bits needed to encode an instruction as binary machine code.
///
/// The encoding consists of two parts, both specific to the target ISA: An encoding *recipe*, and
/// encoding *bits*. The recipe determines the native instruction format and the mapping of
/// operands to encoded bits. The encoding bits provide additional information to the recipe,
/// typically parts of the opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct Encoding {
    recipe: u16,
    bits: u32,
}

impl Encoding {
    /// Create a new `Encoding` containing `(recipe, bits)`.
    pub fn new(recipe: RecipeIndex, bits: u32) -> Self {
        Self {
            recipe: recipe.index() as u16,
            bits,
        }
    }

    /// Get the recipe number in this encoding.
    pub fn recipe(self) -> usize {
        usize::from(self.recipe)
    }

    /// Get the recipe reference in this encoding.
    pub fn recipe_index(self) -> RecipeIndex {
        RecipeIndex::new(self.recipe())
    }

    /// Get the recipe-specific encoding bits.
    pub fn bits(self) -> u32 {
        self.bits
    }

    /// Is this a legal encoding, or the default placeholder?
    pub fn is_legal(self) -> bool {
        self != Self::default()
    }
}

/// The default encoding is the illegal one.
impl Default for Encoding {
    fn default() -> Self {
        Self {
            recipe: u16::MAX,
            bits: 0,
        }
    }
}

/// ISA-independent display of an encoding.
impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_legal() {
            write!(f, "{}#{:02x}", self.recipe, self.bits)
        } else {
            write!(f, "-")
        }
    }
}

/// Temporary object that holds enough context to properly display an encoding.
/// This is meant to be created by `EncInfo::display()`.
pub struct DisplayEncoding<'a> {
    encoding: Encoding,
    recipes: &'a Recipes,
}

impl fmt::Display for DisplayEncoding<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.encoding.is_legal() {
            return write!(f, "-");
        }
        match self.recipes.get(self.encoding.recipe_index()) {
            Some(recipe) => write!(f, "{}#{:02x}", recipe.name(), self.encoding.bits),
            None => write!(f, "{}", self.encoding),
        }
    }
}

/// Information about all the recipes of an ISA, used to interpret encodings.
#[derive(Clone, Copy)]
pub struct EncInfo<'a> {
    /// The recipe table.
    pub recipes: &'a Recipes,
}

impl<'a> EncInfo<'a> {
    /// Get the recipe used by `enc`, if it is legal.
    pub fn recipe(&self, enc: Encoding) -> Option<&'a Recipe> {
        if enc.is_legal() {
            self.recipes.get(enc.recipe_index())
        } else {
            None
        }
    }

    /// Get the name of the recipe used by `enc`.
    pub fn recipe_name(&self, enc: Encoding) -> &'static str {
        self.recipe(enc).map_or("-", Recipe::name)
    }

    /// Make an object that can display `enc` with its recipe name.
    pub fn display(&self, enc: Encoding) -> DisplayEncoding<'a> {
        DisplayEncoding {
            encoding: enc,
            recipes: self.recipes,
        }
    }

    /// Get the exact size in bytes of instructions encoded with `enc`.
    ///
    /// Returns 0 for illegal encodings.
    pub fn byte_size(&self, enc: Encoding) -> u8 {
        self.recipe(enc).map_or(0, Recipe::base_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_illegal() {
        let enc = Encoding::default();
        assert!(!enc.is_legal());
        assert_eq!(enc.to_string(), "-");

        let enc = Encoding::new(RecipeIndex::new(3), 0x9);
        assert!(enc.is_legal());
        assert_eq!(enc.recipe(), 3);
        assert_eq!(enc.bits(), 9);
        assert_eq!(enc.to_string(), "3#09");
    }

    #[test]
    fn unknown_recipe() {
        let recipes = Recipes::new();
        let info = EncInfo { recipes: &recipes };
        let enc = Encoding::new(RecipeIndex::new(0), 0x21);
        assert!(info.recipe(enc).is_none());
        assert_eq!(info.byte_size(enc), 0);
        assert_eq!(info.recipe_name(enc), "-");
        assert_eq!(info.display(enc).to_string(), "0#21");
    }
}
