//! The register units an allocator may hand out.
//!
//! The register allocator is an external collaborator; this is the view of the register file it
//! starts from. Hard-wired registers are never part of the set: they can't be taken, and freeing
//! one has no effect.

use crate::isa::registers::{RegClass, RegInfo, RegUnit, RegUnitMask};
use core::fmt;

/// Word index and bit of `unit` in a `RegUnitMask`.
fn locate(unit: RegUnit) -> (usize, u32) {
    (usize::from(unit) / 32, 1u32 << (unit % 32))
}

/// Registers available for allocation, as a bit vector of register units.
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterSet {
    avail: RegUnitMask,
    hardwired: RegUnitMask,
}

impl RegisterSet {
    /// A set with every unit available, hard-wired ones included.
    ///
    /// Targets build their allocatable set with `allocatable()` instead.
    pub fn new() -> Self {
        Self {
            avail: [u32::MAX; 3],
            hardwired: [0; 3],
        }
    }

    /// A set with nothing available.
    pub fn empty() -> Self {
        Self {
            avail: [0; 3],
            hardwired: [0; 3],
        }
    }

    /// All units of the banks in `info`, minus the hard-wired ones.
    pub fn allocatable(info: &RegInfo) -> Self {
        let mut set = Self::empty();
        let units = info
            .banks
            .iter()
            .flat_map(|bank| bank.first_unit..bank.first_unit + bank.units);
        for unit in units {
            let (word, bit) = locate(unit);
            set.avail[word] |= bit;
        }
        for unit in info.hardwired_units() {
            let (word, bit) = locate(unit);
            set.hardwired[word] |= bit;
            set.avail[word] &= !bit;
        }
        set
    }

    /// Is `reg` available?
    pub fn is_avail(&self, reg: RegUnit) -> bool {
        let (word, bit) = locate(reg);
        self.avail[word] & bit != 0
    }

    /// Mark `reg` in class `rc` as allocated.
    ///
    /// The register must be available.
    pub fn take(&mut self, rc: RegClass, reg: RegUnit) {
        debug_assert!(rc.contains(reg), "{reg} is not in {rc}");
        debug_assert!(self.is_avail(reg), "{rc}:{reg} is not available in {self}");
        let (word, bit) = locate(reg);
        self.avail[word] &= !bit;
    }

    /// Give `reg` back. Hard-wired registers stay unavailable.
    pub fn free(&mut self, rc: RegClass, reg: RegUnit) {
        debug_assert!(rc.contains(reg), "{reg} is not in {rc}");
        debug_assert!(!self.is_avail(reg), "{rc}:{reg} is already free in {self}");
        let (word, bit) = locate(reg);
        self.avail[word] |= bit & !self.hardwired[word];
    }

    /// Iterate over the available registers of `rc`, lowest unit first.
    pub fn iter(&self, rc: RegClass) -> RegSetIter {
        let mut regs = rc.mask;
        for (word, avail) in regs.iter_mut().zip(self.avail) {
            *word &= avail;
        }
        RegSetIter { regs }
    }

    /// Display the available registers by name.
    pub fn display<'a, R: Into<Option<&'a RegInfo>>>(&self, regs: R) -> DisplayRegisterSet<'a> {
        DisplayRegisterSet(self.clone(), regs.into())
    }
}

impl Default for RegisterSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Available registers of one class.
#[derive(Clone)]
pub struct RegSetIter {
    regs: RegUnitMask,
}

impl Iterator for RegSetIter {
    type Item = RegUnit;

    fn next(&mut self) -> Option<RegUnit> {
        let word = self.regs.iter().position(|&w| w != 0)?;
        let bits = &mut self.regs[word];
        let unit = word * 32 + bits.trailing_zeros() as usize;
        // Clear the lowest set bit.
        *bits &= *bits - 1;
        RegUnit::try_from(unit).ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.regs.iter().map(|w| w.count_ones() as usize).sum();
        (n, Some(n))
    }
}

impl ExactSizeIterator for RegSetIter {}

/// A `RegisterSet` with the `RegInfo` used to name its units.
///
/// Without register info, the raw mask words are shown.
pub struct DisplayRegisterSet<'a>(RegisterSet, Option<&'a RegInfo>);

impl fmt::Display for DisplayRegisterSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("[")?;
        match self.1 {
            Some(info) => {
                let units = info
                    .banks
                    .iter()
                    .flat_map(|bank| bank.first_unit..bank.first_unit + bank.units);
                for unit in units.filter(|&u| self.0.is_avail(u)) {
                    write!(f, " {}", info.display_regunit(unit))?;
                }
            }
            None => {
                for word in self.0.avail {
                    write!(f, " #{word:08x}")?;
                }
            }
        }
        f.write_str(" ]")
    }
}

impl fmt::Display for RegisterSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.display(None).fmt(f)
    }
}
