//! Data structures describing the registers in an ISA.

use crate::result::BuildError;
use core::fmt;

/// Register units are the smallest units of register allocation.
///
/// Every MIPS register is a single register unit.
///
/// The register allocator will enforce that each register unit only gets used for one thing.
pub type RegUnit = u16;

/// A bit mask indexed by register units.
///
/// The size of this type bounds the number of register units a target can define.
pub type RegUnitMask = [u32; 3];

/// The largest number of register units representable in a `RegUnitMask`.
pub const MAX_REGUNITS: usize = 32 * 3;

/// How the units of a register bank are named.
#[derive(Clone, Copy, Debug)]
pub enum RegNames {
    /// Units are named by this prefix followed by their decimal offset in the bank. So with a
    /// prefix `f`, registers are named `f0`, `f1`, ...
    Prefix(&'static str),
    /// Every unit has an explicit name, listed in unit order.
    Explicit(&'static [&'static str]),
}

/// The register units in a target ISA are divided into disjoint register banks. Each bank covers a
/// contiguous range of register units.
#[derive(Clone, Debug)]
pub struct RegBank {
    /// The name of this register bank.
    pub name: &'static str,

    /// The first register unit in this bank.
    ///
    /// This is assigned when the bank is added to a `RegInfoBuilder`.
    pub first_unit: RegUnit,

    /// The total number of register units in this bank.
    pub units: RegUnit,

    /// How the register units are named.
    pub names: RegNames,

    /// Is register pressure tracking enabled for this bank?
    pub pressure_tracking: bool,

    /// Bank-relative unit that always reads as zero and ignores writes, if any.
    pub hardwired: Option<RegUnit>,
}

impl RegBank {
    /// Describe a register bank with `units` units.
    ///
    /// Fails if the bank is empty, or if fewer explicit names than units are provided.
    pub fn new(
        name: &'static str,
        units: RegUnit,
        names: RegNames,
        pressure_tracking: bool,
    ) -> Result<Self, BuildError> {
        if units == 0 {
            return Err(BuildError::EmptyRegBank(name));
        }
        if let RegNames::Explicit(list) = names {
            if list.len() < usize::from(units) {
                return Err(BuildError::MissingRegNames {
                    bank: name,
                    units,
                    names: list.len(),
                });
            }
        }
        Ok(Self {
            name,
            first_unit: 0,
            units,
            names,
            pressure_tracking,
            hardwired: None,
        })
    }

    /// Declare the bank-relative unit `offset` as hard-wired to zero.
    ///
    /// A hard-wired unit can be read as an operand, but it is never available for allocation.
    pub fn with_hardwired(mut self, offset: RegUnit) -> Result<Self, BuildError> {
        if offset >= self.units {
            return Err(BuildError::BadHardwiredUnit {
                bank: self.name,
                unit: offset,
            });
        }
        self.hardwired = Some(offset);
        Ok(self)
    }

    /// Does this bank contain `regunit`?
    pub fn contains(&self, regunit: RegUnit) -> bool {
        regunit >= self.first_unit && regunit - self.first_unit < self.units
    }

    /// Try to parse a regunit name. The name is not expected to begin with `%`.
    fn parse_regunit(&self, name: &str) -> Option<RegUnit> {
        match self.names {
            RegNames::Explicit(list) => list
                .iter()
                .take(usize::from(self.units))
                .position(|&x| x == name)
                .map(|offset| offset as RegUnit),
            RegNames::Prefix(prefix) => name
                .strip_prefix(prefix)
                .and_then(|num| num.parse::<RegUnit>().ok())
                .filter(|&offset| offset < self.units),
        }
        .map(|offset| offset + self.first_unit)
    }

    /// Write `regunit` to `w`, assuming that it belongs to this bank.
    /// All regunits are written with a `%` prefix.
    fn write_regunit(&self, f: &mut fmt::Formatter, regunit: RegUnit) -> fmt::Result {
        let offset = regunit - self.first_unit;
        debug_assert!(offset < self.units);
        match self.names {
            RegNames::Explicit(list) => write!(f, "%{}", list[usize::from(offset)]),
            RegNames::Prefix(prefix) => write!(f, "%{prefix}{offset}"),
        }
    }
}

/// A register class.
///
/// A register class represents a subset of the registers in a bank. It describes the set of
/// permitted registers for a register operand in a given encoding of an instruction. A class is a
/// small `Copy` value, so recipes can hold it directly.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegClass {
    /// The name of the register class.
    pub name: &'static str,

    /// The index of this class in the ISA's RegInfo description.
    pub index: u8,

    /// Index of the register bank this class belongs to.
    pub bank: u8,

    /// The first register unit in this class.
    pub first: RegUnit,

    /// The number of register units in this class.
    pub units: RegUnit,

    /// Mask of register units in the class.
    pub mask: RegUnitMask,
}

impl RegClass {
    /// Get a specific register unit in this class.
    pub fn unit(&self, offset: usize) -> RegUnit {
        debug_assert!(offset < usize::from(self.units));
        self.first + offset as RegUnit
    }

    /// Does this register class contain `regunit`?
    pub fn contains(&self, regunit: RegUnit) -> bool {
        self.mask
            .get(usize::from(regunit / 32))
            .is_some_and(|word| word & (1u32 << (regunit % 32)) != 0)
    }
}

impl fmt::Display for RegClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Debug for RegClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Information about the registers in an ISA.
///
/// The `RegInfo` data structure collects all relevant information about the registers in an
/// ISA.
#[derive(Clone, Debug)]
pub struct RegInfo {
    /// All register banks, ordered by their `first_unit`. The register banks are disjoint and
    /// contiguous.
    pub banks: Vec<RegBank>,

    /// All register classes.
    pub classes: Vec<RegClass>,
}

impl RegInfo {
    /// Get the register bank holding `regunit`.
    pub fn bank_containing_regunit(&self, regunit: RegUnit) -> Option<&RegBank> {
        self.banks.iter().find(|b| b.contains(regunit))
    }

    /// Try to parse a regunit name. The name is not expected to begin with `%`.
    pub fn parse_regunit(&self, name: &str) -> Option<RegUnit> {
        self.banks.iter().find_map(|b| b.parse_regunit(name))
    }

    /// Make a temporary object that can display a register unit.
    pub fn display_regunit(&self, regunit: RegUnit) -> DisplayRegUnit<'_> {
        DisplayRegUnit {
            regunit,
            reginfo: self,
        }
    }

    /// Get the register class with the given index.
    pub fn rc(&self, index: u8) -> RegClass {
        self.classes[usize::from(index)]
    }

    /// Get a register class by name.
    pub fn class_by_name(&self, name: &str) -> Option<RegClass> {
        self.classes.iter().copied().find(|rc| rc.name == name)
    }

    /// Total number of register units in all banks.
    pub fn num_units(&self) -> usize {
        self.banks.iter().map(|b| usize::from(b.units)).sum()
    }

    /// Is `regunit` hard-wired to zero?
    pub fn is_hardwired(&self, regunit: RegUnit) -> bool {
        self.hardwired_units().any(|ru| ru == regunit)
    }

    /// Iterate over all hard-wired register units.
    pub fn hardwired_units(&self) -> impl Iterator<Item = RegUnit> + '_ {
        self.banks
            .iter()
            .filter_map(|b| b.hardwired.map(|offset| b.first_unit + offset))
    }
}

/// Temporary object that holds enough information to print a register unit.
pub struct DisplayRegUnit<'a> {
    regunit: RegUnit,
    reginfo: &'a RegInfo,
}

impl fmt::Display for DisplayRegUnit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.reginfo.bank_containing_regunit(self.regunit) {
            Some(b) => b.write_regunit(f, self.regunit),
            None => write!(f, "%INVALID{}", self.regunit),
        }
    }
}

/// Builder for a `RegInfo`.
///
/// Banks are assigned consecutive register units in the order they are added.
#[derive(Default)]
pub struct RegInfoBuilder {
    banks: Vec<RegBank>,
    classes: Vec<RegClass>,
    next_unit: usize,
}

impl RegInfoBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a register bank, returning its index.
    pub fn add_bank(&mut self, mut bank: RegBank) -> Result<u8, BuildError> {
        let end = self.next_unit + usize::from(bank.units);
        if end > MAX_REGUNITS {
            return Err(BuildError::TooManyRegUnits(end));
        }
        bank.first_unit = self.next_unit as RegUnit;
        self.next_unit = end;
        self.banks.push(bank);
        Ok((self.banks.len() - 1) as u8)
    }

    /// Add a register class covering the whole of bank `bank`.
    pub fn add_class(&mut self, name: &'static str, bank: u8) -> Result<RegClass, BuildError> {
        let b = self
            .banks
            .get(usize::from(bank))
            .ok_or(BuildError::UnknownRegBank(name))?;
        let mut mask = RegUnitMask::default();
        for ru in b.first_unit..b.first_unit + b.units {
            mask[usize::from(ru / 32)] |= 1 << (ru % 32);
        }
        let rc = RegClass {
            name,
            index: self.classes.len() as u8,
            bank,
            first: b.first_unit,
            units: b.units,
            mask,
        };
        self.classes.push(rc);
        Ok(rc)
    }

    /// Finish building the register description.
    pub fn finish(self) -> RegInfo {
        RegInfo {
            banks: self.banks,
            classes: self.classes,
        }
    }
}
