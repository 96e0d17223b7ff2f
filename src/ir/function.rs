//! Intermediate representation of a function.
//!
//! The `Function` struct defined in this module owns all of its basic blocks and instructions.
//! It also holds the results of register allocation and of binary layout: the location of every
//! value, the encoding of every instruction, and the offset of every block.

use crate::binemit::CodeOffset;
use crate::entity::{Keys, PrimaryMap, SecondaryMap};
use crate::ir::entities::{Block, Inst, StackSlot, Value};
use crate::ir::instructions::InstructionData;
use crate::ir::types::{self, Type};
use crate::isa::{Encoding, RegUnit};
use core::fmt;
use smallvec::SmallVec;

/// Value location.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ValueLoc {
    /// This value has not been assigned to a location yet.
    #[default]
    Unassigned,
    /// Value is assigned to a register.
    Reg(RegUnit),
    /// Value is assigned to a stack slot.
    Stack(StackSlot),
}

impl ValueLoc {
    /// Is this an assigned location? (That is, not `Unassigned`).
    pub fn is_assigned(self) -> bool {
        self != ValueLoc::Unassigned
    }

    /// Get the register unit of this location, or `None` if it isn't a register.
    pub fn reg(self) -> Option<RegUnit> {
        match self {
            ValueLoc::Reg(ru) => Some(ru),
            _ => None,
        }
    }

    /// Get the stack slot of this location, or `None` if it isn't a stack slot.
    pub fn stack(self) -> Option<StackSlot> {
        match self {
            ValueLoc::Stack(ss) => Some(ss),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
struct ValueData {
    ty: Type,
    loc: ValueLoc,
}

#[derive(Clone, Debug)]
struct InstData {
    data: InstructionData,
    ctrl_type: Type,
    results: SmallVec<[Value; 1]>,
}

/// A function.
///
/// Blocks are laid out in the order they were created. Each block holds its instructions in
/// layout order.
#[derive(Clone)]
pub struct Function {
    /// Name of this function.
    pub name: String,

    values: PrimaryMap<Value, ValueData>,
    insts: PrimaryMap<Inst, InstData>,
    layout: PrimaryMap<Block, Vec<Inst>>,

    /// Encoding recipe and bits for the legal instructions.
    ///
    /// Illegal instructions have the default value `Encoding::default()`.
    pub encodings: SecondaryMap<Inst, Encoding>,

    /// Code offsets of the block headers.
    ///
    /// This information is only transiently available after the `binemit::compute_offsets`
    /// function computes it, and it can easily be recomputed by calling that function. It is
    /// not included in the textual IR format.
    pub offsets: SecondaryMap<Block, CodeOffset>,
}

impl Function {
    /// Create a function with the given name.
    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: PrimaryMap::new(),
            insts: PrimaryMap::new(),
            layout: PrimaryMap::new(),
            encodings: SecondaryMap::new(),
            offsets: SecondaryMap::new(),
        }
    }

    /// Create a new empty block at the end of the layout.
    pub fn create_block(&mut self) -> Block {
        self.layout.push(Vec::new())
    }

    /// Iterate over the blocks in layout order.
    pub fn blocks(&self) -> Keys<Block> {
        self.layout.keys()
    }

    /// Get the instructions in `block`, in layout order.
    pub fn block_insts(&self, block: Block) -> &[Inst] {
        &self.layout[block]
    }

    /// Create a new value of type `ty`.
    pub fn make_value(&mut self, ty: Type) -> Value {
        self.values.push(ValueData {
            ty,
            loc: ValueLoc::Unassigned,
        })
    }

    /// Get the type of a value.
    pub fn value_type(&self, v: Value) -> Type {
        self.values[v].ty
    }

    /// Get the location assigned to a value.
    pub fn value_loc(&self, v: Value) -> ValueLoc {
        self.values[v].loc
    }

    /// Assign a location to a value.
    pub fn set_value_loc(&mut self, v: Value, loc: ValueLoc) {
        self.values[v].loc = loc;
    }

    /// Append a new instruction to the end of `block`.
    ///
    /// The controlling type is `types::INVALID` for monomorphic instructions. Panics if
    /// `results` doesn't match the result count of the opcode.
    pub fn append_inst(
        &mut self,
        block: Block,
        data: InstructionData,
        ctrl_type: Type,
        results: &[Value],
    ) -> Inst {
        let inst = self.make_inst(data, ctrl_type, results);
        self.layout[block].push(inst);
        inst
    }

    /// Insert a new instruction immediately before `before` in its block.
    ///
    /// Panics if `before` is not in the layout.
    pub fn insert_inst_before(
        &mut self,
        before: Inst,
        data: InstructionData,
        ctrl_type: Type,
        results: &[Value],
    ) -> Inst {
        let inst = self.make_inst(data, ctrl_type, results);
        let (block, idx) = self.position(before);
        self.layout[block].insert(idx, inst);
        inst
    }

    /// Replace the contents of `inst`, keeping its results.
    ///
    /// The encoding of `inst` is cleared. Panics if the new opcode doesn't produce the same
    /// number of results.
    pub fn replace_inst(&mut self, inst: Inst, data: InstructionData, ctrl_type: Type) {
        let d = &mut self.insts[inst];
        assert_eq!(
            data.opcode().num_results(),
            d.results.len(),
            "{} can't replace {inst}",
            data.opcode()
        );
        d.data = data;
        d.ctrl_type = ctrl_type;
        self.encodings[inst] = Encoding::default();
    }

    /// Remove `inst` from the layout. Panics if it isn't there.
    pub fn remove_inst(&mut self, inst: Inst) {
        let (block, idx) = self.position(inst);
        self.layout[block].remove(idx);
    }

    /// Get the contents of an instruction.
    pub fn inst_data(&self, inst: Inst) -> &InstructionData {
        &self.insts[inst].data
    }

    /// Get the controlling type of an instruction.
    pub fn ctrl_type(&self, inst: Inst) -> Type {
        self.insts[inst].ctrl_type
    }

    /// Get the results of an instruction.
    pub fn inst_results(&self, inst: Inst) -> &[Value] {
        &self.insts[inst].results
    }

    /// Find the block containing `inst`.
    pub fn inst_block(&self, inst: Inst) -> Option<Block> {
        self.layout
            .iter()
            .find(|(_, insts)| insts.contains(&inst))
            .map(|(block, _)| block)
    }

    fn make_inst(&mut self, data: InstructionData, ctrl_type: Type, results: &[Value]) -> Inst {
        assert_eq!(
            data.opcode().num_results(),
            results.len(),
            "{} results given to {}",
            results.len(),
            data.opcode()
        );
        debug_assert!(data.opcode().is_polymorphic() || ctrl_type == types::INVALID);
        self.insts.push(InstData {
            data,
            ctrl_type,
            results: results.iter().copied().collect(),
        })
    }

    fn position(&self, inst: Inst) -> (Block, usize) {
        self.layout
            .iter()
            .find_map(|(block, insts)| insts.iter().position(|&i| i == inst).map(|i| (block, i)))
            .unwrap_or_else(|| panic!("{inst} is not in the layout"))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "function %{} {{", self.name)?;
        for (block, insts) in self.layout.iter() {
            writeln!(f, "{block}:")?;
            for &inst in insts {
                let d = &self.insts[inst];
                write!(f, "    ")?;
                if !d.results.is_empty() {
                    let results: Vec<String> = d.results.iter().map(|v| v.to_string()).collect();
                    write!(f, "{} = ", results.join(", "))?;
                }
                write!(f, "{}", d.data.opcode())?;
                if !d.ctrl_type.is_invalid() {
                    write!(f, ".{}", d.ctrl_type)?;
                }
                if let Some(cond) = d.data.cond_code() {
                    write!(f, " {cond}")?;
                }
                let mut sep = " ";
                for arg in d.data.arguments() {
                    write!(f, "{sep}{arg}")?;
                    sep = ", ";
                }
                if let Some(imm) = d.data.imm_value() {
                    write!(f, "{sep}{imm}")?;
                }
                if let Some(dest) = d.data.branch_destination() {
                    write!(f, "{sep}{dest}")?;
                }
                writeln!(f)?;
            }
        }
        writeln!(f, "}}")
    }
}
