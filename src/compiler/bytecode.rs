//! The stack machine's instruction set and the sequence that holds it
use core::fmt;

use arbitrary::Arbitrary;

use crate::Integer;

/// Absolute position in the operand stack, counted from the bottom of the run
pub type Slot = usize;
/// Absolute index into a [`Bytecode`] sequence
pub type Target = usize;

// Slots and targets are indices rather than references: both the sequence and
// the operand stack reallocate as they grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Arbitrary)]
pub enum Instruction {
    /// push the value
    LoadLiteral(Integer),
    /// pop `x`, pop `y`, push `x + y`
    Add,
    /// push a copy of the value at the slot
    Copy(Slot),
    /// remove the value at the slot, shifting everything above it down by one
    Drop(Slot),
    /// pop the test value; continue at the target if it is non-zero
    Branch(Target),
    /// continue at the target
    Jump(Target),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadLiteral(value) => write!(f, "load: {value}"),
            Self::Add => write!(f, "add"),
            Self::Copy(slot) => write!(f, "copy: [{slot}]"),
            Self::Drop(slot) => write!(f, "drop: [{slot}]"),
            Self::Branch(target) => write!(f, "branch: [{target}]"),
            Self::Jump(target) => write!(f, "jump: [{target}]"),
        }
    }
}

/// An ordered, append-only sequence of instructions.
///
/// Appending never moves the index of an earlier instruction, which is what
/// lets the compiler come back and [`patch`](Self::patch) a jump once its
/// destination has been emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytecode {
    instructions: Vec<Instruction>,
}

impl Bytecode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an instruction, returning its index
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        let index = self.instructions.len();
        self.instructions.push(instruction);
        index
    }

    /// Index the next emitted instruction will land at
    pub fn offset(&self) -> usize {
        self.instructions.len()
    }

    /// Points the jump at `index` to `target`.
    ///
    /// # Panics
    ///
    /// Panics if the instruction at `index` is not a [`Instruction::Branch`] or
    /// [`Instruction::Jump`], which can only happen through a compiler bug.
    pub fn patch(&mut self, index: usize, target: Target) {
        match self.instructions.get_mut(index) {
            Some(Instruction::Branch(t) | Instruction::Jump(t)) => *t = target,
            other => panic!("attempted to patch {other:?} at {index}, which is not a jump"),
        }
    }

    pub fn get(&self, index: usize) -> Option<Instruction> {
        self.instructions.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn as_slice(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }
}

impl From<Vec<Instruction>> for Bytecode {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }
}

impl FromIterator<Instruction> for Bytecode {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Self {
            instructions: iter.into_iter().collect(),
        }
    }
}

/// One line per instruction: its index, a tab, then the instruction.
impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "{index}\t{instruction}")?;
        }
        Ok(())
    }
}
