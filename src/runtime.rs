//! The two engines that give programs their meaning.
//!
//! [`treewalk`] evaluates a tree directly; [`interpreter`] runs the bytecode the
//! compiler lowered it into. For any tree without unbound references, both
//! produce the same integer.

pub mod fuel;
pub mod interpreter;
pub mod trace;
pub mod treewalk;
