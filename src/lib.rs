pub mod compiler;
pub mod expression;
pub mod pipeline;
pub mod runtime;
pub mod scope;

pub use compiler::{
    bytecode::{Bytecode, Instruction, Slot, Target},
    CompileError, Compiler, Lower,
};
pub use expression::Expression;
pub use runtime::{
    fuel::Fuel,
    interpreter::{execute, Executed, Machine, MachineError, Observer},
    trace::{Profile, Trace},
    treewalk::evaluate,
};
pub use scope::{Environment, Scope, SymbolTable, UnboundReference};

/// Every value either engine produces is a machine integer.
///
/// Addition wraps on overflow in both engines so their results always agree.
pub type Integer = i64;
