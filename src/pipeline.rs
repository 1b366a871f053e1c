//! Whole-program entry points for both pipelines.
use tracing::{debug, instrument};

use crate::{
    compiler::{bytecode::Bytecode, CompileError, Compiler},
    expression::Expression,
    runtime::{interpreter, treewalk},
    scope::{Environment, UnboundReference},
    Integer, MachineError,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("evaluation failed: {0}")]
    Evaluate(#[from] UnboundReference),
    #[error("compilation failed: {0}")]
    Compile(#[from] CompileError),
    #[error("bytecode failed: {0}")]
    Machine(#[from] MachineError),
    #[error("the tree evaluates to {tree} but its bytecode produces {bytecode}")]
    Mismatch { tree: Integer, bytecode: Integer },
}

/// Evaluates a closed program by walking its tree.
pub fn interpret(program: &Expression) -> Result<Integer, UnboundReference> {
    treewalk::evaluate(program, &Environment::new())
}

/// Compiles a closed program.
pub fn compile(program: &Expression) -> Result<Bytecode, CompileError> {
    let (bytecode, depth) = Compiler::compile(program)?;
    // every expression leaves exactly one value behind
    debug_assert_eq!(depth, 1);
    Ok(bytecode)
}

/// Compiles a closed program and runs the result on a fresh machine.
pub fn run(program: &Expression) -> Result<Integer, Error> {
    let bytecode = compile(program)?;
    Ok(interpreter::execute(&bytecode)?)
}

/// Runs both pipelines and insists they agree.
#[instrument(skip_all, fields(nodes = program.size()))]
pub fn cross_check(program: &Expression) -> Result<Integer, Error> {
    let tree = interpret(program)?;
    let bytecode = run(program)?;
    debug!(tree, bytecode, "both pipelines finished");
    if tree == bytecode {
        Ok(tree)
    } else {
        Err(Error::Mismatch { tree, bytecode })
    }
}
