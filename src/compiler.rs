//! Lower expression trees into stack machine bytecode.
//!
//! The compiler never runs anything. It tracks the *depth*, the number of
//! values that will be live on the operand stack once the code emitted so far
//! has run, and uses it to hand every definition an absolute stack slot.
//!
//! For example:
//!
//! ```text
//! define(five, 5, add(4, five))
//! ```
//!
//! compiles to
//!
//! ```text
//! 0   load: 5      ; `five` lives in slot 0
//! 1   load: 4
//! 2   copy: [0]
//! 3   add
//! 4   drop: [0]    ; the sum slides down into slot 0
//! ```
//!
//! and
//!
//! ```text
//! if(0, 2, 3)
//! ```
//!
//! into
//!
//! ```text
//! 0   load: 0
//! 1   branch: [4]  ; non-zero skips the `no` arm
//! 2   load: 3
//! 3   jump: [5]
//! 4   load: 2
//! ```
use tracing::{debug, instrument, trace};

use crate::{
    expression::Expression,
    scope::{SymbolTable, UnboundReference},
    Integer,
};
use bytecode::{Bytecode, Instruction};

pub mod bytecode;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Unbound(#[from] UnboundReference),
    /// The join point after a condition would have two possible depths
    #[error("condition arms leave the stack at different depths (no: {no}, yes: {yes})")]
    IllFormedCondition { no: usize, yes: usize },
    #[error("code before instruction {at} consumes more values than are live")]
    DepthUnderflow { at: usize },
}

/// Something that can be lowered into bytecode.
pub trait Lower {
    /// Appends the code for `self` to `compiler`, starting at `depth` live
    /// values, and returns the depth once that code has run.
    fn lower(
        &self,
        compiler: &mut Compiler,
        symbols: &SymbolTable<'_>,
        depth: usize,
    ) -> Result<usize, CompileError>;
}

#[derive(Debug, Default)]
pub struct Compiler {
    bytecode: Bytecode,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles a whole program against an empty stack, returning its code and
    /// the final depth.
    #[instrument(skip_all)]
    pub fn compile(program: &impl Lower) -> Result<(Bytecode, usize), CompileError> {
        let mut compiler = Self::new();
        let depth = program.lower(&mut compiler, &SymbolTable::new(), 0)?;
        debug!(instructions = compiler.bytecode.len(), depth, "compiled");
        Ok((compiler.finish(), depth))
    }

    pub fn bytecode(&self) -> &Bytecode {
        &self.bytecode
    }

    pub fn finish(self) -> Bytecode {
        self.bytecode
    }

    pub fn emit(&mut self, instruction: Instruction) -> usize {
        let index = self.bytecode.emit(instruction);
        trace!(index, %instruction, "emit");
        index
    }

    fn consume(&self, depth: usize, count: usize) -> Result<usize, CompileError> {
        depth
            .checked_sub(count)
            .ok_or(CompileError::DepthUnderflow {
                at: self.bytecode.offset(),
            })
    }

    pub fn literal(&mut self, value: Integer, depth: usize) -> usize {
        self.emit(Instruction::LoadLiteral(value));
        depth + 1
    }

    /// Left operand first, then right, then `add`.
    pub fn addition(
        &mut self,
        left: &impl Lower,
        right: &impl Lower,
        symbols: &SymbolTable<'_>,
        depth: usize,
    ) -> Result<usize, CompileError> {
        let depth = left.lower(self, symbols, depth)?;
        let depth = right.lower(self, symbols, depth)?;
        let depth = self.consume(depth, 2)?;
        self.emit(Instruction::Add);
        Ok(depth + 1)
    }

    pub fn reference(
        &mut self,
        name: &str,
        symbols: &SymbolTable<'_>,
        depth: usize,
    ) -> Result<usize, CompileError> {
        let slot = symbols.lookup(name)?;
        self.emit(Instruction::Copy(slot));
        Ok(depth + 1)
    }

    /// The value is compiled under the outer symbols, so it cannot see `name`.
    /// Its result becomes the top of the stack and `name` is bound to that
    /// slot while the body is compiled. A `drop` of the slot afterwards leaves
    /// the body's result in its place.
    pub fn definition(
        &mut self,
        name: &str,
        value: &impl Lower,
        body: &impl Lower,
        symbols: &SymbolTable<'_>,
        depth: usize,
    ) -> Result<usize, CompileError> {
        let bound = value.lower(self, symbols, depth)?;
        let slot = self.consume(bound, 1)?;
        let scope = symbols.bind(name, slot);
        let after = body.lower(self, &scope, bound)?;
        if after <= slot {
            return Err(CompileError::DepthUnderflow {
                at: self.bytecode.offset(),
            });
        }
        self.emit(Instruction::Drop(slot));
        Ok(after - 1)
    }

    /// Lays out `test, branch, no, jump, yes`. Both jump targets are unknown
    /// when emitted and get patched once the code they skip exists.
    pub fn condition(
        &mut self,
        test: &impl Lower,
        yes: &impl Lower,
        no: &impl Lower,
        symbols: &SymbolTable<'_>,
        depth: usize,
    ) -> Result<usize, CompileError> {
        let tested = test.lower(self, symbols, depth)?;
        let depth = self.consume(tested, 1)?;
        let branch = self.emit(Instruction::Branch(0));

        let no_depth = no.lower(self, symbols, depth)?;
        let jump = self.emit(Instruction::Jump(0));

        let yes_start = self.bytecode.offset();
        self.bytecode.patch(branch, yes_start);
        let yes_depth = yes.lower(self, symbols, depth)?;

        let join = self.bytecode.offset();
        self.bytecode.patch(jump, join);

        if no_depth != yes_depth {
            return Err(CompileError::IllFormedCondition {
                no: no_depth,
                yes: yes_depth,
            });
        }
        Ok(yes_depth)
    }
}

impl Lower for Expression {
    fn lower(
        &self,
        compiler: &mut Compiler,
        symbols: &SymbolTable<'_>,
        depth: usize,
    ) -> Result<usize, CompileError> {
        match self {
            Self::Literal(value) => Ok(compiler.literal(*value, depth)),
            Self::Addition { left, right } => {
                compiler.addition(&**left, &**right, symbols, depth)
            }
            Self::Definition { name, value, body } => {
                compiler.definition(name, &**value, &**body, symbols, depth)
            }
            Self::Reference(name) => compiler.reference(name, symbols, depth),
            Self::Condition { test, yes, no } => {
                compiler.condition(&**test, &**yes, &**no, symbols, depth)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::{
        bytecode::Instruction::{self, *},
        CompileError, Compiler, Lower,
    };
    use crate::{scope::SymbolTable, Expression, UnboundReference};

    fn compile(program: &Expression) -> (Vec<Instruction>, usize) {
        let_assert!(Ok((bytecode, depth)) = Compiler::compile(program));
        (bytecode.as_slice().to_vec(), depth)
    }

    /// Emits `count` zeros regardless of what it is asked to lower into.
    struct Pushes(usize);

    impl Lower for Pushes {
        fn lower(
            &self,
            compiler: &mut Compiler,
            _: &SymbolTable<'_>,
            depth: usize,
        ) -> Result<usize, CompileError> {
            for _ in 0..self.0 {
                compiler.emit(LoadLiteral(0));
            }
            Ok(depth + self.0)
        }
    }

    #[test]
    fn addition_is_left_right_add() {
        let program = Expression::add(Expression::literal(1), Expression::literal(2));
        check!(compile(&program) == (vec![LoadLiteral(1), LoadLiteral(2), Add], 1));
    }

    #[test]
    fn definition_binds_the_top_slot() {
        let program = Expression::define(
            "five",
            Expression::literal(5),
            Expression::add(Expression::literal(4), Expression::reference("five")),
        );
        check!(
            compile(&program)
                == (
                    vec![LoadLiteral(5), LoadLiteral(4), Copy(0), Add, Drop(0)],
                    1
                )
        );
    }

    #[test]
    fn nested_definitions_get_increasing_slots() {
        let program = Expression::define(
            "x",
            Expression::literal(1),
            Expression::define(
                "y",
                Expression::literal(2),
                Expression::add(Expression::reference("x"), Expression::reference("y")),
            ),
        );
        check!(
            compile(&program)
                == (
                    vec![
                        LoadLiteral(1),
                        LoadLiteral(2),
                        Copy(0),
                        Copy(1),
                        Add,
                        Drop(1),
                        Drop(0)
                    ],
                    1
                )
        );
    }

    #[test]
    fn slots_account_for_values_already_on_the_stack() {
        let program = Expression::add(
            Expression::literal(10),
            Expression::define("a", Expression::literal(1), Expression::reference("a")),
        );
        check!(
            compile(&program)
                == (
                    vec![LoadLiteral(10), LoadLiteral(1), Copy(1), Drop(1), Add],
                    1
                )
        );
    }

    #[test]
    fn shadowing_resolves_to_the_inner_slot() {
        let program = Expression::define(
            "x",
            Expression::literal(1),
            Expression::define("x", Expression::literal(2), Expression::reference("x")),
        );
        let (bytecode, _) = compile(&program);
        check!(bytecode[2] == Copy(1));
    }

    #[test]
    fn condition_is_backpatched() {
        let program = Expression::condition(
            Expression::literal(0),
            Expression::literal(2),
            Expression::literal(3),
        );
        check!(
            compile(&program)
                == (
                    vec![
                        LoadLiteral(0),
                        Branch(4),
                        LoadLiteral(3),
                        Jump(5),
                        LoadLiteral(2)
                    ],
                    1
                )
        );
    }

    #[test]
    fn nested_conditions_patch_their_own_jumps() {
        let program = Expression::condition(
            Expression::literal(1),
            Expression::condition(
                Expression::literal(0),
                Expression::literal(10),
                Expression::literal(20),
            ),
            Expression::literal(30),
        );
        check!(
            compile(&program)
                == (
                    vec![
                        LoadLiteral(1),
                        Branch(4),
                        LoadLiteral(30),
                        Jump(9),
                        LoadLiteral(0),
                        Branch(8),
                        LoadLiteral(20),
                        Jump(9),
                        LoadLiteral(10),
                    ],
                    1
                )
        );
    }

    #[test]
    fn unbound_names_are_rejected() {
        let program = Expression::add(Expression::literal(1), Expression::reference("nope"));
        let_assert!(
            Err(CompileError::Unbound(UnboundReference { name })) = Compiler::compile(&program)
        );
        check!(name.as_ref() == "nope");
    }

    #[test]
    fn unbound_names_in_either_arm_are_rejected() {
        let program = Expression::condition(
            Expression::literal(1),
            Expression::literal(2),
            Expression::reference("never"),
        );
        check!(Compiler::compile(&program).is_err());
    }

    #[test]
    fn definitions_are_not_recursive() {
        let program = Expression::define("x", Expression::reference("x"), Expression::literal(0));
        let_assert!(Err(CompileError::Unbound(_)) = Compiler::compile(&program));
    }

    #[test]
    fn unbalanced_arms_are_rejected() {
        let mut compiler = Compiler::new();
        let result = compiler.condition(
            &Expression::literal(1),
            &Pushes(2),
            &Pushes(1),
            &SymbolTable::new(),
            0,
        );
        check!(result == Err(CompileError::IllFormedCondition { no: 1, yes: 2 }));
    }

    #[test]
    fn balanced_arms_of_any_width_are_accepted() {
        let mut compiler = Compiler::new();
        let result = compiler.condition(
            &Expression::literal(1),
            &Pushes(3),
            &Pushes(3),
            &SymbolTable::new(),
            2,
        );
        check!(result == Ok(5));
    }

    #[test]
    fn consuming_missing_values_is_an_underflow() {
        let mut compiler = Compiler::new();
        let result = compiler.addition(&Pushes(1), &Pushes(0), &SymbolTable::new(), 0);
        check!(result == Err(CompileError::DepthUnderflow { at: 1 }));
    }
}
