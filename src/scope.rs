//! Lexical scopes as persistent frame lists.
//!
//! A [`Scope`] is either empty or a single frame pointing at the scope it
//! extends. Frames live on the Rust stack of whichever recursive call created
//! them, so a binding disappears exactly when that call returns, and extending
//! a scope never disturbs anyone else still holding the outer one.
use crate::{compiler::bytecode::Slot, Integer};

/// Name to value bindings, as seen by the tree-walking evaluator
pub type Environment<'a> = Scope<'a, Integer>;
/// Name to stack slot bindings, as seen by the compiler
pub type SymbolTable<'a> = Scope<'a, Slot>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unbound reference to `{name}`")]
pub struct UnboundReference {
    pub name: Box<str>,
}

#[derive(Debug, Clone, Copy)]
pub enum Scope<'a, T> {
    Empty,
    Frame {
        name: &'a str,
        value: T,
        rest: &'a Scope<'a, T>,
    },
}

impl<'a, T: Copy> Scope<'a, T> {
    pub fn new() -> Self {
        Self::Empty
    }

    /// Creates a scope where `name` is bound to `value` in front of every binding of `self`.
    ///
    /// `self` is left untouched; an existing binding of `name` is shadowed, not replaced.
    pub fn bind<'b>(&'b self, name: &'b str, value: T) -> Scope<'b, T>
    where
        'a: 'b,
    {
        Scope::Frame {
            name,
            value,
            rest: self,
        }
    }

    /// Resolves `name` to the value of its innermost binding.
    pub fn lookup(&self, name: &str) -> Result<T, UnboundReference> {
        self.iter()
            .find_map(|(bound, value)| (bound == name).then_some(value))
            .ok_or_else(|| UnboundReference {
                name: Box::from(name),
            })
    }

    /// Walks the bindings newest first, shadowed ones included.
    pub fn iter(&self) -> Frames<'_, T> {
        Frames { next: self }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

pub struct Frames<'s, T> {
    next: &'s Scope<'s, T>,
}

impl<'s, T: Copy> Iterator for Frames<'s, T> {
    type Item = (&'s str, T);

    fn next(&mut self) -> Option<Self::Item> {
        let scope = self.next;
        match scope {
            Scope::Empty => None,
            Scope::Frame { name, value, rest } => {
                self.next = *rest;
                Some((*name, *value))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::{Environment, SymbolTable, UnboundReference};

    #[test]
    fn innermost_binding_wins() {
        let root = Environment::new();
        let outer = root.bind("x", 1);
        let inner = outer.bind("x", 2);

        check!(inner.lookup("x") == Ok(2));
        // the outer scope still sees its own binding
        check!(outer.lookup("x") == Ok(1));
        check!(inner.len() == 2);
    }

    #[test]
    fn siblings_share_a_parent() {
        let root = SymbolTable::new();
        let parent = root.bind("a", 0);
        let left = parent.bind("b", 1);
        let right = parent.bind("c", 1);

        check!(left.lookup("a") == Ok(0));
        check!(right.lookup("a") == Ok(0));
        check!(left.lookup("c").is_err());
        check!(right.lookup("b").is_err());
    }

    #[test]
    fn exhausted_scope_is_an_error() {
        let root = Environment::new();
        let scope = root.bind("five", 5);

        let_assert!(Err(UnboundReference { name }) = scope.lookup("six"));
        check!(name.as_ref() == "six");
        check!(Environment::new().lookup("six").is_err());
        check!(Environment::new().is_empty());
    }

    #[test]
    fn frames_are_listed_newest_first() {
        let root = SymbolTable::new();
        let a = root.bind("a", 0);
        let b = a.bind("b", 1);
        let c = b.bind("a", 2);

        let names = c.iter().collect::<Vec<_>>();
        check!(names == [("a", 2), ("b", 1), ("a", 0)]);
    }
}
