//! The program representation both engines consume.
//!
//! Trees are built by the caller (there is no surface syntax) and are only
//! ever read afterwards, so the evaluator and the compiler can share one.
use core::fmt;

use crate::Integer;

/// A program: an integer expression over named, lexically scoped bindings.
///
/// Every child is exclusively owned by its parent, so a tree has no sharing
/// and no cycles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    Literal(Integer),
    /// `left + right`, with `left` evaluated first
    Addition {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// `let name = value in body`
    ///
    /// Not recursive: `value` is resolved in the scope *outside* the definition.
    Definition {
        name: Box<str>,
        value: Box<Expression>,
        body: Box<Expression>,
    },
    Reference(Box<str>),
    /// `if test != 0 { yes } else { no }`
    Condition {
        test: Box<Expression>,
        yes: Box<Expression>,
        no: Box<Expression>,
    },
}

impl Expression {
    pub fn literal(value: Integer) -> Self {
        Self::Literal(value)
    }

    pub fn add(left: Expression, right: Expression) -> Self {
        Self::Addition {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn define(name: impl AsRef<str>, value: Expression, body: Expression) -> Self {
        Self::Definition {
            name: Box::from(name.as_ref()),
            value: Box::new(value),
            body: Box::new(body),
        }
    }

    pub fn reference(name: impl AsRef<str>) -> Self {
        Self::Reference(Box::from(name.as_ref()))
    }

    pub fn condition(test: Expression, yes: Expression, no: Expression) -> Self {
        Self::Condition {
            test: Box::new(test),
            yes: Box::new(yes),
            no: Box::new(no),
        }
    }

    /// Number of nodes in the tree
    pub fn size(&self) -> usize {
        match self {
            Self::Literal(_) | Self::Reference(_) => 1,
            Self::Addition { left, right } => 1 + left.size() + right.size(),
            Self::Definition { value, body, .. } => 1 + value.size() + body.size(),
            Self::Condition { test, yes, no } => 1 + test.size() + yes.size() + no.size(),
        }
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            Self::Literal(value) => {
                indent(f, depth)?;
                write!(f, "{value}")
            }
            Self::Reference(name) => {
                indent(f, depth)?;
                write!(f, "{name}")
            }
            Self::Addition { left, right } => {
                write_call(f, "add", depth, &[Child::Node(left), Child::Node(right)])
            }
            Self::Definition { name, value, body } => write_call(
                f,
                "define",
                depth,
                &[Child::Name(name), Child::Node(value), Child::Node(body)],
            ),
            Self::Condition { test, yes, no } => write_call(
                f,
                "if",
                depth,
                &[Child::Node(test), Child::Node(yes), Child::Node(no)],
            ),
        }
    }
}

enum Child<'a> {
    Name(&'a str),
    Node(&'a Expression),
}

fn indent(f: &mut fmt::Formatter<'_>, by: usize) -> fmt::Result {
    (0..by).try_for_each(|_| write!(f, "\t"))
}

fn write_call(
    f: &mut fmt::Formatter<'_>,
    head: &str,
    depth: usize,
    children: &[Child<'_>],
) -> fmt::Result {
    indent(f, depth)?;
    writeln!(f, "{head}(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            writeln!(f, ",")?;
        }
        match child {
            Child::Name(name) => {
                indent(f, depth + 1)?;
                write!(f, "{name}")?;
            }
            Child::Node(node) => node.write_tree(f, depth + 1)?,
        }
    }
    writeln!(f)?;
    indent(f, depth)?;
    write!(f, ")")
}

/// Lists the tree one node per line, children indented by a tab.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::Expression;

    #[test]
    fn leaves_list_on_one_line() {
        check!(Expression::literal(-4).to_string() == "-4");
        check!(Expression::reference("five").to_string() == "five");
    }

    #[test]
    fn nested_listing() {
        let program = Expression::define(
            "five",
            Expression::literal(5),
            Expression::add(Expression::literal(4), Expression::reference("five")),
        );

        check!(
            program.to_string()
                == "define(\n\tfive,\n\t5,\n\tadd(\n\t\t4,\n\t\tfive\n\t)\n)"
        );
    }

    #[test]
    fn condition_listing() {
        let program = Expression::condition(
            Expression::literal(0),
            Expression::literal(2),
            Expression::literal(3),
        );

        check!(program.to_string() == "if(\n\t0,\n\t2,\n\t3\n)");
    }

    #[test]
    fn size_counts_every_node() {
        let program = Expression::define(
            "x",
            Expression::literal(1),
            Expression::condition(
                Expression::reference("x"),
                Expression::literal(2),
                Expression::add(Expression::literal(3), Expression::literal(4)),
            ),
        );
        check!(program.size() == 8);
    }
}
