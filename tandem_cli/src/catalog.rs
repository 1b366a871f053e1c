//! The built-in demo programs.
//!
//! There is no surface syntax, so every program here is a tree built by hand.
use tandem::{Expression, Integer};

pub struct Entry {
    pub name: &'static str,
    pub about: &'static str,
    pub program: Expression,
    /// `None` when the compiler is expected to reject the program
    pub expected: Option<Integer>,
}

pub fn catalog() -> Vec<Entry> {
    use Expression as E;

    vec![
        Entry {
            name: "condition",
            about: "a zero test falls through to the `no` arm",
            program: E::condition(E::literal(0), E::literal(2), E::literal(3)),
            expected: Some(3),
        },
        Entry {
            name: "five",
            about: "a definition used from inside an addition",
            program: E::define(
                "five",
                E::literal(5),
                E::add(E::literal(4), E::reference("five")),
            ),
            expected: Some(9),
        },
        Entry {
            name: "shadow",
            about: "an inner definition hides an outer one of the same name",
            program: E::define(
                "x",
                E::literal(1),
                E::define("x", E::literal(2), E::reference("x")),
            ),
            expected: Some(2),
        },
        Entry {
            name: "sum",
            about: "the smallest program that needs the stack",
            program: E::add(E::literal(1), E::literal(2)),
            expected: Some(3),
        },
        Entry {
            name: "nested",
            about: "definitions inside both arms of a condition, with values already on the stack",
            program: E::define(
                "a",
                E::literal(10),
                E::add(
                    E::reference("a"),
                    E::condition(
                        E::add(E::reference("a"), E::literal(-10)),
                        E::define("b", E::literal(100), E::reference("b")),
                        E::define(
                            "a",
                            E::add(E::reference("a"), E::literal(1)),
                            E::add(E::reference("a"), E::reference("a")),
                        ),
                    ),
                ),
            ),
            expected: Some(32),
        },
        Entry {
            name: "unbound",
            about: "a reference nothing binds is reported instead of run",
            program: E::define(
                "x",
                E::literal(1),
                E::add(E::reference("x"), E::reference("y")),
            ),
            expected: None,
        },
    ]
}
