//! Ready-made observers for watching a machine run.
use core::fmt;

use super::interpreter::{Executed, Observer};

/// Records every executed step, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    steps: Vec<(usize, Executed)>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[(usize, Executed)] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Observer for Trace {
    fn observe(&mut self, at: usize, executed: &Executed) {
        self.steps.push((at, *executed));
    }
}

/// One line per step: the instruction index, a tab, then what it did.
impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (at, executed) in &self.steps {
            writeln!(f, "{at}\t{executed}")?;
        }
        Ok(())
    }
}

/// Counts how many times each instruction index was executed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    hits: Vec<usize>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self, index: usize) -> usize {
        self.hits.get(index).copied().unwrap_or(0)
    }

    /// Total number of executed steps
    pub fn total(&self) -> usize {
        self.hits.iter().sum()
    }

    /// Indices in `range` that never ran
    pub fn unexecuted(&self, range: core::ops::Range<usize>) -> Vec<usize> {
        range.filter(|&index| self.hits(index) == 0).collect()
    }
}

impl Observer for Profile {
    fn observe(&mut self, at: usize, _: &Executed) {
        if self.hits.len() <= at {
            self.hits.resize(at + 1, 0);
        }
        self.hits[at] += 1;
    }
}
