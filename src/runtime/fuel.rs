//! Step budgets for suspendable runs

/// How many more instructions a [`Machine`](super::interpreter::Machine) may
/// execute before it suspends.
///
/// A suspended run keeps its pointer and stack, so topping the budget up
/// with [`Fuel::refill`] and running again continues where it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fuel {
    steps: u32,
    interrupted: bool,
}

impl Fuel {
    pub fn with(steps: u32) -> Self {
        Self {
            steps,
            interrupted: false,
        }
    }

    pub fn unlimited() -> Self {
        Self::with(u32::MAX)
    }

    /// Starts a new slice of `steps` and forgets any pending interrupt.
    ///
    /// Steps left over from the previous slice are not carried forward.
    pub fn refill(&mut self, steps: u32) {
        self.steps = steps;
        self.interrupted = false;
    }

    pub fn remaining(&self) -> u32 {
        self.steps
    }

    /// Suspends the run before its next instruction, whatever is left.
    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    /// Pays for one instruction, or returns false if the run has to suspend.
    pub(crate) fn burn(&mut self) -> bool {
        if self.interrupted || self.steps == 0 {
            return false;
        }
        self.steps -= 1;
        true
    }
}
