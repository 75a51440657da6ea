//! Request identifier generation.

/// Monotonic request id counter.
///
/// Starts at 1 and wraps back to 1 instead of ever emitting `0` or
/// `u32::MAX`. Ids are unique only within one generator's lifetime and only
/// among calls whose flight times overlap.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    next: u32,
}

impl IdGenerator {
    /// Create a generator whose first id is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Create a generator starting at `start`.
    ///
    /// `0` and `u32::MAX` are never emitted, so either value starts at 1.
    #[must_use]
    pub const fn starting_at(start: u32) -> Self {
        let next = if start == 0 || start == u32::MAX { 1 } else { start };
        Self { next }
    }

    /// Return the current id and advance the counter.
    pub const fn next_id(&mut self) -> u32 {
        if self.next == u32::MAX {
            self.next = 1;
        }
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
