use serde::{Deserialize, Serialize};

/// Monotonically increasing counter associated with the number of ticks or notifications an
/// [`Engine`](https://docs.rs/cerebro) has processed.
///
/// Shared by any tick-ordered component (engine loop, notification queue, trade ledger) that
/// needs a stable processing order independent of wall-clock or bar timestamps.
#[derive(
    Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct Sequence(pub u64);

impl Sequence {
    /// A fresh [`Sequence`] starting at zero.
    pub fn new() -> Self {
        Self(0)
    }

    /// Returns the next [`Sequence`], leaving `self` unchanged.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Increments `self` in place and returns the value prior to incrementing.
    pub fn fetch_add(&mut self) -> Self {
        let current = *self;
        self.0 += 1;
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_add_returns_prior_value_and_increments() {
        let mut sequence = Sequence::new();
        assert_eq!(sequence.fetch_add(), Sequence(0));
        assert_eq!(sequence.fetch_add(), Sequence(1));
        assert_eq!(sequence, Sequence(2));
    }

    #[test]
    fn next_does_not_mutate() {
        let sequence = Sequence(5);
        assert_eq!(sequence.next(), Sequence(6));
        assert_eq!(sequence, Sequence(5));
    }
}
