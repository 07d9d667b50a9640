//! Allocation strategies
//!
//! An allocation strategy decides how many bytes to reserve for a record's
//! data. Reserving more than needed lets later updates stay in place.

use crate::config::AllocationPolicy;

/// Policy mapping a record's data size to its allocated size
///
/// The record manager never allocates less than the data size, whatever
/// the strategy returns.
pub trait AllocationStrategy {
    fn allocated_size(&self, data_size: usize) -> usize;
}

impl<F> AllocationStrategy for F
where
    F: Fn(usize) -> usize,
{
    fn allocated_size(&self, data_size: usize) -> usize {
        self(data_size)
    }
}

/// Reserve exactly the data size
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactSizeAllocationStrategy;

impl AllocationStrategy for ExactSizeAllocationStrategy {
    fn allocated_size(&self, data_size: usize) -> usize {
        data_size
    }
}

/// Reserve twice the data size
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleSizeAllocationStrategy;

impl AllocationStrategy for DoubleSizeAllocationStrategy {
    fn allocated_size(&self, data_size: usize) -> usize {
        data_size.saturating_mul(2)
    }
}

/// Reserve room for a B-tree node to fill up before it has to move
///
/// A fresh node is nearly empty when created; reserving for a full node
/// (`2t - 1` entries) keeps node records at a stable address.
#[derive(Debug, Clone, Copy)]
pub struct BTreeNodeAllocationStrategy {
    degree: usize,
}

impl BTreeNodeAllocationStrategy {
    /// Estimated encoded size of one entry plus one child address
    pub const ESTIMATED_ENTRY_SIZE: usize = 48;

    pub fn new(degree: usize) -> Self {
        Self { degree }
    }
}

impl AllocationStrategy for BTreeNodeAllocationStrategy {
    fn allocated_size(&self, data_size: usize) -> usize {
        let full_node = data_size + 2 * self.degree * Self::ESTIMATED_ENTRY_SIZE;
        full_node.max(data_size.saturating_mul(2))
    }
}

impl AllocationPolicy {
    /// The strategy implementing this policy
    pub fn strategy(&self) -> &'static dyn AllocationStrategy {
        match self {
            AllocationPolicy::DoubleSize => &DoubleSizeAllocationStrategy,
            AllocationPolicy::ExactSize => &ExactSizeAllocationStrategy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_a_strategy() {
        let fixed = |_: usize| 200;
        assert_eq!(fixed.allocated_size(10), 200);
    }

    #[test]
    fn test_node_strategy_reserves_for_full_node() {
        let strategy = BTreeNodeAllocationStrategy::new(4);
        let full = 16 + 8 * BTreeNodeAllocationStrategy::ESTIMATED_ENTRY_SIZE;
        assert!(strategy.allocated_size(16) >= full);
        assert_eq!(strategy.allocated_size(10_000), 20_000);
    }

    #[test]
    fn test_policy_strategies() {
        assert_eq!(AllocationPolicy::DoubleSize.strategy().allocated_size(3), 6);
        assert_eq!(AllocationPolicy::ExactSize.strategy().allocated_size(3), 3);
    }
}
