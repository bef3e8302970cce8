//! The pre-reserved identifier pool threaded through materialization.

use thiserror::Error;

use crate::ops::LinkId;

/// Errors raised when the pool is consumed inconsistently with its estimate.
///
/// Both variants indicate that the estimator and the materializer disagree
/// about a schema. They are programming defects, not recoverable conditions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("identifier pool exhausted after consuming all {reserved} reserved ids")]
    Exhausted { reserved: usize },

    #[error("identifier pool not drained: {remaining} of {reserved} reserved ids unused")]
    Undrained { reserved: usize, remaining: usize },
}

/// An ordered, finite sequence of unique ids reserved for one compilation.
///
/// Ids are consumed from the end of the sequence, so the last id handed out
/// by the store is the first one used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierPool {
    ids: Vec<LinkId>,
    reserved: usize,
}

impl IdentifierPool {
    pub fn new(ids: Vec<LinkId>) -> Self {
        let reserved = ids.len();
        Self { ids, reserved }
    }

    /// A pool of `count` consecutive ids starting at `first`.
    ///
    /// Used for dry runs where no store is involved.
    pub fn sequential(first: LinkId, count: usize) -> Self {
        Self::new((0..count as u64).map(|offset| first + offset).collect())
    }

    /// Take the next id.
    pub fn pop(&mut self) -> Result<LinkId, PoolError> {
        self.ids.pop().ok_or(PoolError::Exhausted {
            reserved: self.reserved,
        })
    }

    /// Number of ids not yet consumed.
    pub fn remaining(&self) -> usize {
        self.ids.len()
    }

    /// Number of ids the pool was created with.
    pub fn reserved(&self) -> usize {
        self.reserved
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Consume the pool, failing if any reserved id was left unused.
    pub fn finish(self) -> Result<(), PoolError> {
        if self.ids.is_empty() {
            Ok(())
        } else {
            Err(PoolError::Undrained {
                reserved: self.reserved,
                remaining: self.ids.len(),
            })
        }
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_from_the_end() {
        let mut pool = IdentifierPool::new(vec![10, 11, 12]);
        assert_eq!(pool.pop(), Ok(12));
        assert_eq!(pool.pop(), Ok(11));
        assert_eq!(pool.remaining(), 1);
        assert_eq!(pool.reserved(), 3);
    }

    #[test]
    fn exhausted_pool_fails() {
        let mut pool = IdentifierPool::new(vec![1]);
        pool.pop().unwrap();
        assert_eq!(pool.pop(), Err(PoolError::Exhausted { reserved: 1 }));
    }

    #[test]
    fn finish_requires_full_drain() {
        let mut pool = IdentifierPool::sequential(100, 2);
        pool.pop().unwrap();
        assert_eq!(
            pool.clone().finish(),
            Err(PoolError::Undrained {
                reserved: 2,
                remaining: 1
            })
        );
        pool.pop().unwrap();
        assert!(pool.finish().is_ok());
    }

    #[test]
    fn sequential_is_consecutive() {
        let pool = IdentifierPool::sequential(7, 3);
        assert_eq!(pool, IdentifierPool::new(vec![7, 8, 9]));
    }
}
