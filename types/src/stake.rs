use rand::Rng;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StakePoolError {
    #[error("stake pool must contain at least one stake")]
    Empty,
    #[error("invalid stake range (min={min}, max={max})")]
    InvalidRange { min: u64, max: u64 },
}

/// Stakes submitted by every iteration of a run.
///
/// Generated once and shared read-only between virtual users, so cloning only
/// bumps a reference count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakePool {
    stakes: Arc<[u64]>,
}

impl StakePool {
    /// Draws `size` stakes uniformly from `[min, max)` and then overwrites one
    /// random slot with `max`, so the pool holds exactly one maximum stake.
    pub fn generate(
        rng: &mut impl Rng,
        size: usize,
        min: u64,
        max: u64,
    ) -> Result<Self, StakePoolError> {
        if size == 0 {
            return Err(StakePoolError::Empty);
        }
        if min == 0 || min >= max {
            return Err(StakePoolError::InvalidRange { min, max });
        }

        let mut stakes: Vec<u64> = (0..size).map(|_| rng.gen_range(min..max)).collect();
        let forced = rng.gen_range(0..size);
        stakes[forced] = max;
        Ok(Self {
            stakes: stakes.into(),
        })
    }

    pub fn stakes(&self) -> &[u64] {
        &self.stakes
    }

    pub fn len(&self) -> usize {
        self.stakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stakes.is_empty()
    }

    /// Number of stakes equal to `amount`.
    pub fn count_of(&self, amount: u64) -> usize {
        self.stakes.iter().filter(|stake| **stake == amount).count()
    }
}

impl From<Vec<u64>> for StakePool {
    fn from(stakes: Vec<u64>) -> Self {
        Self {
            stakes: stakes.into(),
        }
    }
}
