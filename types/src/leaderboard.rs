//! Parsing and invariant checking for the highstakes leaderboard.
//!
//! The endpoint answers with `customer=stake` pairs joined by commas, ordered
//! by stake (highest first) and capped at [LEADERBOARD_CAPACITY] entries. The
//! service keeps one stake per customer (their highest), so a customer never
//! appears twice.

use crate::{CustomerId, LEADERBOARD_CAPACITY, MAX_STAKE, MIN_STAKE};
use std::{collections::HashSet, fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LeaderboardParseError {
    #[error("leaderboard body is empty")]
    Empty,
    #[error("malformed entry {index}: {entry:?} (expected customer=stake)")]
    MalformedEntry { index: usize, entry: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub customer: CustomerId,
    pub stake: u64,
}

impl LeaderboardEntry {
    /// Parse one `customer=stake` pair. Both sides must be plain digits.
    pub fn parse(entry: &str) -> Option<Self> {
        let (customer, stake) = entry.split_once('=')?;
        if !is_digits(customer) || !is_digits(stake) {
            return None;
        }
        Some(Self {
            customer: CustomerId(customer.parse().ok()?),
            stake: stake.parse().ok()?,
        })
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for LeaderboardEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.customer, self.stake)
    }
}

/// Bounds a fetched leaderboard is checked against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rules {
    pub min_stake: u64,
    pub max_stake: u64,
    pub capacity: usize,
    /// Require exactly `capacity` entries instead of at most. Only holds once
    /// enough customers have staked on the offer.
    pub exact_len: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            min_stake: MIN_STAKE,
            max_stake: MAX_STAKE,
            capacity: LEADERBOARD_CAPACITY,
            exact_len: false,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("leaderboard has {len} entries (max {max})")]
    TooManyEntries { len: usize, max: usize },
    #[error("leaderboard has {len} entries (expected {expected})")]
    WrongLength { len: usize, expected: usize },
    #[error("stake {stake} at entry {index} outside [{min}, {max}]")]
    StakeOutOfRange {
        index: usize,
        stake: u64,
        min: u64,
        max: u64,
    },
    #[error("stake {stake} at entry {index} exceeds previous stake {previous}")]
    NotDescending {
        index: usize,
        previous: u64,
        stake: u64,
    },
    #[error("customer {customer} appears more than once")]
    DuplicateCustomer { customer: CustomerId },
    #[error("max stake {max} not found")]
    MaxStakeMissing { max: u64 },
}

/// Every violation found in one leaderboard, in entry order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Verification {
    pub violations: Vec<Violation>,
    pub max_found: bool,
}

impl Verification {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn parse(body: &str) -> Result<Self, LeaderboardParseError> {
        if body.is_empty() {
            return Err(LeaderboardParseError::Empty);
        }
        let entries = body
            .split(',')
            .enumerate()
            .map(|(index, entry)| {
                LeaderboardEntry::parse(entry).ok_or_else(|| {
                    LeaderboardParseError::MalformedEntry {
                        index,
                        entry: entry.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stakes(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().map(|entry| entry.stake)
    }

    pub fn verify(&self, rules: &Rules) -> Verification {
        let mut violations = Vec::new();

        let len = self.entries.len();
        if rules.exact_len {
            if len != rules.capacity {
                violations.push(Violation::WrongLength {
                    len,
                    expected: rules.capacity,
                });
            }
        } else if len > rules.capacity {
            violations.push(Violation::TooManyEntries {
                len,
                max: rules.capacity,
            });
        }

        let mut previous = u64::MAX;
        let mut seen = HashSet::with_capacity(len);
        let mut max_found = false;
        for (index, entry) in self.entries.iter().enumerate() {
            let stake = entry.stake;
            if stake < rules.min_stake || stake > rules.max_stake {
                violations.push(Violation::StakeOutOfRange {
                    index,
                    stake,
                    min: rules.min_stake,
                    max: rules.max_stake,
                });
            }
            if stake > previous {
                violations.push(Violation::NotDescending {
                    index,
                    previous,
                    stake,
                });
            }
            if !seen.insert(entry.customer) {
                violations.push(Violation::DuplicateCustomer {
                    customer: entry.customer,
                });
            }
            max_found |= stake == rules.max_stake;
            previous = stake;
        }

        if !max_found {
            violations.push(Violation::MaxStakeMissing {
                max: rules.max_stake,
            });
        }

        Verification {
            violations,
            max_found,
        }
    }
}

impl FromStr for Leaderboard {
    type Err = LeaderboardParseError;

    fn from_str(body: &str) -> Result<Self, Self::Err> {
        Self::parse(body)
    }
}

impl From<Vec<LeaderboardEntry>> for Leaderboard {
    fn from(entries: Vec<LeaderboardEntry>) -> Self {
        Self { entries }
    }
}

/// Renders the wire form: `customer=stake` joined by commas.
impl fmt::Display for Leaderboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}
