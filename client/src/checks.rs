use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Assertion made against a response. Each one is tallied by name across the
/// whole run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Check {
    SessionAcquired,
    StakeAccepted,
    HighStakesStatus,
    NotEmpty,
    EntryFormat,
    LeaderboardLength,
    StakeInRange,
    Descending,
    UniqueCustomers,
    MaxStakeFound,
}

const CHECK_COUNT: usize = 10;

impl Check {
    pub const ALL: [Check; CHECK_COUNT] = [
        Check::SessionAcquired,
        Check::StakeAccepted,
        Check::HighStakesStatus,
        Check::NotEmpty,
        Check::EntryFormat,
        Check::LeaderboardLength,
        Check::StakeInRange,
        Check::Descending,
        Check::UniqueCustomers,
        Check::MaxStakeFound,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Check::SessionAcquired => "session status is 200",
            Check::StakeAccepted => "stake status is 200",
            Check::HighStakesStatus => "highstakes status is 200",
            Check::NotEmpty => "response is not empty",
            Check::EntryFormat => "entry is well formed",
            Check::LeaderboardLength => "leaderboard length",
            Check::StakeInRange => "stake is valid",
            Check::Descending => "stake is in descending order",
            Check::UniqueCustomers => "customers are unique",
            Check::MaxStakeFound => "max stake found",
        }
    }
}

#[derive(Default)]
struct Tally {
    passed: AtomicU64,
    failed: AtomicU64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckSnapshot {
    pub name: &'static str,
    pub passed: u64,
    pub failed: u64,
}

impl CheckSnapshot {
    pub fn pass_rate(&self) -> f64 {
        let total = self.passed + self.failed;
        if total == 0 {
            return 100.0;
        }
        (self.passed as f64 / total as f64) * 100.0
    }
}

/// Run-wide pass/fail counters, shared by every virtual user.
#[derive(Default)]
pub struct Checks {
    tallies: [Tally; CHECK_COUNT],
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one evaluation of `check` and hand back `passed`.
    pub fn record(&self, check: Check, passed: bool) -> bool {
        let tally = &self.tallies[check as usize];
        if passed {
            tally.passed.fetch_add(1, Ordering::Relaxed);
        } else {
            tally.failed.fetch_add(1, Ordering::Relaxed);
            debug!(check = check.name(), "check failed");
        }
        passed
    }

    pub fn passed(&self, check: Check) -> u64 {
        self.tallies[check as usize].passed.load(Ordering::Relaxed)
    }

    pub fn failed(&self, check: Check) -> u64 {
        self.tallies[check as usize].failed.load(Ordering::Relaxed)
    }

    pub fn failed_total(&self) -> u64 {
        Check::ALL.iter().map(|check| self.failed(*check)).sum()
    }

    pub fn snapshot(&self) -> Vec<CheckSnapshot> {
        Check::ALL
            .iter()
            .map(|check| CheckSnapshot {
                name: check.name(),
                passed: self.passed(*check),
                failed: self.failed(*check),
            })
            .collect()
    }
}
