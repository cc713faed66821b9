use crate::{Check, Checks, Endpoint, Harness};
use highstakes_types::{
    BetOfferId, Leaderboard, LeaderboardParseError, Rules, Verification, Violation,
};
use std::time::Instant;
use tracing::warn;

/// What the verifier learned about one bet offer's leaderboard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeaderboardReport {
    /// Transport error or non-200 status; nothing else was checked.
    FetchFailed,
    /// 200 with an empty body; parsing was skipped.
    Empty,
    Malformed(LeaderboardParseError),
    Checked {
        leaderboard: Leaderboard,
        verification: Verification,
    },
}

impl LeaderboardReport {
    pub fn passed(&self) -> bool {
        matches!(self, LeaderboardReport::Checked { verification, .. } if verification.is_ok())
    }

    pub fn fetched(&self) -> bool {
        !matches!(self, LeaderboardReport::FetchFailed)
    }

    pub fn max_found(&self) -> bool {
        matches!(self, LeaderboardReport::Checked { verification, .. } if verification.max_found)
    }
}

/// Fetch the leaderboard for `bet_offer` and check it against the harness rules.
pub async fn verify_leaderboard(harness: &Harness, bet_offer: BetOfferId) -> LeaderboardReport {
    let start = Instant::now();
    let result = harness.client.high_stakes(bet_offer).await;
    harness
        .metrics
        .record_latency(Endpoint::HighStakes, start.elapsed());

    let body = match result {
        Ok(body) => body,
        Err(err) => {
            harness.checks.record(Check::HighStakesStatus, false);
            warn!(%bet_offer, %err, "failed to fetch leaderboard");
            return LeaderboardReport::FetchFailed;
        }
    };
    harness.checks.record(Check::HighStakesStatus, true);

    let report = check_body(&harness.checks, &harness.rules, &body);
    match &report {
        LeaderboardReport::Empty => warn!(%bet_offer, "leaderboard is empty"),
        LeaderboardReport::Malformed(err) => warn!(%bet_offer, %err, "malformed leaderboard"),
        LeaderboardReport::Checked { verification, .. } => {
            for violation in &verification.violations {
                warn!(%bet_offer, %violation, "leaderboard invariant violated");
            }
        }
        LeaderboardReport::FetchFailed => {}
    }
    report
}

/// Run every body-level check over a fetched leaderboard.
///
/// An empty or malformed body stops at the failing check; the max-stake check
/// is still recorded as failed so every fetched leaderboard counts towards it.
pub fn check_body(checks: &Checks, rules: &Rules, body: &str) -> LeaderboardReport {
    if !checks.record(Check::NotEmpty, !body.is_empty()) {
        checks.record(Check::MaxStakeFound, false);
        return LeaderboardReport::Empty;
    }

    let leaderboard = match Leaderboard::parse(body) {
        Ok(leaderboard) => leaderboard,
        Err(err) => {
            checks.record(Check::EntryFormat, false);
            checks.record(Check::MaxStakeFound, false);
            return LeaderboardReport::Malformed(err);
        }
    };
    checks.record(Check::EntryFormat, true);

    let verification = leaderboard.verify(rules);
    record_verification(checks, &verification);
    LeaderboardReport::Checked {
        leaderboard,
        verification,
    }
}

fn record_verification(checks: &Checks, verification: &Verification) {
    let mut length = true;
    let mut range = true;
    let mut descending = true;
    let mut unique = true;
    for violation in &verification.violations {
        match violation {
            Violation::TooManyEntries { .. } | Violation::WrongLength { .. } => length = false,
            Violation::StakeOutOfRange { .. } => range = false,
            Violation::NotDescending { .. } => descending = false,
            Violation::DuplicateCustomer { .. } => unique = false,
            Violation::MaxStakeMissing { .. } => {}
        }
    }
    checks.record(Check::LeaderboardLength, length);
    checks.record(Check::StakeInRange, range);
    checks.record(Check::Descending, descending);
    checks.record(Check::UniqueCustomers, unique);
    checks.record(Check::MaxStakeFound, verification.max_found);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockService;
    use axum::http::StatusCode;

    #[test]
    fn test_check_body_scenario() {
        let checks = Checks::new();
        let report = check_body(&checks, &Rules::default(), "5000=100000,1200=250,900=100");

        let LeaderboardReport::Checked {
            leaderboard,
            verification,
        } = &report
        else {
            panic!("expected checked leaderboard, got {report:?}");
        };
        assert_eq!(
            leaderboard.stakes().collect::<Vec<_>>(),
            vec![100_000, 250, 100]
        );
        assert!(verification.max_found);
        assert!(report.passed());
        assert_eq!(checks.failed_total(), 0);
        assert_eq!(checks.passed(Check::Descending), 1);
        assert_eq!(checks.passed(Check::MaxStakeFound), 1);
    }

    #[test]
    fn test_check_body_empty() {
        let checks = Checks::new();
        let report = check_body(&checks, &Rules::default(), "");
        assert_eq!(report, LeaderboardReport::Empty);
        assert!(!report.passed());
        assert!(!report.max_found());
        assert_eq!(checks.failed(Check::NotEmpty), 1);
        assert_eq!(checks.failed(Check::MaxStakeFound), 1);
        // Parsing never ran.
        assert_eq!(checks.passed(Check::EntryFormat), 0);
        assert_eq!(checks.failed(Check::EntryFormat), 0);
        assert_eq!(checks.failed(Check::Descending), 0);
    }

    #[test]
    fn test_check_body_malformed() {
        let checks = Checks::new();
        let report = check_body(&checks, &Rules::default(), "5000=100000,oops");
        assert_eq!(
            report,
            LeaderboardReport::Malformed(LeaderboardParseError::MalformedEntry {
                index: 1,
                entry: "oops".to_string(),
            })
        );
        assert_eq!(checks.failed(Check::EntryFormat), 1);
        assert_eq!(checks.failed(Check::MaxStakeFound), 1);
    }

    #[test]
    fn test_check_body_maps_violations_to_checks() {
        let checks = Checks::new();
        let report = check_body(&checks, &Rules::default(), "1=50,2=300,2=200");
        assert!(!report.passed());
        assert!(!report.max_found());
        assert_eq!(checks.passed(Check::LeaderboardLength), 1);
        assert_eq!(checks.failed(Check::StakeInRange), 1);
        assert_eq!(checks.failed(Check::Descending), 1);
        assert_eq!(checks.failed(Check::UniqueCustomers), 1);
        assert_eq!(checks.failed(Check::MaxStakeFound), 1);
    }

    #[tokio::test]
    async fn test_verify_leaderboard_fetch_failure() {
        let mock = MockService::start().await;
        mock.state
            .set_high_stakes(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        let harness = Harness::for_tests(&mock.base_url, vec![]);

        let report = verify_leaderboard(&harness, BetOfferId(5000)).await;
        assert_eq!(report, LeaderboardReport::FetchFailed);
        assert!(!report.fetched());
        assert_eq!(harness.checks.failed(Check::HighStakesStatus), 1);
        // Body checks are skipped entirely.
        assert_eq!(harness.checks.failed(Check::NotEmpty), 0);
        assert_eq!(harness.checks.failed(Check::MaxStakeFound), 0);
    }

    #[tokio::test]
    async fn test_verify_leaderboard_canned_body() {
        let mock = MockService::start().await;
        mock.state
            .set_high_stakes(StatusCode::OK, "5000=100000,1200=250,900=100");
        let harness = Harness::for_tests(&mock.base_url, vec![]);

        let report = verify_leaderboard(&harness, BetOfferId(5000)).await;
        assert!(report.passed());
        assert_eq!(harness.checks.passed(Check::HighStakesStatus), 1);
        assert_eq!(harness.metrics.snapshot().high_stakes.count, 1);
    }
}
