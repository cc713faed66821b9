use crate::{session, Check, Endpoint, Error, Harness};
use highstakes_types::{BetOfferId, CustomerId, SessionKey};
use std::time::Instant;
use tracing::{debug, warn};

/// Outcome of submitting one iteration's stakes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubmissionReport {
    pub accepted: usize,
    pub failed: usize,
    /// Session re-acquisitions triggered by a 401.
    pub reauths: usize,
}

/// Submit every stake in order against `bet_offer`.
///
/// A 401 means the session expired: the key is re-acquired for `customer`,
/// written back through `session`, and the failed stake is retried exactly
/// once. Any other failure (including a second 401) is recorded and the loop
/// moves on to the next stake.
pub async fn submit_stakes(
    harness: &Harness,
    customer: CustomerId,
    bet_offer: BetOfferId,
    session: &mut SessionKey,
    stakes: &[u64],
) -> SubmissionReport {
    let mut report = SubmissionReport::default();
    for &stake in stakes {
        let accepted =
            submit_with_reauth(harness, customer, bet_offer, session, stake, &mut report).await;
        if harness.checks.record(Check::StakeAccepted, accepted) {
            report.accepted += 1;
        } else {
            report.failed += 1;
        }
    }
    report
}

async fn submit_with_reauth(
    harness: &Harness,
    customer: CustomerId,
    bet_offer: BetOfferId,
    session: &mut SessionKey,
    stake: u64,
    report: &mut SubmissionReport,
) -> bool {
    match submit(harness, bet_offer, session, stake).await {
        Ok(()) => return true,
        Err(Error::Unauthorized) => {}
        Err(err) => {
            warn!(%customer, %bet_offer, stake, %err, "stake rejected");
            return false;
        }
    }

    debug!(%customer, %bet_offer, "session expired, re-acquiring");
    report.reauths += 1;
    harness.metrics.record_reauth();
    let Some(fresh) = session::acquire(harness, customer).await else {
        return false;
    };
    *session = fresh;

    match submit(harness, bet_offer, session, stake).await {
        Ok(()) => true,
        Err(err) => {
            warn!(%customer, %bet_offer, stake, %err, "stake rejected after re-authentication");
            false
        }
    }
}

async fn submit(
    harness: &Harness,
    bet_offer: BetOfferId,
    session: &SessionKey,
    stake: u64,
) -> crate::Result<()> {
    let start = Instant::now();
    let result = harness.client.submit_stake(bet_offer, session, stake).await;
    harness.metrics.record_latency(Endpoint::Stake, start.elapsed());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockService;
    use axum::http::StatusCode;

    const CUSTOMER: CustomerId = CustomerId(150);
    const OFFER: BetOfferId = BetOfferId(5000);

    #[tokio::test]
    async fn test_all_stakes_accepted() {
        let mock = MockService::start().await;
        let harness = Harness::for_tests(&mock.base_url, vec![100, 100_000, 250]);
        let mut key = session::acquire(&harness, CUSTOMER).await.unwrap();

        let report =
            submit_stakes(&harness, CUSTOMER, OFFER, &mut key, &[100, 100_000, 250]).await;
        assert_eq!(
            report,
            SubmissionReport {
                accepted: 3,
                failed: 0,
                reauths: 0,
            }
        );

        let requests = mock.state.stake_requests();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|r| r.session_key == key.as_str()));
        assert!(requests.iter().all(|r| r.bet_offer == 5000));
        let bodies: Vec<_> = requests.iter().map(|r| r.body.as_str()).collect();
        assert_eq!(bodies, vec!["100", "100000", "250"]);
    }

    #[tokio::test]
    async fn test_single_401_reauths_once_and_keeps_new_key() {
        let mock = MockService::start().await;
        // Second stake request finds the session expired.
        mock.state.expire_on_stake(1);
        let harness = Harness::for_tests(&mock.base_url, vec![]);
        let mut key = session::acquire(&harness, CUSTOMER).await.unwrap();
        let original = key.clone();

        let report = submit_stakes(&harness, CUSTOMER, OFFER, &mut key, &[100, 200, 300]).await;
        assert_eq!(
            report,
            SubmissionReport {
                accepted: 3,
                failed: 0,
                reauths: 1,
            }
        );
        assert_ne!(key, original);

        // One initial acquisition plus exactly one re-acquisition.
        assert_eq!(mock.state.session_requests(), 2);
        let requests = mock.state.stake_requests();
        let summary: Vec<_> = requests
            .iter()
            .map(|r| (r.body.as_str(), r.status, r.session_key == original.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("100", 200, true),
                ("200", 401, true),
                ("200", 200, false),
                ("300", 200, false),
            ]
        );
        assert_eq!(harness.metrics.snapshot().reauths, 1);
        assert_eq!(harness.checks.passed(Check::StakeAccepted), 3);
    }

    #[tokio::test]
    async fn test_repeated_401_fails_stake_and_continues() {
        let mock = MockService::start().await;
        mock.state.expire_on_stake(0);
        mock.state.unauthorized_on_stake(1);
        let harness = Harness::for_tests(&mock.base_url, vec![]);
        let mut key = session::acquire(&harness, CUSTOMER).await.unwrap();

        let report = submit_stakes(&harness, CUSTOMER, OFFER, &mut key, &[100, 200]).await;
        assert_eq!(
            report,
            SubmissionReport {
                accepted: 1,
                failed: 1,
                reauths: 1,
            }
        );

        let statuses: Vec<_> = mock
            .state
            .stake_requests()
            .iter()
            .map(|r| (r.body.clone(), r.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("100".to_string(), 401),
                ("100".to_string(), 401),
                ("200".to_string(), 200),
            ]
        );
        assert_eq!(mock.state.session_requests(), 2);
        assert_eq!(harness.checks.failed(Check::StakeAccepted), 1);
        assert_eq!(harness.checks.passed(Check::StakeAccepted), 1);
    }

    #[tokio::test]
    async fn test_other_failures_are_not_retried() {
        let mock = MockService::start().await;
        let harness = Harness::for_tests(&mock.base_url, vec![]);
        let mut key = session::acquire(&harness, CUSTOMER).await.unwrap();
        mock.state.fail_stakes(StatusCode::BAD_REQUEST);

        let report = submit_stakes(&harness, CUSTOMER, OFFER, &mut key, &[100, 200]).await;
        assert_eq!(report.failed, 2);
        assert_eq!(report.reauths, 0);
        assert_eq!(mock.state.stake_requests().len(), 2);
        assert_eq!(mock.state.session_requests(), 1);
    }

    #[tokio::test]
    async fn test_failed_reacquisition_keeps_old_key() {
        let mock = MockService::start().await;
        mock.state.expire_on_stake(0);
        let harness = Harness::for_tests(&mock.base_url, vec![]);
        let mut key = session::acquire(&harness, CUSTOMER).await.unwrap();
        let original = key.clone();
        mock.state.fail_sessions(StatusCode::SERVICE_UNAVAILABLE);

        let report = submit_stakes(&harness, CUSTOMER, OFFER, &mut key, &[100]).await;
        assert_eq!(
            report,
            SubmissionReport {
                accepted: 0,
                failed: 1,
                reauths: 1,
            }
        );
        assert_eq!(key, original);
        assert_eq!(mock.state.stake_requests().len(), 1);
    }
}
