use crate::{Check, Endpoint, Harness};
use highstakes_types::{CustomerId, SessionKey};
use std::time::Instant;
use tracing::warn;

/// Obtain a session key for `customer`.
///
/// Any failure is recorded against [Check::SessionAcquired] and yields `None`;
/// session issuance itself is never retried.
pub async fn acquire(harness: &Harness, customer: CustomerId) -> Option<SessionKey> {
    let start = Instant::now();
    let result = harness.client.session(customer).await;
    harness
        .metrics
        .record_latency(Endpoint::Session, start.elapsed());

    match result {
        Ok(key) => {
            harness.checks.record(Check::SessionAcquired, true);
            Some(key)
        }
        Err(err) => {
            harness.checks.record(Check::SessionAcquired, false);
            warn!(%customer, %err, "failed to acquire session");
            None
        }
    }
}
