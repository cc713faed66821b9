use crate::{
    session, submitter, verifier, Checks, Client, LeaderboardReport, Metrics, SubmissionReport,
};
use highstakes_types::{BetOfferId, CustomerId, Rules, StakePool};
use rand::Rng;
use std::{ops::Range, sync::Arc};
use tracing::debug;

/// Everything an iteration needs. Shared by all virtual users of a run.
pub struct Harness {
    pub client: Client,
    pub checks: Arc<Checks>,
    pub metrics: Arc<Metrics>,
    pub rules: Rules,
    pub pool: StakePool,
}

impl Harness {
    pub fn new(client: Client, rules: Rules, pool: StakePool) -> Self {
        Self {
            client,
            checks: Arc::new(Checks::new()),
            metrics: Arc::new(Metrics::new()),
            rules,
            pool,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(base_url: &str, stakes: Vec<u64>) -> Self {
        Self::new(
            Client::new(base_url).unwrap(),
            Rules::default(),
            StakePool::from(stakes),
        )
    }
}

/// Identifiers drawn for one iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IterationPlan {
    pub customer: CustomerId,
    pub bet_offer: BetOfferId,
}

impl IterationPlan {
    pub fn random(rng: &mut impl Rng, customers: &Range<u32>, bet_offers: &Range<u32>) -> Self {
        Self {
            customer: CustomerId(rng.gen_range(customers.clone())),
            bet_offer: BetOfferId(rng.gen_range(bet_offers.clone())),
        }
    }
}

/// Progress of one iteration.
///
/// `Start → SessionAcquired → StakesSubmitted → LeaderboardFetched`, ending in
/// either `Verified` or `Failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Start,
    SessionAcquired,
    StakesSubmitted,
    LeaderboardFetched,
    Verified,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Verified | Phase::Failed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IterationReport {
    pub plan: IterationPlan,
    /// Furthest non-terminal phase reached.
    pub reached: Phase,
    /// Terminal phase.
    pub outcome: Phase,
    pub submission: Option<SubmissionReport>,
    pub leaderboard: Option<LeaderboardReport>,
}

impl IterationReport {
    fn new(plan: IterationPlan) -> Self {
        Self {
            plan,
            reached: Phase::Start,
            outcome: Phase::Start,
            submission: None,
            leaderboard: None,
        }
    }

    fn advance(&mut self, phase: Phase) {
        debug!(
            customer = %self.plan.customer,
            bet_offer = %self.plan.bet_offer,
            ?phase,
            "iteration advanced"
        );
        self.reached = phase;
    }

    fn finish(mut self, harness: &Harness, verified: bool) -> Self {
        self.outcome = if verified {
            Phase::Verified
        } else {
            Phase::Failed
        };
        harness.metrics.record_iteration(verified);
        debug!(
            customer = %self.plan.customer,
            bet_offer = %self.plan.bet_offer,
            outcome = ?self.outcome,
            "iteration finished"
        );
        self
    }

    pub fn verified(&self) -> bool {
        self.outcome == Phase::Verified
    }
}

/// Acquire a session, submit the stake pool, then verify the leaderboard of
/// the same bet offer.
///
/// Without a session there is nothing to submit, so the iteration fails
/// straight away. The iteration is verified only if every stake was accepted
/// and the leaderboard passed every check.
pub async fn run_iteration(harness: &Harness, plan: IterationPlan) -> IterationReport {
    let mut report = IterationReport::new(plan);

    let Some(mut session) = session::acquire(harness, plan.customer).await else {
        return report.finish(harness, false);
    };
    report.advance(Phase::SessionAcquired);

    let submission = submitter::submit_stakes(
        harness,
        plan.customer,
        plan.bet_offer,
        &mut session,
        harness.pool.stakes(),
    )
    .await;
    report.submission = Some(submission);
    report.advance(Phase::StakesSubmitted);

    let leaderboard = verifier::verify_leaderboard(harness, plan.bet_offer).await;
    if leaderboard.fetched() {
        report.advance(Phase::LeaderboardFetched);
    }
    let verified = submission.failed == 0 && leaderboard.passed();
    report.leaderboard = Some(leaderboard);
    report.finish(harness, verified)
}
