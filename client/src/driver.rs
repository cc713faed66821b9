//! Staged load driver.
//!
//! Virtual users are tokio tasks that loop iterations while their index is
//! below the current target. The target follows the configured stages,
//! interpolating linearly from the previous stage's target (starting at zero).

use crate::{
    checks::CheckSnapshot, iteration::run_iteration, metrics::MetricsSnapshot, Config, Harness,
    IterationPlan,
};
use futures::future::join_all;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    ops::Range,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{sync::watch, time::MissedTickBehavior};
use tracing::{debug, info, warn};

const RAMP_TICK: Duration = Duration::from_millis(100);

/// Ramp towards `target` virtual users over `duration_ms`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub duration_ms: u64,
    pub target: usize,
}

impl Stage {
    pub fn new(duration: Duration, target: usize) -> Self {
        Self {
            duration_ms: duration.as_millis() as u64,
            target,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    stages: Vec<Stage>,
}

impl Schedule {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn total(&self) -> Duration {
        self.stages.iter().map(Stage::duration).sum()
    }

    pub fn peak(&self) -> usize {
        self.stages.iter().map(|stage| stage.target).max().unwrap_or(0)
    }

    /// Target virtual users `elapsed` into the run, or `None` once every
    /// stage has finished.
    pub fn target_at(&self, elapsed: Duration) -> Option<usize> {
        let mut from = 0usize;
        let mut stage_start = Duration::ZERO;
        for stage in &self.stages {
            let stage_end = stage_start + stage.duration();
            if elapsed < stage_end {
                let progress =
                    (elapsed - stage_start).as_secs_f64() / stage.duration().as_secs_f64();
                let target = from as f64 + (stage.target as f64 - from as f64) * progress;
                return Some(target.round() as usize);
            }
            from = stage.target;
            stage_start = stage_end;
        }
        None
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub elapsed: Duration,
    pub peak_vus: usize,
    pub checks: Vec<CheckSnapshot>,
    pub metrics: MetricsSnapshot,
}

impl RunSummary {
    fn collect(elapsed: Duration, peak_vus: usize, harness: &Harness) -> Self {
        Self {
            elapsed,
            peak_vus,
            checks: harness.checks.snapshot(),
            metrics: harness.metrics.snapshot(),
        }
    }

    pub fn failed_checks(&self) -> u64 {
        self.checks.iter().map(|check| check.failed).sum()
    }

    pub fn log(&self) {
        let secs = self.elapsed.as_secs_f64();
        let requests = self.metrics.requests();
        let rps = if secs > 0.0 {
            requests as f64 / secs
        } else {
            0.0
        };

        info!("=== HIGH STAKES LOAD RESULTS ===");
        info!("Duration: {:.2}s, peak VUs: {}", secs, self.peak_vus);
        info!(
            "Iterations: {} total, {} verified, {} failed",
            self.metrics.iterations(),
            self.metrics.iterations_verified,
            self.metrics.iterations_failed
        );
        info!(
            "Requests: {} ({:.2}/s), re-authentications: {}",
            requests, rps, self.metrics.reauths
        );
        for (name, latency) in [
            ("session", &self.metrics.session),
            ("stake", &self.metrics.stake),
            ("highstakes", &self.metrics.high_stakes),
        ] {
            info!(
                "Latency {}: {} requests, avg {:.2}ms, max {}ms",
                name, latency.count, latency.avg_ms, latency.max_ms
            );
        }
        for check in &self.checks {
            if check.passed + check.failed == 0 {
                continue;
            }
            info!(
                "Check '{}': {:.2}% ({} passed, {} failed)",
                check.name,
                check.pass_rate(),
                check.passed,
                check.failed
            );
        }
    }
}

pub struct Driver {
    harness: Arc<Harness>,
    schedule: Schedule,
    customers: Range<u32>,
    bet_offers: Range<u32>,
    pacing: Duration,
}

impl Driver {
    pub fn new(harness: Arc<Harness>, config: &Config) -> Self {
        Self {
            harness,
            schedule: config.schedule(),
            customers: config.customer_ids.clone(),
            bet_offers: config.bet_offer_ids.clone(),
            pacing: config.pacing(),
        }
    }

    /// Drive the schedule to completion, then wait for in-flight iterations.
    pub async fn run(self) -> RunSummary {
        let start = Instant::now();
        let (target_tx, _) = watch::channel(0usize);
        let mut vus = Vec::new();
        let mut ticker = tokio::time::interval(RAMP_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while let Some(target) = self.schedule.target_at(start.elapsed()) {
            target_tx.send_if_modified(|current| {
                let changed = *current != target;
                *current = target;
                changed
            });
            while vus.len() < target {
                let id = vus.len();
                debug!(vu = id, "spawning virtual user");
                vus.push(tokio::spawn(run_vu(
                    id,
                    self.harness.clone(),
                    target_tx.subscribe(),
                    self.customers.clone(),
                    self.bet_offers.clone(),
                    self.pacing,
                )));
            }
            ticker.tick().await;
        }

        // Park every virtual user, then close the channel so they exit.
        target_tx.send_replace(0);
        drop(target_tx);
        info!(vus = vus.len(), "schedule complete, waiting for in-flight iterations");
        let peak_vus = vus.len();
        for result in join_all(vus).await {
            if let Err(err) = result {
                warn!(?err, "virtual user aborted");
            }
        }

        RunSummary::collect(start.elapsed(), peak_vus, &self.harness)
    }
}

async fn run_vu(
    id: usize,
    harness: Arc<Harness>,
    mut target: watch::Receiver<usize>,
    customers: Range<u32>,
    bet_offers: Range<u32>,
    pacing: Duration,
) {
    let mut rng = StdRng::from_entropy();
    loop {
        let active = *target.borrow_and_update() > id;
        if !active {
            if target.changed().await.is_err() {
                debug!(vu = id, "virtual user stopped");
                return;
            }
            continue;
        }

        let plan = IterationPlan::random(&mut rng, &customers, &bet_offers);
        run_iteration(&harness, plan).await;
        tokio::time::sleep(pacing).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mocks::MockService, Client};
    use highstakes_types::{Rules, StakePool, MAX_STAKE};

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn test_target_interpolates_between_stages() {
        let schedule = Schedule::new(vec![
            Stage::new(ms(1_000), 100),
            Stage::new(ms(1_000), 100),
            Stage::new(ms(1_000), 0),
        ]);
        assert_eq!(schedule.total(), ms(3_000));
        assert_eq!(schedule.peak(), 100);
        assert_eq!(schedule.target_at(ms(0)), Some(0));
        assert_eq!(schedule.target_at(ms(250)), Some(25));
        assert_eq!(schedule.target_at(ms(999)), Some(100));
        assert_eq!(schedule.target_at(ms(1_500)), Some(100));
        assert_eq!(schedule.target_at(ms(2_750)), Some(25));
        assert_eq!(schedule.target_at(ms(3_000)), None);
    }

    #[test]
    fn test_zero_length_stage_jumps() {
        let schedule = Schedule::new(vec![Stage::new(ms(0), 5), Stage::new(ms(100), 5)]);
        assert_eq!(schedule.target_at(ms(0)), Some(5));
        assert_eq!(schedule.target_at(ms(99)), Some(5));
        assert_eq!(schedule.target_at(ms(100)), None);
        assert_eq!(Schedule::new(vec![]).target_at(ms(0)), None);
    }

    #[tokio::test]
    async fn test_driver_runs_iterations_to_completion() {
        let mock = MockService::start().await;
        let harness = Arc::new(Harness::new(
            Client::new(&mock.base_url).unwrap(),
            Rules::default(),
            StakePool::from(vec![150, MAX_STAKE, 300]),
        ));
        let config = Config {
            stages: vec![Stage::new(ms(0), 2), Stage::new(ms(300), 2)],
            pacing_ms: 20,
            ..Config::default()
        };

        let summary = Driver::new(harness, &config).run().await;
        assert_eq!(summary.peak_vus, 2);
        assert!(summary.metrics.iterations() >= 2);
        assert_eq!(summary.metrics.iterations_failed, 0);
        assert_eq!(summary.failed_checks(), 0);
        assert_eq!(
            summary.metrics.stake.count,
            summary.metrics.iterations() * 3
        );
        summary.log();
    }
}
