use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const LATENCY_BUCKET_COUNT: usize = 12;
const LATENCY_BUCKETS_MS: [u64; LATENCY_BUCKET_COUNT] =
    [1, 2, 5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000];

/// Endpoint a latency sample belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Session,
    Stake,
    HighStakes,
}

#[derive(Clone, Debug, Serialize)]
pub struct LatencySnapshot {
    pub buckets_ms: Vec<u64>,
    pub counts: Vec<u64>,
    pub overflow: u64,
    pub count: u64,
    pub avg_ms: f64,
    pub max_ms: u64,
}

#[derive(Default)]
struct LatencyMetrics {
    buckets: [AtomicU64; LATENCY_BUCKET_COUNT],
    overflow: AtomicU64,
    count: AtomicU64,
    total_ms: AtomicU64,
    max_ms: AtomicU64,
}

impl LatencyMetrics {
    fn record(&self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ms.fetch_add(ms, Ordering::Relaxed);
        self.max_ms.fetch_max(ms, Ordering::Relaxed);

        match LATENCY_BUCKETS_MS.iter().position(|bucket| ms <= *bucket) {
            Some(idx) => self.buckets[idx].fetch_add(1, Ordering::Relaxed),
            None => self.overflow.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn snapshot(&self) -> LatencySnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let total_ms = self.total_ms.load(Ordering::Relaxed);
        let avg_ms = if count > 0 {
            total_ms as f64 / count as f64
        } else {
            0.0
        };

        LatencySnapshot {
            buckets_ms: LATENCY_BUCKETS_MS.to_vec(),
            counts: self
                .buckets
                .iter()
                .map(|bucket| bucket.load(Ordering::Relaxed))
                .collect(),
            overflow: self.overflow.load(Ordering::Relaxed),
            count,
            avg_ms,
            max_ms: self.max_ms.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MetricsSnapshot {
    pub session: LatencySnapshot,
    pub stake: LatencySnapshot,
    pub high_stakes: LatencySnapshot,
    pub reauths: u64,
    pub iterations_verified: u64,
    pub iterations_failed: u64,
}

impl MetricsSnapshot {
    pub fn requests(&self) -> u64 {
        self.session.count + self.stake.count + self.high_stakes.count
    }

    pub fn iterations(&self) -> u64 {
        self.iterations_verified + self.iterations_failed
    }
}

/// Run-wide request and iteration counters.
#[derive(Default)]
pub struct Metrics {
    session: LatencyMetrics,
    stake: LatencyMetrics,
    high_stakes: LatencyMetrics,
    reauths: AtomicU64,
    iterations_verified: AtomicU64,
    iterations_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_latency(&self, endpoint: Endpoint, duration: Duration) {
        match endpoint {
            Endpoint::Session => self.session.record(duration),
            Endpoint::Stake => self.stake.record(duration),
            Endpoint::HighStakes => self.high_stakes.record(duration),
        }
    }

    pub fn record_reauth(&self) {
        self.reauths.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_iteration(&self, verified: bool) {
        if verified {
            self.iterations_verified.fetch_add(1, Ordering::Relaxed);
        } else {
            self.iterations_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            session: self.session.snapshot(),
            stake: self.stake.snapshot(),
            high_stakes: self.high_stakes.snapshot(),
            reauths: self.reauths.load(Ordering::Relaxed),
            iterations_verified: self.iterations_verified.load(Ordering::Relaxed),
            iterations_failed: self.iterations_failed.load(Ordering::Relaxed),
        }
    }
}
