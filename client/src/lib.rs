//! Load harness for the high stakes betting service.
//!
//! Each iteration acquires a session for a synthetic customer, submits the
//! run's stake pool against a random bet offer (re-authenticating once when a
//! session expires mid-flight), then fetches that offer's leaderboard and
//! checks its invariants. Outcomes are tallied as named [Check]s and
//! [Metrics] rather than raised as errors.

pub mod checks;
pub mod client;
pub mod config;
pub mod driver;
pub mod iteration;
pub mod metrics;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
pub mod session;
pub mod submitter;
pub mod verifier;

pub use checks::{Check, Checks};
pub use client::Client;
pub use config::{Config, ConfigError};
pub use driver::{Driver, RunSummary, Schedule, Stage};
pub use iteration::{run_iteration, Harness, IterationPlan, IterationReport, Phase};
pub use metrics::{Endpoint, Metrics};
pub use submitter::SubmissionReport;
pub use verifier::LeaderboardReport;

use highstakes_types::EmptySessionKey;
use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {0}")]
    Failed(reqwest::StatusCode),
    #[error("unauthorized")]
    Unauthorized,
    #[error(transparent)]
    EmptySessionKey(#[from] EmptySessionKey),
    #[error("invalid stake body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
