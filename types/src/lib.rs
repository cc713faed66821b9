//! Types shared by the high stakes load harness: identifiers, the stake pool
//! and the leaderboard wire format.

pub mod constants;
pub use constants::*;
pub mod ids;
pub use ids::{BetOfferId, CustomerId, EmptySessionKey, SessionKey};
pub mod leaderboard;
pub use leaderboard::{
    Leaderboard, LeaderboardEntry, LeaderboardParseError, Rules, Verification, Violation,
};
pub mod stake;
pub use stake::{StakePool, StakePoolError};
