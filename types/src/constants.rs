use std::ops::Range;

/// Largest stake a customer can place. Exactly one entry of every stake pool
/// carries this amount.
pub const MAX_STAKE: u64 = 100_000;

/// Smallest stake the harness generates and, by default, the smallest stake
/// accepted on a leaderboard.
pub const MIN_STAKE: u64 = 100;

/// Maximum number of entries returned by the highstakes endpoint.
pub const LEADERBOARD_CAPACITY: usize = 20;

/// Stakes submitted per iteration.
pub const DEFAULT_NUM_STAKES: usize = 100;

/// Synthetic customers are drawn from this range.
pub const CUSTOMER_ID_RANGE: Range<u32> = 100..500;

/// Bet offers are drawn from this range.
pub const BET_OFFER_ID_RANGE: Range<u32> = 1_000..1_000_000;

/// Query parameter carrying the session key on stake submission.
pub const SESSION_KEY_PARAM: &str = "sessionkey";
