/// ─── Expertise ledger protocol constants ────────────────────────────────────
///
/// Percent values are basis points: 10000 = 100%.
/// Durations are seconds. Every value here is consensus-relevant; the
/// effective values for a chain are fixed at genesis in `LedgerConfig`.

// ── Percent ──────────────────────────────────────────────────────────────────

pub const PERCENT_100: u16 = 10_000;
pub const PERCENT_1: u16 = PERCENT_100 / 100;

// ── Voting power ─────────────────────────────────────────────────────────────

/// Time for a fully drained token to regenerate to 100% voting power: 5 days.
pub const VOTE_REGENERATION_SECONDS: i64 = 5 * 24 * 3600;

/// Voting power spent by a full-weight (100%) review or vote.
pub const REQUIRED_POWER_PERCENT: u16 = 10 * PERCENT_1;

/// Votes cast within this interval after a review are linearly discounted: 30 minutes.
pub const REVERSE_AUCTION_WINDOW_SECONDS: i64 = 30 * 60;

// ── Blocks ───────────────────────────────────────────────────────────────────

pub const BLOCK_INTERVAL_SECONDS: i64 = 3;

/// Slots in the weekly expertise usage ring buffer.
pub const BLOCKS_PER_WEEK: usize = (7 * 24 * 3600 / BLOCK_INTERVAL_SECONDS) as usize;

// ── Delegation ───────────────────────────────────────────────────────────────

/// Depth levels tracked in `ExpertToken::proxied_expertise`.
pub const MAX_PROXY_DEPTH: usize = 4;

// ── Disciplines ──────────────────────────────────────────────────────────────

/// The root "common" discipline. Research and expert tokens never bind to it.
pub const ROOT_DISCIPLINE_ID: u64 = 0;
pub const ROOT_DISCIPLINE_NAME: &str = "Common";

// ── ECI curve ────────────────────────────────────────────────────────────────

/// Upper bound of a single per-discipline ECI value.
pub const ECI_SCALE: i64 = 1_000_000;

/// Multiplier on the discipline's total expertise in the curve denominator.
pub const ECI_CURVE_EXPERTISE_FACTOR: i64 = 2;

// ── Research content ─────────────────────────────────────────────────────────

/// Length of a content's first activity window: 14 days.
pub const CONTENT_ACTIVITY_WINDOW_SECONDS: i64 = 14 * 24 * 3600;

// ── Reviews ──────────────────────────────────────────────────────────────────

pub const MAX_REVIEW_CONTENT_BYTES: usize = 64 * 1024;
pub const MIN_REVIEW_CRITERIA_SCORE: u16 = 1;
pub const MAX_REVIEW_CRITERIA_SCORE: u16 = 5;

// ── Accounts ─────────────────────────────────────────────────────────────────

pub const MIN_ACCOUNT_NAME_LENGTH: usize = 3;
pub const MAX_ACCOUNT_NAME_LENGTH: usize = 16;
