//! Integer arithmetic behind voting power, expertise spend and ECI.
//!
//! Every function is pure and uses 128-bit intermediates so results are
//! identical on every node.

use crate::constants::PERCENT_100;
use crate::types::{Percent, Share, Timestamp};

/// Voting power after lazy regeneration:
///
/// power = min(100%, power + 100% × (now − last_vote_time) / regeneration_seconds)
///
/// A clock that runs backwards regenerates nothing.
pub fn regenerated_power(
    voting_power: Percent,
    last_vote_time: Timestamp,
    now: Timestamp,
    regeneration_seconds: i64,
) -> Percent {
    let elapsed = (now - last_vote_time).max(0) as i128;
    let regenerated = PERCENT_100 as i128 * elapsed / regeneration_seconds as i128;
    (voting_power as i128 + regenerated).min(PERCENT_100 as i128) as Percent
}

/// Power consumed by a charge of `weight` (absolute basis points).
pub fn charge_cost(required_power: Percent, weight: Percent) -> Percent {
    (required_power as u32 * weight as u32 / PERCENT_100 as u32) as Percent
}

/// amount × power × weight / 100%², the expertise a review or vote puts at stake.
pub fn expertise_used(amount: Share, power: Percent, weight: Percent) -> Share {
    let p = PERCENT_100 as i128;
    (amount as i128 * power as i128 * weight as i128 / (p * p)) as Share
}

/// Linear reverse-auction discount. Returns `raw` scaled by
/// min(elapsed, window) / window, keeping its sign.
pub fn reverse_auction_discount(raw: Share, elapsed: i64, window: i64) -> Share {
    let delta_t = elapsed.clamp(0, window) as i128;
    (raw as i128 * delta_t / window as i128) as Share
}

/// The ECI curve:
///
/// eci(w, S) = scale × w / (w + factor × S)   for w > 0
///           = 0                              otherwise
///
/// `w` is the accumulated vote weight, `S` the discipline's total expertise.
/// Non-decreasing in `w` and bounded by `scale`.
pub fn eci(total_weight: Share, total_expertise: Share, scale: i64, factor: i64) -> Share {
    if total_weight <= 0 {
        return 0;
    }
    let w = total_weight as i128;
    let s = total_expertise.max(0) as i128;
    let denominator = w + factor as i128 * s;
    (scale as i128 * w / denominator) as Share
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ECI_CURVE_EXPERTISE_FACTOR, ECI_SCALE, VOTE_REGENERATION_SECONDS};

    #[test]
    fn regeneration_is_linear_and_capped() {
        let half = VOTE_REGENERATION_SECONDS / 2;
        assert_eq!(regenerated_power(0, 0, half, VOTE_REGENERATION_SECONDS), 5_000);
        assert_eq!(regenerated_power(9_000, 0, half, VOTE_REGENERATION_SECONDS), PERCENT_100);
        assert_eq!(regenerated_power(4_000, 100, 50, VOTE_REGENERATION_SECONDS), 4_000);
    }

    #[test]
    fn cost_scales_with_weight() {
        assert_eq!(charge_cost(1_000, PERCENT_100), 1_000);
        assert_eq!(charge_cost(1_000, 5_000), 500);
        assert_eq!(charge_cost(0, PERCENT_100), 0);
    }

    #[test]
    fn full_power_full_weight_uses_whole_amount() {
        assert_eq!(expertise_used(10_000, PERCENT_100, PERCENT_100), 10_000);
        assert_eq!(expertise_used(10_000, 5_000, PERCENT_100), 5_000);
        assert_eq!(expertise_used(10_000, PERCENT_100, 2_500), 2_500);
    }

    #[test]
    fn discount_boundaries() {
        assert_eq!(reverse_auction_discount(1_000, 0, 1_800), 0);
        assert_eq!(reverse_auction_discount(1_000, 900, 1_800), 500);
        assert_eq!(reverse_auction_discount(1_000, 1_800, 1_800), 1_000);
        assert_eq!(reverse_auction_discount(-1_000, 10_000, 1_800), -1_000);
        assert_eq!(reverse_auction_discount(1_000, -5, 1_800), 0);
    }

    #[test]
    fn eci_is_monotonic_and_bounded() {
        let s = 50_000;
        let mut last = 0;
        for w in [-10, 0, 1, 100, 10_000, 100_000, 10_000_000, i64::MAX / 4] {
            let v = eci(w, s, ECI_SCALE, ECI_CURVE_EXPERTISE_FACTOR);
            assert!(v >= last, "eci({w}) = {v} fell below {last}");
            assert!(v <= ECI_SCALE);
            last = v;
        }
    }

    #[test]
    fn eci_known_points() {
        assert_eq!(eci(0, 100, ECI_SCALE, 2), 0);
        // w == 2S → half scale
        assert_eq!(eci(200, 100, ECI_SCALE, 2), ECI_SCALE / 2);
        // discipline with no minted expertise saturates
        assert_eq!(eci(1, 0, ECI_SCALE, 2), ECI_SCALE);
    }
}
