//! Tiered price quotes.
//!
//! A field charges one hourly rate before the evening cutoff and another
//! after it. A booking that straddles the cutoff is split into two
//! segments, each priced pro-rated by minutes and then rounded up to the
//! next multiple of 100 currency units on its own, before the segments are
//! summed. The per-segment round-up means a straddling booking can cost
//! more than the same minutes billed as a single segment; that is the
//! intended charging behavior, not an artifact.

/// Evening boundary between the two rate tiers, minutes since midnight.
pub const DEFAULT_CUTOFF_MINUTES: i32 = 18 * 60;

const ROUNDING_UNIT: i64 = 100;

/// Hourly rates for one field, in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rates {
    pub pre_rate: i64,
    pub post_rate: i64,
}

/// Total price for `[start, start + duration)` against the default cutoff.
pub fn quote(rates: Rates, start_minutes: i32, duration_minutes: i32) -> i64 {
    quote_with_cutoff(rates, start_minutes, duration_minutes, DEFAULT_CUTOFF_MINUTES)
}

pub fn quote_with_cutoff(
    rates: Rates,
    start_minutes: i32,
    duration_minutes: i32,
    cutoff_minutes: i32,
) -> i64 {
    let start = i64::from(start_minutes);
    let end = start + i64::from(duration_minutes.max(0));
    let cutoff = i64::from(cutoff_minutes);

    let pre_minutes = (end.min(cutoff) - start).max(0);
    let post_minutes = (end - start.max(cutoff)).max(0);

    segment_price(pre_minutes, rates.pre_rate) + segment_price(post_minutes, rates.post_rate)
}

/// Pro-rated segment price, rounded up to the next multiple of 100 unless
/// the exact price already lands on one. The exact price is
/// `minutes * rate / 60`, kept as an integer ratio so no precision is lost
/// before rounding.
fn segment_price(minutes: i64, hourly_rate: i64) -> i64 {
    ceil_div(minutes * hourly_rate, 60 * ROUNDING_UNIT) * ROUNDING_UNIT
}

fn ceil_div(numerator: i64, denominator: i64) -> i64 {
    (numerator + denominator - 1) / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    const COURT: Rates = Rates {
        pre_rate: 500,
        post_rate: 700,
    };

    #[test]
    fn straddling_the_cutoff_rounds_each_segment_up() {
        // 17:31 for an hour: 29 pre minutes price to 241.67 -> 300,
        // 31 post minutes price to 361.67 -> 400.
        assert_eq!(quote(COURT, 17 * 60 + 31, 60), 700);
    }

    #[test]
    fn exact_multiples_are_not_rounded() {
        assert_eq!(quote(COURT, 17 * 60, 60), 500);
        assert_eq!(quote(COURT, 18 * 60, 60), 700);
    }

    #[test]
    fn entirely_before_the_cutoff() {
        assert_eq!(quote(COURT, 9 * 60, 120), 1000);
    }

    #[test]
    fn entirely_after_the_cutoff() {
        assert_eq!(quote(COURT, 20 * 60, 90), 1100); // 1.5h * 700 = 1050 -> 1100
    }

    #[test]
    fn fractional_duration_across_the_cutoff() {
        // 17:00 for 1.5h: 60 pre minutes = 500 exactly, 30 post minutes
        // = 350 -> 400.
        assert_eq!(quote(COURT, 17 * 60, 90), 900);
    }

    #[test]
    fn splitting_can_cost_more_than_one_segment() {
        // The same 60 minutes billed in one tier: 500. Split across the
        // cutoff both halves round up.
        let split = quote(COURT, 17 * 60 + 30, 60);
        assert_eq!(split, 300 + 400);
        assert!(split > quote(COURT, 16 * 60, 60));
    }

    #[test]
    fn zero_duration_is_free() {
        assert_eq!(quote(COURT, 10 * 60, 0), 0);
    }

    #[test]
    fn custom_cutoff() {
        let rates = Rates {
            pre_rate: 400,
            post_rate: 600,
        };
        // Cutoff at noon; 11:30 for an hour: 200 pre, 300 post.
        assert_eq!(quote_with_cutoff(rates, 11 * 60 + 30, 60, 12 * 60), 500);
    }
}
