//! Exponential backoff with jitter for receipt polling.

use rand::Rng;
use std::time::Duration;

/// Delay before poll number `attempt` (0-based).
///
/// Doubles from `base_ms` on each attempt, caps at `max_ms`, then adds up
/// to 10% jitter so concurrent runs against one bundler drift apart.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let capped = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_poll_uses_base_delay() {
        let d = calculate_backoff(0, 1_000, 8_000);
        assert!(d >= Duration::from_millis(1_000));
        assert!(d < Duration::from_millis(1_100));
    }

    #[test]
    fn test_delay_doubles_then_caps() {
        let d = calculate_backoff(2, 1_000, 8_000);
        assert!(d >= Duration::from_millis(4_000));
        assert!(d < Duration::from_millis(4_400));

        let capped = calculate_backoff(10, 1_000, 8_000);
        assert!(capped >= Duration::from_millis(8_000));
        assert!(capped < Duration::from_millis(8_800));
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let d = calculate_backoff(200, 1_000, 8_000);
        assert!(d >= Duration::from_millis(8_000));
    }
}
