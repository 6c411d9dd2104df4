//! Retry delay policies
//!
//! A delay policy maps `(attempt index, last error, configuration)` to the
//! time to wait before the next attempt. Policies return a signed
//! [`TimeDelta`] so that combined policies may subtract; the loop turns a
//! negative result into an immediate retry.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use rand::Rng;

use super::config::RetryConfig;

/// A delay policy
///
/// Any `Fn(u32, &E, &RetryConfig<E>) -> TimeDelta` can be used, including the
/// built-in [`fixed_delay`], [`back_off_delay`] and [`random_delay`].
pub type DelayFn<E> = Arc<dyn Fn(u32, &E, &RetryConfig<E>) -> TimeDelta + Send + Sync>;

/// Largest shift applied by [`back_off_delay`]; `1 << 63` overflows `i64`.
const MAX_BACKOFF_SHIFT: u32 = 62;

/// Keep the same delay between every attempt
pub fn fixed_delay<E>(_attempt: u32, _err: &E, config: &RetryConfig<E>) -> TimeDelta {
    to_time_delta(config.delay())
}

/// Double the delay after every attempt
///
/// Returns `delay << min(attempt, max_shift)` in nanoseconds. `max_shift` is
/// `62 - floor(log2(delay))`, computed once per configuration and cached, so
/// the shift never overflows a signed 64-bit nanosecond count. A zero base
/// delay is treated as one nanosecond.
///
/// # Example
///
/// ```rust
/// use chrono::TimeDelta;
/// use rebound_core::retry::{back_off_delay, delay, RetryConfig};
/// use std::time::Duration;
///
/// let config: RetryConfig<std::io::Error> =
///     RetryConfig::from_options(vec![delay(Duration::from_secs(1))]);
///
/// let err = std::io::Error::other("unavailable");
/// assert_eq!(back_off_delay(3, &err, &config), TimeDelta::seconds(8));
/// assert_eq!(config.max_backoff_shift(), Some(33));
/// ```
pub fn back_off_delay<E>(attempt: u32, _err: &E, config: &RetryConfig<E>) -> TimeDelta {
    let base = base_nanos(config.delay());
    let max_shift = *config
        .max_backoff_shift
        .get_or_init(|| MAX_BACKOFF_SHIFT - base.ilog2());

    TimeDelta::nanoseconds(base << attempt.min(max_shift))
}

/// Pick a random delay in `[0, max_jitter)`
///
/// Returns zero when no jitter is configured.
pub fn random_delay<E>(_attempt: u32, _err: &E, config: &RetryConfig<E>) -> TimeDelta {
    let max_jitter = base_nanos_or_zero(config.max_jitter());
    if max_jitter == 0 {
        return TimeDelta::zero();
    }

    TimeDelta::nanoseconds(rand::rng().random_range(0..max_jitter))
}

/// Sum several delay policies into one
///
/// Every partial sum saturates at [`TimeDelta::MAX`] (or [`TimeDelta::MIN`])
/// instead of wrapping. An empty list yields zero.
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::{back_off_delay, combine_delay, random_delay, DelayFn};
/// use std::sync::Arc;
///
/// type E = std::io::Error;
///
/// let policy = combine_delay(vec![
///     Arc::new(back_off_delay::<E>) as DelayFn<E>,
///     Arc::new(random_delay::<E>),
/// ]);
/// ```
pub fn combine_delay<E: 'static>(delays: Vec<DelayFn<E>>) -> DelayFn<E> {
    Arc::new(move |attempt: u32, err: &E, config: &RetryConfig<E>| {
        delays.iter().fold(TimeDelta::zero(), |total, delay| {
            saturating_add(total, delay(attempt, err, config))
        })
    })
}

/// Compute the wait before the next attempt: policy output clamped to the
/// configured maximum delay, negative results treated as zero.
pub(crate) fn next_delay<E>(attempt: u32, err: &E, config: &RetryConfig<E>) -> Duration {
    let mut delay = (config.delay_type)(attempt, err, config);

    let max_delay = config.max_delay();
    if !max_delay.is_zero() {
        delay = delay.min(to_time_delta(max_delay));
    }

    delay.to_std().unwrap_or(Duration::ZERO)
}

fn saturating_add(total: TimeDelta, delay: TimeDelta) -> TimeDelta {
    total.checked_add(&delay).unwrap_or(if delay > TimeDelta::zero() {
        TimeDelta::MAX
    } else {
        TimeDelta::MIN
    })
}

fn to_time_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

fn base_nanos_or_zero(duration: Duration) -> i64 {
    i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX)
}

fn base_nanos(duration: Duration) -> i64 {
    base_nanos_or_zero(duration).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn config_with_delay(delay: Duration) -> RetryConfig<io::Error> {
        let mut config = RetryConfig::new();
        config.delay = delay;
        config
    }

    fn constant(delay: TimeDelta) -> DelayFn<io::Error> {
        Arc::new(move |_: u32, _: &io::Error, _: &RetryConfig<io::Error>| delay)
    }

    fn err() -> io::Error {
        io::Error::other("test")
    }

    #[test]
    fn test_fixed_delay() {
        let config = config_with_delay(Duration::from_millis(250));

        for attempt in 0..5 {
            assert_eq!(
                fixed_delay(attempt, &err(), &config),
                TimeDelta::milliseconds(250)
            );
        }
    }

    #[test]
    fn test_back_off_zero_delay_coerced_to_one() {
        let config = config_with_delay(Duration::ZERO);

        assert_eq!(back_off_delay(2, &err(), &config), TimeDelta::nanoseconds(4));
        assert_eq!(config.max_backoff_shift(), Some(62));
        assert_eq!(
            back_off_delay(65, &err(), &config),
            TimeDelta::nanoseconds(1 << 62)
        );
    }

    #[test]
    fn test_back_off_one_second_saturates_shift() {
        let config = config_with_delay(Duration::from_secs(1));

        let delay = back_off_delay(62, &err(), &config);
        assert_eq!(config.max_backoff_shift(), Some(33));
        assert_eq!(delay, TimeDelta::nanoseconds(1_000_000_000 << 33));
    }

    #[test]
    fn test_back_off_doubles() {
        let config = config_with_delay(Duration::from_millis(100));

        assert_eq!(back_off_delay(0, &err(), &config), TimeDelta::milliseconds(100));
        assert_eq!(back_off_delay(1, &err(), &config), TimeDelta::milliseconds(200));
        assert_eq!(back_off_delay(4, &err(), &config), TimeDelta::milliseconds(1600));
    }

    #[test]
    fn test_back_off_shift_is_cached() {
        let mut config = config_with_delay(Duration::from_secs(1));
        back_off_delay(0, &err(), &config);

        // The ceiling was derived from the original base and stays put.
        config.delay = Duration::from_nanos(1);
        assert_eq!(config.max_backoff_shift(), Some(33));
        assert_eq!(
            back_off_delay(40, &err(), &config),
            TimeDelta::nanoseconds(1 << 33)
        );
    }

    #[test]
    fn test_random_delay_bounds() {
        let mut config = config_with_delay(Duration::ZERO);
        config.max_jitter = Duration::from_millis(50);

        for _ in 0..1000 {
            let delay = random_delay(0, &err(), &config);
            assert!(delay >= TimeDelta::zero());
            assert!(delay < TimeDelta::milliseconds(50));
        }
    }

    #[test]
    fn test_random_delay_zero_jitter() {
        let mut config = config_with_delay(Duration::ZERO);
        config.max_jitter = Duration::ZERO;

        assert_eq!(random_delay(3, &err(), &config), TimeDelta::zero());
    }

    #[test]
    fn test_combine_empty_is_zero() {
        let config = config_with_delay(Duration::from_secs(1));
        let combined = combine_delay::<io::Error>(Vec::new());

        assert_eq!(combined(0, &err(), &config), TimeDelta::zero());
    }

    #[test]
    fn test_combine_single_and_negative() {
        let config = config_with_delay(Duration::from_secs(1));

        let single = combine_delay(vec![constant(TimeDelta::seconds(1))]);
        assert_eq!(single(0, &err(), &config), TimeDelta::seconds(1));

        let negative = combine_delay(vec![
            constant(TimeDelta::seconds(1)),
            constant(TimeDelta::milliseconds(-1)),
        ]);
        assert_eq!(negative(0, &err(), &config), TimeDelta::milliseconds(999));
    }

    #[test]
    fn test_combine_overflow_clamps_to_max() {
        let config = config_with_delay(Duration::from_secs(1));
        let combined = combine_delay(vec![
            constant(TimeDelta::MAX),
            constant(TimeDelta::seconds(1)),
            constant(TimeDelta::milliseconds(1)),
        ]);

        assert_eq!(combined(0, &err(), &config), TimeDelta::MAX);
    }

    #[test]
    fn test_combine_fixed_twice() {
        let config = config_with_delay(Duration::from_millis(100));
        let combined = combine_delay(vec![
            Arc::new(fixed_delay::<io::Error>) as DelayFn<io::Error>,
            Arc::new(fixed_delay::<io::Error>),
        ]);

        assert_eq!(combined(7, &err(), &config), TimeDelta::milliseconds(200));
    }

    #[test]
    fn test_next_delay_applies_ceiling() {
        let mut config = config_with_delay(Duration::from_millis(10));
        config.delay_type = Arc::new(back_off_delay::<io::Error>);
        config.max_delay = Duration::from_millis(50);

        assert_eq!(next_delay(0, &err(), &config), Duration::from_millis(10));
        assert_eq!(next_delay(2, &err(), &config), Duration::from_millis(40));
        assert_eq!(next_delay(3, &err(), &config), Duration::from_millis(50));
        assert_eq!(next_delay(30, &err(), &config), Duration::from_millis(50));
    }

    #[test]
    fn test_next_delay_negative_is_zero() {
        let mut config = config_with_delay(Duration::from_secs(1));
        config.delay_type = constant(TimeDelta::seconds(-5));

        assert_eq!(next_delay(0, &err(), &config), Duration::ZERO);
    }
}
