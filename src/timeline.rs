//! Synthetic timeline generation.
//!
//! Produces a descending sequence of timestamps for N commits: the first
//! entry pairs with the most recent commit in a reverse-chronological
//! walk. Pure given its inputs; callers inject the random source so tests
//! can seed it.

use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// A half-open interval `[start, end)` of unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateInterval {
    pub start: i64,
    pub end: i64,
}

impl DateInterval {
    /// Build an interval, rejecting `end < start`. `end == start` is a
    /// degenerate but legal interval: every draw is `start`.
    pub fn new(start: i64, end: i64) -> Result<Self, TimelineError> {
        if end < start {
            return Err(TimelineError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }
}

impl std::fmt::Display for DateInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", format_epoch(self.start), format_epoch(self.end))
    }
}

#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("invalid date interval: end ({end}) is before start ({start})")]
    InvalidInterval { start: i64, end: i64 },
}

/// Draw `count` timestamps uniformly from `interval`, sorted descending.
///
/// Monotonic non-increasing by construction: zipping the result with a
/// newest-first commit enumeration keeps ancestors at or before their
/// descendants on linear history.
pub fn generate(
    count: usize,
    interval: DateInterval,
    rng: &mut impl Rng,
) -> Result<Vec<i64>, TimelineError> {
    // Re-validate: intervals normally arrive through DateInterval::new,
    // but the struct fields are public.
    if interval.end < interval.start {
        return Err(TimelineError::InvalidInterval {
            start: interval.start,
            end: interval.end,
        });
    }

    let mut stamps: Vec<i64> = (0..count)
        .map(|_| {
            if interval.start == interval.end {
                interval.start
            } else {
                rng.gen_range(interval.start..interval.end)
            }
        })
        .collect();
    stamps.sort_unstable_by(|a, b| b.cmp(a));
    Ok(stamps)
}

/// Render a unix timestamp as RFC 3339 for logs and previews.
pub fn format_epoch(secs: i64) -> String {
    match OffsetDateTime::from_unix_timestamp(secs) {
        Ok(dt) => dt
            .format(&Rfc3339)
            .unwrap_or_else(|_| secs.to_string()),
        Err(_) => secs.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn draws_stay_in_interval_and_descend() {
        let mut rng = StdRng::seed_from_u64(7);
        let interval = DateInterval::new(1_000, 2_000).unwrap();
        let stamps = generate(200, interval, &mut rng).unwrap();
        assert_eq!(stamps.len(), 200);
        for w in stamps.windows(2) {
            assert!(w[0] >= w[1], "not descending: {} < {}", w[0], w[1]);
        }
        for s in &stamps {
            assert!((1_000..2_000).contains(s));
        }
    }

    #[test]
    fn zero_commits_yields_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        let interval = DateInterval::new(0, 100).unwrap();
        assert!(generate(0, interval, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn degenerate_interval_repeats_start() {
        let mut rng = StdRng::seed_from_u64(7);
        let interval = DateInterval::new(500, 500).unwrap();
        assert_eq!(generate(3, interval, &mut rng).unwrap(), vec![500, 500, 500]);
    }

    #[test]
    fn inverted_interval_is_rejected() {
        assert!(matches!(
            DateInterval::new(10, 5),
            Err(TimelineError::InvalidInterval { start: 10, end: 5 })
        ));
    }

    #[test]
    fn seeded_rng_is_deterministic() {
        let interval = DateInterval::new(0, 1_000_000).unwrap();
        let a = generate(50, interval, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = generate(50, interval, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }
}
