/// Property-based tests for refresh scheduling
///
/// These tests use proptest to generate random call timelines and verify
/// invariants that should hold for every refresh check delay.

use ferrous_target::{
    is_check_due, AlwaysStale, ManualClock, RefreshCheckDelay, Refreshable,
    RefreshableTargetSource, TargetError, TargetSource,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn delay_strategy() -> impl Strategy<Value = RefreshCheckDelay> {
    prop_oneof![
        Just(RefreshCheckDelay::Never),
        Just(RefreshCheckDelay::Always),
        (1u64..500).prop_map(|ms| RefreshCheckDelay::Every(Duration::from_millis(ms))),
    ]
}

/// Reference model of the slot: loads on first call, then on every due check.
fn expected_loads(delay: RefreshCheckDelay, gaps: &[u64]) -> u64 {
    let mut loads = 0u64;
    let mut now = 0u64;
    let mut last_check: Option<u64> = None;
    for (i, gap) in gaps.iter().enumerate() {
        now += gap;
        let due = match delay {
            RefreshCheckDelay::Never => false,
            RefreshCheckDelay::Always => true,
            RefreshCheckDelay::Every(d) => match last_check {
                None => true,
                Some(last) => now - last > d.as_millis() as u64,
            },
        };
        if due {
            last_check = Some(now);
        }
        if i == 0 || due {
            loads += 1;
        }
    }
    loads
}

// Property: with an always-stale target, the load count follows the check schedule exactly
proptest! {
    #[test]
    fn loads_follow_check_schedule(
        delay in delay_strategy(),
        gaps in prop::collection::vec(0u64..300, 1..40),
    ) {
        let clock = ManualClock::new();
        let loads = Arc::new(AtomicU64::new(0));
        let counter = loads.clone();
        let source = RefreshableTargetSource::builder()
            .loader(move || Ok(Arc::new(counter.fetch_add(1, Ordering::SeqCst) + 1)))
            .refresh_check_delay(delay)
            .staleness(AlwaysStale)
            .clock(clock.clone())
            .build()
            .unwrap();

        for gap in &gaps {
            clock.advance(Duration::from_millis(*gap));
            let generation = source.get_target().unwrap();
            prop_assert_eq!(*generation, loads.load(Ordering::SeqCst));
        }

        let expected = expected_loads(delay, &gaps);
        prop_assert_eq!(loads.load(Ordering::SeqCst), expected);
        prop_assert_eq!(source.refresh_count(), expected);
    }
}

// Property: the refresh counter counts successful loads only
proptest! {
    #[test]
    fn refresh_count_equals_successes(outcomes in prop::collection::vec(any::<bool>(), 1..50)) {
        let outcomes = Arc::new(outcomes);
        let cursor = Arc::new(AtomicU64::new(0));
        let (script, position) = (outcomes.clone(), cursor.clone());
        let source = RefreshableTargetSource::builder()
            .loader(move || {
                let i = position.fetch_add(1, Ordering::SeqCst) as usize;
                if script[i] {
                    Ok(Arc::new(i))
                } else {
                    Err(TargetError::load("scripted", format!("attempt {} fails", i)))
                }
            })
            .build()
            .unwrap();

        let mut last_good: Option<usize> = None;
        for (i, succeeds) in outcomes.iter().enumerate() {
            let result = source.refresh();
            prop_assert_eq!(result.is_ok(), *succeeds);
            if *succeeds {
                last_good = Some(i);
            }
        }

        let successes = outcomes.iter().filter(|ok| **ok).count() as u64;
        prop_assert_eq!(source.refresh_count(), successes);
        prop_assert_eq!(source.last_refresh().is_some(), successes > 0);

        // The never-delay slot serves the last good target without another load.
        if let Some(expected) = last_good {
            prop_assert_eq!(*source.get_target().unwrap(), expected);
        }
    }
}

// Property: millisecond conversion keeps the sentinel meanings
proptest! {
    #[test]
    fn from_millis_round_trips_sentinels(ms in -10_000i64..10_000) {
        let delay = RefreshCheckDelay::from_millis(ms);
        match delay {
            RefreshCheckDelay::Never => prop_assert!(ms < 0),
            RefreshCheckDelay::Always => prop_assert_eq!(ms, 0),
            RefreshCheckDelay::Every(d) => prop_assert_eq!(d.as_millis() as i64, ms),
        }
        prop_assert_eq!(delay.as_millis(), if ms < 0 { -1 } else { ms });
    }
}

// Property: a check is due strictly after the delay has elapsed
proptest! {
    #[test]
    fn check_due_strictly_after_delay(delay_ms in 1u64..10_000, elapsed_ms in 0u64..20_000) {
        let t0 = Instant::now();
        let delay = RefreshCheckDelay::Every(Duration::from_millis(delay_ms));
        let due = is_check_due(t0 + Duration::from_millis(elapsed_ms), Some(t0), delay);
        prop_assert_eq!(due, elapsed_ms > delay_ms);
        prop_assert!(is_check_due(t0, None, delay));
    }
}
