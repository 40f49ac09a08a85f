#![no_main]

use ferrous_target::{
    ManualClock, RefreshCheckDelay, Refreshable, RefreshableTargetSource, TargetError, TargetSource,
};
use libfuzzer_sys::fuzz_target;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte picks the check delay in milliseconds (negative = never, 0 = always)
    let delay = RefreshCheckDelay::from_millis(data[0] as i8 as i64);
    let clock = ManualClock::new();
    let loads = Arc::new(AtomicU64::new(0));
    let failing = Arc::new(AtomicBool::new(false));
    let stale = Arc::new(AtomicBool::new(false));

    let (counter, fail_flag, stale_flag) = (loads.clone(), failing.clone(), stale.clone());
    let source = RefreshableTargetSource::builder()
        .loader(move || {
            if fail_flag.load(Ordering::SeqCst) {
                return Err(TargetError::load("fuzz", "scripted failure"));
            }
            Ok(Arc::new(counter.fetch_add(1, Ordering::SeqCst) + 1))
        })
        .refresh_check_delay(delay)
        .staleness(move |_: &u64, _: &ferrous_target::LoadInfo| stale_flag.load(Ordering::SeqCst))
        .clock(clock.clone())
        .build()
        .unwrap();

    let mut last_good: Option<u64> = None;
    for op in &data[1..] {
        match op % 5 {
            0 => {
                if let Ok(target) = source.get_target() {
                    // Served targets are never older than the last good load
                    assert!(Some(*target) >= last_good);
                    last_good = Some(*target);
                }
            }
            1 => {
                if let Ok(target) = source.refresh() {
                    last_good = Some(*target);
                }
            }
            2 => clock.advance(Duration::from_millis((op / 5) as u64 * 4)),
            3 => failing.store(!failing.load(Ordering::SeqCst), Ordering::SeqCst),
            _ => stale.store(!stale.load(Ordering::SeqCst), Ordering::SeqCst),
        }
        // Only successful loads are counted
        assert_eq!(source.refresh_count(), loads.load(Ordering::SeqCst));
    }
});
