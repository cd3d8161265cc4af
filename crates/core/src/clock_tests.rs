// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

#[test]
fn fake_clock_advances() {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap();
    let clock = FakeClock::at(start);

    clock.advance(Duration::from_secs(90));
    assert_eq!(clock.now(), start + ChronoDuration::seconds(90));
}

#[test]
fn fake_clock_set_overrides_current_time() {
    let clock = FakeClock::new();
    let target = Utc.with_ymd_and_hms(2026, 1, 15, 8, 30, 0).single().unwrap();

    clock.set(target);
    assert_eq!(clock.now(), target);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new();
    let other = clock.clone();

    clock.advance(Duration::from_secs(3600));
    assert_eq!(clock.now(), other.now());
}

#[test]
fn system_clock_is_monotonic_enough() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}
