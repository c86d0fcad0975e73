// SPDX-License-Identifier: MIT

use super::*;
use std::time::Duration;

#[test]
fn fake_clock_advances_both_instant_and_utc() {
    let clock = FakeClock::new();
    let start_instant = clock.now();
    let start_utc = clock.utc_now();

    clock.advance(Duration::from_secs(30));

    assert_eq!(clock.now(), start_instant + Duration::from_secs(30));
    assert_eq!(clock.utc_now(), start_utc + chrono::Duration::seconds(30));
}

#[test]
fn fake_clock_set_utc_is_exact() {
    let clock = FakeClock::new();
    let target = Utc::now() + chrono::Duration::days(1);
    clock.set_utc(target);
    assert_eq!(clock.utc_now(), target);
}
