use chrono::NaiveDateTime;

use crate::consolidate::days_between;
use crate::models::{AgingBuckets, Case};

/// Bucket still-open cases (latest event has no exit) by whole days open as
/// of `now`. Band upper bounds are inclusive; a case with no resolvable
/// entry timestamp counts as zero days open rather than being dropped, so
/// the bucket total always matches the open-case count.
pub fn classify_aging(cases: &[Case], now: NaiveDateTime) -> AgingBuckets {
    let mut buckets = AgingBuckets::default();

    for case in cases {
        let open = match case.entries.last() {
            Some(latest) if latest.exited_at.is_none() => latest,
            _ => continue,
        };
        let days = open
            .entered_at
            .map(|entry| days_between(entry, now))
            .unwrap_or(0);

        match days {
            0..=1 => buckets.d0_1 += 1,
            2..=3 => buckets.d2_3 += 1,
            4..=7 => buckets.d4_7 += 1,
            8..=15 => buckets.d8_15 += 1,
            _ => buckets.d16_plus += 1,
        }
    }

    buckets
}
