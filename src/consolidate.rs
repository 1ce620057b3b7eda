use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::models::{Case, Event};

/// Whole days from `start` to `end`, clamped to zero when the interval is
/// inverted (upstream data-entry noise, tolerated per the normalizer's
/// counter).
pub fn days_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    (end - start).num_days().max(0)
}

/// Fleet grouping policy: one case per fleet code.
pub fn fleet_key(event: &Event) -> String {
    event.entity_key.trim().to_string()
}

/// Collapse events into groups under a caller-supplied key policy. The key
/// function is injected so fleet and HR grouping share the reconstruction
/// code below.
pub fn group_by_key<F>(events: Vec<Event>, key_fn: F) -> HashMap<String, Vec<Event>>
where
    F: Fn(&Event) -> String,
{
    let mut groups: HashMap<String, Vec<Event>> = HashMap::new();
    for event in events {
        let key = key_fn(&event);
        groups.entry(key).or_default().push(event);
    }
    groups
}

/// Rebuild one group's entry/exit cycles.
///
/// Events sort ascending by resolved entry timestamp; rows without one sort
/// first, and ties keep their incoming order (stable sort). A reentry is
/// counted only when the previous event closed and the next entry is
/// strictly later than that exit. An entry with no prior exit is a
/// continuation of the same dwell, not a reentry.
pub fn reconstruct_cycles(group_key: &str, events: Vec<Event>, now: NaiveDateTime) -> Case {
    let mut sorted = events;
    sorted.sort_by_key(|e| e.entered_at);

    let mut reentry_count = 0usize;
    for pair in sorted.windows(2) {
        if let (Some(prev_exit), Some(entry)) = (pair[0].exited_at, pair[1].entered_at) {
            if entry > prev_exit {
                reentry_count += 1;
            }
        }
    }

    let total_days_down = sorted
        .iter()
        .filter_map(|e| e.entered_at.map(|entry| (entry, e.exited_at.unwrap_or(now))))
        .map(|(entry, exit)| days_between(entry, exit))
        .sum();

    let last_entered_at = sorted.last().and_then(|e| e.entered_at);

    Case {
        group_key: group_key.to_string(),
        entries: sorted,
        reentry_count,
        total_days_down,
        last_entered_at,
    }
}

/// Group and reconstruct in one pass.
pub fn build_cases<F>(events: Vec<Event>, key_fn: F, now: NaiveDateTime) -> Vec<Case>
where
    F: Fn(&Event) -> String,
{
    group_by_key(events, key_fn)
        .into_iter()
        .map(|(key, group)| reconstruct_cycles(&key, group, now))
        .collect()
}

/// Cases with at least one true reentry, ordered by reentry count then by
/// accumulated days down (the summary screen's priority order).
pub fn recurrent_cases(cases: &[Case]) -> Vec<Case> {
    let mut recurrent: Vec<Case> = cases.iter().filter(|c| c.is_recurrent()).cloned().collect();
    recurrent.sort_by(|a, b| {
        b.reentry_count
            .cmp(&a.reentry_count)
            .then(b.total_days_down.cmp(&a.total_days_down))
    });
    recurrent
}

pub fn top_by_days_down(cases: &[Case], limit: usize) -> Vec<Case> {
    let mut sorted = cases.to_vec();
    sorted.sort_by(|a, b| b.total_days_down.cmp(&a.total_days_down));
    sorted.truncate(limit);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn event(key: &str, entered: Option<NaiveDateTime>, exited: Option<NaiveDateTime>) -> Event {
        Event {
            entity_key: key.to_string(),
            reference_date: None,
            entered_at: entered,
            exited_at: exited,
            category: "-".to_string(),
            sector: "-".to_string(),
            description: "-".to_string(),
            observation: "-".to_string(),
            evidence_url: String::new(),
        }
    }

    #[test]
    fn single_event_group_has_no_reentry() {
        let case = reconstruct_cycles(
            "ABC123",
            vec![event("ABC123", Some(at(1, 8)), None)],
            at(3, 8),
        );
        assert_eq!(case.reentry_count, 0);
        assert!(!case.is_recurrent());
    }

    #[test]
    fn reentry_requires_prior_exit_before_next_entry() {
        // entry Jan1 exit Jan3, entry Jan5 exit Jan6, duplicate entry Jan5
        // with no exit. The duplicate has no closed cycle before it at the
        // same instant, so only the Jan3 -> Jan5 gap counts.
        let events = vec![
            event("ABC123", Some(at(1, 0)), Some(at(3, 0))),
            event("ABC123", Some(at(5, 0)), Some(at(6, 0))),
            event("ABC123", Some(at(5, 0)), None),
        ];
        let case = reconstruct_cycles("ABC123", events, at(8, 0));
        assert_eq!(case.reentry_count, 1);
    }

    #[test]
    fn reentry_count_bounded_by_gap_count() {
        let events = vec![
            event("ABC123", Some(at(1, 0)), Some(at(2, 0))),
            event("ABC123", Some(at(3, 0)), Some(at(4, 0))),
            event("ABC123", Some(at(5, 0)), Some(at(6, 0))),
            event("ABC123", Some(at(7, 0)), None),
        ];
        let case = reconstruct_cycles("ABC123", events.clone(), at(9, 0));
        assert_eq!(case.reentry_count, 3);
        assert!(case.reentry_count <= events.len() - 1);
    }

    #[test]
    fn open_event_accrues_days_until_now() {
        let events = vec![
            event("ABC123", Some(at(1, 0)), Some(at(3, 0))),
            event("ABC123", Some(at(10, 0)), None),
        ];
        let case = reconstruct_cycles("ABC123", events, at(14, 0));
        assert_eq!(case.total_days_down, 2 + 4);
    }

    #[test]
    fn inverted_interval_clamps_to_zero_days() {
        let events = vec![event("ABC123", Some(at(5, 12)), Some(at(5, 8)))];
        let case = reconstruct_cycles("ABC123", events, at(6, 0));
        assert_eq!(case.total_days_down, 0);
    }

    #[test]
    fn sort_is_stable_on_equal_entry_timestamps() {
        let mut first = event("ABC123", Some(at(5, 0)), None);
        first.description = "FIRST".to_string();
        let mut second = event("ABC123", Some(at(5, 0)), None);
        second.description = "SECOND".to_string();
        let case = reconstruct_cycles("ABC123", vec![first, second], at(6, 0));
        assert_eq!(case.entries[0].description, "FIRST");
        assert_eq!(case.entries[1].description, "SECOND");
    }

    #[test]
    fn grouping_splits_by_key_function() {
        let events = vec![
            event("ABC123", Some(at(1, 0)), None),
            event("XYZ789", Some(at(1, 0)), None),
            event("ABC123", Some(at(2, 0)), None),
        ];
        let groups = group_by_key(events, fleet_key);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.get("ABC123").map(Vec::len), Some(2));
        assert_eq!(groups.get("XYZ789").map(Vec::len), Some(1));
    }

    #[test]
    fn rebuilding_from_same_input_is_idempotent() {
        let events = vec![
            event("ABC123", Some(at(1, 0)), Some(at(3, 0))),
            event("ABC123", Some(at(5, 0)), None),
        ];
        let now = at(7, 0);
        let first = reconstruct_cycles("ABC123", events.clone(), now);
        let second = reconstruct_cycles("ABC123", events, now);
        assert_eq!(first, second);
    }

    #[test]
    fn recurrent_ordering_prefers_reentries_then_days_down() {
        let now = at(20, 0);
        let quiet = reconstruct_cycles(
            "ONE",
            vec![event("ONE", Some(at(1, 0)), Some(at(2, 0)))],
            now,
        );
        let busy = reconstruct_cycles(
            "TWO",
            vec![
                event("TWO", Some(at(1, 0)), Some(at(2, 0))),
                event("TWO", Some(at(4, 0)), Some(at(5, 0))),
                event("TWO", Some(at(8, 0)), None),
            ],
            now,
        );
        let slow = reconstruct_cycles(
            "THREE",
            vec![
                event("THREE", Some(at(1, 0)), Some(at(2, 0))),
                event("THREE", Some(at(3, 0)), None),
            ],
            now,
        );
        let recurrent = recurrent_cases(&[quiet, slow, busy]);
        assert_eq!(recurrent.len(), 2);
        assert_eq!(recurrent[0].group_key, "TWO");
        assert_eq!(recurrent[1].group_key, "THREE");
    }
}
