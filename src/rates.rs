use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use crate::models::MonthlyRate;

pub const DEFAULT_MONTHS: usize = 18;

pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean matching events per reporting day, month by month, most recent
/// first, truncated to `limit` months. Only months with at least one
/// reporting day are emitted; a month somehow present with zero reporting
/// days averages to 0 rather than dividing by zero.
pub fn aggregate_monthly_rate(
    reporting_days: &[NaiveDate],
    matching_events: &[NaiveDate],
    limit: usize,
) -> Vec<MonthlyRate> {
    let mut days_per_month: HashMap<String, usize> = HashMap::new();
    for day in reporting_days {
        *days_per_month.entry(month_key(*day)).or_default() += 1;
    }

    let mut events_per_month: HashMap<String, usize> = HashMap::new();
    for event in matching_events {
        *events_per_month.entry(month_key(*event)).or_default() += 1;
    }

    let mut months: Vec<String> = days_per_month.keys().cloned().collect();
    months.sort();
    months.reverse();
    months.truncate(limit);

    months
        .into_iter()
        .map(|mk| {
            let reporting_days = days_per_month.get(&mk).copied().unwrap_or(0);
            let matching_event_count = events_per_month.get(&mk).copied().unwrap_or(0);
            let average = if reporting_days == 0 {
                0.0
            } else {
                round2(matching_event_count as f64 / reporting_days as f64)
            };
            MonthlyRate {
                month_key: mk,
                reporting_days,
                matching_event_count,
                average,
            }
        })
        .collect()
}

/// Single-window variant used by the period KPIs.
pub fn mean_per_reporting_day(matching_event_count: usize, reporting_days: usize) -> f64 {
    if reporting_days == 0 {
        0.0
    } else {
        round2(matching_event_count as f64 / reporting_days as f64)
    }
}
