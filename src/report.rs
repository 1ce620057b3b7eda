use std::fmt::Write;

use chrono::NaiveDate;

use crate::consolidate;
use crate::models::{AgingBuckets, Case, CaseStatus, ConsolidatedHrCase, Event, MonthlyRate};
use crate::rates;

#[derive(Debug, Clone, PartialEq)]
pub struct ShareRow {
    pub label: String,
    pub total: usize,
    pub pct: f64,
}

/// Count events per label with the label's share of the period total.
pub fn share_by<F>(events: &[Event], label_fn: F) -> Vec<ShareRow>
where
    F: Fn(&Event) -> String,
{
    let mut map: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for event in events {
        *map.entry(label_fn(event)).or_default() += 1;
    }

    let total = events.len();
    let mut rows: Vec<ShareRow> = map
        .into_iter()
        .map(|(label, count)| ShareRow {
            label,
            total: count,
            pct: if total == 0 {
                0.0
            } else {
                ((count as f64 / total as f64) * 1000.0).round() / 10.0
            },
        })
        .collect();

    rows.sort_by(|a, b| b.total.cmp(&a.total).then(a.label.cmp(&b.label)));
    rows
}

pub fn build_report(
    start: NaiveDate,
    end: NaiveDate,
    reporting_days: usize,
    events: &[Event],
    cases: &[Case],
    buckets: &AgingBuckets,
    series: &[MonthlyRate],
    hr_cases: &[ConsolidatedHrCase],
    rate_category: &str,
) -> String {
    let mut output = String::new();

    let total = events.len();
    let open = events.iter().filter(|e| e.exited_at.is_none()).count();
    let category_total = events.iter().filter(|e| e.category == rate_category).count();
    let mean_per_day = rates::mean_per_reporting_day(category_total, reporting_days);
    let recurrent = consolidate::recurrent_cases(cases);

    let _ = writeln!(output, "# Fleet Operations Summary");
    let _ = writeln!(output, "Window {start} to {end} ({reporting_days} reporting days)");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Period KPIs");
    let _ = writeln!(output, "- Events: {total} ({open} still open)");
    let _ = writeln!(
        output,
        "- {rate_category}: {category_total} events, {mean_per_day:.2} per reporting day"
    );
    let _ = writeln!(output, "- Recurrent fleets: {}", recurrent.len());

    let _ = writeln!(output);
    let _ = writeln!(output, "## Aging (open cases, days down)");
    if buckets.total() == 0 {
        let _ = writeln!(output, "No open cases.");
    } else {
        let _ = writeln!(output, "- 0-1: {}", buckets.d0_1);
        let _ = writeln!(output, "- 2-3: {}", buckets.d2_3);
        let _ = writeln!(output, "- 4-7: {}", buckets.d4_7);
        let _ = writeln!(output, "- 8-15: {}", buckets.d8_15);
        let _ = writeln!(output, "- 16+: {}", buckets.d16_plus);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recurrent Fleets");
    if recurrent.is_empty() {
        let _ = writeln!(output, "No fleet reentered the shop in this window.");
    } else {
        for case in recurrent.iter().take(10) {
            let _ = writeln!(
                output,
                "- {}: {} entries, {} reentries, {} days down (last entry {})",
                case.group_key,
                case.entries.len(),
                case.reentry_count,
                case.total_days_down,
                case.last_entered_at
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Longest Downtime");
    for case in consolidate::top_by_days_down(&recurrent, 5) {
        let _ = writeln!(
            output,
            "- {}: {} days across {} entries",
            case.group_key,
            case.total_days_down,
            case.entries.len()
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sector Mix");
    for row in share_by(events, |e| e.sector.clone()) {
        let _ = writeln!(output, "- {}: {} ({:.1}%)", row.label, row.total, row.pct);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly {rate_category} Rate");
    if series.is_empty() {
        let _ = writeln!(output, "No reporting days on record.");
    } else {
        for rate in series {
            let _ = writeln!(
                output,
                "- {}: {:.2}/day ({} events over {} reporting days)",
                rate.month_key, rate.average, rate.matching_event_count, rate.reporting_days
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## HR Consolidation");
    let pending = hr_cases
        .iter()
        .filter(|c| c.status == CaseStatus::Pending)
        .count();
    let completed = hr_cases.len() - pending;
    let _ = writeln!(
        output,
        "{} consolidated cases ({pending} pending, {completed} completed)",
        hr_cases.len()
    );
    for hr_case in hr_cases.iter().filter(|c| c.status == CaseStatus::Pending) {
        let _ = writeln!(
            output,
            "- PENDING {} ({} detail rows)",
            hr_case.case.group_key,
            hr_case.case.entries.len()
        );
    }

    output
}
