use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

/// Raw row as the data layer hands it over. Everything is optional because
/// the source tables grew fallback columns over time (an explicit entry
/// timestamp next to the daily-report reference date, two competing
/// evidence URL columns, and so on).
#[derive(Debug, Clone, Default)]
pub struct RawEventRecord {
    pub entity_key: Option<String>,
    pub reference_date: Option<NaiveDate>,
    pub entered_at: Option<NaiveDateTime>,
    pub exited_at: Option<NaiveDateTime>,
    pub category: Option<String>,
    pub sector: Option<String>,
    pub description: Option<String>,
    pub observation: Option<String>,
    pub completion_evidence_url: Option<String>,
    pub attachment_url: Option<String>,
}

/// Canonical event after normalization. `entered_at` is the resolved best
/// entry timestamp (explicit column, else reference date at midnight); it
/// stays `None` only when the row carried neither.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub entity_key: String,
    pub reference_date: Option<NaiveDate>,
    pub entered_at: Option<NaiveDateTime>,
    pub exited_at: Option<NaiveDateTime>,
    pub category: String,
    pub sector: String,
    pub description: String,
    pub observation: String,
    pub evidence_url: String,
}

/// One logical grouped case: all events sharing a group key, time-ordered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Case {
    pub group_key: String,
    pub entries: Vec<Event>,
    pub reentry_count: usize,
    pub total_days_down: i64,
    pub last_entered_at: Option<NaiveDateTime>,
}

impl Case {
    pub fn is_recurrent(&self) -> bool {
        self.reentry_count >= 1
    }
}

/// Days-open bands for cases whose latest event has no exit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgingBuckets {
    pub d0_1: usize,
    pub d2_3: usize,
    pub d4_7: usize,
    pub d8_15: usize,
    pub d16_plus: usize,
}

impl AgingBuckets {
    pub fn total(&self) -> usize {
        self.d0_1 + self.d2_3 + self.d4_7 + self.d8_15 + self.d16_plus
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRate {
    pub month_key: String,
    pub reporting_days: usize,
    pub matching_event_count: usize,
    pub average: f64,
}

/// One row of the HR lifecycle log, keyed by consolidation key.
#[derive(Debug, Clone)]
pub struct LifecycleRecord {
    pub group_key: String,
    pub status: String,
    pub logged_external: bool,
    pub logged_at: Option<DateTime<Utc>>,
    pub note: String,
    pub evidence_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaseStatus {
    Pending,
    Completed,
}

/// An HR case joined against its lifecycle record (if any).
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidatedHrCase {
    pub case: Case,
    pub status: CaseStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub note: String,
    pub evidence_url: Option<String>,
}
