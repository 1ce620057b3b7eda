use crate::models::{Event, RawEventRecord};

/// Normalizer output plus the data-quality counters the CLI surfaces on
/// stderr. Dropped rows and inverted intervals never abort the batch.
#[derive(Debug, Default, PartialEq)]
pub struct Normalized {
    pub events: Vec<Event>,
    pub dropped_missing_key: usize,
    pub inverted_intervals: usize,
}

/// Field fallback order, applied once here instead of at every call site:
/// - entry timestamp: explicit `entered_at`, else reference date at midnight
/// - category / sector / description / observation: `-` when absent or blank
/// - evidence URL: completion evidence, else attachment, else empty string
///
/// A row with a blank entity key cannot be grouped and is excluded.
pub fn normalize_records(raw: &[RawEventRecord]) -> Normalized {
    let mut out = Normalized::default();

    for record in raw {
        let entity_key = record
            .entity_key
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .to_string();
        if entity_key.is_empty() {
            out.dropped_missing_key += 1;
            continue;
        }

        let entered_at = record
            .entered_at
            .or_else(|| record.reference_date.and_then(|d| d.and_hms_opt(0, 0, 0)));

        if let (Some(entered), Some(exited)) = (entered_at, record.exited_at) {
            if exited < entered {
                out.inverted_intervals += 1;
            }
        }

        let evidence_url = record
            .completion_evidence_url
            .clone()
            .or_else(|| record.attachment_url.clone())
            .unwrap_or_default();

        out.events.push(Event {
            entity_key,
            reference_date: record.reference_date,
            entered_at,
            exited_at: record.exited_at,
            category: text_or_dash(record.category.as_deref()),
            sector: text_or_dash(record.sector.as_deref()),
            description: text_or_dash(record.description.as_deref()),
            observation: text_or_dash(record.observation.as_deref()),
            evidence_url,
        });
    }

    out
}

fn text_or_dash(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => "-".to_string(),
    }
}
