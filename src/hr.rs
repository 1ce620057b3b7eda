use std::collections::HashMap;

use crate::models::{Case, CaseStatus, ConsolidatedHrCase, Event, LifecycleRecord};

/// HR consolidation key: `badge|action|evidence-key`. Two details with no
/// evidence at all share the empty evidence key and consolidate together;
/// that is the intended "no evidence" group, not a collision.
pub fn hr_group_key(event: &Event) -> String {
    format!(
        "{}|{}|{}",
        event.entity_key.trim(),
        event.category.trim(),
        evidence_key_from_url(&event.evidence_url)
    )
}

/// Uploaded evidence files are stored as `<prefix>_<epoch-millis>_<name>`,
/// so the same document re-uploaded gets a fresh middle segment. The key
/// is the original name (everything after the second underscore); a
/// filename without that shape is used whole. The middle segment must
/// look like an epoch-millis stamp, otherwise names like
/// `RIC_2024_FINAL.pdf` would lose their leading segments and collide
/// with unrelated documents.
pub fn evidence_key_from_url(url: &str) -> String {
    let filename = last_path_segment(url);
    let mut parts = filename.splitn(3, '_');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(stamp), Some(rest)) if looks_like_epoch_millis(stamp) => rest.to_string(),
        _ => filename,
    }
}

fn looks_like_epoch_millis(stamp: &str) -> bool {
    stamp.len() >= 10 && stamp.chars().all(|c| c.is_ascii_digit())
}

fn last_path_segment(url: &str) -> String {
    let trimmed = url.split(['#', '?']).next().unwrap_or("");
    trimmed
        .split('/')
        .filter(|s| !s.is_empty())
        .last()
        .unwrap_or("")
        .to_string()
}

fn is_completed(record: &LifecycleRecord) -> bool {
    record.logged_external || record.status.to_lowercase().contains("concl")
}

/// Annotate consolidated cases with their lifecycle status. A case with no
/// lifecycle record stays PENDING so it keeps showing up as needing
/// attention; nothing is dropped.
pub fn resolve_hr_status(
    cases: Vec<Case>,
    lifecycle: &HashMap<String, LifecycleRecord>,
) -> Vec<ConsolidatedHrCase> {
    cases
        .into_iter()
        .map(|case| match lifecycle.get(&case.group_key) {
            Some(record) if is_completed(record) => ConsolidatedHrCase {
                status: CaseStatus::Completed,
                completed_at: record.logged_at,
                note: record.note.clone(),
                evidence_url: record.evidence_url.clone(),
                case,
            },
            Some(record) => ConsolidatedHrCase {
                status: CaseStatus::Pending,
                completed_at: None,
                note: record.note.clone(),
                evidence_url: record.evidence_url.clone(),
                case,
            },
            None => ConsolidatedHrCase {
                status: CaseStatus::Pending,
                completed_at: None,
                note: String::new(),
                evidence_url: None,
                case,
            },
        })
        .collect()
}

/// Newest consolidation first. Ties on the last entry timestamp (all
/// NULL-entry groups share `None`) break on the group key so the listing
/// is stable across runs despite the hash-map grouping.
pub fn sort_newest_first(cases: &mut [ConsolidatedHrCase]) {
    cases.sort_by(|a, b| {
        b.case
            .last_entered_at
            .cmp(&a.case.last_entered_at)
            .then_with(|| a.case.group_key.cmp(&b.case.group_key))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::reconstruct_cycles;
    use chrono::NaiveDate;

    fn detail(badge: &str, action: &str, evidence: &str) -> Event {
        Event {
            entity_key: badge.to_string(),
            reference_date: None,
            entered_at: NaiveDate::from_ymd_opt(2026, 2, 10)
                .unwrap()
                .and_hms_opt(9, 0, 0),
            exited_at: None,
            category: action.to_string(),
            sector: "Operations".to_string(),
            description: "Speeding".to_string(),
            observation: "-".to_string(),
            evidence_url: evidence.to_string(),
        }
    }

    fn case_for(event: Event) -> Case {
        let now = NaiveDate::from_ymd_opt(2026, 2, 11)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let key = hr_group_key(&event);
        reconstruct_cycles(&key, vec![event], now)
    }

    fn record(key: &str, status: &str, logged: bool) -> LifecycleRecord {
        LifecycleRecord {
            group_key: key.to_string(),
            status: status.to_string(),
            logged_external: logged,
            logged_at: None,
            note: "filed".to_string(),
            evidence_url: Some("https://cdn/receipt.pdf".to_string()),
        }
    }

    #[test]
    fn evidence_key_strips_upload_prefix() {
        assert_eq!(
            evidence_key_from_url("https://cdn/bucket/conclusao_1770051345532_RIC_FINAL_V2.pdf"),
            "RIC_FINAL_V2.pdf"
        );
        assert_eq!(
            evidence_key_from_url("https://cdn/bucket/RIC_FINAL.pdf?token=abc#page=2"),
            "RIC_FINAL.pdf"
        );
        assert_eq!(evidence_key_from_url("https://cdn/bucket/report.pdf"), "report.pdf");
        assert_eq!(evidence_key_from_url(""), "");
    }

    #[test]
    fn same_document_reuploaded_shares_a_group_key() {
        let first = detail("00412", "Suspension", "https://cdn/conclusao_1770051345532_RIC.pdf");
        let second = detail("00412", "Suspension", "https://cdn/conclusao_1770054400001_RIC.pdf");
        assert_eq!(hr_group_key(&first), hr_group_key(&second));
    }

    #[test]
    fn year_segments_do_not_trigger_stripping() {
        // only an epoch-millis stamp marks an upload prefix; a short digit
        // run is part of the document name and must keep the key distinct
        assert_eq!(
            evidence_key_from_url("https://cdn/bucket/RIC_2024_FINAL.pdf"),
            "RIC_2024_FINAL.pdf"
        );
        assert_ne!(
            evidence_key_from_url("https://cdn/bucket/RIC_2024_FINAL.pdf"),
            evidence_key_from_url("https://cdn/bucket/BUDGET_2024_FINAL.pdf")
        );
    }

    #[test]
    fn missing_evidence_groups_together() {
        let first = detail("00412", "Warning", "");
        let second = detail("00412", "Warning", "");
        assert_eq!(hr_group_key(&first), hr_group_key(&second));
        assert_eq!(hr_group_key(&first), "00412|Warning|");
    }

    #[test]
    fn completion_via_flag_or_status_text() {
        let case = case_for(detail("00412", "Warning", ""));
        let key = case.group_key.clone();

        let mut lifecycle = HashMap::new();
        lifecycle.insert(key.clone(), record(&key, "PENDENTE", true));
        let resolved = resolve_hr_status(vec![case.clone()], &lifecycle);
        assert_eq!(resolved[0].status, CaseStatus::Completed);

        lifecycle.insert(key.clone(), record(&key, "Concluída", false));
        let resolved = resolve_hr_status(vec![case.clone()], &lifecycle);
        assert_eq!(resolved[0].status, CaseStatus::Completed);

        lifecycle.insert(key.clone(), record(&key, "em análise", false));
        let resolved = resolve_hr_status(vec![case], &lifecycle);
        assert_eq!(resolved[0].status, CaseStatus::Pending);
        assert_eq!(resolved[0].note, "filed");
    }

    #[test]
    fn listing_order_is_deterministic_on_tied_timestamps() {
        let mut tied: Vec<Event> = ["00300", "00100", "00200"]
            .into_iter()
            .map(|badge| {
                let mut event = detail(badge, "Warning", "");
                event.entered_at = None;
                event
            })
            .collect();
        tied.push(detail("00500", "Warning", ""));

        let now = NaiveDate::from_ymd_opt(2026, 2, 11)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let cases = crate::consolidate::build_cases(tied, hr_group_key, now);
        let mut resolved = resolve_hr_status(cases, &HashMap::new());

        sort_newest_first(&mut resolved);
        let keys: Vec<String> = resolved.iter().map(|c| c.case.group_key.clone()).collect();
        assert_eq!(
            keys,
            vec![
                "00500|Warning|",
                "00100|Warning|",
                "00200|Warning|",
                "00300|Warning|"
            ]
        );

        // same input regrouped must land in the same order
        resolved.reverse();
        sort_newest_first(&mut resolved);
        let again: Vec<&str> = resolved.iter().map(|c| c.case.group_key.as_str()).collect();
        assert_eq!(again, keys);
    }

    #[test]
    fn absent_lifecycle_record_defaults_to_pending() {
        let case = case_for(detail("00999", "Suspension", "https://cdn/x.pdf"));
        let resolved = resolve_hr_status(vec![case], &HashMap::new());
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].status, CaseStatus::Pending);
        assert!(resolved[0].completed_at.is_none());
    }
}
