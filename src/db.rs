use std::collections::HashMap;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{LifecycleRecord, RawEventRecord};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let reports = vec![
        (
            Uuid::parse_str("6f1c2a34-8a1d-4f3e-9c5b-0d2e7a41b863")?,
            NaiveDate::from_ymd_opt(2026, 2, 2).context("invalid date")?,
            "shift.lead@fleetops.com",
        ),
        (
            Uuid::parse_str("b9d44c1a-57aa-4f0a-8a0e-2c9f6d8e1b22")?,
            NaiveDate::from_ymd_opt(2026, 2, 3).context("invalid date")?,
            "shift.lead@fleetops.com",
        ),
        (
            Uuid::parse_str("2e0a9c77-13b5-4d6e-bb1f-9a8c54d2f0e1")?,
            NaiveDate::from_ymd_opt(2026, 2, 4).context("invalid date")?,
            "night.shift@fleetops.com",
        ),
    ];

    for (id, report_date, created_by) in &reports {
        sqlx::query(
            r#"
            INSERT INTO fleet_ops.daily_reports (id, report_date, created_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (report_date) DO UPDATE
            SET created_by = EXCLUDED.created_by
            "#,
        )
        .bind(id)
        .bind(report_date)
        .bind(created_by)
        .execute(pool)
        .await?;
    }

    let vehicle_events = vec![
        (
            "seed-veh-001",
            reports[0].0,
            "ABC1234",
            "Engine",
            "GNS",
            "Coolant leak",
            Some((2026, 2, 2, 7, 30)),
            Some((2026, 2, 3, 16, 0)),
        ),
        (
            "seed-veh-002",
            reports[1].0,
            "ABC1234",
            "Engine",
            "GNS",
            "Coolant leak returned",
            Some((2026, 2, 4, 8, 15)),
            None,
        ),
        (
            "seed-veh-003",
            reports[1].0,
            "XYZ9876",
            "Bodywork",
            "Preventive",
            "Scheduled inspection",
            None,
            None,
        ),
    ];

    for (source_key, report_id, fleet, sector, category, description, entered, exited) in
        vehicle_events
    {
        let entered_at = match entered {
            Some((y, m, d, h, min)) => Some(
                NaiveDate::from_ymd_opt(y, m, d)
                    .context("invalid date")?
                    .and_hms_opt(h, min, 0)
                    .context("invalid time")?,
            ),
            None => None,
        };
        let exited_at = match exited {
            Some((y, m, d, h, min)) => Some(
                NaiveDate::from_ymd_opt(y, m, d)
                    .context("invalid date")?
                    .and_hms_opt(h, min, 0)
                    .context("invalid time")?,
            ),
            None => None,
        };

        sqlx::query(
            r#"
            INSERT INTO fleet_ops.vehicle_events
            (id, report_id, fleet_code, sector, category, description, observation,
             entered_at, exited_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(report_id)
        .bind(fleet)
        .bind(sector)
        .bind(category)
        .bind(description)
        .bind(Option::<&str>::None)
        .bind(entered_at)
        .bind(exited_at)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let details = vec![
        (
            "seed-hr-001",
            "00412",
            "Marcos Silva",
            "Suspension",
            "Speeding",
            "Line 204",
            Some("https://storage.fleetops.com/evidence/conclusao_1770051345532_RIC_FINAL.pdf"),
        ),
        (
            "seed-hr-002",
            "00412",
            "Marcos Silva",
            "Suspension",
            "Speeding repeat",
            "Line 204",
            Some("https://storage.fleetops.com/evidence/conclusao_1770054400001_RIC_FINAL.pdf"),
        ),
        (
            "seed-hr-003",
            "00877",
            "Ana Costa",
            "Warning",
            "Missed checkpoint",
            "Line 310",
            None,
        ),
    ];

    for (source_key, badge, name, action, occurrence, line, evidence) in details {
        sqlx::query(
            r#"
            INSERT INTO fleet_ops.discipline_details
            (id, created_at, driver_badge, driver_name, action_type, occurrence_type,
             line, note, completion_evidence_url, attachment_url, source_key)
            VALUES ($1, now(), $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(badge)
        .bind(name)
        .bind(action)
        .bind(occurrence)
        .bind(line)
        .bind("seeded")
        .bind(evidence)
        .bind(Option::<&str>::None)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO fleet_ops.hr_case_log
        (id, group_key, status, logged_external, logged_at, note, evidence_url)
        VALUES ($1, $2, $3, $4, now(), $5, $6)
        ON CONFLICT (group_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind("00412|Suspension|RIC_FINAL.pdf")
    .bind("CONCLUIDA")
    .bind(true)
    .bind("Filed in external HR system")
    .bind("https://storage.fleetops.com/evidence/receipt_00412.pdf")
    .execute(pool)
    .await?;

    Ok(())
}

/// Report dates inside the inclusive window, ascending.
pub async fn fetch_report_dates(
    pool: &PgPool,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<NaiveDate>> {
    let rows = sqlx::query(
        "SELECT report_date FROM fleet_ops.daily_reports \
         WHERE report_date >= $1 AND report_date <= $2 \
         ORDER BY report_date",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| r.get("report_date")).collect())
}

/// Every report date on record, for the historical monthly series.
pub async fn fetch_all_report_dates(pool: &PgPool) -> anyhow::Result<Vec<NaiveDate>> {
    let rows = sqlx::query(
        "SELECT report_date FROM fleet_ops.daily_reports ORDER BY report_date",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| r.get("report_date")).collect())
}

/// Vehicle log rows for the window: an explicit entry inside it, or no
/// entry at all but attached to a daily report inside it. The report date
/// rides along as the normalizer's fallback entry date.
pub async fn fetch_vehicle_rows(
    pool: &PgPool,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<RawEventRecord>> {
    let window_start = start.and_hms_opt(0, 0, 0).context("invalid window start")?;
    let window_end = end.and_hms_opt(23, 59, 59).context("invalid window end")?;

    let rows = sqlx::query(
        "SELECT v.fleet_code, v.sector, v.category, v.description, v.observation, \
         v.entered_at, v.exited_at, r.report_date \
         FROM fleet_ops.vehicle_events v \
         LEFT JOIN fleet_ops.daily_reports r ON r.id = v.report_id \
         WHERE (v.entered_at >= $1 AND v.entered_at <= $2) \
            OR (v.entered_at IS NULL AND r.report_date >= $3 AND r.report_date <= $4)",
    )
    .bind(window_start)
    .bind(window_end)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    let mut records = Vec::new();
    for row in rows {
        records.push(RawEventRecord {
            entity_key: row.get("fleet_code"),
            reference_date: row.get("report_date"),
            entered_at: row.get("entered_at"),
            exited_at: row.get("exited_at"),
            category: row.get("category"),
            sector: row.get("sector"),
            description: row.get("description"),
            observation: row.get("observation"),
            completion_evidence_url: None,
            attachment_url: None,
        });
    }

    Ok(records)
}

/// Dates of every event in a category (entry date, else report date), for
/// the monthly rate numerator.
pub async fn fetch_category_event_dates(
    pool: &PgPool,
    category: &str,
) -> anyhow::Result<Vec<NaiveDate>> {
    let rows = sqlx::query(
        "SELECT COALESCE(v.entered_at::date, r.report_date) AS event_date \
         FROM fleet_ops.vehicle_events v \
         LEFT JOIN fleet_ops.daily_reports r ON r.id = v.report_id \
         WHERE v.category = $1 \
           AND COALESCE(v.entered_at::date, r.report_date) IS NOT NULL",
    )
    .bind(category)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| r.get("event_date")).collect())
}

/// Disciplinary detail rows for the HR actions that consolidate into cases.
pub async fn fetch_discipline_rows(
    pool: &PgPool,
    actions: &[String],
) -> anyhow::Result<Vec<RawEventRecord>> {
    let rows = sqlx::query(
        "SELECT created_at, driver_badge, driver_name, action_type, occurrence_type, \
         line, note, completion_evidence_url, attachment_url \
         FROM fleet_ops.discipline_details \
         WHERE action_type = ANY($1) \
         ORDER BY created_at DESC",
    )
    .bind(actions)
    .fetch_all(pool)
    .await?;

    let mut records = Vec::new();
    for row in rows {
        let created_at: NaiveDateTime = row.get("created_at");
        records.push(RawEventRecord {
            entity_key: row.get("driver_badge"),
            reference_date: Some(created_at.date()),
            entered_at: Some(created_at),
            exited_at: None,
            category: row.get("action_type"),
            sector: row.get("line"),
            description: row.get("occurrence_type"),
            observation: row.get("note"),
            completion_evidence_url: row.get("completion_evidence_url"),
            attachment_url: row.get("attachment_url"),
        });
    }

    Ok(records)
}

/// Lifecycle rows for the given consolidation keys, keyed for the resolver.
pub async fn fetch_hr_log(
    pool: &PgPool,
    keys: &[String],
) -> anyhow::Result<HashMap<String, LifecycleRecord>> {
    if keys.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query(
        "SELECT group_key, status, logged_external, logged_at, note, evidence_url \
         FROM fleet_ops.hr_case_log \
         WHERE group_key = ANY($1)",
    )
    .bind(keys)
    .fetch_all(pool)
    .await?;

    let mut map = HashMap::new();
    for row in rows {
        let record = LifecycleRecord {
            group_key: row.get("group_key"),
            status: row.get::<Option<String>, _>("status").unwrap_or_default(),
            logged_external: row
                .get::<Option<bool>, _>("logged_external")
                .unwrap_or(false),
            logged_at: row.get("logged_at"),
            note: row.get::<Option<String>, _>("note").unwrap_or_default(),
            evidence_url: row.get("evidence_url"),
        };
        map.insert(record.group_key.clone(), record);
    }

    Ok(map)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        report_date: NaiveDate,
        fleet_code: String,
        sector: String,
        category: String,
        description: String,
        observation: Option<String>,
        entered_at: Option<NaiveDateTime>,
        exited_at: Option<NaiveDateTime>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let report_id: Uuid = sqlx::query(
            r#"
            INSERT INTO fleet_ops.daily_reports (id, report_date, created_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (report_date) DO UPDATE
            SET created_by = EXCLUDED.created_by
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.report_date)
        .bind("csv-import")
        .fetch_one(pool)
        .await?
        .get("id");

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO fleet_ops.vehicle_events
            (id, report_id, fleet_code, sector, category, description, observation,
             entered_at, exited_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(report_id)
        .bind(&row.fleet_code)
        .bind(&row.sector)
        .bind(&row.category)
        .bind(&row.description)
        .bind(&row.observation)
        .bind(row.entered_at)
        .bind(row.exited_at)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
