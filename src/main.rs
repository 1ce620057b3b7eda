use std::path::PathBuf;

use anyhow::Context;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod aging;
mod consolidate;
mod db;
mod hr;
mod models;
mod normalize;
mod rates;
mod report;

#[derive(Parser)]
#[command(name = "fleet-consolidation")]
#[command(about = "Operational summaries for the fleet maintenance and HR case log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct WindowArgs {
    /// Window start (YYYY-MM-DD); defaults to the first of the current month
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Window end (YYYY-MM-DD); defaults to today
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Use the last 30 days instead of an explicit window
    #[arg(long, conflicts_with_all = ["start", "end"])]
    last_30: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import vehicle log entries from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Fleets that reentered the shop within the window
    Recurrence {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Aging buckets for cases still open
    Aging {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long)]
        json: bool,
    },
    /// Historical mean events per reporting day for one category
    MonthlyRate {
        #[arg(long, default_value = "GNS")]
        category: String,
        #[arg(long, default_value_t = rates::DEFAULT_MONTHS)]
        months: usize,
        #[arg(long)]
        json: bool,
    },
    /// Consolidated HR cases with their lifecycle status
    HrStatus {
        #[arg(long, value_delimiter = ',', default_values_t = [String::from("Warning"), String::from("Suspension")])]
        actions: Vec<String>,
        #[arg(long)]
        pending_only: bool,
        #[arg(long)]
        json: bool,
    },
    /// Generate the full markdown summary
    Report {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value = "GNS")]
        category: String,
        #[arg(long, default_value = "summary.md")]
        out: PathBuf,
    },
}

fn first_of_month(date: NaiveDate) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).context("invalid month start")
}

fn resolve_window(now: NaiveDateTime, args: &WindowArgs) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    let today = now.date();
    if args.last_30 {
        return Ok((today - Duration::days(29), today));
    }
    let end = args.end.unwrap_or(today);
    let start = match args.start {
        Some(start) => start,
        None => first_of_month(end)?,
    };
    Ok((start, end))
}

fn warn_data_quality(normalized: &normalize::Normalized) {
    if normalized.dropped_missing_key > 0 {
        eprintln!(
            "warning: dropped {} row(s) with no grouping key",
            normalized.dropped_missing_key
        );
    }
    if normalized.inverted_intervals > 0 {
        eprintln!(
            "warning: {} row(s) with exit before entry, durations clamped to 0",
            normalized.inverted_intervals
        );
    }
}

async fn fetch_fleet_cases(
    pool: &sqlx::PgPool,
    start: NaiveDate,
    end: NaiveDate,
    now: NaiveDateTime,
) -> anyhow::Result<(Vec<models::Event>, Vec<models::Case>)> {
    let raw = db::fetch_vehicle_rows(pool, start, end).await?;
    let normalized = normalize::normalize_records(&raw);
    warn_data_quality(&normalized);
    let cases = consolidate::build_cases(normalized.events.clone(), consolidate::fleet_key, now);
    Ok((normalized.events, cases))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let now = chrono::Utc::now().naive_utc();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} vehicle log entries from {}.", csv.display());
        }
        Commands::Recurrence { window, limit, json } => {
            let (start, end) = resolve_window(now, &window)?;
            let (_, cases) = fetch_fleet_cases(&pool, start, end, now).await?;
            let recurrent = consolidate::recurrent_cases(&cases);

            if json {
                let top: Vec<_> = recurrent.iter().take(limit).collect();
                println!("{}", serde_json::to_string_pretty(&top)?);
            } else if recurrent.is_empty() {
                println!("No fleet reentered the shop between {start} and {end}.");
            } else {
                println!("Recurrent fleets {start} to {end}:");
                for case in recurrent.iter().take(limit) {
                    println!(
                        "- {}: {} entries, {} reentries, {} days down",
                        case.group_key,
                        case.entries.len(),
                        case.reentry_count,
                        case.total_days_down
                    );
                }
            }
        }
        Commands::Aging { window, json } => {
            let (start, end) = resolve_window(now, &window)?;
            let (_, cases) = fetch_fleet_cases(&pool, start, end, now).await?;
            let buckets = aging::classify_aging(&cases, now);

            if json {
                println!("{}", serde_json::to_string_pretty(&buckets)?);
            } else {
                println!("Open cases by days down ({} total):", buckets.total());
                println!("- 0-1:  {}", buckets.d0_1);
                println!("- 2-3:  {}", buckets.d2_3);
                println!("- 4-7:  {}", buckets.d4_7);
                println!("- 8-15: {}", buckets.d8_15);
                println!("- 16+:  {}", buckets.d16_plus);
            }
        }
        Commands::MonthlyRate { category, months, json } => {
            let reporting_days = db::fetch_all_report_dates(&pool).await?;
            let event_dates = db::fetch_category_event_dates(&pool, &category).await?;
            let series = rates::aggregate_monthly_rate(&reporting_days, &event_dates, months);

            if json {
                println!("{}", serde_json::to_string_pretty(&series)?);
            } else if series.is_empty() {
                println!("No reporting days on record.");
            } else {
                println!("Mean {category} per reporting day:");
                for rate in &series {
                    println!(
                        "- {}: {:.2} ({} events over {} days)",
                        rate.month_key, rate.average, rate.matching_event_count, rate.reporting_days
                    );
                }
            }
        }
        Commands::HrStatus { actions, pending_only, json } => {
            let raw = db::fetch_discipline_rows(&pool, &actions).await?;
            let normalized = normalize::normalize_records(&raw);
            warn_data_quality(&normalized);

            let cases = consolidate::build_cases(normalized.events, hr::hr_group_key, now);
            let keys: Vec<String> = cases.iter().map(|c| c.group_key.clone()).collect();
            let lifecycle = db::fetch_hr_log(&pool, &keys).await?;
            let mut resolved = hr::resolve_hr_status(cases, &lifecycle);

            hr::sort_newest_first(&mut resolved);
            if pending_only {
                resolved.retain(|c| c.status == models::CaseStatus::Pending);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&resolved)?);
            } else if resolved.is_empty() {
                println!("No consolidated HR cases.");
            } else {
                for hr_case in &resolved {
                    let status = match hr_case.status {
                        models::CaseStatus::Pending => "PENDING",
                        models::CaseStatus::Completed => "COMPLETED",
                    };
                    println!(
                        "- {status} {} ({} detail rows)",
                        hr_case.case.group_key,
                        hr_case.case.entries.len()
                    );
                }
            }
        }
        Commands::Report { window, category, out } => {
            let (start, end) = resolve_window(now, &window)?;
            let (events, cases) = fetch_fleet_cases(&pool, start, end, now).await?;
            let buckets = aging::classify_aging(&cases, now);

            let reporting_days = db::fetch_report_dates(&pool, start, end).await?;
            let all_report_dates = db::fetch_all_report_dates(&pool).await?;
            let event_dates = db::fetch_category_event_dates(&pool, &category).await?;
            let series =
                rates::aggregate_monthly_rate(&all_report_dates, &event_dates, rates::DEFAULT_MONTHS);

            let actions = vec!["Warning".to_string(), "Suspension".to_string()];
            let raw_details = db::fetch_discipline_rows(&pool, &actions).await?;
            let hr_normalized = normalize::normalize_records(&raw_details);
            warn_data_quality(&hr_normalized);
            let hr_cases = consolidate::build_cases(hr_normalized.events, hr::hr_group_key, now);
            let keys: Vec<String> = hr_cases.iter().map(|c| c.group_key.clone()).collect();
            let lifecycle = db::fetch_hr_log(&pool, &keys).await?;
            let resolved = hr::resolve_hr_status(hr_cases, &lifecycle);

            let report = report::build_report(
                start,
                end,
                reporting_days.len(),
                &events,
                &cases,
                &buckets,
                &series,
                &resolved,
                &category,
            );
            std::fs::write(&out, report)?;
            println!("Summary written to {}.", out.display());
        }
    }

    Ok(())
}
