use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod db;
mod followup;
mod models;
mod report;
mod stats;

#[derive(Parser)]
#[command(name = "enrollment-dashboard")]
#[command(about = "Enrollment statistics and reporting for course sales", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import enrollments from a school-system CSV export
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Compute dashboard statistics across enrollments
    #[command(group(
        ArgGroup::new("scope")
            .args(["class", "attendant"])
            .multiple(false)
    ))]
    Stats {
        #[arg(long)]
        class: Option<String>,
        #[arg(long)]
        attendant: Option<String>,
        #[arg(long, default_value_t = 5)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    #[command(group(
        ArgGroup::new("scope")
            .args(["class", "attendant"])
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        class: Option<String>,
        #[arg(long)]
        attendant: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// List enrollments still waiting for a contract signature
    Followup {
        #[arg(long)]
        attendant: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
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
            println!("Inserted {inserted} enrollments from {}.", csv.display());
        }
        Commands::Stats {
            class,
            attendant,
            limit,
            json,
        } => {
            let records =
                db::fetch_enrollments(&pool, class.as_deref(), attendant.as_deref()).await?;
            let stats = stats::compute_stats(&records);

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }

            if stats.total_enrollments == 0 {
                println!("No enrollments found for this scope.");
                return Ok(());
            }

            println!(
                "{} enrollments across {} classes",
                stats.total_enrollments,
                stats.available_classes.len()
            );
            println!(
                "Billed R$ {:.2}, collected R$ {:.2}, average ticket R$ {:.2}",
                stats.total_sales, stats.total_received, stats.average_ticket
            );

            println!("Top attendants by billed total:");
            for metric in stats.attendant_metrics.iter().take(limit) {
                println!(
                    "- {} billed R$ {:.2}, collected R$ {:.2} across {} enrollments",
                    metric.name, metric.total_sales, metric.total_received, metric.enrollment_count
                );
            }

            println!("Top courses by billed total:");
            for metric in stats.course_metrics.iter().take(limit) {
                println!(
                    "- {} billed R$ {:.2}, collected R$ {:.2} across {} enrollments",
                    metric.name, metric.total_sales, metric.total_received, metric.enrollment_count
                );
            }

            println!("Status mix:");
            for status in stats.status_distribution.iter() {
                println!("- {}: {}", status.name, status.count);
            }
        }
        Commands::Report {
            class,
            attendant,
            out,
        } => {
            let records =
                db::fetch_enrollments(&pool, class.as_deref(), attendant.as_deref()).await?;
            let stats = stats::compute_stats(&records);
            let report = report::build_report(
                class.as_deref().or(attendant.as_deref()),
                &records,
                &stats,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Followup { attendant, limit } => {
            let records = db::fetch_enrollments(&pool, None, attendant.as_deref()).await?;
            let summary = followup::summarize(&records, chrono::Utc::now());

            if summary.unsigned == 0 {
                println!("No signatures pending.");
                return Ok(());
            }

            println!(
                "{} of {} enrollments unsigned ({} critical, {} warning)",
                summary.unsigned, summary.total_enrollments, summary.critical, summary.warning
            );
            println!("Pending by vendor:");
            for (vendor, count) in summary.per_vendor.iter() {
                println!("- {vendor}: {count}");
            }
            println!("Oldest pending signatures:");
            for pending in summary.pending.iter().take(limit) {
                println!(
                    "- {} ({}, {}) with {} waiting {} days, phone {}",
                    pending.student,
                    pending.package,
                    pending.class_name,
                    pending.attendant,
                    pending.days_delayed,
                    pending.phone
                );
            }
        }
    }

    Ok(())
}
