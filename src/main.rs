use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use configuration::{init_tracing, load_config};
use core_types::{CoreError, KpiLevel, KpiStatus, PeerGroupLevel, ProviderId, RankingResult};
use database::{DbRepository, connect, run_migrations};
use engine::{BenchmarkView, KpiReport, KpiService, RebuildSummary};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

/// The main entry point for the hospital KPI engine.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load DATABASE_URL and any HKPI__* overrides before reading the config.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = load_config().context("Failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging)?;

    let pool = connect(&config.database)
        .await
        .context("Failed to connect to the database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let repository = Arc::new(DbRepository::new(pool));
    let service = KpiService::new(repository.clone(), repository.clone(), &config)?
        .with_archive(repository);

    match cli.command {
        Commands::Kpis(args) => handle_kpis(&service, args, cli.json).await,
        Commands::Benchmarks(args) => handle_benchmarks(&service, args, cli.json),
        Commands::Rank(args) => handle_rank(&service, args, cli.json).await,
        Commands::Rebuild(args) => handle_rebuild(&service, args, cli.json).await,
        Commands::Restore(args) => {
            let summary = service.restore_benchmarks(args.year).await?;
            print_summary(&summary, cli.json)
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Financial KPIs and peer benchmarks from hospital cost reports.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Print results as JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the KPI hierarchy of one provider.
    Kpis(KpiArgs),
    /// Show the peer benchmarks of one provider.
    Benchmarks(BenchmarkArgs),
    /// Rank a provider's KPIs for display.
    Rank(RankArgs),
    /// Recompute the benchmarks of a fiscal year from every provider.
    Rebuild(YearArgs),
    /// Load the benchmarks of a fiscal year from the precomputed store.
    Restore(YearArgs),
}

#[derive(Args)]
struct KpiArgs {
    /// Provider identifier (CCN); leading zeros may be omitted.
    #[arg(long, value_parser = parse_provider)]
    provider: ProviderId,

    #[arg(long)]
    year: i32,

    /// Deepest KPI level to compute (1-3).
    #[arg(long, default_value = "3", value_parser = parse_level)]
    level: KpiLevel,
}

#[derive(Args)]
struct BenchmarkArgs {
    #[arg(long, value_parser = parse_provider)]
    provider: ProviderId,

    #[arg(long)]
    year: i32,

    /// Peer-group partition: national, state, hospital_type or state_type.
    #[arg(long, default_value = "state")]
    peer_group: PeerGroupLevel,
}

#[derive(Args)]
struct RankArgs {
    #[command(flatten)]
    kpis: KpiArgs,

    #[arg(long, default_value = "state")]
    peer_group: PeerGroupLevel,
}

#[derive(Args)]
struct YearArgs {
    #[arg(long)]
    year: i32,
}

fn parse_provider(raw: &str) -> Result<ProviderId, CoreError> {
    ProviderId::normalize(raw)
}

fn parse_level(raw: &str) -> Result<KpiLevel, CoreError> {
    let number: u8 = raw
        .parse()
        .map_err(|_| CoreError::InvalidInput("kpi level".to_string(), raw.to_string()))?;
    KpiLevel::try_from(number)
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_kpis(service: &KpiService, args: KpiArgs, json: bool) -> anyhow::Result<()> {
    let report = service
        .compute_kpis(&args.provider, args.year, args.level)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn handle_benchmarks(service: &KpiService, args: BenchmarkArgs, json: bool) -> anyhow::Result<()> {
    let view = service.get_benchmarks(&args.provider, args.year, args.peer_group);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_benchmarks(&view);
    }
    Ok(())
}

async fn handle_rank(service: &KpiService, args: RankArgs, json: bool) -> anyhow::Result<()> {
    let KpiArgs {
        provider,
        year,
        level,
    } = args.kpis;

    let report = service.compute_kpis(&provider, year, level).await?;
    let benchmarks = service.get_benchmarks(&provider, year, args.peer_group);
    let ranked = service
        .rank_kpis(&provider, year, &report.values, &benchmarks)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
    } else {
        print_ranking(&ranked);
    }
    Ok(())
}

async fn handle_rebuild(service: &KpiService, args: YearArgs, json: bool) -> anyhow::Result<()> {
    let progress_bar = ProgressBar::new(0);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} providers ({eta})")?
            .progress_chars("#>-"),
    );

    let result = service
        .rebuild_benchmarks_with_progress(args.year, |done, total| {
            progress_bar.set_length(total as u64);
            progress_bar.set_position(done as u64);
        })
        .await;

    match result {
        Ok(summary) => {
            progress_bar.finish_with_message("Rebuild complete!");
            print_summary(&summary, json)
        }
        Err(e) => {
            progress_bar.abandon();
            Err(e.into())
        }
    }
}

// ==============================================================================
// Output
// ==============================================================================

fn print_report(report: &KpiReport) {
    println!(
        "Provider {} | FY {} | {:?}",
        report.provider_id, report.fiscal_year, report.capability
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Level", "KPI", "Value", "Status", "Source"]);
    for value in &report.values {
        let indent = "  ".repeat(usize::from(value.level.number().saturating_sub(1)));
        table.add_row(vec![
            value.level.to_string(),
            format!("{indent}{}", value.kpi_key),
            value
                .value
                .map(|v| v.round_dp(4).to_string())
                .unwrap_or_else(|| "-".to_string()),
            status_label(&value.status),
            value
                .source
                .as_ref()
                .map(|s| format!("{s:?}"))
                .unwrap_or_default(),
        ]);
    }
    println!("{table}");

    for note in &report.diagnostics {
        println!("  ! {note}");
    }
}

fn status_label(status: &KpiStatus) -> String {
    match status {
        KpiStatus::Computed => "computed".to_string(),
        KpiStatus::MissingInput { coordinate } => format!("missing {coordinate}"),
        KpiStatus::MissingPrecomputed => "missing precomputed".to_string(),
        KpiStatus::UndefinedRatio => "undefined".to_string(),
        KpiStatus::Unsupported => "unsupported".to_string(),
    }
}

fn print_benchmarks(view: &BenchmarkView) {
    let group = view
        .peer_group_key
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "unclassified".to_string());
    println!(
        "Peer group {group} | FY {} | snapshot v{}",
        view.fiscal_year, view.snapshot_version
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "KPI", "Peers", "Min", "P25", "Median", "P75", "Max", "Mean",
    ]);
    for (kpi_key, record) in &view.records {
        let row = match record {
            Some(r) => vec![
                kpi_key.to_string(),
                r.provider_count.to_string(),
                r.min.round_dp(4).to_string(),
                r.p25.round_dp(4).to_string(),
                r.median.round_dp(4).to_string(),
                r.p75.round_dp(4).to_string(),
                r.max.round_dp(4).to_string(),
                r.mean.round_dp(4).to_string(),
            ],
            None => vec![kpi_key.to_string(), "insufficient peers".to_string()],
        };
        table.add_row(row);
    }
    println!("{table}");
}

fn print_ranking(ranked: &[RankingResult]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "KPI", "Priority", "Trend", "Percentile", "Gap"]);
    for (position, result) in ranked.iter().enumerate() {
        table.add_row(vec![
            (position + 1).to_string(),
            result.kpi_key.to_string(),
            result.dynamic_priority.round_dp(4).to_string(),
            format!("{:?}", result.trend),
            result
                .percentile_rank
                .map(|p| p.round_dp(1).to_string())
                .unwrap_or_else(|| "-".to_string()),
            result
                .performance_gap
                .map(|g| g.round_dp(4).to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    println!("{table}");
}

fn print_summary(summary: &RebuildSummary, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!(
            "FY {}: snapshot v{} published with {} records from {} providers{}",
            summary.fiscal_year,
            summary.version,
            summary.records,
            summary.providers,
            if summary.archived { " (archived)" } else { "" }
        );
    }
    Ok(())
}
