use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Context, Result};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use mule_analysis::pipeline::{analyze_reader, DetectionOutcome};
use mule_analysis::report::{build_report, Report};
use mule_analysis::DetectionConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mule-detect")]
#[command(about = "Money-muling fraud-ring detection over transaction ledgers")]
#[command(version)]
struct Cli {
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect fraud rings and print rings, accounts and summary.
    Analyze(AnalyzeArgs),
    /// Write the canonical JSON report document to a file.
    Report(ReportArgs),
    /// Print the account graph view (nodes + edges) as JSON.
    Graph(GraphArgs),
}

/// Detection tuning shared by every subcommand.
///
/// Flags override values loaded from `--config`.
#[derive(Args, Debug, Clone)]
struct DetectionArgs {
    /// JSON file with `DetectionConfig` overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run detectors concurrently.
    #[arg(long)]
    parallel: bool,

    #[arg(long)]
    max_shell_sources: Option<usize>,

    #[arg(long)]
    smurf_window_hours: Option<i64>,

    #[arg(long)]
    smurf_threshold: Option<usize>,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Ledger CSV with transaction_id, sender_id, receiver_id, amount, timestamp.
    #[arg(long)]
    csv: PathBuf,

    /// Output format: table (default) or json.
    #[arg(long, default_value = "table")]
    output: String,

    /// Suspicious accounts shown in table output.
    #[arg(long, default_value_t = 20)]
    top: usize,

    #[command(flatten)]
    detection: DetectionArgs,
}

#[derive(Args, Debug)]
struct ReportArgs {
    #[arg(long)]
    csv: PathBuf,

    /// Destination for the report JSON.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    detection: DetectionArgs,
}

#[derive(Args, Debug)]
struct GraphArgs {
    #[arg(long)]
    csv: PathBuf,

    #[command(flatten)]
    detection: DetectionArgs,
}

/// JSON shape of `analyze --output json`.
#[derive(Serialize)]
struct AnalyzeJson<'a> {
    #[serde(flatten)]
    outcome: &'a DetectionOutcome,
    report_json: Report,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    match cli.command {
        Commands::Analyze(args) => handle_analyze(args).await,
        Commands::Report(args) => handle_report(args).await,
        Commands::Graph(args) => handle_graph(args).await,
    }
}

fn init_tracing(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::WARN
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .wrap_err("failed to initialize tracing filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

impl DetectionArgs {
    fn resolve(&self) -> Result<DetectionConfig> {
        let mut config = match &self.config {
            Some(path) => DetectionConfig::from_json_file(path)?,
            None => DetectionConfig::default(),
        };

        if self.parallel {
            config.parallel = true;
        }
        if let Some(sources) = self.max_shell_sources {
            config.shell_max_sources = sources;
        }
        if let Some(hours) = self.smurf_window_hours {
            config.smurf_window_hours = hours;
        }
        if let Some(threshold) = self.smurf_threshold {
            config.smurf_threshold = threshold;
        }

        config
            .validate()
            .wrap_err("invalid detection flags")?;
        Ok(config)
    }
}

/// Read the ledger and run detection off the async runtime.
///
/// Returns the outcome and wall-clock seconds spent on read + detection.
async fn run_pipeline(csv: &Path, config: DetectionConfig) -> Result<(DetectionOutcome, f64)> {
    let started = Instant::now();

    let bytes = tokio::fs::read(csv)
        .await
        .wrap_err_with(|| format!("failed to read {}", csv.display()))?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .wrap_err("failed to create progress style")?,
    );
    pb.set_message("detecting fraud rings");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let joined =
        tokio::task::spawn_blocking(move || analyze_reader(bytes.as_slice(), &config)).await;
    pb.finish_and_clear();

    let outcome = joined.wrap_err("detection task failed to complete")??;
    Ok((outcome, started.elapsed().as_secs_f64()))
}

async fn handle_analyze(args: AnalyzeArgs) -> Result<()> {
    let config = args.detection.resolve()?;
    let (outcome, elapsed) = run_pipeline(&args.csv, config).await?;
    let report = build_report(
        &outcome.suspicious_accounts,
        &outcome.fraud_rings,
        &outcome.summary,
        elapsed,
    );

    match args.output.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&AnalyzeJson {
                outcome: &outcome,
                report_json: report,
            })
            .wrap_err("failed to serialize results to JSON")?;
            println!("{json}");
        }
        "table" => print_tables(&outcome, args.top, report.summary.processing_time_seconds),
        other => {
            return Err(eyre!(
                "unknown output format '{}'; use 'table' or 'json'",
                other
            ))
        }
    }

    info!(
        csv = %args.csv.display(),
        rings = outcome.summary.fraud_rings_detected,
        flagged = outcome.summary.suspicious_accounts_flagged,
        "analyze command completed"
    );
    Ok(())
}

async fn handle_report(args: ReportArgs) -> Result<()> {
    let config = args.detection.resolve()?;
    let (outcome, elapsed) = run_pipeline(&args.csv, config).await?;
    let report = build_report(
        &outcome.suspicious_accounts,
        &outcome.fraud_rings,
        &outcome.summary,
        elapsed,
    );

    let json = report.to_json_pretty()?;
    tokio::fs::write(&args.out, json)
        .await
        .wrap_err_with(|| format!("failed to write report to {}", args.out.display()))?;

    info!(
        out = %args.out.display(),
        rings = report.summary.fraud_rings_detected,
        processing_time_seconds = report.summary.processing_time_seconds,
        "report written"
    );
    Ok(())
}

async fn handle_graph(args: GraphArgs) -> Result<()> {
    let config = args.detection.resolve()?;
    let (outcome, _) = run_pipeline(&args.csv, config).await?;

    let json = serde_json::to_string_pretty(&outcome.graph)
        .wrap_err("failed to serialize graph view")?;
    println!("{json}");
    Ok(())
}

fn print_tables(outcome: &DetectionOutcome, top: usize, processing_time_seconds: f64) {
    let mut rings = Table::new();
    rings.load_preset(UTF8_BORDERS_ONLY);
    rings.set_header(vec!["Ring ID", "Pattern", "Members", "Risk", "Accounts"]);
    for ring in &outcome.fraud_rings {
        rings.add_row(vec![
            ring.ring_id.clone(),
            ring.pattern_type.to_string(),
            ring.member_accounts.len().to_string(),
            format!("{:.2}", ring.risk_score),
            truncate_members(&ring.member_accounts),
        ]);
    }
    println!("\n{rings}\n");

    let mut accounts = Table::new();
    accounts.load_preset(UTF8_BORDERS_ONLY);
    accounts.set_header(vec!["Account", "Score", "Patterns", "Ring"]);
    for account in outcome.suspicious_accounts.iter().take(top) {
        let patterns: Vec<&str> = account.detected_patterns.iter().map(|p| p.as_str()).collect();
        accounts.add_row(vec![
            account.account_id.clone(),
            format!("{:.2}", account.suspicion_score),
            patterns.join(", "),
            account.ring_id.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    println!("{accounts}\n");

    let mut summary = Table::new();
    summary.load_preset(UTF8_BORDERS_ONLY);
    summary.set_header(vec!["Metric", "Value"]);
    summary.add_row(vec![
        "Accounts analyzed".to_string(),
        outcome.summary.total_accounts_analyzed.to_string(),
    ]);
    summary.add_row(vec![
        "Suspicious accounts".to_string(),
        outcome.summary.suspicious_accounts_flagged.to_string(),
    ]);
    summary.add_row(vec![
        "Fraud rings".to_string(),
        outcome.summary.fraud_rings_detected.to_string(),
    ]);
    summary.add_row(vec![
        "Processing time (s)".to_string(),
        format!("{processing_time_seconds:.2}"),
    ]);
    println!("{summary}\n");
}

/// Shorten long member lists for table display.
fn truncate_members(members: &[String]) -> String {
    const SHOWN: usize = 6;
    if members.len() > SHOWN {
        format!(
            "{} … (+{})",
            members[..SHOWN].join(", "),
            members.len() - SHOWN
        )
    } else {
        members.join(", ")
    }
}
