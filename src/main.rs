use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "logtriage",
    about = "Unsupervised anomaly triage for Windows authentication logs",
    version,
    long_about = None
)]
struct Cli {
    /// Analyzer config file (TOML)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Expected fraction of anomalous events
    #[arg(long, global = true)]
    contamination: Option<f64>,

    /// Number of isolation trees in the ensemble
    #[arg(long, global = true)]
    trees: Option<usize>,

    /// Seed for randomized tree construction
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (HTTP API)
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0:8000")]
        bind: String,
    },

    /// Analyze a log file once and print the report
    Analyze {
        /// Path to a JSON log file
        #[arg(long)]
        file: String,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config.as_deref() {
        Some(path) => logtriage::config::AnalyzerConfig::load(path),
        None => logtriage::config::AnalyzerConfig::default(),
    };
    if let Some(contamination) = cli.contamination {
        config.contamination = contamination;
    }
    if let Some(trees) = cli.trees {
        config.tree_count = trees;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    match cli.command {
        Commands::Serve { bind } => {
            tracing::info!(%bind, "Starting logtriage daemon");
            logtriage::serve(&bind, config).await?;
        }
        Commands::Analyze { file, json } => {
            tracing::info!(%file, "Running one-shot analysis");
            let raw = std::fs::read(&file)?;
            let report = logtriage::pipeline::analyze(&raw, &config)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\nlogtriage Analysis Report");
                println!("Total events: {}", report.stats.total_events);
                println!("Anomalies:    {}", report.stats.anomaly_count);
                println!("\nMost common event ids:");
                for (event_id, count) in &report.stats.common_event_types {
                    println!("  {:<8} x{}", event_id, count);
                }
                if !report.anomalies.is_empty() {
                    println!(
                        "\n{:<8} | {:<20} | {:<15} | {:<10} | Score",
                        "EventID", "User", "SourceIP", "LogonType"
                    );
                    println!(
                        "{:-<8}-|-{:-<20}-|-{:-<15}-|-{:-<10}-|-{:-<8}",
                        "", "", "", "", ""
                    );
                    for anomaly in &report.anomalies {
                        println!(
                            "{:<8} | {:<20} | {:<15} | {:<10} | {:.4}",
                            anomaly.event.event_id,
                            anomaly.event.user,
                            anomaly.event.source_ip,
                            anomaly.event.logon_type,
                            anomaly.anomaly_score
                        );
                    }
                }
                println!();
            }
        }
    }

    Ok(())
}
