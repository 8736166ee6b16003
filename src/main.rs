// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use ecominsight::{
    build_prediction_report, build_summary_report, InsightCache, PredictionClient,
    PredictionReport, PredictionRequest, Settings,
};

#[derive(Parser)]
#[command(name = "ecominsight")]
#[command(about = "Customer insights dashboard with churn prediction", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    /// Write logs to this file (the dashboard owns the terminal)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal dashboard (default)
    Dashboard,
    /// Print the key metrics and segment breakdown
    Summary,
    /// Submit one customer profile to the churn service
    Predict {
        #[arg(long, default_value_t = 5)]
        frequency: u32,
        #[arg(long, default_value_t = 250.0)]
        monetary: f64,
        #[arg(long, default_value_t = 120)]
        tenure: u32,
        #[arg(long, default_value_t = 0.05)]
        return_rate: f64,
        #[arg(long, default_value_t = 0.10)]
        avg_discount: f64,
        #[arg(long, default_value_t = 2)]
        avg_quantity: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Commands::Dashboard));
    init_logging(cli.log_file.as_ref(), interactive)?;

    match cli.command {
        None | Some(Commands::Dashboard) => run_dashboard(&cli.settings),
        Some(Commands::Summary) => run_summary(&cli.settings),
        Some(Commands::Predict {
            frequency,
            monetary,
            tenure,
            return_rate,
            avg_discount,
            avg_quantity,
        }) => {
            let request = PredictionRequest {
                frequency,
                monetary,
                tenure,
                return_rate,
                avg_discount,
                avg_quantity,
            };
            run_predict(&cli.settings, request)
        }
    }
}

/// Logs go to stderr for one-shot commands; the dashboard only logs to a file
fn init_logging(log_file: Option<&PathBuf>, interactive: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ecominsight=info,warn"));

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None if interactive => {}
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

fn run_summary(settings: &Settings) -> Result<()> {
    let cache = InsightCache::new(&settings.data_path);
    let table = match cache.get() {
        Ok(table) => table,
        Err(err) => {
            eprintln!("⚠️  {}", err);
            std::process::exit(1);
        }
    };

    print!("{}", build_summary_report(&table));
    Ok(())
}

fn run_predict(settings: &Settings, request: PredictionRequest) -> Result<()> {
    request.validate()?;

    let runtime = Runtime::new().context("Failed to start async runtime")?;
    let client = PredictionClient::new(settings)?;

    match runtime.block_on(client.predict(&request)) {
        Ok(response) => {
            let report = PredictionReport::new(&request, &response);
            print!("{}", build_prediction_report(&report));
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "tui")]
fn run_dashboard(settings: &Settings) -> Result<()> {
    println!("📊 Loading customer insights...\n");

    let cache = InsightCache::new(&settings.data_path);
    let table = match cache.get() {
        Ok(table) => table,
        Err(err) => {
            // Halt before the terminal is taken over so the message stays visible
            eprintln!("⚠️  {}", err);
            std::process::exit(1);
        }
    };

    println!("✓ Loaded {} customers\n", table.len());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let client = PredictionClient::new(settings)?;

    let mut app = ui::App::new(table);
    ui::run_ui(&mut app, |request| runtime.block_on(client.predict(request)))?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_dashboard(_settings: &Settings) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the web UI: cargo run --bin ecominsight-server --features server");
    std::process::exit(1);
}
