use clap::{Parser, Subcommand};
use demand_cli::cli::commands;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "demand")]
#[command(author, version, about = "Demand measurement sync and reporting CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the local cache database
    #[arg(long, global = true, env = "DEMAND_CACHE_PATH")]
    cache: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync commands
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Local cache commands
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Report commands (read the local cache)
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
}

#[derive(Subcommand)]
enum SyncCommands {
    /// Reconcile the local cache for one date
    Run {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Clear the remote store and re-ingest from an upstream export
    Full {
        /// Path to the JSON export of upstream sheets
        source: String,
        /// Clients to ingest (default: all)
        #[arg(short, long)]
        clients: Vec<String>,
        /// Extra attempts for the remote write
        #[arg(long, default_value = "0")]
        retries: u32,
    },
    /// Show last sync time and cache size
    Status,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Drop all cached records and sync metadata
    Clear,
    /// Show cache size and last sync time
    Status,
}

#[derive(Subcommand)]
enum ReportCommands {
    /// Demand by city
    City {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Demand by client
    Client {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Demand by city/area
    Area {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Cities where several clients independently show strong demand
    Hotspots {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
        /// Minimum number of active clients
        #[arg(long, default_value = "2")]
        min_clients: usize,
        /// Per-client demand threshold
        #[arg(long, default_value = "10")]
        min_demand: u64,
    },
    /// City x client activity matrix
    Matrix {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
        /// Clients to include as matrix columns
        #[arg(short, long, required = true)]
        clients: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sync { command } => match command {
            SyncCommands::Run { date } => commands::sync_run(date, cli.cache).await,
            SyncCommands::Full {
                source,
                clients,
                retries,
            } => commands::sync_full(source, clients, retries, cli.cache).await,
            SyncCommands::Status => commands::sync_status(cli.cache).await,
        },
        Commands::Cache { command } => match command {
            CacheCommands::Clear => commands::cache_clear(cli.cache).await,
            CacheCommands::Status => commands::cache_status(cli.cache).await,
        },
        Commands::Report { command } => match command {
            ReportCommands::City { date } => commands::city(date, cli.cache).await,
            ReportCommands::Client { date } => commands::client(date, cli.cache).await,
            ReportCommands::Area { date } => commands::area(date, cli.cache).await,
            ReportCommands::Hotspots {
                date,
                min_clients,
                min_demand,
            } => commands::hotspots(date, min_clients, min_demand, cli.cache).await,
            ReportCommands::Matrix { date, clients } => {
                commands::matrix(date, clients, cli.cache).await
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
