use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use fxsnap::cli::parse_date;
use fxsnap::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Import historical rates from the feed into the snapshot store
    Fetch {
        /// Import rates from this date (inclusive), YYYY-MM-DD
        #[arg(long, value_parser = parse_date, default_value = fxsnap::DEFAULT_FROM_DATE)]
        from_date: NaiveDate,
        /// Import rates up to this date (inclusive), YYYY-MM-DD. Default: today
        #[arg(long, value_parser = parse_date)]
        to_date: Option<NaiveDate>,
        /// Override the feed URL
        #[arg(long)]
        url: Option<String>,
    },
    /// Show the rate of a currency on or before a date
    Rate {
        /// Currency code, e.g. USD
        currency: String,
        /// Query date, YYYY-MM-DD. Default: latest available
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Rate source identifier. Default: the configured source
        #[arg(short, long)]
        source: Option<String>,
    },
    /// Show all rates of the snapshot selected for a date
    Rates {
        /// Query date, YYYY-MM-DD. Default: latest available
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Rate source identifier. Default: the configured source
        #[arg(short, long)]
        source: Option<String>,
    },
    /// List supported rate sources
    Sources,
}

impl From<Commands> for fxsnap::AppCommand {
    fn from(cmd: Commands) -> fxsnap::AppCommand {
        match cmd {
            Commands::Fetch {
                from_date,
                to_date,
                url,
            } => fxsnap::AppCommand::Fetch {
                from: from_date,
                to: to_date,
                url,
            },
            Commands::Rate {
                currency,
                date,
                source,
            } => fxsnap::AppCommand::Rate {
                currency,
                date,
                source,
            },
            Commands::Rates { date, source } => fxsnap::AppCommand::Rates { date, source },
            Commands::Sources => fxsnap::AppCommand::Sources,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxsnap::cli::setup::setup(),
        Some(cmd) => fxsnap::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
