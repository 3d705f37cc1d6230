//! volcurve CLI - Market data and intraday volume curves through a terminal gateway.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use commands::SessionArgs;
use commands::history::HistoryOptions;
use display::{Format, Output};

#[derive(Parser)]
#[command(name = "volcurve")]
#[command(about = "Market data and intraday volume curves through a terminal gateway", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    session: SessionArgs,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv", global = true)]
    format: Format,

    /// Output file path. Defaults to standard output.
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch end-of-day history for one or more securities
    History {
        /// Security identifiers (e.g., "7203 JP Equity")
        #[arg(required = true)]
        securities: Vec<String>,

        /// Fields to fetch, comma separated
        #[arg(long, value_delimiter = ',', default_value = "PX_LAST")]
        fields: Vec<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(short, long)]
        start: String,

        /// End date (YYYY-MM-DD)
        #[arg(short, long)]
        end: String,

        #[command(flatten)]
        options: HistoryOptions,
    },

    /// Fetch raw intraday ticks for one security
    Ticks {
        /// Security identifier
        security: String,

        /// Start datetime (YYYY-MM-DDTHH:MM:SS, local time)
        #[arg(short, long)]
        start: String,

        /// End datetime (YYYY-MM-DDTHH:MM:SS, local time)
        #[arg(short, long)]
        end: String,

        /// Event types, comma separated
        #[arg(long, value_delimiter = ',', default_value = "TRADE")]
        events: Vec<String>,

        /// Request condition codes with each tick
        #[arg(long)]
        condition_codes: bool,
    },

    /// Fetch intraday bars for one security
    Bars {
        /// Security identifier
        security: String,

        /// Start datetime (YYYY-MM-DDTHH:MM:SS, local time)
        #[arg(short, long)]
        start: String,

        /// End datetime (YYYY-MM-DDTHH:MM:SS, local time)
        #[arg(short, long)]
        end: String,

        /// Event type the bars are built from
        #[arg(long, default_value = "TRADE")]
        event: String,

        /// Bar length in minutes
        #[arg(short, long, default_value = "1")]
        interval: u32,

        /// Bar columns to keep, comma separated (default: all)
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },

    /// List the members of an index
    Members {
        /// Index identifier (e.g., "NKY Index")
        index: String,

        /// Suffix appended to each member ticker
        #[arg(long, default_value = " Equity")]
        suffix: String,
    },

    /// Build the intraday volume curve of an index basket
    Curve {
        /// Index identifier (e.g., "NKY Index")
        index: String,

        /// End datetime (YYYY-MM-DDTHH:MM:SS, local time)
        #[arg(short, long)]
        end: String,

        /// Trailing business days before the end date
        #[arg(short, long, default_value = "20")]
        days: u32,

        /// Bar length in minutes
        #[arg(short, long, default_value = "5")]
        interval: u32,

        /// Event type the bars are built from
        #[arg(long, default_value = "TRADE")]
        event: String,

        /// Bar columns to fetch, comma separated; must include VOLUME
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        /// Hour of the start date the window opens at
        #[arg(long, default_value = "9")]
        reference_hour: u32,

        /// Characters kept from each security identifier in column labels
        #[arg(long, default_value = "4")]
        label_width: usize,
    },
}

/// Installs the tracing subscriber. `RUST_LOG` overrides the `-v` level.
fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let output = Output::new(cli.format, cli.output, cli.quiet);

    match command {
        Commands::History {
            securities,
            fields,
            start,
            end,
            options,
        } => {
            commands::history::history(&cli.session, &securities, &fields, &start, &end, &options, &output)
                .await
        }
        Commands::Ticks {
            security,
            start,
            end,
            events,
            condition_codes,
        } => {
            commands::ticks::ticks(&cli.session, &security, &start, &end, &events, condition_codes, &output)
                .await
        }
        Commands::Bars {
            security,
            start,
            end,
            event,
            interval,
            fields,
        } => {
            commands::bars::bars(&cli.session, &security, &start, &end, &event, interval, &fields, &output)
                .await
        }
        Commands::Members { index, suffix } => {
            commands::members::members(&cli.session, &index, &suffix, &output).await
        }
        Commands::Curve {
            index,
            end,
            days,
            interval,
            event,
            fields,
            reference_hour,
            label_width,
        } => {
            let request = commands::curve::CurveArgs {
                index,
                end,
                days,
                interval,
                event,
                fields,
                reference_hour,
                label_width,
            };
            commands::curve::curve(&cli.session, &request, &output).await
        }
    }
}
