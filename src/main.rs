use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use mktdash::cli::board::BoardOptions;
use mktdash::core::SortKey;
use mktdash::core::log::init_logging;

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

#[derive(Args, Clone)]
struct ViewArgs {
    /// Only show pairs whose name or symbol contains this text
    #[arg(short, long)]
    search: Option<String>,

    /// Sort column: name, price, change24h, volume, marketCap, bestBid, bestOffer
    #[arg(long)]
    sort: Option<SortKey>,

    /// Sort ascending instead of descending
    #[arg(long)]
    asc: bool,

    /// Only show favorite pairs
    #[arg(long)]
    only_favorites: bool,

    /// Mark a pair id as favorite (repeatable), e.g. Xbt_Aud
    #[arg(long = "favorite", value_name = "ID")]
    favorites: Vec<String>,

    /// Quote currency for rows that do not name one
    #[arg(long = "base", value_name = "CODE")]
    base_currency: Option<String>,
}

impl From<ViewArgs> for BoardOptions {
    fn from(args: ViewArgs) -> BoardOptions {
        BoardOptions {
            search: args.search,
            sort_by: args.sort,
            ascending: args.asc,
            only_favorites: args.only_favorites,
            favorites: args.favorites,
            base_currency: args.base_currency,
            interval_ms: None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// List the currency catalog
    Currencies,
    /// Fetch the market once and print the board
    Market(ViewArgs),
    /// Keep the board refreshed until interrupted
    Watch {
        #[command(flatten)]
        view: ViewArgs,

        /// Refresh interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config_path = cli.config_path.as_deref();
    let result = match cli.command {
        Some(Commands::Setup) => mktdash::cli::setup::setup(),
        Some(Commands::Currencies) => {
            mktdash::run_command(mktdash::AppCommand::Currencies, config_path).await
        }
        Some(Commands::Market(view)) => {
            mktdash::run_command(mktdash::AppCommand::Market(view.into()), config_path).await
        }
        Some(Commands::Watch { view, interval_ms }) => {
            let options = BoardOptions {
                interval_ms,
                ..BoardOptions::from(view)
            };
            mktdash::run_command(mktdash::AppCommand::Watch(options), config_path).await
        }
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
