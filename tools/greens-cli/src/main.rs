//! Greens CLI - command line client for the Global Greens storefront.
//!
//! Commands:
//! - `greens cart` - Show and edit the cart
//! - `greens voucher` - Price a voucher against the cart
//! - `greens orders` - Order history and seller stats
//! - `greens config` - Manage configuration

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use commands::{CartArgs, ConfigArgs, OrdersArgs, VoucherArgs};

/// Greens CLI - Manage a Global Greens cart from the terminal
#[derive(Parser)]
#[command(name = "greens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Use the local in-memory backend instead of the API
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and edit the cart
    Cart(CartArgs),

    /// Apply a voucher to cart items
    Voucher(VoucherArgs),

    /// Order history and seller dashboard
    Orders(OrdersArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Setup output formatting
    let output = output::Output::new(cli.verbose, cli.json);

    let ctx = match context::Context::load(cli.config.as_deref(), cli.offline, output.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Cart(args) => commands::cart::run(args, &ctx).await,
        Commands::Voucher(args) => commands::voucher::run(args, &ctx).await,
        Commands::Orders(args) => commands::orders::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise warnings, or debug for our crates with `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,greens_commerce=debug,greens_auth=debug,greens_client=debug,greens=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
