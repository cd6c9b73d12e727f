//! CLI command implementations.

pub mod cart;
pub mod config;
pub mod orders;
pub mod voucher;

use clap::{Args, Subcommand};

/// Arguments for the cart command.
#[derive(Args)]
pub struct CartArgs {
    #[command(subcommand)]
    pub command: Option<CartCommand>,
}

#[derive(Subcommand)]
pub enum CartCommand {
    /// Show the cart (default).
    Show,
    /// Add a product.
    Add {
        /// Product ID.
        id: String,
        /// Product name.
        name: String,
        /// Unit price in major units, e.g. 1.99.
        price: f64,
        /// Quantity.
        #[arg(short, long, default_value = "1")]
        qty: i64,
        /// Color variant.
        #[arg(long)]
        color: Option<String>,
        /// Size variant.
        #[arg(long)]
        size: Option<String>,
        /// Image URL.
        #[arg(long)]
        image: Option<String>,
    },
    /// Remove every line for a product.
    Remove {
        /// Product ID.
        id: String,
    },
    /// Set the quantity of a product.
    Update {
        /// Product ID.
        id: String,
        /// New quantity.
        qty: i64,
    },
    /// Empty the cart.
    Clear {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the voucher command.
#[derive(Args)]
pub struct VoucherArgs {
    #[command(subcommand)]
    pub command: VoucherCommand,
}

#[derive(Subcommand)]
pub enum VoucherCommand {
    /// Price a voucher against selected cart items.
    Apply {
        /// Voucher code.
        code: String,
        /// Product IDs to apply to (default: the whole cart).
        #[arg(short, long, num_args = 1..)]
        select: Vec<String>,
        /// Let the backend price the voucher against its cart.
        #[arg(long)]
        remote: bool,
    },
    /// List the available vouchers.
    List,
}

/// Arguments for the orders command.
#[derive(Args)]
pub struct OrdersArgs {
    #[command(subcommand)]
    pub command: Option<OrdersCommand>,
}

#[derive(Subcommand)]
pub enum OrdersCommand {
    /// List orders (default).
    List {
        /// Show only the last N orders.
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Seller dashboard summary.
    Stats,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}
