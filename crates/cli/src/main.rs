//! Shopfront CLI - Catalog management against the commerce backend.
//!
//! # Usage
//!
//! ```bash
//! # Add a product
//! shopfront product add --name "Teapot" --price 25.00 \
//!     --description "Holds tea" --image https://img.example/teapot.png
//!
//! # List the catalog
//! shopfront product list
//! ```
//!
//! # Commands
//!
//! - `product add` - Create a product
//! - `product list` - List every product in backend order
//!
//! The backend is read from `SHOPFRONT_BACKEND_URL`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use shopfront_core::CurrencyCode;

mod commands;

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(author, version, about = "Shopfront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the product catalog
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// Add a product to the catalog
    Add {
        /// Product name
        #[arg(short, long)]
        name: String,

        /// Unit price (e.g. 19.99)
        #[arg(short, long)]
        price: Decimal,

        /// ISO 4217 currency code
        #[arg(short, long, default_value = "USD")]
        currency: CurrencyCode,

        /// Product description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Image URL
        #[arg(short, long, default_value = "")]
        image: String,

        /// Mark the product as featured
        #[arg(long)]
        featured: bool,
    },
    /// List every product
    List,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Product { action } => match action {
            ProductAction::Add {
                name,
                price,
                currency,
                description,
                image,
                featured,
            } => {
                let product = commands::product::ProductInput {
                    name,
                    price,
                    currency,
                    description,
                    image_url: image,
                    featured,
                };
                commands::product::add(product).await?;
            }
            ProductAction::List => commands::product::list().await?,
        },
    }
    Ok(())
}
