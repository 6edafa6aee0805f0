//! Cart CLI
//!
//! Drives the cart manager against a JSON file store and prints the
//! resulting cart.
//!
//! # Usage
//!
//! ```bash
//! cartd add --id a --title "T-shirt" --image-url https://img/a.png --price 59.9
//! cartd inc a
//! cartd dec a
//! cartd list
//! CART_STORE_PATH=/tmp/cart.json cartd reset
//! ```
//!
//! # Environment Variables
//!
//! - `CART_ENV`: Environment (test, development, production)
//! - `CART_STORE_KEY`: Snapshot key (default: @GoMarketplace:cart)
//! - `CART_STORE_PATH`: Store file (default: cart-store.json)
//! - `CART_HYDRATION`: replay or overwrite (default: replay)
//! - `CART_PERSIST_POLICY`: log, retry, or propagate (default: log)
//! - `CART_PERSIST_MAX_ATTEMPTS`: Retry attempts (default: 3)
//! - `CART_PERSIST_BACKOFF_MS`: Initial retry backoff (default: 50)

use std::path::PathBuf;
use std::sync::Arc;

use cart_domain::{Mutation, Product};
use cart_store::{FileStore, KeyValueStore};
use cartd::{CartManager, Config};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "cartd", version, about = "Persistent shopping cart")]
struct Cli {
    /// Store file (overrides CART_STORE_PATH)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the cart
    List,
    /// Add one unit of a product
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        image_url: String,
        #[arg(long)]
        price: Decimal,
    },
    /// Add one unit of a product already in the cart
    Inc { id: String },
    /// Remove one unit of a product
    Dec { id: String },
    /// Delete the stored cart snapshot
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays clean JSON
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("cartd=info".parse()?))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(path) = cli.store {
        config.store.path = path;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        store = %config.store.path.display(),
        key = %config.store.key,
        "Cart CLI"
    );

    let store = Arc::new(FileStore::new(config.store.path.clone()));

    if let Command::Reset = cli.command {
        store.remove(&config.store.key).await?;
        info!(key = %config.store.key, "Cart snapshot removed");
        return Ok(());
    }

    let cart = CartManager::start(store, &config);
    cart.hydrated().await;

    let mutation = match cli.command {
        Command::List | Command::Reset => None,
        Command::Add {
            id,
            title,
            image_url,
            price,
        } => Some(cart.add_to_cart(Product::new(id, title, image_url, price)?)),
        Command::Inc { id } => Some(cart.increment(&id)),
        Command::Dec { id } => Some(cart.decrement(&id)),
    };

    if let Some(Mutation::Unchanged) = mutation {
        warn!("Product is not in the cart; nothing changed");
    }

    cart.flush().await;

    println!("{}", serde_json::to_string_pretty(cart.products().as_ref())?);
    Ok(())
}
