//! Theme cart CLI - drive the cart layer against a live storefront.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart as the drawer renders it
//! theme-cart show
//!
//! # Add a variant, then show the drawer
//! theme-cart add 39897499729985 -q 2
//!
//! # Change, step or remove a line
//! theme-cart set 39897499729985:abc 3
//! theme-cart inc 39897499729985:abc
//! theme-cart remove 39897499729985:abc
//!
//! # Format cents with a money pattern
//! theme-cart format 150000 --pattern '{{amount_with_comma_separator}} EUR'
//! ```
//!
//! # Environment Variables
//!
//! See `theme_cart::config` for the full list; `THEME_STORE_URL` is required
//! for every command except `format`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use theme_cart::ThemeConfig;

mod commands;

#[derive(Parser)]
#[command(name = "theme-cart")]
#[command(author, version, about = "Theme cart tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the cart and render the drawer
    Show {
        /// Print the rendered drawer HTML instead of a summary
        #[arg(long)]
        html: bool,
    },
    /// Add a variant to the cart
    Add {
        /// Variant id
        variant: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Go straight to checkout (buy now)
        #[arg(long)]
        buy: bool,
    },
    /// Set a line's quantity (0 removes it)
    Set {
        /// Line key
        key: String,
        /// New quantity
        quantity: String,
    },
    /// Increment a line by one
    Inc {
        /// Line key
        key: String,
    },
    /// Decrement a line by one
    Dec {
        /// Line key
        key: String,
    },
    /// Remove a line
    Remove {
        /// Line key
        key: String,
    },
    /// Format an amount in cents
    Format {
        /// Amount in cents
        #[arg(allow_hyphen_values = true)]
        cents: i64,

        /// Money pattern (default: THEME_MONEY_FORMAT or `${{amount}}`)
        #[arg(short, long)]
        pattern: Option<String>,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(dsn: Option<&str>) -> Option<sentry::ClientInitGuard> {
    let dsn = dsn?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // `format` works offline, so a missing store URL is only fatal later.
    let config = ThemeConfig::from_env();

    let _sentry_guard = init_sentry(
        config
            .as_ref()
            .ok()
            .and_then(|c| c.sentry_dsn.as_deref()),
    );

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "theme_cart=info,theme_cart_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(
    cli: Cli,
    config: Result<ThemeConfig, theme_cart::config::ConfigError>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Commands::Format { cents, pattern } = &cli.command {
        commands::money::format(*cents, pattern.as_deref());
        return Ok(());
    }

    let session = commands::cart::Session::new(config?)?;
    match cli.command {
        Commands::Show { html } => session.show(html).await?,
        Commands::Add {
            variant,
            quantity,
            buy,
        } => session.add(&variant, quantity, buy).await?,
        Commands::Set { key, quantity } => session.set(&key, &quantity).await?,
        Commands::Inc { key } => session.step(&key, commands::cart::Step::Increase).await?,
        Commands::Dec { key } => session.step(&key, commands::cart::Step::Decrease).await?,
        Commands::Remove { key } => session.remove(&key).await?,
        Commands::Format { .. } => {}
    }
    Ok(())
}
