//! # Tradeguard Configuration Checker
//!
//! Validates cache and circuit breaker configuration and probes the configured
//! backing store before a service is deployed.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use std::process;
use tracing::error;
use tradeguard_core::cache::{connect_graceful, CacheCategory};
use tradeguard_core::config::TradeguardConfig;
use tradeguard_core::logging::init_structured_logging;

#[derive(Parser)]
#[command(name = "tradeguard-check")]
#[command(about = "Validate tradeguard cache and circuit breaker configuration")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment preset (development, test, production)
    #[arg(short, long)]
    environment: Option<String>,

    /// TOML configuration file layered over the preset
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and validate configuration (default)
    Validate,

    /// Connect to the configured backing store and run a health check
    Probe {
        /// Exit non-zero if the store degraded to the in-process fallback (always in production)
        #[arg(long)]
        strict: bool,
    },

    /// Print the effective configuration as JSON
    Show,
}

fn main() {
    let cli = Cli::parse();

    // An explicit RUST_LOG wins over -v flags
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", verbosity_filter(cli.verbose));
    }
    init_structured_logging();

    let result = match &cli.command {
        Some(Commands::Validate) | None => validate(&cli),
        Some(Commands::Probe { strict }) => probe(&cli, *strict),
        Some(Commands::Show) => show(&cli),
    };

    if let Err(e) = result {
        error!("Check failed: {:#}", e);
        eprintln!("❌ {:#}", e);
        process::exit(1);
    }
}

fn verbosity_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn load(cli: &Cli) -> Result<TradeguardConfig> {
    let environment = cli
        .environment
        .clone()
        .unwrap_or_else(tradeguard_core::config::detect_environment);

    TradeguardConfig::load_with_env(cli.config.as_deref(), &environment)
        .with_context(|| format!("loading configuration for environment '{environment}'"))
}

fn validate(cli: &Cli) -> Result<()> {
    let config = load(cli)?;
    println!("✅ Configuration valid (environment: {})", config.environment);

    let cache = &config.cache;
    println!("\nCache:");
    println!("  backend: {}", cache.backend);
    println!(
        "  L1: {} entries, TTL cap {}s, sweep every {}s",
        cache.l1_max_size, cache.l1_max_ttl_seconds, cache.cleanup_interval_seconds
    );

    let overrides = cache.parsed_ttl_overrides()?;
    println!("  TTLs:");
    for category in CacheCategory::ALL {
        let ttl = overrides
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_ttl());
        let l1 = if category.skips_l1() { " (L2 only)" } else { "" };
        println!("    {:<10} {:>6}s{}", category.as_str(), ttl.as_secs(), l1);
    }

    println!("\nCircuit breakers:");
    let mut names: Vec<_> = config.circuit_breakers.component_configs.keys().collect();
    names.sort();
    for name in names {
        let c = config.circuit_breakers.config_for_component(name);
        println!(
            "  {:<14} open after {} failures, recover after {}s, {} probe(s), close after {} success(es)",
            name,
            c.failure_threshold,
            c.recovery_timeout_seconds,
            c.half_open_max_calls,
            c.success_threshold
        );
    }

    Ok(())
}

fn probe(cli: &Cli, strict: bool) -> Result<()> {
    let config = load(cli)?;
    let store = connect_graceful(&config.cache);

    println!(
        "Configured backend: {} | active store: {}",
        config.cache.backend,
        store.provider_name()
    );

    let healthy = store
        .health_check()
        .with_context(|| format!("health check against {}", store.provider_name()))?;
    if !healthy {
        bail!("backing store {} reported unhealthy", store.provider_name());
    }

    let wants_distributed = matches!(config.cache.backend.as_str(), "redis" | "dragonfly");
    if wants_distributed && !store.is_distributed() {
        println!("⚠️  Redis unreachable, service would run on the in-process fallback store");
        if strict || config.is_production_environment() {
            bail!("backing store degraded to {}", store.provider_name());
        }
    } else {
        println!("✅ Backing store reachable");
    }

    Ok(())
}

fn show(cli: &Cli) -> Result<()> {
    let config = load(cli)?;
    let mut value = serde_json::to_value(&config)?;

    // Never print credentials
    if let Some(url) = value.pointer_mut("/cache/redis/url") {
        if let Some(raw) = url.as_str() {
            *url = serde_json::Value::String(redact(raw));
        }
    }

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}***{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}
