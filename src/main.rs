//! Vault Namespace Stress Tool
//!
//! Creates `n` namespaces under root (depth 2), or `n` parent namespaces
//! each with child namespaces (depth 3), with KV v2 mounts in every
//! namespace, fanned out across a bounded worker pool.
//!
//! Exit codes: 2 for missing or invalid configuration, 1 when the HTTP
//! client cannot be constructed, 0 otherwise - a run with any number of
//! per-request failures still exits 0, since failures are logged and
//! counted, not escalated.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vault_ns_stress::{
    orchestrator, Depth, Error, RunConfig, VaultClient, VaultClientConfig,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Create namespaces and KV v2 secret engines in Vault, in parallel
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of namespaces (depth 2) or parent namespaces (depth 3)
    #[arg(short = 'n', long = "namespaces")]
    namespaces: i64,

    /// Number of KV v2 secret engines per namespace
    #[arg(short = 'x', long = "mounts")]
    mounts: i64,

    /// Namespace tree depth: 2 (root/ns) or 3 (root/parent/child)
    #[arg(long, default_value_t = 2)]
    depth: u8,

    /// For depth 3: number of child namespaces under each parent
    #[arg(long, default_value_t = 1)]
    children: i64,

    /// Prefix for namespace names (ns -> ns-001, ns-002, ...)
    #[arg(long, default_value = "ns")]
    ns_prefix: String,

    /// Prefix for mount names (kv -> kv-001, kv-002, ...)
    #[arg(long, default_value = "kv")]
    mount_prefix: String,

    /// Starting index for all naming tiers
    #[arg(long, default_value_t = 1)]
    start_index: u64,

    /// Vault address, e.g. https://vault.example.com:8200
    #[arg(long, env = "VAULT_ADDR")]
    addr: Option<String>,

    /// Vault token
    #[arg(long, env = "VAULT_TOKEN")]
    token: Option<String>,

    /// Skip TLS certificate validation
    #[arg(long)]
    insecure: bool,

    /// Number of parallel workers
    #[arg(long, default_value_t = 20)]
    workers: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(&args);

    let (address, token) = match required_credentials(&args) {
        Ok(pair) => pair,
        Err(err) => return fatal(err),
    };

    let depth = match Depth::from_level(args.depth) {
        Some(depth) => depth,
        None => {
            return fatal(Error::Configuration(format!(
                "depth must be 2 or 3, got {}",
                args.depth
            )))
        }
    };

    let config = RunConfig {
        depth,
        namespaces: args.namespaces,
        mounts_per_namespace: args.mounts,
        children_per_parent: args.children,
        ns_prefix: args.ns_prefix.clone(),
        mount_prefix: args.mount_prefix.clone(),
        start_index: args.start_index,
        workers: args.workers,
    };
    if let Err(err) = config.validate() {
        return fatal(err);
    }

    info!("target Vault: {address}");
    info!("version: {}", vault_ns_stress::VERSION);
    match depth {
        Depth::Flat => {
            info!(
                "plan: {} namespaces under root, {} KV v2 mounts each, {} workers",
                args.namespaces, args.mounts, args.workers
            );
        }
        Depth::Hierarchical => {
            info!(
                "plan: {} parent namespaces, {} children each, {} KV v2 mounts per \
                 namespace, {} workers ({} leaf namespaces total)",
                args.namespaces,
                args.children,
                args.mounts,
                args.workers,
                args.namespaces * args.children
            );
        }
    }

    let client = match VaultClient::new(VaultClientConfig {
        address,
        token,
        insecure: args.insecure,
    }) {
        Ok(client) => Arc::new(client),
        Err(err) => return fatal(err),
    };

    match orchestrator::run(client, config).await {
        Ok(_summary) => ExitCode::SUCCESS,
        Err(err) => fatal(err),
    }
}

/// Address and token come from flags or the standard Vault env vars; both
/// are required before any work starts
fn required_credentials(args: &Args) -> Result<(String, String), Error> {
    let address = args
        .addr
        .clone()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| Error::Configuration("--addr or VAULT_ADDR is required".into()))?;
    let token = args
        .token
        .clone()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Configuration("--token or VAULT_TOKEN is required".into()))?;
    Ok((address, token))
}

fn fatal(err: Error) -> ExitCode {
    eprintln!("Error: {err}");
    ExitCode::from(err.exit_code() as u8)
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}
