//! dashcache - shared caches behind a terminal dashboard's widgets.
//!
//! Widgets refresh on a timer, each from its own task. Two things are
//! expensive enough to share between refreshes:
//!
//! - resolving a Jira username to an account id (a network round-trip),
//!   kept in an `ExpiringCache` for a fixed TTL;
//! - building an authenticated Log Analytics client per subscription,
//!   kept in a `LazyPool` for the life of the process.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `cache` - ExpiringCache, LazyPool, sweeper
//! - `jira` - Username resolution and JQL composition
//! - `azure` - Per-subscription logs clients and queries
//! - `error` - Error types

mod azure;
mod cache;
mod config;
mod error;
mod jira;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use azure::LogsClients;
use cache::{CacheConfig, ExpiringCache, spawn_sweeper};
use config::Config;
use jira::{AccountIds, HttpConverter, JqlConverter, search_jql};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dashcache=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting dashcache...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");
    info!("Refresh interval: {:?}", config.refresh_interval);

    let cache_config = CacheConfig::account_ids().sweep_every(config.sweep_interval);
    let account_cache = Arc::new(ExpiringCache::new("account_ids"));
    let sweeper = cache_config
        .sweep_interval
        .map(|every| spawn_sweeper(&account_cache, every));

    let converter = HttpConverter::new(
        &config.jira.domain,
        config.jira.auth.clone(),
        config.jira.verify_ssl,
    )?;
    let accounts = AccountIds::new(converter, Arc::clone(&account_cache), &cache_config);
    let logs_clients = LogsClients::new(
        config.azure_credential.clone(),
        config.azure_endpoints.clone(),
    );

    if config.jira.usernames.is_empty() {
        info!("No Jira usernames configured (JIRA_USERNAMES is empty)");
    }

    let mut ticker = tokio::time::interval(config.refresh_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => refresh(&config, &accounts, &logs_clients).await,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    Ok(())
}

/// One refresh cycle. Failures are logged and retried on the next tick.
async fn refresh<T: JqlConverter>(
    config: &Config,
    accounts: &AccountIds<T>,
    logs_clients: &LogsClients,
) {
    let searches = config.jira.usernames.iter().map(|username| async move {
        let jql = search_jql(accounts, username, &config.jira.projects, &config.jira.jql).await;
        (username, jql)
    });

    for (username, jql) in futures::future::join_all(searches).await {
        match jql {
            Ok(jql) => info!(%username, %jql, "issue search ready"),
            Err(e) => warn!(%username, error = %e, "issue search skipped"),
        }
    }

    if let Some(target) = &config.azure_target {
        match logs_clients.run_query(target).await {
            Ok(table) => info!(
                subscription = %target.subscription_id,
                workspace = %target.workspace_id,
                columns = table.header.len(),
                rows = table.rows.len(),
                clients = logs_clients.len(),
                "logs query complete"
            ),
            Err(e) => warn!(
                subscription = %target.subscription_id,
                error = %e,
                "logs query failed"
            ),
        }
    }
}
