//! Seed an in-memory catalogue and run one search against it.
//!
//! Usage: `snipvault-seed [KEYWORD] [LANGUAGE]`
//!
//! Prints the first anonymous result page as JSON. `SNIPVAULT_SEED_COUNT`
//! and `SNIPVAULT_SEED` control how many snippets are generated and from
//! which seed.

use snipvault_catalog::{init_tracing, seed_catalog, CatalogConfig, CatalogService, TelemetryConfig};
use snipvault_core::{Caller, ConfigError, SearchRequest};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn env_number<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: name.to_string(),
            value: raw,
            reason: "expected a non-negative integer".to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    init_tracing(&TelemetryConfig::default())?;

    let config = CatalogConfig::from_env()?;
    let count: usize = env_number("SNIPVAULT_SEED_COUNT", 100)?;
    let seed: u64 = env_number("SNIPVAULT_SEED", 42)?;

    let service = CatalogService::in_memory(config)?;
    seed_catalog(&service, count, seed).await?;

    let mut args = std::env::args().skip(1);
    let mut request = SearchRequest::new();
    if let Some(keyword) = args.next() {
        request = request.keyword(keyword);
    }
    if let Some(language) = args.next() {
        request = request.language(language);
    }

    let page = service.search_items(request, Caller::Anonymous).await?;
    println!("{}", serde_json::to_string_pretty(&page)?);

    let stats = service.cache_stats().await?;
    tracing::info!(hits = stats.hits, misses = stats.misses, "done");
    Ok(())
}
