//! Snipvault Catalog - Search and Rating Core
//!
//! Keyword search with filters and pagination over a snippet catalogue, a
//! TTL cache in front of it, and per-user ratings whose aggregate stays
//! consistent on the item. Transports (HTTP routes, auth) sit outside this
//! crate and call [`CatalogService`].
//!
//! ```no_run
//! # async fn demo() -> snipvault_core::CatalogResult<()> {
//! use snipvault_catalog::{CatalogConfig, CatalogService};
//! use snipvault_core::{Caller, SearchRequest};
//!
//! let service = CatalogService::in_memory(CatalogConfig::from_env()?)?;
//! let page = service
//!     .search_items(SearchRequest::new().keyword("sort").language("rust"), Caller::Anonymous)
//!     .await?;
//! println!("{} matches", page.total);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod deadline;
pub mod error;
pub mod favorites;
pub mod fixtures;
pub mod planner;
pub mod rating;
pub mod service;
pub mod telemetry;

pub use config::CatalogConfig;
pub use deadline::{with_deadline, Backends};
pub use error::{ErrorBody, ErrorCode};
pub use favorites::FavoriteService;
pub use fixtures::seed_catalog;
pub use planner::{QueryPlan, QueryPlanner, SearchStrategy};
pub use rating::{invalidate_with_retry, InvalidationPolicy, RatingCoordinator};
pub use service::{parse_item_id, parse_user_id, CatalogService};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig, TelemetryError};
