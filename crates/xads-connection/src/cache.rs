//! Credential-keyed reuse cache for XA connections
//!
//! With pooling enabled the cache keeps one physical connection per distinct
//! credential and hands out the same enlisted handle on every acquisition.
//! Closing a handle leaves the physical connection open for the next caller.
//! With pooling disabled every acquisition opens a fresh physical connection
//! and closing the handle releases it.
//!
//! This is a reuse cache, not a pool manager: there is no idle eviction, no
//! background validation and no limit on the number of credentials.
//!
//! # Example
//!
//! ```ignore
//! use xads_connection::cache::{PoolConfig, XaConnectionCache};
//!
//! let config = PoolConfig::new(true).with_connection_manager("orders-db");
//! let cache = XaConnectionCache::new(config, xa_data_source, enlistment_adapter);
//! let conn = cache.acquire(&Credential::new("app", "secret")).await?;
//! // Use connection...
//! conn.close().await?; // physical connection stays cached
//! ```

mod cache;
mod config;
mod managed;
mod stats;

#[cfg(test)]
mod tests;

pub use cache::XaConnectionCache;
pub use config::PoolConfig;
pub use managed::{ManagedConnection, ReleaseMode};
pub use stats::CacheStats;
