//! XADS Connection - XA connection acquisition and reuse
//!
//! This crate hands out transaction-enlisted connections, reusing at most one
//! physical XA connection per credential when pooling is enabled.

pub mod cache;
mod data_source;

pub use cache::{CacheStats, ManagedConnection, PoolConfig, ReleaseMode, XaConnectionCache};
pub use data_source::{Capability, TransactionalDataSource, Unwrapped};
