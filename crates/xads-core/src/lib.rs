//! XADS Core - Core abstractions for the transactional XA data source
//!
//! This crate provides the types and traits the other XADS crates depend on:
//!
//! - `XaDataSource` - Factory for physical XA connections (supplied by a driver)
//! - `XaConnection` - A physical connection able to join two-phase commit
//! - `EnlistmentAdapter` - Transaction manager hook that wraps physical connections
//! - `EnlistedConnection` - The transaction-aware handle handed to callers
//! - `Credential` - Principal/secret pair used to select a physical connection

mod connection;
mod credential;
mod error;

pub use connection::*;
pub use credential::*;
pub use error::*;
