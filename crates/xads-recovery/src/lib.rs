//! XADS Recovery - Transaction manager configuration
//!
//! Turns a `TransactionProperties` snapshot into a resolved
//! `TransactionEnvironment`: node identity, recovery nodes, object store
//! locations, timeouts, recovery periods and JDBC defaults.
//!
//! # Example
//!
//! ```ignore
//! use xads_recovery::{PropertiesInitializer, TransactionEnvironment, TransactionProperties};
//!
//! let properties = TransactionProperties::load("xads.toml")?;
//! let mut environment = TransactionEnvironment::default();
//! PropertiesInitializer::new(&properties).apply(&mut environment)?;
//! ```

mod environment;
mod initializer;
pub mod node_identifier;
mod properties;

pub use environment::{
    CoordinatorEnvironment, CoreEnvironment, DEFAULT_OBJECT_STORE_DIR, JdbcEnvironment,
    JtaEnvironment, ObjectStoreEnvironment, RecoveryEnvironment, StoreKind,
    TransactionEnvironment,
};
pub use initializer::{PropertiesInitializer, apply_configuration};
pub use node_identifier::{IdentifierNormalizer, MAX_NODE_IDENTIFIER_BYTES, ShorteningAlgorithm};
pub use properties::{IsolationLevel, TransactionProperties, TransactionalDriverProperties};
