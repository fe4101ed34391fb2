//! Credentials used to select a physical connection from an XA data source

use std::fmt;

use serde::{Deserialize, Serialize};

/// A principal/secret pair
///
/// Both halves are optional. A credential with neither set means "use the
/// data source's default credentials". Equality and hashing are value based,
/// which makes `Credential` usable as a cache key.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    principal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret: Option<String>,
}

impl Credential {
    /// Create a credential from a principal and secret
    pub fn new(principal: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            principal: Some(principal.into()),
            secret: Some(secret.into()),
        }
    }

    /// The "no explicit credentials" value
    pub fn none() -> Self {
        Self::default()
    }

    /// Create a credential where either half may be missing
    pub fn from_parts(principal: Option<String>, secret: Option<String>) -> Self {
        Self { principal, secret }
    }

    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Returns true when neither principal nor secret is set
    pub fn is_empty(&self) -> bool {
        self.principal.is_none() && self.secret.is_none()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("principal", &self.principal)
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.principal {
            Some(principal) => f.write_str(principal),
            None if self.secret.is_some() => f.write_str("<anonymous>"),
            None => f.write_str("<default>"),
        }
    }
}
