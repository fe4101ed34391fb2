//! Node identifier normalization
//!
//! The transaction manager limits node identifiers to 28 bytes of UTF-8.
//! Longer identifiers (host names, pod names) can optionally be replaced by
//! a digest-derived token: the base64 text of a 224-bit hash of the
//! identifier, cut to the byte budget. The same input always yields the same
//! token.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha224, Sha512_224};
use xads_core::{Result, XadsError};

/// Maximum node identifier length accepted by the transaction manager, in bytes
pub const MAX_NODE_IDENTIFIER_BYTES: usize = 28;

/// Digest used to shorten identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShorteningAlgorithm {
    #[default]
    Sha224,
    Sha512_224,
}

impl ShorteningAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            ShorteningAlgorithm::Sha224 => "SHA-224",
            ShorteningAlgorithm::Sha512_224 => "SHA-512/224",
        }
    }

    fn digest(&self, bytes: &[u8]) -> Vec<u8> {
        match self {
            ShorteningAlgorithm::Sha224 => Sha224::digest(bytes).to_vec(),
            ShorteningAlgorithm::Sha512_224 => Sha512_224::digest(bytes).to_vec(),
        }
    }
}

impl FromStr for ShorteningAlgorithm {
    type Err = XadsError;

    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "SHA-224" | "SHA224" => Ok(ShorteningAlgorithm::Sha224),
            "SHA-512/224" | "SHA512/224" | "SHA-512-224" => Ok(ShorteningAlgorithm::Sha512_224),
            _ => Err(XadsError::UnsupportedAlgorithm(format!(
                "{} is not available for node identifier shortening",
                name
            ))),
        }
    }
}

impl fmt::Display for ShorteningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shortens identifiers that exceed a byte budget
///
/// The algorithm name is only resolved when an identifier actually needs
/// shortening, so an unknown name is harmless for identifiers that fit.
#[derive(Debug, Clone)]
pub struct IdentifierNormalizer {
    algorithm: String,
}

impl IdentifierNormalizer {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
        }
    }

    /// Normalize an identifier against a byte budget
    ///
    /// Identifiers within `max_bytes` are returned unchanged. Longer ones are
    /// returned unchanged when `shorten_if_necessary` is false (the consumer
    /// rejects them), otherwise they are replaced by the first `max_bytes`
    /// bytes of the base64-encoded digest. The digest text is 40 bytes for a
    /// 224-bit hash, which caps the length of a shortened identifier.
    pub fn normalize<'a>(
        &self,
        identifier: &'a str,
        max_bytes: usize,
        shorten_if_necessary: bool,
    ) -> Result<Cow<'a, str>> {
        if identifier.len() <= max_bytes || !shorten_if_necessary {
            return Ok(Cow::Borrowed(identifier));
        }

        let algorithm: ShorteningAlgorithm = self.algorithm.parse()?;
        let mut encoded = STANDARD.encode(algorithm.digest(identifier.as_bytes()));
        encoded.truncate(max_bytes.min(encoded.len()));

        tracing::debug!(
            original_bytes = identifier.len(),
            algorithm = %algorithm,
            shortened = %encoded,
            "node identifier shortened"
        );
        Ok(Cow::Owned(encoded))
    }
}

impl Default for IdentifierNormalizer {
    fn default() -> Self {
        Self::new(ShorteningAlgorithm::default().name())
    }
}

/// Normalize an identifier with the default SHA-224 digest
pub fn normalize(
    identifier: &str,
    max_bytes: usize,
    shorten_if_necessary: bool,
) -> Result<Cow<'_, str>> {
    IdentifierNormalizer::default().normalize(identifier, max_bytes, shorten_if_necessary)
}
