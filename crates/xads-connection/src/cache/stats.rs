//! Cache statistics types

use serde::{Deserialize, Serialize};

/// Statistics about a connection cache's current state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of credentials with a cached physical connection
    entries: usize,
    /// Number of physical connections opened since the cache was created
    opened: usize,
    /// Number of acquisitions served from a cached connection
    reused: usize,
}

impl CacheStats {
    /// Create new cache statistics
    pub fn new(entries: usize, opened: usize, reused: usize) -> Self {
        Self {
            entries,
            opened,
            reused,
        }
    }

    /// Get the number of cached entries
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Get the number of physical connections opened
    pub fn opened(&self) -> usize {
        self.opened
    }

    /// Get the number of acquisitions served from the cache
    pub fn reused(&self) -> usize {
        self.reused
    }

    /// Fraction of acquisitions that reused a cached connection (0.0 to 1.0)
    ///
    /// Returns 0.0 when nothing has been acquired yet.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.opened + self.reused;
        if total == 0 {
            0.0
        } else {
            self.reused as f64 / total as f64
        }
    }
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}
