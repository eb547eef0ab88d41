//! Deterministic hashing utilities
//!
//! Content blocks fingerprint `(source, configuration)` with blake3 so a
//! render can tell whether a fragment needs regenerating.

// =============================================================================
// StableHasher - Builder Pattern
// =============================================================================

/// A deterministic hasher using blake3
///
/// Unlike `std::hash::Hasher`, this produces the same output across
/// process restarts for the same input.
pub struct StableHasher {
    inner: blake3::Hasher,
}

impl StableHasher {
    /// Create a new StableHasher
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: blake3::Hasher::new(),
        }
    }

    /// Update with raw bytes
    #[inline]
    pub fn update(mut self, data: &[u8]) -> Self {
        self.inner.update(data);
        self
    }

    /// Update with a length-prefixed string
    ///
    /// The prefix keeps `("ab", "c")` and `("a", "bc")` apart.
    #[inline]
    pub fn update_str(self, s: &str) -> Self {
        self.update_usize(s.len()).update(s.as_bytes())
    }

    /// Update with a u64 value (little-endian)
    #[inline]
    pub fn update_u64(self, v: u64) -> Self {
        self.update(&v.to_le_bytes())
    }

    /// Update with a usize value (little-endian)
    #[inline]
    pub fn update_usize(self, v: usize) -> Self {
        self.update_u64(v as u64)
    }

    /// Update with a bool
    #[inline]
    pub fn update_bool(self, v: bool) -> Self {
        self.update(&[v as u8])
    }

    /// Finish and return the hash as u64
    ///
    /// Takes the first 8 bytes of blake3 output as little-endian u64.
    #[inline]
    pub fn finish(self) -> u64 {
        let hash = self.inner.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }
}

impl Default for StableHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = StableHasher::new().update_str("source").update_u64(4).finish();
        let b = StableHasher::new().update_str("source").update_u64(4).finish();
        assert_eq!(a, b);
    }

    #[test]
    fn test_length_prefix_separates_fields() {
        let a = StableHasher::new().update_str("ab").update_str("c").finish();
        let b = StableHasher::new().update_str("a").update_str("bc").finish();
        assert_ne!(a, b);
    }
}
