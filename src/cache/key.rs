//! Cache keys hashed over cached-computation inputs

use xxhash_rust::xxh3::xxh3_64;

/// Opaque 64-bit key derived from every input of a cached computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(u64);

impl CacheKey {
    pub fn builder() -> CacheKeyBuilder {
        CacheKeyBuilder::default()
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Accumulates length-prefixed fields so that ("ab", "c") and ("a", "bc")
/// hash differently
#[derive(Debug, Default, Clone)]
pub struct CacheKeyBuilder {
    bytes: Vec<u8>,
}

impl CacheKeyBuilder {
    pub fn str(mut self, s: &str) -> Self {
        self.bytes.extend_from_slice(&(s.len() as u64).to_le_bytes());
        self.bytes.extend_from_slice(s.as_bytes());
        self
    }

    pub fn strs<S: AsRef<str>>(mut self, items: &[S]) -> Self {
        self.bytes.extend_from_slice(&(items.len() as u64).to_le_bytes());
        for item in items {
            self = self.str(item.as_ref());
        }
        self
    }

    pub fn u64(mut self, v: u64) -> Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Floats are hashed by bit pattern
    pub fn f64(mut self, v: f64) -> Self {
        self.bytes.extend_from_slice(&v.to_bits().to_le_bytes());
        self
    }

    pub fn finish(self) -> CacheKey {
        CacheKey(xxh3_64(&self.bytes))
    }
}
