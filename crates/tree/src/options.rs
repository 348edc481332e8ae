//! Tree configuration (spec §6 "Configuration").
//!
//! The hash capability itself is chosen at the type level (the `H:
//! Hasher` parameter `Tree`/`Store` are generic over), not as a runtime
//! option — unlike the distilled spec's treatment of `hash` as a
//! constructor argument, Rust's generics let the compiler enforce that a
//! single store is never opened with two different hashers. Every other
//! recognised option becomes a field here, `serde`-deserializable
//! (grounded in the teacher's own use of `serde` for every wire and
//! config type) so a host application can load it from TOML/JSON.

use serde::{Deserialize, Serialize};

/// 2 GiB, the default segment rollover threshold (spec §6).
pub const DEFAULT_MAX_SEGMENT_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Tree construction options (spec §6 "recognised options").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// `N`, the key width in bits. Required; must be a multiple of 8.
    pub bits: usize,
    /// Directory for the on-disk store. `None` opens an ephemeral tree
    /// at a fixed in-process path, meant for an in-memory [`FileSystem`](urkel_fs::FileSystem).
    pub prefix: Option<String>,
    /// Depth at and above which `commit` keeps nodes resident instead of
    /// replacing them with `Hash` placeholders (default 4).
    pub cache_depth: usize,
    /// Historical roots to index into the root cache on open. `-1` means
    /// index every meta record found (default 1).
    pub init_cache_size: i64,
    /// Refuse to resolve snapshots whose root is absent from the cache,
    /// never touching disk to find it (default `false`).
    pub cache_only: bool,
    /// Segment rollover threshold in bytes (default 2 GiB).
    pub max_segment_size: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            bits: 256,
            prefix: None,
            cache_depth: 4,
            init_cache_size: 1,
            cache_only: false,
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
        }
    }
}

impl Options {
    /// The trie's fixed key width in bytes.
    pub fn key_len_bytes(&self) -> usize {
        self.bits / 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_from_json_with_defaults() {
        let opts: Options = serde_json::from_str(r#"{"bits": 160}"#).unwrap();
        assert_eq!(opts.bits, 160);
        assert_eq!(opts.cache_depth, 4);
        assert_eq!(opts.max_segment_size, DEFAULT_MAX_SEGMENT_SIZE);
    }

    #[test]
    fn key_len_bytes_divides_bits() {
        let opts = Options { bits: 160, ..Default::default() };
        assert_eq!(opts.key_len_bytes(), 20);
    }
}
