//! # Pool Configuration
//!
//! Immutable knobs fixed at pool construction.
//!
//! Configs are plain data: they derive serde and load from external TOML
//! files, once, at startup. Nothing here is consulted on the hot path
//! except through the precomputed [`BlockLayout`](crate::layout::BlockLayout).

use serde::{Deserialize, Serialize};

/// Width of a free-list / page-list link in bytes.
pub const PTR_WIDTH: usize = core::mem::size_of::<usize>();

/// Per-block header flavor.
///
/// The header is pool-owned metadata prefixed to every block. Its size is
/// part of the block geometry, so the flavor is fixed at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderKind {
    /// No header. Zero bytes of bookkeeping per block.
    #[default]
    None,
    /// A 4-byte allocation sequence number plus a 1-byte in-use flag.
    Basic,
    /// Caller-reserved extra bytes, then a 2-byte use counter, then the
    /// basic sequence number and flag. The use counter survives
    /// free/reallocate cycles of the same block.
    Extended {
        /// Caller-reserved bytes at the front of the header. The pool
        /// zero-fills them at page creation and never touches them again.
        extra_bytes: usize,
    },
    /// An 8-byte key referencing a pool-owned metadata record (in-use
    /// flag, optional label, allocation number).
    External,
}

impl HeaderKind {
    /// Size of this header flavor in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::None => 0,
            // 4-byte sequence number + flag byte
            Self::Basic => 5,
            // extra + 2-byte use counter + 4-byte sequence number + flag byte
            Self::Extended { extra_bytes } => extra_bytes + 7,
            // record key, one pointer width
            Self::External => 8,
        }
    }
}

/// Configuration for a [`BlockPool`](crate::pool::BlockPool).
///
/// Immutable after construction (the debug flag is the one exception,
/// togglable through `set_debug_state`). Loaded from TOML at startup or
/// built in code; `Default` gives a small, headerless, unguarded pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Blocks carved out of each page.
    pub objects_per_page: usize,
    /// Page ceiling. `0` means unbounded.
    pub max_pages: usize,
    /// Address alignment required for every block. `0` means none.
    /// Non-zero alignment inserts filler after the page link and between
    /// blocks so that every object address is divisible by this value.
    pub alignment: usize,
    /// Per-block header flavor.
    pub header: HeaderKind,
    /// Guard bytes written on each side of the object region. Padding is
    /// patterned in debug mode and validated on every free while non-zero;
    /// meaningful validation therefore requires pages to have been created
    /// with `debug_on` set.
    pub pad_bytes: usize,
    /// Debug mode: write fill patterns on page creation, allocate and
    /// free, and scrub headers on free.
    pub debug_on: bool,
    /// Bypass pooling entirely and delegate every allocation to the
    /// system allocator. For A/B comparison runs; no pages, no headers,
    /// no guard bytes.
    pub system_fallback: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            objects_per_page: 4,
            max_pages: 0,
            alignment: 0,
            header: HeaderKind::None,
            pad_bytes: 0,
            debug_on: false,
            system_fallback: false,
        }
    }
}

impl PoolConfig {
    /// Parses a configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns the underlying parse error if the document is malformed or
    /// fields have the wrong shape.
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}
