//! # Pool Statistics
//!
//! Diagnostic counters maintained by the pool.
//!
//! These values are derived bookkeeping, updated incrementally on every
//! allocate/free. They are for display and tests - do NOT use them for
//! allocation decisions.

/// Statistics for a block pool.
///
/// In pool mode the gauges obey the conservation law
/// `objects_in_use + free_objects == pages_in_use * objects_per_page`
/// after every successful operation. In fallback mode there are no pages
/// and `free_objects` stays untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Client-visible bytes per block.
    pub object_size: usize,
    /// Bytes per page, including page link, fillers, headers and padding.
    pub page_size: usize,
    /// Pages currently owned by the pool.
    pub pages_in_use: usize,
    /// Blocks currently sitting on the free list.
    pub free_objects: usize,
    /// Blocks currently held by clients.
    pub objects_in_use: usize,
    /// Historical peak of `objects_in_use`.
    pub most_objects: usize,
    /// Total successful allocations over the pool's lifetime. Doubles as
    /// the sequence number stamped into Basic/Extended headers.
    pub allocations: u32,
    /// Total successful frees over the pool's lifetime.
    pub deallocations: u32,
}
