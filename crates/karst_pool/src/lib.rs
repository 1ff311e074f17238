//! # KARST Pool
//!
//! Fixed-size-block object pool for high-frequency, uniform-size
//! allocations: entities, particles, network packets.
//!
//! ## Architecture Rules
//!
//! 1. **Pages, not mallocs** - memory is reserved in large pages and
//!    sliced into blocks; steady-state allocate/free never touches the
//!    system allocator
//! 2. **O(1) both ways** - an intrusive LIFO free list hands out blocks;
//!    an address index makes validity checks cheap
//! 3. **Corruption is loud** - debug mode patterns every lifecycle state
//!    and every free checks for double frees, wild pointers and overruns
//!
//! ## Example
//!
//! ```rust,ignore
//! use karst_pool::{BlockPool, PoolConfig};
//!
//! let config = PoolConfig { objects_per_page: 256, pad_bytes: 2, debug_on: true, ..PoolConfig::default() };
//! let mut pool = BlockPool::new(64, config)?;
//! let block = pool.allocate()?;
//! pool.write_object(block, &[0.0f32; 16]);
//! pool.free(block)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod free_index;
pub mod layout;
pub mod patterns;
pub mod pool;
pub mod stats;

pub use config::{HeaderKind, PoolConfig, PTR_WIDTH};
pub use error::{PoolError, PoolResult};
pub use free_index::FreeBlockIndex;
pub use layout::BlockLayout;
pub use pool::{BlockAddr, BlockPool};
pub use stats::PoolStats;
