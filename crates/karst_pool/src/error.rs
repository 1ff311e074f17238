//! # Pool Error Types
//!
//! All errors that can occur in the block pool.
//!
//! Every failure is an explicit value - the pool never hides corruption
//! behind a silent success. Detection and reporting only: a corrupted
//! block is never "healed".

use thiserror::Error;

/// Errors that can occur in the block pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The underlying allocator refused a reservation (page or fallback
    /// buffer). Not retryable without freeing memory elsewhere.
    #[error("out of physical memory: reservation of {requested} bytes refused")]
    OutOfMemory {
        /// Size of the refused reservation in bytes.
        requested: usize,
    },

    /// The logical page ceiling was reached. Distinct from physical
    /// exhaustion; raised before any reservation is attempted.
    #[error("out of logical memory: page limit of {max_pages} reached")]
    OutOfPages {
        /// The configured page limit.
        max_pages: usize,
    },

    /// The address is already recorded as free. Signals a client bug.
    #[error("block {address:#x} has already been freed")]
    MultipleFree {
        /// The offending block address.
        address: usize,
    },

    /// The address is not a valid block start within any owned page.
    /// Signals a wild pointer or a double free after page reuse.
    #[error("address {address:#x} is not on a block boundary of any page")]
    BadBoundary {
        /// The offending address.
        address: usize,
    },

    /// The guard bytes flanking the object were overwritten. Signals an
    /// out-of-bounds write by client code.
    #[error("guard bytes around block {address:#x} have been overwritten")]
    CorruptedBlock {
        /// Address of the damaged block.
        address: usize,
    },
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
