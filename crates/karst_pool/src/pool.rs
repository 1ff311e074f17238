//! # Block Pool
//!
//! Paged fixed-size-block object pool with O(1) allocate/free.
//!
//! Memory is reserved in large contiguous pages, each sliced into
//! equal-sized blocks. Free blocks thread an intrusive LIFO list through
//! the first pointer-width bytes of their object region; a side index of
//! free addresses makes double-free and in-use checks cheap. In debug mode
//! every lifecycle transition leaves a recognizable fill pattern behind,
//! and every free validates the guard bytes flanking the object.
//!
//! # Thread Safety
//!
//! The pool is NOT thread-safe. Use one pool per thread or serialize
//! access externally.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = PoolConfig { objects_per_page: 256, pad_bytes: 2, debug_on: true, ..PoolConfig::default() };
//! let mut pool = BlockPool::new(64, config)?;
//!
//! let block = pool.allocate()?;   // O(1), no page churn until the page fills
//! pool.free(block)?;              // O(1), corruption-checked
//! ```

use std::collections::HashMap;

use crate::config::{HeaderKind, PoolConfig, PTR_WIDTH};
use crate::error::{PoolError, PoolResult};
use crate::free_index::FreeBlockIndex;
use crate::layout::BlockLayout;
use crate::patterns;
use crate::stats::PoolStats;

/// Address of a block's object bytes, as handed to clients.
///
/// The value is the real address of bytes inside a pool-owned page (or a
/// fallback buffer), so it survives round-trips through component tables
/// and can be range- and boundary-checked on the way back in. `NULL` (the
/// zero address) never names a real block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct BlockAddr(usize);

impl BlockAddr {
    /// Null/invalid block address.
    pub const NULL: Self = Self(0);

    /// Wraps a raw address. Intended for diagnostics and tests; an address
    /// the pool never handed out is rejected at the API boundary.
    #[inline]
    #[must_use]
    pub const fn new(address: usize) -> Self {
        Self(address)
    }

    /// Returns the raw address.
    #[inline]
    #[must_use]
    pub const fn addr(self) -> usize {
        self.0
    }

    /// Checks if this is the null address.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Default for BlockAddr {
    fn default() -> Self {
        Self::NULL
    }
}

// Little-endian field codecs over page bytes. Each operates on the prefix
// of the given slice; callers hand in regions cut to the right offset.

fn read_word(bytes: &[u8]) -> usize {
    let mut raw = [0u8; PTR_WIDTH];
    raw.copy_from_slice(&bytes[..PTR_WIDTH]);
    usize::from_le_bytes(raw)
}

fn write_word(bytes: &mut [u8], value: usize) {
    bytes[..PTR_WIDTH].copy_from_slice(&value.to_le_bytes());
}

fn read_u16(bytes: &[u8]) -> u16 {
    let mut raw = [0u8; 2];
    raw.copy_from_slice(&bytes[..2]);
    u16::from_le_bytes(raw)
}

fn write_u16(bytes: &mut [u8], value: u16) {
    bytes[..2].copy_from_slice(&value.to_le_bytes());
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(raw)
}

fn write_u32(bytes: &mut [u8], value: u32) {
    bytes[..4].copy_from_slice(&value.to_le_bytes());
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(raw)
}

fn write_u64(bytes: &mut [u8], value: u64) {
    bytes[..8].copy_from_slice(&value.to_le_bytes());
}

/// One page: an owned buffer plus the offset of its aligned base.
///
/// The `next` field is the authoritative link; the first pointer-width
/// bytes at the base mirror the next page's base address (0 for the tail).
struct Page {
    buf: Box<[u8]>,
    base_off: usize,
    next: Option<Box<Page>>,
}

impl Page {
    /// Address of the page base (aligned when alignment is configured).
    fn base(&self) -> usize {
        self.buf.as_ptr() as usize + self.base_off
    }

    /// Does `address` fall inside this page's `page_size` bytes?
    fn contains(&self, address: usize, page_size: usize) -> bool {
        let base = self.base();
        address >= base && address < base + page_size
    }

    /// Page-relative read slice.
    fn slice(&self, rel: usize, len: usize) -> &[u8] {
        let start = self.base_off + rel;
        &self.buf[start..start + len]
    }

    /// Page-relative write slice.
    fn slice_mut(&mut self, rel: usize, len: usize) -> &mut [u8] {
        let start = self.base_off + rel;
        &mut self.buf[start..start + len]
    }

    /// Mirrors the next-page link into the page header bytes.
    fn write_page_link(&mut self, next_base: usize) {
        write_word(self.slice_mut(0, PTR_WIDTH), next_base);
    }
}

/// Recursive descent to the page owning `address`.
fn find_page_mut(page: &mut Page, address: usize, page_size: usize) -> Option<&mut Page> {
    if page.contains(address, page_size) {
        Some(page)
    } else {
        find_page_mut(page.next.as_deref_mut()?, address, page_size)
    }
}

/// Metadata record backing an External header. Pool-owned: created on
/// allocate, destroyed on debug-mode free, never exposed by reference.
struct ExternalRecord {
    in_use: bool,
    label: Option<String>,
    sequence: u32,
}

/// A paged fixed-size-block object pool.
///
/// All blocks have the same client-visible size, fixed at construction.
/// Allocation pops the intrusive free list (creating a page on demand);
/// free validates the address and pushes it back. Every operation is
/// synchronous and bounded; page creation is the only point that touches
/// the system allocator.
pub struct BlockPool {
    config: PoolConfig,
    layout: BlockLayout,
    stats: PoolStats,
    /// Head of the singly-linked page list; newest page first.
    page_head: Option<Box<Page>>,
    /// Head of the intrusive free list (0 = empty).
    free_head: usize,
    /// Membership index over free block addresses.
    free_index: FreeBlockIndex,
    /// External-header records, keyed by the value stored in the header slot.
    external: HashMap<u64, ExternalRecord>,
    /// Fallback-mode buffers, keyed by their address.
    fallback: HashMap<usize, Box<[u8]>>,
}

impl BlockPool {
    /// Creates a pool for objects of `object_size` bytes.
    ///
    /// Unless `config.system_fallback` is set, one page is created eagerly
    /// so the first allocation cannot stall on a reservation.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::OutOfMemory`] if the eager page reservation is
    /// refused ([`PoolError::OutOfPages`] is propagated if ever raised).
    ///
    /// # Panics
    ///
    /// Panics if `object_size` is zero, or - in pool mode - smaller than a
    /// free-list link, or if `objects_per_page` is zero.
    pub fn new(object_size: usize, config: PoolConfig) -> PoolResult<Self> {
        assert!(object_size > 0, "object size must be non-zero");
        if !config.system_fallback {
            assert!(
                object_size >= PTR_WIDTH,
                "object size must fit a free-list link"
            );
            assert!(
                config.objects_per_page > 0,
                "objects per page must be non-zero"
            );
        }

        let layout = BlockLayout::compute(object_size, &config);
        let mut pool = Self {
            config,
            layout,
            stats: PoolStats {
                object_size,
                page_size: layout.page_size,
                ..PoolStats::default()
            },
            page_head: None,
            free_head: 0,
            free_index: FreeBlockIndex::new(),
            external: HashMap::new(),
            fallback: HashMap::new(),
        };

        if !pool.config.system_fallback {
            pool.create_page()?;
        }
        Ok(pool)
    }

    /// Returns the pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Returns the pool statistics.
    #[must_use]
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Returns the solved page geometry.
    #[must_use]
    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    /// Toggles debug mode (pattern writing and header scrubbing).
    pub fn set_debug_state(&mut self, on: bool) {
        self.config.debug_on = on;
    }

    /// Head of the intrusive free list. Debug/test use only.
    #[must_use]
    pub fn free_list_head(&self) -> BlockAddr {
        BlockAddr::new(self.free_head)
    }

    /// Base address of the newest page. Debug/test use only.
    #[must_use]
    pub fn page_list_head(&self) -> BlockAddr {
        BlockAddr::new(self.page_head.as_ref().map_or(0, |p| p.base()))
    }

    /// Allocates one block.
    ///
    /// Pops the most recently freed block (LIFO), creating a new page if
    /// the free list is empty. The returned address is never handed out
    /// again until it is freed.
    ///
    /// # Errors
    ///
    /// [`PoolError::OutOfPages`] if a page would exceed the configured
    /// ceiling; [`PoolError::OutOfMemory`] if a reservation is refused.
    pub fn allocate(&mut self) -> PoolResult<BlockAddr> {
        self.allocate_inner(None)
    }

    /// Allocates one block with a label, recorded when the pool uses
    /// External headers (ignored otherwise).
    ///
    /// # Errors
    ///
    /// Same failure modes as [`allocate`](Self::allocate).
    pub fn allocate_tagged(&mut self, label: &str) -> PoolResult<BlockAddr> {
        self.allocate_inner(Some(label))
    }

    fn allocate_inner(&mut self, label: Option<&str>) -> PoolResult<BlockAddr> {
        if self.config.system_fallback {
            return self.allocate_fallback();
        }

        if self.free_head == 0 {
            self.create_page()?;
        }

        let address = self.free_head;
        self.free_head = self.read_free_link(address);
        self.free_index.remove(address);

        self.stats.allocations = self.stats.allocations.wrapping_add(1);
        let sequence = self.stats.allocations;
        self.stamp_header(address, sequence, label);

        if self.config.debug_on {
            if let Some(object) = self.object_slice_mut(address) {
                patterns::fill(object, patterns::ALLOCATED_PATTERN);
            }
        }

        self.stats.free_objects -= 1;
        self.stats.objects_in_use += 1;
        self.stats.most_objects = self.stats.most_objects.max(self.stats.objects_in_use);
        Ok(BlockAddr::new(address))
    }

    /// Fallback mode: one system reservation per object, no pooling, no
    /// headers, no guard bytes. The free-objects gauge is meaningless here
    /// and stays untouched.
    fn allocate_fallback(&mut self) -> PoolResult<BlockAddr> {
        let size = self.layout.object_size;
        let mut raw = Vec::new();
        raw.try_reserve_exact(size)
            .map_err(|_| PoolError::OutOfMemory { requested: size })?;
        raw.resize(size, 0);
        let buf = raw.into_boxed_slice();
        let address = buf.as_ptr() as usize;
        self.fallback.insert(address, buf);

        self.stats.allocations = self.stats.allocations.wrapping_add(1);
        self.stats.objects_in_use += 1;
        self.stats.most_objects = self.stats.most_objects.max(self.stats.objects_in_use);
        Ok(BlockAddr::new(address))
    }

    /// Returns a block to the pool.
    ///
    /// Validation runs in a fixed order - double free, boundary, guard
    /// bytes - so the first symptom of a client bug is the one reported.
    ///
    /// # Errors
    ///
    /// [`PoolError::MultipleFree`] if the block is already free,
    /// [`PoolError::BadBoundary`] if the address is not a block start in
    /// any owned page, [`PoolError::CorruptedBlock`] if the guard bytes
    /// were overwritten.
    pub fn free(&mut self, block: BlockAddr) -> PoolResult<()> {
        let address = block.addr();

        if self.config.system_fallback {
            self.fallback.remove(&address);
            self.stats.objects_in_use = self.stats.objects_in_use.saturating_sub(1);
            self.stats.deallocations = self.stats.deallocations.wrapping_add(1);
            return Ok(());
        }

        // 1. double free
        if self.free_index.contains(address) {
            return Err(PoolError::MultipleFree { address });
        }

        // 2. boundary
        if !self.is_block_start(address) {
            return Err(PoolError::BadBoundary { address });
        }

        // 3. guard bytes
        if self.layout.pad_bytes > 0 && !self.padding_intact(address) {
            tracing::warn!("guard bytes overwritten around block {address:#x}");
            return Err(PoolError::CorruptedBlock { address });
        }

        if self.config.debug_on {
            self.scrub_header(address);
            if let Some(object) = self.object_slice_mut(address) {
                patterns::fill(object, patterns::FREED_PATTERN);
            }
        }

        let old_head = self.free_head;
        self.write_free_link(address, old_head);
        self.free_head = address;
        self.free_index.insert(address);

        self.stats.objects_in_use = self.stats.objects_in_use.saturating_sub(1);
        self.stats.free_objects += 1;
        self.stats.deallocations = self.stats.deallocations.wrapping_add(1);
        Ok(())
    }

    /// Invokes `callback` with (address, object size) for every block
    /// currently held by a client, across all pages. Returns the count.
    /// Fallback-mode allocations are not visited (no pages exist).
    pub fn dump_in_use<F>(&self, mut callback: F) -> usize
    where
        F: FnMut(BlockAddr, usize),
    {
        let mut in_use = 0;
        let mut cur = self.page_head.as_deref();
        while let Some(page) = cur {
            let base = page.base();
            for k in 0..self.layout.objects_per_page {
                let address = base + self.layout.object_offset(k);
                if !self.free_index.contains(address) {
                    callback(BlockAddr::new(address), self.layout.object_size);
                    in_use += 1;
                }
            }
            cur = page.next.as_deref();
        }
        in_use
    }

    /// Invokes `callback` with (address, object size) for every block -
    /// allocated or free - whose guard bytes are damaged. Returns the
    /// count. Only meaningful when `pad_bytes > 0` and pages were created
    /// with debug mode on.
    pub fn validate_pages<F>(&self, mut callback: F) -> usize
    where
        F: FnMut(BlockAddr, usize),
    {
        let mut corrupted = 0;
        let mut cur = self.page_head.as_deref();
        while let Some(page) = cur {
            let base = page.base();
            for k in 0..self.layout.objects_per_page {
                let rel = self.layout.object_offset(k);
                if !pads_intact(page, &self.layout, rel) {
                    callback(BlockAddr::new(base + rel), self.layout.object_size);
                    corrupted += 1;
                }
            }
            cur = page.next.as_deref();
        }
        corrupted
    }

    /// Releases every page whose blocks are all free. Returns the number
    /// of pages released. Surviving pages and surviving free-list entries
    /// keep their relative order.
    pub fn free_empty_pages(&mut self) -> usize {
        let layout = self.layout;

        // Pass 1: which pages are fully free?
        let mut doomed: Vec<usize> = Vec::new();
        {
            let mut cur = self.page_head.as_deref();
            while let Some(page) = cur {
                let base = page.base();
                let fully_free = (0..layout.objects_per_page)
                    .all(|k| self.free_index.contains(base + layout.object_offset(k)));
                if fully_free {
                    doomed.push(base);
                }
                cur = page.next.as_deref();
            }
        }
        if doomed.is_empty() {
            return 0;
        }

        let in_doomed =
            |address: usize| doomed.iter().any(|&b| address >= b && address < b + layout.page_size);

        // Snapshot the free list in order, skipping blocks of doomed pages.
        let mut survivors: Vec<usize> = Vec::new();
        let mut cur = self.free_head;
        while cur != 0 {
            let next = self.read_free_link(cur);
            if !in_doomed(cur) {
                survivors.push(cur);
            }
            cur = next;
        }

        // Unregister every doomed block from the index.
        for &base in &doomed {
            for k in 0..layout.objects_per_page {
                self.free_index.remove(base + layout.object_offset(k));
            }
        }

        // Detach the page list, drop doomed pages, relink the rest in order.
        let mut kept: Vec<Box<Page>> = Vec::new();
        let mut node = self.page_head.take();
        while let Some(mut page) = node {
            node = page.next.take();
            if !doomed.contains(&page.base()) {
                kept.push(page);
            }
        }
        let mut head: Option<Box<Page>> = None;
        for mut page in kept.into_iter().rev() {
            page.write_page_link(head.as_ref().map_or(0, |n| n.base()));
            page.next = head;
            head = Some(page);
        }
        self.page_head = head;

        // Rebuild the free list from the survivors, order preserved.
        self.free_head = 0;
        for &address in survivors.iter().rev() {
            self.write_free_link(address, self.free_head);
            self.free_head = address;
        }

        let freed = doomed.len();
        self.stats.pages_in_use -= freed;
        self.stats.free_objects = self
            .stats
            .free_objects
            .saturating_sub(freed * layout.objects_per_page);
        tracing::debug!("reclaimed {freed} empty page(s)");
        freed
    }

    // ------------------------------------------------------------------
    // Object access
    // ------------------------------------------------------------------

    /// The object bytes of a currently allocated block, or `None` for an
    /// invalid or free address. Works in fallback mode too.
    #[must_use]
    pub fn object_bytes(&self, block: BlockAddr) -> Option<&[u8]> {
        let address = block.addr();
        if self.config.system_fallback {
            return self.fallback.get(&address).map(AsRef::as_ref);
        }
        if self.free_index.contains(address) || !self.is_block_start(address) {
            return None;
        }
        self.object_slice(address)
    }

    /// Mutable access to the object bytes of a currently allocated block.
    #[must_use]
    pub fn object_bytes_mut(&mut self, block: BlockAddr) -> Option<&mut [u8]> {
        let address = block.addr();
        if self.config.system_fallback {
            return self.fallback.get_mut(&address).map(AsMut::as_mut);
        }
        if self.free_index.contains(address) || !self.is_block_start(address) {
            return None;
        }
        self.object_slice_mut(address)
    }

    /// Reads a plain-old-data value from the front of a block's object
    /// bytes. `None` if the block is invalid, free, or smaller than `T`.
    #[must_use]
    pub fn read_object<T: bytemuck::AnyBitPattern>(&self, block: BlockAddr) -> Option<T> {
        let bytes = self.object_bytes(block)?;
        let size = core::mem::size_of::<T>();
        if size > bytes.len() {
            return None;
        }
        Some(bytemuck::pod_read_unaligned(&bytes[..size]))
    }

    /// Writes a plain-old-data value to the front of a block's object
    /// bytes. Returns false if the block is invalid, free, or smaller
    /// than `T`.
    pub fn write_object<T: bytemuck::NoUninit>(&mut self, block: BlockAddr, value: &T) -> bool {
        let raw = bytemuck::bytes_of(value);
        match self.object_bytes_mut(block) {
            Some(bytes) if raw.len() <= bytes.len() => {
                bytes[..raw.len()].copy_from_slice(raw);
                true
            }
            _ => false,
        }
    }

    /// The label recorded for an allocated External-header block.
    #[must_use]
    pub fn block_label(&self, block: BlockAddr) -> Option<&str> {
        let address = block.addr();
        if self.config.header != HeaderKind::External
            || self.free_index.contains(address)
            || !self.is_block_start(address)
        {
            return None;
        }
        let key = read_u64(self.header_slice(address)?);
        let record = self.external.get(&key)?;
        if record.in_use {
            record.label.as_deref()
        } else {
            None
        }
    }

    /// The Extended header's use counter: how many times this block has
    /// been allocated over its lifetime.
    #[must_use]
    pub fn use_count(&self, block: BlockAddr) -> Option<u16> {
        let HeaderKind::Extended { extra_bytes } = self.config.header else {
            return None;
        };
        if !self.is_block_start(block.addr()) {
            return None;
        }
        let header = self.header_slice(block.addr())?;
        Some(read_u16(&header[extra_bytes..]))
    }

    /// The allocation sequence number stamped into a Basic or Extended
    /// header, or recorded for an External block.
    #[must_use]
    pub fn sequence_number(&self, block: BlockAddr) -> Option<u32> {
        let address = block.addr();
        if !self.is_block_start(address) {
            return None;
        }
        match self.config.header {
            HeaderKind::None => None,
            HeaderKind::Basic => Some(read_u32(self.header_slice(address)?)),
            HeaderKind::Extended { extra_bytes } => {
                let header = self.header_slice(address)?;
                Some(read_u32(&header[extra_bytes + 2..]))
            }
            HeaderKind::External => {
                let key = read_u64(self.header_slice(address)?);
                self.external.get(&key).map(|record| record.sequence)
            }
        }
    }

    // ------------------------------------------------------------------
    // Page plumbing
    // ------------------------------------------------------------------

    /// Reserves, threads and patterns one new page at the head of the
    /// page list.
    fn create_page(&mut self) -> PoolResult<()> {
        if self.config.max_pages != 0 && self.stats.pages_in_use == self.config.max_pages {
            return Err(PoolError::OutOfPages {
                max_pages: self.config.max_pages,
            });
        }

        let layout = self.layout;
        let len = layout.buffer_len();
        let mut raw = Vec::new();
        raw.try_reserve_exact(len)
            .map_err(|_| PoolError::OutOfMemory { requested: len })?;
        raw.resize(len, 0);
        let buf = raw.into_boxed_slice();

        let base_off = if layout.alignment > 0 {
            let rem = (buf.as_ptr() as usize) % layout.alignment;
            if rem == 0 {
                0
            } else {
                layout.alignment - rem
            }
        } else {
            0
        };

        let mut page = Box::new(Page {
            buf,
            base_off,
            next: self.page_head.take(),
        });
        let base = page.base();
        page.write_page_link(page.next.as_ref().map_or(0, |n| n.base()));
        patterns::fill(
            page.slice_mut(PTR_WIDTH, layout.left_align),
            patterns::ALIGN_PATTERN,
        );

        // Thread the fresh blocks onto the free list, last block first, so
        // the head lands on the page's first block and first-use allocation
        // order is address-ascending.
        for k in (0..layout.objects_per_page).rev() {
            let rel = layout.object_offset(k);
            if self.config.debug_on {
                patterns::fill(
                    page.slice_mut(rel - layout.pad_bytes, layout.pad_bytes),
                    patterns::PAD_PATTERN,
                );
                patterns::fill(
                    page.slice_mut(rel, layout.object_size),
                    patterns::UNALLOCATED_PATTERN,
                );
                patterns::fill(
                    page.slice_mut(rel + layout.object_size, layout.pad_bytes),
                    patterns::PAD_PATTERN,
                );
                if k + 1 < layout.objects_per_page {
                    patterns::fill(
                        page.slice_mut(
                            rel + layout.object_size + layout.pad_bytes,
                            layout.inter_align,
                        ),
                        patterns::ALIGN_PATTERN,
                    );
                }
            }
            let address = base + rel;
            write_word(page.slice_mut(rel, PTR_WIDTH), self.free_head);
            self.free_head = address;
            self.free_index.insert(address);
        }

        self.page_head = Some(page);
        self.stats.pages_in_use += 1;
        self.stats.free_objects += layout.objects_per_page;
        tracing::debug!(
            "page created at {base:#x} ({} blocks, {} bytes)",
            layout.objects_per_page,
            layout.page_size
        );
        Ok(())
    }

    fn page_containing(&self, address: usize) -> Option<&Page> {
        let page_size = self.layout.page_size;
        let mut cur = self.page_head.as_deref();
        while let Some(page) = cur {
            if page.contains(address, page_size) {
                return Some(page);
            }
            cur = page.next.as_deref();
        }
        None
    }

    fn page_containing_mut(&mut self, address: usize) -> Option<&mut Page> {
        let page_size = self.layout.page_size;
        find_page_mut(self.page_head.as_deref_mut()?, address, page_size)
    }

    /// Is `address` the object start of some block in some page?
    fn is_block_start(&self, address: usize) -> bool {
        let Some(page) = self.page_containing(address) else {
            return false;
        };
        let first = page.base() + self.layout.first_object_offset();
        address >= first && (address - first) % self.layout.stride == 0
    }

    /// Both guard regions of the block at `address` still hold the pad
    /// pattern.
    fn padding_intact(&self, address: usize) -> bool {
        let Some(page) = self.page_containing(address) else {
            return false;
        };
        let rel = address - page.base();
        pads_intact(page, &self.layout, rel)
    }

    fn read_free_link(&self, address: usize) -> usize {
        self.page_containing(address).map_or(0, |page| {
            let rel = address - page.base();
            read_word(page.slice(rel, PTR_WIDTH))
        })
    }

    fn write_free_link(&mut self, address: usize, next: usize) {
        if let Some(page) = self.page_containing_mut(address) {
            let rel = address - page.base();
            write_word(page.slice_mut(rel, PTR_WIDTH), next);
        }
    }

    fn object_slice(&self, address: usize) -> Option<&[u8]> {
        let size = self.layout.object_size;
        let page = self.page_containing(address)?;
        let rel = address - page.base();
        Some(page.slice(rel, size))
    }

    fn object_slice_mut(&mut self, address: usize) -> Option<&mut [u8]> {
        let size = self.layout.object_size;
        let page = self.page_containing_mut(address)?;
        let rel = address - page.base();
        Some(page.slice_mut(rel, size))
    }

    fn header_slice(&self, address: usize) -> Option<&[u8]> {
        let head_pad = self.layout.head_pad;
        let size = self.layout.header_size;
        let page = self.page_containing(address)?;
        let rel = address - page.base();
        Some(page.slice(rel - head_pad, size))
    }

    fn header_slice_mut(&mut self, address: usize) -> Option<&mut [u8]> {
        let head_pad = self.layout.head_pad;
        let size = self.layout.header_size;
        let page = self.page_containing_mut(address)?;
        let rel = address - page.base();
        Some(page.slice_mut(rel - head_pad, size))
    }

    // ------------------------------------------------------------------
    // Header bookkeeping
    // ------------------------------------------------------------------

    /// Marks the block in use: stamps the sequence number, sets the flag,
    /// bumps the Extended use counter, creates the External record.
    fn stamp_header(&mut self, address: usize, sequence: u32, label: Option<&str>) {
        match self.config.header {
            HeaderKind::None => {}
            HeaderKind::Basic => {
                if let Some(header) = self.header_slice_mut(address) {
                    write_u32(header, sequence);
                    header[4] |= 1;
                }
            }
            HeaderKind::Extended { extra_bytes } => {
                if let Some(header) = self.header_slice_mut(address) {
                    let uses = read_u16(&header[extra_bytes..]).wrapping_add(1);
                    write_u16(&mut header[extra_bytes..], uses);
                    write_u32(&mut header[extra_bytes + 2..], sequence);
                    header[extra_bytes + 6] |= 1;
                }
            }
            HeaderKind::External => {
                if let Some(header) = self.header_slice_mut(address) {
                    write_u64(header, u64::from(sequence));
                }
                self.external.insert(
                    u64::from(sequence),
                    ExternalRecord {
                        in_use: true,
                        label: label.map(str::to_owned),
                        sequence,
                    },
                );
            }
        }
    }

    /// Debug-mode header teardown on free. The Extended use counter and
    /// caller-reserved extra bytes survive; everything else is scrubbed.
    fn scrub_header(&mut self, address: usize) {
        match self.config.header {
            HeaderKind::None => {}
            HeaderKind::Basic => {
                if let Some(header) = self.header_slice_mut(address) {
                    header.fill(0);
                }
            }
            HeaderKind::Extended { extra_bytes } => {
                if let Some(header) = self.header_slice_mut(address) {
                    header[extra_bytes + 2..extra_bytes + 7].fill(0);
                }
            }
            HeaderKind::External => {
                let Some(header) = self.header_slice(address) else {
                    return;
                };
                let key = read_u64(header);
                self.external.remove(&key);
                if let Some(header) = self.header_slice_mut(address) {
                    header.fill(0);
                }
            }
        }
    }
}

/// Shared pad verification over a page's bytes; `rel` is the block's
/// object offset within the page.
fn pads_intact(page: &Page, layout: &BlockLayout, rel: usize) -> bool {
    if layout.pad_bytes == 0 {
        return true;
    }
    patterns::verify(page.slice(rel - layout.pad_bytes, layout.pad_bytes), patterns::PAD_PATTERN)
        && patterns::verify(
            page.slice(rel + layout.object_size, layout.pad_bytes),
            patterns::PAD_PATTERN,
        )
}

impl Drop for BlockPool {
    /// Unconditional teardown: every page is released, no corruption
    /// checks run. Iterative so a deep page list cannot overflow the
    /// stack through recursive box drops.
    fn drop(&mut self) {
        let mut cur = self.page_head.take();
        while let Some(mut page) = cur {
            cur = page.next.take();
        }
    }
}
