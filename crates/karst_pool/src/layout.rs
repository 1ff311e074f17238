//! # Block Geometry
//!
//! Byte-level layout of a page, solved once at pool construction.
//!
//! A page is laid out as:
//!
//! ```text
//! [next-page link][left filler] [block 0][gap] [block 1][gap] ... [block N-1]
//! ```
//!
//! and each block as:
//!
//! ```text
//! [header][left pad][object bytes][right pad]
//! ```
//!
//! All pool code addresses pages through the offsets computed here; nothing
//! recomputes geometry on the hot path.

use crate::config::{PoolConfig, PTR_WIDTH};

/// Precomputed offsets and sizes for one pool's pages.
///
/// When `alignment` is non-zero the fillers are solved so that the first
/// block after the page header, and every block after it, start at an
/// address divisible by `alignment` - assuming the page base itself is
/// aligned, which page creation guarantees by over-reserving.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockLayout {
    /// Client-visible bytes per block.
    pub object_size: usize,
    /// Header bytes at the front of each block.
    pub header_size: usize,
    /// Guard bytes on each side of the object region.
    pub pad_bytes: usize,
    /// Configured address alignment (0 = none).
    pub alignment: usize,
    /// Filler between the page link and the first block.
    pub left_align: usize,
    /// Filler between consecutive blocks.
    pub inter_align: usize,
    /// Header + padding + object + padding.
    pub block_size: usize,
    /// Distance between consecutive block starts: `block_size` plus the
    /// inter-block filler.
    pub stride: usize,
    /// Page link plus left filler; the first block starts here.
    pub page_header: usize,
    /// Distance from a block start to its object bytes: header + left pad.
    pub head_pad: usize,
    /// Blocks carved out of each page.
    pub objects_per_page: usize,
    /// Total page bytes. The last block carries no trailing filler.
    pub page_size: usize,
}

/// Remainder-to-filler step: an already-aligned size gets a zero filler.
const fn filler(size: usize, alignment: usize) -> usize {
    let rem = size % alignment;
    if rem == 0 {
        0
    } else {
        alignment - rem
    }
}

impl BlockLayout {
    /// Solves the page geometry for `object_size` under `config`.
    #[must_use]
    pub fn compute(object_size: usize, config: &PoolConfig) -> Self {
        let header_size = config.header.size();
        let pad_bytes = config.pad_bytes;
        let head_pad = header_size + pad_bytes;
        let block_size = header_size + pad_bytes + object_size + pad_bytes;

        let (left_align, inter_align) = if config.alignment > 0 {
            (
                filler(PTR_WIDTH + head_pad, config.alignment),
                filler(block_size, config.alignment),
            )
        } else {
            (0, 0)
        };

        let page_header = PTR_WIDTH + left_align;
        let stride = block_size + inter_align;
        let page_size = page_header + config.objects_per_page * stride - inter_align;

        Self {
            object_size,
            header_size,
            pad_bytes,
            alignment: config.alignment,
            left_align,
            inter_align,
            block_size,
            stride,
            page_header,
            head_pad,
            objects_per_page: config.objects_per_page,
            page_size,
        }
    }

    /// Page-relative offset of block `k`'s object bytes.
    #[must_use]
    pub const fn object_offset(&self, k: usize) -> usize {
        self.page_header + self.head_pad + k * self.stride
    }

    /// Page-relative offset of the first block's object bytes.
    #[must_use]
    pub const fn first_object_offset(&self) -> usize {
        self.object_offset(0)
    }

    /// Bytes to reserve per page: the page itself plus slack for aligning
    /// the page base inside the buffer.
    #[must_use]
    pub const fn buffer_len(&self) -> usize {
        self.page_size + self.alignment.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeaderKind;

    #[test]
    fn test_unaligned_headerless_geometry() {
        // The canonical small pool: 16-byte objects, 4 per page, 2 guard
        // bytes each side, no header, no alignment.
        let config = PoolConfig {
            objects_per_page: 4,
            pad_bytes: 2,
            ..PoolConfig::default()
        };
        let layout = BlockLayout::compute(16, &config);

        assert_eq!(layout.head_pad, 2);
        assert_eq!(layout.block_size, 20);
        assert_eq!(layout.stride, 20);
        assert_eq!(layout.page_header, PTR_WIDTH);
        assert_eq!(layout.page_size, PTR_WIDTH + 4 * 20);
        assert_eq!(layout.first_object_offset(), PTR_WIDTH + 2);
        assert_eq!(layout.object_offset(3), PTR_WIDTH + 2 + 3 * 20);
        assert_eq!(layout.buffer_len(), layout.page_size);
    }

    #[test]
    fn test_aligned_geometry_places_objects_on_boundaries() {
        let config = PoolConfig {
            objects_per_page: 4,
            alignment: 8,
            header: HeaderKind::Basic,
            ..PoolConfig::default()
        };
        let layout = BlockLayout::compute(16, &config);

        // page front = 8 (link) + 5 (header) = 13 -> 3 bytes of filler
        assert_eq!(layout.left_align, 3);
        // block = 5 + 16 = 21 -> 3 bytes of gap
        assert_eq!(layout.inter_align, 3);
        assert_eq!(layout.stride, 24);

        for k in 0..4 {
            assert_eq!(layout.object_offset(k) % 8, 0);
        }
        // last block has no trailing gap
        assert_eq!(
            layout.page_size,
            layout.page_header + 4 * layout.stride - layout.inter_align
        );
        assert_eq!(layout.buffer_len(), layout.page_size + 7);
    }

    #[test]
    fn test_already_aligned_sizes_get_zero_filler() {
        let config = PoolConfig {
            objects_per_page: 2,
            alignment: 4,
            header: HeaderKind::External,
            ..PoolConfig::default()
        };
        // front = 8 + 8 = 16, block = 8 + 12 = 20; both divisible by 4
        let layout = BlockLayout::compute(12, &config);
        assert_eq!(layout.left_align, 0);
        assert_eq!(layout.inter_align, 0);
    }

    #[test]
    fn test_extended_header_widens_blocks() {
        let config = PoolConfig {
            objects_per_page: 1,
            header: HeaderKind::Extended { extra_bytes: 4 },
            pad_bytes: 1,
            ..PoolConfig::default()
        };
        let layout = BlockLayout::compute(32, &config);
        assert_eq!(layout.header_size, 11);
        assert_eq!(layout.head_pad, 12);
        assert_eq!(layout.block_size, 11 + 1 + 32 + 1);
    }
}
