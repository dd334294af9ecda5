//! Property-based checks for the invariants that hold across every input,
//! not just the worked examples covered by the per-module `#[cfg(test)]`
//! suites: bitmap round-tripping, bit twiddling, group-count arithmetic,
//! directory record-length alignment and superblock round-tripping.
//!
//! New ambient tooling grounded in the wider retrieval pack rather than
//! the teacher crate itself, which has no property tests of its own.

use ext2fs::bitmap;
use ext2fs::dir::dir_rec_len;
use ext2fs::group_desc::{self, GroupDescriptor};
use ext2fs::superblock::{Superblock, EXT2_DYNAMIC_REV, EXT2_MAGIC};
use proptest::prelude::*;
use std::io::Cursor;

fn blank_superblock() -> Superblock {
    unsafe { std::mem::zeroed() }
}

proptest! {
    /// P1: writing a full block-size bitmap and reading it back yields the
    /// same bytes.
    #[test]
    fn bitmap_round_trips(bytes in proptest::collection::vec(any::<u8>(), 1024)) {
        let block_size = 1024u32;
        let mut img = Cursor::new(vec![0u8; block_size as usize * 4]);
        bitmap::write_bitmap(&mut img, 1, block_size, &bytes).unwrap();
        let read_back = bitmap::read_bitmap(&mut img, 1, block_size).unwrap();
        prop_assert_eq!(read_back, bytes);
    }

    /// P2 (part 1): setting then clearing a bit restores its byte exactly.
    #[test]
    fn set_then_clear_restores_byte(i in 0u32..256) {
        let mut bm = vec![0u8; 32];
        let before = bm[(i / 8) as usize];
        bitmap::set_bit(&mut bm, i);
        bitmap::clear_bit(&mut bm, i);
        prop_assert_eq!(bm[(i / 8) as usize], before);
    }

    /// P2 (part 2): an all-1 prefix of length `k` followed by a 0 bit at
    /// `k` makes `find_first_free_bit` return exactly `k`.
    #[test]
    fn finds_boundary_free_bit(k in 0u32..128) {
        let mut bm = vec![0xffu8; 32];
        bitmap::clear_bit(&mut bm, k);
        prop_assert_eq!(bitmap::find_first_free_bit(&bm, 256), Some(k));
    }

    /// P4: group_count is the ceiling division of blocks_count by
    /// blocks_per_group, and 0 whenever blocks_per_group is 0.
    #[test]
    fn group_count_matches_ceil_division(blocks_count in 0u32..100_000, blocks_per_group in 0u32..5000) {
        let mut sb = blank_superblock();
        sb.s_blocks_count = blocks_count;
        sb.s_blocks_per_group = blocks_per_group;
        if blocks_per_group == 0 {
            prop_assert_eq!(sb.group_count(), 0);
        } else {
            let expected = blocks_count.div_ceil(blocks_per_group);
            prop_assert_eq!(sb.group_count(), expected);
        }
    }

    /// P5: EXT2_DIR_REC_LEN is always 4-byte aligned and large enough to
    /// hold its fixed header plus the name.
    #[test]
    fn dir_rec_len_is_aligned_and_sufficient(name_len in 0usize..=255) {
        let len = dir_rec_len(name_len);
        prop_assert_eq!(len % 4, 0);
        prop_assert!(len as usize >= 8 + name_len);
    }

    /// P6: a superblock with a valid magic survives a write/read round trip
    /// unchanged in every field this crate cares about.
    #[test]
    fn superblock_round_trips(
        inodes_count in any::<u32>(),
        blocks_count in any::<u32>(),
        free_blocks in any::<u32>(),
        free_inodes in any::<u32>(),
        blocks_per_group in 1u32..100_000,
        inodes_per_group in 1u32..100_000,
    ) {
        let mut sb = blank_superblock();
        sb.s_magic = EXT2_MAGIC;
        sb.s_rev_level = EXT2_DYNAMIC_REV;
        sb.s_inode_size = 128;
        sb.s_inodes_count = inodes_count;
        sb.s_blocks_count = blocks_count;
        sb.s_free_blocks_count = free_blocks;
        sb.s_free_inodes_count = free_inodes;
        sb.s_blocks_per_group = blocks_per_group;
        sb.s_inodes_per_group = inodes_per_group;

        let mut img = Cursor::new(vec![0u8; 4096]);
        sb.write(&mut img).unwrap();
        let sb2 = Superblock::read(&mut img).unwrap();

        prop_assert_eq!(sb2.s_inodes_count, inodes_count);
        prop_assert_eq!(sb2.s_blocks_count, blocks_count);
        prop_assert_eq!(sb2.s_free_blocks_count, free_blocks);
        prop_assert_eq!(sb2.s_free_inodes_count, free_inodes);
        prop_assert_eq!(sb2.s_blocks_per_group, blocks_per_group);
        prop_assert_eq!(sb2.s_inodes_per_group, inodes_per_group);
    }

    /// P7: a successful inode allocation decrements the superblock's and
    /// the owning group's free-inode counters by exactly 1, and the
    /// corresponding bit in that group's inode bitmap ends up set.
    #[test]
    fn allocation_decrements_matching_counters(
        inodes_per_group in 8u32..64,
        groups in 1u32..4,
    ) {
        let block_size = 1024u32;
        let mut sb = blank_superblock();
        sb.s_magic = EXT2_MAGIC;
        sb.s_inodes_per_group = inodes_per_group;
        sb.s_blocks_per_group = inodes_per_group;
        sb.s_inodes_count = inodes_per_group * groups;
        sb.s_blocks_count = inodes_per_group * groups;
        sb.s_free_inodes_count = sb.s_inodes_count;
        sb.s_first_data_block = 1;

        let mut img = Cursor::new(vec![0u8; block_size as usize * (8 + groups as usize * 4)]);
        let mut table = Vec::new();
        for g in 0..groups {
            let mut gd = GroupDescriptor::default();
            gd.bg_inode_bitmap = 4 + g;
            gd.bg_free_inodes_count = inodes_per_group as u16;
            bitmap::write_bitmap(&mut img, gd.bg_inode_bitmap, block_size, &vec![0u8; block_size as usize]).unwrap();
            table.push(gd);
        }
        sb.write(&mut img).unwrap();
        group_desc::write_group_descriptor_table(&mut img, &sb, &table).unwrap();

        let new_inode_num = ext2fs::alloc::allocate_inode(&mut img, &mut sb, &mut table).unwrap();
        let group = (new_inode_num - 1) / inodes_per_group;
        let bit = (new_inode_num - 1) % inodes_per_group;

        prop_assert_eq!(sb.s_free_inodes_count, sb.s_inodes_count - 1);
        prop_assert_eq!(table[group as usize].bg_free_inodes_count, inodes_per_group as u16 - 1);

        let bm = bitmap::read_bitmap(&mut img, table[group as usize].bg_inode_bitmap, block_size).unwrap();
        prop_assert!(bitmap::is_set(&bm, bit));
    }
}
