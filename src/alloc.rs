//! Inode and block allocation.
//!
//! Both allocators follow the same shape: scan the group descriptor table
//! for a group with room, flip one bit in that group's bitmap, then
//! persist the change bottom-up — bitmap, then group descriptor, then
//! superblock. If a crash (or a simulated I/O failure in tests) happens
//! between any two of these writes, the bitmap is always at least as
//! allocated as the counters claim, never less; nothing rolls back
//! (spec.md §4.6).

use crate::bitmap;
use crate::error::{Error, ErrorKind, Result};
use crate::group_desc::{self, GroupDescriptor};
use crate::superblock::Superblock;
use std::io::{Read, Seek, Write};

/// Allocates a free inode, returning its 1-based inode number.
///
/// Groups are scanned in order for one whose `bg_free_inodes_count` is
/// nonzero; the inode bitmap's bit count is `s_inodes_per_group`, matching
/// the reference implementation.
pub fn allocate_inode<D: Read + Write + Seek>(
    dev: &mut D,
    sb: &mut Superblock,
    table: &mut [GroupDescriptor],
) -> Result<u32> {
    for (group, gd) in table.iter_mut().enumerate() {
        if gd.bg_free_inodes_count == 0 {
            continue;
        }
        let mut bm = bitmap::read_bitmap(dev, gd.bg_inode_bitmap, sb.block_size())?;
        let Some(bit) = bitmap::find_first_free_bit(&bm, sb.s_inodes_per_group) else {
            continue;
        };
        bitmap::set_bit(&mut bm, bit);
        bitmap::write_bitmap(dev, gd.bg_inode_bitmap, sb.block_size(), &bm)?;

        gd.bg_free_inodes_count -= 1;
        group_desc::write_group_descriptor(dev, sb, group as u32, gd)?;

        sb.s_free_inodes_count -= 1;
        sb.write(dev)?;

        return Ok(group as u32 * sb.s_inodes_per_group + bit + 1);
    }
    Err(Error::new(ErrorKind::NoSpace))
}

/// Allocates a free block, returning its block number.
///
/// Groups are scanned in order for one whose `bg_free_blocks_count` is
/// nonzero; the block bitmap's bit count is `s_blocks_per_group` — the
/// reference C implementation passes `s_inodes_per_group` here instead,
/// which under-scans (or over-scans) any filesystem where the two group
/// sizes differ. This is treated as a defect to avoid, not a behavior to
/// reproduce (spec.md §9).
pub fn allocate_block<D: Read + Write + Seek>(
    dev: &mut D,
    sb: &mut Superblock,
    table: &mut [GroupDescriptor],
) -> Result<u32> {
    for (group, gd) in table.iter_mut().enumerate() {
        if gd.bg_free_blocks_count == 0 {
            continue;
        }
        let mut bm = bitmap::read_bitmap(dev, gd.bg_block_bitmap, sb.block_size())?;
        let Some(bit) = bitmap::find_first_free_bit(&bm, sb.s_blocks_per_group) else {
            continue;
        };
        bitmap::set_bit(&mut bm, bit);
        bitmap::write_bitmap(dev, gd.bg_block_bitmap, sb.block_size(), &bm)?;

        gd.bg_free_blocks_count -= 1;
        group_desc::write_group_descriptor(dev, sb, group as u32, gd)?;

        sb.s_free_blocks_count -= 1;
        sb.write(dev)?;

        return Ok(sb.s_first_data_block + group as u32 * sb.s_blocks_per_group + bit);
    }
    Err(Error::new(ErrorKind::NoSpace))
}
