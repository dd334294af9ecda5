//! Block group descriptors: one 32-byte record per block group, packed
//! contiguously into the table that immediately follows the superblock's
//! block.

use crate::error::Result;
use crate::superblock::Superblock;
use std::io::{Read, Seek, SeekFrom, Write};
use std::mem::size_of;
use std::slice;

/// A single block group descriptor.
///
/// `#[repr(C)]`, not packed: every field already falls on a boundary its
/// type aligns to (see `Superblock`'s doc comment), so plain field
/// references work.
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct GroupDescriptor {
    pub bg_block_bitmap: u32,
    pub bg_inode_bitmap: u32,
    pub bg_inode_table: u32,
    pub bg_free_blocks_count: u16,
    pub bg_free_inodes_count: u16,
    pub bg_used_dirs_count: u16,
    pub bg_pad: u16,
    pub bg_reserved: [u32; 3],
}

/// Returns the byte offset of the block group descriptor table: the block
/// immediately following the one holding the superblock.
///
/// For a 1024-byte block size, the superblock occupies block 1 and the
/// table starts at block 2; for larger block sizes, both live in block 0
/// and the table starts at block 1.
pub fn table_byte_offset(sb: &Superblock) -> u64 {
    let block_size = sb.block_size() as u64;
    if block_size == 1024 {
        2 * block_size
    } else {
        block_size
    }
}

/// Returns the byte offset of the `index`-th descriptor (0-based) within
/// the table.
pub fn descriptor_offset(sb: &Superblock, index: u32) -> u64 {
    table_byte_offset(sb) + index as u64 * size_of::<GroupDescriptor>() as u64
}

/// Reads the descriptor for block group `index`.
pub fn read_group_descriptor<D: Read + Seek>(
    dev: &mut D,
    sb: &Superblock,
    index: u32,
) -> Result<GroupDescriptor> {
    dev.seek(SeekFrom::Start(descriptor_offset(sb, index)))?;
    let mut gd = GroupDescriptor::default();
    let buf =
        unsafe { slice::from_raw_parts_mut(&mut gd as *mut _ as *mut u8, size_of::<GroupDescriptor>()) };
    dev.read_exact(buf)?;
    Ok(gd)
}

/// Writes the descriptor for block group `index`.
pub fn write_group_descriptor<D: Write + Seek>(
    dev: &mut D,
    sb: &Superblock,
    index: u32,
    gd: &GroupDescriptor,
) -> Result<()> {
    dev.seek(SeekFrom::Start(descriptor_offset(sb, index)))?;
    let buf =
        unsafe { slice::from_raw_parts(gd as *const _ as *const u8, size_of::<GroupDescriptor>()) };
    dev.write_all(buf)?;
    Ok(())
}

/// Reads the entire block group descriptor table.
///
/// The group count is derived from `s_blocks_count`; if the inode-derived
/// count disagrees, the block-derived count still wins (spec.md §4.3) and
/// the mismatch is only a latent inconsistency in the superblock, not a
/// reason to fail the read.
pub fn read_group_descriptor_table<D: Read + Seek>(
    dev: &mut D,
    sb: &Superblock,
) -> Result<Vec<GroupDescriptor>> {
    let count = sb.group_count();
    let by_inodes = sb.group_count_by_inodes();
    if by_inodes != count {
        eprintln!(
            "warning: block group count mismatch: {count} by blocks vs {by_inodes} by inodes; using {count}"
        );
    }
    let mut table = Vec::with_capacity(count as usize);
    for i in 0..count {
        table.push(read_group_descriptor(dev, sb, i)?);
    }
    Ok(table)
}

/// Writes the entire block group descriptor table.
pub fn write_group_descriptor_table<D: Write + Seek>(
    dev: &mut D,
    sb: &Superblock,
    table: &[GroupDescriptor],
) -> Result<()> {
    for (i, gd) in table.iter().enumerate() {
        write_group_descriptor(dev, sb, i as u32, gd)?;
    }
    Ok(())
}
