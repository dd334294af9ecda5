//! The ext2 superblock: the filesystem's root metadata record, always found
//! 1024 bytes into the image regardless of block size.

use crate::error::{Error, ErrorKind, Result};
use std::io::{Read, Seek, SeekFrom, Write};
use std::mem::size_of;
use std::slice;

/// Byte offset of the superblock from the start of the image.
pub const SUPERBLOCK_OFFSET: u64 = 1024;
/// The filesystem's magic number.
pub const EXT2_MAGIC: u16 = 0xef53;

/// Filesystem state: cleanly unmounted.
pub const EXT2_VALID_FS: u16 = 1;
/// Filesystem state: errors were detected.
pub const EXT2_ERROR_FS: u16 = 2;

/// Revision 0: the original, fixed-size (128 byte) inode format.
pub const EXT2_GOOD_OLD_REV: u32 = 0;
/// Revision 1: dynamic inode sizes, extended attributes, ...
pub const EXT2_DYNAMIC_REV: u32 = 1;

/// The inode size assumed for revision 0 filesystems, which carry no
/// `s_inode_size` field worth trusting.
const GOOD_OLD_INODE_SIZE: u16 = 128;

/// The ext2 superblock (1024 bytes, including trailing padding).
///
/// Field names follow the on-disk `s_*` convention rather than a
/// reinterpreted English vocabulary, since callers reason about this type
/// directly against the ext2 specification.
/// Every field here falls on a boundary its own type already aligns to, so
/// this is a plain `#[repr(C)]` rather than a packed struct: reading it
/// straight off disk needs no padding removal, and callers can take
/// ordinary references to its fields (`assert_eq!`, `{}`, ...) without
/// tripping the unaligned-reference restriction a packed layout would
/// impose.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Superblock {
    pub s_inodes_count: u32,
    pub s_blocks_count: u32,
    pub s_r_blocks_count: u32,
    pub s_free_blocks_count: u32,
    pub s_free_inodes_count: u32,
    pub s_first_data_block: u32,
    pub s_log_block_size: u32,
    pub s_log_frag_size: u32,
    pub s_blocks_per_group: u32,
    pub s_frags_per_group: u32,
    pub s_inodes_per_group: u32,
    pub s_mtime: u32,
    pub s_wtime: u32,
    pub s_mnt_count: u16,
    pub s_max_mnt_count: u16,
    pub s_magic: u16,
    pub s_state: u16,
    pub s_errors: u16,
    pub s_minor_rev_level: u16,
    pub s_lastcheck: u32,
    pub s_checkinterval: u32,
    pub s_creator_os: u32,
    pub s_rev_level: u32,
    pub s_def_resuid: u16,
    pub s_def_resgid: u16,

    // Extended superblock fields (revision >= EXT2_DYNAMIC_REV).
    pub s_first_ino: u32,
    pub s_inode_size: u16,
    pub s_block_group_nr: u16,
    pub s_feature_compat: u32,
    pub s_feature_incompat: u32,
    pub s_feature_ro_compat: u32,
    pub s_uuid: [u8; 16],
    pub s_volume_name: [u8; 16],
    pub s_last_mounted: [u8; 64],
    pub s_algo_bitmap: u32,
    pub s_prealloc_blocks: u8,
    pub s_prealloc_dir_blocks: u8,
    pub s_reserved_gdt_blocks: u16,
    pub s_journal_uuid: [u8; 16],
    pub s_journal_inum: u32,
    pub s_journal_dev: u32,
    pub s_last_orphan: u32,

    /// Padding to a full 1024 bytes: HTREE hash seed, journal backup,
    /// 64-bit extensions, quotas, error logs, ... none of which this crate
    /// reads or writes (no journaling, no checksums, no quotas — see
    /// spec.md §1 Non-goals).
    _reserved: [u8; 788],
}

impl Superblock {
    /// Reads the superblock at offset 1024, validating its magic number.
    pub fn read<D: Read + Seek>(dev: &mut D) -> Result<Self> {
        dev.seek(SeekFrom::Start(SUPERBLOCK_OFFSET))?;
        let mut sb: Self = unsafe { std::mem::zeroed() };
        let buf = unsafe {
            slice::from_raw_parts_mut(&mut sb as *mut _ as *mut u8, size_of::<Self>())
        };
        dev.read_exact(buf)?;
        if sb.s_magic != EXT2_MAGIC {
            return Err(Error::new(ErrorKind::BadMagic));
        }
        Ok(sb)
    }

    /// Writes the superblock back at offset 1024. Refuses to write a
    /// superblock whose magic number is not `0xEF53`.
    pub fn write<D: Write + Seek>(&self, dev: &mut D) -> Result<()> {
        if self.s_magic != EXT2_MAGIC {
            return Err(Error::new(ErrorKind::BadMagic));
        }
        dev.seek(SeekFrom::Start(SUPERBLOCK_OFFSET))?;
        let buf =
            unsafe { slice::from_raw_parts(self as *const _ as *const u8, size_of::<Self>()) };
        dev.write_all(buf)?;
        Ok(())
    }

    /// The block size in bytes: `1024 << s_log_block_size`.
    pub fn block_size(&self) -> u32 {
        1024u32 << self.s_log_block_size
    }

    /// The fragment size in bytes: `1024 << s_log_frag_size`.
    pub fn fragment_size(&self) -> u32 {
        1024u32 << self.s_log_frag_size
    }

    /// The number of block groups, `ceil(s_blocks_count / s_blocks_per_group)`.
    /// `0` when `s_blocks_per_group` is `0`.
    pub fn group_count(&self) -> u32 {
        if self.s_blocks_per_group == 0 {
            0
        } else {
            self.s_blocks_count.div_ceil(self.s_blocks_per_group)
        }
    }

    /// The number of block groups derived from the inode count instead of
    /// the block count. Used only to cross-check against `group_count` —
    /// the block-derived count is authoritative (spec.md §4.3).
    pub fn group_count_by_inodes(&self) -> u32 {
        if self.s_inodes_per_group == 0 {
            0
        } else {
            self.s_inodes_count.div_ceil(self.s_inodes_per_group)
        }
    }

    /// The on-disk size of one inode record: `s_inode_size` for revision 1+,
    /// the fixed 128 bytes of revision 0 otherwise.
    pub fn inode_size(&self) -> u16 {
        if self.s_rev_level >= EXT2_DYNAMIC_REV {
            self.s_inode_size
        } else {
            GOOD_OLD_INODE_SIZE
        }
    }
}
