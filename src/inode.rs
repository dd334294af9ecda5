//! Inodes: the fixed-size records describing every file, directory, and
//! symlink in the filesystem.

use crate::error::{Error, ErrorKind, Result};
use crate::superblock::Superblock;
use std::io::{Read, Seek, SeekFrom, Write};
use std::mem::size_of;
use std::slice;

/// File type bits within `i_mode` (`i_mode & EXT2_S_IFMT`).
pub const EXT2_S_IFMT: u16 = 0xf000;
pub const EXT2_S_IFDIR: u16 = 0x4000;
pub const EXT2_S_IFREG: u16 = 0x8000;
pub const EXT2_S_IFLNK: u16 = 0xa000;

/// The root directory is always inode 2.
pub const EXT2_ROOT_INO: u32 = 2;
/// The first inode number a real filesystem object may use.
pub const EXT2_GOOD_OLD_FIRST_INO: u32 = 11;

/// The on-disk (revision 0) inode record, 128 bytes.
///
/// `i_osd1`/`i_osd2` are operating-system-dependent fields; this crate
/// never interprets them and only preserves whatever bytes were already
/// there on write (spec.md §4.5).
/// `#[repr(C)]`, not packed: every field already falls on a boundary its
/// type aligns to (see `Superblock`'s doc comment), so plain field
/// references work.
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct Inode {
    pub i_mode: u16,
    pub i_uid: u16,
    pub i_size: u32,
    pub i_atime: u32,
    pub i_ctime: u32,
    pub i_mtime: u32,
    pub i_dtime: u32,
    pub i_gid: u16,
    pub i_links_count: u16,
    pub i_blocks: u32,
    pub i_flags: u32,
    pub i_osd1: u32,
    pub i_block: [u32; 15],
    pub i_generation: u32,
    pub i_file_acl: u32,
    pub i_dir_acl: u32,
    pub i_faddr: u32,
    pub i_osd2: [u8; 12],
}

impl Inode {
    /// The `EXT2_S_IFMT`-masked file type.
    pub fn file_type(&self) -> u16 {
        self.i_mode & EXT2_S_IFMT
    }

    /// Whether this inode describes a directory.
    pub fn is_dir(&self) -> bool {
        self.file_type() == EXT2_S_IFDIR
    }
}

/// Computes the disk offset of inode `number`'s record, validating that it
/// falls within `1..=s_inodes_count`.
///
/// Inode numbers are 1-based; inode `n` lives at index `n - 1` within its
/// group's inode table.
pub fn inode_disk_offset(sb: &Superblock, table_block: u32, number: u32) -> Result<u64> {
    if number == 0 || number > sb.s_inodes_count {
        return Err(Error::new(ErrorKind::InvalidParameter));
    }
    let local_index = (number - 1) % sb.s_inodes_per_group;
    let block_size = sb.block_size() as u64;
    let table_offset = table_block as u64 * block_size;
    Ok(table_offset + local_index as u64 * sb.inode_size() as u64)
}

/// Reads inode `number` out of the group whose inode table starts at
/// `table_block`.
pub fn read_inode<D: Read + Seek>(
    dev: &mut D,
    sb: &Superblock,
    table_block: u32,
    number: u32,
) -> Result<Inode> {
    let offset = inode_disk_offset(sb, table_block, number)?;
    dev.seek(SeekFrom::Start(offset))?;
    let mut inode = Inode::default();
    let buf =
        unsafe { slice::from_raw_parts_mut(&mut inode as *mut _ as *mut u8, size_of::<Inode>()) };
    dev.read_exact(buf)?;
    Ok(inode)
}

/// Writes inode `number` into the group whose inode table starts at
/// `table_block`. Only the base 128-byte record is touched; any trailing
/// bytes of a larger `s_inode_size` record are left untouched.
pub fn write_inode<D: Write + Seek>(
    dev: &mut D,
    sb: &Superblock,
    table_block: u32,
    number: u32,
    inode: &Inode,
) -> Result<()> {
    let offset = inode_disk_offset(sb, table_block, number)?;
    dev.seek(SeekFrom::Start(offset))?;
    let buf = unsafe { slice::from_raw_parts(inode as *const _ as *const u8, size_of::<Inode>()) };
    dev.write_all(buf)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn test_sb() -> Superblock {
        let mut sb: Superblock = unsafe { std::mem::zeroed() };
        sb.s_magic = crate::superblock::EXT2_MAGIC;
        sb.s_inodes_count = 32;
        sb.s_inodes_per_group = 16;
        sb.s_rev_level = crate::superblock::EXT2_DYNAMIC_REV;
        sb.s_inode_size = 128;
        sb.s_log_block_size = 0;
        sb
    }

    #[test]
    fn offset_rejects_inode_zero() {
        let sb = test_sb();
        assert!(matches!(
            inode_disk_offset(&sb, 5, 0).unwrap_err().kind(),
            ErrorKind::InvalidParameter
        ));
    }

    #[test]
    fn offset_rejects_out_of_range() {
        let sb = test_sb();
        assert!(matches!(
            inode_disk_offset(&sb, 5, 33).unwrap_err().kind(),
            ErrorKind::InvalidParameter
        ));
    }

    #[test]
    fn offset_of_first_inode_in_group() {
        let sb = test_sb();
        let offset = inode_disk_offset(&sb, 5, 17).unwrap();
        assert_eq!(offset, 5 * 1024);
    }

    #[test]
    fn round_trip() {
        let sb = test_sb();
        let mut img = Cursor::new(vec![0u8; 1024 * 20]);
        let mut inode = Inode::default();
        inode.i_mode = EXT2_S_IFDIR;
        inode.i_size = 1024;
        inode.i_links_count = 2;
        write_inode(&mut img, &sb, 5, 2, &inode).unwrap();
        let read_back = read_inode(&mut img, &sb, 5, 2).unwrap();
        assert!(read_back.is_dir());
        assert_eq!(read_back.i_size, 1024);
        assert_eq!(read_back.i_links_count, 2);
    }
}
