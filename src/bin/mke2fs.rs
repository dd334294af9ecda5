//! `mke2fs`: builds a fresh, minimal ext2 image. Adapted from
//! `mutils`'s `mkfs::ext2::Ext2Factory`, reusing this crate's own
//! `Superblock`/`GroupDescriptor`/`Inode` codec types instead of a second,
//! parallel struct family — the one structural change from the teacher,
//! which has no sibling reader crate to share those types with.
//!
//! Present in the reference C project only as ad hoc test fixtures
//! (`tests/*.c` hand-building images in `tmpfile()`s); promoted here to a
//! real tool so `e2sh` has something to open.

use ext2fs::bitmap;
use ext2fs::dir;
use ext2fs::group_desc::{self, GroupDescriptor};
use ext2fs::inode::{self, Inode, EXT2_GOOD_OLD_FIRST_INO, EXT2_ROOT_INO, EXT2_S_IFDIR};
use ext2fs::superblock::{Superblock, EXT2_DYNAMIC_REV, EXT2_MAGIC, EXT2_VALID_FS};
use ext2fs::support::disk::disk_size_sectors;
use ext2fs::support::prompt::confirm;
use ext2fs::support::util::{ceil_division, timestamp_now, ByteSize};
use ext2fs::Filesystem;
use std::env;
use std::fs::OpenOptions;
use std::mem::size_of;
use std::process::exit;

/// The default block size in bytes. 1024 keeps small images (the common
/// case for this tool, since it has no use for multi-gigabyte disks)
/// well clear of the superblock's own 1024-byte footprint.
const DEFAULT_BLOCK_SIZE: u32 = 1024;
/// The default number of inodes per group.
const DEFAULT_INODES_PER_GROUP: u32 = 128;
/// The default number of blocks per group: one bitmap block's worth of
/// bits at the default block size.
const DEFAULT_BLOCKS_PER_GROUP: u32 = DEFAULT_BLOCK_SIZE * 8;

/// "Continue" error-handling action (`s_errors`).
const EXT2_ERRORS_CONTINUE: u16 = 1;

fn error<M: std::fmt::Display>(prog: &str, msg: M) -> ! {
    eprintln!("{prog}: error: {msg}");
    exit(1);
}

fn main() {
    let mut iter = env::args();
    let prog = iter.next().unwrap_or_else(|| "mke2fs".to_owned());
    let image_path = iter.next().unwrap_or_else(|| {
        error(&prog, "usage: mke2fs <image_file>");
    });

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&image_path)
        .unwrap_or_else(|e| error(&prog, format!("{image_path}: {e}")));

    if already_ext2(&mut file) {
        let proceed = confirm(format!(
            "{image_path} already contains an ext2 filesystem. Proceed anyway? (y/N) "
        ));
        if !proceed {
            eprintln!("Abort.");
            exit(1);
        }
    }

    let len = disk_size_sectors(&file).unwrap_or_else(|e| error(&prog, e)) * 512;
    if len == 0 {
        error(&prog, format!("{image_path}: empty device"));
    }

    create(&mut file, len).unwrap_or_else(|e| {
        error(&prog, format!("{image_path}: failed to create filesystem: {e}"));
    });
    finish_root(&mut file).unwrap_or_else(|e| {
        error(&prog, format!("{image_path}: failed to initialize root directory: {e}"));
    });

    println!("{image_path}: {} ext2 filesystem created", ByteSize(len));
}

/// Peeks at the superblock magic without disturbing anything else.
fn already_ext2(file: &mut std::fs::File) -> bool {
    Superblock::read(file).is_ok()
}

/// Lays out a minimal ext2 filesystem across `len` bytes of `dev`: the
/// superblock, the block group descriptor table, each group's block and
/// inode bitmaps (with metadata and the reserved inode range marked
/// used), and a root directory inode with an initialized `.`/`..` data
/// block.
fn create<D: std::io::Read + std::io::Write + std::io::Seek>(
    dev: &mut D,
    len: u64,
) -> ext2fs::Result<()> {
    let block_size = DEFAULT_BLOCK_SIZE;
    let inodes_per_group = DEFAULT_INODES_PER_GROUP;
    let blocks_per_group = DEFAULT_BLOCKS_PER_GROUP;
    let inode_size: u16 = 128;

    let total_blocks = (len / block_size as u64) as u32;
    let groups_count = ceil_division(total_blocks as u64, blocks_per_group as u64) as u32;
    let total_inodes = inodes_per_group * groups_count;
    let now = timestamp_now();

    let mut sb: Superblock = unsafe { std::mem::zeroed() };
    sb.s_inodes_count = total_inodes;
    sb.s_blocks_count = total_blocks;
    sb.s_first_data_block = if block_size == 1024 { 1 } else { 0 };
    sb.s_log_block_size = ext2fs::support::util::log2(block_size as u64).unwrap() - 10;
    sb.s_log_frag_size = sb.s_log_block_size;
    sb.s_blocks_per_group = blocks_per_group;
    sb.s_frags_per_group = blocks_per_group;
    sb.s_inodes_per_group = inodes_per_group;
    sb.s_mtime = now;
    sb.s_wtime = now;
    sb.s_magic = EXT2_MAGIC;
    sb.s_state = EXT2_VALID_FS;
    sb.s_errors = EXT2_ERRORS_CONTINUE;
    sb.s_lastcheck = now;
    sb.s_rev_level = EXT2_DYNAMIC_REV;
    sb.s_first_ino = EXT2_GOOD_OLD_FIRST_INO;
    sb.s_inode_size = inode_size;
    sb.s_uuid = *uuid::Uuid::new_v4().as_bytes();

    let inode_table_blocks =
        ceil_division(inodes_per_group as u64 * inode_size as u64, block_size as u64) as u32;
    // 1 block for the block bitmap, 1 for the inode bitmap, plus the
    // inode table — identical for every group in this minimal layout.
    let metadata_blocks_per_group = 2 + inode_table_blocks;

    let bgdt_block = group_desc::table_byte_offset(&sb) as u32 / block_size;
    let bgdt_blocks =
        ceil_division(groups_count as u64 * size_of::<GroupDescriptor>() as u64, block_size as u64)
            as u32;
    let metadata_end = bgdt_block + bgdt_blocks;

    // Reserved inodes 1..=10 (EXT2_GOOD_OLD_FIRST_INO - 1) are marked
    // used up front, including inode 2 (the root) created below.
    let reserved_inodes = EXT2_GOOD_OLD_FIRST_INO - 1;

    let mut table = Vec::with_capacity(groups_count as usize);
    for group in 0..groups_count {
        let group_first_block = sb.s_first_data_block + group * blocks_per_group;
        let metadata_off = metadata_end + group * metadata_blocks_per_group;

        let mut gd = GroupDescriptor::default();
        gd.bg_block_bitmap = metadata_off;
        gd.bg_inode_bitmap = metadata_off + 1;
        gd.bg_inode_table = metadata_off + 2;

        let used_blocks_end = metadata_off + metadata_blocks_per_group;
        let used_in_group = used_blocks_end.saturating_sub(group_first_block).min(blocks_per_group);
        let mut block_bm = vec![0u8; block_size as usize];
        for i in 0..used_in_group {
            bitmap::set_bit(&mut block_bm, i);
        }
        bitmap::write_bitmap(dev, gd.bg_block_bitmap, block_size, &block_bm)?;
        gd.bg_free_blocks_count = (blocks_per_group - used_in_group) as u16;

        let group_first_inode = group * inodes_per_group + 1;
        let used_inodes = if group_first_inode <= reserved_inodes {
            (reserved_inodes - group_first_inode + 1).min(inodes_per_group)
        } else {
            0
        };
        let mut inode_bm = vec![0u8; block_size as usize];
        for i in 0..used_inodes {
            bitmap::set_bit(&mut inode_bm, i);
        }
        bitmap::write_bitmap(dev, gd.bg_inode_bitmap, block_size, &inode_bm)?;
        gd.bg_free_inodes_count = (inodes_per_group - used_inodes) as u16;

        if (group_first_inode..group_first_inode + inodes_per_group).contains(&EXT2_ROOT_INO) {
            gd.bg_used_dirs_count = 1;
        }

        table.push(gd);
    }

    sb.s_free_blocks_count = table.iter().map(|gd| gd.bg_free_blocks_count as u32).sum();
    sb.s_free_inodes_count = table.iter().map(|gd| gd.bg_free_inodes_count as u32).sum();

    sb.write(dev)?;
    group_desc::write_group_descriptor_table(dev, &sb, &table)?;

    let mut root_inode = Inode::default();
    root_inode.i_mode = EXT2_S_IFDIR | 0o755;
    root_inode.i_links_count = 2;
    root_inode.i_atime = now;
    root_inode.i_ctime = now;
    root_inode.i_mtime = now;
    inode::write_inode(dev, &sb, table[0].bg_inode_table, EXT2_ROOT_INO, &root_inode)?;

    Ok(())
}

/// Allocates the root directory's data block through the freshly written
/// skeleton and fills it in with `.`/`..`. Split out from [`create`] so
/// the allocation — and the bitmap/descriptor/superblock write-through it
/// performs — goes through the same `Filesystem::allocate_block` the
/// rest of this crate uses, rather than a second copy of that logic.
fn finish_root<D: std::io::Read + std::io::Write + std::io::Seek>(dev: D) -> ext2fs::Result<D> {
    let mut fs = Filesystem::open(dev)?;
    let root_block = fs.allocate_block()?;
    let mut root_inode = fs.read_inode(EXT2_ROOT_INO)?;
    root_inode.i_size = fs.block_size();
    root_inode.i_blocks = fs.block_size() / 512;
    root_inode.i_block[0] = root_block;
    let block = dir::new_directory_block(fs.block_size(), EXT2_ROOT_INO, EXT2_ROOT_INO);
    ext2fs::dir::BlockStore::write_block(&mut fs, root_block, &block)?;
    fs.write_inode(EXT2_ROOT_INO, &root_inode)?;
    Ok(fs.into_inner())
}
