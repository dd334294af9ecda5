//! The filesystem context: owns the image transport, the in-memory
//! superblock and the in-memory block group descriptor table for the
//! duration of every operation, and ties the lower-level codecs together
//! into the directory-level API a caller actually wants (spec.md §3's
//! "Filesystem context").

use crate::alloc;
use crate::dir::{self, BlockStore, DirEntry};
use crate::error::{Error, ErrorKind, Result};
use crate::group_desc::{self, GroupDescriptor};
use crate::inode::{self, Inode, EXT2_S_IFDIR};
use crate::superblock::Superblock;
use std::io::{Read, Seek, Write};

/// A live handle onto an ext2 image: the transport plus the superblock
/// and BGDT read from it at open time.
///
/// `D` is the underlying transport, generic so the same engine runs
/// against a real `std::fs::File` or an in-memory `Cursor` in tests. A
/// `Filesystem` must not be shared across threads without external
/// synchronization (spec.md §5).
pub struct Filesystem<D> {
    dev: D,
    sb: Superblock,
    table: Vec<GroupDescriptor>,
}

impl<D: Read + Write + Seek> Filesystem<D> {
    /// Opens a filesystem context over `dev`: reads the superblock at
    /// offset 1024 (validating its magic) and then the block group
    /// descriptor table that follows it.
    pub fn open(mut dev: D) -> Result<Self> {
        let sb = Superblock::read(&mut dev)?;
        let table = group_desc::read_group_descriptor_table(&mut dev, &sb)?;
        Ok(Self { dev, sb, table })
    }

    /// The filesystem's block size in bytes.
    pub fn block_size(&self) -> u32 {
        self.sb.block_size()
    }

    /// Read-only access to the in-memory superblock.
    pub fn superblock(&self) -> &Superblock {
        &self.sb
    }

    /// Read-only access to the in-memory block group descriptor table.
    pub fn group_table(&self) -> &[GroupDescriptor] {
        &self.table
    }

    /// Consumes the context, handing back the underlying transport.
    pub fn into_inner(self) -> D {
        self.dev
    }

    /// Returns the block holding the inode table for the group that owns
    /// inode `number`.
    fn inode_table_block(&self, number: u32) -> Result<u32> {
        if number == 0 || number > self.sb.s_inodes_count {
            return Err(Error::new(ErrorKind::InvalidParameter));
        }
        let group = (number - 1) / self.sb.s_inodes_per_group;
        let gd = self
            .table
            .get(group as usize)
            .ok_or_else(|| Error::new(ErrorKind::InvalidParameter))?;
        Ok(gd.bg_inode_table)
    }

    /// Reads inode `number`.
    pub fn read_inode(&mut self, number: u32) -> Result<Inode> {
        let table_block = self.inode_table_block(number)?;
        inode::read_inode(&mut self.dev, &self.sb, table_block, number)
    }

    /// Writes inode `number` back to disk.
    pub fn write_inode(&mut self, number: u32, inode: &Inode) -> Result<()> {
        let table_block = self.inode_table_block(number)?;
        inode::write_inode(&mut self.dev, &self.sb, table_block, number, inode)
    }

    /// Allocates a free inode, writing through the bitmap, the owning
    /// group descriptor and the superblock in that order (spec.md §4.6).
    pub fn allocate_inode(&mut self) -> Result<u32> {
        alloc::allocate_inode(&mut self.dev, &mut self.sb, &mut self.table)
    }

    /// Allocates a free data block, writing through the same three
    /// records as `allocate_inode`.
    pub fn allocate_block(&mut self) -> Result<u32> {
        alloc::allocate_block(&mut self.dev, &mut self.sb, &mut self.table)
    }

    /// Lists every live entry in the direct blocks of directory inode
    /// `dir_inode_num`.
    pub fn list_directory_entries(&mut self, dir_inode_num: u32) -> Result<Vec<DirEntry>> {
        let dir_inode = self.read_inode(dir_inode_num)?;
        dir::list_directory_entries(self, &dir_inode)
    }

    /// Finds `name` directly inside `dir_inode_num`, returning its inode
    /// number or the sentinel `0`.
    pub fn find_entry_in_directory(&mut self, dir_inode_num: u32, name: &[u8]) -> Result<u32> {
        let dir_inode = self.read_inode(dir_inode_num)?;
        dir::find_entry_in_directory(self, &dir_inode, name)
    }

    /// Resolves an absolute path to an inode number, starting at the root
    /// (inode 2). Returns `0` if any path component is missing; `"/"`
    /// always resolves to `2` (spec.md §4.7, P8).
    pub fn get_inode_for_path(&mut self, path: &str) -> Result<u32> {
        if path == "/" {
            return Ok(inode::EXT2_ROOT_INO);
        }
        let mut current = inode::EXT2_ROOT_INO;
        for component in dir::path_components(path) {
            current = self.find_entry_in_directory(current, component.as_bytes())?;
            if current == 0 {
                return Ok(0);
            }
        }
        Ok(current)
    }

    /// Creates a subdirectory named `name` inside `parent_inode_num`,
    /// returning the new inode's number (spec.md §4.7).
    ///
    /// Allocates a new inode and a new data block, initializes the block
    /// with `.`/`..`, links the entry into the parent's direct blocks
    /// (allocating a further block there if none has room), and bumps the
    /// parent's link count for the child's `..`. No rollback is attempted
    /// if a later step fails after an earlier one has already committed
    /// (spec.md §4.7, §9).
    pub fn create_directory(&mut self, parent_inode_num: u32, name: &str) -> Result<u32> {
        if name.len() > dir::EXT2_NAME_LEN {
            return Err(Error::new(ErrorKind::InvalidParameter));
        }

        let new_inode_num = self.allocate_inode()?;
        let new_block_num = self.allocate_block()?;

        let block_size = self.block_size();
        let now = crate::support::util::timestamp_now();

        let mut new_inode = Inode::default();
        new_inode.i_mode = EXT2_S_IFDIR | 0o755;
        new_inode.i_links_count = 2;
        new_inode.i_size = block_size;
        new_inode.i_blocks = block_size / 512;
        new_inode.i_atime = now;
        new_inode.i_ctime = now;
        new_inode.i_mtime = now;
        new_inode.i_block[0] = new_block_num;

        let block = dir::new_directory_block(block_size, new_inode_num, parent_inode_num);
        self.write_block(new_block_num, &block)?;

        let mut parent_inode = self.read_inode(parent_inode_num)?;
        if !parent_inode.is_dir() {
            return Err(Error::new(ErrorKind::NotADirectory));
        }
        dir::add_directory_entry(
            self,
            &mut parent_inode,
            new_inode_num,
            name.as_bytes(),
            dir::EXT2_FT_DIR,
        )?;
        parent_inode.i_links_count += 1;
        parent_inode.i_mtime = now;
        parent_inode.i_ctime = now;
        self.write_inode(parent_inode_num, &parent_inode)?;

        self.write_inode(new_inode_num, &new_inode)?;

        Ok(new_inode_num)
    }
}

impl<D: Read + Write + Seek> BlockStore for Filesystem<D> {
    fn block_size(&self) -> u32 {
        self.sb.block_size()
    }

    fn read_block(&mut self, block_id: u32) -> Result<Vec<u8>> {
        let block_size = self.block_size() as u64;
        self.dev.seek(std::io::SeekFrom::Start(block_id as u64 * block_size))?;
        let mut buf = vec![0u8; block_size as usize];
        self.dev.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn write_block(&mut self, block_id: u32, data: &[u8]) -> Result<()> {
        let block_size = self.block_size() as u64;
        self.dev.seek(std::io::SeekFrom::Start(block_id as u64 * block_size))?;
        self.dev.write_all(data)?;
        Ok(())
    }

    fn allocate_block(&mut self) -> Result<u32> {
        alloc::allocate_block(&mut self.dev, &mut self.sb, &mut self.table)
    }
}
