//! Directory entries: the variable-length records packed into a
//! directory's data blocks, plus the traversal, lookup, path resolution
//! and insertion routines built on top of them.

use crate::error::{Error, ErrorKind, Result};
use crate::inode::EXT2_S_IFDIR;

/// Maximum length of a directory entry's name.
pub const EXT2_NAME_LEN: usize = 255;

/// File type tag stored alongside a directory entry's inode number.
pub const EXT2_FT_UNKNOWN: u8 = 0;
pub const EXT2_FT_REG_FILE: u8 = 1;
pub const EXT2_FT_DIR: u8 = 2;
pub const EXT2_FT_CHRDEV: u8 = 3;
pub const EXT2_FT_BLKDEV: u8 = 4;
pub const EXT2_FT_FIFO: u8 = 5;
pub const EXT2_FT_SOCK: u8 = 6;
pub const EXT2_FT_SYMLINK: u8 = 7;

/// Number of direct block pointers in `i_block`; indirect pointers are out
/// of scope (spec.md §1 Non-goals).
pub const EXT2_NDIR_BLOCKS: usize = 12;

/// The 4-byte-aligned size of a directory entry holding a name of
/// `name_len` bytes: 8 bytes of fixed fields plus the name, rounded up.
pub fn dir_rec_len(name_len: usize) -> u16 {
    ((name_len + 8 + 3) & !3) as u16
}

/// A directory entry decoded from a directory data block.
///
/// Entries are read out of a byte slice rather than cast from a raw
/// pointer: `rec_len`, `name_len` and the name span are all validated
/// against the slice's bounds as they are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub inode: u32,
    pub rec_len: u16,
    pub name_len: u8,
    pub file_type: u8,
    pub name: Vec<u8>,
}

impl DirEntry {
    /// Decodes one entry at `offset` within `block`. Returns `None` if the
    /// entry's `rec_len` is `0` (the mid-block corruption guard, spec.md
    /// §4.7) or if the fixed header does not fit in what remains of the
    /// block.
    fn decode(block: &[u8], offset: usize) -> Option<Self> {
        if offset + 8 > block.len() {
            return None;
        }
        let inode = u32::from_le_bytes(block[offset..offset + 4].try_into().unwrap());
        let rec_len = u16::from_le_bytes(block[offset + 4..offset + 6].try_into().unwrap());
        if rec_len == 0 {
            eprintln!(
                "warning: directory entry with rec_len == 0 at block offset {offset}; \
                 skipping the rest of this block"
            );
            return None;
        }
        let name_len = block[offset + 6];
        let file_type = block[offset + 7];
        let name_start = offset + 8;
        let name_end = (name_start + name_len as usize).min(block.len());
        let name = block[name_start..name_end].to_vec();
        Some(Self { inode, rec_len, name_len, file_type, name })
    }

    /// Encodes this entry's fixed header and name at `offset` within
    /// `block`. The trailing padding up to `rec_len` is left untouched by
    /// the caller (new blocks are zero-initialized; split entries reuse
    /// whatever bytes were already there).
    fn encode(&self, block: &mut [u8], offset: usize) {
        block[offset..offset + 4].copy_from_slice(&self.inode.to_le_bytes());
        block[offset + 4..offset + 6].copy_from_slice(&self.rec_len.to_le_bytes());
        block[offset + 6] = self.name_len;
        block[offset + 7] = self.file_type;
        let name_start = offset + 8;
        block[name_start..name_start + self.name.len()].copy_from_slice(&self.name);
    }
}

/// A cursor walking the variable-length entry stream of one directory data
/// block, stopping at the block boundary or at the first `rec_len == 0`
/// (spec.md §4.7's corruption guard).
struct BlockCursor<'a> {
    block: &'a [u8],
    offset: usize,
}

impl<'a> BlockCursor<'a> {
    fn new(block: &'a [u8]) -> Self {
        Self { block, offset: 0 }
    }
}

impl Iterator for BlockCursor<'_> {
    type Item = DirEntry;

    fn next(&mut self) -> Option<DirEntry> {
        if self.offset >= self.block.len() {
            return None;
        }
        let entry = DirEntry::decode(self.block, self.offset)?;
        self.offset += entry.rec_len as usize;
        Some(entry)
    }
}

/// Anything that can hand back a block-sized buffer and later accept a
/// mutated copy of it — the slice of the filesystem context a directory
/// operation actually needs, kept narrow so tests can exercise the dir
/// logic over a plain in-memory blob.
pub trait BlockStore {
    fn block_size(&self) -> u32;
    fn read_block(&mut self, block_id: u32) -> Result<Vec<u8>>;
    fn write_block(&mut self, block_id: u32, data: &[u8]) -> Result<()>;
    fn allocate_block(&mut self) -> Result<u32>;
}

/// Lists every live entry across a directory's direct data blocks.
///
/// `dir_inode` must be a directory (`ErrorKind::NotADirectory` otherwise).
/// A `rec_len == 0` mid-block stops parsing that block only; blocks after
/// it are still walked (spec.md §4.7, §7 `Corruption`).
pub fn list_directory_entries<S: BlockStore>(
    store: &mut S,
    dir_inode: &crate::inode::Inode,
) -> Result<Vec<DirEntry>> {
    if !dir_inode.is_dir() {
        return Err(Error::new(ErrorKind::NotADirectory));
    }
    let mut entries = Vec::new();
    for &block_id in dir_inode.i_block[..EXT2_NDIR_BLOCKS].iter() {
        if block_id == 0 {
            continue;
        }
        let block = store.read_block(block_id)?;
        for entry in BlockCursor::new(&block) {
            if entry.inode != 0 {
                entries.push(entry);
            }
        }
    }
    Ok(entries)
}

/// Finds the inode number of the entry named `name` directly inside
/// `dir_inode`, or the sentinel `0` if no entry with that name exists (no
/// inode is ever numbered `0`) — or if `dir_inode` is not a directory at
/// all. Unlike `list_directory_entries`, a non-directory here is not an
/// error: a path walk through a non-directory intermediate component
/// (e.g. `/a_file/b`) must resolve to "not found", not fail outright
/// (spec.md §4.7 `get_inode_for_path`, "Return 0 if any component is
/// missing").
pub fn find_entry_in_directory<S: BlockStore>(
    store: &mut S,
    dir_inode: &crate::inode::Inode,
    name: &[u8],
) -> Result<u32> {
    if !dir_inode.is_dir() {
        return Ok(0);
    }
    for &block_id in dir_inode.i_block[..EXT2_NDIR_BLOCKS].iter() {
        if block_id == 0 {
            continue;
        }
        let block = store.read_block(block_id)?;
        for entry in BlockCursor::new(&block) {
            if entry.inode != 0 && entry.name_len as usize == name.len() && entry.name == name {
                return Ok(entry.inode);
            }
        }
    }
    Ok(0)
}

/// Attempts to fit a new entry into one of `dir_inode`'s existing direct
/// blocks by splitting an entry with enough slack; allocates and
/// initializes a fresh block if none has room.
///
/// Mutates `dir_inode` in memory (`i_block`, `i_size`, `i_blocks` when a
/// new block is claimed) — the caller is responsible for persisting it
/// (spec.md §4.7).
pub fn add_directory_entry<S: BlockStore>(
    store: &mut S,
    dir_inode: &mut crate::inode::Inode,
    new_inode: u32,
    name: &[u8],
    file_type: u8,
) -> Result<()> {
    let block_size = store.block_size();
    let new_len = dir_rec_len(name.len());

    for slot in 0..EXT2_NDIR_BLOCKS {
        let block_id = dir_inode.i_block[slot];
        if block_id == 0 {
            continue;
        }
        let mut block = store.read_block(block_id)?;
        let mut offset = 0usize;
        while offset < block.len() {
            let Some(entry) = DirEntry::decode(&block, offset) else {
                break;
            };
            let used = dir_rec_len(entry.name_len as usize);
            let slack = entry.rec_len.saturating_sub(used);
            if slack >= new_len {
                let old_rec_len = entry.rec_len;
                let mut resized = entry.clone();
                resized.rec_len = used;
                resized.encode(&mut block, offset);

                let split_offset = offset + used as usize;
                let new_entry = DirEntry {
                    inode: new_inode,
                    rec_len: old_rec_len - used,
                    name_len: name.len() as u8,
                    file_type,
                    name: name.to_vec(),
                };
                new_entry.encode(&mut block, split_offset);

                store.write_block(block_id, &block)?;
                return Ok(());
            }
            offset += entry.rec_len as usize;
        }
    }

    let free_slot = dir_inode.i_block[..EXT2_NDIR_BLOCKS]
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::new(ErrorKind::NoSpace))?;

    let new_block_id = store.allocate_block()?;
    dir_inode.i_block[free_slot] = new_block_id;
    dir_inode.i_size += block_size;
    dir_inode.i_blocks += block_size / 512;

    let mut block = vec![0u8; block_size as usize];
    let entry = DirEntry {
        inode: new_inode,
        rec_len: block_size as u16,
        name_len: name.len() as u8,
        file_type,
        name: name.to_vec(),
    };
    entry.encode(&mut block, 0);
    store.write_block(new_block_id, &block)?;
    Ok(())
}

/// Builds the initial block contents of a freshly created directory: a
/// `.` entry pointing at `self_inode` followed by a `..` entry pointing
/// at `parent_inode`, the latter's `rec_len` stretched to the end of the
/// block.
pub fn new_directory_block(block_size: u32, self_inode: u32, parent_inode: u32) -> Vec<u8> {
    let mut block = vec![0u8; block_size as usize];
    let dot_len = dir_rec_len(1);
    let dot = DirEntry {
        inode: self_inode,
        rec_len: dot_len,
        name_len: 1,
        file_type: EXT2_FT_DIR,
        name: b".".to_vec(),
    };
    dot.encode(&mut block, 0);

    let dotdot = DirEntry {
        inode: parent_inode,
        rec_len: block_size as u16 - dot_len,
        name_len: 2,
        file_type: EXT2_FT_DIR,
        name: b"..".to_vec(),
    };
    dotdot.encode(&mut block, dot_len as usize);
    block
}

/// Splits an absolute path on `/`, dropping empty components (so a
/// trailing slash, a leading slash, or repeated slashes are all
/// equivalent).
pub fn path_components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty()).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::inode::Inode;
    use std::collections::HashMap;

    /// An in-memory block store, keyed by block id, handing out
    /// sequential new ids starting at `next`.
    struct MemStore {
        block_size: u32,
        blocks: HashMap<u32, Vec<u8>>,
        next: u32,
    }

    impl MemStore {
        fn new(block_size: u32) -> Self {
            Self { block_size, blocks: HashMap::new(), next: 100 }
        }
    }

    impl BlockStore for MemStore {
        fn block_size(&self) -> u32 {
            self.block_size
        }

        fn read_block(&mut self, block_id: u32) -> Result<Vec<u8>> {
            Ok(self.blocks.get(&block_id).cloned().unwrap_or_else(|| vec![0u8; self.block_size as usize]))
        }

        fn write_block(&mut self, block_id: u32, data: &[u8]) -> Result<()> {
            self.blocks.insert(block_id, data.to_vec());
            Ok(())
        }

        fn allocate_block(&mut self) -> Result<u32> {
            let id = self.next;
            self.next += 1;
            Ok(id)
        }
    }

    fn dir_inode(block_id: u32, size: u32) -> Inode {
        let mut inode = Inode::default();
        inode.i_mode = EXT2_S_IFDIR;
        inode.i_size = size;
        inode.i_block[0] = block_id;
        inode
    }

    #[test]
    fn rec_len_is_aligned_and_fits_name() {
        for n in 0..=255usize {
            let len = dir_rec_len(n);
            assert_eq!(len % 4, 0);
            assert!(len as usize >= 8 + n);
        }
    }

    #[test]
    fn lists_dot_and_dotdot() {
        let mut store = MemStore::new(1024);
        let block = new_directory_block(1024, 2, 2);
        store.write_block(1, &block).unwrap();
        let inode = dir_inode(1, 1024);

        let entries = list_directory_entries(&mut store, &inode).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, b".");
        assert_eq!(entries[0].inode, 2);
        assert_eq!(entries[1].name, b"..");
        assert_eq!(entries[1].inode, 2);
    }

    #[test]
    fn stops_on_corrupt_rec_len_but_keeps_other_blocks() {
        let mut store = MemStore::new(1024);
        let mut block = vec![0u8; 1024];
        // A well-formed entry followed by a zeroed (rec_len == 0) one.
        let entry = DirEntry { inode: 5, rec_len: 12, name_len: 1, file_type: EXT2_FT_REG_FILE, name: b"a".to_vec() };
        entry.encode(&mut block, 0);
        store.write_block(1, &block).unwrap();

        let second_block = new_directory_block(1024, 2, 2);
        store.write_block(2, &second_block).unwrap();

        let mut inode = dir_inode(1, 1024);
        inode.i_block[1] = 2;

        let entries = list_directory_entries(&mut store, &inode).unwrap();
        // First block: only the one real entry (rec_len 12 leaves an empty
        // zeroed remainder that decodes as rec_len == 0 and stops parsing).
        // Second block: '.' and '..'.
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, b"a");
    }

    #[test]
    fn rejects_non_directory() {
        let mut store = MemStore::new(1024);
        let inode = Inode::default();
        assert!(matches!(
            list_directory_entries(&mut store, &inode).unwrap_err().kind(),
            ErrorKind::NotADirectory
        ));
    }

    #[test]
    fn find_entry_in_non_directory_returns_zero_not_error() {
        // Unlike `list_directory_entries`, a non-directory inode here is
        // not an error: `get_inode_for_path` relies on the plain `0`
        // sentinel to report a missing component when an intermediate
        // path segment turns out to be a regular file.
        let mut store = MemStore::new(1024);
        let mut inode = Inode::default();
        inode.i_mode = crate::inode::EXT2_S_IFREG;
        assert_eq!(find_entry_in_directory(&mut store, &inode, b"b").unwrap(), 0);
    }

    #[test]
    fn find_entry_returns_zero_when_missing() {
        let mut store = MemStore::new(1024);
        let block = new_directory_block(1024, 2, 2);
        store.write_block(1, &block).unwrap();
        let inode = dir_inode(1, 1024);
        assert_eq!(find_entry_in_directory(&mut store, &inode, b"missing").unwrap(), 0);
        assert_eq!(find_entry_in_directory(&mut store, &inode, b".").unwrap(), 2);
    }

    #[test]
    fn inserts_entry_by_splitting_slack() {
        let mut store = MemStore::new(1024);
        let block = new_directory_block(1024, 2, 2);
        store.write_block(1, &block).unwrap();
        let mut inode = dir_inode(1, 1024);

        add_directory_entry(&mut store, &mut inode, 11, b"new_dir", EXT2_FT_DIR).unwrap();

        let found = find_entry_in_directory(&mut store, &inode, b"new_dir").unwrap();
        assert_eq!(found, 11);
        // No new block should have been needed; plenty of slack after '..'.
        assert_eq!(inode.i_block[1], 0);
    }

    #[test]
    fn inserts_entry_by_allocating_new_block_when_full() {
        let mut store = MemStore::new(1024);
        // A block with a single entry whose rec_len spans the whole block,
        // leaving no slack for anything else.
        let mut block = vec![0u8; 1024];
        let entry = DirEntry { inode: 2, rec_len: 1024, name_len: 1, file_type: EXT2_FT_DIR, name: b".".to_vec() };
        entry.encode(&mut block, 0);
        store.write_block(1, &block).unwrap();
        let mut inode = dir_inode(1, 1024);

        add_directory_entry(&mut store, &mut inode, 12, b"child", EXT2_FT_DIR).unwrap();

        assert_ne!(inode.i_block[1], 0);
        assert_eq!(inode.i_size, 2048);
        assert_eq!(inode.i_blocks, 2);
        let found = find_entry_in_directory(&mut store, &inode, b"child").unwrap();
        assert_eq!(found, 12);
    }

    #[test]
    fn no_space_when_all_direct_slots_full_and_no_slack() {
        let mut store = MemStore::new(1024);
        let mut inode = dir_inode(0, 1024);
        for slot in 0..EXT2_NDIR_BLOCKS {
            let mut block = vec![0u8; 1024];
            let entry = DirEntry { inode: 2, rec_len: 1024, name_len: 1, file_type: EXT2_FT_DIR, name: b".".to_vec() };
            entry.encode(&mut block, 0);
            store.write_block(slot as u32 + 1, &block).unwrap();
            inode.i_block[slot] = slot as u32 + 1;
        }

        let err = add_directory_entry(&mut store, &mut inode, 99, b"x", EXT2_FT_REG_FILE).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NoSpace));
    }

    #[test]
    fn path_components_drops_empties() {
        assert_eq!(path_components("/a/b"), vec!["a", "b"]);
        assert_eq!(path_components("/a//b/"), vec!["a", "b"]);
        assert_eq!(path_components("/"), Vec::<&str>::new());
    }
}
