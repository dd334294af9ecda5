//! A user-space ext2 filesystem library: binary codecs for the
//! superblock, block group descriptor table, bitmaps and inodes; an
//! allocator that claims free inodes and blocks while keeping their
//! three redundant counters consistent; and a directory engine that
//! lists, searches, resolves paths against and inserts entries into
//! directory data blocks.
//!
//! Indirect block traversal, journaling, deletion, permissions
//! enforcement and crash recovery are all out of scope — see the
//! project's design notes for the full list of non-goals.

pub mod alloc;
pub mod bitmap;
pub mod dir;
pub mod error;
pub mod fs;
pub mod group_desc;
pub mod inode;
pub mod superblock;
pub mod support;

pub use error::{Error, ErrorKind, Result};
pub use fs::Filesystem;
