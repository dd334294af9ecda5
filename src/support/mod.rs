//! Small utilities shared by the binaries built on top of this crate.
//!
//! None of this is part of the on-disk engine (superblock/BGDT/inode/
//! directory codecs, the allocator) — it is the glue a command-line tool
//! needs: querying a block device's size, prompting for confirmation, and a
//! couple of numeric helpers used when laying out a fresh filesystem.

pub mod disk;
pub mod prompt;
pub mod util;
