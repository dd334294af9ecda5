//! The error taxonomy shared by every operation in this crate.

use std::fmt;
use std::io;

/// The kind of failure an ext2 operation can report.
///
/// Mirrors the sentinel integers used throughout the reference C
/// implementation (`SUCCESS`, `INVALID_PARAMETER`, `IO_ERROR`, `ERROR`, ...)
/// with a single, named taxonomy instead.
#[derive(Debug)]
pub enum ErrorKind {
    /// An argument is out of range or otherwise meaningless: a null inode
    /// number, an inode past `s_inodes_count`, a name longer than 255 bytes.
    InvalidParameter,
    /// The underlying transport failed: a short read, a short write, or any
    /// other I/O error.
    Io(io::Error),
    /// A superblock was read (or would be written) whose magic number is
    /// not `0xEF53`.
    BadMagic,
    /// An inode was expected to be a directory but its mode says otherwise.
    NotADirectory,
    /// A path component, or a named directory entry, does not exist.
    NotFound,
    /// No free inode or block is available in any group, or a directory has
    /// no free direct block slot left.
    NoSpace,
    /// A directory entry with `rec_len == 0` was encountered mid-block.
    /// Parsing of that block stopped; the operation itself still succeeds.
    Corruption,
}

/// An error produced by an ext2 operation.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Creates a new error of the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::InvalidParameter => write!(fmt, "invalid parameter"),
            ErrorKind::Io(e) => write!(fmt, "I/O error: {e}"),
            ErrorKind::BadMagic => write!(fmt, "bad superblock magic"),
            ErrorKind::NotADirectory => write!(fmt, "not a directory"),
            ErrorKind::NotFound => write!(fmt, "not found"),
            ErrorKind::NoSpace => write!(fmt, "no space left"),
            ErrorKind::Corruption => write!(fmt, "directory corruption"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::new(ErrorKind::Io(e))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Shorthand result type used across this crate.
pub type Result<T> = std::result::Result<T, Error>;
