//! Small numeric helpers used when laying out a fresh filesystem.

use std::fmt;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Returns the current timestamp since the Unix epoch, as ext2 stores it:
/// a 32-bit count of seconds.
pub fn timestamp_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs() as u32
}

/// Divides `n` by `d`, rounding up.
pub fn ceil_division(n: u64, d: u64) -> u64 {
    n.div_ceil(d)
}

/// Performs `log2` on the given integer, returning `None` if `n` is zero.
pub fn log2(n: u64) -> Option<u32> {
    if n == 0 {
        None
    } else {
        Some(u64::BITS - 1 - n.leading_zeros())
    }
}

/// A byte count, formatted in the largest binary unit that keeps the
/// mantissa non-zero (`1 KiB`, `4 MiB`, ...).
pub struct ByteSize(pub u64);

impl fmt::Display for ByteSize {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: &[&str] = &["bytes", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];
        let mut order = log2(self.0).unwrap_or(0) / 10;
        if order as usize >= UNITS.len() {
            order = 0;
        }
        let unit = 1024u64.saturating_pow(order);
        write!(fmt, "{} {}", self.0 / unit.max(1), UNITS[order as usize])
    }
}
