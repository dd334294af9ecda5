//! Interactive yes/no prompting, used by `mke2fs` before overwriting an
//! image that already holds a filesystem.

use std::fmt;
use std::io;
use std::io::BufRead;
use std::io::Write;

/// Shows a prompt and returns the line typed in response, or `None` on EOF.
pub fn prompt<P: fmt::Display>(prompt: P) -> Option<String> {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let line = io::stdin().lock().lines().next()?.unwrap_or_default();
    Some(line)
}

/// Shows a yes/no prompt, defaulting to `false` on EOF or an unrecognized
/// answer.
pub fn confirm<P: fmt::Display>(prompt: P) -> bool {
    self::prompt(prompt)
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "y" | "yes"))
        .unwrap_or(false)
}
