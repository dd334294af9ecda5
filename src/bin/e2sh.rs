//! `e2sh`: an interactive shell over an ext2 image, built the way
//! `mutils`'s standalone tools are — a tiny `Args` struct, a `parse_args`
//! function, then a loop. There is exactly one positional argument (the
//! image path), so a full argument-parsing crate would be overkill here,
//! matching what every tool in the retrieval pack's teacher does for its
//! own similarly small argument surfaces.

use ext2fs::error::ErrorKind;
use ext2fs::{Filesystem, Result};
use std::env;
use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::process::exit;

/// Command line arguments: just the image path.
struct Args {
    prog: String,
    image_path: Option<String>,
}

fn parse_args() -> Args {
    let mut iter = env::args();
    let prog = iter.next().unwrap_or_else(|| "e2sh".to_owned());
    let image_path = iter.next();
    Args { prog, image_path }
}

/// Writes a one-line diagnostic to stderr, `e2sh`-style.
fn error<M: std::fmt::Display>(prog: &str, msg: M) -> ! {
    eprintln!("{prog}: error: {msg}");
    exit(1);
}

fn main() {
    let args = parse_args();
    let image_path = args.image_path.unwrap_or_else(|| {
        error(&args.prog, "usage: e2sh <image_file>");
    });

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&image_path)
        .unwrap_or_else(|e| {
            error(&args.prog, format!("{image_path}: {e}"));
        });

    let mut fs = Filesystem::open(file).unwrap_or_else(|e| {
        error(&args.prog, format!("{image_path}: {e}"));
    });

    run_shell(&mut fs);
}

/// Reads newline-terminated commands from standard input until EOF,
/// tokenizing on whitespace and dispatching. Per-command errors are
/// printed and the loop continues; only EOF or `exit`/`quit` ends it
/// (spec.md §6).
fn run_shell<D: io::Read + io::Write + io::Seek>(fs: &mut Filesystem<D>) {
    let stdin = io::stdin();
    loop {
        print!("e2sh> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        let bytes_read = stdin.lock().read_line(&mut line).unwrap_or(0);
        if bytes_read == 0 {
            break;
        }

        let mut tokens = line.split_whitespace();
        let Some(command) = tokens.next() else {
            continue;
        };

        match command {
            "ls" => {
                let path = tokens.next().unwrap_or("/");
                if let Err(e) = cmd_ls(fs, path) {
                    eprintln!("e2sh: ls: {e}");
                }
            }
            "mkdir" => match tokens.next() {
                Some(path) => {
                    if let Err(e) = cmd_mkdir(fs, path) {
                        eprintln!("e2sh: mkdir: {e}");
                    }
                }
                None => eprintln!("e2sh: mkdir: usage: mkdir <path>"),
            },
            "exit" | "quit" => break,
            other => eprintln!("e2sh: {other}: unknown command"),
        }
    }
}

/// Resolves `path` and lists it, printing the columns named in spec.md
/// §6: `inode | rec_len | name_len | type | name`.
fn cmd_ls<D: io::Read + io::Write + io::Seek>(fs: &mut Filesystem<D>, path: &str) -> Result<()> {
    let inode_num = fs.get_inode_for_path(path)?;
    if inode_num == 0 {
        return Err(ErrorKind::NotFound.into());
    }
    let entries = fs.list_directory_entries(inode_num)?;
    println!("inode | rec_len | name_len | type | name");
    for entry in entries {
        let name = String::from_utf8_lossy(&entry.name);
        println!(
            "{:>5} | {:>7} | {:>8} | {:>4} | {name}",
            entry.inode, entry.rec_len, entry.name_len, entry.file_type
        );
    }
    Ok(())
}

/// Creates a directory at `path`, resolving everything but the final
/// component as the parent.
fn cmd_mkdir<D: io::Read + io::Write + io::Seek>(fs: &mut Filesystem<D>, path: &str) -> Result<()> {
    let trimmed = path.trim_end_matches('/');
    let (parent_path, name) = match trimmed.rsplit_once('/') {
        Some(("", name)) => ("/", name),
        Some((parent, name)) => (parent, name),
        None => ("/", trimmed),
    };
    if name.is_empty() {
        return Err(ErrorKind::InvalidParameter.into());
    }
    let parent_inode = fs.get_inode_for_path(parent_path)?;
    if parent_inode == 0 {
        return Err(ErrorKind::NotFound.into());
    }
    fs.create_directory(parent_inode, name)?;
    Ok(())
}
