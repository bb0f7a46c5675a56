// pico-retro/src/core/disk/m3u.rs

//! M3U playlists: one disc image path per line.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cfg_if::cfg_if;
use log::debug;

use super::MAX_DISKS;

/// Parse playlist bytes, resolving entries against `base_dir`.
///
/// Lines starting with `#` are comments. Anything after the first carriage
/// return is dropped, empty lines are skipped and at most [`MAX_DISKS`]
/// entries are kept. Entries are taken byte for byte, so names need not be
/// UTF-8.
pub fn parse(text: &[u8], base_dir: &Path) -> Vec<PathBuf> {
    text.split(|&b| b == b'\n')
        .filter(|line| !line.starts_with(b"#"))
        .map(|line| line.split(|&b| b == b'\r').next().unwrap_or_default())
        .filter(|entry| !entry.is_empty())
        .take(MAX_DISKS)
        .map(|entry| base_dir.join(path_from_bytes(entry)))
        .collect()
}

cfg_if! {
    if #[cfg(unix)] {
        fn path_from_bytes(bytes: &[u8]) -> PathBuf {
            use std::ffi::OsStr;
            use std::os::unix::ffi::OsStrExt;
            PathBuf::from(OsStr::from_bytes(bytes))
        }
    } else {
        fn path_from_bytes(bytes: &[u8]) -> PathBuf {
            PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Read and parse a playlist file.
pub fn read(path: &Path, base_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let text = fs::read(path)?;
    let entries = parse(&text, base_dir);
    debug!("m3u {}: {} entries", path.display(), entries.len());
    Ok(entries)
}
