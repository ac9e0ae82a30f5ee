use std::fs;
use std::path::Path;
use std::time::SystemTime;
use chrono::{DateTime, Local};

pub enum DirEntryCategory {
    DoesNotExist,
    RegularFile,
    SymbolicLink,
    Directory,
    Unknown,
}

pub fn classify_file(path: &Path) -> DirEntryCategory {
    match fs::symlink_metadata(path) {
        Ok(metadata) => {
            if metadata.is_symlink() {
                DirEntryCategory::SymbolicLink
            } else if metadata.is_file() {
                DirEntryCategory::RegularFile
            } else if metadata.is_dir() {
                DirEntryCategory::Directory
            } else {
                DirEntryCategory::Unknown
            }
        },
        Err(_) => DirEntryCategory::DoesNotExist,
    }
}

/// Filesystem facts about one file at the moment it was looked at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FileStamp {
    pub size: u64,
    pub modified: SystemTime,
    /// Not every filesystem records a birth time.
    pub created: Option<SystemTime>,
}

pub trait FileStat {
    /// `None` when the path does not exist or cannot be read.
    fn stat(&self, path: &Path) -> Option<FileStamp>;
}

pub struct LocalFileStat;

impl FileStat for LocalFileStat {
    fn stat(&self, path: &Path) -> Option<FileStamp> {
        let metadata = fs::metadata(path).ok()?;
        if !metadata.is_file() {
            return None;
        }
        Some(FileStamp {
            size: metadata.len(),
            modified: metadata.modified().ok()?,
            created: metadata.created().ok(),
        })
    }
}

/// Local time with the sub-second part, for mismatch messages.
pub fn format_stamp(t: SystemTime) -> String {
    DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S%.f").to_string()
}
