use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use human_repr::HumanCount;

use crate::ffmpeg::probe::Prober;
use crate::fstools::FileStat;

/// A discovered input, captured once and never mutated.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub size: u64,
    /// Zero when the probe could not tell.
    pub duration_secs: u64,
    pub audio_channels: Vec<u32>,
    pub modified: SystemTime,
    pub created: Option<SystemTime>,
}

impl MediaFile {
    pub fn inspect(path: &Path, prober: &dyn Prober, stat: &dyn FileStat) -> Option<Self> {
        let stamp = stat.stat(path)?;
        let probe = prober.probe(path);
        Some(MediaFile {
            path: PathBuf::from(path),
            size: stamp.size,
            duration_secs: probe.duration_secs,
            audio_channels: probe.audio_channels,
            modified: stamp.modified,
            created: stamp.created,
        })
    }
}

impl Display for MediaFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<10} {:>6}s {:?} {}",
            self.size.human_count_bytes().to_string(),
            self.duration_secs,
            self.audio_channels,
            self.path.display())
    }
}
