use std::fmt::Display;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Local};

use crate::audio_plan::AudioStreamPlan;
use crate::config::Config;
use crate::eta::{Estimator, Schedule};
use crate::media_file::MediaFile;
use crate::validator::Mismatch;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    SkippedComplete,
    RepairedComplete,
    NeedsEncode,
    Encoded,
    ValidationFailed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending | JobStatus::NeedsEncode)
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::SkippedComplete => "skipped",
            JobStatus::RepairedComplete => "repaired",
            JobStatus::NeedsEncode => "needs encode",
            JobStatus::Encoded => "encoded",
            JobStatus::ValidationFailed => "FAILED",
        };
        f.pad(s)
    }
}

/// Where outputs go: the input's directory relative to the scan root,
/// mirrored under the output root.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputLayout {
    pub scan_root: PathBuf,
    pub output_root: PathBuf,
    pub suffix: String,
    pub extension: String,
}

impl OutputLayout {
    pub fn from_config(scan_root: &Path, config: &Config) -> Self {
        OutputLayout {
            scan_root: PathBuf::from(scan_root),
            output_root: scan_root.join(&config.output_dir_name),
            suffix: config.output_suffix.clone(),
            extension: config.container_extension.clone(),
        }
    }

    /// The full input file name is kept (`a.mkv` becomes
    /// `a.mkv.hevc.mp4`), so inputs differing only by extension never
    /// share an output.
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        let relative = match input.strip_prefix(&self.scan_root) {
            Ok(rel) => PathBuf::from(rel),
            Err(_) => input.file_name().map(PathBuf::from).unwrap_or_default(),
        };
        let name = relative.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let dir = match relative.parent() {
            Some(parent) => self.output_root.join(parent),
            None => self.output_root.clone(),
        };
        dir.join(format!("{}{}.{}", name, self.suffix, self.extension))
    }

    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.scan_root).unwrap_or(path)
    }
}

#[derive(Clone, Debug)]
pub struct EncodingJob {
    pub source: MediaFile,
    pub output: PathBuf,
    pub audio_plan: AudioStreamPlan,
    pub status: JobStatus,
    /// Last reason the output was found incomplete.
    pub mismatch: Option<Mismatch>,
}

impl EncodingJob {
    pub fn new(source: MediaFile, layout: &OutputLayout, audio_codec: &str) -> Self {
        let output = layout.output_path_for(&source.path);
        let audio_plan = AudioStreamPlan::build(audio_codec, &source.audio_channels);
        EncodingJob {
            source,
            output,
            audio_plan,
            status: JobStatus::Pending,
            mismatch: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BatchPlan {
    /// Smallest input first.
    pub jobs: Vec<EncodingJob>,
    pub schedule: Schedule,
    pub speed_factor: f64,
}

impl BatchPlan {
    pub fn build(
        mut files: Vec<MediaFile>,
        layout: &OutputLayout,
        audio_codec: &str,
        estimator: &Estimator,
        started: DateTime<Local>,
    ) -> Self {
        files.sort_by(|a, b| a.size.cmp(&b.size).then_with(|| a.path.cmp(&b.path)));
        let durations: Vec<u64> = files.iter().map(|f| f.duration_secs).collect();
        let schedule = estimator.schedule(&durations, started);
        BatchPlan {
            jobs: files.into_iter().map(|f| EncodingJob::new(f, layout, audio_codec)).collect(),
            schedule,
            speed_factor: estimator.speed_factor,
        }
    }

    pub fn total_estimated_secs(&self) -> f64 {
        self.schedule.total_secs
    }

    pub fn total_input_bytes(&self) -> u64 {
        self.jobs.iter().map(|j| j.source.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::UNIX_EPOCH;

    const MB: u64 = 1_000_000;

    fn media(path: &str, size: u64, duration_secs: u64) -> MediaFile {
        MediaFile {
            path: PathBuf::from(path),
            size,
            duration_secs,
            audio_channels: vec![2],
            modified: UNIX_EPOCH,
            created: None,
        }
    }

    fn layout() -> OutputLayout {
        OutputLayout::from_config(Path::new("/media"), &Config::default())
    }

    #[test]
    fn test_output_path_mirrors_relative_dir() {
        let layout = layout();
        assert_eq!(
            layout.output_path_for(Path::new("/media/shows/s01/e01.mkv")),
            PathBuf::from("/media/transcoded/shows/s01/e01.mkv.hevc.mp4"));
        assert_eq!(
            layout.output_path_for(Path::new("/media/clip.MOV")),
            PathBuf::from("/media/transcoded/clip.MOV.hevc.mp4"));
        assert_eq!(
            layout.output_path_for(Path::new("/elsewhere/other.avi")),
            PathBuf::from("/media/transcoded/other.avi.hevc.mp4"));
    }

    #[test]
    fn test_same_stem_gets_distinct_outputs() {
        let files = vec![
            media("/media/a.mkv", 300 * MB, 300),
            media("/media/a.mp4", 900 * MB, 900),
            media("/media/a", 10 * MB, 60),
        ];
        let started = Local.timestamp_opt(1_700_000_000, 0).unwrap();
        let plan = BatchPlan::build(files, &layout(), "aac", &Estimator::new(1.0), started);

        let outputs: Vec<PathBuf> = plan.jobs.iter().map(|j| j.output.clone()).collect();
        assert_eq!(outputs, vec![
            PathBuf::from("/media/transcoded/a.hevc.mp4"),
            PathBuf::from("/media/transcoded/a.mkv.hevc.mp4"),
            PathBuf::from("/media/transcoded/a.mp4.hevc.mp4"),
        ]);
    }

    #[test]
    fn test_smallest_first() {
        let files = vec![
            media("/media/a.mkv", 500 * MB, 1800),
            media("/media/b.mkv", 50 * MB, 300),
            media("/media/c.mkv", 2000 * MB, 7200),
        ];
        let started = Local.timestamp_opt(1_700_000_000, 0).unwrap();
        let plan = BatchPlan::build(files, &layout(), "aac", &Estimator::new(2.0), started);

        let sizes: Vec<u64> = plan.jobs.iter().map(|j| j.source.size).collect();
        assert_eq!(sizes, vec![50 * MB, 500 * MB, 2000 * MB]);
        assert!(plan.jobs.iter().all(|j| j.status == JobStatus::Pending));

        // the forecast follows execution order
        let estimates: Vec<f64> = plan.schedule.entries.iter().map(|e| e.estimate_secs).collect();
        assert_eq!(estimates, vec![150.0, 900.0, 3600.0]);
        assert_eq!(plan.total_estimated_secs(), 4650.0);
        assert_eq!(plan.speed_factor, 2.0);
        assert_eq!(plan.total_input_bytes(), 2550 * MB);
    }

    #[test]
    fn test_job_audio_plan_follows_input() {
        let mut file = media("/media/a.mkv", 1, 10);
        file.audio_channels = vec![6, 2];
        let job = EncodingJob::new(file, &layout(), "aac");
        assert_eq!(job.audio_plan.bitrates(), vec![384, 160]);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::NeedsEncode.is_terminal());
        assert!(JobStatus::SkippedComplete.is_terminal());
        assert!(JobStatus::RepairedComplete.is_terminal());
        assert!(JobStatus::Encoded.is_terminal());
        assert!(JobStatus::ValidationFailed.is_terminal());
    }
}
