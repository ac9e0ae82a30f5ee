use std::fmt::Display;
use std::path::Path;
use std::time::SystemTime;

use crate::ffmpeg::probe::{ProbeResult, Prober};
use crate::fstools::{format_stamp, FileStat, FileStamp};
use crate::media_file::MediaFile;

/// Why an output was judged incomplete.
#[derive(Clone, Debug, PartialEq)]
pub enum Mismatch {
    MissingOutput,
    EmptyOutput,
    UnknownDuration { input: u64, output: u64 },
    DurationDrift { input: u64, output: u64, tolerance: u64 },
    AudioStreamCount { input: usize, output: usize },
    AudioChannelOrder { index: usize, input: u32, output: u32 },
    ModifyTime { input: SystemTime, output: SystemTime },
    CreateTime { input: SystemTime, output: SystemTime },
}

impl Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mismatch::MissingOutput => write!(f, "output does not exist"),
            Mismatch::EmptyOutput => write!(f, "output is empty"),
            Mismatch::UnknownDuration { input, output } =>
                write!(f, "unknown duration (input {}s, output {}s)", input, output),
            Mismatch::DurationDrift { input, output, tolerance } =>
                write!(f, "duration {}s differs from input {}s by more than {}s", output, input, tolerance),
            Mismatch::AudioStreamCount { input, output } =>
                write!(f, "{} audio streams, expected {}", output, input),
            Mismatch::AudioChannelOrder { index, input, output } =>
                write!(f, "audio stream {} has {} channels, expected {}", index, output, input),
            Mismatch::ModifyTime { input, output } =>
                write!(f, "modification time {} differs from input {}", format_stamp(*output), format_stamp(*input)),
            Mismatch::CreateTime { input, output } =>
                write!(f, "creation time {} differs from input {}", format_stamp(*output), format_stamp(*input)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    Complete,
    Incomplete(Mismatch),
}

impl Verdict {
    pub fn is_complete(&self) -> bool {
        matches!(self, Verdict::Complete)
    }
}

/// Everything the completeness check looks at for one file.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub size: u64,
    pub duration_secs: u64,
    pub audio_channels: Vec<u32>,
    pub modified: SystemTime,
    pub created: Option<SystemTime>,
}

impl Observation {
    pub fn new(stamp: FileStamp, probe: ProbeResult) -> Self {
        Observation {
            size: stamp.size,
            duration_secs: probe.duration_secs,
            audio_channels: probe.audio_channels,
            modified: stamp.modified,
            created: stamp.created,
        }
    }

    /// Inputs keep the timestamps captured at discovery.
    pub fn of_input(input: &MediaFile, probe: ProbeResult) -> Self {
        Observation::new(
            FileStamp { size: input.size, modified: input.modified, created: input.created },
            probe)
    }
}

/// Allowed drift between input and output duration: 0.5% with a one
/// second floor.
pub fn duration_tolerance(input_secs: u64) -> u64 {
    std::cmp::max(1, input_secs / 200)
}

/// Decides completeness from two observations. The first failing
/// condition wins.
pub fn check(input: &Observation, output: &Observation, verify_creation_time: bool) -> Verdict {
    if output.size == 0 {
        return Verdict::Incomplete(Mismatch::EmptyOutput);
    }

    if input.duration_secs == 0 || output.duration_secs == 0 {
        return Verdict::Incomplete(Mismatch::UnknownDuration {
            input: input.duration_secs,
            output: output.duration_secs,
        });
    }

    let tolerance = duration_tolerance(input.duration_secs);
    if input.duration_secs.abs_diff(output.duration_secs) > tolerance {
        return Verdict::Incomplete(Mismatch::DurationDrift {
            input: input.duration_secs,
            output: output.duration_secs,
            tolerance,
        });
    }

    if input.audio_channels.len() != output.audio_channels.len() {
        return Verdict::Incomplete(Mismatch::AudioStreamCount {
            input: input.audio_channels.len(),
            output: output.audio_channels.len(),
        });
    }

    let reordered = input.audio_channels.iter()
        .zip(output.audio_channels.iter())
        .enumerate()
        .find(|(_, (i, o))| i != o);
    if let Some((index, (&i, &o))) = reordered {
        return Verdict::Incomplete(Mismatch::AudioChannelOrder { index, input: i, output: o });
    }

    if input.modified != output.modified {
        return Verdict::Incomplete(Mismatch::ModifyTime {
            input: input.modified,
            output: output.modified,
        });
    }

    // a side without a birth time skips the check
    if verify_creation_time {
        if let (Some(i), Some(o)) = (input.created, output.created) {
            if i != o {
                return Verdict::Incomplete(Mismatch::CreateTime { input: i, output: o });
            }
        }
    }

    Verdict::Complete
}

pub struct Validator<'a> {
    prober: &'a dyn Prober,
    stat: &'a dyn FileStat,
    verify_creation_time: bool,
}

impl<'a> Validator<'a> {
    pub fn new(prober: &'a dyn Prober, stat: &'a dyn FileStat, verify_creation_time: bool) -> Self {
        Validator { prober, stat, verify_creation_time }
    }

    /// Re-stats the output and re-probes both sides; nothing is cached
    /// between calls.
    pub fn validate(&self, input: &MediaFile, output: &Path) -> Verdict {
        let output_stamp = match self.stat.stat(output) {
            None => return Verdict::Incomplete(Mismatch::MissingOutput),
            Some(stamp) => stamp,
        };
        if output_stamp.size == 0 {
            return Verdict::Incomplete(Mismatch::EmptyOutput);
        }

        check(
            &Observation::of_input(input, self.prober.probe(&input.path)),
            &Observation::new(output_stamp, self.prober.probe(output)),
            self.verify_creation_time)
    }
}
