use std::path::Path;
use std::process::{Command, Stdio};
use serde::Deserialize;
use tracing::debug;

use crate::error::ProbeError;

/// Duration and audio layout of a media file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProbeResult {
    pub duration_secs: u64,
    /// Channel count per audio stream, in stream order.
    pub audio_channels: Vec<u32>,
}

impl ProbeResult {
    /// What a file that could not be inspected looks like.
    pub fn unknown() -> Self {
        ProbeResult::default()
    }
}

/// Media inspection capability. Never fails: anything that cannot be
/// inspected reports zero duration and no audio streams.
pub trait Prober {
    fn probe(&self, path: &Path) -> ProbeResult;
}

#[derive(Deserialize, Debug)]
struct FFProbeJsonOutput {
    #[serde(default)]
    pub streams: Vec<FFProbeJsonStream>,
    pub format: Option<FFProbeJsonFormat>,
}

#[derive(Deserialize, Debug)]
struct FFProbeJsonStream {
    pub index: u32,
    pub channels: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct FFProbeJsonFormat {
    pub duration: Option<String>,
}

pub struct FfprobeProber {
    binary: String,
}

impl FfprobeProber {
    pub fn new(binary: &str) -> Self {
        FfprobeProber { binary: String::from(binary) }
    }

    pub fn probe_file(&self, path: &Path) -> Result<ProbeResult, ProbeError> {
        let output = Command::new(&self.binary)
            .args(["-v", "error", "-show_entries", "format=duration:stream=index,channels", "-select_streams", "a", "-of", "json"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ProbeError::for_file(path, &format!("unable to execute {}: {}", self.binary, e)))?;
        if output.status.success() {
            let utf8 = String::from_utf8(output.stdout)
                .map_err(|_| ProbeError::for_file(path, "ffprobe output is not valid UTF-8."))?;
            parse_probe_output(path, &utf8)
        } else {
            Err(ProbeError::for_file(path, "ffprobe did not exit successfully."))
        }
    }
}

impl Prober for FfprobeProber {
    fn probe(&self, path: &Path) -> ProbeResult {
        match self.probe_file(path) {
            Ok(result) => result,
            Err(err) => {
                debug!(error = %err, "probe failed; treating duration as unknown");
                ProbeResult::unknown()
            },
        }
    }
}

fn parse_probe_output(path: &Path, json: &str) -> Result<ProbeResult, ProbeError> {
    let mut deserialized = serde_json::from_str::<FFProbeJsonOutput>(json)
        .map_err(|e| ProbeError::for_file(path, &format!("unexpected ffprobe output: {}", e)))?;
    deserialized.streams.sort_by_key(|s| s.index);
    let duration_secs = deserialized.format
        .and_then(|f| f.duration)
        .map(|d| parse_duration(&d))
        .unwrap_or(0);
    Ok(ProbeResult {
        duration_secs,
        audio_channels: deserialized.streams.iter().map(|s| s.channels.unwrap_or(0)).collect(),
    })
}

fn parse_duration(s: &str) -> u64 {
    match s.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => secs.trunc() as u64,
        _ => 0,
    }
}
