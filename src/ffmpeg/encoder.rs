use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use human_repr::HumanCount;
use kdam::{term, tqdm, BarExt};
use tracing::{debug, info};

use crate::audio_plan::AudioStreamPlan;
use crate::config::Config;
use crate::error::ToolError;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoSettings {
    pub codec: String,
    pub crf: u8,
    pub preset: String,
}

impl VideoSettings {
    pub fn from_config(config: &Config) -> Self {
        VideoSettings {
            codec: config.video_codec.clone(),
            crf: config.crf,
            preset: config.preset.clone(),
        }
    }
}

pub struct EncodeRequest<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub duration_secs: u64,
    pub audio: &'a AudioStreamPlan,
}

/// Encoding capability. Must map every input stream and overwrite
/// whatever already sits at the output path.
pub trait Encoder {
    fn encode(&self, request: &EncodeRequest) -> Result<(), ToolError>;
}

#[derive(Debug)]
struct EncodeProgress {
    pub out_time_secs: u64,
    pub total_size: u64,
    pub speed: String,
}

impl EncodeProgress {
    pub fn new() -> Self {
        EncodeProgress {
            out_time_secs: 0,
            total_size: 0,
            speed: String::new(),
        }
    }
}

enum FFmpegStdoutResult {
    Continue,
    Render,
}

pub struct FfmpegEncoder {
    binary: String,
    video: VideoSettings,
    stop: Option<Arc<AtomicBool>>,
}

impl FfmpegEncoder {
    pub fn new(binary: &str, video: VideoSettings, stop: Option<Arc<AtomicBool>>) -> Self {
        FfmpegEncoder {
            binary: String::from(binary),
            video,
            stop,
        }
    }

    fn build_args(&self, request: &EncodeRequest) -> Vec<PathBuf> {
        fn pbs(s: &str) -> PathBuf { PathBuf::from(s) }

        let mut args = vec![
            pbs("-hide_banner"), pbs("-nostats"),
            pbs("-loglevel"), pbs("warning"),
            pbs("-progress"), pbs("pipe:1"),
            pbs("-y"),
            pbs("-i"), PathBuf::from(request.input),
            pbs("-map"), pbs("0"),
            pbs("-c:v"), pbs(&self.video.codec),
            pbs("-crf"), PathBuf::from(self.video.crf.to_string()),
            pbs("-preset"), pbs(&self.video.preset),
        ];

        // mp4 players expect the hvc1 tag for hevc
        if self.video.codec == "libx265" {
            args.push(pbs("-tag:v")); args.push(pbs("hvc1"));
        }

        for (index, stream) in request.audio.streams.iter().enumerate() {
            args.push(PathBuf::from(format!("-c:a:{}", index)));
            args.push(pbs(&stream.codec));
            args.push(PathBuf::from(format!("-b:a:{}", index)));
            args.push(PathBuf::from(format!("{}k", stream.bitrate_kbps)));
        }

        args.push(pbs("-c:s")); args.push(pbs("copy"));
        args.push(pbs("-map_metadata")); args.push(pbs("0"));
        args.push(pbs("-movflags")); args.push(pbs("+faststart"));

        args.push(PathBuf::from(request.output));
        args
    }

    fn should_stop(&self) -> bool {
        match &self.stop {
            None => false,
            Some(s) => s.load(Ordering::SeqCst),
        }
    }

    /// Renders progress until ffmpeg closes stdout. Returns true when
    /// the run was cut short by a stop request.
    fn consume_stdout(&self, stdout: ChildStdout, child: &mut Child, request: &EncodeRequest) -> bool {
        term::init(false);

        let name = request.input.file_name().unwrap_or(request.input.as_os_str()).to_string_lossy();
        let mut pbar = tqdm!(
            total = request.duration_secs as usize,
            desc = format!("encoding {}", name),
            position = 0,
            force_refresh = true
        );
        let mut progress = EncodeProgress::new();
        let stdout_reader = BufReader::new(stdout);
        for line in stdout_reader.lines() {
            if let Ok(l) = line {
                match handle_ffmpeg_stdout_line(&l, &mut progress) {
                    FFmpegStdoutResult::Continue => (),
                    FFmpegStdoutResult::Render => {
                        pbar.set_postfix(format!("{} {}", progress.total_size.human_count_bytes(), progress.speed));
                        let _ = pbar.update_to(std::cmp::min(progress.out_time_secs, request.duration_secs) as usize);
                    },
                }
            }

            if self.should_stop() {
                println!();
                info!(pid = child.id(), "stop requested; killing ffmpeg");
                let _ = child.kill();
                return true;
            }
        }

        println!();
        false
    }
}

impl Encoder for FfmpegEncoder {
    fn encode(&self, request: &EncodeRequest) -> Result<(), ToolError> {
        if let Some(parent) = request.output.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ToolError::failed(&self.binary, request.output, &format!("unable to create {:?}: {}", parent, e)))?;
        }

        let args = self.build_args(request);
        debug!(bitrates = ?request.audio.bitrates(), "{} {}", self.binary, args.iter().map(|s| format!("{:?}", s)).collect::<Vec<String>>().join(" "));

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| ToolError::spawn(&self.binary, e))?;

        let stopped = match child.stdout.take() {
            Some(stdout) => self.consume_stdout(stdout, &mut child, request),
            None => false,
        };

        let status = child.wait()
            .map_err(|e| ToolError::failed(&self.binary, request.input, &format!("error waiting for process: {}", e)))?;

        if stopped || self.should_stop() {
            return Err(ToolError::interrupted(&self.binary, request.input));
        }

        match status.success() {
            true => Ok(()),
            false => match status.code() {
                Some(code) => Err(ToolError::failed(&self.binary, request.input, &format!("exited with {}", code))),
                None => Err(ToolError::failed(&self.binary, request.input, "did not exit successfully")),
            },
        }
    }
}

fn handle_ffmpeg_stdout_line(line: &str, progress: &mut EncodeProgress) -> FFmpegStdoutResult {
    match line.split_once('=') {
        Some((key, value)) => match key.trim() {
            // both keys carry microseconds
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.trim().parse::<u64>() {
                    progress.out_time_secs = us / 1_000_000;
                }
                FFmpegStdoutResult::Continue
            },
            "total_size" => {
                progress.total_size = value.trim().parse().unwrap_or(progress.total_size);
                FFmpegStdoutResult::Continue
            },
            "speed" => {
                progress.speed = String::from(value.trim());
                FFmpegStdoutResult::Continue
            },
            "progress" => FFmpegStdoutResult::Render,
            _ => FFmpegStdoutResult::Continue,
        },
        None => FFmpegStdoutResult::Continue,
    }
}
