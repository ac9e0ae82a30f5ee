pub mod audio_plan;
pub mod config;
pub mod error;
pub mod eta;
pub mod exiftool;
pub mod ffmpeg;
pub mod filescanner;
pub mod fstools;
pub mod media_file;
pub mod orchestrator;
pub mod plan;
pub mod report;
pub mod validator;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use chrono::Local;
use rustop::opts;
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::DiscoveryError;
use eta::Estimator;
use exiftool::ExiftoolSync;
use ffmpeg::encoder::{FfmpegEncoder, VideoSettings};
use ffmpeg::probe::FfprobeProber;
use filescanner::FileScanner;
use fstools::{classify_file, DirEntryCategory, LocalFileStat};
use media_file::MediaFile;
use orchestrator::Orchestrator;
use plan::{BatchPlan, OutputLayout};
use validator::Validator;

const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    let (args, _rest) = opts! {
        synopsis "Re-encode every media file under a directory. Safe to re-run: finished files are skipped, interrupted ones redone.";
        opt speed:Option<f64>, desc:"Speed factor (multiple of real time) used to forecast encode time.";
        opt config:Option<String>, desc:"JSON configuration file.";
        opt yes:bool=false, short:'y', desc:"Start encoding without asking for confirmation.";
        opt dry_run:bool=false, desc:"Print the plan, but don't encode anything.";
        param root:Option<String>, desc:"Directory to scan (default: current directory).";
    }.parse_or_exit();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load(args.config.as_deref().map(Path::new), args.speed) {
        Ok(config) => config,
        Err(err) => {
            println!("{}", err);
            return ExitCode::FAILURE;
        },
    };

    let root = match scan_root(args.root.as_deref().unwrap_or(".")) {
        Ok(root) => root,
        Err(err) => {
            println!("{}", err);
            return ExitCode::FAILURE;
        },
    };

    for (binary, version_arg) in [(&config.ffmpeg, "-version"), (&config.ffprobe, "-version"), (&config.exiftool, "-ver")] {
        if !ffmpeg::is_installed(binary, version_arg) {
            println!("{} is not installed.", binary);
            return ExitCode::FAILURE;
        }
    }

    let layout = OutputLayout::from_config(&root, &config);
    let prober = FfprobeProber::new(&config.ffprobe);
    let stat = LocalFileStat;

    let paths = FileScanner::new(&config.extensions, &layout.output_root).scan(&root);
    if paths.is_empty() {
        println!("{}", DiscoveryError::NoMediaFiles(root));
        return ExitCode::FAILURE;
    }

    info!(count = paths.len(), "probing media files");
    let mut files = vec![];
    for path in &paths {
        match MediaFile::inspect(path, &prober, &stat) {
            Some(file) => {
                debug!("{}", file);
                files.push(file);
            },
            None => warn!(path = %path.display(), "file vanished before it could be inspected"),
        }
    }
    if files.is_empty() {
        println!("{}", DiscoveryError::NoMediaFiles(root));
        return ExitCode::FAILURE;
    }

    let estimator = Estimator::new(config.speed_factor);
    let mut plan = BatchPlan::build(files, &layout, &config.audio_codec, &estimator, Local::now());
    report::print_plan(&plan, &layout);

    if args.dry_run {
        return ExitCode::SUCCESS;
    }

    if !args.yes {
        match report::confirm("Start encoding?") {
            Ok(true) => (),
            Ok(false) => return ExitCode::SUCCESS,
            Err(err) => {
                println!("Unable to read answer: {}", err);
                return ExitCode::FAILURE;
            },
        }
    }

    // installed only once the prompt is answered, so Ctrl-C there still
    // ends the process at once
    let stop = stop_flag(&[SIGINT, SIGTERM]);
    let encoder = FfmpegEncoder::new(&config.ffmpeg, VideoSettings::from_config(&config), Some(Arc::clone(&stop)));
    let sync = ExiftoolSync::new(&config.exiftool);
    let orchestrator = Orchestrator::new(
        Validator::new(&prober, &stat, config.verify_creation_time),
        &stat,
        &encoder,
        &sync,
        Some(Arc::clone(&stop)));

    let total = plan.jobs.len();
    let summary = orchestrator.run(&mut plan, |index, job| {
        println!("{}", report::job_line(index, total, job, &layout));
    });
    report::print_summary(&summary, &layout);

    if summary.interrupted {
        ExitCode::from(EXIT_INTERRUPTED)
    } else {
        ExitCode::SUCCESS
    }
}

fn stop_flag(signals: &[i32]) -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    for &signal in signals {
        if let Err(err) = signal_hook::flag::register(signal, Arc::clone(&stop)) {
            warn!(signal, error = %err, "unable to install signal handler");
        }
    }
    stop
}

fn scan_root(arg: &str) -> Result<PathBuf, DiscoveryError> {
    let path = PathBuf::from(arg);
    match classify_file(&path) {
        DirEntryCategory::Directory => path.canonicalize().map_err(|_| DiscoveryError::NotADirectory(path)),
        // a symlinked root is fine as long as it leads to a directory
        DirEntryCategory::SymbolicLink if path.is_dir() => path.canonicalize().map_err(|_| DiscoveryError::NotADirectory(path)),
        _ => Err(DiscoveryError::NotADirectory(path)),
    }
}
