use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::exiftool::MetadataSync;
use crate::ffmpeg::encoder::{EncodeRequest, Encoder};
use crate::fstools::FileStat;
use crate::plan::{BatchPlan, EncodingJob, JobStatus};
use crate::validator::{Mismatch, Validator, Verdict};

enum Step {
    Next(JobStatus),
    Interrupted,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub counts: HashMap<JobStatus, usize>,
    pub failed: Vec<PathBuf>,
    pub interrupted: bool,
}

impl RunSummary {
    fn from_plan(plan: &BatchPlan, interrupted: bool) -> Self {
        let mut summary = RunSummary { interrupted, ..RunSummary::default() };
        for job in &plan.jobs {
            *summary.counts.entry(job.status).or_insert(0) += 1;
            if job.status == JobStatus::ValidationFailed {
                summary.failed.push(job.source.path.clone());
            }
        }
        summary
    }

    pub fn count(&self, status: JobStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }
}

/// Drives every job of a plan through skip, repair or encode, one at a
/// time in plan order. Completeness is always re-derived from disk.
pub struct Orchestrator<'a> {
    validator: Validator<'a>,
    stat: &'a dyn FileStat,
    encoder: &'a dyn Encoder,
    sync: &'a dyn MetadataSync,
    stop: Option<Arc<AtomicBool>>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        validator: Validator<'a>,
        stat: &'a dyn FileStat,
        encoder: &'a dyn Encoder,
        sync: &'a dyn MetadataSync,
        stop: Option<Arc<AtomicBool>>,
    ) -> Self {
        Orchestrator { validator, stat, encoder, sync, stop }
    }

    fn should_stop(&self) -> bool {
        match &self.stop {
            None => false,
            Some(s) => s.load(Ordering::SeqCst),
        }
    }

    /// `on_finished` sees each job once it reaches a terminal status.
    pub fn run(&self, plan: &mut BatchPlan, mut on_finished: impl FnMut(usize, &EncodingJob)) -> RunSummary {
        let mut interrupted = false;
        for (index, job) in plan.jobs.iter_mut().enumerate() {
            if self.should_stop() || !self.run_job(job) {
                interrupted = true;
                break;
            }
            on_finished(index, job);
        }
        if interrupted {
            info!("stop requested; leaving remaining jobs for the next run");
        }
        RunSummary::from_plan(plan, interrupted)
    }

    /// Advances a job until it is terminal. Returns false when
    /// interrupted part way.
    pub fn run_job(&self, job: &mut EncodingJob) -> bool {
        while !job.status.is_terminal() {
            match self.step(job) {
                Step::Next(status) => {
                    debug!(path = %job.source.path.display(), from = %job.status, to = %status, "transition");
                    job.status = status;
                },
                Step::Interrupted => return false,
            }
        }
        true
    }

    fn step(&self, job: &mut EncodingJob) -> Step {
        match job.status {
            JobStatus::Pending => Step::Next(self.check_existing(job)),
            JobStatus::NeedsEncode => self.encode(job),
            JobStatus::SkippedComplete
            | JobStatus::RepairedComplete
            | JobStatus::Encoded
            | JobStatus::ValidationFailed => Step::Next(job.status),
        }
    }

    fn check_existing(&self, job: &mut EncodingJob) -> JobStatus {
        if self.stat.stat(&job.output).is_none() {
            job.mismatch = Some(Mismatch::MissingOutput);
            return JobStatus::NeedsEncode;
        }

        let mismatch = match self.validator.validate(&job.source, &job.output) {
            Verdict::Complete => return JobStatus::SkippedComplete,
            Verdict::Incomplete(m) => m,
        };

        info!(path = %job.output.display(), %mismatch, "existing output incomplete; syncing metadata");
        self.sync_metadata(job);
        match self.validator.validate(&job.source, &job.output) {
            Verdict::Complete => {
                job.mismatch = None;
                JobStatus::RepairedComplete
            },
            Verdict::Incomplete(m) => {
                job.mismatch = Some(m);
                JobStatus::NeedsEncode
            },
        }
    }

    fn encode(&self, job: &mut EncodingJob) -> Step {
        let request = EncodeRequest {
            input: &job.source.path,
            output: &job.output,
            duration_secs: job.source.duration_secs,
            audio: &job.audio_plan,
        };
        info!(input = %job.source.path.display(), output = %job.output.display(), "encoding");
        if let Err(err) = self.encoder.encode(&request) {
            if err.is_interrupted() {
                return Step::Interrupted;
            }
            warn!(error = %err, "encoder failed; validating whatever it left behind");
        }
        if self.should_stop() {
            return Step::Interrupted;
        }

        self.sync_metadata(job);
        match self.validator.validate(&job.source, &job.output) {
            Verdict::Complete => {
                job.mismatch = None;
                Step::Next(JobStatus::Encoded)
            },
            Verdict::Incomplete(m) => {
                warn!(path = %job.output.display(), mismatch = %m, "output failed validation after encoding");
                job.mismatch = Some(m);
                Step::Next(JobStatus::ValidationFailed)
            },
        }
    }

    fn sync_metadata(&self, job: &EncodingJob) {
        if let Err(err) = self.sync.sync(&job.source.path, &job.output) {
            warn!(error = %err, "metadata sync failed");
        }
    }
}
