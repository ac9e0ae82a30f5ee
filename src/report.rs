use std::io::{self, BufRead, Write};
use human_repr::HumanCount;

use crate::eta::{format_hms, round_secs};
use crate::orchestrator::RunSummary;
use crate::plan::{BatchPlan, EncodingJob, JobStatus, OutputLayout};

pub fn print_plan(plan: &BatchPlan, layout: &OutputLayout) {
    println!("{:>4}  {:>10}  {:>9}  {:>9}  {:>8}  {}", "#", "Size", "Duration", "Estimate", "Done by", "File");
    for (index, (job, eta)) in plan.jobs.iter().zip(plan.schedule.entries.iter()).enumerate() {
        println!(
            "{:>4}  {:>10}  {:>9}  {:>9}  {:>8}  {}",
            index + 1,
            job.source.size.human_count_bytes().to_string(),
            format_hms(job.source.duration_secs),
            format_hms(round_secs(eta.estimate_secs)),
            eta.done_by.format("%H:%M:%S").to_string(),
            layout.relative(&job.source.path).display());
    }
    println!();
    println!(
        "{} files, {} total, estimated {} at {}x speed, done by {}",
        plan.jobs.len(),
        plan.total_input_bytes().human_count_bytes(),
        format_hms(round_secs(plan.total_estimated_secs())),
        plan.speed_factor,
        plan.schedule.finish().format("%Y-%m-%d %H:%M:%S"));
}

pub fn job_line(index: usize, total: usize, job: &EncodingJob, layout: &OutputLayout) -> String {
    let mut line = format!("[{}/{}] {:<9} {}", index + 1, total, job.status, layout.relative(&job.source.path).display());
    if job.status == JobStatus::ValidationFailed {
        if let Some(mismatch) = &job.mismatch {
            line.push_str(&format!(" ({})", mismatch));
        }
    }
    line
}

pub fn print_summary(summary: &RunSummary, layout: &OutputLayout) {
    println!();
    if summary.interrupted {
        println!("Interrupted; run again to resume.");
    }
    println!(
        "encoded {}, repaired {}, skipped {}, failed {}, not reached {}",
        summary.count(JobStatus::Encoded),
        summary.count(JobStatus::RepairedComplete),
        summary.count(JobStatus::SkippedComplete),
        summary.count(JobStatus::ValidationFailed),
        summary.count(JobStatus::Pending) + summary.count(JobStatus::NeedsEncode));
    if !summary.failed.is_empty() {
        println!("Failed:");
        for path in &summary.failed {
            println!("  {}", layout.relative(path).display());
        }
    }
    println!("Output: {}", layout.output_root.display());
}

pub fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
