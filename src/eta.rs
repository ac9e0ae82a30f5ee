use chrono::{DateTime, Local, TimeDelta};

/// Forecasts encode time from source duration. Pure: no I/O, no
/// feedback from measured throughput.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Estimator {
    pub speed_factor: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EtaEntry {
    pub estimate_secs: f64,
    pub cumulative_secs: f64,
    pub done_by: DateTime<Local>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Schedule {
    pub started: DateTime<Local>,
    pub entries: Vec<EtaEntry>,
    pub total_secs: f64,
}

impl Estimator {
    pub fn new(speed_factor: f64) -> Self {
        Estimator { speed_factor }
    }

    pub fn estimate(&self, duration_secs: u64) -> f64 {
        let duration = duration_secs as f64;
        if self.speed_factor > 0.0 {
            duration / self.speed_factor
        } else {
            duration
        }
    }

    /// Running totals over `durations` in the order they will be encoded.
    pub fn schedule(&self, durations: &[u64], started: DateTime<Local>) -> Schedule {
        let mut cumulative_secs = 0.0;
        let entries: Vec<EtaEntry> = durations
            .iter()
            .map(|&d| {
                let estimate_secs = self.estimate(d);
                cumulative_secs += estimate_secs;
                EtaEntry {
                    estimate_secs,
                    cumulative_secs,
                    done_by: offset(started, cumulative_secs),
                }
            })
            .collect();
        Schedule {
            started,
            entries,
            total_secs: cumulative_secs,
        }
    }
}

impl Schedule {
    pub fn finish(&self) -> DateTime<Local> {
        offset(self.started, self.total_secs)
    }
}

/// Forecasts are capped at roughly ten thousand years out.
const MAX_OFFSET_SECS: i64 = 10_000 * 365 * 86_400;

fn offset(start: DateTime<Local>, secs: f64) -> DateTime<Local> {
    let secs = i64::try_from(round_secs(secs)).unwrap_or(i64::MAX).min(MAX_OFFSET_SECS);
    TimeDelta::try_seconds(secs)
        .and_then(|delta| start.checked_add_signed(delta))
        .unwrap_or(start)
}

pub fn round_secs(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        secs.round() as u64
    } else {
        0
    }
}

pub fn format_hms(secs: u64) -> String {
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}
