//! Wait-Time Estimator
//!
//! Estimates a WAITING entry's wait as the number of entries ranked ahead of
//! it in the same specialty times the rolling average service duration for
//! that specialty, plus a fixed triage overhead. Service durations come from
//! COMPLETED entries (`end_time - start_time`) over a trailing window: the
//! last `service_window_completions` completions or `service_window_days`
//! days, whichever is smaller. Specialties with fewer than
//! `min_specialty_samples` samples fall back to the cross-specialty average;
//! with no samples anywhere the estimate is unknown (`None`).

use crate::core::config::QueueConfig;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy)]
struct ServiceSample {
    duration_minutes: f64,
    completed_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct WaitTimeEstimator {
    windows: HashMap<String, VecDeque<ServiceSample>>,
    max_samples: usize,
    max_age: Duration,
    min_specialty_samples: usize,
    triage_overhead_minutes: u32,
}

impl WaitTimeEstimator {
    pub fn from_config(config: &QueueConfig) -> Self {
        Self {
            windows: HashMap::new(),
            max_samples: config.service_window_completions,
            max_age: Duration::days(config.service_window_days),
            min_specialty_samples: config.min_specialty_samples,
            triage_overhead_minutes: config.triage_overhead_minutes,
        }
    }

    /// Record one completed consultation. Negative durations (clock skew in
    /// the source rows) are discarded.
    pub fn record_completion(
        &mut self,
        specialty: &str,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) {
        let duration = completed_at - started_at;
        if duration < Duration::zero() {
            log::warn!(
                "discarding negative service duration for specialty '{}'",
                specialty
            );
            return;
        }

        let window = self.windows.entry(specialty.to_string()).or_default();
        window.push_back(ServiceSample {
            duration_minutes: duration.num_seconds() as f64 / 60.0,
            completed_at,
        });
        while window.len() > self.max_samples {
            window.pop_front();
        }
        let cutoff = completed_at - self.max_age;
        while window.front().is_some_and(|s| s.completed_at < cutoff) {
            window.pop_front();
        }
    }

    /// Estimated wait in whole minutes for an entry with `ahead` same-specialty
    /// entries ranked before it. `None` when no service history exists at all.
    pub fn estimate(&self, ahead: usize, specialty: &str, now: DateTime<Utc>) -> Option<u32> {
        let average = self
            .specialty_average(specialty, now)
            .or_else(|| self.global_average(now))?;
        let minutes = ahead as f64 * average + self.triage_overhead_minutes as f64;
        Some(minutes.round() as u32)
    }

    /// Rolling average for one specialty, or `None` below the sample floor.
    fn specialty_average(&self, specialty: &str, now: DateTime<Utc>) -> Option<f64> {
        let samples = self.fresh_samples(specialty, now);
        if samples.len() < self.min_specialty_samples {
            return None;
        }
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }

    /// Average over every specialty's fresh samples.
    fn global_average(&self, now: DateTime<Utc>) -> Option<f64> {
        let mut total = 0.0;
        let mut count = 0usize;
        for specialty in self.windows.keys() {
            for duration in self.fresh_samples(specialty, now) {
                total += duration;
                count += 1;
            }
        }
        if count == 0 {
            None
        } else {
            Some(total / count as f64)
        }
    }

    fn fresh_samples(&self, specialty: &str, now: DateTime<Utc>) -> Vec<f64> {
        let cutoff = now - self.max_age;
        self.windows
            .get(specialty)
            .map(|window| {
                window
                    .iter()
                    .filter(|s| s.completed_at >= cutoff)
                    .map(|s| s.duration_minutes)
                    .collect()
            })
            .unwrap_or_default()
    }
}
