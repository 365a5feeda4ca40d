use std::collections::VecDeque;
use std::time::Duration;

/// Rolling average over the last `capacity` samples.
#[derive(Clone, Debug)]
pub struct RollingAverage {
    values: VecDeque<f32>,
    capacity: usize,
}

impl RollingAverage {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, value: f32) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn average(&self) -> f32 {
        if self.values.is_empty() {
            0.0
        } else {
            self.values.iter().sum::<f32>() / self.values.len() as f32
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Counters for one simulation instance.
#[derive(Clone, Debug)]
pub struct SimMetrics {
    pub ticks: u64,
    pub integrations: u64,
    pub skipped_invisible: u64,
    pub culled_ticks: u64,
    step_avg: RollingAverage,
    job_ms_avg: RollingAverage,
}

impl SimMetrics {
    pub fn new() -> Self {
        Self {
            ticks: 0,
            integrations: 0,
            skipped_invisible: 0,
            culled_ticks: 0,
            step_avg: RollingAverage::new(60),
            job_ms_avg: RollingAverage::new(60),
        }
    }

    pub fn record_step(&mut self, step: f32) {
        self.integrations += 1;
        self.step_avg.push(step);
    }

    pub fn record_job(&mut self, elapsed: Duration) {
        self.job_ms_avg.push(elapsed.as_secs_f32() * 1000.0);
    }

    /// Mean integration step over recent integrations (seconds).
    pub fn average_step(&self) -> f32 {
        self.step_avg.average()
    }

    /// Mean dispatch-to-join wall time over recent jobs (milliseconds).
    pub fn average_job_ms(&self) -> f32 {
        self.job_ms_avg.average()
    }

    /// Fraction of ticks that ran the integrator.
    pub fn integration_ratio(&self) -> f32 {
        if self.ticks == 0 {
            0.0
        } else {
            self.integrations as f32 / self.ticks as f32
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Ticks: {} | Integrations: {} ({:.0}%) | Step: {:.2}ms | Job: {:.3}ms | Culled: {} | Hidden: {}",
            self.ticks,
            self.integrations,
            self.integration_ratio() * 100.0,
            self.average_step() * 1000.0,
            self.average_job_ms(),
            self.culled_ticks,
            self.skipped_invisible,
        )
    }
}

impl Default for SimMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_average_window() {
        let mut avg = RollingAverage::new(3);
        for v in [1.0, 2.0, 3.0, 10.0] {
            avg.push(v);
        }
        assert_eq!(avg.len(), 3);
        assert!((avg.average() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_integration_ratio() {
        let mut metrics = SimMetrics::new();
        assert_eq!(metrics.integration_ratio(), 0.0);
        metrics.ticks = 4;
        metrics.record_step(0.01);
        assert!((metrics.integration_ratio() - 0.25).abs() < 1e-6);
        assert!(metrics.format_summary().contains("Integrations: 1 (25%)"));
    }
}
