//! Per-run result and timing.

use std::fmt;
use std::time::Duration;

/// Result of one pipeline run.
///
/// `elapsed` spans from just before the map stage is scheduled to just after
/// the reduce result is available. Scratch allocation is not included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunMetrics<A> {
    pub elapsed: Duration,
    pub map_elapsed: Duration,
    pub reduce_elapsed: Duration,
    pub sample_count: usize,
    pub batch_size: usize,
    pub batch_count: usize,
    pub aggregate: A,
}

impl<A> RunMetrics<A> {
    /// Samples processed per second, or 0 when no time was measured.
    pub fn samples_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.sample_count as f64 / secs
        } else {
            0.0
        }
    }
}

impl<A: fmt::Display> fmt::Display for RunMetrics<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "aggregate {} over {} samples in {:?} (map: {:?}, reduce: {:?}, {} batches of {})",
            self.aggregate,
            self.sample_count,
            self.elapsed,
            self.map_elapsed,
            self.reduce_elapsed,
            self.batch_count,
            self.batch_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(elapsed: Duration) -> RunMetrics<u64> {
        RunMetrics {
            elapsed,
            map_elapsed: elapsed / 2,
            reduce_elapsed: elapsed / 2,
            sample_count: 1000,
            batch_size: 100,
            batch_count: 10,
            aggregate: 12345,
        }
    }

    #[test]
    fn test_samples_per_second() {
        let m = metrics(Duration::from_millis(500));
        assert!((m.samples_per_second() - 2000.0).abs() < 1e-9);
        assert_eq!(metrics(Duration::ZERO).samples_per_second(), 0.0);
    }

    #[test]
    fn test_display() {
        let text = metrics(Duration::from_millis(2)).to_string();
        assert_eq!(
            text,
            "aggregate 12345 over 1000 samples in 2ms (map: 1ms, reduce: 1ms, 10 batches of 100)"
        );
    }
}
