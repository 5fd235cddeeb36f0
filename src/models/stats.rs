//! Per-run fetch statistics

use std::time::Duration;

/// Counters for the symbol fetch loop
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchStats {
    /// Symbols attempted
    pub total: usize,
    /// Symbols with at least one point in the window
    pub success: usize,
    /// Provider/network/parse failures
    pub errors: usize,
    /// Fetched fine but nothing inside the window
    pub empty: usize,
    /// Points kept across all symbols
    pub total_points: usize,
    pub elapsed: Duration,
}

impl FetchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Success rate (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success as f64 / self.total as f64) * 100.0
        }
    }

    /// True when some, but not all, symbols produced data
    pub fn is_partial(&self) -> bool {
        self.success > 0 && self.success < self.total
    }

    pub fn log_summary(&self) {
        tracing::info!(
            total = self.total,
            success = self.success,
            errors = self.errors,
            empty = self.empty,
            total_points = self.total_points,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "Fetch finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let stats = FetchStats {
            total: 8,
            success: 6,
            errors: 2,
            ..FetchStats::default()
        };
        assert!((stats.success_rate() - 75.0).abs() < 1e-9);
        assert!(stats.is_partial());
    }

    #[test]
    fn test_empty_stats() {
        let stats = FetchStats::new();
        assert_eq!(stats.success_rate(), 0.0);
        assert!(!stats.is_partial());
    }
}
