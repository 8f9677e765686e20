mod cache;
mod latency;

pub use cache::{CacheEstimate, CacheSmoother, CacheStats, Sleeper, TokioSleeper, smoothed, total_seconds};
pub use latency::{LatencyStats, percentile, tps};

/// Rounds half away from zero to two decimals (half-up for the non-negative
/// values reported here).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.235000001), 1.24);
        assert_eq!(round2(2.0), 2.0);
        assert_eq!(round2(0.125), 0.13);
    }
}
