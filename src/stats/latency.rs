use crate::core::BenchError;

use super::round2;

/// Aggregate statistics over one sample of millisecond latencies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyStats {
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub p95: f64,
    pub tps: f64,
}

impl LatencyStats {
    /// All values are rounded to two decimals; TPS is derived from the rounded mean.
    pub fn from_samples(samples: &[f64]) -> Result<Self, BenchError> {
        if samples.is_empty() {
            return Err(BenchError::NoSamples(
                "latency statistics need at least one execution".to_string(),
            ));
        }

        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        let mean = round2(mean);
        Ok(Self {
            mean,
            variance: round2(variance),
            std_dev: round2(std_dev),
            p95: round2(percentile(samples, 95.0)),
            tps: tps(mean),
        })
    }
}

/// Queries per second for a mean latency in milliseconds.
pub fn tps(mean_ms: f64) -> f64 {
    if mean_ms <= 0.0 {
        return 0.0;
    }
    round2(1000.0 / mean_ms)
}

/// Percentile with linear interpolation at position `p * (n + 1) / 100`
/// over the sorted sample. Positions below 1 clamp to the minimum, positions
/// at or past `n` clamp to the maximum.
pub fn percentile(samples: &[f64], p: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = p * (n as f64 + 1.0) / 100.0;
    if pos < 1.0 {
        return sorted[0];
    }
    if pos >= n as f64 {
        return sorted[n - 1];
    }
    let lower = pos.floor();
    let d = pos - lower;
    let lower_value = sorted[lower as usize - 1];
    let upper_value = sorted[lower as usize];
    lower_value + d * (upper_value - lower_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_stats() {
        let stats = LatencyStats::from_samples(&[10.0, 20.0, 30.0, 40.0]).unwrap();
        assert_eq!(stats.mean, 25.0);
        assert_eq!(stats.variance, 125.0);
        assert_eq!(stats.std_dev, 11.18);
        assert_eq!(stats.p95, 40.0);
        assert_eq!(stats.tps, 40.0);
    }

    #[test]
    fn test_single_sample() {
        let stats = LatencyStats::from_samples(&[7.0]).unwrap();
        assert_eq!(stats.mean, 7.0);
        assert_eq!(stats.variance, 0.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.p95, 7.0);
        assert_eq!(stats.tps, 142.86);
    }

    #[test]
    fn test_empty_sample_rejected() {
        assert!(matches!(
            LatencyStats::from_samples(&[]),
            Err(BenchError::NoSamples(_))
        ));
    }

    #[test]
    fn test_percentile_interpolates() {
        let samples: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        // pos = 0.95 * 101 = 95.95 -> 95 + 0.95 * (96 - 95)
        assert!((percentile(&samples, 95.0) - 95.95).abs() < 1e-9);
        // input order must not matter
        let mut reversed = samples.clone();
        reversed.reverse();
        assert_eq!(percentile(&samples, 95.0), percentile(&reversed, 95.0));
    }

    #[test]
    fn test_tps_times_mean_is_thousand() {
        let samples_set: [&[f64]; 4] = [
            &[1.0, 2.0, 3.0],
            &[0.37, 0.41, 0.39, 0.52],
            &[1234.5, 987.2],
            &[15.0; 20],
        ];
        for samples in samples_set {
            let stats = LatencyStats::from_samples(samples).unwrap();
            let product = stats.tps * stats.mean;
            // tps is rounded to 0.01, so the product drifts by at most 0.005 * mean
            assert!(
                (product - 1000.0).abs() <= 0.005 * stats.mean + 1e-9,
                "tps {} * mean {} = {product}",
                stats.tps,
                stats.mean
            );
        }
    }

    #[test]
    fn test_zero_mean_has_zero_tps() {
        let stats = LatencyStats::from_samples(&[0.0, 0.0]).unwrap();
        assert_eq!(stats.tps, 0.0);
    }
}
