use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::core::BenchError;
use crate::model::CacheInfo;

use super::round2;

/// Longest trailing window, in one-second samples, used for smoothing.
const MAX_WINDOW_SECS: usize = 60;

/// Per-second bucket samples reported by the document store statistics endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub resident_items_rate: Vec<f64>,
    pub cache_miss_rate: Vec<f64>,
    pub bg_fetches: Vec<f64>,
    pub ops: Vec<f64>,
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Seconds covered by a run: `ceil(sum(latencies) / 1000)`.
pub fn total_seconds(latencies_ms: &[f64]) -> u64 {
    let total_ms: f64 = latencies_ms.iter().sum();
    if total_ms <= 0.0 {
        return 0;
    }
    (total_ms / 1000.0).ceil() as u64
}

/// Mean of the non-zero values among the last `min(total_secs, 60)` entries,
/// rounded to two decimals. Zero when the window is empty or all zero.
pub fn smoothed(series: &[f64], total_secs: u64) -> f64 {
    let window = (total_secs as usize).min(MAX_WINDOW_SECS);
    if window == 0 {
        return 0.0;
    }
    let (sum, count) = series
        .iter()
        .rev()
        .take(window)
        .filter(|v| **v != 0.0)
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return 0.0;
    }
    round2(sum / count as f64)
}

/// Per-execution cache estimate derived from one stats snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheEstimate {
    pub hits: f64,
    pub bg_fetches: f64,
    pub hit_rate: f64,
}

impl CacheEstimate {
    pub fn compute(stats: &CacheStats, total_secs: u64, executions: u32) -> Self {
        let secs = total_secs as f64;
        let n = executions.max(1) as f64;

        let bg_fetches = smoothed(&stats.bg_fetches, total_secs) * secs / n;
        let ops = smoothed(&stats.ops, total_secs);
        let hit_rate = 100.0 - smoothed(&stats.cache_miss_rate, total_secs);
        let hits = ops * hit_rate * secs / n;

        Self {
            hits,
            bg_fetches,
            hit_rate,
        }
    }

    /// Telemetry has not caught up when both counters truncate to zero.
    pub fn is_empty(&self) -> bool {
        self.hits as i64 == 0 && self.bg_fetches as i64 == 0
    }

    pub fn to_cache_info(&self) -> CacheInfo {
        CacheInfo::new(
            self.hits as i64,
            self.bg_fetches as i64,
            self.hit_rate as i32,
        )
    }
}

/// Polls bucket statistics until they reflect the run, with a bounded number
/// of retries.
#[derive(Clone)]
pub struct CacheSmoother {
    sleeper: Arc<dyn Sleeper>,
    max_retries: u32,
    delay: Duration,
}

impl CacheSmoother {
    pub fn new(sleeper: Arc<dyn Sleeper>, max_retries: u32, delay: Duration) -> Self {
        Self {
            sleeper,
            max_retries,
            delay,
        }
    }

    /// `None` when there are no latencies or when a fetch fails. Otherwise the
    /// last estimate, which may be all zero once retries are exhausted.
    pub async fn estimate<F, Fut>(
        &self,
        latencies_ms: &[f64],
        executions: u32,
        mut fetch: F,
    ) -> Option<CacheInfo>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<CacheStats, BenchError>> + Send,
    {
        if latencies_ms.is_empty() || executions == 0 {
            return None;
        }
        let total_secs = total_seconds(latencies_ms);

        let mut retries = 0;
        loop {
            let stats = match fetch().await {
                Ok(stats) => stats,
                Err(e) => {
                    warn!("Failed to fetch cache statistics: {e}");
                    return None;
                }
            };
            let estimate = CacheEstimate::compute(&stats, total_secs, executions);
            debug!(
                hits = estimate.hits,
                bg_fetches = estimate.bg_fetches,
                hit_rate = estimate.hit_rate,
                retries = retries;
                "Cache estimate"
            );

            if !estimate.is_empty() || retries >= self.max_retries {
                if estimate.is_empty() {
                    info!("Cache statistics still empty after {retries} retries");
                }
                return Some(estimate.to_cache_info());
            }
            retries += 1;
            self.sleeper.sleep(self.delay).await;
        }
    }
}
