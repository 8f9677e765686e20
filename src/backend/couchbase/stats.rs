use serde_json::Value;

use crate::core::BenchError;
use crate::stats::{CacheStats, round2};

/// Disk footprint of one index as reported by the index service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub scope: String,
    pub collection: String,
    pub index_name: String,
    pub disk_size: u64,
}

/// Collection name and size from `system:keyspaces_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    pub size: u64,
}

/// Reads `op.samples` of a bucket stats document.
pub fn parse_cache_stats(body: &Value) -> Result<CacheStats, BenchError> {
    let samples = body
        .get("op")
        .and_then(|op| op.get("samples"))
        .filter(|s| s.is_object())
        .ok_or_else(|| BenchError::StatsError("bucket stats without op.samples".to_string()))?;

    Ok(CacheStats {
        resident_items_rate: series(samples, "ep_resident_items_rate"),
        cache_miss_rate: series(samples, "ep_cache_miss_rate"),
        bg_fetches: series(samples, "ep_bg_fetched"),
        ops: series(samples, "ops"),
    })
}

fn series(samples: &Value, key: &str) -> Vec<f64> {
    match samples.get(key) {
        Some(Value::Array(values)) => values.iter().map(|v| v.as_f64().unwrap_or(0.0)).collect(),
        _ => Vec::new(),
    }
}

/// Reads the index service stats document, one entry per
/// `bucket:scope:collection:index` key.
pub fn parse_index_stats(body: &Value) -> Vec<IndexStats> {
    let Some(entries) = body.as_object() else {
        return Vec::new();
    };
    entries
        .iter()
        .map(|(key, stats)| {
            let (scope, collection, index_name) = parse_index_name(key);
            IndexStats {
                scope,
                collection,
                index_name,
                disk_size: stats.get("disk_size").and_then(Value::as_u64).unwrap_or(0),
            }
        })
        .collect()
}

/// Splits a qualified index name into (scope, collection, index).
///
/// `bucket:scope:collection:index` is the full form, `bucket:scope:index`
/// lives in the `_default` collection, anything else is `unknown`.
pub fn parse_index_name(qualified: &str) -> (String, String, String) {
    let parts: Vec<&str> = qualified.split(':').collect();
    match parts.len() {
        n if n >= 4 => (parts[1].into(), parts[2].into(), parts[3].into()),
        3 => (parts[1].into(), "_default".into(), parts[2].into()),
        _ => ("unknown".into(), "unknown".into(), qualified.into()),
    }
}

pub fn parse_collections(rows: &[Value]) -> Vec<CollectionInfo> {
    rows.iter()
        .filter_map(|row| {
            Some(CollectionInfo {
                name: row.get("name")?.as_str()?.to_string(),
                size: row.get("size").and_then(Value::as_u64).unwrap_or(0),
            })
        })
        .collect()
}

pub fn format_byte_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        b if b < KB => format!("{b} B"),
        b if b < MB => format!("{:.2} KB", b as f64 / KB as f64),
        b if b < GB => format!("{:.2} MB", b as f64 / MB as f64),
        b => format!("{:.2} GB", b as f64 / GB as f64),
    }
}

/// Index size as a percentage of its collection, 0 for an empty collection.
pub fn size_ratio(index_size: u64, table_size: u64) -> f64 {
    if table_size == 0 {
        return 0.0;
    }
    round2(index_size as f64 / table_size as f64 * 100.0)
}
