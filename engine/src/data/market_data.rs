// Market data sources and the boundary cache in front of them
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::models::PricePoint;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::data::csv_parser::{date_in_range, PriceCsvParser};
use crate::error::EngineError;

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &str;

    /// Daily prices for `symbol` over the inclusive `[start, end]` range.
    /// An empty vector is a valid answer; a failed lookup is `DataUnavailable`.
    async fn fetch_series(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PricePoint>, EngineError>;
}

// Sorted ascending, one point per timestamp, closes finite and strictly positive.
pub fn normalize_series(mut points: Vec<PricePoint>) -> Vec<PricePoint> {
    let before = points.len();
    points.retain(|p| p.close.is_finite() && p.close > 0.0 && p.open.is_finite());
    points.sort_by_key(|p| p.timestamp);
    points.dedup_by_key(|p| p.timestamp);
    if points.len() != before {
        tracing::debug!(dropped = before - points.len(), kept = points.len(), "Normalized price series");
    }
    points
}

pub struct CsvMarketData {
    file_path: String,
}

impl CsvMarketData {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self { file_path: file_path.into() }
    }
}

#[async_trait]
impl MarketDataSource for CsvMarketData {
    fn name(&self) -> &str {
        "csv"
    }

    async fn fetch_series(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PricePoint>, EngineError> {
        let points = PriceCsvParser::load_prices_from_csv(&self.file_path, symbol).map_err(|e| {
            tracing::warn!(path = %self.file_path, %symbol, error = %e, "CSV price load failed");
            EngineError::DataUnavailable(format!("Could not load prices for '{}' from '{}': {}", symbol, self.file_path, e))
        })?;
        let in_range = points
            .into_iter()
            .filter(|p| date_in_range(p.timestamp, start, end))
            .collect();
        Ok(normalize_series(in_range))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

struct CachedSeries {
    fetched_at: Instant,
    points: Vec<PricePoint>,
}

/// Remembers recent `(symbol, start, end)` lookups for `ttl`.
/// The lock is held across the upstream fetch, so only one caller at a time touches the cache.
pub struct CachedMarketData<S> {
    inner: S,
    ttl: Duration,
    entries: Arc<Mutex<HashMap<SeriesKey, CachedSeries>>>,
}

impl<S: MarketDataSource> CachedMarketData<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn cached_entries(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl<S: MarketDataSource> MarketDataSource for CachedMarketData<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_series(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PricePoint>, EngineError> {
        let key = SeriesKey { symbol: symbol.to_string(), start, end };
        let mut entries = self.entries.lock().await;

        if let Some(hit) = entries.get(&key) {
            if hit.fetched_at.elapsed() < self.ttl {
                tracing::debug!(%symbol, %start, %end, "Serving price series from cache");
                return Ok(hit.points.clone());
            }
        }
        entries.retain(|_, cached| cached.fetched_at.elapsed() < self.ttl);

        let points = self.inner.fetch_series(symbol, start, end).await?;
        entries.insert(
            key,
            CachedSeries {
                fetched_at: Instant::now(),
                points: points.clone(),
            },
        );
        Ok(points)
    }
}
