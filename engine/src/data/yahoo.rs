// Daily history from the Yahoo Finance chart endpoint
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use shared::models::PricePoint;

use crate::data::market_data::{normalize_series, MarketDataSource};
use crate::error::EngineError;

pub struct YahooChartSource {
    client: Client,
    base_url: String,
}

impl YahooChartSource {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    // period2 is exclusive upstream, so the day after `end` keeps the range inclusive.
    pub fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let period1 = start.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp()).unwrap_or(0);
        let period2 = end
            .checked_add_days(Days::new(1))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(period1);
        format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=history",
            self.base_url, symbol, period1, period2
        )
    }
}

#[async_trait]
impl MarketDataSource for YahooChartSource {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch_series(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PricePoint>, EngineError> {
        let url = self.chart_url(symbol, start, end);
        tracing::debug!(%symbol, %start, %end, "Requesting Yahoo chart history");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| EngineError::DataUnavailable(format!("Price request for '{}' failed: {}", symbol, e)))?;
        let history: ChartHistory = response
            .json()
            .await
            .map_err(|e| EngineError::DataUnavailable(format!("Price response for '{}' could not be decoded: {}", symbol, e)))?;

        let points = history.into_price_points(symbol)?;
        Ok(normalize_series(
            points.into_iter().filter(|p| p.timestamp >= start && p.timestamp <= end).collect(),
        ))
    }
}

#[derive(Deserialize, Debug)]
pub struct ChartHistory {
    pub chart: ChartResponse,
}

#[derive(Deserialize, Debug)]
pub struct ChartResponse {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
pub struct ChartError {
    pub code: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ChartResult {
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: ChartIndicators,
}

#[derive(Deserialize, Debug)]
pub struct ChartIndicators {
    pub quote: Vec<ChartQuote>,
}

#[derive(Deserialize, Debug)]
pub struct ChartQuote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

impl ChartHistory {
    // Rows with a null open or close are dropped; an empty result is an empty series.
    pub fn into_price_points(self, symbol: &str) -> Result<Vec<PricePoint>, EngineError> {
        let results = match self.chart.result {
            Some(results) => results,
            None => {
                let reason = self
                    .chart
                    .error
                    .and_then(|e| e.description.or(e.code))
                    .unwrap_or_else(|| "no result".to_string());
                tracing::warn!(%symbol, %reason, "Yahoo returned no chart result");
                return Err(EngineError::DataUnavailable(format!("No price history for '{}': {}", symbol, reason)));
            }
        };
        let Some(base) = results.into_iter().next() else {
            return Ok(Vec::new());
        };
        let Some(quote) = base.indicators.quote.into_iter().next() else {
            return Ok(Vec::new());
        };

        let points = base
            .timestamp
            .iter()
            .zip(quote.open.iter())
            .zip(quote.close.iter())
            .filter_map(|((ts, open), close)| {
                let timestamp = DateTime::from_timestamp(*ts, 0)?.date_naive();
                Some(PricePoint {
                    timestamp,
                    open: (*open)?,
                    close: (*close)?,
                })
            })
            .collect();
        Ok(points)
    }
}
