// Chain-wide price statistics from the NearBlocks explorer API
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::models::NetworkMetrics;

use crate::error::EngineError;

#[async_trait]
pub trait NetworkMetricsSource: Send + Sync {
    async fn fetch_network_stats(&self) -> Result<NetworkMetrics, EngineError>;
}

pub struct NearBlocksStats {
    client: Client,
    base_url: String,
}

impl NearBlocksStats {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn stats_url(&self) -> String {
        format!("{}/v1/stats", self.base_url)
    }
}

#[async_trait]
impl NetworkMetricsSource for NearBlocksStats {
    async fn fetch_network_stats(&self) -> Result<NetworkMetrics, EngineError> {
        let url = self.stats_url();
        tracing::debug!(%url, "Requesting network stats");
        let body: Value = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| EngineError::DataUnavailable(format!("Network stats request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| EngineError::DataUnavailable(format!("Network stats response could not be decoded: {}", e)))?;
        Ok(parse_network_metrics(&body))
    }
}

// The explorer wraps the figures in `stats[0]`; a flat object is accepted too.
// Values arrive as strings or numbers; anything unusable is left as None.
pub fn parse_network_metrics(body: &Value) -> NetworkMetrics {
    let stats = body
        .get("stats")
        .and_then(|s| s.as_array())
        .and_then(|arr| arr.first())
        .unwrap_or(body);

    NetworkMetrics {
        high_24h: numeric_field(stats, "high_24h"),
        high_all: numeric_field(stats, "high_all"),
        low_24h: numeric_field(stats, "low_24h"),
        low_all: numeric_field(stats, "low_all"),
        change_24: numeric_field(stats, "change_24"),
    }
}

fn numeric_field(stats: &Value, name: &str) -> Option<f64> {
    let value = match stats.get(name)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}
