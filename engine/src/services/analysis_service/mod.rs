// engine/src/services/analysis_service/mod.rs
// AnalysisService runs one request through every stage in order.
// A failing stage leaves a Notice behind and the run carries on with what it has.

pub mod report;

use std::sync::Arc;

use chrono::Utc;
use shared::models::{PricePoint, RegressionResult, ReturnKind, ReturnSeries};
use tracing::Instrument;
use uuid::Uuid;

use crate::analytics::{
    aggregate_findings, compute_returns, describe_returns, detect_anomalies, market_sensitivity, normal_fit,
    open_close_model, summarize_anomalies, FindingsInput, IsolationForest,
};
use crate::config::EngineSettings;
use crate::data::{MarketDataSource, NetworkMetricsSource};
use crate::error::EngineError;
use crate::narrative::{anomaly_prompt, findings_prompt, NarrativeGenerator};

pub use report::{AnalysisReport, AnalysisRequest, Notice, NormalFit, Stage};

pub struct AnalysisService {
    settings: EngineSettings,
    source: Arc<dyn MarketDataSource>,
    network: Arc<dyn NetworkMetricsSource>,
    narrator: Arc<dyn NarrativeGenerator>,
}

impl AnalysisService {
    pub fn new(
        settings: EngineSettings,
        source: Arc<dyn MarketDataSource>,
        network: Arc<dyn NetworkMetricsSource>,
        narrator: Arc<dyn NarrativeGenerator>,
    ) -> Self {
        AnalysisService {
            settings,
            source,
            network,
            narrator,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Only an invalid request is an error; stage failures are reported as notices.
    pub async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisReport, EngineError> {
        request.validate(Utc::now().date_naive())?;

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("analysis", %run_id, symbol = %request.symbol);
        async {
            tracing::info!(start = %request.start, end = %request.end, source = self.source.name(), "Analysis started");
            let report = self.run_stages(run_id, request).await;
            tracing::info!(
                points = report.points,
                anomalies = report.anomaly_count(),
                notices = report.notices.len(),
                "Analysis finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self, run_id: Uuid, request: &AnalysisRequest) -> AnalysisReport {
        let mut report = AnalysisReport::new(run_id, request.clone());

        let fetched = self.source.fetch_series(&request.symbol, request.start, request.end).await;
        let Some(prices) = report.record(Stage::Load, fetched) else {
            return report;
        };
        report.points = prices.len();
        if prices.is_empty() {
            let empty = EngineError::DataUnavailable(format!(
                "No price data for '{}' between {} and {}",
                request.symbol, request.start, request.end
            ));
            report.record::<()>(Stage::Load, Err(empty));
            return report;
        }

        let returns = report.record(Stage::Returns, compute_returns(&prices));
        if let Some(returns) = &returns {
            self.describe(&mut report, returns);
        }

        let detector = IsolationForest::from_settings(&self.settings.anomaly);
        report.anomalies = detect_anomalies(&detector, &prices);
        report.anomaly_months = summarize_anomalies(&report.anomalies);

        if returns.is_some() {
            let beta = self.beta(request, &prices).await;
            report.beta = report.record(Stage::Beta, beta);
        }

        let regression = &self.settings.regression;
        report.open_close = report.record(
            Stage::OpenCloseModel,
            open_close_model(&prices, regression.test_fraction, regression.seed),
        );

        let network = self.network.fetch_network_stats().await;
        report.network = report.record(Stage::NetworkMetrics, network);

        let findings = aggregate_findings(&FindingsInput {
            simple_stats: report.simple_stats.as_ref(),
            log_stats: report.log_stats.as_ref(),
            open_close: report.open_close.as_ref(),
            beta: report.beta.as_ref(),
            network: report.network.as_ref(),
        });
        report.findings = Some(findings);

        self.narrate(&mut report).await;
        report
    }

    fn describe(&self, report: &mut AnalysisReport, returns: &ReturnSeries) {
        report.simple_stats = report.record(Stage::Statistics, describe_returns(returns, ReturnKind::Simple));
        report.log_stats = report.record(Stage::Statistics, describe_returns(returns, ReturnKind::Log));
        report.normal_fit = normal_fit(&returns.log()).map(|(mu, sigma)| NormalFit { mu, sigma });
    }

    async fn beta(&self, request: &AnalysisRequest, prices: &[PricePoint]) -> Result<RegressionResult, EngineError> {
        let market = self
            .source
            .fetch_series(&request.market_symbol, request.start, request.end)
            .await?;
        tracing::debug!(market = %request.market_symbol, points = market.len(), "Loaded benchmark series");
        market_sensitivity(prices, &market)
    }

    async fn narrate(&self, report: &mut AnalysisReport) {
        let narrative = &self.settings.narrative;
        let asset = report.request.symbol.clone();

        if let Some(findings) = &report.findings {
            let prompt = findings_prompt(&asset, findings);
            let text = self.narrator.generate(&prompt, narrative.findings_max_tokens).await;
            report.findings_narrative = report.record(Stage::Narrative, text);
        }

        if !report.anomaly_months.is_empty() {
            let prompt = anomaly_prompt(&asset, &report.anomaly_months);
            let text = self.narrator.generate(&prompt, narrative.anomaly_max_tokens).await;
            report.anomaly_narrative = report.record(Stage::Narrative, text);
        }
    }
}
