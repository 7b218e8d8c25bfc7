// Engine main entry point
use engine::config::settings::EngineSettings;
use engine::data::{CachedMarketData, CsvMarketData, MarketDataSource, NearBlocksStats, YahooChartSource};
use engine::narrative::OpenAiCompletions;
use engine::services::{AnalysisReport, AnalysisRequest, AnalysisService};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG controls verbosity, e.g. RUST_LOG=engine=debug
    tracing_subscriber::fmt::init();

    info!("Starting price insight engine...");
    let settings = EngineSettings::from_env()?;
    info!(symbol = %settings.asset.symbol, network = ?settings.network, "Configuration loaded");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.providers.request_timeout_secs))
        .build()?;

    let source: Arc<dyn MarketDataSource> = match &settings.providers.csv_path {
        Some(path) => {
            info!(%path, "Reading prices from CSV");
            Arc::new(CsvMarketData::new(path.clone()))
        }
        None => Arc::new(CachedMarketData::new(
            YahooChartSource::new(client.clone(), settings.providers.yahoo_base_url.clone()),
            Duration::from_secs(settings.providers.cache_ttl_secs),
        )),
    };
    let network = Arc::new(NearBlocksStats::new(client.clone(), settings.nearblocks_base_url()));
    let narrator = Arc::new(OpenAiCompletions::new(client, &settings.narrative));

    let today = chrono::Utc::now().date_naive();
    let request = AnalysisRequest::from_settings(&settings.asset, today);
    let service = AnalysisService::new(settings, source, network, narrator);

    let report = service.run(&request).await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &AnalysisReport) {
    println!(
        "{} from {} to {} ({} daily points, run {})",
        report.request.symbol, report.request.start, report.request.end, report.points, report.run_id
    );

    if let Some(findings) = &report.findings {
        println!("\nKey findings:\n{}", findings.to_prompt_block());
    }
    if let Some(text) = &report.findings_narrative {
        println!("Outlook:\n{}\n", text);
    }

    if report.anomaly_months.is_empty() {
        println!("No anomalies detected with the current settings.");
    } else {
        print!("{}", engine::narrative::anomaly_overview(&report.anomaly_months));
    }
    if let Some(text) = &report.anomaly_narrative {
        println!("Anomaly analysis:\n{}\n", text);
    }

    for notice in &report.notices {
        println!("[skipped {:?}] {}", notice.stage, notice.message);
    }
}
