// Price history and network statistics providers
pub mod csv_parser;
pub mod market_data;
pub mod network_stats;
pub mod yahoo;

pub use market_data::{normalize_series, CachedMarketData, CsvMarketData, MarketDataSource};
pub use network_stats::{NearBlocksStats, NetworkMetricsSource};
pub use yahoo::YahooChartSource;
