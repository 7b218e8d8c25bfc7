use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use shared::models::PricePoint;
use std::fs::File;
use std::io::{BufReader, Read};

// Daily price exports: `Date,Open,High,Low,Close,Adj Close,Volume`, optionally with a `Symbol` column.
pub mod price_format {
    use anyhow::{anyhow, Result};
    use chrono::NaiveDate;

    // Accepts "2024-03-01" and the "2024-03-01 00:00:00+00:00" form some exporters write.
    pub fn parse_date(s: &str) -> Result<NaiveDate> {
        let trimmed = s.trim();
        let date_part = trimmed.split_whitespace().next().unwrap_or(trimmed);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map_err(|e| anyhow!("Failed to parse date '{}': {}", s, e))
    }

    // Empty cells and "null" mark a missing quote.
    pub fn parse_price(s: &str) -> Result<Option<f64>> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
            return Ok(None);
        }
        trimmed
            .replace(',', "")
            .parse::<f64>()
            .map(Some)
            .map_err(|e| anyhow!("Failed to parse price '{}': {}", s, e))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::Datelike;

        #[test]
        fn test_parse_date_plain() {
            let d = parse_date("2024-03-01").unwrap();
            assert_eq!((d.year(), d.month(), d.day()), (2024, 3, 1));
        }

        #[test]
        fn test_parse_date_with_time_suffix() {
            let d = parse_date("2023-12-31 00:00:00+00:00").unwrap();
            assert_eq!((d.year(), d.month(), d.day()), (2023, 12, 31));
        }

        #[test]
        fn test_parse_date_invalid() {
            assert!(parse_date("31/12/2023").is_err());
            assert!(parse_date("2023-02-30").is_err());
        }

        #[test]
        fn test_parse_price() {
            assert_eq!(parse_price("1.2345").unwrap(), Some(1.2345));
            assert_eq!(parse_price("1,234.5").unwrap(), Some(1234.5));
            assert_eq!(parse_price("").unwrap(), None);
            assert_eq!(parse_price("null").unwrap(), None);
            assert!(parse_price("abc").is_err());
        }
    }
}

pub struct PriceCsvParser;

impl PriceCsvParser {
    pub fn load_prices_from_csv(file_path: &str, symbol: &str) -> Result<Vec<PricePoint>> {
        let file = File::open(file_path).map_err(|e| anyhow!("Failed to open CSV file '{}': {}", file_path, e))?;
        Self::load_prices_from_reader(BufReader::new(file), symbol)
    }

    // Rows tagged with another symbol are skipped; rows without a Symbol column belong to `symbol`.
    pub fn load_prices_from_reader<R: Read>(reader: R, symbol: &str) -> Result<Vec<PricePoint>> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let mut points = Vec::new();

        for (idx, result) in rdr.records().enumerate() {
            let line = idx + 2;
            let record = result.map_err(|e| anyhow!("Error reading CSV record at line {}: {}", line, e))?;

            if let Some(row_symbol) = Self::get_field(&record, &headers, "Symbol") {
                if !row_symbol.is_empty() && !row_symbol.eq_ignore_ascii_case(symbol) {
                    continue;
                }
            }

            let date_str = Self::get_field(&record, &headers, "Date")
                .ok_or_else(|| anyhow!("Missing 'Date' field in CSV record at line {}", line))?;
            let open_str = Self::get_field(&record, &headers, "Open")
                .ok_or_else(|| anyhow!("Missing 'Open' field in CSV record at line {}", line))?;
            let close_str = Self::get_field(&record, &headers, "Close")
                .ok_or_else(|| anyhow!("Missing 'Close' field in CSV record at line {}", line))?;

            let timestamp = price_format::parse_date(date_str)
                .map_err(|e| anyhow!("Error parsing 'Date' at line {}: {}", line, e))?;
            let open = price_format::parse_price(open_str)
                .map_err(|e| anyhow!("Error parsing 'Open' at line {}: {}", line, e))?;
            let close = price_format::parse_price(close_str)
                .map_err(|e| anyhow!("Error parsing 'Close' at line {}: {}", line, e))?;

            match (open, close) {
                (Some(open), Some(close)) => points.push(PricePoint { timestamp, open, close }),
                _ => tracing::debug!(line, %timestamp, "Skipping CSV row with a missing quote"),
            }
        }
        Ok(points)
    }

    fn get_field<'a>(record: &'a StringRecord, headers: &StringRecord, name: &str) -> Option<&'a str> {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
            .and_then(|pos| record.get(pos))
    }
}

pub fn date_in_range(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    date >= start && date <= end
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_load_prices_from_csv_valid_data() {
        let csv_content = "\
Date,Open,High,Low,Close,Adj Close,Volume
2024-01-01,3.50,3.70,3.40,3.60,3.60,1000
2024-01-02,3.60,3.90,3.55,3.85,3.85,1200";
        let tmp_file = create_test_csv(csv_content);
        let points = PriceCsvParser::load_prices_from_csv(tmp_file.path().to_str().unwrap(), "NEAR-USD").unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(points[0].open, 3.50);
        assert_eq!(points[0].close, 3.60);
        assert_eq!(points[1].close, 3.85);
    }

    #[test]
    fn test_load_prices_filters_by_symbol_column() {
        let csv_content = "\
Symbol,Date,Open,Close
NEAR-USD,2024-01-01,3.5,3.6
BTC-USD,2024-01-01,42000,42500
near-usd,2024-01-02,3.6,3.8";
        let points = PriceCsvParser::load_prices_from_reader(csv_content.as_bytes(), "NEAR-USD").unwrap();
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.close < 10.0));
    }

    #[test]
    fn test_load_prices_skips_missing_quotes() {
        let csv_content = "\
Date,Open,Close
2024-01-01,3.5,3.6
2024-01-02,null,
2024-01-03,3.7,3.9";
        let points = PriceCsvParser::load_prices_from_reader(csv_content.as_bytes(), "NEAR-USD").unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].timestamp, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn test_load_prices_from_csv_empty_file() {
        let tmp_file = create_test_csv("Date,Open,High,Low,Close,Adj Close,Volume");
        let points = PriceCsvParser::load_prices_from_csv(tmp_file.path().to_str().unwrap(), "NEAR-USD").unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn test_load_prices_from_csv_missing_field() {
        let csv_content = "\
Date,Open,High,Low
2024-01-01,3.50,3.70,3.40";
        let result = PriceCsvParser::load_prices_from_reader(csv_content.as_bytes(), "NEAR-USD");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Missing 'Close' field"));
    }

    #[test]
    fn test_load_prices_from_csv_invalid_data_format() {
        let csv_content = "\
Date,Open,Close
2024-01-01,invalid,3.60";
        let result = PriceCsvParser::load_prices_from_reader(csv_content.as_bytes(), "NEAR-USD");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Error parsing 'Open'"));
    }

    #[test]
    fn test_load_prices_missing_file() {
        let result = PriceCsvParser::load_prices_from_csv("non_existent_prices.csv", "NEAR-USD");
        assert!(result.unwrap_err().to_string().contains("Failed to open CSV file"));
    }

    #[test]
    fn test_date_in_range_is_inclusive() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert!(date_in_range(start, start, end));
        assert!(date_in_range(end, start, end));
        assert!(!date_in_range(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), start, end));
    }
}
