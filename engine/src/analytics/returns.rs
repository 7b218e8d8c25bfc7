// Simple and log returns between consecutive closes
use shared::models::{PricePoint, ReturnPoint, ReturnSeries};

use crate::error::EngineError;

// Each return is stamped with the later of the two observations.
pub fn compute_returns(prices: &[PricePoint]) -> Result<ReturnSeries, EngineError> {
    if prices.len() < 2 {
        return Err(EngineError::InsufficientData(format!(
            "Returns need at least 2 prices, got {}",
            prices.len()
        )));
    }

    let points = prices
        .windows(2)
        .map(|w| {
            let ratio = w[1].close / w[0].close;
            ReturnPoint {
                timestamp: w[1].timestamp,
                simple_return: ratio - 1.0,
                log_return: ratio.ln(),
            }
        })
        .collect();
    Ok(ReturnSeries::new(points))
}
