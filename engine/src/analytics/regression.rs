//! Ordinary least squares for a single regressor.
//!
//! Two flavours are provided: [`linear_regression`] fits every point and
//! reports slope, intercept, Pearson r, the two-sided p-value and the slope's
//! standard error; [`predictive_fit`] holds out a shuffled test partition and
//! reports R² on it as the accuracy score.

use std::collections::HashMap;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use shared::models::{PricePoint, RegressionResult, ReturnSeries};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::analytics::returns::compute_returns;
use crate::error::EngineError;

pub fn linear_regression(x: &[f64], y: &[f64]) -> Result<RegressionResult, EngineError> {
    if x.len() != y.len() {
        return Err(EngineError::DegenerateInput(format!(
            "Regression inputs differ in length: {} vs {}",
            x.len(),
            y.len()
        )));
    }
    let (xs, ys) = finite_pairs(x, y);
    let n = xs.len();
    if n < 2 {
        return Err(EngineError::InsufficientData(format!(
            "Regression needs at least 2 points, got {}",
            n
        )));
    }
    if all_equal(&xs) {
        return Err(EngineError::DegenerateInput(
            "Cannot fit a regression when all x values are identical".to_string(),
        ));
    }

    let nf = n as f64;
    let x_mean = xs.iter().sum::<f64>() / nf;
    let y_mean = ys.iter().sum::<f64>() / nf;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (xi, yi) in xs.iter().zip(&ys) {
        let dx = xi - x_mean;
        let dy = yi - y_mean;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    let y_constant = all_equal(&ys);
    if y_constant {
        syy = 0.0;
        sxy = 0.0;
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let r_value = if y_constant {
        0.0
    } else {
        (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
    };

    let (p_value, std_err) = if n == 2 {
        (if y_constant { 1.0 } else { 0.0 }, 0.0)
    } else if r_value.abs() == 1.0 {
        (0.0, 0.0)
    } else {
        let df = nf - 2.0;
        let t = r_value * (df / ((1.0 - r_value) * (1.0 + r_value))).sqrt();
        let dist = StudentsT::new(0.0, 1.0, df)
            .map_err(|e| EngineError::DegenerateInput(format!("Student's t distribution: {}", e)))?;
        let p = (2.0 * dist.sf(t.abs())).min(1.0);
        let se = ((1.0 - r_value * r_value) * syy / sxx / df).sqrt();
        (p, se)
    };

    Ok(RegressionResult {
        slope,
        intercept,
        r_value,
        p_value,
        std_err,
        accuracy_score: None,
    })
}

/// Inner join of two return series on timestamp, keeping simple returns in the asset's order.
pub fn align_returns(asset: &ReturnSeries, market: &ReturnSeries) -> (Vec<f64>, Vec<f64>) {
    let market_by_date: HashMap<NaiveDate, f64> = market
        .points
        .iter()
        .map(|p| (p.timestamp, p.simple_return))
        .collect();

    asset
        .points
        .iter()
        .filter_map(|p| market_by_date.get(&p.timestamp).map(|m| (p.simple_return, *m)))
        .unzip()
}

/// Beta of the asset against a market benchmark: regresses asset simple returns on market simple returns.
pub fn market_sensitivity(
    asset_prices: &[PricePoint],
    market_prices: &[PricePoint],
) -> Result<RegressionResult, EngineError> {
    let asset = compute_returns(asset_prices)?;
    let market = compute_returns(market_prices)?;
    let (asset_returns, market_returns) = align_returns(&asset, &market);
    tracing::debug!(
        asset_points = asset.len(),
        market_points = market.len(),
        aligned = asset_returns.len(),
        "Aligned returns for beta"
    );
    linear_regression(&market_returns, &asset_returns)
}

pub fn predictive_fit(
    x: &[f64],
    y: &[f64],
    test_fraction: f64,
    seed: u64,
) -> Result<RegressionResult, EngineError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(EngineError::InvalidRequest(format!(
            "Test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }
    let (xs, ys) = finite_pairs(x, y);
    let n = xs.len();
    let test_size = (test_fraction * n as f64).ceil() as usize;
    let train_size = n.saturating_sub(test_size);
    if train_size < 2 {
        return Err(EngineError::InsufficientData(format!(
            "Train partition needs at least 2 points, got {} of {}",
            train_size, n
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let (test_idx, train_idx) = indices.split_at(test_size);

    let pick = |idx: &[usize], values: &[f64]| idx.iter().map(|&i| values[i]).collect::<Vec<f64>>();
    let mut fit = linear_regression(&pick(train_idx, &xs), &pick(train_idx, &ys))?;

    let test_x = pick(test_idx, &xs);
    let test_y = pick(test_idx, &ys);
    let predicted: Vec<f64> = test_x.iter().map(|v| fit.intercept + fit.slope * v).collect();
    fit.accuracy_score = Some(r_squared(&test_y, &predicted));
    Ok(fit)
}

/// Predicts the close from the open of the same day.
pub fn open_close_model(
    prices: &[PricePoint],
    test_fraction: f64,
    seed: u64,
) -> Result<RegressionResult, EngineError> {
    let opens: Vec<f64> = prices.iter().map(|p| p.open).collect();
    let closes: Vec<f64> = prices.iter().map(|p| p.close).collect();
    predictive_fit(&opens, &closes, test_fraction, seed)
}

// Coefficient of determination; undefined for fewer than 2 observations.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() < 2 || actual.len() != predicted.len() {
        return f64::NAN;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

fn finite_pairs(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .unzip()
}

fn all_equal(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}
