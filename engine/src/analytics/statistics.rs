//! Descriptive statistics over a return series.
//!
//! Moments follow the usual financial conventions: variance and standard
//! deviation use the N-1 denominator, skewness and excess kurtosis use the
//! biased central moments, and the Jarque-Bera p-value comes from the
//! chi-squared distribution with two degrees of freedom.

use shared::models::{NormalityVerdict, ReturnKind, ReturnSeries, StatsSummary};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::error::EngineError;

/// Jarque-Bera p-values above this are reported as "likely normal".
pub const NORMALITY_ALPHA: f64 = 0.05;

/// Lower-tail quantile reported as the inter-quantile range of returns.
pub const VAR_QUANTILE: f64 = 0.05;

pub fn describe(values: &[f64]) -> Result<StatsSummary, EngineError> {
    if values.len() < 2 {
        return Err(EngineError::InsufficientData(format!(
            "Statistics need at least 2 returns, got {}",
            values.len()
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(EngineError::DegenerateInput("Return series contains non-finite values".to_string()));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = values.len() as f64;
    let constant = sorted[0] == sorted[sorted.len() - 1];
    let mean = if constant { sorted[0] } else { values.iter().sum::<f64>() / n };
    let moments = if constant {
        CentralMoments::flat()
    } else {
        CentralMoments::new(values, mean)
    };
    let variance = moments.m2 * n / (n - 1.0);
    let (skewness, kurtosis) = moments.shape();
    let (jarque_bera_stat, jarque_bera_pvalue) = jarque_bera(n, skewness, kurtosis)?;

    Ok(StatsSummary {
        mean,
        median: quantile_sorted(&sorted, 0.5),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        std_dev: variance.sqrt(),
        variance,
        skewness,
        kurtosis,
        jarque_bera_stat,
        jarque_bera_pvalue,
        inter_quantile_05: quantile_sorted(&sorted, VAR_QUANTILE),
        normality_verdict: verdict(jarque_bera_pvalue),
    })
}

pub fn describe_returns(returns: &ReturnSeries, kind: ReturnKind) -> Result<StatsSummary, EngineError> {
    describe(&returns.values(kind))
}

// NaN p-values (constant input) are never "normal".
pub fn verdict(p_value: f64) -> NormalityVerdict {
    if p_value > NORMALITY_ALPHA {
        NormalityVerdict::LikelyNormal
    } else {
        NormalityVerdict::LikelyNotNormal
    }
}

/// Maximum-likelihood normal fit: mean and population standard deviation.
pub fn normal_fit(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mu = values.iter().sum::<f64>() / n;
    let sigma = (values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / n).sqrt();
    Some((mu, sigma))
}

/// Quantile of already sorted data, interpolating linearly at position q*(n-1).
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

pub fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile_sorted(&sorted, q)
}

struct CentralMoments {
    m2: f64,
    m3: f64,
    m4: f64,
}

impl CentralMoments {
    fn new(values: &[f64], mean: f64) -> Self {
        let n = values.len() as f64;
        let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
        for v in values {
            let d = v - mean;
            let d2 = d * d;
            m2 += d2;
            m3 += d2 * d;
            m4 += d2 * d2;
        }
        Self {
            m2: m2 / n,
            m3: m3 / n,
            m4: m4 / n,
        }
    }

    fn flat() -> Self {
        Self { m2: 0.0, m3: 0.0, m4: 0.0 }
    }

    // Skewness and excess kurtosis; undefined (NaN) when the data has no spread.
    fn shape(&self) -> (f64, f64) {
        if self.m2 <= 0.0 {
            return (f64::NAN, f64::NAN);
        }
        let skewness = self.m3 / self.m2.powf(1.5);
        let kurtosis = self.m4 / (self.m2 * self.m2) - 3.0;
        (skewness, kurtosis)
    }
}

fn jarque_bera(n: f64, skewness: f64, kurtosis: f64) -> Result<(f64, f64), EngineError> {
    let stat = n / 6.0 * (skewness * skewness + kurtosis * kurtosis / 4.0);
    if !stat.is_finite() {
        return Ok((f64::NAN, f64::NAN));
    }
    let chi2 = ChiSquared::new(2.0).map_err(|e| EngineError::DegenerateInput(e.to_string()))?;
    Ok((stat, chi2.sf(stat)))
}
