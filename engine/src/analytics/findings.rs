use shared::models::{FindingsSummary, NetworkMetrics, RegressionResult, StatsSummary};
use shared::utils::{format_optional, format_scientific, NOT_AVAILABLE};

const STAT_DECIMALS: usize = 4;
const CURRENCY_DECIMALS: usize = 2;
const PVALUE_DECIMALS: usize = 2;

/// Everything the aggregator reads. Absent sections render as "N/A".
#[derive(Debug, Clone, Copy, Default)]
pub struct FindingsInput<'a> {
    pub simple_stats: Option<&'a StatsSummary>,
    pub log_stats: Option<&'a StatsSummary>,
    pub open_close: Option<&'a RegressionResult>,
    pub beta: Option<&'a RegressionResult>,
    pub network: Option<&'a NetworkMetrics>,
}

/// Formats every analysis output into the fixed field order used by the findings prompt.
pub fn aggregate_findings(input: &FindingsInput<'_>) -> FindingsSummary {
    let mut summary = FindingsSummary::default();
    let stat = |value: Option<f64>| format_optional(value, STAT_DECIMALS);
    let pvalue = |value: Option<f64>| match value {
        Some(v) => format_scientific(v, PVALUE_DECIMALS),
        None => NOT_AVAILABLE.to_string(),
    };

    let simple = input.simple_stats;
    summary.push("Mean Return", stat(simple.map(|s| s.mean)));
    summary.push("Min Return", stat(simple.map(|s| s.min)));
    summary.push("Max Return", stat(simple.map(|s| s.max)));
    summary.push("Median Return", stat(simple.map(|s| s.median)));
    summary.push("Standard Deviation", stat(simple.map(|s| s.std_dev)));
    summary.push("Inter-Quantile Range", stat(simple.map(|s| s.inter_quantile_05)));

    let log = input.log_stats;
    summary.push("Variance", stat(log.map(|s| s.variance)));
    summary.push("Skewness", stat(log.map(|s| s.skewness)));
    summary.push("Kurtosis", stat(log.map(|s| s.kurtosis)));
    summary.push("Jarque-Bera Statistic", stat(log.map(|s| s.jarque_bera_stat)));
    summary.push("Jarque-Bera P-value", pvalue(log.map(|s| s.jarque_bera_pvalue)));
    summary.push(
        "Normality",
        log.map(|s| s.normality_verdict.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    );

    summary.push(
        "Model Accuracy Score",
        format_optional(input.open_close.and_then(|r| r.accuracy_score), CURRENCY_DECIMALS),
    );

    let beta = input.beta;
    summary.push("Beta", stat(beta.map(|r| r.slope)));
    summary.push("Beta Intercept", stat(beta.map(|r| r.intercept)));
    summary.push("Beta R-value", stat(beta.map(|r| r.r_value)));
    summary.push("Beta P-value", pvalue(beta.map(|r| r.p_value)));
    summary.push("Beta Std Error", stat(beta.map(|r| r.std_err)));

    let network = input.network.copied().unwrap_or_default();
    summary.push("24h High", format_optional(network.high_24h, CURRENCY_DECIMALS));
    summary.push("All-Time High", format_optional(network.high_all, CURRENCY_DECIMALS));
    summary.push("24h Low", format_optional(network.low_24h, CURRENCY_DECIMALS));
    summary.push("All-Time Low", format_optional(network.low_all, CURRENCY_DECIMALS));
    summary.push("24h Change", format_optional(network.change_24, CURRENCY_DECIMALS));

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::NormalityVerdict;

    fn stats() -> StatsSummary {
        StatsSummary {
            mean: 0.001234,
            median: 0.0005,
            min: -0.12346,
            max: 0.2,
            std_dev: 0.04,
            variance: 0.0016,
            skewness: 0.5,
            kurtosis: 3.25,
            jarque_bera_stat: 120.5,
            jarque_bera_pvalue: 1.234e-5,
            inter_quantile_05: -0.061,
            normality_verdict: NormalityVerdict::LikelyNotNormal,
        }
    }

    fn regression(accuracy: Option<f64>) -> RegressionResult {
        RegressionResult {
            slope: 1.23456,
            intercept: -0.0001,
            r_value: 0.7,
            p_value: 0.0,
            std_err: 0.05,
            accuracy_score: accuracy,
        }
    }

    #[test]
    fn test_field_order_and_formatting() {
        let s = stats();
        let oc = regression(Some(0.98765));
        let beta = regression(None);
        let network = NetworkMetrics {
            high_24h: Some(7.456),
            high_all: Some(20.44),
            low_24h: Some(6.9),
            low_all: Some(0.52),
            change_24: Some(-3.14159),
        };
        let input = FindingsInput {
            simple_stats: Some(&s),
            log_stats: Some(&s),
            open_close: Some(&oc),
            beta: Some(&beta),
            network: Some(&network),
        };
        let summary = aggregate_findings(&input);

        let labels: Vec<&str> = summary.fields.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Mean Return",
                "Min Return",
                "Max Return",
                "Median Return",
                "Standard Deviation",
                "Inter-Quantile Range",
                "Variance",
                "Skewness",
                "Kurtosis",
                "Jarque-Bera Statistic",
                "Jarque-Bera P-value",
                "Normality",
                "Model Accuracy Score",
                "Beta",
                "Beta Intercept",
                "Beta R-value",
                "Beta P-value",
                "Beta Std Error",
                "24h High",
                "All-Time High",
                "24h Low",
                "All-Time Low",
                "24h Change",
            ]
        );
        assert_eq!(summary.get("Mean Return"), Some("0.0012"));
        assert_eq!(summary.get("Min Return"), Some("-0.1235"));
        assert_eq!(summary.get("Jarque-Bera Statistic"), Some("120.5000"));
        assert_eq!(summary.get("Jarque-Bera P-value"), Some("1.23e-05"));
        assert_eq!(summary.get("Normality"), Some("likely not normal"));
        assert_eq!(summary.get("Model Accuracy Score"), Some("0.99"));
        assert_eq!(summary.get("Beta"), Some("1.2346"));
        assert_eq!(summary.get("Beta P-value"), Some("0.00e+00"));
        assert_eq!(summary.get("24h High"), Some("7.46"));
        assert_eq!(summary.get("24h Change"), Some("-3.14"));
    }

    #[test]
    fn test_missing_inputs_render_sentinel() {
        let network = NetworkMetrics {
            high_24h: Some(5.0),
            ..NetworkMetrics::default()
        };
        let input = FindingsInput {
            network: Some(&network),
            ..FindingsInput::default()
        };
        let summary = aggregate_findings(&input);
        assert_eq!(summary.fields.len(), 23);
        assert_eq!(summary.get("24h High"), Some("5.00"));
        assert_eq!(summary.get("All-Time Low"), Some(NOT_AVAILABLE));
        assert_eq!(summary.get("Beta P-value"), Some(NOT_AVAILABLE));
        assert_eq!(summary.get("Normality"), Some(NOT_AVAILABLE));
        assert_eq!(summary.get("Model Accuracy Score"), Some(NOT_AVAILABLE));
    }

    #[test]
    fn test_non_finite_statistics_render_sentinel() {
        let mut flat = stats();
        flat.skewness = f64::NAN;
        flat.kurtosis = f64::NAN;
        flat.jarque_bera_stat = f64::NAN;
        flat.jarque_bera_pvalue = f64::NAN;
        let oc = regression(Some(f64::NAN));
        let input = FindingsInput {
            log_stats: Some(&flat),
            open_close: Some(&oc),
            ..FindingsInput::default()
        };
        let summary = aggregate_findings(&input);
        assert_eq!(summary.get("Skewness"), Some(NOT_AVAILABLE));
        assert_eq!(summary.get("Jarque-Bera P-value"), Some(NOT_AVAILABLE));
        assert_eq!(summary.get("Model Accuracy Score"), Some(NOT_AVAILABLE));
        assert_eq!(summary.get("Variance"), Some("0.0016"));
    }

    #[test]
    fn test_identical_input_gives_identical_output() {
        let s = stats();
        let beta = regression(None);
        let input = FindingsInput {
            simple_stats: Some(&s),
            log_stats: Some(&s),
            beta: Some(&beta),
            ..FindingsInput::default()
        };
        let first = aggregate_findings(&input).to_prompt_block();
        let second = aggregate_findings(&input).to_prompt_block();
        assert_eq!(first.as_bytes(), second.as_bytes());
        assert!(first.starts_with("- Mean Return: 0.0012\n"));
    }
}
