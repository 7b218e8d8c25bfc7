use shared::models::{AnomalyMonthBucket, FindingsSummary};

pub const OUTCOME_CATEGORIES: [&str; 4] = ["Higher Profit", "Slight Profit", "Slight Loss", "Higher Loss"];

/// Asks for an investment outcome category given the formatted findings.
pub fn findings_prompt(asset: &str, findings: &FindingsSummary) -> String {
    let quoted: Vec<String> = OUTCOME_CATEGORIES.iter().map(|c| format!("'{}'", c)).collect();
    let last = quoted.len() - 1;
    format!(
        "Given the analysis summary of {} cryptocurrency with the following key metrics:\n{}\nWhat is the potential investment outcome over the next period? Please categorize the outcome as {}, or {}.",
        asset,
        findings.to_prompt_block(),
        quoted[..last].join(", "),
        quoted[last]
    )
}

/// One entry per month, in the order given, each with a reason and a mitigation slot.
pub fn anomaly_prompt(asset: &str, buckets: &[AnomalyMonthBucket]) -> String {
    let entries = buckets
        .iter()
        .map(|b| {
            format!(
                "{}: {} anomalies detected.\n \u{27a2} Reason: [Insert brief reason]\n \u{27a2} Mitigation: [Insert single step]\n",
                b.month_label, b.count
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Provide a concise analysis for each month's detected anomalies in {} trading, including a brief reason and a single mitigation step. Here's the data:\n\n{}\n\nFocus on brevity and clarity in your analysis and recommendations.",
        asset, entries
    )
}

// Plain listing shown next to the generated analysis.
pub fn anomaly_overview(buckets: &[AnomalyMonthBucket]) -> String {
    let mut text = String::from("Here is a list of detected anomalies in particular months:\n\n");
    for bucket in buckets {
        text.push_str(&format!("{}: {} anomalies\n\n", bucket.month_label, bucket.count));
    }
    text
}
