//! Feedback CLI command: rescore a spot with per-factor emphasis

use anyhow::Result;
use colored::Colorize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::client::ApiClient;
use crate::output::{
    color_rating, color_score, print_header, print_json, print_warning, OutputFormat,
};

/// Factor names the agent scores on
pub const FACTORS: [&str; 7] = [
    "wave_height",
    "wave_period",
    "swell_quality",
    "wind_speed",
    "wind_direction",
    "wave_direction",
    "confidence",
];

#[derive(Debug, Error, PartialEq)]
pub enum WeightArgError {
    #[error("expected FACTOR=MULTIPLIER, got '{0}'")]
    Malformed(String),

    #[error("unknown factor '{0}' (expected one of: {})", FACTORS.join(", "))]
    UnknownFactor(String),

    #[error("multiplier for {factor} must be a finite number, got '{value}'")]
    BadMultiplier { factor: String, value: String },
}

/// Parse a `factor=multiplier` argument
pub fn parse_weight(arg: &str) -> Result<(String, f64), WeightArgError> {
    let (factor, value) = arg
        .split_once('=')
        .ok_or_else(|| WeightArgError::Malformed(arg.to_string()))?;
    let factor = factor.trim().to_lowercase().replace('-', "_");
    if !FACTORS.contains(&factor.as_str()) {
        return Err(WeightArgError::UnknownFactor(factor));
    }
    let multiplier = value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|m| m.is_finite())
        .ok_or_else(|| WeightArgError::BadMultiplier {
            factor: factor.clone(),
            value: value.to_string(),
        })?;
    Ok((factor, multiplier))
}

/// Rescore a spot with the given multipliers
pub async fn reweight(
    client: &ApiClient,
    spot_id: &str,
    weights: Vec<(String, f64)>,
    format: OutputFormat,
) -> Result<()> {
    let multipliers: BTreeMap<String, f64> = weights.into_iter().collect();
    let response = client.reweight(spot_id, multipliers.clone()).await?;

    match format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Table => {
            print_header(&format!("Reweighted score for {}", response.spot_id));

            if multipliers.is_empty() {
                println!("Multipliers:            {}", "none (default weights)".dimmed());
            } else {
                let listed: Vec<String> = multipliers
                    .iter()
                    .map(|(f, m)| format!("{}×{}", f.replace('_', " "), m))
                    .collect();
                println!("Multipliers:            {}", listed.join(", "));
            }
            println!(
                "Original:               {}  {}",
                color_score(response.original_score),
                color_rating(&response.original_rating)
            );

            match &response.adjusted {
                Some(adjusted) => {
                    let delta = adjusted.score as i16 - response.original_score as i16;
                    println!(
                        "Adjusted:               {}  {}  ({:+})",
                        color_score(adjusted.score).bold(),
                        color_rating(&adjusted.rating),
                        delta
                    );
                }
                None => print_warning("Multipliers leave no weight to score with"),
            }
        }
    }

    Ok(())
}
