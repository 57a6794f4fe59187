//! Conditions CLI commands: spot listing, reports and trends

use anyhow::{Context, Result};
use chrono::DateTime;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::client::{ApiClient, BlockInfo, ObservationInfo, SpotReport, TrendInfo};
use crate::output::{
    color_direction, color_rating, color_score, format_measure, print_header, print_info,
    print_json, print_table, print_warning, OutputFormat,
};

/// Row for the spot listing
#[derive(Tabled, Serialize)]
struct SpotRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Height (m)")]
    height: String,
    #[tabled(rename = "Period (s)")]
    period: String,
    #[tabled(rename = "Offshore")]
    offshore: String,
}

/// Row for a factor breakdown
#[derive(Tabled, Serialize)]
struct FactorRow {
    #[tabled(rename = "Factor")]
    factor: String,
    #[tabled(rename = "Score")]
    score: String,
}

/// Row for a trend block
#[derive(Tabled, Serialize)]
struct BlockRow {
    #[tabled(rename = "Window")]
    window: String,
    #[tabled(rename = "Hours")]
    hours: String,
    #[tabled(rename = "Waves")]
    waves: String,
    #[tabled(rename = "Wind")]
    wind: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Rating")]
    rating: String,
}

/// List configured spots
pub async fn list_spots(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let spots = client.spots().await?;

    let rows: Vec<SpotRow> = spots
        .into_iter()
        .map(|s| SpotRow {
            location: format!("{:.2}, {:.2}", s.latitude, s.longitude),
            height: format!(
                "{}-{} (ideal {})",
                s.profile.wave_height.min, s.profile.wave_height.max, s.profile.wave_height.ideal
            ),
            period: format!(
                "{}-{} (ideal {})",
                s.profile.wave_period.min, s.profile.wave_period.max, s.profile.wave_period.ideal
            ),
            offshore: s.profile.offshore_wind.join(", "),
            id: s.id,
            name: s.name,
        })
        .collect();

    print_table(&rows, format);
    Ok(())
}

/// Show the full conditions report for a spot
pub async fn show_report(
    client: &ApiClient,
    spot_id: &str,
    at: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let report = fetch_report(client, spot_id, at).await?;

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => print_report(&report),
    }

    Ok(())
}

/// Show only the trend outlook for a spot
pub async fn show_trend(
    client: &ApiClient,
    spot_id: &str,
    at: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let report = fetch_report(client, spot_id, at).await?;

    match format {
        OutputFormat::Json => print_json(&report.trend),
        OutputFormat::Table => match &report.trend {
            Some(trend) => {
                print_header(&format!("Outlook for {}", report.spot.name));
                print_trend(trend);
            }
            None => print_warning(&format!(
                "Not enough hourly data to build an outlook for {}",
                report.spot.name
            )),
        },
    }

    Ok(())
}

async fn fetch_report(
    client: &ApiClient,
    spot_id: &str,
    at: Option<String>,
) -> Result<SpotReport> {
    if let Some(at) = &at {
        DateTime::parse_from_rfc3339(at)
            .with_context(|| format!("--at must be an RFC 3339 timestamp, got '{}'", at))?;
    }
    client.report(spot_id, at.as_deref()).await
}

fn print_report(report: &SpotReport) {
    let score = &report.score;

    print_header(&format!("{} ({})", report.spot.name, report.spot.id));
    println!(
        "Score:                  {} / 100  {}",
        color_score(score.overall).bold(),
        color_rating(&score.rating)
    );
    println!("{}", score.explanation);
    println!();

    println!("{}", "Conditions".bold());
    println!("{}", "-".repeat(50));
    print_observation(&report.observation);
    println!();

    let rows: Vec<FactorRow> = score
        .breakdown
        .iter()
        .map(|(factor, value)| FactorRow {
            factor: factor.replace('_', " "),
            score: color_score(*value),
        })
        .collect();
    print_table(&rows, OutputFormat::Table);
    println!();

    let sources = &report.sources;
    let attempted = sources.succeeded + sources.empty + sources.failed;
    let summary = format!(
        "{} of {} sources reported (fetched {}{})",
        sources.succeeded,
        attempted,
        report.fetched_at,
        if report.from_cache { ", cached" } else { "" }
    );
    if sources.succeeded < attempted {
        print_warning(&summary);
        for failure in &report.failures {
            println!("  {} {}: {}", "-".dimmed(), failure.source, failure.message);
        }
    } else {
        print_info(&summary);
    }

    if let Some(trend) = &report.trend {
        println!();
        println!("{}", "Outlook".bold());
        println!("{}", "-".repeat(50));
        print_trend(trend);
    }
}

fn print_observation(obs: &ObservationInfo) {
    let waves = match (obs.wave_height.min, obs.wave_height.max) {
        (Some(min), Some(max)) => format!("{:.1}-{:.1}m", min, max),
        _ => format_measure(obs.wave_height.avg, "m"),
    };
    println!(
        "Waves:                  {} @ {}",
        waves,
        format_measure(obs.wave_period, "s")
    );
    if let Some(swell) = &obs.swell {
        println!(
            "Swell:                  {} @ {} {}",
            format_measure(swell.height, "m"),
            format_measure(swell.period, "s"),
            swell.direction.as_deref().unwrap_or("")
        );
    }
    println!(
        "Wind:                   {} {}",
        format_measure(obs.wind_speed, " km/h"),
        obs.wind_direction.as_deref().unwrap_or("")
    );
    if obs.water_temperature.is_some() || obs.air_temperature.is_some() {
        println!(
            "Temperature:            water {}, air {}",
            format_measure(obs.water_temperature, "°C"),
            format_measure(obs.air_temperature, "°C")
        );
    }
    if let Some(cloud) = &obs.cloud_cover {
        println!("Sky:                    {}", cloud.replace('_', " "));
    }
}

fn print_trend(trend: &TrendInfo) {
    println!(
        "Direction:              {}",
        color_direction(&trend.direction)
    );
    println!("{}", trend.message);
    println!();

    let rows: Vec<BlockRow> = trend.blocks.iter().map(block_row).collect();
    print_table(&rows, OutputFormat::Table);
}

fn block_row(block: &BlockInfo) -> BlockRow {
    BlockRow {
        window: block.label.clone(),
        hours: format!("{:02}-{:02}", block.start_hour, block.end_hour),
        waves: format_measure(block.observation.wave_height.avg, "m"),
        wind: format!(
            "{} {}",
            format_measure(block.observation.wind_speed, " km/h"),
            block.observation.wind_direction.as_deref().unwrap_or("")
        )
        .trim_end()
        .to_string(),
        score: color_score(block.score.overall),
        rating: color_rating(&block.score.rating),
    }
}
