//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

/// Print a section header
pub fn print_header(title: &str) {
    println!("\n{}", title.bold());
    println!("{}", "=".repeat(50));
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format an optional measurement with a unit, or a dash
pub fn format_measure(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.1}{}", v, unit),
        None => "-".to_string(),
    }
}

/// Color a rating label by tier
pub fn color_rating(rating: &str) -> String {
    let label = rating.replace('_', " ");
    match rating.to_lowercase().as_str() {
        "epic" => label.magenta().bold().to_string(),
        "very_good" | "good" => label.green().to_string(),
        "fair" | "poor_to_fair" => label.yellow().to_string(),
        "poor" | "flat" => label.red().to_string(),
        _ => label,
    }
}

/// Color a 0-100 score
pub fn color_score(score: u8) -> String {
    let formatted = score.to_string();
    if score >= 60 {
        formatted.green().to_string()
    } else if score >= 30 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Color trend direction
pub fn color_direction(direction: &str) -> String {
    match direction {
        "improving" => direction.green().to_string(),
        "declining" => direction.red().to_string(),
        _ => direction.blue().to_string(),
    }
}
