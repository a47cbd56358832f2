//! Tables, JSON and colored status lines

use bigml_lib::resource::status_code;
use chrono::NaiveDateTime;
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// How command results are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Rounded tables (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Format named in the config file, falling back to tables
    pub fn from_config(name: Option<&str>) -> Self {
        name.and_then(|n| OutputFormat::from_str(n, true).ok())
            .unwrap_or_default()
    }
}

/// Print rows as a table, or as a JSON array; `what` names empty results
pub fn print_table<T: Tabled + Serialize>(rows: &[T], format: OutputFormat, what: &str) {
    if format == OutputFormat::Json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("{}", format!("No {} found", what).yellow());
    } else {
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("Could not render JSON: {}", e)),
    }
}

// Status lines go to stderr; stdout only carries results
fn notice(mark: ColoredString, message: &str) {
    eprintln!("{} {}", mark.bold(), message);
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    notice("✗".red(), message);
}

pub fn print_warning(message: &str) {
    notice("⚠".yellow(), message);
}

pub fn print_info(message: &str) {
    notice("ℹ".blue(), message);
}

/// Format a creation timestamp
pub fn format_created(created: Option<NaiveDateTime>) -> String {
    created
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Percentage with two decimals, or `-`
pub fn format_confidence(confidence: Option<f64>) -> String {
    confidence
        .map(|c| format!("{:.2}%", c * 100.0))
        .unwrap_or_else(|| "-".to_string())
}

/// Color a resource status by its code
pub fn color_status(code: i32, message: &str) -> String {
    match code {
        status_code::FINISHED => message.green().to_string(),
        status_code::FAULTY | status_code::UNKNOWN => message.red().to_string(),
        _ => message.yellow().to_string(),
    }
}

/// Color an anomaly score: above 0.6 is unusual, above 0.7 is an outlier
pub fn color_score(score: f64) -> String {
    let formatted = format!("{:.6}", score);
    if score > 0.7 {
        formatted.red().to_string()
    } else if score > 0.6 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}
