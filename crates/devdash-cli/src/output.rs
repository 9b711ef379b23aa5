//! Output formatting for devdash-decode (table, json, csv)

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg.yellow());
        }
    }

    /// Print an error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print data in the configured format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                if data.is_empty() {
                    if !self.quiet {
                        println!("{}", "No data".dimmed());
                    }
                } else {
                    println!("{}", Table::new(data));
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
            OutputFormat::Csv => {
                print!("{}", render_csv(data));
            }
        }
    }
}

/// Render rows as CSV using the same headers as the table view
pub fn render_csv<T: Tabled>(data: &[T]) -> String {
    let mut out = String::new();
    if data.is_empty() {
        return out;
    }

    let headers: Vec<String> = T::headers().iter().map(|h| escape_csv(h)).collect();
    out.push_str(&headers.join(","));
    out.push('\n');

    for item in data {
        let values: Vec<String> = item.fields().iter().map(|v| escape_csv(v)).collect();
        out.push_str(&values.join(","));
        out.push('\n');
    }
    out
}

/// Escape a value for CSV output
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Round to four decimals so float noise (90.05000000000001) stays out of reports
pub fn round_value(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

// =============================================================================
// Display types for commands
// =============================================================================

/// One decoded channel from one frame
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct ChannelRow {
    #[tabled(rename = "Time")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Channel")]
    pub channel: String,
    #[tabled(rename = "Value")]
    pub value: f64,
    #[tabled(rename = "Unit")]
    pub unit: String,
}

/// Most recent value of a channel
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct LatestRow {
    #[tabled(rename = "Channel")]
    pub channel: String,
    #[tabled(rename = "Value")]
    pub value: f64,
    #[tabled(rename = "Unit")]
    pub unit: String,
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Updates")]
    pub updates: u64,
}

/// Frame from the loaded definition
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct FrameRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Rate (Hz)")]
    pub rate_hz: u32,
    #[tabled(rename = "Channels")]
    pub channels: usize,
}

/// Channel layout from the loaded definition
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct ChannelDefRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Channel")]
    pub channel: String,
    #[tabled(rename = "Bytes")]
    pub bytes: String,
    #[tabled(rename = "Signed")]
    pub signed: bool,
    #[tabled(rename = "Conversion")]
    pub conversion: String,
    #[tabled(rename = "Unit")]
    pub unit: String,
}
