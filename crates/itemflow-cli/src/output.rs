//! Output formatting for the CLI.

use chrono::{DateTime, Utc};
use itemflow_core::{Item, ItemId};
use serde::Serialize;
use std::fmt::Write;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

/// Print output in the specified format.
pub fn print<T: Serialize + HumanDisplay>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Human => println!("{}", value.human_display()),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(value).expect("Failed to serialize to JSON")
            );
        }
        OutputFormat::Yaml => {
            println!(
                "{}",
                serde_yaml::to_string(value).expect("Failed to serialize to YAML")
            );
        }
    }
}

/// Print a list of item summaries with dynamic column widths.
pub fn print_item_list(items: &[ItemSummary], format: OutputFormat) {
    match format {
        OutputFormat::Human => {
            if items.is_empty() {
                println!("No items found.");
                return;
            }

            let id_width = items
                .iter()
                .map(|i| i.id.to_string().len())
                .max()
                .unwrap_or(2)
                .max(2);
            let status_width = items
                .iter()
                .map(|i| i.status.len())
                .max()
                .unwrap_or(6)
                .max(6);
            let name_width = items
                .iter()
                .map(|i| i.name.len())
                .max()
                .unwrap_or(4)
                .max(4);

            println!(
                "{:<id_w$}  {:<status_w$}  {:<name_w$}  EMAIL",
                "ID",
                "STATUS",
                "NAME",
                id_w = id_width,
                status_w = status_width,
                name_w = name_width
            );
            println!("{}", "-".repeat(id_width + status_width + name_width + 20));

            for item in items {
                println!(
                    "{:<id_w$}  {:<status_w$}  {:<name_w$}  {}",
                    item.id,
                    item.status,
                    item.name,
                    item.email,
                    id_w = id_width,
                    status_w = status_width,
                    name_w = name_width
                );
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(items).expect("Failed to serialize to JSON")
            );
        }
        OutputFormat::Yaml => {
            println!(
                "{}",
                serde_yaml::to_string(items).expect("Failed to serialize to YAML")
            );
        }
    }
}

/// Print a success message.
pub fn print_success(message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Human => println!("{message}"),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({ "status": "ok", "message": message })
            );
        }
        OutputFormat::Yaml => {
            println!("status: ok\nmessage: {message}");
        }
    }
}

/// Trait for human-readable display.
pub trait HumanDisplay {
    fn human_display(&self) -> String;
}

impl HumanDisplay for Item {
    fn human_display(&self) -> String {
        let mut out = String::new();

        writeln!(out, "ID:          {}", self.id).unwrap();
        writeln!(out, "Name:        {}", self.name).unwrap();
        writeln!(out, "Status:      {}", self.status).unwrap();
        writeln!(out, "Email:       {}", self.email).unwrap();
        writeln!(out, "Created:     {}", format_time(&self.created_at)).unwrap();
        writeln!(out, "Updated:     {}", format_time(&self.updated_at)).unwrap();

        if !self.description.is_empty() {
            writeln!(out, "Description:").unwrap();
            for line in self.description.lines() {
                writeln!(out, "  {line}").unwrap();
            }
        }

        out
    }
}

fn format_time(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Summary view of an item for list output.
#[derive(Debug, Serialize)]
pub struct ItemSummary {
    pub id: ItemId,
    pub name: String,
    pub status: String,
    pub email: String,
}

impl From<&Item> for ItemSummary {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            status: item.status.clone(),
            email: item.email.clone(),
        }
    }
}
