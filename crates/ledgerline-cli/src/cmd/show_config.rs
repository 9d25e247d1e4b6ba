//! `ledgerline config` - print the effective configuration

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::config::Config;

fn secret_state(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "configured"
    } else {
        "not set"
    }
}

pub fn run(config: &Config) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    let unset = || "not set".to_string();
    table.add_row(vec!["Subscan endpoint", &config.subscan.transfers_url()]);
    table.add_row(vec!["Subscan API key", secret_state(&config.subscan.api_key)]);
    table.add_row(vec![
        "BigQuery table",
        &format!(
            "{}.{}.{}",
            config.bigquery.project_id.clone().unwrap_or_else(unset),
            config.bigquery.dataset.clone().unwrap_or_else(unset),
            config.bigquery.table
        ),
    ]);
    table.add_row(vec![
        "BigQuery token",
        secret_state(&config.bigquery.access_token),
    ]);
    table.add_row(vec![
        "Output directory",
        &config.output.default_dir.display().to_string(),
    ]);
    table.add_row(vec![
        "Compression level",
        &config.output.compression_level.to_string(),
    ]);
    table.add_row(vec!["Page size", &config.ingest.page_size.to_string()]);
    table.add_row(vec!["Batch size", &config.ingest.batch_size.to_string()]);
    table.add_row(vec!["Timeout", &format!("{}s", config.http.timeout_secs)]);
    table.add_row(vec!["Max retries", &config.http.max_retries.to_string()]);
    table.add_row(vec!["Retry base", &format!("{}ms", config.http.retry_base_ms)]);

    eprintln!("\n{table}");
}
