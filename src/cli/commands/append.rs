//! Append command.

use std::path::Path;

use anyhow::Context;
use console::style;
use serde::Deserialize;
use tokio::io::AsyncReadExt;

use sheetappend::config::Config;
use sheetappend::{AppendRow, CellValue};

/// One input record as it appears in the JSON input.
#[derive(Debug, Deserialize)]
struct RowInput {
    sheet_id: i64,
    data: serde_json::Map<String, serde_json::Value>,
}

/// Append rows from a file or stdin.
pub async fn cmd_append(
    config: &Config,
    spreadsheet: &str,
    input: Option<&Path>,
    detect_dates: bool,
) -> anyhow::Result<()> {
    let text = match input {
        Some(path) if path != Path::new("-") => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read stdin")?;
            buf
        }
    };

    let batch = parse_rows(&text, detect_dates)?;
    if batch.is_empty() {
        eprintln!("{} No rows to append", style("!").yellow());
        return Ok(());
    }

    let appender = config.appender().await?;
    let summary = appender.append_batch(spreadsheet, &batch).await?;

    eprintln!(
        "{} Appended {} rows to {}",
        style("✓").green(),
        summary.rows_appended,
        style(spreadsheet).bold()
    );
    let mut sheets: Vec<_> = summary.columns_added.iter().collect();
    sheets.sort_by_key(|(id, _)| **id);
    for (sheet_id, columns) in sheets {
        eprintln!(
            "  {} Sheet {}: new columns {}",
            style("→").dim(),
            sheet_id,
            columns.join(", ")
        );
    }

    Ok(())
}

/// Parse a JSON array of rows, or one row per line.
fn parse_rows(text: &str, detect_dates: bool) -> anyhow::Result<Vec<AppendRow>> {
    let trimmed = text.trim_start();
    let inputs: Vec<RowInput> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).context("Failed to parse JSON array of rows")?
    } else {
        trimmed
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Failed to parse row on line {}", n + 1))
            })
            .collect::<anyhow::Result<_>>()?
    };

    Ok(inputs
        .into_iter()
        .map(|input| {
            let data = input
                .data
                .into_iter()
                .map(|(k, v)| (k, CellValue::from_json(v, detect_dates)))
                .collect();
            AppendRow::new(input.sheet_id, data)
        })
        .collect())
}
