//! Read and headers commands.

use sheetappend::config::Config;
use sheetappend::{read_sheet, SpreadsheetRef};

/// Print every record of a worksheet as a JSON array.
pub async fn cmd_read(
    config: &Config,
    spreadsheet: &str,
    worksheet: usize,
    by_title: bool,
) -> anyhow::Result<()> {
    let spreadsheet = if by_title {
        SpreadsheetRef::Title(spreadsheet.to_string())
    } else {
        SpreadsheetRef::Key(spreadsheet.to_string())
    };

    let client = config.sheets_client().await?;
    let records = read_sheet(&client, &spreadsheet, worksheet).await?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

/// Print the header row of a sheet, one name per line.
pub async fn cmd_headers(config: &Config, spreadsheet: &str, sheet_id: i64) -> anyhow::Result<()> {
    let appender = config.appender().await?;
    for header in appender.headers(spreadsheet, sheet_id).await? {
        println!("{}", header);
    }
    Ok(())
}
