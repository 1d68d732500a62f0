//! Terminal rendering for qwatch
//!
//! `status`, `history`, `tokens` and `config` print either a tabled grid
//! or one pretty JSON document. `watch` streams one compact JSON object per
//! update instead, so its output can be piped line by line.

use serde::Serialize;
use std::fmt::Display;
use tabled::{Table, Tabled};

/// Shown in place of an empty quota table
pub const EMPTY_TABLE_MESSAGE: &str = "No quota data to show.";

/// `--format` value shared by every subcommand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "Unknown output format '{}' (expected table or json)",
                other
            )),
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
        })
    }
}

/// Rows as a table, or the empty-table message
pub fn render_rows<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        EMPTY_TABLE_MESSAGE.to_string()
    } else {
        Table::new(rows).to_string()
    }
}

/// Print rows in the requested format
pub fn print_output<T>(rows: &[T], format: OutputFormat) -> anyhow::Result<()>
where
    T: Serialize + Tabled,
{
    match format {
        OutputFormat::Table => println!("{}", render_rows(rows)),
        OutputFormat::Json => print_json(rows)?,
    }
    Ok(())
}

/// Print one row: a one-line table, or a bare JSON object
pub fn print_single<T>(row: &T, format: OutputFormat) -> anyhow::Result<()>
where
    T: Serialize + Tabled,
{
    match format {
        OutputFormat::Table => println!("{}", render_rows(std::slice::from_ref(row))),
        OutputFormat::Json => print_json(row)?,
    }
    Ok(())
}

/// Print any serializable value as pretty JSON
pub fn print_json<T>(data: &T) -> anyhow::Result<()>
where
    T: Serialize + ?Sized,
{
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Print one compact JSON object on its own line
pub fn print_json_line<T>(data: &T) -> anyhow::Result<()>
where
    T: Serialize + ?Sized,
{
    println!("{}", serde_json::to_string(data)?);
    Ok(())
}

/// Green confirmation, suppressed by `--quiet`
pub fn print_success(message: &str, quiet: bool) {
    if !quiet {
        println!("{}", colored::Colorize::green(message));
    }
}

/// Plain note, suppressed by `--quiet`
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        println!("{}", message);
    }
}
