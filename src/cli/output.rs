use anyhow::Result;
use std::io::Write;
use unicode_width::UnicodeWidthStr;

use crate::model::{QueryResult, metrics::truncate_display};

/// Widest a table column may get before its cells are cut.
const MAX_COLUMN_WIDTH: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "table" => Some(Self::Table),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn write<W: Write>(out: &mut W, result: &QueryResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => write_table(out, result),
        OutputFormat::Csv => write_csv(out, result),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, result)?;
            writeln!(out)?;
            Ok(())
        }
    }
}

fn write_csv<W: Write>(out: &mut W, result: &QueryResult) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(result.columns())?;
    for row in result.rows() {
        writer.write_record(result.cells(row).map(|cell| cell.to_text().into_owned()))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_table<W: Write>(out: &mut W, result: &QueryResult) -> Result<()> {
    if result.columns().is_empty() {
        writeln!(out, "{}", result.summary())?;
        return Ok(());
    }

    let grid: Vec<Vec<String>> = result
        .rows()
        .iter()
        .map(|row| {
            result
                .cells(row)
                .map(|cell| truncate_display(&cell.to_text(), MAX_COLUMN_WIDTH).into_owned())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = result
        .columns()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            grid.iter()
                .filter_map(|cells| cells.get(i))
                .map(|cell| cell.width())
                .fold(column.width().min(MAX_COLUMN_WIDTH), usize::max)
        })
        .collect();

    let header: Vec<String> = result
        .columns()
        .iter()
        .map(|c| truncate_display(c, MAX_COLUMN_WIDTH).into_owned())
        .collect();
    write_line(out, &header, &widths)?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_line(out, &rule, &widths)?;
    for cells in &grid {
        write_line(out, cells, &widths)?;
    }
    writeln!(out, "\n{}", result.summary())?;
    Ok(())
}

fn write_line<W: Write>(out: &mut W, cells: &[String], widths: &[usize]) -> Result<()> {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell}{}", " ".repeat(width.saturating_sub(cell.width()))))
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(out, "{}", line.trim_end())?;
    Ok(())
}
