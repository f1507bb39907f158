//! Output router: raw console lines, an aligned text table, or a CSV file.

use crate::model::ResultTable;
use chrono::{DateTime, Local};
use prettytable::format::{self, Alignment};
use prettytable::{Cell, Row, Table};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

pub const DATETIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// How to render a result table. `Console` is the default when no `--output` is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Console,
    Pretty,
    File,
}

/// Errors from the output writers.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write CSV: {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write output: {0}")]
    Write(#[from] io::Error),
}

/// Where file output goes and what to name it.
#[derive(Debug, Clone)]
pub struct OutputRequest<'a> {
    pub mode: OutputMode,
    /// Extractor name, used as the CSV file name prefix.
    pub mode_name: &'a str,
    pub results_dir: &'a Path,
}

/// Render `table` as requested. Console and pretty output go to `out`.
pub fn control_output<W: Write>(
    table: &ResultTable,
    request: &OutputRequest<'_>,
    out: &mut W,
) -> Result<(), OutputError> {
    match request.mode {
        OutputMode::Console => default_output(table, out),
        OutputMode::Pretty => pretty_output(table, out),
        OutputMode::File => {
            file_output(table, request.results_dir, request.mode_name, Local::now())?;
            Ok(())
        }
    }
}

/// Each row, cells joined by a single space.
pub fn default_output<W: Write>(table: &ResultTable, out: &mut W) -> Result<(), OutputError> {
    for row in table.all_rows() {
        writeln!(out, "{}", row.join(" "))?;
    }
    Ok(())
}

fn cells(row: &[String]) -> Row {
    Row::new(
        row.iter()
            .map(|cell| Cell::new_align(cell, Alignment::LEFT))
            .collect(),
    )
}

/// Left-aligned table with a bordered header.
pub fn pretty_output<W: Write>(table: &ResultTable, out: &mut W) -> Result<(), OutputError> {
    let mut pretty = Table::new();
    pretty.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    pretty.set_titles(cells(table.header()));
    for row in table.rows() {
        pretty.add_row(cells(row));
    }
    pretty.print(out)?;
    Ok(())
}

/// Write every row as CSV, header first. Fields are quoted only when they need it.
pub fn write_csv<W: Write>(table: &ResultTable, out: W) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);
    for row in table.all_rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// `<mode_name>_<YYYY-MM-DD_HH-MM-SS>.csv`
pub fn results_file_name(mode_name: &str, now: DateTime<Local>) -> String {
    format!("{}_{}.csv", mode_name, now.format(DATETIME_FORMAT))
}

/// Write the table as CSV into `results_dir`. Returns the file path, or `None` when the
/// directory cannot be created (logged as critical).
pub fn file_output(
    table: &ResultTable,
    results_dir: &Path,
    mode_name: &str,
    now: DateTime<Local>,
) -> Result<Option<PathBuf>, OutputError> {
    if let Err(e) = fs::create_dir_all(results_dir) {
        error!(
            path = %results_dir.display(),
            error = %e,
            "CRITICAL: could not create results directory"
        );
        return Ok(None);
    }
    let path = results_dir.join(results_file_name(mode_name, now));
    let file = File::create(&path).map_err(|e| OutputError::Io {
        path: path.clone(),
        source: e,
    })?;
    write_csv(table, file).map_err(|e| OutputError::Csv {
        path: path.clone(),
        source: e,
    })?;
    info!(path = %path.display(), "results file saved");
    Ok(Some(path))
}
