//! Writes final populations to result files, one file per engine.
//!
//! The text format has one line per person:
//!
//! ```text
//! Person 1: (5, 4), status: INFECTED, was infected 0 time(s).
//! ```
//!
//! The CSV format carries the same fields under the header `id,x,y,status,infection_count`.
use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use csv::Writer;
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Status};
use crate::error::EpiError;
use crate::population::Population;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ResultFormat {
    #[default]
    Text,
    Csv,
}

impl ResultFormat {
    fn extension(self) -> &'static str {
        match self {
            ResultFormat::Text => "txt",
            ResultFormat::Csv => "csv",
        }
    }
}

/// Which engine produced a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSet {
    Sequential,
    Partitioned,
}

impl ResultSet {
    fn suffix(self) -> &'static str {
        match self {
            ResultSet::Sequential => "serial_out",
            ResultSet::Partitioned => "parallel_out",
        }
    }
}

/// A single CSV row.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct PersonRow {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub status: Status,
    pub infection_count: u32,
}

impl From<&Entity> for PersonRow {
    fn from(entity: &Entity) -> Self {
        PersonRow {
            id: entity.id,
            x: entity.x,
            y: entity.y,
            status: entity.status,
            infection_count: entity.infection_count,
        }
    }
}

/// Builds `<dir>/<input stem>_<suffix>.<ext>`. Without an explicit directory the file lands next
/// to the input.
pub fn output_path(
    input: &Path,
    output_dir: Option<&Path>,
    set: ResultSet,
    format: ResultFormat,
) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or(Cow::Borrowed("results"), OsStr::to_string_lossy);
    let file_name = format!("{stem}_{}.{}", set.suffix(), format.extension());
    match output_dir {
        Some(dir) => dir.join(file_name),
        None => input
            .parent()
            .map_or_else(|| PathBuf::from(&file_name), |dir| dir.join(&file_name)),
    }
}

pub fn person_line(entity: &Entity) -> String {
    format!(
        "Person {}: ({}, {}), status: {}, was infected {} time(s).",
        entity.id, entity.x, entity.y, entity.status, entity.infection_count
    )
}

// Creates the file and all parent directories if they do not exist.
fn create_result_file(path: &Path) -> Result<File, EpiError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

/// Writes `population` to `path` in the requested format.
///
/// # Errors
/// Returns an `EpiError` if the file cannot be created or written.
pub fn write_results(
    path: &Path,
    population: &Population,
    format: ResultFormat,
) -> Result<(), EpiError> {
    let file = create_result_file(path)?;
    match format {
        ResultFormat::Text => {
            let mut writer = BufWriter::new(file);
            for entity in population {
                writeln!(writer, "{}", person_line(entity))?;
            }
            writer.flush()?;
        }
        ResultFormat::Csv => {
            let mut writer = Writer::from_writer(file);
            for entity in population {
                writer.serialize(PersonRow::from(entity))?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}
