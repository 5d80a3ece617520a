//! Reads the flat text scenario format:
//!
//! ```text
//! <max_x> <max_y>
//! <population_count>
//! <id> <x> <y> <status> <pattern> <amplitude>
//! ...
//! ```
//!
//! Status codes are `0` infected, `1` susceptible, `2` immune. Pattern codes are `0` north,
//! `1` south, `2` east, `3` west. Any malformed record aborts loading with its line number.
use std::fs;
use std::path::Path;

use log::{info, warn};
use rustc_hash::FxHashSet;

use crate::entity::{Direction, Entity, Grid, Status};
use crate::error::EpiError;
use crate::parameters::Parameters;
use crate::population::Population;

/// A parsed scenario: grid bounds plus the starting population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub grid: Grid,
    pub population: Population,
}

fn status_from_code(code: i64) -> Option<Status> {
    match code {
        0 => Some(Status::Infected),
        1 => Some(Status::Susceptible),
        2 => Some(Status::Immune),
        _ => None,
    }
}

fn direction_from_code(code: i64) -> Option<Direction> {
    match code {
        0 => Some(Direction::North),
        1 => Some(Direction::South),
        2 => Some(Direction::East),
        3 => Some(Direction::West),
        _ => None,
    }
}

/// Splits a line into exactly `N` integers.
fn parse_fields<const N: usize>(line: &str, line_number: usize) -> Result<[i64; N], EpiError> {
    let mut fields = [0i64; N];
    let mut tokens = line.split_whitespace();
    for (position, field) in fields.iter_mut().enumerate() {
        let token = tokens.next().ok_or_else(|| {
            EpiError::data(
                line_number,
                format!("expected {N} fields, found {position}"),
            )
        })?;
        *field = token
            .parse()
            .map_err(|_| EpiError::data(line_number, format!("'{token}' is not an integer")))?;
    }
    if tokens.next().is_some() {
        return Err(EpiError::data(
            line_number,
            format!("expected {N} fields, found more"),
        ));
    }
    Ok(fields)
}

fn to_i32(value: i64, what: &str, line_number: usize) -> Result<i32, EpiError> {
    i32::try_from(value)
        .map_err(|_| EpiError::data(line_number, format!("{what} {value} is out of range")))
}

fn parse_entity(
    line: &str,
    line_number: usize,
    grid: &Grid,
    parameters: &Parameters,
) -> Result<Entity, EpiError> {
    let [id, x, y, status, pattern, amplitude] = parse_fields::<6>(line, line_number)?;

    if id <= 0 {
        return Err(EpiError::data(line_number, format!("id {id} must be positive")));
    }
    let id = u32::try_from(id)
        .map_err(|_| EpiError::data(line_number, format!("id {id} is out of range")))?;
    if amplitude <= 0 {
        return Err(EpiError::data(
            line_number,
            format!("amplitude {amplitude} must be positive"),
        ));
    }
    let amplitude = to_i32(amplitude, "amplitude", line_number)?;
    let x = to_i32(x, "x coordinate", line_number)?;
    let y = to_i32(y, "y coordinate", line_number)?;
    if !grid.contains(x, y) {
        return Err(EpiError::data(
            line_number,
            format!("coordinates ({x}, {y}) are out of bounds"),
        ));
    }
    let status = status_from_code(status)
        .ok_or_else(|| EpiError::data(line_number, format!("unknown status code {status}")))?;
    let direction = direction_from_code(pattern).ok_or_else(|| {
        EpiError::data(line_number, format!("undefined movement pattern {pattern}"))
    })?;

    Ok(Entity::new(id, (x, y), status, direction, amplitude, parameters))
}

/// Parses a whole scenario from text.
///
/// # Errors
/// Returns `EpiError::Config` for a bad header and `EpiError::Data` for a bad person record.
pub fn parse_scenario(input: &str, parameters: &Parameters) -> Result<Scenario, EpiError> {
    let mut lines = input.lines().enumerate().map(|(index, line)| (index + 1, line));

    let (line_number, line) = lines
        .next()
        .ok_or_else(|| EpiError::Config("input is empty".into()))?;
    let [max_x, max_y] = parse_fields::<2>(line, line_number)
        .map_err(|_| EpiError::Config("error reading the max coordinates".into()))?;
    if max_x <= 0 || max_y <= 0 {
        return Err(EpiError::Config(format!(
            "max coordinates must be positive, got ({max_x}, {max_y})"
        )));
    }
    let grid = Grid::new(
        to_i32(max_x, "max x", line_number)?,
        to_i32(max_y, "max y", line_number)?,
    );

    let (line_number, line) = lines
        .next()
        .ok_or_else(|| EpiError::Config("missing the number of people".into()))?;
    let [count] = parse_fields::<1>(line, line_number)
        .map_err(|_| EpiError::Config("error reading the number of people".into()))?;
    if count <= 0 {
        return Err(EpiError::Config(format!(
            "number of people must be positive, got {count}"
        )));
    }
    let count = usize::try_from(count)
        .map_err(|_| EpiError::Config(format!("number of people {count} is out of range")))?;

    let mut entities = Vec::with_capacity(count);
    let mut seen_ids = FxHashSet::default();
    let mut last_line = line_number;
    for _ in 0..count {
        let (line_number, line) = lines.next().ok_or_else(|| {
            EpiError::data(
                last_line + 1,
                format!("expected {count} people, found {}", entities.len()),
            )
        })?;
        let entity = parse_entity(line, line_number, &grid, parameters)?;
        if !seen_ids.insert(entity.id) {
            return Err(EpiError::data(
                line_number,
                format!("duplicate id {}", entity.id),
            ));
        }
        entities.push(entity);
        last_line = line_number;
    }

    let extra = lines.filter(|(_, line)| !line.trim().is_empty()).count();
    if extra > 0 {
        warn!("ignoring {extra} line(s) after the last person record");
    }

    info!(
        "loaded {} people on a {}x{} grid",
        entities.len(),
        grid.max_x,
        grid.max_y
    );
    Ok(Scenario {
        grid,
        population: Population::new(entities),
    })
}

/// Reads and parses a scenario file.
///
/// # Errors
/// Returns `EpiError::IoError` if the file cannot be read, otherwise as [`parse_scenario`].
pub fn load_scenario(path: &Path, parameters: &Parameters) -> Result<Scenario, EpiError> {
    let data = fs::read_to_string(path)?;
    parse_scenario(&data, parameters)
}
