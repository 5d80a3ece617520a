//! The per-person state machine. Every function here advances one entity (or, for infection,
//! flags entities in a population) by exactly one tick's worth of a single phase. The engines
//! decide ordering; nothing in this module knows about ticks, workers or chunks.
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::parameters::Parameters;

/// Bounds of the simulation grid as read from the input header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub max_x: i32,
    pub max_y: i32,
}

impl Grid {
    pub fn new(max_x: i32, max_y: i32) -> Grid {
        Grid { max_x, max_y }
    }

    /// Whether a starting coordinate is acceptable at load time. Both bounds are inclusive here,
    /// unlike the movement reflection rule.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        (0..=self.max_x).contains(&x) && (0..=self.max_y).contains(&y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Status {
    Susceptible,
    Infected,
    Immune,
}

/// Cardinal movement pattern of an input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Maps a direction and an unsigned step size to the fixed axis and the initial signed
    /// amplitude. North is towards `y = 0`.
    pub fn to_motion(self, amplitude: i32) -> (Axis, i32) {
        match self {
            Direction::North => (Axis::Vertical, -amplitude),
            Direction::South => (Axis::Vertical, amplitude),
            Direction::East => (Axis::Horizontal, amplitude),
            Direction::West => (Axis::Horizontal, -amplitude),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub axis: Axis,
    pub amplitude: i32,
    pub status: Status,
    pub pending_infection: bool,
    pub infected_timer: u32,
    pub immune_timer: u32,
    pub infection_count: u32,
}

impl Entity {
    /// Builds an entity in its load-time state: both timers full, no infections counted yet.
    pub fn new(
        id: u32,
        (x, y): (i32, i32),
        status: Status,
        direction: Direction,
        amplitude: i32,
        parameters: &Parameters,
    ) -> Entity {
        let (axis, amplitude) = direction.to_motion(amplitude);
        Entity {
            id,
            x,
            y,
            axis,
            amplitude,
            status,
            pending_infection: false,
            infected_timer: parameters.infected_duration,
            immune_timer: parameters.immune_duration,
            infection_count: 0,
        }
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Moves one step along the entity's axis, reflecting off the grid edges.
    ///
    /// The Y axis reflects when the candidate is `>= max_y`, the X axis only when it is
    /// `> max_x`. Both engines must share this exact rule; do not make it symmetric. All four
    /// checks run regardless of the movement axis.
    pub fn step(&mut self, grid: &Grid) {
        let mut x = self.x;
        let mut y = self.y;
        let mut amplitude = self.amplitude;

        // A saturated candidate lies on the same side of every bound as the exact sum.
        match self.axis {
            Axis::Vertical => y = y.saturating_add(amplitude),
            Axis::Horizontal => x = x.saturating_add(amplitude),
        }

        if y < 0 {
            y = 0;
            amplitude = -amplitude;
        }
        if y >= grid.max_y {
            y = grid.max_y - 1;
            amplitude = -amplitude;
        }
        if x < 0 {
            x = 0;
            amplitude = -amplitude;
        }
        if x > grid.max_x {
            x = grid.max_x - 1;
            amplitude = -amplitude;
        }

        self.x = x;
        self.y = y;
        self.amplitude = amplitude;
    }

    /// Advances the SUSCEPTIBLE -> INFECTED -> IMMUNE -> SUSCEPTIBLE cycle by one tick.
    ///
    /// A pending infection is only consumed by a susceptible entity; for anyone else the flag
    /// is left in place and has no effect.
    pub fn advance_status(&mut self, parameters: &Parameters) {
        match self.status {
            Status::Susceptible => {
                if self.pending_infection {
                    self.status = Status::Infected;
                    self.infected_timer = parameters.infected_duration;
                    self.infection_count += 1;
                    self.pending_infection = false;
                }
            }
            Status::Infected => {
                self.infected_timer = self.infected_timer.saturating_sub(1);
                if self.infected_timer == 0 {
                    self.status = Status::Immune;
                    self.immune_timer = parameters.immune_duration;
                }
            }
            Status::Immune => {
                self.immune_timer = self.immune_timer.saturating_sub(1);
                if self.immune_timer == 0 {
                    self.status = Status::Susceptible;
                }
            }
        }
    }
}

/// Flags every other susceptible entity standing on the infected entity's cell.
///
/// This is the reference form of the co-location rule and costs one full scan per call.
pub fn mark_exposed(infected: &Entity, population: &mut [Entity]) {
    for other in population.iter_mut() {
        if other.x == infected.x
            && other.y == infected.y
            && other.id != infected.id
            && other.status == Status::Susceptible
        {
            other.pending_infection = true;
        }
    }
}

/// Runs the infection phase over a whole population: the same outcome as calling
/// [`mark_exposed`] for every infected entity, computed from a cell index in one pass.
pub fn spread_infection(population: &mut [Entity]) {
    let mut infected_cells: FxHashMap<(i32, i32), Vec<u32>> = FxHashMap::default();
    for entity in population.iter() {
        if entity.status == Status::Infected {
            infected_cells
                .entry(entity.position())
                .or_default()
                .push(entity.id);
        }
    }
    if infected_cells.is_empty() {
        return;
    }

    for entity in population.iter_mut() {
        if entity.status != Status::Susceptible {
            continue;
        }
        if let Some(sources) = infected_cells.get(&entity.position()) {
            if sources.iter().any(|&id| id != entity.id) {
                entity.pending_infection = true;
            }
        }
    }
}
