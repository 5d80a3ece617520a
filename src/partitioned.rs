//! The domain-decomposed engine.
//!
//! Every rank runs the same loop. Movement and status transitions are applied by each rank to
//! its own chunk; infection needs every position at once, so the coordinator runs it alone on
//! the reassembled population between the two exchanges of a tick:
//!
//! ```text
//! scatter -> step chunk -> gather -> (coordinator) spread infection
//!         -> scatter -> advance chunk -> gather
//! ```
use std::thread;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::entity::{spread_infection, Entity, Grid};
use crate::error::EpiError;
use crate::exchange::{ChannelCommunicator, Communicator};
use crate::parameters::Parameters;
use crate::population::{EntityRecord, Population};

/// Everything a worker needs to know before the first tick. Sent once by the coordinator.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunHeader {
    pub ticks: u32,
    pub population: usize,
    pub grid: Grid,
    pub parameters: Parameters,
}

pub struct PartitionedEngine {
    grid: Grid,
    parameters: Parameters,
    workers: usize,
}

impl PartitionedEngine {
    pub fn new(grid: Grid, parameters: Parameters, workers: usize) -> PartitionedEngine {
        PartitionedEngine {
            grid,
            parameters,
            workers,
        }
    }

    /// Runs `ticks` ticks over `population` with one thread per worker; the calling thread is
    /// the coordinator. On success `population` holds the final state.
    ///
    /// # Errors
    /// Returns `EpiError::Config` before any tick runs if the worker count does not divide the
    /// population, and `EpiError::Coordination` if an exchange fails mid-run.
    pub fn run(&self, population: &mut Population, ticks: u32) -> Result<(), EpiError> {
        let chunk_len = population.chunk_len(self.workers)?;
        debug!(
            "partitioned run: {} entities, {} ticks, {} workers of {} entities",
            population.len(),
            ticks,
            self.workers,
            chunk_len
        );

        let header = RunHeader {
            ticks,
            population: population.len(),
            grid: self.grid,
            parameters: self.parameters,
        };

        let mut endpoints = ChannelCommunicator::group(self.workers)?.into_iter();
        let coordinator = endpoints
            .next()
            .ok_or_else(|| EpiError::Coordination("empty worker group".into()))?;

        thread::scope(|scope| {
            let handles: Vec<_> = endpoints
                .map(|worker| scope.spawn(move || run_rank(&worker, None, None)))
                .collect();

            // The coordinator's endpoint is dropped as soon as it stops, so workers still
            // waiting on it fail instead of blocking forever.
            let coordinator_result = run_rank(&coordinator, Some(&header), Some(population));
            drop(coordinator);

            let mut worker_result = Ok(());
            for (index, handle) in handles.into_iter().enumerate() {
                let outcome = handle.join().unwrap_or_else(|_| {
                    Err(EpiError::Coordination(format!(
                        "worker {} panicked",
                        index + 1
                    )))
                });
                if worker_result.is_ok() {
                    worker_result = outcome;
                }
            }
            coordinator_result.and(worker_result)
        })
    }
}

/// The per-rank protocol. The coordinator passes the header and the authoritative population;
/// workers pass `None` for both and learn the header from the broadcast.
pub fn run_rank<C: Communicator>(
    comm: &C,
    header: Option<&RunHeader>,
    mut population: Option<&mut Population>,
) -> Result<(), EpiError> {
    if comm.is_coordinator() != population.is_some() {
        return Err(EpiError::Coordination(format!(
            "rank {} has the wrong role for its data",
            comm.rank()
        )));
    }

    let header: RunHeader = comm.broadcast(header)?;
    let chunk_len = header.population / comm.size();

    for tick in 0..header.ticks {
        exchange_phase(comm, population.as_deref_mut(), chunk_len, |entity| {
            entity.step(&header.grid);
        })?;

        if let Some(population) = population.as_deref_mut() {
            spread_infection(population.as_mut_slice());
        }

        exchange_phase(comm, population.as_deref_mut(), chunk_len, |entity| {
            entity.advance_status(&header.parameters);
        })?;

        if comm.is_coordinator() {
            trace!("partitioned tick {} complete", tick + 1);
        }
    }
    Ok(())
}

/// One scatter / local phase / gather round trip. Only the coordinator holds `population`; it
/// is overwritten in place with the reassembled result.
fn exchange_phase<C, F>(
    comm: &C,
    mut population: Option<&mut Population>,
    chunk_len: usize,
    phase: F,
) -> Result<(), EpiError>
where
    C: Communicator,
    F: Fn(&mut Entity),
{
    let outgoing = population
        .as_deref()
        .map(|population| population.read_records(0..population.len()))
        .transpose()?;

    let chunk = comm.scatter(outgoing.as_deref())?;
    if chunk.len() != chunk_len {
        return Err(EpiError::Coordination(format!(
            "rank {} received {} records, expected {}",
            comm.rank(),
            chunk.len(),
            chunk_len
        )));
    }

    let chunk: Vec<EntityRecord> = chunk
        .iter()
        .map(|record| {
            let mut entity = Entity::from(record);
            phase(&mut entity);
            EntityRecord::from(&entity)
        })
        .collect();

    match (comm.gather(&chunk)?, population.as_deref_mut()) {
        (Some(reassembled), Some(population)) => {
            if reassembled.len() != population.len() {
                return Err(EpiError::Coordination(format!(
                    "reassembled {} records for a population of {}",
                    reassembled.len(),
                    population.len()
                )));
            }
            population.write_records(0, &reassembled)
        }
        (None, None) => Ok(()),
        _ => Err(EpiError::Coordination(format!(
            "rank {} received a gather result meant for another role",
            comm.rank()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Direction, Status};
    use crate::sequential::SequentialEngine;

    fn synthetic_population(size: u32, grid: &Grid) -> Population {
        let parameters = Parameters::default();
        let directions = [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
        ];
        Population::new(
            (0..size)
                .map(|i| {
                    let status = if i % 5 == 0 {
                        Status::Infected
                    } else if i % 7 == 0 {
                        Status::Immune
                    } else {
                        Status::Susceptible
                    };
                    Entity::new(
                        i + 1,
                        (
                            (i * 3 % (grid.max_x as u32 + 1)) as i32,
                            (i * 5 % grid.max_y as u32) as i32,
                        ),
                        status,
                        directions[(i % 4) as usize],
                        (i % 3 + 1) as i32,
                        &parameters,
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn matches_sequential_for_every_divisor() {
        let grid = Grid::new(5, 5);
        let start = synthetic_population(24, &grid);

        let mut expected = start.clone();
        SequentialEngine::new(grid, Parameters::default()).run(&mut expected, 40);

        for workers in [1, 2, 3, 4, 6, 8, 12, 24] {
            let mut actual = start.clone();
            PartitionedEngine::new(grid, Parameters::default(), workers)
                .run(&mut actual, 40)
                .unwrap();
            assert_eq!(actual, expected, "diverged with {workers} workers");
        }
    }

    #[test]
    fn infection_crosses_chunk_boundaries() {
        // Entity 1 lives in the first chunk and entity 4 in the last; they meet at (2, 2).
        let grid = Grid::new(10, 10);
        let parameters = Parameters::default();
        let mut population = Population::new(vec![
            Entity::new(1, (1, 2), Status::Infected, Direction::East, 1, &parameters),
            Entity::new(2, (8, 8), Status::Susceptible, Direction::North, 1, &parameters),
            Entity::new(3, (0, 8), Status::Susceptible, Direction::North, 1, &parameters),
            Entity::new(4, (3, 2), Status::Susceptible, Direction::West, 1, &parameters),
        ]);
        PartitionedEngine::new(grid, parameters, 4)
            .run(&mut population, 1)
            .unwrap();

        let exposed = population.get(3).unwrap();
        assert_eq!(exposed.position(), (2, 2));
        assert_eq!(exposed.status, Status::Infected);
        assert_eq!(exposed.infection_count, 1);
        assert_eq!(population.get(1).unwrap().status, Status::Susceptible);
    }

    #[test]
    fn uneven_split_fails_before_running() {
        let grid = Grid::new(5, 5);
        let mut population = synthetic_population(10, &grid);
        let before = population.clone();
        let result =
            PartitionedEngine::new(grid, Parameters::default(), 3).run(&mut population, 5);
        assert!(matches!(result, Err(EpiError::Config(_))));
        assert_eq!(population, before);
    }

    #[test]
    fn zero_ticks_is_a_no_op() {
        let grid = Grid::new(5, 5);
        let mut population = synthetic_population(8, &grid);
        let before = population.clone();
        PartitionedEngine::new(grid, Parameters::default(), 4)
            .run(&mut population, 0)
            .unwrap();
        assert_eq!(population, before);
    }

    #[test]
    fn mismatched_role_is_rejected() {
        let group = ChannelCommunicator::group(1).unwrap();
        let result = run_rank(&group[0], None, None);
        assert!(matches!(result, Err(EpiError::Coordination(_))));
    }
}
