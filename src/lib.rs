//! Infection spread on a two-dimensional grid, simulated twice.
//!
//! People move back and forth along one axis of a bounded grid, bouncing off its edges. Each
//! tick every person moves, infected people flag the susceptible people sharing their cell, and
//! then every person advances through the cycle SUSCEPTIBLE -> INFECTED -> IMMUNE ->
//! SUSCEPTIBLE.
//!
//! The same scenario is run by two engines:
//! * The [`SequentialEngine`] runs every phase over the whole population on one thread. Its
//!   output is the reference.
//! * The [`PartitionedEngine`] splits the population into equal contiguous chunks, one per
//!   worker thread. Workers share no memory; chunks travel as encoded records over the
//!   scatter/gather primitives of the [`exchange`] module, and a coordinator runs the infection
//!   phase on the reassembled population.
//!
//! The [`consistency`] module then compares the two final populations entity by entity.
//! Divergence is reported, not treated as a failure.
//!
//! ```rust
//! use epigrid::loader::parse_scenario;
//! use epigrid::{compare, Agreement, Parameters, PartitionedEngine, SequentialEngine};
//!
//! let parameters = Parameters::default();
//! let scenario = parse_scenario("10 10\n2\n1 5 5 0 0 1\n2 5 3 1 1 1\n", &parameters).unwrap();
//!
//! let mut sequential = scenario.population.clone();
//! SequentialEngine::new(scenario.grid, parameters).run(&mut sequential, 10);
//!
//! let mut partitioned = scenario.population;
//! PartitionedEngine::new(scenario.grid, parameters, 2)
//!     .run(&mut partitioned, 10)
//!     .unwrap();
//!
//! assert_eq!(compare(&sequential, &partitioned), Agreement::AllMatch);
//! ```
pub mod consistency;
pub mod context;
pub mod entity;
pub mod error;
pub mod exchange;
pub mod execution_stats;
pub mod loader;
pub mod log;
pub mod parameters;
pub mod partitioned;
pub mod population;
pub mod report;
pub mod runner;
pub mod sequential;

pub use consistency::{compare, Agreement};
pub use context::RunContext;
pub use entity::{Direction, Entity, Grid, Status};
pub use error::EpiError;
pub use parameters::Parameters;
pub use partitioned::PartitionedEngine;
pub use population::Population;
pub use sequential::SequentialEngine;
