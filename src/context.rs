//! The state of a single run. Both engines work on their own copy of the scenario's population
//! and only touch the state they are handed.
use std::time::Duration;

use log::debug;

use crate::consistency::{compare, Agreement};
use crate::entity::Grid;
use crate::error::EpiError;
use crate::execution_stats::{timed, SpeedupReport};
use crate::loader::Scenario;
use crate::parameters::Parameters;
use crate::partitioned::PartitionedEngine;
use crate::population::Population;
use crate::sequential::SequentialEngine;

pub struct RunContext {
    parameters: Parameters,
    grid: Grid,
    ticks: u32,
    workers: usize,
    sequential: Population,
    partitioned: Population,
    sequential_time: Option<Duration>,
    partitioned_time: Option<Duration>,
}

impl RunContext {
    /// Builds a context from a parsed scenario. The population is deep-copied so the engines
    /// never share entities.
    ///
    /// # Errors
    /// Returns `EpiError::Config` if `ticks` is zero, the parameters are invalid or `workers`
    /// does not evenly divide the population.
    pub fn new(
        scenario: Scenario,
        parameters: Parameters,
        ticks: u32,
        workers: usize,
    ) -> Result<RunContext, EpiError> {
        if ticks == 0 {
            return Err(EpiError::Config(
                "simulation time must be positive".to_string(),
            ));
        }
        parameters.validate()?;
        let chunk_len = scenario.population.chunk_len(workers)?;
        debug!(
            "run context: {} ticks, {} workers of {} entities",
            ticks, workers, chunk_len
        );

        let partitioned = scenario.population.clone();
        Ok(RunContext {
            parameters,
            grid: scenario.grid,
            ticks,
            workers,
            sequential: scenario.population,
            partitioned,
            sequential_time: None,
            partitioned_time: None,
        })
    }

    pub fn sequential_population(&self) -> &Population {
        &self.sequential
    }

    pub fn partitioned_population(&self) -> &Population {
        &self.partitioned
    }

    pub fn run_sequential(&mut self) -> Duration {
        let engine = SequentialEngine::new(self.grid, self.parameters);
        let ((), elapsed) = timed(|| engine.run(&mut self.sequential, self.ticks));
        self.sequential_time = Some(elapsed);
        elapsed
    }

    /// # Errors
    /// Returns an `EpiError` if the partitioned run aborts. The sequential results are not
    /// affected.
    pub fn run_partitioned(&mut self) -> Result<Duration, EpiError> {
        let engine = PartitionedEngine::new(self.grid, self.parameters, self.workers);
        let (result, elapsed) = timed(|| engine.run(&mut self.partitioned, self.ticks));
        result?;
        self.partitioned_time = Some(elapsed);
        Ok(elapsed)
    }

    pub fn agreement(&self) -> Agreement {
        compare(&self.sequential, &self.partitioned)
    }

    /// Available once both engines have finished.
    pub fn speedup_report(&self) -> Option<SpeedupReport> {
        match (self.sequential_time, self.partitioned_time) {
            (Some(sequential), Some(partitioned)) => {
                Some(SpeedupReport::new(sequential, partitioned, self.workers))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_scenario;

    const SCENARIO: &str = "10 10\n4\n\
                            1 5 5 0 0 1\n\
                            2 5 3 1 1 1\n\
                            3 0 9 1 1 2\n\
                            4 9 0 2 2 1\n";

    fn scenario() -> Scenario {
        parse_scenario(SCENARIO, &Parameters::default()).unwrap()
    }

    #[test]
    fn engines_agree() {
        let mut context = RunContext::new(scenario(), Parameters::default(), 12, 2).unwrap();
        assert!(context.speedup_report().is_none());

        context.run_sequential();
        assert_ne!(context.sequential_population(), &scenario().population);
        assert_eq!(context.partitioned_population(), &scenario().population);

        context.run_partitioned().unwrap();
        assert_eq!(context.agreement(), Agreement::AllMatch);
        let report = context.speedup_report().unwrap();
        assert_eq!(report.workers, 2);
    }

    #[test]
    fn rejects_zero_ticks() {
        let result = RunContext::new(scenario(), Parameters::default(), 0, 1);
        assert!(matches!(result, Err(EpiError::Config(_))));
    }

    #[test]
    fn rejects_uneven_worker_count() {
        let result = RunContext::new(scenario(), Parameters::default(), 5, 3);
        assert!(matches!(result, Err(EpiError::Config(_))));
    }

    #[test]
    fn rejects_invalid_parameters() {
        let parameters = Parameters {
            infected_duration: 0,
            immune_duration: 3,
        };
        let result = RunContext::new(scenario(), parameters, 5, 1);
        assert!(matches!(result, Err(EpiError::Config(_))));
    }
}
