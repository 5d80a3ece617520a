use log::{debug, log_enabled, trace, Level};

use crate::entity::{mark_exposed, Grid, Status};
use crate::parameters::Parameters;
use crate::population::Population;

/// Single-threaded reference engine. Its output is the oracle the partitioned engine is checked
/// against, so it applies the plain co-location rule ([`mark_exposed`]) rather than the indexed
/// infection phase the partitioned engine uses.
pub struct SequentialEngine {
    grid: Grid,
    parameters: Parameters,
}

impl SequentialEngine {
    pub fn new(grid: Grid, parameters: Parameters) -> SequentialEngine {
        SequentialEngine { grid, parameters }
    }

    /// Runs `ticks` ticks over the whole population.
    pub fn run(&self, population: &mut Population, ticks: u32) {
        debug!(
            "sequential run: {} entities, {} ticks",
            population.len(),
            ticks
        );
        for tick in 0..ticks {
            self.tick(population);
            if log_enabled!(Level::Trace) {
                trace!("after tick {}", tick + 1);
                for entity in population.iter() {
                    trace!(
                        "person {}: ({}, {}), status: {}, infected {} time(s)",
                        entity.id,
                        entity.x,
                        entity.y,
                        entity.status,
                        entity.infection_count
                    );
                }
            }
        }
    }

    /// One tick: every entity moves, then infected entities flag their neighbors, then every
    /// entity advances its status. Each phase finishes for the whole population before the next
    /// one starts.
    pub fn tick(&self, population: &mut Population) {
        for entity in population.iter_mut() {
            entity.step(&self.grid);
        }

        let entities = population.as_mut_slice();
        for index in 0..entities.len() {
            if entities[index].status == Status::Infected {
                let infected = entities[index];
                mark_exposed(&infected, entities);
            }
        }

        for entity in population.iter_mut() {
            entity.advance_status(&self.parameters);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Direction, Entity};
    use crate::loader::parse_scenario;

    fn engine() -> SequentialEngine {
        SequentialEngine::new(Grid::new(10, 10), Parameters::default())
    }

    fn person(id: u32, position: (i32, i32), status: Status, direction: Direction) -> Entity {
        Entity::new(id, position, status, direction, 1, &Parameters::default())
    }

    #[test]
    fn diverging_neighbors_do_not_infect() {
        let mut population = Population::new(vec![
            person(1, (5, 5), Status::Infected, Direction::North),
            person(2, (5, 5), Status::Susceptible, Direction::South),
        ]);
        engine().run(&mut population, 1);

        let infected = population.get(0).unwrap();
        assert_eq!(infected.position(), (5, 4));
        assert_eq!(infected.status, Status::Infected);
        assert_eq!(infected.infected_timer, 2);

        let susceptible = population.get(1).unwrap();
        assert_eq!(susceptible.position(), (5, 6));
        assert_eq!(susceptible.status, Status::Susceptible);
        assert_eq!(susceptible.infection_count, 0);
    }

    #[test]
    fn infection_uses_post_movement_positions() {
        // Both land on (5, 5) after moving.
        let mut population = Population::new(vec![
            person(1, (5, 4), Status::Infected, Direction::South),
            person(2, (5, 6), Status::Susceptible, Direction::North),
        ]);
        engine().run(&mut population, 1);

        let exposed = population.get(1).unwrap();
        assert_eq!(exposed.position(), (5, 5));
        assert_eq!(exposed.status, Status::Infected);
        assert_eq!(exposed.infection_count, 1);
        assert!(!exposed.pending_infection);
    }

    #[test]
    fn zero_ticks_leave_population_untouched() {
        let mut population = Population::new(vec![
            person(1, (1, 1), Status::Infected, Direction::East),
            person(2, (1, 1), Status::Susceptible, Direction::East),
        ]);
        let before = population.clone();
        engine().run(&mut population, 0);
        assert_eq!(population, before);
    }

    #[test]
    fn co_travellers_cycle_through_immunity() {
        let mut population = Population::new(vec![
            person(1, (0, 0), Status::Infected, Direction::East),
            person(2, (0, 0), Status::Susceptible, Direction::East),
        ]);
        let engine = engine();

        // Tick 1: co-located after moving, entity 2 is infected.
        engine.tick(&mut population);
        assert_eq!(population.get(1).unwrap().status, Status::Infected);

        // Tick 3: entity 1 has served its three infected ticks.
        engine.tick(&mut population);
        engine.tick(&mut population);
        assert_eq!(population.get(0).unwrap().status, Status::Immune);
        assert_eq!(population.get(1).unwrap().status, Status::Infected);

        // Tick 4: entity 2 turns immune too.
        engine.tick(&mut population);
        assert_eq!(population.get(1).unwrap().status, Status::Immune);

        // Tick 6: entity 1 is susceptible again while entity 2 is still immune.
        engine.tick(&mut population);
        engine.tick(&mut population);
        assert_eq!(population.get(0).unwrap().status, Status::Susceptible);
        assert_eq!(population.get(1).unwrap().status, Status::Immune);
        assert_eq!(population.get(0).unwrap().infection_count, 0);
        assert_eq!(population.get(1).unwrap().infection_count, 1);
    }

    #[test]
    fn loaded_maximum_amplitude_runs() {
        let parameters = Parameters::default();
        let scenario = parse_scenario("10 10\n1\n1 5 5 1 1 2147483647\n", &parameters).unwrap();
        let mut population = scenario.population;
        SequentialEngine::new(scenario.grid, parameters).run(&mut population, 3);

        let entity = population.get(0).unwrap();
        assert_eq!(entity.position(), (5, 9));
        assert_eq!(entity.amplitude, -i32::MAX);
    }
}
