use std::fmt;

use crate::entity::Entity;
use crate::population::Population;

/// Outcome of comparing two final populations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agreement {
    AllMatch,
    /// 1-based index of the first entity that differs.
    MismatchAt(usize),
}

impl Agreement {
    pub fn is_match(&self) -> bool {
        matches!(self, Agreement::AllMatch)
    }
}

impl fmt::Display for Agreement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Agreement::AllMatch => write!(f, "all results match"),
            Agreement::MismatchAt(index) => {
                write!(f, "!!! RESULTS DO NOT MATCH AT INDEX {index} !!!")
            }
        }
    }
}

/// Equality over the observable outcome only. Timers and the pending infection flag are left
/// out.
pub fn same_outcome(left: &Entity, right: &Entity) -> bool {
    left.id == right.id
        && left.x == right.x
        && left.y == right.y
        && left.status == right.status
        && left.infection_count == right.infection_count
}

/// Compares two populations index by index and reports the first divergence.
pub fn compare(expected: &Population, actual: &Population) -> Agreement {
    for (index, (left, right)) in expected.iter().zip(actual.iter()).enumerate() {
        if !same_outcome(left, right) {
            return Agreement::MismatchAt(index + 1);
        }
    }
    if expected.len() == actual.len() {
        Agreement::AllMatch
    } else {
        Agreement::MismatchAt(expected.len().min(actual.len()) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Direction, Status};
    use crate::parameters::Parameters;

    fn population(size: u32) -> Population {
        let parameters = Parameters::default();
        Population::new(
            (1..=size)
                .map(|id| {
                    Entity::new(
                        id,
                        (id as i32, id as i32),
                        Status::Susceptible,
                        Direction::South,
                        1,
                        &parameters,
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn identical_populations_match() {
        let population = population(5);
        assert_eq!(compare(&population, &population.clone()), Agreement::AllMatch);
    }

    #[test]
    fn reports_one_based_index() {
        let expected = population(5);
        let mut actual = expected.clone();
        actual.as_mut_slice()[3].status = Status::Infected;
        assert_eq!(compare(&expected, &actual), Agreement::MismatchAt(4));
    }

    #[test]
    fn first_of_several_mismatches_wins() {
        let expected = population(5);
        let mut actual = expected.clone();
        actual.as_mut_slice()[1].infection_count = 2;
        actual.as_mut_slice()[4].x = 0;
        assert_eq!(compare(&expected, &actual), Agreement::MismatchAt(2));
    }

    #[test]
    fn internal_state_is_ignored() {
        let expected = population(3);
        let mut actual = expected.clone();
        let entity = &mut actual.as_mut_slice()[0];
        entity.infected_timer = 1;
        entity.immune_timer = 2;
        entity.pending_infection = true;
        entity.amplitude = -1;
        assert!(compare(&expected, &actual).is_match());
    }

    #[test]
    fn shorter_population_mismatches_past_its_end() {
        let expected = population(4);
        let actual = Population::new(expected.as_slice()[..3].to_vec());
        assert_eq!(compare(&expected, &actual), Agreement::MismatchAt(4));
    }

    #[test]
    fn mismatch_message() {
        assert_eq!(
            Agreement::MismatchAt(4).to_string(),
            "!!! RESULTS DO NOT MATCH AT INDEX 4 !!!"
        );
    }
}
