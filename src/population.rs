//! An ordered, fixed-size store of entities addressed by index. Ids are identity, indices are
//! placement: chunking and the consistency check both work on indices.
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::entity::{Axis, Entity, Status};
use crate::error::EpiError;

/// The wire form of an entity, used whenever entities leave the memory of the worker that owns
/// them. Field order is fixed and is part of the exchange format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub axis: Axis,
    pub amplitude: i32,
    pub status: Status,
    pub infected_timer: u32,
    pub immune_timer: u32,
    pub infection_count: u32,
    // Set by the infection phase and consumed by the transition phase of the same tick, so it
    // has to survive the scatter between them.
    pub pending_infection: bool,
}

impl From<&Entity> for EntityRecord {
    fn from(entity: &Entity) -> Self {
        EntityRecord {
            id: entity.id,
            x: entity.x,
            y: entity.y,
            axis: entity.axis,
            amplitude: entity.amplitude,
            status: entity.status,
            infected_timer: entity.infected_timer,
            immune_timer: entity.immune_timer,
            infection_count: entity.infection_count,
            pending_infection: entity.pending_infection,
        }
    }
}

impl From<&EntityRecord> for Entity {
    fn from(record: &EntityRecord) -> Self {
        Entity {
            id: record.id,
            x: record.x,
            y: record.y,
            axis: record.axis,
            amplitude: record.amplitude,
            status: record.status,
            pending_infection: record.pending_infection,
            infected_timer: record.infected_timer,
            immune_timer: record.immune_timer,
            infection_count: record.infection_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Population {
    entities: Vec<Entity>,
}

impl Population {
    pub fn new(entities: Vec<Entity>) -> Population {
        Population { entities }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Entity> {
        self.entities.iter_mut()
    }

    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    pub fn as_mut_slice(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    /// Size of each of `workers` equal contiguous chunks.
    ///
    /// # Errors
    /// Returns `EpiError::Config` if `workers` is zero or does not divide the population.
    pub fn chunk_len(&self, workers: usize) -> Result<usize, EpiError> {
        if workers == 0 {
            return Err(EpiError::Config("worker count must be at least 1".into()));
        }
        if self.len() % workers != 0 {
            return Err(EpiError::Config(format!(
                "population of {} is not divisible by {workers} workers",
                self.len()
            )));
        }
        Ok(self.len() / workers)
    }

    /// Copies the entities in `range` out in wire form.
    ///
    /// # Errors
    /// Returns `EpiError::Coordination` if the range is out of bounds.
    pub fn read_records(&self, range: Range<usize>) -> Result<Vec<EntityRecord>, EpiError> {
        let slice = self.entities.get(range.clone()).ok_or_else(|| {
            EpiError::Coordination(format!(
                "range {range:?} outside population of {}",
                self.len()
            ))
        })?;
        Ok(slice.iter().map(EntityRecord::from).collect())
    }

    /// Overwrites the entities starting at `start` with `records`.
    ///
    /// # Errors
    /// Returns `EpiError::Coordination` if the records do not fit.
    pub fn write_records(&mut self, start: usize, records: &[EntityRecord]) -> Result<(), EpiError> {
        let len = self.len();
        let slice = self
            .entities
            .get_mut(start..start + records.len())
            .ok_or_else(|| {
                EpiError::Coordination(format!(
                    "{} records at index {start} overflow population of {len}",
                    records.len()
                ))
            })?;
        for (entity, record) in slice.iter_mut().zip(records) {
            *entity = Entity::from(record);
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Population {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}
