//! Collective data exchange between the workers of a partitioned run.
//!
//! Workers share no memory. Everything that crosses a worker boundary is encoded with `bincode`
//! into a byte buffer of [`EntityRecord`]s (or a broadcast value) and moved through a channel.
//! The coordinator is rank 0 and is also a worker: it keeps its own chunk without a round trip.
//!
//! The in-process backend connects the coordinator to every other rank with rendezvous channels,
//! so a send completes only once the peer has reached the matching receive. A scatter or gather
//! therefore behaves like a barrier between the coordinator and each worker.
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use log::trace;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::EpiError;
use crate::population::EntityRecord;

/// Rank of the coordinator in every group.
pub const COORDINATOR: usize = 0;

/// The collectives the partitioned engine needs. Calls are collective: every rank in the group
/// must make the same sequence of calls.
pub trait Communicator {
    fn rank(&self) -> usize;

    /// Number of ranks in the group, coordinator included.
    fn size(&self) -> usize;

    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR
    }

    /// Sends `value` from the coordinator to every rank. The coordinator passes `Some`, workers
    /// pass `None`; every rank gets the value back.
    ///
    /// # Errors
    /// Returns an `EpiError` if a peer disconnected or the value cannot be encoded or decoded.
    fn broadcast<T>(&self, value: Option<&T>) -> Result<T, EpiError>
    where
        T: Serialize + DeserializeOwned + Clone;

    /// Splits the coordinator's records into `size()` equal contiguous chunks and hands chunk
    /// `r` to rank `r`. The coordinator passes `Some`, workers pass `None`.
    ///
    /// # Errors
    /// Returns an `EpiError` if a peer disconnected, the records do not divide evenly, or a
    /// buffer cannot be encoded or decoded.
    fn scatter(&self, records: Option<&[EntityRecord]>) -> Result<Vec<EntityRecord>, EpiError>;

    /// Collects every rank's chunk on the coordinator in rank order. The coordinator gets
    /// `Some` with the reassembled records, workers get `None`.
    ///
    /// # Errors
    /// Returns an `EpiError` if a peer disconnected, chunk sizes differ, or a buffer cannot be
    /// encoded or decoded.
    fn gather(&self, chunk: &[EntityRecord]) -> Result<Option<Vec<EntityRecord>>, EpiError>;
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, EpiError> {
    Ok(encode_to_vec(value, standard())?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, EpiError> {
    let (value, _) = decode_from_slice(bytes, standard())?;
    Ok(value)
}

enum Link {
    /// Index `i` talks to rank `i + 1`.
    Coordinator {
        to_workers: Vec<SyncSender<Vec<u8>>>,
        from_workers: Vec<Receiver<Vec<u8>>>,
    },
    Worker {
        to_coordinator: SyncSender<Vec<u8>>,
        from_coordinator: Receiver<Vec<u8>>,
    },
}

/// One endpoint of an in-process group. Each endpoint is meant to be moved onto its own thread.
pub struct ChannelCommunicator {
    rank: usize,
    size: usize,
    link: Link,
}

impl ChannelCommunicator {
    /// Creates a connected group of `size` endpoints, ordered by rank.
    ///
    /// # Errors
    /// Returns `EpiError::Config` if `size` is zero.
    pub fn group(size: usize) -> Result<Vec<ChannelCommunicator>, EpiError> {
        if size == 0 {
            return Err(EpiError::Config("worker count must be at least 1".into()));
        }

        let mut to_workers = Vec::with_capacity(size - 1);
        let mut from_workers = Vec::with_capacity(size - 1);
        let mut workers = Vec::with_capacity(size - 1);
        for rank in 1..size {
            let (down_tx, down_rx) = sync_channel(0);
            let (up_tx, up_rx) = sync_channel(0);
            to_workers.push(down_tx);
            from_workers.push(up_rx);
            workers.push(ChannelCommunicator {
                rank,
                size,
                link: Link::Worker {
                    to_coordinator: up_tx,
                    from_coordinator: down_rx,
                },
            });
        }

        let coordinator = ChannelCommunicator {
            rank: COORDINATOR,
            size,
            link: Link::Coordinator {
                to_workers,
                from_workers,
            },
        };

        let mut group = Vec::with_capacity(size);
        group.push(coordinator);
        group.extend(workers);
        Ok(group)
    }

    fn send_to_worker(
        senders: &[SyncSender<Vec<u8>>],
        index: usize,
        bytes: Vec<u8>,
    ) -> Result<(), EpiError> {
        senders[index]
            .send(bytes)
            .map_err(|_| EpiError::Coordination(format!("worker {} hung up", index + 1)))
    }

    fn receive_from_worker(
        receivers: &[Receiver<Vec<u8>>],
        index: usize,
    ) -> Result<Vec<u8>, EpiError> {
        receivers[index]
            .recv()
            .map_err(|_| EpiError::Coordination(format!("worker {} hung up", index + 1)))
    }

    fn send_to_coordinator(
        &self,
        sender: &SyncSender<Vec<u8>>,
        bytes: Vec<u8>,
    ) -> Result<(), EpiError> {
        sender.send(bytes).map_err(|_| {
            EpiError::Coordination(format!("coordinator hung up on worker {}", self.rank))
        })
    }

    fn receive_from_coordinator(
        &self,
        receiver: &Receiver<Vec<u8>>,
    ) -> Result<Vec<u8>, EpiError> {
        receiver.recv().map_err(|_| {
            EpiError::Coordination(format!("coordinator hung up on worker {}", self.rank))
        })
    }
}

impl Communicator for ChannelCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast<T>(&self, value: Option<&T>) -> Result<T, EpiError>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        match (&self.link, value) {
            (Link::Coordinator { to_workers, .. }, Some(value)) => {
                let bytes = encode(value)?;
                for index in 0..to_workers.len() {
                    Self::send_to_worker(to_workers, index, bytes.clone())?;
                }
                Ok(value.clone())
            }
            (Link::Worker { from_coordinator, .. }, None) => {
                decode(&self.receive_from_coordinator(from_coordinator)?)
            }
            _ => Err(role_mismatch(self.rank, "broadcast")),
        }
    }

    fn scatter(&self, records: Option<&[EntityRecord]>) -> Result<Vec<EntityRecord>, EpiError> {
        match (&self.link, records) {
            (Link::Coordinator { to_workers, .. }, Some(records)) => {
                if records.len() % self.size != 0 {
                    return Err(EpiError::Coordination(format!(
                        "cannot scatter {} records over {} ranks",
                        records.len(),
                        self.size
                    )));
                }
                let chunk_len = records.len() / self.size;
                for index in 0..to_workers.len() {
                    let start = (index + 1) * chunk_len;
                    let chunk = &records[start..start + chunk_len];
                    Self::send_to_worker(to_workers, index, encode(chunk)?)?;
                }
                let own = records[..chunk_len].to_vec();
                trace!("scattered {} records, {} per rank", records.len(), chunk_len);
                Ok(own)
            }
            (Link::Worker { from_coordinator, .. }, None) => {
                decode(&self.receive_from_coordinator(from_coordinator)?)
            }
            _ => Err(role_mismatch(self.rank, "scatter")),
        }
    }

    fn gather(&self, chunk: &[EntityRecord]) -> Result<Option<Vec<EntityRecord>>, EpiError> {
        match &self.link {
            Link::Coordinator { from_workers, .. } => {
                let mut reassembled = Vec::new();
                reassembled
                    .try_reserve_exact(chunk.len() * self.size)
                    .map_err(|error| {
                        EpiError::Coordination(format!(
                            "cannot allocate reassembly buffer: {error}"
                        ))
                    })?;
                reassembled.extend_from_slice(chunk);
                for index in 0..from_workers.len() {
                    let bytes = Self::receive_from_worker(from_workers, index)?;
                    let received: Vec<EntityRecord> = decode(&bytes)?;
                    if received.len() != chunk.len() {
                        return Err(EpiError::Coordination(format!(
                            "worker {} sent {} records, expected {}",
                            index + 1,
                            received.len(),
                            chunk.len()
                        )));
                    }
                    reassembled.extend(received);
                }
                Ok(Some(reassembled))
            }
            Link::Worker { to_coordinator, .. } => {
                self.send_to_coordinator(to_coordinator, encode(chunk)?)?;
                Ok(None)
            }
        }
    }
}

fn role_mismatch(rank: usize, operation: &str) -> EpiError {
    if rank == COORDINATOR {
        EpiError::Coordination(format!("coordinator must supply data to {operation}"))
    } else {
        EpiError::Coordination(format!("worker {rank} cannot supply data to {operation}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Axis, Status};
    use std::thread;

    fn record(id: u32) -> EntityRecord {
        EntityRecord {
            id,
            x: id as i32,
            y: 0,
            axis: Axis::Horizontal,
            amplitude: 1,
            status: Status::Susceptible,
            infected_timer: 3,
            immune_timer: 3,
            infection_count: 0,
            pending_infection: false,
        }
    }

    #[test]
    fn records_survive_encoding() {
        let mut records: Vec<EntityRecord> = (1..=4).map(record).collect();
        records[2].status = Status::Infected;
        records[3].pending_infection = true;
        let decoded: Vec<EntityRecord> = decode(&encode(records.as_slice()).unwrap()).unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn group_of_zero_is_rejected() {
        assert!(matches!(
            ChannelCommunicator::group(0),
            Err(EpiError::Config(_))
        ));
    }

    #[test]
    fn scatter_then_gather_preserves_order() {
        let group = ChannelCommunicator::group(4).unwrap();
        let records: Vec<EntityRecord> = (1..=8).map(record).collect();

        let gathered = thread::scope(|scope| {
            let mut endpoints = group.into_iter();
            let coordinator = endpoints.next().unwrap();
            for worker in endpoints {
                scope.spawn(move || {
                    let mut chunk = worker.scatter(None).unwrap();
                    assert_eq!(chunk.len(), 2);
                    assert_eq!(chunk[0].id as usize, worker.rank() * 2 + 1);
                    for record in &mut chunk {
                        record.x += 100;
                    }
                    assert!(worker.gather(&chunk).unwrap().is_none());
                });
            }

            let chunk = coordinator.scatter(Some(records.as_slice())).unwrap();
            assert_eq!(chunk.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
            coordinator.gather(&chunk).unwrap().unwrap()
        });

        assert_eq!(
            gathered.iter().map(|r| r.id).collect::<Vec<_>>(),
            (1..=8).collect::<Vec<_>>()
        );
        assert_eq!(gathered[0].x, 1);
        assert_eq!(gathered[7].x, 108);
    }

    #[test]
    fn broadcast_reaches_every_worker() {
        let group = ChannelCommunicator::group(3).unwrap();
        thread::scope(|scope| {
            let mut endpoints = group.into_iter();
            let coordinator = endpoints.next().unwrap();
            for worker in endpoints {
                scope.spawn(move || {
                    let value: (u32, String) = worker.broadcast(None).unwrap();
                    assert_eq!(value, (7, "ticks".to_string()));
                });
            }
            let value = coordinator
                .broadcast(Some(&(7u32, "ticks".to_string())))
                .unwrap();
            assert_eq!(value.0, 7);
        });
    }

    #[test]
    fn uneven_scatter_is_rejected() {
        let group = ChannelCommunicator::group(3).unwrap();
        let records: Vec<EntityRecord> = (1..=4).map(record).collect();
        let coordinator = &group[0];
        assert!(matches!(
            coordinator.scatter(Some(records.as_slice())),
            Err(EpiError::Coordination(_))
        ));
    }

    #[test]
    fn wrong_role_is_rejected() {
        let group = ChannelCommunicator::group(2).unwrap();
        assert!(group[0].scatter(None).is_err());
        assert!(group[1].scatter(Some(&[record(1)][..])).is_err());
    }

    #[test]
    fn departed_worker_is_a_coordination_error() {
        let mut group = ChannelCommunicator::group(2).unwrap();
        drop(group.pop());
        let records: Vec<EntityRecord> = (1..=2).map(record).collect();
        let result = group[0].scatter(Some(records.as_slice()));
        assert!(matches!(result, Err(EpiError::Coordination(_))));
    }

    #[test]
    fn single_rank_group_needs_no_peers() {
        let group = ChannelCommunicator::group(1).unwrap();
        let records: Vec<EntityRecord> = (1..=3).map(record).collect();
        let chunk = group[0].scatter(Some(records.as_slice())).unwrap();
        assert_eq!(chunk, records);
        assert_eq!(group[0].gather(&chunk).unwrap().unwrap(), records);
    }
}
