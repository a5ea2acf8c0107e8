use std::sync::RwLock;

use itertools::Itertools;
use rayon::prelude::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, warn};

use common::{LockVec, MedianError, OperatorCatalog, Result, Value};

use crate::driver::MedianAggregate;
use crate::state::AccumulatorState;
use crate::updater::Updater;

/// Accumulator of one group plus the first error stepping into it raised. A failed group rejects
/// further values and finishes with that error.
#[derive(Debug, Default)]
struct Group {
    state: AccumulatorState,
    failure: Option<MedianError>,
}

impl Group {
    fn step<C: OperatorCatalog>(&mut self, aggregate: &MedianAggregate<C>, ticket: usize, value: Option<Value>) -> Result<()> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if let Err(err) = aggregate.step(&mut self.state, value) {
            warn!(ticket, %err, "group failed");
            self.failure = Some(err.clone());
            return Err(err);
        }
        Ok(())
    }

    fn finish<C: OperatorCatalog>(self, aggregate: &MedianAggregate<C>) -> Result<Option<Value>> {
        match self.failure {
            Some(err) => Err(err),
            None => aggregate.finish(self.state),
        }
    }
}

/// One lock per group. Threads stepping different groups never contend; steps into the same
/// group are serialized. Groups are finished independently on a rayon pool.
pub struct MedianUpdater<C: OperatorCatalog> {
    aggregate: MedianAggregate<C>,
    groups: LockVec<Group>,
    threads: usize,
}

impl<C: OperatorCatalog> MedianUpdater<C> {
    pub fn with_capacity_and_threads(aggregate: MedianAggregate<C>, capacity: usize, threads: usize) -> Self {
        Self {
            aggregate,
            groups: LockVec::new(capacity),
            threads: threads.max(1),
        }
    }
}

impl<C: OperatorCatalog> Updater<Option<Value>> for MedianUpdater<C> {
    type Agg = Option<Value>;

    fn groups(&self) -> usize {
        self.groups.len()
    }

    fn update_vec(&self, tickets: &[usize], values: &[Option<Value>]) -> Result<()> {
        for (ticket, value) in tickets.iter().zip(values.iter()) {
            let mut group = self.groups.write(*ticket)?;
            group.step(&self.aggregate, *ticket, value.clone())?;
        }
        Ok(())
    }

    fn into_vec(self) -> Result<Vec<Self::Agg>> {
        let groups = self.groups.into_inner()?;
        debug!(groups = groups.len(), threads = self.threads, "finishing groups");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .map_err(|err| MedianError::Pool(err.to_string()))?;
        let aggregate = &self.aggregate;
        pool.install(|| {
            groups
                .into_par_iter()
                .map(|group| group.finish(aggregate))
                .collect::<Result<Vec<_>>>()
        })
    }
}

/// Every group behind a single lock. Simple, and serializes all writers.
pub struct GlobalLockingMedianUpdater<C: OperatorCatalog> {
    aggregate: MedianAggregate<C>,
    groups: RwLock<Vec<Group>>,
    len: usize,
}

impl<C: OperatorCatalog> GlobalLockingMedianUpdater<C> {
    pub fn with_capacity(aggregate: MedianAggregate<C>, capacity: usize) -> Self {
        Self {
            aggregate,
            groups: RwLock::new((0..capacity).map(|_| Group::default()).collect_vec()),
            len: capacity,
        }
    }
}

impl<C: OperatorCatalog> Updater<Option<Value>> for GlobalLockingMedianUpdater<C> {
    type Agg = Option<Value>;

    fn groups(&self) -> usize {
        self.len
    }

    fn update_vec(&self, tickets: &[usize], values: &[Option<Value>]) -> Result<()> {
        let mut groups = self.groups.write().map_err(|_g| MedianError::Poisoned)?;
        for (ticket, value) in tickets.iter().zip(values.iter()) {
            let group = groups
                .get_mut(*ticket)
                .ok_or(MedianError::UnknownGroup { ticket: *ticket, groups: self.len })?;
            group.step(&self.aggregate, *ticket, value.clone())?;
        }
        Ok(())
    }

    fn into_vec(self) -> Result<Vec<Self::Agg>> {
        let groups = self.groups.into_inner().map_err(|_g| MedianError::Poisoned)?;
        groups
            .into_iter()
            .map(|group| group.finish(&self.aggregate))
            .collect()
    }
}
