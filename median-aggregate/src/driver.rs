use tracing::debug;

use common::{BuiltinCatalog, MedianError, OperatorCatalog, Result, Value, ValueBuffer};
use order_statistic::BoundedHeap;

use crate::state::AccumulatorState;
use crate::strategy::Strategy;

/// Median aggregate over values of one run-time type. `step` feeds a group's state one value at a
/// time; `finish` consumes the state and selects the result with the configured strategy.
///
/// Even-length inputs yield the upper median. Nothing is ever averaged.
pub struct MedianAggregate<C: OperatorCatalog = BuiltinCatalog> {
    catalog: C,
    strategy: Strategy,
    initial_capacity: usize,
}

impl Default for MedianAggregate<BuiltinCatalog> {
    fn default() -> Self {
        Self::new(BuiltinCatalog::new(), Strategy::default())
    }
}

impl<C: OperatorCatalog> MedianAggregate<C> {
    pub fn new(catalog: C, strategy: Strategy) -> Self {
        Self {
            catalog,
            strategy,
            initial_capacity: ValueBuffer::DEFAULT_CAPACITY,
        }
    }

    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity.max(1);
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Missing values pass through. A value of a different type than the group's first one fails
    /// with `TypeMismatch` and leaves the state as it was.
    pub fn step(&self, state: &mut AccumulatorState, value: Option<Value>) -> Result<()> {
        let Some(value) = value else {
            return Ok(());
        };

        match state {
            AccumulatorState::Empty => {
                let type_oid = value.type_oid;
                let init = match self.strategy {
                    Strategy::Heap => {
                        let comparator = self.catalog.resolve(type_oid, self.strategy.operator())?;
                        let mut heap = BoundedHeap::with_capacity(self.initial_capacity);
                        heap.insert(Some(value), &comparator)?;
                        AccumulatorState::Heap { heap, comparator }
                    }
                    Strategy::Sort | Strategy::Quickselect(_) => {
                        let mut buffer = ValueBuffer::with_capacity(self.initial_capacity);
                        buffer.append(Some(value))?;
                        AccumulatorState::Buffer(buffer)
                    }
                };
                debug!(%type_oid, strategy = ?self.strategy, "initialized median state");
                *state = init;
            }
            AccumulatorState::Buffer(buffer) => buffer.append(Some(value))?,
            AccumulatorState::Heap { heap, comparator } => heap.insert(Some(value), comparator)?,
        }
        Ok(())
    }

    pub fn step_all<I>(&self, state: &mut AccumulatorState, values: I) -> Result<()>
    where
        I: IntoIterator<Item = Option<Value>>,
    {
        for value in values {
            self.step(state, value)?;
        }
        Ok(())
    }

    /// `None` when the group never saw a present value.
    pub fn finish(&self, state: AccumulatorState) -> Result<Option<Value>> {
        debug!(len = state.len(), strategy = ?self.strategy, "finishing median state");
        match (self.strategy, state) {
            (_, AccumulatorState::Empty) => Ok(None),
            (Strategy::Heap, AccumulatorState::Heap { heap, .. }) => Ok(heap.peek()),
            (Strategy::Heap, AccumulatorState::Buffer(buffer)) => self.heap_top(buffer),
            (_, AccumulatorState::Heap { heap, .. }) => self.select(heap.into_buffer()),
            (_, AccumulatorState::Buffer(buffer)) => self.select(buffer),
        }
    }

    fn select(&self, mut buffer: ValueBuffer) -> Result<Option<Value>> {
        let Some(type_oid) = buffer.type_oid() else {
            return Ok(None);
        };
        let Some(selector) = self.strategy.selector() else {
            return self.heap_top(buffer);
        };

        let comparator = self.catalog.resolve(type_oid, selector.operator())?;
        match selector.select_median(&mut buffer, &comparator) {
            Ok(datum) => Ok(Some(Value::new(type_oid, datum))),
            Err(MedianError::NoType) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Heap strategy applied to a state that was accumulated as a flat buffer.
    fn heap_top(&self, buffer: ValueBuffer) -> Result<Option<Value>> {
        let Some(type_oid) = buffer.type_oid() else {
            return Ok(None);
        };
        let comparator = self.catalog.resolve(type_oid, Strategy::Heap.operator())?;
        let mut heap = BoundedHeap::with_capacity(buffer.capacity());
        for value in buffer.into_values() {
            heap.insert(Some(value), &comparator)?;
        }
        Ok(heap.peek())
    }
}
