use common::{Comparator, TypeOid, ValueBuffer};
use order_statistic::BoundedHeap;

/// Per-group accumulator. Starts out empty and is initialized by the first present value.
#[derive(Debug, Clone, Default)]
pub enum AccumulatorState {
    #[default]
    Empty,
    Buffer(ValueBuffer),
    /// The `<` comparator is resolved once, when the first value fixes the type.
    Heap { heap: BoundedHeap, comparator: Comparator },
}

impl AccumulatorState {
    pub fn len(&self) -> usize {
        match self {
            AccumulatorState::Empty => 0,
            AccumulatorState::Buffer(buffer) => buffer.len(),
            AccumulatorState::Heap { heap, .. } => heap.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        match self {
            AccumulatorState::Empty => 0,
            AccumulatorState::Buffer(buffer) => buffer.capacity(),
            AccumulatorState::Heap { heap, .. } => heap.capacity(),
        }
    }

    pub fn type_oid(&self) -> Option<TypeOid> {
        match self {
            AccumulatorState::Empty => None,
            AccumulatorState::Buffer(buffer) => buffer.type_oid(),
            AccumulatorState::Heap { heap, .. } => heap.type_oid(),
        }
    }
}
