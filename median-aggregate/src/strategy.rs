use common::Operator;
use order_statistic::{PivotStrategy, Quickselect, Selector, SortSelector};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Insert-only heap; finishing reports the heap's top, not the middle element.
    Heap,
    Sort,
    Quickselect(PivotStrategy),
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Quickselect(PivotStrategy::Last)
    }
}

impl Strategy {
    pub fn operator(&self) -> Operator {
        match self {
            Strategy::Heap => Operator::Lt,
            Strategy::Sort => Operator::Cmp,
            Strategy::Quickselect(_) => Operator::Le,
        }
    }

    /// Buffer selector for this strategy; `None` for the heap.
    pub fn selector(&self) -> Option<Box<dyn Selector>> {
        match self {
            Strategy::Heap => None,
            Strategy::Sort => Some(Box::new(SortSelector)),
            Strategy::Quickselect(pivot) => Some(Box::new(Quickselect::new(*pivot))),
        }
    }
}
