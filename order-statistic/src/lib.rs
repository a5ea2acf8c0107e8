mod heap;
mod quickselect;
mod selector;
mod sort_selector;

pub use heap::BoundedHeap;
pub use quickselect::{PivotStrategy, Quickselect};
pub use selector::{median_rank, Selector};
pub use sort_selector::SortSelector;
