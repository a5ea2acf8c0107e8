mod driver;
mod locking_median;
mod state;
mod strategy;
mod updater;

pub use driver::MedianAggregate;
pub use locking_median::{GlobalLockingMedianUpdater, MedianUpdater};
pub use state::AccumulatorState;
pub use strategy::Strategy;
pub use updater::Updater;
