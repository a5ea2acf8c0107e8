use common::Result;

/// Feeds values into per-group aggregation state addressed by ticket, then finishes every group.
pub trait Updater<V>: Sync + Send {
    type Agg;

    fn groups(&self) -> usize;

    fn update_vec(&self, tickets: &[usize], values: &[V]) -> Result<()>;

    fn into_vec(self) -> Result<Vec<Self::Agg>>;
}
