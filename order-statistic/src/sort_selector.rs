use tracing::trace;

use common::{Comparator, Datum, MedianError, Operator, Result, ValueBuffer};

use crate::selector::{check_selection, Selector};

/// Sorts the whole buffer in place and reads the requested rank.
#[derive(Debug, Default, Copy, Clone)]
pub struct SortSelector;

impl Selector for SortSelector {
    fn operator(&self) -> Operator {
        Operator::Cmp
    }

    fn select_kth(&self, buffer: &mut ValueBuffer, k: usize, comparator: &Comparator) -> Result<Datum> {
        let type_oid = check_selection(buffer, k, comparator, self.operator())?;
        let cmp = comparator
            .as_three_way()
            .ok_or(MedianError::OperatorNotFound { operator: Operator::Cmp, type_oid })?;

        trace!(len = buffer.len(), k, "sorting buffer");
        // Ties need no stable order; equal elements are interchangeable for selection.
        buffer.as_mut_slice().sort_unstable_by(|a, b| cmp(a, b));
        Ok(buffer.as_slice()[k - 1].clone())
    }
}
