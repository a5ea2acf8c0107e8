use common::{Comparator, Datum, MedianError, Operator, Result, TypeOid, ValueBuffer};

pub trait Selector: Sync + Send {
    /// Operator that has to be resolved for the buffer's type before selecting.
    fn operator(&self) -> Operator;

    /// Returns the element that would sit at 1-based rank `k` if the buffer were sorted. The buffer
    /// may be reordered.
    fn select_kth(&self, buffer: &mut ValueBuffer, k: usize, comparator: &Comparator) -> Result<Datum>;

    fn select_median(&self, buffer: &mut ValueBuffer, comparator: &Comparator) -> Result<Datum> {
        self.select_kth(buffer, median_rank(buffer.len()), comparator)
    }
}

/// Upper median: for even lengths this is the element just past the midpoint.
pub fn median_rank(len: usize) -> usize {
    len / 2 + 1
}

/// Shared preconditions for buffer selectors. The comparator must be bound to the buffer's type and
/// be the operator the selector asked for.
pub(crate) fn check_selection(
    buffer: &ValueBuffer,
    k: usize,
    comparator: &Comparator,
    operator: Operator,
) -> Result<TypeOid> {
    let type_oid = buffer.type_oid().ok_or(MedianError::NoType)?;
    comparator.check_type(type_oid)?;
    if comparator.operator() != operator {
        return Err(MedianError::OperatorNotFound { operator, type_oid });
    }
    if k == 0 || k > buffer.len() {
        return Err(MedianError::OutOfRange { k, len: buffer.len() });
    }
    Ok(type_oid)
}
