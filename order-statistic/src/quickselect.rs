use std::cmp::Ordering;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use common::{Comparator, Datum, MedianError, Operator, PredicateFn, Result, ValueBuffer};

use crate::selector::{check_selection, Selector};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum PivotStrategy {
    /// Last element of the range. Quadratic on sorted input.
    #[default]
    Last,
    /// Uniformly chosen element, swapped into the last slot before partitioning.
    Random { seed: u64 },
}

/// Lomuto partition selection over a `<=` comparator. Runs iteratively, so adversarial input costs
/// time but never stack.
#[derive(Debug, Default, Copy, Clone)]
pub struct Quickselect {
    pivot: PivotStrategy,
}

impl Quickselect {
    pub fn new(pivot: PivotStrategy) -> Self {
        Self { pivot }
    }

    pub fn pivot(&self) -> PivotStrategy {
        self.pivot
    }
}

/// Partitions around the last element and returns its resting index. Elements for which
/// `le(element, pivot)` holds end up in front of it.
fn partition(data: &mut [Datum], le: &PredicateFn) -> usize {
    let right = data.len() - 1;
    let mut store = 0;
    for idx in 0..right {
        if le(&data[idx], &data[right]) {
            data.swap(store, idx);
            store += 1;
        }
    }
    data.swap(store, right);
    store
}

impl Selector for Quickselect {
    fn operator(&self) -> Operator {
        Operator::Le
    }

    fn select_kth(&self, buffer: &mut ValueBuffer, k: usize, comparator: &Comparator) -> Result<Datum> {
        let type_oid = check_selection(buffer, k, comparator, self.operator())?;
        let le = comparator
            .as_predicate()
            .ok_or(MedianError::OperatorNotFound { operator: Operator::Le, type_oid })?;

        let mut rng = match self.pivot {
            PivotStrategy::Last => None,
            PivotStrategy::Random { seed } => Some(SmallRng::seed_from_u64(seed)),
        };

        let data = buffer.as_mut_slice();
        let mut left = 0;
        let mut right = data.len() - 1;
        let mut k = k;
        let mut rounds = 0usize;

        // Invariant: 1 <= k <= right - left + 1.
        loop {
            rounds += 1;
            if let Some(rng) = rng.as_mut() {
                let pivot = rng.gen_range(left..=right);
                data.swap(pivot, right);
            }

            let idx = left + partition(&mut data[left..=right], le);
            let rank = idx - left + 1;
            match rank.cmp(&k) {
                Ordering::Equal => {
                    trace!(rounds, "quickselect converged");
                    return Ok(data[idx].clone());
                }
                Ordering::Greater => right = idx - 1,
                Ordering::Less => {
                    k -= rank;
                    left = idx + 1;
                }
            }
        }
    }
}
