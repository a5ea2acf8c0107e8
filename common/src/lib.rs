mod comparator;
mod datum;
mod error;
mod lock_vec;
mod value_buffer;

pub use comparator::{BuiltinCatalog, Comparator, ComparatorFn, Operator, OperatorCatalog, PredicateFn, ThreeWayFn};
pub use datum::{Datum, TypeOid, Value};
pub use error::{MedianError, Result};
pub use lock_vec::LockVec;
pub use value_buffer::ValueBuffer;
