use tracing::{debug, warn};

use crate::datum::{Datum, TypeOid, Value};
use crate::error::{MedianError, Result};

/// Append-only store of datums sharing one type identity. Capacity starts small and doubles when
/// full; it never shrinks.
#[derive(Debug, Clone)]
pub struct ValueBuffer {
    type_oid: Option<TypeOid>,
    capacity: usize,
    data: Vec<Datum>,
}

impl Default for ValueBuffer {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl ValueBuffer {
    pub const DEFAULT_CAPACITY: usize = 8;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            type_oid: None,
            capacity,
            data: Vec::with_capacity(capacity),
        }
    }

    /// Captures the type from the first value; later values must match it. Missing values are
    /// ignored. A rejected value leaves the buffer untouched.
    pub fn append(&mut self, value: Option<Value>) -> Result<()> {
        let Some(Value { type_oid, datum }) = value else {
            return Ok(());
        };

        self.check_type(type_oid)?;

        if self.data.len() == self.capacity {
            self.grow();
        }
        self.type_oid = Some(type_oid);
        self.data.push(datum);
        Ok(())
    }

    pub fn check_type(&self, type_oid: TypeOid) -> Result<()> {
        match self.type_oid {
            Some(expected) if expected != type_oid => {
                warn!(%expected, found = %type_oid, "rejecting value of a different type");
                Err(MedianError::TypeMismatch { expected, found: type_oid })
            }
            _ => Ok(()),
        }
    }

    fn grow(&mut self) {
        let capacity = self.capacity * 2;
        debug!(from = self.capacity, to = capacity, "growing value buffer");
        self.data.reserve_exact(capacity - self.data.len());
        self.capacity = capacity;
    }

    pub fn type_oid(&self) -> Option<TypeOid> {
        self.type_oid
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn at(&self, idx: usize) -> Option<&Datum> {
        self.data.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Datum> {
        self.data.iter()
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        self.data.swap(a, b);
    }

    /// Removes the last datum. The captured type identity is kept even when this empties the buffer.
    pub fn pop(&mut self) -> Option<Datum> {
        self.data.pop()
    }

    pub fn as_slice(&self) -> &[Datum] {
        &self.data[..]
    }

    pub fn as_mut_slice(&mut self) -> &mut [Datum] {
        &mut self.data[..]
    }

    /// Re-tags every datum with the captured type.
    pub fn into_values(self) -> Vec<Value> {
        let Some(type_oid) = self.type_oid else {
            return Vec::new();
        };
        self.data.into_iter().map(|datum| Value::new(type_oid, datum)).collect()
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    #[test]
    fn missing_values_are_ignored() {
        let mut buffer = ValueBuffer::new();
        buffer.append(None).unwrap();
        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer.type_oid(), None);

        buffer.append(Some(Value::int4(1))).unwrap();
        buffer.append(None).unwrap();
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.type_oid(), Some(TypeOid::INT4));
    }

    #[test]
    fn grow_preserves_order() {
        let mut buffer = ValueBuffer::new();
        let cap = buffer.capacity();
        assert_eq!(cap, ValueBuffer::DEFAULT_CAPACITY);

        let mut rng = fastrand::Rng::with_seed(7);
        let inputs = (0..(2 * cap + 1)).map(|_| rng.i64(-1_000..1_000)).collect_vec();
        for (idx, v) in inputs.iter().enumerate() {
            buffer.append(Some(Value::int8(*v))).unwrap();
            assert_eq!(buffer.len(), idx + 1);
        }

        assert_eq!(buffer.capacity(), 4 * cap);
        let stored = buffer.iter().map(|d| d.as_int().unwrap()).collect_vec();
        assert_eq!(stored, inputs);
    }

    #[test]
    fn doubles_only_when_full() {
        let mut buffer = ValueBuffer::with_capacity(2);
        buffer.append(Some(Value::int4(1))).unwrap();
        buffer.append(Some(Value::int4(2))).unwrap();
        assert_eq!(buffer.capacity(), 2);
        buffer.append(Some(Value::int4(3))).unwrap();
        assert_eq!(buffer.capacity(), 4);
    }

    #[test]
    fn mismatch_does_not_mutate() {
        let mut buffer = ValueBuffer::with_capacity(1);
        buffer.append(Some(Value::int4(5))).unwrap();

        let err = buffer.append(Some(Value::text("five"))).unwrap_err();
        assert_eq!(err, MedianError::TypeMismatch { expected: TypeOid::INT4, found: TypeOid::TEXT });
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.at(0).and_then(Datum::as_int), Some(5));
    }

    #[test]
    fn into_values_retags() {
        let mut buffer = ValueBuffer::new();
        buffer.append(Some(Value::float8(1.5))).unwrap();
        let values = buffer.into_values();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].type_oid, TypeOid::FLOAT8);
        assert_eq!(ValueBuffer::new().into_values().len(), 0);
    }
}
