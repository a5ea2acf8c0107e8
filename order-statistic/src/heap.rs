use common::{Comparator, Datum, MedianError, Operator, Result, TypeOid, Value, ValueBuffer};

/// Binary heap over datums of one type, ordered by an injected comparator. With `<` the root is
/// the smallest value seen so far. Nothing is ever evicted.
///
/// Aggregation only inserts and reads the root. [`BoundedHeap::pop`] exists for callers that need
/// an ordered drain.
#[derive(Debug, Clone, Default)]
pub struct BoundedHeap {
    buffer: ValueBuffer,
}

impl BoundedHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { buffer: ValueBuffer::with_capacity(capacity) }
    }

    pub fn insert(&mut self, value: Option<Value>, comparator: &Comparator) -> Result<()> {
        let Some(value) = value else {
            return Ok(());
        };

        self.buffer.check_type(value.type_oid)?;
        Self::check_comparator(comparator, value.type_oid)?;

        let empty = self.buffer.is_empty();
        self.buffer.append(Some(value))?;
        if !empty {
            self.sift_up(self.buffer.len() - 1, comparator);
        }
        Ok(())
    }

    /// Accepts `<` or a three-way comparator bound to `type_oid`.
    fn check_comparator(comparator: &Comparator, type_oid: TypeOid) -> Result<()> {
        comparator.check_type(type_oid)?;
        match comparator.operator() {
            Operator::Lt | Operator::Cmp => Ok(()),
            _ => Err(MedianError::OperatorNotFound { operator: Operator::Lt, type_oid }),
        }
    }

    fn sift_up(&mut self, mut idx: usize, comparator: &Comparator) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            let data = self.buffer.as_slice();
            if comparator.test(&data[parent], &data[idx]) {
                return;
            }
            self.buffer.swap(parent, idx);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize, comparator: &Comparator) {
        let len = self.buffer.len();
        loop {
            let data = self.buffer.as_slice();
            let (left, right) = (2 * idx + 1, 2 * idx + 2);
            let mut top = idx;
            if left < len && comparator.test(&data[left], &data[top]) {
                top = left;
            }
            if right < len && comparator.test(&data[right], &data[top]) {
                top = right;
            }
            if top == idx {
                return;
            }
            self.buffer.swap(idx, top);
            idx = top;
        }
    }

    pub fn peek(&self) -> Option<Value> {
        let type_oid = self.buffer.type_oid()?;
        self.buffer.at(0).map(|datum| Value::new(type_oid, datum.clone()))
    }

    /// Removes the root and restores the heap below it.
    pub fn pop(&mut self, comparator: &Comparator) -> Result<Option<Value>> {
        let Some(type_oid) = self.buffer.type_oid() else {
            return Ok(None);
        };
        Self::check_comparator(comparator, type_oid)?;
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let last = self.buffer.len() - 1;
        self.buffer.swap(0, last);
        let top = self.buffer.pop();
        if !self.buffer.is_empty() {
            self.sift_down(0, comparator);
        }
        Ok(top.map(|datum| Value::new(type_oid, datum)))
    }

    pub fn into_sorted_values(mut self, comparator: &Comparator) -> Result<Vec<Value>> {
        let mut out = Vec::with_capacity(self.len());
        while let Some(value) = self.pop(comparator)? {
            out.push(value);
        }
        Ok(out)
    }

    /// Gives up heap ordering and hands back the accumulated values.
    pub fn into_buffer(self) -> ValueBuffer {
        self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn type_oid(&self) -> Option<TypeOid> {
        self.buffer.type_oid()
    }

    pub fn as_slice(&self) -> &[Datum] {
        self.buffer.as_slice()
    }

    /// No child is ordered strictly before its parent. Only meaningful for strict comparators.
    pub fn is_heap(&self, comparator: &Comparator) -> bool {
        let data = self.as_slice();
        (1..data.len()).all(|idx| !comparator.test(&data[idx], &data[(idx - 1) / 2]))
    }
}
