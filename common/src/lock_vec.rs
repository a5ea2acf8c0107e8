use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use itertools::Itertools;

use crate::error::{MedianError, Result};

/// Fixed number of independently locked slots. Writers to different slots never contend; writers to
/// the same slot are serialized.
pub struct LockVec<T> {
    slots: Vec<RwLock<T>>,
}

impl<T: Default> LockVec<T> {
    pub fn new(els: usize) -> LockVec<T> {
        let slots = (0..els).map(|_| RwLock::new(T::default())).collect_vec();
        LockVec { slots }
    }
}

impl<T> LockVec<T> {
    fn slot(&self, idx: usize) -> Result<&RwLock<T>> {
        self.slots.get(idx).ok_or(MedianError::UnknownGroup { ticket: idx, groups: self.slots.len() })
    }

    pub fn read(&self, idx: usize) -> Result<RwLockReadGuard<'_, T>> {
        self.slot(idx)?.read().map_err(|_g| MedianError::Poisoned)
    }

    pub fn write(&self, idx: usize) -> Result<RwLockWriteGuard<'_, T>> {
        self.slot(idx)?.write().map_err(|_g| MedianError::Poisoned)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn into_inner(self) -> Result<Vec<T>> {
        self.slots
            .into_iter()
            .map(|slot| slot.into_inner().map_err(|_g| MedianError::Poisoned))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn unknown_slot() {
        let lv = LockVec::<usize>::new(2);
        assert!(lv.write(1).is_ok());
        assert_eq!(lv.write(2).unwrap_err(), MedianError::UnknownGroup { ticket: 2, groups: 2 });
        assert!(lv.read(5).is_err());
    }

    #[test]
    fn concurrent_writers() {
        let lv = LockVec::<usize>::new(4);
        thread::scope(|s| {
            let lv_ref = &lv;
            for _ in 0..4 {
                s.spawn(move || {
                    for i in 0..1_000 {
                        *lv_ref.write(i % 4).unwrap() += 1;
                    }
                });
            }
        });
        assert_eq!(*lv.read(0).unwrap(), 1_000);
        assert_eq!(lv.into_inner().unwrap(), vec![1_000; 4]);
    }
}
