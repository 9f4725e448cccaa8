//! Fixed-capacity entity storage
//!
//! Every entity kind lives in an inline array with a live count; nothing is
//! heap allocated after start-up. Removal is O(1) swap-remove: the last live
//! element moves into the freed slot, so array order is not stable.

use std::ops::{Index, IndexMut};

use serde::{Serialize, Serializer};

/// Result of a successful [`FixedStore::swap_remove`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Removed<T> {
    pub item: T,
    /// An element that sat past the removed index now occupies it. Forward
    /// loops must revisit the same index instead of advancing.
    pub swapped: bool,
}

/// Inline array of at most `N` live elements
#[derive(Debug, Clone)]
pub struct FixedStore<T, const N: usize> {
    items: [T; N],
    len: usize,
}

impl<T: Copy + Default, const N: usize> Default for FixedStore<T, N> {
    fn default() -> Self {
        Self {
            items: [T::default(); N],
            len: 0,
        }
    }
}

impl<T: Copy + Default, const N: usize> FixedStore<T, N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Append an element, handing it back when the store is full
    pub fn push(&mut self, item: T) -> Result<usize, T> {
        if self.is_full() {
            return Err(item);
        }
        let index = self.len;
        self.items[index] = item;
        self.len += 1;
        Ok(index)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.as_mut_slice().get_mut(index)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items[..self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Remove the element at `index` by moving the last live element into
    /// its slot. Out-of-range indices are ignored.
    pub fn swap_remove(&mut self, index: usize) -> Option<Removed<T>> {
        if index >= self.len {
            return None;
        }
        let item = self.items[index];
        let last = self.len - 1;
        let swapped = index != last;
        if swapped {
            self.items[index] = self.items[last];
        }
        self.items[last] = T::default();
        self.len = last;
        Some(Removed { item, swapped })
    }

    /// Swap-remove every element `keep` rejects. Returns how many were removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while i < self.len {
            if keep(&self.items[i]) {
                i += 1;
            } else {
                self.swap_remove(i);
                removed += 1;
            }
        }
        removed
    }

    pub fn clear(&mut self) {
        self.items = [T::default(); N];
        self.len = 0;
    }
}

impl<T: Copy + Default, const N: usize> Index<usize> for FixedStore<T, N> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.as_slice()[index]
    }
}

impl<T: Copy + Default, const N: usize> IndexMut<usize> for FixedStore<T, N> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.as_mut_slice()[index]
    }
}

impl<'a, T: Copy + Default, const N: usize> IntoIterator for &'a FixedStore<T, N> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// Only live elements are serialized.
impl<T: Copy + Default + Serialize, const N: usize> Serialize for FixedStore<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_until_full() {
        let mut store: FixedStore<u32, 3> = FixedStore::new();
        assert_eq!(store.push(1), Ok(0));
        assert_eq!(store.push(2), Ok(1));
        assert_eq!(store.push(3), Ok(2));
        assert!(store.is_full());
        assert_eq!(store.push(4), Err(4));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_swap_remove_moves_last_into_hole() {
        let mut store: FixedStore<u32, 4> = FixedStore::new();
        for v in [10, 20, 30, 40] {
            store.push(v).unwrap();
        }
        let removed = store.swap_remove(1).unwrap();
        assert_eq!(removed.item, 20);
        assert!(removed.swapped);
        assert_eq!(store.as_slice(), &[10, 40, 30]);

        let removed = store.swap_remove(2).unwrap();
        assert_eq!(removed.item, 30);
        assert!(!removed.swapped);
        assert_eq!(store.as_slice(), &[10, 40]);
    }

    #[test]
    fn test_swap_remove_out_of_range_is_noop() {
        let mut store: FixedStore<u32, 4> = FixedStore::new();
        store.push(1).unwrap();
        assert!(store.swap_remove(1).is_none());
        assert!(store.swap_remove(7).is_none());
        assert_eq!(store.as_slice(), &[1]);
    }

    #[test]
    fn test_retain_revisits_swapped_slot() {
        let mut store: FixedStore<u32, 8> = FixedStore::new();
        for v in [1, 2, 2, 3, 2, 2] {
            store.push(v).unwrap();
        }
        let removed = store.retain(|v| *v != 2);
        assert_eq!(removed, 4);
        let mut rest = store.as_slice().to_vec();
        rest.sort_unstable();
        assert_eq!(rest, vec![1, 3]);
    }

    #[test]
    fn test_serializes_live_elements_only() {
        let mut store: FixedStore<u32, 8> = FixedStore::new();
        store.push(5).unwrap();
        store.push(6).unwrap();
        assert_eq!(serde_json::to_string(&store).unwrap(), "[5,6]");
    }

    proptest! {
        #[test]
        fn test_swap_remove_keeps_multiset(
            values in proptest::collection::vec(0u32..1000, 1..16),
            pick in 0usize..16,
        ) {
            let mut store: FixedStore<u32, 16> = FixedStore::new();
            for v in &values {
                store.push(*v).unwrap();
            }
            let index = pick % values.len();
            let removed = store.swap_remove(index).unwrap();

            prop_assert_eq!(store.len(), values.len() - 1);
            prop_assert_eq!(removed.item, values[index]);
            prop_assert_eq!(removed.swapped, index != values.len() - 1);

            let mut expected = values.clone();
            expected.remove(index);
            expected.sort_unstable();
            let mut actual = store.as_slice().to_vec();
            actual.sort_unstable();
            prop_assert_eq!(actual, expected);
        }
    }
}
