use std::collections::HashMap;

/// Maps opaque `u64` handles handed across the C ABI to Rust values.
///
/// Handles start at 1 so that 0 can mean failure on the C side, and are
/// never reused within one store.
pub struct HandleStore<T> {
    next: u64,
    items: HashMap<u64, T>,
}

impl<T> HandleStore<T> {
    pub fn new() -> Self {
        Self {
            next: 1,
            items: HashMap::new(),
        }
    }

    pub fn insert(&mut self, item: T) -> u64 {
        let handle = self.next;
        self.next += 1;
        self.items.insert(handle, item);
        handle
    }

    pub fn get(&self, handle: u64) -> Option<&T> {
        self.items.get(&handle)
    }

    pub fn get_mut(&mut self, handle: u64) -> Option<&mut T> {
        self.items.get_mut(&handle)
    }

    pub fn remove(&mut self, handle: u64) -> Option<T> {
        self.items.remove(&handle)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T> Default for HandleStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_nonzero_and_unique() {
        let mut store = HandleStore::new();
        let a = store.insert("a");
        let b = store.insert("b");
        assert_ne!(a, 0);
        assert_ne!(a, b);
        assert_eq!(store.get(b), Some(&"b"));
    }

    #[test]
    fn test_removed_handle_not_reused() {
        let mut store = HandleStore::new();
        let a = store.insert(1);
        assert_eq!(store.remove(a), Some(1));
        let b = store.insert(2);
        assert_ne!(a, b);
        assert!(store.get(a).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_mut() {
        let mut store = HandleStore::new();
        let h = store.insert(1);
        *store.get_mut(h).unwrap() += 1;
        assert_eq!(store.get(h), Some(&2));
    }
}
