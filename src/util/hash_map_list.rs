use std::{collections::HashMap, hash::Hash};

/// Simple wrapper to make functionality easier for interfacing with `HashMap<K, Vec<V>>`. Handles
/// initialising a new [Vec] when a value is inserted under a new key, and dropping the [Vec] once
/// its last value is removed.
pub struct HashMapList<K, V>(HashMap<K, Vec<V>>);

impl<K, V> HashMapList<K, V>
where
    K: Eq + Hash,
{
    /// Creates an empty [HashMapList].
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Retrieves a list of values by key. Will return an empty slice if there are no items that
    /// match the provided key.
    pub fn get<Q>(&self, k: &Q) -> &[V]
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.0.get(k).map(|v| v.as_slice()).unwrap_or_default()
    }

    /// Inserts a value with a given key into the collection, after any existing values.
    pub fn insert(&mut self, k: K, v: V) {
        self.0.entry(k).or_default().push(v);
    }

    /// Removes the first value (under any key) matching `predicate`, returning it.
    pub fn remove_first<F>(&mut self, mut predicate: F) -> Option<V>
    where
        F: FnMut(&V) -> bool,
        K: Clone,
    {
        let (key, index) = self.0.iter().find_map(|(key, values)| {
            values
                .iter()
                .position(&mut predicate)
                .map(|index| (key.clone(), index))
        })?;

        let values = self.0.get_mut(&key)?;
        let value = values.remove(index);

        if values.is_empty() {
            self.0.remove(&key);
        }

        Some(value)
    }
}

impl<K, V> Default for HashMapList<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn values_accumulate_per_key() {
        let mut list = HashMapList::new();
        list.insert("a", 1);
        list.insert("a", 2);
        list.insert("b", 3);

        assert_eq!(list.get("a"), &[1, 2]);
        assert_eq!(list.get("c"), &[] as &[i32]);
    }

    #[test]
    fn removing_last_value_drops_key() {
        let mut list = HashMapList::new();
        list.insert("a", 1);

        assert_eq!(list.remove_first(|v| *v == 1), Some(1));
        assert_eq!(list.remove_first(|v| *v == 1), None);
        assert_eq!(list.get("a"), &[] as &[i32]);
    }
}
