//! Index of rows under a key computed from the whole row

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::ops::Bound;
use std::ops::RangeBounds;
use std::sync::Arc;
use std::sync::Weak;

use parking_lot::RwLock;

use crate::content::Element;
use crate::content::RemovedStripe;
use crate::content::StripeId;
use crate::content::TableContent;
use crate::error::TableError;
use crate::event::TableEventHandler;
use crate::table::Row;
use crate::table::TableState;

pub(crate) type KeyExtractor<E, K> = Box<dyn Fn(&[Option<E>]) -> Option<K> + Send + Sync>;

struct Entries<K> {
    by_key: BTreeMap<K, BTreeSet<StripeId>>,
    by_row: HashMap<StripeId, K>,
}

impl<K: Ord + Clone> Entries<K> {
    fn put(&mut self, row: StripeId, key: Option<K>) {
        if let Some(previous) = self.by_row.remove(&row) {
            if let Some(rows) = self.by_key.get_mut(&previous) {
                rows.remove(&row);
                if rows.is_empty() {
                    self.by_key.remove(&previous);
                }
            }
        }
        if let Some(key) = key {
            self.by_key.entry(key.clone()).or_default().insert(row);
            self.by_row.insert(row, key);
        }
    }
}

/// Observer side of a [`KeyedIndex`].
pub(crate) struct RowKeyIndex<E, K> {
    table: Weak<RwLock<TableState<E>>>,
    extractor: KeyExtractor<E, K>,
    entries: RwLock<Entries<K>>,
}

impl<E: Element, K: Ord + Clone + Send + Sync + 'static> RowKeyIndex<E, K> {
    pub(crate) fn new(table: Weak<RwLock<TableState<E>>>, extractor: KeyExtractor<E, K>) -> Self {
        Self {
            table,
            extractor,
            entries: RwLock::new(Entries {
                by_key: BTreeMap::new(),
                by_row: HashMap::new(),
            }),
        }
    }

    pub(crate) fn rebuild(&self, content: &TableContent<E>) {
        let mut entries = self.entries.write();
        entries.by_key.clear();
        entries.by_row.clear();
        for (position, row) in content.rows().iter().enumerate() {
            let key = content
                .row_elements(position)
                .and_then(|elements| (self.extractor)(&elements));
            entries.put(row.id(), key);
        }
    }

    pub(crate) fn key_count(&self) -> usize {
        self.entries.read().by_key.len()
    }

    fn update_row(&self, content: &TableContent<E>, row: usize) {
        let (Some(id), Some(elements)) = (content.row_id(row), content.row_elements(row)) else {
            return;
        };
        let key = (self.extractor)(&elements);
        self.entries.write().put(id, key);
    }
}

impl<E: Element, K: Ord + Clone + Send + Sync + 'static> TableEventHandler<E> for RowKeyIndex<E, K> {
    fn on_added_row(&self, content: &TableContent<E>, row: usize) -> Result<(), TableError> {
        self.update_row(content, row);
        Ok(())
    }

    fn on_removed_row(
        &self,
        _content: &TableContent<E>,
        _row: usize,
        removed: &RemovedStripe<E>,
    ) -> Result<(), TableError> {
        self.entries.write().put(removed.id, None);
        Ok(())
    }

    fn on_added_column(&self, content: &TableContent<E>, _column: usize) -> Result<(), TableError> {
        self.rebuild(content);
        Ok(())
    }

    fn on_removed_column(
        &self,
        content: &TableContent<E>,
        _column: usize,
        _removed: &RemovedStripe<E>,
    ) -> Result<(), TableError> {
        self.rebuild(content);
        Ok(())
    }

    fn on_updated_cell(
        &self,
        content: &TableContent<E>,
        row: usize,
        _column: usize,
        _previous: Option<&E>,
    ) -> Result<(), TableError> {
        self.update_row(content, row);
        Ok(())
    }

    fn on_cleared(&self, content: &TableContent<E>) -> Result<(), TableError> {
        self.rebuild(content);
        Ok(())
    }

    fn on_reordered(&self, content: &TableContent<E>) -> Result<(), TableError> {
        self.rebuild(content);
        Ok(())
    }

    fn on_transposed(&self, content: &TableContent<E>) -> Result<(), TableError> {
        self.rebuild(content);
        Ok(())
    }
}

/// Sorted map from a key computed per row to the rows producing it.
///
/// Rows for which the extractor returns `None` are not indexed.
///
/// # Example
///
/// ```
/// use tabula_lib::Table;
///
/// let table: Table<i32> = Table::from_rows([[1, 2], [3, 4], [5, 6]]);
/// let by_sum = table.index().keyed("sum", |row: &[Option<i32>]| {
///     Some(row.iter().flatten().sum::<i32>())
/// });
///
/// assert_eq!(by_sum.keys(), vec![3, 7, 11]);
/// assert_eq!(by_sum.tail(&7).len(), 2);
/// ```
pub struct KeyedIndex<E, K> {
    inner: Arc<RowKeyIndex<E, K>>,
}

impl<E, K> Clone for KeyedIndex<E, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Element, K: Ord + Clone + Send + Sync + 'static> KeyedIndex<E, K> {
    pub(crate) fn from_inner(inner: Arc<RowKeyIndex<E, K>>) -> Self {
        Self { inner }
    }

    /// Returns true if both values are the same index.
    pub fn ptr_eq(&self, other: &KeyedIndex<E, K>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns true if some row produces `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.entries.read().by_key.contains_key(key)
    }

    /// Returns the rows producing `key`, empty if there are none.
    pub fn get(&self, key: &K) -> Vec<Row<E>> {
        let rows: Vec<StripeId> = match self.inner.entries.read().by_key.get(key) {
            Some(rows) => rows.iter().copied().collect(),
            None => return Vec::new(),
        };
        self.rows(rows)
    }

    /// Returns all keys in ascending order.
    pub fn keys(&self) -> Vec<K> {
        self.inner.entries.read().by_key.keys().cloned().collect()
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.inner.entries.read().by_key.len()
    }

    /// Returns true if no row is indexed.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().by_key.is_empty()
    }

    /// Returns the smallest key.
    pub fn first_key(&self) -> Option<K> {
        self.inner.entries.read().by_key.keys().next().cloned()
    }

    /// Returns the largest key.
    pub fn last_key(&self) -> Option<K> {
        self.inner.entries.read().by_key.keys().next_back().cloned()
    }

    /// Returns the keys within `range` with their rows.
    pub fn range<R: RangeBounds<K>>(&self, range: R) -> Vec<(K, Vec<Row<E>>)> {
        let groups: Vec<(K, Vec<StripeId>)> = self
            .inner
            .entries
            .read()
            .by_key
            .range(range)
            .map(|(key, rows)| (key.clone(), rows.iter().copied().collect()))
            .collect();
        groups
            .into_iter()
            .map(|(key, rows)| (key, self.rows(rows)))
            .collect()
    }

    /// Returns the keys strictly below `key` with their rows.
    pub fn head(&self, key: &K) -> Vec<(K, Vec<Row<E>>)> {
        self.range((Bound::Unbounded, Bound::Excluded(key.clone())))
    }

    /// Returns the keys at or above `key` with their rows.
    pub fn tail(&self, key: &K) -> Vec<(K, Vec<Row<E>>)> {
        self.range((Bound::Included(key.clone()), Bound::Unbounded))
    }

    fn rows(&self, ids: Vec<StripeId>) -> Vec<Row<E>> {
        let Some(table) = self.inner.table.upgrade() else {
            return Vec::new();
        };
        let state = table.read();
        ids.into_iter()
            .filter_map(|id| {
                let position = state.content().row_position(id)?;
                Row::at(&table, state.content(), position)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::Table;

    fn first_two(row: &[Option<String>]) -> Option<String> {
        Some(format!("{}|{}", row.first()?.as_deref()?, row.get(1)?.as_deref()?))
    }

    #[test]
    fn test_keyed_index_follows_updates() {
        let table: Table<String> =
            Table::from_rows((0..5).map(|row| (0..3).map(move |column| format!("{row}:{column}"))));
        let index = table.index().keyed("pair", first_two);
        assert!(index.contains_key(&"1:0|1:1".to_string()));

        table.set_element(1, 1, "x".to_string());
        assert!(!index.contains_key(&"1:0|1:1".to_string()));
        assert_eq!(index.get(&"1:0|x".to_string())[0].index(), Some(1));

        table.remove_row(0);
        assert_eq!(index.len(), 4);
        assert_eq!(index.get(&"1:0|x".to_string())[0].index(), Some(0));
    }

    #[test]
    fn test_keyed_index_reused_by_name() {
        let table: Table<String> = Table::from_rows([["a".to_string(), "b".to_string()]]);
        let first = table.index().keyed("pair", first_two);
        let second = table.index().keyed("pair", |_: &[Option<String>]| None::<String>);
        assert!(first.ptr_eq(&second));
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_head_and_tail() {
        let table: Table<i32> = Table::from_rows((0..6).map(|row| [row]));
        let index = table.index().keyed("value", |row: &[Option<i32>]| row.first().copied().flatten());
        assert_eq!(index.head(&2).len(), 2);
        assert_eq!(index.tail(&2).len(), 4);

        table.remove_row(5);
        assert_eq!(index.last_key(), Some(4));
    }
}
