//! Sorted index of one column

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
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
use crate::table::Cell;
use crate::table::TableState;

#[derive(Debug)]
struct Entries<E> {
    by_key: BTreeMap<E, BTreeSet<StripeId>>,
    by_row: HashMap<StripeId, E>,
}

impl<E: Ord + Clone> Entries<E> {
    fn new() -> Self {
        Self {
            by_key: BTreeMap::new(),
            by_row: HashMap::new(),
        }
    }

    fn insert(&mut self, row: StripeId, key: E) {
        self.remove(row);
        self.by_key.entry(key.clone()).or_default().insert(row);
        self.by_row.insert(row, key);
    }

    fn remove(&mut self, row: StripeId) {
        let Some(key) = self.by_row.remove(&row) else {
            return;
        };
        if let Some(rows) = self.by_key.get_mut(&key) {
            rows.remove(&row);
            if rows.is_empty() {
                self.by_key.remove(&key);
            }
        }
    }

    fn clear(&mut self) {
        self.by_key.clear();
        self.by_row.clear();
    }
}

/// Observer side of a [`TableIndex`].
pub(crate) struct ColumnIndex<E> {
    column: StripeId,
    table: Weak<RwLock<TableState<E>>>,
    entries: RwLock<Entries<E>>,
}

impl<E: Element + Ord> ColumnIndex<E> {
    pub(crate) fn new(column: StripeId, table: Weak<RwLock<TableState<E>>>) -> Self {
        Self {
            column,
            table,
            entries: RwLock::new(Entries::new()),
        }
    }

    pub(crate) fn rebuild(&self, content: &TableContent<E>) {
        let mut entries = self.entries.write();
        entries.clear();
        if content.column_position(self.column).is_none() {
            return;
        }
        for row in content.rows().iter() {
            if let Some(element) = content.element_by_id(row.id(), self.column) {
                entries.insert(row.id(), element.clone());
            }
        }
    }

    pub(crate) fn key_count(&self) -> usize {
        self.entries.read().by_key.len()
    }

    fn update_row(&self, content: &TableContent<E>, row: usize) {
        let Some(row) = content.row_id(row) else {
            return;
        };
        let mut entries = self.entries.write();
        match content.element_by_id(row, self.column) {
            Some(element) if content.column_position(self.column).is_some() => {
                entries.insert(row, element.clone());
            }
            _ => entries.remove(row),
        }
    }
}

impl<E: Element + Ord> TableEventHandler<E> for ColumnIndex<E> {
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
        self.entries.write().remove(removed.id);
        Ok(())
    }

    fn on_removed_column(
        &self,
        _content: &TableContent<E>,
        _column: usize,
        removed: &RemovedStripe<E>,
    ) -> Result<(), TableError> {
        if removed.id == self.column {
            log::debug!("[index] indexed column {} was removed", self.column);
            self.entries.write().clear();
        }
        Ok(())
    }

    fn on_updated_cell(
        &self,
        content: &TableContent<E>,
        row: usize,
        column: usize,
        _previous: Option<&E>,
    ) -> Result<(), TableError> {
        if content.column_id(column) == Some(self.column) {
            self.update_row(content, row);
        }
        Ok(())
    }

    fn on_cleared(&self, _content: &TableContent<E>) -> Result<(), TableError> {
        self.entries.write().clear();
        Ok(())
    }

    fn on_transposed(&self, content: &TableContent<E>) -> Result<(), TableError> {
        self.rebuild(content);
        Ok(())
    }
}

/// Sorted map from the elements of one column to the cells holding them.
///
/// Null cells are not indexed. Lookups of absent keys return empty results.
/// Cells sharing a key are returned in row creation order.
///
/// # Example
///
/// ```
/// use tabula_lib::Table;
///
/// let table: Table<i32> = Table::from_rows([[1, 10], [2, 20], [3, 10]]);
/// let index = table.index().of(1).unwrap();
///
/// assert_eq!(index.get(&10).len(), 2);
/// assert!(index.get(&99).is_empty());
///
/// table.set_element(0, 1, 30);
/// assert_eq!(index.keys(), vec![10, 20, 30]);
/// ```
pub struct TableIndex<E> {
    inner: Arc<ColumnIndex<E>>,
}

impl<E> Clone for TableIndex<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> std::fmt::Debug for TableIndex<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TableIndex(column {})", self.inner.column)
    }
}

impl<E: Element + Ord> TableIndex<E> {
    pub(crate) fn from_inner(inner: Arc<ColumnIndex<E>>) -> Self {
        Self { inner }
    }

    /// Returns true if both values are the same index.
    pub fn ptr_eq(&self, other: &TableIndex<E>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns the live position of the indexed column, `None` once removed.
    pub fn column_index(&self) -> Option<usize> {
        let table = self.inner.table.upgrade()?;
        let state = table.read();
        state.content().column_position(self.inner.column)
    }

    /// Returns true if some cell of the column holds `key`.
    pub fn contains_key(&self, key: &E) -> bool {
        self.inner.entries.read().by_key.contains_key(key)
    }

    /// Returns the cells holding `key`, empty if there are none.
    pub fn get(&self, key: &E) -> Vec<Cell<E>> {
        let rows: Vec<StripeId> = match self.inner.entries.read().by_key.get(key) {
            Some(rows) => rows.iter().copied().collect(),
            None => return Vec::new(),
        };
        self.cells(rows)
    }

    /// Returns all keys in ascending order.
    pub fn keys(&self) -> Vec<E> {
        self.inner.entries.read().by_key.keys().cloned().collect()
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.inner.entries.read().by_key.len()
    }

    /// Returns true if no cell is indexed.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().by_key.is_empty()
    }

    /// Returns the smallest key.
    pub fn first_key(&self) -> Option<E> {
        self.inner.entries.read().by_key.keys().next().cloned()
    }

    /// Returns the largest key.
    pub fn last_key(&self) -> Option<E> {
        self.inner.entries.read().by_key.keys().next_back().cloned()
    }

    /// Returns the keys within `range` with their cells, in ascending order.
    pub fn range<R: RangeBounds<E>>(&self, range: R) -> Vec<(E, Vec<Cell<E>>)> {
        let groups: Vec<(E, Vec<StripeId>)> = self
            .inner
            .entries
            .read()
            .by_key
            .range(range)
            .map(|(key, rows)| (key.clone(), rows.iter().copied().collect()))
            .collect();
        groups
            .into_iter()
            .map(|(key, rows)| (key, self.cells(rows)))
            .collect()
    }

    fn cells(&self, rows: Vec<StripeId>) -> Vec<Cell<E>> {
        let Some(table) = self.inner.table.upgrade() else {
            return Vec::new();
        };
        rows.into_iter()
            .map(|row| Cell::new(Arc::clone(&table), row, self.inner.column))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::Table;

    fn filled(rows: usize, columns: usize) -> Table<String> {
        Table::from_rows((0..rows).map(|row| (0..columns).map(move |column| format!("{row}:{column}"))))
    }

    #[test]
    fn test_index_is_reused() {
        let table = filled(10, 3);
        let first = table.index().of(1).unwrap();
        let second = table.index().of(1).unwrap();
        let other = table.index().of(2).unwrap();
        assert!(first.ptr_eq(&second));
        assert!(!first.ptr_eq(&other));
        assert_eq!(table.index().len(), 2);
        assert!(table.index().of(3).is_none());
    }

    #[test]
    fn test_index_follows_row_changes() {
        let table = filled(5, 2);
        let index = table.index().of(0).unwrap();
        table.remove_row(2);
        assert!(!index.contains_key(&"2:0".to_string()));
        assert_eq!(index.len(), 4);

        table.insert_row_elements(0, ["new".to_string()]);
        let cells = index.get(&"new".to_string());
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].row_index(), Some(0));
    }

    #[test]
    fn test_index_ignores_other_columns_and_nulls() {
        let table = filled(3, 2);
        let index = table.index().of(1).unwrap();
        table.set_element(0, 0, "x".to_string());
        assert!(!index.contains_key(&"x".to_string()));

        table.remove_element(0, 1);
        assert!(!index.contains_key(&"0:1".to_string()));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_removing_indexed_column_empties_index() {
        let table = filled(3, 3);
        let index = table.index().of(1).unwrap();
        table.remove_column(0);
        assert_eq!(index.column_index(), Some(0));
        assert_eq!(index.len(), 3);

        table.remove_column(0);
        assert!(index.is_empty());
        assert_eq!(index.column_index(), None);
        table.add_row_elements(["a".to_string(), "b".to_string()]);
        assert!(index.is_empty());
    }

    #[test]
    fn test_range_and_bounds() {
        let table: Table<i32> = Table::from_rows((0..10).map(|row| [row * 10]));
        let index = table.index().of(0).unwrap();
        assert_eq!(index.first_key(), Some(0));
        assert_eq!(index.last_key(), Some(90));
        let keys: Vec<i32> = index.range(20..50).into_iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec![20, 30, 40]);
    }
}
