//! In-memory persistence store

use parking_lot::RwLock;

use super::StoredRow;
use super::TablePersistence;
use crate::content::Element;
use crate::error::PersistenceError;

/// Store keeping its rows in memory.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tabula_lib::Table;
/// use tabula_lib::persistence::InMemoryTablePersistence;
///
/// let store = Arc::new(InMemoryTablePersistence::<i32>::new());
/// let table: Table<i32> = Table::new();
/// table.persistence().attach(store.clone());
///
/// table.add_row_elements([1, 2]);
/// table.set_element(0, 1, 3);
/// assert_eq!(store.rows(), vec![vec![Some(1), Some(3)]]);
/// ```
#[derive(Debug)]
pub struct InMemoryTablePersistence<E> {
    rows: RwLock<Vec<Vec<Option<E>>>>,
}

impl<E: Element> Default for InMemoryTablePersistence<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Element> InMemoryTablePersistence<E> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Creates a store holding `rows`.
    pub fn with_rows(rows: Vec<Vec<Option<E>>>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Returns a copy of the stored rows.
    pub fn rows(&self) -> Vec<Vec<Option<E>>> {
        self.rows.read().clone()
    }

    /// Returns the number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if no row is stored.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl<E: Element> TablePersistence<E> for InMemoryTablePersistence<E> {
    fn all_elements(&self) -> Result<Vec<StoredRow<E>>, PersistenceError> {
        Ok(self
            .rows
            .read()
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, row)| (Some(index), row))
            .collect())
    }

    fn add(&self, row: usize, elements: &[Option<E>]) -> Result<(), PersistenceError> {
        let mut rows = self.rows.write();
        if row > rows.len() {
            return Err(PersistenceError::row_out_of_range(row, rows.len()));
        }
        rows.insert(row, elements.to_vec());
        Ok(())
    }

    fn update(&self, row: usize, elements: &[Option<E>]) -> Result<(), PersistenceError> {
        let mut rows = self.rows.write();
        let len = rows.len();
        let stored = rows
            .get_mut(row)
            .ok_or_else(|| PersistenceError::row_out_of_range(row, len))?;
        *stored = elements.to_vec();
        Ok(())
    }

    fn remove(&self, row: usize) -> Result<(), PersistenceError> {
        let mut rows = self.rows.write();
        if row >= rows.len() {
            return Err(PersistenceError::row_out_of_range(row, rows.len()));
        }
        rows.remove(row);
        Ok(())
    }

    fn remove_all(&self) -> Result<(), PersistenceError> {
        self.rows.write().clear();
        Ok(())
    }
}
