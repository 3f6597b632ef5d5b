//! Persistence stores attached to tables
//!
//! A store mirrors the rows of a table. Once attached it receives every row
//! change through [`PersistenceRegistration`], which maps table events onto
//! the row-oriented [`TablePersistence`] operations.

mod file;
mod memory;

pub use file::*;
pub use memory::*;

use std::collections::HashSet;
use std::sync::Arc;

use crate::content::Element;
use crate::content::RemovedStripe;
use crate::content::TableContent;
use crate::error::PersistenceError;
use crate::error::TableError;
use crate::event::TableEventHandler;
use crate::table::Table;

/// Row elements as stored: the row index when known, and the elements.
pub type StoredRow<E> = (Option<usize>, Vec<Option<E>>);

/// Row-oriented store mirroring one table.
pub trait TablePersistence<E>: Send + Sync {
    /// Returns every stored row. A row with an index is inserted at that
    /// position when a table is hydrated; a row without one is appended.
    fn all_elements(&self) -> Result<Vec<StoredRow<E>>, PersistenceError>;

    /// Inserts a row at `row`; later rows shift down by one.
    fn add(&self, row: usize, elements: &[Option<E>]) -> Result<(), PersistenceError>;

    /// Replaces the row at `row`.
    fn update(&self, row: usize, elements: &[Option<E>]) -> Result<(), PersistenceError>;

    /// Removes the row at `row`; later rows shift up by one.
    fn remove(&self, row: usize) -> Result<(), PersistenceError>;

    /// Removes every row.
    fn remove_all(&self) -> Result<(), PersistenceError>;
}

/// Forwards table events to a store.
pub struct PersistenceRegistration<E> {
    store: Arc<dyn TablePersistence<E>>,
}

impl<E: Element> PersistenceRegistration<E> {
    fn row(content: &TableContent<E>, row: usize) -> Vec<Option<E>> {
        content.row_elements(row).unwrap_or_default()
    }

    fn update_all(&self, content: &TableContent<E>) -> Result<(), TableError> {
        for row in 0..content.row_count() {
            self.store.update(row, &Self::row(content, row))?;
        }
        Ok(())
    }
}

impl<E: Element> TableEventHandler<E> for PersistenceRegistration<E> {
    fn on_added_row(&self, content: &TableContent<E>, row: usize) -> Result<(), TableError> {
        self.store.add(row, &Self::row(content, row))?;
        Ok(())
    }

    fn on_removed_row(
        &self,
        _content: &TableContent<E>,
        row: usize,
        _removed: &RemovedStripe<E>,
    ) -> Result<(), TableError> {
        self.store.remove(row)?;
        Ok(())
    }

    fn on_added_column(&self, content: &TableContent<E>, _column: usize) -> Result<(), TableError> {
        self.update_all(content)
    }

    fn on_removed_column(
        &self,
        content: &TableContent<E>,
        _column: usize,
        _removed: &RemovedStripe<E>,
    ) -> Result<(), TableError> {
        self.update_all(content)
    }

    fn on_updated_cell(
        &self,
        content: &TableContent<E>,
        row: usize,
        _column: usize,
        _previous: Option<&E>,
    ) -> Result<(), TableError> {
        self.store.update(row, &Self::row(content, row))?;
        Ok(())
    }

    fn on_cleared(&self, _content: &TableContent<E>) -> Result<(), TableError> {
        self.store.remove_all()?;
        Ok(())
    }

    fn on_reordered(&self, content: &TableContent<E>) -> Result<(), TableError> {
        self.update_all(content)
    }

    fn on_transposed(&self, content: &TableContent<E>) -> Result<(), TableError> {
        self.store.remove_all()?;
        for row in 0..content.row_count() {
            self.store.add(row, &Self::row(content, row))?;
        }
        Ok(())
    }
}

/// Attaches and detaches the persistence stores of one table.
pub struct PersistenceManager<'a, E> {
    table: &'a Table<E>,
}

impl<E: Element> Table<E> {
    /// Returns the persistence manager of this table.
    pub fn persistence(&self) -> PersistenceManager<'_, E> {
        PersistenceManager { table: self }
    }
}

impl<E: Element> PersistenceManager<'_, E> {
    /// Attaches `store` under the write lock.
    ///
    /// The stored rows are loaded into the table first. Every table row that
    /// did not come from the store is then added to it, so table and store
    /// hold the same rows in the same order. From then on the store follows
    /// every mutation.
    pub fn attach(&self, store: Arc<dyn TablePersistence<E>>) {
        let mut state = self.table.shared().write();
        let stored = match store.all_elements() {
            Ok(rows) => rows,
            Err(error) => {
                state.exception_handler().handle(&TableError::from(error));
                Vec::new()
            }
        };

        let mut loaded = HashSet::new();
        for (index, elements) in stored {
            let row = match index {
                Some(index) => state.insert_row_elements(index, elements),
                None => state.add_row_elements(elements),
            };
            if let Some(id) = state.content().row_id(row) {
                loaded.insert(id);
            }
        }

        let mut pushed = 0;
        for row in 0..state.row_size() {
            let Some(id) = state.content().row_id(row) else {
                continue;
            };
            if loaded.contains(&id) {
                continue;
            }
            let elements = state.row_elements(row).unwrap_or_default();
            if let Err(error) = store.add(row, &elements) {
                state.exception_handler().handle(&TableError::from(error));
            }
            pushed += 1;
        }

        log::debug!(
            "[persistence] attached store: loaded {} rows, pushed {} rows",
            loaded.len(),
            pushed
        );
        state.stores.push(Arc::new(PersistenceRegistration { store }));
    }

    /// Detaches `store`. Returns false if it was not attached.
    pub fn detach(&self, store: &Arc<dyn TablePersistence<E>>) -> bool {
        let mut state = self.table.shared().write();
        let before = state.stores.len();
        state
            .stores
            .retain(|registration| !Arc::ptr_eq(&registration.store, store));
        state.stores.len() != before
    }

    /// Returns the number of attached stores.
    pub fn len(&self) -> usize {
        self.table.shared().read().stores.len()
    }

    /// Returns true if no store is attached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
