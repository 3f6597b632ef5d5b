//! Lock-protected table state
//!
//! [`TableState`] carries the full position-based API of a table together
//! with its observers. The [`Table`](super::Table) facade acquires the lock
//! once per call and forwards here; callers that need several steps to be
//! atomic use `execute_with_read_lock` / `execute_with_write_lock` and work
//! on this type directly.

use std::fmt::Display;
use std::sync::Arc;

use crate::content::CellAndStripeResolver;
use crate::content::Element;
use crate::content::TableContent;
use crate::error::ExceptionHandler;
use crate::error::IgnoringExceptionHandler;
use crate::event::TableEvent;
use crate::event::TableEventHandler;
use crate::index::IndexSlot;
use crate::persistence::PersistenceRegistration;

/// Content and observers of one table.
pub struct TableState<E> {
    content: TableContent<E>,
    pub(crate) indexes: Vec<IndexSlot<E>>,
    pub(crate) stores: Vec<Arc<PersistenceRegistration<E>>>,
    pub(crate) handlers: Vec<Arc<dyn TableEventHandler<E>>>,
    exception_handler: Arc<dyn ExceptionHandler>,
}

impl<E: std::fmt::Debug> std::fmt::Debug for TableState<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableState")
            .field("content", &self.content)
            .field("indexes", &self.indexes.len())
            .field("stores", &self.stores.len())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl<E> TableState<E> {
    pub(crate) fn from_content(content: TableContent<E>) -> Self {
        Self {
            content,
            indexes: Vec::new(),
            stores: Vec::new(),
            handlers: Vec::new(),
            exception_handler: Arc::new(IgnoringExceptionHandler),
        }
    }

    /// Returns the underlying content.
    pub fn content(&self) -> &TableContent<E> {
        &self.content
    }

    /// Returns the handler receiving observer failures.
    pub fn exception_handler(&self) -> &Arc<dyn ExceptionHandler> {
        &self.exception_handler
    }

    /// Replaces the handler receiving observer failures.
    pub fn set_exception_handler(&mut self, handler: Arc<dyn ExceptionHandler>) {
        self.exception_handler = handler;
    }

    /// Returns the number of rows.
    pub fn row_size(&self) -> usize {
        self.content.row_count()
    }

    /// Returns the number of columns.
    pub fn column_size(&self) -> usize {
        self.content.column_count()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.content.row_count() == 0
    }

    /// Returns the element at (`row`, `column`).
    pub fn element(&self, row: usize, column: usize) -> Option<&E> {
        self.content.element(row, column)
    }

    /// Returns the element at the row and column carrying the given titles.
    pub fn element_at(&self, row_title: &str, column_title: &str) -> Option<&E> {
        let row = self.content.resolve_row_by_title(row_title)?;
        let column = self.content.resolve_column_by_title(column_title)?;
        self.content.element(row, column)
    }

    /// Returns the element of `row` in the column titled `column_title`.
    pub fn element_by_column_title(&self, row: usize, column_title: &str) -> Option<&E> {
        let column = self.content.resolve_column_by_title(column_title)?;
        self.content.element(row, column)
    }

    /// Returns the table name.
    pub fn table_name(&self) -> Option<&str> {
        self.content.table_name()
    }

    /// Returns the position of the first row titled `title`.
    pub fn row_index_of(&self, title: &str) -> Option<usize> {
        self.content.resolve_row_by_title(title)
    }

    /// Returns the position of the first column titled `title`.
    pub fn column_index_of(&self, title: &str) -> Option<usize> {
        self.content.resolve_column_by_title(title)
    }

    /// Sets the table name.
    pub fn set_table_name(&mut self, name: impl Into<String>) {
        self.content.set_table_name(Some(name.into()));
    }

    pub(crate) fn detached_copy(&self) -> Self
    where
        E: Clone,
    {
        let mut copy = Self::from_content(self.content.clone());
        copy.exception_handler = Arc::clone(&self.exception_handler);
        copy
    }
}

impl<E: Element> TableState<E> {
    fn fire(&self, event: TableEvent<'_, E>) {
        for slot in &self.indexes {
            if let Some(observer) = slot.observer.upgrade() {
                self.notify(observer.as_ref(), &event);
            }
        }
        for store in &self.stores {
            self.notify(store.as_ref(), &event);
        }
        for handler in &self.handlers {
            self.notify(handler.as_ref(), &event);
        }
    }

    fn notify(&self, observer: &dyn TableEventHandler<E>, event: &TableEvent<'_, E>) {
        if let Err(error) = observer.handle(&self.content, event) {
            self.exception_handler.handle(&error);
        }
    }

    /// Returns a copy of the elements of `row`.
    pub fn row_elements(&self, row: usize) -> Option<Vec<Option<E>>> {
        self.content.row_elements(row)
    }

    /// Returns a copy of the elements of `column`.
    pub fn column_elements(&self, column: usize) -> Option<Vec<Option<E>>> {
        self.content.column_elements(column)
    }

    // =========================================================================
    // Growth
    // =========================================================================

    /// Appends empty columns, then empty rows, until the table is at least
    /// `rows` x `columns`. Every appended stripe is announced on its own.
    pub(crate) fn grow_to(&mut self, rows: usize, columns: usize) {
        while self.content.column_count() < columns {
            let at = self.content.column_count();
            let column = self.content.insert_column(at, Vec::new());
            self.fire(TableEvent::AddedColumn { column });
        }
        while self.content.row_count() < rows {
            let at = self.content.row_count();
            let row = self.content.insert_row(at, Vec::new());
            self.fire(TableEvent::AddedRow { row });
        }
    }

    fn row_for_title(&mut self, title: &str) -> usize {
        match self.content.resolve_row_by_title(title) {
            Some(row) => row,
            None => {
                let row = self.content.row_count();
                self.grow_to(row.saturating_add(1), 0);
                self.content.set_row_title(row, Some(title.to_string()));
                row
            }
        }
    }

    fn column_for_title(&mut self, title: &str) -> usize {
        match self.content.resolve_column_by_title(title) {
            Some(column) => column,
            None => {
                let column = self.content.column_count();
                self.grow_to(0, column.saturating_add(1));
                self.content.set_column_title(column, Some(title.to_string()));
                column
            }
        }
    }

    // =========================================================================
    // Cells
    // =========================================================================

    /// Writes a cell, growing the table when the coordinate lies outside it.
    /// Returns the previous element.
    pub fn set_element(&mut self, row: usize, column: usize, element: impl Into<Option<E>>) -> Option<E> {
        let element = element.into();
        let Some((rows, columns)) = extent(row, column) else {
            log::warn!("[table] cell ({}, {}) is beyond the addressable range", row, column);
            return None;
        };
        self.grow_to(rows, columns);
        let previous = self.content.set(row, column, element);
        if previous.as_ref() != self.content.element(row, column) {
            self.fire(TableEvent::UpdatedCell {
                row,
                column,
                previous: previous.as_ref(),
            });
        }
        previous
    }

    /// Writes the cell of `row` in the column titled `column_title`,
    /// appending that column if it does not exist.
    pub fn set_element_by_column_title(
        &mut self,
        row: usize,
        column_title: &str,
        element: impl Into<Option<E>>,
    ) -> Option<E> {
        let column = self.column_for_title(column_title);
        self.set_element(row, column, element)
    }

    /// Writes the cell of `column` in the row titled `row_title`, appending
    /// that row if it does not exist.
    pub fn set_element_by_row_title(
        &mut self,
        row_title: &str,
        column: usize,
        element: impl Into<Option<E>>,
    ) -> Option<E> {
        let row = self.row_for_title(row_title);
        self.set_element(row, column, element)
    }

    /// Writes the cell addressed by a row title and a column title, appending
    /// missing stripes.
    pub fn set_element_at(&mut self, row_title: &str, column_title: &str, element: impl Into<Option<E>>) -> Option<E> {
        let row = self.row_for_title(row_title);
        let column = self.column_for_title(column_title);
        self.set_element(row, column, element)
    }

    /// Nulls a cell and returns the element it held.
    pub fn remove_element(&mut self, row: usize, column: usize) -> Option<E> {
        self.content.resolve_cell(row, column)?;
        let previous = self.content.set(row, column, None);
        if previous.is_some() {
            self.fire(TableEvent::UpdatedCell {
                row,
                column,
                previous: previous.as_ref(),
            });
        }
        previous
    }

    // =========================================================================
    // Rows and columns
    // =========================================================================

    /// Inserts a row at `at`; later rows shift down by one.
    pub fn insert_row_elements(&mut self, at: usize, elements: Vec<Option<E>>) -> usize {
        self.grow_to(at, elements.len());
        let row = self.content.insert_row(at, elements);
        self.fire(TableEvent::AddedRow { row });
        row
    }

    /// Appends a row and returns its position.
    pub fn add_row_elements(&mut self, elements: Vec<Option<E>>) -> usize {
        let at = self.content.row_count();
        self.insert_row_elements(at, elements)
    }

    /// Inserts a column at `at`; later columns shift right by one.
    pub fn insert_column_elements(&mut self, at: usize, elements: Vec<Option<E>>) -> usize {
        self.grow_to(elements.len(), at);
        let column = self.content.insert_column(at, elements);
        self.fire(TableEvent::AddedColumn { column });
        column
    }

    /// Appends a column and returns its position.
    pub fn add_column_elements(&mut self, elements: Vec<Option<E>>) -> usize {
        let at = self.content.column_count();
        self.insert_column_elements(at, elements)
    }

    /// Appends a row whose elements are placed by column title. Titles with
    /// no column are appended as new columns when `create_missing_columns` is
    /// set and skipped otherwise.
    pub fn add_row_map(
        &mut self,
        entries: impl IntoIterator<Item = (String, Option<E>)>,
        create_missing_columns: bool,
    ) -> usize {
        let mut elements: Vec<Option<E>> = Vec::new();
        for (title, element) in entries {
            let column = match self.content.resolve_column_by_title(&title) {
                Some(column) => column,
                None if create_missing_columns => self.column_for_title(&title),
                None => continue,
            };
            if elements.len() <= column {
                elements.resize(column + 1, None);
            }
            elements[column] = element;
        }
        self.add_row_elements(elements)
    }

    /// Replaces every element of `row`. Columns beyond `elements` are nulled.
    pub fn set_row_elements(&mut self, row: usize, elements: Vec<Option<E>>) {
        let Some((rows, _)) = extent(row, 0) else {
            return;
        };
        self.grow_to(rows, elements.len());
        let mut elements = elements.into_iter();
        for column in 0..self.content.column_count() {
            self.set_element(row, column, elements.next().flatten());
        }
    }

    /// Replaces every element of `column`. Rows beyond `elements` are nulled.
    pub fn set_column_elements(&mut self, column: usize, elements: Vec<Option<E>>) {
        let Some((_, columns)) = extent(0, column) else {
            return;
        };
        self.grow_to(elements.len(), columns);
        let mut elements = elements.into_iter();
        for row in 0..self.content.row_count() {
            self.set_element(row, column, elements.next().flatten());
        }
    }

    /// Removes a row and returns its elements.
    pub fn remove_row(&mut self, row: usize) -> Option<Vec<Option<E>>> {
        let removed = self.content.remove_row(row)?;
        self.fire(TableEvent::RemovedRow { row, removed: &removed });
        Some(removed.elements)
    }

    /// Removes a column and returns its elements.
    pub fn remove_column(&mut self, column: usize) -> Option<Vec<Option<E>>> {
        let removed = self.content.remove_column(column)?;
        self.fire(TableEvent::RemovedColumn {
            column,
            removed: &removed,
        });
        self.indexes
            .retain(|slot| slot.is_live() && !slot.watches_column(removed.id));
        Some(removed.elements)
    }

    /// Swaps two rows including their titles.
    pub fn swap_rows(&mut self, a: usize, b: usize) -> bool {
        let swapped = self.content.swap_rows(a, b);
        if swapped && a != b {
            self.fire(TableEvent::Reordered);
        }
        swapped
    }

    /// Swaps two columns including their titles.
    pub fn swap_columns(&mut self, a: usize, b: usize) -> bool {
        let swapped = self.content.swap_columns(a, b);
        if swapped && a != b {
            self.fire(TableEvent::Reordered);
        }
        swapped
    }

    /// Moves a row to a new position, shifting the rows between.
    pub fn move_row(&mut self, from: usize, to: usize) -> bool {
        let moved = self.content.move_row(from, to);
        if moved && from != to {
            self.fire(TableEvent::Reordered);
        }
        moved
    }

    pub(crate) fn reorder_rows(&mut self, order: &[usize]) {
        self.content.reorder_rows(order);
        self.fire(TableEvent::Reordered);
    }

    /// Swaps the roles of rows and columns.
    pub fn transpose(&mut self) {
        self.content.transpose();
        self.fire(TableEvent::Transposed);
    }

    /// Removes all rows, columns and titles. The table name is kept.
    pub fn clear(&mut self) {
        self.content.clear();
        self.fire(TableEvent::Cleared);
    }

    /// Replaces the whole content, announcing the change as a clear followed
    /// by one added row per row of `content`.
    pub(crate) fn replace_content(&mut self, content: TableContent<E>) {
        self.clear();
        self.content.set_table_name(content.table_name().map(str::to_string));
        self.grow_to(0, content.column_count());
        for row in content.to_rows() {
            self.add_row_elements(row);
        }
        for (row, title) in content.row_titles().into_iter().enumerate() {
            self.content.set_row_title(row, title);
        }
        for (column, title) in content.column_titles().into_iter().enumerate() {
            self.content.set_column_title(column, title);
        }
    }

    // =========================================================================
    // Titles
    // =========================================================================

    /// Sets the title of `row`, growing the table if needed.
    pub fn set_row_title(&mut self, row: usize, title: impl Into<String>) {
        self.put_row_title(row, Some(title.into()));
    }

    /// Sets the title of `column`, growing the table if needed.
    pub fn set_column_title(&mut self, column: usize, title: impl Into<String>) {
        self.put_column_title(column, Some(title.into()));
    }

    /// Removes the title of `row`.
    pub fn clear_row_title(&mut self, row: usize) {
        self.content.set_row_title(row, None);
    }

    /// Removes the title of `column`.
    pub fn clear_column_title(&mut self, column: usize) {
        self.content.set_column_title(column, None);
    }

    /// Sets the titles of the first rows in order.
    pub fn set_row_titles<T: Into<String>>(&mut self, titles: impl IntoIterator<Item = T>) {
        for (row, title) in titles.into_iter().enumerate() {
            self.set_row_title(row, title);
        }
    }

    /// Sets the titles of the first columns in order.
    pub fn set_column_titles<T: Into<String>>(&mut self, titles: impl IntoIterator<Item = T>) {
        for (column, title) in titles.into_iter().enumerate() {
            self.set_column_title(column, title);
        }
    }

    /// Appends an empty column carrying `title` and returns its position.
    pub fn add_column_title(&mut self, title: impl Into<String>) -> usize {
        let column = self.content.column_count();
        self.put_column_title(column, Some(title.into()));
        column
    }

    pub(crate) fn put_row_title(&mut self, row: usize, title: Option<String>) {
        let Some((rows, _)) = extent(row, 0) else {
            return;
        };
        self.grow_to(rows, 0);
        self.content.set_row_title(row, title);
    }

    pub(crate) fn put_column_title(&mut self, column: usize, title: Option<String>) {
        let Some((_, columns)) = extent(0, column) else {
            return;
        };
        self.grow_to(0, columns);
        self.content.set_column_title(column, title);
    }

    /// Uses the elements of the first row as column titles and removes it.
    pub fn set_column_titles_using_first_row(&mut self)
    where
        E: Display,
    {
        let Some(first) = self.content.row_elements(0) else {
            return;
        };
        for (column, element) in first.iter().enumerate() {
            self.content
                .set_column_title(column, element.as_ref().map(ToString::to_string));
        }
        self.remove_row(0);
    }

    /// Uses the elements of the first column as row titles and removes it.
    pub fn set_row_titles_using_first_column(&mut self)
    where
        E: Display,
    {
        let Some(first) = self.content.column_elements(0) else {
            return;
        };
        for (row, element) in first.iter().enumerate() {
            self.content.set_row_title(row, element.as_ref().map(ToString::to_string));
        }
        self.remove_column(0);
    }
}

/// Table size needed to hold (`row`, `column`), `None` past `usize::MAX`.
fn extent(row: usize, column: usize) -> Option<(usize, usize)> {
    Some((row.checked_add(1)?, column.checked_add(1)?))
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::content::RemovedStripe;
    use crate::error::CollectingExceptionHandler;
    use crate::error::TableError;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl TableEventHandler<i32> for Recorder {
        fn on_added_row(&self, _content: &TableContent<i32>, row: usize) -> Result<(), TableError> {
            self.events.lock().push(format!("row+{row}"));
            Ok(())
        }

        fn on_added_column(&self, _content: &TableContent<i32>, column: usize) -> Result<(), TableError> {
            self.events.lock().push(format!("column+{column}"));
            Ok(())
        }

        fn on_removed_row(
            &self,
            _content: &TableContent<i32>,
            row: usize,
            _removed: &RemovedStripe<i32>,
        ) -> Result<(), TableError> {
            self.events.lock().push(format!("row-{row}"));
            Ok(())
        }

        fn on_updated_cell(
            &self,
            _content: &TableContent<i32>,
            row: usize,
            column: usize,
            previous: Option<&i32>,
        ) -> Result<(), TableError> {
            self.events.lock().push(format!("cell({row},{column}) was {previous:?}"));
            Ok(())
        }
    }

    struct Failing;

    impl TableEventHandler<i32> for Failing {
        fn on_cleared(&self, _content: &TableContent<i32>) -> Result<(), TableError> {
            Err(TableError::handler("failing", "refused"))
        }
    }

    #[test]
    fn test_growth_announces_columns_before_rows() {
        let recorder = Arc::new(Recorder::default());
        let mut state = TableState::from_content(TableContent::new());
        state.handlers.push(recorder.clone());

        state.set_element(1, 1, 7);
        assert_eq!(
            *recorder.events.lock(),
            vec!["column+0", "column+1", "row+0", "row+1", "cell(1,1) was None"]
        );
    }

    #[test]
    fn test_unaddressable_writes_are_ignored() {
        let recorder = Arc::new(Recorder::default());
        let mut state = TableState::from_content(TableContent::from_rows(vec![vec![Some(1)]]));
        state.handlers.push(recorder.clone());

        assert_eq!(state.set_element(usize::MAX, 0, 5), None);
        assert_eq!(state.set_element(0, usize::MAX, 5), None);
        state.set_row_title(usize::MAX, "far");
        state.set_column_elements(usize::MAX, vec![Some(2)]);

        assert_eq!(state.row_size(), 1);
        assert_eq!(state.column_size(), 1);
        assert!(recorder.events.lock().is_empty());
    }

    #[test]
    fn test_unchanged_write_is_silent() {
        let recorder = Arc::new(Recorder::default());
        let mut state = TableState::from_content(TableContent::from_rows(vec![vec![Some(1)]]));
        state.handlers.push(recorder.clone());

        assert_eq!(state.set_element(0, 0, 1), Some(1));
        assert!(recorder.events.lock().is_empty());
    }

    #[test]
    fn test_observer_failure_reaches_exception_handler() {
        let collector = Arc::new(CollectingExceptionHandler::new());
        let mut state = TableState::from_content(TableContent::from_rows(vec![vec![Some(1)]]));
        state.set_exception_handler(collector.clone());
        state.handlers.push(Arc::new(Failing));

        state.clear();
        assert_eq!(state.row_size(), 0);
        assert_eq!(collector.messages(), vec!["Event handler 'failing' failed: refused".to_string()]);
    }

    #[test]
    fn test_add_row_map_places_by_title() {
        let mut state = TableState::from_content(TableContent::new());
        state.set_column_titles(["a", "b"]);

        state.add_row_map([("b".to_string(), Some(2)), ("c".to_string(), Some(3))], false);
        assert_eq!(state.row_elements(0).unwrap(), vec![None, Some(2)]);

        state.add_row_map([("c".to_string(), Some(3))], true);
        assert_eq!(state.column_size(), 3);
        assert_eq!(state.element(1, 2), Some(&3));
    }
}
