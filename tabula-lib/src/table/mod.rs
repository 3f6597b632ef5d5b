//! Table facade
//!
//! [`Table`] is the public entry point. It shares one [`TableState`] behind a
//! read/write lock with every handle, index and selection derived from it.

mod handle;
mod sort;
mod state;
mod transform;

pub use handle::*;
pub use sort::*;
pub use state::*;

use std::fmt::Display;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::content::Element;
use crate::content::TableContent;
use crate::error::ExceptionHandler;
use crate::event::TableEventHandler;

pub(crate) type SharedState<E> = Arc<RwLock<TableState<E>>>;

/// A mutable, thread-safe two-dimensional table of optional elements.
///
/// Reads outside the table return `None`; writes outside the table grow it.
///
/// # Example
///
/// ```
/// use tabula_lib::Table;
///
/// let table: Table<i32> = Table::new();
/// table.set_element(2, 1, 42);
///
/// assert_eq!(table.row_size(), 3);
/// assert_eq!(table.column_size(), 2);
/// assert_eq!(table.element(2, 1), Some(42));
/// assert_eq!(table.element(0, 0), None);
/// assert_eq!(table.element(9, 9), None);
/// ```
pub struct Table<E> {
    state: SharedState<E>,
}

impl<E: Element> Default for Table<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Element> Table<E> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::from_content(TableContent::new())
    }

    /// Creates an empty table with a name.
    pub fn named(name: impl Into<String>) -> Self {
        let table = Self::new();
        table.set_table_name(name);
        table
    }

    /// Creates a table from rows of elements. Short rows are padded.
    pub fn from_rows<R, T>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = T>,
        T: Into<Option<E>>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        Self::from_content(TableContent::from_rows(rows))
    }

    pub(crate) fn from_content(content: TableContent<E>) -> Self {
        Self::from_shared(Arc::new(RwLock::new(TableState::from_content(content))))
    }

    pub(crate) fn from_shared(state: SharedState<E>) -> Self {
        Self { state }
    }

    pub(crate) fn shared(&self) -> &SharedState<E> {
        &self.state
    }

    /// Returns true if both values refer to the same table.
    pub fn is_same_table(&self, other: &Table<E>) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    // =========================================================================
    // Locking
    // =========================================================================

    /// Runs `body` under the read lock. Other readers may run concurrently.
    pub fn execute_with_read_lock<R>(&self, body: impl FnOnce(&TableState<E>) -> R) -> R {
        body(&self.state.read())
    }

    /// Runs `body` under the write lock, excluding all readers and writers.
    ///
    /// The body must not call back into this table's facade or handles.
    pub fn execute_with_write_lock<R>(&self, body: impl FnOnce(&mut TableState<E>) -> R) -> R {
        body(&mut self.state.write())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Returns the number of rows.
    pub fn row_size(&self) -> usize {
        self.state.read().row_size()
    }

    /// Returns the number of columns.
    pub fn column_size(&self) -> usize {
        self.state.read().column_size()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.state.read().is_empty()
    }

    /// Returns the element at (`row`, `column`).
    pub fn element(&self, row: usize, column: usize) -> Option<E> {
        self.state.read().element(row, column).cloned()
    }

    /// Returns the element at the row and column with the given titles.
    pub fn element_at(&self, row_title: &str, column_title: &str) -> Option<E> {
        self.state.read().element_at(row_title, column_title).cloned()
    }

    /// Returns the element of `row` in the column titled `column_title`.
    pub fn element_by_column_title(&self, row: usize, column_title: &str) -> Option<E> {
        self.state.read().element_by_column_title(row, column_title).cloned()
    }

    /// Returns the elements of `row`.
    pub fn row_elements(&self, row: usize) -> Option<Vec<Option<E>>> {
        self.state.read().row_elements(row)
    }

    /// Returns the elements of `column`.
    pub fn column_elements(&self, column: usize) -> Option<Vec<Option<E>>> {
        self.state.read().column_elements(column)
    }

    /// Returns the table name.
    pub fn table_name(&self) -> Option<String> {
        self.state.read().table_name().map(str::to_string)
    }

    /// Returns the title of `row`.
    pub fn row_title(&self, row: usize) -> Option<String> {
        self.state.read().content().row_title(row).map(str::to_string)
    }

    /// Returns the title of `column`.
    pub fn column_title(&self, column: usize) -> Option<String> {
        self.state.read().content().column_title(column).map(str::to_string)
    }

    /// Returns the titles of all rows.
    pub fn row_titles(&self) -> Vec<Option<String>> {
        self.state.read().content().row_titles()
    }

    /// Returns the titles of all columns.
    pub fn column_titles(&self) -> Vec<Option<String>> {
        self.state.read().content().column_titles()
    }

    /// Returns the position of the first row titled `title`.
    pub fn row_index_of(&self, title: &str) -> Option<usize> {
        self.state.read().row_index_of(title)
    }

    /// Returns the position of the first column titled `title`.
    pub fn column_index_of(&self, title: &str) -> Option<usize> {
        self.state.read().column_index_of(title)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Writes a cell, growing the table as needed. Returns the previous element.
    pub fn set_element(&self, row: usize, column: usize, element: impl Into<Option<E>>) -> Option<E> {
        self.state.write().set_element(row, column, element)
    }

    /// Writes the cell of `row` in the column titled `column_title`.
    pub fn set_element_by_column_title(
        &self,
        row: usize,
        column_title: &str,
        element: impl Into<Option<E>>,
    ) -> Option<E> {
        self.state
            .write()
            .set_element_by_column_title(row, column_title, element)
    }

    /// Writes the cell of `column` in the row titled `row_title`.
    pub fn set_element_by_row_title(&self, row_title: &str, column: usize, element: impl Into<Option<E>>) -> Option<E> {
        self.state.write().set_element_by_row_title(row_title, column, element)
    }

    /// Writes the cell addressed by a row title and a column title.
    pub fn set_element_at(&self, row_title: &str, column_title: &str, element: impl Into<Option<E>>) -> Option<E> {
        self.state.write().set_element_at(row_title, column_title, element)
    }

    /// Nulls a cell and returns the element it held.
    pub fn remove_element(&self, row: usize, column: usize) -> Option<E> {
        self.state.write().remove_element(row, column)
    }

    /// Appends a row and returns its position.
    pub fn add_row_elements<T: Into<Option<E>>>(&self, elements: impl IntoIterator<Item = T>) -> usize {
        let elements = collect(elements);
        self.state.write().add_row_elements(elements)
    }

    /// Inserts a row at `at`; later rows shift down by one.
    pub fn insert_row_elements<T: Into<Option<E>>>(&self, at: usize, elements: impl IntoIterator<Item = T>) -> usize {
        let elements = collect(elements);
        self.state.write().insert_row_elements(at, elements)
    }

    /// Appends a column and returns its position.
    pub fn add_column_elements<T: Into<Option<E>>>(&self, elements: impl IntoIterator<Item = T>) -> usize {
        let elements = collect(elements);
        self.state.write().add_column_elements(elements)
    }

    /// Inserts a column at `at`; later columns shift right by one.
    pub fn insert_column_elements<T: Into<Option<E>>>(
        &self,
        at: usize,
        elements: impl IntoIterator<Item = T>,
    ) -> usize {
        let elements = collect(elements);
        self.state.write().insert_column_elements(at, elements)
    }

    /// Appends a row whose elements are placed by column title.
    pub fn add_row_map<K, T>(&self, entries: impl IntoIterator<Item = (K, T)>, create_missing_columns: bool) -> usize
    where
        K: Into<String>,
        T: Into<Option<E>>,
    {
        let entries: Vec<(String, Option<E>)> = entries
            .into_iter()
            .map(|(title, element)| (title.into(), element.into()))
            .collect();
        self.state.write().add_row_map(entries, create_missing_columns)
    }

    /// Replaces the elements of `row`.
    pub fn set_row_elements<T: Into<Option<E>>>(&self, row: usize, elements: impl IntoIterator<Item = T>) {
        let elements = collect(elements);
        self.state.write().set_row_elements(row, elements);
    }

    /// Replaces the elements of `column`.
    pub fn set_column_elements<T: Into<Option<E>>>(&self, column: usize, elements: impl IntoIterator<Item = T>) {
        let elements = collect(elements);
        self.state.write().set_column_elements(column, elements);
    }

    /// Removes a row and returns its elements.
    pub fn remove_row(&self, row: usize) -> Option<Vec<Option<E>>> {
        self.state.write().remove_row(row)
    }

    /// Removes a column and returns its elements.
    pub fn remove_column(&self, column: usize) -> Option<Vec<Option<E>>> {
        self.state.write().remove_column(column)
    }

    /// Swaps two rows including their titles. Returns false if either is
    /// out of range.
    pub fn swap_rows(&self, a: usize, b: usize) -> bool {
        self.state.write().swap_rows(a, b)
    }

    /// Swaps two columns including their titles.
    pub fn swap_columns(&self, a: usize, b: usize) -> bool {
        self.state.write().swap_columns(a, b)
    }

    /// Moves a row to `to`, shifting the rows between.
    pub fn move_row(&self, from: usize, to: usize) -> bool {
        self.state.write().move_row(from, to)
    }

    /// Swaps the roles of rows and columns.
    pub fn transpose(&self) {
        self.state.write().transpose();
    }

    /// Removes all rows, columns and titles. The table name is kept.
    pub fn clear(&self) {
        self.state.write().clear();
    }

    // =========================================================================
    // Titles
    // =========================================================================

    /// Sets the table name.
    pub fn set_table_name(&self, name: impl Into<String>) {
        self.state.write().set_table_name(name);
    }

    /// Sets the title of `row`.
    pub fn set_row_title(&self, row: usize, title: impl Into<String>) {
        self.state.write().set_row_title(row, title);
    }

    /// Sets the title of `column`.
    pub fn set_column_title(&self, column: usize, title: impl Into<String>) {
        self.state.write().set_column_title(column, title);
    }

    /// Sets the titles of the first rows in order.
    pub fn set_row_titles<T: Into<String>>(&self, titles: impl IntoIterator<Item = T>) {
        self.state.write().set_row_titles(titles);
    }

    /// Sets the titles of the first columns in order.
    pub fn set_column_titles<T: Into<String>>(&self, titles: impl IntoIterator<Item = T>) {
        self.state.write().set_column_titles(titles);
    }

    /// Appends an empty column carrying `title`.
    pub fn add_column_title(&self, title: impl Into<String>) -> usize {
        self.state.write().add_column_title(title)
    }

    /// Uses the first row as column titles and removes it.
    pub fn set_column_titles_using_first_row(&self)
    where
        E: Display,
    {
        self.state.write().set_column_titles_using_first_row();
    }

    /// Uses the first column as row titles and removes it.
    pub fn set_row_titles_using_first_column(&self)
    where
        E: Display,
    {
        self.state.write().set_row_titles_using_first_column();
    }

    // =========================================================================
    // Configuration and comparison
    // =========================================================================

    /// Replaces the handler receiving observer failures.
    pub fn set_exception_handler(&self, handler: Arc<dyn ExceptionHandler>) {
        self.state.write().set_exception_handler(handler);
    }

    /// Returns the registry of user event handlers.
    pub fn event_handlers(&self) -> EventHandlers<'_, E> {
        EventHandlers { table: self }
    }

    /// Returns true if both tables have the same size and elements.
    pub fn equals_in_content(&self, other: &Table<E>) -> bool {
        self.is_same_table(other) || self.read_both(other, |this, other| this.equals_in_content(other))
    }

    /// Returns true if both tables are equal in elements, titles and name.
    pub fn equals_in_content_and_metadata(&self, other: &Table<E>) -> bool {
        self.is_same_table(other)
            || self.read_both(other, |this, other| this.equals_in_content_and_metadata(other))
    }

    /// Runs `body` under the read locks of two distinct tables, always taken
    /// in address order.
    fn read_both<R>(&self, other: &Table<E>, body: impl FnOnce(&TableContent<E>, &TableContent<E>) -> R) -> R {
        if Arc::as_ptr(&self.state) < Arc::as_ptr(&other.state) {
            let this = self.state.read();
            let other = other.state.read();
            body(this.content(), other.content())
        } else {
            let other = other.state.read();
            let this = self.state.read();
            body(this.content(), other.content())
        }
    }
}

fn collect<E, T: Into<Option<E>>>(elements: impl IntoIterator<Item = T>) -> Vec<Option<E>> {
    elements.into_iter().map(Into::into).collect()
}

/// Deep copy of content, titles, name and exception handler. Indexes,
/// persistence stores and event handlers stay with the original.
impl<E: Element> Clone for Table<E> {
    fn clone(&self) -> Self {
        let copy = self.state.read().detached_copy();
        Self::from_shared(Arc::new(RwLock::new(copy)))
    }
}

impl<E: Element> PartialEq for Table<E> {
    fn eq(&self, other: &Self) -> bool {
        self.equals_in_content_and_metadata(other)
    }
}

impl<E: Element> std::fmt::Debug for Table<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Table")
            .field("name", &state.table_name())
            .field("rows", &state.row_size())
            .field("columns", &state.column_size())
            .finish()
    }
}

/// Registry of user event handlers of one table.
pub struct EventHandlers<'a, E> {
    table: &'a Table<E>,
}

impl<E: Element> EventHandlers<'_, E> {
    /// Registers a handler. Handlers run after indexes and persistence stores.
    pub fn attach(&self, handler: Arc<dyn TableEventHandler<E>>) {
        self.table.state.write().handlers.push(handler);
    }

    /// Removes a previously attached handler. Returns false if it was not
    /// attached.
    pub fn detach(&self, handler: &Arc<dyn TableEventHandler<E>>) -> bool {
        let mut state = self.table.state.write();
        let before = state.handlers.len();
        state.handlers.retain(|attached| !Arc::ptr_eq(attached, handler));
        state.handlers.len() != before
    }

    /// Returns the number of attached handlers.
    pub fn len(&self) -> usize {
        self.table.state.read().handlers.len()
    }

    /// Returns true if no handler is attached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
