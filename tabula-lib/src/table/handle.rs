//! Live row, column and cell handles
//!
//! A handle stores the stable id of its stripe and looks up the live position
//! on every call. Inserting or removing other stripes shifts what `index()`
//! reports; removing the stripe itself makes the handle report deleted.

use std::marker::PhantomData;
use std::ops::Range;
use std::sync::Arc;

use bitvec::slice::BitSlice;
use regex::Regex;

use super::SharedState;
use super::Table;
use super::TableState;
use crate::content::Element;
use crate::content::StripeId;
use crate::content::StripeList;
use crate::content::TableContent;

/// Orientation of a stripe handle.
pub trait Axis: Send + Sync + 'static {
    /// Human-readable orientation name.
    const NAME: &'static str;

    /// Returns the stripes of this orientation.
    fn stripes<E>(content: &TableContent<E>) -> &StripeList;

    /// Returns the stripes of the other orientation.
    fn cross_stripes<E>(content: &TableContent<E>) -> &StripeList;

    /// Maps (stripe position, index within the stripe) to (row, column).
    fn coordinates(position: usize, index: usize) -> (usize, usize);

    /// Maps (own id, cross id) to (row id, column id).
    fn cell_ids(own: StripeId, cross: StripeId) -> (StripeId, StripeId);

    #[doc(hidden)]
    fn put_title<E: Element>(state: &mut TableState<E>, position: usize, title: Option<String>);

    #[doc(hidden)]
    fn remove<E: Element>(state: &mut TableState<E>, position: usize) -> Option<Vec<Option<E>>>;

    #[doc(hidden)]
    fn swap<E: Element>(state: &mut TableState<E>, a: usize, b: usize) -> bool;
}

/// Row orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowAxis;

/// Column orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnAxis;

impl Axis for RowAxis {
    const NAME: &'static str = "row";

    fn stripes<E>(content: &TableContent<E>) -> &StripeList {
        content.rows()
    }

    fn cross_stripes<E>(content: &TableContent<E>) -> &StripeList {
        content.columns()
    }

    fn coordinates(position: usize, index: usize) -> (usize, usize) {
        (position, index)
    }

    fn cell_ids(own: StripeId, cross: StripeId) -> (StripeId, StripeId) {
        (own, cross)
    }

    fn put_title<E: Element>(state: &mut TableState<E>, position: usize, title: Option<String>) {
        state.put_row_title(position, title);
    }

    fn remove<E: Element>(state: &mut TableState<E>, position: usize) -> Option<Vec<Option<E>>> {
        state.remove_row(position)
    }

    fn swap<E: Element>(state: &mut TableState<E>, a: usize, b: usize) -> bool {
        state.swap_rows(a, b)
    }
}

impl Axis for ColumnAxis {
    const NAME: &'static str = "column";

    fn stripes<E>(content: &TableContent<E>) -> &StripeList {
        content.columns()
    }

    fn cross_stripes<E>(content: &TableContent<E>) -> &StripeList {
        content.rows()
    }

    fn coordinates(position: usize, index: usize) -> (usize, usize) {
        (index, position)
    }

    fn cell_ids(own: StripeId, cross: StripeId) -> (StripeId, StripeId) {
        (cross, own)
    }

    fn put_title<E: Element>(state: &mut TableState<E>, position: usize, title: Option<String>) {
        state.put_column_title(position, title);
    }

    fn remove<E: Element>(state: &mut TableState<E>, position: usize) -> Option<Vec<Option<E>>> {
        state.remove_column(position)
    }

    fn swap<E: Element>(state: &mut TableState<E>, a: usize, b: usize) -> bool {
        state.swap_columns(a, b)
    }
}

/// Live handle of a row or column.
pub struct Stripe<E, A> {
    state: SharedState<E>,
    id: StripeId,
    revision: u64,
    axis: PhantomData<fn() -> A>,
}

/// Live handle of a row.
pub type Row<E> = Stripe<E, RowAxis>;

/// Live handle of a column.
pub type Column<E> = Stripe<E, ColumnAxis>;

impl<E, A> Clone for Stripe<E, A> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            id: self.id,
            revision: self.revision,
            axis: PhantomData,
        }
    }
}

impl<E, A: Axis> std::fmt::Debug for Stripe<E, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", A::NAME, self.id)
    }
}

impl<E: Element, A: Axis> Stripe<E, A> {
    pub(crate) fn at(state: &SharedState<E>, content: &TableContent<E>, position: usize) -> Option<Self> {
        let stripe = A::stripes(content).get(position)?;
        Some(Self {
            state: Arc::clone(state),
            id: stripe.id(),
            revision: stripe.revision(),
            axis: PhantomData,
        })
    }

    fn position(&self, content: &TableContent<E>) -> Option<usize> {
        A::stripes(content).position_of(self.id)
    }

    /// Returns the stable id of the stripe.
    pub fn id(&self) -> StripeId {
        self.id
    }

    pub(crate) fn shared(&self) -> &SharedState<E> {
        &self.state
    }

    /// Returns the live position, or `None` once the stripe was removed.
    pub fn index(&self) -> Option<usize> {
        self.position(self.state.read().content())
    }

    /// Returns true once the stripe was removed.
    pub fn is_deleted(&self) -> bool {
        self.index().is_none()
    }

    /// Returns true if a cell of the stripe changed, a title changed,
    /// or an orthogonal stripe was added or removed since this handle was made.
    pub fn is_modified(&self) -> bool {
        let state = self.state.read();
        A::stripes(state.content())
            .by_id(self.id)
            .is_none_or(|stripe| stripe.revision() != self.revision)
    }

    /// Returns the number of elements, zero once deleted.
    pub fn size(&self) -> usize {
        let state = self.state.read();
        match self.position(state.content()) {
            Some(_) => A::cross_stripes(state.content()).len(),
            None => 0,
        }
    }

    /// Returns the elements, empty once deleted.
    pub fn elements(&self) -> Vec<Option<E>> {
        let state = self.state.read();
        let content = state.content();
        let Some(position) = self.position(content) else {
            return Vec::new();
        };
        (0..A::cross_stripes(content).len())
            .map(|index| {
                let (row, column) = A::coordinates(position, index);
                content.element(row, column).cloned()
            })
            .collect()
    }

    /// Returns the element at `index` within the stripe.
    pub fn element(&self, index: usize) -> Option<E> {
        let state = self.state.read();
        let (row, column) = A::coordinates(self.position(state.content())?, index);
        state.element(row, column).cloned()
    }

    /// Returns the element in the orthogonal stripe titled `title`.
    pub fn element_by_title(&self, title: &str) -> Option<E> {
        let state = self.state.read();
        let content = state.content();
        let index = A::cross_stripes(content).position_of_title(title)?;
        let (row, column) = A::coordinates(self.position(content)?, index);
        content.element(row, column).cloned()
    }

    /// Writes the element at `index`, growing the table if needed. Does
    /// nothing once deleted.
    pub fn set_element(&self, index: usize, element: impl Into<Option<E>>) -> Option<E> {
        let mut state = self.state.write();
        let (row, column) = A::coordinates(self.position(state.content())?, index);
        state.set_element(row, column, element)
    }

    /// Replaces all elements; positions beyond `elements` are nulled.
    pub fn set_elements<T: Into<Option<E>>>(&self, elements: impl IntoIterator<Item = T>) {
        let elements: Vec<Option<E>> = elements.into_iter().map(Into::into).collect();
        let mut state = self.state.write();
        let Some(position) = self.position(state.content()) else {
            return;
        };
        let size = A::cross_stripes(state.content()).len().max(elements.len());
        let mut elements = elements.into_iter();
        for index in 0..size {
            let (row, column) = A::coordinates(position, index);
            state.set_element(row, column, elements.next().flatten());
        }
    }

    /// Applies `convert` to every element under one write lock.
    pub fn apply(&self, mut convert: impl FnMut(Option<E>) -> Option<E>) {
        let mut state = self.state.write();
        let Some(position) = self.position(state.content()) else {
            return;
        };
        for index in 0..A::cross_stripes(state.content()).len() {
            let (row, column) = A::coordinates(position, index);
            let converted = convert(state.element(row, column).cloned());
            state.set_element(row, column, converted);
        }
    }

    /// Returns the title.
    pub fn title(&self) -> Option<String> {
        let state = self.state.read();
        A::stripes(state.content())
            .by_id(self.id)
            .and_then(|stripe| stripe.title().map(str::to_string))
    }

    /// Sets the title. Does nothing once deleted.
    pub fn set_title(&self, title: impl Into<String>) {
        self.put_title(Some(title.into()));
    }

    /// Removes the title.
    pub fn clear_title(&self) {
        self.put_title(None);
    }

    fn put_title(&self, title: Option<String>) {
        let mut state = self.state.write();
        if let Some(position) = self.position(state.content()) {
            A::put_title(&mut state, position, title);
        }
    }

    /// Returns a handle of the cell at `index` within the stripe.
    pub fn cell(&self, index: usize) -> Option<Cell<E>> {
        let state = self.state.read();
        let content = state.content();
        self.position(content)?;
        let cross = A::cross_stripes(content).id_at(index)?;
        let (row, column) = A::cell_ids(self.id, cross);
        Some(Cell::new(Arc::clone(&self.state), row, column))
    }

    /// Returns handles of all cells of the stripe.
    pub fn cells(&self) -> Vec<Cell<E>> {
        let state = self.state.read();
        let content = state.content();
        if self.position(content).is_none() {
            return Vec::new();
        }
        A::cross_stripes(content)
            .iter()
            .map(|cross| {
                let (row, column) = A::cell_ids(self.id, cross.id());
                Cell::new(Arc::clone(&self.state), row, column)
            })
            .collect()
    }

    /// Removes the stripe from the table and returns its elements.
    pub fn remove(&self) -> Option<Vec<Option<E>>> {
        let mut state = self.state.write();
        let position = self.position(state.content())?;
        A::remove(&mut state, position)
    }

    /// Swaps this stripe with the one at `other`, elements and titles alike.
    pub fn switch_with(&self, other: usize) -> bool {
        let mut state = self.state.write();
        match self.position(state.content()) {
            Some(position) => A::swap(&mut state, position, other),
            None => false,
        }
    }

    /// Returns true if both stripes hold equal elements.
    pub fn equals_in_content<B: Axis>(&self, other: &Stripe<E, B>) -> bool {
        self.elements() == other.elements()
    }
}

impl<E: Element> Row<E> {
    /// Moves the row to `to`, shifting the rows in between.
    pub fn move_to(&self, to: usize) -> bool {
        let mut state = self.state.write();
        match self.position(state.content()) {
            Some(position) => state.move_row(position, to),
            None => false,
        }
    }
}

/// Live handle of one cell.
///
/// Equality compares the contained elements; use [`Cell::is_same`] for
/// identity.
pub struct Cell<E> {
    state: SharedState<E>,
    row: StripeId,
    column: StripeId,
}

impl<E> Clone for Cell<E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            row: self.row,
            column: self.column,
        }
    }
}

impl<E> std::fmt::Debug for Cell<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cell({}, {})", self.row, self.column)
    }
}

impl<E: Element> Cell<E> {
    pub(crate) fn new(state: SharedState<E>, row: StripeId, column: StripeId) -> Self {
        Self { state, row, column }
    }

    fn coordinates(&self, content: &TableContent<E>) -> Option<(usize, usize)> {
        Some((content.row_position(self.row)?, content.column_position(self.column)?))
    }

    /// Returns the element.
    pub fn element(&self) -> Option<E> {
        let state = self.state.read();
        self.coordinates(state.content())?;
        state.content().element_by_id(self.row, self.column).cloned()
    }

    /// Writes the element and returns the previous one. Does nothing once
    /// deleted.
    pub fn set_element(&self, element: impl Into<Option<E>>) -> Option<E> {
        let mut state = self.state.write();
        let (row, column) = self.coordinates(state.content())?;
        state.set_element(row, column, element)
    }

    /// Nulls the cell and returns the previous element.
    pub fn clear(&self) -> Option<E> {
        let mut state = self.state.write();
        let (row, column) = self.coordinates(state.content())?;
        state.remove_element(row, column)
    }

    /// Returns the live row position.
    pub fn row_index(&self) -> Option<usize> {
        self.coordinates(self.state.read().content()).map(|(row, _)| row)
    }

    /// Returns the live column position.
    pub fn column_index(&self) -> Option<usize> {
        self.coordinates(self.state.read().content()).map(|(_, column)| column)
    }

    /// Returns true once the row or column of the cell was removed.
    pub fn is_deleted(&self) -> bool {
        self.coordinates(self.state.read().content()).is_none()
    }

    /// Returns true if both handles address the same cell of the same table.
    pub fn is_same(&self, other: &Cell<E>) -> bool {
        Arc::ptr_eq(&self.state, &other.state) && self.row == other.row && self.column == other.column
    }

    /// Returns a handle of the row holding the cell.
    pub fn row(&self) -> Option<Row<E>> {
        let state = self.state.read();
        let position = state.content().row_position(self.row)?;
        Row::at(&self.state, state.content(), position)
    }

    /// Returns a handle of the column holding the cell.
    pub fn column(&self) -> Option<Column<E>> {
        let state = self.state.read();
        let position = state.content().column_position(self.column)?;
        Column::at(&self.state, state.content(), position)
    }
}

impl<E: Element> PartialEq for Cell<E> {
    fn eq(&self, other: &Self) -> bool {
        self.element() == other.element()
    }
}

// =============================================================================
// Table accessors
// =============================================================================

impl<E: Element> Table<E> {
    /// Returns a handle of the row at `row`.
    pub fn row(&self, row: usize) -> Option<Row<E>> {
        let state = self.shared().read();
        Row::at(self.shared(), state.content(), row)
    }

    /// Returns a handle of the column at `column`.
    pub fn column(&self, column: usize) -> Option<Column<E>> {
        let state = self.shared().read();
        Column::at(self.shared(), state.content(), column)
    }

    /// Returns a handle of the first row titled `title`.
    pub fn row_by_title(&self, title: &str) -> Option<Row<E>> {
        let state = self.shared().read();
        let row = state.row_index_of(title)?;
        Row::at(self.shared(), state.content(), row)
    }

    /// Returns a handle of the first column titled `title`.
    pub fn column_by_title(&self, title: &str) -> Option<Column<E>> {
        let state = self.shared().read();
        let column = state.column_index_of(title)?;
        Column::at(self.shared(), state.content(), column)
    }

    /// Returns a handle of the cell at (`row`, `column`).
    pub fn cell(&self, row: usize, column: usize) -> Option<Cell<E>> {
        let state = self.shared().read();
        let content = state.content();
        Some(Cell::new(
            Arc::clone(self.shared()),
            content.row_id(row)?,
            content.column_id(column)?,
        ))
    }

    /// Returns a handle of the last row.
    pub fn last_row(&self) -> Option<Row<E>> {
        let state = self.shared().read();
        let last = state.row_size().checked_sub(1)?;
        Row::at(self.shared(), state.content(), last)
    }

    /// Appends an empty row and returns its handle.
    pub fn new_row(&self) -> Option<Row<E>> {
        let mut state = self.shared().write();
        let row = state.add_row_elements(Vec::new());
        Row::at(self.shared(), state.content(), row)
    }

    /// Returns handles of all rows.
    pub fn rows(&self) -> Vec<Row<E>> {
        let state = self.shared().read();
        (0..state.row_size())
            .filter_map(|row| Row::at(self.shared(), state.content(), row))
            .collect()
    }

    /// Returns handles of the rows in `range`.
    pub fn rows_in(&self, range: Range<usize>) -> Vec<Row<E>> {
        let state = self.shared().read();
        range
            .filter_map(|row| Row::at(self.shared(), state.content(), row))
            .collect()
    }

    /// Returns handles of the rows whose bit is set in `filter`.
    pub fn rows_filtered(&self, filter: &BitSlice) -> Vec<Row<E>> {
        let state = self.shared().read();
        filter
            .iter_ones()
            .filter_map(|row| Row::at(self.shared(), state.content(), row))
            .collect()
    }

    /// Returns handles of all columns.
    pub fn columns(&self) -> Vec<Column<E>> {
        let state = self.shared().read();
        (0..state.column_size())
            .filter_map(|column| Column::at(self.shared(), state.content(), column))
            .collect()
    }

    /// Returns handles of the columns carrying the given titles, in the
    /// order of `titles`. Unknown titles are skipped.
    pub fn columns_by_titles(&self, titles: &[&str]) -> Vec<Column<E>> {
        let state = self.shared().read();
        titles
            .iter()
            .filter_map(|title| state.column_index_of(title))
            .filter_map(|column| Column::at(self.shared(), state.content(), column))
            .collect()
    }

    /// Returns handles of the columns whose title matches `pattern`.
    pub fn columns_matching(&self, pattern: &Regex) -> Vec<Column<E>> {
        let state = self.shared().read();
        let content = state.content();
        (0..content.column_count())
            .filter(|&column| content.column_title(column).is_some_and(|title| pattern.is_match(title)))
            .filter_map(|column| Column::at(self.shared(), content, column))
            .collect()
    }

    /// Returns handles of all cells, row by row.
    pub fn cells(&self) -> Vec<Cell<E>> {
        let state = self.shared().read();
        let content = state.content();
        content
            .rows()
            .iter()
            .flat_map(|row| {
                content
                    .columns()
                    .iter()
                    .map(move |column| (row.id(), column.id()))
            })
            .map(|(row, column)| Cell::new(Arc::clone(self.shared()), row, column))
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
    fn test_row_index_follows_shifts() {
        let table = filled(5, 2);
        let row = table.row(3).unwrap();
        table.remove_row(1);
        assert_eq!(row.index(), Some(2));
        table.insert_row_elements(0, ["x".to_string()]);
        assert_eq!(row.index(), Some(3));
        assert_eq!(row.element(0).as_deref(), Some("3:0"));
    }

    #[test]
    fn test_removed_row_reports_deleted() {
        let table = filled(3, 2);
        let row = table.row(1).unwrap();
        row.remove();
        assert!(row.is_deleted());
        assert!(row.elements().is_empty());
        assert_eq!(row.set_element(0, "x".to_string()), None);
        assert_eq!(table.row_size(), 2);
    }

    #[test]
    fn test_modified_flag() {
        let table = filled(3, 2);
        let row = table.row(0).unwrap();
        let other = table.row(1).unwrap();
        assert!(!row.is_modified());

        table.set_element(0, 1, "x".to_string());
        assert!(row.is_modified());
        assert!(!other.is_modified());

        table.add_column_elements(["c".to_string()]);
        assert!(other.is_modified());
    }

    #[test]
    fn test_switch_with_swaps_titles() {
        let table = filled(3, 2);
        table.set_row_titles(["r0", "r1", "r2"]);
        let row = table.row(0).unwrap();
        assert!(row.switch_with(2));
        assert_eq!(row.index(), Some(2));
        assert_eq!(table.row_title(0).as_deref(), Some("r2"));
        assert_eq!(table.element(0, 0).as_deref(), Some("2:0"));
    }

    #[test]
    fn test_column_handle() {
        let table = filled(3, 3);
        table.set_column_titles(["a", "b", "c"]);
        let column = table.column_by_title("b").unwrap();
        assert_eq!(column.size(), 3);
        assert_eq!(column.element(2).as_deref(), Some("2:1"));

        table.remove_column(0);
        assert_eq!(column.index(), Some(0));
        column.set_element(4, "grown".to_string());
        assert_eq!(table.row_size(), 5);
        assert_eq!(table.element(4, 0).as_deref(), Some("grown"));
    }

    #[test]
    fn test_cell_handle_tracks_position() {
        let table = filled(3, 3);
        let cell = table.cell(2, 2).unwrap();
        table.insert_row_elements(0, ["x".to_string()]);
        assert_eq!(cell.row_index(), Some(3));
        assert_eq!(cell.element().as_deref(), Some("2:2"));

        let same = table.cell(3, 2).unwrap();
        assert!(cell.is_same(&same));
        assert_eq!(cell, same);

        table.remove_column(2);
        assert!(cell.is_deleted());
        assert_eq!(cell.element(), None);
    }

    #[test]
    fn test_out_of_range_handles_are_none() {
        let table = filled(2, 2);
        assert!(table.row(2).is_none());
        assert!(table.column(5).is_none());
        assert!(table.cell(0, 2).is_none());
    }

    #[test]
    fn test_transpose_invalidates_handles() {
        let table = filled(2, 3);
        let row = table.row(0).unwrap();
        table.transpose();
        assert!(row.is_deleted());
        assert!(table.column(0).is_some_and(|column| column.id() == row.id()));
    }

    #[test]
    fn test_move_to() {
        let table = filled(4, 1);
        let row = table.row(0).unwrap();
        assert!(row.move_to(3));
        assert_eq!(
            table.column_elements(0).unwrap(),
            ["1:0", "2:0", "3:0", "0:0"].map(|e| Some(e.to_string())).to_vec()
        );
    }
}
