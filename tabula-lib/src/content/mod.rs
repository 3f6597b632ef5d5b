//! Two-dimensional table storage
//!
//! A [`TableContent`] owns two [`StripeList`]s and one cell map shared by
//! both. A cell is addressed by the ids of its two stripes, so inserting,
//! removing or reordering stripes never moves a cell, and transposing only
//! swaps which list plays the role of the rows.

mod resolver;
mod snapshot;
mod stripe;

pub use resolver::*;
pub use snapshot::*;
pub use stripe::*;

use std::collections::HashMap;

/// Bound shared by every element type a table can hold.
pub trait Element: Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static {}

impl<T> Element for T where T: Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static {}

/// Address of one cell in the shared cell map.
///
/// The key is ordered by physical list, not by orientation, so it survives
/// a transposition unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellKey {
    first: StripeId,
    second: StripeId,
}

impl CellKey {
    fn physical(list: usize, id: StripeId, cross: StripeId) -> Self {
        if list == 0 {
            Self {
                first: id,
                second: cross,
            }
        } else {
            Self {
                first: cross,
                second: id,
            }
        }
    }
}

/// A row or column that has been removed, with the elements it held.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedStripe<E> {
    /// Id the stripe had.
    pub id: StripeId,
    /// Title the stripe had.
    pub title: Option<String>,
    /// Elements the stripe held, in orthogonal order.
    pub elements: Vec<Option<E>>,
}

/// The owning storage of one table.
#[derive(Debug, Clone)]
pub struct TableContent<E> {
    name: Option<String>,
    lists: [StripeList; 2],
    transposed: bool,
    cells: HashMap<CellKey, E>,
    next_id: u64,
}

impl<E> Default for TableContent<E> {
    fn default() -> Self {
        Self {
            name: None,
            lists: [StripeList::new(), StripeList::new()],
            transposed: false,
            cells: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<E> TableContent<E> {
    /// Creates an empty content.
    pub fn new() -> Self {
        Self::default()
    }

    fn row_list(&self) -> usize {
        usize::from(self.transposed)
    }

    fn column_list(&self) -> usize {
        usize::from(!self.transposed)
    }

    /// Returns the row stripes.
    pub fn rows(&self) -> &StripeList {
        &self.lists[self.row_list()]
    }

    /// Returns the column stripes.
    pub fn columns(&self) -> &StripeList {
        &self.lists[self.column_list()]
    }

    pub(crate) fn key(&self, row: StripeId, column: StripeId) -> CellKey {
        CellKey::physical(self.row_list(), row, column)
    }

    /// Returns the table name.
    pub fn table_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_table_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows().len()
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns().len()
    }

    /// Returns true if the roles of both stripe lists are swapped.
    pub fn is_transposed(&self) -> bool {
        self.transposed
    }

    /// Returns the element at (`row`, `column`), `None` for a null cell or
    /// a coordinate outside the table.
    pub fn element(&self, row: usize, column: usize) -> Option<&E> {
        let row = self.rows().id_at(row)?;
        let column = self.columns().id_at(column)?;
        self.cells.get(&self.key(row, column))
    }

    /// Returns the element addressed by two stripe ids.
    pub fn element_by_id(&self, row: StripeId, column: StripeId) -> Option<&E> {
        self.cells.get(&self.key(row, column))
    }

    /// Returns the title of `row`.
    pub fn row_title(&self, row: usize) -> Option<&str> {
        self.rows().get(row).and_then(StripeData::title)
    }

    /// Returns the title of `column`.
    pub fn column_title(&self, column: usize) -> Option<&str> {
        self.columns().get(column).and_then(StripeData::title)
    }

    /// Returns all row titles in order.
    pub fn row_titles(&self) -> Vec<Option<String>> {
        self.rows().titles()
    }

    /// Returns all column titles in order.
    pub fn column_titles(&self) -> Vec<Option<String>> {
        self.columns().titles()
    }

    /// Returns true if any row carries a title.
    pub fn has_row_titles(&self) -> bool {
        self.rows().iter().any(|stripe| stripe.title().is_some())
    }

    /// Returns true if any column carries a title.
    pub fn has_column_titles(&self) -> bool {
        self.columns().iter().any(|stripe| stripe.title().is_some())
    }

    /// Returns the id of the row at `row`.
    pub fn row_id(&self, row: usize) -> Option<StripeId> {
        self.rows().id_at(row)
    }

    /// Returns the id of the column at `column`.
    pub fn column_id(&self, column: usize) -> Option<StripeId> {
        self.columns().id_at(column)
    }

    /// Returns the live position of a row.
    pub fn row_position(&self, id: StripeId) -> Option<usize> {
        self.rows().position_of(id)
    }

    /// Returns the live position of a column.
    pub fn column_position(&self, id: StripeId) -> Option<usize> {
        self.columns().position_of(id)
    }

    fn allocate_id(&mut self) -> StripeId {
        let id = StripeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert_stripe(&mut self, list: usize, at: usize, elements: Vec<Option<E>>) -> usize {
        let id = self.allocate_id();
        let cross_ids = self.lists[1 - list].ids();
        for (cross, element) in cross_ids.into_iter().zip(elements) {
            if let Some(element) = element {
                self.cells.insert(CellKey::physical(list, id, cross), element);
            }
        }
        let position = self.lists[list].insert(at, StripeData::new(id));
        self.lists[1 - list].touch_all();
        position
    }

    fn remove_stripe(&mut self, list: usize, at: usize) -> Option<RemovedStripe<E>> {
        let mut stripe = self.lists[list].remove(at)?;
        let cross_ids = self.lists[1 - list].ids();
        let elements = cross_ids
            .into_iter()
            .map(|cross| self.cells.remove(&CellKey::physical(list, stripe.id(), cross)))
            .collect();
        self.lists[1 - list].touch_all();
        Some(RemovedStripe {
            id: stripe.id(),
            title: stripe.take_title(),
            elements,
        })
    }

    /// Inserts a row at `at` (clamped to the row count). Elements beyond the
    /// current column count are dropped.
    pub(crate) fn insert_row(&mut self, at: usize, elements: Vec<Option<E>>) -> usize {
        self.insert_stripe(self.row_list(), at, elements)
    }

    /// Inserts a column at `at` (clamped to the column count). Elements beyond
    /// the current row count are dropped.
    pub(crate) fn insert_column(&mut self, at: usize, elements: Vec<Option<E>>) -> usize {
        self.insert_stripe(self.column_list(), at, elements)
    }

    /// Removes a row and its cells from every column.
    pub(crate) fn remove_row(&mut self, at: usize) -> Option<RemovedStripe<E>> {
        self.remove_stripe(self.row_list(), at)
    }

    /// Removes a column and its cells from every row.
    pub(crate) fn remove_column(&mut self, at: usize) -> Option<RemovedStripe<E>> {
        self.remove_stripe(self.column_list(), at)
    }

    /// Writes a cell inside the current bounds and returns the previous
    /// element. Coordinates outside the table are ignored.
    pub(crate) fn set(&mut self, row: usize, column: usize, element: Option<E>) -> Option<E> {
        let (row_list, column_list) = (self.row_list(), self.column_list());
        let (Some(row_id), Some(column_id)) = (self.rows().id_at(row), self.columns().id_at(column)) else {
            return None;
        };
        let key = self.key(row_id, column_id);
        let previous = match element {
            Some(element) => self.cells.insert(key, element),
            None => self.cells.remove(&key),
        };
        if let Some(stripe) = self.lists[row_list].get_mut(row) {
            stripe.touch();
        }
        if let Some(stripe) = self.lists[column_list].get_mut(column) {
            stripe.touch();
        }
        previous
    }

    pub(crate) fn set_row_title(&mut self, row: usize, title: Option<String>) -> bool {
        let list = self.row_list();
        match self.lists[list].get_mut(row) {
            Some(stripe) => {
                stripe.set_title(title);
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_column_title(&mut self, column: usize, title: Option<String>) -> bool {
        let list = self.column_list();
        match self.lists[list].get_mut(column) {
            Some(stripe) => {
                stripe.set_title(title);
                true
            }
            None => false,
        }
    }

    pub(crate) fn swap_rows(&mut self, a: usize, b: usize) -> bool {
        let list = self.row_list();
        self.lists[list].swap(a, b)
    }

    pub(crate) fn swap_columns(&mut self, a: usize, b: usize) -> bool {
        let list = self.column_list();
        let swapped = self.lists[list].swap(a, b);
        if swapped {
            self.lists[1 - list].touch_all();
        }
        swapped
    }

    pub(crate) fn move_row(&mut self, from: usize, to: usize) -> bool {
        let list = self.row_list();
        self.lists[list].move_stripe(from, to)
    }

    pub(crate) fn reorder_rows(&mut self, order: &[usize]) {
        let list = self.row_list();
        self.lists[list].reorder(order);
    }

    /// Swaps the roles of rows and columns.
    pub(crate) fn transpose(&mut self) {
        self.transposed = !self.transposed;
    }

    /// Removes every stripe and cell. The table name is kept.
    pub(crate) fn clear(&mut self) {
        self.lists[0].clear();
        self.lists[1].clear();
        self.cells.clear();
    }
}

impl<E: Clone> TableContent<E> {
    /// Returns a copy of the elements of `row`.
    pub fn row_elements(&self, row: usize) -> Option<Vec<Option<E>>> {
        let row = self.rows().id_at(row)?;
        Some(
            self.columns()
                .iter()
                .map(|column| self.cells.get(&self.key(row, column.id())).cloned())
                .collect(),
        )
    }

    /// Returns a copy of the elements of `column`.
    pub fn column_elements(&self, column: usize) -> Option<Vec<Option<E>>> {
        let column = self.columns().id_at(column)?;
        Some(
            self.rows()
                .iter()
                .map(|row| self.cells.get(&self.key(row.id(), column)).cloned())
                .collect(),
        )
    }

    /// Returns a copy of all rows.
    pub fn to_rows(&self) -> Vec<Vec<Option<E>>> {
        (0..self.row_count())
            .filter_map(|row| self.row_elements(row))
            .collect()
    }

    /// Builds a content from row vectors. Short rows are padded with nulls.
    pub fn from_rows(rows: Vec<Vec<Option<E>>>) -> Self {
        let mut content = Self::new();
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        content.grow_to(0, columns);
        for row in rows {
            let at = content.row_count();
            content.insert_row(at, row);
        }
        content
    }
}

impl<E: PartialEq> TableContent<E> {
    /// Returns true if both contents have the same size and elements.
    pub fn equals_in_content(&self, other: &Self) -> bool {
        if self.row_count() != other.row_count() || self.column_count() != other.column_count() {
            return false;
        }
        (0..self.row_count()).all(|row| {
            (0..self.column_count()).all(|column| self.element(row, column) == other.element(row, column))
        })
    }

    /// Returns true if both contents are equal in elements, titles and name.
    pub fn equals_in_content_and_metadata(&self, other: &Self) -> bool {
        self.equals_in_content(other)
            && self.name == other.name
            && self.row_titles() == other.row_titles()
            && self.column_titles() == other.column_titles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(rows: usize, columns: usize) -> TableContent<String> {
        TableContent::from_rows(
            (0..rows)
                .map(|row| (0..columns).map(|column| Some(format!("{row}:{column}"))).collect())
                .collect(),
        )
    }

    #[test]
    fn test_from_rows_pads_short_rows() {
        let content = TableContent::from_rows(vec![vec![Some(1)], vec![Some(2), Some(3)]]);
        assert_eq!(content.row_count(), 2);
        assert_eq!(content.column_count(), 2);
        assert_eq!(content.element(0, 1), None);
        assert_eq!(content.element(1, 1), Some(&3));
    }

    #[test]
    fn test_remove_row_drops_cells_from_columns() {
        let mut content = filled(3, 2);
        let removed = content.remove_row(1).unwrap();
        assert_eq!(removed.elements, vec![Some("1:0".to_string()), Some("1:1".to_string())]);
        assert_eq!(content.column_elements(0).unwrap(), vec![Some("0:0".to_string()), Some("2:0".to_string())]);
        assert_eq!(content.cells.len(), 4);
    }

    #[test]
    fn test_remove_column_drops_cells_from_rows() {
        let mut content = filled(2, 3);
        content.remove_column(0);
        assert_eq!(content.row_elements(1).unwrap(), vec![Some("1:1".to_string()), Some("1:2".to_string())]);
        assert_eq!(content.cells.len(), 4);
    }

    #[test]
    fn test_transpose_swaps_roles() {
        let mut content = filled(2, 3);
        content.set_row_title(0, Some("r0".to_string()));
        content.transpose();
        assert_eq!(content.row_count(), 3);
        assert_eq!(content.column_count(), 2);
        assert_eq!(content.element(2, 1).map(String::as_str), Some("1:2"));
        assert_eq!(content.column_title(0), Some("r0"));

        content.transpose();
        assert!(content.equals_in_content_and_metadata(&{
            let mut original = filled(2, 3);
            original.set_row_title(0, Some("r0".to_string()));
            original
        }));
    }

    #[test]
    fn test_insert_after_transpose_uses_fresh_ids() {
        let mut content = filled(1, 1);
        content.transpose();
        let at = content.row_count();
        content.insert_row(at, vec![Some("new".to_string())]);
        assert_eq!(content.element(1, 0).map(String::as_str), Some("new"));
        assert_eq!(content.element(0, 0).map(String::as_str), Some("0:0"));
    }

    #[test]
    fn test_set_touches_both_stripes() {
        let mut content = filled(2, 2);
        let row_revision = content.rows().get(0).unwrap().revision();
        let other_row = content.rows().get(1).unwrap().revision();
        content.set(0, 1, None);
        assert!(content.rows().get(0).unwrap().revision() > row_revision);
        assert_eq!(content.rows().get(1).unwrap().revision(), other_row);
        assert_eq!(content.element(0, 1), None);
    }
}
