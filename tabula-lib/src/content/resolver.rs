//! Coordinate to storage translation

use std::ops::Range;

use super::CellKey;
use super::TableContent;

/// Stripes appended by a growing resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Growth {
    /// Positions of the rows that were appended.
    pub rows: Range<usize>,
    /// Positions of the columns that were appended.
    pub columns: Range<usize>,
}

impl Growth {
    /// Returns true if nothing was appended.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.columns.is_empty()
    }
}

/// Translates positions and titles into cells and stripes.
///
/// Reads never create anything and return `None` outside the table.
/// The `resolve_or_create_*` variants grow the table until the requested
/// coordinate exists.
pub trait CellAndStripeResolver {
    /// Returns the key of the cell at (`row`, `column`).
    fn resolve_cell(&self, row: usize, column: usize) -> Option<CellKey>;

    /// Appends rows and columns until (`row`, `column`) exists. `None` if
    /// the coordinate lies beyond the addressable range.
    fn resolve_or_create_cell_within_new_table_area(&mut self, row: usize, column: usize)
    -> Option<(CellKey, Growth)>;

    /// Returns the position of the first row titled `title`.
    fn resolve_row_by_title(&self, title: &str) -> Option<usize>;

    /// Returns the position of the first column titled `title`.
    fn resolve_column_by_title(&self, title: &str) -> Option<usize>;

    /// Returns the row titled `title`, appending one if none exists.
    fn resolve_or_create_row_by_title(&mut self, title: &str) -> (usize, Growth);

    /// Returns the column titled `title`, appending one if none exists.
    fn resolve_or_create_column_by_title(&mut self, title: &str) -> (usize, Growth);
}

impl<E> TableContent<E> {
    /// Appends empty rows and columns until the table holds at least `rows`
    /// rows and `columns` columns.
    pub(crate) fn grow_to(&mut self, rows: usize, columns: usize) -> Growth {
        let first_column = self.column_count();
        while self.column_count() < columns {
            let at = self.column_count();
            self.insert_column(at, Vec::new());
        }
        let first_row = self.row_count();
        while self.row_count() < rows {
            let at = self.row_count();
            self.insert_row(at, Vec::new());
        }
        let growth = Growth {
            rows: first_row..self.row_count(),
            columns: first_column..self.column_count(),
        };
        if !growth.is_empty() {
            log::trace!("[table] grew by {} rows and {} columns", growth.rows.len(), growth.columns.len());
        }
        growth
    }
}

impl<E> CellAndStripeResolver for TableContent<E> {
    fn resolve_cell(&self, row: usize, column: usize) -> Option<CellKey> {
        let row = self.row_id(row)?;
        let column = self.column_id(column)?;
        Some(self.key(row, column))
    }

    fn resolve_or_create_cell_within_new_table_area(
        &mut self,
        row: usize,
        column: usize,
    ) -> Option<(CellKey, Growth)> {
        let growth = self.grow_to(row.checked_add(1)?, column.checked_add(1)?);
        let key = self.resolve_cell(row, column)?;
        Some((key, growth))
    }

    fn resolve_row_by_title(&self, title: &str) -> Option<usize> {
        self.rows().position_of_title(title)
    }

    fn resolve_column_by_title(&self, title: &str) -> Option<usize> {
        self.columns().position_of_title(title)
    }

    fn resolve_or_create_row_by_title(&mut self, title: &str) -> (usize, Growth) {
        if let Some(row) = self.resolve_row_by_title(title) {
            return (row, Growth::default());
        }
        let row = self.row_count();
        let growth = self.grow_to(row.saturating_add(1), 0);
        self.set_row_title(row, Some(title.to_string()));
        (row, growth)
    }

    fn resolve_or_create_column_by_title(&mut self, title: &str) -> (usize, Growth) {
        if let Some(column) = self.resolve_column_by_title(title) {
            return (column, Growth::default());
        }
        let column = self.column_count();
        let growth = self.grow_to(0, column.saturating_add(1));
        self.set_column_title(column, Some(title.to_string()));
        (column, growth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_cell_out_of_bounds() {
        let content = TableContent::from_rows(vec![vec![Some(1), Some(2)]]);
        assert!(content.resolve_cell(0, 1).is_some());
        assert!(content.resolve_cell(1, 0).is_none());
        assert!(content.resolve_cell(0, 2).is_none());
    }

    #[test]
    fn test_resolve_or_create_grows() {
        let mut content: TableContent<i32> = TableContent::new();
        let (key, growth) = content.resolve_or_create_cell_within_new_table_area(2, 1).unwrap();
        assert_eq!(growth.rows, 0..3);
        assert_eq!(growth.columns, 0..2);
        assert_eq!(content.resolve_cell(2, 1), Some(key));

        let (_, growth) = content.resolve_or_create_cell_within_new_table_area(1, 1).unwrap();
        assert!(growth.is_empty());
    }

    #[test]
    fn test_resolve_or_create_rejects_unaddressable_cell() {
        let mut content: TableContent<i32> = TableContent::new();
        assert!(content.resolve_or_create_cell_within_new_table_area(usize::MAX, 0).is_none());
        assert!(content.resolve_or_create_cell_within_new_table_area(0, usize::MAX).is_none());
        assert_eq!(content.row_count(), 0);
        assert_eq!(content.column_count(), 0);
    }

    #[test]
    fn test_resolve_by_title() {
        let mut content: TableContent<i32> = TableContent::new();
        let (column, growth) = content.resolve_or_create_column_by_title("price");
        assert_eq!(column, 0);
        assert_eq!(growth.columns, 0..1);
        assert_eq!(content.resolve_column_by_title("price"), Some(0));
        assert_eq!(content.resolve_column_by_title("amount"), None);
        assert_eq!(content.resolve_or_create_column_by_title("price").0, 0);
        assert_eq!(content.resolve_row_by_title("price"), None);
    }
}
