//! Table mutation events and observers

use crate::content::RemovedStripe;
use crate::content::TableContent;
use crate::error::TableError;

/// One structural or cell change, as seen by observers.
///
/// Observers run synchronously under the write lock of the mutation and see
/// the content as it is after the change.
#[derive(Debug)]
pub enum TableEvent<'a, E> {
    /// A row was inserted at `row`; later rows shifted down by one.
    AddedRow { row: usize },
    /// The row at `row` was removed; later rows shifted up by one.
    RemovedRow { row: usize, removed: &'a RemovedStripe<E> },
    /// A column was inserted at `column`.
    AddedColumn { column: usize },
    /// The column at `column` was removed.
    RemovedColumn { column: usize, removed: &'a RemovedStripe<E> },
    /// The cell at (`row`, `column`) changed from `previous`.
    UpdatedCell {
        row: usize,
        column: usize,
        previous: Option<&'a E>,
    },
    /// All rows and columns were removed.
    Cleared,
    /// Rows or columns changed order without being added or removed.
    Reordered,
    /// Rows and columns swapped roles.
    Transposed,
}

/// Observer of table mutations.
///
/// Every method defaults to doing nothing. An error returned from a method is
/// passed to the table's exception handler; the mutation itself is kept.
pub trait TableEventHandler<E>: Send + Sync {
    /// Called after a row was inserted.
    fn on_added_row(&self, _content: &TableContent<E>, _row: usize) -> Result<(), TableError> {
        Ok(())
    }

    /// Called after a row was removed.
    fn on_removed_row(
        &self,
        _content: &TableContent<E>,
        _row: usize,
        _removed: &RemovedStripe<E>,
    ) -> Result<(), TableError> {
        Ok(())
    }

    /// Called after a column was inserted.
    fn on_added_column(&self, _content: &TableContent<E>, _column: usize) -> Result<(), TableError> {
        Ok(())
    }

    /// Called after a column was removed.
    fn on_removed_column(
        &self,
        _content: &TableContent<E>,
        _column: usize,
        _removed: &RemovedStripe<E>,
    ) -> Result<(), TableError> {
        Ok(())
    }

    /// Called after a cell changed.
    fn on_updated_cell(
        &self,
        _content: &TableContent<E>,
        _row: usize,
        _column: usize,
        _previous: Option<&E>,
    ) -> Result<(), TableError> {
        Ok(())
    }

    /// Called after the table was cleared.
    fn on_cleared(&self, _content: &TableContent<E>) -> Result<(), TableError> {
        Ok(())
    }

    /// Called after rows or columns were reordered.
    fn on_reordered(&self, _content: &TableContent<E>) -> Result<(), TableError> {
        Ok(())
    }

    /// Called after the table was transposed.
    fn on_transposed(&self, _content: &TableContent<E>) -> Result<(), TableError> {
        Ok(())
    }

    /// Routes an event to the matching method.
    fn handle(&self, content: &TableContent<E>, event: &TableEvent<'_, E>) -> Result<(), TableError> {
        match *event {
            TableEvent::AddedRow { row } => self.on_added_row(content, row),
            TableEvent::RemovedRow { row, removed } => self.on_removed_row(content, row, removed),
            TableEvent::AddedColumn { column } => self.on_added_column(content, column),
            TableEvent::RemovedColumn { column, removed } => self.on_removed_column(content, column, removed),
            TableEvent::UpdatedCell { row, column, previous } => {
                self.on_updated_cell(content, row, column, previous)
            }
            TableEvent::Cleared => self.on_cleared(content),
            TableEvent::Reordered => self.on_reordered(content),
            TableEvent::Transposed => self.on_transposed(content),
        }
    }
}
