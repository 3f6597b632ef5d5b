//! Copies and conversions of a table

use std::collections::BTreeMap;
use std::ops::Range;

use super::Table;
use crate::content::Element;
use crate::content::TableContent;

impl<E: Element> Table<E> {
    /// Returns a copy of all rows.
    pub fn to_matrix(&self) -> Vec<Vec<Option<E>>> {
        self.execute_with_read_lock(|state| state.content().to_rows())
    }

    /// Returns the rows keyed by their element in `key_column`. Rows with a
    /// null key are skipped; a later row replaces an earlier one with an
    /// equal key.
    pub fn to_sorted_map(&self, key_column: usize) -> BTreeMap<E, Vec<Option<E>>>
    where
        E: Ord,
    {
        self.execute_with_read_lock(|state| {
            state
                .content()
                .to_rows()
                .into_iter()
                .filter_map(|row| Some((row.get(key_column)?.clone()?, row)))
                .collect()
        })
    }

    /// Returns the elements of `value_column` keyed by `key_column`.
    pub fn to_sorted_map_of(&self, key_column: usize, value_column: usize) -> BTreeMap<E, Option<E>>
    where
        E: Ord,
    {
        self.execute_with_read_lock(|state| {
            (0..state.row_size())
                .filter_map(|row| {
                    let key = state.element(row, key_column)?.clone();
                    Some((key, state.element(row, value_column).cloned()))
                })
                .collect()
        })
    }

    /// Copies the area `rows` x `columns` into a new table, keeping the
    /// titles of the copied stripes and the table name. Ranges are clamped to
    /// the table size.
    pub fn sub_table(&self, rows: Range<usize>, columns: Range<usize>) -> Table<E> {
        let content = self.execute_with_read_lock(|state| {
            let source = state.content();
            let rows = rows.start.min(source.row_count())..rows.end.min(source.row_count());
            let columns = columns.start.min(source.column_count())..columns.end.min(source.column_count());

            let mut content = TableContent::from_rows(
                rows.clone()
                    .map(|row| {
                        columns
                            .clone()
                            .map(|column| source.element(row, column).cloned())
                            .collect()
                    })
                    .collect(),
            );
            content.grow_to(rows.len(), columns.len());
            for (target, row) in rows.enumerate() {
                content.set_row_title(target, source.row_title(row).map(str::to_string));
            }
            for (target, column) in columns.enumerate() {
                content.set_column_title(target, source.column_title(column).map(str::to_string));
            }
            content.set_table_name(source.table_name().map(str::to_string));
            content
        });
        Table::from_content(content)
    }

    /// Returns a transposed copy; this table is left unchanged.
    pub fn transposed(&self) -> Table<E> {
        let copy = self.clone();
        copy.transpose();
        copy
    }

    /// Applies `convert` to every element of the rows in `rows` under one
    /// write lock.
    pub fn apply_to_rows(&self, rows: Range<usize>, mut convert: impl FnMut(Option<E>) -> Option<E>) {
        self.execute_with_write_lock(|state| {
            let rows = rows.start..rows.end.min(state.row_size());
            for row in rows {
                for column in 0..state.column_size() {
                    let converted = convert(state.element(row, column).cloned());
                    state.set_element(row, column, converted);
                }
            }
        });
    }
}
