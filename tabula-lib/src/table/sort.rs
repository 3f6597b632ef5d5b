//! Row sorting

use std::cmp::Ordering;

use super::Table;
use crate::content::Element;

/// Sorts the rows of a table by one column.
///
/// Sorting is stable and puts null cells first. Rows move together with
/// their titles, so row handles keep pointing at the same data.
///
/// # Example
///
/// ```
/// use tabula_lib::Table;
///
/// let table: Table<i32> = Table::from_rows([[3, 30], [1, 10], [2, 20]]);
/// table.sort().by(0);
/// assert_eq!(table.column_elements(1).unwrap(), vec![Some(10), Some(20), Some(30)]);
///
/// table.sort().descending().by(1);
/// assert_eq!(table.element(0, 0), Some(3));
/// ```
pub struct TableSorter<'a, E> {
    table: &'a Table<E>,
    descending: bool,
}

impl<'a, E: Element> TableSorter<'a, E> {
    /// Reverses the sort order.
    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    /// Sorts with a custom comparator instead of the natural order.
    pub fn using<F>(self, comparator: F) -> ComparatorSorter<'a, E, F>
    where
        F: Fn(&E, &E) -> Ordering,
    {
        ComparatorSorter {
            table: self.table,
            descending: self.descending,
            comparator,
        }
    }

    /// Sorts by the natural order of `column`. Returns false if the column
    /// does not exist.
    pub fn by(self, column: usize) -> bool
    where
        E: Ord,
    {
        sort_rows(self.table, column, self.descending, Ord::cmp)
    }
}

/// Row sorter with a custom comparator.
pub struct ComparatorSorter<'a, E, F> {
    table: &'a Table<E>,
    descending: bool,
    comparator: F,
}

impl<E: Element, F> ComparatorSorter<'_, E, F>
where
    F: Fn(&E, &E) -> Ordering,
{
    /// Reverses the sort order.
    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    /// Sorts by `column`. Returns false if the column does not exist.
    pub fn by(self, column: usize) -> bool {
        sort_rows(self.table, column, self.descending, self.comparator)
    }
}

fn sort_rows<E: Element>(
    table: &Table<E>,
    column: usize,
    descending: bool,
    comparator: impl Fn(&E, &E) -> Ordering,
) -> bool {
    table.execute_with_write_lock(|state| {
        let Some(keys) = state.column_elements(column) else {
            return false;
        };
        let mut order: Vec<usize> = (0..keys.len()).collect();
        order.sort_by(|&a, &b| {
            let ordering = match (&keys[a], &keys[b]) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => comparator(a, b),
            };
            if descending { ordering.reverse() } else { ordering }
        });
        if order.iter().enumerate().any(|(position, &row)| position != row) {
            state.reorder_rows(&order);
        }
        log::debug!("[table] sorted {} rows by column {}", order.len(), column);
        true
    })
}

impl<E: Element> Table<E> {
    /// Returns a sorter for the rows of this table.
    pub fn sort(&self) -> TableSorter<'_, E> {
        TableSorter {
            table: self,
            descending: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Table;

    #[test]
    fn test_sort_moves_titles_and_handles() {
        let table: Table<String> = Table::from_rows([["b", "2"], ["c", "3"], ["a", "1"]].map(|row| row.map(String::from)));
        table.set_row_titles(["rb", "rc", "ra"]);
        let row = table.row(2).unwrap();

        assert!(table.sort().by(0));
        assert_eq!(table.row_titles(), vec![Some("ra".to_string()), Some("rb".to_string()), Some("rc".to_string())]);
        assert_eq!(row.index(), Some(0));
        assert_eq!(row.element(1).as_deref(), Some("1"));
    }

    #[test]
    fn test_sort_nulls_first_and_stable() {
        let table: Table<i32> = Table::from_rows([[Some(2), Some(0)], [None, Some(1)], [Some(2), Some(2)], [Some(1), Some(3)]]);
        table.sort().by(0);
        assert_eq!(
            table.column_elements(1).unwrap(),
            vec![Some(1), Some(3), Some(0), Some(2)]
        );
    }

    #[test]
    fn test_sort_with_comparator() {
        let table: Table<String> = Table::from_rows([["bb"], ["a"], ["ccc"]].map(|row| row.map(String::from)));
        table.sort().using(|a: &String, b: &String| a.len().cmp(&b.len())).descending().by(0);
        assert_eq!(table.element(0, 0).as_deref(), Some("ccc"));
        assert!(!table.sort().by(3));
    }
}
