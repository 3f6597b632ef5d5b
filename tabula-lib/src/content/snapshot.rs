//! Detached, serializable table copies

use serde::Deserialize;
use serde::Serialize;

use super::TableContent;

/// A detached copy of a table's content and metadata.
///
/// This is the JSON document shape and the element layout of file stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSnapshot<E> {
    /// Table name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    /// Column titles, empty when not recorded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub column_titles: Vec<Option<String>>,
    /// Row titles, empty when not recorded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub row_titles: Vec<Option<String>>,
    /// Elements row by row, `None` for null cells.
    pub rows: Vec<Vec<Option<E>>>,
}

impl<E> Default for TableSnapshot<E> {
    fn default() -> Self {
        Self {
            table_name: None,
            column_titles: Vec::new(),
            row_titles: Vec::new(),
            rows: Vec::new(),
        }
    }
}

impl<E: Clone> TableContent<E> {
    /// Copies the content into a snapshot.
    pub fn snapshot(&self) -> TableSnapshot<E> {
        TableSnapshot {
            table_name: self.table_name().map(str::to_string),
            column_titles: self.column_titles(),
            row_titles: self.row_titles(),
            rows: self.to_rows(),
        }
    }

    /// Builds a content from a snapshot. Titles may outnumber the rows or
    /// columns, in which case the table is grown to hold them.
    pub fn from_snapshot(snapshot: TableSnapshot<E>) -> Self {
        let mut content = Self::from_rows(snapshot.rows);
        content.grow_to(snapshot.row_titles.len(), snapshot.column_titles.len());
        for (row, title) in snapshot.row_titles.into_iter().enumerate() {
            content.set_row_title(row, title);
        }
        for (column, title) in snapshot.column_titles.into_iter().enumerate() {
            content.set_column_title(column, title);
        }
        content.set_table_name(snapshot.table_name);
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_keeps_metadata() {
        let mut content = TableContent::from_rows(vec![vec![Some(1), None], vec![Some(3), Some(4)]]);
        content.set_table_name(Some("numbers".to_string()));
        content.set_column_title(1, Some("b".to_string()));

        let snapshot = content.snapshot();
        assert_eq!(snapshot.column_titles, vec![None, Some("b".to_string())]);
        assert_eq!(snapshot.rows[0], vec![Some(1), None]);

        let restored = TableContent::from_snapshot(snapshot);
        assert!(restored.equals_in_content_and_metadata(&content));
    }

    #[test]
    fn test_titles_grow_empty_table() {
        let snapshot: TableSnapshot<i32> = TableSnapshot {
            column_titles: vec![Some("a".to_string()), Some("b".to_string())],
            ..TableSnapshot::default()
        };
        let content = TableContent::from_snapshot(snapshot);
        assert_eq!(content.row_count(), 0);
        assert_eq!(content.column_count(), 2);
    }

    #[test]
    fn test_default_needs_no_element_default() {
        #[derive(Debug, Clone, PartialEq)]
        struct Opaque(u8);

        let mut snapshot: TableSnapshot<Opaque> = TableSnapshot::default();
        assert_eq!(snapshot.table_name, None);
        assert!(snapshot.rows.is_empty());

        snapshot.rows.push(vec![Some(Opaque(1)), None]);
        let content = TableContent::from_snapshot(snapshot);
        assert_eq!(content.element(0, 0), Some(&Opaque(1)));
    }
}
