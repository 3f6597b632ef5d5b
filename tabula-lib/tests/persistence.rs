mod common;

use std::sync::Arc;

use tabula_lib::Table;
use tabula_lib::error::CollectingExceptionHandler;
use tabula_lib::error::PersistenceError;
use tabula_lib::persistence::FileFormat;
use tabula_lib::persistence::FileTablePersistence;
use tabula_lib::persistence::InMemoryTablePersistence;
use tabula_lib::persistence::StoredRow;
use tabula_lib::persistence::TablePersistence;

use common::filled_table;
use common::init_logger;
use common::text;

#[test]
fn test_attach_pushes_existing_rows() {
    init_logger();
    let table = filled_table(3, 2);
    let store = Arc::new(InMemoryTablePersistence::<String>::new());
    table.persistence().attach(store.clone());

    assert_eq!(store.rows(), table.to_matrix());
    assert_eq!(table.persistence().len(), 1);
}

#[test]
fn test_attach_hydrates_table() {
    let store = Arc::new(InMemoryTablePersistence::with_rows(vec![
        vec![text("a"), None],
        vec![text("b"), text("c")],
    ]));
    let table: Table<String> = Table::new();
    table.persistence().attach(store.clone());

    assert_eq!(table.row_size(), 2);
    assert_eq!(table.element(1, 1), text("c"));
    assert_eq!(store.len(), 2);
}

#[test]
fn test_hydration_merges_with_existing_rows() {
    let store = Arc::new(InMemoryTablePersistence::with_rows(vec![vec![text("stored")]]));
    let table = filled_table(2, 1);
    table.persistence().attach(store.clone());

    assert_eq!(table.column_elements(0), Some(vec![text("stored"), text("0:0"), text("1:0")]));
    assert_eq!(store.rows(), table.to_matrix());
}

#[test]
fn test_store_follows_mutations() {
    let table = filled_table(4, 3);
    let store = Arc::new(InMemoryTablePersistence::<String>::new());
    table.persistence().attach(store.clone());
    let in_sync = || assert_eq!(store.rows(), table.to_matrix());

    table.set_element(1, 1, "x".to_string());
    in_sync();
    table.set_element(5, 4, "grown".to_string());
    in_sync();
    table.remove_row(0);
    in_sync();
    table.insert_row_elements(2, ["inserted".to_string()]);
    in_sync();
    table.remove_column(1);
    in_sync();
    table.insert_column_elements(0, ["left".to_string()]);
    in_sync();
    table.sort().descending().by(1);
    in_sync();
    table.swap_rows(0, 3);
    in_sync();
    table.transpose();
    in_sync();
    table.clear();
    assert!(store.is_empty());
}

#[test]
fn test_detach_stops_sync() {
    let table = filled_table(2, 2);
    let store = Arc::new(InMemoryTablePersistence::<String>::new());
    let handle: Arc<dyn TablePersistence<String>> = store.clone();
    table.persistence().attach(handle.clone());

    assert!(table.persistence().detach(&handle));
    assert!(!table.persistence().detach(&handle));
    table.remove_row(0);
    assert_eq!(store.len(), 2);
}

#[test]
fn test_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    for format in [FileFormat::Json, FileFormat::Bincode] {
        let path = dir.path().join(format!("{format:?}.store"));
        let table = filled_table(3, 3);
        table
            .persistence()
            .attach(Arc::new(FileTablePersistence::<String>::open(&path, format).unwrap()));
        table.set_element(0, 0, "changed".to_string());
        table.remove_element(2, 2);
        table.remove_row(1);

        let reopened: Table<String> = Table::new();
        reopened
            .persistence()
            .attach(Arc::new(FileTablePersistence::<String>::open(&path, format).unwrap()));
        assert!(reopened.equals_in_content(&table), "{format:?}");
        assert_eq!(reopened.element(1, 2), None);
    }
}

struct BrokenStore;

impl TablePersistence<String> for BrokenStore {
    fn all_elements(&self) -> Result<Vec<StoredRow<String>>, PersistenceError> {
        Ok(Vec::new())
    }

    fn add(&self, row: usize, _elements: &[Option<String>]) -> Result<(), PersistenceError> {
        Err(PersistenceError::row_out_of_range(row, 0))
    }

    fn update(&self, row: usize, _elements: &[Option<String>]) -> Result<(), PersistenceError> {
        Err(PersistenceError::row_out_of_range(row, 0))
    }

    fn remove(&self, row: usize) -> Result<(), PersistenceError> {
        Err(PersistenceError::row_out_of_range(row, 0))
    }

    fn remove_all(&self) -> Result<(), PersistenceError> {
        Ok(())
    }
}

#[test]
fn test_store_failures_reach_exception_handler() {
    let table = filled_table(1, 1);
    let errors = Arc::new(CollectingExceptionHandler::new());
    table.set_exception_handler(errors.clone());
    table.persistence().attach(Arc::new(BrokenStore));
    assert_eq!(errors.messages().len(), 1);

    table.set_element(0, 0, "kept".to_string());
    assert_eq!(table.element(0, 0), text("kept"));
    assert_eq!(errors.messages().len(), 2);
    assert!(errors.messages()[1].starts_with("Persistence error"));
}
