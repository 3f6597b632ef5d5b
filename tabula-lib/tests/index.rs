mod common;

use tabula_lib::Table;

use common::filled_table;
use common::text;

#[test]
fn test_index_follows_updates() {
    let table = filled_table(100, 5);
    let index = table.index().of(1).unwrap();
    assert_eq!(index.len(), 100);
    assert!(index.contains_key(&"0:1".to_string()));
    assert!(!index.contains_key(&"0:0".to_string()));

    table.set_element(0, 1, "xxx".to_string());
    assert!(!index.contains_key(&"0:1".to_string()));
    assert!(index.contains_key(&"xxx".to_string()));

    let cells = index.get(&"10:1".to_string());
    assert_eq!(cells.len(), 1);
    assert_eq!(cells[0].row_index(), Some(10));
    assert_eq!(cells[0].element(), text("10:1"));

    table.clear();
    assert!(index.is_empty());
}

#[test]
fn test_index_is_reused() {
    let table = filled_table(3, 3);
    let first = table.index().of(2).unwrap();
    let second = table.index().of(2).unwrap();
    assert!(first.ptr_eq(&second));
    assert_eq!(table.index().len(), 1);
    assert!(table.index().of(3).is_none());
}

#[test]
fn test_index_tracks_row_changes() {
    let table: Table<i32> = Table::from_rows([[5, 1], [3, 2], [5, 3]]);
    let index = table.index().of(0).unwrap();
    assert_eq!(index.keys(), vec![3, 5]);
    assert_eq!(index.get(&5).len(), 2);

    table.remove_row(0);
    assert_eq!(index.get(&5).len(), 1);
    assert_eq!(index.get(&5)[0].row_index(), Some(1));

    table.add_row_elements([Some(7), None]);
    assert_eq!(index.last_key(), Some(7));

    table.insert_column_elements(0, [Some(0)]);
    assert_eq!(index.column_index(), Some(1));
    assert_eq!(index.first_key(), Some(3));

    let range: Vec<i32> = index.range(4..).into_iter().map(|(key, _)| key).collect();
    assert_eq!(range, vec![5, 7]);
}

#[test]
fn test_index_empties_when_column_removed() {
    let table: Table<i32> = Table::from_rows([[1, 2], [3, 4]]);
    let index = table.index().of(1).unwrap();
    table.remove_column(1);
    assert!(index.is_empty());
    assert_eq!(index.column_index(), None);
    assert!(table.index().is_empty());

    table.set_element(0, 1, 9);
    assert!(index.is_empty());
}

#[test]
fn test_dropped_index_is_unregistered() {
    let table: Table<i32> = Table::from_rows([[1, 2], [3, 4]]);
    let index = table.index().of(0).unwrap();
    let keyed = table.index().keyed("sum", |row: &[Option<i32>]| Some(row.iter().flatten().sum::<i32>()));
    assert_eq!(table.index().len(), 2);

    drop(index);
    assert_eq!(table.index().len(), 1);
    table.set_element(0, 0, 10);
    assert!(keyed.contains_key(&12));

    drop(keyed);
    assert!(table.index().is_empty());

    let rebuilt = table.index().of(0).unwrap();
    assert_eq!(rebuilt.keys(), vec![3, 10]);
    assert_eq!(table.index().len(), 1);
}

#[test]
fn test_index_follows_its_stripe_through_transpose() {
    let table: Table<i32> = Table::from_rows([[1, 2], [3, 4]]);
    let index = table.index().of(0).unwrap();

    table.transpose();
    assert!(index.is_empty());
    assert_eq!(index.column_index(), None);

    table.transpose();
    assert_eq!(index.keys(), vec![1, 3]);
    assert_eq!(index.column_index(), Some(0));
}

#[test]
fn test_keyed_index_over_whole_rows() {
    let table = filled_table(4, 3);
    let index = table.index().keyed("joined", |row: &[Option<String>]| {
        let first = row.first()?.as_deref()?;
        let last = row.last()?.as_deref()?;
        Some(format!("{first}|{last}"))
    });
    assert_eq!(index.len(), 4);
    assert!(index.contains_key(&"2:0|2:2".to_string()));

    table.set_element(2, 2, "z".to_string());
    assert!(index.contains_key(&"2:0|z".to_string()));
    assert!(!index.contains_key(&"2:0|2:2".to_string()));

    table.sort().descending().by(0);
    let rows = index.get(&"3:0|3:2".to_string());
    assert_eq!(rows[0].index(), Some(0));

    let same = table.index().keyed("joined", |_: &[Option<String>]| None::<String>);
    assert!(same.ptr_eq(&index));
    assert_eq!(index.head(&"1".to_string()).len(), 1);
}
