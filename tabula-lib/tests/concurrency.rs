mod common;

use std::thread;
use std::time::Duration;

use common::filled_table;
use common::filled_table_with_titles;

#[test]
fn test_reads_under_read_lock_are_stable() {
    let table = filled_table(20, 3);

    thread::scope(|scope| {
        for _ in 0..10 {
            scope.spawn(|| {
                for _ in 0..5 {
                    let (first, second) = table.execute_with_read_lock(|state| {
                        let first = state.row_elements(10);
                        thread::sleep(Duration::from_millis(2));
                        (first, state.row_elements(10))
                    });
                    assert_eq!(first, second);
                }
            });
        }

        scope.spawn(|| {
            for step in 0..20 {
                table.execute_with_write_lock(|state| {
                    for column in 0..3 {
                        state.set_element(10, column, format!("step {step}"));
                    }
                });
                thread::sleep(Duration::from_millis(1));
            }
        });
    });

    assert_eq!(table.row_elements(10), Some(vec![Some("step 19".to_string()); 3]));
}

#[test]
fn test_crossed_comparisons_with_queued_writers() {
    let left = filled_table_with_titles(10, 3);
    let right = left.clone();

    thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..500 {
                let _ = left == right;
            }
        });
        scope.spawn(|| {
            for _ in 0..500 {
                let _ = right.equals_in_content(&left);
            }
        });
        for table in [&left, &right] {
            scope.spawn(move || {
                for step in 0..500 {
                    table.set_element(0, 0, format!("step {step}"));
                }
            });
        }
    });

    assert!(left.equals_in_content_and_metadata(&right));
}

#[test]
fn test_concurrent_writers_keep_every_row() {
    let table = filled_table(0, 0);

    thread::scope(|scope| {
        for writer in 0..8 {
            let table = &table;
            scope.spawn(move || {
                for row in 0..50 {
                    table.add_row_elements([format!("{writer}:{row}")]);
                }
            });
        }
    });

    assert_eq!(table.row_size(), 400);
    let index = table.index().of(0).unwrap();
    assert_eq!(index.len(), 400);
}
