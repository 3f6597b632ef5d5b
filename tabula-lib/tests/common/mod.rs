#![allow(dead_code)]

use simplelog::Config;
use simplelog::LevelFilter;
use simplelog::TestLogger;
use tabula_lib::Table;

/// Routes library logging to the test harness output.
pub fn init_logger() {
    let _ = TestLogger::init(LevelFilter::Debug, Config::default());
}

/// Builds a table where each cell holds "row:column".
pub fn filled_table(rows: usize, columns: usize) -> Table<String> {
    Table::from_rows((0..rows).map(|row| (0..columns).map(move |column| format!("{row}:{column}"))))
}

/// Same as [`filled_table`] with titles "c{i}" and "r{i}" and the name
/// "table name".
pub fn filled_table_with_titles(rows: usize, columns: usize) -> Table<String> {
    let table = filled_table(rows, columns);
    table.set_column_titles((0..columns).map(|column| format!("c{column}")));
    table.set_row_titles((0..rows).map(|row| format!("r{row}")));
    table.set_table_name("table name");
    table
}

pub fn text(value: &str) -> Option<String> {
    Some(value.to_string())
}
