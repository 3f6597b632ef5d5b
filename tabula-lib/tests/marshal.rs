mod common;

use tabula_lib::Table;
use tabula_lib::error::MarshalError;
use tabula_lib::marshal::Format;
use tabula_lib::marshal::MarshalConfig;

use common::filled_table_with_titles;
use common::init_logger;
use common::text;

const FORMATS: [Format; 5] = [Format::Json, Format::Xml, Format::Xhtml, Format::Csv, Format::PlainText];

fn configs() -> Vec<MarshalConfig> {
    vec![
        MarshalConfig::default(),
        MarshalConfig::default().with_column_titles(true),
        MarshalConfig::default().with_row_titles(true),
        MarshalConfig::default().with_table_name(true),
        MarshalConfig::all_metadata(),
        MarshalConfig::all_metadata().with_csv_delimiter(';'),
    ]
}

/// Table with awkward elements and titles: empty strings, nulls, delimiters,
/// markup, escapes and surrounding whitespace.
fn awkward_table() -> Table<String> {
    let table: Table<String> = Table::from_rows([
        [text("plain"), text(""), None, text("a,b;c")],
        [text("say \"hi\""), text("<tag> & 'x'"), text("two\nlines\r\n"), text("  padded  ")],
        [text("|!=\\"), text("\"\""), text(" "), None],
    ]);
    table.set_table_name("awkward | name");
    table.set_column_titles(["first", "", "th|rd"]);
    table.set_row_title(0, "");
    table.set_row_title(2, "last row");
    table
}

fn round_trip(table: &Table<String>, format: Format, config: &MarshalConfig) -> Table<String> {
    let text = table
        .serializer()
        .marshal(format, config)
        .unwrap_or_else(|error| panic!("{format} marshal failed: {error}"));
    let copy: Table<String> = Table::new();
    copy.serializer()
        .unmarshal(format, config, &text)
        .unwrap_or_else(|error| panic!("{format} unmarshal failed: {error}\n{text}"));
    copy
}

/// The table as seen through `config`: metadata that is not written is not
/// expected back.
fn expected(table: &Table<String>, config: &MarshalConfig) -> Table<String> {
    let expected = Table::from_rows(table.to_matrix());
    if config.include_table_name
        && let Some(name) = table.table_name()
    {
        expected.set_table_name(name);
    }
    if config.include_column_titles {
        for (column, title) in table.column_titles().into_iter().enumerate() {
            if let Some(title) = title {
                expected.set_column_title(column, title);
            }
        }
    }
    if config.include_row_titles {
        for (row, title) in table.row_titles().into_iter().enumerate() {
            if let Some(title) = title {
                expected.set_row_title(row, title);
            }
        }
    }
    expected
}

#[test]
fn test_round_trip_every_format_and_config() {
    init_logger();
    let tables = [
        awkward_table(),
        filled_table_with_titles(1, 1),
        filled_table_with_titles(1, 4),
        filled_table_with_titles(12, 3),
    ];
    for table in &tables {
        for format in FORMATS {
            for config in configs() {
                let copy = round_trip(table, format, &config);
                assert!(
                    copy.equals_in_content_and_metadata(&expected(table, &config)),
                    "{format} with {config:?} changed {table:?} into {copy:?}"
                );
            }
        }
    }
}

#[test]
fn test_round_trip_empty_table() {
    let table: Table<String> = Table::new();
    for format in FORMATS {
        for config in [MarshalConfig::default(), MarshalConfig::all_metadata()] {
            let copy = round_trip(&table, format, &config);
            assert_eq!(copy.row_size(), 0, "{format}");
            assert_eq!(copy.column_size(), 0, "{format}");
        }
    }
}

#[test]
fn test_round_trip_rows_without_columns() {
    let table: Table<String> = Table::new();
    for _ in 0..3 {
        table.add_row_elements(Vec::<String>::new());
    }
    for format in FORMATS {
        for config in configs() {
            let copy = round_trip(&table, format, &config);
            assert_eq!(copy.row_size(), 3, "{format}");
            if format == Format::Csv && !config.include_row_titles {
                // An empty CSV record is one null field.
                assert_eq!(copy.column_size(), 1, "{format}");
                assert_eq!(copy.column_elements(0), Some(vec![None; 3]));
            } else {
                assert_eq!(copy.column_size(), 0, "{format}");
            }
        }
    }
}

#[test]
fn test_unmarshal_replaces_content() {
    let source = filled_table_with_titles(2, 2);
    let target = filled_table_with_titles(5, 5);
    let config = MarshalConfig::all_metadata();
    let json = source.serializer().marshal(Format::Json, &config).unwrap();

    target.serializer().unmarshal(Format::Json, &config, &json).unwrap();
    assert_eq!(target, source);
}

#[test]
fn test_failed_unmarshal_leaves_table_unchanged() {
    let table = filled_table_with_titles(2, 2);
    let before = table.clone();
    let result = table
        .serializer()
        .unmarshal(Format::Xml, &MarshalConfig::default(), "<table><rows><row><cell>x</row></rows></table>");
    assert!(matches!(result, Err(MarshalError::Syntax { .. })));
    assert_eq!(table, before);
}

#[test]
fn test_numeric_elements() {
    let table: Table<i64> = Table::from_rows([[Some(1), None], [Some(-20), Some(300)]]);
    for format in FORMATS {
        let config = MarshalConfig::default();
        let text = table.serializer().marshal(format, &config).unwrap();
        let copy: Table<i64> = Table::new();
        copy.serializer().unmarshal(format, &config, &text).unwrap();
        assert!(copy.equals_in_content(&table), "{format}");
    }

    let copy: Table<i64> = Table::new();
    let result = copy
        .serializer()
        .unmarshal(Format::Csv, &MarshalConfig::default(), "1,two\n");
    assert!(matches!(result, Err(MarshalError::Element { value, .. }) if value == "two"));
}

#[test]
fn test_writer_and_reader() {
    let table = filled_table_with_titles(3, 2);
    let config = MarshalConfig::all_metadata();
    let mut buffer = Vec::new();
    table
        .serializer()
        .marshal_to_writer(Format::Xhtml, &config, &mut buffer)
        .unwrap();

    let copy: Table<String> = Table::new();
    copy.serializer()
        .unmarshal_from_reader(Format::Xhtml, &config, buffer.as_slice())
        .unwrap();
    assert_eq!(copy, table);
}

#[test]
fn test_display_renders_plain_text() {
    let table = filled_table_with_titles(2, 2);
    assert_eq!(
        table.to_string(),
        "=table name=\n!  !c0 !c1 !\n!r0!0:0|0:1|\n!r1!1:0|1:1|\n------------\n"
    );

    let bare: Table<i32> = Table::from_rows([[1, 22]]);
    assert_eq!(bare.to_string(), "|1|22|\n------\n");
}

#[test]
fn test_csv_layout() {
    let table = filled_table_with_titles(2, 2);
    let csv = table
        .serializer()
        .marshal(Format::Csv, &MarshalConfig::all_metadata())
        .unwrap();
    assert_eq!(csv, "table name\n,c0,c1\nr0,0:0,0:1\nr1,1:0,1:1\n");
}
