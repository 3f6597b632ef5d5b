//! CSV format (RFC 4180)
//!
//! An empty unquoted field is null, while `""` is the empty string. The
//! optional records come in this order: table name, column title header,
//! then the data rows, each optionally led by its row title.

use std::fmt::Display;
use std::str::FromStr;

use super::MarshalConfig;
use super::parse_optional;
use crate::content::TableContent;
use crate::content::TableSnapshot;
use crate::error::MarshalError;

type Record = Vec<Option<String>>;

pub(super) fn write<E: Display>(content: &TableContent<E>, config: &MarshalConfig) -> String {
    let delimiter = config.csv_delimiter;
    let mut out = String::new();

    if config.include_table_name {
        write_record(&mut out, delimiter, [content.table_name().map(str::to_string)]);
    }

    if config.include_column_titles {
        let corner = config.include_row_titles.then_some(None);
        let titles = content.column_titles();
        write_record(&mut out, delimiter, corner.into_iter().chain(titles));
    }

    for row in 0..content.row_count() {
        let title = config
            .include_row_titles
            .then(|| content.row_title(row).map(str::to_string));
        let elements = (0..content.column_count())
            .map(|column| content.element(row, column).map(ToString::to_string));
        write_record(&mut out, delimiter, title.into_iter().chain(elements));
    }

    out
}

fn write_record(out: &mut String, delimiter: char, fields: impl IntoIterator<Item = Option<String>>) {
    for (index, field) in fields.into_iter().enumerate() {
        if index > 0 {
            out.push(delimiter);
        }
        if let Some(text) = field {
            write_field(out, delimiter, &text);
        }
    }
    out.push('\n');
}

fn write_field(out: &mut String, delimiter: char, text: &str) {
    let quote = text.is_empty() || text.contains([delimiter, '"', '\n', '\r']);
    if quote {
        out.push('"');
        out.push_str(&text.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(text);
    }
}

pub(super) fn read<E>(input: &str, config: &MarshalConfig) -> Result<TableSnapshot<E>, MarshalError>
where
    E: FromStr,
    <E as FromStr>::Err: Display,
{
    let mut records = parse_records(input, config.csv_delimiter)?.into_iter();
    let mut snapshot = TableSnapshot::default();

    if config.include_table_name {
        snapshot.table_name = records.next().and_then(|record| record.into_iter().next().flatten());
    }

    if config.include_column_titles
        && let Some(mut header) = records.next()
    {
        if config.include_row_titles && !header.is_empty() {
            header.remove(0);
        }
        snapshot.column_titles = header;
    }

    for mut record in records {
        if config.include_row_titles {
            let title = if record.is_empty() { None } else { record.remove(0) };
            snapshot.row_titles.push(title);
        }
        let row = record.into_iter().map(parse_optional).collect::<Result<_, _>>()?;
        snapshot.rows.push(row);
    }

    let width = snapshot.rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut snapshot.rows {
        row.resize_with(width, || None);
    }
    Ok(snapshot)
}

/// Field being assembled by the record parser.
#[derive(Default)]
struct Field {
    text: String,
    started: bool,
    quoted: bool,
    in_quotes: bool,
}

impl Field {
    fn take(&mut self) -> Option<String> {
        let field = std::mem::take(self);
        (field.quoted || !field.text.is_empty()).then_some(field.text)
    }
}

fn parse_records(input: &str, delimiter: char) -> Result<Vec<Record>, MarshalError> {
    let mut records = Vec::new();
    let mut record = Record::new();
    let mut field = Field::default();
    let mut line = 1;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if field.in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.text.push('"');
                }
                '"' => field.in_quotes = false,
                _ => {
                    if c == '\n' {
                        line += 1;
                    }
                    field.text.push(c);
                }
            }
            continue;
        }

        match c {
            _ if c == delimiter => record.push(field.take()),
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(field.take());
                records.push(std::mem::take(&mut record));
                line += 1;
            }
            '"' if !field.started => {
                field.started = true;
                field.quoted = true;
                field.in_quotes = true;
            }
            '"' => return Err(MarshalError::syntax("csv", line, "quote inside unquoted field")),
            _ if field.quoted => {
                return Err(MarshalError::syntax("csv", line, "characters after closing quote"));
            }
            _ => {
                field.started = true;
                field.text.push(c);
            }
        }
    }

    if field.in_quotes {
        return Err(MarshalError::syntax("csv", line, "unterminated quoted field"));
    }
    if field.started || !record.is_empty() {
        record.push(field.take());
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting() {
        let content = TableContent::from_rows(vec![vec![
            Some("a,b".to_string()),
            Some("say \"hi\"".to_string()),
            Some(String::new()),
            None,
            Some("two\nlines".to_string()),
        ]]);
        let csv = write(&content, &MarshalConfig::default());
        assert_eq!(csv, "\"a,b\",\"say \"\"hi\"\"\",\"\",,\"two\nlines\"\n");

        let snapshot: TableSnapshot<String> = read(&csv, &MarshalConfig::default()).unwrap();
        assert_eq!(snapshot.rows, content.to_rows());
    }

    #[test]
    fn test_metadata_records() {
        let mut content = TableContent::from_rows(vec![vec![Some(1), Some(2)]]);
        content.set_table_name(Some("numbers".to_string()));
        content.set_column_title(1, Some("b".to_string()));
        content.set_row_title(0, Some("r".to_string()));

        let config = MarshalConfig::all_metadata().with_csv_delimiter(';');
        let csv = write(&content, &config);
        assert_eq!(csv, "numbers\n;;b\nr;1;2\n");

        let snapshot: TableSnapshot<i32> = read(&csv, &config).unwrap();
        assert_eq!(snapshot, content.snapshot());
    }

    #[test]
    fn test_crlf_and_short_rows() {
        let snapshot: TableSnapshot<i32> = read("1,2\r\n3\r\n", &MarshalConfig::default()).unwrap();
        assert_eq!(snapshot.rows, vec![vec![Some(1), Some(2)], vec![Some(3), None]]);
    }

    #[test]
    fn test_unterminated_quote_fails() {
        let result = read::<String>("a,\"b\n", &MarshalConfig::default());
        assert!(matches!(result, Err(MarshalError::Syntax { .. })));
    }

    #[test]
    fn test_bad_element_fails() {
        let result = read::<i32>("1,x\n", &MarshalConfig::default());
        assert!(matches!(result, Err(MarshalError::Element { value, .. }) if value == "x"));
    }
}
