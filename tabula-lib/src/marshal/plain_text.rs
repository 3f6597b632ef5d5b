//! Framed plain text format
//!
//! ```text
//! =table name=
//! !  !c0 !c1 !
//! !r0!0:0|0:1|
//! !r1!1:0|1:1|
//! ------------
//! ```
//!
//! The name line pads the name with `=`, the header separates titles with
//! `!`, data lines separate elements with `|` and the closing rule is made
//! of `-`. Tokens are padded with spaces to the column width. A null value
//! is an empty token and the empty string is written as `""`. Special
//! characters and trailing spaces are escaped with a backslash.

use std::fmt::Display;
use std::str::FromStr;

use super::MarshalConfig;
use super::parse_optional;
use crate::content::Element;
use crate::content::TableContent;
use crate::content::TableSnapshot;
use crate::error::MarshalError;
use crate::table::Table;

const FORMAT: &str = "plain text";

fn escape(text: &str) -> String {
    let trimmed = text.trim_end_matches(' ');
    let mut escaped = String::with_capacity(text.len());
    for c in trimmed.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '|' => escaped.push_str("\\|"),
            '!' => escaped.push_str("\\!"),
            '=' => escaped.push_str("\\e"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    for _ in trimmed.len()..text.len() {
        escaped.push_str("\\s");
    }
    escaped
}

fn unescape(token: &str, line: usize) -> Result<String, MarshalError> {
    let mut text = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            text.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => text.push('\\'),
            Some('|') => text.push('|'),
            Some('!') => text.push('!'),
            Some('e') => text.push('='),
            Some('"') => text.push('"'),
            Some('n') => text.push('\n'),
            Some('r') => text.push('\r'),
            Some('t') => text.push('\t'),
            Some('s') => text.push(' '),
            Some(other) => return Err(MarshalError::syntax(FORMAT, line, format!("unknown escape '\\{other}'"))),
            None => return Err(MarshalError::syntax(FORMAT, line, "dangling escape")),
        }
    }
    Ok(text)
}

fn token(value: Option<&str>) -> String {
    match value {
        None => String::new(),
        Some("") => "\"\"".to_string(),
        Some(text) => escape(text),
    }
}

fn decode_token(raw: &str, line: usize) -> Result<Option<String>, MarshalError> {
    match raw.trim_end_matches(' ') {
        "" => Ok(None),
        "\"\"" => Ok(Some(String::new())),
        text => unescape(text, line).map(Some),
    }
}

fn width(text: &str) -> usize {
    text.chars().count()
}

fn pad(out: &mut String, text: &str, width: usize) {
    out.push_str(text);
    for _ in self::width(text)..width {
        out.push(' ');
    }
}

pub(super) fn write<E: Display>(content: &TableContent<E>, config: &MarshalConfig) -> String {
    let column_titles: Vec<String> = (0..content.column_count())
        .map(|column| token(content.column_title(column)))
        .collect();
    let row_titles: Vec<String> = (0..content.row_count())
        .map(|row| token(content.row_title(row)))
        .collect();
    let cells: Vec<Vec<String>> = (0..content.row_count())
        .map(|row| {
            (0..content.column_count())
                .map(|column| token(content.element(row, column).map(ToString::to_string).as_deref()))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = if config.include_column_titles {
        column_titles.iter().map(|title| width(title)).collect()
    } else {
        vec![0; content.column_count()]
    };
    for row in &cells {
        for (column, cell) in row.iter().enumerate() {
            widths[column] = widths[column].max(width(cell));
        }
    }
    let title_width = row_titles.iter().map(|title| width(title)).max().unwrap_or(0);

    let mut lines = Vec::new();
    if config.include_column_titles {
        let mut line = String::from("!");
        if config.include_row_titles {
            pad(&mut line, "", title_width);
            line.push('!');
        }
        for (title, width) in column_titles.iter().zip(&widths) {
            pad(&mut line, title, *width);
            line.push('!');
        }
        lines.push(line);
    }
    for (row, elements) in cells.iter().enumerate() {
        let mut line = String::new();
        if config.include_row_titles {
            line.push('!');
            pad(&mut line, &row_titles[row], title_width);
            line.push('!');
        } else {
            line.push('|');
        }
        for (cell, width) in elements.iter().zip(&widths) {
            pad(&mut line, cell, *width);
            line.push('|');
        }
        lines.push(line);
    }

    let name = config.include_table_name.then(|| token(content.table_name()));
    let body_width = lines.iter().map(|line| width(line)).max().unwrap_or(0);
    let name_width = name.as_deref().map(|name| width(name) + 2).unwrap_or(0);
    let total = body_width.max(name_width).max(2);

    let mut out = String::new();
    if let Some(name) = name {
        let space = total - width(&name);
        let left = space / 2;
        out.push_str(&"=".repeat(left));
        out.push_str(&name);
        out.push_str(&"=".repeat(space - left));
        out.push('\n');
    }
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&"-".repeat(total));
    out.push('\n');
    out
}

/// Splits `text` on unescaped `delimiter`s. Every token must be closed by
/// a delimiter.
fn split_tokens<'a>(text: &'a str, delimiter: char, line: usize) -> Result<Vec<&'a str>, MarshalError> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (index, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == delimiter {
            tokens.push(&text[start..index]);
            start = index + c.len_utf8();
        }
    }
    if start != text.len() {
        return Err(MarshalError::syntax(FORMAT, line, format!("expected '{delimiter}' at end of line")));
    }
    Ok(tokens)
}

fn decode_all(raw: Vec<&str>, line: usize) -> Result<Vec<Option<String>>, MarshalError> {
    raw.into_iter().map(|token| decode_token(token, line)).collect()
}

pub(super) fn read<E>(input: &str, config: &MarshalConfig) -> Result<TableSnapshot<E>, MarshalError>
where
    E: FromStr,
    <E as FromStr>::Err: Display,
{
    let mut lines = input.lines().enumerate().map(|(index, line)| (index + 1, line));
    let mut next_line = |expected: &str| {
        lines
            .next()
            .ok_or_else(|| MarshalError::structure(FORMAT, format!("missing {expected}")))
    };
    let mut snapshot = TableSnapshot::default();

    if config.include_table_name {
        let (number, line) = next_line("name line")?;
        let inner = line
            .strip_prefix('=')
            .and_then(|line| line.strip_suffix('='))
            .ok_or_else(|| MarshalError::syntax(FORMAT, number, "name line must be framed by '='"))?;
        snapshot.table_name = decode_token(inner.trim_matches('='), number)?;
    }

    if config.include_column_titles {
        let (number, line) = next_line("column title header")?;
        let rest = line
            .strip_prefix('!')
            .ok_or_else(|| MarshalError::syntax(FORMAT, number, "header must start with '!'"))?;
        let mut raw = split_tokens(rest, '!', number)?;
        if config.include_row_titles && !raw.is_empty() {
            raw.remove(0);
        }
        snapshot.column_titles = decode_all(raw, number)?;
    }

    loop {
        let (number, line) = next_line("closing rule")?;
        if line.starts_with('-') {
            break;
        }
        let cells = if config.include_row_titles {
            let (title, cells) = line
                .strip_prefix('!')
                .and_then(|rest| split_first(rest, '!'))
                .ok_or_else(|| MarshalError::syntax(FORMAT, number, "row must start with a '!' framed title"))?;
            snapshot.row_titles.push(decode_token(title, number)?);
            cells
        } else {
            line.strip_prefix('|')
                .ok_or_else(|| MarshalError::syntax(FORMAT, number, "row must start with '|'"))?
        };
        let row = decode_all(split_tokens(cells, '|', number)?, number)?
            .into_iter()
            .map(parse_optional)
            .collect::<Result<_, _>>()?;
        snapshot.rows.push(row);
    }

    let width = snapshot.rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut snapshot.rows {
        row.resize_with(width, || None);
    }
    Ok(snapshot)
}

/// Splits `text` at its first unescaped `delimiter`.
fn split_first(text: &str, delimiter: char) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (index, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == delimiter {
            return Some((&text[..index], &text[index + c.len_utf8()..]));
        }
    }
    None
}

/// Renders the table as plain text, including whatever metadata is set.
impl<E: Element + Display> Display for Table<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = self.execute_with_read_lock(|state| {
            let content = state.content();
            let config = MarshalConfig::default()
                .with_table_name(content.table_name().is_some())
                .with_column_titles(content.has_column_titles())
                .with_row_titles(content.has_row_titles());
            write(content, &config)
        });
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled() -> TableContent<String> {
        let mut content = TableContent::from_rows(
            (0..2)
                .map(|row| (0..2).map(|column| Some(format!("{row}:{column}"))).collect())
                .collect(),
        );
        content.set_table_name(Some("table name".to_string()));
        for index in 0..2 {
            content.set_column_title(index, Some(format!("c{index}")));
            content.set_row_title(index, Some(format!("r{index}")));
        }
        content
    }

    #[test]
    fn test_layout() {
        let text = write(&titled(), &MarshalConfig::all_metadata());
        assert_eq!(
            text,
            "=table name=\n!  !c0 !c1 !\n!r0!0:0|0:1|\n!r1!1:0|1:1|\n------------\n"
        );
    }

    #[test]
    fn test_layout_without_metadata() {
        let text = write(&titled(), &MarshalConfig::default());
        assert_eq!(text, "|0:0|0:1|\n|1:0|1:1|\n---------\n");
    }

    #[test]
    fn test_escapes_read_back() {
        let content = TableContent::from_rows(vec![vec![
            Some("a|b!c=d".to_string()),
            Some("back\\slash \"quoted\"".to_string()),
            Some("trailing  ".to_string()),
            Some(String::new()),
            None,
            Some("line\nbreak\ttab".to_string()),
        ]]);
        let text = write(&content, &MarshalConfig::default());
        assert!(text.contains("trailing\\s\\s"));

        let snapshot: TableSnapshot<String> = read(&text, &MarshalConfig::default()).unwrap();
        assert_eq!(snapshot.rows, content.to_rows());
    }

    #[test]
    fn test_metadata_reads_back() {
        let content = titled();
        let config = MarshalConfig::all_metadata();
        let snapshot: TableSnapshot<String> = read(&write(&content, &config), &config).unwrap();
        assert_eq!(snapshot, content.snapshot());
    }

    #[test]
    fn test_null_and_empty_name() {
        let mut content: TableContent<String> = TableContent::new();
        let config = MarshalConfig::default().with_table_name(true);
        assert_eq!(write(&content, &config), "==\n--\n");

        content.set_table_name(Some(String::new()));
        let text = write(&content, &config);
        assert_eq!(text, "=\"\"=\n----\n");
        let snapshot: TableSnapshot<String> = read(&text, &config).unwrap();
        assert_eq!(snapshot.table_name, Some(String::new()));
    }

    #[test]
    fn test_missing_rule_fails() {
        let result = read::<String>("|a|\n", &MarshalConfig::default());
        assert!(matches!(result, Err(MarshalError::Structure { .. })));
    }
}
