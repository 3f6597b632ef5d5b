//! XML and XHTML formats

use std::fmt::Display;

use super::MarshalConfig;
use super::parse_optional;
use super::xml_reader::XmlCursor;
use super::xml_reader::XmlToken;
use super::xml_reader::attribute;
use crate::content::TableContent;
use crate::content::TableSnapshot;
use crate::error::MarshalError;

const PROLOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Escapes a string for use in XML text and attribute values.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
        .replace('\r', "&#13;")
}

/// Renders a value element, marking `None` with `null_marker`.
fn value_element(tag: &str, value: Option<&str>, null_marker: &str) -> String {
    match value {
        Some(text) => format!("<{tag}>{}</{tag}>", escape_xml(text)),
        None => format!("<{tag} {null_marker}/>"),
    }
}

// =============================================================================
// XML
// =============================================================================

pub(super) fn write_xml<E: Display>(content: &TableContent<E>, config: &MarshalConfig) -> String {
    const NULL: &str = r#"null="true""#;

    let mut out = String::new();
    out.push_str(PROLOG);
    out.push('\n');
    match (config.include_table_name, content.table_name()) {
        (true, Some(name)) => out.push_str(&format!(r#"<table name="{}">"#, escape_xml(name))),
        _ => out.push_str("<table>"),
    }
    out.push('\n');

    if config.include_column_titles {
        out.push_str("  <columnTitles>\n");
        for column in 0..content.column_count() {
            out.push_str("    ");
            out.push_str(&value_element("title", content.column_title(column), NULL));
            out.push('\n');
        }
        out.push_str("  </columnTitles>\n");
    }

    out.push_str("  <rows>\n");
    for row in 0..content.row_count() {
        match (config.include_row_titles, content.row_title(row)) {
            (true, Some(title)) => out.push_str(&format!(r#"    <row title="{}">"#, escape_xml(title))),
            _ => out.push_str("    <row>"),
        }
        for column in 0..content.column_count() {
            let text = content.element(row, column).map(ToString::to_string);
            out.push_str(&value_element("cell", text.as_deref(), NULL));
        }
        out.push_str("</row>\n");
    }
    out.push_str("  </rows>\n");
    out.push_str("</table>\n");
    out
}

pub(super) fn read_xml<E>(input: &str) -> Result<TableSnapshot<E>, MarshalError>
where
    E: std::str::FromStr,
    <E as std::str::FromStr>::Err: Display,
{
    let mut cursor = XmlCursor::new(input, "xml")?;
    let (attributes, empty) = cursor.seek_start("table")?;
    let mut snapshot = TableSnapshot {
        table_name: attribute(&attributes, "name").map(str::to_string),
        ..TableSnapshot::default()
    };
    if empty {
        return Ok(snapshot);
    }

    loop {
        match cursor.next_significant()? {
            XmlToken::Start { name, empty, .. } if name == "columnTitles" => {
                if !empty {
                    snapshot.column_titles = read_values(&mut cursor, "columnTitles", "title")?;
                }
            }
            XmlToken::Start { name, empty, .. } if name == "rows" => {
                if !empty {
                    read_rows(&mut cursor, &mut snapshot)?;
                }
            }
            XmlToken::End { name, .. } if name == "table" => break,
            other => return Err(cursor.unexpected(&other)),
        }
    }

    Ok(snapshot)
}

/// Reads `item` value elements up to the end tag `parent`.
fn read_values(cursor: &mut XmlCursor, parent: &str, item: &str) -> Result<Vec<Option<String>>, MarshalError> {
    let mut values = Vec::new();
    loop {
        match cursor.next_significant()? {
            XmlToken::Start {
                name,
                attributes,
                empty,
                ..
            } if name == item => values.push(cursor.value(item, &attributes, empty)?),
            XmlToken::End { name, .. } if name == parent => return Ok(values),
            other => return Err(cursor.unexpected(&other)),
        }
    }
}

fn read_rows<E>(cursor: &mut XmlCursor, snapshot: &mut TableSnapshot<E>) -> Result<(), MarshalError>
where
    E: std::str::FromStr,
    <E as std::str::FromStr>::Err: Display,
{
    let mut titles = Vec::new();
    loop {
        match cursor.next_significant()? {
            XmlToken::Start {
                name,
                attributes,
                empty,
                ..
            } if name == "row" => {
                titles.push(attribute(&attributes, "title").map(str::to_string));
                let cells = if empty {
                    Vec::new()
                } else {
                    read_values(cursor, "row", "cell")?
                };
                let row = cells.into_iter().map(parse_optional).collect::<Result<_, _>>()?;
                snapshot.rows.push(row);
            }
            XmlToken::End { name, .. } if name == "rows" => break,
            other => return Err(cursor.unexpected(&other)),
        }
    }

    pad_rows(&mut snapshot.rows);
    if titles.iter().any(Option::is_some) {
        snapshot.row_titles = titles;
    }
    Ok(())
}

/// Pads short rows with nulls up to the widest row.
fn pad_rows<E>(rows: &mut [Vec<Option<E>>]) {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in rows {
        row.resize_with(width, || None);
    }
}

// =============================================================================
// XHTML
// =============================================================================

pub(super) fn write_xhtml<E: Display>(content: &TableContent<E>, config: &MarshalConfig) -> String {
    const NULL: &str = r#"class="null""#;

    let mut out = String::new();
    out.push_str(PROLOG);
    out.push('\n');
    out.push_str(r#"<html xmlns="http://www.w3.org/1999/xhtml">"#);
    out.push('\n');
    out.push_str("<body>\n");
    out.push_str("<table>\n");

    if config.include_table_name
        && let Some(name) = content.table_name()
    {
        out.push_str(&format!("  <caption>{}</caption>\n", escape_xml(name)));
    }

    if config.include_column_titles {
        out.push_str("  <thead>\n    <tr>");
        if config.include_row_titles {
            out.push_str(r#"<th class="corner"/>"#);
        }
        for column in 0..content.column_count() {
            out.push_str(&value_element("th", content.column_title(column), NULL));
        }
        out.push_str("</tr>\n  </thead>\n");
    }

    out.push_str("  <tbody>\n");
    for row in 0..content.row_count() {
        out.push_str("    <tr>");
        if config.include_row_titles {
            out.push_str(&value_element("th", content.row_title(row), NULL));
        }
        for column in 0..content.column_count() {
            let text = content.element(row, column).map(ToString::to_string);
            out.push_str(&value_element("td", text.as_deref(), NULL));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("  </tbody>\n");
    out.push_str("</table>\n");
    out.push_str("</body>\n</html>\n");
    out
}

pub(super) fn read_xhtml<E>(input: &str) -> Result<TableSnapshot<E>, MarshalError>
where
    E: std::str::FromStr,
    <E as std::str::FromStr>::Err: Display,
{
    let mut cursor = XmlCursor::new(input, "xhtml")?;
    let (_, empty) = cursor.seek_start("table")?;
    let mut snapshot = TableSnapshot::default();
    if empty {
        return Ok(snapshot);
    }

    let mut row_titles = Vec::new();
    loop {
        match cursor.next_significant()? {
            XmlToken::Start {
                name,
                attributes,
                empty,
                ..
            } if name == "caption" => {
                snapshot.table_name = cursor.value("caption", &attributes, empty)?;
            }
            XmlToken::Start { name, empty, .. } if name == "thead" => {
                if !empty {
                    while let Some(cells) = read_table_row(&mut cursor, "thead")? {
                        snapshot.column_titles = cells.headers;
                    }
                }
            }
            XmlToken::Start { name, empty, .. } if name == "tbody" => {
                if !empty {
                    while let Some(cells) = read_table_row(&mut cursor, "tbody")? {
                        row_titles.push(cells.headers.into_iter().next().flatten());
                        let row = cells
                            .data
                            .into_iter()
                            .map(parse_optional)
                            .collect::<Result<_, _>>()?;
                        snapshot.rows.push(row);
                    }
                }
            }
            XmlToken::End { name, .. } if name == "table" => break,
            other => return Err(cursor.unexpected(&other)),
        }
    }

    pad_rows(&mut snapshot.rows);
    if row_titles.iter().any(Option::is_some) {
        snapshot.row_titles = row_titles;
    }
    Ok(snapshot)
}

/// Header and data cells of one `<tr>`.
struct TableRow {
    headers: Vec<Option<String>>,
    data: Vec<Option<String>>,
}

/// Reads the next `<tr>` inside `section`, or `None` at the section end.
fn read_table_row(cursor: &mut XmlCursor, section: &str) -> Result<Option<TableRow>, MarshalError> {
    match cursor.next_significant()? {
        XmlToken::Start { name, empty, .. } if name == "tr" => {
            let mut row = TableRow {
                headers: Vec::new(),
                data: Vec::new(),
            };
            if empty {
                return Ok(Some(row));
            }
            loop {
                match cursor.next_significant()? {
                    XmlToken::Start {
                        name,
                        attributes,
                        empty,
                        ..
                    } if name == "th" || name == "td" => {
                        let corner = attribute(&attributes, "class") == Some("corner");
                        let value = cursor.value(&name, &attributes, empty)?;
                        match name.as_str() {
                            "th" if corner => {}
                            "th" => row.headers.push(value),
                            _ => row.data.push(value),
                        }
                    }
                    XmlToken::End { name, .. } if name == "tr" => return Ok(Some(row)),
                    other => return Err(cursor.unexpected(&other)),
                }
            }
        }
        XmlToken::End { name, .. } if name == section => Ok(None),
        other => Err(cursor.unexpected(&other)),
    }
}
