//! Table serialization
//!
//! Every format round-trips: unmarshalling the output of `marshal` with the
//! same [`MarshalConfig`] reproduces the elements and, where enabled, the
//! titles and table name, including empty strings and null cells.

mod config;
mod csv;
mod json;
mod plain_text;
mod xml;
mod xml_reader;

pub use config::*;
pub use xml::escape_xml;

use std::fmt::Display;
use std::io::Read;
use std::io::Write;
use std::str::FromStr;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::content::Element;
use crate::content::TableContent;
use crate::content::TableSnapshot;
use crate::error::MarshalError;
use crate::table::Table;

/// Supported serialization formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// JSON document with `tableName`, `columnTitles`, `rowTitles` and `rows`.
    Json,
    /// XML document with a `<table>` root.
    Xml,
    /// XHTML page holding an HTML table.
    Xhtml,
    /// Comma separated values.
    Csv,
    /// Framed plain text rendering.
    PlainText,
}

impl Format {
    /// Returns the format name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
            Format::Xhtml => "xhtml",
            Format::Csv => "csv",
            Format::PlainText => "plain text",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Marshals a table into, and unmarshals it from, the supported formats.
///
/// # Example
///
/// ```
/// use tabula_lib::Table;
/// use tabula_lib::marshal::Format;
/// use tabula_lib::marshal::MarshalConfig;
///
/// let table: Table<String> = Table::from_rows([["a", "b"], ["c", "d"]].map(|row| row.map(String::from)));
/// let config = MarshalConfig::default();
/// let csv = table.serializer().marshal(Format::Csv, &config).unwrap();
/// assert_eq!(csv, "a,b\nc,d\n");
///
/// let copy: Table<String> = Table::new();
/// copy.serializer().unmarshal(Format::Csv, &config, &csv).unwrap();
/// assert!(copy.equals_in_content(&table));
/// ```
pub struct TableSerializer<'a, E> {
    table: &'a Table<E>,
}

impl<E: Element> Table<E> {
    /// Returns the serializer of this table.
    pub fn serializer(&self) -> TableSerializer<'_, E> {
        TableSerializer { table: self }
    }
}

impl<E: Element> TableSerializer<'_, E> {
    /// Renders the table in `format`.
    pub fn marshal(&self, format: Format, config: &MarshalConfig) -> Result<String, MarshalError>
    where
        E: Serialize + Display,
    {
        self.table.execute_with_read_lock(|state| {
            let content = state.content();
            match format {
                Format::Json => json::write(content, config),
                Format::Xml => Ok(xml::write_xml(content, config)),
                Format::Xhtml => Ok(xml::write_xhtml(content, config)),
                Format::Csv => Ok(csv::write(content, config)),
                Format::PlainText => Ok(plain_text::write(content, config)),
            }
        })
    }

    /// Renders the table in `format` into `writer`.
    pub fn marshal_to_writer<W: Write>(
        &self,
        format: Format,
        config: &MarshalConfig,
        mut writer: W,
    ) -> Result<(), MarshalError>
    where
        E: Serialize + Display,
    {
        let text = self.marshal(format, config)?;
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Replaces the content of the table with the table described by
    /// `input`. On error the table is left unchanged.
    pub fn unmarshal(&self, format: Format, config: &MarshalConfig, input: &str) -> Result<(), MarshalError>
    where
        E: DeserializeOwned + FromStr,
        <E as FromStr>::Err: Display,
    {
        let snapshot = match format {
            Format::Json => json::read(input)?,
            Format::Xml => xml::read_xml(input)?,
            Format::Xhtml => xml::read_xhtml(input)?,
            Format::Csv => csv::read(input, config)?,
            Format::PlainText => plain_text::read(input, config)?,
        };
        let content = TableContent::from_snapshot(restrict(snapshot, config));
        log::debug!(
            "[marshal] read {} rows and {} columns as {}",
            content.row_count(),
            content.column_count(),
            format
        );
        self.table
            .execute_with_write_lock(|state| state.replace_content(content));
        Ok(())
    }

    /// Reads `reader` to the end and unmarshals it.
    pub fn unmarshal_from_reader<R: Read>(
        &self,
        format: Format,
        config: &MarshalConfig,
        mut reader: R,
    ) -> Result<(), MarshalError>
    where
        E: DeserializeOwned + FromStr,
        <E as FromStr>::Err: Display,
    {
        let mut input = String::new();
        reader.read_to_string(&mut input)?;
        self.unmarshal(format, config, &input)
    }
}

/// Copies `content` into a snapshot holding only the configured metadata.
fn metadata_snapshot<E: Clone>(content: &TableContent<E>, config: &MarshalConfig) -> TableSnapshot<E> {
    restrict(content.snapshot(), config)
}

/// Drops the metadata the configuration excludes.
fn restrict<E>(mut snapshot: TableSnapshot<E>, config: &MarshalConfig) -> TableSnapshot<E> {
    if !config.include_table_name {
        snapshot.table_name = None;
    }
    if !config.include_column_titles {
        snapshot.column_titles.clear();
    }
    if !config.include_row_titles {
        snapshot.row_titles.clear();
    }
    snapshot
}

fn parse_element<E>(text: &str) -> Result<E, MarshalError>
where
    E: FromStr,
    <E as FromStr>::Err: Display,
{
    text.parse::<E>().map_err(|error| MarshalError::element(text, error))
}

fn parse_optional<E>(text: Option<String>) -> Result<Option<E>, MarshalError>
where
    E: FromStr,
    <E as FromStr>::Err: Display,
{
    text.as_deref().map(parse_element).transpose()
}
