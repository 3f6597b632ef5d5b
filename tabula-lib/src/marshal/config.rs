//! Serialization configuration

/// Controls which metadata a serializer writes and expects.
///
/// Reading must use the same configuration as the writing side.
///
/// # Example
///
/// ```
/// use tabula_lib::marshal::MarshalConfig;
///
/// let config = MarshalConfig::default()
///     .with_column_titles(true)
///     .with_csv_delimiter(';');
/// assert!(config.include_column_titles);
/// assert!(!config.include_row_titles);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarshalConfig {
    /// Write a header with the column titles.
    ///
    /// Default: false
    pub include_column_titles: bool,

    /// Write the row title in front of each row.
    ///
    /// Default: false
    pub include_row_titles: bool,

    /// Write the table name.
    ///
    /// Default: false
    pub include_table_name: bool,

    /// Field delimiter of the CSV format.
    ///
    /// Default: ','
    pub csv_delimiter: char,
}

impl Default for MarshalConfig {
    fn default() -> Self {
        Self {
            include_column_titles: false,
            include_row_titles: false,
            include_table_name: false,
            csv_delimiter: ',',
        }
    }
}

impl MarshalConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config that includes every kind of metadata.
    pub fn all_metadata() -> Self {
        Self::default()
            .with_column_titles(true)
            .with_row_titles(true)
            .with_table_name(true)
    }

    /// Sets whether column titles are written.
    pub fn with_column_titles(mut self, enabled: bool) -> Self {
        self.include_column_titles = enabled;
        self
    }

    /// Sets whether row titles are written.
    pub fn with_row_titles(mut self, enabled: bool) -> Self {
        self.include_row_titles = enabled;
        self
    }

    /// Sets whether the table name is written.
    pub fn with_table_name(mut self, enabled: bool) -> Self {
        self.include_table_name = enabled;
        self
    }

    /// Sets the CSV field delimiter.
    pub fn with_csv_delimiter(mut self, delimiter: char) -> Self {
        self.csv_delimiter = delimiter;
        self
    }
}
