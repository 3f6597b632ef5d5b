//! File-backed persistence store

use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::StoredRow;
use super::TablePersistence;
use crate::content::Element;
use crate::error::PersistenceError;

/// Encoding of a file store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// Human-readable JSON array of rows.
    Json,
    /// Compact bincode encoding.
    #[default]
    Bincode,
}

/// Store keeping its rows in a file.
///
/// The whole file is loaded on open and rewritten after every change. A store
/// created with [`FileTablePersistence::in_memory`] has no file and behaves
/// like an in-memory store.
#[derive(Debug)]
pub struct FileTablePersistence<E> {
    path: Option<PathBuf>,
    format: FileFormat,
    rows: RwLock<Vec<Vec<Option<E>>>>,
}

impl<E> FileTablePersistence<E>
where
    E: Element + Serialize + DeserializeOwned,
{
    /// Opens the store at `path`, loading its rows if the file exists.
    pub fn open(path: impl Into<PathBuf>, format: FileFormat) -> Result<Self, PersistenceError> {
        let path = path.into();
        let rows = if path.exists() { load(&path, format)? } else { Vec::new() };
        log::debug!("[persistence] opened {} with {} rows", path.display(), rows.len());
        Ok(Self {
            path: Some(path),
            format,
            rows: RwLock::new(rows),
        })
    }

    /// Creates a store without a backing file.
    pub fn in_memory(format: FileFormat) -> Self {
        Self {
            path: None,
            format,
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Returns the backing file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the encoding.
    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Returns a copy of the stored rows.
    pub fn rows(&self) -> Vec<Vec<Option<E>>> {
        self.rows.read().clone()
    }

    fn modify<R>(
        &self,
        change: impl FnOnce(&mut Vec<Vec<Option<E>>>) -> Result<R, PersistenceError>,
    ) -> Result<R, PersistenceError> {
        let mut rows = self.rows.write();
        let result = change(&mut rows)?;
        if let Some(path) = &self.path {
            save(path, self.format, &rows)?;
        }
        Ok(result)
    }
}

fn load<E: DeserializeOwned>(path: &Path, format: FileFormat) -> Result<Vec<Vec<Option<E>>>, PersistenceError> {
    let reader = BufReader::new(File::open(path)?);
    let rows = match format {
        FileFormat::Json => serde_json::from_reader(reader)?,
        FileFormat::Bincode => bincode::deserialize_from(reader)?,
    };
    Ok(rows)
}

fn save<E: Serialize>(path: &Path, format: FileFormat, rows: &[Vec<Option<E>>]) -> Result<(), PersistenceError> {
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        FileFormat::Json => serde_json::to_writer(&mut writer, rows)?,
        FileFormat::Bincode => bincode::serialize_into(&mut writer, rows)?,
    }
    writer.flush()?;
    Ok(())
}

impl<E> TablePersistence<E> for FileTablePersistence<E>
where
    E: Element + Serialize + DeserializeOwned,
{
    fn all_elements(&self) -> Result<Vec<StoredRow<E>>, PersistenceError> {
        Ok(self
            .rows
            .read()
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, row)| (Some(index), row))
            .collect())
    }

    fn add(&self, row: usize, elements: &[Option<E>]) -> Result<(), PersistenceError> {
        self.modify(|rows| {
            if row > rows.len() {
                return Err(PersistenceError::row_out_of_range(row, rows.len()));
            }
            rows.insert(row, elements.to_vec());
            Ok(())
        })
    }

    fn update(&self, row: usize, elements: &[Option<E>]) -> Result<(), PersistenceError> {
        self.modify(|rows| {
            let len = rows.len();
            let stored = rows
                .get_mut(row)
                .ok_or_else(|| PersistenceError::row_out_of_range(row, len))?;
            *stored = elements.to_vec();
            Ok(())
        })
    }

    fn remove(&self, row: usize) -> Result<(), PersistenceError> {
        self.modify(|rows| {
            if row >= rows.len() {
                return Err(PersistenceError::row_out_of_range(row, rows.len()));
            }
            rows.remove(row);
            Ok(())
        })
    }

    fn remove_all(&self) -> Result<(), PersistenceError> {
        self.modify(|rows| {
            rows.clear();
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_survive_reopen() {
        for format in [FileFormat::Json, FileFormat::Bincode] {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("rows.store");

            let store = FileTablePersistence::<String>::open(&path, format).unwrap();
            store.add(0, &[Some("a".to_string()), None]).unwrap();
            store.add(0, &[Some("b".to_string()), Some(String::new())]).unwrap();
            store.remove(1).unwrap();
            drop(store);

            let reopened = FileTablePersistence::<String>::open(&path, format).unwrap();
            assert_eq!(reopened.rows(), vec![vec![Some("b".to_string()), Some(String::new())]]);
        }
    }

    #[test]
    fn test_out_of_range_update_fails() {
        let store = FileTablePersistence::<i32>::in_memory(FileFormat::Json);
        let error = store.update(0, &[Some(1)]).unwrap_err();
        assert!(matches!(error, PersistenceError::RowOutOfRange { index: 0, len: 0 }));
    }
}
