//! JSON format

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::MarshalConfig;
use super::metadata_snapshot;
use crate::content::TableContent;
use crate::content::TableSnapshot;
use crate::error::MarshalError;

pub(super) fn write<E>(content: &TableContent<E>, config: &MarshalConfig) -> Result<String, MarshalError>
where
    E: Serialize + Clone,
{
    let snapshot = metadata_snapshot(content, config);
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

pub(super) fn read<E: DeserializeOwned>(input: &str) -> Result<TableSnapshot<E>, MarshalError> {
    let snapshot: TableSnapshot<E> = serde_json::from_str(input)?;
    let width = snapshot.rows.iter().map(Vec::len).max().unwrap_or(0);
    if snapshot.rows.iter().any(|row| row.len() != width) {
        return Err(MarshalError::structure("json", "rows differ in length"));
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles_omitted_without_flag() {
        let mut content = TableContent::from_rows(vec![vec![Some(1), None]]);
        content.set_column_title(0, Some("a".to_string()));

        let json = write(&content, &MarshalConfig::default()).unwrap();
        assert!(!json.contains("columnTitles"));
        assert!(json.contains("null"));

        let json = write(&content, &MarshalConfig::default().with_column_titles(true)).unwrap();
        assert!(json.contains("columnTitles"));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = read::<i32>(r#"{"rows": [[1, 2], [3]]}"#);
        assert!(matches!(result, Err(MarshalError::Structure { .. })));
    }
}
