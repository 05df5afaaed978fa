use crate::config::ConfigError;
use clientkit_submit::RowId;
use serde_json::Value;
use std::path::Path;

/// Rows read from a replay file, with ids when every row has one.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayRows {
    pub rows: Vec<Value>,
    pub row_ids: Option<Vec<RowId>>,
}

impl ReplayRows {
    pub fn load(path: &Path, id_field: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&contents).map_err(|source| ConfigError::Rows {
            path: path.to_path_buf(),
            source,
        })?;
        match value {
            Value::Array(rows) => Ok(Self::new(rows, id_field)),
            _ => Err(ConfigError::NotAnArray {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn new(rows: Vec<Value>, id_field: &str) -> Self {
        let row_ids = rows
            .iter()
            .map(|row| row_id(row, id_field))
            .collect::<Option<Vec<_>>>();
        Self { rows, row_ids }
    }
}

fn row_id(row: &Value, id_field: &str) -> Option<RowId> {
    match row.get(id_field)? {
        Value::String(id) if !id.is_empty() => Some(RowId(id.clone())),
        Value::Number(id) => Some(RowId(id.to_string())),
        _ => None,
    }
}
