use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{domain::Grid, error::GridError};

/// Shape of the table as stored in the host field: `{ "tableData": [[..]] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableFieldValue {
    #[serde(rename = "tableData")]
    pub table_data: Grid,
}

impl TableFieldValue {
    pub fn new(table_data: Grid) -> Self {
        Self { table_data }
    }

    pub fn to_json(&self) -> Value {
        encode_field_value(&self.table_data)
    }

    pub fn from_json(value: &Value) -> Result<Self, GridError> {
        Self::deserialize(value).map_err(|e| GridError::MalformedPersistedValue(e.to_string()))
    }
}

/// Decodes a raw field value. `None` and JSON `null` both mean "nothing
/// stored yet".
pub fn decode_field_value(value: Option<&Value>) -> Result<Option<Grid>, GridError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => TableFieldValue::from_json(value).map(|v| Some(v.table_data)),
    }
}

pub fn encode_field_value(grid: &Grid) -> Value {
    json!({ "tableData": grid.rows() })
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
