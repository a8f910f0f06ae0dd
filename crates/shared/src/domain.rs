use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Axis, GridError};

macro_rules! name_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

name_newtype!(EntryId);
name_newtype!(FieldId);

/// Identifies one stored field of one content entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldKey {
    pub entry_id: EntryId,
    pub field_id: FieldId,
}

impl FieldKey {
    pub fn new(entry_id: impl Into<EntryId>, field_id: impl Into<FieldId>) -> Self {
        Self {
            entry_id: entry_id.into(),
            field_id: field_id.into(),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entry_id, self.field_id)
    }
}

/// Identity of one writer of a field. Change notifications carry the origin
/// so a handle never hears its own writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginId(pub Uuid);

impl OriginId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OriginId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OriginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rectangular grid of text cells. Row 0 is rendered as the header, but the
/// grid itself treats every row the same.
///
/// Every edit returns a new grid; earlier snapshots are never touched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<String>>", into = "Vec<Vec<String>>")]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    pub const DEFAULT_ROWS: usize = 2;
    pub const DEFAULT_COLUMNS: usize = 3;

    /// A `rows` x `columns` grid of empty cells.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows: vec![vec![String::new(); columns]; rows],
        }
    }

    pub fn from_rows(rows: Vec<Vec<String>>) -> Result<Self, GridError> {
        if let Some(first) = rows.first() {
            let width = first.len();
            if let Some((index, row)) = rows
                .iter()
                .enumerate()
                .find(|(_, row)| row.len() != width)
            {
                return Err(GridError::MalformedPersistedValue(format!(
                    "row {index} has {} cells, expected {width}",
                    row.len()
                )));
            }
        }
        Ok(Self { rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Zero when the grid has no rows.
    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    pub fn with_cell(
        &self,
        row: usize,
        col: usize,
        text: impl Into<String>,
    ) -> Result<Self, GridError> {
        self.check_row(row)?;
        self.check_column(col)?;
        let mut rows = self.rows.clone();
        rows[row][col] = text.into();
        Ok(Self { rows })
    }

    pub fn with_row_appended(&self) -> Self {
        let mut rows = self.rows.clone();
        rows.push(vec![String::new(); self.column_count()]);
        Self { rows }
    }

    pub fn without_row(&self, index: usize) -> Result<Self, GridError> {
        self.check_row(index)?;
        let mut rows = self.rows.clone();
        rows.remove(index);
        Ok(Self { rows })
    }

    pub fn with_column_appended(&self) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.push(String::new());
                row
            })
            .collect();
        Self { rows }
    }

    pub fn without_column(&self, index: usize) -> Result<Self, GridError> {
        self.check_column(index)?;
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.remove(index);
                row
            })
            .collect();
        Ok(Self { rows })
    }

    fn check_row(&self, index: usize) -> Result<(), GridError> {
        check_index(Axis::Row, index, self.row_count())
    }

    fn check_column(&self, index: usize) -> Result<(), GridError> {
        check_index(Axis::Column, index, self.column_count())
    }
}

fn check_index(axis: Axis, index: usize, len: usize) -> Result<(), GridError> {
    if index < len {
        Ok(())
    } else {
        Err(GridError::IndexOutOfRange { axis, index, len })
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ROWS, Self::DEFAULT_COLUMNS)
    }
}

impl TryFrom<Vec<Vec<String>>> for Grid {
    type Error = GridError;

    fn try_from(rows: Vec<Vec<String>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<Grid> for Vec<Vec<String>> {
    fn from(grid: Grid) -> Self {
        grid.rows
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
