use crate::config::SchedulingConfig;
use crate::error::{Result, SchedulingError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One cell of an already-parsed table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Blank,
}

impl Cell {
    /// Blank cells and whitespace-only text both count as blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Blank => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Blank => Ok(()),
        }
    }
}

/// A header row plus data rows, as produced by the ingestion layer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn column(&self, table: &'static str, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.trim() == name)
            .ok_or_else(|| SchedulingError::MissingColumn {
                table,
                column: name.to_string(),
            })
    }

    /// Short rows read as blank in their missing cells.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Blank)
    }
}

/// The three tables a scheduling run consumes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTables {
    /// `Prof` label and `NumCourses` per professor.
    pub professors: Table,
    /// Course rows with metadata columns, then one column per professor.
    pub courses: Table,
    /// Slot rows with `Times`/`Days`, then one column per professor.
    pub times: Table,
}

/// The body of a solve request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    #[serde(flatten)]
    pub tables: RawTables,
    #[serde(default)]
    pub config: Option<SchedulingConfig>,
}
