use thiserror::Error;

/// Errors raised before a model is handed to the solver.
///
/// Solver outcomes such as infeasibility are not errors; they travel back as a
/// [`crate::solver::SolveStatus`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulingError {
    #[error("table `{table}` has no `{column}` column")]
    MissingColumn { table: &'static str, column: String },

    #[error("table `{table}` has {rows} rows, fewer than the {footer} footer rows to drop")]
    NotEnoughRows {
        table: &'static str,
        rows: usize,
        footer: usize,
    },

    #[error("table `{0}` yields no entries")]
    EmptyCollection(&'static str),

    #[error("professor `{0}` has no row in the professor table")]
    MissingLoad(String),

    #[error("table `{table}` references unknown professor `{label}`")]
    UnknownProfessor { table: &'static str, label: String },

    #[error("professor `{0}` appears more than once")]
    DuplicateProfessor(String),

    #[error("course number {0} appears more than once")]
    DuplicateCourse(u32),

    #[error("table `{table}` row {row} column `{column}`: `{value}` is not a recognised marker")]
    InvalidMarker {
        table: &'static str,
        row: usize,
        column: String,
        value: String,
    },

    #[error("table `{table}` row {row} column `{column}`: {reason}")]
    InvalidValue {
        table: &'static str,
        row: usize,
        column: String,
        reason: String,
    },

    #[error("pinned course {0} is not offered this term")]
    UnknownOverrideCourse(u32),

    #[error("slot {0} does not exist")]
    UnknownSlot(usize),

    #[error("no decision variable {0}")]
    UnknownIndex(String),

    #[error("configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SchedulingError>;
