//! The error taxonomy for the optimisation library.
//!
//! Callers need to tell apart bad input, problems with no feasible solution and failures of the
//! solver itself, so these are kept as distinct variants rather than being flattened into
//! [`anyhow::Error`]. The application layer wraps them with context as usual and can recover the
//! variant with `downcast_ref`.
use crate::lp::{BackendError, LpStatus};
use itertools::Itertools;
use std::fmt::Display;
use thiserror::Error;

/// The maximum number of items to include in an error message before truncating
const MAX_ITEMS_IN_MESSAGE: usize = 10;

/// Format a list of items for an error message, truncating if there are too many
pub fn format_items_with_cap<I, T>(items: I) -> String
where
    I: IntoIterator<Item = T>,
    T: Display,
{
    let items = items.into_iter().collect_vec();
    let mut out = items.iter().take(MAX_ITEMS_IN_MESSAGE).join(", ");
    if items.len() > MAX_ITEMS_IN_MESSAGE {
        out.push_str(&format!(
            " and {} more",
            items.len() - MAX_ITEMS_IN_MESSAGE
        ));
    }

    out
}

/// A single unparseable cell in an input table
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
#[display("row {row}, column `{column}`: {value:?}")]
pub struct InvalidCell {
    /// The (1-based) data row, not counting the header
    pub row: usize,
    /// The column name as it appears in the file
    pub column: String,
    /// The raw contents of the cell
    pub value: String,
}

/// The ways in which input data can be malformed or out of range
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInput {
    /// One or more required columns are absent from a table
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    /// A column name appears more than once
    #[error("Column `{0}` appears more than once")]
    DuplicateColumn(String),
    /// Cells which could not be parsed or are out of range
    #[error("Invalid values at {}", format_items_with_cap(.0))]
    InvalidCells(Vec<InvalidCell>),
    /// A time series with no rows
    #[error("Time series contains no periods")]
    EmptySeries,
    /// The same period label occurs in more than one row
    #[error("Period {0} appears more than once")]
    DuplicatePeriod(String),
    /// Some rows are labelled with timestamps and others with integer indices
    #[error("Period labels must either all be timestamps or all be integer indices")]
    MixedPeriodKinds,
    /// A series does not have one value per period
    #[error("Series `{series}` has {actual} values but there are {expected} periods")]
    LengthMismatch {
        /// The series name
        series: String,
        /// The number of periods
        expected: usize,
        /// The number of values supplied for the series
        actual: usize,
    },
    /// A series required by a solver is not present
    #[error("Time series has no `{0}` series")]
    MissingSeries(String),
    /// A value in a series is out of range
    #[error("Series `{series}` has invalid value {value} in period {period}")]
    InvalidSeriesValue {
        /// The series name
        series: String,
        /// The label of the offending period
        period: String,
        /// The offending value
        value: f64,
    },
    /// One or more required parameters are absent from a parameter table
    #[error("Missing required parameters: {}", .0.join(", "))]
    MissingParameters(Vec<String>),
    /// A parameter is out of range or inconsistent with another parameter
    #[error("{0}")]
    Parameter(String),
    /// The table could not be read at all
    #[error("Malformed table: {0}")]
    Malformed(String),
}

/// The optimisation problems solved by this library
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ProblemKind {
    /// Sizing generation capacity against demand
    #[display("capacity sizing")]
    CapacitySizing,
    /// Scheduling a battery against a contracted capacity
    #[display("battery dispatch")]
    Dispatch,
}

/// An error returned by one of the solvers
#[derive(Debug, Error)]
pub enum OptimisationError {
    /// The input was malformed or out of range. Detected before the LP backend is invoked.
    #[error("Invalid input: {0}")]
    InvalidInput(InvalidInput),
    /// The backend finished but reported that no optimal solution exists
    #[error(
        "The {problem} problem has no optimal solution over {horizon} periods \
        (solver status: {status})"
    )]
    Infeasible {
        /// Which problem was being solved
        problem: ProblemKind,
        /// The status reported by the backend
        status: LpStatus,
        /// The number of periods in the horizon
        horizon: usize,
    },
    /// The solve was stopped by a time limit or a cancellation request
    #[error(
        "The {problem} solve stopped before reaching an optimal solution over {horizon} periods \
        (solver status: {status})"
    )]
    Interrupted {
        /// Which problem was being solved
        problem: ProblemKind,
        /// The status reported by the backend
        status: LpStatus,
        /// The number of periods in the horizon
        horizon: usize,
    },
    /// The backend itself failed
    #[error("The LP backend failed while solving the {problem} problem over {horizon} periods")]
    Backend {
        /// Which problem was being solved
        problem: ProblemKind,
        /// The number of periods in the horizon
        horizon: usize,
        /// The underlying failure
        #[source]
        source: BackendError,
    },
}

impl From<InvalidInput> for OptimisationError {
    fn from(err: InvalidInput) -> Self {
        Self::InvalidInput(err)
    }
}

impl OptimisationError {
    /// Whether this error was caused by invalid input
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// Whether this error means that no feasible solution exists
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::Infeasible { .. })
    }
}
