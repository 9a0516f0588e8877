//! The crate-wide error-type.

use thiserror::Error;

/// An error-type for building matrices, clustering them, and summarising samples.
#[derive(Debug, Clone, PartialEq, Error)]
#[expect(
    clippy::exhaustive_enums,
    reason = "Extending this enum should be a breaking change."
)]
pub enum Error {
    /// No labels (or points) were supplied, so there is nothing to cluster.
    #[error("no labels supplied")]
    EmptyInput,
    /// The distance-matrix can't be clustered.
    #[error("invalid distance matrix: {0}")]
    InvalidMatrix(#[from] MatrixDefect),
    /// A label was used that the matrix doesn't know about.
    #[error("unknown label {0:?}")]
    UnknownLabel(String),
    /// Two points (specified by their indices in the points-slice) have different dimensions.
    #[error("points {0} and {1} have different dimensions")]
    ShapeMismatch(usize, usize),
    /// The number of labels doesn't match the number of points or rows.
    #[error("expected {expected} labels, got {actual}")]
    LabelCountMismatch {
        /// The number of labels required.
        expected: usize,
        /// The number of labels supplied.
        actual: usize,
    },
    /// A sample contained no finite values.
    #[error("sample contains no finite values")]
    EmptySample,
    /// A sample has too little spread to compute the requested statistic.
    #[error("degenerate sample: {0}")]
    DegenerateSample(&'static str),
    /// A tuning-parameter, such as a kernel-bandwidth, is out of range.
    #[error("{name} is out of range: {value}")]
    InvalidParameter {
        /// The parameter's name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// The reason a [`DistanceMatrix`](crate::DistanceMatrix) was rejected.
///
/// Labels of merged clusters are rendered as nested parentheses, e.g. `(A, B)`.
#[derive(Debug, Clone, PartialEq, Error)]
#[expect(
    clippy::exhaustive_enums,
    reason = "Extending this enum should be a breaking change."
)]
pub enum MatrixDefect {
    /// No distance was recorded for this pair.
    #[error("missing distance between {row:?} and {col:?}")]
    Missing {
        /// Row-label of the missing entry.
        row: String,
        /// Column-label of the missing entry.
        col: String,
    },
    /// The distance is NaN or infinite.
    #[error("distance between {row:?} and {col:?} is {value}, which is not finite")]
    NonFinite {
        /// Row-label of the entry.
        row: String,
        /// Column-label of the entry.
        col: String,
        /// The offending value.
        value: f64,
    },
    /// The distance is below zero.
    #[error("distance between {row:?} and {col:?} is negative ({value})")]
    Negative {
        /// Row-label of the entry.
        row: String,
        /// Column-label of the entry.
        col: String,
        /// The offending value.
        value: f64,
    },
    /// `m[row][col]` and `m[col][row]` disagree.
    #[error("distance from {row:?} to {col:?} is {forward}, but {backward} in reverse")]
    Asymmetric {
        /// Row-label of the entry.
        row: String,
        /// Column-label of the entry.
        col: String,
        /// The value of `m[row][col]`.
        forward: f64,
        /// The value of `m[col][row]`.
        backward: f64,
    },
    /// Rows and columns are labelled by different sets.
    #[error("rows and columns are labelled differently")]
    NotSquare,
}
