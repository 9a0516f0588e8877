//! Label-indexed matrices: the dense table built from chart-observations, and the
//! distance-matrix the linkage-engine consumes.

use ndarray::{Array1, Array2, Axis};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Error, MatrixDefect};

/// Relative tolerance when checking `m[i][j] == m[j][i]`.
const ASYMMETRY_TOLERANCE: f64 = 1e-9;

/// A single point, used for building distance-matrices from coordinates.
pub type Point = Array1<f64>;

/// A single pairwise observation, as it arrives from tabular chart-data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// The row-category.
    pub row: String,
    /// The column-category.
    pub col: String,
    /// The value compared between the two.
    pub value: f64,
}

impl Observation {
    /// Create a new observation.
    #[inline]
    #[must_use]
    pub fn new(row: impl Into<String>, col: impl Into<String>, value: f64) -> Self {
        Self {
            row: row.into(),
            col: col.into(),
            value,
        }
    }
}

/// How [`LabeledMatrix::build`] fills pairs that weren't observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatrixOptions {
    /// Whether a missing `(r, c)` may be filled from an observed `(c, r)`.
    pub mirror: bool,
    /// Value for a missing diagonal entry `(r, r)`.
    pub self_value: f64,
    /// Value for every other missing entry.
    ///
    /// With the default of `0.0` a similarity-matrix treats missing data as maximally
    /// dissimilar, which biases clustering. Validate completeness beforehand if that matters.
    pub missing_value: f64,
}

impl Default for MatrixOptions {
    #[inline]
    fn default() -> Self {
        Self {
            mirror: true,
            self_value: 1.0,
            missing_value: 0.0,
        }
    }
}

/// An ordered set of labels with a reverse-lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LabelIndex {
    labels: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl LabelIndex {
    /// Collect labels, keeping only the first occurrence of each.
    fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut result = Self::default();
        for label in labels {
            let label = label.into();
            if result.index.contains_key(&label) {
                continue;
            }
            result.index.insert(label.clone(), result.labels.len());
            result.labels.push(label);
        }
        result
    }

    fn get(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    fn require(&self, label: &str) -> Result<usize, Error> {
        self.get(label)
            .ok_or_else(|| Error::UnknownLabel(label.to_owned()))
    }

    #[expect(
        clippy::indexing_slicing,
        reason = "Callers only pass indices below `self.len()`."
    )]
    fn label(&self, ix: usize) -> &str {
        &self.labels[ix]
    }

    fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether both indices hold the same labels, regardless of order.
    fn same_set(&self, other: &Self) -> bool {
        self.len() == other.len() && self.labels.iter().all(|l| other.index.contains_key(l))
    }
}

/// A dense, total `rows × cols` table of values.
///
/// This is what a heatmap draws. Build it from sparse observations with
/// [`LabeledMatrix::build`], and re-sort it to a dendrogram's leaf-order with
/// [`LabeledMatrix::reorder`].
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMatrix {
    rows: LabelIndex,
    cols: LabelIndex,
    values: Array2<f64>,
}

impl LabeledMatrix {
    /// Build a dense matrix over `rows × cols` from sparse observations.
    ///
    /// Each entry `(r, c)` is, in order of preference:
    /// 1. the observed value for `(r, c)`,
    /// 2. the observed value for `(c, r)` if [`MatrixOptions::mirror`] is set,
    /// 3. [`MatrixOptions::self_value`] if `r == c`,
    /// 4. [`MatrixOptions::missing_value`].
    ///
    /// This never fails. Repeated labels in `rows` or `cols` are collapsed, a repeated
    /// observation overrides earlier ones, and observations that can't land anywhere are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use chart_numerics::{LabeledMatrix, MatrixOptions, Observation};
    ///
    /// let observations = [Observation::new("A", "A", 0.9)];
    /// let matrix = LabeledMatrix::build(&observations, ["A", "B"], ["A", "B"], MatrixOptions::default());
    ///
    /// assert_eq!(matrix.get("A", "A"), Some(0.9));
    /// assert_eq!(matrix.get("A", "B"), Some(0.0));
    /// assert_eq!(matrix.get("B", "B"), Some(1.0));
    /// ```
    #[must_use]
    pub fn build<'a, I, R, S, C, T>(
        observations: I,
        rows: R,
        cols: C,
        options: MatrixOptions,
    ) -> Self
    where
        I: IntoIterator<Item = &'a Observation>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
        C: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let rows = LabelIndex::from_labels(rows);
        let cols = LabelIndex::from_labels(cols);

        let mut observed: FxHashMap<(&str, &str), f64> = FxHashMap::default();
        for observation in observations {
            let (row, col) = (observation.row.as_str(), observation.col.as_str());
            let lands = (rows.get(row).is_some() && cols.get(col).is_some())
                || (options.mirror && rows.get(col).is_some() && cols.get(row).is_some());
            if !lands {
                warn!(row, col, "ignoring observation outside of the matrix");
                continue;
            }
            if observed.insert((row, col), observation.value).is_some() {
                warn!(row, col, "repeated observation, keeping the latest value");
            }
        }

        let values = Array2::from_shape_fn((rows.len(), cols.len()), |(i, j)| {
            let (row, col) = (rows.label(i), cols.label(j));
            observed
                .get(&(row, col))
                .or_else(|| {
                    options
                        .mirror
                        .then(|| observed.get(&(col, row)))
                        .flatten()
                })
                .copied()
                .unwrap_or(if row == col {
                    options.self_value
                } else {
                    options.missing_value
                })
        });

        Self { rows, cols, values }
    }

    /// The row-labels, in order.
    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[String] {
        &self.rows.labels
    }

    /// The column-labels, in order.
    #[inline]
    #[must_use]
    pub fn cols(&self) -> &[String] {
        &self.cols.labels
    }

    /// The values, indexed `[row, col]` in label-order.
    #[inline]
    #[must_use]
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Look up a single value by its labels.
    #[inline]
    #[must_use]
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let (i, j) = (self.rows.get(row)?, self.cols.get(col)?);
        self.values.get((i, j)).copied()
    }

    /// Re-sort rows and columns to the given label-orders.
    ///
    /// Labels left out of an order are dropped from the result, so the orders may also be used
    /// to select a sub-matrix. This is typically called with the [`leaf_order`](crate::leaf_order)
    /// of a dendrogram.
    #[inline]
    pub fn reorder<S, T>(&self, row_order: &[S], col_order: &[T]) -> Result<Self, Error>
    where
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let rows = LabelIndex::from_labels(row_order.iter().map(|l| l.as_ref().to_owned()));
        let cols = LabelIndex::from_labels(col_order.iter().map(|l| l.as_ref().to_owned()));
        let row_ixs = rows
            .labels
            .iter()
            .map(|l| self.rows.require(l))
            .collect::<Result<Vec<_>, _>>()?;
        let col_ixs = cols
            .labels
            .iter()
            .map(|l| self.cols.require(l))
            .collect::<Result<Vec<_>, _>>()?;
        let values = self
            .values
            .select(Axis(0), &row_ixs)
            .select(Axis(1), &col_ixs);
        Ok(Self { rows, cols, values })
    }
}

/// A square matrix of pairwise distances between labelled items.
///
/// Entries are optional, so a matrix may be incomplete while it's being filled in. Clustering
/// checks every entry it needs and refuses incomplete, non-finite, negative or asymmetric
/// matrices. The diagonal is never read.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    labels: LabelIndex,
    values: Array2<Option<f64>>,
}

impl DistanceMatrix {
    /// Create a matrix over `labels` with no distances recorded yet.
    ///
    /// Repeated labels are collapsed, keeping the first occurrence.
    #[inline]
    #[must_use]
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels = LabelIndex::from_labels(labels);
        let n = labels.len();
        Self {
            labels,
            values: Array2::from_elem((n, n), None),
        }
    }

    /// Create a matrix from nested `(row, [(col, distance)])` pairs.
    ///
    /// The row-labels define the matrix's labels. Missing pairs stay missing.
    ///
    /// # Examples
    ///
    /// ```
    /// use chart_numerics::DistanceMatrix;
    ///
    /// let matrix = DistanceMatrix::from_nested([
    ///     ("A", vec![("B", 1.0)]),
    ///     ("B", vec![("A", 1.0)]),
    /// ])
    /// .unwrap();
    /// assert_eq!(matrix.get("A", "B"), Some(1.0));
    /// assert_eq!(matrix.get("A", "A"), None);
    /// ```
    #[inline]
    pub fn from_nested<I, R, J, C>(nested: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (R, J)>,
        R: Into<String>,
        J: IntoIterator<Item = (C, f64)>,
        C: AsRef<str>,
    {
        let rows: Vec<(String, J)> = nested
            .into_iter()
            .map(|(row, entries)| (row.into(), entries))
            .collect();
        let mut matrix = Self::new(rows.iter().map(|(row, _)| row.clone()));
        for (row, entries) in rows {
            for (col, distance) in entries {
                matrix.set(&row, col.as_ref(), distance)?;
            }
        }
        Ok(matrix)
    }

    /// Create a matrix of squared Euclidean distances between points.
    ///
    /// Ward's criterion is exact on squared Euclidean distances: the merge-distance then equals
    /// twice the increase in within-cluster sum of squares.
    ///
    /// Labels must be distinct, and there must be exactly one per point.
    #[inline]
    pub fn squared_euclidean<I, S>(labels: I, points: &[Point]) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let first_dim = points.first().ok_or(Error::EmptyInput)?.raw_dim();
        if let Some(ix) = points.iter().position(|p| p.raw_dim() != first_dim) {
            return Err(Error::ShapeMismatch(0, ix));
        }
        let labels = LabelIndex::from_labels(labels);
        if labels.len() != points.len() {
            return Err(Error::LabelCountMismatch {
                expected: points.len(),
                actual: labels.len(),
            });
        }

        let values = Array2::from_shape_fn((points.len(), points.len()), |(i, j)| {
            points
                .get(i)
                .zip(points.get(j))
                .map(|(p, q)| (p - q).mapv(|x| x.powi(2)).sum())
        });
        Ok(Self { labels, values })
    }

    /// Convert every recorded entry with `f`, e.g. to turn similarities into distances.
    #[inline]
    #[must_use]
    pub fn map_values(mut self, f: impl Fn(f64) -> f64) -> Self {
        self.values.mapv_inplace(|v| v.map(&f));
        self
    }

    /// Convert similarities normalised to `[0, 1]` into distances via `1 - s`.
    #[inline]
    #[must_use]
    pub fn similarity_to_distance(self) -> Self {
        self.map_values(|similarity| 1.0 - similarity)
    }

    /// Record the distance from `row` to `col`.
    #[inline]
    pub fn set(&mut self, row: &str, col: &str, distance: f64) -> Result<(), Error> {
        let (i, j) = (self.labels.require(row)?, self.labels.require(col)?);
        if let Some(entry) = self.values.get_mut((i, j)) {
            *entry = Some(distance);
        }
        Ok(())
    }

    /// Record the distance between `a` and `b` in both directions.
    #[inline]
    pub fn set_symmetric(&mut self, a: &str, b: &str, distance: f64) -> Result<(), Error> {
        self.set(a, b, distance)?;
        self.set(b, a, distance)
    }

    /// The recorded distance from `row` to `col`, if any.
    #[inline]
    #[must_use]
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let (i, j) = (self.labels.get(row)?, self.labels.get(col)?);
        self.values.get((i, j)).copied().flatten()
    }

    /// The labels, in insertion-order.
    #[inline]
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels.labels
    }

    /// The number of labels.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the matrix has no labels.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.labels.is_empty()
    }

    pub(crate) fn label(&self, ix: usize) -> &str {
        self.labels.label(ix)
    }

    /// Check every off-diagonal entry and return them as a dense matrix.
    ///
    /// The diagonal of the result is `0.0`.
    pub(crate) fn validated(&self) -> Result<Array2<f64>, Error> {
        let n = self.len();
        let mut dense = Array2::zeros((n, n));
        for ((i, j), entry) in self.values.indexed_iter() {
            if i == j {
                continue;
            }
            let (row, col) = (self.label(i), self.label(j));
            let value = entry.ok_or_else(|| MatrixDefect::Missing {
                row: row.to_owned(),
                col: col.to_owned(),
            })?;
            if !value.is_finite() {
                return Err(MatrixDefect::NonFinite {
                    row: row.to_owned(),
                    col: col.to_owned(),
                    value,
                }
                .into());
            }
            if value < 0.0 {
                return Err(MatrixDefect::Negative {
                    row: row.to_owned(),
                    col: col.to_owned(),
                    value,
                }
                .into());
            }
            // A missing or non-finite mirror-entry is reported when we visit it.
            if let Some(backward) = self.values.get((j, i)).copied().flatten() {
                if backward.is_finite()
                    && (value - backward).abs() > ASYMMETRY_TOLERANCE * value.abs().max(1.0)
                {
                    return Err(MatrixDefect::Asymmetric {
                        row: row.to_owned(),
                        col: col.to_owned(),
                        forward: value,
                        backward,
                    }
                    .into());
                }
            }
            // `-0.0` would sort below `0.0` under `total_cmp`.
            if let Some(slot) = dense.get_mut((i, j)) {
                *slot = value + 0.0;
            }
        }
        Ok(dense)
    }
}

impl TryFrom<LabeledMatrix> for DistanceMatrix {
    type Error = Error;

    /// Use a dense table as a distance-matrix.
    ///
    /// Rows and columns must carry the same labels, though not necessarily in the same order;
    /// columns are re-sorted to row-order.
    #[inline]
    fn try_from(matrix: LabeledMatrix) -> Result<Self, Self::Error> {
        if !matrix.rows.same_set(&matrix.cols) {
            return Err(MatrixDefect::NotSquare.into());
        }
        let square = matrix.reorder(&matrix.rows.labels, &matrix.rows.labels)?;
        Ok(Self {
            values: square.values.mapv(Some),
            labels: square.rows,
        })
    }
}
