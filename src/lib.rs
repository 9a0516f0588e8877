/*!
The numeric core behind a handful of chart-types: everything that has to be computed before
anything is drawn.

- Heatmaps with dendrograms: build a dense [`LabeledMatrix`] from sparse observations,
  turn it into a [`DistanceMatrix`], [`cluster`] it with
  [Ward's method](https://en.wikipedia.org/wiki/Ward%27s_method), and sort the heatmap's rows by
  the resulting [`leaf_order`]. Other linkages are available through [`Agglomerative`].
- Box-plots and violin-plots: see [`distribution::BoxStats`] and [`distribution::Kde`].
- Trend-lines on scatter-plots: see [`regression::LinearFit`].

Nothing in here draws, formats axes or picks colours; that is left to the caller.

# Example

```
use chart_numerics::{cluster, leaf_order, DistanceMatrix};

let matrix = DistanceMatrix::from_nested([
    ("A", vec![("B", 1.0), ("C", 4.0)]),
    ("B", vec![("A", 1.0), ("C", 3.0)]),
    ("C", vec![("A", 4.0), ("B", 3.0)]),
])?;
let tree = cluster(&matrix)?;

// A and B are closest, so they are merged first.
let [first, second] = tree.children().expect("Three labels merge twice.");
assert_eq!(first.to_string(), "(A, B)");
assert_eq!(second.label(), Some("C"));
assert_eq!(tree.size(), 3);
assert_eq!(leaf_order(&tree), ["A", "B", "C"]);
# Ok::<(), chart_numerics::Error>(())
```
*/

#![expect(
    clippy::missing_errors_doc,
    reason = "The Error-Enum is sparse and documented."
)]

mod cluster;
pub mod distribution;
mod error;
mod linkage;
mod matrix;
pub mod regression;

pub use cluster::{leaf_order, Cluster, ClusterId, Leaves};
pub use error::{Error, MatrixDefect};
pub use linkage::{
    cluster, Agglomerative, Average, Centroid, Complete, Dendrogram, Linkage, Median, Merge,
    MergeSizes, Single, TieBreak, Ward,
};
pub use matrix::{DistanceMatrix, LabeledMatrix, MatrixOptions, Observation, Point};
