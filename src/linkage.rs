//! Agglomerative clustering over a [`DistanceMatrix`].
//!
//! The engine starts with every label in a singleton-cluster and repeatedly merges the two
//! closest clusters. After each merge, the distances from the new cluster to all others are
//! derived from the old distances with a [`Linkage`]-specific
//! [Lance–Williams update](https://en.wikipedia.org/wiki/Ward%27s_method#Lance%E2%80%93Williams_algorithms),
//! so the input-data never has to be revisited.
//!
//! This takes `O(n³)` time and `O(n²)` memory, which is fine for the tens to hundreds of rows a
//! heatmap shows.

use core::cmp;
use itertools::Itertools as _;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::{Cluster, ClusterId, DistanceMatrix, Error, MatrixDefect};

/// The leaf-counts of the clusters taking part in a Lance–Williams update.
///
/// Clusters `a` and `b` are being merged, and `c` is any other active cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSizes {
    /// Leaf-count of the first merged cluster.
    pub a: usize,
    /// Leaf-count of the second merged cluster.
    pub b: usize,
    /// Leaf-count of the other cluster.
    pub c: usize,
}

impl MergeSizes {
    /// The sizes as floats, for use as weights.
    #[expect(
        clippy::as_conversions,
        clippy::cast_precision_loss,
        reason = "Cluster-sizes are far below 2^52."
    )]
    fn weights(self) -> (f64, f64, f64) {
        (self.a as f64, self.b as f64, self.c as f64)
    }
}

/// A linkage-criterion, expressed as a Lance–Williams update.
///
/// Implementors must be symmetric in `a` and `b`.
pub trait Linkage {
    /// The distance between the union of clusters `a` and `b`, and a third cluster `c`.
    ///
    /// `d_ab` is the distance at which `a` and `b` are merged. It is never larger than `d_ac`
    /// or `d_bc`, because the engine always merges the closest pair.
    fn update(&self, sizes: MergeSizes, d_ac: f64, d_bc: f64, d_ab: f64) -> f64;
}

/// Ward's minimum-variance criterion.
///
/// Merges the pair of clusters whose union increases the total within-cluster variance the
/// least. This is exact when the input-distances are squared Euclidean distances, see
/// [`DistanceMatrix::squared_euclidean`]. Merge-distances never decrease.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ward;

impl Linkage for Ward {
    #[inline]
    fn update(&self, sizes: MergeSizes, d_ac: f64, d_bc: f64, d_ab: f64) -> f64 {
        let (sa, sb, sc) = sizes.weights();
        let total = sa + sb + sc;
        ((sa + sc) / total) * d_ac + ((sb + sc) / total) * d_bc - (sc / total) * d_ab
    }
}

/// Single linkage: the distance between the closest members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Single;

impl Linkage for Single {
    #[inline]
    fn update(&self, _sizes: MergeSizes, d_ac: f64, d_bc: f64, _d_ab: f64) -> f64 {
        d_ac.min(d_bc)
    }
}

/// Complete linkage: the distance between the farthest members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Complete;

impl Linkage for Complete {
    #[inline]
    fn update(&self, _sizes: MergeSizes, d_ac: f64, d_bc: f64, _d_ab: f64) -> f64 {
        d_ac.max(d_bc)
    }
}

/// Average linkage (UPGMA): the mean distance over all cross-pairs of members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Average;

impl Linkage for Average {
    #[inline]
    fn update(&self, sizes: MergeSizes, d_ac: f64, d_bc: f64, _d_ab: f64) -> f64 {
        let (sa, sb, _) = sizes.weights();
        (sa * d_ac + sb * d_bc) / (sa + sb)
    }
}

/// Centroid linkage (UPGMC), exact on squared Euclidean distances.
///
/// Unlike the other criteria, merge-distances may decrease ("inversions").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Centroid;

impl Linkage for Centroid {
    #[inline]
    fn update(&self, sizes: MergeSizes, d_ac: f64, d_bc: f64, d_ab: f64) -> f64 {
        let (sa, sb, _) = sizes.weights();
        let s = sa + sb;
        (sa * d_ac + sb * d_bc) / s - (sa * sb * d_ab) / (s * s)
    }
}

/// Median linkage (WPGMC): like [`Centroid`], but both clusters weigh the same.
///
/// Merge-distances may decrease.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Median;

impl Linkage for Median {
    #[inline]
    fn update(&self, _sizes: MergeSizes, d_ac: f64, d_bc: f64, d_ab: f64) -> f64 {
        0.5 * d_ac + 0.5 * d_bc - 0.25 * d_ab
    }
}

/// How to choose between pairs of clusters that are exactly equally close.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[expect(
    clippy::exhaustive_enums,
    reason = "Extending this enum should be a breaking change."
)]
pub enum TieBreak {
    /// Key each cluster by the smallest label it contains, prefer the pair with the smallest
    /// keys, and put the child with the smaller key first.
    ///
    /// The resulting tree doesn't depend on the order of the matrix's labels.
    #[default]
    Lexicographic,
    /// Prefer the first pair found, scanning clusters in creation-order, and keep that order
    /// for the children.
    ///
    /// Results depend on the order of the matrix's labels. This matches charting-libraries that
    /// scan their cluster-list with a nested loop.
    InsertionOrder,
}

impl TieBreak {
    /// Compare two equally close pairs, where `Less` means `first` wins.
    fn compare(self, first: (usize, usize), second: (usize, usize)) -> cmp::Ordering {
        match self {
            Self::Lexicographic => first.cmp(&second),
            Self::InsertionOrder => cmp::Ordering::Equal,
        }
    }
}

/// A single merge in a dendrogram's history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    /// The identifier of the newly created cluster.
    pub id: ClusterId,
    /// The first child.
    pub left: ClusterId,
    /// The second child.
    pub right: ClusterId,
    /// The linkage-distance between the children.
    pub distance: f64,
    /// The number of leaves in the new cluster.
    pub size: usize,
}

/// The result of a clustering-run: the cluster-tree and the order in which it was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dendrogram {
    /// The root of the tree.
    root: Cluster,
    /// One entry per merge, in the order the merges happened.
    merges: Vec<Merge>,
}

impl Dendrogram {
    /// The root of the tree.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> &Cluster {
        &self.root
    }

    /// Discard the merge-history and keep the tree.
    #[inline]
    #[must_use]
    pub fn into_root(self) -> Cluster {
        self.root
    }

    /// The merges in the order they happened. There's one fewer merge than there are leaves.
    #[inline]
    #[must_use]
    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// The number of leaves.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.root.size()
    }

    /// Always `false`, a dendrogram has at least one leaf.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// The leaf-labels in display-order, see [`leaf_order`](crate::leaf_order).
    #[inline]
    #[must_use]
    pub fn leaf_order(&self) -> Vec<String> {
        crate::leaf_order(&self.root)
    }

    /// The clustering into `k` clusters that existed just before the last `k - 1` merges.
    ///
    /// Levels are nested: every cluster on level `k + 1` lies within a cluster on level `k`.
    /// Clusters are returned in leaf-order. Returns `None` unless `1 ≤ k ≤ self.len()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chart_numerics::{Agglomerative, DistanceMatrix};
    ///
    /// let matrix = DistanceMatrix::from_nested([
    ///     ("A", vec![("B", 1.0), ("C", 4.0)]),
    ///     ("B", vec![("A", 1.0), ("C", 3.0)]),
    ///     ("C", vec![("A", 4.0), ("B", 3.0)]),
    /// ])
    /// .unwrap();
    /// let dendrogram = Agglomerative::ward().run(&matrix).unwrap();
    ///
    /// let level = dendrogram.level(2).unwrap();
    /// assert_eq!(level.iter().map(|c| c.to_string()).collect::<Vec<_>>(), ["(A, B)", "C"]);
    /// ```
    #[must_use]
    pub fn level(&self, k: usize) -> Option<Vec<&Cluster>> {
        if k == 0 || k > self.len() {
            return None;
        }
        let mut level = vec![&self.root];
        while level.len() < k {
            // Merge-ids increase over time, so the latest merge still present has the largest id.
            let (ix, _) = level
                .iter()
                .enumerate()
                .filter(|(_, cluster)| !cluster.is_leaf())
                .max_by_key(|(_, cluster)| cluster.id())?;
            let [left, right] = level.remove(ix).children()?;
            level.insert(ix, right);
            level.insert(ix, left);
        }
        Some(level)
    }
}

/// A cluster that hasn't been merged yet.
#[derive(Debug)]
struct Active {
    cluster: Cluster,
    /// Row and column of this cluster in the working distance-matrix.
    ///
    /// A merged cluster re-uses the slot of its first child.
    slot: usize,
    /// Rank of the smallest label in this cluster, used by [`TieBreak::Lexicographic`].
    key: usize,
}

/// Read a working distance, refusing non-finite values.
fn distance_between(distances: &Array2<f64>, a: &Active, b: &Active) -> Result<f64, Error> {
    let value = distances
        .get((a.slot, b.slot))
        .copied()
        .ok_or_else(|| MatrixDefect::Missing {
            row: a.cluster.to_string(),
            col: b.cluster.to_string(),
        })?;
    if value.is_finite() {
        // Update rules can produce `-0.0`, which must tie with `0.0`.
        Ok(value + 0.0)
    } else {
        Err(MatrixDefect::NonFinite {
            row: a.cluster.to_string(),
            col: b.cluster.to_string(),
            value,
        }
        .into())
    }
}

/// An agglomerative clustering-engine.
///
/// # Examples
///
/// ```
/// use chart_numerics::{Agglomerative, Average, DistanceMatrix, TieBreak};
///
/// let matrix = DistanceMatrix::from_nested([
///     ("A", vec![("B", 1.0), ("C", 4.0)]),
///     ("B", vec![("A", 1.0), ("C", 3.0)]),
///     ("C", vec![("A", 4.0), ("B", 3.0)]),
/// ])
/// .unwrap();
///
/// let dendrogram = Agglomerative::new(Average)
///     .tie_break(TieBreak::InsertionOrder)
///     .run(&matrix)
///     .unwrap();
/// assert_eq!(dendrogram.leaf_order(), ["C", "A", "B"]);
/// assert_eq!(dendrogram.root().distance(), 3.5);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Agglomerative<L> {
    linkage: L,
    tie_break: TieBreak,
}

impl Agglomerative<Ward> {
    /// An engine using [`Ward`]-linkage and [`TieBreak::Lexicographic`].
    #[inline]
    #[must_use]
    pub const fn ward() -> Self {
        Self::new(Ward)
    }
}

impl<L: Linkage> Agglomerative<L> {
    /// An engine using the given linkage and [`TieBreak::Lexicographic`].
    #[inline]
    #[must_use]
    pub const fn new(linkage: L) -> Self {
        Self {
            linkage,
            tie_break: TieBreak::Lexicographic,
        }
    }

    /// Use a different tie-break.
    #[inline]
    #[must_use]
    pub const fn tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Cluster all labels of `matrix` into a single tree.
    ///
    /// The matrix is validated up front: every off-diagonal entry must be present, finite,
    /// non-negative and symmetric. The engine works on its own copy, `matrix` is left untouched.
    ///
    /// A single label yields a single leaf and no merges.
    #[instrument(level = "debug", skip_all, fields(labels = matrix.len()))]
    pub fn run(&self, matrix: &DistanceMatrix) -> Result<Dendrogram, Error> {
        if matrix.is_empty() {
            return Err(Error::EmptyInput);
        }
        let mut distances = matrix.validated()?;
        let num_labels = matrix.len();

        let mut keys = vec![0; num_labels];
        for (rank, slot) in (0..num_labels)
            .sorted_by_key(|&slot| matrix.label(slot))
            .enumerate()
        {
            if let Some(key) = keys.get_mut(slot) {
                *key = rank;
            }
        }
        let mut active: Vec<Active> = keys
            .into_iter()
            .enumerate()
            .map(|(slot, key)| Active {
                cluster: Cluster::leaf(ClusterId(slot), matrix.label(slot)),
                slot,
                key,
            })
            .collect();

        let mut merges = Vec::with_capacity(num_labels - 1);
        while active.len() > 1 {
            let (i, j, d_ab) = self.closest_pair(&distances, &active)?;
            debug_assert!(i < j, "Pairs should always be ordered.");
            // Remove `j` first so that `i` stays valid. This must *not* be a swap_remove, to
            // preserve creation-order.
            let b = active.remove(j);
            let a = active.remove(i);

            for c in &active {
                let d_ac = distance_between(&distances, &a, c)?;
                let d_bc = distance_between(&distances, &b, c)?;
                let sizes = MergeSizes {
                    a: a.cluster.size(),
                    b: b.cluster.size(),
                    c: c.cluster.size(),
                };
                let updated = self.linkage.update(sizes, d_ac, d_bc, d_ab);
                for ix in [(a.slot, c.slot), (c.slot, a.slot)] {
                    if let Some(entry) = distances.get_mut(ix) {
                        *entry = updated;
                    }
                }
            }

            let slot = a.slot;
            let key = a.key.min(b.key);
            let (left, right) = match self.tie_break {
                TieBreak::Lexicographic if b.key < a.key => (b, a),
                TieBreak::Lexicographic | TieBreak::InsertionOrder => (a, b),
            };
            let merge = Merge {
                id: ClusterId(num_labels + merges.len()),
                left: left.cluster.id(),
                right: right.cluster.id(),
                distance: d_ab,
                size: left.cluster.size() + right.cluster.size(),
            };
            debug!(
                id = %merge.id,
                left = %merge.left,
                right = %merge.right,
                distance = merge.distance,
                size = merge.size,
                "merged clusters"
            );
            merges.push(merge);
            active.push(Active {
                cluster: Cluster::merge(merge.id, left.cluster, right.cluster, d_ab),
                slot,
                key,
            });
        }

        debug_assert_eq!(
            merges.len(),
            num_labels - 1,
            "There should be exactly one merge fewer than labels."
        );
        let root = active.pop().ok_or(Error::EmptyInput)?.cluster;
        Ok(Dendrogram { root, merges })
    }

    /// Find the closest pair of active clusters, as indices `(i, j)` with `i < j`.
    #[expect(
        clippy::indexing_slicing,
        reason = "The indices come from `0..active.len()`."
    )]
    fn closest_pair(
        &self,
        distances: &Array2<f64>,
        active: &[Active],
    ) -> Result<(usize, usize, f64), Error> {
        let pair_key = |i: usize, j: usize| {
            let (ki, kj) = (active[i].key, active[j].key);
            (ki.min(kj), ki.max(kj))
        };

        let mut best: Option<(usize, usize, f64)> = None;
        for (i, j) in (0..active.len()).tuple_combinations() {
            let distance = distance_between(distances, &active[i], &active[j])?;
            let closer = match best {
                None => true,
                Some((best_i, best_j, best_distance)) => distance
                    .total_cmp(&best_distance)
                    .then_with(|| {
                        self.tie_break
                            .compare(pair_key(i, j), pair_key(best_i, best_j))
                    })
                    .is_lt(),
            };
            if closer {
                best = Some((i, j, distance));
            }
        }
        trace!(candidates = active.len(), ?best, "closest pair");
        best.ok_or(Error::EmptyInput)
    }
}

/// Cluster all labels of `matrix` with [`Ward`]-linkage and [`TieBreak::Lexicographic`].
///
/// # Examples
///
/// ```
/// use chart_numerics::{cluster, leaf_order, DistanceMatrix};
///
/// let matrix = DistanceMatrix::from_nested([
///     ("A", vec![("B", 1.0), ("C", 4.0)]),
///     ("B", vec![("A", 1.0), ("C", 3.0)]),
///     ("C", vec![("A", 4.0), ("B", 3.0)]),
/// ])
/// .unwrap();
/// let root = cluster(&matrix).unwrap();
///
/// assert_eq!(root.to_string(), "((A, B), C)");
/// assert_eq!(leaf_order(&root), ["A", "B", "C"]);
/// ```
#[inline]
pub fn cluster(matrix: &DistanceMatrix) -> Result<Cluster, Error> {
    Agglomerative::ward().run(matrix).map(Dendrogram::into_root)
}
