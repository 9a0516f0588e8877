//! The binary cluster-tree produced by agglomerative clustering.

use core::fmt;
use serde::{Deserialize, Serialize};

/// An opaque identifier for a cluster.
///
/// Leaves are numbered `0..n` in the order of the distance-matrix's labels, and every merge
/// takes the next free number, so the root of a tree over `n` labels is `2n - 2`.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ClusterId(pub usize);

impl fmt::Display for ClusterId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node in a dendrogram: either a single labelled item, or the merge of exactly two clusters.
///
/// Clusters are built bottom-up and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[expect(
    clippy::exhaustive_enums,
    reason = "A cluster is a leaf or a merge, there is nothing else it could be."
)]
pub enum Cluster {
    /// A singleton wrapping one row- or column-label.
    Leaf {
        /// The cluster's identifier.
        id: ClusterId,
        /// The original label.
        label: String,
    },
    /// The merge of two clusters.
    Internal {
        /// The cluster's identifier.
        id: ClusterId,
        /// The merged clusters, in leaf-order.
        children: Box<[Cluster; 2]>,
        /// The number of leaves below this node.
        size: usize,
        /// The linkage-distance at which the children were merged.
        distance: f64,
    },
}

impl Cluster {
    /// Create a leaf.
    #[inline]
    #[must_use]
    pub fn leaf(id: ClusterId, label: impl Into<String>) -> Self {
        Self::Leaf {
            id,
            label: label.into(),
        }
    }

    /// Merge two clusters into a new internal node.
    #[inline]
    #[must_use]
    pub fn merge(id: ClusterId, left: Self, right: Self, distance: f64) -> Self {
        Self::Internal {
            id,
            size: left.size() + right.size(),
            children: Box::new([left, right]),
            distance,
        }
    }

    /// The cluster's identifier.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ClusterId {
        match *self {
            Self::Leaf { id, .. } | Self::Internal { id, .. } => id,
        }
    }

    /// The number of leaves in this cluster.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        match *self {
            Self::Leaf { .. } => 1,
            Self::Internal { size, .. } => size,
        }
    }

    /// Whether this is a singleton.
    #[inline]
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }

    /// The label of a leaf, or `None` for a merge.
    #[inline]
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Leaf { label, .. } => Some(label.as_str()),
            Self::Internal { .. } => None,
        }
    }

    /// The two merged children, or `None` for a leaf.
    #[inline]
    #[must_use]
    pub fn children(&self) -> Option<&[Self; 2]> {
        match self {
            Self::Leaf { .. } => None,
            Self::Internal { children, .. } => Some(&**children),
        }
    }

    /// The merge-distance, `0.0` for a leaf.
    ///
    /// This is what a dendrogram plots on its distance-axis.
    #[inline]
    #[must_use]
    pub const fn distance(&self) -> f64 {
        match *self {
            Self::Leaf { .. } => 0.0,
            Self::Internal { distance, .. } => distance,
        }
    }

    /// The number of edges on the longest path from this node down to a leaf.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.children().map_or(0, |[left, right]| {
            1 + left.depth().max(right.depth())
        })
    }

    /// Iterate over the labels of all leaves, first child before second child.
    ///
    /// # Examples
    ///
    /// ```
    /// use chart_numerics::{Cluster, ClusterId};
    ///
    /// let tree = Cluster::merge(
    ///     ClusterId(4),
    ///     Cluster::leaf(ClusterId(2), "C"),
    ///     Cluster::merge(
    ///         ClusterId(3),
    ///         Cluster::leaf(ClusterId(0), "A"),
    ///         Cluster::leaf(ClusterId(1), "B"),
    ///         1.0,
    ///     ),
    ///     3.0,
    /// );
    /// assert_eq!(tree.leaves().collect::<Vec<_>>(), ["C", "A", "B"]);
    /// ```
    #[inline]
    #[must_use]
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves { stack: vec![self] }
    }
}

impl fmt::Display for Cluster {
    /// Leaves print as their label, merges as a parenthesised pair, e.g. `(C, (A, B))`.
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf { label, .. } => f.write_str(label),
            Self::Internal { children, .. } => {
                let [left, right] = &**children;
                write!(f, "({left}, {right})")
            }
        }
    }
}

/// An iterator over the leaf-labels of a cluster, see [`Cluster::leaves`].
#[derive(Debug, Clone)]
pub struct Leaves<'a> {
    stack: Vec<&'a Cluster>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a str;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.pop()? {
                Cluster::Leaf { label, .. } => return Some(label.as_str()),
                Cluster::Internal { children, .. } => {
                    let [left, right] = &**children;
                    // The stack is LIFO, so push the second child first.
                    self.stack.push(right);
                    self.stack.push(left);
                }
            }
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let count = self.stack.iter().map(|c| c.size()).sum();
        (count, Some(count))
    }
}

impl ExactSizeIterator for Leaves<'_> {}

/// The labels of a tree's leaves in display-order.
///
/// Visits the first child before the second at every merge and never re-sorts, so the order
/// reflects the merge-history. Use it to sort a heatmap's rows or columns to match its dendrogram.
#[inline]
#[must_use]
pub fn leaf_order(root: &Cluster) -> Vec<String> {
    root.leaves().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools as _;

    fn leaf(id: usize, label: &str) -> Cluster {
        Cluster::leaf(ClusterId(id), label)
    }

    /// `((A, B), (C, (D, E)))`
    fn sample_tree() -> Cluster {
        Cluster::merge(
            ClusterId(8),
            Cluster::merge(ClusterId(5), leaf(0, "A"), leaf(1, "B"), 1.0),
            Cluster::merge(
                ClusterId(7),
                leaf(2, "C"),
                Cluster::merge(ClusterId(6), leaf(3, "D"), leaf(4, "E"), 2.0),
                3.0,
            ),
            5.0,
        )
    }

    #[test]
    fn accessors() {
        let tree = sample_tree();
        assert_eq!(tree.id(), ClusterId(8));
        assert_eq!(tree.size(), 5);
        assert!(!tree.is_leaf());
        assert_eq!(tree.label(), None);
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.to_string(), "((A, B), (C, (D, E)))");

        let a = leaf(0, "A");
        assert!(a.is_leaf());
        assert_eq!(a.label(), Some("A"));
        assert_eq!(a.children(), None);
        assert_eq!(a.depth(), 0);
        assert_eq!(a.size(), 1);
        assert_eq!(ClusterId(3).to_string(), "#3");
    }

    #[test]
    fn leaves_in_child_order() {
        let tree = sample_tree();
        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 5);
        assert_eq!(leaves.collect_vec(), ["A", "B", "C", "D", "E"]);
        assert_eq!(leaf_order(&tree), leaf_order(&tree));

        let [left, right] = tree.children().expect("The root is a merge.").clone();
        let swapped = Cluster::merge(ClusterId(8), right, left, 5.0);
        assert_eq!(leaf_order(&swapped), ["C", "D", "E", "A", "B"]);
    }

    #[test]
    fn deep_chain() {
        let mut tree = leaf(0, "0");
        for i in 1..2_000 {
            tree = Cluster::merge(
                ClusterId(2_000 + i),
                tree,
                leaf(i, &i.to_string()),
                f64::from(u32::try_from(i).expect("Small enough.")),
            );
        }
        let order = leaf_order(&tree);
        assert_eq!(order.len(), 2_000);
        assert_eq!(order.first().map(String::as_str), Some("0"));
        assert_eq!(order.last().map(String::as_str), Some("1999"));
        assert_eq!(tree.depth(), 1_999);
    }
}
