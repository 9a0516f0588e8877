#![allow(missing_docs, reason = "Docs aren't be necessary for tests.")]
#![allow(
    clippy::tests_outside_test_module,
    reason = "This is an integration-test. This is a false-positive by clippy, see https://github.com/rust-lang/rust-clippy/issues/11024"
)]

use chart_numerics::distribution::{Bandwidth, BoxStats, Kde, Kernel};
use chart_numerics::regression::LinearFit;
use chart_numerics::*;
use itertools::Itertools as _;
use ndarray::{array, Array};
use ndarray_rand::RandomExt;
use rand::{distributions::Uniform, rngs::StdRng, SeedableRng};
use serde_json::json;

fn labels(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("p{i:02}")).collect()
}

fn square_grid() -> Vec<Point> {
    // Looks like this:
    //
    //  ::  ::
    //
    //  ::  ::
    //
    vec![
        array![0.0, 0.0],
        array![1.0, 0.0],
        array![0.0, 1.0],
        array![1.0, 1.0],
        array![0.0, 4.0],
        array![1.0, 4.0],
        array![0.0, 5.0],
        array![1.0, 5.0],
        array![4.0, 0.0],
        array![5.0, 0.0],
        array![4.0, 1.0],
        array![5.0, 1.0],
        array![4.0, 4.0],
        array![5.0, 4.0],
        array![4.0, 5.0],
        array![5.0, 5.0],
    ]
}

fn random_points(rng: &mut StdRng, count: usize) -> Vec<Point> {
    (0..count)
        .map(|_| Array::random_using(3, Uniform::new(-10.0, 10.0), rng))
        .collect()
}

/// Checks that hold for every dendrogram, whatever the linkage.
fn assert_well_formed(dendrogram: &Dendrogram, matrix: &DistanceMatrix) {
    let n = matrix.len();
    let root = dendrogram.root();
    assert_eq!(dendrogram.merges().len(), n - 1);
    assert_eq!(root.size(), n);
    assert_eq!(root.leaves().len(), n);
    assert!(root.depth() < n);
    assert_eq!(root.id(), ClusterId(2 * n - 2));

    let order = leaf_order(root);
    assert_eq!(order, leaf_order(root), "Leaf-order should be idempotent.");
    assert_eq!(
        order.iter().sorted().collect_vec(),
        matrix.labels().iter().sorted().collect_vec(),
        "Leaf-order should be a permutation of the labels."
    );

    for (ix, merge) in dendrogram.merges().iter().enumerate() {
        assert_eq!(merge.id, ClusterId(n + ix));
        assert!(merge.left < merge.id && merge.right < merge.id);
    }
}

#[test]
fn three_labels() {
    let matrix = DistanceMatrix::from_nested([
        ("A", vec![("B", 1.0), ("C", 4.0)]),
        ("B", vec![("A", 1.0), ("C", 3.0)]),
        ("C", vec![("A", 4.0), ("B", 3.0)]),
    ])
    .expect("All labels are known.");
    let dendrogram = Agglomerative::ward().run(&matrix).expect("Matrix is valid.");
    assert_well_formed(&dendrogram, &matrix);

    let first = dendrogram.merges().first().expect("Three labels merge twice.");
    assert_eq!((first.left, first.right), (ClusterId(0), ClusterId(1)));
    assert!((first.distance - 1.0).abs() < 1e-12);

    let root = dendrogram.root();
    let [pair, single] = root.children().expect("The root is a merge.");
    assert_eq!(pair.children().map(|[a, b]| (a.label(), b.label())), Some((Some("A"), Some("B"))));
    assert_eq!(single, &Cluster::leaf(ClusterId(2), "C"));
    assert_eq!(leaf_order(root), ["A", "B", "C"]);
}

#[test]
fn single_label() {
    let matrix = DistanceMatrix::new(["A"]);
    let root = cluster(&matrix).expect("A single label needs no distances.");
    assert_eq!(root, Cluster::leaf(ClusterId(0), "A"));
    assert_eq!(leaf_order(&root), ["A"]);
}

#[test]
fn missing_distance() {
    let matrix = DistanceMatrix::from_nested([
        ("A", vec![("B", 1.0)]),
        ("B", vec![("A", 1.0), ("C", 3.0)]),
        ("C", vec![("B", 3.0)]),
    ])
    .expect("All labels are known.");
    assert!(matches!(
        cluster(&matrix),
        Err(Error::InvalidMatrix(MatrixDefect::Missing { .. }))
    ));
}

#[test]
fn empty_input() {
    assert_eq!(
        cluster(&DistanceMatrix::new(Vec::<String>::new())),
        Err(Error::EmptyInput)
    );
    assert_eq!(
        DistanceMatrix::squared_euclidean(Vec::<String>::new(), &[]),
        Err(Error::EmptyInput)
    );
}

#[test]
fn invalid_entries() {
    for (value, reverse) in [(f64::NAN, 1.0), (-1.0, -1.0), (1.0, 2.0)] {
        let mut matrix = DistanceMatrix::new(["A", "B"]);
        matrix.set("A", "B", value).expect("Labels are known.");
        matrix.set("B", "A", reverse).expect("Labels are known.");
        assert!(
            matches!(cluster(&matrix), Err(Error::InvalidMatrix(_))),
            "({value}, {reverse}) should be rejected"
        );
    }
}

#[test]
fn builder_defaults() {
    let observations = [Observation::new("A", "A", 0.9)];
    let matrix = LabeledMatrix::build(&observations, ["A", "B"], ["A", "B"], MatrixOptions::default());
    assert_eq!(matrix.get("A", "B"), Some(0.0));
    assert_eq!(matrix.get("B", "A"), Some(0.0));
    assert_eq!(matrix.get("B", "B"), Some(1.0));
    assert_eq!(matrix.get("A", "A"), Some(0.9));
}

#[test]
fn square_grid_quadrants() {
    let points = square_grid();
    let matrix =
        DistanceMatrix::squared_euclidean(labels(16), &points).expect("Points are well-formed.");
    let dendrogram = Agglomerative::ward().run(&matrix).expect("Matrix is valid.");
    assert_well_formed(&dendrogram, &matrix);

    let quadrants = dendrogram
        .level(4)
        .expect("Level is in range.")
        .into_iter()
        .map(|cluster| cluster.leaves().sorted().collect_vec())
        .sorted()
        .collect_vec();
    let expected = labels(16)
        .chunks(4)
        .map(<[String]>::to_vec)
        .collect_vec();
    assert_eq!(
        quadrants,
        expected
            .iter()
            .map(|quadrant| quadrant.iter().map(String::as_str).collect_vec())
            .collect_vec()
    );

    // Within-quadrant merges all come before the merges across quadrants.
    let (within, across) = dendrogram.merges().split_at(12);
    let highest_within = within.iter().map(|m| m.distance).fold(0.0, f64::max);
    assert!(across.iter().all(|m| m.distance > highest_within));
}

#[test]
fn random_instances() {
    let mut rng = StdRng::seed_from_u64(1234);
    for count in [2, 3, 5, 8, 13, 21] {
        let points = random_points(&mut rng, count);
        let matrix = DistanceMatrix::squared_euclidean(labels(count), &points)
            .expect("Points are well-formed.");
        for tie_break in [TieBreak::Lexicographic, TieBreak::InsertionOrder] {
            let ward = Agglomerative::ward()
                .tie_break(tie_break)
                .run(&matrix)
                .expect("Matrix is valid.");
            assert_well_formed(&ward, &matrix);
            assert!(ward
                .merges()
                .iter()
                .tuple_windows()
                .all(|(earlier, later)| later.distance >= earlier.distance - 1e-9));

            let centroid = Agglomerative::new(Centroid)
                .tie_break(tie_break)
                .run(&matrix)
                .expect("Matrix is valid.");
            assert_well_formed(&centroid, &matrix);
            let median = Agglomerative::new(Median)
                .tie_break(tie_break)
                .run(&matrix)
                .expect("Matrix is valid.");
            assert_well_formed(&median, &matrix);
        }
    }
}

#[test]
fn ward_merges_never_undercut_closer_child() {
    let mut rng = StdRng::seed_from_u64(99);
    let points = random_points(&mut rng, 12);
    let matrix =
        DistanceMatrix::squared_euclidean(labels(12), &points).expect("Points are well-formed.");
    let root = cluster(&matrix).expect("Matrix is valid.");

    let mut stack = vec![&root];
    while let Some(node) = stack.pop() {
        if let Some([left, right]) = node.children() {
            assert!(node.distance() >= left.distance().min(right.distance()));
            stack.extend([left, right]);
        }
    }
}

#[test]
fn heatmap_pipeline() {
    // Similarities between genes, each pair observed only once.
    let observations = [
        Observation::new("beta", "alpha", 0.9),
        Observation::new("gamma", "alpha", 0.1),
        Observation::new("gamma", "beta", 0.2),
        Observation::new("delta", "alpha", 0.15),
        Observation::new("delta", "beta", 0.1),
        Observation::new("delta", "gamma", 0.8),
    ];
    let genes = ["alpha", "beta", "gamma", "delta"];
    let samples = ["delta", "gamma", "beta", "alpha"];
    let similarities =
        LabeledMatrix::build(&observations, genes, samples, MatrixOptions::default());
    assert_eq!(similarities.get("alpha", "beta"), Some(0.9));
    assert_eq!(similarities.get("gamma", "gamma"), Some(1.0));

    let distances = DistanceMatrix::try_from(similarities.clone())
        .expect("Rows and columns share their labels.")
        .similarity_to_distance();
    assert_eq!(distances.labels(), genes);
    let root = cluster(&distances).expect("Matrix is complete.");
    let order = leaf_order(&root);
    assert_eq!(order, ["alpha", "beta", "delta", "gamma"]);

    let heatmap = similarities
        .reorder(&order, &order)
        .expect("Leaf-order only contains known labels.");
    assert_eq!(heatmap.rows(), order);
    assert_eq!(heatmap.cols(), order);
    assert_eq!(heatmap.values()[[0, 1]], 0.9);
    assert_eq!(heatmap.values()[[2, 3]], 0.8);
}

#[test]
fn rectangular_tables_are_not_distances() {
    let matrix = LabeledMatrix::build(
        &[Observation::new("A", "X", 1.0)],
        ["A"],
        ["X"],
        MatrixOptions::default(),
    );
    assert_eq!(
        DistanceMatrix::try_from(matrix),
        Err(Error::InvalidMatrix(MatrixDefect::NotSquare))
    );
}

#[test]
fn serialized_tree() {
    let matrix = DistanceMatrix::from_nested([("A", [("B", 2.0)]), ("B", [("A", 2.0)])])
        .expect("All labels are known.");
    let dendrogram = Agglomerative::ward().run(&matrix).expect("Matrix is valid.");

    let value = serde_json::to_value(dendrogram.root()).expect("Trees serialize.");
    assert_eq!(
        value,
        json!({
            "kind": "internal",
            "id": 2,
            "children": [
                {"kind": "leaf", "id": 0, "label": "A"},
                {"kind": "leaf", "id": 1, "label": "B"},
            ],
            "size": 2,
            "distance": 2.0,
        })
    );

    let text = serde_json::to_string(&dendrogram).expect("Dendrograms serialize.");
    let parsed: Dendrogram = serde_json::from_str(&text).expect("Dendrograms deserialize.");
    assert_eq!(parsed, dendrogram);
}

#[test]
fn violin_and_box() {
    let sample = (1..=9).map(f64::from).chain([100.0, f64::NAN]).collect_vec();
    let stats = BoxStats::tukey(&sample).expect("Sample has finite values.");
    assert_eq!((stats.q1, stats.median, stats.q3), (3.25, 5.5, 7.75));
    assert_eq!(stats.outliers.as_slice(), [100.0]);
    assert_eq!(stats.upper_whisker, 9.0);

    let kde = Kde::new(Kernel::Epanechnikov, Bandwidth::Fixed(0.5));
    let curve = kde
        .estimate_evenly(&[0.0, 3.0, 4.0, 10.0], 2_001)
        .expect("Valid input.");
    let area: f64 = curve
        .iter()
        .tuple_windows()
        .map(|(&(x0, y0), &(x1, y1))| (x1 - x0) * (y0 + y1) / 2.0)
        .sum();
    assert!((area - 1.0).abs() < 1e-3, "area is {area}");
    assert_eq!(curve.first().map(|&(_, y)| y), Some(0.0));
}

#[test]
fn trend_line() {
    let points = (0..10)
        .map(f64::from)
        .map(|x| (x, 0.5f64.mul_add(-x, 3.0)))
        .collect_vec();
    let fit = LinearFit::least_squares(&points).expect("Enough points.");
    assert!((fit.slope + 0.5).abs() < 1e-12);
    assert!((fit.intercept - 3.0).abs() < 1e-12);
    assert!((fit.r_squared - 1.0).abs() < 1e-12);
    assert!((fit.predict(20.0) + 7.0).abs() < 1e-9);
}
