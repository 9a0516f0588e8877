//! Searching for point-sets whose centroid-linkage dendrogram inverts badly.
//!
//! Centroid linkage can merge a pair at a smaller distance than an earlier merge, which draws a
//! dendrogram with crossing branches. This runs an evolutionary search for small point-sets
//! maximising that inversion, relative to the tallest merge. Ward's linkage on the same points
//! is reported alongside and should never invert.
//!
//! Build with `--features search`. Set `RUST_LOG=debug` to see more than the per-round summary.

use core::cmp::Reverse;

use chart_numerics::{Agglomerative, Centroid, DistanceMatrix, Linkage, Point, Ward};
use itertools::Itertools as _;
use ndarray::{Array, Array1};
use ndarray_rand::{rand_distr::StandardNormal, RandomExt};
use ordered_float::OrderedFloat;
use rand::{distributions::Uniform, rngs::ThreadRng};
use rayon::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const NUM_POINTS: usize = 6;
const DIMENSION: usize = 2;
const GENERATIONS_BETWEEN_REPLACEMENTS: u32 = 250;
const MAX_GENERATIONS: u32 = 5_000;

type Population = [Point; NUM_POINTS];

/// The largest drop in merge-distance between consecutive merges, divided by the largest
/// merge-distance. Zero for monotone dendrograms.
fn relative_inversion<L: Linkage>(linkage: L, points: &Population) -> f64 {
    let labels = (0..NUM_POINTS).map(|i| i.to_string());
    let dendrogram = DistanceMatrix::squared_euclidean(labels, points)
        .and_then(|matrix| Agglomerative::new(linkage).run(&matrix));
    let dendrogram = match dendrogram {
        Ok(dendrogram) => dendrogram,
        Err(err) => {
            warn!(%err, "skipping population");
            return 0.0;
        }
    };
    let tallest = dendrogram
        .merges()
        .iter()
        .map(|merge| merge.distance)
        .fold(0.0, f64::max);
    if tallest <= 0.0 {
        return 0.0;
    }
    let deepest = dendrogram
        .merges()
        .iter()
        .tuple_windows()
        .map(|(earlier, later)| earlier.distance - later.distance)
        .fold(0.0, f64::max);
    deepest / tallest
}

/// Move every point by Gaussian noise with standard deviation `spread`.
fn jiggle(points: &Population, rng: &mut ThreadRng, spread: f64) -> Population {
    points.clone().map(|point: Point| {
        let noise: Array1<f64> = Array::random_using(DIMENSION, StandardNormal, rng);
        point + spread * noise
    })
}

/// Noise-level at a generation, decaying by `1/e` every 250 generations.
fn spread(generation: u32) -> f64 {
    (-f64::from(generation) / 250.0).exp()
}

fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let get_score = |points: &Population| relative_inversion(Centroid, points);

    let mut rng = rand::thread_rng();
    let num_populations = std::thread::available_parallelism()
        .map(std::num::NonZero::get)
        .unwrap_or(1)
        .max(2);
    let mut populations: Vec<(f64, Population)> = (0..num_populations)
        .map(|_| {
            let population = [0; NUM_POINTS]
                .map(|_| Array::random_using(DIMENSION, Uniform::new(0.0, 1.0), &mut rng));
            (get_score(&population), population)
        })
        .collect();

    let mut generation: u32 = 0;
    while generation < MAX_GENERATIONS {
        let current_generation = generation;
        populations.par_iter_mut().for_each(|(score, population)| {
            let mut rng = rand::thread_rng();
            for gen in current_generation..(current_generation + GENERATIONS_BETWEEN_REPLACEMENTS)
            {
                let candidate = jiggle(population, &mut rng, spread(gen));
                let candidate_score = get_score(&candidate);
                if candidate_score > *score {
                    *score = candidate_score;
                    *population = candidate;
                }
            }
        });
        generation += GENERATIONS_BETWEEN_REPLACEMENTS;

        populations.sort_by_key(|p| Reverse(OrderedFloat(p.0)));
        let Some((best_score, best)) = populations.first() else {
            break;
        };
        let scores = populations.iter().map(|p| format!("{:.3}", p.0)).join(", ");
        info!(
            generation,
            spread = spread(generation),
            %scores,
            best = *best_score,
            ward = relative_inversion(Ward, best),
            "round finished"
        );
        println!("[{}]", best.iter().map(|point| format!("{point}")).join(", "));

        // Replace the worst half with the best half.
        let half = num_populations / 2;
        populations.truncate(num_populations - half);
        populations.extend_from_within(..half);
    }
}
