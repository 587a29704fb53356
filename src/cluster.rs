//! K-means clustering over flow vectors.
//!
//! Used by the SIMILARITY heuristic to group per-edge flow vectors into
//! structurally distinct circulation patterns. Centroids are seeded
//! k-means++ style from the explicit RNG so that a fixed seed reproduces
//! identical clusterings.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::Rng;

/// Default Lloyd iteration cap.
pub const KMEANS_MAX_ITER: usize = 50;

/// Squared Euclidean distance between two rows.
fn row_distance_sq(a: &Array2<f64>, i: usize, b: &Array2<f64>, j: usize) -> f64 {
    let dim = a.ncols();
    let mut acc = 0.0;
    for d in 0..dim {
        let diff = a[[i, d]] - b[[j, d]];
        acc += diff * diff;
    }
    acc
}

/// Pairwise Euclidean distances between the rows of `a` and the rows of `b`.
///
/// Result is shaped `[a.nrows() × b.nrows()]`.
pub fn pairwise_distance(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    debug_assert_eq!(a.ncols(), b.ncols());
    let mut out = Array2::zeros((a.nrows(), b.nrows()));
    for i in 0..a.nrows() {
        for j in 0..b.nrows() {
            out[[i, j]] = row_distance_sq(a, i, b, j).sqrt();
        }
    }
    out
}

/// Cluster the rows of `points` into `k` groups; returns the `k` centers
/// as rows of the output matrix.
///
/// `k` is clamped to the number of points. Empty clusters keep their
/// previous center.
pub fn kmeans(points: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = points.nrows();
    let dim = points.ncols();
    let k = k.min(n);
    if k == 0 || n == 0 {
        return Array2::zeros((0, dim));
    }

    let mut centers = Array2::zeros((k, dim));

    // k-means++ seeding: first center uniform, the rest proportional to
    // squared distance from the nearest chosen center.
    let first = rng.gen_range(0..n);
    for d in 0..dim {
        centers[[0, d]] = points[[first, d]];
    }
    let mut nearest_sq = vec![f64::INFINITY; n];
    for c in 1..k {
        for i in 0..n {
            let dist = row_distance_sq(points, i, &centers, c - 1);
            if dist < nearest_sq[i] {
                nearest_sq[i] = dist;
            }
        }
        let total: f64 = nearest_sq.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut idx = n - 1;
            for (i, &d) in nearest_sq.iter().enumerate() {
                target -= d;
                if target <= 0.0 {
                    idx = i;
                    break;
                }
            }
            idx
        } else {
            rng.gen_range(0..n)
        };
        for d in 0..dim {
            centers[[c, d]] = points[[chosen, d]];
        }
    }

    let mut assignment = vec![0usize; n];
    for _ in 0..KMEANS_MAX_ITER {
        // Assign each point to its nearest center.
        let mut changed = false;
        for i in 0..n {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for c in 0..k {
                let dist = row_distance_sq(points, i, &centers, c);
                if dist < best_dist {
                    best_dist = dist;
                    best = c;
                }
            }
            if assignment[i] != best {
                assignment[i] = best;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        // Recompute centers as cluster means.
        let mut sums = Array2::<f64>::zeros((k, dim));
        let mut counts = vec![0usize; k];
        for i in 0..n {
            let c = assignment[i];
            counts[c] += 1;
            for d in 0..dim {
                sums[[c, d]] += points[[i, d]];
            }
        }
        for c in 0..k {
            if counts[c] > 0 {
                for d in 0..dim {
                    centers[[c, d]] = sums[[c, d]] / counts[c] as f64;
                }
            }
        }
    }

    centers
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn pairwise_distance_shape_and_values() {
        let a = array![[0.0, 0.0], [3.0, 4.0]];
        let b = array![[0.0, 0.0]];
        let d = pairwise_distance(&a, &b);
        assert_eq!(d.shape(), &[2, 1]);
        assert!(d[[0, 0]].abs() < 1e-12);
        assert!((d[[1, 0]] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn separated_blobs_recover_centers() {
        let points = array![
            [0.0, 0.1],
            [0.1, 0.0],
            [-0.1, 0.0],
            [10.0, 10.1],
            [10.1, 10.0],
            [9.9, 10.0],
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let centers = kmeans(&points, 2, &mut rng);
        assert_eq!(centers.nrows(), 2);
        // One center near the origin, one near (10, 10).
        let mut near_origin = false;
        let mut near_ten = false;
        for c in 0..2 {
            let norm = (centers[[c, 0]].powi(2) + centers[[c, 1]].powi(2)).sqrt();
            if norm < 1.0 {
                near_origin = true;
            }
            if (norm - 14.21).abs() < 1.0 {
                near_ten = true;
            }
        }
        assert!(near_origin && near_ten, "centers = {:?}", centers);
    }

    #[test]
    fn k_clamped_to_point_count() {
        let points = array![[1.0], [2.0]];
        let mut rng = StdRng::seed_from_u64(0);
        let centers = kmeans(&points, 11, &mut rng);
        assert_eq!(centers.nrows(), 2);
    }

    #[test]
    fn same_seed_same_centers() {
        let points = array![[0.0, 1.0], [5.0, 2.0], [3.0, 3.0], [8.0, 1.0]];
        let a = kmeans(&points, 2, &mut StdRng::seed_from_u64(99));
        let b = kmeans(&points, 2, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }
}
