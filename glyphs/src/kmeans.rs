//! Lloyd's k-means over equal-length vectors.
//!
//! Seeding picks evenly spaced inputs (centroid `j` starts at input
//! `j * n / k`), so a fixed input order always yields the same result.
//! Assignment ties go to the lowest cluster index. A cluster that loses all
//! of its members keeps its previous centroid.

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{GlyphError, Result};
use crate::vector::{mean, squared_distance};

/// Result of one k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansOutcome {
    /// Cluster index for each input vector.
    pub assignments: Vec<usize>,

    /// Final centroid of each cluster.
    pub centroids: Vec<Vec<f32>>,

    /// Assignment passes performed.
    pub iterations: usize,

    /// Whether the last pass changed no assignment.
    pub converged: bool,
}

/// Partition `vectors` into `k` clusters.
///
/// Requires `1 <= k <= vectors.len()` and `max_iterations >= 1`.
pub fn kmeans(
    vectors: &[&[f32]],
    k: usize,
    max_iterations: usize,
    cancel: &CancellationToken,
) -> Result<KMeansOutcome> {
    let n = vectors.len();
    if k == 0 || k > n {
        return Err(GlyphError::InvalidParameter(format!(
            "k must be between 1 and {n}, got {k}"
        )));
    }
    if max_iterations == 0 {
        return Err(GlyphError::InvalidParameter(
            "max_iterations must be positive".to_string(),
        ));
    }

    let dimension = vectors[0].len();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(GlyphError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }

    let mut centroids: Vec<Vec<f32>> = (0..k).map(|j| vectors[j * n / k].to_vec()).collect();
    let mut assignments = vec![usize::MAX; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations {
        if cancel.is_cancelled() {
            return Err(GlyphError::Cancelled);
        }
        iterations += 1;

        let next = vectors
            .par_iter()
            .map(|v| nearest(v, &centroids))
            .collect::<Result<Vec<usize>>>()?;
        let changed = next
            .iter()
            .zip(&assignments)
            .filter(|(a, b)| a != b)
            .count();
        assignments = next;

        debug!("k-means pass {iterations}: {changed} assignments changed");
        if changed == 0 {
            converged = true;
            break;
        }

        for (cluster, centroid) in centroids.iter_mut().enumerate() {
            let members = vectors
                .iter()
                .zip(&assignments)
                .filter(|(_, a)| **a == cluster)
                .map(|(v, _)| *v);
            if let Some(updated) = mean(members, dimension)? {
                *centroid = updated;
            }
        }
    }

    Ok(KMeansOutcome {
        assignments,
        centroids,
        iterations,
        converged,
    })
}

/// Index of the closest centroid; the lowest index wins ties.
fn nearest(v: &[f32], centroids: &[Vec<f32>]) -> Result<usize> {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (index, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(v, centroid)?;
        if d < best_distance {
            best = index;
            best_distance = d;
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(data: &[Vec<f32>], k: usize) -> KMeansOutcome {
        let refs: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();
        kmeans(&refs, k, 50, &CancellationToken::new()).unwrap()
    }

    #[test]
    fn test_nearest_prefers_lowest_index_on_tie() {
        let centroids = vec![vec![0.0, 0.0], vec![2.0, 0.0], vec![1.0, 1.0]];
        assert_eq!(nearest(&[1.0, 0.0], &centroids).unwrap(), 0);
        assert_eq!(nearest(&[1.9, 0.0], &centroids).unwrap(), 1);

        let err = nearest(&[1.0], &centroids).unwrap_err();
        assert!(matches!(
            err,
            GlyphError::DimensionMismatch {
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_two_obvious_groups() {
        let data = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.1],
        ];
        let outcome = run(&data, 2);

        assert_eq!(outcome.assignments[0], outcome.assignments[1]);
        assert_eq!(outcome.assignments[2], outcome.assignments[3]);
        assert_ne!(outcome.assignments[0], outcome.assignments[2]);
        assert!(outcome.converged);
    }

    #[test]
    fn test_seeding_is_evenly_spaced() {
        // n = 6, k = 3: seeds at 0, 2, 4.
        let data: Vec<Vec<f32>> = (0..6).map(|i| vec![i as f32 * 100.0]).collect();
        let refs: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();
        let outcome = kmeans(&refs, 3, 1, &CancellationToken::new()).unwrap();

        assert_eq!(outcome.assignments, vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_ties_go_to_lowest_index() {
        let centroids = vec![vec![0.0], vec![2.0]];
        assert_eq!(nearest(&[1.0], &centroids).unwrap(), 0);
    }

    #[test]
    fn test_identical_inputs_converge() {
        let data = vec![vec![0.5; 4]; 5];
        let outcome = run(&data, 3);

        assert!(outcome.converged);
        assert!(outcome.assignments.iter().all(|&a| a == 0));
    }

    #[test]
    fn test_iteration_cap_is_respected() {
        let data: Vec<Vec<f32>> = (0..40).map(|i| vec![(i * 7 % 13) as f32, i as f32]).collect();
        let refs: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();
        let outcome = kmeans(&refs, 5, 2, &CancellationToken::new()).unwrap();

        assert!(outcome.iterations <= 2);
    }

    #[test]
    fn test_k_larger_than_input_rejected() {
        let data = [vec![1.0]];
        let refs: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();
        assert!(kmeans(&refs, 2, 10, &CancellationToken::new()).is_err());
    }

    #[test]
    fn test_cancelled_before_first_pass() {
        let data = [vec![1.0], vec![2.0]];
        let refs: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = kmeans(&refs, 1, 10, &cancel).unwrap_err();
        assert!(matches!(err, GlyphError::Cancelled));
    }
}
