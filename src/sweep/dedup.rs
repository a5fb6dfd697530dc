//! sweep::dedup — merge near-duplicate refined points.
//!
//! Greedy single-linkage pass in `(value, index)` order: points are visited
//! from best to worst value (ties by lower input index, `NaN` last) and a
//! point survives unless a point that already survived lies strictly closer
//! than `distance_tolerance`. The survivors come out ranked the same way.
//!
//! Consequences:
//! - No two output points are closer than `distance_tolerance`.
//! - Every dropped point has a better-or-equal representative within the
//!   tolerance, so the better value of each cluster survives.
//! - Running the pass on its own output is a no-op.
use crate::{
    errors::{PipelineError, PipelineResult},
    optimization::local_optimizer::types::Point,
    refinement::result::euclidean,
};
use std::cmp::Ordering;

/// deduplicate_indices — input indices of the surviving points, ranked by
/// value.
///
/// # Errors
/// - [`PipelineError::InvalidSequence`] when `points` and `values` differ in
///   length.
/// - [`PipelineError::DimensionMismatch`] when a point's length differs
///   from the first point's.
/// - [`PipelineError::InvalidConfig`] for a non-finite or non-positive
///   `distance_tolerance`.
pub fn deduplicate_indices(
    points: &[Point], values: &[f64], distance_tolerance: f64,
) -> PipelineResult<Vec<usize>> {
    if points.len() != values.len() {
        return Err(PipelineError::InvalidSequence {
            reason: format!(
                "points and values must have equal length, got {} and {}",
                points.len(),
                values.len()
            ),
        });
    }
    if !distance_tolerance.is_finite() || distance_tolerance <= 0.0 {
        return Err(PipelineError::InvalidConfig {
            field: "distance_tolerance",
            value: distance_tolerance,
            reason: "Distance tolerance must be finite and positive.",
        });
    }
    let dim = points.first().map_or(0, |p| p.len());
    if let Some(bad) = points.iter().find(|p| p.len() != dim) {
        return Err(PipelineError::DimensionMismatch { expected: dim, found: bad.len() });
    }

    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| rank(values[a], values[b]).then(a.cmp(&b)));

    let mut kept: Vec<usize> = Vec::new();
    for idx in order {
        let duplicate =
            kept.iter().any(|&k| euclidean(&points[k], &points[idx]) < distance_tolerance);
        if !duplicate {
            kept.push(idx);
        }
    }
    Ok(kept)
}

/// deduplicate — surviving points and values, ranked by value.
///
/// # Errors
/// See [`deduplicate_indices`].
pub fn deduplicate(
    points: &[Point], values: &[f64], distance_tolerance: f64,
) -> PipelineResult<(Vec<Point>, Vec<f64>)> {
    let kept = deduplicate_indices(points, values, distance_tolerance)?;
    Ok(kept.into_iter().map(|i| (points[i].clone(), values[i])).unzip())
}

// ---- Helper methods ----

/// Ascending by value with `NaN` ranked worst.
fn rank(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.total_cmp(&b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Merging with the better value retained and index tie-breaking.
    // - Separation of the output and idempotence.
    // - Input validation.
    // -------------------------------------------------------------------------

    fn sample() -> (Vec<Point>, Vec<f64>) {
        let points = vec![
            array![0.0, 0.0],
            array![0.005, 0.0],
            array![1.0, 1.0],
            array![0.0, 0.004],
            array![1.003, 1.0],
            array![-1.0, 0.5],
        ];
        let values = vec![-1.0, -1.2, 0.3, -1.2, 0.1, f64::NAN];
        (points, values)
    }

    #[test]
    // Purpose
    // -------
    // Near-duplicates collapse onto their best-valued member, ties keep the
    // lower index, and NaN values rank last.
    //
    // Given
    // -----
    // - Cluster A: indices 0, 1, 3 (values -1.0, -1.2, -1.2).
    // - Cluster B: indices 2, 4 (values 0.3, 0.1).
    // - Isolated NaN point at index 5.
    //
    // Expect
    // ------
    // - Survivors `[1, 4, 5]` in that order.
    fn keeps_best_representative_per_cluster() {
        let (points, values) = sample();

        let kept = deduplicate_indices(&points, &values, 0.01).expect("dedup");

        assert_eq!(kept, vec![1, 4, 5]);
    }

    #[test]
    // Purpose
    // -------
    // Output points are pairwise separated and a second pass changes
    // nothing.
    fn output_is_separated_and_idempotent() {
        let (points, values) = sample();
        let tol = 0.01;

        let (p1, v1) = deduplicate(&points, &values, tol).expect("first pass");
        let (p2, v2) = deduplicate(&p1, &v1, tol).expect("second pass");

        for i in 0..p1.len() {
            for j in (i + 1)..p1.len() {
                assert!(euclidean(&p1[i], &p1[j]) >= tol);
            }
        }
        assert_eq!(p1, p2);
        assert_eq!(v1.len(), v2.len());
        for (a, b) in v1.iter().zip(v2.iter()) {
            assert!(a == b || (a.is_nan() && b.is_nan()));
        }
    }

    #[test]
    // Purpose
    // -------
    // Points exactly at the tolerance are distinct.
    fn boundary_distance_is_not_duplicate() {
        let points = vec![array![0.0], array![0.5]];
        let kept = deduplicate_indices(&points, &[0.0, 0.0], 0.5).expect("dedup");
        assert_eq!(kept, vec![0, 1]);
    }

    #[test]
    // Purpose
    // -------
    // Malformed input is rejected.
    fn rejects_bad_input() {
        let points = vec![array![0.0]];
        assert!(matches!(
            deduplicate(&points, &[0.0, 1.0], 0.1),
            Err(PipelineError::InvalidSequence { .. })
        ));
        assert!(matches!(
            deduplicate(&points, &[0.0], 0.0),
            Err(PipelineError::InvalidConfig { field: "distance_tolerance", .. })
        ));
        assert_eq!(deduplicate(&[], &[], 0.1).expect("empty"), (vec![], vec![]));
        assert!(matches!(
            deduplicate(&[array![0.0, 0.0], array![0.0]], &[0.0, 1.0], 0.1),
            Err(PipelineError::DimensionMismatch { expected: 2, found: 1 })
        ));
    }
}
