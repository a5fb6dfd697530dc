//! sweep::region — orthant decomposition of a box domain.
//!
//! The domain `center ± half_width` is split into `2ⁿ` overlapping boxes, one
//! per sign pattern `s ∈ {-1, +1}ⁿ`. Each box is shifted by
//! `(1 - overlap)·half_width/2` along `s` and has half-width
//! `(0.5 + overlap)·half_width`, so neighbouring regions share a slab of
//! width `overlap·half_width` around every coordinate hyperplane through the
//! center. A critical point near a region boundary therefore lies in the
//! interior of at least one region.
use crate::{
    errors::{PipelineError, PipelineResult},
    optimization::local_optimizer::types::Point,
};
use ndarray::Array1;
use serde::Serialize;
use std::fmt;

/// One orthant box of the decomposition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub id: usize,
    pub sign_pattern: Vec<i8>,
    pub center: Point,
    pub half_widths: Point,
}

impl Region {
    pub fn dim(&self) -> usize {
        self.center.len()
    }

    /// Map a physical point into the region's reference cube `[-1, 1]ⁿ`.
    pub fn to_reference(&self, x: &Point) -> Point {
        (x - &self.center) / &self.half_widths
    }

    /// Map reference coordinates back into the region.
    pub fn to_physical(&self, u: &Point) -> Point {
        &self.center + &(u * &self.half_widths)
    }

    /// True when reference coordinates lie in `[-1 - slack, 1 + slack]ⁿ`.
    pub fn contains_reference(&self, u: &Point, slack: f64) -> bool {
        u.iter().all(|&ua| ua.is_finite() && ua.abs() <= 1.0 + slack)
    }

    /// True when the physical point lies inside the region (closed box).
    pub fn contains(&self, x: &Point) -> bool {
        self.contains_reference(&self.to_reference(x), 0.0)
    }

    /// Short label such as `region 3 (+,-)`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let signs: Vec<&str> =
            self.sign_pattern.iter().map(|&s| if s > 0 { "+" } else { "-" }).collect();
        write!(f, "region {} ({})", self.id, signs.join(","))
    }
}

/// decompose — split `center ± half_width` into `2ⁿ` overlapping regions.
///
/// Region `k + 1` carries sign pattern `s` with `s_a = +1` exactly when bit
/// `a` of `k` is set.
///
/// # Errors
/// - [`PipelineError::InvalidDimension`] if `dimension == 0` or `2ⁿ` does not
///   fit in a `usize`.
/// - [`PipelineError::DimensionMismatch`] if `center.len() != dimension`.
/// - [`PipelineError::InvalidConfig`] for a non-finite or non-positive
///   `half_width`, an `overlap_fraction` outside `[0, 1)`, or a non-finite
///   center coordinate.
pub fn decompose(
    dimension: usize, center: &Point, half_width: f64, overlap_fraction: f64,
) -> PipelineResult<Vec<Region>> {
    if dimension == 0 {
        return Err(PipelineError::InvalidDimension {
            dimension,
            reason: "Dimension must be at least 1.",
        });
    }
    if dimension >= usize::BITS as usize {
        return Err(PipelineError::InvalidDimension {
            dimension,
            reason: "Too many dimensions to enumerate every orthant.",
        });
    }
    if center.len() != dimension {
        return Err(PipelineError::DimensionMismatch { expected: dimension, found: center.len() });
    }
    if let Some(&bad) = center.iter().find(|c| !c.is_finite()) {
        return Err(PipelineError::InvalidConfig {
            field: "center",
            value: bad,
            reason: "Center coordinates must be finite.",
        });
    }
    if !half_width.is_finite() || half_width <= 0.0 {
        return Err(PipelineError::InvalidConfig {
            field: "half_width",
            value: half_width,
            reason: "Half-width must be finite and positive.",
        });
    }
    if !(0.0..1.0).contains(&overlap_fraction) {
        return Err(PipelineError::InvalidConfig {
            field: "overlap_fraction",
            value: overlap_fraction,
            reason: "Overlap fraction must lie in [0, 1).",
        });
    }

    let shift = (1.0 - overlap_fraction) * half_width * 0.5;
    let region_half_width = (0.5 + overlap_fraction) * half_width;
    let regions = (0..1usize << dimension)
        .map(|k| {
            let sign_pattern: Vec<i8> =
                (0..dimension).map(|a| if (k >> a) & 1 == 1 { 1 } else { -1 }).collect();
            let offset = Array1::from_iter(sign_pattern.iter().map(|&s| shift * f64::from(s)));
            Region {
                id: k + 1,
                center: center + &offset,
                half_widths: Array1::from_elem(dimension, region_half_width),
                sign_pattern,
            }
        })
        .collect();
    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Region count, ids, sign patterns and geometry.
    // - Coverage of the domain and overlap across the center planes.
    // - Input validation.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // The decomposition yields `2ⁿ` distinct regions with ids `1..=2ⁿ` and
    // the documented geometry.
    //
    // Given
    // -----
    // - `n = 3`, center `(0, 1, -1)`, half-width 2, overlap 0.1.
    //
    // Expect
    // ------
    // - 8 regions, ids 1..=8, all sign patterns distinct.
    // - Region 1 has pattern `(-,-,-)` and center `center - 0.9`.
    // - Every half-width equals `0.6 · 2 = 1.2`.
    fn decompose_produces_all_orthants() {
        // Arrange
        let center = array![0.0, 1.0, -1.0];

        // Act
        let regions = decompose(3, &center, 2.0, 0.1).expect("decomposition should succeed");

        // Assert
        assert_eq!(regions.len(), 8);
        let ids: Vec<usize> = regions.iter().map(|r| r.id).collect();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
        let mut patterns: Vec<Vec<i8>> = regions.iter().map(|r| r.sign_pattern.clone()).collect();
        patterns.sort();
        patterns.dedup();
        assert_eq!(patterns.len(), 8);
        assert_eq!(regions[0].sign_pattern, vec![-1, -1, -1]);
        assert_eq!(regions[0].label(), "region 1 (-,-,-)");
        assert_eq!(regions[1].sign_pattern, vec![1, -1, -1]);
        for (a, &c) in center.iter().enumerate() {
            assert_relative_eq!(regions[0].center[a], c - 0.9, epsilon = 1e-15);
        }
        for r in &regions {
            assert!(r.half_widths.iter().all(|&h| (h - 1.2).abs() < 1e-15));
        }
    }

    #[test]
    // Purpose
    // -------
    // Every point of the domain lies in some region, and points near the
    // center planes lie in the interior of at least two regions.
    //
    // Given
    // -----
    // - `n = 2`, unit half-width at the origin, overlap 0.1, a 21×21 grid.
    //
    // Expect
    // ------
    // - Each grid point is contained in at least one region.
    // - `(0.02, 0.5)` sits in both the `(-,+)` and `(+,+)` regions.
    fn decompose_covers_domain_with_overlap() {
        let regions = decompose(2, &array![0.0, 0.0], 1.0, 0.1).expect("decomposition");
        for i in 0..=20 {
            for j in 0..=20 {
                let x = array![-1.0 + 0.1 * i as f64, -1.0 + 0.1 * j as f64];
                assert!(regions.iter().any(|r| r.contains(&x)), "uncovered point {x}");
            }
        }
        let near_plane = array![0.02, 0.5];
        let holders: Vec<usize> =
            regions.iter().filter(|r| r.contains(&near_plane)).map(|r| r.id).collect();
        assert_eq!(holders, vec![3, 4]);
    }

    #[test]
    // Purpose
    // -------
    // Invalid inputs are rejected with the matching error.
    fn decompose_rejects_invalid_inputs() {
        assert!(matches!(
            decompose(0, &array![], 1.0, 0.1),
            Err(PipelineError::InvalidDimension { dimension: 0, .. })
        ));
        assert!(matches!(
            decompose(2, &array![0.0], 1.0, 0.1),
            Err(PipelineError::DimensionMismatch { expected: 2, found: 1 })
        ));
        assert!(matches!(
            decompose(1, &array![0.0], -1.0, 0.1),
            Err(PipelineError::InvalidConfig { field: "half_width", .. })
        ));
        assert!(matches!(
            decompose(1, &array![0.0], 1.0, 1.0),
            Err(PipelineError::InvalidConfig { field: "overlap_fraction", .. })
        ));
    }
}
