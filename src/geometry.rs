//! Blade geometry from design control points.
//!
//! The blade between hub and tip is divided into `num_radial` cells of equal
//! width and the sections are placed at the cell centres. Chord and twist
//! distributions are clamped uniform B-splines through `num_cp` control
//! points, so that the first and last control points are the values at the
//! hub and tip end of the blade.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Error when building the blade geometry.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    /// Not enough control points.
    #[error("at least 2 control points are required, got {0}")]
    TooFewControlPoints(usize),
    /// Not enough radial sections.
    #[error("at least 2 radial sections are required, got {0}")]
    TooFewSections(usize),
    /// Hub and tip radii do not define a blade.
    #[error("invalid blade span, hub radius {hub} m, tip radius {tip} m")]
    InvalidSpan {
        /// Hub radius.
        hub: f64,
        /// Tip radius.
        tip: f64,
    },
    /// Wrong number of control point values.
    #[error("expected {expected} control points, got {actual}")]
    ControlPointLength {
        /// Number of control points of the geometry.
        expected: usize,
        /// Number of given values.
        actual: usize,
    },
}

/// Discretized blade of one operating point.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Hub radius (m).
    pub hub_radius: f64,
    /// Tip radius (m).
    pub tip_radius: f64,
    /// Radii of the section centres (m).
    pub radii: Vec<f64>,
    /// Widths of the sections (m).
    pub dradii: Vec<f64>,
    /// Section chords (m).
    pub chord: Vec<f64>,
    /// Section twist including the collective pitch (rad).
    pub theta: Vec<f64>,
}

/// Parametrization of the blade by control points.
#[derive(Debug, Clone)]
pub struct BladeGeometry {
    num_cp: usize,
    num_radial: usize,
    basis: DMatrix<f64>,
}

impl BladeGeometry {
    /// Creates the parametrization with given number of control points and
    /// radial sections.
    pub fn new(num_cp: usize, num_radial: usize) -> Result<Self, GeometryError> {
        if num_cp < 2 {
            return Err(GeometryError::TooFewControlPoints(num_cp));
        }

        if num_radial < 2 {
            return Err(GeometryError::TooFewSections(num_radial));
        }

        let order = num_cp.min(4);
        let knots = clamped_knots(num_cp, order);

        let mut basis = DMatrix::zeros(num_radial, num_cp);
        for i in 0..num_radial {
            let t = i as f64 / (num_radial - 1) as f64;
            let (first, values) = bspline_basis(&knots, num_cp, order, t);

            for (j, value) in values.into_iter().enumerate() {
                basis[(i, first + j)] = value;
            }
        }

        Ok(Self {
            num_cp,
            num_radial,
            basis,
        })
    }

    /// Number of control points.
    pub fn num_cp(&self) -> usize {
        self.num_cp
    }

    /// Number of radial sections.
    pub fn num_radial(&self) -> usize {
        self.num_radial
    }

    /// Interpolates control points to the radial sections.
    pub fn interpolate(&self, control_points: &[f64]) -> Result<Vec<f64>, GeometryError> {
        if control_points.len() != self.num_cp {
            return Err(GeometryError::ControlPointLength {
                expected: self.num_cp,
                actual: control_points.len(),
            });
        }

        let values = &self.basis * DVector::from_column_slice(control_points);
        Ok(values.as_slice().to_vec())
    }

    /// Builds the blade. Lengths are in meters, angles in radians.
    pub fn evaluate(
        &self,
        hub_diameter: f64,
        prop_diameter: f64,
        chord_cp: &[f64],
        theta_cp: &[f64],
        pitch: f64,
    ) -> Result<Geometry, GeometryError> {
        let hub_radius = hub_diameter / 2.0;
        let tip_radius = prop_diameter / 2.0;

        if hub_radius < 0.0 || tip_radius <= hub_radius || !tip_radius.is_finite() {
            return Err(GeometryError::InvalidSpan {
                hub: hub_radius,
                tip: tip_radius,
            });
        }

        let dr = (tip_radius - hub_radius) / self.num_radial as f64;
        let radii = (0..self.num_radial)
            .map(|i| hub_radius + (i as f64 + 0.5) * dr)
            .collect();

        let chord = self.interpolate(chord_cp)?;
        let theta = self
            .interpolate(theta_cp)?
            .into_iter()
            .map(|theta| theta + pitch)
            .collect();

        Ok(Geometry {
            hub_radius,
            tip_radius,
            radii,
            dradii: vec![dr; self.num_radial],
            chord,
            theta,
        })
    }
}

fn clamped_knots(num_cp: usize, order: usize) -> Vec<f64> {
    let interior = num_cp - order;

    let mut knots = vec![0.0; order];
    knots.extend((1..=interior).map(|i| i as f64 / (interior + 1) as f64));
    knots.extend(std::iter::repeat(1.0).take(order));
    knots
}

// Nonzero basis functions at t. Returns the index of the first nonzero
// function and the values.
fn bspline_basis(knots: &[f64], num_cp: usize, order: usize, t: f64) -> (usize, Vec<f64>) {
    let degree = order - 1;

    // Knot span containing t, the last nonempty span for the right end.
    let span = (degree..num_cp)
        .rev()
        .find(|&s| knots[s] <= t)
        .unwrap_or(degree);

    let mut values = vec![0.0; order];
    let mut left = vec![0.0; order];
    let mut right = vec![0.0; order];
    values[0] = 1.0;

    for j in 1..order {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;

        let mut saved = 0.0;
        for r in 0..j {
            let temp = values[r] / (right[r + 1] + left[j - r]);
            values[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        values[j] = saved;
    }

    (span - degree, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    #[test]
    fn cell_centred_radii() {
        let blade = BladeGeometry::new(6, 15).unwrap();
        let geometry = blade
            .evaluate(0.3, 1.5, &[0.1; 6], &[0.5; 6], 0.0)
            .unwrap();

        assert_eq!(geometry.hub_radius, 0.15);
        assert_eq!(geometry.tip_radius, 0.75);
        assert_abs_diff_eq!(geometry.dradii[0], 0.04, epsilon = 1e-15);
        assert_abs_diff_eq!(geometry.radii[0], 0.17, epsilon = 1e-15);
        assert_abs_diff_eq!(geometry.radii[14], 0.73, epsilon = 1e-15);

        let span: f64 = geometry.dradii.iter().sum();
        assert_abs_diff_eq!(span, 0.6, epsilon = 1e-14);
    }

    #[test]
    fn constant_control_points() {
        let blade = BladeGeometry::new(6, 15).unwrap();
        let geometry = blade
            .evaluate(0.3, 1.5, &[0.1; 6], &[0.5; 6], 0.1)
            .unwrap();

        for (chord, theta) in geometry.chord.iter().zip(geometry.theta.iter()) {
            assert_abs_diff_eq!(*chord, 0.1, epsilon = 1e-14);
            assert_abs_diff_eq!(*theta, 0.6, epsilon = 1e-14);
        }
    }

    #[test]
    fn clamped_ends_and_monotonicity() {
        let blade = BladeGeometry::new(6, 15).unwrap();
        let cp = [65.0, 57.0, 49.0, 41.0, 33.0, 25.0];
        let values = blade.interpolate(&cp).unwrap();

        assert_abs_diff_eq!(values[0], 65.0, epsilon = 1e-12);
        assert_abs_diff_eq!(values[14], 25.0, epsilon = 1e-12);

        // Uniformly spaced control points give a monotone distribution.
        assert!(values.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn partition_of_unity() {
        for num_cp in 2..8 {
            let blade = BladeGeometry::new(num_cp, 9).unwrap();
            for i in 0..9 {
                let sum: f64 = blade.basis.row(i).iter().sum();
                assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn two_control_points_are_linear() {
        let blade = BladeGeometry::new(2, 5).unwrap();
        let values = blade.interpolate(&[0.0, 1.0]).unwrap();

        for (i, value) in values.iter().enumerate() {
            assert_abs_diff_eq!(*value, i as f64 / 4.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn errors() {
        assert_eq!(
            BladeGeometry::new(1, 15).unwrap_err(),
            GeometryError::TooFewControlPoints(1)
        );
        assert_eq!(
            BladeGeometry::new(6, 1).unwrap_err(),
            GeometryError::TooFewSections(1)
        );

        let blade = BladeGeometry::new(6, 15).unwrap();
        assert!(matches!(
            blade.evaluate(1.5, 0.3, &[0.1; 6], &[0.5; 6], 0.0),
            Err(GeometryError::InvalidSpan { .. })
        ));
        assert_eq!(
            blade.evaluate(0.3, 1.5, &[0.1; 5], &[0.5; 6], 0.0),
            Err(GeometryError::ControlPointLength {
                expected: 6,
                actual: 5
            })
        );
    }
}
