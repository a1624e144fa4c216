//! Transfer matrices for normal-incidence propagation through dielectric media.
//!
//! A [`TransferMatrix`] wraps a single 2x2 complex matrix describing how the forward
//! and backward field amplitudes on one side of an optical element map onto the other.
//! Elements are chained by matrix multiplication, listed from the bottom of a structure
//! to its top.
//!
//! The module provides:
//! - Boundary matrices between two media (admittance matching at normal incidence)
//! - Phase propagation matrices through a homogeneous layer
//! - Air-dielectric-air single layer matrices
//! - Composition, inversion and in-place left/right multiplication
//!
//! # Conventions
//!
//! Structures are composed bottom to top: for `compose([A, B])` the result is `B·A`.
//! All constructors accept real or complex refractive indices; real inputs are lifted
//! into the complex domain.

use std::f64::consts::PI;
use std::fmt;

use nalgebra::{Complex, Matrix2};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::{Result, TmmError};

#[cfg(test)]
mod tests {

    use super::*;

    const TOL: f64 = 1e-9;

    fn c(re: f64, im: f64) -> Complex<f64> {
        Complex::new(re, im)
    }

    #[test]
    fn compose_nothing_is_identity() {
        let nothing: [&TransferMatrix; 0] = [];
        let composed = TransferMatrix::compose(nothing);
        assert!(composed.approx_eq(&TransferMatrix::identity(), TOL));
    }

    #[test]
    fn compose_is_bottom_to_top() {
        let a = TransferMatrix::from_elements(c(1.0, 2.0), c(0.5, 0.0), c(0.0, -1.0), c(3.0, 0.5));
        let b = TransferMatrix::from_elements(c(-2.0, 0.0), c(1.0, 1.0), c(0.25, 0.0), c(0.0, 1.0));
        let composed = TransferMatrix::compose([&a, &b]);
        let expected = TransferMatrix::new(b.matrix * a.matrix);
        assert!(composed.approx_eq(&expected, TOL));

        let reversed = TransferMatrix::compose([&b, &a]);
        assert!(!reversed.approx_eq(&expected, TOL));
    }

    #[test]
    fn compose_matches_append() {
        let a = TransferMatrix::bounding_layer(1.0, 1.7).unwrap();
        let b = TransferMatrix::propagation_layer(1.7, 80.0, 633.0).unwrap();
        let mut appended = b.clone();
        appended.append_right(&a);
        assert!(TransferMatrix::compose([&a, &b]).approx_eq(&appended, TOL));

        let mut prepended = a.clone();
        prepended.append_left(&b);
        assert!(prepended.approx_eq(&appended, TOL));
    }

    #[test]
    fn append_leaves_argument_untouched() {
        let a = TransferMatrix::bounding_layer(1.0, 2.0).unwrap();
        let snapshot = a.clone();
        let mut b = TransferMatrix::propagation_layer(2.0, 50.0, 500.0).unwrap();
        b.append_left(&a);
        b.append_right(&a);
        assert_eq!(a, snapshot);
    }

    #[test]
    fn bounding_layer_same_media_is_identity() {
        for n in [c(1.0, 0.0), c(1.33, 0.0), c(2.4, 0.1), c(-0.5, 3.0)] {
            let boundary = TransferMatrix::bounding_layer(n, n).unwrap();
            assert!(boundary.approx_eq(&TransferMatrix::identity(), TOL));
        }
    }

    #[test]
    fn bounding_layer_zero_index_is_rejected() {
        let result = TransferMatrix::bounding_layer(1.5, 0.0);
        assert!(matches!(result, Err(TmmError::InvalidArgument(_))));
    }

    #[test]
    fn layer_boundaries_match_air_formulas() {
        let n = c(1.5, 0.02);
        let one = c(1.0, 0.0);
        let bottom = TransferMatrix::bounding_layer(one, n).unwrap();
        let top = TransferMatrix::bounding_layer(n, one).unwrap();

        let expected_bottom = TransferMatrix::from_elements(
            (one + n) / (2.0 * n),
            (n - one) / (2.0 * n),
            (n - one) / (2.0 * n),
            (one + n) / (2.0 * n),
        );
        let expected_top = TransferMatrix::from_elements(
            (one + n) / 2.0,
            -(n - one) / 2.0,
            -(n - one) / 2.0,
            (one + n) / 2.0,
        );
        assert!(bottom.approx_eq(&expected_bottom, TOL));
        assert!(top.approx_eq(&expected_top, TOL));
    }

    #[test]
    fn layer_times_inverse_is_identity() {
        for (n, d, wavelength) in [
            (c(1.5, 0.0), 100.0, 500.0),
            (c(2.2, 0.05), 37.5, 633.0),
            (c(1.0, 0.0), 1e3, 1550.0),
            (c(3.9, 0.3), 12.0, 400.0),
        ] {
            let layer = TransferMatrix::layer(n, d, wavelength).unwrap();
            let mut inverse = layer.clone();
            inverse.invert().unwrap();
            let product = TransferMatrix::compose([&layer, &inverse]);
            assert!(product.approx_eq(&TransferMatrix::identity(), 1e-9));
        }
    }

    #[test]
    fn lossless_layer_has_unit_determinant() {
        let layer = TransferMatrix::layer(1.5, 100.0, 500.0).unwrap();
        assert!((layer.determinant().norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn layer_literal_values() {
        // n = 1.5, d = 100, wavelength = 500
        let layer = TransferMatrix::layer(1.5, 100.0, 500.0).unwrap();
        let m = &layer.matrix;
        assert!((m[(0, 0)] - c(-0.309016994, -1.030311226)).norm() < 1e-8);
        assert!((m[(0, 1)] - c(0.0, -0.396273548)).norm() < 1e-8);
        assert!((m[(1, 0)] - c(0.0, 0.396273548)).norm() < 1e-8);
        assert!((m[(1, 1)] - c(-0.309016994, 1.030311226)).norm() < 1e-8);
    }

    #[test]
    fn propagation_is_pure_phase_for_real_index() {
        let prop = TransferMatrix::propagation_layer(1.8, 123.0, 555.0).unwrap();
        assert!((prop.matrix[(0, 0)].norm() - 1.0).abs() < TOL);
        assert!((prop.matrix[(1, 1)].norm() - 1.0).abs() < TOL);
        assert_eq!(prop.matrix[(0, 1)], Complex::ZERO);
        assert_eq!(prop.matrix[(1, 0)], Complex::ZERO);
        assert!((prop.matrix[(0, 0)] * prop.matrix[(1, 1)] - c(1.0, 0.0)).norm() < TOL);
    }

    #[test]
    fn propagation_rejects_bad_geometry() {
        assert!(matches!(
            TransferMatrix::propagation_layer(1.5, -1.0, 500.0),
            Err(TmmError::InvalidArgument(_))
        ));
        assert!(matches!(
            TransferMatrix::propagation_layer(1.5, 10.0, 0.0),
            Err(TmmError::InvalidArgument(_))
        ));
        assert!(matches!(
            TransferMatrix::layer(f64::NAN, 10.0, 500.0),
            Err(TmmError::InvalidArgument(_))
        ));
    }

    #[test]
    fn singular_matrix_does_not_invert() {
        let mut singular =
            TransferMatrix::from_elements(c(1.0, 0.0), c(2.0, 0.0), c(2.0, 0.0), c(4.0, 0.0));
        let before = singular.clone();
        let result = singular.invert();
        assert!(matches!(result, Err(TmmError::SingularMatrix { .. })));
        assert_eq!(singular, before);
    }

    #[test]
    fn caller_threshold_is_respected() {
        let small = TransferMatrix::from_elements(c(1e-4, 0.0), Complex::ZERO, Complex::ZERO, c(1e-4, 0.0));
        assert!(small.inverse().is_ok());
        assert!(matches!(
            small.inverse_with_threshold(1e-6),
            Err(TmmError::SingularMatrix { .. })
        ));
    }
}

/// A 2x2 complex transfer matrix for a single optical element or a whole structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferMatrix {
    pub matrix: Matrix2<Complex<f64>>,
}

impl Default for TransferMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Matrix2<Complex<f64>>> for TransferMatrix {
    fn from(matrix: Matrix2<Complex<f64>>) -> Self {
        Self { matrix }
    }
}

impl TransferMatrix {
    pub fn new(matrix: Matrix2<Complex<f64>>) -> Self {
        Self { matrix }
    }

    /// Creates a transfer matrix from its entries in row-major order.
    pub fn from_elements(
        m00: Complex<f64>,
        m01: Complex<f64>,
        m10: Complex<f64>,
        m11: Complex<f64>,
    ) -> Self {
        Self {
            matrix: Matrix2::new(m00, m01, m10, m11),
        }
    }

    pub fn identity() -> Self {
        Self {
            matrix: Matrix2::identity(),
        }
    }

    /// Chains optical elements into a single structure matrix.
    ///
    /// **Context**: A layered structure is described element by element from the
    /// bottom (incident side) to the top. The structure matrix is the product of the
    /// element matrices with earlier elements innermost.
    ///
    /// **How it Works**: Starts from the identity and multiplies each matrix onto the
    /// left of the accumulator in sequence order, so `compose([A, B])` is `B·A`. An
    /// empty sequence yields the identity. The inputs are never modified.
    pub fn compose<'a, I>(matrices: I) -> Self
    where
        I: IntoIterator<Item = &'a TransferMatrix>,
    {
        let matrix = matrices
            .into_iter()
            .fold(Matrix2::identity(), |acc, m| m.matrix * acc);
        Self { matrix }
    }

    /// Creates an air-dielectric-air transfer matrix for a layer of index `n` and
    /// thickness `d` at the given `wavelength`.
    ///
    /// **Context**: A free-standing film is the most common single element in thin
    /// film optics: light enters from air, crosses the film and exits into air again.
    ///
    /// **How it Works**: Composes, bottom to top, the air to film boundary, the phase
    /// propagation across the film, and the film to air boundary.
    ///
    /// # Example
    /// ```rust
    /// use tmm::matrix::TransferMatrix;
    ///
    /// let film = TransferMatrix::layer(1.5, 100.0, 500.0).unwrap();
    /// assert!((film.determinant().norm() - 1.0).abs() < 1e-6);
    /// ```
    pub fn layer(n: impl Into<Complex<f64>>, d: f64, wavelength: f64) -> Result<Self> {
        let n = n.into();
        let air = Complex::new(config::AMBIENT_REFR_INDEX, 0.0);
        let bottom = Self::bounding_layer(air, n)?;
        let propagation = Self::propagation_layer(n, d, wavelength)?;
        let top = Self::bounding_layer(n, air)?;
        Ok(Self::compose([&bottom, &propagation, &top]))
    }

    /// Creates the boundary matrix between a medium of index `n1` and one of index `n2`.
    ///
    /// **Context**: At a planar interface under normal incidence the tangential fields
    /// are continuous, which couples the forward and backward amplitudes on either side
    /// through the ratio of the two refractive indices.
    ///
    /// **How it Works**: Fills the matrix
    /// `[[(n1+n2)/(2n2), (n2-n1)/(2n2)], [(n2-n1)/(2n2), (n1+n2)/(2n2)]]`.
    /// Identical media give the identity. A zero `n2` is rejected.
    pub fn bounding_layer(n1: impl Into<Complex<f64>>, n2: impl Into<Complex<f64>>) -> Result<Self> {
        let n1 = n1.into();
        let n2 = n2.into();
        check_finite_index(n1)?;
        check_finite_index(n2)?;
        if n2 == Complex::ZERO {
            return Err(TmmError::invalid("refractive index must be non-zero"));
        }

        let denom = 2.0 * n2;
        let diag = (n1 + n2) / denom;
        let off = (n2 - n1) / denom;
        Ok(Self::from_elements(diag, off, off, diag))
    }

    /// Creates the phase propagation matrix through thickness `d` of a medium of
    /// index `n`: `diag(exp(-i·n·d·2π/λ), exp(i·n·d·2π/λ))`.
    pub fn propagation_layer(
        n: impl Into<Complex<f64>>,
        d: f64,
        wavelength: f64,
    ) -> Result<Self> {
        let n = n.into();
        check_finite_index(n)?;
        if !d.is_finite() || d < 0.0 {
            return Err(TmmError::invalid(format!(
                "thickness must be finite and non-negative, got {}",
                d
            )));
        }
        if !wavelength.is_finite() || wavelength <= 0.0 {
            return Err(TmmError::invalid(format!(
                "wavelength must be finite and positive, got {}",
                wavelength
            )));
        }

        let phase = n * (d * 2.0 * PI / wavelength);
        let i = Complex::<f64>::i();
        let forward = (-i * phase).exp();
        let backward = (i * phase).exp();
        if !forward.is_finite() || !backward.is_finite() {
            return Err(TmmError::invalid(format!(
                "propagation phase overflows for n = {}, d = {}, wavelength = {}",
                n, d, wavelength
            )));
        }

        Ok(Self::from_elements(
            forward,
            Complex::ZERO,
            Complex::ZERO,
            backward,
        ))
    }

    pub fn determinant(&self) -> Complex<f64> {
        self.matrix.determinant()
    }

    /// Inverts the matrix in place, using the default singularity threshold.
    ///
    /// On error the matrix is left unchanged.
    pub fn invert(&mut self) -> Result<()> {
        self.invert_with_threshold(config::SINGULARITY_THRESHOLD)
    }

    /// Inverts the matrix in place, treating it as singular when the magnitude of
    /// its determinant does not exceed `threshold`.
    pub fn invert_with_threshold(&mut self, threshold: f64) -> Result<()> {
        let inverse = self.inverse_with_threshold(threshold)?;
        self.matrix = inverse.matrix;
        Ok(())
    }

    /// Returns the inverse as a new matrix, using the default singularity threshold.
    pub fn inverse(&self) -> Result<Self> {
        self.inverse_with_threshold(config::SINGULARITY_THRESHOLD)
    }

    pub fn inverse_with_threshold(&self, threshold: f64) -> Result<Self> {
        let det = self.determinant();
        let det_norm = det.norm();
        // NaN determinants fall through to the error as well
        if !(det_norm > threshold) {
            return Err(TmmError::SingularMatrix {
                det_norm,
                threshold,
            });
        }

        let m = &self.matrix;
        let scale = det.inv();
        Ok(Self::from_elements(
            m[(1, 1)] * scale,
            -m[(0, 1)] * scale,
            -m[(1, 0)] * scale,
            m[(0, 0)] * scale,
        ))
    }

    /// Multiplies `other` onto the left: `self := other · self`.
    pub fn append_left(&mut self, other: &TransferMatrix) {
        self.matrix = other.matrix * self.matrix;
    }

    /// Multiplies `other` onto the right: `self := self · other`.
    pub fn append_right(&mut self, other: &TransferMatrix) {
        self.matrix = self.matrix * other.matrix;
    }

    /// Returns true if every entry differs from `other`'s by at most `tol` in modulus.
    pub fn approx_eq(&self, other: &TransferMatrix, tol: f64) -> bool {
        self.matrix
            .iter()
            .zip(other.matrix.iter())
            .all(|(a, b)| (a - b).norm() <= tol)
    }

    pub fn is_finite(&self) -> bool {
        self.matrix.iter().all(|z| z.is_finite())
    }
}

fn check_finite_index(n: Complex<f64>) -> Result<()> {
    if n.is_finite() {
        Ok(())
    } else {
        Err(TmmError::invalid(format!(
            "refractive index must be finite, got {}",
            n
        )))
    }
}

impl fmt::Display for TransferMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.matrix;
        write!(
            f,
            "[[{:.6}, {:.6}],\n [{:.6}, {:.6}]]",
            m[(0, 0)],
            m[(0, 1)],
            m[(1, 0)],
            m[(1, 1)]
        )
    }
}
