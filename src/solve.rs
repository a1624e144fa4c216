//! Forward and inverse scattering solvers.
//!
//! The forward problem takes a structure's transfer matrix and returns the complex
//! reflectance and transmittance it produces for a given incident field. The inverse
//! problems go the other way: from one or two measured (transmittance, reflectance)
//! pairs back to a transfer matrix consistent with them.
//!
//! Every solver relates the fields through
//!
//! ```text
//! | t |   |        | |        | |     |   | 1 |
//! |   | = | bottom | | matrix | | top | · |   |
//! | 0 |   |        | |        | |     |   | r |
//! ```
//!
//! where `bottom` and `top` are optional bounding matrices that default to the
//! identity. The inverse solvers remove known bounding matrices so that only the
//! interior matrix is returned.
//!
//! The solvers provide:
//! - `solve_propagation`: reflectance and transmittance of a structure
//! - `find_reciprocal_transfer_matrix`: interior matrix of a reciprocal structure
//!   from a single measurement
//! - `find_reciprocal_transfer_matrix_legacy`: the same reconstruction through a
//!   real 4x4 linear system, kept for cross-validation
//! - `find_generalized_transfer_matrix`: a general interior matrix from two
//!   measurements taken with different bounding matrices

use nalgebra::{
    Complex, ComplexField, Const, DimMin, Matrix2, Matrix4, SMatrix, SVector, Vector2, Vector4,
};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::{Result, TmmError};
use crate::matrix::TransferMatrix;


/// Complex amplitude reflectance and transmittance of a structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scattering {
    pub reflectance: Complex<f64>,
    pub transmittance: Complex<f64>,
}

impl Scattering {
    pub fn new(reflectance: Complex<f64>, transmittance: Complex<f64>) -> Self {
        Self {
            reflectance,
            transmittance,
        }
    }

    /// Reflected power fraction, |r|².
    pub fn reflected_power(&self) -> f64 {
        self.reflectance.norm_sqr()
    }

    /// Transmitted power fraction, |t|². Only a power fraction when the media on
    /// both sides of the structure are the same.
    pub fn transmitted_power(&self) -> f64 {
        self.transmittance.norm_sqr()
    }
}

/// A measured (transmittance, reflectance) pair together with the bounding matrices
/// that surrounded the unknown structure during the measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement<'a> {
    pub transmittance: Complex<f64>,
    pub reflectance: Complex<f64>,
    pub bottom: Option<&'a TransferMatrix>,
    pub top: Option<&'a TransferMatrix>,
}

impl<'a> Measurement<'a> {
    pub fn new(transmittance: Complex<f64>, reflectance: Complex<f64>) -> Self {
        Self {
            transmittance,
            reflectance,
            bottom: None,
            top: None,
        }
    }

    pub fn with_bottom(mut self, bottom: &'a TransferMatrix) -> Self {
        self.bottom = Some(bottom);
        self
    }

    pub fn with_top(mut self, top: &'a TransferMatrix) -> Self {
        self.top = Some(top);
        self
    }
}

/// Computes the reflectance and transmittance of a structure.
///
/// **Context**: Given the combined transfer matrix `T` of a structure and the
/// amplitude of the field incident on it, the reflected and transmitted amplitudes
/// follow from the linear relation `T · (1, r) = (t, 0)` scaled by the incident field.
///
/// **How it Works**: Assembles the 2x2 system
/// `[[T01, -1], [T11, 0]] · (r, t) = incident · (-T00, -T10)` and solves it. The
/// system is singular exactly when `T11` vanishes. `incident_field` defaults to 1.
pub fn solve_propagation(
    transfer: &TransferMatrix,
    incident_field: Option<Complex<f64>>,
) -> Result<Scattering> {
    let incident =
        incident_field.unwrap_or_else(|| Complex::new(config::DEFAULT_INCIDENT_FIELD, 0.0));
    check_finite("incident field", incident)?;
    if !transfer.is_finite() {
        return Err(TmmError::invalid(
            "transfer matrix has non-finite entries",
        ));
    }

    let t = &transfer.matrix;
    let lhs = Matrix2::new(t[(0, 1)], Complex::new(-1.0, 0.0), t[(1, 1)], Complex::ZERO);
    let rhs = Vector2::new(-t[(0, 0)], -t[(1, 0)]) * incident;

    // det(lhs) = T11
    let res = solve_system(lhs, rhs, t[(1, 1)].norm())?;
    Ok(Scattering {
        reflectance: res[0],
        transmittance: res[1],
    })
}

/// Reconstructs the interior transfer matrix of a reciprocal structure from a single
/// measurement.
///
/// **Context**: A lossless, reciprocal and symmetric structure has a transfer matrix
/// fixed entirely by its complex transmittance and reflectance, so one measurement
/// is enough to recover it.
///
/// **How it Works**: Builds `[[1/conj(t), r/t], [conj(r/t), 1/t]]` and strips the
/// known bounding matrices: `bottom⁻¹ · M · top⁻¹`. Missing bounding matrices are
/// taken as the identity.
pub fn find_reciprocal_transfer_matrix(
    transmittance: Complex<f64>,
    reflectance: Complex<f64>,
    bottom: Option<&TransferMatrix>,
    top: Option<&TransferMatrix>,
) -> Result<TransferMatrix> {
    check_measurement(transmittance, reflectance)?;

    let ratio = reflectance / transmittance;
    let matrix = TransferMatrix::from_elements(
        transmittance.conj().inv(),
        ratio,
        ratio.conj(),
        transmittance.inv(),
    );
    remove_bounding(matrix, bottom, top)
}

/// Reconstructs the same matrix as [`find_reciprocal_transfer_matrix`] by solving for
/// the real and imaginary parts of its two independent entries.
///
/// **Context**: Kept as an independent derivation to cross-check the direct formula.
///
/// **How it Works**: With the ansatz `[[a, conj(c)], [c, conj(a)]]`, the field relation
/// gives four real equations in `(Re a, Im a, Re c, Im c)`:
/// `[[I, B], [B, I]] · res = (Re t, Im t, 0, 0)` with
/// `B = [[Re r, Im r], [Im r, -Re r]]`. The system is singular when |r| = 1.
pub fn find_reciprocal_transfer_matrix_legacy(
    transmittance: Complex<f64>,
    reflectance: Complex<f64>,
    bottom: Option<&TransferMatrix>,
    top: Option<&TransferMatrix>,
) -> Result<TransferMatrix> {
    check_measurement(transmittance, reflectance)?;

    let (rr, ri) = (reflectance.re, reflectance.im);
    let coupling = Matrix2::new(rr, ri, ri, -rr);

    let mut lhs = Matrix4::<f64>::identity();
    lhs.fixed_view_mut::<2, 2>(0, 2).copy_from(&coupling);
    lhs.fixed_view_mut::<2, 2>(2, 0).copy_from(&coupling);
    let rhs = Vector4::new(transmittance.re, transmittance.im, 0.0, 0.0);

    // det(lhs) = (1 - |r|²)²
    let res = solve_system(lhs, rhs, (1.0 - reflectance.norm_sqr()).abs())?;
    let diag = Complex::new(res[0], res[1]);
    let off = Complex::new(res[2], res[3]);
    let matrix = TransferMatrix::from_elements(diag, off.conj(), off, diag.conj());
    remove_bounding(matrix, bottom, top)
}

/// Reconstructs a general (not necessarily reciprocal) interior transfer matrix from
/// two measurements.
///
/// **Context**: A general 2x2 matrix has four complex unknowns, and each measurement
/// provides two complex equations. Two measurements of the same interior structure
/// taken with different bounding matrices determine it uniquely.
///
/// **How it Works**: For each measurement `k` forms `a_k = bottom_k⁻¹ · (t_k, 0)` and
/// `b_k = top_k · (1, r_k)`, so that `M · b_k = a_k`. Stacking the two `b_k` as rows
/// of `B` gives two independent systems `B · (M00, M01) = (a_1[0], a_2[0])` and
/// `B · (M10, M11) = (a_1[1], a_2[1])`, which are solved together as one block-diagonal
/// 4x4 complex system. The system is singular when `det(B)` vanishes.
///
/// The solution is assembled row by row, `[[res0, res1], [res2, res3]]`. Reading it
/// column by column instead would return the transpose of the interior matrix.
pub fn find_generalized_transfer_matrix(
    first: &Measurement,
    second: &Measurement,
) -> Result<TransferMatrix> {
    for m in [first, second] {
        check_finite("transmittance", m.transmittance)?;
        check_finite("reflectance", m.reflectance)?;
    }

    let a1 = bottom_field(first)?;
    let a2 = bottom_field(second)?;
    let b1 = top_field(first);
    let b2 = top_field(second);

    let block = Matrix2::new(b1[0], b1[1], b2[0], b2[1]);
    let mut lhs = Matrix4::<Complex<f64>>::zeros();
    lhs.fixed_view_mut::<2, 2>(0, 0).copy_from(&block);
    lhs.fixed_view_mut::<2, 2>(2, 2).copy_from(&block);
    let rhs = Vector4::new(a1[0], a2[0], a1[1], a2[1]);

    let res = solve_system(lhs, rhs, block.determinant().norm())?;
    // first block solves the top row, second block the bottom row
    Ok(TransferMatrix::from_elements(res[0], res[1], res[2], res[3]))
}

/// `bottom⁻¹ · (t, 0)`
fn bottom_field(measurement: &Measurement) -> Result<Vector2<Complex<f64>>> {
    let field = Vector2::new(measurement.transmittance, Complex::ZERO);
    match measurement.bottom {
        Some(bottom) => Ok(bottom.inverse()?.matrix * field),
        None => Ok(field),
    }
}

/// `top · (1, r)`
fn top_field(measurement: &Measurement) -> Vector2<Complex<f64>> {
    let field = Vector2::new(Complex::new(1.0, 0.0), measurement.reflectance);
    match measurement.top {
        Some(top) => top.matrix * field,
        None => field,
    }
}

/// Strips known bounding matrices from a reconstructed structure matrix:
/// `bottom⁻¹ · matrix · top⁻¹`.
fn remove_bounding(
    mut matrix: TransferMatrix,
    bottom: Option<&TransferMatrix>,
    top: Option<&TransferMatrix>,
) -> Result<TransferMatrix> {
    if let Some(bottom) = bottom {
        matrix.append_left(&bottom.inverse()?);
    }
    if let Some(top) = top {
        matrix.append_right(&top.inverse()?);
    }
    Ok(matrix)
}

fn check_measurement(transmittance: Complex<f64>, reflectance: Complex<f64>) -> Result<()> {
    check_finite("transmittance", transmittance)?;
    check_finite("reflectance", reflectance)?;
    if transmittance == Complex::ZERO {
        return Err(TmmError::invalid(
            "transmittance must be non-zero to reconstruct a reciprocal transfer matrix",
        ));
    }
    Ok(())
}

fn check_finite(name: &str, value: Complex<f64>) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(TmmError::invalid(format!(
            "{} must be finite, got {}",
            name, value
        )))
    }
}

/// Solves `lhs · x = rhs` by LU decomposition, reporting a singular system instead of
/// returning non-finite values.
///
/// `det_norm` is the determinant magnitude of the 2x2 complex system that `lhs`
/// encodes. For the 4x4 systems `det(lhs)` is its square.
fn solve_system<T, const N: usize>(
    lhs: SMatrix<T, N, N>,
    rhs: SVector<T, N>,
    det_norm: f64,
) -> Result<SVector<T, N>>
where
    T: ComplexField<RealField = f64>,
    Const<N>: DimMin<Const<N>, Output = Const<N>>,
{
    let threshold = config::SINGULARITY_THRESHOLD;
    let singular = TmmError::SingularSystem {
        size: N,
        det_norm,
        threshold,
    };
    if !(det_norm > threshold) {
        return Err(singular);
    }

    let solution = lhs.lu().solve(&rhs).ok_or_else(|| singular.clone())?;
    if solution.iter().any(|x| !x.is_finite()) {
        return Err(singular);
    }
    Ok(solution)
}
