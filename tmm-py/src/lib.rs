use num_complex::Complex64;
use pyo3::create_exception;
use pyo3::exceptions::{PyArithmeticError, PyValueError};
use pyo3::prelude::*;
use tmm::{solve, Measurement, TmmError, TransferMatrix};

create_exception!(_tmm_py, SingularMatrixError, PyArithmeticError);
create_exception!(_tmm_py, SingularSystemError, PyArithmeticError);

fn to_py_err(err: TmmError) -> PyErr {
    match err {
        TmmError::InvalidArgument(_) => PyValueError::new_err(err.to_string()),
        TmmError::SingularMatrix { .. } => SingularMatrixError::new_err(err.to_string()),
        TmmError::SingularSystem { .. } => SingularSystemError::new_err(err.to_string()),
    }
}

/// A 2x2 complex transfer matrix.
#[pyclass(name = "TransferMatrix")]
#[derive(Debug, Clone)]
struct PyTransferMatrix {
    inner: TransferMatrix,
}

impl From<TransferMatrix> for PyTransferMatrix {
    fn from(inner: TransferMatrix) -> Self {
        Self { inner }
    }
}

#[pymethods]
impl PyTransferMatrix {
    #[new]
    fn py_new(matrix: [[Complex64; 2]; 2]) -> Self {
        TransferMatrix::from_elements(matrix[0][0], matrix[0][1], matrix[1][0], matrix[1][1]).into()
    }

    #[staticmethod]
    fn identity() -> Self {
        TransferMatrix::identity().into()
    }

    /// Composes matrices listed bottom to top.
    #[staticmethod]
    #[pyo3(signature = (*matrices))]
    fn structure(matrices: Vec<PyTransferMatrix>) -> Self {
        TransferMatrix::compose(matrices.iter().map(|m| &m.inner)).into()
    }

    #[staticmethod]
    fn layer(n: Complex64, d: f64, wavelength: f64) -> PyResult<Self> {
        TransferMatrix::layer(n, d, wavelength)
            .map(Self::from)
            .map_err(to_py_err)
    }

    #[staticmethod]
    fn bounding_layer(n1: Complex64, n2: Complex64) -> PyResult<Self> {
        TransferMatrix::bounding_layer(n1, n2)
            .map(Self::from)
            .map_err(to_py_err)
    }

    #[staticmethod]
    fn propagation_layer(n: Complex64, d: f64, wavelength: f64) -> PyResult<Self> {
        TransferMatrix::propagation_layer(n, d, wavelength)
            .map(Self::from)
            .map_err(to_py_err)
    }

    /// Inverts the matrix in place.
    fn invert(&mut self) -> PyResult<()> {
        self.inner.invert().map_err(to_py_err)
    }

    // `other` is extracted by value so passing a matrix to its own method is safe
    fn append_left(&mut self, other: PyTransferMatrix) {
        self.inner.append_left(&other.inner);
    }

    fn append_right(&mut self, other: PyTransferMatrix) {
        self.inner.append_right(&other.inner);
    }

    fn determinant(&self) -> Complex64 {
        self.inner.determinant()
    }

    #[getter]
    fn matrix(&self) -> [[Complex64; 2]; 2] {
        let m = &self.inner.matrix;
        [[m[(0, 0)], m[(0, 1)]], [m[(1, 0)], m[(1, 1)]]]
    }

    fn __repr__(&self) -> String {
        format!("TransferMatrix({})", self.inner)
    }
}

/// Calculate reflectance and transmittance, returned as (reflectance, transmittance).
#[pyfunction]
#[pyo3(name = "solve_propagation", signature = (transfer_matrix, incident_field = None))]
fn py_solve_propagation(
    transfer_matrix: &PyTransferMatrix,
    incident_field: Option<Complex64>,
) -> PyResult<(Complex64, Complex64)> {
    let scattering =
        solve::solve_propagation(&transfer_matrix.inner, incident_field).map_err(to_py_err)?;
    Ok((scattering.reflectance, scattering.transmittance))
}

#[pyfunction]
#[pyo3(
    name = "find_reciprocal_transfer_matrix",
    signature = (transmittance, reflectance, bottom = None, top = None)
)]
fn py_find_reciprocal_transfer_matrix(
    transmittance: Complex64,
    reflectance: Complex64,
    bottom: Option<PyTransferMatrix>,
    top: Option<PyTransferMatrix>,
) -> PyResult<PyTransferMatrix> {
    solve::find_reciprocal_transfer_matrix(
        transmittance,
        reflectance,
        bottom.as_ref().map(|m| &m.inner),
        top.as_ref().map(|m| &m.inner),
    )
    .map(PyTransferMatrix::from)
    .map_err(to_py_err)
}

#[pyfunction]
#[pyo3(
    name = "find_reciprocal_transfer_matrix_legacy",
    signature = (transmittance, reflectance, bottom = None, top = None)
)]
fn py_find_reciprocal_transfer_matrix_legacy(
    transmittance: Complex64,
    reflectance: Complex64,
    bottom: Option<PyTransferMatrix>,
    top: Option<PyTransferMatrix>,
) -> PyResult<PyTransferMatrix> {
    solve::find_reciprocal_transfer_matrix_legacy(
        transmittance,
        reflectance,
        bottom.as_ref().map(|m| &m.inner),
        top.as_ref().map(|m| &m.inner),
    )
    .map(PyTransferMatrix::from)
    .map_err(to_py_err)
}

#[pyfunction]
#[pyo3(
    name = "find_generalized_transfer_matrix",
    signature = (
        transmittance1, reflectance1, transmittance2, reflectance2,
        bottom1 = None, top1 = None, bottom2 = None, top2 = None
    )
)]
#[allow(clippy::too_many_arguments)]
fn py_find_generalized_transfer_matrix(
    transmittance1: Complex64,
    reflectance1: Complex64,
    transmittance2: Complex64,
    reflectance2: Complex64,
    bottom1: Option<PyTransferMatrix>,
    top1: Option<PyTransferMatrix>,
    bottom2: Option<PyTransferMatrix>,
    top2: Option<PyTransferMatrix>,
) -> PyResult<PyTransferMatrix> {
    let first = Measurement {
        transmittance: transmittance1,
        reflectance: reflectance1,
        bottom: bottom1.as_ref().map(|m| &m.inner),
        top: top1.as_ref().map(|m| &m.inner),
    };
    let second = Measurement {
        transmittance: transmittance2,
        reflectance: reflectance2,
        bottom: bottom2.as_ref().map(|m| &m.inner),
        top: top2.as_ref().map(|m| &m.inner),
    };
    solve::find_generalized_transfer_matrix(&first, &second)
        .map(PyTransferMatrix::from)
        .map_err(to_py_err)
}

/// Transfer matrices for stacks of dielectric layers, implemented in Rust.
#[pymodule]
fn _tmm_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTransferMatrix>()?;
    m.add_function(wrap_pyfunction!(py_solve_propagation, m)?)?;
    m.add_function(wrap_pyfunction!(py_find_reciprocal_transfer_matrix, m)?)?;
    m.add_function(wrap_pyfunction!(py_find_reciprocal_transfer_matrix_legacy, m)?)?;
    m.add_function(wrap_pyfunction!(py_find_generalized_transfer_matrix, m)?)?;
    m.add("SingularMatrixError", m.py().get_type::<SingularMatrixError>())?;
    m.add("SingularSystemError", m.py().get_type::<SingularSystemError>())?;
    Ok(())
}
