//! Transfer matrices for stacks of dielectric layers at normal incidence.
//!
//! The crate builds 2x2 complex transfer matrices for boundaries, propagation and
//! whole layer stacks, solves them for complex reflectance and transmittance, and
//! reconstructs transfer matrices from measured reflectance and transmittance.
//!
//! ```rust
//! use tmm::matrix::TransferMatrix;
//! use tmm::solve::{find_reciprocal_transfer_matrix, solve_propagation};
//!
//! let film = TransferMatrix::layer(1.5, 100.0, 500.0).unwrap();
//! let s = solve_propagation(&film, None).unwrap();
//! let rebuilt = find_reciprocal_transfer_matrix(s.transmittance, s.reflectance, None, None).unwrap();
//! assert!(rebuilt.approx_eq(&film, 1e-9));
//! ```

pub mod config;
pub mod error;
pub mod matrix;
pub mod output;
pub mod settings;
pub mod solve;
pub mod spectrum;
pub mod stack;

pub use error::TmmError;
pub use matrix::TransferMatrix;
pub use solve::{
    find_generalized_transfer_matrix, find_reciprocal_transfer_matrix,
    find_reciprocal_transfer_matrix_legacy, solve_propagation, Measurement, Scattering,
};
