//! Multi-layer dielectric stacks.
//!
//! A [`Stack`] is an ordered list of homogeneous layers, listed from the bottom
//! (incident side) to the top, embedded in an ambient medium on both sides. Its total
//! transfer matrix interleaves the boundary matrix at every interface with the phase
//! propagation matrix of every layer.

use std::iter;

use itertools::Itertools;
use nalgebra::Complex;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::Result;
use crate::matrix::TransferMatrix;
use crate::solve::{self, Scattering};

#[cfg(test)]
mod tests {

    use super::*;
    use crate::error::TmmError;

    #[test]
    fn empty_stack_is_identity() {
        let stack = Stack::new(vec![]);
        let matrix = stack.transfer_matrix(500.0).unwrap();
        assert!(matrix.approx_eq(&TransferMatrix::identity(), 1e-12));
    }

    #[test]
    fn single_layer_matches_layer() {
        let stack = Stack::new(vec![Layer::new(1.5, 100.0)]);
        let from_stack = stack.transfer_matrix(500.0).unwrap();
        let from_layer = TransferMatrix::layer(1.5, 100.0, 500.0).unwrap();
        assert!(from_stack.approx_eq(&from_layer, 1e-12));
    }

    #[test]
    fn interfaces_pair_adjacent_media() {
        let stack = Stack::new(vec![Layer::new(1.5, 10.0), Layer::new(2.0, 20.0)])
            .with_ambient(1.33);
        let pairs: Vec<(f64, f64)> = stack
            .interfaces()
            .into_iter()
            .map(|(a, b)| (a.re, b.re))
            .collect();
        assert_eq!(pairs, vec![(1.33, 1.5), (1.5, 2.0), (2.0, 1.33)]);
    }

    #[test]
    fn quarter_wave_film_reflectance() {
        let n: f64 = 1.5;
        let wavelength = 500.0;
        let stack = Stack::new(vec![Layer::new(n, wavelength / (4.0 * n))]);
        let scattering = stack.scattering(wavelength, None).unwrap();
        let expected = ((n * n - 1.0) / (n * n + 1.0)).powi(2);
        assert!((scattering.reflected_power() - expected).abs() < 1e-9);
    }

    #[test]
    fn half_wave_film_is_absentee() {
        let n = 2.1;
        let wavelength = 633.0;
        let stack = Stack::new(vec![Layer::new(n, wavelength / (2.0 * n))]);
        let scattering = stack.scattering(wavelength, None).unwrap();
        assert!(scattering.reflectance.norm() < 1e-9);
    }

    #[test]
    fn lossless_stack_conserves_energy() {
        let mut stack = Stack::new(vec![Layer::new(1.5, 80.0)]);
        stack.push(Layer::new(2.1, 40.0));
        let scattering = stack.scattering(600.0, None).unwrap();
        let total = scattering.reflected_power() + scattering.transmitted_power();
        assert!((total - 1.0).abs() < 1e-9, "total: {}", total);
    }

    #[test]
    fn matched_ambient_does_not_reflect() {
        let stack = Stack::new(vec![Layer::new(1.33, 250.0)]).with_ambient(1.33);
        let scattering = stack.scattering(550.0, None).unwrap();
        assert!(scattering.reflectance.norm() < 1e-12);
        assert!((scattering.transmittance.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_index_layer_is_rejected() {
        let stack = Stack::new(vec![Layer::new(0.0, 10.0)]);
        assert!(matches!(
            stack.transfer_matrix(500.0),
            Err(TmmError::InvalidArgument(_))
        ));
    }
}

/// A homogeneous layer of a stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub refr_index: Complex<f64>,
    pub thickness: f64,
}

impl Layer {
    pub fn new(refr_index: impl Into<Complex<f64>>, thickness: f64) -> Self {
        Self {
            refr_index: refr_index.into(),
            thickness,
        }
    }
}

/// Layers listed bottom to top, surrounded by the ambient medium on both sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    #[serde(default = "default_ambient")]
    pub ambient: Complex<f64>,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

fn default_ambient() -> Complex<f64> {
    Complex::new(config::AMBIENT_REFR_INDEX, 0.0)
}

impl Default for Stack {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Stack {
    /// Creates a stack surrounded by the default ambient medium.
    pub fn new(layers: Vec<Layer>) -> Self {
        Self {
            ambient: default_ambient(),
            layers,
        }
    }

    pub fn with_ambient(mut self, ambient: impl Into<Complex<f64>>) -> Self {
        self.ambient = ambient.into();
        self
    }

    /// Adds a layer on top of the stack.
    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Returns the (lower, upper) refractive index pair of every interface, bottom to top.
    pub fn interfaces(&self) -> Vec<(Complex<f64>, Complex<f64>)> {
        iter::once(self.ambient)
            .chain(self.layers.iter().map(|layer| layer.refr_index))
            .chain(iter::once(self.ambient))
            .tuple_windows()
            .collect()
    }

    /// Builds the total transfer matrix of the stack at `wavelength`.
    ///
    /// **Context**: Each layer contributes a propagation matrix, and each change of
    /// medium contributes a boundary matrix. A stack of `k` layers has `k + 1`
    /// interfaces.
    ///
    /// **How it Works**: Builds all boundary and propagation matrices, interleaves them
    /// bottom to top starting with the ambient to first layer boundary, and composes
    /// the sequence. A single layer in air reproduces [`TransferMatrix::layer`].
    pub fn transfer_matrix(&self, wavelength: f64) -> Result<TransferMatrix> {
        let boundaries = self
            .interfaces()
            .into_iter()
            .map(|(lower, upper)| TransferMatrix::bounding_layer(lower, upper))
            .collect::<Result<Vec<_>>>()?;
        let propagations = self
            .layers
            .iter()
            .map(|layer| {
                TransferMatrix::propagation_layer(layer.refr_index, layer.thickness, wavelength)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TransferMatrix::compose(
            boundaries.iter().interleave(propagations.iter()),
        ))
    }

    /// Reflectance and transmittance of the stack at `wavelength`.
    pub fn scattering(
        &self,
        wavelength: f64,
        incident_field: Option<Complex<f64>>,
    ) -> Result<Scattering> {
        let transfer = self.transfer_matrix(wavelength)?;
        solve::solve_propagation(&transfer, incident_field)
    }
}
