//! Spectral response of a stack over a grid of wavelengths.
//!
//! Each wavelength is independent, so the sweep runs in parallel with rayon. The
//! returned points keep the order of the input grid.

use nalgebra::Complex;
use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TmmError};
use crate::solve::Scattering;
use crate::stack::Stack;


/// Evenly spaced wavelengths from `start` to `end` inclusive.
pub fn linspace_wavelengths(start: f64, end: f64, steps: usize) -> Result<Array1<f64>> {
    if !(start > 0.0) || !end.is_finite() || end < start {
        return Err(TmmError::invalid(format!(
            "wavelength range must satisfy 0 < start <= end, got [{}, {}]",
            start, end
        )));
    }
    if steps == 0 || (steps == 1 && start != end) {
        return Err(TmmError::invalid(format!(
            "a wavelength range [{}, {}] needs at least {} steps, got {}",
            start,
            end,
            if start == end { 1 } else { 2 },
            steps
        )));
    }
    Ok(Array1::linspace(start, end, steps))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralPoint {
    pub wavelength: f64,
    pub scattering: Scattering,
}

/// Reflectance and transmittance of a stack at each wavelength of a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub points: Vec<SpectralPoint>,
}

impl Spectrum {
    /// Evaluates `stack` at every wavelength in `wavelengths`.
    ///
    /// **Context**: Thin film designs are judged by their spectral response, which
    /// requires rebuilding the stack matrix at every wavelength since every
    /// propagation phase scales with `1/λ`.
    ///
    /// **How it Works**: Maps each wavelength to its scattering pair on the rayon
    /// thread pool and collects in input order. The first failing wavelength fails
    /// the whole sweep.
    pub fn sweep(
        stack: &Stack,
        wavelengths: &Array1<f64>,
        incident_field: Option<Complex<f64>>,
    ) -> Result<Self> {
        let points = wavelengths
            .par_iter()
            .map(|&wavelength| {
                stack
                    .scattering(wavelength, incident_field)
                    .map(|scattering| SpectralPoint {
                        wavelength,
                        scattering,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn wavelengths(&self) -> Array1<f64> {
        self.points.iter().map(|p| p.wavelength).collect()
    }

    pub fn reflected_powers(&self) -> Array1<f64> {
        self.points
            .iter()
            .map(|p| p.scattering.reflected_power())
            .collect()
    }

    pub fn transmitted_powers(&self) -> Array1<f64> {
        self.points
            .iter()
            .map(|p| p.scattering.transmitted_power())
            .collect()
    }
}
