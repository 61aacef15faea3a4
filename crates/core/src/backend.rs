//! Backend trait for the distributed real <-> half-complex transform.
//!
//! # Normalization
//!
//! The forward transform uses the kernel `e^{+i K·x}` and is scaled by
//! `1 / (nx * ny * nz)`; the inverse uses `e^{-i K·x}` and is unscaled:
//!
//! ```text
//! f̂(K) = 1/N Σ_x f(x) e^{+i K·x}        f(x) = Σ_K f̂(K) e^{-i K·x}
//! ```
//!
//! Spectral coefficients are therefore Fourier-series amplitudes, the zero
//! mode is the spatial mean, and `∂/∂x_a` is a multiplication by `-i K_a`
//! with `K = 2π k / L`. Every operator in this crate assumes both signs.

use std::sync::Arc;

use crate::comm::{CommError, Communicator};
use crate::field::{Field, VectorField};
use crate::layout::SlabLayout;

pub trait SpectralBackend {
    fn layout(&self) -> &SlabLayout;

    /// Communicator shared with every routine that redistributes slabs.
    fn communicator(&self) -> &Arc<dyn Communicator>;

    /// In-place forward transform: real space in, spectral space out.
    fn forward(&mut self, field: &mut Field) -> Result<(), CommError>;

    /// In-place inverse transform: spectral space in, real space out.
    fn inverse(&mut self, field: &mut Field) -> Result<(), CommError>;

    /// Forward transform of several components sharing one plan set.
    ///
    /// Backends can override this to batch the transpose exchange.
    fn forward_batch(&mut self, fields: &mut [Field]) -> Result<(), CommError> {
        for field in fields.iter_mut() {
            self.forward(field)?;
        }
        Ok(())
    }

    fn inverse_batch(&mut self, fields: &mut [Field]) -> Result<(), CommError> {
        for field in fields.iter_mut() {
            self.inverse(field)?;
        }
        Ok(())
    }

    fn forward_vector<const D: usize>(&mut self, field: &mut VectorField<D>) -> Result<(), CommError>
    where
        Self: Sized,
    {
        self.forward_batch(field.components_mut())
    }

    fn inverse_vector<const D: usize>(&mut self, field: &mut VectorField<D>) -> Result<(), CommError>
    where
        Self: Sized,
    {
        self.inverse_batch(field.components_mut())
    }

    /// Transform a copy of `src` into `dst`, leaving `src` untouched.
    fn forward_into(&mut self, src: &Field, dst: &mut Field) -> Result<(), CommError> {
        dst.copy_from(src);
        self.forward(dst)
    }

    fn inverse_into(&mut self, src: &Field, dst: &mut Field) -> Result<(), CommError> {
        dst.copy_from(src);
        self.inverse(dst)
    }
}
