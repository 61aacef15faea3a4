//! Real-valued field storage tagged with its current representation.
//!
//! A field buffer is reinterpreted in place by the transforms: in real space
//! it holds samples, in spectral space it holds half-complex Fourier
//! coefficients. The [`Representation`] tag travels with the buffer so every
//! operator can check it is handed the state it expects.

use num_complex::Complex64;

pub use crate::layout::Representation;
use crate::layout::SlabLayout;

#[derive(Debug, Clone)]
pub struct Field {
    layout: SlabLayout,
    repr: Representation,
    data: Vec<f64>,
}

impl Field {
    /// Zero-filled real-space field sized for `layout`.
    pub fn zeros(layout: SlabLayout) -> Self {
        Self {
            data: vec![0.0; layout.buffer_len()],
            repr: Representation::Real,
            layout,
        }
    }

    /// Zero-filled field in the requested representation.
    pub fn zeros_in(layout: SlabLayout, repr: Representation) -> Self {
        let mut field = Self::zeros(layout);
        field.repr = repr;
        field
    }

    pub fn from_vec(layout: SlabLayout, repr: Representation, data: Vec<f64>) -> Self {
        assert_eq!(
            data.len(),
            layout.buffer_len(),
            "data length must match slab buffer size"
        );
        Self { layout, repr, data }
    }

    /// Real-space field sampled from `f(i_global, j, k)` on the owned slab.
    pub fn from_fn<F>(layout: SlabLayout, f: F) -> Self
    where
        F: Fn(usize, usize, usize) -> f64,
    {
        let mut field = Self::zeros(layout);
        field.fill_real(f);
        field
    }

    pub fn layout(&self) -> &SlabLayout {
        &self.layout
    }

    pub fn representation(&self) -> Representation {
        self.repr
    }

    /// Retag the buffer. Only transforms should call this.
    pub fn set_representation(&mut self, repr: Representation) {
        self.repr = repr;
    }

    /// Panic with the operation name when the buffer is in the wrong state.
    #[track_caller]
    pub fn expect_representation(&self, repr: Representation, operation: &str) {
        assert!(
            self.repr == repr,
            "{operation}: expected a field in {repr}, found {}",
            self.repr
        );
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Overwrite the owned real-space samples from `f(i_global, j, k)`,
    /// leaving the z padding at zero.
    pub fn fill_real<F>(&mut self, f: F)
    where
        F: Fn(usize, usize, usize) -> f64,
    {
        let layout = self.layout;
        let grid = layout.grid();
        let x0 = layout.prev(Representation::Real)[0];
        self.data.fill(0.0);
        for i in 0..layout.nx_local() {
            for j in 0..grid.ny {
                for k in 0..grid.nz {
                    self.data[layout.real_index(i, j, k)] = f(i + x0, j, k);
                }
            }
        }
        self.repr = Representation::Real;
    }

    /// Real-space sample at slab-local `i`.
    pub fn real(&self, i: usize, j: usize, k: usize) -> f64 {
        self.data[self.layout.real_index(i, j, k)]
    }

    /// Spectral coefficient at slab-local `j` and z-mode `m`.
    pub fn mode(&self, i: usize, j: usize, m: usize) -> Complex64 {
        let idx = self.layout.spectral_index(i, j, 2 * m);
        Complex64::new(self.data[idx], self.data[idx + 1])
    }

    pub fn set_mode(&mut self, i: usize, j: usize, m: usize, value: Complex64) {
        let idx = self.layout.spectral_index(i, j, 2 * m);
        self.data[idx] = value.re;
        self.data[idx + 1] = value.im;
    }

    /// Copy data and representation from `other`.
    pub fn copy_from(&mut self, other: &Field) {
        assert_eq!(
            self.layout, other.layout,
            "fields must share a slab layout"
        );
        self.data.copy_from_slice(&other.data);
        self.repr = other.repr;
    }
}

impl From<Field> for Vec<f64> {
    fn from(field: Field) -> Self {
        field.data
    }
}

/// Fixed number of component fields sharing one layout and representation.
#[derive(Debug, Clone)]
pub struct VectorField<const D: usize> {
    components: [Field; D],
}

/// Velocity, vorticity or any 3-vector field.
pub type Vector3 = VectorField<3>;
/// Reduced (two-component) vorticity encoding.
pub type Reduced2 = VectorField<2>;
/// Independent components `[xx, xy, xz, yy, yz]` of a symmetric tensor.
pub type Tensor5 = VectorField<5>;

impl<const D: usize> VectorField<D> {
    pub fn zeros(layout: SlabLayout) -> Self {
        Self {
            components: std::array::from_fn(|_| Field::zeros(layout)),
        }
    }

    pub fn zeros_in(layout: SlabLayout, repr: Representation) -> Self {
        Self {
            components: std::array::from_fn(|_| Field::zeros_in(layout, repr)),
        }
    }

    pub fn from_components(components: [Field; D]) -> Self {
        let layout = *components[0].layout();
        let repr = components[0].representation();
        for component in &components {
            assert_eq!(*component.layout(), layout, "components must share a layout");
            assert_eq!(
                component.representation(),
                repr,
                "components must share a representation"
            );
        }
        Self { components }
    }

    pub fn layout(&self) -> &SlabLayout {
        self.components[0].layout()
    }

    /// Representation shared by every component.
    pub fn representation(&self) -> Representation {
        self.components[0].representation()
    }

    #[track_caller]
    pub fn expect_representation(&self, repr: Representation, operation: &str) {
        for component in &self.components {
            component.expect_representation(repr, operation);
        }
    }

    pub fn set_representation(&mut self, repr: Representation) {
        for component in &mut self.components {
            component.set_representation(repr);
        }
    }

    pub fn component(&self, d: usize) -> &Field {
        &self.components[d]
    }

    pub fn component_mut(&mut self, d: usize) -> &mut Field {
        &mut self.components[d]
    }

    pub fn components(&self) -> &[Field; D] {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut [Field; D] {
        &mut self.components
    }

    pub fn copy_from(&mut self, other: &Self) {
        for (dst, src) in self.components.iter_mut().zip(other.components.iter()) {
            dst.copy_from(src);
        }
    }

    pub fn fill(&mut self, value: f64) {
        for component in &mut self.components {
            component.fill(value);
        }
    }
}
