//! Shear-affine metric relating covariant and contravariant components.
//!
//! With shear `γ = degree_oblique` the oblique basis is
//! `e_x = (1, 0, 0)`, `e_y = (γ, 1, 0)`, `e_z = (0, 0, 1)`, giving
//!
//! ```text
//! g_ab = | 1   γ      0 |      g^ab = | 1+γ²  -γ  0 |
//!        | γ   1+γ²   0 |             | -γ     1  0 |
//!        | 0   0      1 |             | 0      0  1 |
//! ```
//!
//! `lower` applies `g_ab` (contra2co) and `raise` applies `g^ab` (co2contra).

use num_complex::Complex64;
use rayon::prelude::*;

use crate::field::{Representation, Vector3};
use crate::grid::DIM;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Metric {
    #[default]
    Cartesian,
    Sheared {
        degree: f64,
    },
}

impl Metric {
    pub fn sheared(degree: f64) -> Self {
        Metric::Sheared { degree }
    }

    pub fn degree(&self) -> f64 {
        match *self {
            Metric::Cartesian => 0.0,
            Metric::Sheared { degree } => degree,
        }
    }

    /// Contravariant to covariant.
    #[inline]
    pub fn lower(&self, v: [f64; DIM]) -> [f64; DIM] {
        let g = self.degree();
        [v[0] + g * v[1], g * v[0] + (1.0 + g * g) * v[1], v[2]]
    }

    /// Covariant to contravariant.
    #[inline]
    pub fn raise(&self, v: [f64; DIM]) -> [f64; DIM] {
        let g = self.degree();
        [(1.0 + g * g) * v[0] - g * v[1], -g * v[0] + v[1], v[2]]
    }

    #[inline]
    pub fn lower_complex(&self, v: [Complex64; DIM]) -> [Complex64; DIM] {
        let g = self.degree();
        [v[0] + v[1] * g, v[0] * g + v[1] * (1.0 + g * g), v[2]]
    }

    #[inline]
    pub fn raise_complex(&self, v: [Complex64; DIM]) -> [Complex64; DIM] {
        let g = self.degree();
        [v[0] * (1.0 + g * g) - v[1] * g, -v[0] * g + v[1], v[2]]
    }

    /// `g_ab a^a b^b`.
    #[inline]
    pub fn inner(&self, a: [f64; DIM], b: [f64; DIM]) -> f64 {
        let low = self.lower(a);
        low[0] * b[0] + low[1] * b[1] + low[2] * b[2]
    }
}

/// In-place contra2co on a spectral vector field.
pub fn contra_to_co(metric: Metric, field: &mut Vector3) {
    field.expect_representation(Representation::Spectral, "contra_to_co");
    apply_xy(field, |x, y| {
        let out = metric.lower([x, y, 0.0]);
        (out[0], out[1])
    });
}

/// In-place co2contra on a spectral vector field.
pub fn co_to_contra(metric: Metric, field: &mut Vector3) {
    field.expect_representation(Representation::Spectral, "co_to_contra");
    apply_xy(field, |x, y| {
        let out = metric.raise([x, y, 0.0]);
        (out[0], out[1])
    });
}

/// The map is real-linear, so it acts on real and imaginary parts alike.
fn apply_xy<F>(field: &mut Vector3, map: F)
where
    F: Fn(f64, f64) -> (f64, f64) + Sync,
{
    let [fx, fy, _] = field.components_mut();
    fx.as_mut_slice()
        .par_iter_mut()
        .zip(fy.as_mut_slice().par_iter_mut())
        .for_each(|(x, y)| {
            let (nx, ny) = map(*x, *y);
            *x = nx;
            *y = ny;
        });
}
