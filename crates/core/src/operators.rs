//! Spectral differential operators.
//!
//! Inputs must already be in spectral space; outputs are tagged spectral.
//! A derivative along axis `a` multiplies each coefficient by `-i K_a`, which
//! relies on the `e^{+i K·x}` forward kernel of [`crate::backend`].
//! Every loop runs in parallel over x-planes of the spectral slab.

use num_complex::Complex64;
use rayon::prelude::*;

use crate::field::{Field, Representation, Tensor5, Vector3};
use crate::grid::DIM;
use crate::kspace::Wavenumbers;
use crate::metric::Metric;

#[inline]
pub(crate) fn load(buf: &[f64], idx: usize) -> Complex64 {
    Complex64::new(buf[idx], buf[idx + 1])
}

#[inline]
pub(crate) fn store(buf: &mut [f64], idx: usize, value: Complex64) {
    buf[idx] = value.re;
    buf[idx + 1] = value.im;
}

/// `-i k v`
#[inline]
pub(crate) fn times_minus_i(k: f64, v: Complex64) -> Complex64 {
    Complex64::new(k * v.im, -k * v.re)
}

/// Visit every complex mode of one spectral x-plane as `(j_local, m, offset)`.
#[inline]
pub(crate) fn for_each_mode<F>(ny_local: usize, nz_modes: usize, mut f: F)
where
    F: FnMut(usize, usize, usize),
{
    let nzp = 2 * nz_modes;
    for j in 0..ny_local {
        for m in 0..nz_modes {
            f(j, m, j * nzp + 2 * m);
        }
    }
}

/// `-i K × v`, the spectral curl of one mode.
#[inline]
pub(crate) fn cross_minus_i(k: [f64; DIM], v: [Complex64; DIM]) -> [Complex64; DIM] {
    [
        times_minus_i(k[1], v[2]) - times_minus_i(k[2], v[1]),
        times_minus_i(k[2], v[0]) - times_minus_i(k[0], v[2]),
        times_minus_i(k[0], v[1]) - times_minus_i(k[1], v[0]),
    ]
}

pub fn derivative(wavenumbers: &Wavenumbers, axis: usize, input: &Field, out: &mut Field) {
    assert!(axis < DIM, "derivative: axis {axis} out of range");
    input.expect_representation(Representation::Spectral, "derivative");
    let layout = wavenumbers.layout();
    let plane = layout.spectral_plane_len();
    let (ny_local, nz_modes) = (layout.ny_local(), layout.grid().nz_modes());

    out.as_mut_slice()
        .par_chunks_mut(plane)
        .zip(input.as_slice().par_chunks(plane))
        .enumerate()
        .for_each(|(i, (dst, src))| {
            for_each_mode(ny_local, nz_modes, |j, m, idx| {
                let k = wavenumbers.k(i, j, m)[axis];
                store(dst, idx, times_minus_i(k, load(src, idx)));
            });
        });
    out.set_representation(Representation::Spectral);
}

pub fn gradient(wavenumbers: &Wavenumbers, input: &Field, out: &mut Vector3) {
    for axis in 0..DIM {
        derivative(wavenumbers, axis, input, out.component_mut(axis));
    }
}

pub fn divergence(wavenumbers: &Wavenumbers, u: &Vector3, out: &mut Field) {
    u.expect_representation(Representation::Spectral, "divergence");
    let layout = wavenumbers.layout();
    let plane = layout.spectral_plane_len();
    let (ny_local, nz_modes) = (layout.ny_local(), layout.grid().nz_modes());
    let [ux, uy, uz] = u.components();

    out.as_mut_slice()
        .par_chunks_mut(plane)
        .zip(ux.as_slice().par_chunks(plane))
        .zip(uy.as_slice().par_chunks(plane))
        .zip(uz.as_slice().par_chunks(plane))
        .enumerate()
        .for_each(|(i, (((dst, x), y), z))| {
            for_each_mode(ny_local, nz_modes, |j, m, idx| {
                let k = wavenumbers.k(i, j, m);
                let div = times_minus_i(k[0], load(x, idx))
                    + times_minus_i(k[1], load(y, idx))
                    + times_minus_i(k[2], load(z, idx));
                store(dst, idx, div);
            });
        });
    out.set_representation(Representation::Spectral);
}

/// Replace `u` by its curl.
pub fn curl_in_place(wavenumbers: &Wavenumbers, u: &mut Vector3) {
    curl_in_place_with_metric(wavenumbers, Metric::Cartesian, u);
}

pub fn curl(wavenumbers: &Wavenumbers, u: &Vector3, out: &mut Vector3) {
    out.copy_from(u);
    curl_in_place(wavenumbers, out);
}

/// Contravariant curl `ω^a = ε^abc D_b u_c` of contravariant `u`. The shear
/// metric has unit determinant, so no volume factor appears.
pub(crate) fn curl_in_place_with_metric(wavenumbers: &Wavenumbers, metric: Metric, u: &mut Vector3) {
    u.expect_representation(Representation::Spectral, "curl");
    let layout = wavenumbers.layout();
    let plane = layout.spectral_plane_len();
    let (ny_local, nz_modes) = (layout.ny_local(), layout.grid().nz_modes());
    let [ux, uy, uz] = u.components_mut();

    ux.as_mut_slice()
        .par_chunks_mut(plane)
        .zip(uy.as_mut_slice().par_chunks_mut(plane))
        .zip(uz.as_mut_slice().par_chunks_mut(plane))
        .enumerate()
        .for_each(|(i, ((x, y), z))| {
            for_each_mode(ny_local, nz_modes, |j, m, idx| {
                let k = wavenumbers.k(i, j, m);
                let up = [load(x, idx), load(y, idx), load(z, idx)];
                let w = cross_minus_i(k, metric.lower_complex(up));
                store(x, idx, w[0]);
                store(y, idx, w[1]);
                store(z, idx, w[2]);
            });
        });
}

/// Strain-rate tensor `E_ab = D_a u_b + D_b u_a` as `[xx, xy, xz, yy, yz]`.
pub fn stress_tensor(wavenumbers: &Wavenumbers, u: &Vector3, out: &mut Tensor5) {
    stress_with_metric(wavenumbers, Metric::Cartesian, u, out, "stress_tensor");
}

/// Contravariant strain-rate tensor `E^ab = D^a u^b + D^b u^a` of a
/// contravariant velocity, with `K^a = g^ab K_b`.
pub fn stress_tensor_oblique(
    wavenumbers: &Wavenumbers,
    metric: Metric,
    u: &Vector3,
    out: &mut Tensor5,
) {
    stress_with_metric(wavenumbers, metric, u, out, "stress_tensor_oblique");
}

fn stress_with_metric(
    wavenumbers: &Wavenumbers,
    metric: Metric,
    u: &Vector3,
    out: &mut Tensor5,
    operation: &str,
) {
    u.expect_representation(Representation::Spectral, operation);
    let layout = wavenumbers.layout();
    let plane = layout.spectral_plane_len();
    let (ny_local, nz_modes) = (layout.ny_local(), layout.grid().nz_modes());
    let [ux, uy, uz] = u.components();
    let [exx, exy, exz, eyy, eyz] = out.components_mut();

    exx.as_mut_slice()
        .par_chunks_mut(plane)
        .zip(exy.as_mut_slice().par_chunks_mut(plane))
        .zip(exz.as_mut_slice().par_chunks_mut(plane))
        .zip(eyy.as_mut_slice().par_chunks_mut(plane))
        .zip(eyz.as_mut_slice().par_chunks_mut(plane))
        .zip(ux.as_slice().par_chunks(plane))
        .zip(uy.as_slice().par_chunks(plane))
        .zip(uz.as_slice().par_chunks(plane))
        .enumerate()
        .for_each(|(i, (((((((xx, xy), xz), yy), yz), x), y), z))| {
            for_each_mode(ny_local, nz_modes, |j, m, idx| {
                let k = metric.raise(wavenumbers.k(i, j, m));
                let v = [load(x, idx), load(y, idx), load(z, idx)];
                let sym = |a: usize, b: usize| {
                    times_minus_i(k[a], v[b]) + times_minus_i(k[b], v[a])
                };
                store(xx, idx, sym(0, 0));
                store(xy, idx, sym(0, 1));
                store(xz, idx, sym(0, 2));
                store(yy, idx, sym(1, 1));
                store(yz, idx, sym(1, 2));
            });
        });
    out.set_representation(Representation::Spectral);
}
