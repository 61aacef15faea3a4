//! Conversion between velocity, full vorticity and the reduced two-component
//! vorticity `ζ` of a divergence-free field.
//!
//! Every transition is parameterised by a [`Metric`]. With
//! [`Metric::Cartesian`] components are Cartesian; with
//! [`Metric::Sheared`] velocity and vorticity are contravariant components
//! in the oblique frame and the wave vector from the grid is covariant.
//!
//! For each non-zero mode, `ζ` stores two vorticity components. The
//! component along the first non-zero integer wavenumber in the order
//! z, x, y is dropped and rebuilt from `K_a ω^a = 0`. The zero mode of `ζ`
//! is always zero; the mean velocity travels separately as `uk_dc`.

use num_complex::Complex64;
use rayon::prelude::*;

use crate::comm::{CommError, Communicator};
use crate::field::{Reduced2, Representation, Vector3};
use crate::grid::DIM;
use crate::kspace::Wavenumbers;
use crate::metric::Metric;
use crate::operators::{cross_minus_i, curl_in_place_with_metric, for_each_mode, load, store};

/// Axis of the dependent vorticity component, `None` for the zero mode.
#[inline]
pub fn dependent_axis(n: [i64; DIM]) -> Option<usize> {
    if n[2] != 0 {
        Some(2)
    } else if n[0] != 0 {
        Some(0)
    } else if n[1] != 0 {
        Some(1)
    } else {
        None
    }
}

/// Axes stored in `ζ[0]` and `ζ[1]` when `dependent` is dropped.
#[inline]
pub fn kept_axes(dependent: usize) -> [usize; 2] {
    match dependent {
        0 => [1, 2],
        1 => [0, 2],
        _ => [0, 1],
    }
}

#[inline]
fn encode(n: [i64; DIM], w: [Complex64; DIM]) -> [Complex64; 2] {
    match dependent_axis(n) {
        Some(dep) => {
            let [a, b] = kept_axes(dep);
            [w[a], w[b]]
        }
        None => [Complex64::default(); 2],
    }
}

#[inline]
fn decode(n: [i64; DIM], k: [f64; DIM], zeta: [Complex64; 2]) -> [Complex64; DIM] {
    let mut w = [Complex64::default(); DIM];
    if let Some(dep) = dependent_axis(n) {
        let [a, b] = kept_axes(dep);
        w[a] = zeta[0];
        w[b] = zeta[1];
        w[dep] = -(w[a] * k[a] + w[b] * k[b]) / k[dep];
    }
    w
}

/// Curl inversion for one mode under `K_a u^a = 0`.
#[inline]
fn invert_curl(metric: Metric, k: [f64; DIM], w_up: [Complex64; DIM]) -> [Complex64; DIM] {
    let k_up = metric.raise(k);
    let k2 = k[0] * k_up[0] + k[1] * k_up[1] + k[2] * k_up[2];
    let u = cross_minus_i(k, metric.lower_complex(w_up));
    let u = [u[0] / k2, u[1] / k2, u[2] / k2];
    debug_assert!(
        {
            let div = u[0] * k[0] + u[1] * k[1] + u[2] * k[2];
            let scale = k2.sqrt() * u.iter().map(|c| c.norm()).sum::<f64>();
            div.norm() <= 1e-9 * scale.max(f64::MIN_POSITIVE)
        },
        "reconstructed velocity is not divergence-free"
    );
    u
}

/// ω = curl u (contravariant curl under `metric`).
pub fn full_vorticity_from_velocity(
    wavenumbers: &Wavenumbers,
    metric: Metric,
    u: &Vector3,
    omega: &mut Vector3,
) {
    u.expect_representation(Representation::Spectral, "full_vorticity_from_velocity");
    omega.copy_from(u);
    curl_in_place_with_metric(wavenumbers, metric, omega);
}

pub fn reduced_from_full(wavenumbers: &Wavenumbers, omega: &Vector3, zeta: &mut Reduced2) {
    omega.expect_representation(Representation::Spectral, "reduced_from_full");
    let layout = wavenumbers.layout();
    let plane = layout.spectral_plane_len();
    let (ny_local, nz_modes) = (layout.ny_local(), layout.grid().nz_modes());
    let [wx, wy, wz] = omega.components();
    let [z0, z1] = zeta.components_mut();

    z0.as_mut_slice()
        .par_chunks_mut(plane)
        .zip(z1.as_mut_slice().par_chunks_mut(plane))
        .zip(wx.as_slice().par_chunks(plane))
        .zip(wy.as_slice().par_chunks(plane))
        .zip(wz.as_slice().par_chunks(plane))
        .enumerate()
        .for_each(|(i, ((((a, b), x), y), z))| {
            for_each_mode(ny_local, nz_modes, |j, m, idx| {
                let w = [load(x, idx), load(y, idx), load(z, idx)];
                let [za, zb] = encode(wavenumbers.integer(i, j, m), w);
                store(a, idx, za);
                store(b, idx, zb);
            });
        });
    zeta.set_representation(Representation::Spectral);
}

pub fn full_from_reduced(wavenumbers: &Wavenumbers, zeta: &Reduced2, omega: &mut Vector3) {
    zeta.expect_representation(Representation::Spectral, "full_from_reduced");
    let layout = wavenumbers.layout();
    let plane = layout.spectral_plane_len();
    let (ny_local, nz_modes) = (layout.ny_local(), layout.grid().nz_modes());
    let [z0, z1] = zeta.components();
    let [wx, wy, wz] = omega.components_mut();

    wx.as_mut_slice()
        .par_chunks_mut(plane)
        .zip(wy.as_mut_slice().par_chunks_mut(plane))
        .zip(wz.as_mut_slice().par_chunks_mut(plane))
        .zip(z0.as_slice().par_chunks(plane))
        .zip(z1.as_slice().par_chunks(plane))
        .enumerate()
        .for_each(|(i, ((((x, y), z), a), b))| {
            for_each_mode(ny_local, nz_modes, |j, m, idx| {
                let w = decode(
                    wavenumbers.integer(i, j, m),
                    wavenumbers.k(i, j, m),
                    [load(a, idx), load(b, idx)],
                );
                store(x, idx, w[0]);
                store(y, idx, w[1]);
                store(z, idx, w[2]);
            });
        });
    omega.set_representation(Representation::Spectral);
}

/// Invert the curl: `u^a = (D × ω)^a / (K_b K^b)`, with `uk_dc` as the
/// zero mode.
pub fn velocity_from_full(
    wavenumbers: &Wavenumbers,
    metric: Metric,
    omega: &Vector3,
    uk_dc: [f64; DIM],
    u: &mut Vector3,
) {
    omega.expect_representation(Representation::Spectral, "velocity_from_full");
    u.copy_from(omega);
    invert_in_place(wavenumbers, metric, uk_dc, u);
}

/// Rebuild the velocity from `ζ` and the mean flow `uk_dc`.
pub fn velocity_from_reduced(
    wavenumbers: &Wavenumbers,
    metric: Metric,
    zeta: &Reduced2,
    uk_dc: [f64; DIM],
    u: &mut Vector3,
) {
    full_from_reduced(wavenumbers, zeta, u);
    invert_in_place(wavenumbers, metric, uk_dc, u);
}

/// Encode `u` as `ζ` and return the mean flow `uk_dc`, summed across ranks
/// so that every rank holds it.
pub fn reduced_from_velocity(
    wavenumbers: &Wavenumbers,
    metric: Metric,
    comm: &dyn Communicator,
    u: &Vector3,
    zeta: &mut Reduced2,
) -> Result<[f64; DIM], CommError> {
    u.expect_representation(Representation::Spectral, "reduced_from_velocity");
    let layout = wavenumbers.layout();
    let plane = layout.spectral_plane_len();
    let (ny_local, nz_modes) = (layout.ny_local(), layout.grid().nz_modes());
    let [ux, uy, uz] = u.components();
    let [z0, z1] = zeta.components_mut();

    z0.as_mut_slice()
        .par_chunks_mut(plane)
        .zip(z1.as_mut_slice().par_chunks_mut(plane))
        .zip(ux.as_slice().par_chunks(plane))
        .zip(uy.as_slice().par_chunks(plane))
        .zip(uz.as_slice().par_chunks(plane))
        .enumerate()
        .for_each(|(i, ((((a, b), x), y), z))| {
            for_each_mode(ny_local, nz_modes, |j, m, idx| {
                let v = [load(x, idx), load(y, idx), load(z, idx)];
                let w = cross_minus_i(wavenumbers.k(i, j, m), metric.lower_complex(v));
                let [za, zb] = encode(wavenumbers.integer(i, j, m), w);
                store(a, idx, za);
                store(b, idx, zb);
            });
        });
    zeta.set_representation(Representation::Spectral);

    let mut uk_dc = [0.0; DIM];
    if wavenumbers.owns_zero_mode() {
        for (d, value) in uk_dc.iter_mut().enumerate() {
            *value = u.component(d).as_slice()[layout.spectral_index(0, 0, 0)];
        }
    }
    comm.all_reduce_sum(&mut uk_dc)?;
    Ok(uk_dc)
}

fn invert_in_place(wavenumbers: &Wavenumbers, metric: Metric, uk_dc: [f64; DIM], u: &mut Vector3) {
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
                let v = if wavenumbers.is_zero_mode(i, j, m) {
                    [
                        Complex64::new(uk_dc[0], 0.0),
                        Complex64::new(uk_dc[1], 0.0),
                        Complex64::new(uk_dc[2], 0.0),
                    ]
                } else {
                    let w = [load(x, idx), load(y, idx), load(z, idx)];
                    invert_curl(metric, wavenumbers.k(i, j, m), w)
                };
                store(x, idx, v[0]);
                store(y, idx, v[1]);
                store(z, idx, v[2]);
            });
        });
}
