#![cfg(test)]

use num_complex::Complex64;

use super::_tests_support::{max_abs_diff, random_spectral};
use super::comm::SingleRank;
use super::field::{Reduced2, Representation, Vector3};
use super::grid::Grid3D;
use super::kspace::Wavenumbers;
use super::layout::SlabLayout;
use super::metric::Metric;
use super::vorticity::{
    dependent_axis, full_from_reduced, full_vorticity_from_velocity, kept_axes, reduced_from_full,
    reduced_from_velocity, velocity_from_full, velocity_from_reduced,
};

fn layout() -> SlabLayout {
    SlabLayout::serial(Grid3D::new(8, 4, 6, 1.0, 2.0, 1.5)).expect("valid layout")
}

/// Random spectral velocity with `K_a u^a = 0` on every non-zero mode and
/// `uk_dc` on the zero mode.
fn solenoidal_velocity(k: &Wavenumbers, metric: Metric, uk_dc: [f64; 3], seed: u64) -> Vector3 {
    let layout = *k.layout();
    let mut u = Vector3::from_components([
        random_spectral(layout, seed),
        random_spectral(layout, seed + 1),
        random_spectral(layout, seed + 2),
    ]);
    let grid = layout.grid();
    for i in 0..grid.nx {
        for j in 0..layout.ny_local() {
            for m in 0..grid.nz_modes() {
                let v: [Complex64; 3] = std::array::from_fn(|d| u.component(d).mode(i, j, m));
                let out = if k.is_zero_mode(i, j, m) {
                    uk_dc.map(|c| Complex64::new(c, 0.0))
                } else {
                    let kl = k.k(i, j, m);
                    let ku = metric.raise(kl);
                    let k2 = kl[0] * ku[0] + kl[1] * ku[1] + kl[2] * ku[2];
                    let div = v[0] * kl[0] + v[1] * kl[1] + v[2] * kl[2];
                    std::array::from_fn(|d| v[d] - div * (ku[d] / k2))
                };
                for (d, value) in out.into_iter().enumerate() {
                    u.component_mut(d).set_mode(i, j, m, value);
                }
            }
        }
    }
    u
}

fn assert_vectors_close(a: &Vector3, b: &Vector3, tol: f64) {
    for d in 0..3 {
        let diff = max_abs_diff(a.component(d).as_slice(), b.component(d).as_slice());
        assert!(diff < tol, "component {d} differs by {diff}");
    }
}

#[test]
fn dependent_component_follows_z_x_y_priority() {
    assert_eq!(dependent_axis([1, 1, 1]), Some(2));
    assert_eq!(dependent_axis([-2, 3, 0]), Some(0));
    assert_eq!(dependent_axis([0, -1, 0]), Some(1));
    assert_eq!(dependent_axis([0, 0, 0]), None);
    assert_eq!(kept_axes(2), [0, 1]);
    assert_eq!(kept_axes(0), [1, 2]);
    assert_eq!(kept_axes(1), [0, 2]);
}

#[test]
fn reconstructed_velocity_is_divergence_free_with_mean_flow() {
    let layout = layout();
    let k = Wavenumbers::new(&layout);
    let zeta = Reduced2::from_components([random_spectral(layout, 11), random_spectral(layout, 12)]);
    let uk_dc = [0.25, -1.5, 0.75];
    let mut u = Vector3::zeros(layout);
    velocity_from_reduced(&k, Metric::Cartesian, &zeta, uk_dc, &mut u);

    assert_eq!(u.representation(), Representation::Spectral);
    let grid = layout.grid();
    for i in 0..grid.nx {
        for j in 0..layout.ny_local() {
            for m in 0..grid.nz_modes() {
                let v: [Complex64; 3] = std::array::from_fn(|d| u.component(d).mode(i, j, m));
                if k.is_zero_mode(i, j, m) {
                    for d in 0..3 {
                        assert_eq!(v[d], Complex64::new(uk_dc[d], 0.0));
                    }
                } else {
                    let kk = k.k(i, j, m);
                    let div = v[0] * kk[0] + v[1] * kk[1] + v[2] * kk[2];
                    assert!(div.norm() < 1e-10, "k.u = {div} at ({i}, {j}, {m})");
                }
            }
        }
    }
}

#[test]
fn velocity_survives_reduction_round_trip() {
    let layout = layout();
    let k = Wavenumbers::new(&layout);
    let uk_dc = [1.0, 0.5, -0.25];
    let u = solenoidal_velocity(&k, Metric::Cartesian, uk_dc, 21);

    let mut zeta = Reduced2::zeros_in(layout, Representation::Spectral);
    let dc = reduced_from_velocity(&k, Metric::Cartesian, &SingleRank, &u, &mut zeta).unwrap();
    assert_eq!(dc, uk_dc);

    let mut back = Vector3::zeros(layout);
    velocity_from_reduced(&k, Metric::Cartesian, &zeta, dc, &mut back);
    assert_vectors_close(&back, &u, 1e-10);
}

#[test]
fn contravariant_velocity_survives_reduction_round_trip() {
    let layout = layout();
    let k = Wavenumbers::new(&layout);
    let metric = Metric::sheared(0.37);
    let u = solenoidal_velocity(&k, metric, [0.0, 0.0, 2.0], 31);

    let mut zeta = Reduced2::zeros_in(layout, Representation::Spectral);
    let dc = reduced_from_velocity(&k, metric, &SingleRank, &u, &mut zeta).unwrap();
    let mut back = Vector3::zeros(layout);
    velocity_from_reduced(&k, metric, &zeta, dc, &mut back);
    assert_vectors_close(&back, &u, 1e-10);
}

#[test]
fn full_vorticity_path_matches_reduced_path() {
    let layout = layout();
    let k = Wavenumbers::new(&layout);
    let metric = Metric::sheared(-0.2);
    let uk_dc = [0.3, 0.0, 0.0];
    let u = solenoidal_velocity(&k, metric, uk_dc, 41);

    let mut omega = Vector3::zeros(layout);
    full_vorticity_from_velocity(&k, metric, &u, &mut omega);

    let mut zeta = Reduced2::zeros_in(layout, Representation::Spectral);
    reduced_from_full(&k, &omega, &mut zeta);
    let mut zeta_direct = Reduced2::zeros_in(layout, Representation::Spectral);
    reduced_from_velocity(&k, metric, &SingleRank, &u, &mut zeta_direct).unwrap();
    for d in 0..2 {
        let diff = max_abs_diff(zeta.component(d).as_slice(), zeta_direct.component(d).as_slice());
        assert!(diff < 1e-12);
    }

    let mut rebuilt = Vector3::zeros(layout);
    full_from_reduced(&k, &zeta, &mut rebuilt);
    assert_vectors_close(&rebuilt, &omega, 1e-10);

    let mut back = Vector3::zeros(layout);
    velocity_from_full(&k, metric, &omega, uk_dc, &mut back);
    assert_vectors_close(&back, &u, 1e-10);
}
