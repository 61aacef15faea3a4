#![cfg(test)]

use std::f64::consts::TAU;

use super::_tests_support::{max_real_diff, random_real, TestBackend};
use super::backend::SpectralBackend;
use super::field::{Field, Tensor5, Vector3};
use super::grid::Grid3D;
use super::kspace::Wavenumbers;
use super::metric::Metric;
use super::operators::{curl, divergence, gradient, stress_tensor, stress_tensor_oblique};

fn setup() -> (TestBackend, Wavenumbers) {
    let backend = TestBackend::new(Grid3D::new(8, 8, 4, 2.0, 3.0, 1.5));
    let k = Wavenumbers::new(backend.layout());
    (backend, k)
}

#[test]
fn gradient_of_sine_matches_analytic_derivative() {
    let (mut backend, k) = setup();
    let layout = *backend.layout();
    let grid = layout.grid();
    let mut f = Field::from_fn(layout, |i, _, _| (TAU * i as f64 / grid.nx as f64).sin());
    backend.forward(&mut f).unwrap();

    let mut grad = Vector3::zeros(layout);
    gradient(&k, &f, &mut grad);
    backend.inverse_vector(&mut grad).unwrap();

    let expected = Field::from_fn(layout, |i, _, _| {
        TAU / grid.lx * (TAU * i as f64 / grid.nx as f64).cos()
    });
    assert!(max_real_diff(grad.component(0), &expected) < 1e-12);
    assert!(max_real_diff(grad.component(1), &Field::zeros(layout)) < 1e-12);
    assert!(max_real_diff(grad.component(2), &Field::zeros(layout)) < 1e-12);
}

#[test]
fn divergence_of_gradient_is_the_laplacian() {
    let (mut backend, k) = setup();
    let layout = *backend.layout();
    let grid = layout.grid();
    let wave = |j: usize, kk: usize| {
        (TAU * j as f64 / grid.ny as f64).sin() * (TAU * kk as f64 / grid.nz as f64).cos()
    };
    let mut f = Field::from_fn(layout, |_, j, kk| wave(j, kk));
    backend.forward(&mut f).unwrap();

    let mut grad = Vector3::zeros(layout);
    let mut lap = Field::zeros(layout);
    gradient(&k, &f, &mut grad);
    divergence(&k, &grad, &mut lap);
    backend.inverse(&mut lap).unwrap();

    let k2 = (TAU / grid.ly).powi(2) + (TAU / grid.lz).powi(2);
    let expected = Field::from_fn(layout, |_, j, kk| -k2 * wave(j, kk));
    assert!(max_real_diff(&lap, &expected) < 1e-10);
}

#[test]
fn divergence_of_compressive_wave_is_its_slope() {
    let (mut backend, k) = setup();
    let layout = *backend.layout();
    let grid = layout.grid();
    let mut u = Vector3::zeros(layout);
    u.component_mut(0)
        .fill_real(|i, _, _| (TAU * i as f64 / grid.nx as f64).sin());
    backend.forward_vector(&mut u).unwrap();

    let mut div = Field::zeros(layout);
    divergence(&k, &u, &mut div);
    backend.inverse(&mut div).unwrap();

    let expected = Field::from_fn(layout, |i, _, _| {
        TAU / grid.lx * (TAU * i as f64 / grid.nx as f64).cos()
    });
    assert!(max_real_diff(&div, &expected) < 1e-12);
}

#[test]
fn curl_of_shear_flow_points_along_minus_z() {
    let (mut backend, k) = setup();
    let layout = *backend.layout();
    let grid = layout.grid();
    let mut u = Vector3::zeros(layout);
    u.component_mut(0)
        .fill_real(|_, j, _| (TAU * j as f64 / grid.ny as f64).sin());
    backend.forward_vector(&mut u).unwrap();

    let mut omega = Vector3::zeros(layout);
    curl(&k, &u, &mut omega);
    backend.inverse_vector(&mut omega).unwrap();

    // ω_z = ∂_x u_y - ∂_y u_x
    let expected = Field::from_fn(layout, |_, j, _| {
        -TAU / grid.ly * (TAU * j as f64 / grid.ny as f64).cos()
    });
    let zero = Field::zeros(layout);
    assert!(max_real_diff(omega.component(2), &expected) < 1e-12);
    assert!(max_real_diff(omega.component(0), &zero) < 1e-12);
    assert!(max_real_diff(omega.component(1), &zero) < 1e-12);
}

#[test]
fn curl_of_gradient_vanishes() {
    let (mut backend, k) = setup();
    let layout = *backend.layout();
    let mut f = random_real(layout, 7);
    backend.forward(&mut f).unwrap();

    let mut grad = Vector3::zeros(layout);
    let mut omega = Vector3::zeros(layout);
    gradient(&k, &f, &mut grad);
    curl(&k, &grad, &mut omega);
    for c in omega.components() {
        assert!(c.as_slice().iter().all(|v| v.abs() < 1e-12));
    }
}

#[test]
fn stress_of_simple_shear_has_only_xy() {
    let (mut backend, k) = setup();
    let layout = *backend.layout();
    let grid = layout.grid();
    let mut u = Vector3::zeros(layout);
    u.component_mut(0)
        .fill_real(|_, j, _| (TAU * j as f64 / grid.ny as f64).sin());
    backend.forward_vector(&mut u).unwrap();

    let mut e = Tensor5::zeros(layout);
    stress_tensor(&k, &u, &mut e);
    backend.inverse_vector(&mut e).unwrap();

    let expected = Field::from_fn(layout, |_, j, _| {
        TAU / grid.ly * (TAU * j as f64 / grid.ny as f64).cos()
    });
    let zero = Field::zeros(layout);
    assert!(max_real_diff(e.component(1), &expected) < 1e-12);
    for d in [0, 2, 3, 4] {
        assert!(max_real_diff(e.component(d), &zero) < 1e-12);
    }
}

#[test]
fn oblique_stress_raises_the_wave_vector() {
    let (mut backend, k) = setup();
    let layout = *backend.layout();
    let grid = layout.grid();
    let gamma = 0.3;
    let mut u = Vector3::zeros(layout);
    u.component_mut(1)
        .fill_real(|i, _, _| (TAU * i as f64 / grid.nx as f64).sin());
    backend.forward_vector(&mut u).unwrap();

    let mut cartesian = Tensor5::zeros(layout);
    let mut oblique = Tensor5::zeros(layout);
    stress_tensor(&k, &u, &mut cartesian);
    stress_tensor_oblique(&k, Metric::sheared(gamma), &u, &mut oblique);

    // Only K_x is non-zero, so K^x = (1 + γ²) K_x and K^y = -γ K_x.
    for (a, b) in oblique
        .component(1)
        .as_slice()
        .iter()
        .zip(cartesian.component(1).as_slice())
    {
        assert!((a - (1.0 + gamma * gamma) * b).abs() < 1e-12);
    }
    for (a, b) in oblique
        .component(3)
        .as_slice()
        .iter()
        .zip(cartesian.component(1).as_slice())
    {
        assert!((a + 2.0 * gamma * b).abs() < 1e-12);
    }

    let mut flat = Tensor5::zeros(layout);
    stress_tensor_oblique(&k, Metric::Cartesian, &u, &mut flat);
    for d in 0..5 {
        assert_eq!(flat.component(d).as_slice(), cartesian.component(d).as_slice());
    }
}

#[test]
fn oblique_stress_of_transverse_wave_matches_analytic_values() {
    let (mut backend, k) = setup();
    let layout = *backend.layout();
    let grid = layout.grid();
    let gamma = -0.4;
    let mut u = Vector3::zeros(layout);
    u.component_mut(1)
        .fill_real(|i, _, _| (TAU * i as f64 / grid.nx as f64).sin());
    backend.forward_vector(&mut u).unwrap();

    let mut e = Tensor5::zeros(layout);
    stress_tensor_oblique(&k, Metric::sheared(gamma), &u, &mut e);
    backend.inverse_vector(&mut e).unwrap();

    let slope = |i: usize| TAU / grid.lx * (TAU * i as f64 / grid.nx as f64).cos();
    let xy = Field::from_fn(layout, |i, _, _| (1.0 + gamma * gamma) * slope(i));
    let yy = Field::from_fn(layout, |i, _, _| -2.0 * gamma * slope(i));
    let zero = Field::zeros(layout);
    assert!(max_real_diff(e.component(1), &xy) < 1e-12);
    assert!(max_real_diff(e.component(3), &yy) < 1e-12);
    for d in [0, 2, 4] {
        assert!(max_real_diff(e.component(d), &zero) < 1e-12);
    }
}
