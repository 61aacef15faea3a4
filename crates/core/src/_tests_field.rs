#![cfg(test)]

use num_complex::Complex64;

use super::field::{Field, Representation, Vector3};
use super::grid::Grid3D;
use super::layout::SlabLayout;

fn layout() -> SlabLayout {
    SlabLayout::serial(Grid3D::unit_spacing(4, 4, 4)).expect("valid layout")
}

#[test]
fn zeros_initializes_all_entries_in_real_space() {
    let field = Field::zeros(layout());
    assert_eq!(field.len(), 4 * 4 * 6);
    assert_eq!(field.representation(), Representation::Real);
    assert!(field.as_slice().iter().all(|value| *value == 0.0));
}

#[test]
#[should_panic(expected = "data length must match slab buffer size")]
fn from_vec_rejects_mismatched_lengths() {
    let layout = layout();
    let _ = Field::from_vec(layout, Representation::Real, vec![0.0; layout.buffer_len() - 1]);
}

#[test]
fn from_fn_leaves_z_padding_untouched() {
    let field = Field::from_fn(layout(), |i, j, k| (100 * i + 10 * j + k) as f64);
    assert_eq!(field.real(1, 2, 3), 123.0);
    let pad = layout().real_index(1, 2, 4);
    assert_eq!(field.as_slice()[pad], 0.0);
    assert_eq!(field.as_slice()[pad + 1], 0.0);
}

#[test]
fn modes_are_stored_as_adjacent_real_imaginary_pairs() {
    let layout = layout();
    let mut field = Field::zeros_in(layout, Representation::Spectral);
    field.set_mode(2, 1, 2, Complex64::new(1.5, -0.5));
    let idx = layout.spectral_index(2, 1, 4);
    assert_eq!(field.as_slice()[idx], 1.5);
    assert_eq!(field.as_slice()[idx + 1], -0.5);
    assert_eq!(field.mode(2, 1, 2), Complex64::new(1.5, -0.5));
}

#[test]
#[should_panic(expected = "divergence: expected a field in spectral space")]
fn representation_mismatch_names_the_operation() {
    let field = Field::zeros(layout());
    field.expect_representation(Representation::Spectral, "divergence");
}

#[test]
fn copy_from_carries_the_representation_tag() {
    let layout = layout();
    let mut src = Field::zeros_in(layout, Representation::Spectral);
    src.fill(2.0);
    let mut dst = Field::zeros(layout);
    dst.copy_from(&src);
    assert_eq!(dst.representation(), Representation::Spectral);
    assert_eq!(dst.as_slice(), src.as_slice());
}

#[test]
fn vector_fields_share_layout_and_representation() {
    let mut v = Vector3::zeros_in(layout(), Representation::Spectral);
    assert_eq!(v.representation(), Representation::Spectral);
    v.set_representation(Representation::Real);
    assert!(v
        .components()
        .iter()
        .all(|c| c.representation() == Representation::Real));
}

#[test]
#[should_panic(expected = "components must share a representation")]
fn from_components_rejects_mixed_representations() {
    let layout = layout();
    let _ = Vector3::from_components([
        Field::zeros(layout),
        Field::zeros_in(layout, Representation::Spectral),
        Field::zeros(layout),
    ]);
}
