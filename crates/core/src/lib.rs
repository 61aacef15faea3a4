//! Reciprocal-space field engine for a sheared, particle-resolved fluid
//! solver: distributed transforms, spectral operators, reduced vorticity,
//! de-aliasing and the Lees-Edwards oblique frame.

pub mod backend;
pub mod comm;
pub mod config;
pub mod engine;
pub mod field;
pub mod grid;
pub mod kspace;
pub mod layout;
pub mod metric;
pub mod oblique;
pub mod operators;
pub mod shear;
pub mod spline;
pub mod truncation;
pub mod vorticity;


#[cfg(test)]
mod _tests_field;
#[cfg(test)]
mod _tests_grid;
#[cfg(test)]
mod _tests_operators;
#[cfg(test)]
mod _tests_vorticity;
