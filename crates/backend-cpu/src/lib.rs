//! CPU spectral backend built on rustfft.
//!
//! The distributed real-to-half-complex transform runs in four passes:
//!
//! 1. real-to-complex FFT along z for every owned `(x, y)` line,
//! 2. complex FFT along y inside each owned x-plane,
//! 3. all-to-all transpose from x-slabs to y-slabs,
//! 4. complex FFT along x for every owned `(y, z)` column.
//!
//! The inverse runs the passes backwards. Passes 1, 2 and 4 run under
//! rayon; pass 3 goes through the core [`Communicator`]. The forward pass
//! uses the `e^{+i K·x}` kernel (rustfft's `Inverse` direction) and scales
//! by `1 / (nx ny nz)`; the inverse pass uses `e^{-i K·x}` (rustfft's
//! `Forward` direction), unscaled.

use std::sync::Arc;

use log::{debug, info};
use num_complex::Complex64;
use rayon::prelude::*;
use rustfft::{Fft, FftDirection, FftPlanner};
use shearspec_core::backend::SpectralBackend;
use shearspec_core::comm::{CommError, Communicator, SingleRank};
use shearspec_core::config::ConfigError;
use shearspec_core::field::{Field, Representation};
use shearspec_core::grid::Grid3D;
use shearspec_core::layout::SlabLayout;

struct Plans {
    z_fwd: Arc<dyn Fft<f64>>,
    z_inv: Arc<dyn Fft<f64>>,
    y_fwd: Arc<dyn Fft<f64>>,
    y_inv: Arc<dyn Fft<f64>>,
    x_fwd: Arc<dyn Fft<f64>>,
    x_inv: Arc<dyn Fft<f64>>,
}

impl Plans {
    fn new(grid: Grid3D) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        // Spectral derivatives are `-i K`, so the forward pass needs `e^{+i K·x}`.
        let forward = FftDirection::Inverse;
        let inverse = FftDirection::Forward;
        Self {
            z_fwd: planner.plan_fft(grid.nz, forward),
            z_inv: planner.plan_fft(grid.nz, inverse),
            y_fwd: planner.plan_fft(grid.ny, forward),
            y_inv: planner.plan_fft(grid.ny, inverse),
            x_fwd: planner.plan_fft(grid.nx, forward),
            x_inv: planner.plan_fft(grid.nx, inverse),
        }
    }
}

pub struct CpuBackend {
    layout: SlabLayout,
    comm: Arc<dyn Communicator>,
    plans: Plans,
    /// Complex coefficients in whichever slab layout the current pass uses.
    work: Vec<Complex64>,
    /// x-columns laid out contiguously for pass 4.
    columns: Vec<Complex64>,
    send: Vec<f64>,
    recv: Vec<f64>,
}

impl CpuBackend {
    pub fn new(layout: SlabLayout, comm: Arc<dyn Communicator>) -> Result<Self, ConfigError> {
        let grid = layout.grid();
        if grid.nz % 2 != 0 {
            return Err(ConfigError::UnsupportedTransformSize(format!(
                "nz={} must be even for the real-to-half-complex transform",
                grid.nz
            )));
        }
        if comm.rank() != layout.rank() || comm.size() != layout.size() {
            return Err(ConfigError::Decomposition(format!(
                "communicator is rank {}/{} but the layout expects rank {}/{}",
                comm.rank(),
                comm.size(),
                layout.rank(),
                layout.size()
            )));
        }

        let len = layout.nx_local() * grid.ny * grid.nz_modes();
        info!(
            "cpu backend: {}x{}x{} transform on rank {}/{}",
            grid.nx,
            grid.ny,
            grid.nz,
            layout.rank(),
            layout.size()
        );
        Ok(Self {
            layout,
            comm,
            plans: Plans::new(grid),
            work: vec![Complex64::default(); len],
            columns: vec![Complex64::default(); len],
            send: vec![0.0; 2 * len],
            recv: vec![0.0; 2 * len],
        })
    }

    pub fn serial(grid: Grid3D) -> Result<Self, ConfigError> {
        Self::new(SlabLayout::serial(grid)?, Arc::new(SingleRank))
    }

    /// Exchange length of `count` components, growing the buffers on demand.
    fn reserve_exchange(&mut self, count: usize) -> usize {
        let len = count * 2 * self.work.len();
        if self.send.len() < len {
            self.send.resize(len, 0.0);
            self.recv.resize(len, 0.0);
        }
        len
    }

    /// Forward transform of every field with a single all-to-all exchange.
    fn forward_many(&mut self, fields: &mut [Field]) -> Result<(), CommError> {
        if fields.is_empty() {
            return Ok(());
        }
        for field in fields.iter() {
            field.expect_representation(Representation::Real, "forward transform");
        }
        let layout = self.layout;
        let grid = layout.grid();
        let nzm = grid.nz_modes();
        let count = fields.len();
        let len = self.reserve_exchange(count);

        for (index, field) in fields.iter().enumerate() {
            z_real_to_complex(&self.plans.z_fwd, grid, field.as_slice(), &mut self.work);
            y_pass(&self.plans.y_fwd, grid.ny, nzm, &mut self.work);
            pack_real_to_spectral(&layout, &self.work, &mut self.send[..len], Slot { count, index });
        }
        self.comm.all_to_all(&self.send[..len], &mut self.recv[..len])?;

        let scale = 1.0 / grid.len() as f64;
        for (index, field) in fields.iter_mut().enumerate() {
            unpack_real_to_spectral(&layout, &self.recv[..len], &mut self.work, Slot { count, index });
            x_pass(
                &self.plans.x_fwd,
                grid.nx,
                layout.spectral_plane_len() / 2,
                &mut self.work,
                &mut self.columns,
            );
            store_spectral(grid, &self.work, scale, field.as_mut_slice());
            field.set_representation(Representation::Spectral);
        }
        Ok(())
    }

    /// Inverse transform of every field with a single all-to-all exchange.
    fn inverse_many(&mut self, fields: &mut [Field]) -> Result<(), CommError> {
        if fields.is_empty() {
            return Ok(());
        }
        for field in fields.iter() {
            field.expect_representation(Representation::Spectral, "inverse transform");
        }
        let layout = self.layout;
        let grid = layout.grid();
        let nzm = grid.nz_modes();
        let count = fields.len();
        let len = self.reserve_exchange(count);

        for (index, field) in fields.iter().enumerate() {
            load_spectral(grid, field.as_slice(), &mut self.work);
            x_pass(
                &self.plans.x_inv,
                grid.nx,
                layout.spectral_plane_len() / 2,
                &mut self.work,
                &mut self.columns,
            );
            pack_spectral_to_real(&layout, &self.work, &mut self.send[..len], Slot { count, index });
        }
        self.comm.all_to_all(&self.send[..len], &mut self.recv[..len])?;

        for (index, field) in fields.iter_mut().enumerate() {
            unpack_spectral_to_real(&layout, &self.recv[..len], &mut self.work, Slot { count, index });
            y_pass(&self.plans.y_inv, grid.ny, nzm, &mut self.work);
            z_complex_to_real(&self.plans.z_inv, grid, &self.work, field.as_mut_slice());
            field.set_representation(Representation::Real);
        }
        Ok(())
    }
}

impl SpectralBackend for CpuBackend {
    fn layout(&self) -> &SlabLayout {
        &self.layout
    }

    fn communicator(&self) -> &Arc<dyn Communicator> {
        &self.comm
    }

    fn forward(&mut self, field: &mut Field) -> Result<(), CommError> {
        debug!("rank {}: forward transform", self.layout.rank());
        self.forward_many(std::slice::from_mut(field))
    }

    fn inverse(&mut self, field: &mut Field) -> Result<(), CommError> {
        debug!("rank {}: inverse transform", self.layout.rank());
        self.inverse_many(std::slice::from_mut(field))
    }

    fn forward_batch(&mut self, fields: &mut [Field]) -> Result<(), CommError> {
        debug!(
            "rank {}: forward transform of {} components, one exchange",
            self.layout.rank(),
            fields.len()
        );
        self.forward_many(fields)
    }

    fn inverse_batch(&mut self, fields: &mut [Field]) -> Result<(), CommError> {
        debug!(
            "rank {}: inverse transform of {} components, one exchange",
            self.layout.rank(),
            fields.len()
        );
        self.inverse_many(fields)
    }
}

/// Position of one component inside a batched exchange. Rank block `r` of
/// the send and receive buffers holds `count` component blocks in order.
#[derive(Debug, Clone, Copy)]
struct Slot {
    count: usize,
    index: usize,
}

impl Slot {
    fn offset(self, rank: usize, block: usize) -> usize {
        (rank * self.count + self.index) * block
    }
}

/// Pass 1: every `(x, y)` line of `nz` samples becomes `nz/2 + 1` modes.
fn z_real_to_complex(plan: &Arc<dyn Fft<f64>>, grid: Grid3D, input: &[f64], work: &mut [Complex64]) {
    let (nz, nzm, nzp) = (grid.nz, grid.nz_modes(), grid.padded_nz());
    work.par_chunks_mut(nzm)
        .zip(input.par_chunks(nzp))
        .for_each_init(
            || {
                (
                    vec![Complex64::default(); nz],
                    vec![Complex64::default(); plan.get_inplace_scratch_len()],
                )
            },
            |(line, scratch), (out, samples)| {
                for (c, &s) in line.iter_mut().zip(&samples[..nz]) {
                    *c = Complex64::new(s, 0.0);
                }
                plan.process_with_scratch(line, scratch);
                out.copy_from_slice(&line[..nzm]);
            },
        );
}

/// Inverse of pass 1 through the Hermitian extension `X[nz - m] = conj(X[m])`.
fn z_complex_to_real(plan: &Arc<dyn Fft<f64>>, grid: Grid3D, work: &[Complex64], output: &mut [f64]) {
    let (nz, nzm, nzp) = (grid.nz, grid.nz_modes(), grid.padded_nz());
    output
        .par_chunks_mut(nzp)
        .zip(work.par_chunks(nzm))
        .for_each_init(
            || {
                (
                    vec![Complex64::default(); nz],
                    vec![Complex64::default(); plan.get_inplace_scratch_len()],
                )
            },
            |(line, scratch), (samples, modes)| {
                line[..nzm].copy_from_slice(modes);
                for m in nzm..nz {
                    line[m] = modes[nz - m].conj();
                }
                plan.process_with_scratch(line, scratch);
                for (s, c) in samples[..nz].iter_mut().zip(line.iter()) {
                    *s = c.re;
                }
                samples[nz..].fill(0.0);
            },
        );
}

/// Pass 2: FFT along y inside each real-space x-plane of `ny * nzm` modes.
fn y_pass(plan: &Arc<dyn Fft<f64>>, ny: usize, nzm: usize, work: &mut [Complex64]) {
    work.par_chunks_mut(ny * nzm).for_each_init(
        || {
            (
                vec![Complex64::default(); ny],
                vec![Complex64::default(); plan.get_inplace_scratch_len()],
            )
        },
        |(column, scratch), plane| {
            for m in 0..nzm {
                for (j, c) in column.iter_mut().enumerate() {
                    *c = plane[j * nzm + m];
                }
                plan.process_with_scratch(column, scratch);
                for (j, c) in column.iter().enumerate() {
                    plane[j * nzm + m] = *c;
                }
            }
        },
    );
}

/// Pass 4: FFT along x for each of the `plane` complex entries of a
/// spectral x-plane, staged through contiguous columns.
fn x_pass(
    plan: &Arc<dyn Fft<f64>>,
    nx: usize,
    plane: usize,
    work: &mut [Complex64],
    columns: &mut [Complex64],
) {
    {
        let work = &*work;
        columns
            .par_chunks_mut(nx)
            .enumerate()
            .for_each_init(
                || vec![Complex64::default(); plan.get_inplace_scratch_len()],
                |scratch, (c, column)| {
                    for (i, value) in column.iter_mut().enumerate() {
                        *value = work[i * plane + c];
                    }
                    plan.process_with_scratch(column, scratch);
                },
            );
    }
    let columns = &*columns;
    work.par_chunks_mut(plane).enumerate().for_each(|(i, row)| {
        for (c, value) in row.iter_mut().enumerate() {
            *value = columns[c * nx + i];
        }
    });
}

/// Regroup real-layout coefficients `[i][j][m]` into per-destination blocks
/// `[r][i][j in r's rows][m]`, interleaving real and imaginary parts.
fn pack_real_to_spectral(layout: &SlabLayout, work: &[Complex64], send: &mut [f64], slot: Slot) {
    let grid = layout.grid();
    let (ny, nzm) = (grid.ny, grid.nz_modes());
    let (nx_local, ny_local) = (layout.nx_local(), layout.ny_local());
    let block = 2 * nx_local * ny_local * nzm;

    send.par_chunks_mut(block * slot.count)
        .enumerate()
        .for_each(|(r, dest)| {
            let out = &mut dest[slot.index * block..(slot.index + 1) * block];
            for i in 0..nx_local {
                for jj in 0..ny_local {
                    let src = (i * ny + r * ny_local + jj) * nzm;
                    let dst = 2 * (i * ny_local + jj) * nzm;
                    for m in 0..nzm {
                        let c = work[src + m];
                        out[dst + 2 * m] = c.re;
                        out[dst + 2 * m + 1] = c.im;
                    }
                }
            }
        });
}

/// Blocks from source ranks `s` arrive as `[i in s's planes][j][m]`, which
/// is already the spectral order.
fn unpack_real_to_spectral(layout: &SlabLayout, recv: &[f64], work: &mut [Complex64], slot: Slot) {
    let half = layout.nx_local() * layout.ny_local() * layout.grid().nz_modes();
    work.par_chunks_mut(half)
        .enumerate()
        .for_each(|(s, dst)| {
            let src = &recv[slot.offset(s, 2 * half)..][..2 * half];
            for (c, pair) in dst.iter_mut().zip(src.chunks_exact(2)) {
                *c = Complex64::new(pair[0], pair[1]);
            }
        });
}

/// Spectral coefficients are already grouped by destination x-slab.
fn pack_spectral_to_real(layout: &SlabLayout, work: &[Complex64], send: &mut [f64], slot: Slot) {
    let half = layout.nx_local() * layout.ny_local() * layout.grid().nz_modes();
    send.par_chunks_mut(2 * half * slot.count)
        .zip(work.par_chunks(half))
        .for_each(|(dest, src)| {
            let out = &mut dest[slot.index * 2 * half..(slot.index + 1) * 2 * half];
            for (pair, c) in out.chunks_exact_mut(2).zip(src) {
                pair[0] = c.re;
                pair[1] = c.im;
            }
        });
}

/// Scatter blocks from source ranks `s` (`[i][j in s's rows][m]`) into the
/// real layout.
fn unpack_spectral_to_real(layout: &SlabLayout, recv: &[f64], work: &mut [Complex64], slot: Slot) {
    let grid = layout.grid();
    let (ny, nzm) = (grid.ny, grid.nz_modes());
    let (size, ny_local) = (layout.size(), layout.ny_local());
    let block = 2 * layout.nx_local() * ny_local * nzm;

    work.par_chunks_mut(ny * nzm)
        .enumerate()
        .for_each(|(i, plane)| {
            for s in 0..size {
                let base = slot.offset(s, block);
                for jj in 0..ny_local {
                    let src = base + 2 * (i * ny_local + jj) * nzm;
                    let dst = (s * ny_local + jj) * nzm;
                    for m in 0..nzm {
                        plane[dst + m] = Complex64::new(recv[src + 2 * m], recv[src + 2 * m + 1]);
                    }
                }
            }
        });
}

fn pack(work: &[Complex64], send: &mut [f64]) {
    send.par_chunks_mut(2)
        .zip(work.par_iter())
        .for_each(|(out, c)| {
            out[0] = c.re;
            out[1] = c.im;
        });
}

fn unpack(recv: &[f64], work: &mut [Complex64]) {
    work.par_iter_mut()
        .zip(recv.par_chunks(2))
        .for_each(|(c, pair)| *c = Complex64::new(pair[0], pair[1]));
}

fn store_spectral(grid: Grid3D, work: &[Complex64], scale: f64, output: &mut [f64]) {
    pack(work, output);
    debug_assert_eq!(2 * grid.nz_modes(), grid.padded_nz());
    output.par_iter_mut().for_each(|value| *value *= scale);
}

fn load_spectral(grid: Grid3D, input: &[f64], work: &mut [Complex64]) {
    debug_assert_eq!(2 * grid.nz_modes(), grid.padded_nz());
    unpack(input, work);
}

#[cfg(test)]
mod _tests_lib;
