//! Blocking collectives used to redistribute slab data between ranks.
//!
//! [`SingleRank`] degenerates every collective to a local copy. [`ThreadComm`]
//! runs a decomposition as in-process ranks on separate threads, connected by
//! one channel per ordered rank pair; since every rank issues collectives in
//! the same order, per-pair FIFO delivery is enough to match messages.

use crossbeam_channel::{Receiver, Sender};
use log::debug;

use crate::layout::{Representation, SlabLayout};

#[derive(Debug, thiserror::Error)]
pub enum CommError {
    #[error("rank {rank}: peer {peer} disconnected during {operation}")]
    Disconnected {
        rank: usize,
        peer: usize,
        operation: &'static str,
    },

    #[error("rank {rank}: {operation} expected {expected} values, got {actual}")]
    SizeMismatch {
        rank: usize,
        operation: &'static str,
        expected: usize,
        actual: usize,
    },
}

pub trait Communicator: Send + Sync {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Concatenate every rank's equally sized `local` block into `gathered`
    /// in rank order.
    fn all_gather(&self, local: &[f64], gathered: &mut [f64]) -> Result<(), CommError>;

    /// Send block `r` of `send` to rank `r`; block `s` of `recv` receives
    /// the block rank `s` addressed to this rank.
    fn all_to_all(&self, send: &[f64], recv: &mut [f64]) -> Result<(), CommError>;

    /// Element-wise sum of `values` across ranks, result on every rank.
    fn all_reduce_sum(&self, values: &mut [f64]) -> Result<(), CommError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SingleRank;

impl Communicator for SingleRank {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_gather(&self, local: &[f64], gathered: &mut [f64]) -> Result<(), CommError> {
        check_len(0, "all_gather", local.len(), gathered.len())?;
        gathered.copy_from_slice(local);
        Ok(())
    }

    fn all_to_all(&self, send: &[f64], recv: &mut [f64]) -> Result<(), CommError> {
        check_len(0, "all_to_all", send.len(), recv.len())?;
        recv.copy_from_slice(send);
        Ok(())
    }

    fn all_reduce_sum(&self, _values: &mut [f64]) -> Result<(), CommError> {
        Ok(())
    }
}

pub struct ThreadComm {
    rank: usize,
    size: usize,
    /// `senders[dst]` delivers to rank `dst`.
    senders: Vec<Sender<Vec<f64>>>,
    /// `receivers[src]` yields messages from rank `src`.
    receivers: Vec<Receiver<Vec<f64>>>,
}

impl ThreadComm {
    /// Create `size` connected endpoints; hand endpoint `r` to the thread
    /// that plays rank `r`.
    pub fn create(size: usize) -> Vec<ThreadComm> {
        let mut senders: Vec<Vec<Option<Sender<Vec<f64>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut receivers: Vec<Vec<Option<Receiver<Vec<f64>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        for src in 0..size {
            for dst in 0..size {
                let (tx, rx) = crossbeam_channel::unbounded();
                senders[src][dst] = Some(tx);
                receivers[dst][src] = Some(rx);
            }
        }
        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (tx, rx))| ThreadComm {
                rank,
                size,
                senders: tx.into_iter().flatten().collect(),
                receivers: rx.into_iter().flatten().collect(),
            })
            .collect()
    }

    fn send(&self, dst: usize, payload: Vec<f64>, operation: &'static str) -> Result<(), CommError> {
        self.senders[dst]
            .send(payload)
            .map_err(|_| CommError::Disconnected {
                rank: self.rank,
                peer: dst,
                operation,
            })
    }

    fn recv(&self, src: usize, expected: usize, operation: &'static str) -> Result<Vec<f64>, CommError> {
        let payload = self.receivers[src]
            .recv()
            .map_err(|_| CommError::Disconnected {
                rank: self.rank,
                peer: src,
                operation,
            })?;
        check_len(self.rank, operation, expected, payload.len())?;
        Ok(payload)
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_gather(&self, local: &[f64], gathered: &mut [f64]) -> Result<(), CommError> {
        let block = local.len();
        check_len(self.rank, "all_gather", block * self.size, gathered.len())?;
        if block == 0 {
            return Ok(());
        }
        for dst in (0..self.size).filter(|&dst| dst != self.rank) {
            self.send(dst, local.to_vec(), "all_gather")?;
        }
        for (src, chunk) in gathered.chunks_exact_mut(block).enumerate() {
            if src == self.rank {
                chunk.copy_from_slice(local);
            } else {
                chunk.copy_from_slice(&self.recv(src, block, "all_gather")?);
            }
        }
        Ok(())
    }

    fn all_to_all(&self, send: &[f64], recv: &mut [f64]) -> Result<(), CommError> {
        check_len(self.rank, "all_to_all", send.len(), recv.len())?;
        if send.is_empty() {
            return Ok(());
        }
        let block = send.len() / self.size;
        check_len(self.rank, "all_to_all", block * self.size, send.len())?;
        for (dst, chunk) in send.chunks_exact(block).enumerate() {
            if dst != self.rank {
                self.send(dst, chunk.to_vec(), "all_to_all")?;
            }
        }
        for (src, chunk) in recv.chunks_exact_mut(block).enumerate() {
            if src == self.rank {
                let own = &send[src * block..(src + 1) * block];
                chunk.copy_from_slice(own);
            } else {
                chunk.copy_from_slice(&self.recv(src, block, "all_to_all")?);
            }
        }
        Ok(())
    }

    fn all_reduce_sum(&self, values: &mut [f64]) -> Result<(), CommError> {
        let local = values.to_vec();
        for dst in (0..self.size).filter(|&dst| dst != self.rank) {
            self.send(dst, local.clone(), "all_reduce_sum")?;
        }
        // Sum in rank order so every rank produces bit-identical results.
        values.fill(0.0);
        for src in 0..self.size {
            let contribution = if src == self.rank {
                local.clone()
            } else {
                self.recv(src, local.len(), "all_reduce_sum")?
            };
            for (acc, value) in values.iter_mut().zip(contribution) {
                *acc += value;
            }
        }
        Ok(())
    }
}

/// Assemble the full x extent of a real-space slab buffer on every rank.
///
/// x is the slowest axis of the real layout, so concatenating slabs in rank
/// order reproduces the global buffer.
pub fn gather_full_extent(
    comm: &dyn Communicator,
    layout: &SlabLayout,
    local: &[f64],
    full: &mut [f64],
) -> Result<(), CommError> {
    check_len(comm.rank(), "gather_full_extent", layout.buffer_len(), local.len())?;
    check_len(comm.rank(), "gather_full_extent", layout.full_real_len(), full.len())?;
    debug!(
        "rank {}: gathering full x extent from x-slab {:?}..{:?}",
        comm.rank(),
        layout.prev(Representation::Real),
        layout.next(Representation::Real)
    );
    comm.all_gather(local, full)
}

fn check_len(
    rank: usize,
    operation: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), CommError> {
    if expected == actual {
        Ok(())
    } else {
        Err(CommError::SizeMismatch {
            rank,
            operation,
            expected,
            actual,
        })
    }
}
