//! The halo exchange pattern.
//!
//! Built once from a [`DistributedCellGraph`], reused across many
//! `start`/`stop` pairs. Construction partitions each local-owned cell's
//! outgoing edges by the owner of the remote endpoint to build a send CSR,
//! and the matching ghost cells into a recv CSR; `start`/`stop` then pack,
//! post, wait, and unpack against any `n`-element data array indexed by
//! cell local index.

use crate::comm::{Communicator, Request, Tag};
use crate::csr::Csr;
use crate::error::{MeshError, Result};
use crate::graph::DistributedCellGraph;
use crate::ids::{LocalId, Rank};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reserved tag for halo exchange traffic. Peers agreeing on tags out of band
/// allows a fixed pattern-wide tag, provided only one pattern is in flight
/// per `(communicator, datatype)` pair; this crate's transport loop never
/// overlaps exchanges, so a single constant is sufficient (see DESIGN.md).
pub const EXCHANGE_TAG: Tag = Tag(1);

/// The exchange configuration choice. Only `TwoSidedNonBlocking`
/// is implemented; `OneSidedNonBlocking` is an accepted external transport
/// variant with the same contract, not specified further here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExchangeConfig {
    #[default]
    TwoSidedNonBlocking,
    OneSidedNonBlocking,
}

/// Lightweight diagnostic summary of a built plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub send_peers: Vec<Rank>,
    pub recv_peers: Vec<Rank>,
    pub send_nnz: usize,
    pub recv_nnz: usize,
}

struct InFlight<T> {
    send_reqs: Vec<Request<T>>,
    recv_reqs: Vec<Request<T>>,
}

/// A reusable halo exchange plan over one cell graph.
///
/// Borrows the graph's communicator, so the graph must outlive the plan
///.
pub struct ExchangePattern<'a, C: Communicator, T> {
    communicator: &'a C,
    send_peers: Vec<Rank>,
    recv_peers: Vec<Rank>,
    send_csr: Csr<LocalId>,
    recv_csr: Csr<LocalId>,
    in_flight: Option<InFlight<T>>,
}

impl<'a, C: Communicator, T: Copy + Send + 'static> ExchangePattern<'a, C, T> {
    /// Build a halo exchange plan from a finalized cell graph.
    pub fn build(graph: &'a DistributedCellGraph<C>) -> Result<Self> {
        let edges = graph.edges()?;

        let mut send_pairs: Vec<(Rank, LocalId)> = Vec::new();
        let mut recv_pairs: Vec<(Rank, LocalId)> = Vec::new();

        for &(a, b) in edges {
            let a_ghost = graph.is_ghost(a);
            let b_ghost = graph.is_ghost(b);
            match (a_ghost, b_ghost) {
                (false, true) => {
                    let peer = graph.owner_of(b)?;
                    send_pairs.push((peer, a));
                    recv_pairs.push((peer, b));
                }
                (true, false) => {
                    let peer = graph.owner_of(a)?;
                    send_pairs.push((peer, b));
                    recv_pairs.push((peer, a));
                }
                (false, false) => {} // purely local edge, no halo traffic
                (true, true) => {
                    return Err(MeshError::LogicError(
                        "graph invariant forbids ghost-to-ghost edges".into(),
                    ));
                }
            }
        }

        send_pairs.sort_unstable_by_key(|(r, l)| (r.0, l.0));
        send_pairs.dedup();
        recv_pairs.sort_unstable_by_key(|(r, l)| (r.0, l.0));
        recv_pairs.dedup();

        let send_peers = distinct_sorted_ranks(&send_pairs);
        let recv_peers = distinct_sorted_ranks(&recv_pairs);
        let send_row: HashMap<Rank, usize> =
            send_peers.iter().enumerate().map(|(i, r)| (*r, i)).collect();
        let recv_row: HashMap<Rank, usize> =
            recv_peers.iter().enumerate().map(|(i, r)| (*r, i)).collect();

        let send_csr = Csr::from_rows(
            send_peers.len(),
            send_pairs.iter().map(|(r, l)| (send_row[r], *l)),
        );
        let recv_csr = Csr::from_rows(
            recv_peers.len(),
            recv_pairs.iter().map(|(r, l)| (recv_row[r], *l)),
        );

        Ok(Self {
            communicator: graph.communicator(),
            send_peers,
            recv_peers,
            send_csr,
            recv_csr,
            in_flight: None,
        })
    }

    /// Diagnostic summary of the built plan.
    #[must_use]
    pub fn explain(&self) -> PlanSummary {
        PlanSummary {
            send_peers: self.send_peers.clone(),
            recv_peers: self.recv_peers.clone(),
            send_nnz: self.send_csr.nnz(),
            recv_nnz: self.recv_csr.nnz(),
        }
    }

    /// Pack `data` and post non-blocking sends/recvs.
    ///
    /// # Panics
    /// Panics if `data.len()` is smaller than the largest local index
    /// referenced by the plan (a [`MeshError::SizeMismatch`] is the caller's
    /// responsibility to check beforehand via `data.len()`).
    pub fn exchange_start(&mut self, data: &[T]) -> Result<()> {
        let mut recv_reqs = Vec::with_capacity(self.recv_peers.len());
        for peer in &self.recv_peers {
            recv_reqs.push(self.communicator.irecv::<T>(*peer, EXCHANGE_TAG));
        }

        let mut send_reqs = Vec::with_capacity(self.send_peers.len());
        for (row, peer) in self.send_peers.iter().enumerate() {
            let buf: Vec<T> = self
                .send_csr
                .row(row)
                .iter()
                .map(|local| {
                    data.get(local.0).copied().ok_or(MeshError::InvalidIndex(local.0))
                })
                .collect::<Result<_>>()?;
            send_reqs.push(self.communicator.isend(*peer, EXCHANGE_TAG, buf));
        }

        self.in_flight = Some(InFlight { send_reqs, recv_reqs });
        Ok(())
    }

    /// Wait for completion and unpack into `data`'s ghost slots.
    pub fn exchange_stop(&mut self, data: &mut [T]) -> Result<()> {
        let in_flight = self.in_flight.take().ok_or_else(|| {
            MeshError::MessagingFailure("exchangeStop without matching exchangeStart".into())
        })?;

        let recv_results = self.communicator.wait_all(in_flight.recv_reqs)?;
        for (row, values) in recv_results.into_iter().enumerate() {
            let locals = self.recv_csr.row(row);
            if values.len() != locals.len() {
                return Err(MeshError::SizeMismatch { expected: locals.len(), got: values.len() });
            }
            for (local, value) in locals.iter().zip(values) {
                *data.get_mut(local.0).ok_or(MeshError::InvalidIndex(local.0))? = value;
            }
        }
        self.communicator.wait_all(in_flight.send_reqs)?;
        Ok(())
    }

    /// Convenience: `exchange_start` immediately followed by `exchange_stop`.
    pub fn exchange(&mut self, data: &mut [T]) -> Result<()> {
        self.exchange_start(data)?;
        self.exchange_stop(data)
    }
}

fn distinct_sorted_ranks(pairs: &[(Rank, LocalId)]) -> Vec<Rank> {
    let mut ranks: Vec<Rank> = pairs.iter().map(|(r, _)| *r).collect();
    ranks.sort_unstable();
    ranks.dedup();
    ranks
}
