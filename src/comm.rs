//! The messaging contract the rest of the engine treats as a black box.
//!
//! Primitive collectives and point-to-point wrappers over a messaging
//! library live outside the core's scope — the cell graph, the
//! exchange pattern, and particle migration only ever call through the
//! [`Communicator`] trait. [`LocalCommunicator`] is the one concrete
//! transport shipped here: an in-process emulator that runs each simulated
//! rank on its own OS thread and moves messages over channels, the same
//! shape as the shard-local `send`/`recv` client used to drive in-process
//! distributed simulation in sharded transaction executors (see
//! `DESIGN.md`). A real deployment swaps in a network/MPI-backed
//! implementation of the same trait without touching anything upstream.

use crate::error::{MeshError, Result};
use crate::ids::{Label, Rank};
use std::any::Any;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::mpsc::{self, Receiver, Sender};

/// Message tag, used to disambiguate concurrent exchange patterns on the
/// same communicator (peers agree on tags out of band).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub u32);

/// Reserved tag for the collective helpers (`barrier`, `all_reduce_or`,
/// `all_gather_*`); application exchange patterns must not use it.
pub const COLLECTIVE_TAG: Tag = Tag(u32::MAX);

type Envelope = Box<dyn Any + Send>;

/// A handle to a non-blocking send or receive, matched by `(peer, tag)`.
///
/// Completion is observed with [`Communicator::wait`] /
/// [`Communicator::wait_all`]; a pattern's stop phase waits on all requests
/// posted during its start phase.
pub enum Request<T> {
    /// A posted send; nothing to receive back, `wait` resolves immediately.
    Send,
    /// A posted receive from `peer`.
    Recv { peer: Rank, _marker: PhantomData<fn() -> T> },
}

/// The transport contract consumed by [`crate::graph::DistributedCellGraph`],
/// [`crate::exchange::ExchangePattern`], and particle migration
///.
/// Each rank runs the core single-threaded, so a communicator only
/// needs to move into its rank's worker thread, never be shared across
/// threads — hence `Send` without `Sync`.
pub trait Communicator: Send {
    /// This process's rank within the communicator.
    fn rank(&self) -> Rank;

    /// Total number of ranks in the communicator.
    fn size(&self) -> usize;

    /// Post a non-blocking send of `data` to `peer`.
    fn isend<T: Send + 'static>(&self, peer: Rank, tag: Tag, data: Vec<T>) -> Request<T>;

    /// Post a non-blocking receive from `peer`.
    fn irecv<T: Send + 'static>(&self, peer: Rank, tag: Tag) -> Request<T>;

    /// Block until `req` completes, returning the received data (empty for
    /// a send request).
    fn wait<T: Send + 'static>(&self, req: Request<T>) -> Result<Vec<T>>;

    /// Block until every request in `reqs` completes, preserving order.
    fn wait_all<T: Send + 'static>(&self, reqs: Vec<Request<T>>) -> Result<Vec<Vec<T>>> {
        reqs.into_iter().map(|r| self.wait(r)).collect()
    }

    /// Collective: every rank contributes `value`; all ranks receive the
    /// full vector indexed by rank.
    fn all_gather<T: Clone + Send + 'static>(&self, value: T) -> Vec<T>;

    /// Collective barrier: returns only once every rank has called it.
    fn barrier(&self) {
        let _ = self.all_gather(());
    }

    /// Collective "any work remaining" reduction.
    fn all_reduce_or(&self, local: bool) -> bool {
        self.all_gather(local).into_iter().any(|b| b)
    }

    /// Collective: every rank publishes the labels it owns; used for ghost
    /// owner discovery.
    fn all_gather_labels(&self, owned: &[Label]) -> Vec<Vec<Label>> {
        self.all_gather(owned.to_vec())
    }
}

/// An in-process, channel-backed [`Communicator`] that emulates a cluster of
/// `size` ranks without a real network. Build a whole cluster at once with
/// [`LocalCommunicator::cluster`]; each element is meant to be moved into
/// its own worker thread.
pub struct LocalCommunicator {
    rank: Rank,
    size: usize,
    senders: Vec<Sender<Envelope>>,
    receivers: Vec<RefCell<Receiver<Envelope>>>,
}

impl LocalCommunicator {
    /// Build `size` communicators wired to each other with a dedicated
    /// channel per ordered `(from, to)` pair, so message order within a
    /// peer pair is preserved for free: within one exchange pattern's
    /// start/stop pair, sends and receives match by tag and posted order.
    #[must_use]
    pub fn cluster(size: usize) -> Vec<LocalCommunicator> {
        assert!(size > 0, "a cluster needs at least one rank");
        let mut senders: Vec<Vec<Sender<Envelope>>> = vec![Vec::with_capacity(size); size];
        let mut receivers: Vec<Vec<Option<Receiver<Envelope>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();

        for from in 0..size {
            for to in 0..size {
                let (tx, rx) = mpsc::channel();
                senders[from].push(tx);
                receivers[to][from] = Some(rx);
            }
        }

        receivers
            .into_iter()
            .zip(senders)
            .enumerate()
            .map(|(rank, (incoming, outgoing))| LocalCommunicator {
                rank: Rank(rank),
                size,
                senders: outgoing,
                receivers: incoming
                    .into_iter()
                    .map(|r| RefCell::new(r.expect("every (from, to) pair wired")))
                    .collect(),
            })
            .collect()
    }

    fn send_envelope(&self, peer: Rank, envelope: Envelope) -> Result<()> {
        self.senders[peer.0]
            .send(envelope)
            .map_err(|_| MeshError::MessagingFailure(format!("peer {peer} channel closed")))
    }

    fn recv_envelope(&self, peer: Rank) -> Result<Envelope> {
        self.receivers[peer.0]
            .borrow_mut()
            .recv()
            .map_err(|_| MeshError::MessagingFailure(format!("peer {peer} channel closed")))
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend<T: Send + 'static>(&self, peer: Rank, _tag: Tag, data: Vec<T>) -> Request<T> {
        // Best-effort: a closed channel surfaces on wait() of the matching
        // recv; swallow the immediate send error here and let the
        // recv-side timeout/closed-channel path report it.
        let _ = self.send_envelope(peer, Box::new(data));
        Request::Send
    }

    fn irecv<T: Send + 'static>(&self, peer: Rank, _tag: Tag) -> Request<T> {
        Request::Recv { peer, _marker: PhantomData }
    }

    fn wait<T: Send + 'static>(&self, req: Request<T>) -> Result<Vec<T>> {
        match req {
            Request::Send => Ok(Vec::new()),
            Request::Recv { peer, .. } => {
                let envelope = self.recv_envelope(peer)?;
                envelope
                    .downcast::<Vec<T>>()
                    .map(|boxed| *boxed)
                    .map_err(|_| MeshError::DatatypeUnregistered)
            }
        }
    }

    fn all_gather<T: Clone + Send + 'static>(&self, value: T) -> Vec<T> {
        for peer in 0..self.size {
            if peer != self.rank.0 {
                let _ = self.send_envelope(Rank(peer), Box::new(value.clone()) as Envelope);
            }
        }
        let mut out: Vec<Option<T>> = vec![None; self.size];
        out[self.rank.0] = Some(value);
        for peer in 0..self.size {
            if peer != self.rank.0 {
                let envelope = self
                    .recv_envelope(Rank(peer))
                    .expect("collective channel stays open for the cluster's lifetime");
                let v = *envelope
                    .downcast::<T>()
                    .unwrap_or_else(|_| panic!("collective datatype mismatch from {peer}"));
                out[peer] = Some(v);
            }
        }
        out.into_iter().map(|v| v.expect("every rank contributed")).collect()
    }
}
