//! The partitioned cell adjacency graph.
//!
//! `DistributedCellGraph` accumulates nodes and edges in label space during
//! construction, then `finalize()` (a collective) assigns dense local
//! indices — local-owned cells first, then ghosts, an ordering that later
//! code relies on — derives global indices by a prefix scan over owned
//! counts, and discovers each ghost's owning rank by matching labels against
//! every rank's published owned-label list.

use crate::comm::Communicator;
use crate::error::{MeshError, Result};
use crate::ids::{GlobalId, Label, LocalId, Rank};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Owned,
    Ghost,
}

/// The distributed, partitioned cell adjacency graph.
///
/// Generic over the [`Communicator`] so tests can swap in any transport;
/// production code uses [`crate::comm::LocalCommunicator`] or an external
/// network-backed implementation.
pub struct DistributedCellGraph<C: Communicator> {
    communicator: C,
    finalized: bool,

    // --- construction-time state (label space) -----------------------
    kind_by_label: HashMap<Label, NodeKind>,
    owned_labels: Vec<Label>,
    ghost_labels: Vec<Label>,
    edge_labels: Vec<(Label, Label)>,

    // --- post-finalize state (index space) -----------------------------
    label_to_local: HashMap<Label, LocalId>,
    local_to_global: Vec<GlobalId>,
    global_to_local: HashMap<GlobalId, LocalId>,
    ghost_owner: HashMap<LocalId, Rank>,
    edges: Vec<(LocalId, LocalId)>,
}

impl<C: Communicator> DistributedCellGraph<C> {
    /// Create an empty graph bound to `communicator`.
    pub fn new(communicator: C) -> Self {
        Self {
            communicator,
            finalized: false,
            kind_by_label: HashMap::new(),
            owned_labels: Vec::new(),
            ghost_labels: Vec::new(),
            edge_labels: Vec::new(),
            label_to_local: HashMap::new(),
            local_to_global: Vec::new(),
            global_to_local: HashMap::new(),
            ghost_owner: HashMap::new(),
            edges: Vec::new(),
        }
    }

    /// This rank within the graph's communicator.
    #[must_use]
    pub fn rank(&self) -> Rank {
        self.communicator.rank()
    }

    /// Borrow the communicator, e.g. to build an [`crate::exchange::ExchangePattern`].
    #[must_use]
    pub fn communicator(&self) -> &C {
        &self.communicator
    }

    fn check_not_finalized(&self) -> Result<()> {
        if self.finalized {
            Err(MeshError::AlreadyFinalised)
        } else {
            Ok(())
        }
    }

    fn check_finalized(&self) -> Result<()> {
        if self.finalized {
            Ok(())
        } else {
            Err(MeshError::NotFinalised)
        }
    }

    /// Register a cell owned by this rank.
    pub fn add_local_node(&mut self, label: impl Into<Label>) -> Result<()> {
        self.check_not_finalized()?;
        let label = label.into();
        if self.kind_by_label.contains_key(&label) {
            return Err(MeshError::DuplicateNode(label));
        }
        self.kind_by_label.insert(label.clone(), NodeKind::Owned);
        self.owned_labels.push(label);
        Ok(())
    }

    /// Register a ghost (shadow copy of a cell owned elsewhere).
    pub fn add_ghost_node(&mut self, label: impl Into<Label>) -> Result<()> {
        self.check_not_finalized()?;
        let label = label.into();
        if self.kind_by_label.contains_key(&label) {
            return Err(MeshError::DuplicateNode(label));
        }
        self.kind_by_label.insert(label.clone(), NodeKind::Ghost);
        self.ghost_labels.push(label);
        Ok(())
    }

    /// Register an undirected edge — one per interior face.
    ///
    /// Fails with [`MeshError::InvalidEdge`] on a self-loop or a ghost-to-ghost
    /// edge (both endpoints must already be registered).
    pub fn add_undirected_edge(&mut self, a: impl Into<Label>, b: impl Into<Label>) -> Result<()> {
        self.check_not_finalized()?;
        let a = a.into();
        let b = b.into();
        if a == b {
            return Err(MeshError::InvalidEdge(format!("self-loop at {a}")));
        }
        let kind_a = *self
            .kind_by_label
            .get(&a)
            .ok_or_else(|| MeshError::InvalidLabel(a.clone()))?;
        let kind_b = *self
            .kind_by_label
            .get(&b)
            .ok_or_else(|| MeshError::InvalidLabel(b.clone()))?;
        if kind_a == NodeKind::Ghost && kind_b == NodeKind::Ghost {
            return Err(MeshError::InvalidEdge(format!("ghost-to-ghost edge {a}-{b}")));
        }
        self.edge_labels.push((a, b));
        Ok(())
    }

    /// Collective finalisation: assigns dense local/global indices and
    /// discovers ghost ownership. Every rank in the communicator must call
    /// this.
    pub fn finalize(&mut self) -> Result<()> {
        self.check_not_finalized()?;

        let num_owned = self.owned_labels.len();
        let num_ghost = self.ghost_labels.len();

        for (i, label) in self.owned_labels.iter().enumerate() {
            self.label_to_local.insert(label.clone(), LocalId(i));
        }
        for (i, label) in self.ghost_labels.iter().enumerate() {
            self.label_to_local.insert(label.clone(), LocalId(num_owned + i));
        }

        let owned_counts = self.communicator.all_gather(num_owned);
        let mut offsets = vec![0usize; owned_counts.len()];
        for r in 1..owned_counts.len() {
            offsets[r] = offsets[r - 1] + owned_counts[r - 1];
        }
        let my_offset = offsets[self.communicator.rank().0];

        let published = self.communicator.all_gather_labels(&self.owned_labels);

        let mut local_to_global = vec![GlobalId::SENTINEL; num_owned + num_ghost];
        for i in 0..num_owned {
            local_to_global[i] = GlobalId(my_offset + i);
        }

        let mut label_position: HashMap<&Label, (Rank, usize)> = HashMap::new();
        for (r, labels) in published.iter().enumerate() {
            for (k, label) in labels.iter().enumerate() {
                label_position.insert(label, (Rank(r), k));
            }
        }

        for (i, label) in self.ghost_labels.iter().enumerate() {
            let local = LocalId(num_owned + i);
            let (owner, k) = *label_position
                .get(label)
                .ok_or_else(|| MeshError::InvalidLabel(label.clone()))?;
            if owner == self.communicator.rank() {
                return Err(MeshError::InvalidLabel(format!(
                    "ghost {label} resolved to this rank as owner"
                )));
            }
            local_to_global[local.0] = GlobalId(offsets[owner.0] + k);
            self.ghost_owner.insert(local, owner);
        }

        self.edges = self
            .edge_labels
            .iter()
            .map(|(a, b)| (self.label_to_local[a], self.label_to_local[b]))
            .collect();

        self.global_to_local =
            local_to_global.iter().enumerate().map(|(i, &g)| (g, LocalId(i))).collect();
        self.local_to_global = local_to_global;
        self.finalized = true;
        Ok(())
    }

    /// Total number of locally-owned cells.
    #[must_use]
    pub fn num_owned(&self) -> usize {
        self.owned_labels.len()
    }

    /// Total number of ghost cells on this rank.
    #[must_use]
    pub fn num_ghost(&self) -> usize {
        self.ghost_labels.len()
    }

    /// Total nodes (owned + ghost) on this rank.
    #[must_use]
    pub fn num_local(&self) -> usize {
        self.num_owned() + self.num_ghost()
    }

    /// True once `finalize()` has run.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Resolve a construction-time label to its local index.
    pub fn label_to_local(&self, label: &str) -> Result<LocalId> {
        self.check_finalized()?;
        self.label_to_local
            .get(label)
            .copied()
            .ok_or_else(|| MeshError::InvalidLabel(label.to_string()))
    }

    /// Resolve a local index to its global index.
    pub fn local_to_global(&self, local: LocalId) -> Result<GlobalId> {
        self.check_finalized()?;
        self.local_to_global
            .get(local.0)
            .copied()
            .ok_or(MeshError::InvalidIndex(local.0))
    }

    /// Resolve a global index back to this rank's local index, if this rank
    /// stores that cell at all (owned or ghost).
    pub fn global_to_local(&self, global: GlobalId) -> Result<LocalId> {
        self.check_finalized()?;
        self.global_to_local.get(&global).copied().ok_or(MeshError::InvalidIndex(global.0))
    }

    /// True if `label` refers to a ghost node on this rank.
    #[must_use]
    pub fn exists_ghost(&self, label: &str) -> bool {
        self.kind_by_label.get(label) == Some(&NodeKind::Ghost)
    }

    /// True if `label` refers to a locally-owned node on this rank. Usable
    /// both before and after `finalize()`.
    #[must_use]
    pub fn is_owned_label(&self, label: &str) -> bool {
        self.kind_by_label.get(label) == Some(&NodeKind::Owned)
    }

    /// True if `label` has been registered as either owned or ghost.
    #[must_use]
    pub fn label_kind_known(&self, label: &str) -> bool {
        self.kind_by_label.contains_key(label)
    }

    /// True if `local` is a ghost index (in the upper band).
    #[must_use]
    pub fn is_ghost(&self, local: LocalId) -> bool {
        local.0 >= self.num_owned()
    }

    /// The owning rank of a ghost node. Local-owned nodes are always owned
    /// by this rank.
    pub fn owner_of(&self, local: LocalId) -> Result<Rank> {
        self.check_finalized()?;
        if self.is_ghost(local) {
            self.ghost_owner.get(&local).copied().ok_or(MeshError::InvalidIndex(local.0))
        } else if local.0 < self.num_local() {
            Ok(self.communicator.rank())
        } else {
            Err(MeshError::InvalidIndex(local.0))
        }
    }

    /// All undirected edges, endpoints as finalized local indices.
    pub fn edges(&self) -> Result<&[(LocalId, LocalId)]> {
        self.check_finalized()?;
        Ok(&self.edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::LocalCommunicator;

    fn three_rank_ring() -> Vec<DistributedCellGraph<LocalCommunicator>> {
        // rank0 owns A,B; rank1 owns C,D; rank2 owns E,F. Ring edges A-C,
        // C-E, E-A plus B-D, D-F, F-B, with matching ghosts.
        let comms = LocalCommunicator::cluster(3);
        let mut graphs: Vec<_> = comms.into_iter().map(DistributedCellGraph::new).collect();

        graphs[0].add_local_node("A").unwrap();
        graphs[0].add_local_node("B").unwrap();
        graphs[0].add_ghost_node("C").unwrap();
        graphs[0].add_ghost_node("F").unwrap();
        graphs[0].add_undirected_edge("A", "C").unwrap();
        graphs[0].add_undirected_edge("B", "F").unwrap();

        graphs[1].add_local_node("C").unwrap();
        graphs[1].add_local_node("D").unwrap();
        graphs[1].add_ghost_node("E").unwrap();
        graphs[1].add_ghost_node("A").unwrap();
        graphs[1].add_undirected_edge("C", "E").unwrap();
        graphs[1].add_undirected_edge("D", "A").unwrap();

        graphs[2].add_local_node("E").unwrap();
        graphs[2].add_local_node("F").unwrap();
        graphs[2].add_ghost_node("A").unwrap();
        graphs[2].add_ghost_node("D").unwrap();
        graphs[2].add_undirected_edge("E", "A").unwrap();
        graphs[2].add_undirected_edge("F", "D").unwrap();

        graphs
    }

    #[test]
    fn finalize_assigns_two_band_local_indices_and_ghost_owners() {
        let graphs = three_rank_ring();
        let handles: Vec<_> = graphs
            .into_iter()
            .map(|mut g| {
                std::thread::spawn(move || {
                    g.finalize().unwrap();
                    (g.num_owned(), g.num_ghost(), g.rank())
                })
            })
            .collect();
        for h in handles {
            let (owned, ghost, _rank) = h.join().unwrap();
            assert_eq!(owned, 2);
            assert_eq!(ghost, 2);
        }
    }

    #[test]
    fn ghost_owner_is_never_self() {
        let graphs = three_rank_ring();
        let handles: Vec<_> = graphs
            .into_iter()
            .map(|mut g| {
                std::thread::spawn(move || {
                    g.finalize().unwrap();
                    let my_rank = g.rank();
                    for local in g.num_owned()..g.num_local() {
                        let owner = g.owner_of(LocalId(local)).unwrap();
                        assert_ne!(owner, my_rank);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn global_to_local_inverts_local_to_global() {
        let graphs = three_rank_ring();
        let handles: Vec<_> = graphs
            .into_iter()
            .map(|mut g| {
                std::thread::spawn(move || {
                    g.finalize().unwrap();
                    for local in 0..g.num_local() {
                        let global = g.local_to_global(LocalId(local)).unwrap();
                        assert_eq!(g.global_to_local(global).unwrap(), LocalId(local));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let mut comms = LocalCommunicator::cluster(1);
        let mut g = DistributedCellGraph::new(comms.remove(0));
        g.add_local_node("A").unwrap();
        assert_eq!(g.add_local_node("A"), Err(MeshError::DuplicateNode("A".into())));
    }

    #[test]
    fn self_loop_is_rejected() {
        let mut comms = LocalCommunicator::cluster(1);
        let mut g = DistributedCellGraph::new(comms.remove(0));
        g.add_local_node("A").unwrap();
        assert!(matches!(g.add_undirected_edge("A", "A"), Err(MeshError::InvalidEdge(_))));
    }

    #[test]
    fn ghost_to_ghost_edge_is_rejected() {
        let mut comms = LocalCommunicator::cluster(1);
        let mut g = DistributedCellGraph::new(comms.remove(0));
        g.add_ghost_node("A").unwrap();
        g.add_ghost_node("B").unwrap();
        assert!(matches!(g.add_undirected_edge("A", "B"), Err(MeshError::InvalidEdge(_))));
    }

    #[test]
    fn mutation_after_finalize_fails() {
        let mut comms = LocalCommunicator::cluster(1);
        let mut g = DistributedCellGraph::new(comms.remove(0));
        g.add_local_node("A").unwrap();
        g.finalize().unwrap();
        assert_eq!(g.add_local_node("B"), Err(MeshError::AlreadyFinalised));
    }
}
