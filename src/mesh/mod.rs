//! The unstructured mesh: cells, faces, vertices, boundaries, and regions
//! layered on top of a [`DistributedCellGraph`].
//!
//! Construction mirrors the graph's own two-phase shape: `add_*` calls build
//! up label-addressable records and register a parallel node/edge in the
//! embedded graph, then a single collective `finalize()` reindexes
//! everything into the graph's final local order, validates boundary
//! linkage, builds the cell→face table, and exchanges ghost stored-counts
//! into global counts.

mod types;

pub use types::{Boundary, Cell, Face, FaceVertices, Region, RegionKind, Vertex};

use crate::comm::Communicator;
use crate::csr::Csr;
use crate::error::{MeshError, Result};
use crate::exchange::ExchangePattern;
use crate::geometry::Point3;
use crate::graph::DistributedCellGraph;
use crate::ids::{BoundaryId, FaceLocalId, Label, LocalId, RegionId, VertexId};
use std::collections::{HashMap, HashSet};

/// The unstructured mesh.
///
/// Generic over the [`Communicator`] used by its embedded cell graph, which
/// the mesh owns outright: the mesh exclusively owns cell, face, vertex,
/// boundary, and region records, and delegates only adjacency/partitioning
/// to the embedded graph.
pub struct UnstructuredMesh<C: Communicator> {
    graph: DistributedCellGraph<C>,
    finalized: bool,

    // --- construction-time state, indexed by push order ------------------
    cells: Vec<Cell>,
    cell_labels: Vec<Label>,
    cell_label_to_id: HashMap<Label, usize>,
    faces: Vec<Face>,
    face_label_to_id: HashMap<Label, FaceLocalId>,
    vertices: Vec<Vertex>,
    vertex_label_to_id: HashMap<Label, VertexId>,
    boundaries: Vec<Boundary>,
    boundary_label_to_id: HashMap<Label, BoundaryId>,
    regions: Vec<Region>,
    region_label_to_id: HashMap<Label, RegionId>,
    declared_edges: HashSet<(Label, Label)>,

    // --- post-finalize state -----------------------------------------------
    cell_face_csr: Option<Csr<FaceLocalId>>,
}

impl<C: Communicator> UnstructuredMesh<C> {
    /// Create an empty mesh bound to `communicator`.
    pub fn new(communicator: C) -> Self {
        Self {
            graph: DistributedCellGraph::new(communicator),
            finalized: false,
            cells: Vec::new(),
            cell_labels: Vec::new(),
            cell_label_to_id: HashMap::new(),
            faces: Vec::new(),
            face_label_to_id: HashMap::new(),
            vertices: Vec::new(),
            vertex_label_to_id: HashMap::new(),
            boundaries: Vec::new(),
            boundary_label_to_id: HashMap::new(),
            regions: Vec::new(),
            region_label_to_id: HashMap::new(),
            declared_edges: HashSet::new(),
            cell_face_csr: None,
        }
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

    /// The embedded cell graph (e.g. to build an [`ExchangePattern`] over
    /// some other per-cell quantity).
    #[must_use]
    pub fn graph(&self) -> &DistributedCellGraph<C> {
        &self.graph
    }

    // --- construction ------------------------------------------------------

    /// Register a cell. `owned` distinguishes a locally-owned cell from a
    /// ghost shadowing a cell owned elsewhere, mirroring
    /// [`DistributedCellGraph::add_local_node`] /
    /// [`DistributedCellGraph::add_ghost_node`].
    pub fn add_cell(
        &mut self,
        label: impl Into<Label>,
        owned: bool,
        centroid: Point3,
        volume: f64,
    ) -> Result<()> {
        self.check_not_finalized()?;
        let label = label.into();
        if self.cell_label_to_id.contains_key(&label) {
            return Err(MeshError::DuplicateNode(label));
        }
        if owned {
            self.graph.add_local_node(label.clone())?;
        } else {
            self.graph.add_ghost_node(label.clone())?;
        }
        let id = self.cells.len();
        self.cells.push(Cell { centroid, volume, ..Cell::default() });
        self.cell_labels.push(label.clone());
        self.cell_label_to_id.insert(label, id);
        Ok(())
    }

    /// Register a vertex.
    pub fn add_vertex(&mut self, label: impl Into<Label>, position: Point3) -> Result<()> {
        self.check_not_finalized()?;
        let label = label.into();
        if self.vertex_label_to_id.contains_key(&label) {
            return Err(MeshError::DuplicateNode(label));
        }
        let id = VertexId(self.vertices.len());
        self.vertices.push(Vertex { position });
        self.vertex_label_to_id.insert(label, id);
        Ok(())
    }

    /// Register a named boundary region.
    pub fn add_region(&mut self, label: impl Into<Label>, region: Region) -> Result<()> {
        self.check_not_finalized()?;
        let label = label.into();
        if self.region_label_to_id.contains_key(&label) {
            return Err(MeshError::DuplicateNode(label));
        }
        let id = RegionId(self.regions.len());
        self.regions.push(region);
        self.region_label_to_id.insert(label, id);
        Ok(())
    }

    fn resolve_vertices(&self, labels: &[Label]) -> Result<FaceVertices> {
        if labels.len() != 3 && labels.len() != 4 {
            return Err(MeshError::InvalidVertexCount(labels.len()));
        }
        let mut out = [VertexId::SENTINEL; 4];
        for (slot, label) in out.iter_mut().zip(labels) {
            *slot = *self
                .vertex_label_to_id
                .get(label)
                .ok_or_else(|| MeshError::InvalidLabel(label.clone()))?;
        }
        Ok(out)
    }

    /// Register a boundary patch, not yet linked to a face (the link is
    /// completed by [`Self::add_face`] and validated at [`Self::finalize`]).
    pub fn add_boundary(
        &mut self,
        label: impl Into<Label>,
        region_label: &str,
        vertex_labels: &[Label],
    ) -> Result<()> {
        self.check_not_finalized()?;
        let label = label.into();
        if self.boundary_label_to_id.contains_key(&label) {
            return Err(MeshError::DuplicateNode(label));
        }
        let region = *self
            .region_label_to_id
            .get(region_label)
            .ok_or_else(|| MeshError::InvalidLabel(region_label.to_string()))?;
        let vertices = self.resolve_vertices(vertex_labels)?;
        let id = BoundaryId(self.boundaries.len());
        self.boundaries.push(Boundary {
            face: FaceLocalId::SENTINEL,
            vertices,
            vertex_count: vertex_labels.len(),
            region,
            distance: 0.0,
            yplus: 0.0,
            uplus: 0.0,
            shear: crate::geometry::Vector3::zero(),
            q: 0.0,
            h: 0.0,
            t: 0.0,
        });
        self.boundary_label_to_id.insert(label, id);
        Ok(())
    }

    fn normalized_edge(a: &str, b: &str) -> (Label, Label) {
        if a <= b { (a.to_string(), b.to_string()) } else { (b.to_string(), a.to_string()) }
    }

    /// Register a face. `cell1_label` always names the cell whose outward
    /// normal the face's `normal` field follows. `far_side` names the
    /// neighbouring cell for an interior face, or the boundary for a
    /// boundary face.
    #[allow(clippy::too_many_arguments)]
    pub fn add_face(
        &mut self,
        label: impl Into<Label>,
        cell1_label: &str,
        far_side: FarSide<'_>,
        vertex_labels: &[Label],
        geometry: FaceGeometry,
    ) -> Result<()> {
        self.check_not_finalized()?;
        let label = label.into();
        if self.face_label_to_id.contains_key(&label) {
            return Err(MeshError::DuplicateNode(label));
        }
        let vertices = self.resolve_vertices(vertex_labels)?;
        let &cell1_id = self
            .cell_label_to_id
            .get(cell1_label)
            .ok_or_else(|| MeshError::InvalidLabel(cell1_label.to_string()))?;

        let (cell2, boundary) = match far_side {
            FarSide::Cell(cell2_label) => {
                if self.graph.exists_ghost(cell1_label) && self.graph.exists_ghost(cell2_label) {
                    return Err(MeshError::InvalidEdge(format!(
                        "both endpoints of face {label} are ghosts"
                    )));
                }
                let &cell2_id = self
                    .cell_label_to_id
                    .get(cell2_label)
                    .ok_or_else(|| MeshError::InvalidLabel(cell2_label.to_string()))?;
                let key = Self::normalized_edge(cell1_label, cell2_label);
                if !self.declared_edges.insert(key) {
                    return Err(MeshError::DuplicateFaceEdge(LocalId(cell1_id), LocalId(cell2_id)));
                }
                self.graph.add_undirected_edge(cell1_label, cell2_label)?;
                (LocalId(cell2_id), BoundaryId::SENTINEL)
            }
            FarSide::Boundary(boundary_label) => {
                let &boundary_id = self
                    .boundary_label_to_id
                    .get(boundary_label)
                    .ok_or_else(|| MeshError::InvalidLabel(boundary_label.to_string()))?;
                (LocalId::SENTINEL, boundary_id)
            }
        };

        let face_id = FaceLocalId(self.faces.len());
        if !boundary.is_sentinel() {
            self.boundaries[boundary.0].face = face_id;
        }
        self.faces.push(Face {
            vertices,
            vertex_count: vertex_labels.len(),
            cell1: LocalId(cell1_id),
            cell2,
            boundary,
            lambda: geometry.lambda,
            normal: geometry.normal,
            centroid: geometry.centroid,
            rlencos: geometry.rlencos,
            area: geometry.area,
            xpac: geometry.xpac,
            xnac: geometry.xnac,
        });
        self.face_label_to_id.insert(label, face_id);
        Ok(())
    }

    // --- finalisation --------------------------------------------------

    /// Collective finalisation: finalize the
    /// embedded graph, validate every boundary mapped to a face, permute
    /// cell records into the graph's final local order, build the
    /// cell→face table, and derive ghost cells' global face/vertex counts
    /// by exchange.
    pub fn finalize(&mut self) -> Result<()> {
        self.check_not_finalized()?;

        self.graph.finalize()?;

        for (i, boundary) in self.boundaries.iter().enumerate() {
            if boundary.face.is_sentinel() {
                return Err(MeshError::UnmappedBoundaryFace(BoundaryId(i)));
            }
        }

        let num_cells = self.cells.len();
        let mut perm = vec![LocalId::SENTINEL; num_cells];
        for (construction_id, label) in self.cell_labels.iter().enumerate() {
            perm[construction_id] = self.graph.label_to_local(label)?;
        }

        let mut reordered = vec![Cell::default(); num_cells];
        for (construction_id, cell) in self.cells.drain(..).enumerate() {
            reordered[perm[construction_id].0] = cell;
        }
        self.cells = reordered;

        for face in &mut self.faces {
            face.cell1 = perm[face.cell1.0];
            if !face.cell2.is_sentinel() {
                face.cell2 = perm[face.cell2.0];
            }
        }

        let mut entries: Vec<(usize, FaceLocalId)> = Vec::with_capacity(self.faces.len() * 2);
        for (i, face) in self.faces.iter().enumerate() {
            let fid = FaceLocalId(i);
            entries.push((face.cell1.0, fid));
            if !face.cell2.is_sentinel() {
                entries.push((face.cell2.0, fid));
            }
        }
        let mut cell_face_csr = Csr::from_rows(num_cells, entries);
        cell_face_csr.sort_rows_by_key(|f| f.0);

        for cell_id in 0..num_cells {
            let row = cell_face_csr.row(cell_id);
            let mut seen_vertices: HashSet<VertexId> = HashSet::new();
            for &fid in row {
                for &v in self.faces[fid.0].vertex_ids() {
                    seen_vertices.insert(v);
                }
            }
            let cell = &mut self.cells[cell_id];
            cell.stored_face_count = row.len();
            cell.stored_vertex_count = seen_vertices.len();
        }

        let mut face_counts: Vec<usize> = self.cells.iter().map(|c| c.stored_face_count).collect();
        let mut vertex_counts: Vec<usize> =
            self.cells.iter().map(|c| c.stored_vertex_count).collect();
        let mut pattern: ExchangePattern<C, usize> = ExchangePattern::build(&self.graph)?;
        pattern.exchange(&mut face_counts)?;
        pattern.exchange(&mut vertex_counts)?;
        for (cell, (fc, vc)) in self.cells.iter_mut().zip(face_counts.into_iter().zip(vertex_counts))
        {
            cell.global_face_count = fc;
            cell.global_vertex_count = vc;
        }

        self.cell_face_csr = Some(cell_face_csr);
        self.finalized = true;
        Ok(())
    }

    // --- queries ---------------------------------------------------------

    #[must_use]
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn num_boundaries(&self) -> usize {
        self.boundaries.len()
    }

    #[must_use]
    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    pub fn cell(&self, id: LocalId) -> Result<&Cell> {
        self.cells.get(id.0).ok_or(MeshError::InvalidIndex(id.0))
    }

    /// The faces touching cell `id`, sorted ascending by face id.
    pub fn cell_faces(&self, id: LocalId) -> Result<&[FaceLocalId]> {
        self.check_finalized()?;
        let csr = self.cell_face_csr.as_ref().expect("finalized implies csr built");
        csr.check_row(id.0)?;
        Ok(csr.row(id.0))
    }

    pub fn face(&self, id: FaceLocalId) -> Result<&Face> {
        self.faces.get(id.0).ok_or(MeshError::InvalidIndex(id.0))
    }

    /// The world-space positions of a face's vertices, in winding order.
    pub fn face_vertex_positions(&self, id: FaceLocalId) -> Result<Vec<Point3>> {
        let face = self.face(id)?;
        face.vertex_ids()
            .iter()
            .map(|&v| self.vertex(v).map(|vx| vx.position))
            .collect()
    }

    pub fn vertex(&self, id: VertexId) -> Result<&Vertex> {
        self.vertices.get(id.0).ok_or(MeshError::InvalidIndex(id.0))
    }

    pub fn boundary(&self, id: BoundaryId) -> Result<&Boundary> {
        self.boundaries.get(id.0).ok_or(MeshError::InvalidIndex(id.0))
    }

    pub fn region(&self, id: RegionId) -> Result<&Region> {
        self.regions.get(id.0).ok_or(MeshError::InvalidIndex(id.0))
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

/// The far side of a face: another cell (interior) or a boundary patch.
pub enum FarSide<'a> {
    Cell(&'a str),
    Boundary(&'a str),
}

/// The geometric quantities a face is constructed with, grouped to keep
/// [`UnstructuredMesh::add_face`]'s signature manageable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaceGeometry {
    pub lambda: f64,
    pub normal: crate::geometry::Vector3,
    pub centroid: Point3,
    pub rlencos: f64,
    pub area: f64,
    pub xpac: Point3,
    pub xnac: Point3,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::LocalCommunicator;
    use crate::geometry::Vector3;

    fn square_vertices<C: Communicator>(mesh: &mut UnstructuredMesh<C>, prefix: &str) -> Vec<Label> {
        let coords = [(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (1.0, 1.0, 0.0), (0.0, 1.0, 0.0)];
        coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y, z))| {
                let label = format!("{prefix}v{i}");
                mesh.add_vertex(label.clone(), Point3::new(x, y, z)).unwrap();
                label
            })
            .collect()
    }

    #[test]
    fn single_rank_two_cell_mesh_links_boundaries_and_builds_cell_face_table() {
        let mut comms = LocalCommunicator::cluster(1);
        let mut mesh = UnstructuredMesh::new(comms.remove(0));

        mesh.add_cell("c0", true, Point3::new(0.5, 0.5, 0.0), 1.0).unwrap();
        mesh.add_cell("c1", true, Point3::new(1.5, 0.5, 0.0), 1.0).unwrap();

        mesh.add_region(
            "wall",
            Region { name: "wall".into(), kind: RegionKind::Wall, ..Region::default() },
        )
        .unwrap();

        let shared = square_vertices(&mut mesh, "shared_");
        let outer0 = square_vertices(&mut mesh, "outer0_");
        let outer1 = square_vertices(&mut mesh, "outer1_");

        mesh.add_boundary("b0", "wall", &outer0).unwrap();
        mesh.add_boundary("b1", "wall", &outer1).unwrap();

        mesh.add_face(
            "f_interior",
            "c0",
            FarSide::Cell("c1"),
            &shared,
            FaceGeometry { normal: Vector3::new(1.0, 0.0, 0.0), area: 1.0, ..Default::default() },
        )
        .unwrap();
        mesh.add_face(
            "f_b0",
            "c0",
            FarSide::Boundary("b0"),
            &outer0,
            FaceGeometry::default(),
        )
        .unwrap();
        mesh.add_face(
            "f_b1",
            "c1",
            FarSide::Boundary("b1"),
            &outer1,
            FaceGeometry::default(),
        )
        .unwrap();

        mesh.finalize().unwrap();

        assert_eq!(mesh.num_cells(), 2);
        assert_eq!(mesh.num_faces(), 3);
        for id in 0..mesh.num_cells() {
            let faces = mesh.cell_faces(LocalId(id)).unwrap();
            assert_eq!(faces.len(), 2);
            assert_eq!(mesh.cell(LocalId(id)).unwrap().global_face_count, 2);
        }
    }

    #[test]
    fn unmapped_boundary_fails_finalize() {
        let mut comms = LocalCommunicator::cluster(1);
        let mut mesh = UnstructuredMesh::new(comms.remove(0));
        mesh.add_cell("c0", true, Point3::default(), 1.0).unwrap();
        mesh.add_region("wall", Region::default()).unwrap();
        let verts = square_vertices(&mut mesh, "v_");
        mesh.add_boundary("b0", "wall", &verts).unwrap();
        assert!(matches!(mesh.finalize(), Err(MeshError::UnmappedBoundaryFace(_))));
    }

    #[test]
    fn duplicate_face_between_same_cells_is_rejected() {
        let mut comms = LocalCommunicator::cluster(1);
        let mut mesh = UnstructuredMesh::new(comms.remove(0));
        mesh.add_cell("c0", true, Point3::default(), 1.0).unwrap();
        mesh.add_cell("c1", true, Point3::default(), 1.0).unwrap();
        let v1 = square_vertices(&mut mesh, "a_");
        let v2 = square_vertices(&mut mesh, "b_");
        mesh.add_face("f0", "c0", FarSide::Cell("c1"), &v1, FaceGeometry::default()).unwrap();
        assert!(matches!(
            mesh.add_face("f1", "c0", FarSide::Cell("c1"), &v2, FaceGeometry::default()),
            Err(MeshError::DuplicateFaceEdge(_, _))
        ));
    }
}
