//! Plain-data records stored by [`super::UnstructuredMesh`].
//!
//! Kept separate from the construction/finalisation logic in `mod.rs` so the
//! record shapes can be read on their own.

use crate::geometry::{Point3, Vector3};
use crate::ids::{BoundaryId, FaceLocalId, RegionId, VertexId};

/// Up to four vertex ids for a triangular or quadrilateral face/boundary.
/// The fourth slot is [`VertexId::SENTINEL`] for a triangle.
pub type FaceVertices = [VertexId; 4];

/// A mesh cell: the Lagrangian control volume particles travel through.
#[derive(Debug, Clone)]
pub struct Cell {
    pub centroid: Point3,
    pub volume: f64,
    /// Faces touching this cell that are stored on this rank (a ghost cell
    /// typically sees fewer than its true total).
    pub stored_face_count: usize,
    /// True total face count across all ranks, derived by ghost exchange.
    pub global_face_count: usize,
    pub stored_vertex_count: usize,
    pub global_vertex_count: usize,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            centroid: Point3::default(),
            volume: 0.0,
            stored_face_count: 0,
            global_face_count: 0,
            stored_vertex_count: 0,
            global_vertex_count: 0,
        }
    }
}

/// A mesh vertex.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vertex {
    pub position: Point3,
}

/// A face shared by one or two cells, or one cell and a boundary.
#[derive(Debug, Clone)]
pub struct Face {
    pub vertices: FaceVertices,
    pub vertex_count: usize,
    /// The cell that owns this face's outward normal.
    pub cell1: crate::ids::LocalId,
    /// The neighbouring cell, or [`crate::ids::LocalId::SENTINEL`] at a boundary.
    pub cell2: crate::ids::LocalId,
    /// The boundary this face belongs to, or [`BoundaryId::SENTINEL`] if interior.
    pub boundary: BoundaryId,
    /// Interpolation weight toward `cell1` (1.0 = value entirely from cell1).
    pub lambda: f64,
    pub normal: Vector3,
    pub centroid: Point3,
    /// Reciprocal length over cosine of the cell-line/normal angle, used by
    /// the (excluded) flux solver; carried through unmodified.
    pub rlencos: f64,
    pub area: f64,
    /// Auxiliary point projections used by the (excluded) flux solver.
    pub xpac: Point3,
    pub xnac: Point3,
}

impl Face {
    #[must_use]
    pub fn vertex_ids(&self) -> &[VertexId] {
        &self.vertices[..self.vertex_count]
    }

    #[must_use]
    pub fn is_boundary(&self) -> bool {
        !self.boundary.is_sentinel()
    }
}

/// A boundary patch: one face of the mesh's exterior, linked to a [`Region`].
#[derive(Debug, Clone)]
pub struct Boundary {
    pub face: FaceLocalId,
    pub vertices: FaceVertices,
    pub vertex_count: usize,
    pub region: RegionId,
    pub distance: f64,
    pub yplus: f64,
    pub uplus: f64,
    pub shear: Vector3,
    pub q: f64,
    pub h: f64,
    pub t: f64,
}

/// The physical type governing a boundary's particle-transport behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionKind {
    #[default]
    Wall,
    Inlet,
    Outlet,
    Symmetry,
    Other,
}

/// A named boundary region with the full coefficient set carried over from
/// the excluded flow solver (unused by transport but preserved so a
/// `Region` can be round-tripped through a real mesh file unchanged).
#[derive(Debug, Clone, Default)]
pub struct Region {
    pub name: String,
    pub kind: RegionKind,
    pub ylog: f64,
    pub elog: f64,
    pub density: f64,
    pub turb_ke: f64,
    pub turb_diss: f64,
    pub splvl: f64,
    pub den: f64,
    pub r: f64,
    pub t: f64,
    pub force_tangent: Vector3,
    pub uvw: Vector3,
    pub std: bool,
    pub flux: bool,
    pub adiab: bool,
}
