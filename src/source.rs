//! Mesh and particle sources: the pull interfaces a mesh/particle system is
//! built from.
//!
//! Reading an actual file (HDF5, a particle record dump) is an external
//! concern kept out of this crate; what lives here is the contract a reader
//! implements and the one concrete generator ([`StructuredGridSource`]) that
//! needs no file at all.

use crate::comm::Communicator;
use crate::error::Result;
use crate::geometry::{Point3, Vector3};
use crate::ids::Label;
use crate::mesh::{FaceGeometry, FarSide, Region, UnstructuredMesh};

/// Per-cell data a [`MeshSource`] hands to the mesh builder.
#[derive(Debug, Clone)]
pub struct CellRecord {
    pub label: Label,
    pub owned: bool,
    pub centroid: Point3,
    pub volume: f64,
}

/// Per-face data a [`MeshSource`] hands to the mesh builder. `cell2` is
/// `None` for a boundary face, in which case `boundary` names the patch.
#[derive(Debug, Clone)]
pub struct FaceRecord {
    pub label: Label,
    pub cell1: Label,
    pub cell2: Option<Label>,
    pub boundary: Option<Label>,
    pub vertices: Vec<Label>,
    pub geometry: FaceGeometry,
}

/// Per-boundary data: a face, the patch's vertex loop, and the region it
/// belongs to.
#[derive(Debug, Clone)]
pub struct BoundaryRecord {
    pub label: Label,
    pub region: Label,
    pub vertices: Vec<Label>,
}

/// A pull interface the mesh builder calls once, at construction time, to
/// materialise a complete [`UnstructuredMesh`].
///
/// Implementors only need to hand back already-computed records; `meshtrace`
/// does no geometry derivation on a source's behalf (a source that wants
/// face normals/areas/centroids computed for it should do so itself, the
/// way [`StructuredGridSource`] does for a regular brick).
pub trait MeshSource {
    fn vertices(&self) -> Vec<(Label, Point3)>;
    fn cells(&self) -> Vec<CellRecord>;
    fn regions(&self) -> Vec<(Label, Region)>;
    fn boundaries(&self) -> Vec<BoundaryRecord>;
    fn faces(&self) -> Vec<FaceRecord>;
}

/// Drive a [`MeshSource`] into a freshly finalized [`UnstructuredMesh`].
///
/// This is the one-time `Source -> add* -> finalize` sequence every mesh
/// goes through, lifted out of any particular source so HDF5 readers and
/// generators alike reuse the same wiring.
pub fn build_mesh<C: Communicator>(
    source: &impl MeshSource,
    communicator: C,
) -> Result<UnstructuredMesh<C>> {
    let mut mesh = UnstructuredMesh::new(communicator);

    for (label, region) in source.regions() {
        mesh.add_region(label, region)?;
    }
    for (label, position) in source.vertices() {
        mesh.add_vertex(label, position)?;
    }
    for cell in source.cells() {
        mesh.add_cell(cell.label, cell.owned, cell.centroid, cell.volume)?;
    }
    for boundary in source.boundaries() {
        mesh.add_boundary(boundary.label, &boundary.region, &boundary.vertices)?;
    }
    for face in source.faces() {
        let far_side = match (&face.cell2, &face.boundary) {
            (Some(cell2), None) => FarSide::Cell(cell2),
            (None, Some(boundary)) => FarSide::Boundary(boundary),
            _ => {
                return Err(crate::error::MeshError::InvalidEdge(format!(
                    "face {} names neither exactly one neighbour cell nor exactly one boundary",
                    face.label
                )));
            }
        };
        mesh.add_face(face.label, &face.cell1, far_side, &face.vertices, face.geometry)?;
    }

    mesh.finalize()?;
    Ok(mesh)
}

/// A structured-grid generator that materialises a regular `nx * ny * nz`
/// brick of unit-spaced cubic cells on demand, each face between adjacent
/// cells interior and every exterior face a wall boundary. Runs entirely on
/// one rank; partitioning a generated brick across ranks is not implemented
/// here.
pub struct StructuredGridSource {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub cell_size: f64,
}

impl StructuredGridSource {
    #[must_use]
    pub fn new(nx: usize, ny: usize, nz: usize, cell_size: f64) -> Self {
        Self { nx, ny, nz, cell_size }
    }

    fn cell_label(&self, i: usize, j: usize, k: usize) -> Label {
        format!("c{i}_{j}_{k}")
    }

    fn vertex_label(&self, i: usize, j: usize, k: usize) -> Label {
        format!("v{i}_{j}_{k}")
    }

    fn in_bounds(&self, i: isize, j: isize, k: isize) -> bool {
        i >= 0
            && j >= 0
            && k >= 0
            && (i as usize) < self.nx
            && (j as usize) < self.ny
            && (k as usize) < self.nz
    }

    /// The four vertex labels of the face at cell `(i,j,k)` on `axis` (0=x,
    /// 1=y, 2=z) at the `+` side (the `-` side of a cell is shared with its
    /// neighbour's `+` side, so only the three `+` faces per cell plus the
    /// three global boundary planes at index 0 need generating).
    fn face_vertices(&self, i: usize, j: usize, k: usize, axis: usize) -> Vec<Label> {
        let s = self.cell_size;
        let corners: [(f64, f64, f64); 4] = match axis {
            0 => [(1.0, 0.0, 0.0), (1.0, 1.0, 0.0), (1.0, 1.0, 1.0), (1.0, 0.0, 1.0)],
            1 => [(0.0, 1.0, 0.0), (1.0, 1.0, 0.0), (1.0, 1.0, 1.0), (0.0, 1.0, 1.0)],
            _ => [(0.0, 0.0, 1.0), (1.0, 0.0, 1.0), (1.0, 1.0, 1.0), (0.0, 1.0, 1.0)],
        };
        corners
            .iter()
            .map(|&(dx, dy, dz)| {
                let vx = (i as f64 + dx) * s;
                let vy = (j as f64 + dy) * s;
                let vz = (k as f64 + dz) * s;
                format!("v{:.6}_{:.6}_{:.6}", vx, vy, vz)
            })
            .collect()
    }
}

impl MeshSource for StructuredGridSource {
    fn vertices(&self) -> Vec<(Label, Point3)> {
        let s = self.cell_size;
        let mut out = Vec::new();
        for i in 0..=self.nx {
            for j in 0..=self.ny {
                for k in 0..=self.nz {
                    let label = format!("v{:.6}_{:.6}_{:.6}", i as f64 * s, j as f64 * s, k as f64 * s);
                    out.push((label, Point3::new(i as f64 * s, j as f64 * s, k as f64 * s)));
                }
            }
        }
        out
    }

    fn cells(&self) -> Vec<CellRecord> {
        let s = self.cell_size;
        let mut out = Vec::with_capacity(self.nx * self.ny * self.nz);
        for i in 0..self.nx {
            for j in 0..self.ny {
                for k in 0..self.nz {
                    out.push(CellRecord {
                        label: self.cell_label(i, j, k),
                        owned: true,
                        centroid: Point3::new(
                            (i as f64 + 0.5) * s,
                            (j as f64 + 0.5) * s,
                            (k as f64 + 0.5) * s,
                        ),
                        volume: s * s * s,
                    });
                }
            }
        }
        out
    }

    fn regions(&self) -> Vec<(Label, Region)> {
        vec![("wall".to_string(), Region { kind: crate::mesh::RegionKind::Wall, ..Region::default() })]
    }

    fn boundaries(&self) -> Vec<BoundaryRecord> {
        let mut out = Vec::new();
        for i in 0..self.nx {
            for j in 0..self.ny {
                for k in 0..self.nz {
                    let neighbours: [(usize, [isize; 3]); 3] =
                        [(0, [i as isize + 1, j as isize, k as isize]),
                         (1, [i as isize, j as isize + 1, k as isize]),
                         (2, [i as isize, j as isize, k as isize + 1])];
                    for (axis, [ni, nj, nk]) in neighbours {
                        if !self.in_bounds(ni, nj, nk) {
                            out.push(BoundaryRecord {
                                label: format!("b{axis}_{i}_{j}_{k}"),
                                region: "wall".to_string(),
                                vertices: self.face_vertices(i, j, k, axis),
                            });
                        }
                    }
                    // The three "-" boundary planes at the grid's own origin
                    // faces (axis 0 at i==0, etc.) are only emitted once, as
                    // boundaries of the first cell along that axis.
                    if i == 0 {
                        out.push(BoundaryRecord {
                            label: format!("bneg0_{j}_{k}"),
                            region: "wall".to_string(),
                            vertices: self.face_vertices(0, j, k, 0).into_iter().rev().collect(),
                        });
                    }
                    if j == 0 {
                        out.push(BoundaryRecord {
                            label: format!("bneg1_{i}_{k}"),
                            region: "wall".to_string(),
                            vertices: self.face_vertices(i, 0, k, 1).into_iter().rev().collect(),
                        });
                    }
                    if k == 0 {
                        out.push(BoundaryRecord {
                            label: format!("bneg2_{i}_{j}"),
                            region: "wall".to_string(),
                            vertices: self.face_vertices(i, j, 0, 2).into_iter().rev().collect(),
                        });
                    }
                }
            }
        }
        out
    }

    fn faces(&self) -> Vec<FaceRecord> {
        let mut out = Vec::new();
        let axis_normal = |axis: usize, sign: f64| match axis {
            0 => Vector3::new(sign, 0.0, 0.0),
            1 => Vector3::new(0.0, sign, 0.0),
            _ => Vector3::new(0.0, 0.0, sign),
        };
        let area = self.cell_size * self.cell_size;

        for i in 0..self.nx {
            for j in 0..self.ny {
                for k in 0..self.nz {
                    let label = self.cell_label(i, j, k);

                    let plus: [(usize, [isize; 3]); 3] = [
                        (0, [i as isize + 1, j as isize, k as isize]),
                        (1, [i as isize, j as isize + 1, k as isize]),
                        (2, [i as isize, j as isize, k as isize + 1]),
                    ];
                    for (axis, [ni, nj, nk]) in plus {
                        let geometry = FaceGeometry {
                            normal: axis_normal(axis, 1.0),
                            area,
                            ..Default::default()
                        };
                        if self.in_bounds(ni, nj, nk) {
                            let cell2 = self.cell_label(ni as usize, nj as usize, nk as usize);
                            out.push(FaceRecord {
                                label: format!("f{axis}_{i}_{j}_{k}"),
                                cell1: label.clone(),
                                cell2: Some(cell2),
                                boundary: None,
                                vertices: self.face_vertices(i, j, k, axis),
                                geometry,
                            });
                        } else {
                            out.push(FaceRecord {
                                label: format!("f{axis}_{i}_{j}_{k}"),
                                cell1: label.clone(),
                                cell2: None,
                                boundary: Some(format!("b{axis}_{i}_{j}_{k}")),
                                vertices: self.face_vertices(i, j, k, axis),
                                geometry,
                            });
                        }
                    }

                    if i == 0 {
                        out.push(FaceRecord {
                            label: format!("fneg0_{j}_{k}"),
                            cell1: label.clone(),
                            cell2: None,
                            boundary: Some(format!("bneg0_{j}_{k}")),
                            vertices: self.face_vertices(0, j, k, 0).into_iter().rev().collect(),
                            geometry: FaceGeometry { normal: axis_normal(0, -1.0), area, ..Default::default() },
                        });
                    }
                    if j == 0 {
                        out.push(FaceRecord {
                            label: format!("fneg1_{i}_{k}"),
                            cell1: label.clone(),
                            cell2: None,
                            boundary: Some(format!("bneg1_{i}_{k}")),
                            vertices: self.face_vertices(i, 0, k, 1).into_iter().rev().collect(),
                            geometry: FaceGeometry { normal: axis_normal(1, -1.0), area, ..Default::default() },
                        });
                    }
                    if k == 0 {
                        out.push(FaceRecord {
                            label: format!("fneg2_{i}_{j}"),
                            cell1: label.clone(),
                            cell2: None,
                            boundary: Some(format!("bneg2_{i}_{j}")),
                            vertices: self.face_vertices(i, j, 0, 2).into_iter().rev().collect(),
                            geometry: FaceGeometry { normal: axis_normal(2, -1.0), area, ..Default::default() },
                        });
                    }
                }
            }
        }
        out
    }
}

/// A single stored particle, as read from a particle record file. Entry
/// face and owning rank aren't part of the record; they're recovered by a
/// point-location step the embedding binary performs after loading (out of
/// scope here, same as mesh point-location).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleRecord {
    pub position: Point3,
    pub velocity: Vector3,
    pub acceleration: Vector3,
    pub jerk: Vector3,
    pub decay_level: f64,
    pub decay_rate: f64,
}

/// A source of pre-existing particle records, as opposed to particles
/// generated at run time by a [`crate::particle::ParticleEmitter`].
pub trait ParticleSource {
    type Error;

    fn records(&self) -> std::result::Result<Vec<ParticleRecord>, Self::Error>;
}

/// A [`ParticleSource`] backed by an in-memory `Vec`, for tests and for
/// embedders that already parsed the records themselves.
pub struct InMemoryParticleSource {
    pub records: Vec<ParticleRecord>,
}

impl ParticleSource for InMemoryParticleSource {
    type Error = std::convert::Infallible;

    fn records(&self) -> std::result::Result<Vec<ParticleRecord>, Self::Error> {
        Ok(self.records.clone())
    }
}
