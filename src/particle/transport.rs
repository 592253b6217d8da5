//! Drives particles through the mesh cell by cell, one global time step at a
//! time.
//!
//! A step alternates purely-local work (each particle rayscans its current
//! cell, hops to a neighbour, or reflects off a wall) with one collective
//! round: particles that stepped onto a ghost cell are migrated to that
//! cell's owning rank, then every rank checks, via
//! [`Communicator::all_reduce_or`], whether anyone still has travel left
//! before looping again.

use super::state::Particle;
use crate::comm::{Communicator, Tag};
use crate::error::{MeshError, Result};
use crate::geometry::{fan_triangulate, ray_triangle_intersect, RayHit, EDGE_EPSILON};
use crate::ids::{FaceLocalId, GlobalId, LocalId, Rank};
use crate::mesh::{RegionKind, UnstructuredMesh};
use std::collections::HashMap;

/// Reserved tag for particle migration traffic, disjoint from
/// [`crate::exchange::EXCHANGE_TAG`] so the two never race on the same
/// communicator.
pub const MIGRATION_TAG: Tag = Tag(2);

/// What a single ray-cast against the current cell's faces found.
enum ExitKind {
    /// The particle's remaining travel is spent before reaching any face.
    None,
    /// The particle reached a boundary face.
    Boundary(FaceLocalId),
    /// The particle reached an interior face shared with another cell.
    Interior(FaceLocalId),
}

/// Outcome of driving one particle as far as purely-local work allows.
enum Hop {
    /// The particle stopped locally (travel spent, or it left the domain).
    Done,
    /// The particle crossed onto a ghost cell and must migrate to `Rank`.
    Migrate(Rank),
}

/// Owns the particles in flight on this rank and steps them forward in time.
pub struct ParticleTransport<'a, C: Communicator> {
    mesh: &'a UnstructuredMesh<C>,
    active: Vec<Particle>,
    outbound: HashMap<Rank, Vec<Particle>>,
    #[cfg(feature = "metrics")]
    metrics: Option<std::sync::Arc<crate::metrics::MetricsCollector>>,
}

impl<'a, C: Communicator> ParticleTransport<'a, C> {
    #[must_use]
    pub fn new(mesh: &'a UnstructuredMesh<C>) -> Self {
        Self {
            mesh,
            active: Vec::new(),
            outbound: HashMap::new(),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn with_metrics(mut self, metrics: std::sync::Arc<crate::metrics::MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[cfg(feature = "metrics")]
    fn record(&self, name: &str, delta: u64) {
        if let Some(metrics) = &self.metrics {
            metrics.increment(name, delta);
        }
    }

    #[cfg(not(feature = "metrics"))]
    fn record(&self, _name: &str, _delta: u64) {}

    /// Particles currently tracked on this rank (between steps).
    #[must_use]
    pub fn active(&self) -> &[Particle] {
        &self.active
    }

    /// Add particles emitted this step (their `travel_dt` is already the
    /// remaining time within the step, per [`super::emitter::ParticleEmitter`]).
    pub fn inject(&mut self, particles: Vec<Particle>) {
        self.record(crate::metrics::counters::PARTICLES_EMITTED, particles.len() as u64);
        self.active.extend(particles);
    }

    /// Advance every tracked particle through one global step of length
    /// `dt`, including any number of migration rounds, then commit
    /// positions and drop particles that decayed away.
    pub fn run_step(&mut self, dt: f64) -> Result<()> {
        for p in &mut self.active {
            p.travel_dt = dt;
        }

        loop {
            self.advance_local()?;
            self.exchange_particles()?;

            let local_work = self.active.iter().any(Particle::has_remaining_travel);
            let comm = self.mesh.graph().communicator();
            if !comm.all_reduce_or(local_work) {
                break;
            }
        }

        for p in &mut self.active {
            p.position = p.in_flight_position;
        }
        let before = self.active.len();
        self.active.retain(Particle::is_active);
        let decayed = before - self.active.len();
        if decayed > 0 {
            self.record(crate::metrics::counters::PARTICLES_DECAYED, decayed as u64);
        }
        self.record(crate::metrics::counters::TRANSPORT_ITERATIONS, 1);
        Ok(())
    }

    /// Drive every particle with remaining travel as far as purely-local
    /// work allows, queuing any that cross onto a ghost cell.
    fn advance_local(&mut self) -> Result<()> {
        let mut i = 0;
        while i < self.active.len() {
            if !self.active[i].has_remaining_travel() {
                i += 1;
                continue;
            }
            match Self::drive_one(self.mesh, &mut self.active[i])? {
                Hop::Done => i += 1,
                Hop::Migrate(owner) => {
                    let particle = self.active.swap_remove(i);
                    self.outbound.entry(owner).or_default().push(particle);
                    // swap_remove pulls the last element into `i`; don't advance.
                }
            }
        }
        Ok(())
    }

    /// Repeatedly ray-cast `p`'s current cell until its travel for this
    /// round is exhausted, it leaves the domain, or it reaches a ghost cell.
    fn drive_one(mesh: &UnstructuredMesh<C>, p: &mut Particle) -> Result<Hop> {
        loop {
            if !p.has_remaining_travel() {
                return Ok(Hop::Done);
            }
            let local = mesh.graph().global_to_local(p.current_cell)?;
            match Self::update_position_atomic(mesh, local, p)? {
                ExitKind::None => return Ok(Hop::Done),
                ExitKind::Boundary(face_id) => {
                    let face = mesh.face(face_id)?;
                    // Every region kind reflects like a wall: inlet, outlet,
                    // and symmetry boundaries don't yet have distinct particle
                    // physics, so a hit against any of them bounces the
                    // particle back in rather than dropping it.
                    p.reflect(face.normal);
                    p.entry_face = face_id;
                }
                ExitKind::Interior(face_id) => {
                    let face = mesh.face(face_id)?;
                    let neighbor_local = if face.cell1 == local { face.cell2 } else { face.cell1 };
                    let neighbor_global = mesh.graph().local_to_global(neighbor_local)?;
                    if mesh.graph().is_ghost(neighbor_local) {
                        let owner = mesh.graph().owner_of(neighbor_local)?;
                        p.advance_cell(neighbor_global, face_id)?;
                        return Ok(Hop::Migrate(owner));
                    }
                    p.advance_cell(neighbor_global, face_id)?;
                }
            }
        }
    }

    /// Ray-cast `p`'s remaining motion against `local`'s faces, update its
    /// kinematics over the elapsed sub-step, and report what it hit.
    ///
    /// Candidate faces are grouped by face rather than by triangle (a
    /// quadrilateral face fan-triangulates into two triangles): more than
    /// one distinct non-edge-hit face reporting an intersection is a fatal
    /// [`MeshError::FaceIntersectionAmbiguity`], while any number of
    /// edge-only hits are tolerated and broken by nearest distance.
    fn update_position_atomic(mesh: &UnstructuredMesh<C>, local: LocalId, p: &mut Particle) -> Result<ExitKind> {
        let faces = mesh.cell_faces(local)?;
        let origin = p.in_flight_position;
        let dir = p.velocity * p.travel_dt;

        let mut non_edge_hits: Vec<(FaceLocalId, RayHit)> = Vec::new();
        let mut edge_hits: Vec<(FaceLocalId, RayHit)> = Vec::new();

        for &face_id in faces {
            if face_id == p.entry_face {
                continue;
            }
            let verts = mesh.face_vertex_positions(face_id)?;
            let mut face_best: Option<RayHit> = None;
            for (v0, v1, v2) in fan_triangulate(&verts) {
                if let Some(hit) = ray_triangle_intersect(origin, dir, v0, v1, v2) {
                    if face_best.is_none_or(|best| hit.t < best.t) {
                        face_best = Some(hit);
                    }
                }
            }
            let Some(hit) = face_best else { continue };
            if hit.on_edge {
                edge_hits.push((face_id, hit));
            } else {
                non_edge_hits.push((face_id, hit));
            }
        }

        if non_edge_hits.len() > 1 {
            return Err(MeshError::FaceIntersectionAmbiguity);
        }

        let chosen = if let Some(hit) = non_edge_hits.into_iter().next() {
            Some(hit)
        } else {
            edge_hits
                .into_iter()
                .min_by(|a, b| a.1.t.partial_cmp(&b.1.t).unwrap_or(std::cmp::Ordering::Equal))
        };

        let Some((face_id, hit)) = chosen else {
            return Err(MeshError::NoIntersection);
        };

        if hit.t < 0.0 {
            return Err(MeshError::NegativeIntersectionTime(hit.t));
        }

        if hit.t > 1.0 + EDGE_EPSILON {
            let elapsed = p.travel_dt;
            p.in_flight_position = origin + dir;
            p.update_state(elapsed);
            p.travel_dt = 0.0;
            return Ok(ExitKind::None);
        }

        let t = hit.t.min(1.0);
        let distance = dir.magnitude() * t;
        let diameter = Self::cell_diameter(mesh, local)?;
        if distance > diameter {
            return Err(MeshError::DistanceExceedsCellDiameter { distance, diameter });
        }

        let elapsed = t * p.travel_dt;
        p.in_flight_position = origin + dir * t;
        p.travel_dt -= elapsed;
        p.update_state(elapsed);

        let face = mesh.face(face_id)?;
        if face.is_boundary() {
            Ok(ExitKind::Boundary(face_id))
        } else {
            Ok(ExitKind::Interior(face_id))
        }
    }

    /// Largest pairwise distance between any two vertices on `local`'s
    /// faces, used to catch a ray-cast solution numerically far outside the
    /// cell it was asked about.
    fn cell_diameter(mesh: &UnstructuredMesh<C>, local: LocalId) -> Result<f64> {
        let mut points = Vec::new();
        for &face_id in mesh.cell_faces(local)? {
            points.extend(mesh.face_vertex_positions(face_id)?);
        }
        let mut max_d = 0.0f64;
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                max_d = max_d.max(points[i].distance(points[j]));
            }
        }
        Ok(max_d)
    }

    /// Two-step count-then-data all-to-all: every rank first learns how
    /// many particles each peer is sending it, then posts exactly that many
    /// receives.
    fn exchange_particles(&mut self) -> Result<()> {
        let comm = self.mesh.graph().communicator();
        let size = comm.size();
        let my_rank = comm.rank();

        let mut send_counts = vec![0usize; size];
        for (rank, particles) in &self.outbound {
            send_counts[rank.0] = particles.len();
        }
        let all_counts = comm.all_gather(send_counts);
        let recv_counts: Vec<usize> = (0..size).map(|r| all_counts[r][my_rank.0]).collect();

        let mut recv_reqs = Vec::new();
        for r in 0..size {
            if recv_counts[r] > 0 {
                recv_reqs.push(comm.irecv::<Particle>(Rank(r), MIGRATION_TAG));
            }
        }

        let mut send_reqs = Vec::new();
        for r in 0..size {
            if let Some(particles) = self.outbound.remove(&Rank(r)) {
                if !particles.is_empty() {
                    self.record(crate::metrics::counters::PARTICLES_MIGRATED, particles.len() as u64);
                    send_reqs.push(comm.isend(Rank(r), MIGRATION_TAG, particles));
                }
            }
        }

        for req in recv_reqs {
            for mut particle in comm.wait(req)? {
                let local = self.mesh.graph().global_to_local(particle.current_cell)?;
                particle.entry_face = Self::rediscover_entry_face(self.mesh, local, particle.last_cell)?;
                self.active.push(particle);
            }
        }
        comm.wait_all(send_reqs)?;
        self.record(crate::metrics::counters::EXCHANGE_ROUNDS, 1);
        Ok(())
    }

    /// A migrated particle arrives knowing only the *global* id of the cell
    /// it came from; this rank's face ids are local to it, so the shared
    /// face has to be found again by scanning the new cell's faces for the
    /// one whose other side is that predecessor cell.
    fn rediscover_entry_face(
        mesh: &UnstructuredMesh<C>,
        local: LocalId,
        predecessor: GlobalId,
    ) -> Result<FaceLocalId> {
        for &face_id in mesh.cell_faces(local)? {
            let face = mesh.face(face_id)?;
            if face.is_boundary() {
                continue;
            }
            let other = if face.cell1 == local { face.cell2 } else { face.cell1 };
            if mesh.graph().local_to_global(other)? == predecessor {
                return Ok(face_id);
            }
        }
        Err(MeshError::EntryFaceRedetectionFailed)
    }
}
