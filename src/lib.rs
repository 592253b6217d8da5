//! # meshtrace
//!
//! A distributed, unstructured-mesh particle-tracking engine: a partitioned
//! cell adjacency graph, a halo exchange pattern built on top of it, an
//! unstructured mesh of cells/faces/vertices/boundaries/regions, and a
//! Lagrangian particle transport engine that moves particles cell-to-cell
//! within a rank and migrates them across ranks when they cross a
//! partition boundary.
//!
//! ## Key modules
//!
//! - [`ids`] — newtype identifiers (`LocalId`, `GlobalId`, `FaceLocalId`, ...)
//!   that keep rank-local, cross-rank, and caller-supplied index spaces from
//!   being mixed up.
//! - [`graph`] — [`graph::DistributedCellGraph`], the partitioned adjacency
//!   graph each rank builds in label space and then finalizes into dense
//!   local/global indices.
//! - [`mesh`] — [`mesh::UnstructuredMesh`], the cell/face/vertex/boundary/
//!   region data model layered on top of the graph.
//! - [`comm`] — the [`comm::Communicator`] trait the rest of the engine
//!   treats as a black box, plus [`comm::LocalCommunicator`], the in-process
//!   multi-rank emulator used for testing without a real MPI runtime.
//! - [`exchange`] — [`exchange::ExchangePattern`], the halo exchange built
//!   once from a graph and reused across many time steps.
//! - [`particle`] — [`particle::ParticleEmitter`] and
//!   [`particle::ParticleTransport`], the emission and transport engine
//!   proper.
//! - [`distributions`] — scalar distributions used to randomize
//!   per-particle properties at emission.
//! - [`geometry`] — point/vector arithmetic and the ray/triangle
//!   intersection test the transport engine casts against each cell.
//! - [`config`] — the `RunConfig` contract for the handful of knobs the
//!   engine needs at construction time.
//! - [`metrics`] — engine-internal counters (particles emitted/migrated/
//!   decayed, exchange rounds, transport-loop iterations).
//!
//! ## Quick start
//!
//! ```no_run
//! use meshtrace::comm::LocalCommunicator;
//! use meshtrace::mesh::UnstructuredMesh;
//! use meshtrace::particle::ParticleTransport;
//!
//! let comms = LocalCommunicator::cluster(1);
//! let mut mesh = UnstructuredMesh::new(comms.into_iter().next().unwrap());
//! // ... add_cell / add_vertex / add_face / add_boundary / add_region ...
//! mesh.finalize()?;
//!
//! let mut transport = ParticleTransport::new(&mesh);
//! transport.run_step(0.1)?;
//! # Ok::<(), meshtrace::error::MeshError>(())
//! ```

pub mod comm;
pub mod config;
pub mod csr;
pub mod distributions;
pub mod error;
pub mod exchange;
pub mod geometry;
pub mod graph;
pub mod ids;
pub mod mesh;
pub mod particle;
pub mod source;
pub mod testing;

// Unlike the optional io/checkpoint modules this mirrors, `metrics` is
// always compiled: call sites inside `particle::transport` reference
// `metrics::counters::*` unconditionally. The `metrics` feature only gates
// whether `ParticleTransport` wires a live `MetricsCollector` in.
pub mod metrics;

pub use comm::Communicator;
pub use config::{ConfigSource, RunConfig};
pub use error::{MeshError, Result};
pub use exchange::ExchangePattern;
pub use graph::DistributedCellGraph;
pub use mesh::UnstructuredMesh;
pub use particle::{Particle, ParticleEmitter, ParticleTransport};
