//! Fixtures and assertions for testing the engine end to end.
//!
//! This module gives integration tests (and anyone embedding `meshtrace`) a
//! way to build small graphs/meshes and compare floating-point geometry
//! without hand-rolling the same corridor-of-cells or ring-of-ranks setup in
//! every test file.
//!
//! ```
//! use meshtrace::testing::{assert_point_close, builders::brick_corridor};
//! use meshtrace::geometry::Point3;
//! use meshtrace::ids::LocalId;
//!
//! let mesh = brick_corridor(3);
//! let centroid = mesh.cell(LocalId(0)).unwrap().centroid;
//! assert_point_close(centroid, Point3::new(0.5, 0.5, 0.5), 1e-9);
//! ```

pub mod assertions;
pub mod builders;
pub mod fixtures;

pub use assertions::{assert_point_close, assert_vec_close};
pub use builders::{brick_corridor, ring_graph};
pub use fixtures::{fixed_rate_emitter, straight_particle};
