//! Particle emission and Lagrangian transport through the mesh.

pub mod emitter;
pub mod state;
pub mod transport;

pub use emitter::{EmitterDistributions, ParticleEmitter};
pub use state::Particle;
pub use transport::ParticleTransport;
