//! Crate-wide error taxonomy.
//!
//! Every public operation on the cell graph, mesh, exchange pattern, and
//! particle transport engine returns [`Result<T>`] rather than panicking.
//! Variants are grouped by comments below (contract-violation, topology,
//! geometry, particle, transport-mechanism) purely for documentation; the
//! enum itself is flat so callers can match any variant without caring which
//! group it came from.

use crate::ids::{BoundaryId, FaceLocalId, GlobalId, LocalId, Rank};
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, MeshError>;

/// The full error taxonomy returned by `meshtrace`'s public operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshError {
    // --- contract violations ---------------------------------------------
    #[error("operation invalid after finalize()")]
    AlreadyFinalised,

    #[error("operation invalid before finalize()")]
    NotFinalised,

    #[error("index {0} out of range")]
    InvalidIndex(usize),

    #[error("size mismatch: expected {expected}, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    #[error("no data available for this request")]
    NoData,

    // --- topology -----------------------------------------------------
    #[error("duplicate node label {0}")]
    DuplicateNode(String),

    #[error("invalid edge: {0}")]
    InvalidEdge(String),

    #[error("boundary {0:?} has no mapped face after finalize")]
    UnmappedBoundaryFace(BoundaryId),

    #[error("face already exists between cells {0:?} and {1:?}")]
    DuplicateFaceEdge(LocalId, LocalId),

    #[error("face vertex count {0} is not 3 or 4")]
    InvalidVertexCount(usize),

    #[error("unknown label {0}")]
    InvalidLabel(String),

    // --- geometry -------------------------------------------------------
    #[error("ray does not intersect any face of the cell")]
    NoIntersection,

    #[error("degenerate triangle with zero area")]
    ZeroArea,

    #[error("internal geometry invariant violated: {0}")]
    LogicError(String),

    #[error("more than one non-edge triangle reported a positive intersection")]
    FaceIntersectionAmbiguity,

    #[error("intersection distance {distance} exceeds cell diameter {diameter}")]
    DistanceExceedsCellDiameter { distance: f64, diameter: f64 },

    // --- particle ---------------------------------------------------------
    #[error("particle revisited cell {global:?} seen in the last two hops")]
    RevisitedRecentCell { global: GlobalId },

    #[error("migrated particle could not find a shared entry face with its predecessor cell")]
    EntryFaceRedetectionFailed,

    #[error("computed negative time-to-intersection {0}")]
    NegativeIntersectionTime(f64),

    #[error("entered cell through face {0:?} but ray-scan found no exit face")]
    NoExitFace(FaceLocalId),

    #[error("truncated distribution did not converge within {attempts} rejection attempts")]
    DistributionUnsatisfiable { attempts: usize },

    // --- transport mechanism ----------------------------------------------
    #[error("messaging failure: {0}")]
    MessagingFailure(String),

    #[error("datatype not registered for transport")]
    DatatypeUnregistered,

    #[error("peer mismatch: expected rank {expected:?}, saw {saw:?}")]
    PeerMismatch { expected: Rank, saw: Rank },
}
