//! Newtype identifiers.
//!
//! The mesh and graph distinguish several index spaces that must never be
//! mixed up: caller-supplied labels, rank-local dense indices, and globally
//! unique indices assigned at finalisation. Each gets its
//! own newtype so the type checker catches the mistake instead of a review.

use std::fmt;

/// A caller-supplied opaque identifier used only during construction.
/// Mapped to a [`LocalId`] at `finalize()`.
pub type Label = String;

/// Sentinel for "no value" in index fields that are otherwise valid indices.
pub const SENTINEL: usize = usize::MAX;

macro_rules! index_newtype {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub usize);

        impl $name {
            /// The sentinel value meaning "not set" / "not applicable".
            pub const SENTINEL: Self = Self(SENTINEL);

            /// True if this is the sentinel value.
            #[must_use]
            pub fn is_sentinel(self) -> bool {
                self.0 == SENTINEL
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_sentinel() {
                    write!(f, "{}(-)", stringify!($name))
                } else {
                    write!(f, "{}({})", stringify!($name), self.0)
                }
            }
        }

        impl From<usize> for $name {
            fn from(v: usize) -> Self {
                Self(v)
            }
        }
    };
}

index_newtype!(LocalId, "A dense, rank-local index for a cell.");
index_newtype!(GlobalId, "A dense index unique across all ranks, derived at finalisation.");
index_newtype!(FaceLocalId, "A rank-local dense index for a face.");
index_newtype!(VertexId, "A rank-local dense index for a vertex.");
index_newtype!(BoundaryId, "A rank-local dense index for a boundary.");
index_newtype!(RegionId, "A rank-local dense index for a region.");
index_newtype!(ParticleId, "A process-unique identifier for a particle.");

/// The rank (process index) within the graph's communicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rank(pub usize);

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rank{}", self.0)
    }
}

impl From<usize> for Rank {
    fn from(v: usize) -> Self {
        Self(v)
    }
}
