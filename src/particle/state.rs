//! Per-particle kinematic state carried by the transport engine.

use crate::error::{MeshError, Result};
use crate::geometry::{Point3, Vector3};
use crate::ids::{FaceLocalId, GlobalId, ParticleId, Rank};

/// A single tracked particle.
///
/// `position` is the last committed location (valid between time steps);
/// `in_flight_position` is updated during a step's cell-to-cell traversal
/// and only copied back into `position` once the whole step's work is done
/// so a particle that migrates mid-step never
/// exposes a half-updated `position` to another rank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub id: ParticleId,
    pub position: Point3,
    pub in_flight_position: Point3,
    pub velocity: Vector3,
    pub acceleration: Vector3,
    pub jerk: Vector3,
    pub current_cell: GlobalId,
    pub last_cell: GlobalId,
    pub last_last_cell: GlobalId,
    /// The face this particle entered `current_cell` through, used to scan
    /// for the exit face on the next cell-to-cell hop; [`FaceLocalId::SENTINEL`]
    /// immediately after emission (no entry face yet).
    pub entry_face: FaceLocalId,
    pub rank: Rank,
    /// Time remaining to travel within the current step, shrinking as the
    /// particle crosses each cell; `0.0` once the step's motion is spent.
    pub travel_dt: f64,
    pub decay_level: f64,
    pub decay_rate: f64,
}

impl Particle {
    /// Build a freshly-emitted particle with `travel_dt` remaining in the
    /// step it was created during.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        id: ParticleId,
        position: Point3,
        velocity: Vector3,
        acceleration: Vector3,
        jerk: Vector3,
        home_cell: GlobalId,
        rank: Rank,
        decay_level: f64,
        decay_rate: f64,
        travel_dt: f64,
    ) -> Self {
        Self {
            id,
            position,
            in_flight_position: position,
            velocity,
            acceleration,
            jerk,
            current_cell: home_cell,
            last_cell: GlobalId::SENTINEL,
            last_last_cell: GlobalId::SENTINEL,
            entry_face: FaceLocalId::SENTINEL,
            rank,
            travel_dt,
            decay_level,
            decay_rate,
        }
    }

    /// True if this particle still exists in the simulation. `travel_dt`
    /// reaching zero only means the *current step* is done for it, not that
    /// it should be dropped — only decay removes a particle permanently.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.decay_level > 0.0
    }

    /// True if this particle still has motion to resolve within the step
    /// currently in flight.
    #[must_use]
    pub fn has_remaining_travel(&self) -> bool {
        self.is_active() && self.travel_dt > 0.0
    }

    /// `velocity += acceleration * dt; acceleration += jerk * dt`. `dt` here
    /// is the elapsed time of the current cell traversal sub-step, not
    /// necessarily the whole step's `dt`.
    pub fn update_velocity(&mut self, dt: f64) {
        self.velocity = self.velocity + self.acceleration * dt;
        self.acceleration = self.acceleration + self.jerk * dt;
    }

    /// `update_velocity` plus decay bookkeeping.
    pub fn update_state(&mut self, dt: f64) {
        self.update_velocity(dt);
        self.decay_level -= self.decay_rate * dt;
    }

    /// Mirror velocity, acceleration, and jerk across a boundary's outward
    /// unit normal.
    pub fn reflect(&mut self, normal: Vector3) {
        self.velocity = self.velocity.reflect(normal);
        self.acceleration = self.acceleration.reflect(normal);
        self.jerk = self.jerk.reflect(normal);
    }

    /// Shift the cell history after hopping into `next_cell`, and fail if
    /// `next_cell` was visited two hops ago — a sign of a degenerate
    /// back-and-forth loop between two thin cells.
    pub fn advance_cell(&mut self, next_cell: GlobalId, entry_face: FaceLocalId) -> Result<()> {
        if next_cell == self.last_last_cell {
            return Err(MeshError::RevisitedRecentCell { global: next_cell });
        }
        self.last_last_cell = self.last_cell;
        self.last_cell = self.current_cell;
        self.current_cell = next_cell;
        self.entry_face = entry_face;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Particle {
        Particle::spawn(
            ParticleId(1),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            GlobalId(0),
            Rank(0),
            1.0,
            0.1,
            2.0,
        )
    }

    #[test]
    fn update_state_integrates_jerk_into_acceleration_into_velocity() {
        let mut p = sample();
        p.update_state(1.0);
        assert_eq!(p.acceleration, Vector3::new(0.0, 1.0, 1.0));
        assert_eq!(p.velocity, Vector3::new(1.0, 1.0, 0.0));
        assert!((p.decay_level - 0.9).abs() < 1e-12);
    }

    #[test]
    fn reflect_flips_component_along_normal() {
        let mut p = sample();
        p.velocity = Vector3::new(1.0, -1.0, 0.0);
        p.reflect(Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(p.velocity, Vector3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn revisiting_the_cell_before_last_is_rejected() {
        let mut p = sample();
        p.advance_cell(GlobalId(1), FaceLocalId(0)).unwrap();
        p.advance_cell(GlobalId(2), FaceLocalId(1)).unwrap();
        assert_eq!(
            p.advance_cell(GlobalId(0), FaceLocalId(2)),
            Err(MeshError::RevisitedRecentCell { global: GlobalId(0) })
        );
    }

    #[test]
    fn is_active_tracks_decay_only_but_remaining_travel_needs_both() {
        let mut p = sample();
        assert!(p.is_active());
        assert!(p.has_remaining_travel());

        p.travel_dt = 0.0;
        assert!(p.is_active(), "spent travel_dt alone must not retire a particle");
        assert!(!p.has_remaining_travel());

        p.travel_dt = 1.0;
        p.decay_level = 0.0;
        assert!(!p.is_active());
        assert!(!p.has_remaining_travel());
    }
}
