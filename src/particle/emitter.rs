//! Generates particles at a fixed spatial position at intervals drawn from a
//! configurable rate distribution.

use super::state::Particle;
use crate::distributions::{Distribution, MAX_REJECTION_ATTEMPTS};
use crate::error::Result;
use crate::geometry::{Point3, Vector3};
use crate::ids::{GlobalId, ParticleId, Rank};
use rand::Rng;

/// Per-particle kinematic properties, each drawn independently from an
/// injected distribution at emission time.
pub struct EmitterDistributions {
    pub angle_xy: Distribution,
    pub angle_rotation: Distribution,
    pub speed: Distribution,
    pub acceleration: [Distribution; 3],
    pub jerk: [Distribution; 3],
    pub decay_level: Distribution,
    pub decay_rate: Distribution,
}

/// Emits particles at a fixed mesh location.
pub struct ParticleEmitter<R: Rng> {
    position: Point3,
    home_cell: GlobalId,
    rank: Rank,
    rate: Distribution,
    properties: EmitterDistributions,
    rng: R,
    /// Carry-over: time until the next scheduled emission, relative to the
    /// start of the *next* call to [`Self::generate_particles`].
    next_particle_time: f64,
    emitter_id: u64,
    particles_emitted: u64,
    max_rejection_attempts: usize,
}

impl<R: Rng> ParticleEmitter<R> {
    /// `home_cell` is the global id of the cell containing `position`; a
    /// full point-location search is out of scope here, so the caller supplies it
    /// directly — typically obtained once at startup from whichever
    /// concrete mesh source placed the emitter.
    pub fn new(
        emitter_id: u64,
        position: Point3,
        home_cell: GlobalId,
        rank: Rank,
        rate: Distribution,
        properties: EmitterDistributions,
        rng: R,
    ) -> Self {
        Self {
            position,
            home_cell,
            rank,
            rate,
            properties,
            rng,
            next_particle_time: 0.0,
            emitter_id,
            particles_emitted: 0,
            max_rejection_attempts: MAX_REJECTION_ATTEMPTS,
        }
    }

    /// Override the rejection-sampling cap used for `TruncatedNormal`
    /// properties, e.g. from [`crate::config::RunConfig::max_rejection_attempts`].
    #[must_use]
    pub fn with_max_rejection_attempts(mut self, max_rejection_attempts: usize) -> Self {
        self.max_rejection_attempts = max_rejection_attempts;
        self
    }

    /// Generate every particle due within a step of length `dt`, preserving
    /// any fractional emission time left over for the next call so no
    /// samples are skipped across calls.
    pub fn generate_particles(&mut self, dt: f64) -> Result<Vec<Particle>> {
        let mut out = Vec::new();
        let mut cursor = self.next_particle_time;
        loop {
            if cursor > dt {
                break;
            }
            let remaining = dt - cursor;
            if remaining > 0.0 {
                out.push(self.build_particle(remaining)?);
            }
            cursor += self.rate.sample(&mut self.rng, self.max_rejection_attempts)?;
        }
        self.next_particle_time = cursor - dt;
        Ok(out)
    }

    fn build_particle(&mut self, remaining: f64) -> Result<Particle> {
        let cap = self.max_rejection_attempts;
        let angle_xy = self.properties.angle_xy.sample(&mut self.rng, cap)?;
        let angle_rotation = self.properties.angle_rotation.sample(&mut self.rng, cap)?;
        let speed = self.properties.speed.sample(&mut self.rng, cap)?;
        let acceleration = Vector3::new(
            self.properties.acceleration[0].sample(&mut self.rng, cap)?,
            self.properties.acceleration[1].sample(&mut self.rng, cap)?,
            self.properties.acceleration[2].sample(&mut self.rng, cap)?,
        );
        let jerk = Vector3::new(
            self.properties.jerk[0].sample(&mut self.rng, cap)?,
            self.properties.jerk[1].sample(&mut self.rng, cap)?,
            self.properties.jerk[2].sample(&mut self.rng, cap)?,
        );
        let decay_level = self.properties.decay_level.sample(&mut self.rng, cap)?;
        let decay_rate = self.properties.decay_rate.sample(&mut self.rng, cap)?;

        let velocity = launch_velocity(angle_xy, angle_rotation, speed);

        self.particles_emitted += 1;
        let id = ParticleId((self.emitter_id as usize) * 1_000_000 + self.particles_emitted as usize);

        Ok(Particle::spawn(
            id,
            self.position,
            velocity,
            acceleration,
            jerk,
            self.home_cell,
            self.rank,
            decay_level,
            decay_rate,
            remaining,
        ))
    }
}

/// Build a launch velocity from a speed and two rotation angles: rotate the
/// unit +X axis about Z by `angle_xy`, then about Y by `angle_rotation`,
/// then scale to `speed`.
fn launch_velocity(angle_xy: f64, angle_rotation: f64, speed: f64) -> Vector3 {
    let v = Vector3::new(1.0, 0.0, 0.0);
    let (sz, cz) = angle_xy.sin_cos();
    let v = Vector3::new(v.x * cz - v.y * sz, v.x * sz + v.y * cz, v.z);
    let (sy, cy) = angle_rotation.sin_cos();
    let v = Vector3::new(v.x * cy + v.z * sy, v.y, -v.x * sy + v.z * cy);
    v.normalized() * speed
}
