//! Ready-made scenario fixtures reused across the engine's test suites.

use crate::distributions::Distribution;
use crate::geometry::{Point3, Vector3};
use crate::ids::{GlobalId, ParticleId, Rank};
use crate::particle::{EmitterDistributions, Particle, ParticleEmitter};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A particle travelling straight along `+x` from the centre of `home`,
/// with no acceleration or jerk and no decay, carrying `travel_dt` of
/// motion for the step about to run.
#[must_use]
pub fn straight_particle(home: GlobalId, travel_dt: f64) -> Particle {
    Particle::spawn(
        ParticleId(1),
        Point3::new(0.5, 0.5, 0.5),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::zero(),
        Vector3::zero(),
        home,
        Rank(0),
        1.0,
        0.0,
        travel_dt,
    )
}

/// A deterministic emitter (seeded RNG, every property fixed rather than
/// sampled from a spread) that fires straight along `+x` at `rate` particles
/// per unit time from `home`. Useful for exercising the carry-over
/// bookkeeping in [`ParticleEmitter::generate_particles`] without the noise
/// of a real distribution spread.
#[must_use]
pub fn fixed_rate_emitter(rate: f64, home: GlobalId) -> ParticleEmitter<StdRng> {
    ParticleEmitter::new(
        1,
        Point3::new(0.5, 0.5, 0.5),
        home,
        Rank(0),
        Distribution::Fixed(rate),
        EmitterDistributions {
            angle_xy: Distribution::Fixed(0.0),
            angle_rotation: Distribution::Fixed(0.0),
            speed: Distribution::Fixed(1.0),
            acceleration: [Distribution::Fixed(0.0); 3],
            jerk: [Distribution::Fixed(0.0); 3],
            decay_level: Distribution::Fixed(1.0),
            decay_rate: Distribution::Fixed(0.0),
        },
        StdRng::seed_from_u64(0),
    )
}
