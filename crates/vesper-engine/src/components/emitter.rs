//! Particle emitters.
//!
//! [`MeshEmitterComponent`] simulates instanced mesh particles on the CPU
//! with a fixed-size pool and alive/dead index lists.
//! [`ParticleEmitterComponent`] only carries the parameters of a GPU
//! simulation; the CPU side flips its double-buffered alive list each frame.

use glam::{Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use vesper_ecs::component::Component;
use vesper_ecs::entity::Entity;

/// One simulated mesh particle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Particle {
    /// Seconds left; the particle expires at `<= 0`.
    pub lifespan: f32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Vec3,
    pub scale: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshEmitterComponent {
    pub flags: u32,
    pub mesh_id: Entity,
    pub max_mesh_count: u32,
    pub emission_per_frame: u32,
    pub lifetime_range: Vec2,
    pub vx_range: Vec2,
    pub vy_range: Vec2,
    pub vz_range: Vec2,
    pub scale: f32,

    #[serde(skip)]
    pub particles: Vec<Particle>,
    #[serde(skip)]
    pub alive_list: Vec<u32>,
    #[serde(skip)]
    pub dead_list: Vec<u32>,
}

impl Default for MeshEmitterComponent {
    fn default() -> Self {
        Self {
            flags: Self::RUNNING | Self::RECYCLE,
            mesh_id: Entity::INVALID,
            max_mesh_count: 64,
            emission_per_frame: 1,
            lifetime_range: Vec2::new(3.0, 5.0),
            vx_range: Vec2::new(-1.0, 1.0),
            vy_range: Vec2::new(1.0, 2.0),
            vz_range: Vec2::new(-1.0, 1.0),
            scale: 1.0,
            particles: Vec::new(),
            alive_list: Vec::new(),
            dead_list: Vec::new(),
        }
    }
}

impl MeshEmitterComponent {
    pub const RUNNING: u32 = 1 << 0;
    pub const RECYCLE: u32 = 1 << 1;

    pub fn is_running(&self) -> bool {
        self.flags & Self::RUNNING != 0
    }

    pub fn is_recycle(&self) -> bool {
        self.flags & Self::RECYCLE != 0
    }

    pub fn start(&mut self) {
        self.flags |= Self::RUNNING;
    }

    pub fn stop(&mut self) {
        self.flags &= !Self::RUNNING;
    }

    /// Refill the pool: every particle dead, index 0 emitted first.
    pub fn reset(&mut self) {
        let count = self.max_mesh_count as usize;
        self.particles.clear();
        self.particles.resize(count, Particle::default());
        self.alive_list.clear();
        self.dead_list = (0..self.max_mesh_count).rev().collect();
    }

    /// One frame: emit, step alive particles, retire expired ones.
    ///
    /// Expired particles return to the dead list only when the emitter
    /// recycles; otherwise the pool drains for good.
    pub fn update(&mut self, origin: Vec3, dt: f32, rng: &mut impl Rng) {
        if self.particles.is_empty() {
            self.reset();
        }
        if !self.is_running() {
            return;
        }

        let emission = (self.emission_per_frame as usize).min(self.dead_list.len());
        self.alive_list.reserve(emission);
        for _ in 0..emission {
            let Some(index) = self.dead_list.pop() else {
                break;
            };
            let half_pi = std::f32::consts::FRAC_PI_2;
            self.particles[index as usize] = Particle {
                lifespan: sample_range(rng, self.lifetime_range),
                position: origin,
                velocity: Vec3::new(
                    sample_range(rng, self.vx_range),
                    sample_range(rng, self.vy_range),
                    sample_range(rng, self.vz_range),
                ),
                rotation: Vec3::new(
                    rng.gen_range(-half_pi..=half_pi),
                    rng.gen_range(-half_pi..=half_pi),
                    rng.gen_range(-half_pi..=half_pi),
                ),
                scale: self.scale,
            };
            self.alive_list.push(index);
        }

        for &index in &self.alive_list {
            let p = &mut self.particles[index as usize];
            p.lifespan -= dt;
            p.position += p.velocity * dt;
        }

        let recycle = self.is_recycle();
        let particles = &self.particles;
        let dead_list = &mut self.dead_list;
        self.alive_list.retain(|&index| {
            if particles[index as usize].lifespan > 0.0 {
                true
            } else {
                if recycle {
                    dead_list.push(index);
                }
                false
            }
        });
    }
}

/// Uniform sample in `[range.x, range.y]`, tolerating an empty or reversed range.
fn sample_range(rng: &mut impl Rng, range: Vec2) -> f32 {
    let (lo, hi) = (range.x.min(range.y), range.x.max(range.y));
    if lo == hi {
        lo
    } else {
        rng.gen_range(lo..=hi)
    }
}

impl Component for MeshEmitterComponent {}

/// Parameters of a GPU-simulated particle system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleEmitterComponent {
    pub gravity: bool,
    pub max_particle_count: u32,
    pub particles_per_frame: u32,
    pub particle_scale: f32,
    pub particle_lifespan: f32,
    pub starting_velocity: Vec3,

    #[serde(skip)]
    alive_buffer_index: u32,
}

impl Default for ParticleEmitterComponent {
    fn default() -> Self {
        Self {
            gravity: false,
            max_particle_count: 1000,
            particles_per_frame: 10,
            particle_scale: 1.0,
            particle_lifespan: 3.0,
            starting_velocity: Vec3::ZERO,
            alive_buffer_index: 0,
        }
    }
}

impl ParticleEmitterComponent {
    /// Alive list read by this frame's simulation.
    pub fn pre_index(&self) -> u32 {
        self.alive_buffer_index
    }

    /// Alive list written by this frame's simulation.
    pub fn post_index(&self) -> u32 {
        1 - self.alive_buffer_index
    }

    pub fn swap_alive_buffers(&mut self) {
        self.alive_buffer_index = 1 - self.alive_buffer_index;
    }
}

impl Component for ParticleEmitterComponent {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn emitter(max: u32, per_frame: u32, recycle: bool) -> MeshEmitterComponent {
        let mut e = MeshEmitterComponent {
            max_mesh_count: max,
            emission_per_frame: per_frame,
            lifetime_range: Vec2::new(1.0, 1.0),
            ..Default::default()
        };
        if !recycle {
            e.flags &= !MeshEmitterComponent::RECYCLE;
        }
        e
    }

    #[test]
    fn emits_up_to_per_frame_cap() {
        let mut rng = Pcg64::seed_from_u64(1);
        let mut e = emitter(10, 3, true);
        e.update(Vec3::ZERO, 0.1, &mut rng);
        assert_eq!(e.alive_list.len(), 3);
        assert_eq!(e.dead_list.len(), 7);
        assert_eq!(e.alive_list, vec![0, 1, 2]);
    }

    #[test]
    fn emission_is_bounded_by_free_particles() {
        let mut rng = Pcg64::seed_from_u64(2);
        let mut e = emitter(4, 3, true);
        e.update(Vec3::ZERO, 0.1, &mut rng);
        e.update(Vec3::ZERO, 0.1, &mut rng);
        assert_eq!(e.alive_list.len(), 4);
        assert!(e.dead_list.is_empty());
    }

    #[test]
    fn expired_particles_recycle_only_when_enabled() {
        let mut rng = Pcg64::seed_from_u64(3);
        let mut recycling = emitter(4, 2, true);
        recycling.update(Vec3::ZERO, 2.0, &mut rng);
        assert!(recycling.alive_list.is_empty());
        assert_eq!(recycling.dead_list.len(), 4);

        let mut draining = emitter(4, 2, false);
        draining.update(Vec3::ZERO, 2.0, &mut rng);
        assert!(draining.alive_list.is_empty());
        assert_eq!(draining.dead_list.len(), 2);
    }

    #[test]
    fn stopped_emitter_does_nothing_after_reset() {
        let mut rng = Pcg64::seed_from_u64(4);
        let mut e = emitter(4, 2, true);
        e.stop();
        e.update(Vec3::ZERO, 0.1, &mut rng);
        assert_eq!(e.particles.len(), 4);
        assert!(e.alive_list.is_empty());
    }

    #[test]
    fn particles_move_with_their_velocity() {
        let mut rng = Pcg64::seed_from_u64(5);
        let mut e = emitter(1, 1, true);
        e.vx_range = Vec2::new(2.0, 2.0);
        e.vy_range = Vec2::ZERO;
        e.vz_range = Vec2::ZERO;
        e.update(Vec3::new(1.0, 0.0, 0.0), 0.5, &mut rng);
        assert_eq!(e.particles[0].position, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn gpu_emitter_swaps_alive_buffers() {
        let mut p = ParticleEmitterComponent::default();
        assert_eq!((p.pre_index(), p.post_index()), (0, 1));
        p.swap_alive_buffers();
        assert_eq!((p.pre_index(), p.post_index()), (1, 0));
    }
}
