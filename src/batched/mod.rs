//! Parallel batched engine: advances `N` independent worlds in lockstep
//! for population-scale fitness evaluation (§4.9).
//!
//! # Kernel shape
//!
//! Conceptually every per-entity quantity (particle position, body
//! velocity, ...) lives in one concatenated SoA array of length
//! `n_worlds * per_world_count`, and a kernel derives
//! `(world_index, local_index)` from a single global index (§4.9, §9
//! "Accelerator dispatch"). This CPU reference realizes that layout as
//! `Vec<World>` — each element *is* one contiguous, disjoint slice of the
//! conceptual concatenated array — which keeps the per-world numerics
//! identical to the single-world path (needed for the determinism
//! contract) while making the global/local index split explicit via
//! [`global_index`]/[`split_index`] for any caller that wants to address
//! entities the same way the spec's kernel-shape description does.
//!
//! Static colliders are shared read-only across worlds (cloned once at
//! batch-build time rather than behind a pointer, since collider counts
//! are small and bounded per §2 Non-goals on broadphase). The warm-start
//! cache is per-world, matching §5 "The warm-start cache in the batched
//! path is per-world."
//!
//! Worlds are stepped across a rayon thread pool: each world's step only
//! touches its own `World`/`Stepper`, so there is no shared mutable state
//! and no atomics are needed for this scheduling choice (§4.9
//! "Concurrency inside one world's step" — the alternative, atomic
//! updates for intra-world contact parallelism, is left to a future
//! accelerator backend that also parallelizes within a world).

pub mod rng;

use rayon::prelude::*;

use crate::collider::Colliders;
use crate::config::SimulationConfig;
use crate::error::BuildError;
use crate::stepper::Stepper;
use crate::world::World;

/// Map a `(world_index, local_index)` pair to a single global entity
/// index, for a schema with `per_world_count` entities per world.
#[inline]
pub fn global_index(world_index: usize, local_index: usize, per_world_count: usize) -> usize {
    world_index * per_world_count + local_index
}

/// Inverse of [`global_index`].
#[inline]
pub fn split_index(global: usize, per_world_count: usize) -> (usize, usize) {
    (global / per_world_count, global % per_world_count)
}

/// `N` independent worlds sharing one pool of static colliders, stepped
/// in lockstep (§4.9).
pub struct BatchedWorld {
    worlds: Vec<World>,
    steppers: Vec<Stepper>,
    colliders: Colliders,
}

impl BatchedWorld {
    /// Build a batch of `n_worlds` copies of `template`, replacing each
    /// copy's own collider lists with the shared `colliders` pool.
    pub fn from_template(template: &World, colliders: Colliders, n_worlds: usize) -> Self {
        let mut worlds = Vec::with_capacity(n_worlds);
        for _ in 0..n_worlds {
            let mut w = template.clone();
            w.set_colliders(colliders.clone());
            worlds.push(w);
        }
        let steppers = (0..n_worlds).map(|_| Stepper::new()).collect();
        Self {
            worlds,
            steppers,
            colliders,
        }
    }

    /// Build a batch from a per-world fallible constructor, e.g. one genome
    /// per world translated into build-API calls. A world whose builder
    /// returns `Err` is replaced with an empty, valid world rather than
    /// aborting the whole batch (§7: "one misconfigured genome should not
    /// prevent fitness evaluation of its siblings"); the returned vector
    /// carries that world's error at its index, `None` otherwise.
    pub fn try_from_builders<F>(
        colliders: Colliders,
        n_worlds: usize,
        mut build: F,
    ) -> (Self, Vec<Option<BuildError>>)
    where
        F: FnMut(usize) -> Result<World, BuildError>,
    {
        let mut worlds = Vec::with_capacity(n_worlds);
        let mut errors = Vec::with_capacity(n_worlds);
        for world_index in 0..n_worlds {
            let (mut world, error) = match build(world_index) {
                Ok(world) => (world, None),
                Err(err) => (World::new(), Some(err)),
            };
            world.set_colliders(colliders.clone());
            worlds.push(world);
            errors.push(error);
        }
        let steppers = (0..n_worlds).map(|_| Stepper::new()).collect();
        (
            Self {
                worlds,
                steppers,
                colliders,
            },
            errors,
        )
    }

    pub fn n_worlds(&self) -> usize {
        self.worlds.len()
    }

    pub fn world(&self, index: usize) -> &World {
        &self.worlds[index]
    }

    pub fn world_mut(&mut self, index: usize) -> &mut World {
        &mut self.worlds[index]
    }

    pub fn colliders(&self) -> &Colliders {
        &self.colliders
    }

    /// Reset every world back to `template`'s initial dynamic state while
    /// keeping the shared collider pool, and clear every per-world
    /// warm-start cache. Used by the reset-determinism property (§8
    /// Scenario E): resetting twice with the same seed must reproduce
    /// identical trajectories.
    pub fn reset_from_template(&mut self, template: &World) {
        for world in &mut self.worlds {
            let colliders = world.colliders().clone();
            *world = template.clone();
            world.set_colliders(colliders);
        }
        for stepper in &mut self.steppers {
            stepper.reset_warm_start();
        }
    }

    /// Apply a per-world initialization closure driven by a counter-based
    /// stateless PRNG seeded from `(base_seed, world_index, counter)`
    /// (§4.9 "Randomization for per-world initial conditions"). Identical
    /// `base_seed` reproduces identical per-world sequences regardless of
    /// how many times this is called, since the RNG carries no state
    /// between calls.
    pub fn randomize<F>(&mut self, base_seed: u64, counter: u64, mut f: F)
    where
        F: FnMut(usize, &mut World, &mut rng::BatchRng),
    {
        for (world_index, world) in self.worlds.iter_mut().enumerate() {
            let mut rng = rng::BatchRng::new(base_seed, world_index as u64, counter);
            f(world_index, world, &mut rng);
        }
    }

    /// Advance every world by one step, in parallel across worlds (§4.9,
    /// §5 "Scheduling model").
    pub fn batched_step(&mut self, config: &SimulationConfig) {
        self.worlds
            .par_iter_mut()
            .zip(self.steppers.par_iter_mut())
            .for_each(|(world, stepper)| {
                stepper.step(world, config);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;
    use glam::DVec2;

    fn falling_template() -> (World, Colliders) {
        let mut w = World::new();
        w.add_particle(DVec2::new(0.0, 5.0), 1.0, 0.1).unwrap();
        let mut colliders = Colliders::default();
        colliders.boxes.push(crate::collider::BoxCollider {
            center: DVec2::new(0.0, -2.0),
            local_x: DVec2::X,
            half_extents: DVec2::new(20.0, 0.5),
        });
        (w, colliders)
    }

    #[test]
    fn global_and_split_index_round_trip() {
        for per_world in [1usize, 3, 7] {
            for world_index in 0..4 {
                for local_index in 0..per_world {
                    let g = global_index(world_index, local_index, per_world);
                    assert_eq!(split_index(g, per_world), (world_index, local_index));
                }
            }
        }
    }

    #[test]
    fn worlds_in_a_batch_start_identical() {
        let (template, colliders) = falling_template();
        let batch = BatchedWorld::from_template(&template, colliders, 5);
        for i in 1..batch.n_worlds() {
            assert_eq!(
                batch.world(0).particle_positions(),
                batch.world(i).particle_positions()
            );
        }
    }

    #[test]
    fn perturbing_one_world_leaves_others_unchanged() {
        let (template, colliders) = falling_template();
        let mut batch = BatchedWorld::from_template(&template, colliders, 5);
        batch.world_mut(2).nudge_particle(
            crate::world::ParticleId(0),
            DVec2::new(0.1, 0.0),
        );
        let config = SimulationConfig::default();
        for _ in 0..100 {
            batch.batched_step(&config);
        }
        for i in [0usize, 1, 3, 4] {
            assert_eq!(
                batch.world(0).particle_positions()[0],
                batch.world(i).particle_positions()[0]
            );
        }
        assert_ne!(
            batch.world(0).particle_positions()[0],
            batch.world(2).particle_positions()[0]
        );
    }

    #[test]
    fn one_bad_builder_does_not_abort_the_rest_of_the_batch() {
        let (batch, errors) = BatchedWorld::try_from_builders(Colliders::default(), 3, |i| {
            let mut w = World::new();
            if i == 1 {
                w.add_particle(DVec2::new(f64::NAN, 0.0), 1.0, 0.1)?;
            } else {
                w.add_particle(DVec2::new(0.0, 5.0), 1.0, 0.1)?;
            }
            Ok(w)
        });
        assert_eq!(batch.n_worlds(), 3);
        assert!(errors[0].is_none());
        assert!(errors[1].is_some());
        assert!(errors[2].is_none());
        assert_eq!(batch.world(1).particle_count(), 0);
        assert_eq!(batch.world(0).particle_count(), 1);
    }

    #[test]
    fn reset_with_same_seed_reproduces_trajectory_exactly() {
        let (template, colliders) = falling_template();
        let config = SimulationConfig::default();

        let mut batch = BatchedWorld::from_template(&template, colliders.clone(), 4);
        batch.randomize(42, 0, |_, world, rng| {
            let dx = rng.next_f64() * 0.01;
            world.nudge_particle(crate::world::ParticleId(0), DVec2::new(dx, 0.0));
        });
        for _ in 0..50 {
            batch.batched_step(&config);
        }
        let first_run: Vec<_> = (0..batch.n_worlds())
            .map(|i| batch.world(i).particle_positions()[0])
            .collect();

        batch.reset_from_template(&template);
        batch.randomize(42, 0, |_, world, rng| {
            let dx = rng.next_f64() * 0.01;
            world.nudge_particle(crate::world::ParticleId(0), DVec2::new(dx, 0.0));
        });
        for _ in 0..50 {
            batch.batched_step(&config);
        }
        let second_run: Vec<_> = (0..batch.n_worlds())
            .map(|i| batch.world(i).particle_positions()[0])
            .collect();

        assert_eq!(first_run, second_run);
    }
}
