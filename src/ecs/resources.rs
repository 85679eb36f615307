use std::sync::Arc;

use bevy_ecs::resource::Resource;
use bevy_ecs::world::World;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use super::clock::SimClock;
use crate::error::HistoryError;
use crate::model::{CreatureCatalog, EnvironmentState};
use crate::rules::CreatureRules;
use crate::vision::VisionRenderer;

/// The live environment advanced by the environment phase.
#[derive(Resource, Debug, Clone)]
pub struct LiveField(pub EnvironmentState);

#[derive(Resource, Clone)]
pub struct RuleBook(pub Arc<dyn CreatureRules>);

#[derive(Resource, Clone)]
pub struct VisionSource(pub Arc<dyn VisionRenderer>);

#[derive(Resource, Debug, Clone)]
pub struct Catalog(pub Arc<CreatureCatalog>);

/// Deterministic RNG for the simulation, reseeded every tick.
#[derive(Resource)]
pub struct SimRng {
    pub rng: SmallRng,
    pub seed: u64,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Allocator for creature ids and spawn sequence numbers.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct CreatureIds {
    pub next: i32,
    pub next_seq: u64,
}

impl CreatureIds {
    pub fn allocate_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

/// First failure raised during the current step. Later phases skip when set.
#[derive(Resource, Debug, Default)]
pub struct StepFault(pub Option<HistoryError>);

impl StepFault {
    /// Record `err` unless an earlier failure is already pending.
    pub fn raise(&mut self, err: HistoryError) {
        if self.0.is_none() {
            self.0 = Some(err);
        }
    }
}

/// Derive the RNG seed for a tick from the global seed and the tick count.
///
/// A fixed mix, so saved histories rebuild identically under any toolchain.
fn derive_tick_seed(seed: u64, tick: u64) -> u64 {
    splitmix64(splitmix64(seed) ^ tick)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Exclusive system that reseeds the RNG from `(seed, tick)`.
/// Runs first in every step, so replaying from any snapshot draws the same numbers.
pub fn distribute_rng(world: &mut World) {
    let tick = world.resource::<SimClock>().tick_count;
    let mut rng = world.resource_mut::<SimRng>();
    let seed = rng.seed;
    rng.rng = SmallRng::seed_from_u64(derive_tick_seed(seed, tick));
}
