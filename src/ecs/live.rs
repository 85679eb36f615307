use std::collections::BTreeSet;
use std::sync::Arc;

use bevy_ecs::entity::Entity;
use bevy_ecs::schedule::Schedule;
use bevy_ecs::world::World;

use super::clock::SimClock;
use super::components::{Body, CreatureTag, Model, SensorReadings};
use super::resources::{
    Catalog, CreatureIds, LiveField, RuleBook, SimRng, StepFault, VisionSource,
};
use super::schedule::build_step_schedule;
use super::systems::refresh_sensors;
use crate::config::WorldDefinition;
use crate::error::HistoryError;
use crate::model::{
    CreatureCatalog, CreatureParams, CreatureState, EnvironmentSpec, Pose, Sensors, WorldState,
};
use crate::rules::CreatureRules;
use crate::vision::VisionRenderer;

/// The mutable simulation: live creatures and environment plus the step schedule.
///
/// Live state is only ever entered through [`LiveWorld::populate`] or
/// [`LiveWorld::restore`] and only ever leaves through [`LiveWorld::capture`].
pub struct LiveWorld {
    world: World,
    schedule: Schedule,
}

struct Spawn {
    id: i32,
    path: String,
    pose: Pose,
    energy: f64,
    sensors: Option<Sensors>,
    params: Arc<CreatureParams>,
}

impl LiveWorld {
    pub fn new(
        rules: Arc<dyn CreatureRules>,
        vision: Arc<dyn VisionRenderer>,
        catalog: Arc<CreatureCatalog>,
        seed: u64,
    ) -> Self {
        let mut world = World::new();
        world.insert_resource(SimClock::default());
        world.insert_resource(SimRng::new(seed));
        world.insert_resource(CreatureIds::default());
        world.insert_resource(StepFault::default());
        world.insert_resource(LiveField(EnvironmentSpec::default().initial_state()));
        world.insert_resource(RuleBook(rules));
        world.insert_resource(VisionSource(vision));
        world.insert_resource(Catalog(catalog));
        Self {
            world,
            schedule: build_step_schedule(),
        }
    }

    pub fn set_rules(&mut self, rules: Arc<dyn CreatureRules>) {
        self.world.insert_resource(RuleBook(rules));
    }

    pub fn rules_name(&self) -> String {
        self.world.resource::<RuleBook>().0.name().to_string()
    }

    pub fn catalog(&self) -> Arc<CreatureCatalog> {
        self.world.resource::<Catalog>().0.clone()
    }

    pub fn tick_count(&self) -> u64 {
        self.world.resource::<SimClock>().tick_count
    }

    pub fn creature_count(&mut self) -> usize {
        self.world
            .query::<&CreatureTag>()
            .iter(&self.world)
            .count()
    }

    /// Reset live state to the tick-zero world described by `definition`.
    ///
    /// Sensors start blank; call [`LiveWorld::refresh_sensors`] to compute them.
    pub fn populate(&mut self, definition: &WorldDefinition) -> Result<(), HistoryError> {
        let catalog = self.catalog();
        let mut seen = BTreeSet::new();
        let mut spawns = Vec::with_capacity(definition.placements.len());
        for placement in &definition.placements {
            if !seen.insert(placement.id) {
                return Err(HistoryError::InvariantViolation(format!(
                    "creature id {} placed twice",
                    placement.id
                )));
            }
            spawns.push(Spawn {
                id: placement.id,
                path: placement.path.clone(),
                pose: Pose::facing_x(placement.position),
                energy: placement.energy,
                sensors: None,
                params: catalog.resolve(&placement.path)?,
            });
        }
        let next_id = definition
            .placements
            .iter()
            .map(|p| p.id + 1)
            .max()
            .unwrap_or(0);

        self.replace_creatures(spawns);
        self.world.resource_mut::<LiveField>().0 = definition.environment.initial_state();
        self.world.resource_mut::<SimClock>().tick_count = 0;
        self.world.resource_mut::<CreatureIds>().next = next_id;
        Ok(())
    }

    /// Set live state to exactly what `state` captured.
    ///
    /// Every model path is resolved before anything changes, so a failed restore
    /// leaves the live world untouched.
    pub fn restore(&mut self, state: &WorldState) -> Result<(), HistoryError> {
        state.validate()?;
        let catalog = self.catalog();
        let spawns = state
            .creature_states()
            .iter()
            .map(|cs| {
                Ok(Spawn {
                    id: cs.creature_id,
                    path: cs.model_path.clone(),
                    pose: cs.pose,
                    energy: cs.energy,
                    sensors: Some(cs.sensors.clone()),
                    params: catalog.resolve(&cs.model_path)?,
                })
            })
            .collect::<Result<Vec<_>, HistoryError>>()?;

        self.replace_creatures(spawns);
        self.world.resource_mut::<LiveField>().0 = state.environment().clone();
        self.world.resource_mut::<SimClock>().tick_count = state.tick_count();
        self.world.resource_mut::<CreatureIds>().next = state.next_creature_id();
        Ok(())
    }

    fn replace_creatures(&mut self, spawns: Vec<Spawn>) {
        let existing: Vec<Entity> = self
            .world
            .query::<(Entity, &CreatureTag)>()
            .iter(&self.world)
            .map(|(entity, _)| entity)
            .collect();
        for entity in existing {
            self.world.despawn(entity);
        }

        let mut ids = CreatureIds::default();
        for spawn in spawns {
            let sensors = spawn
                .sensors
                .unwrap_or_else(|| spawn.params.blank_sensors());
            self.world.spawn((
                CreatureTag {
                    id: spawn.id,
                    path: spawn.path,
                    seq: ids.allocate_seq(),
                },
                Body {
                    pose: spawn.pose,
                    energy: spawn.energy,
                },
                SensorReadings(sensors),
                Model(spawn.params),
            ));
        }
        self.world.resource_mut::<CreatureIds>().next_seq = ids.next_seq;
    }

    /// Move the live environment to new movement parameters, keeping its objects.
    pub fn retune_field(&mut self, spec: &EnvironmentSpec) -> Result<(), HistoryError> {
        let mut field = self.world.resource_mut::<LiveField>();
        if field.0.retune(spec) {
            Ok(())
        } else {
            Err(HistoryError::IncompatibleHistory(format!(
                "cannot retune a {} field with a {} definition",
                field.0.kind_name(),
                spec.kind_name()
            )))
        }
    }

    pub fn refresh_sensors(&mut self) -> Result<(), HistoryError> {
        refresh_sensors(&mut self.world)
    }

    /// Capture live state as an immutable snapshot, creatures in spawn order.
    pub fn capture(&mut self) -> Result<WorldState, HistoryError> {
        let mut creatures: Vec<(u64, CreatureState)> = self
            .world
            .query::<(&CreatureTag, &Body, &SensorReadings)>()
            .iter(&self.world)
            .map(|(tag, body, sensors)| {
                let state = CreatureState {
                    creature_id: tag.id,
                    model_path: tag.path.clone(),
                    pose: body.pose,
                    energy: body.energy,
                    sensors: sensors.0.clone(),
                };
                (tag.seq, state)
            })
            .collect();
        creatures.sort_unstable_by_key(|(seq, _)| *seq);

        WorldState::new(
            self.world.resource::<SimClock>().tick_count,
            creatures.into_iter().map(|(_, cs)| cs).collect(),
            self.world.resource::<LiveField>().0.clone(),
            self.world.resource::<CreatureIds>().next,
        )
    }

    /// Run one step and capture the result.
    ///
    /// Atomic: if any phase fails, live state is put back exactly as it was and
    /// the error is returned.
    pub fn step(&mut self) -> Result<WorldState, HistoryError> {
        let before = self.capture()?;
        self.world.resource_mut::<StepFault>().0 = None;
        self.schedule.run(&mut self.world);
        if let Some(err) = self.world.resource_mut::<StepFault>().0.take() {
            self.restore(&before)?;
            return Err(err);
        }
        self.capture()
    }
}
