use std::collections::HashMap;

use bevy_ecs::entity::Entity;
use bevy_ecs::world::World;

use crate::ecs::clock::SimClock;
use crate::ecs::components::{Body, CreatureTag, Model, SensorReadings};
use crate::ecs::resources::{CreatureIds, RuleBook, SimRng, StepFault};
use crate::rules::{CensusEntry, Lifecycle};

/// Exclusive system running the breeding hook and applying its births and removals.
///
/// The hook works on a census; nothing in the world changes until it returns
/// successfully.
pub fn run_lifecycle(world: &mut World) {
    let rules = world.resource::<RuleBook>().0.clone();
    let tick = world.resource::<SimClock>().tick_count + 1;
    let next_id = world.resource::<CreatureIds>().next;

    let mut query = world.query::<(Entity, &CreatureTag, &Body, &Model)>();
    let mut census: Vec<(CensusEntry, Entity, Model)> = query
        .iter(world)
        .map(|(entity, tag, body, model)| {
            let entry = CensusEntry {
                id: tag.id,
                path: tag.path.clone(),
                pose: body.pose,
                energy: body.energy,
            };
            (entry, entity, model.clone())
        })
        .collect();
    census.sort_unstable_by_key(|(entry, ..)| entry.id);

    let mut lifecycle = Lifecycle::new(census.iter().map(|(e, ..)| e.clone()).collect(), next_id);
    let outcome = {
        let mut rng = world.resource_mut::<SimRng>();
        rules.breed(&mut lifecycle, tick, &mut rng.rng)
    };
    if let Err(err) = outcome {
        world.resource_mut::<StepFault>().raise(err);
        return;
    }

    let by_id: HashMap<i32, (Entity, &Model, &str)> = census
        .iter()
        .map(|(entry, entity, model)| (entry.id, (*entity, model, entry.path.as_str())))
        .collect();

    for entry in lifecycle.creatures() {
        if let Some((entity, ..)) = by_id.get(&entry.id)
            && let Some(mut body) = world.get_mut::<Body>(*entity)
        {
            body.energy = entry.energy;
        }
    }

    let births: Vec<_> = lifecycle
        .births()
        .iter()
        .filter_map(|birth| {
            let (_, model, path) = by_id.get(&birth.parent)?;
            Some((birth.clone(), (*model).clone(), path.to_string()))
        })
        .collect();

    for id in lifecycle.removals() {
        if let Some((entity, ..)) = by_id.get(id) {
            world.despawn(*entity);
        }
    }

    for (birth, model, path) in births {
        let seq = world.resource_mut::<CreatureIds>().allocate_seq();
        let sensors = model.0.blank_sensors();
        world.spawn((
            CreatureTag {
                id: birth.id,
                path,
                seq,
            },
            Body {
                pose: birth.pose,
                energy: birth.energy,
            },
            SensorReadings(sensors),
            model,
        ));
    }
    world.resource_mut::<CreatureIds>().next = lifecycle.next_id();
}
