use bevy_ecs::entity::Entity;
use bevy_ecs::world::World;

use crate::ecs::components::{Body, CreatureTag, Model, SensorReadings};
use crate::ecs::resources::{LiveField, StepFault, VisionSource};
use crate::error::HistoryError;
use crate::vision::sense;

/// Recompute every creature's sensors from the current environment.
///
/// All readings are computed before any is written, so a failing render leaves
/// every creature's previous readings in place.
pub fn refresh_sensors(world: &mut World) -> Result<(), HistoryError> {
    let vision = world.resource::<VisionSource>().0.clone();
    let objects = world.resource::<LiveField>().0.objects().to_vec();

    let mut query = world.query::<(Entity, &CreatureTag, &Body, &Model)>();
    let mut creatures: Vec<(i32, Entity)> = query
        .iter(world)
        .map(|(entity, tag, _, _)| (tag.id, entity))
        .collect();
    creatures.sort_unstable_by_key(|(id, _)| *id);

    let mut readings = Vec::with_capacity(creatures.len());
    for (id, entity) in creatures {
        let Ok((_, _, body, model)) = query.get(world, entity) else {
            continue;
        };
        let sensors = sense(vision.as_ref(), &model.0, &body.pose, &objects).map_err(|source| {
            HistoryError::Sensor {
                creature_id: id,
                source,
            }
        })?;
        readings.push((entity, sensors));
    }

    for (entity, sensors) in readings {
        if let Ok(mut e) = world.get_entity_mut(entity) {
            e.insert(SensorReadings(sensors));
        }
    }
    Ok(())
}

/// Exclusive system for the sense phase. Failures are parked in [`StepFault`].
pub fn sense_creatures(world: &mut World) {
    if let Err(err) = refresh_sensors(world) {
        world.resource_mut::<StepFault>().raise(err);
    }
}
