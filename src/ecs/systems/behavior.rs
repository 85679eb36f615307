use bevy_ecs::entity::Entity;
use bevy_ecs::system::{Query, Res, ResMut};

use crate::ecs::components::{Body, CreatureTag, Model, SensorReadings};
use crate::ecs::resources::{LiveField, RuleBook, SimRng};
use crate::rules::CreatureView;

/// Apply movement then feeding to every creature, in creature id order.
pub fn act_creatures(
    mut creatures: Query<(Entity, &CreatureTag, &mut Body, &SensorReadings, &Model)>,
    field: Res<LiveField>,
    rules: Res<RuleBook>,
    mut rng: ResMut<SimRng>,
) {
    let mut order: Vec<(i32, Entity)> = creatures
        .iter()
        .map(|(entity, tag, ..)| (tag.id, entity))
        .collect();
    order.sort_unstable_by_key(|(id, _)| *id);

    for (id, entity) in order {
        let Ok((_, _, mut body, sensors, model)) = creatures.get_mut(entity) else {
            continue;
        };
        let body = &mut *body;
        let mut view = CreatureView {
            id,
            params: &model.0,
            sensors: &sensors.0,
            pose: &mut body.pose,
            energy: &mut body.energy,
        };
        rules.0.move_creature(&mut view, &field.0, &mut rng.rng);
        rules.0.feed(&mut view, &field.0, &mut rng.rng);
    }
}
