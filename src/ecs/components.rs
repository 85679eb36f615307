use std::sync::Arc;

use bevy_ecs::component::Component;

use crate::model::{CreatureParams, Pose, Sensors};

/// Identity of a live creature.
///
/// `seq` orders creatures by spawn time so captures list them in insertion order.
#[derive(Component, Debug, Clone)]
pub struct CreatureTag {
    pub id: i32,
    pub path: String,
    pub seq: u64,
}

#[derive(Component, Debug, Clone)]
pub struct Body {
    pub pose: Pose,
    pub energy: f64,
}

/// Latest sensor readings, recomputed during the sense phase.
#[derive(Component, Debug, Clone)]
pub struct SensorReadings(pub Sensors);

/// Resolved model parameters for the creature's path.
#[derive(Component, Debug, Clone)]
pub struct Model(pub Arc<CreatureParams>);
