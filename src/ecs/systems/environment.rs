use bevy_ecs::system::ResMut;

use crate::ecs::resources::LiveField;

/// Advance the live environment by one tick.
pub fn advance_field(mut field: ResMut<LiveField>) {
    field.0.advance();
}
