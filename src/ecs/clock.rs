use bevy_ecs::resource::Resource;
use bevy_ecs::system::ResMut;

/// Simulation clock resource counting completed ticks.
///
/// The `advance_clock` system moves the clock forward at the end of each step
/// (in `StepPhase::Last`), so systems see the tick count before it advances.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SimClock {
    pub tick_count: u64,
}

impl SimClock {
    pub fn at(tick_count: u64) -> Self {
        Self { tick_count }
    }

    pub fn advance(&mut self) {
        self.tick_count += 1;
    }
}

pub fn advance_clock(mut clock: ResMut<SimClock>) {
    clock.advance();
}
