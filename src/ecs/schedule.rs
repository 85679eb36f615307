use bevy_ecs::schedule::{ExecutorKind, IntoScheduleConfigs, Schedule, ScheduleLabel, SystemSet};
use bevy_ecs::system::Res;

use super::clock::advance_clock;
use super::resources::{StepFault, distribute_rng};
use super::systems::{act_creatures, advance_field, run_lifecycle, sense_creatures};

/// Schedule label for one simulation step.
#[derive(ScheduleLabel, Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepTick;

/// Ordered phases within each step.
///
/// Phases run in declaration order:
/// Reseed < Lifecycle < Environment < Sense < Act < Last.
/// Sensing sees the environment of the tick being computed; acting sees fresh sensors.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepPhase {
    Reseed,
    Lifecycle,
    Environment,
    Sense,
    Act,
    Last,
}

/// Run condition: no earlier phase of this step has failed.
pub fn step_ok(fault: Res<StepFault>) -> bool {
    fault.0.is_none()
}

/// Build the `StepTick` schedule.
///
/// Always single-threaded: per-creature rule callbacks share one RNG stream and
/// must see creatures in the same order on every replay.
pub fn build_step_schedule() -> Schedule {
    let mut schedule = Schedule::new(StepTick);
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.configure_sets(
        (
            StepPhase::Reseed,
            StepPhase::Lifecycle,
            StepPhase::Environment,
            StepPhase::Sense,
            StepPhase::Act,
            StepPhase::Last,
        )
            .chain(),
    );
    schedule.configure_sets(StepPhase::Environment.run_if(step_ok));
    schedule.configure_sets(StepPhase::Sense.run_if(step_ok));
    schedule.configure_sets(StepPhase::Act.run_if(step_ok));
    schedule.configure_sets(StepPhase::Last.run_if(step_ok));

    schedule.add_systems(distribute_rng.in_set(StepPhase::Reseed));
    schedule.add_systems(run_lifecycle.in_set(StepPhase::Lifecycle));
    schedule.add_systems(advance_field.in_set(StepPhase::Environment));
    schedule.add_systems(sense_creatures.in_set(StepPhase::Sense));
    schedule.add_systems(act_creatures.in_set(StepPhase::Act));
    schedule.add_systems(advance_clock.in_set(StepPhase::Last));
    schedule
}
