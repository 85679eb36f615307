pub mod clock;
pub mod components;
pub mod live;
pub mod resources;
pub mod schedule;
pub mod systems;

pub use clock::SimClock;
pub use components::{Body, CreatureTag, Model, SensorReadings};
pub use live::LiveWorld;
pub use resources::{
    Catalog, CreatureIds, LiveField, RuleBook, SimRng, StepFault, VisionSource, distribute_rng,
};
pub use schedule::{StepPhase, StepTick, build_step_schedule};
