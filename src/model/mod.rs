pub mod creature;
pub mod environment;
pub mod geometry;
pub mod state;

pub use creature::{
    CreatureCatalog, CreatureParams, CreaturePlacement, SensorGrid, Sensors, VisionParams,
};
pub use environment::{
    EnvironmentSpec, EnvironmentState, FoodFieldSpec, FoodFieldState, StaticFieldSpec,
    StaticFieldState,
};
pub use geometry::{Bounds3, GridSize, Pose, Transform, Vec3};
pub use state::{CreatureState, WorldState};
