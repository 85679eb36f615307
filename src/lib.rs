pub mod config;
pub mod driver;
pub mod ecs;
pub mod error;
pub mod flush;
pub mod history;
pub mod model;
pub mod rules;
pub mod vision;

pub use config::{DriverConfig, HistoryConfig, SimConfig, WorldDefinition};
pub use driver::{Driver, DriverState};
pub use error::HistoryError;
pub use history::{ActualList, HistoryPhase, SavedHistory, SelectionTracker, WorldHistory};
pub use model::{CreatureState, EnvironmentSpec, EnvironmentState, WorldState};
pub use rules::{CreatureRules, WorldKind};
