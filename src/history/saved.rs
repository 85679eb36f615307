use serde::{Deserialize, Serialize};

use super::selection::NO_SELECTION;
use crate::config::WorldDefinition;
use crate::error::HistoryError;
use crate::model::WorldState;

/// Everything needed to resume a history: its definition, snapshots, cursor and selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedHistory {
    pub name: String,
    pub definition: WorldDefinition,
    pub states: Vec<WorldState>,
    pub cursor: usize,
    #[serde(default = "no_selection")]
    pub selected_creature_id: i32,
}

fn no_selection() -> i32 {
    NO_SELECTION
}

impl SavedHistory {
    /// Check that the history is non-empty, the cursor is in range and every
    /// snapshot has unique creature ids.
    pub fn validate(&self) -> Result<(), HistoryError> {
        if self.states.is_empty() {
            return Err(HistoryError::InvariantViolation(format!(
                "history {:?} has no states",
                self.name
            )));
        }
        if self.cursor >= self.states.len() {
            return Err(HistoryError::InvariantViolation(format!(
                "cursor {} outside history of {} states",
                self.cursor,
                self.states.len()
            )));
        }
        for state in &self.states {
            state.validate()?;
        }
        Ok(())
    }
}
