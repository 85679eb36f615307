use crate::error::HistoryError;
use crate::model::WorldState;

/// Selection id meaning "nothing selected".
pub const NO_SELECTION: i32 = -1;

/// Tracks which creature is selected as the cursor moves through history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionTracker {
    selected: i32,
}

impl Default for SelectionTracker {
    fn default() -> Self {
        Self {
            selected: NO_SELECTION,
        }
    }
}

impl SelectionTracker {
    /// Start with the first listed creature selected, if any.
    pub fn initial(state: &WorldState) -> Self {
        Self {
            selected: state.creature_ids().next().unwrap_or(NO_SELECTION),
        }
    }

    pub fn with_selected(selected: i32) -> Self {
        Self { selected }
    }

    pub fn selected(&self) -> i32 {
        self.selected
    }

    /// Keep the selection if its creature is present; otherwise select the last
    /// listed creature, or nothing when no creature is present.
    pub fn resolve_after_cursor_move(&mut self, state: &WorldState) {
        if self.selected != NO_SELECTION && state.contains_creature(self.selected) {
            return;
        }
        self.selected = state.creature_ids().last().unwrap_or(NO_SELECTION);
    }

    /// Select the creature listed after the current one, wrapping at the end.
    pub fn next(&mut self, state: &WorldState) {
        self.cycle(state, 1);
    }

    /// Select the creature listed before the current one, wrapping at the start.
    pub fn previous(&mut self, state: &WorldState) {
        self.cycle(state, -1);
    }

    fn cycle(&mut self, state: &WorldState, step: isize) {
        let ids: Vec<i32> = state.creature_ids().collect();
        if ids.is_empty() {
            return;
        }
        self.selected = match ids.iter().position(|&id| id == self.selected) {
            Some(i) => ids[(i as isize + step).rem_euclid(ids.len() as isize) as usize],
            None => ids[0],
        };
    }

    pub fn select(&mut self, id: i32, state: &WorldState) -> Result<(), HistoryError> {
        if !state.contains_creature(id) {
            return Err(HistoryError::MissingCreature(id));
        }
        self.selected = id;
        Ok(())
    }

    /// Verify the selection points at a present creature whenever one exists.
    pub fn check(&self, state: &WorldState) -> Result<(), HistoryError> {
        let any = state.creature_ids().next().is_some();
        if any && !state.contains_creature(self.selected) {
            return Err(HistoryError::InvariantViolation(format!(
                "selected creature {} is absent at tick {}",
                self.selected,
                state.tick_count()
            )));
        }
        Ok(())
    }
}
