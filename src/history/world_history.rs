use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::actual_list::ActualList;
use super::saved::SavedHistory;
use super::selection::{NO_SELECTION, SelectionTracker};
use crate::config::{HistoryConfig, WorldDefinition};
use crate::ecs::LiveWorld;
use crate::error::HistoryError;
use crate::model::{CreatureCatalog, CreaturePlacement, CreatureState, EnvironmentSpec, WorldState};
use crate::rules::CreatureRules;
use crate::vision::{ProjectionVision, VisionRenderer};

/// What a [`WorldHistory`] is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HistoryPhase {
    Idle = 0,
    Recording = 1,
    Scrubbing = 2,
    Rebuilding = 3,
}

impl HistoryPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => HistoryPhase::Recording,
            2 => HistoryPhase::Scrubbing,
            3 => HistoryPhase::Rebuilding,
            _ => HistoryPhase::Idle,
        }
    }
}

/// Restores the previous phase when an operation finishes, successfully or not.
struct PhaseGuard<'a> {
    slot: &'a AtomicU8,
    previous: u8,
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.slot.store(self.previous, Ordering::Release);
    }
}

struct LiveState {
    world: LiveWorld,
    definition: WorldDefinition,
}

impl LiveState {
    /// Reset the live world to tick zero of the definition and capture it.
    fn seed_initial(&mut self) -> Result<WorldState, HistoryError> {
        self.world.populate(&self.definition)?;
        self.world.refresh_sensors()?;
        self.world.capture()
    }
}

/// Recorded history of a simulated world plus the live world that produces it.
///
/// Mutators (`tick`, `scrub_to`, `rebuild` and the edits) are serialized by an
/// operation gate and then take locks in the order list, live, selection, never
/// holding the live lock while touching the list. Readers such as
/// [`WorldHistory::actual`] take only the list lock, so a renderer never waits on
/// a step in progress.
pub struct WorldHistory {
    ops: Mutex<()>,
    states: ActualList<Arc<WorldState>>,
    live: Mutex<LiveState>,
    selection: Mutex<SelectionTracker>,
    config: HistoryConfig,
    phase: AtomicU8,
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl WorldHistory {
    /// Seed a history from `definition` using its built-in rules and the projection renderer.
    pub fn new(
        definition: WorldDefinition,
        catalog: CreatureCatalog,
        config: HistoryConfig,
    ) -> Result<Self, HistoryError> {
        let rules = definition.kind.rules();
        Self::with_collaborators(
            definition,
            catalog,
            config,
            rules,
            Arc::new(ProjectionVision::default()),
        )
    }

    pub fn with_collaborators(
        definition: WorldDefinition,
        catalog: CreatureCatalog,
        config: HistoryConfig,
        rules: Arc<dyn CreatureRules>,
        vision: Arc<dyn VisionRenderer>,
    ) -> Result<Self, HistoryError> {
        let world = LiveWorld::new(rules, vision, Arc::new(catalog), config.seed);
        let mut live = LiveState { world, definition };
        let initial = live.seed_initial()?;
        let selection = SelectionTracker::initial(&initial);
        tracing::info!(
            world = %live.definition.name,
            rules = %live.world.rules_name(),
            creatures = initial.creature_states().len(),
            "history seeded"
        );
        Ok(Self {
            ops: Mutex::new(()),
            states: ActualList::seeded(Arc::new(initial)),
            live: Mutex::new(live),
            selection: Mutex::new(selection),
            config,
            phase: AtomicU8::new(HistoryPhase::Idle as u8),
        })
    }

    /// Build a history from a saved one.
    pub fn from_saved(
        saved: SavedHistory,
        catalog: CreatureCatalog,
        config: HistoryConfig,
    ) -> Result<Self, HistoryError> {
        let history = Self::new(saved.definition.clone(), catalog, config)?;
        history.set_story(saved)?;
        Ok(history)
    }

    fn enter(&self, phase: HistoryPhase) -> PhaseGuard<'_> {
        let previous = self.phase.swap(phase as u8, Ordering::AcqRel);
        PhaseGuard {
            slot: &self.phase,
            previous,
        }
    }

    // -----------------------------------------------------------------------
    // Readers
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> HistoryPhase {
        HistoryPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// The snapshot at the cursor.
    pub fn actual(&self) -> Result<Arc<WorldState>, HistoryError> {
        self.states
            .actual()
            .ok_or_else(|| HistoryError::InvariantViolation("history has no states".to_string()))
    }

    pub fn actual_pos(&self) -> usize {
        self.states.actual_pos()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Arc<WorldState>> {
        self.states.get(index)
    }

    /// All snapshots and the cursor, read atomically.
    pub fn snapshot(&self) -> (Vec<Arc<WorldState>>, usize) {
        self.states.to_vec()
    }

    pub fn definition(&self) -> WorldDefinition {
        relock(&self.live).definition.clone()
    }

    /// Number of creatures alive in the live world.
    pub fn creature_count(&self) -> usize {
        relock(&self.live).world.creature_count()
    }

    /// Tick count of the live world, which may run ahead of the last snapshot.
    pub fn live_tick_count(&self) -> u64 {
        relock(&self.live).world.tick_count()
    }

    // -----------------------------------------------------------------------
    // Ticking and scrubbing
    // -----------------------------------------------------------------------

    /// Advance the live world one tick.
    ///
    /// With recording on, a cursor left behind the end first discards the stale
    /// future and resets live state to the cursor's snapshot. The new state is
    /// appended when its tick count is a multiple of the save interval. With
    /// recording off the single stored state is replaced. Returns whether a
    /// snapshot was appended.
    pub fn tick(&self) -> Result<bool, HistoryError> {
        let _ops = relock(&self.ops);
        let phase = if self.config.record_story {
            HistoryPhase::Recording
        } else {
            HistoryPhase::Idle
        };
        let _phase = self.enter(phase);
        let recorded = self.tick_locked()?;
        self.resolve_selection();
        Ok(recorded)
    }

    fn tick_locked(&self) -> Result<bool, HistoryError> {
        if !self.config.record_story {
            let next = relock(&self.live).world.step()?;
            self.states.replace_actual(Arc::new(next));
            return Ok(false);
        }

        if self.states.truncate_from_cursor() {
            let actual = self.actual()?;
            relock(&self.live).world.restore(&actual)?;
            tracing::debug!(
                tick = actual.tick_count(),
                "history diverged, live state reset to cursor"
            );
        }

        let next = relock(&self.live).world.step()?;
        let tick = next.tick_count();
        if tick % self.config.save_interval() != 0 {
            return Ok(false);
        }
        self.states.append(Arc::new(next));
        tracing::debug!(tick, len = self.states.len(), "snapshot recorded");
        Ok(true)
    }

    /// Tick until one snapshot has been appended.
    fn record_next_locked(&self) -> Result<(), HistoryError> {
        while !self.tick_locked()? {}
        Ok(())
    }

    /// Move the cursor to `pos`, simulating and recording forward if `pos` is past the end.
    pub fn scrub_to(&self, pos: usize) -> Result<(), HistoryError> {
        if !self.config.record_story {
            return Err(HistoryError::RecordingDisabled);
        }
        let _ops = relock(&self.ops);
        let _phase = self.enter(HistoryPhase::Scrubbing);
        let delta = self.states.set_cursor(pos);
        for _ in 0..delta {
            self.record_next_locked()?;
        }
        self.resolve_selection();
        tracing::debug!(pos, delta, actual = self.states.actual_pos(), "scrubbed");
        Ok(())
    }

    /// Run a cursor move as a scrub: serialized with the other mutators, then
    /// the selection is resolved at the new position.
    fn move_cursor<R>(&self, f: impl FnOnce(&ActualList<Arc<WorldState>>) -> R) -> R {
        let _ops = relock(&self.ops);
        let _phase = self.enter(HistoryPhase::Scrubbing);
        let out = f(&self.states);
        self.resolve_selection();
        out
    }

    /// Move the cursor by `delta` within recorded history. Returns the new position.
    pub fn shift(&self, delta: i64) -> usize {
        self.move_cursor(|states| states.shift_cursor(delta))
    }

    pub fn step_forward(&self) -> bool {
        self.move_cursor(ActualList::step_forward)
    }

    pub fn step_back(&self) -> bool {
        self.move_cursor(ActualList::step_back)
    }

    pub fn move_to_start(&self) {
        self.move_cursor(ActualList::move_to_start)
    }

    pub fn move_to_end(&self) {
        self.move_cursor(ActualList::move_to_end)
    }

    // -----------------------------------------------------------------------
    // Rebuilds and edits
    // -----------------------------------------------------------------------

    /// Re-simulate the whole history from the definition, keeping its length and cursor.
    pub fn rebuild(&self) -> Result<(), HistoryError> {
        let _ops = relock(&self.ops);
        let _phase = self.enter(HistoryPhase::Rebuilding);
        self.rebuild_locked()
    }

    fn rebuild_locked(&self) -> Result<(), HistoryError> {
        let len = self.states.len();
        if len == 0 {
            return Ok(());
        }
        let pos = self.states.actual_pos();
        let initial = relock(&self.live).seed_initial()?;
        self.states.reset(Arc::new(initial));
        if self.config.record_story {
            while self.states.len() < len {
                self.record_next_locked()?;
            }
        }
        self.states.set_cursor(pos);
        self.resolve_selection();
        tracing::info!(len, pos, "history rebuilt");
        Ok(())
    }

    /// Re-simulate only what follows `anchor`, keeping `[0..=anchor]` as recorded.
    ///
    /// The cursor ends on the anchor.
    pub fn rebuild_from(&self, anchor: usize) -> Result<(), HistoryError> {
        let _ops = relock(&self.ops);
        let _phase = self.enter(HistoryPhase::Rebuilding);
        self.rebuild_from_locked(anchor, |_| Ok(()))
    }

    fn rebuild_from_locked(
        &self,
        anchor: usize,
        adjust: impl FnOnce(&mut LiveWorld) -> Result<(), HistoryError>,
    ) -> Result<(), HistoryError> {
        let len = self.states.len();
        if len == 0 {
            return Ok(());
        }
        let anchor = anchor.min(len - 1);
        self.states.set_cursor(anchor);
        self.states.truncate_from_cursor();
        let base = self.actual()?;
        {
            let mut live = relock(&self.live);
            live.world.restore(&base)?;
            adjust(&mut live.world)?;
        }
        if self.config.record_story {
            while self.states.len() < len {
                self.record_next_locked()?;
            }
        }
        self.states.set_cursor(anchor);
        self.resolve_selection();
        tracing::info!(len, anchor, "history rebuilt from anchor");
        Ok(())
    }

    /// Replace the environment definition and rebuild everything.
    pub fn set_environment(&self, spec: EnvironmentSpec) -> Result<(), HistoryError> {
        let _ops = relock(&self.ops);
        let _phase = self.enter(HistoryPhase::Rebuilding);
        relock(&self.live).definition.environment = spec;
        self.rebuild_locked()
    }

    /// Retune the live environment at `anchor` and re-simulate what follows it.
    ///
    /// Only movement parameters change; the spec must be of the same kind as the
    /// current environment.
    pub fn set_environment_from(
        &self,
        anchor: usize,
        spec: EnvironmentSpec,
    ) -> Result<(), HistoryError> {
        let _ops = relock(&self.ops);
        let _phase = self.enter(HistoryPhase::Rebuilding);
        {
            let mut live = relock(&self.live);
            let current = live.definition.environment.kind_name();
            if current != spec.kind_name() {
                return Err(HistoryError::IncompatibleHistory(format!(
                    "cannot retune a {current} environment with a {} definition",
                    spec.kind_name()
                )));
            }
            live.definition.environment = spec.clone();
        }
        self.rebuild_from_locked(anchor, |world| world.retune_field(&spec))
    }

    /// Point placement `id` at a different model and rebuild everything.
    pub fn change_creature(&self, id: i32, path: &str) -> Result<(), HistoryError> {
        let _ops = relock(&self.ops);
        let _phase = self.enter(HistoryPhase::Rebuilding);
        {
            let mut live = relock(&self.live);
            let known = live.world.catalog().contains(path);
            let placement = live
                .definition
                .placement_mut(id)
                .ok_or(HistoryError::MissingCreature(id))?;
            if !known {
                return Err(HistoryError::MissingModel(path.to_string()));
            }
            placement.path = path.to_string();
        }
        self.rebuild_locked()
    }

    /// Reset to the initial snapshot and drop all recorded history.
    pub fn restart(&self) -> Result<(), HistoryError> {
        let _ops = relock(&self.ops);
        let initial = relock(&self.live).seed_initial()?;
        let selection = SelectionTracker::initial(&initial);
        self.states.reset(Arc::new(initial));
        *relock(&self.selection) = selection;
        tracing::info!("history restarted");
        Ok(())
    }

    /// Keep only snapshots in which the selected creature is alive.
    pub fn truncate_to_selected(&self) -> Result<(), HistoryError> {
        let _ops = relock(&self.ops);
        let id = self.selected_creature_id();
        if id == NO_SELECTION {
            return Err(HistoryError::NoSelection);
        }
        if !self.states.retain(|state| state.contains_creature(id)) {
            return Err(HistoryError::MissingCreature(id));
        }
        let actual = self.actual()?;
        relock(&self.live).world.restore(&actual)?;
        self.resolve_selection();
        tracing::info!(creature = id, len = self.states.len(), "history narrowed to selection");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Replace the whole history with a saved one.
    ///
    /// The saved environment and rule book must be of the same kinds as this
    /// history's; the live world resumes from the saved end.
    pub fn set_story(&self, saved: SavedHistory) -> Result<(), HistoryError> {
        let _ops = relock(&self.ops);
        saved.validate()?;
        let SavedHistory {
            name,
            definition,
            states,
            cursor,
            selected_creature_id,
        } = saved;

        let mut states: Vec<Arc<WorldState>> = states.into_iter().map(Arc::new).collect();
        let mut cursor = cursor;
        if !self.config.record_story {
            states = vec![states.swap_remove(cursor)];
            cursor = 0;
        }
        let resume = states.last().cloned().ok_or_else(|| {
            HistoryError::InvariantViolation("saved history has no states".to_string())
        })?;

        {
            let mut live = relock(&self.live);
            let ours = (
                live.definition.environment.kind_name(),
                live.definition.kind.kind_name(),
            );
            let theirs = (definition.environment.kind_name(), definition.kind.kind_name());
            if ours != theirs {
                tracing::warn!(
                    history = %name,
                    "rejected history: {}/{} world cannot load a {}/{} history",
                    ours.0, ours.1, theirs.0, theirs.1
                );
                return Err(HistoryError::IncompatibleHistory(format!(
                    "{} environment with {} rules, expected {} with {}",
                    theirs.0, theirs.1, ours.0, ours.1
                )));
            }
            live.world.restore(&resume)?;
            if live.definition.kind != definition.kind {
                live.world.set_rules(definition.kind.rules());
            }
            live.definition = definition;
        }

        let len = states.len();
        self.states.replace_all(states, cursor);
        *relock(&self.selection) = SelectionTracker::with_selected(selected_creature_id);
        self.resolve_selection();
        tracing::info!(history = %name, len, cursor, "history loaded");
        Ok(())
    }

    pub fn to_saved(&self) -> SavedHistory {
        let _ops = relock(&self.ops);
        let definition = self.definition();
        let (states, cursor) = self.states.to_vec();
        SavedHistory {
            name: definition.name.clone(),
            definition,
            states: states.iter().map(|s| WorldState::clone(s)).collect(),
            cursor,
            selected_creature_id: self.selected_creature_id(),
        }
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    fn resolve_selection(&self) {
        if let Some(state) = self.states.actual() {
            relock(&self.selection).resolve_after_cursor_move(&state);
        }
    }

    pub fn selected_creature_id(&self) -> i32 {
        relock(&self.selection).selected()
    }

    pub fn select_next(&self) -> Result<(), HistoryError> {
        let state = self.actual()?;
        relock(&self.selection).next(&state);
        Ok(())
    }

    pub fn select_previous(&self) -> Result<(), HistoryError> {
        let state = self.actual()?;
        relock(&self.selection).previous(&state);
        Ok(())
    }

    pub fn select(&self, id: i32) -> Result<(), HistoryError> {
        let state = self.actual()?;
        relock(&self.selection).select(id, &state)
    }

    /// State of the selected creature at the cursor.
    pub fn selected_creature_state(&self) -> Result<CreatureState, HistoryError> {
        let id = self.selected_creature_id();
        if id == NO_SELECTION {
            return Err(HistoryError::NoSelection);
        }
        self.actual()?
            .creature(id)
            .cloned()
            .ok_or(HistoryError::MissingCreature(id))
    }

    /// Verify the selection invariant against the actual snapshot.
    pub fn check_selection(&self) -> Result<(), HistoryError> {
        let state = self.actual()?;
        relock(&self.selection).check(&state)
    }

    /// The placement instruction a creature was seeded from.
    pub fn creature_placement(&self, id: i32) -> Result<CreaturePlacement, HistoryError> {
        relock(&self.live)
            .definition
            .placement(id)
            .cloned()
            .ok_or(HistoryError::MissingCreature(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_catalog;

    fn history(config: HistoryConfig) -> WorldHistory {
        WorldHistory::new(WorldDefinition::default(), default_catalog(), config).unwrap()
    }

    #[test]
    fn ticks_append_and_follow_the_end() {
        let h = history(HistoryConfig::default());
        for _ in 0..3 {
            assert!(h.tick().unwrap());
        }
        assert_eq!(h.len(), 4);
        assert_eq!(h.actual_pos(), 3);
        assert_eq!(h.actual().unwrap().tick_count(), 3);
        assert_eq!(h.phase(), HistoryPhase::Idle);
    }

    #[test]
    fn save_interval_skips_unrecorded_ticks() {
        let h = history(HistoryConfig {
            save_interval: 3,
            ..HistoryConfig::default()
        });
        let recorded: Vec<bool> = (0..6).map(|_| h.tick().unwrap()).collect();
        assert_eq!(recorded, vec![false, false, true, false, false, true]);
        let ticks: Vec<u64> = (0..h.len()).map(|i| h.get(i).unwrap().tick_count()).collect();
        assert_eq!(ticks, vec![0, 3, 6]);

        h.scrub_to(4).unwrap();
        assert_eq!(h.actual().unwrap().tick_count(), 12);
    }

    #[test]
    fn rebuilds_honour_save_interval() {
        let h = history(HistoryConfig {
            save_interval: 3,
            ..HistoryConfig::default()
        });
        h.scrub_to(4).unwrap();
        let recorded: Vec<Arc<WorldState>> = h.snapshot().0;
        let ticks: Vec<u64> = recorded.iter().map(|s| s.tick_count()).collect();
        assert_eq!(ticks, vec![0, 3, 6, 9, 12]);

        h.scrub_to(2).unwrap();
        h.rebuild().unwrap();
        assert_eq!(h.snapshot(), (recorded.clone(), 2));

        h.rebuild_from(1).unwrap();
        assert_eq!(h.snapshot(), (recorded, 1));
        assert_eq!(h.live_tick_count(), 12);
    }

    #[test]
    fn unrecorded_history_keeps_one_state() {
        let h = history(HistoryConfig {
            record_story: false,
            ..HistoryConfig::default()
        });
        for _ in 0..4 {
            assert!(!h.tick().unwrap());
        }
        assert_eq!(h.len(), 1);
        assert_eq!(h.actual().unwrap().tick_count(), 4);
        assert!(matches!(h.scrub_to(2), Err(HistoryError::RecordingDisabled)));
    }

    #[test]
    fn ticking_behind_the_end_discards_the_future() {
        let h = history(HistoryConfig::default());
        for _ in 0..5 {
            h.tick().unwrap();
        }
        let kept = h.get(2).unwrap();
        h.scrub_to(2).unwrap();
        h.tick().unwrap();
        assert_eq!(h.len(), 4);
        assert_eq!(h.actual().unwrap().tick_count(), 3);
        assert_eq!(h.get(2).unwrap(), kept);
    }

    #[test]
    fn cursor_helpers_saturate() {
        let h = history(HistoryConfig::default());
        h.scrub_to(3).unwrap();
        assert_eq!(h.shift(-10), 0);
        assert!(!h.step_back());
        assert!(h.step_forward());
        h.move_to_end();
        assert_eq!(h.actual_pos(), 3);
        h.move_to_start();
        assert_eq!(h.actual_pos(), 0);
        assert_eq!(h.phase(), HistoryPhase::Idle);
    }

    #[test]
    fn change_creature_reports_missing_entities() {
        let h = history(HistoryConfig::default());
        assert!(matches!(
            h.change_creature(9, crate::config::DEFAULT_MODEL_PATH),
            Err(HistoryError::MissingCreature(9))
        ));
        assert!(matches!(
            h.change_creature(0, "nope.json"),
            Err(HistoryError::MissingModel(_))
        ));
        assert!(matches!(h.creature_placement(4), Err(HistoryError::MissingCreature(4))));
    }

    #[test]
    fn restart_drops_recorded_history() {
        let h = history(HistoryConfig::default());
        h.scrub_to(4).unwrap();
        h.restart().unwrap();
        assert_eq!(h.len(), 1);
        assert_eq!(h.actual().unwrap().tick_count(), 0);
        assert_eq!(h.live_tick_count(), 0);
        assert_eq!(h.selected_creature_id(), 0);
    }
}
