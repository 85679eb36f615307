mod common;

use common::*;
use creature_story::config::WorldDefinition;
use creature_story::history::WorldHistory;
use creature_story::model::EnvironmentState;

#[test]
fn edit_at_earlier_cursor_rebuilds_same_length() {
    let history = history(&[0]);
    for _ in 0..5 {
        history.tick().unwrap();
    }
    assert_eq!(history.len(), 6);
    assert_eq!(history.actual_pos(), 5);

    history.scrub_to(2).unwrap();
    assert_eq!(history.actual_pos(), 2);
    assert_eq!(history.actual().unwrap().tick_count(), 2);

    let before = states(&history);
    let new_spec = food_spec(0.8, 0.2, 0.1);
    history.set_environment(new_spec.clone()).unwrap();

    assert_eq!(history.len(), 6);
    assert_eq!(history.actual_pos(), 2);
    assert_eq!(history.actual().unwrap().tick_count(), 2);

    let after = states(&history);
    for (old, new) in before.iter().zip(&after) {
        assert_eq!(old.tick_count(), new.tick_count());
        assert_ne!(
            sensors_of(old, 0),
            sensors_of(new, 0),
            "sensors at tick {} still reflect the old field",
            new.tick_count()
        );
    }

    // The rebuilt history is exactly what a fresh world on the new spec records.
    let fresh = WorldHistory::new(
        WorldDefinition {
            environment: new_spec,
            ..definition(&[0])
        },
        catalog(),
        recording(),
    )
    .unwrap();
    fresh.scrub_to(5).unwrap();
    assert_eq!(states(&fresh), after);
}

#[test]
fn scrubbing_twice_to_the_same_position_is_idempotent() {
    let history = history(&[0, 1]);
    history.scrub_to(7).unwrap();
    let once = history.actual().unwrap();
    history.scrub_to(7).unwrap();
    assert_eq!(history.actual().unwrap(), once);
    assert_eq!(history.len(), 8);

    history.scrub_to(3).unwrap();
    let back = history.actual().unwrap();
    history.scrub_to(3).unwrap();
    assert_eq!(history.actual().unwrap(), back);
    assert_eq!(back.tick_count(), 3);
}

#[test]
fn rebuild_is_deterministic() {
    let a = history(&[0, 1]);
    let b = history(&[0, 1]);
    a.scrub_to(9).unwrap();
    b.scrub_to(9).unwrap();
    assert_eq!(states(&a), states(&b));

    let recorded = states(&a);
    a.scrub_to(4).unwrap();
    a.rebuild().unwrap();
    assert_eq!(states(&a), recorded);
    assert_eq!(a.actual_pos(), 4);
    a.rebuild().unwrap();
    assert_eq!(states(&a), recorded);
}

#[test]
fn truncate_then_extend_keeps_prefix() {
    let history = history(&[0]);
    history.scrub_to(5).unwrap();
    let original = states(&history);

    let k = 2;
    history.scrub_to(k).unwrap();
    for _ in 0..(original.len() - 1 - k) {
        history.tick().unwrap();
    }
    let extended = states(&history);
    assert_eq!(extended.len(), original.len());
    assert_eq!(extended[..=k], original[..=k]);
    // Nothing was edited, so the tail replays identically too.
    assert_eq!(extended, original);
}

#[test]
fn scrubbing_past_the_end_records_every_tick() {
    let history = history(&[0]);
    history.scrub_to(4).unwrap();
    let ticks: Vec<u64> = states(&history).iter().map(|s| s.tick_count()).collect();
    assert_eq!(ticks, vec![0, 1, 2, 3, 4]);
    assert_eq!(history.actual_pos(), 4);
}

#[test]
fn anchored_rebuild_keeps_prefix_and_cursor() {
    let history = history(&[0]);
    history.scrub_to(6).unwrap();
    let original = states(&history);

    history.rebuild_from(3).unwrap();
    assert_eq!(states(&history), original);
    assert_eq!(history.actual_pos(), 3);

    history
        .set_environment_from(3, food_spec(0.0, 0.5, 0.2))
        .unwrap();
    let retuned = states(&history);
    assert_eq!(retuned.len(), original.len());
    assert_eq!(retuned[..=3], original[..=3]);
    assert_ne!(retuned[4], original[4]);
    let EnvironmentState::Food(field) = retuned[6].environment() else {
        panic!("field kind changed");
    };
    assert_eq!(field.moving_speed, 0.2);
}

#[test]
fn anchored_retune_rejects_other_field_kinds() {
    use creature_story::model::{EnvironmentSpec, StaticFieldSpec};

    let history = history(&[0]);
    history.scrub_to(3).unwrap();
    let before = states(&history);
    let err = history
        .set_environment_from(1, EnvironmentSpec::Static(StaticFieldSpec { objects: vec![] }))
        .unwrap_err();
    assert!(matches!(
        err,
        creature_story::HistoryError::IncompatibleHistory(_)
    ));
    assert_eq!(states(&history), before);
}

#[test]
fn change_creature_swaps_model_through_history() {
    let history = history(&[0, 1]);
    history.scrub_to(3).unwrap();
    history.change_creature(1, BLIND).unwrap();
    assert_eq!(history.len(), 4);
    for state in states(&history) {
        let creature = state.creature(1).unwrap();
        assert_eq!(creature.model_path, BLIND);
        assert_eq!(creature.sensors, creature_story::model::Sensors::Blind);
    }
    assert_eq!(history.creature_placement(1).unwrap().path, BLIND);
}

#[test]
fn readers_see_consistent_snapshots_while_ticking() {
    use std::sync::Arc;
    use std::thread;

    let history = Arc::new(history(&[0]));
    let reader = {
        let history = Arc::clone(&history);
        thread::spawn(move || {
            for _ in 0..200 {
                let (items, cursor) = history.snapshot();
                assert!(cursor < items.len());
                let actual = history.actual().unwrap();
                assert!(actual.creature_states().len() == 1);
            }
        })
    };
    for _ in 0..50 {
        history.tick().unwrap();
    }
    reader.join().unwrap();
    assert_eq!(history.len(), 51);
}

#[test]
fn cursor_moves_wait_for_a_rebuild_in_progress() {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use creature_story::config::HistoryConfig;
    use creature_story::history::HistoryPhase;
    use creature_story::rules::WorldKind;

    let vision = Arc::new(GatedVision::default());
    let history = Arc::new(
        WorldHistory::with_collaborators(
            definition(&[0]),
            catalog(),
            HistoryConfig {
                save_interval: 3,
                ..recording()
            },
            WorldKind::Food.rules(),
            vision.clone(),
        )
        .unwrap(),
    );
    history.scrub_to(5).unwrap();
    let recorded = states(&history);
    let ticks: Vec<u64> = recorded.iter().map(|s| s.tick_count()).collect();
    assert_eq!(ticks, vec![0, 3, 6, 9, 12, 15]);

    // One render seeds tick 0, then one per tick: park while computing tick 7.
    vision.arm(8);
    let rebuild = {
        let history = Arc::clone(&history);
        thread::spawn(move || history.rebuild())
    };
    vision.gate.wait();
    assert_eq!(history.phase(), HistoryPhase::Rebuilding);

    let mover = {
        let history = Arc::clone(&history);
        thread::spawn(move || history.shift(-1))
    };
    thread::sleep(Duration::from_millis(20));
    assert!(!mover.is_finished(), "cursor moved during a rebuild");
    vision.gate.wait();

    rebuild.join().unwrap().unwrap();
    assert_eq!(mover.join().unwrap(), 4);
    assert_eq!(states(&history), recorded);
    assert_eq!(history.actual_pos(), 4);
    assert_eq!(history.phase(), HistoryPhase::Idle);
}

#[test]
fn foreground_scrubs_interleave_with_simulation_ticks() {
    use std::sync::Arc;
    use std::thread;

    let history = Arc::new(history(&[0, 1]));
    let simulation = {
        let history = Arc::clone(&history);
        thread::spawn(move || {
            for _ in 0..120 {
                history.tick().unwrap();
            }
        })
    };
    for round in 0..60usize {
        match round % 4 {
            0 => history.scrub_to(round / 2).unwrap(),
            1 => {
                history.shift(-3);
            }
            2 => {
                history.step_back();
            }
            _ => history.move_to_end(),
        }
        let (items, cursor) = history.snapshot();
        assert!(cursor < items.len());
    }
    simulation.join().unwrap();

    // Every truncation resumed from the cursor, so the result is one unbroken replay.
    let recorded = states(&history);
    for (i, state) in recorded.iter().enumerate() {
        assert_eq!(state.tick_count(), i as u64);
    }
    let fresh = common::history(&[0, 1]);
    fresh.scrub_to(recorded.len() - 1).unwrap();
    assert_eq!(states(&fresh), recorded);
}
