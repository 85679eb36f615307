use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::HistoryError;
use crate::history::WorldHistory;
use crate::model::WorldState;

/// Write an iterator of serializable items to a JSONL file (one JSON object per line).
fn write_jsonl<T: Serialize>(path: &Path, items: impl Iterator<Item = T>) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for item in items {
        serde_json::to_writer(&mut writer, &item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Flush the recorded history to JSONL files in the given output directory.
///
/// Creates the output directory if it does not exist. Writes 2 files:
/// - `<states_list_name>.jsonl`: one snapshot per line, in history order
/// - `placements.jsonl`: the creature placements the history was seeded from
pub fn flush_to_jsonl(history: &WorldHistory, output_dir: &Path) -> Result<(), HistoryError> {
    fs::create_dir_all(output_dir)?;

    let (states, _) = history.snapshot();
    let list_name = &history.config().states_list_name;
    write_jsonl(
        &output_dir.join(format!("{list_name}.jsonl")),
        states.iter().map(|s| s.as_ref()),
    )?;
    write_jsonl(
        &output_dir.join("placements.jsonl"),
        history.definition().placements.iter(),
    )?;
    Ok(())
}

/// Read snapshots written by [`flush_to_jsonl`]. Blank lines are skipped.
pub fn read_states_jsonl(path: &Path) -> Result<Vec<WorldState>, HistoryError> {
    let reader = BufReader::new(File::open(path)?);
    let mut states = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let state: WorldState = serde_json::from_str(&line)?;
        state.validate()?;
        states.push(state);
    }
    Ok(states)
}
