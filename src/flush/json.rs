use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::HistoryError;
use crate::history::{SavedHistory, WorldHistory};

/// Write the whole history as one JSON document.
pub fn save_history(history: &WorldHistory, path: &Path) -> Result<(), HistoryError> {
    let saved = history.to_saved();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &saved)?;
    writer.flush()?;
    tracing::info!(path = %path.display(), states = saved.states.len(), "history saved");
    Ok(())
}

/// Read a history document written by [`save_history`] and validate it.
pub fn load_history(path: &Path) -> Result<SavedHistory, HistoryError> {
    let reader = BufReader::new(File::open(path)?);
    let saved: SavedHistory = serde_json::from_reader(reader)?;
    saved.validate()?;
    Ok(saved)
}
