//! Recorded world history: the snapshot list, selection tracking and the
//! orchestration that keeps live state in step with the cursor.

pub mod actual_list;
pub mod saved;
pub mod selection;
pub mod world_history;

pub use actual_list::ActualList;
pub use saved::SavedHistory;
pub use selection::{NO_SELECTION, SelectionTracker};
pub use world_history::{HistoryPhase, WorldHistory};
