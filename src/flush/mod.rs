//! Saving and loading histories.

mod json;
mod jsonl;

pub use json::{load_history, save_history};
pub use jsonl::{flush_to_jsonl, read_states_jsonl};
