//! Story Engine — the run-time core of a visual novel.
//!
//! Steps through dialogue scripts whose lines double as director commands
//! (character entrances, moves and exits, background framing, scrolling
//! text), tweens the resulting stage transforms against a frame clock, and
//! decides which calendar-bound story events can be offered to the player.

pub mod core;
pub mod schema;

