use rustc_hash::FxHashSet;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::calendar::{DateMarker, GameDate, GameStamp, Slot, SlotTable};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// A row of the authored event catalog, exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCatalogRow {
    pub id: String,
    /// `"<month> <day> <slot>"`
    pub start: String,
    /// `"<month> <day> <slot>"`
    pub end: String,
    /// `;`-separated slot names.
    pub slots: String,
    pub heroine: String,
    pub location: String,
    pub title: String,
}

impl EventCatalogRow {
    /// Load a RON list of catalog rows. Rows that do not deserialize are
    /// skipped with a warning.
    pub fn load_from_ron(path: &Path) -> Result<Vec<EventCatalogRow>, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(parse_rows_lenient(&contents)?)
    }
}

fn default_active() -> bool {
    true
}

/// Mutable per-event play state, persisted separately from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStateRow {
    pub id: String,
    #[serde(default)]
    pub completion_count: u32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub last_executed_at: Option<GameStamp>,
}

impl EventStateRow {
    /// The state of an event nobody has played yet.
    pub fn fresh(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            completion_count: 0,
            active: true,
            last_executed_at: None,
        }
    }
}

/// A story event the map layer can offer to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: String,
    pub start: DateMarker,
    pub end: DateMarker,
    pub slots: FxHashSet<Slot>,
    pub heroine: String,
    pub location: String,
    pub title: String,
    pub completion_count: u32,
    pub active: bool,
    pub last_executed_at: Option<GameStamp>,
}

impl GameEvent {
    /// Build an event from its catalog row, in the fresh state.
    pub fn from_row(row: &EventCatalogRow, slots: &SlotTable) -> Self {
        Self {
            id: row.id.clone(),
            start: DateMarker::parse_or_fallback(&row.start, slots),
            end: DateMarker::parse_or_fallback(&row.end, slots),
            slots: parse_slot_list(&row.slots),
            heroine: row.heroine.clone(),
            location: row.location.clone(),
            title: row.title.clone(),
            completion_count: 0,
            active: true,
            last_executed_at: None,
        }
    }

    pub fn apply_state(&mut self, row: &EventStateRow) {
        self.completion_count = row.completion_count;
        self.active = row.active;
        self.last_executed_at = row.last_executed_at.clone();
    }

    pub fn state_row(&self) -> EventStateRow {
        EventStateRow {
            id: self.id.clone(),
            completion_count: self.completion_count,
            active: self.active,
            last_executed_at: self.last_executed_at.clone(),
        }
    }

    /// `(month, day)` inside `[start, end]`, inclusive, year ignored.
    ///
    /// A window whose start falls after its end is treated as empty.
    pub fn in_window(&self, date: &GameDate) -> bool {
        let today = date.month_day();
        self.start.month_day() <= today && today <= self.end.month_day()
    }

    /// Whether the event may be surfaced to the player right now.
    pub fn is_offerable(&self, date: &GameDate, slot: &Slot) -> bool {
        self.active
            && self.completion_count == 0
            && self.in_window(date)
            && self.slots.contains(slot)
    }
}

/// Split a `;`-separated slot list, dropping empty entries.
pub fn parse_slot_list(input: &str) -> FxHashSet<Slot> {
    input
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Slot::from)
        .collect()
}

/// Optional exact-match filters for listing events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub location: Option<String>,
    pub heroine: Option<String>,
}

impl EventFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn at_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_heroine(mut self, heroine: impl Into<String>) -> Self {
        self.heroine = Some(heroine.into());
        self
    }

    pub fn matches(&self, event: &GameEvent) -> bool {
        self.location.as_deref().map_or(true, |l| l == event.location)
            && self.heroine.as_deref().map_or(true, |h| h == event.heroine)
    }
}

/// Parse a RON list, skipping entries that do not deserialize into `T`.
///
/// Only a file that is not a RON list at all is an error.
pub fn parse_rows_lenient<T: DeserializeOwned>(
    input: &str,
) -> Result<Vec<T>, ron::error::SpannedError> {
    let values: Vec<ron::Value> = ron::from_str(input)?;
    let total = values.len();
    let rows: Vec<T> = values
        .into_iter()
        .enumerate()
        .filter_map(|(i, value)| match value.into_rust::<T>() {
            Ok(row) => Some(row),
            Err(e) => {
                log::warn!("skipping corrupt row {i}: {e}");
                None
            }
        })
        .collect();
    if rows.len() < total {
        log::warn!("kept {} of {} rows", rows.len(), total);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, start: &str, end: &str, slots: &str) -> EventCatalogRow {
        EventCatalogRow {
            id: id.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            slots: slots.to_string(),
            heroine: "Aoi".to_string(),
            location: "school".to_string(),
            title: "Rooftop lunch".to_string(),
        }
    }

    #[test]
    fn slot_list_splits_and_trims() {
        let slots = parse_slot_list("朝; 昼;;夕 ");
        assert_eq!(slots.len(), 3);
        assert!(slots.contains(&Slot::from("昼")));
        assert!(slots.contains(&Slot::from("夕")));
        assert!(parse_slot_list("").is_empty());
    }

    #[test]
    fn from_row_parses_markers() {
        let event = GameEvent::from_row(&row("e1", "6 1 朝", "6 30 夜", "朝;夕"), &SlotTable::default());
        assert_eq!(event.start, DateMarker::new(6, 1, "朝"));
        assert_eq!(event.end, DateMarker::new(6, 30, "夜"));
        assert_eq!(event.completion_count, 0);
        assert!(event.active);
    }

    #[test]
    fn offerable_single_day_window() {
        let mut event = GameEvent::from_row(&row("e1", "6 1 朝", "6 1 朝", "朝"), &SlotTable::default());
        let morning = Slot::from("朝");
        assert!(event.is_offerable(&GameDate::new(2024, 6, 1), &morning));
        assert!(event.is_offerable(&GameDate::new(1999, 6, 1), &morning));
        assert!(!event.is_offerable(&GameDate::new(2024, 6, 2), &morning));
        assert!(!event.is_offerable(&GameDate::new(2024, 6, 1), &Slot::from("夜")));

        event.completion_count = 1;
        assert!(!event.is_offerable(&GameDate::new(2024, 6, 1), &morning));
    }

    #[test]
    fn inactive_event_is_never_offerable() {
        let mut event = GameEvent::from_row(&row("e1", "1 1 朝", "12 31 夜", "朝"), &SlotTable::default());
        event.active = false;
        assert!(!event.is_offerable(&GameDate::new(2024, 6, 1), &Slot::from("朝")));
    }

    #[test]
    fn window_spans_months_inclusively() {
        let event = GameEvent::from_row(&row("e1", "6 20 朝", "7 5 朝", "昼"), &SlotTable::default());
        assert!(event.in_window(&GameDate::new(2024, 6, 20)));
        assert!(event.in_window(&GameDate::new(2024, 6, 31)));
        assert!(event.in_window(&GameDate::new(2024, 7, 5)));
        assert!(!event.in_window(&GameDate::new(2024, 7, 6)));
        assert!(!event.in_window(&GameDate::new(2024, 6, 19)));
    }

    #[test]
    fn inverted_window_is_empty() {
        let event = GameEvent::from_row(&row("e1", "12 20 朝", "1 5 朝", "朝"), &SlotTable::default());
        assert!(!event.in_window(&GameDate::new(2024, 12, 25)));
        assert!(!event.in_window(&GameDate::new(2025, 1, 2)));
    }

    #[test]
    fn filter_matches_exactly() {
        let event = GameEvent::from_row(&row("e1", "6 1 朝", "6 1 朝", "朝"), &SlotTable::default());
        assert!(EventFilter::any().matches(&event));
        assert!(EventFilter::any().at_location("school").matches(&event));
        assert!(!EventFilter::any().at_location("School").matches(&event));
        assert!(EventFilter::any().with_heroine("Aoi").at_location("school").matches(&event));
        assert!(!EventFilter::any().with_heroine("Mio").matches(&event));
    }

    #[test]
    fn lenient_parse_skips_corrupt_rows() {
        let input = r#"[
            (id: "a", completion_count: 1, active: true),
            (id: "b", completion_count: -4),
            (id: "c"),
            (nonsense: 3),
        ]"#;
        let rows: Vec<EventStateRow> = parse_rows_lenient(input).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "a");
        assert_eq!(rows[0].completion_count, 1);
        assert_eq!(rows[1], EventStateRow::fresh("c"));
    }

    #[test]
    fn lenient_parse_rejects_non_list() {
        assert!(parse_rows_lenient::<EventStateRow>("(id: \"a\")").is_err());
    }

    #[test]
    fn state_row_round_trip_through_event() {
        let mut event = GameEvent::from_row(&row("e1", "6 1 朝", "6 1 朝", "朝"), &SlotTable::default());
        let state = EventStateRow {
            id: "e1".to_string(),
            completion_count: 2,
            active: false,
            last_executed_at: Some(GameStamp::new(GameDate::new(2024, 6, 1), "朝")),
        };
        event.apply_state(&state);
        assert_eq!(event.state_row(), state);
    }
}
