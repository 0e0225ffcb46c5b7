/// In-game calendar values — dates, time-of-day slots and window markers.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Month used when a window marker cannot be parsed.
pub const FALLBACK_MONTH: u32 = 6;
/// Day used when a window marker cannot be parsed.
pub const FALLBACK_DAY: u32 = 1;

/// A calendar date inside the game world.
///
/// Eligibility windows compare only `(month, day)`; the year is carried
/// for display and bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameDate {
    pub year: u32,
    pub month: u32,
    pub day: u32,
}

impl GameDate {
    pub fn new(year: u32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    pub fn month_day(&self) -> (u32, u32) {
        (self.month, self.day)
    }
}

impl fmt::Display for GameDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:02}/{:02}", self.year, self.month, self.day)
    }
}

/// A named time-of-day bucket (朝, 昼, 夕, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(pub String);

impl Slot {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Slot {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A date plus slot, used to record when an event was last played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStamp {
    pub date: GameDate,
    pub slot: Slot,
}

impl GameStamp {
    pub fn new(date: GameDate, slot: impl Into<Slot>) -> Self {
        Self {
            date,
            slot: slot.into(),
        }
    }
}

/// The ordered list of slots a game defines. The first entry is the
/// fallback slot for unparseable markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotTable {
    slots: Vec<Slot>,
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new(["朝", "昼", "夕", "夜"].into_iter().map(Slot::from).collect())
    }
}

impl SlotTable {
    pub fn new(slots: Vec<Slot>) -> Self {
        Self { slots }
    }

    pub fn first(&self) -> Option<&Slot> {
        self.slots.first()
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.slots.iter().any(|s| s.as_str() == slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkerError {
    #[error("expected '<month> <day> <slot>', got '{0}'")]
    Shape(String),
    #[error("invalid month '{0}'")]
    Month(String),
    #[error("invalid day '{0}'")]
    Day(String),
    #[error("undefined slot '{0}'")]
    Slot(String),
}

/// One end of an event's eligibility window: `"<month> <day> <slot>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateMarker {
    pub month: u32,
    pub day: u32,
    pub slot: Slot,
}

impl DateMarker {
    pub fn new(month: u32, day: u32, slot: impl Into<Slot>) -> Self {
        Self {
            month,
            day,
            slot: slot.into(),
        }
    }

    /// Strict parse. The slot must be one of `slots`.
    pub fn parse(input: &str, slots: &SlotTable) -> Result<DateMarker, MarkerError> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let [month, day, slot] = parts.as_slice() else {
            return Err(MarkerError::Shape(input.to_string()));
        };
        Ok(DateMarker {
            month: parse_month(month)?,
            day: parse_day(day)?,
            slot: parse_slot(slot, slots)?,
        })
    }

    /// Lenient parse. Each field that is missing or malformed takes its own
    /// default (month 6, day 1, first slot); the others are kept.
    pub fn parse_or_fallback(input: &str, slots: &SlotTable) -> DateMarker {
        let mut parts = input.split_whitespace();
        let mut next = || parts.next().ok_or_else(|| MarkerError::Shape(input.to_string()));
        let fallback = Self::fallback(slots);

        let month = field_or(next().and_then(parse_month), fallback.month);
        let day = field_or(next().and_then(parse_day), fallback.day);
        let slot = field_or(next().and_then(|s| parse_slot(s, slots)), fallback.slot);
        if next().is_ok() {
            log::warn!("date marker '{input}': ignoring trailing fields");
        }

        DateMarker { month, day, slot }
    }

    pub fn fallback(slots: &SlotTable) -> DateMarker {
        DateMarker {
            month: FALLBACK_MONTH,
            day: FALLBACK_DAY,
            slot: slots.first().cloned().unwrap_or_default(),
        }
    }

    pub fn month_day(&self) -> (u32, u32) {
        (self.month, self.day)
    }
}

fn parse_month(field: &str) -> Result<u32, MarkerError> {
    field
        .parse::<u32>()
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| MarkerError::Month(field.to_string()))
}

fn parse_day(field: &str) -> Result<u32, MarkerError> {
    field
        .parse::<u32>()
        .ok()
        .filter(|d| (1..=31).contains(d))
        .ok_or_else(|| MarkerError::Day(field.to_string()))
}

fn parse_slot(field: &str, slots: &SlotTable) -> Result<Slot, MarkerError> {
    if slots.contains(field) {
        Ok(Slot::from(field))
    } else {
        Err(MarkerError::Slot(field.to_string()))
    }
}

fn field_or<T>(parsed: Result<T, MarkerError>, default: T) -> T {
    parsed.unwrap_or_else(|e| {
        log::warn!("date marker: {e}; using default");
        default
    })
}
