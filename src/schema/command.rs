/// Director commands embedded in dialogue text.
///
/// Commands are underscore-delimited with fixed literal prefixes:
/// - `_CHARA_NEW_<name>_<x>_<y>`
/// - `_CHARA_HIDE_<name>`
/// - `_MOVE_<x>_<y>_<ms>[_<zoom>]` (target is the line's speaker)
/// - `_BG_SHOW_<name>_<x>_<y>_<zoom>`
/// - `_BG_MOVE_<dx>_<dy>_<ms>[_<zoom>]`
/// - `_SCROLL_START` / `_SCROLL_STOP`
///
/// Missing or non-numeric parameters never fail the parse; they take the
/// defaults below.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Normalized position used when a show/move position is malformed.
pub const DEFAULT_POSITION: (f64, f64) = (0.5, 0.5);
/// Tween duration used when a move duration is malformed.
pub const DEFAULT_DURATION_MS: i64 = 600;
/// Zoom used when a zoom parameter is missing or malformed.
pub const DEFAULT_ZOOM: f64 = 1.0;

const CHARA_NEW: &str = "_CHARA_NEW_";
const CHARA_HIDE: &str = "_CHARA_HIDE_";
const MOVE: &str = "_MOVE_";
const BG_SHOW: &str = "_BG_SHOW_";
const BG_MOVE: &str = "_BG_MOVE_";
const SCROLL_START: &str = "_SCROLL_START";
const SCROLL_STOP: &str = "_SCROLL_STOP";

/// Fields in `_BG_MOVE_<dx>_<dy>_<ms>` counting the leading empty field.
const BG_MOVE_MIN_FIELDS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{0} is missing its target name")]
    MissingName(&'static str),
    #[error("{prefix} needs at least {needed} fields, got {got}")]
    TooFewFields {
        prefix: &'static str,
        needed: usize,
        got: usize,
    },
}

/// A scene instruction decoded from a line's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DirectorCommand {
    CharacterShow {
        name: String,
        x: f64,
        y: f64,
    },
    CharacterHide {
        name: String,
    },
    CharacterMove {
        name: String,
        x: f64,
        y: f64,
        duration_ms: i64,
        zoom: f64,
    },
    BackgroundShow {
        name: String,
        x: f64,
        y: f64,
        zoom: f64,
    },
    BackgroundMove {
        dx: f64,
        dy: f64,
        duration_ms: i64,
        zoom: f64,
    },
    ScrollStart,
    ScrollStop,
}

impl DirectorCommand {
    /// Classify `text`. Returns `None` for plain dialogue, otherwise the
    /// decoded command or the reason the line cannot be executed.
    pub fn parse(text: &str, speaker: &str) -> Option<Result<DirectorCommand, CommandError>> {
        if text == SCROLL_START {
            return Some(Ok(DirectorCommand::ScrollStart));
        }
        if text == SCROLL_STOP {
            return Some(Ok(DirectorCommand::ScrollStop));
        }

        let prefix = [CHARA_NEW, CHARA_HIDE, MOVE, BG_SHOW, BG_MOVE]
            .into_iter()
            .find(|p| text.starts_with(p))?;
        let fields: Vec<&str> = text.split('_').collect();

        Some(match prefix {
            CHARA_NEW => Self::parse_chara_new(&fields),
            CHARA_HIDE => Self::parse_chara_hide(&fields),
            MOVE => Self::parse_move(&fields, speaker),
            BG_SHOW => Self::parse_bg_show(&fields),
            _ => Self::parse_bg_move(&fields),
        })
    }

    // _CHARA_NEW_<name>_<x>_<y> → ["", "CHARA", "NEW", name, x, y]
    fn parse_chara_new(fields: &[&str]) -> Result<DirectorCommand, CommandError> {
        let name = name_field(fields, 3).ok_or(CommandError::MissingName(CHARA_NEW))?;
        let (x, y) = position(fields, 4);
        Ok(DirectorCommand::CharacterShow { name, x, y })
    }

    // _CHARA_HIDE_<name> → ["", "CHARA", "HIDE", name]
    fn parse_chara_hide(fields: &[&str]) -> Result<DirectorCommand, CommandError> {
        let name = name_field(fields, 3).ok_or(CommandError::MissingName(CHARA_HIDE))?;
        Ok(DirectorCommand::CharacterHide { name })
    }

    // _MOVE_<x>_<y>_<ms>[_<zoom>] → ["", "MOVE", x, y, ms, zoom?]
    fn parse_move(fields: &[&str], speaker: &str) -> Result<DirectorCommand, CommandError> {
        let name = speaker.trim();
        if name.is_empty() {
            return Err(CommandError::MissingName(MOVE));
        }
        let (x, y) = position(fields, 2);
        Ok(DirectorCommand::CharacterMove {
            name: name.to_string(),
            x,
            y,
            duration_ms: duration(fields, 4),
            zoom: zoom(fields, 5),
        })
    }

    // _BG_SHOW_<name>_<x>_<y>_<zoom> → ["", "BG", "SHOW", name, x, y, zoom]
    fn parse_bg_show(fields: &[&str]) -> Result<DirectorCommand, CommandError> {
        let name = name_field(fields, 3).ok_or(CommandError::MissingName(BG_SHOW))?;
        let (x, y) = position(fields, 4);
        Ok(DirectorCommand::BackgroundShow {
            name,
            x,
            y,
            zoom: zoom(fields, 6),
        })
    }

    // _BG_MOVE_<dx>_<dy>_<ms>[_<zoom>] → ["", "BG", "MOVE", dx, dy, ms, zoom?]
    fn parse_bg_move(fields: &[&str]) -> Result<DirectorCommand, CommandError> {
        if fields.len() < BG_MOVE_MIN_FIELDS {
            return Err(CommandError::TooFewFields {
                prefix: BG_MOVE,
                needed: BG_MOVE_MIN_FIELDS,
                got: fields.len(),
            });
        }
        Ok(DirectorCommand::BackgroundMove {
            dx: number(fields, 3).unwrap_or(0.0),
            dy: number(fields, 4).unwrap_or(0.0),
            duration_ms: duration(fields, 5),
            zoom: zoom(fields, 6),
        })
    }

    /// The name of the prefix this command is written with.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::CharacterShow { .. } => CHARA_NEW,
            Self::CharacterHide { .. } => CHARA_HIDE,
            Self::CharacterMove { .. } => MOVE,
            Self::BackgroundShow { .. } => BG_SHOW,
            Self::BackgroundMove { .. } => BG_MOVE,
            Self::ScrollStart => SCROLL_START,
            Self::ScrollStop => SCROLL_STOP,
        }
    }
}

fn name_field(fields: &[&str], index: usize) -> Option<String> {
    fields
        .get(index)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number(fields: &[&str], index: usize) -> Option<f64> {
    fields
        .get(index)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Both coordinates must parse, otherwise the whole position defaults.
fn position(fields: &[&str], index: usize) -> (f64, f64) {
    match (number(fields, index), number(fields, index + 1)) {
        (Some(x), Some(y)) => (x, y),
        _ => DEFAULT_POSITION,
    }
}

fn duration(fields: &[&str], index: usize) -> i64 {
    number(fields, index)
        .map(|ms| ms.round() as i64)
        .unwrap_or(DEFAULT_DURATION_MS)
}

fn zoom(fields: &[&str], index: usize) -> f64 {
    number(fields, index).unwrap_or(DEFAULT_ZOOM)
}
