//! WASM bindings for story-engine — powers the browser demo.
//!
//! Everything crosses the boundary as JSON strings, except data files,
//! which stay in RON.

use wasm_bindgen::prelude::*;

use story_engine::core::animation::EntityTransform;
use story_engine::core::config::{Rgba, StageConfig};
use story_engine::core::interpreter::DisplayedLine;
use story_engine::core::pipeline::StoryEngine;
use story_engine::core::scroll::{BacklogEntry, ScrollBlock};
use story_engine::core::store::MemoryStore;
use story_engine::schema::calendar::{GameDate, GameStamp, Slot};
use story_engine::schema::event::{parse_rows_lenient, EventCatalogRow, EventFilter};
use story_engine::schema::identity::IdentityRegistry;
use story_engine::schema::line::{Expression, Script};

// ---------------------------------------------------------------------------
// Embedded demo data — compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const CONFIG: &str = include_str!("../../tests/fixtures/config.ron");
    pub const CAST: &str = include_str!("../../tests/fixtures/cast.ron");
    pub const CATALOG: &str = include_str!("../../tests/fixtures/catalog.ron");
    pub const SCRIPT: &str = include_str!("../../tests/fixtures/script.ron");
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Deserialize)]
struct MomentInput {
    year: u32,
    month: u32,
    day: u32,
    slot: String,
    location: Option<String>,
    heroine: Option<String>,
}

#[derive(serde::Serialize)]
struct EventInfo<'a> {
    id: &'a str,
    title: &'a str,
    heroine: &'a str,
    location: &'a str,
}

#[derive(serde::Serialize)]
struct CharacterFrame<'a> {
    name: &'a str,
    transform: &'a EntityTransform,
    expression: Option<&'a Expression>,
}

#[derive(serde::Serialize)]
struct Frame<'a> {
    waits_for_input: bool,
    finished: bool,
    line: Option<&'a DisplayedLine>,
    characters: Vec<CharacterFrame<'a>>,
    background: Option<&'a str>,
    background_transform: &'a EntityTransform,
    background_fill: Option<Rgba>,
    scroll: Vec<&'a ScrollBlock>,
    backlog: &'a [BacklogEntry],
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------
fn parse_moment(json: &str) -> Result<(GameStamp, EventFilter), JsError> {
    let input: MomentInput =
        serde_json::from_str(json).map_err(|e| JsError::new(&format!("Invalid moment JSON: {e}")))?;
    let mut filter = EventFilter::any();
    if let Some(location) = input.location {
        filter = filter.at_location(location);
    }
    if let Some(heroine) = input.heroine {
        filter = filter.with_heroine(heroine);
    }
    let stamp = GameStamp::new(GameDate::new(input.year, input.month, input.day), Slot::new(input.slot));
    Ok((stamp, filter))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

// ---------------------------------------------------------------------------
// The demo handle
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct StoryDemo {
    engine: StoryEngine,
    last_waits: bool,
}

#[wasm_bindgen]
impl StoryDemo {
    /// Create a demo from RON config, cast and catalog sources. State is
    /// kept in memory for the lifetime of the page.
    #[wasm_bindgen(constructor)]
    pub fn new(config_ron: &str, cast_ron: &str, catalog_ron: &str) -> Result<StoryDemo, JsError> {
        let config = if config_ron.trim().is_empty() {
            StageConfig::default()
        } else {
            StageConfig::parse_ron(config_ron).map_err(|e| JsError::new(&format!("Config parse error: {e}")))?
        };
        let cast = IdentityRegistry::parse_ron(cast_ron)
            .map_err(|e| JsError::new(&format!("Cast parse error: {e}")))?;
        let catalog: Vec<EventCatalogRow> = parse_rows_lenient(catalog_ron)
            .map_err(|e| JsError::new(&format!("Catalog parse error: {e}")))?;

        let engine = StoryEngine::builder()
            .with_config(config)
            .with_identities(cast)
            .with_catalog(catalog)
            .with_store(MemoryStore::new())
            .build()
            .map_err(|e| JsError::new(&format!("Engine build error: {e}")))?;

        Ok(StoryDemo {
            engine,
            last_waits: false,
        })
    }

    /// A demo over the bundled sample cast and catalog.
    pub fn sample() -> Result<StoryDemo, JsError> {
        Self::new(data::CONFIG, data::CAST, data::CATALOG)
    }

    /// The bundled sample script, as RON.
    pub fn sample_script() -> String {
        data::SCRIPT.to_string()
    }

    /// Events offerable at `{year, month, day, slot, location?, heroine?}`.
    pub fn available(&self, moment_json: &str) -> Result<String, JsError> {
        let (stamp, filter) = parse_moment(moment_json)?;
        let events: Vec<EventInfo<'_>> = self
            .engine
            .available(&stamp.date, &stamp.slot, &filter)
            .into_iter()
            .map(|e| EventInfo {
                id: &e.id,
                title: &e.title,
                heroine: &e.heroine,
                location: &e.location,
            })
            .collect();
        to_json(&events)
    }

    /// Start `event_id` with a RON script.
    pub fn begin(&mut self, event_id: &str, script_ron: &str) -> Result<(), JsError> {
        let script = Script::parse_ron(script_ron).map_err(|e| JsError::new(&format!("Script parse error: {e}")))?;
        self.engine
            .begin(event_id, script)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.last_waits = false;
        Ok(())
    }

    /// Advance and return the resulting frame as JSON.
    pub fn advance(&mut self) -> Result<String, JsError> {
        self.last_waits = self.engine.advance().waits_for_input;
        self.frame()
    }

    /// Feed the frame clock, e.g. from `requestAnimationFrame`.
    pub fn tick(&mut self, now_ms: f64) {
        self.engine.tick(now_ms.max(0.0) as u64);
    }

    /// Everything the page needs to draw the current state.
    pub fn frame(&self) -> Result<String, JsError> {
        let interp = self.engine.interpreter();
        let stage = interp.stage();
        let characters = stage
            .active_names()
            .into_iter()
            .filter_map(|name| {
                stage.transform(name).map(|transform| CharacterFrame {
                    name,
                    transform,
                    expression: interp.expression(name),
                })
            })
            .collect();
        let frame = Frame {
            waits_for_input: self.last_waits,
            finished: interp.is_finished(),
            line: interp.current_line(),
            characters,
            background: stage.background_name(),
            background_transform: stage.background(),
            background_fill: stage.background_fill(),
            scroll: interp.scroll().visible_blocks().collect(),
            backlog: interp.backlog(),
        };
        to_json(&frame)
    }

    /// Record the running event as completed at the given moment.
    pub fn finish(&mut self, moment_json: &str) -> Result<bool, JsError> {
        let (stamp, _) = parse_moment(moment_json)?;
        self.engine
            .finish(stamp)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Current eligibility state rows as JSON.
    pub fn state(&self) -> Result<String, JsError> {
        to_json(&self.engine.eligibility().state_rows())
    }
}
