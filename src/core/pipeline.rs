/// The story engine facade: event selection → script run → completion.
///
/// Wires together the eligibility table, its durable store and the
/// dialogue interpreter.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::config::{ConfigError, StageConfig};
use crate::core::eligibility::EventEligibilityEngine;
use crate::core::interpreter::{AdvanceOutcome, DialogueInterpreter};
use crate::core::store::{EligibilityStore, MemoryStore, RonFileStore, StoreError};
use crate::schema::calendar::{GameDate, GameStamp, Slot};
use crate::schema::event::{CatalogError, EventCatalogRow, EventFilter, GameEvent};
use crate::schema::identity::{IdentityRegistry, NameStore};
use crate::schema::line::{Script, ScriptError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("script error: {0}")]
    Script(#[from] ScriptError),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("unknown event: {0}")]
    UnknownEvent(String),
}

/// The event currently being played.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RunningEvent {
    id: String,
    completed: bool,
}

/// The top-level story engine. Built via `StoryEngine::builder()`.
pub struct StoryEngine {
    config: StageConfig,
    eligibility: EventEligibilityEngine,
    store: Box<dyn EligibilityStore>,
    interpreter: DialogueInterpreter,
    running: Option<RunningEvent>,
}

/// Builder for constructing a `StoryEngine`.
pub struct StoryEngineBuilder {
    config_path: Option<PathBuf>,
    identities_path: Option<PathBuf>,
    catalog_path: Option<PathBuf>,
    state_path: Option<PathBuf>,
    /// Directly provided config (for testing without files).
    config: Option<StageConfig>,
    /// Directly provided cast (for testing without files).
    identities: Option<IdentityRegistry>,
    names: Option<NameStore>,
    /// Directly provided catalog (for testing without files).
    catalog: Option<Vec<EventCatalogRow>>,
    store: Option<Box<dyn EligibilityStore>>,
}

impl StoryEngine {
    pub fn builder() -> StoryEngineBuilder {
        StoryEngineBuilder {
            config_path: None,
            identities_path: None,
            catalog_path: None,
            state_path: None,
            config: None,
            identities: None,
            names: None,
            catalog: None,
            store: None,
        }
    }

    /// Events that may be offered at `date`/`slot`, in catalog order.
    pub fn available(&self, date: &GameDate, slot: &Slot, filter: &EventFilter) -> Vec<&GameEvent> {
        self.eligibility.list_available(date, slot, filter)
    }

    /// Load `script` as the run for `event_id`.
    ///
    /// The event is not checked for offerability here; that decision
    /// belongs to whoever picked it from [`available`](Self::available).
    pub fn begin(&mut self, event_id: &str, script: Script) -> Result<(), EngineError> {
        if self.eligibility.get(event_id).is_none() {
            return Err(EngineError::UnknownEvent(event_id.to_string()));
        }
        if let Some(previous) = &self.running {
            if !previous.completed {
                log::warn!("abandoning unfinished run of {}", previous.id);
            }
        }
        log::info!("beginning {event_id}");
        self.interpreter.load(script);
        self.running = Some(RunningEvent {
            id: event_id.to_string(),
            completed: false,
        });
        Ok(())
    }

    pub fn advance(&mut self) -> AdvanceOutcome {
        self.interpreter.advance()
    }

    pub fn tick(&mut self, now_ms: u64) {
        self.interpreter.tick(now_ms);
    }

    /// Report a successful end of the running script.
    ///
    /// Marks the event completed and persists the table, once per run.
    /// Returns `Ok(false)` when no run is active, the script has lines
    /// left, or the run was already finished.
    pub fn finish(&mut self, at: GameStamp) -> Result<bool, EngineError> {
        let Some(running) = self.running.as_mut() else {
            log::warn!("finish called with no running event");
            return Ok(false);
        };
        if running.completed {
            return Ok(false);
        }
        if !self.interpreter.is_finished() {
            log::warn!("finish called before {} reached its end", running.id);
            return Ok(false);
        }
        if self.interpreter.scroll().is_scrolling() {
            log::warn!("{} finished while scrolling", running.id);
        }
        running.completed = true;
        let id = running.id.clone();
        self.eligibility.mark_completed_on(&id, at);
        self.eligibility.persist(&mut *self.store)?;
        Ok(true)
    }

    /// Re-read eligibility state from the store.
    pub fn reload(&mut self) {
        self.eligibility.reload(&*self.store);
    }

    /// Id of the event being played, if any.
    pub fn running_event(&self) -> Option<&str> {
        self.running.as_ref().map(|r| r.id.as_str())
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn eligibility(&self) -> &EventEligibilityEngine {
        &self.eligibility
    }

    pub fn eligibility_mut(&mut self) -> &mut EventEligibilityEngine {
        &mut self.eligibility
    }

    pub fn interpreter(&self) -> &DialogueInterpreter {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut DialogueInterpreter {
        &mut self.interpreter
    }
}

impl StoryEngineBuilder {
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn identities_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.identities_path = Some(path.into());
        self
    }

    pub fn catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    /// Keep eligibility state in a RON file at `path`.
    pub fn state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }

    /// Provide config directly (for testing without files).
    pub fn with_config(mut self, config: StageConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Provide the cast directly (for testing without files).
    pub fn with_identities(mut self, identities: IdentityRegistry) -> Self {
        self.identities = Some(identities);
        self
    }

    pub fn with_names(mut self, names: NameStore) -> Self {
        self.names = Some(names);
        self
    }

    /// Provide catalog rows directly (for testing without files).
    pub fn with_catalog(mut self, rows: Vec<EventCatalogRow>) -> Self {
        self.catalog = Some(rows);
        self
    }

    /// Use `store` for eligibility state. Takes precedence over `state_path`.
    pub fn with_store(mut self, store: impl EligibilityStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn build(self) -> Result<StoryEngine, EngineError> {
        let config = match (self.config, &self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => StageConfig::load_from_ron(path)?,
            (None, None) => StageConfig::default(),
        };

        let identities = match (self.identities, &self.identities_path) {
            (Some(identities), _) => identities,
            (None, Some(path)) => IdentityRegistry::load_from_ron(path)?,
            (None, None) => IdentityRegistry::new(),
        };

        // A missing catalog file is an empty catalog; a broken one is an error.
        let catalog = match (self.catalog, &self.catalog_path) {
            (Some(rows), _) => rows,
            (None, Some(path)) if path.exists() => EventCatalogRow::load_from_ron(path)?,
            (None, Some(path)) => {
                log::warn!("no event catalog at {}; no events will be offered", path.display());
                Vec::new()
            }
            (None, None) => Vec::new(),
        };

        let store: Box<dyn EligibilityStore> = match (self.store, self.state_path) {
            (Some(store), _) => store,
            (None, Some(path)) => Box::new(RonFileStore::new(path)),
            (None, None) => Box::new(MemoryStore::new()),
        };

        let mut eligibility = EventEligibilityEngine::new(config.slots.clone());
        eligibility.load(&catalog, &[]);
        eligibility.reload(&*store);

        let interpreter =
            DialogueInterpreter::new(&config, identities, self.names.unwrap_or_default());

        Ok(StoryEngine {
            config,
            eligibility,
            store,
            interpreter,
            running: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::line::DialogueLine;

    fn catalog() -> Vec<EventCatalogRow> {
        vec![EventCatalogRow {
            id: "rooftop".to_string(),
            start: "6 1 朝".to_string(),
            end: "6 1 朝".to_string(),
            slots: "朝".to_string(),
            heroine: "Aoi".to_string(),
            location: "school".to_string(),
            title: "Rooftop".to_string(),
        }]
    }

    fn script() -> Script {
        Script::compile(vec![DialogueLine::new("Aoi", "Hello."), DialogueLine::new("Aoi", "Bye.")])
    }

    fn stamp() -> GameStamp {
        GameStamp::new(GameDate::new(2024, 6, 1), "朝")
    }

    #[test]
    fn build_with_defaults() {
        let engine = StoryEngine::builder().build().unwrap();
        assert!(engine.eligibility().events().is_empty());
        assert_eq!(engine.config(), &StageConfig::default());
        assert!(engine.running_event().is_none());
    }

    #[test]
    fn missing_catalog_file_is_empty() {
        let engine = StoryEngine::builder()
            .catalog_path("does/not/exist.ron")
            .build()
            .unwrap();
        assert!(engine.eligibility().events().is_empty());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let result = StoryEngine::builder().config_path("does/not/exist.ron").build();
        assert!(matches!(result, Err(EngineError::Config(ConfigError::Io(_)))));
    }

    #[test]
    fn begin_rejects_unknown_event() {
        let mut engine = StoryEngine::builder().with_catalog(catalog()).build().unwrap();
        let err = engine.begin("nope", script()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownEvent(id) if id == "nope"));
    }

    #[test]
    fn finish_marks_completion_once() {
        let mut engine = StoryEngine::builder().with_catalog(catalog()).build().unwrap();
        let date = GameDate::new(2024, 6, 1);
        let morning = Slot::from("朝");
        assert_eq!(engine.available(&date, &morning, &EventFilter::any()).len(), 1);

        engine.begin("rooftop", script()).unwrap();
        assert!(engine.advance().waits_for_input);
        assert!(!engine.finish(stamp()).unwrap());
        assert!(engine.advance().waits_for_input);
        assert!(!engine.advance().waits_for_input);

        assert!(engine.finish(stamp()).unwrap());
        assert!(!engine.finish(stamp()).unwrap());
        let event = engine.eligibility().get("rooftop").unwrap();
        assert_eq!(event.completion_count, 1);
        assert_eq!(event.last_executed_at, Some(stamp()));
        assert!(engine.available(&date, &morning, &EventFilter::any()).is_empty());
    }

    #[test]
    fn finish_without_run_is_false() {
        let mut engine = StoryEngine::builder().build().unwrap();
        assert!(!engine.finish(stamp()).unwrap());
    }

    #[test]
    fn reload_restores_persisted_state() {
        let mut engine = StoryEngine::builder().with_catalog(catalog()).build().unwrap();
        engine.begin("rooftop", Script::default()).unwrap();
        assert!(engine.finish(stamp()).unwrap());

        engine.eligibility_mut().apply_state(&[]);
        assert_eq!(engine.eligibility().get("rooftop").unwrap().completion_count, 0);
        engine.reload();
        assert_eq!(engine.eligibility().get("rooftop").unwrap().completion_count, 1);
    }
}
