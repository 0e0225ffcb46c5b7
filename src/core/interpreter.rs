/// Dialogue interpreter — steps through a compiled script, executing
/// director commands and surfacing dialogue for display.
///
/// Consecutive command lines are chained inside one [`DialogueInterpreter::advance`]
/// call with an explicit loop, so a script of any length never grows the stack.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::animation::AnimationEngine;
use crate::core::config::StageConfig;
use crate::core::scroll::{BacklogEntry, ScrollManager};
use crate::schema::command::DirectorCommand;
use crate::schema::identity::{IdentityRegistry, NameStore};
use crate::schema::line::{DialogueLine, Expression, Script, StepKind};

/// Result of one advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceOutcome {
    /// True when the cursor stopped on dialogue and the player must act.
    pub waits_for_input: bool,
}

impl AdvanceOutcome {
    const WAIT: AdvanceOutcome = AdvanceOutcome {
        waits_for_input: true,
    };
    const DONE: AdvanceOutcome = AdvanceOutcome {
        waits_for_input: false,
    };
}

/// The line handed to the text box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayedLine {
    pub speaker: String,
    pub display_name: String,
    pub text: String,
}

pub struct DialogueInterpreter {
    script: Script,
    /// Index of the line last executed; `None` before the first advance.
    cursor: Option<usize>,
    identities: IdentityRegistry,
    names: NameStore,
    stage: AnimationEngine,
    scroll: ScrollManager,
    /// Set by `_SCROLL_START`; dialogue goes to the scroll until `_SCROLL_STOP`.
    scroll_routing: bool,
    expressions: FxHashMap<String, Expression>,
    current: Option<DisplayedLine>,
    backlog: Vec<BacklogEntry>,
}

impl DialogueInterpreter {
    pub fn new(config: &StageConfig, identities: IdentityRegistry, names: NameStore) -> Self {
        Self {
            script: Script::default(),
            cursor: None,
            identities,
            names,
            stage: AnimationEngine::new(config),
            scroll: ScrollManager::new(),
            scroll_routing: false,
            expressions: FxHashMap::default(),
            current: None,
            backlog: Vec::new(),
        }
    }

    /// Start a new run. Stage transforms and remembered expressions from the
    /// previous run are dropped; an open scroll carries over until stopped.
    pub fn load(&mut self, script: Script) {
        if self.scroll.is_scrolling() {
            log::warn!(
                "new script loaded while scrolling; {} blocks stay open",
                self.scroll.session_blocks().len()
            );
        }
        self.stage.clear();
        self.expressions.clear();
        self.current = None;
        self.cursor = None;
        log::debug!("script loaded ({} lines)", script.len());
        self.script = script;
    }

    /// Move past the current line, running commands until dialogue is
    /// reached or the script ends. At the last line this does nothing.
    pub fn advance(&mut self) -> AdvanceOutcome {
        loop {
            let next = self.cursor.map_or(0, |c| c + 1);
            let Some(step) = self.script.get(next).cloned() else {
                log::debug!("advance stopped at end of script");
                return AdvanceOutcome::DONE;
            };
            self.cursor = Some(next);

            match step.kind {
                StepKind::Dialogue => {
                    self.present(&step.line);
                    return AdvanceOutcome::WAIT;
                }
                StepKind::Command(command) => self.execute(command),
                StepKind::Invalid(e) => {
                    log::warn!("skipping line {next} ({:?}): {e}", step.line.text);
                }
            }
        }
    }

    /// Forward the frame clock to the stage.
    pub fn tick(&mut self, now_ms: u64) {
        self.stage.tick(now_ms);
    }

    fn execute(&mut self, command: DirectorCommand) {
        log::debug!("executing {}", command.keyword());
        match command {
            DirectorCommand::CharacterShow { name, x, y } => match self.identities.get(&name) {
                Some(identity) => self.stage.show(identity, x, y),
                None => log::warn!("show: unknown identity {name}"),
            },
            DirectorCommand::CharacterHide { name } => {
                if self.identities.contains(&name) {
                    self.stage.hide(&name);
                } else {
                    log::warn!("hide: unknown identity {name}");
                }
            }
            DirectorCommand::CharacterMove {
                name,
                x,
                y,
                duration_ms,
                zoom,
            } => {
                if self.identities.contains(&name) {
                    self.stage
                        .move_character(&name, x, y, duration_ms.max(0) as u64, zoom);
                } else {
                    log::warn!("move: unknown identity {name}");
                }
            }
            DirectorCommand::BackgroundShow { name, x, y, zoom } => {
                if self.identities.has_background(&name) {
                    self.stage.show_background(&name, x, y, zoom);
                } else {
                    log::warn!("background: unknown background {name}");
                }
            }
            DirectorCommand::BackgroundMove {
                dx,
                dy,
                duration_ms,
                zoom,
            } => {
                self.stage
                    .move_background(dx, dy, duration_ms.max(0) as u64, zoom);
            }
            DirectorCommand::ScrollStart => {
                if self.scroll_routing {
                    log::warn!("scroll mode already on");
                }
                self.scroll_routing = true;
            }
            DirectorCommand::ScrollStop => {
                self.scroll.stop_scroll(&mut self.backlog);
                self.scroll_routing = false;
            }
        }
    }

    fn present(&mut self, line: &DialogueLine) {
        let display_name = self.resolve_display_name(line);

        if self.stage.is_active(&line.speaker) {
            let defaults = self
                .identities
                .get(&line.speaker)
                .map(|identity| identity.default_expression.clone())
                .unwrap_or_default();
            self.expressions
                .insert(line.speaker.clone(), line.expression.or(&defaults));
        }

        if self.scroll_routing {
            self.current = None;
            if self.scroll.is_scrolling() {
                self.scroll.add_block(&line.text, Some(display_name.as_str()));
            } else {
                self.scroll.start_scroll(&display_name, &line.text);
            }
            return;
        }

        self.current = Some(DisplayedLine {
            speaker: line.speaker.clone(),
            display_name,
            text: line.text.clone(),
        });
    }

    // An override counts only when it names a registered identity.
    fn resolve_display_name(&self, line: &DialogueLine) -> String {
        match line
            .display_name
            .as_deref()
            .and_then(|name| self.identities.get(name))
        {
            Some(identity) => self.names.display_name(identity).to_string(),
            None => line.speaker.clone(),
        }
    }

    pub fn current_line(&self) -> Option<&DisplayedLine> {
        self.current.as_ref()
    }

    /// The last expression remembered for `speaker` this run.
    pub fn expression(&self, speaker: &str) -> Option<&Expression> {
        self.expressions.get(speaker)
    }

    pub fn stage(&self) -> &AnimationEngine {
        &self.stage
    }

    pub fn scroll(&self) -> &ScrollManager {
        &self.scroll
    }

    pub fn is_scroll_mode(&self) -> bool {
        self.scroll_routing
    }

    pub fn backlog(&self) -> &[BacklogEntry] {
        &self.backlog
    }

    /// Take every backlog entry produced so far.
    pub fn drain_backlog(&mut self) -> Vec<BacklogEntry> {
        std::mem::take(&mut self.backlog)
    }

    pub fn names(&self) -> &NameStore {
        &self.names
    }

    pub fn names_mut(&mut self) -> &mut NameStore {
        &mut self.names
    }

    pub fn identities(&self) -> &IdentityRegistry {
        &self.identities
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Index of the line last executed.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// True once no line remains after the cursor.
    pub fn is_finished(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) >= self.script.len()
    }
}
