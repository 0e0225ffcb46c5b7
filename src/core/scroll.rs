/// Scrolling text — a run of dialogue shown as a moving window of blocks,
/// collapsed into a single backlog entry when the scroll stops.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How many blocks stay visible at once.
pub const VISIBLE_BLOCKS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScrollMode {
    #[default]
    Idle,
    Scrolling,
}

/// One paragraph of scrolled text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollBlock {
    pub text: String,
    pub speaker: String,
    /// True when the speaker differs from the previous block's.
    pub is_first_line_for_speaker: bool,
}

/// A history entry for the backlog screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogEntry {
    pub speaker: String,
    pub text: String,
}

/// Receiver for finished backlog entries.
pub trait BacklogSink {
    fn push_entry(&mut self, entry: BacklogEntry);
}

impl BacklogSink for Vec<BacklogEntry> {
    fn push_entry(&mut self, entry: BacklogEntry) {
        self.push(entry);
    }
}

/// The scroll state machine.
///
/// Scroll content is only ever discarded by [`ScrollManager::stop_scroll`],
/// which first hands it to the backlog.
#[derive(Debug, Clone, Default)]
pub struct ScrollManager {
    mode: ScrollMode,
    visible: VecDeque<ScrollBlock>,
    session: Vec<ScrollBlock>,
    current_speaker: String,
    last_added_speaker: String,
}

impl ScrollManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle → Scrolling, seeded with one block. Ignored while already
    /// scrolling.
    pub fn start_scroll(&mut self, speaker: &str, text: &str) -> bool {
        if self.mode == ScrollMode::Scrolling {
            log::warn!("scroll already running; keeping {} blocks", self.session.len());
            return false;
        }
        let block = ScrollBlock {
            text: text.to_string(),
            speaker: speaker.to_string(),
            is_first_line_for_speaker: true,
        };
        self.visible.clear();
        self.session.clear();
        self.visible.push_back(block.clone());
        self.session.push(block);
        self.current_speaker = speaker.to_string();
        self.last_added_speaker = speaker.to_string();
        self.mode = ScrollMode::Scrolling;
        log::debug!("scroll started by {speaker}");
        true
    }

    /// Append a block. `speaker` defaults to the current speaker.
    pub fn add_block(&mut self, text: &str, speaker: Option<&str>) -> bool {
        if self.mode == ScrollMode::Idle {
            log::warn!("add_block while idle; dropping {text:?}");
            return false;
        }
        let speaker = speaker.unwrap_or(&self.current_speaker).to_string();
        let block = ScrollBlock {
            text: text.to_string(),
            is_first_line_for_speaker: speaker != self.last_added_speaker,
            speaker: speaker.clone(),
        };
        self.visible.push_back(block.clone());
        while self.visible.len() > VISIBLE_BLOCKS {
            self.visible.pop_front();
        }
        self.session.push(block);
        self.current_speaker = speaker.clone();
        self.last_added_speaker = speaker;
        true
    }

    /// Scrolling → Idle. Emits every block since `start_scroll` as one
    /// entry tagged with the last speaker, then clears all state.
    pub fn stop_scroll(&mut self, sink: &mut impl BacklogSink) -> bool {
        if self.mode == ScrollMode::Idle {
            log::warn!("stop_scroll while idle");
            return false;
        }
        let text: String = self.session.iter().map(|b| b.text.as_str()).collect();
        let entry = BacklogEntry {
            speaker: std::mem::take(&mut self.last_added_speaker),
            text,
        };
        log::debug!("scroll stopped after {} blocks", self.session.len());
        sink.push_entry(entry);

        self.visible.clear();
        self.session.clear();
        self.current_speaker.clear();
        self.mode = ScrollMode::Idle;
        true
    }

    pub fn mode(&self) -> ScrollMode {
        self.mode
    }

    pub fn is_scrolling(&self) -> bool {
        self.mode == ScrollMode::Scrolling
    }

    /// The visible window, oldest first.
    pub fn visible_blocks(&self) -> impl Iterator<Item = &ScrollBlock> {
        self.visible.iter()
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    /// Every block since the scroll started.
    pub fn session_blocks(&self) -> &[ScrollBlock] {
        &self.session
    }

    pub fn current_speaker(&self) -> &str {
        &self.current_speaker
    }
}
