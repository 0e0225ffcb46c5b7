/// Script records — dialogue lines, expressions and compiled scripts.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::command::{CommandError, DirectorCommand};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Facial expression parts for a speaker. Unset parts fall back to the
/// identity's defaults when the line is presented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expression {
    #[serde(default)]
    pub eye: Option<String>,
    #[serde(default)]
    pub mouth: Option<String>,
    #[serde(default)]
    pub brow: Option<String>,
    #[serde(default)]
    pub cheek: Option<String>,
}

impl Expression {
    /// Fill every unset part from `defaults`.
    pub fn or(&self, defaults: &Expression) -> Expression {
        Expression {
            eye: self.eye.clone().or_else(|| defaults.eye.clone()),
            mouth: self.mouth.clone().or_else(|| defaults.mouth.clone()),
            brow: self.brow.clone().or_else(|| defaults.brow.clone()),
            cheek: self.cheek.clone().or_else(|| defaults.cheek.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.eye.is_none() && self.mouth.is_none() && self.brow.is_none() && self.cheek.is_none()
    }
}

/// One record of a script, as produced by the script loader.
///
/// `text` is either literal dialogue or a director command such as
/// `_CHARA_NEW_Aoi_0.3_0.5`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub speaker: String,
    #[serde(default)]
    pub expression: Expression,
    pub text: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl DialogueLine {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            expression: Expression::default(),
            text: text.into(),
            display_name: None,
        }
    }

    pub fn with_expression(mut self, expression: Expression) -> Self {
        self.expression = expression;
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// How a line is handled when the cursor reaches it.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    /// Plain dialogue: shown to the player, waits for input.
    Dialogue,
    /// A director command, executed without waiting.
    Command(DirectorCommand),
    /// A command line too short to execute; skipped with a warning.
    Invalid(CommandError),
}

/// A line together with its classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptStep {
    pub line: DialogueLine,
    pub kind: StepKind,
}

/// An immutable, classified sequence of script lines.
///
/// Command text is classified once here rather than on every advance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    steps: Vec<ScriptStep>,
}

impl Script {
    pub fn compile(lines: Vec<DialogueLine>) -> Self {
        let steps = lines
            .into_iter()
            .map(|line| {
                let kind = match DirectorCommand::parse(&line.text, &line.speaker) {
                    None => StepKind::Dialogue,
                    Some(Ok(command)) => StepKind::Command(command),
                    Some(Err(e)) => StepKind::Invalid(e),
                };
                ScriptStep { line, kind }
            })
            .collect();
        Self { steps }
    }

    /// Parse a RON list of `DialogueLine` records.
    pub fn parse_ron(input: &str) -> Result<Self, ScriptError> {
        let lines: Vec<DialogueLine> = ron::from_str(input)?;
        Ok(Self::compile(lines))
    }

    pub fn load_from_ron(path: &Path) -> Result<Self, ScriptError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&ScriptStep> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expression_falls_back_per_part() {
        let line = Expression {
            eye: Some("closed".to_string()),
            ..Default::default()
        };
        let defaults = Expression {
            eye: Some("open".to_string()),
            mouth: Some("smile".to_string()),
            brow: None,
            cheek: Some("none".to_string()),
        };
        let resolved = line.or(&defaults);
        assert_eq!(resolved.eye.as_deref(), Some("closed"));
        assert_eq!(resolved.mouth.as_deref(), Some("smile"));
        assert_eq!(resolved.brow, None);
        assert_eq!(resolved.cheek.as_deref(), Some("none"));
    }

    #[test]
    fn compile_classifies_lines() {
        let script = Script::compile(vec![
            DialogueLine::new("", "_CHARA_NEW_Aoi_0.3_0.5"),
            DialogueLine::new("Aoi", "Good morning."),
            DialogueLine::new("", "_CHARA_HIDE_"),
        ]);
        assert_eq!(script.len(), 3);
        assert!(matches!(
            script.steps()[0].kind,
            StepKind::Command(DirectorCommand::CharacterShow { .. })
        ));
        assert_eq!(script.steps()[1].kind, StepKind::Dialogue);
        assert!(matches!(script.steps()[2].kind, StepKind::Invalid(_)));
    }

    #[test]
    fn parse_ron_script() {
        let input = r#"[
            (speaker: "", text: "_BG_SHOW_classroom_0.5_0.5_1.0"),
            (speaker: "Aoi", expression: (eye: Some("wide")), text: "Huh?", display_name: Some("???")),
        ]"#;
        let script = Script::parse_ron(input).unwrap();
        assert_eq!(script.len(), 2);
        let line = &script.steps()[1].line;
        assert_eq!(line.expression.eye.as_deref(), Some("wide"));
        assert_eq!(line.display_name.as_deref(), Some("???"));
    }

    #[test]
    fn parse_ron_rejects_garbage() {
        assert!(matches!(Script::parse_ron("not ron"), Err(ScriptError::Ron(_))));
    }
}
