/// Cast registry — who may appear on stage, and what the player calls them.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::event::CatalogError;
use super::line::Expression;

/// A character that director commands can put on stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    /// Name shown in the dialogue box when the script does not override it.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Sprite width and height in viewport pixels at zoom 1.0.
    pub sprite_extent: (f64, f64),
    #[serde(default)]
    pub default_expression: Expression,
}

impl Identity {
    pub fn new(name: impl Into<String>, sprite_extent: (f64, f64)) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            sprite_extent,
            default_expression: Expression::default(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_default_expression(mut self, expression: Expression) -> Self {
        self.default_expression = expression;
        self
    }
}

/// On-disk shape of a cast file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CastManifest {
    #[serde(default)]
    pub characters: Vec<Identity>,
    #[serde(default)]
    pub backgrounds: Vec<String>,
}

/// Known characters and backgrounds. Commands naming anything else are
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    characters: FxHashMap<String, Identity>,
    backgrounds: FxHashSet<String>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, identity: Identity) {
        self.characters.insert(identity.name.clone(), identity);
    }

    pub fn register_background(&mut self, name: impl Into<String>) {
        self.backgrounds.insert(name.into());
    }

    pub fn get(&self, name: &str) -> Option<&Identity> {
        self.characters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.characters.contains_key(name)
    }

    pub fn has_background(&self, name: &str) -> bool {
        self.backgrounds.contains(name)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn from_manifest(manifest: CastManifest) -> Self {
        let mut registry = Self::new();
        for identity in manifest.characters {
            registry.register(identity);
        }
        for background in manifest.backgrounds {
            registry.register_background(background);
        }
        registry
    }

    pub fn parse_ron(input: &str) -> Result<Self, CatalogError> {
        let manifest: CastManifest = ron::from_str(input)?;
        Ok(Self::from_manifest(manifest))
    }

    pub fn load_from_ron(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }
}

/// Player-facing names, e.g. a protagonist the player renamed.
///
/// Constructed by the caller and handed to the interpreter; there is no
/// process-wide instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameStore {
    names: FxHashMap<String, String>,
}

impl NameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, identity: impl Into<String>, name: impl Into<String>) {
        self.names.insert(identity.into(), name.into());
    }

    pub fn get(&self, identity: &str) -> Option<&str> {
        self.names.get(identity).map(String::as_str)
    }

    /// The name to show for `identity`: the stored name, then the
    /// registry's display name, then the identity itself.
    pub fn display_name<'a>(&'a self, identity: &'a Identity) -> &'a str {
        self.get(&identity.name)
            .or(identity.display_name.as_deref())
            .unwrap_or(&identity.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = IdentityRegistry::new();
        registry.register(Identity::new("Aoi", (400.0, 900.0)));
        registry.register_background("classroom");

        assert!(registry.contains("Aoi"));
        assert!(!registry.contains("Mio"));
        assert!(registry.has_background("classroom"));
        assert!(!registry.has_background("Aoi"));
        assert_eq!(registry.get("Aoi").unwrap().sprite_extent, (400.0, 900.0));
    }

    #[test]
    fn registry_from_ron() {
        let input = r#"(
            characters: [
                (name: "Aoi", display_name: Some("Aoi Kisaragi"), sprite_extent: (400.0, 900.0),
                 default_expression: (eye: Some("open"), mouth: Some("neutral"))),
                (name: "Mio", sprite_extent: (380.0, 860.0)),
            ],
            backgrounds: ["classroom", "rooftop"],
        )"#;
        let registry = IdentityRegistry::parse_ron(input).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.has_background("rooftop"));
        let aoi = registry.get("Aoi").unwrap();
        assert_eq!(aoi.default_expression.mouth.as_deref(), Some("neutral"));
    }

    #[test]
    fn display_name_precedence() {
        let plain = Identity::new("Mio", (1.0, 1.0));
        let titled = Identity::new("Aoi", (1.0, 1.0)).with_display_name("Aoi Kisaragi");
        let mut names = NameStore::new();

        assert_eq!(names.display_name(&plain), "Mio");
        assert_eq!(names.display_name(&titled), "Aoi Kisaragi");

        names.set("Aoi", "Sis");
        assert_eq!(names.display_name(&titled), "Sis");
    }
}
