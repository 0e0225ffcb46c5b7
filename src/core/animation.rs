/// Stage animation — character and background transforms with linear tweens.
///
/// Every tween is sampled from the single clock value handed to
/// [`AnimationEngine::tick`], so all tweens advance in lockstep and ticking
/// twice with the same timestamp changes nothing. Starting a tween on a
/// target that is already moving replaces the old tween outright.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::core::config::{Rgba, StageConfig};
use crate::schema::identity::Identity;

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 3.0;

/// Clamp a zoom factor into `[MIN_ZOOM, MAX_ZOOM]`. NaN becomes 1.0.
pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        1.0
    } else {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    }
}

/// Linearly interpolate between two floats.
pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Linearly interpolate between two points.
pub(crate) fn lerp_pair(a: (f64, f64), b: (f64, f64), t: f64) -> (f64, f64) {
    (lerp(a.0, b.0, t), lerp(a.1, b.1, t))
}

/// What a tween animates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TweenTarget {
    Character(String),
    Background,
}

/// A linear interpolation in flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TweenState {
    pub start_pos: (f64, f64),
    pub target_pos: (f64, f64),
    pub start_zoom: f64,
    pub target_zoom: f64,
    pub start_time_ms: u64,
    pub duration_ms: u64,
}

impl TweenState {
    /// `clamp((now - start) / duration, 0, 1)`. Zero-length tweens are
    /// always complete.
    pub fn progress(&self, now_ms: u64) -> f64 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        let elapsed = now_ms.saturating_sub(self.start_time_ms) as f64;
        (elapsed / self.duration_ms as f64).clamp(0.0, 1.0)
    }
}

/// Position and zoom of something on stage.
///
/// For characters `position` is the top-left of the zoomed sprite in
/// viewport pixels. For the background it is the pan offset of the image
/// center from the viewport center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityTransform {
    pub position: (f64, f64),
    pub zoom: f64,
    pub tween: Option<TweenState>,
}

impl Default for EntityTransform {
    fn default() -> Self {
        Self::at((0.0, 0.0))
    }
}

impl EntityTransform {
    pub fn at(position: (f64, f64)) -> Self {
        Self {
            position,
            zoom: 1.0,
            tween: None,
        }
    }

    pub fn is_tweening(&self) -> bool {
        self.tween.is_some()
    }

    fn retarget(&mut self, target_pos: (f64, f64), target_zoom: f64, now_ms: u64, duration_ms: u64) {
        self.tween = Some(TweenState {
            start_pos: self.position,
            target_pos,
            start_zoom: self.zoom,
            target_zoom,
            start_time_ms: now_ms,
            duration_ms,
        });
    }

    /// Sample the tween at `now_ms`. Returns true when the tween finished
    /// on this call; the transform then sits exactly on its target.
    fn advance(&mut self, now_ms: u64) -> bool {
        let Some(tween) = self.tween else {
            return false;
        };
        let t = tween.progress(now_ms);
        if t >= 1.0 {
            self.position = tween.target_pos;
            self.zoom = tween.target_zoom;
            self.tween = None;
            true
        } else {
            self.position = lerp_pair(tween.start_pos, tween.target_pos, t);
            self.zoom = lerp(tween.start_zoom, tween.target_zoom, t);
            false
        }
    }
}

#[derive(Debug, Clone)]
struct Actor {
    transform: EntityTransform,
    extent: (f64, f64),
}

/// Owns every on-stage transform for one script run.
#[derive(Debug, Clone)]
pub struct AnimationEngine {
    viewport: (f64, f64),
    virtual_extent: (f64, f64),
    scale: (f64, f64),
    fallback_color: Rgba,
    clock_ms: u64,
    actors: FxHashMap<String, Actor>,
    active: FxHashSet<String>,
    background: EntityTransform,
    background_name: Option<String>,
}

impl AnimationEngine {
    pub fn new(config: &StageConfig) -> Self {
        Self {
            viewport: config.viewport,
            virtual_extent: config.virtual_extent,
            scale: config.viewport_scale(),
            fallback_color: config.fallback_color,
            clock_ms: 0,
            actors: FxHashMap::default(),
            active: FxHashSet::default(),
            background: EntityTransform::default(),
            background_name: None,
        }
    }

    /// The timestamp of the last tick; new tweens start here.
    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    /// Begin a tween towards `position` (stage pixels) and `zoom`.
    ///
    /// Zoom is clamped to `[0.5, 3.0]`; background targets are also
    /// clamped to the pan range for that zoom. Returns false when the
    /// character has never been shown.
    pub fn start_tween(
        &mut self,
        target: TweenTarget,
        position: (f64, f64),
        duration_ms: u64,
        zoom: f64,
    ) -> bool {
        let zoom = clamp_zoom(zoom);
        let now = self.clock_ms;
        match target {
            TweenTarget::Background => {
                let position = self.clamp_pan(position, zoom);
                if self.background.is_tweening() {
                    log::debug!("replacing background tween");
                }
                self.background.retarget(position, zoom, now, duration_ms);
                log::debug!("background tween to {position:?} zoom {zoom} over {duration_ms}ms");
                true
            }
            TweenTarget::Character(name) => match self.actors.get_mut(&name) {
                Some(actor) => {
                    if actor.transform.is_tweening() {
                        log::debug!("replacing tween for {name}");
                    }
                    actor.transform.retarget(position, zoom, now, duration_ms);
                    log::debug!("{name} tween to {position:?} zoom {zoom} over {duration_ms}ms");
                    true
                }
                None => {
                    log::warn!("tween requested for {name}, who has never been shown");
                    false
                }
            },
        }
    }

    /// Sample every active tween at `now_ms`, snapping and removing the
    /// ones that have reached their end.
    pub fn tick(&mut self, now_ms: u64) {
        self.clock_ms = now_ms;
        for (name, actor) in self.actors.iter_mut() {
            if actor.transform.advance(now_ms) {
                log::debug!("{name} tween finished");
            }
        }
        if self.background.advance(now_ms) {
            log::debug!("background tween finished");
        }
    }

    /// Put `identity` on stage centered at normalized `(x, y)`.
    ///
    /// The transform is created on first show; later shows keep its zoom
    /// and cancel any tween in flight.
    pub fn show(&mut self, identity: &Identity, x: f64, y: f64) {
        let actor = self
            .actors
            .entry(identity.name.clone())
            .or_insert_with(|| Actor {
                transform: EntityTransform::default(),
                extent: identity.sprite_extent,
            });
        actor.extent = identity.sprite_extent;
        actor.transform.tween = None;
        actor.transform.position = place(self.viewport, actor.extent, actor.transform.zoom, x, y);
        self.active.insert(identity.name.clone());
    }

    /// Take `name` off stage. Its transform stays for a later show.
    pub fn hide(&mut self, name: &str) -> bool {
        if !self.active.remove(name) {
            log::debug!("{name} hidden while not on stage");
        }
        match self.actors.get_mut(name) {
            Some(actor) => {
                actor.transform.tween = None;
                true
            }
            None => false,
        }
    }

    /// Tween a character so it is centered on normalized `(x, y)` at `zoom`.
    pub fn move_character(&mut self, name: &str, x: f64, y: f64, duration_ms: u64, zoom: f64) -> bool {
        let zoom = clamp_zoom(zoom);
        let Some(actor) = self.actors.get(name) else {
            log::warn!("move requested for {name}, who has never been shown");
            return false;
        };
        if !self.active.contains(name) {
            log::debug!("moving {name} while hidden");
        }
        let target = place(self.viewport, actor.extent, zoom, x, y);
        self.start_tween(TweenTarget::Character(name.to_string()), target, duration_ms, zoom)
    }

    /// Frame a new background. `(0.5, 0.5)` is centered.
    pub fn show_background(&mut self, name: &str, x: f64, y: f64, zoom: f64) {
        let zoom = clamp_zoom(zoom);
        let offset = (
            (x - 0.5) * self.viewport.0,
            (y - 0.5) * self.viewport.1,
        );
        self.background = EntityTransform {
            position: self.clamp_pan(offset, zoom),
            zoom,
            tween: None,
        };
        self.background_name = Some(name.to_string());
    }

    /// Pan the background by a normalized delta, tweening to `zoom`.
    pub fn move_background(&mut self, dx: f64, dy: f64, duration_ms: u64, zoom: f64) -> bool {
        if self.background_name.is_none() {
            log::debug!("background move with no background shown");
        }
        let (px, py) = self.background.position;
        let target = (px + dx * self.viewport.0, py + dy * self.viewport.1);
        self.start_tween(TweenTarget::Background, target, duration_ms, zoom)
    }

    /// Maximum pan offset from center, per axis, in viewport pixels.
    ///
    /// Zoomed in, the image may slide by half its overflow. Zoomed out,
    /// the limit is a quarter of the shrinkage.
    pub fn pan_range(&self, zoom: f64) -> (f64, f64) {
        let zoom = clamp_zoom(zoom);
        let factor = if zoom >= 1.0 {
            (zoom - 1.0) / 2.0
        } else {
            (1.0 - zoom) / 4.0
        };
        (
            (factor * self.virtual_extent.0 * self.scale.0).abs(),
            (factor * self.virtual_extent.1 * self.scale.1).abs(),
        )
    }

    pub fn clamp_pan(&self, offset: (f64, f64), zoom: f64) -> (f64, f64) {
        let (mx, my) = self.pan_range(zoom);
        (offset.0.clamp(-mx, mx), offset.1.clamp(-my, my))
    }

    /// The color to paint around a background smaller than the viewport.
    pub fn background_fill(&self) -> Option<Rgba> {
        (self.background.zoom < 1.0).then_some(self.fallback_color)
    }

    pub fn background(&self) -> &EntityTransform {
        &self.background
    }

    pub fn background_name(&self) -> Option<&str> {
        self.background_name.as_deref()
    }

    pub fn transform(&self, name: &str) -> Option<&EntityTransform> {
        self.actors.get(name).map(|a| &a.transform)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains(name)
    }

    /// Names currently on stage, sorted for stable output.
    pub fn active_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.active.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_animating(&self) -> bool {
        self.background.is_tweening() || self.actors.values().any(|a| a.transform.is_tweening())
    }

    /// Drop every transform; called when a run ends.
    pub fn clear(&mut self) {
        self.actors.clear();
        self.active.clear();
        self.background = EntityTransform::default();
        self.background_name = None;
    }
}

/// Top-left corner that centers a zoomed sprite on normalized `(x, y)`.
fn place(viewport: (f64, f64), extent: (f64, f64), zoom: f64, x: f64, y: f64) -> (f64, f64) {
    (
        x * viewport.0 - extent.0 * zoom / 2.0,
        y * viewport.1 - extent.1 * zoom / 2.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn stage() -> AnimationEngine {
        // 1:1 viewport so pan ranges are easy to read.
        AnimationEngine::new(&StageConfig {
            viewport: (1000.0, 500.0),
            virtual_extent: (1000.0, 500.0),
            ..StageConfig::default()
        })
    }

    fn aoi() -> Identity {
        Identity::new("Aoi", (200.0, 400.0))
    }

    // ==================== INTERPOLATION ====================

    #[test]
    fn test_lerp_basic() {
        assert!(approx_eq(lerp(0.0, 10.0, 0.5), 5.0));
        assert!(approx_eq(lerp(-10.0, 10.0, 0.25), -5.0));
        let p = lerp_pair((0.0, 100.0), (100.0, 0.0), 0.25);
        assert!(approx_eq(p.0, 25.0) && approx_eq(p.1, 75.0));
    }

    #[test]
    fn test_progress_clamps() {
        let tween = TweenState {
            start_pos: (0.0, 0.0),
            target_pos: (1.0, 1.0),
            start_zoom: 1.0,
            target_zoom: 1.0,
            start_time_ms: 1000,
            duration_ms: 200,
        };
        assert!(approx_eq(tween.progress(900), 0.0));
        assert!(approx_eq(tween.progress(1050), 0.25));
        assert!(approx_eq(tween.progress(1200), 1.0));
        assert!(approx_eq(tween.progress(5000), 1.0));
    }

    #[test]
    fn test_zero_duration_is_complete() {
        let tween = TweenState {
            start_pos: (0.0, 0.0),
            target_pos: (1.0, 1.0),
            start_zoom: 1.0,
            target_zoom: 2.0,
            start_time_ms: 10,
            duration_ms: 0,
        };
        assert!(approx_eq(tween.progress(10), 1.0));
    }

    // ==================== TWEEN SCHEDULING ====================

    #[test]
    fn test_position_is_linear_in_time() {
        let mut stage = stage();
        stage.show(&aoi(), 0.5, 0.5);
        stage.tick(1000);
        let start = stage.transform("Aoi").unwrap().position;
        let target = (700.0, 50.0);
        assert!(stage.start_tween(TweenTarget::Character("Aoi".into()), target, 400, 1.0));

        for step in 0..=3 {
            let t = step * 100;
            stage.tick(1000 + t);
            let pos = stage.transform("Aoi").unwrap().position;
            let f = t as f64 / 400.0;
            assert!(approx_eq(pos.0, start.0 + (target.0 - start.0) * f));
            assert!(approx_eq(pos.1, start.1 + (target.1 - start.1) * f));
        }
    }

    #[test]
    fn test_zoom_is_linear_in_time() {
        let mut stage = stage();
        stage.show(&aoi(), 0.5, 0.5);
        stage.tick(0);
        let target = (300.0, 20.0);
        assert!(stage.start_tween(TweenTarget::Character("Aoi".into()), target, 400, 2.0));

        for t in [100, 200, 300] {
            stage.tick(t);
            let zoom = stage.transform("Aoi").unwrap().zoom;
            assert!(approx_eq(zoom, 1.0 + 1.0 * t as f64 / 400.0));
        }

        stage.tick(400);
        let transform = stage.transform("Aoi").unwrap();
        assert_eq!(transform.zoom, 2.0);
        assert_eq!(transform.position, target);
    }

    #[test]
    fn test_tween_snaps_exactly_and_is_removed() {
        let mut stage = stage();
        stage.show(&aoi(), 0.5, 0.5);
        stage.tick(0);
        let target = (123.456789, -98.7654321);
        stage.start_tween(TweenTarget::Character("Aoi".into()), target, 333, 2.1);
        stage.tick(333);
        let transform = stage.transform("Aoi").unwrap();
        assert_eq!(transform.position, target);
        assert_eq!(transform.zoom, 2.1);
        assert!(transform.tween.is_none());
        assert!(!stage.is_animating());
    }

    #[test]
    fn test_tick_is_idempotent_for_same_timestamp() {
        let mut stage = stage();
        stage.show(&aoi(), 0.5, 0.5);
        stage.tick(0);
        stage.start_tween(TweenTarget::Character("Aoi".into()), (0.0, 0.0), 1000, 1.0);
        stage.tick(250);
        let first = *stage.transform("Aoi").unwrap();
        stage.tick(250);
        stage.tick(250);
        assert_eq!(*stage.transform("Aoi").unwrap(), first);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut stage = stage();
        stage.show(&aoi(), 0.5, 0.5);
        stage.start_tween(TweenTarget::Character("Aoi".into()), (0.0, 0.0), 0, 5.0);
        assert_eq!(stage.transform("Aoi").unwrap().tween.unwrap().target_zoom, 3.0);
        stage.start_tween(TweenTarget::Character("Aoi".into()), (0.0, 0.0), 0, 0.1);
        assert_eq!(stage.transform("Aoi").unwrap().tween.unwrap().target_zoom, 0.5);
        assert_eq!(clamp_zoom(f64::NAN), 1.0);
    }

    #[test]
    fn test_new_tween_replaces_old_from_current_position() {
        let mut stage = stage();
        stage.show(&aoi(), 0.5, 0.5);
        stage.tick(0);
        let origin = stage.transform("Aoi").unwrap().position;
        stage.start_tween(TweenTarget::Character("Aoi".into()), (origin.0 + 100.0, origin.1), 100, 1.0);
        stage.tick(50);
        let midway = stage.transform("Aoi").unwrap().position;
        assert!(approx_eq(midway.0, origin.0 + 50.0));

        stage.start_tween(TweenTarget::Character("Aoi".into()), (0.0, 0.0), 200, 1.0);
        let tween = stage.transform("Aoi").unwrap().tween.unwrap();
        assert_eq!(tween.start_pos, midway);
        assert_eq!(tween.start_time_ms, 50);
        assert_eq!(tween.target_pos, (0.0, 0.0));
    }

    #[test]
    fn test_tween_for_unknown_character_is_rejected() {
        let mut stage = stage();
        assert!(!stage.start_tween(TweenTarget::Character("Ghost".into()), (0.0, 0.0), 10, 1.0));
        assert!(stage.transform("Ghost").is_none());
    }

    // ==================== SHOW / HIDE ====================

    #[test]
    fn test_show_centers_sprite() {
        let mut stage = stage();
        stage.show(&aoi(), 0.5, 0.5);
        let transform = stage.transform("Aoi").unwrap();
        // center (500, 250) minus half of 200x400
        assert_eq!(transform.position, (400.0, 50.0));
        assert_eq!(transform.zoom, 1.0);
        assert!(stage.is_active("Aoi"));
    }

    #[test]
    fn test_hide_keeps_transform_and_cancels_tween() {
        let mut stage = stage();
        stage.show(&aoi(), 0.5, 0.5);
        stage.move_character("Aoi", 0.2, 0.5, 500, 1.5);
        assert!(stage.is_animating());

        assert!(stage.hide("Aoi"));
        assert!(!stage.is_active("Aoi"));
        let transform = stage.transform("Aoi").unwrap();
        assert!(transform.tween.is_none());
        assert_eq!(transform.position, (400.0, 50.0));
    }

    #[test]
    fn test_reshow_keeps_zoom() {
        let mut stage = stage();
        stage.show(&aoi(), 0.5, 0.5);
        stage.move_character("Aoi", 0.5, 0.5, 0, 2.0);
        stage.tick(1);
        stage.hide("Aoi");
        stage.show(&aoi(), 0.5, 0.5);
        let transform = stage.transform("Aoi").unwrap();
        assert_eq!(transform.zoom, 2.0);
        // centered with the 2x extent
        assert_eq!(transform.position, (300.0, -150.0));
        assert_eq!(stage.active_names(), vec!["Aoi"]);
    }

    #[test]
    fn test_hide_unknown_reports_false() {
        let mut stage = stage();
        assert!(!stage.hide("Nobody"));
    }

    #[test]
    fn test_move_character_targets_center() {
        let mut stage = stage();
        stage.show(&aoi(), 0.5, 0.5);
        assert!(stage.move_character("Aoi", 0.25, 0.5, 600, 1.0));
        let tween = stage.transform("Aoi").unwrap().tween.unwrap();
        assert_eq!(tween.target_pos, (150.0, 50.0));
        assert_eq!(tween.duration_ms, 600);
        assert!(!stage.move_character("Mio", 0.5, 0.5, 600, 1.0));
    }

    // ==================== BACKGROUND FRAMING ====================

    #[test]
    fn test_pan_range_zoomed_in_and_out() {
        let stage = stage();
        assert_eq!(stage.pan_range(1.0), (0.0, 0.0));
        assert_eq!(stage.pan_range(2.0), (500.0, 250.0));
        assert_eq!(stage.pan_range(0.5), (125.0, 62.5));
    }

    #[test]
    fn test_pan_range_scaled_to_viewport() {
        let stage = AnimationEngine::new(&StageConfig {
            viewport: (960.0, 540.0),
            virtual_extent: (1920.0, 1080.0),
            ..StageConfig::default()
        });
        // (2 - 1) * 1920 / 2 = 960 virtual px, halved by the viewport scale
        assert_eq!(stage.pan_range(2.0), (480.0, 270.0));
    }

    #[test]
    fn test_show_background_clamps_offset() {
        let mut stage = stage();
        stage.show_background("rooftop", 1.0, 0.5, 1.0);
        assert_eq!(stage.background().position, (0.0, 0.0));
        assert_eq!(stage.background_name(), Some("rooftop"));

        stage.show_background("rooftop", 0.9, 0.1, 2.0);
        let bg = stage.background();
        assert!(approx_eq(bg.position.0, 400.0));
        assert!(approx_eq(bg.position.1, -200.0));
        assert_eq!(bg.zoom, 2.0);
    }

    #[test]
    fn test_background_move_is_relative_and_clamped() {
        let mut stage = stage();
        stage.show_background("street", 0.5, 0.5, 1.5);
        stage.tick(0);
        assert!(stage.move_background(0.1, 0.0, 100, 1.5));
        stage.tick(100);
        assert!(approx_eq(stage.background().position.0, 100.0));

        // pan range at 1.5 is (250, 125)
        stage.move_background(1.0, 1.0, 100, 1.5);
        stage.tick(200);
        assert_eq!(stage.background().position, (250.0, 125.0));
    }

    #[test]
    fn test_zoomed_out_background_reveals_fill() {
        let mut stage = stage();
        stage.show_background("street", 0.5, 0.5, 1.0);
        assert_eq!(stage.background_fill(), None);
        stage.show_background("street", 0.5, 0.5, 0.8);
        assert_eq!(stage.background_fill(), Some(Rgba::BLACK));
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut stage = stage();
        stage.show(&aoi(), 0.5, 0.5);
        stage.show_background("street", 0.5, 0.5, 1.2);
        stage.clear();
        assert!(stage.transform("Aoi").is_none());
        assert!(stage.active_names().is_empty());
        assert_eq!(stage.background_name(), None);
        assert_eq!(*stage.background(), EntityTransform::default());
    }
}
