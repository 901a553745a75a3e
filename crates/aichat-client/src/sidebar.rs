//! Resizable sidebar geometry.
//!
//! Width is clamped to [`MIN_WIDTH`, `MAX_WIDTH`] on every mutation. Only a
//! finished drag and an explicit reset write the width back to preferences;
//! keyboard nudges and intermediate drag frames stay in memory.

use tracing::warn;

use crate::prefs::Preferences;

pub const MIN_WIDTH: u16 = 200;
pub const MAX_WIDTH: u16 = 400;
pub const DEFAULT_WIDTH: u16 = 260;
pub const KEYBOARD_STEP: u16 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nudge {
    Narrower,
    Wider,
}

#[derive(Debug)]
pub struct SidebarLayout {
    prefs: Preferences,
    width: u16,
    dragging: bool,
    help_seen: bool,
}

fn clamp_width(width: i64) -> u16 {
    width.clamp(MIN_WIDTH as i64, MAX_WIDTH as i64) as u16
}

impl SidebarLayout {
    /// Restore the persisted width (clamped) and help flag.
    pub fn load(prefs: Preferences) -> Self {
        let width = prefs.sidebar_width().map(clamp_width).unwrap_or(DEFAULT_WIDTH);
        let help_seen = prefs.sidebar_help_seen();
        Self { prefs, width, dragging: false, help_seen }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn begin_drag(&mut self) {
        self.dragging = true;
    }

    /// Track the pointer while a drag is active. Non-finite coordinates are
    /// ignored.
    pub fn drag_to(&mut self, pointer_x: f64) -> u16 {
        if self.dragging && pointer_x.is_finite() {
            self.width = clamp_width(pointer_x.round() as i64);
        }
        self.width
    }

    pub fn end_drag(&mut self) -> u16 {
        if std::mem::take(&mut self.dragging) {
            self.persist();
        }
        self.width
    }

    pub fn nudge(&mut self, direction: Nudge) -> u16 {
        let step = KEYBOARD_STEP as i64;
        let target = match direction {
            Nudge::Narrower => self.width as i64 - step,
            Nudge::Wider => self.width as i64 + step,
        };
        self.width = clamp_width(target);
        self.width
    }

    /// Double activation on the handle.
    pub fn reset(&mut self) -> u16 {
        self.dragging = false;
        self.width = DEFAULT_WIDTH;
        self.persist();
        self.width
    }

    pub fn should_show_help(&self) -> bool {
        !self.help_seen
    }

    pub fn dismiss_help(&mut self) {
        self.help_seen = true;
        if let Err(e) = self.prefs.set_sidebar_help_seen() {
            warn!(error = %e, "failed to persist sidebar help flag");
        }
    }

    fn persist(&self) {
        if let Err(e) = self.prefs.set_sidebar_width(self.width) {
            warn!(width = self.width, error = %e, "failed to persist sidebar width");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn drag_clamps_to_bounds() {
        let mut layout = SidebarLayout::load(Preferences::in_memory());
        assert_eq!(layout.width(), DEFAULT_WIDTH);

        layout.begin_drag();
        assert_eq!(layout.drag_to(1000.0), 400);
        assert_eq!(layout.drag_to(-50.0), 200);
        assert_eq!(layout.drag_to(f64::NAN), 200);
        assert_eq!(layout.drag_to(f64::MAX), 400);
        assert_eq!(layout.drag_to(333.4), 333);
    }

    #[test]
    fn pointer_moves_without_drag_are_ignored() {
        let mut layout = SidebarLayout::load(Preferences::in_memory());
        assert_eq!(layout.drag_to(350.0), DEFAULT_WIDTH);
    }

    #[test]
    fn width_persists_on_release_only() {
        let prefs = Preferences::in_memory();
        let mut layout = SidebarLayout::load(prefs.clone());

        layout.begin_drag();
        layout.drag_to(300.0);
        assert_eq!(prefs.sidebar_width(), None);
        layout.end_drag();
        assert_eq!(prefs.sidebar_width(), Some(300));

        layout.nudge(Nudge::Wider);
        assert_eq!(layout.width(), 320);
        assert_eq!(prefs.sidebar_width(), Some(300));
    }

    #[test]
    fn keyboard_steps_stay_in_range() {
        let mut layout = SidebarLayout::load(Preferences::in_memory());
        for _ in 0..50 {
            layout.nudge(Nudge::Wider);
        }
        assert_eq!(layout.width(), MAX_WIDTH);
        for _ in 0..50 {
            layout.nudge(Nudge::Narrower);
        }
        assert_eq!(layout.width(), MIN_WIDTH);
    }

    #[test]
    fn reset_restores_default_and_persists() {
        let prefs = Preferences::in_memory();
        prefs.set_sidebar_width(380).unwrap();
        let mut layout = SidebarLayout::load(prefs.clone());
        assert_eq!(layout.width(), 380);

        assert_eq!(layout.reset(), DEFAULT_WIDTH);
        assert_eq!(prefs.sidebar_width(), Some(DEFAULT_WIDTH as i64));
    }

    #[test]
    fn stored_width_is_clamped_on_load() {
        let prefs = Preferences::in_memory();
        prefs.set_sidebar_width(900).unwrap();
        assert_eq!(SidebarLayout::load(prefs).width(), MAX_WIDTH);
    }

    #[test]
    fn help_is_shown_until_dismissed() {
        let prefs = Preferences::in_memory();
        let mut layout = SidebarLayout::load(prefs.clone());
        assert!(layout.should_show_help());
        layout.dismiss_help();
        assert!(!SidebarLayout::load(prefs).should_show_help());
    }
}
