use serde::{Deserialize, Serialize};

/// Layout flags the host renders. `show_celebration` is transient and is
/// never written to the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiFlags {
    #[serde(default = "default_true")]
    pub sidebar_open: bool,
    #[serde(default)]
    pub settings_open: bool,
    #[serde(default)]
    pub focus_mode: bool,
    #[serde(skip)]
    pub show_celebration: bool,
}

fn default_true() -> bool {
    true
}

impl Default for UiFlags {
    fn default() -> Self {
        Self {
            sidebar_open: true,
            settings_open: false,
            focus_mode: false,
            show_celebration: false,
        }
    }
}

impl UiFlags {
    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }

    pub fn toggle_settings(&mut self) {
        self.settings_open = !self.settings_open;
    }

    pub fn toggle_focus_mode(&mut self) {
        self.focus_mode = !self.focus_mode;
    }

    pub fn trigger_celebration(&mut self) {
        self.show_celebration = true;
    }

    pub fn hide_celebration(&mut self) {
        self.show_celebration = false;
    }
}
