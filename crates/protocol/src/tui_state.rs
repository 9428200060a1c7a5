use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Which pane currently has input focus. Encoded on the wire as the
/// integers §6.2 specifies (0=sidebar, 1=main, 2=detail), not as a
/// string, since the original protocol fixes these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum FocusArea {
    Sidebar = 0,
    Main = 1,
    Detail = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigMode {
    Projects,
    Browser,
    Settings,
}

/// Opaque-to-the-daemon presentation state a client hands off on detach
/// and receives back on the next attach (§3, §6.2). The core never reads
/// or writes these fields; it only custodies the whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuiState {
    pub current_view: String,
    pub focus_area: FocusArea,
    pub sidebar_selection: usize,
    pub main_selection: usize,
    pub detail_selection: usize,
    pub main_scroll: usize,
    pub detail_scroll: usize,
    pub config_mode: ConfigMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_source_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_type_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_search_filter: Option<String>,
    pub log_scroll_offset: usize,
    pub log_auto_scroll: bool,
    pub git_show_diff: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_build_profile: Option<String>,
}
