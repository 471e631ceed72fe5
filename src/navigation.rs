use crate::heading_index::Outline;
use log::debug;
use ratatui::widgets::ListState;

/// What the page chrome reads to draw navigation
#[derive(Debug, Clone, Default)]
pub struct NavigationState {
    pub outline: Outline,
    pub active_id: Option<String>,
    /// 0..=100
    pub scroll_progress: f64,
    /// Scroll offset to land on for each outline entry, heading line minus its margin
    pub anchors: Vec<usize>,
}

impl NavigationState {
    pub fn new(outline: Outline, anchors: Vec<usize>) -> Self {
        let active_id = outline.first().map(|entry| entry.id.clone());
        Self {
            outline,
            active_id,
            scroll_progress: 0.0,
            anchors,
        }
    }

    pub fn has_navigation(&self) -> bool {
        !self.outline.is_empty()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_id
            .as_deref()
            .and_then(|id| self.outline.position_of(id))
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active_id.as_deref() == Some(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Wide terminal: outline pinned beside the content
    Sidebar,
    /// Narrow terminal: outline in a drawer toggled over the content
    Drawer,
}

impl LayoutMode {
    pub fn for_width(width: u16, sidebar_min_width: u16) -> Self {
        if width >= sidebar_min_width {
            LayoutMode::Sidebar
        } else {
            LayoutMode::Drawer
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollRequest {
    pub id: String,
    pub target_line: usize,
}

/// Transient UI state of the navigation chrome: drawer and cursor
pub struct NavigationShell {
    pub mode: LayoutMode,
    drawer_open: bool,
    pub list_state: ListState,
}

impl Default for NavigationShell {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationShell {
    pub fn new() -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            mode: LayoutMode::Sidebar,
            drawer_open: false,
            list_state,
        }
    }

    pub fn reset(&mut self) {
        self.drawer_open = false;
        self.list_state = ListState::default();
        self.list_state.select(Some(0));
    }

    pub fn set_mode(&mut self, mode: LayoutMode) {
        if self.mode != mode {
            debug!("Navigation layout switched to {mode:?}");
            self.mode = mode;
            if mode == LayoutMode::Sidebar {
                self.drawer_open = false;
            }
        }
    }

    pub fn is_drawer_open(&self) -> bool {
        self.mode == LayoutMode::Drawer && self.drawer_open
    }

    /// Outline visible at all in the current mode
    pub fn is_panel_visible(&self, state: &NavigationState) -> bool {
        state.has_navigation() && (self.mode == LayoutMode::Sidebar || self.drawer_open)
    }

    pub fn toggle_drawer(&mut self, state: &NavigationState) {
        if self.mode != LayoutMode::Drawer || !state.has_navigation() {
            return;
        }
        self.drawer_open = !self.drawer_open;
        if self.drawer_open {
            self.focus_active(state);
        }
    }

    pub fn close_drawer(&mut self) {
        self.drawer_open = false;
    }

    pub fn cursor(&self) -> usize {
        self.list_state.selected().unwrap_or(0)
    }

    pub fn move_cursor_down(&mut self, state: &NavigationState) {
        let len = state.outline.len();
        if len > 0 && self.cursor() + 1 < len {
            self.list_state.select(Some(self.cursor() + 1));
        }
    }

    pub fn move_cursor_up(&mut self) {
        if self.cursor() > 0 {
            self.list_state.select(Some(self.cursor() - 1));
        }
    }

    /// Put the cursor on the active section
    pub fn focus_active(&mut self, state: &NavigationState) {
        if let Some(index) = state.active_index() {
            self.list_state.select(Some(index));
        }
    }

    /// Jump to outline entry `index`. Closes the drawer in drawer mode.
    pub fn select(&mut self, index: usize, state: &NavigationState) -> Option<ScrollRequest> {
        let entry = state.outline.get(index)?;
        let target_line = state.anchors.get(index).copied()?;
        self.list_state.select(Some(index));
        if self.mode == LayoutMode::Drawer {
            self.drawer_open = false;
        }
        debug!("Navigate to #{} at line {}", entry.id, target_line);
        Some(ScrollRequest {
            id: entry.id.clone(),
            target_line,
        })
    }

    pub fn select_cursor(&mut self, state: &NavigationState) -> Option<ScrollRequest> {
        self.select(self.cursor(), state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heading_index::{HeadingLevel, HeadingNode, IndexOptions, index_headings};

    fn state(texts: &[&str]) -> NavigationState {
        let mut headings: Vec<HeadingNode> = texts
            .iter()
            .map(|t| HeadingNode::new(*t, HeadingLevel::Primary))
            .collect();
        let outline = index_headings(&mut headings, &IndexOptions::default());
        let anchors = (0..outline.len()).map(|i| i * 10).collect();
        NavigationState::new(outline, anchors)
    }

    #[test]
    fn test_layout_mode_breakpoint() {
        assert_eq!(LayoutMode::for_width(120, 100), LayoutMode::Sidebar);
        assert_eq!(LayoutMode::for_width(100, 100), LayoutMode::Sidebar);
        assert_eq!(LayoutMode::for_width(60, 100), LayoutMode::Drawer);
    }

    #[test]
    fn test_select_closes_drawer() {
        let state = state(&["Tickets", "Transit", "Food"]);
        let mut shell = NavigationShell::new();
        shell.set_mode(LayoutMode::Drawer);
        shell.toggle_drawer(&state);
        assert!(shell.is_drawer_open());

        let request = shell.select(2, &state).unwrap();
        assert_eq!(
            request,
            ScrollRequest {
                id: "food".to_string(),
                target_line: 20
            }
        );
        assert!(!shell.is_drawer_open());
    }

    #[test]
    fn test_sidebar_select_keeps_panel() {
        let state = state(&["Tickets", "Transit"]);
        let mut shell = NavigationShell::new();
        let request = shell.select(1, &state).unwrap();
        assert_eq!(request.id, "transit");
        assert!(shell.is_panel_visible(&state));
    }

    #[test]
    fn test_empty_outline_shows_nothing() {
        let state = NavigationState::default();
        let mut shell = NavigationShell::new();
        assert!(!shell.is_panel_visible(&state));

        shell.set_mode(LayoutMode::Drawer);
        shell.toggle_drawer(&state);
        assert!(!shell.is_drawer_open());
        assert!(shell.select(0, &state).is_none());
    }

    #[test]
    fn test_cursor_bounds() {
        let state = state(&["A", "B"]);
        let mut shell = NavigationShell::new();
        shell.move_cursor_up();
        assert_eq!(shell.cursor(), 0);
        shell.move_cursor_down(&state);
        shell.move_cursor_down(&state);
        assert_eq!(shell.cursor(), 1);
    }

    #[test]
    fn test_opening_drawer_focuses_active_entry() {
        let mut state = state(&["A", "B", "C"]);
        state.active_id = Some("c".to_string());
        let mut shell = NavigationShell::new();
        shell.set_mode(LayoutMode::Drawer);
        shell.toggle_drawer(&state);
        assert_eq!(shell.cursor(), 2);
    }

    #[test]
    fn test_switching_to_sidebar_closes_drawer() {
        let state = state(&["A"]);
        let mut shell = NavigationShell::new();
        shell.set_mode(LayoutMode::Drawer);
        shell.toggle_drawer(&state);
        shell.set_mode(LayoutMode::Sidebar);
        assert!(!shell.is_drawer_open());
        shell.set_mode(LayoutMode::Drawer);
        assert!(!shell.is_drawer_open());
    }
}
