// Export modules for use in tests
pub mod active_section;
pub mod content;
pub mod event_source;
pub mod heading_index;
pub mod layout;
pub mod main_app;
pub mod navigation;
pub mod panic_handler;
pub mod preferences;
pub mod progress;
pub mod rating;
pub mod settings;
pub mod slug;
pub mod theme;
pub mod widget;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main app components
pub use main_app::{App, AppAction, FocusedPanel, run_app_with_event_source};
