pub mod test_helpers {
    use crate::content::GuideContent;
    use crate::event_source::{Event, KeyCode, KeyModifiers, MouseButton, MouseEventKind, SimulatedEventSource};
    use crate::main_app::App;
    use crate::settings::Settings;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    /// Builder for creating test scenarios with simulated user input
    #[derive(Default)]
    pub struct TestScenarioBuilder {
        events: Vec<Event>,
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a character key press
        pub fn press_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::char_key(c));
            self
        }

        /// Add a Ctrl+character key press
        pub fn press_ctrl_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::ctrl_char_key(c));
            self
        }

        pub fn press_enter(mut self) -> Self {
            self.events.push(SimulatedEventSource::key_event(
                KeyCode::Enter,
                KeyModifiers::empty(),
            ));
            self
        }

        pub fn press_tab(mut self) -> Self {
            self.events.push(SimulatedEventSource::key_event(
                KeyCode::Tab,
                KeyModifiers::empty(),
            ));
            self
        }

        pub fn press_esc(mut self) -> Self {
            self.events.push(SimulatedEventSource::key_event(
                KeyCode::Esc,
                KeyModifiers::empty(),
            ));
            self
        }

        /// Scroll down n lines (press 'j' n times)
        pub fn scroll_down(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('j'));
            }
            self
        }

        /// Pointer moved over a cell
        pub fn mouse_move(mut self, column: u16, row: u16) -> Self {
            self.events.push(SimulatedEventSource::mouse(
                MouseEventKind::Moved,
                column,
                row,
            ));
            self
        }

        /// Left click on a cell
        pub fn click(mut self, column: u16, row: u16) -> Self {
            self.events.push(SimulatedEventSource::mouse(
                MouseEventKind::Down(MouseButton::Left),
                column,
                row,
            ));
            self
        }

        /// Quit the application (press 'q')
        pub fn quit(mut self) -> Self {
            self.events.push(SimulatedEventSource::char_key('q'));
            self
        }

        pub fn len(&self) -> usize {
            self.events.len()
        }

        pub fn is_empty(&self) -> bool {
            self.events.is_empty()
        }

        /// Build the simulated event source
        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }
    }

    /// Settings for deterministic tests: jumps land immediately
    pub fn test_settings() -> Settings {
        Settings {
            smooth_scroll: false,
            ..Settings::default()
        }
    }

    /// App backed by in-memory preferences with `html` mounted under `page_key`
    pub fn app_with_guide(html: &str, page_key: &str) -> App {
        let mut app = App::ephemeral(test_settings());
        app.mount(GuideContent::from_html(html), page_key.to_string());
        app
    }

    /// Guide page with `sections` h2 sections of `paragraphs` paragraphs each
    pub fn long_guide_html(sections: usize, paragraphs: usize) -> String {
        let mut html = String::from("<html><head><title>Long Guide</title></head><body><article>");
        for s in 0..sections {
            html.push_str(&format!("<h2>Section {}</h2>", s + 1));
            for p in 0..paragraphs {
                html.push_str(&format!("<p>Paragraph {} of section {}.</p>", p + 1, s + 1));
            }
        }
        html.push_str("</article></body></html>");
        html
    }

    /// Create a test terminal for snapshot testing
    pub fn create_test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        Terminal::new(backend).unwrap()
    }

    /// Capture the current terminal buffer as a string
    pub fn capture_terminal_state(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut lines = Vec::new();

        for y in 0..buffer.area.height {
            let mut line = String::new();
            for x in 0..buffer.area.width {
                line.push_str(buffer[(x, y)].symbol());
            }
            // Trim trailing whitespace from each line
            lines.push(line.trim_end().to_string());
        }

        // Remove trailing empty lines
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        lines.join("\n")
    }
}
