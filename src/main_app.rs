use crate::active_section::{ActiveSectionTracker, SectionObserver};
use crate::content::GuideContent;
use crate::event_source::{
    Event, EventSource, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use crate::heading_index::{HeadingLevel, IndexOptions, Outline, index_headings};
use crate::layout::{ContentLayout, LineKind};
use crate::navigation::{LayoutMode, NavigationShell, NavigationState, ScrollRequest};
use crate::preferences::{KeyValueStorage, MemoryStorage, PreferenceStore};
use crate::progress::{ProgressMeter, ScrollMetrics};
use crate::rating::StarRating;
use crate::settings::Settings;
use crate::theme::current_theme;
use crate::widget::preference_bar::{preference_line, star_at};
use crate::widget::status_bar::{Notice, help_line};
use crate::widget::toc_panel::{entry_at_row, render_progress_line, render_toc_panel};
use anyhow::Result;
use log::{debug, info};
use ratatui::{
    Frame, Terminal,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use std::path::Path;
use std::time::{Duration, Instant};

/// Width of the save toggle plus stars in the status bar
const PREFERENCE_BAR_WIDTH: u16 = 44;
const DEFAULT_VIEWPORT: (u16, u16) = (80, 20);
const MOUSE_SCROLL_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPanel {
    Content,
    Outline,
}

/// Page key used for preferences when none is given: `/guide/<file stem>`
pub fn page_key_for_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "index".to_string());
    format!("/guide/{stem}")
}

/// Content currently mounted in the reader together with its observer
struct MountedGuide {
    page_key: String,
    title: Option<String>,
    content: GuideContent,
    layout: ContentLayout,
    observer: SectionObserver,
}

pub struct App {
    settings: Settings,
    pub preferences: PreferenceStore<Box<dyn KeyValueStorage>>,
    guide: Option<MountedGuide>,
    pub navigation: NavigationState,
    pub shell: NavigationShell,
    tracker: ActiveSectionTracker,
    meter: ProgressMeter,
    pub rating: StarRating,
    pub saved: bool,
    pub rating_mode: bool,
    pub focused_panel: FocusedPanel,
    pub scroll_offset: usize,
    content_width: u16,
    viewport_height: u16,
    scroll_target: Option<usize>,
    notice: Option<Notice>,
    toc_list_area: Option<Rect>,
    stars_area: Option<Rect>,
}

impl App {
    pub fn new(settings: Settings, preferences: PreferenceStore<Box<dyn KeyValueStorage>>) -> Self {
        Self {
            settings,
            preferences,
            guide: None,
            navigation: NavigationState::default(),
            shell: NavigationShell::new(),
            tracker: ActiveSectionTracker::new(),
            meter: ProgressMeter::new(),
            rating: StarRating::default(),
            saved: false,
            rating_mode: false,
            focused_panel: FocusedPanel::Content,
            scroll_offset: 0,
            content_width: DEFAULT_VIEWPORT.0,
            viewport_height: DEFAULT_VIEWPORT.1,
            scroll_target: None,
            notice: None,
            toc_list_area: None,
            stars_area: None,
        }
    }

    /// App with preferences kept in memory only
    pub fn ephemeral(settings: Settings) -> Self {
        let storage: Box<dyn KeyValueStorage> = Box::new(MemoryStorage::new());
        let preferences = PreferenceStore::with_namespace(storage, &settings.namespace);
        Self::new(settings, preferences)
    }

    pub fn load_guide(&mut self, path: &Path, page_key: Option<String>) -> Result<()> {
        info!("Loading guide page {}", path.display());
        let content = GuideContent::from_file(path)?;
        let page_key = page_key.unwrap_or_else(|| page_key_for_path(path));
        self.mount(content, page_key);
        Ok(())
    }

    /// Index headings, lay out content and start observing it.
    /// Replaces whatever was mounted before.
    pub fn mount(&mut self, mut content: GuideContent, page_key: String) {
        self.unmount();

        let options = IndexOptions {
            scroll_margin: self.settings.scroll_margin,
        };
        let outline = index_headings(&mut content.headings, &options);
        let layout = ContentLayout::build(&content, self.content_width);
        let observer =
            self.tracker
                .attach(&outline, &layout.heading_spans, self.settings.detection_band());
        let anchors = scroll_anchors(&content, &layout);

        info!(
            "Mounted {page_key}: {} outline entries, {} lines",
            outline.len(),
            layout.total_lines()
        );

        self.navigation = NavigationState::new(outline, anchors);
        self.shell.reset();
        self.focused_panel = FocusedPanel::Content;

        let record = self.preferences.record(&page_key);
        self.saved = record.saved;
        self.rating = StarRating::new(record.rating);

        self.guide = Some(MountedGuide {
            page_key,
            title: content.title.clone(),
            content,
            layout,
            observer,
        });
        self.scroll_offset = 0;
        self.on_scroll();
    }

    /// Drop the mounted guide and release its observer
    pub fn unmount(&mut self) {
        if let Some(guide) = self.guide.take() {
            debug!("Unmounting {}", guide.page_key);
            self.tracker.detach();
        }
        self.navigation = NavigationState::default();
        self.meter.reset();
        self.scroll_target = None;
        self.rating_mode = false;
        self.toc_list_area = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.guide.is_some()
    }

    pub fn page_key(&self) -> Option<&str> {
        self.guide.as_ref().map(|g| g.page_key.as_str())
    }

    pub fn outline(&self) -> &Outline {
        &self.navigation.outline
    }

    pub fn active_id(&self) -> Option<&str> {
        self.navigation.active_id.as_deref()
    }

    pub fn progress(&self) -> f64 {
        self.navigation.scroll_progress
    }

    pub fn is_observing(&self) -> bool {
        self.tracker.is_attached()
    }

    fn total_lines(&self) -> usize {
        self.guide.as_ref().map_or(0, |g| g.layout.total_lines())
    }

    fn max_scroll(&self) -> usize {
        self.guide
            .as_ref()
            .map_or(0, |g| g.layout.max_scroll(self.viewport_height as usize))
    }

    /// Feed the new scroll position to the progress meter and the observer
    fn on_scroll(&mut self) {
        self.scroll_offset = self.scroll_offset.min(self.max_scroll());
        self.meter.note_scroll(ScrollMetrics {
            scroll_top: self.scroll_offset,
            scroll_height: self.total_lines(),
            viewport_height: self.viewport_height as usize,
        });

        let Some(guide) = self.guide.as_mut() else {
            return;
        };
        let batch = guide
            .observer
            .measure(self.scroll_offset, self.viewport_height as usize);
        if self.tracker.apply(&batch) {
            self.navigation.active_id = self.tracker.active_id().map(str::to_string);
            debug!("Active section: {:?}", self.navigation.active_id);
        }
    }

    pub fn scroll_by(&mut self, delta: isize) {
        self.scroll_target = None;
        self.scroll_offset = self.scroll_offset.saturating_add_signed(delta);
        self.on_scroll();
    }

    pub fn scroll_to_line(&mut self, line: usize) {
        self.scroll_target = None;
        self.scroll_offset = line;
        self.on_scroll();
    }

    /// Start moving to a navigation target, animated when smooth scrolling is on
    pub fn scroll_to(&mut self, request: ScrollRequest) {
        let target = request.target_line.min(self.max_scroll());
        debug!("Scrolling to #{} at line {target}", request.id);
        if self.settings.smooth_scroll {
            self.scroll_target = Some(target);
        } else {
            self.scroll_to_line(target);
        }
    }

    /// Advance one animation step towards the pending scroll target
    fn step_smooth_scroll(&mut self) -> bool {
        let Some(target) = self.scroll_target else {
            return false;
        };
        // The document may have become shorter than the target since the jump started
        let target = target.min(self.max_scroll());
        let distance = target.abs_diff(self.scroll_offset);
        if distance == 0 {
            self.scroll_target = None;
            return false;
        }
        let step = (distance / 3).max(1);
        if target > self.scroll_offset {
            self.scroll_offset += step;
        } else {
            self.scroll_offset -= step;
        }
        self.on_scroll();
        if self.scroll_offset == target {
            self.scroll_target = None;
        }
        true
    }

    /// Relayout when the content pane changes size
    pub fn resize_viewport(&mut self, width: u16, height: u16) {
        let height = height.max(1);
        if width == self.content_width && height == self.viewport_height {
            return;
        }
        let progress = self.navigation.scroll_progress;
        self.viewport_height = height;

        if width != self.content_width {
            self.content_width = width;
            if let Some(guide) = self.guide.as_mut() {
                guide.layout = ContentLayout::build(&guide.content, width);
                guide.observer.retarget(&guide.layout.heading_spans);
                self.navigation.anchors = scroll_anchors(&guide.content, &guide.layout);
                debug!(
                    "Relayout at width {width}: {} lines",
                    guide.layout.total_lines()
                );
            }
            // Keep the reader at roughly the same place in the document
            self.scroll_offset = (progress / 100.0 * self.max_scroll() as f64).round() as usize;
        }
        self.on_scroll();
        self.scroll_target = self.scroll_target.map(|target| target.min(self.max_scroll()));
    }

    /// Called once per rendered frame
    fn on_frame(&mut self) {
        self.navigation.scroll_progress = self.meter.on_frame();
    }

    /// Periodic work between frames; returns true when a redraw is needed
    pub fn tick(&mut self) -> bool {
        let mut redraw = self.step_smooth_scroll();
        if self.notice.as_ref().is_some_and(Notice::is_expired) {
            self.notice = None;
            redraw = true;
        }
        redraw
    }

    fn outline_has_focus(&self) -> bool {
        if !self.navigation.has_navigation() {
            return false;
        }
        match self.shell.mode {
            LayoutMode::Drawer => self.shell.is_drawer_open(),
            LayoutMode::Sidebar => self.focused_panel == FocusedPanel::Outline,
        }
    }

    pub fn toggle_saved(&mut self) {
        let Some(page) = self.page_key().map(str::to_string) else {
            return;
        };
        self.saved = !self.saved;
        self.preferences.set_saved(&page, self.saved);
        self.notice = Some(Notice::info(if self.saved {
            "Guide saved"
        } else {
            "Removed from saved guides"
        }));
    }

    pub fn commit_rating(&mut self, stars: u8) {
        self.rating_mode = false;
        if !self.is_mounted() {
            return;
        }
        if let Some(stars) = self.rating.commit(stars) {
            self.persist_rating(stars);
        }
    }

    /// Commit whatever the preview currently shows
    fn commit_preview(&mut self) {
        self.rating_mode = false;
        if let Some(stars) = self.rating.commit_hover() {
            self.persist_rating(stars);
        }
    }

    fn persist_rating(&mut self, stars: u8) {
        let Some(page) = self.page_key().map(str::to_string) else {
            return;
        };
        self.preferences.set_rating(&page, stars);
        self.notice = Some(Notice::info(format!("Rated {stars}/5")));
    }

    pub fn clear_rating(&mut self) {
        let Some(page) = self.page_key().map(str::to_string) else {
            return;
        };
        if self.rating.committed() == 0 {
            self.notice = Some(Notice::warning("Not rated yet"));
            return;
        }
        self.rating.clear();
        self.preferences.clear_rating(&page);
        self.notice = Some(Notice::info("Rating cleared"));
    }

    fn navigate_to(&mut self, index: usize) {
        if let Some(request) = self.shell.select(index, &self.navigation) {
            self.focused_panel = FocusedPanel::Content;
            self.scroll_to(request);
        }
    }

    fn navigate_to_cursor(&mut self) {
        if let Some(request) = self.shell.select_cursor(&self.navigation) {
            self.focused_panel = FocusedPanel::Content;
            self.scroll_to(request);
        }
    }

    fn handle_rating_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('h') | KeyCode::Left => self.rating.hover_step(-1),
            KeyCode::Char('l') | KeyCode::Right => self.rating.hover_step(1),
            KeyCode::Char(c @ '1'..='5') => {
                self.rating.hover(c as u8 - b'0');
            }
            KeyCode::Enter => self.commit_preview(),
            KeyCode::Esc | KeyCode::Char('r') => {
                self.rating.leave();
                self.rating_mode = false;
            }
            _ => {}
        }
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<AppAction> {
        if self.rating_mode {
            self.handle_rating_key(key);
            return None;
        }

        let half_page = (self.viewport_height as isize / 2).max(1);
        let outline_focus = self.outline_has_focus();

        match (key.code, key.modifiers) {
            (KeyCode::Char('q'), _) => return Some(AppAction::Quit),
            (KeyCode::Char('d'), KeyModifiers::CONTROL) => self.scroll_by(half_page),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => self.scroll_by(-half_page),
            (KeyCode::PageDown, _) => self.scroll_by(self.viewport_height as isize),
            (KeyCode::PageUp, _) => self.scroll_by(-(self.viewport_height as isize)),
            (KeyCode::Char('j') | KeyCode::Down, _) if outline_focus => {
                self.shell.move_cursor_down(&self.navigation)
            }
            (KeyCode::Char('k') | KeyCode::Up, _) if outline_focus => self.shell.move_cursor_up(),
            (KeyCode::Char('j') | KeyCode::Down, _) => self.scroll_by(1),
            (KeyCode::Char('k') | KeyCode::Up, _) => self.scroll_by(-1),
            (KeyCode::Char('J'), _) => self.shell.move_cursor_down(&self.navigation),
            (KeyCode::Char('K'), _) => self.shell.move_cursor_up(),
            (KeyCode::Char('g') | KeyCode::Home, _) => self.scroll_to_line(0),
            (KeyCode::Char('G') | KeyCode::End, _) => self.scroll_to_line(self.max_scroll()),
            (KeyCode::Char('t'), _) => self.shell.toggle_drawer(&self.navigation),
            (KeyCode::Tab, _) => match self.shell.mode {
                LayoutMode::Drawer => self.shell.toggle_drawer(&self.navigation),
                LayoutMode::Sidebar if self.navigation.has_navigation() => {
                    self.focused_panel = match self.focused_panel {
                        FocusedPanel::Content => {
                            self.shell.focus_active(&self.navigation);
                            FocusedPanel::Outline
                        }
                        FocusedPanel::Outline => FocusedPanel::Content,
                    };
                }
                LayoutMode::Sidebar => {}
            },
            (KeyCode::Enter, _) if self.shell.is_panel_visible(&self.navigation) => {
                self.navigate_to_cursor()
            }
            (KeyCode::Esc, _) => {
                self.shell.close_drawer();
                self.focused_panel = FocusedPanel::Content;
            }
            (KeyCode::Char('s'), _) => self.toggle_saved(),
            (KeyCode::Char(c @ '1'..='5'), _) => self.commit_rating(c as u8 - b'0'),
            (KeyCode::Char('r'), _) if self.is_mounted() => {
                self.rating_mode = true;
                self.rating.hover(self.rating.committed().max(1));
            }
            (KeyCode::Char('x'), _) => self.clear_rating(),
            _ => {}
        }
        None
    }

    pub fn handle_mouse_event(&mut self, mouse: MouseEvent) {
        let star = self
            .stars_area
            .and_then(|area| star_at(area, mouse.column, mouse.row));
        let toc_entry = self
            .toc_list_area
            .filter(|area| area.contains((mouse.column, mouse.row).into()))
            .and_then(|area| entry_at_row(area, &self.shell, mouse.row))
            .filter(|index| *index < self.navigation.outline.len());

        match mouse.kind {
            MouseEventKind::ScrollDown => self.scroll_by(MOUSE_SCROLL_LINES as isize),
            MouseEventKind::ScrollUp => self.scroll_by(-(MOUSE_SCROLL_LINES as isize)),
            MouseEventKind::Moved => match star {
                Some(stars) => self.rating.hover(stars),
                None if !self.rating_mode => self.rating.leave(),
                None => {}
            },
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(stars) = star {
                    self.commit_rating(stars);
                } else if let Some(index) = toc_entry {
                    self.navigate_to(index);
                }
            }
            _ => {}
        }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let palette = current_theme();
        let area = f.area();

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        let (main_area, status_area) = (rows[0], rows[1]);

        self.shell.set_mode(LayoutMode::for_width(
            area.width,
            self.settings.sidebar_min_width,
        ));
        let has_navigation = self.navigation.has_navigation();
        if self.shell.mode == LayoutMode::Drawer && self.focused_panel == FocusedPanel::Outline {
            self.focused_panel = FocusedPanel::Content;
        }

        let (sidebar_area, progress_area, content_area) = match self.shell.mode {
            LayoutMode::Sidebar if has_navigation => {
                let columns = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([
                        Constraint::Length(self.settings.sidebar_width),
                        Constraint::Min(1),
                    ])
                    .split(main_area);
                (Some(columns[0]), None, columns[1])
            }
            LayoutMode::Drawer if has_navigation => {
                let split = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Length(1), Constraint::Min(1)])
                    .split(main_area);
                (None, Some(split[0]), split[1])
            }
            _ => (None, None, main_area),
        };

        let content_block = Block::default()
            .borders(Borders::ALL)
            .title(self.content_title())
            .border_style(Style::default().fg(palette.get_panel_colors(!self.outline_has_focus()).1))
            .style(Style::default().bg(palette.base_00));
        let inner = content_block.inner(content_area);
        self.resize_viewport(inner.width, inner.height);
        self.on_frame();

        let paragraph = Paragraph::new(self.visible_lines()).block(content_block);
        f.render_widget(paragraph, content_area);

        self.toc_list_area = None;
        if let Some(sidebar) = sidebar_area {
            let focused = self.focused_panel == FocusedPanel::Outline;
            self.toc_list_area = render_toc_panel(
                f,
                sidebar,
                &self.navigation,
                &mut self.shell,
                focused,
                false,
                palette,
            );
        }
        if let Some(progress) = progress_area {
            render_progress_line(f, progress, self.navigation.scroll_progress, palette);
        }
        if self.shell.is_drawer_open() {
            let drawer = Rect {
                width: self.settings.sidebar_width.min(main_area.width),
                ..main_area
            };
            self.toc_list_area = render_toc_panel(
                f,
                drawer,
                &self.navigation,
                &mut self.shell,
                true,
                true,
                palette,
            );
        }

        let status = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(PREFERENCE_BAR_WIDTH), Constraint::Min(0)])
            .split(status_area);
        self.stars_area = None;
        if self.is_mounted() {
            f.render_widget(
                Paragraph::new(preference_line(
                    self.saved,
                    &self.rating,
                    self.rating_mode,
                    palette,
                )),
                status[0],
            );
            self.stars_area = Some(status[0]);
        }
        let right = match &self.notice {
            Some(notice) => notice.styled_line(palette),
            None => help_line(has_navigation, self.shell.mode == LayoutMode::Drawer, palette),
        };
        f.render_widget(Paragraph::new(right), status[1]);
    }

    fn content_title(&self) -> String {
        match &self.guide {
            Some(guide) => {
                let title = guide.title.as_deref().unwrap_or(&guide.page_key);
                format!(" {title} ")
            }
            None => " guidenav ".to_string(),
        }
    }

    fn visible_lines(&self) -> Vec<Line<'static>> {
        let palette = current_theme();
        let Some(guide) = &self.guide else {
            return vec![Line::from(Span::styled(
                "No guide loaded.",
                Style::default().fg(palette.base_03),
            ))];
        };

        guide
            .layout
            .lines
            .iter()
            .skip(self.scroll_offset)
            .take(self.viewport_height as usize)
            .map(|line| {
                let style = match line.kind {
                    LineKind::Heading(HeadingLevel::Primary) => Style::default()
                        .fg(palette.base_0d)
                        .add_modifier(Modifier::BOLD),
                    LineKind::Heading(HeadingLevel::Secondary) => Style::default()
                        .fg(palette.base_0c)
                        .add_modifier(Modifier::BOLD),
                    LineKind::Text | LineKind::Blank => Style::default().fg(palette.base_05),
                };
                Line::from(Span::styled(line.text.clone(), style))
            })
            .collect()
    }
}

/// Scroll offset that puts each heading just below its scroll margin
fn scroll_anchors(content: &GuideContent, layout: &ContentLayout) -> Vec<usize> {
    content
        .headings
        .iter()
        .enumerate()
        .map(|(index, heading)| {
            layout
                .heading_span(index)
                .map_or(0, |span| span.start.saturating_sub(heading.scroll_margin as usize))
        })
        .collect()
}

pub fn run_app_with_event_source<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(33);
    let mut last_tick = Instant::now();

    // Size the layout before any input is handled
    terminal.draw(|f| app.draw(f))?;

    loop {
        let mut events_processed = 0;
        let mut should_quit = false;
        while event_source.poll(Duration::from_millis(0))? && events_processed < 50 {
            let event = event_source.read()?;
            events_processed += 1;

            match event {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.handle_key_event(key) == Some(AppAction::Quit) {
                        should_quit = true;
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse_event(mouse),
                // Picked up by the next draw
                Event::Resize(_, _) => {}
                _ => {}
            }

            if should_quit {
                break;
            }
        }

        let mut needs_redraw = events_processed > 0;
        if last_tick.elapsed() >= tick_rate {
            if app.tick() {
                needs_redraw = true;
            }
            last_tick = Instant::now();
        }

        if needs_redraw {
            terminal.draw(|f| app.draw(f))?;
        }

        if should_quit {
            return Ok(());
        }

        if events_processed == 0 {
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));
            let _ = event_source.poll(timeout);
        }
    }
}
