use crate::heading_index::HeadingLevel;
use crate::navigation::{NavigationShell, NavigationState};
use crate::theme::Base16Palette;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, LineGauge, List, ListItem},
};
use unicode_width::UnicodeWidthStr;

/// Rows the panel spends on its bottom progress gauge
const GAUGE_HEIGHT: u16 = 3;

/// Outline list with the active section highlighted and a progress gauge
/// underneath. Used both as the pinned sidebar and as the drawer overlay.
pub fn render_toc_panel(
    f: &mut Frame,
    area: Rect,
    state: &NavigationState,
    shell: &mut NavigationShell,
    is_focused: bool,
    as_overlay: bool,
    palette: &Base16Palette,
) -> Option<Rect> {
    if !state.has_navigation() || area.width < 4 || area.height < 4 {
        return None;
    }

    if as_overlay {
        f.render_widget(Clear, area);
    }

    let (text_color, border_color, bg_color) = palette.get_panel_colors(is_focused);
    let (selection_bg, selection_fg) = palette.get_selection_colors(is_focused);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(GAUGE_HEIGHT)])
        .split(area);

    // Border plus level indent and active marker
    let label_width = area.width.saturating_sub(6) as usize;
    let items: Vec<ListItem> = state
        .outline
        .iter()
        .map(|entry| {
            let indent = match entry.level {
                HeadingLevel::Primary => "",
                HeadingLevel::Secondary => "  ",
            };
            let is_active = state.is_active(&entry.id);
            let marker = if is_active { "▌" } else { " " };
            let style = if is_active {
                Style::default()
                    .fg(palette.base_08)
                    .add_modifier(Modifier::BOLD)
            } else if entry.level == HeadingLevel::Secondary {
                Style::default().fg(palette.base_03)
            } else {
                Style::default().fg(text_color)
            };
            let label = truncate_to_width(&entry.label, label_width.saturating_sub(indent.len()));
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(palette.base_08)),
                Span::raw(indent),
                Span::styled(label, style),
            ]))
        })
        .collect();

    let title = if as_overlay {
        " Contents (t to close) "
    } else {
        " Contents "
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(border_color))
                .style(Style::default().bg(bg_color)),
        )
        .highlight_style(Style::default().bg(selection_bg).fg(selection_fg));

    f.render_stateful_widget(list, chunks[0], &mut shell.list_state);

    let percent = state.scroll_progress.round().clamp(0.0, 100.0) as u16;
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Progress ")
                .border_style(Style::default().fg(border_color))
                .style(Style::default().bg(bg_color)),
        )
        .gauge_style(Style::default().fg(palette.base_0b).bg(palette.base_01))
        .percent(percent);
    f.render_widget(gauge, chunks[1]);

    Some(chunks[0])
}

/// One-row progress line shown above the content in drawer mode
pub fn render_progress_line(f: &mut Frame, area: Rect, progress: f64, palette: &Base16Palette) {
    let ratio = (progress / 100.0).clamp(0.0, 1.0);
    let gauge = LineGauge::default()
        .filled_style(Style::default().fg(palette.base_0b))
        .unfilled_style(Style::default().fg(palette.base_01))
        .label(format!("{:>3.0}%", progress))
        .ratio(ratio);
    f.render_widget(gauge, area);
}

/// Outline entry under a mouse row inside the list area returned by
/// [`render_toc_panel`]
pub fn entry_at_row(list_area: Rect, shell: &NavigationShell, row: u16) -> Option<usize> {
    let first_row = list_area.y + 1;
    let last_row = list_area.y + list_area.height.saturating_sub(1);
    if row < first_row || row >= last_row {
        return None;
    }
    Some(shell.list_state.offset() + (row - first_row) as usize)
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width + 1 > max_width {
            break;
        }
        out.push(ch);
        width += ch_width;
    }
    out.push('…');
    out
}
