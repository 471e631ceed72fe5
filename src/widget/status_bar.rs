use crate::theme::Base16Palette;
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warning,
}

/// Short-lived message shown in the status bar after a user action
#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
    expires_at: Instant,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, NoticeKind::Info, Duration::from_secs(2))
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, NoticeKind::Warning, Duration::from_secs(4))
    }

    fn new(message: impl Into<String>, kind: NoticeKind, ttl: Duration) -> Self {
        Self {
            message: message.into(),
            kind,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn styled_line(&self, palette: &Base16Palette) -> Line<'static> {
        let style = match self.kind {
            NoticeKind::Info => Style::default()
                .fg(palette.base_06)
                .bg(palette.base_02)
                .add_modifier(Modifier::BOLD),
            NoticeKind::Warning => Style::default()
                .fg(palette.base_07)
                .bg(palette.base_08)
                .add_modifier(Modifier::BOLD),
        };
        Line::from(vec![Span::styled(format!(" {} ", self.message), style)]).right_aligned()
    }
}

pub fn help_line(has_outline: bool, drawer_mode: bool, palette: &Base16Palette) -> Line<'static> {
    let mut hint = String::from("j/k scroll · s save · 1-5 rate · r preview");
    if has_outline {
        if drawer_mode {
            hint.push_str(" · t contents");
        } else {
            hint.push_str(" · Tab contents");
        }
    }
    hint.push_str(" · q quit");
    Line::from(Span::styled(hint, Style::default().fg(palette.base_03))).right_aligned()
}
