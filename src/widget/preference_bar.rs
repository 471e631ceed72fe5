use crate::preferences::MAX_RATING;
use crate::rating::StarRating;
use crate::theme::Base16Palette;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
};

const SAVED_LABEL: &str = "[★ Saved]";
const UNSAVED_LABEL: &str = "[☆ Save]";
/// Column where the first star starts, after the save toggle and a gap
const STARS_OFFSET: u16 = 11;

/// Save toggle followed by five stars. Stars show the hover preview if any,
/// otherwise the committed rating.
pub fn preference_line(
    saved: bool,
    rating: &StarRating,
    rating_mode: bool,
    palette: &Base16Palette,
) -> Line<'static> {
    let (save_label, save_style) = if saved {
        (
            SAVED_LABEL,
            Style::default()
                .fg(palette.base_0a)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        (UNSAVED_LABEL, Style::default().fg(palette.base_04))
    };

    let mut spans = vec![
        Span::styled(format!("{save_label:<width$}", width = STARS_OFFSET as usize), save_style),
    ];

    let filled = rating.displayed();
    let star_color = if rating.hovered().is_some() {
        palette.base_0c
    } else {
        palette.base_0a
    };
    for star in 1..=MAX_RATING {
        let (symbol, style) = if star <= filled {
            ("★", Style::default().fg(star_color))
        } else {
            ("☆", Style::default().fg(palette.base_03))
        };
        spans.push(Span::styled(format!("{symbol} "), style));
    }

    let hint = if rating_mode {
        " h/l preview · Enter rate · Esc cancel"
    } else if rating.committed() == 0 {
        " not rated"
    } else {
        ""
    };
    spans.push(Span::styled(hint, Style::default().fg(palette.base_03)));

    Line::from(spans)
}

/// Star (1-based) under column `column` when the line was drawn at `area`
pub fn star_at(area: Rect, column: u16, row: u16) -> Option<u8> {
    if row != area.y || column < area.x + STARS_OFFSET {
        return None;
    }
    // Each star takes a symbol and a space
    let star = (column - area.x - STARS_OFFSET) / 2 + 1;
    (star <= MAX_RATING as u16).then_some(star as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::OCEANIC_NEXT;

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_committed_rating_drawn() {
        let rating = StarRating::new(4);
        let line = preference_line(true, &rating, false, &OCEANIC_NEXT);
        assert_eq!(plain(&line), "[★ Saved]  ★ ★ ★ ★ ☆ ");
    }

    #[test]
    fn test_hover_preview_drawn_without_commit() {
        let mut rating = StarRating::new(4);
        rating.hover(2);
        let line = preference_line(false, &rating, true, &OCEANIC_NEXT);
        let text = plain(&line);
        assert!(text.starts_with("[☆ Save]   ★ ★ ☆ ☆ ☆ "));
        assert!(text.contains("Enter rate"));
        assert_eq!(rating.committed(), 4);
    }

    #[test]
    fn test_star_at() {
        let area = Rect::new(2, 10, 60, 1);
        assert_eq!(star_at(area, 2 + STARS_OFFSET, 10), Some(1));
        assert_eq!(star_at(area, 2 + STARS_OFFSET + 1, 10), Some(1));
        assert_eq!(star_at(area, 2 + STARS_OFFSET + 8, 10), Some(5));
        assert_eq!(star_at(area, 2 + STARS_OFFSET + 10, 10), None);
        assert_eq!(star_at(area, 3, 10), None);
        assert_eq!(star_at(area, 2 + STARS_OFFSET, 11), None);
    }
}
