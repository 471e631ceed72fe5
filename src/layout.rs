use crate::content::{Block, GuideContent};
use crate::heading_index::HeadingLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Heading(HeadingLevel),
    Text,
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutLine {
    pub text: String,
    pub kind: LineKind,
}

/// Lines `start..end` occupied by one heading after wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn height(&self) -> usize {
        self.end - self.start
    }

    /// Fraction of this span inside `[top, bottom)`, plus whether they touch at all
    pub fn intersection(&self, top: usize, bottom: usize) -> (bool, f64) {
        let overlap_start = self.start.max(top);
        let overlap_end = self.end.min(bottom);
        if overlap_end <= overlap_start || self.height() == 0 {
            return (false, 0.0);
        }
        let ratio = (overlap_end - overlap_start) as f64 / self.height() as f64;
        (true, ratio)
    }
}

/// Guide content wrapped to a fixed width.
///
/// This is the scrollable document: its line count is the scroll height, and
/// `heading_spans[i]` is where `GuideContent::headings[i]` ended up.
#[derive(Debug, Clone, Default)]
pub struct ContentLayout {
    pub width: u16,
    pub lines: Vec<LayoutLine>,
    pub heading_spans: Vec<LineSpan>,
}

impl ContentLayout {
    pub fn build(content: &GuideContent, width: u16) -> Self {
        let wrap_width = width.max(10) as usize;
        let mut lines: Vec<LayoutLine> = Vec::new();
        let mut heading_spans = vec![LineSpan { start: 0, end: 0 }; content.headings.len()];

        for block in &content.blocks {
            if !lines.is_empty() {
                lines.push(LayoutLine {
                    text: String::new(),
                    kind: LineKind::Blank,
                });
            }

            match block {
                Block::Heading(index) => {
                    let Some(heading) = content.heading(*index) else {
                        continue;
                    };
                    let label = match heading.text.trim() {
                        "" => format!("Section {}", index + 1),
                        text => text.to_string(),
                    };
                    let start = lines.len();
                    for wrapped in textwrap::wrap(&label, wrap_width) {
                        lines.push(LayoutLine {
                            text: wrapped.into_owned(),
                            kind: LineKind::Heading(heading.level),
                        });
                    }
                    heading_spans[*index] = LineSpan {
                        start,
                        end: lines.len(),
                    };
                }
                Block::Text(text) => {
                    for wrapped in textwrap::wrap(text, wrap_width) {
                        lines.push(LayoutLine {
                            text: wrapped.into_owned(),
                            kind: LineKind::Text,
                        });
                    }
                }
            }
        }

        Self {
            width,
            lines,
            heading_spans,
        }
    }

    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn heading_span(&self, index: usize) -> Option<LineSpan> {
        self.heading_spans.get(index).copied()
    }

    /// Largest scroll offset that still fills the viewport
    pub fn max_scroll(&self, viewport_height: usize) -> usize {
        self.total_lines().saturating_sub(viewport_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> GuideContent {
        GuideContent::from_html(
            "<article><p>Intro</p><h2>Stadium</h2><p>one two three four five six seven</p><h3>Food</h3></article>",
        )
    }

    #[test]
    fn test_heading_spans_point_at_heading_lines() {
        let layout = ContentLayout::build(&content(), 80);

        // Intro, blank, Stadium, blank, paragraph, blank, Food
        assert_eq!(layout.total_lines(), 7);
        assert_eq!(layout.heading_span(0), Some(LineSpan { start: 2, end: 3 }));
        assert_eq!(layout.heading_span(1), Some(LineSpan { start: 6, end: 7 }));
        assert_eq!(layout.lines[2].text, "Stadium");
        assert_eq!(layout.lines[6].kind, LineKind::Heading(HeadingLevel::Secondary));
    }

    #[test]
    fn test_narrow_width_wraps_text() {
        let layout = ContentLayout::build(&content(), 10);
        assert!(layout.total_lines() > 7);
        assert!(layout.lines.iter().all(|l| l.text.chars().count() <= 10));
    }

    #[test]
    fn test_intersection_ratio() {
        let span = LineSpan { start: 10, end: 12 };
        assert_eq!(span.intersection(0, 10), (false, 0.0));
        assert_eq!(span.intersection(11, 30), (true, 0.5));
        assert_eq!(span.intersection(5, 20), (true, 1.0));
    }

    #[test]
    fn test_max_scroll() {
        let layout = ContentLayout::build(&content(), 80);
        assert_eq!(layout.max_scroll(5), 2);
        assert_eq!(layout.max_scroll(50), 0);
    }
}
