use crate::slug::{positional_id, slugify};
use log::debug;
use std::collections::HashSet;

/// Nesting depth of a heading in the outline. Only two levels are modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadingLevel {
    /// `h2`
    Primary,
    /// `h3`
    Secondary,
}

impl HeadingLevel {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "h2" => Some(HeadingLevel::Primary),
            "h3" => Some(HeadingLevel::Secondary),
            _ => None,
        }
    }
}

/// A heading element found in rendered content.
///
/// The indexer writes the final anchor id back into `existing_id`, which makes
/// the node a scroll target, and stamps `scroll_margin` on it.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingNode {
    pub existing_id: Option<String>,
    pub text: String,
    pub level: HeadingLevel,
    pub scroll_margin: u16,
}

impl HeadingNode {
    pub fn new(text: impl Into<String>, level: HeadingLevel) -> Self {
        Self {
            existing_id: None,
            text: text.into(),
            level,
            scroll_margin: 0,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.existing_id = Some(id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.existing_id.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub id: String,
    pub label: String,
    pub level: HeadingLevel,
}

/// Table of contents for one mounted document, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outline {
    entries: Vec<OutlineEntry>,
}

impl Outline {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[OutlineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&OutlineEntry> {
        self.entries.first()
    }

    pub fn get(&self, index: usize) -> Option<&OutlineEntry> {
        self.entries.get(index)
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position_of(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutlineEntry> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    /// Lines to keep free above a heading when scrolling to it (fixed header)
    pub scroll_margin: u16,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self { scroll_margin: 1 }
    }
}

/// Assign every heading a unique anchor id and build the outline.
///
/// Candidate id per heading: its existing id, else the slug of its text, else
/// `section-<n>`. A candidate already taken in this pass gets the heading's
/// position appended until it is free.
pub fn index_headings(headings: &mut [HeadingNode], options: &IndexOptions) -> Outline {
    let mut used: HashSet<String> = HashSet::with_capacity(headings.len());
    let mut entries = Vec::with_capacity(headings.len());

    for (position, heading) in headings.iter_mut().enumerate() {
        let mut candidate = heading
            .existing_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                let slug = slugify(&heading.text);
                if slug.is_empty() {
                    positional_id(position)
                } else {
                    slug
                }
            });

        while used.contains(&candidate) {
            candidate = format!("{candidate}-{position}");
        }

        let label = match heading.text.trim() {
            "" => format!("Section {}", position + 1),
            text => text.to_string(),
        };

        heading.existing_id = Some(candidate.clone());
        heading.scroll_margin = options.scroll_margin;
        used.insert(candidate.clone());

        entries.push(OutlineEntry {
            id: candidate,
            label,
            level: heading.level,
        });
    }

    debug!("Indexed {} headings", entries.len());
    Outline { entries }
}
