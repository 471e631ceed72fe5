//! Which section is being read right now.
//!
//! The selection rule lives in [`reduce`], a pure function over visibility
//! batches. [`SectionObserver`] produces those batches from heading geometry
//! and [`ActiveSectionTracker`] owns the attach/detach lifecycle so batches
//! from content that is no longer mounted are dropped.

use crate::heading_index::Outline;
use crate::layout::LineSpan;
use log::{debug, trace};

/// Part of the viewport in which a heading counts as "in focus".
///
/// Margins shrink the viewport from the top and bottom, the way an
/// intersection observer root margin does. The default ignores the lower 60%
/// so a heading only becomes active once it reaches the upper 40%.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionBand {
    pub top_margin_pct: f64,
    pub bottom_margin_pct: f64,
}

impl Default for DetectionBand {
    fn default() -> Self {
        Self {
            top_margin_pct: 0.0,
            bottom_margin_pct: 60.0,
        }
    }
}

impl DetectionBand {
    pub fn new(top_margin_pct: f64, bottom_margin_pct: f64) -> Self {
        let top = top_margin_pct.clamp(0.0, 100.0);
        let bottom = bottom_margin_pct.clamp(0.0, 100.0 - top);
        Self {
            top_margin_pct: top,
            bottom_margin_pct: bottom,
        }
    }

    /// Absolute line range `[top, bottom)` of the band for a scroll position.
    /// Never narrower than one line.
    pub fn bounds(&self, scroll_top: usize, viewport_height: usize) -> (usize, usize) {
        let height = viewport_height as f64;
        let top = scroll_top + (height * self.top_margin_pct / 100.0).round() as usize;
        let bottom =
            scroll_top + (height * (100.0 - self.bottom_margin_pct) / 100.0).round() as usize;
        (top, bottom.max(top + 1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityEntry {
    pub id: String,
    /// Document position, used to break ratio ties
    pub position: usize,
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
}

/// Entries whose visibility changed in one measurement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisibilityBatch {
    pub generation: u64,
    pub entries: Vec<VisibilityEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActiveSection {
    active_id: Option<String>,
}

impl ActiveSection {
    /// First outline entry, so something is highlighted before any scrolling
    pub fn initial(outline: &Outline) -> Self {
        Self {
            active_id: outline.first().map(|entry| entry.id.clone()),
        }
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }
}

/// Pick the most visible intersecting heading in `batch`.
///
/// Ties go to the earliest heading in the document. A batch with nothing
/// intersecting leaves the current section in place.
pub fn reduce(state: &ActiveSection, batch: &VisibilityBatch) -> ActiveSection {
    let candidate = batch
        .entries
        .iter()
        .filter(|entry| entry.is_intersecting)
        .min_by(|a, b| {
            b.intersection_ratio
                .total_cmp(&a.intersection_ratio)
                .then(a.position.cmp(&b.position))
        });

    match candidate {
        Some(entry) => ActiveSection {
            active_id: Some(entry.id.clone()),
        },
        None => state.clone(),
    }
}

/// Measures heading visibility and reports changes, like an intersection
/// observer bound to one mounted document.
#[derive(Debug)]
pub struct SectionObserver {
    generation: u64,
    targets: Vec<(String, LineSpan)>,
    band: DetectionBand,
    last_seen: Vec<Option<(bool, f64)>>,
}

impl SectionObserver {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Replace heading geometry after a relayout; every target reports again
    pub fn retarget(&mut self, spans: &[LineSpan]) {
        debug_assert_eq!(
            spans.len(),
            self.targets.len(),
            "retarget needs one span per observed heading"
        );
        for ((_, span), new_span) in self.targets.iter_mut().zip(spans) {
            *span = *new_span;
        }
        self.last_seen.iter_mut().for_each(|seen| *seen = None);
    }

    /// Entries whose intersection state or ratio changed since the last call.
    /// The first call reports every target.
    pub fn measure(&mut self, scroll_top: usize, viewport_height: usize) -> VisibilityBatch {
        let (top, bottom) = self.band.bounds(scroll_top, viewport_height);
        let mut entries = Vec::new();

        for (position, (id, span)) in self.targets.iter().enumerate() {
            let (is_intersecting, ratio) = span.intersection(top, bottom);
            let current = Some((is_intersecting, ratio));
            if self.last_seen[position] != current {
                self.last_seen[position] = current;
                entries.push(VisibilityEntry {
                    id: id.clone(),
                    position,
                    is_intersecting,
                    intersection_ratio: ratio,
                });
            }
        }

        trace!(
            "Observer gen {} measured band {}..{}: {} changes",
            self.generation,
            top,
            bottom,
            entries.len()
        );
        VisibilityBatch {
            generation: self.generation,
            entries,
        }
    }
}

/// Owns the active section and the observer lifecycle for mounted content.
#[derive(Debug, Default)]
pub struct ActiveSectionTracker {
    state: ActiveSection,
    generation: u64,
    attached: bool,
}

impl ActiveSectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start observing a freshly indexed outline.
    ///
    /// `spans[i]` must be the geometry of `outline` entry `i`. Any observer
    /// handed out earlier is invalidated.
    pub fn attach(
        &mut self,
        outline: &Outline,
        spans: &[LineSpan],
        band: DetectionBand,
    ) -> SectionObserver {
        self.generation += 1;
        self.attached = true;
        self.state = ActiveSection::initial(outline);

        let targets: Vec<(String, LineSpan)> = outline
            .ids()
            .zip(spans.iter().copied())
            .map(|(id, span)| (id.to_string(), span))
            .collect();
        debug!(
            "Attached section observer gen {} to {} headings",
            self.generation,
            targets.len()
        );

        SectionObserver {
            generation: self.generation,
            last_seen: vec![None; targets.len()],
            targets,
            band,
        }
    }

    /// Release observation. Batches already in flight become no-ops.
    pub fn detach(&mut self) {
        if self.attached {
            debug!("Detached section observer gen {}", self.generation);
        }
        self.generation += 1;
        self.attached = false;
        self.state = ActiveSection::default();
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Feed one batch; returns true when the active section changed
    pub fn apply(&mut self, batch: &VisibilityBatch) -> bool {
        if !self.attached || batch.generation != self.generation {
            trace!(
                "Ignoring stale visibility batch gen {} (current {})",
                batch.generation, self.generation
            );
            return false;
        }
        let next = reduce(&self.state, batch);
        let changed = next != self.state;
        self.state = next;
        changed
    }

    pub fn active_id(&self) -> Option<&str> {
        self.state.active_id()
    }

    pub fn state(&self) -> &ActiveSection {
        &self.state
    }
}
