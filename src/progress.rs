/// Scroll completion in percent, clamped to `[0, 100]`.
///
/// A document that fits in the viewport has nothing to scroll and reports 0.
pub fn compute_progress(scroll_top: f64, scroll_height: f64, viewport_height: f64) -> f64 {
    let scrollable = (scroll_height - viewport_height).max(0.0);
    if scrollable <= 0.0 || !scrollable.is_finite() || !scroll_top.is_finite() {
        return 0.0;
    }
    (100.0 * scroll_top / scrollable).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: usize,
    pub scroll_height: usize,
    pub viewport_height: usize,
}

impl ScrollMetrics {
    pub fn progress(&self) -> f64 {
        compute_progress(
            self.scroll_top as f64,
            self.scroll_height as f64,
            self.viewport_height as f64,
        )
    }
}

/// Coalesces scroll notifications so progress is computed at most once per
/// rendered frame no matter how many scroll events arrived in between.
#[derive(Debug, Default)]
pub struct ProgressMeter {
    pending: Option<ScrollMetrics>,
    value: f64,
    computations: usize,
}

impl ProgressMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note_scroll(&mut self, metrics: ScrollMetrics) {
        self.pending = Some(metrics);
    }

    /// Called once per frame; recomputes only if a scroll was noted since the last frame
    pub fn on_frame(&mut self) -> f64 {
        if let Some(metrics) = self.pending.take() {
            self.value = metrics.progress();
            self.computations += 1;
        }
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn reset(&mut self) {
        self.pending = None;
        self.value = 0.0;
    }

    /// Number of frames that actually recomputed progress
    pub fn computations(&self) -> usize {
        self.computations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midway() {
        assert_eq!(compute_progress(150.0, 1150.0, 650.0), 30.0);
    }

    #[test]
    fn test_short_document_is_zero() {
        assert_eq!(compute_progress(0.0, 600.0, 800.0), 0.0);
        assert_eq!(compute_progress(50.0, 600.0, 800.0), 0.0);
        assert_eq!(compute_progress(0.0, 800.0, 800.0), 0.0);
    }

    #[test]
    fn test_clamped() {
        assert_eq!(compute_progress(900.0, 1000.0, 500.0), 100.0);
        assert_eq!(compute_progress(500.0, 1000.0, 500.0), 100.0);
        assert_eq!(compute_progress(0.0, 1000.0, 500.0), 0.0);
    }

    #[test]
    fn test_always_in_range() {
        for top in (0..2000).step_by(37) {
            for height in (0..2000).step_by(113) {
                for viewport in (0..1000).step_by(71) {
                    let p = compute_progress(top as f64, height as f64, viewport as f64);
                    assert!((0.0..=100.0).contains(&p), "{top} {height} {viewport} -> {p}");
                }
            }
        }
    }

    #[test]
    fn test_meter_computes_once_per_frame() {
        let mut meter = ProgressMeter::new();
        for top in 0..10 {
            meter.note_scroll(ScrollMetrics {
                scroll_top: top * 10,
                scroll_height: 300,
                viewport_height: 100,
            });
        }
        assert_eq!(meter.on_frame(), 45.0);
        assert_eq!(meter.computations(), 1);

        // Nothing new: value held, no recomputation
        assert_eq!(meter.on_frame(), 45.0);
        assert_eq!(meter.computations(), 1);
    }

    #[test]
    fn test_reset() {
        let mut meter = ProgressMeter::new();
        meter.note_scroll(ScrollMetrics {
            scroll_top: 100,
            scroll_height: 200,
            viewport_height: 100,
        });
        meter.on_frame();
        meter.reset();
        assert_eq!(meter.value(), 0.0);
    }
}
