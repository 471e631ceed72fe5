use crate::preferences::MAX_RATING;

/// Five-star control: hovering previews, only committing changes the rating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StarRating {
    committed: u8,
    hover: Option<u8>,
}

impl StarRating {
    pub fn new(committed: u8) -> Self {
        Self {
            committed: committed.min(MAX_RATING),
            hover: None,
        }
    }

    pub fn committed(&self) -> u8 {
        self.committed
    }

    pub fn hovered(&self) -> Option<u8> {
        self.hover
    }

    /// Stars to draw filled
    pub fn displayed(&self) -> u8 {
        self.hover.unwrap_or(self.committed)
    }

    pub fn hover(&mut self, stars: u8) {
        if (1..=MAX_RATING).contains(&stars) {
            self.hover = Some(stars);
        }
    }

    /// Move the preview one star; starts from the committed value
    pub fn hover_step(&mut self, delta: i8) {
        let from = self.hover.unwrap_or(self.committed.max(1)) as i16;
        let to = (from + delta as i16).clamp(1, MAX_RATING as i16);
        self.hover = Some(to as u8);
    }

    pub fn leave(&mut self) {
        self.hover = None;
    }

    /// Commit a rating. Returns the value to persist, or `None` if out of range.
    pub fn commit(&mut self, stars: u8) -> Option<u8> {
        if !(1..=MAX_RATING).contains(&stars) {
            return None;
        }
        self.committed = stars;
        self.hover = None;
        Some(stars)
    }

    /// Commit whatever is being previewed
    pub fn commit_hover(&mut self) -> Option<u8> {
        let stars = self.hover?;
        self.commit(stars)
    }

    pub fn clear(&mut self) {
        self.committed = 0;
        self.hover = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hover_is_preview_only() {
        let mut rating = StarRating::new(0);
        assert_eq!(rating.commit(4), Some(4));

        rating.hover(2);
        assert_eq!(rating.displayed(), 2);
        assert_eq!(rating.committed(), 4);

        rating.leave();
        assert_eq!(rating.displayed(), 4);
    }

    #[test]
    fn test_commit_rejects_out_of_range() {
        let mut rating = StarRating::new(3);
        assert_eq!(rating.commit(0), None);
        assert_eq!(rating.commit(6), None);
        assert_eq!(rating.committed(), 3);
    }

    #[test]
    fn test_hover_step_is_clamped() {
        let mut rating = StarRating::new(0);
        rating.hover_step(-1);
        assert_eq!(rating.hovered(), Some(1));
        for _ in 0..10 {
            rating.hover_step(1);
        }
        assert_eq!(rating.hovered(), Some(5));
        assert_eq!(rating.commit_hover(), Some(5));
        assert_eq!(rating.hovered(), None);
    }

    #[test]
    fn test_new_clamps_stored_value() {
        assert_eq!(StarRating::new(9).committed(), 5);
    }
}
