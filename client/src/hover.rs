/// Synthetic feature id assigned by the map engine (`generateId`).
pub type FeatureId = u64;

/// Receiver of per-feature hover flags (map feature-state).
pub trait FeatureStateTarget {
    fn set_hover(&mut self, id: FeatureId, hovered: bool);
}

/// Tracks the single hovered polygon. Moving onto a new polygon clears the
/// previous flag before setting the new one, so at most one polygon is ever
/// flagged.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HoverTracker {
    hovered: Option<FeatureId>,
}

impl HoverTracker {
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn hovered(&self) -> Option<FeatureId> {
        self.hovered
    }

    /// Pointer moved over a feature. Features without an id are ignored.
    pub fn pointer_move<T: FeatureStateTarget>(&mut self, target: &mut T, id: Option<FeatureId>) {
        let Some(id) = id else {
            return;
        };
        if self.hovered == Some(id) {
            return;
        }
        if let Some(previous) = self.hovered.take() {
            target.set_hover(previous, false);
        }
        target.set_hover(id, true);
        self.hovered = Some(id);
    }

    /// Pointer left the layer entirely.
    pub fn pointer_leave<T: FeatureStateTarget>(&mut self, target: &mut T) {
        if let Some(previous) = self.hovered.take() {
            target.set_hover(previous, false);
        }
    }
}
