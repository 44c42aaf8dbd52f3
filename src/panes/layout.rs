use ratatui::layout::Rect;

/// Where one pane lands on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneSlot {
    pub index: usize,
    pub area: Rect,
    /// Collapsed panes are drawn as a narrow spine showing only the title
    pub collapsed: bool,
}

/// Geometry of the pane strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripLayout {
    pub pane_width: u16,
    pub spine_width: u16,
}

impl StripLayout {
    pub fn new(pane_width: u16, spine_width: u16) -> Self {
        Self {
            pane_width: pane_width.max(1),
            spine_width: spine_width.max(1),
        }
    }

    /// How many panes fit at full width next to the spines of the rest
    pub fn full_capacity(&self, count: usize, width: u16) -> usize {
        (1..=count)
            .rev()
            .find(|&full| {
                let spines = (count - full) as u64 * u64::from(self.spine_width);
                full as u64 * u64::from(self.pane_width) + spines <= u64::from(width)
            })
            .unwrap_or(count.min(1))
    }

    /// Moves the first fully visible pane just enough to keep `focus` visible.
    pub fn scroll_to(&self, first: usize, focus: usize, count: usize, width: u16) -> usize {
        if count == 0 {
            return 0;
        }
        let full = self.full_capacity(count, width);
        let first = first.min(count - full);
        if focus < first {
            focus
        } else if focus >= first + full {
            focus + 1 - full
        } else {
            first
        }
    }

    /// Lays panes out left to right in index order. Panes before `first`
    /// stack as spines on the left edge, panes past the visible run stack as
    /// spines on the right edge.
    pub fn slots(&self, count: usize, first: usize, area: Rect) -> Vec<PaneSlot> {
        if count == 0 || area.width == 0 {
            return Vec::new();
        }
        let full = self.full_capacity(count, area.width);
        let first = first.min(count - full);
        let last_full = first + full;

        let spines_total = ((count - full) as u64 * u64::from(self.spine_width))
            .min(u64::from(u16::MAX)) as u16;
        let pane_width = if full == 1 {
            area.width.saturating_sub(spines_total).min(self.pane_width).max(1)
        } else {
            self.pane_width
        };

        let mut slots = Vec::with_capacity(count);
        let mut x = area.x;
        for index in 0..count {
            let collapsed = index < first || index >= last_full;
            let width = if collapsed { self.spine_width } else { pane_width };
            let width = width.min(area.right().saturating_sub(x));
            if width == 0 {
                break;
            }
            slots.push(PaneSlot {
                index,
                area: Rect::new(x, area.y, width, area.height),
                collapsed,
            });
            x += width;
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_fits() {
        let layout = StripLayout::new(30, 3);
        let slots = layout.slots(2, 0, Rect::new(0, 0, 100, 20));

        assert_eq!(slots.len(), 2);
        assert!(slots.iter().all(|s| !s.collapsed));
        assert_eq!(slots[0].area.x, 0);
        assert_eq!(slots[1].area.x, 30);
    }

    #[test]
    fn overflow_collapses_outside_panes() {
        let layout = StripLayout::new(40, 3);
        // 100 columns: two full panes plus three spines
        assert_eq!(layout.full_capacity(5, 100), 2);

        let slots = layout.slots(5, 2, Rect::new(0, 0, 100, 20));
        let collapsed: Vec<bool> = slots.iter().map(|s| s.collapsed).collect();
        assert_eq!(collapsed, [true, true, false, false, true]);
        assert_eq!(slots[2].area.x, 6);
        assert_eq!(slots[4].area.x, 86);
    }

    #[test]
    fn narrow_terminal_shrinks_single_pane() {
        let layout = StripLayout::new(80, 3);
        let slots = layout.slots(3, 1, Rect::new(0, 0, 50, 10));

        assert_eq!(slots[1].area.width, 44);
        assert!(!slots[1].collapsed);
    }

    #[test]
    fn oversized_spines_saturate() {
        let layout = StripLayout::new(40, 2000);
        let slots = layout.slots(100, 0, Rect::new(0, 0, 100, 10));

        assert_eq!(slots.len(), 2);
        assert!(!slots[0].collapsed);
        assert_eq!(slots[0].area.width, 1);
        assert_eq!(slots[1].area.width, 99);
    }

    #[test]
    fn scroll_keeps_focus_visible() {
        let layout = StripLayout::new(40, 3);
        assert_eq!(layout.scroll_to(0, 4, 5, 100), 3);
        assert_eq!(layout.scroll_to(3, 1, 5, 100), 1);
        assert_eq!(layout.scroll_to(1, 2, 5, 100), 1);
        assert_eq!(layout.scroll_to(7, 0, 0, 100), 0);
    }
}
