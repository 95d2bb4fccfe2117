//! Contour (component C2): a skyline of already-placed blocks, used by the
//! B*-tree decoder to find the lowest legal `y` for the next block.

/// One non-overlapping horizontal segment of the skyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourSegment {
    pub x_start: f64,
    pub x_end: f64,
    pub y_top: f64,
}

/// Ordered, non-overlapping list of segments covering the X projection of
/// every placed block. Invariants (`spec.md` §3, §4.2): segments sorted by
/// `x_start`, pairwise non-overlapping, and no two adjacent segments share
/// `y_top` (merged on insertion).
#[derive(Debug, Clone, Default)]
pub struct Contour {
    segments: Vec<ContourSegment>,
}

impl Contour {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[ContourSegment] {
        &self.segments
    }

    /// Maximum `y_top` across every segment whose `[x_start, x_end)`
    /// overlaps `[x0, x1)`. Zero if nothing overlaps.
    pub fn height_over(&self, x0: f64, x1: f64) -> f64 {
        self.segments
            .iter()
            .filter(|s| s.x_start < x1 && x0 < s.x_end)
            .map(|s| s.y_top)
            .fold(0.0, f64::max)
    }

    /// Splits/removes segments intersecting `[x0, x1)`, inserts the new
    /// segment `(x0, x1, y_top)`, then sorts and coalesces adjacent
    /// same-height segments. O(k) where k is the current segment count.
    pub fn insert(&mut self, x0: f64, x1: f64, y_top: f64) {
        let mut next = Vec::with_capacity(self.segments.len() + 1);
        for seg in &self.segments {
            if seg.x_start < x0 {
                next.push(ContourSegment {
                    x_start: seg.x_start,
                    x_end: seg.x_end.min(x0),
                    y_top: seg.y_top,
                });
            }
            if seg.x_end > x1 {
                next.push(ContourSegment {
                    x_start: seg.x_start.max(x1),
                    x_end: seg.x_end,
                    y_top: seg.y_top,
                });
            }
        }
        next.push(ContourSegment { x_start: x0, x_end: x1, y_top });
        next.sort_by(|a, b| a.x_start.partial_cmp(&b.x_start).unwrap());
        self.segments = Self::coalesce(next);
    }

    fn coalesce(segments: Vec<ContourSegment>) -> Vec<ContourSegment> {
        let mut merged: Vec<ContourSegment> = Vec::with_capacity(segments.len());
        for seg in segments {
            if seg.x_start >= seg.x_end {
                continue; // degenerate slice left by a split, drop it
            }
            match merged.last_mut() {
                Some(last) if last.x_end == seg.x_start && last.y_top == seg.y_top => {
                    last.x_end = seg.x_end;
                }
                _ => merged.push(seg),
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_over_empty_contour_is_zero() {
        let contour = Contour::new();
        assert_eq!(contour.height_over(0.0, 5.0), 0.0);
    }

    #[test]
    fn insert_then_query_overlapping_range() {
        let mut contour = Contour::new();
        contour.insert(0.0, 3.0, 1.0);
        assert_eq!(contour.height_over(1.0, 2.0), 1.0);
        assert_eq!(contour.height_over(3.0, 4.0), 0.0);
    }

    #[test]
    fn insert_splits_and_coalesces() {
        let mut contour = Contour::new();
        contour.insert(0.0, 10.0, 1.0);
        contour.insert(3.0, 6.0, 2.0);
        // left remainder [0,3)@1, new [3,6)@2, right remainder [6,10)@1
        assert_eq!(contour.segments().len(), 3);
        assert_eq!(contour.height_over(4.0, 5.0), 2.0);
        assert_eq!(contour.height_over(0.0, 1.0), 1.0);
        assert_eq!(contour.height_over(7.0, 8.0), 1.0);
    }

    #[test]
    fn adjacent_segments_sharing_height_merge() {
        let mut contour = Contour::new();
        contour.insert(0.0, 3.0, 2.0);
        contour.insert(3.0, 6.0, 2.0);
        assert_eq!(contour.segments().len(), 1);
        assert_eq!(contour.segments()[0], ContourSegment { x_start: 0.0, x_end: 6.0, y_top: 2.0 });
    }

    #[test]
    fn stairstep_scenario_from_spec() {
        // A={w:3,h:1} at (0,0)-(3,1); B={w:1,h:3} as x_child -> (3,0)-(4,3)
        let mut contour = Contour::new();
        contour.insert(0.0, 3.0, 1.0);
        assert_eq!(contour.height_over(3.0, 4.0), 0.0);
        contour.insert(3.0, 4.0, 3.0);
        // C={w:2,h:2} as y_child of A at x in [0,2)
        assert_eq!(contour.height_over(0.0, 2.0), 1.0);
    }
}
