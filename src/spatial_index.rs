//! Spatial index over segment bounding boxes.
//!
//! Uses an R-tree to find the segments whose bounding boxes intersect a query
//! box. Results are returned in ascending segment index so matching is
//! reproducible regardless of the tree's internal layout.

use rstar::{RTree, RTreeObject, AABB};

use crate::{Bounds, Segment};

/// Segment bounds wrapper for R-tree spatial indexing.
#[derive(Debug, Clone)]
struct SegmentEnvelope {
    index: usize,
    bounds: Bounds,
}

impl RTreeObject for SegmentEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min_lng, self.bounds.min_lat],
            [self.bounds.max_lng, self.bounds.max_lat],
        )
    }
}

/// R-tree of `(segment index, bounding box)` entries.
#[derive(Debug)]
pub struct SegmentIndex {
    tree: RTree<SegmentEnvelope>,
}

impl Default for SegmentIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Index every non-empty segment under its position in `segments`.
    pub fn from_segments(segments: &[Segment]) -> Self {
        let entries: Vec<SegmentEnvelope> = segments
            .iter()
            .enumerate()
            .filter_map(|(index, segment)| {
                segment.bounds().map(|bounds| SegmentEnvelope { index, bounds })
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Add an entry. Empty (inverted) boxes are ignored.
    pub fn insert(&mut self, index: usize, bounds: Bounds) {
        if !bounds.is_empty() {
            self.tree.insert(SegmentEnvelope { index, bounds });
        }
    }

    /// Indices of all entries whose box intersects `bounds`, ascending.
    /// Touching boxes count as intersecting.
    pub fn intersecting(&self, bounds: &Bounds) -> Vec<usize> {
        // from_corners would normalise an inverted box into a huge one
        if bounds.is_empty() {
            return Vec::new();
        }

        let search = AABB::from_corners(
            [bounds.min_lng, bounds.min_lat],
            [bounds.max_lng, bounds.max_lat],
        );
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&search)
            .map(|entry| entry.index)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Get the number of indexed segments.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersecting_sorted() {
        let mut index = SegmentIndex::new();
        index.insert(2, Bounds::new(0.0, 0.0, 1.0, 1.0));
        index.insert(0, Bounds::new(0.5, 0.5, 2.0, 2.0));
        index.insert(1, Bounds::new(5.0, 5.0, 6.0, 6.0));

        assert_eq!(index.len(), 3);
        assert_eq!(index.intersecting(&Bounds::new(0.8, 0.8, 0.9, 0.9)), vec![0, 2]);
        assert_eq!(index.intersecting(&Bounds::new(5.5, 5.5, 7.0, 7.0)), vec![1]);
        assert!(index.intersecting(&Bounds::new(3.0, 3.0, 4.0, 4.0)).is_empty());
    }

    #[test]
    fn test_touching_boxes_intersect() {
        let mut index = SegmentIndex::new();
        index.insert(0, Bounds::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(index.intersecting(&Bounds::new(1.0, 1.0, 2.0, 2.0)), vec![0]);
    }

    #[test]
    fn test_empty_bounds() {
        let mut index = SegmentIndex::new();
        index.insert(0, Bounds::EMPTY);
        assert!(index.is_empty());

        index.insert(1, Bounds::new(0.0, 0.0, 1.0, 1.0));
        assert!(index.intersecting(&Bounds::EMPTY).is_empty());
    }

    #[test]
    fn test_from_segments_skips_empty() {
        let index = SegmentIndex::from_segments(&[Segment::new(vec![])]);
        assert!(index.is_empty());
    }
}
