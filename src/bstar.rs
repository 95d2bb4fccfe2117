//! B*-tree Engine (component C3): level-order construction, contour-based
//! decode, and the two supported neighbor moves used by the SA driver.
//!
//! The tree is modeled as an arena of nodes addressed by index rather than
//! an owned/`Rc` node graph (`spec.md` §9: "the latter makes clone-for-
//! candidate cheap, a bulk copy of the arena"), mirroring the index-based
//! style the underlying solver stack uses for its own hot-path structures
//! (`VertexIndex`/`NodeIndex` arenas, `UnionFindGeneric`'s `Vec<usize>`
//! parent links).

use std::collections::VecDeque;

use rand::Rng;

use crate::catalog::Catalog;
use crate::contour::Contour;
use crate::error::{FloorplanError, Result};
use crate::io::BStarTreeNodeRecord;
use crate::placement::{PlacedBlock, Placement};

/// One node in the arena: a block name, the index of its currently selected
/// variant, and up to two children by arena index.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub name: String,
    pub variant_index: usize,
    pub x_child: Option<usize>,
    pub y_child: Option<usize>,
}

/// A B*-tree over `n` blocks, root always at arena index 0.
#[derive(Debug, Clone)]
pub struct BStarTree {
    nodes: Vec<TreeNode>,
}

/// The two supported SA neighbor moves (`spec.md` §4.3). M3 ("move
/// subtree") is an open question in the source material and is
/// deliberately not implemented here; see DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BStarMove {
    VariantChange,
    Swap,
}

impl BStarMove {
    pub const ALL: [BStarMove; 2] = [BStarMove::VariantChange, BStarMove::Swap];

    pub fn random(rng: &mut impl Rng) -> BStarMove {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl BStarTree {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Sorts blocks by default-variant area descending (ties keep input
    /// order, since `sort_by` is stable), places the largest as root, then
    /// fills `x_child` before `y_child` for each node in breadth-first
    /// order over the remaining blocks (`spec.md` §4.3).
    pub fn construct(catalog: &Catalog) -> Result<BStarTree> {
        if catalog.is_empty() {
            return Err(FloorplanError::EmptyBlockSet);
        }
        let mut by_area: Vec<(&str, f64)> =
            catalog.blocks().iter().map(|b| (b.name.as_str(), b.area_of_default_variant())).collect();
        by_area.sort_by(|(_, area_a), (_, area_b)| area_b.partial_cmp(area_a).unwrap());
        let ordered: Vec<&str> = by_area.into_iter().map(|(name, _)| name).collect();

        let mut nodes: Vec<TreeNode> = Vec::with_capacity(ordered.len());
        for name in &ordered {
            let variant_index = catalog.default_variant_index(name)?;
            nodes.push(TreeNode {
                name: (*name).to_string(),
                variant_index,
                x_child: None,
                y_child: None,
            });
        }

        let mut queue: VecDeque<usize> = VecDeque::new();
        queue.push_back(0);
        let mut next = 1usize;
        while let Some(current) = queue.pop_front() {
            if next >= nodes.len() {
                break;
            }
            nodes[current].x_child = Some(next);
            queue.push_back(next);
            next += 1;
            if next >= nodes.len() {
                break;
            }
            nodes[current].y_child = Some(next);
            queue.push_back(next);
            next += 1;
        }

        Ok(BStarTree { nodes })
    }

    /// Rebuilds a tree from a wire record (e.g. a prior `build-bstar` stage,
    /// or a previous SA run's output being annealed further). The variant
    /// index for each node is resolved by matching the record's rectangle
    /// dimensions against the catalog's variant list for that block name.
    pub fn from_record(root: &BStarTreeNodeRecord, catalog: &Catalog) -> Result<BStarTree> {
        let mut nodes = Vec::new();
        Self::build_from_record(root, catalog, &mut nodes)?;
        Ok(BStarTree { nodes })
    }

    fn build_from_record(record: &BStarTreeNodeRecord, catalog: &Catalog, nodes: &mut Vec<TreeNode>) -> Result<usize> {
        let variants = catalog.variants(&record.name)?;
        let width = record.x_max - record.x_min;
        let height = record.y_max - record.y_min;
        let variant_index = variants
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (a.width - width).powi(2) + (a.height - height).powi(2);
                let db = (b.width - width).powi(2) + (b.height - height).powi(2);
                da.partial_cmp(&db).unwrap()
            })
            .map(|(i, _)| i)
            .unwrap_or(0);

        let idx = nodes.len();
        nodes.push(TreeNode {
            name: record.name.clone(),
            variant_index,
            x_child: None,
            y_child: None,
        });
        if let Some(x_child) = &record.x_child {
            let child_idx = Self::build_from_record(x_child, catalog, nodes)?;
            nodes[idx].x_child = Some(child_idx);
        }
        if let Some(y_child) = &record.y_child {
            let child_idx = Self::build_from_record(y_child, catalog, nodes)?;
            nodes[idx].y_child = Some(child_idx);
        }
        Ok(idx)
    }

    /// Decodes the tree into a placement by a breadth-first traversal from
    /// the root, using the contour to place each `x_child`/`y_child`
    /// (`spec.md` §4.3).
    pub fn decode(&self, catalog: &Catalog) -> Result<Placement> {
        if self.nodes.is_empty() {
            return Err(FloorplanError::EmptyBlockSet);
        }
        let mut rects: Vec<Option<PlacedBlock>> = vec![None; self.nodes.len()];
        let mut contour = Contour::new();
        let mut queue: VecDeque<(usize, Option<(usize, bool)>)> = VecDeque::new();
        queue.push_back((0, None));

        while let Some((idx, parent_info)) = queue.pop_front() {
            let node = &self.nodes[idx];
            let variants = catalog.variants(&node.name)?;
            let variant = variants.get(node.variant_index).ok_or_else(|| {
                FloorplanError::DecodeFailure(format!("variant index out of range for block {}", node.name))
            })?;

            let (x_min, y_min) = match parent_info {
                None => (0.0, 0.0),
                Some((parent_idx, is_x_child)) => {
                    let parent_rect = rects[parent_idx]
                        .ok_or_else(|| FloorplanError::DecodeFailure("parent not yet decoded".to_string()))?;
                    if is_x_child {
                        let x_min = parent_rect.x_max;
                        let y_min = contour.height_over(x_min, x_min + variant.width);
                        (x_min, y_min)
                    } else {
                        let x_min = parent_rect.x_min;
                        let y_min = contour.height_over(x_min, x_min + variant.width).max(parent_rect.y_max);
                        (x_min, y_min)
                    }
                }
            };
            let x_max = x_min + variant.width;
            let y_max = y_min + variant.height;
            if !x_max.is_finite() || !y_max.is_finite() {
                return Err(FloorplanError::DecodeFailure(format!("non-finite coordinates for block {}", node.name)));
            }
            contour.insert(x_min, x_max, y_max);
            rects[idx] = Some(PlacedBlock { x_min, y_min, x_max, y_max });

            if let Some(x_child) = node.x_child {
                queue.push_back((x_child, Some((idx, true))));
            }
            if let Some(y_child) = node.y_child {
                queue.push_back((y_child, Some((idx, false))));
            }
        }

        let mut placement = Placement::new();
        for (idx, node) in self.nodes.iter().enumerate() {
            let rect = rects[idx].ok_or_else(|| FloorplanError::DecodeFailure("node never visited".to_string()))?;
            placement.insert(node.name.clone(), rect);
        }
        Ok(placement)
    }

    /// M1: pick a uniformly random node and, if it has more than one
    /// variant, move it to a different one.
    pub fn apply_variant_change(&mut self, catalog: &Catalog, rng: &mut impl Rng) -> Result<()> {
        if self.nodes.is_empty() {
            return Ok(());
        }
        let idx = rng.gen_range(0..self.nodes.len());
        let name = self.nodes[idx].name.clone();
        let variants = catalog.variants(&name)?;
        if variants.len() < 2 {
            return Ok(());
        }
        let current = self.nodes[idx].variant_index;
        let choice = loop {
            let candidate = rng.gen_range(0..variants.len());
            if candidate != current {
                break candidate;
            }
        };
        self.nodes[idx].variant_index = choice;
        Ok(())
    }

    /// M2: pick two distinct nodes and swap their `name`/variant at the
    /// arena positions they occupy, leaving tree shape untouched.
    pub fn apply_swap(&mut self, rng: &mut impl Rng) {
        if self.nodes.len() < 2 {
            return;
        }
        let i = rng.gen_range(0..self.nodes.len());
        let j = loop {
            let candidate = rng.gen_range(0..self.nodes.len());
            if candidate != i {
                break candidate;
            }
        };
        let (name_i, variant_i) = (self.nodes[i].name.clone(), self.nodes[i].variant_index);
        let (name_j, variant_j) = (self.nodes[j].name.clone(), self.nodes[j].variant_index);
        self.nodes[i].name = name_j;
        self.nodes[i].variant_index = variant_j;
        self.nodes[j].name = name_i;
        self.nodes[j].variant_index = variant_i;
    }

    pub fn apply_move(&mut self, mv: BStarMove, catalog: &Catalog, rng: &mut impl Rng) -> Result<()> {
        match mv {
            BStarMove::VariantChange => self.apply_variant_change(catalog, rng),
            BStarMove::Swap => {
                self.apply_swap(rng);
                Ok(())
            }
        }
    }

    /// Serializes the current tree shape + a decoded placement into the
    /// wire record shape, rounding coordinates to two decimals
    /// (`spec.md` §6).
    pub fn to_record(&self, placement: &Placement) -> Result<BStarTreeNodeRecord> {
        self.node_record(0, placement)
    }

    fn node_record(&self, idx: usize, placement: &Placement) -> Result<BStarTreeNodeRecord> {
        let node = &self.nodes[idx];
        let rect = placement
            .get(&node.name)
            .ok_or_else(|| FloorplanError::DecodeFailure(format!("block {} missing from placement", node.name)))?;
        use crate::result::round2;
        Ok(BStarTreeNodeRecord {
            name: node.name.clone(),
            x_min: round2(rect.x_min),
            y_min: round2(rect.y_min),
            x_max: round2(rect.x_max),
            y_max: round2(rect.y_max),
            x_child: node.x_child.map(|c| self.node_record(c, placement)).transpose()?.map(Box::new),
            y_child: node.y_child.map(|c| self.node_record(c, placement)).transpose()?.map(Box::new),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{RawBlock, RawVariant};

    fn block(name: &str, w: f64, h: f64) -> RawBlock {
        RawBlock {
            name: name.to_string(),
            device_type: None,
            symmetry: None,
            variants: vec![RawVariant { width: w, height: h, is_default: Some(true) }],
        }
    }

    #[test]
    fn single_block_trivial_placement() {
        let catalog = Catalog::load(&[block("A", 5.0, 3.0)]).unwrap();
        let tree = BStarTree::construct(&catalog).unwrap();
        let placement = tree.decode(&catalog).unwrap();
        let rect = placement.get("A").unwrap();
        assert_eq!((rect.x_min, rect.y_min, rect.x_max, rect.y_max), (0.0, 0.0, 5.0, 3.0));
    }

    #[test]
    fn two_equal_squares_side_by_side() {
        let catalog = Catalog::load(&[block("A", 2.0, 2.0), block("B", 2.0, 2.0)]).unwrap();
        let tree = BStarTree::construct(&catalog).unwrap();
        let placement = tree.decode(&catalog).unwrap();
        let a = placement.get("A").unwrap();
        let b = placement.get("B").unwrap();
        assert_eq!((a.x_min, a.y_min, a.x_max, a.y_max), (0.0, 0.0, 2.0, 2.0));
        assert_eq!((b.x_min, b.y_min, b.x_max, b.y_max), (2.0, 0.0, 4.0, 2.0));
        assert_eq!(placement.bounding_width(), 4.0);
        assert_eq!(placement.bounding_height(), 2.0);
    }

    #[test]
    fn contour_stairstep_scenario() {
        // Areas: A=3, B=3, C=4, so construction (area descending) puts C at
        // the root with A as its x_child and B as its y_child.
        let catalog = Catalog::load(&[block("A", 3.0, 1.0), block("B", 1.0, 3.0), block("C", 2.0, 2.0)]).unwrap();
        let tree = BStarTree::construct(&catalog).unwrap();
        let placement = tree.decode(&catalog).unwrap();
        let a = placement.get("A").unwrap();
        let b = placement.get("B").unwrap();
        let c = placement.get("C").unwrap();
        assert_eq!((c.x_min, c.y_min, c.x_max, c.y_max), (0.0, 0.0, 2.0, 2.0));
        assert_eq!((a.x_min, a.y_min, a.x_max, a.y_max), (2.0, 0.0, 5.0, 1.0));
        assert_eq!((b.x_min, b.y_min, b.x_max, b.y_max), (0.0, 2.0, 1.0, 5.0));
        let used_area: f64 = [a, b, c].iter().map(|p| p.area()).sum();
        assert_eq!(used_area, 10.0);
        assert_eq!(placement.bounding_width() * placement.bounding_height(), 25.0);
        assert!(placement.is_non_overlapping());
    }

    #[test]
    fn variant_change_alters_dimensions() {
        let blocks = vec![RawBlock {
            name: "A".to_string(),
            device_type: None,
            symmetry: None,
            variants: vec![
                RawVariant { width: 4.0, height: 1.0, is_default: Some(true) },
                RawVariant { width: 1.0, height: 4.0, is_default: Some(false) },
            ],
        }];
        let catalog = Catalog::load(&blocks).unwrap();
        let mut tree = BStarTree::construct(&catalog).unwrap();
        tree.nodes_mut_for_test()[0].variant_index = 1;
        let placement = tree.decode(&catalog).unwrap();
        let rect = placement.get("A").unwrap();
        assert_eq!((rect.width(), rect.height()), (1.0, 4.0));
    }

    #[test]
    fn non_overlap_invariant_holds_for_larger_set() {
        let blocks: Vec<RawBlock> = (0..8)
            .map(|i| block(&format!("B{i}"), 2.0 + (i as f64 % 3.0), 1.0 + (i as f64 % 2.0)))
            .collect();
        let catalog = Catalog::load(&blocks).unwrap();
        let tree = BStarTree::construct(&catalog).unwrap();
        let placement = tree.decode(&catalog).unwrap();
        assert!(placement.is_non_overlapping());
        assert!(placement.touches_origin());
    }

    impl BStarTree {
        #[cfg(test)]
        fn nodes_mut_for_test(&mut self) -> &mut [TreeNode] {
            &mut self.nodes
        }
    }
}
