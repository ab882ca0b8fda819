// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Greedy partitioning of scene content into draw-ordered batches.

use peniko::kurbo::Rect;

use crate::overlap::{BitmapGrid, HighestLayerGrid};

/// Grid cell size for a canvas, roughly 64 cells along the longer edge.
fn grid_precision(width: f64, height: f64) -> f64 {
    (width.max(height) / 64.0).max(1.0).ceil()
}

fn group_mut<T>(groups: &mut Vec<Vec<T>>, index: usize) -> &mut Vec<T> {
    if index >= groups.len() {
        groups.resize_with(index + 1, Vec::new);
    }
    &mut groups[index]
}

/// Assigns each item the lowest group index where it does not
/// conservatively overlap anything placed before it, so that replaying the
/// groups in ascending index order preserves the relative order of any two
/// overlapping items while disjoint items batch together.
///
/// With joinable support enabled, an item flagged joinable shares the
/// group of the joinable items it overlaps instead of stacking above
/// everything underneath. The scheduler relies on this to keep runs of
/// plain shapes in one clip round rather than splitting rounds at every
/// shape-over-shape overlap, and reorders the shapes properly later when
/// the leaf level batches them without joinable support.
pub struct LayerCompressor<T> {
    all: HighestLayerGrid,
    joinable: Option<HighestLayerGrid>,
    groups: Vec<Vec<T>>,
}

impl<T> LayerCompressor<T> {
    pub fn new(width: f64, height: f64, support_joinable: bool) -> Self {
        let precision = grid_precision(width, height);
        Self {
            all: HighestLayerGrid::new(width, height, precision),
            joinable: support_joinable.then(|| HighestLayerGrid::new(width, height, precision)),
            groups: Vec::new(),
        }
    }

    /// Places one item, deciding its group from the occupancy grids and
    /// stamping its bounds into them.
    pub fn place(&mut self, item: T, bounds: Rect, joinable: bool) {
        let layer = match &self.joinable {
            Some(joined) if joinable => joined.query(bounds).unwrap_or(0),
            _ => {
                let stacked = self.all.query(bounds).map_or(0, |layer| layer + 1);
                match self.joinable.as_ref().and_then(|joined| joined.query(bounds)) {
                    Some(joined) => joined.max(stacked),
                    None => stacked,
                }
            }
        };
        self.all.insert(bounds, layer);
        if joinable {
            if let Some(joined) = &mut self.joinable {
                joined.insert(bounds, layer);
            }
        }
        group_mut(&mut self.groups, layer as usize).push(item);
    }

    /// The groups built so far, in replay order.
    pub fn groups(&self) -> &[Vec<T>] {
        &self.groups
    }

    /// Detaches the groups for consumption. The occupancy grids stay
    /// stamped, so call [`reset`](Self::reset) before placing again.
    pub fn take_groups(&mut self) -> Vec<Vec<T>> {
        std::mem::take(&mut self.groups)
    }

    pub fn reset(&mut self) {
        self.groups.clear();
        self.all.clear();
        if let Some(joined) = &mut self.joinable {
            joined.clear();
        }
    }
}

/// Packs items into numbered planes so that no two overlapping items share
/// a plane, without preserving any order between planes. Each occupancy
/// grid tracks 32 planes; another grid is appended once a box finds all 32
/// blocked.
pub struct UnorderedLayerCompressor<T> {
    grids: Vec<BitmapGrid>,
    groups: Vec<Vec<T>>,
    width: f64,
    height: f64,
    precision: f64,
}

impl<T> UnorderedLayerCompressor<T> {
    pub fn new(width: f64, height: f64) -> Self {
        let precision = grid_precision(width, height);
        Self {
            grids: vec![BitmapGrid::new(width, height, precision)],
            groups: Vec::new(),
            width,
            height,
            precision,
        }
    }

    /// Places one item in the first plane free under its bounds.
    pub fn place(&mut self, item: T, bounds: Rect) {
        let mut plane = None;
        for (index, grid) in self.grids.iter().enumerate() {
            let free = !grid.query(bounds);
            if free != 0 {
                plane = Some(((index as u32) << 5) + free.trailing_zeros());
                break;
            }
        }
        let plane = match plane {
            Some(plane) => plane,
            None => {
                let plane = (self.grids.len() as u32) << 5;
                self.grids
                    .push(BitmapGrid::new(self.width, self.height, self.precision));
                plane
            }
        };
        self.grids[(plane >> 5) as usize].insert(bounds, 1 << (plane & 31));
        group_mut(&mut self.groups, plane as usize).push(item);
    }

    /// The planes built so far. Order between them carries no meaning.
    pub fn groups(&self) -> &[Vec<T>] {
        &self.groups
    }

    pub fn reset(&mut self) {
        self.groups.clear();
        for grid in &mut self.grids {
            grid.clear();
        }
    }
}
