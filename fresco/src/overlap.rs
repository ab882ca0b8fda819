// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conservative rectangle overlap detection on coarse occupancy grids.

use std::ops::Range;

use peniko::kurbo::Rect;

#[derive(Clone, Copy, Debug, Default)]
struct Cell {
    generation: u32,
    payload: u32,
}

/// Grid machinery shared by the two payload reductions.
///
/// Cells are generation stamped so a clear is one counter bump; the cell
/// array is rewritten only when the counter wraps. A running bounding box
/// over everything inserted since the last clear rejects most misses
/// before any cell is touched.
#[derive(Clone, Debug)]
struct GridCore {
    cells: Vec<Cell>,
    generation: u32,
    cols: usize,
    rows: usize,
    width: f64,
    height: f64,
    prec_inv: f64,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl GridCore {
    fn new(width: f64, height: f64, precision: f64) -> Self {
        let cols = (width / precision).ceil() as usize;
        let rows = (height / precision).ceil() as usize;
        let mut core = Self {
            cells: vec![Cell::default(); cols * rows],
            generation: 1,
            cols,
            rows,
            width,
            height,
            prec_inv: precision.recip(),
            min_x: 0.0,
            min_y: 0.0,
            max_x: 0.0,
            max_y: 0.0,
        };
        core.clear();
        core
    }

    fn clear(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            for cell in &mut self.cells {
                cell.generation = 0;
            }
            self.generation = 1;
        }
        self.min_x = f64::INFINITY;
        self.min_y = f64::INFINITY;
        self.max_x = f64::NEG_INFINITY;
        self.max_y = f64::NEG_INFINITY;
    }

    fn cell_span(
        &self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    ) -> Option<(Range<usize>, Range<usize>)> {
        let c1 = (x1 * self.prec_inv).floor().max(0.0) as usize;
        let c2 = (x2 * self.prec_inv).ceil().min(self.cols as f64) as usize;
        let r1 = (y1 * self.prec_inv).floor().max(0.0) as usize;
        let r2 = (y2 * self.prec_inv).ceil().min(self.rows as f64) as usize;
        if c1 < c2 && r1 < r2 {
            Some((c1..c2, r1..r2))
        } else {
            None
        }
    }

    fn visit(&self, bounds: Rect, mut visit: impl FnMut(u32)) {
        let (x1, y1, x2, y2) = (bounds.x0, bounds.y0, bounds.x1, bounds.y1);
        if x1 >= self.max_x || y1 >= self.max_y || x2 <= self.min_x || y2 <= self.min_y {
            return;
        }
        let Some((cols, rows)) = self.cell_span(x1, y1, x2, y2) else {
            return;
        };
        for row in rows {
            let base = row * self.cols;
            for cell in &self.cells[base + cols.start..base + cols.end] {
                if cell.generation == self.generation {
                    visit(cell.payload);
                }
            }
        }
    }

    fn insert(&mut self, bounds: Rect, payload: u32, merge: impl Fn(u32, u32) -> u32) {
        let x1 = bounds.x0.max(0.0);
        let x2 = bounds.x1.min(self.width);
        let y1 = bounds.y0.max(0.0);
        let y2 = bounds.y1.min(self.height);
        if x2 <= x1 || y2 <= y1 {
            return;
        }
        self.min_x = self.min_x.min(x1);
        self.min_y = self.min_y.min(y1);
        self.max_x = self.max_x.max(x2);
        self.max_y = self.max_y.max(y2);

        let Some((cols, rows)) = self.cell_span(x1, y1, x2, y2) else {
            return;
        };
        let generation = self.generation;
        for row in rows {
            let base = row * self.cols;
            for cell in &mut self.cells[base + cols.start..base + cols.end] {
                if cell.generation == generation {
                    cell.payload = merge(cell.payload, payload);
                } else {
                    cell.generation = generation;
                    cell.payload = payload;
                }
            }
        }
    }
}

/// Occupancy grid answering "what is the highest layer index whose content
/// may intersect this box".
///
/// Detection is conservative at the grid resolution: rectangles sharing a
/// cell count as overlapping even when they do not touch.
#[derive(Clone, Debug)]
pub struct HighestLayerGrid {
    core: GridCore,
}

impl HighestLayerGrid {
    pub fn new(width: f64, height: f64, precision: f64) -> Self {
        Self {
            core: GridCore::new(width, height, precision),
        }
    }

    /// Forgets every inserted rectangle.
    pub fn clear(&mut self) {
        self.core.clear();
    }

    /// The highest layer inserted over any cell `bounds` touches, `None`
    /// when all of them are clear.
    pub fn query(&self, bounds: Rect) -> Option<u32> {
        let mut best = None;
        self.core.visit(bounds, |payload| {
            best = Some(best.map_or(payload, |b: u32| b.max(payload)));
        });
        best
    }

    /// Marks `bounds` (clamped to the canvas) as occupied by `layer`.
    pub fn insert(&mut self, bounds: Rect, layer: u32) {
        self.core.insert(bounds, layer, u32::max);
    }
}

/// Occupancy grid answering "which of 32 layer planes may intersect this
/// box", as a bitmap.
#[derive(Clone, Debug)]
pub struct BitmapGrid {
    core: GridCore,
}

impl BitmapGrid {
    pub fn new(width: f64, height: f64, precision: f64) -> Self {
        Self {
            core: GridCore::new(width, height, precision),
        }
    }

    /// Forgets every inserted rectangle.
    pub fn clear(&mut self) {
        self.core.clear();
    }

    /// The union of the plane bitmaps over every cell `bounds` touches.
    pub fn query(&self, bounds: Rect) -> u32 {
        let mut occupied = 0;
        self.core.visit(bounds, |payload| occupied |= payload);
        occupied
    }

    /// Marks `bounds` (clamped to the canvas) as occupying `planes`.
    pub fn insert(&mut self, bounds: Rect, planes: u32) {
        self.core.insert(bounds, planes, |a, b| a | b);
    }
}
