// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compiled stencil-and-cover geometry.

use std::ops::Range;

use peniko::kurbo::{Point, Rect};

use crate::analysis::StrokeAnalysis;
use crate::decompose::PreprocessedPath;
use crate::fill::tessellate_fill;
use crate::path::Path;
use crate::stroke::tessellate_stroke;
use crate::style::StrokeStyle;
use crate::vertex::{DrawPrimitive, DrawVertex, QBEZIER_DESC_TEXELS};

/// Tessellated triangles for one path, ready for residency.
///
/// The vertex list is immutable once compiled. Addresses that depend on
/// where the data lands in the vertex buffer (`DrawVertex::command` and,
/// for quadratic strokes, `params[3]`) are patched into a staged copy at
/// upload and draw time, so one compilation can back any number of
/// resident copies.
#[derive(Clone, Debug, Default)]
pub struct CompiledPath {
    pub vertices: Vec<DrawVertex>,
    /// Quadratic stroke descriptors, [`QBEZIER_DESC_FLOATS`] floats each.
    pub qbezier_descs: Vec<f32>,
    /// Vertex ranges that share one descriptor, in descriptor order.
    pub(crate) qbezier_ranges: Vec<Range<u32>>,
    pub bounding_box: Option<Rect>,
}

impl CompiledPath {
    fn fill(prep: &PreprocessedPath, path: &Path) -> Self {
        let mut compiled = Self {
            bounding_box: path.bounding_box(None),
            ..Self::default()
        };
        for subpath in &prep.subpaths {
            tessellate_fill(subpath, &mut compiled);
        }
        compiled
    }

    fn stroke(
        prep: &PreprocessedPath,
        path: &Path,
        style: &StrokeStyle,
        analyses: &[StrokeAnalysis],
    ) -> Self {
        let mut compiled = Self {
            bounding_box: path.bounding_box(Some(style)),
            ..Self::default()
        };
        for (subpath, analysis) in prep.subpaths.iter().zip(analyses) {
            tessellate_stroke(subpath, analysis, style, &mut compiled);
        }
        compiled
    }

    /// Two triangles covering `rect`, used for cover passes and clears.
    pub fn rectangle(rect: Rect) -> Self {
        let vertices = vec![
            DrawVertex::simple(Point::new(rect.x0, rect.y0)),
            DrawVertex::simple(Point::new(rect.x1, rect.y0)),
            DrawVertex::simple(Point::new(rect.x0, rect.y1)),
            DrawVertex::simple(Point::new(rect.x1, rect.y0)),
            DrawVertex::simple(Point::new(rect.x1, rect.y1)),
            DrawVertex::simple(Point::new(rect.x0, rect.y1)),
        ];
        Self {
            vertices,
            bounding_box: Some(rect),
            ..Self::default()
        }
    }

    /// Cover geometry for the stencilled interior of a fill.
    // TODO: cover with the convex hull instead of the bounding box
    fn draw_hull(&self) -> Self {
        let mut hull = Self::rectangle(self.bounding_box.unwrap_or(Rect::ZERO));
        hull.bounding_box = self.bounding_box;
        hull
    }

    /// Cover geometry for a stroke: the same triangles with every
    /// primitive demoted to `Simple`, so the cover pass fills whatever
    /// the stencil pass marked without re-evaluating curve coverage.
    fn stroke_hull(&self) -> Self {
        let mut vertices = self.vertices.clone();
        for vertex in &mut vertices {
            vertex.primitive = DrawPrimitive::Simple.tag();
        }
        Self {
            vertices,
            bounding_box: self.bounding_box,
            ..Self::default()
        }
    }

    /// Whether tessellation produced any triangles.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Writes the resident descriptor addresses into a staged copy of the
    /// vertices. `base` is the texel address of the first descriptor;
    /// consecutive ranges use consecutive descriptors.
    pub fn patch_qbezier_desc_address(&self, base: u32, vertices: &mut [DrawVertex]) {
        let mut desc_ptr = base;
        for range in &self.qbezier_ranges {
            for vertex in &mut vertices[range.start as usize..range.end as usize] {
                vertex.params[3] = desc_ptr as f32;
            }
            desc_ptr += QBEZIER_DESC_TEXELS;
        }
    }
}

/// The stencil geometry of a path together with its cover geometry.
///
/// Fills cover with a bounding rectangle, strokes cover with the stencil
/// triangles themselves (demoted to `Simple`), so exactly one of the two
/// hulls is present.
#[derive(Clone, Debug)]
pub struct CompiledPathset {
    pub shape_path: CompiledPath,
    pub draw_hull: Option<CompiledPath>,
    pub stroke_hull: Option<CompiledPath>,
}

impl CompiledPathset {
    pub(crate) fn fill(prep: &PreprocessedPath, path: &Path) -> Self {
        let shape_path = CompiledPath::fill(prep, path);
        let draw_hull = shape_path.draw_hull();
        Self {
            shape_path,
            draw_hull: Some(draw_hull),
            stroke_hull: None,
        }
    }

    pub(crate) fn stroke(
        prep: &PreprocessedPath,
        path: &Path,
        style: &StrokeStyle,
        analyses: &[StrokeAnalysis],
    ) -> Self {
        let shape_path = CompiledPath::stroke(prep, path, style, analyses);
        let stroke_hull = shape_path.stroke_hull();
        Self {
            shape_path,
            draw_hull: None,
            stroke_hull: Some(stroke_hull),
        }
    }
}
