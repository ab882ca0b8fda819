// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fill tessellation: winding geometry for the stencil pass.

use crate::compile::CompiledPath;
use crate::decompose::{PreprocessedSubpath, Segment};
use crate::vertex::{DrawPrimitive, DrawVertex};

/// Appends the fill geometry of one flattened subpath.
///
/// The anchor fan plus the per-curve patches accumulate the path's winding
/// number in the stencil buffer; front and back faces cancel, so the fan
/// anchor can be any fixed point. The first segment spans no area relative
/// to the anchor and the cyclic closing edge would be degenerate, so
/// neither gets a fan triangle.
pub(crate) fn tessellate_fill(subpath: &PreprocessedSubpath, out: &mut CompiledPath) {
    let start = subpath.start();
    let num_segments = subpath.num_segments();

    let mut prev_end = None;
    for (k, segment) in subpath.segments().enumerate() {
        if k + 1 == num_segments && subpath.is_cyclic() {
            break;
        }
        let end = segment.end_point();
        if let Some(prev) = prev_end {
            out.vertices.extend([
                DrawVertex::simple(start),
                DrawVertex::simple(prev),
                DrawVertex::simple(end),
            ]);
        }
        prev_end = Some(end);
    }

    for segment in subpath.segments() {
        let Segment::Quad { from, ctrl, to } = segment else {
            continue;
        };
        let b1 = from.midpoint(ctrl);
        let b2 = ctrl.midpoint(to);
        let mid = b1.midpoint(b2);

        // interior up to the chord through the curve midpoint
        out.vertices.extend([
            DrawVertex::simple(from),
            DrawVertex::simple(mid),
            DrawVertex::simple(to),
        ]);

        // two antialiased patches covering the remaining curve area; the
        // UVs map the control polygon onto the canonical parabola so the
        // fragment shader tests u^2 < v
        let patch = |p, u, v| DrawVertex::new(p, DrawPrimitive::QuadraticFill, [u, v, 0.0, 0.0]);
        out.vertices.extend([
            patch(from, 0.0, 0.0),
            patch(b1, 0.25, 0.0),
            patch(mid, 0.5, 0.25),
            patch(mid, 0.5, 0.25),
            patch(b2, 0.75, 0.5),
            patch(to, 1.0, 1.0),
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::tessellate_fill;
    use crate::compile::CompiledPath;
    use crate::decompose::PreprocessedPath;
    use crate::path::{PathBuilder, PathUsage};
    use crate::vertex::DrawPrimitive;

    fn tessellate(builder: &PathBuilder) -> CompiledPath {
        let path = builder.build(PathUsage::Static);
        let pp = PreprocessedPath::new(&path);
        let mut out = CompiledPath::default();
        for subpath in &pp.subpaths {
            tessellate_fill(subpath, &mut out);
        }
        out
    }

    #[test]
    fn triangle_fans_into_one_anchor_triangle() {
        let mut builder = PathBuilder::new();
        builder.move_to((0.0, 0.0));
        builder.line_to((10.0, 0.0));
        builder.line_to((0.0, 10.0));
        builder.close();
        let out = tessellate(&builder);

        assert_eq!(out.vertices.len(), 3);
        let points: Vec<_> = out.vertices.iter().map(|v| v.point).collect();
        assert_eq!(points, vec![[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]]);
        assert!(out
            .vertices
            .iter()
            .all(|v| v.primitive == DrawPrimitive::Simple.tag()));
        assert!(out.qbezier_descs.is_empty());
    }

    #[test]
    fn square_fans_into_two_anchor_triangles() {
        let mut builder = PathBuilder::new();
        builder.move_to((0.0, 0.0));
        builder.line_to((4.0, 0.0));
        builder.line_to((4.0, 3.0));
        builder.line_to((0.0, 3.0));
        builder.close();
        let out = tessellate(&builder);

        assert_eq!(out.vertices.len(), 6);
        assert_eq!(out.vertices[0].point, [0.0, 0.0]);
        assert_eq!(out.vertices[1].point, [4.0, 0.0]);
        assert_eq!(out.vertices[2].point, [4.0, 3.0]);
        assert_eq!(out.vertices[3].point, [0.0, 0.0]);
        assert_eq!(out.vertices[4].point, [4.0, 3.0]);
        assert_eq!(out.vertices[5].point, [0.0, 3.0]);
    }

    #[test]
    fn quadratic_emits_chord_and_patches() {
        let mut builder = PathBuilder::new();
        builder.move_to((0.0, 0.0));
        builder.quad_to((50.0, 50.0), (100.0, 0.0));
        let out = tessellate(&builder);

        // chord triangle + two patch triangles, no anchors for a single
        // segment
        assert_eq!(out.vertices.len(), 9);
        let chord = &out.vertices[..3];
        assert!(chord
            .iter()
            .all(|v| v.primitive == DrawPrimitive::Simple.tag()));
        assert_eq!(chord[1].point, [50.0, 25.0]);

        let patches = &out.vertices[3..];
        assert!(patches
            .iter()
            .all(|v| v.primitive == DrawPrimitive::QuadraticFill.tag()));
        let uvs: Vec<_> = patches.iter().map(|v| [v.params[0], v.params[1]]).collect();
        assert_eq!(
            uvs,
            vec![
                [0.0, 0.0],
                [0.25, 0.0],
                [0.5, 0.25],
                [0.5, 0.25],
                [0.75, 0.5],
                [1.0, 1.0],
            ]
        );
        // patch midpoints lie on the control polygon
        assert_eq!(patches[1].point, [25.0, 25.0]);
        assert_eq!(patches[4].point, [75.0, 25.0]);
    }

    #[test]
    fn closed_curved_path_keeps_the_closing_curve_patch() {
        let mut builder = PathBuilder::new();
        builder.move_to((0.0, 0.0));
        builder.line_to((100.0, 0.0));
        // the final curve returns to the start, so closing adds no edge
        builder.quad_to((100.0, 100.0), (0.0, 0.0));
        builder.close();
        let out = tessellate(&builder);

        // the closing segment gets no anchor triangle, but its chord and
        // patches are still emitted
        let quads = out
            .vertices
            .iter()
            .filter(|v| v.primitive == DrawPrimitive::QuadraticFill.tag())
            .count();
        assert_eq!(quads, 6);
        assert_eq!(out.vertices.len(), 9);
        assert_eq!(out.vertices[0].point, [100.0, 0.0]);
        assert_eq!(out.vertices[1].point, [75.0, 50.0]);
        assert_eq!(out.vertices[2].point, [0.0, 0.0]);
    }
}
