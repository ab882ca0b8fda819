// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-segment tangent and length data backing stroke tessellation.

use peniko::kurbo::Vec2;

use crate::decompose::{PreprocessedSubpath, Segment};
use crate::math::quad_arclen;

/// Unit tangents and arc length of one flattened segment.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SegmentAnalysis {
    pub(crate) start_tangent: Vec2,
    pub(crate) end_tangent: Vec2,
    pub(crate) length: f64,
}

/// Tangents, lengths and the total length of a flattened subpath.
///
/// Stroke tessellation reads the endpoint tangents when placing joins and
/// caps, and converts the running length into the `[0, 1]` along-stroke
/// position carried by every stroke vertex.
#[derive(Clone, Debug)]
pub(crate) struct StrokeAnalysis {
    pub(crate) segments: Vec<SegmentAnalysis>,
    pub(crate) total_length: f64,
}

fn normalize(v: Vec2) -> Vec2 {
    v / v.hypot()
}

impl StrokeAnalysis {
    pub(crate) fn new(subpath: &PreprocessedSubpath) -> Self {
        let mut segments = Vec::with_capacity(subpath.num_segments());
        let mut total_length = 0.0;
        for segment in subpath.segments() {
            let analysis = match segment {
                Segment::Line { from, to } => {
                    let tangent = normalize(to - from);
                    SegmentAnalysis {
                        start_tangent: tangent,
                        end_tangent: tangent,
                        length: (to - from).hypot(),
                    }
                }
                Segment::Quad { from, ctrl, to } => SegmentAnalysis {
                    start_tangent: normalize(ctrl - from),
                    end_tangent: normalize(to - ctrl),
                    length: quad_arclen(from, ctrl, to),
                },
            };
            total_length += analysis.length;
            segments.push(analysis);
        }
        Self {
            segments,
            total_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use peniko::kurbo::Vec2;

    use super::StrokeAnalysis;
    use crate::decompose::PreprocessedPath;
    use crate::path::{PathBuilder, PathUsage};

    #[test]
    fn line_tangents_and_lengths() {
        let mut builder = PathBuilder::new();
        builder.move_to((0.0, 0.0));
        builder.line_to((3.0, 4.0));
        builder.line_to((3.0, 14.0));
        let pp = PreprocessedPath::new(&builder.build(PathUsage::Static));
        let sa = StrokeAnalysis::new(&pp.subpaths[0]);

        assert_eq!(sa.segments.len(), 2);
        assert_eq!(sa.segments[0].length, 5.0);
        assert_eq!(sa.segments[1].length, 10.0);
        assert_eq!(sa.total_length, 15.0);
        assert_eq!(sa.segments[0].start_tangent, Vec2::new(0.6, 0.8));
        assert_eq!(sa.segments[0].end_tangent, Vec2::new(0.6, 0.8));
        assert_eq!(sa.segments[1].start_tangent, Vec2::new(0.0, 1.0));
    }

    #[test]
    fn quad_tangents_follow_the_control_polygon() {
        let mut builder = PathBuilder::new();
        builder.move_to((0.0, 0.0));
        builder.quad_to((10.0, 0.0), (10.0, 10.0));
        let pp = PreprocessedPath::new(&builder.build(PathUsage::Static));
        let sa = StrokeAnalysis::new(&pp.subpaths[0]);

        assert_eq!(sa.segments.len(), 1);
        let seg = &sa.segments[0];
        assert!((seg.start_tangent - Vec2::new(1.0, 0.0)).hypot() < 1e-12);
        assert!((seg.end_tangent - Vec2::new(0.0, 1.0)).hypot() < 1e-12);
        // longer than the chord, shorter than the control polygon
        assert!(seg.length > 10.0 * std::f64::consts::SQRT_2);
        assert!(seg.length < 20.0);
        assert_eq!(sa.total_length, seg.length);
    }
}
