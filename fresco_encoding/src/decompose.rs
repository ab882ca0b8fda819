// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flattening of paths into line and quadratic segments.

use peniko::kurbo::{CubicBez, Point};

use crate::geometry::ArcSegment;
use crate::math::{mix, solve_at_most_cubic};
use crate::path::{Path, Subpath, SubpathElement, Verb};

/// A path reduced to line and quadratic segments, ready for tessellation.
#[derive(Clone, Debug)]
pub(crate) struct PreprocessedPath {
    pub(crate) subpaths: Vec<PreprocessedSubpath>,
}

impl PreprocessedPath {
    pub(crate) fn new(path: &Path) -> Self {
        // The flattening tolerance scales with the path extent.
        let (w, h) = path
            .bounding_box(None)
            .map_or((0.0, 0.0), |bounds| (bounds.width(), bounds.height()));
        let tolerance = w.max(h).max(1e-16) * 0.001;

        let subpaths = path
            .subpaths()
            .iter()
            .map(|subpath| PreprocessedSubpath::preprocess(subpath, tolerance))
            .collect();
        Self { subpaths }
    }
}

/// One flattened subpath.
///
/// The data layout mirrors [`Subpath`]: the start point followed by tagged
/// elements, but only line and quadratic tags occur and a closing edge is
/// stored as an explicit line. Degenerate input elements are culled here so
/// that tessellation never sees zero-length segments.
#[derive(Clone, Debug)]
pub(crate) struct PreprocessedSubpath {
    data: Vec<f64>,
    cyclic: bool,
    num_segments: usize,
}

impl PreprocessedSubpath {
    fn preprocess(subpath: &Subpath, tolerance: f64) -> Self {
        let start = subpath.start();
        let mut data = vec![start.x, start.y];
        let mut num_segments = 0;
        let mut last = start;

        for element in subpath.elements() {
            match element {
                SubpathElement::Line { from, to } => {
                    if to == from {
                        continue;
                    }
                    num_segments += 1;
                    data.extend([Verb::Line.tag(), to.x, to.y]);
                }
                SubpathElement::Quad { from, ctrl, to } => {
                    if ctrl == from || ctrl == to {
                        if from == to {
                            continue;
                        }
                        num_segments += 1;
                        data.extend([Verb::Line.tag(), to.x, to.y]);
                        continue;
                    }
                    num_segments += 1;
                    data.extend([Verb::Quad.tag(), ctrl.x, ctrl.y, to.x, to.y]);
                }
                SubpathElement::Cubic {
                    from,
                    ctrl0,
                    ctrl1,
                    to,
                } => {
                    if ctrl0 == from && ctrl1 == ctrl0 && to == ctrl1 {
                        continue;
                    }
                    if ctrl0 == from {
                        if ctrl1 == to || ctrl1 == ctrl0 {
                            num_segments += 1;
                            data.extend([Verb::Line.tag(), to.x, to.y]);
                            continue;
                        }
                    } else if ctrl1 == to && ctrl0 == ctrl1 {
                        num_segments += 1;
                        data.extend([Verb::Line.tag(), to.x, to.y]);
                        continue;
                    }
                    num_segments += decompose_cubic(
                        CubicBez::new(from, ctrl0, ctrl1, to),
                        tolerance,
                        &mut data,
                    );
                }
                SubpathElement::Arc { arc, .. } => {
                    num_segments += decompose_arc(&arc, tolerance, &mut data);
                }
            }
            last = element.end_point();
        }

        let cyclic = subpath.is_closed();
        if cyclic && last != start {
            num_segments += 1;
            data.extend([Verb::Line.tag(), start.x, start.y]);
        }

        Self {
            data,
            cyclic,
            num_segments,
        }
    }

    pub(crate) fn start(&self) -> Point {
        Point::new(self.data[0], self.data[1])
    }

    pub(crate) fn is_cyclic(&self) -> bool {
        self.cyclic
    }

    pub(crate) fn num_segments(&self) -> usize {
        self.num_segments
    }

    pub(crate) fn segments(&self) -> Segments<'_> {
        Segments {
            data: &self.data,
            index: 2,
            last: self.start(),
        }
    }
}

/// A flattened segment with its resolved start point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Segment {
    Line { from: Point, to: Point },
    Quad { from: Point, ctrl: Point, to: Point },
}

impl Segment {
    pub(crate) fn start_point(&self) -> Point {
        match *self {
            Self::Line { from, .. } | Self::Quad { from, .. } => from,
        }
    }

    pub(crate) fn end_point(&self) -> Point {
        match *self {
            Self::Line { to, .. } | Self::Quad { to, .. } => to,
        }
    }
}

/// Iterator over the segments of a preprocessed subpath.
pub(crate) struct Segments<'a> {
    data: &'a [f64],
    index: usize,
    last: Point,
}

impl Iterator for Segments<'_> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        let d = self.data;
        if self.index >= d.len() {
            return None;
        }
        let i = self.index;
        let from = self.last;
        let segment = match Verb::from_tag(d[i]) {
            Verb::Line => {
                self.index += 3;
                Segment::Line {
                    from,
                    to: Point::new(d[i + 1], d[i + 2]),
                }
            }
            Verb::Quad => {
                self.index += 5;
                Segment::Quad {
                    from,
                    ctrl: Point::new(d[i + 1], d[i + 2]),
                    to: Point::new(d[i + 3], d[i + 4]),
                }
            }
            _ => unreachable!("bad segment tag"),
        };
        self.last = segment.end_point();
        Some(segment)
    }
}

/// Appends quadratic segments covering an elliptic arc.
///
/// Per-segment sweep is limited so that the parabolic arcs stay within
/// `tolerance` of the ellipse; see Pomax, "A Primer on Bézier Curves",
/// <https://pomax.github.io/bezierinfo/#circles>.
fn decompose_arc(arc: &ArcSegment, tolerance: f64, out: &mut Vec<f64>) -> usize {
    let sweep = arc.end_angle - arc.start_angle;
    if sweep == 0.0 {
        return 0;
    }

    let tolerance = (tolerance / arc.radii.x.max(arc.radii.y)).min(0.2);
    let limit = 4.0
        * ((2.0 + tolerance - (tolerance * (2.0 + tolerance)).sqrt()) * 0.5)
            .sqrt()
            .acos();
    let num_segments = (sweep.abs() / limit).ceil() as usize;

    // The control point sits on the mid-angle ray, pushed outwards so the
    // parabola through it meets the ellipse at both segment ends.
    let cp_scale = 1.0 / (sweep.abs() * 0.5 / num_segments as f64).cos();

    let (rsin, rcos) = arc.rotation.sin_cos();
    let at = |angle: f64, scale: f64| {
        let lx = angle.cos() * arc.radii.x * scale;
        let ly = angle.sin() * arc.radii.y * scale;
        Point::new(
            lx * rcos - ly * rsin + arc.center.x,
            lx * rsin + ly * rcos + arc.center.y,
        )
    };

    let mut seg_start = arc.start_angle;
    for i in 0..num_segments {
        let seg_end = (i + 1) as f64 / num_segments as f64 * sweep + arc.start_angle;
        let ctrl = at((seg_start + seg_end) * 0.5, cp_scale);
        let end = at(seg_end, 1.0);
        out.extend([Verb::Quad.tag(), ctrl.x, ctrl.y, end.x, end.y]);
        seg_start = seg_end;
    }

    num_segments
}

// Decomposition of a cubic proceeds through phases, encoded in the high
// nibble of the level byte: 0 finds inflections and loops, 2 checks the
// control polygon's inner angle, 3 bounds the approximation error, 4
// emits. The low nibble counts splits, so runaway subdivision in one
// phase overflows into the next.
const PHASE_TANGENTS: u8 = 0x20;
const PHASE_ERROR: u8 = 0x30;

/// Approximates a cubic bézier with a quadratic spline and appends it.
///
/// Returns the number of segments written. The error bound follows Yeon
/// Soo Kim and Young Joon Ahn, "Explicit Error Bound for Quadratic Spline
/// Approximation of Cubic Spline".
fn decompose_cubic(cubic: CubicBez, tolerance: f64, out: &mut Vec<f64>) -> usize {
    if cubic.p0 == cubic.p1 && cubic.p2 == cubic.p3 {
        out.extend([Verb::Line.tag(), cubic.p3.x, cubic.p3.y]);
        return 1;
    }

    let mut num_segments = 0;
    let mut roots = [0.0; 3];
    let mut stack = vec![(0_u8, cubic)];

    while let Some((mut level, c)) = stack.pop() {
        let CubicBez { p0, p1, p2, p3 } = c;

        if level >> 4 <= 1 {
            // Align the curve to its chord and find inflections.
            let mut axis = p3 - p0;
            if axis.x == 0.0 && axis.y == 0.0 {
                axis.x = 1.0;
            }
            let d1 = p1 - p0;
            let d2 = p2 - p0;
            let bx2 = d1.dot(axis);
            let by2 = axis.cross(d1);
            let bx3 = d2.dot(axis);
            let by3 = axis.cross(d2);
            let bx4 = (p3 - p0).dot(axis);

            let a = bx3 * by2;
            let b = bx4 * by2;
            let cc = bx2 * by3;
            let d = bx4 * by3;
            let x = -3.0 * a + 2.0 * b + 3.0 * cc - d;
            let y = 3.0 * a - b - 3.0 * cc;
            let z = cc - a;

            if x == 0.0 && y == 0.0 && z == 0.0 {
                // Both control points sit on the chord line: the curve
                // degenerates to that segment.
                if p3 != p0 {
                    num_segments += 1;
                    out.extend([Verb::Line.tag(), p3.x, p3.y]);
                }
                continue;
            }

            let mut det = (y * y - 4.0 * x * z).sqrt();
            let ix = 1.0 / (2.0 * x);
            if x < 0.0 {
                // keep sol1 < sol2
                det = -det;
            }
            let mut sol1 = (-y - det) * ix;
            let sol2 = (-y + det) * ix;
            let mut sol1_valid = sol1 > 0.0 && sol1 < 1.0;
            let mut sol2_valid = sol2 > 0.0 && sol2 < 1.0;
            if !sol1_valid {
                sol1 = sol2;
                sol1_valid = sol2_valid;
                sol2_valid = false;
            }

            if sol2_valid {
                // Both inflections inside: split into three pieces, with
                // the piece nearest the start on top of the stack.
                let (head, tail) = split_cubic(c, sol2);
                let (first, second) = split_cubic(head, sol1 / sol2);
                stack.push((PHASE_TANGENTS, tail));
                stack.push((PHASE_TANGENTS, second));
                stack.push((PHASE_TANGENTS, first));
                continue;
            } else if sol1_valid {
                let (first, second) = split_cubic(c, sol1);
                stack.push((PHASE_TANGENTS, second));
                stack.push((PHASE_TANGENTS, first));
                continue;
            }

            // No inflections; classify the end point in canonical space to
            // detect a loop, and split loops at their widest point. A curve
            // returning to its start always loops.
            let dx = p3.x - p0.x;
            let dy = p3.y - p0.y;
            let fy = p1.y - p0.y;
            let f1 = dy / fy;
            let f2 = (p2.y - p0.y) / fy;
            let ex = (dx - (p1.x - p0.x) * f1) / (p2.x - p0.x - (p1.x - p0.x) * f2);
            let ey = f1 + (1.0 - f2) * ex;
            let exx = ex * ex;
            let upper = if ex < 0.0 {
                (-1.0 / 3.0) * exx + ex
            } else {
                ((12.0 * ex - 3.0 * exx).sqrt() - ex) * 0.5
            };
            if p3 == p0 || (ey > -0.25 * exx + 0.5 * ex + 0.75 && ey <= upper) {
                let frac = furthest_point(c);
                let (first, second) = split_cubic(c, frac);
                stack.push((level + 4, second));
                stack.push((level + 4, first));
                continue;
            }
            level = PHASE_TANGENTS;
        }

        if level >> 4 == 2 {
            // Can a quadratic with the same endpoints and endpoint tangents
            // be formed at all?
            let d1 = p1 - p0;
            let d2 = p2 - p3;
            let sq1 = d1.hypot2();
            let sq2 = d2.hypot2();

            if p3 == p0 && sq1 == 0.0 && sq2 == 0.0 {
                continue;
            }

            if d1.dot(d2) > 0.4 * (sq1 * sq2).sqrt() {
                let frac = furthest_point(c);
                let (first, second) = split_cubic(c, frac);
                stack.push((level + 4, second));
                stack.push((level + 4, first));
                continue;
            }
            level = PHASE_ERROR;
        }

        if level >> 4 == 3 {
            // Estimate the error and subdivide while it is too much.
            let d1 = p1 - p0;
            let d2 = p2 - p3;
            let (delta0, delta1, ctrl) = if d1.x == 0.0 && d1.y == 0.0 {
                (0.0, 1.0, p2)
            } else if d2.x == 0.0 && d2.y == 0.0 {
                (1.0, 0.0, p1)
            } else {
                let p = 1.0 / (d2.x * d1.y - d2.y * d1.x);
                let chord = p3 - p0;
                let idelta0 = (d2.x * chord.y - d2.y * chord.x) * p;
                let idelta1 = (d1.x * chord.y - d1.y * chord.x) * p;
                (1.0 / idelta0, 1.0 / idelta1, p0 + d1 * idelta0)
            };

            let ap = 3.0 * (delta0 + delta1) - 4.0;
            let a = ap * ap;
            let b = ap * (-7.0 * delta0 - 2.0 * delta1 + 6.0);
            let cc =
                15.0 * delta0 * delta0 + 9.0 * delta0 * delta1 - 18.0 * delta0 + 2.0 * delta1;
            let d = 4.0 - 4.0 * delta1 - 3.0 * delta0 * delta0;

            let num_roots = solve_at_most_cubic(a, b, cc, d, &mut roots);
            let mut worst = 0.0;
            let mut worst_pos = -1.0;
            for &fr in &roots[..num_roots] {
                if !(fr > 0.0 && fr < 1.0) {
                    continue;
                }
                let ifr = 1.0 - fr;
                let ifr2 = ifr * ifr;
                let fr2 = fr * fr;
                let b0 = ifr2 * ifr;
                let b1 = 3.0 * fr * ifr2;
                let b2 = 3.0 * fr2 * ifr;
                let b3 = fr2 * fr;
                let t1 = 4.0 * (b0 + (1.0 - delta0) * b1) * (b3 + (1.0 - delta1) * b2);
                let t2 = delta0 * b1 + delta1 * b2;
                let t = (t1 - t2 * t2).abs();
                if t > worst {
                    worst = t;
                    worst_pos = fr;
                }
            }

            // scale by |q0 + q2 - 2 q1| / 4
            let e = ((p0 - ctrl) + (p3 - ctrl)).hypot();
            worst *= e * 0.25;

            if worst > tolerance {
                let (first, second) = split_cubic(c, worst_pos);
                stack.push((level + 4, second));
                stack.push((level + 4, first));
                continue;
            }
        }

        // Emit the quadratic interpolating the endpoints with G^1 tangent
        // continuity; its control point is the tangent intersection.
        let d1 = p1 - p0;
        let d2 = p2 - p3;
        let ctrl = if d1.x == 0.0 && d1.y == 0.0 {
            p2
        } else if d2.x == 0.0 && d2.y == 0.0 {
            p1
        } else {
            let p = 1.0 / (d1.y * d2.x - d1.x * d2.y);
            let t1 = (p0.x * p1.y - p0.y * p1.x) * p;
            let t2 = (p2.x * p3.y - p2.y * p3.x) * p;
            Point::new(
                t1 * (p2.x - p3.x) - t2 * (p0.x - p1.x),
                t1 * (p2.y - p3.y) - t2 * (p0.y - p1.y),
            )
        };
        num_segments += 1;
        out.extend([Verb::Quad.tag(), ctrl.x, ctrl.y, p3.x, p3.y]);
    }

    num_segments
}

/// Parameter of the point furthest from the chord, used as a split
/// position for loops and sharp bends.
fn furthest_point(c: CubicBez) -> f64 {
    let tx = c.p0.y - c.p3.y;
    let ty = c.p3.x - c.p0.x;
    let t1 = c.p0.x * tx + c.p0.y * ty;
    let t2 = c.p1.x * tx + c.p1.y * ty - t1;
    let t3 = c.p2.x * tx + c.p2.y * ty - t1;
    let a = t2 - t3;
    let b = t3 - 2.0 * t2;
    let det = (t2 * t2 + t3 * t3 - t2 * t3).sqrt();
    let ia = (1.0 / 3.0) / a;

    let mut worst_frac = 0.5;
    let mut worst = 0.0;
    for frac in [(-b - det) * ia, (-b + det) * ia] {
        if frac > 0.0 && frac < 1.0 {
            let dist = (frac * (1.0 - frac) * (t2 * (1.0 - frac) + t3 * frac)).abs();
            if dist > worst {
                worst = dist;
                worst_frac = frac;
            }
        }
    }
    worst_frac
}

fn mix_point(a: Point, b: Point, t: f64) -> Point {
    Point::new(mix(a.x, b.x, t), mix(a.y, b.y, t))
}

fn split_cubic(c: CubicBez, frac: f64) -> (CubicBez, CubicBez) {
    let b1 = mix_point(c.p0, c.p1, frac);
    let b2 = mix_point(c.p1, c.p2, frac);
    let b3 = mix_point(c.p2, c.p3, frac);
    let c1 = mix_point(b1, b2, frac);
    let c2 = mix_point(b2, b3, frac);
    let d = mix_point(c1, c2, frac);
    (
        CubicBez::new(c.p0, b1, c1, d),
        CubicBez::new(d, c2, b3, c.p3),
    )
}

#[cfg(test)]
mod tests {
    use peniko::kurbo::{CubicBez, ParamCurve, Point, QuadBez};

    use super::{PreprocessedPath, PreprocessedSubpath, Segment};
    use crate::path::{Path, PathBuilder, PathUsage};

    fn flatten(path: &Path) -> PreprocessedPath {
        PreprocessedPath::new(path)
    }

    fn path_tolerance(path: &Path) -> f64 {
        let bounds = path.bounding_box(None).unwrap();
        bounds.width().max(bounds.height()).max(1e-16) * 0.001
    }

    /// Largest distance from a sample of `cubic` to the flattened spline.
    fn max_deviation(cubic: CubicBez, flattened: &PreprocessedSubpath) -> f64 {
        let mut spline = Vec::new();
        for segment in flattened.segments() {
            match segment {
                Segment::Line { from, to } => {
                    for k in 0..=64 {
                        let t = k as f64 / 64.0;
                        spline.push(from + t * (to - from));
                    }
                }
                Segment::Quad { from, ctrl, to } => {
                    let quad = QuadBez::new(from, ctrl, to);
                    for k in 0..=512 {
                        spline.push(quad.eval(k as f64 / 512.0));
                    }
                }
            }
        }
        let mut worst = 0.0_f64;
        for k in 0..=256 {
            let probe = cubic.eval(k as f64 / 256.0);
            let nearest = spline
                .iter()
                .map(|p| (*p - probe).hypot())
                .fold(f64::INFINITY, f64::min);
            worst = worst.max(nearest);
        }
        worst
    }

    #[test]
    fn polygon_passes_through_with_closing_edge() {
        let mut builder = PathBuilder::new();
        builder.move_to((0.0, 0.0));
        builder.line_to((4.0, 0.0));
        builder.line_to((4.0, 3.0));
        builder.line_to((0.0, 3.0));
        builder.close();
        let pp = flatten(&builder.build(PathUsage::Static));
        let subpath = &pp.subpaths[0];
        assert!(subpath.is_cyclic());
        assert_eq!(subpath.num_segments(), 4);
        let last = subpath.segments().last().unwrap();
        assert_eq!(last.end_point(), Point::new(0.0, 0.0));
    }

    #[test]
    fn closing_onto_the_start_adds_no_edge() {
        let mut builder = PathBuilder::new();
        builder.move_to((0.0, 0.0));
        builder.line_to((1.0, 0.0));
        builder.line_to((0.0, 1.0));
        builder.line_to((0.0, 0.0));
        builder.close();
        let pp = flatten(&builder.build(PathUsage::Static));
        let subpath = &pp.subpaths[0];
        assert!(subpath.is_cyclic());
        assert_eq!(subpath.num_segments(), 3);
    }

    #[test]
    fn degenerate_elements_are_culled() {
        let mut builder = PathBuilder::new();
        builder.move_to((0.0, 0.0));
        // zero-length line
        builder.line_to((0.0, 0.0));
        // quadratic with a coincident control point reduces to a line
        builder.quad_to((0.0, 0.0), (5.0, 0.0));
        // quadratic collapsing onto its start point vanishes
        builder.quad_to((5.0, 0.0), (5.0, 0.0));
        // cubic with both controls on an endpoint reduces to a line
        builder.cubic_to((5.0, 0.0), (5.0, 0.0), (5.0, 4.0));
        let pp = flatten(&builder.build(PathUsage::Static));
        let subpath = &pp.subpaths[0];
        assert_eq!(subpath.num_segments(), 2);
        let segments: Vec<_> = subpath.segments().collect();
        assert_eq!(
            segments[0],
            Segment::Line {
                from: Point::new(0.0, 0.0),
                to: Point::new(5.0, 0.0),
            }
        );
        assert_eq!(
            segments[1],
            Segment::Line {
                from: Point::new(5.0, 0.0),
                to: Point::new(5.0, 4.0),
            }
        );
        assert_eq!(subpath.num_segments(), subpath.segments().count());
    }

    #[test]
    fn cubic_spline_stays_within_tolerance() {
        let cubic = CubicBez::new(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(0.0, 100.0),
            Point::new(100.0, 100.0),
        );
        let mut builder = PathBuilder::new();
        builder.move_to(cubic.p0);
        builder.cubic_to(cubic.p1, cubic.p2, cubic.p3);
        let path = builder.build(PathUsage::Static);
        let tolerance = path_tolerance(&path);
        let pp = flatten(&path);
        let subpath = &pp.subpaths[0];
        assert!(subpath.num_segments() >= 2);
        assert_eq!(subpath.num_segments(), subpath.segments().count());
        let deviation = max_deviation(cubic, subpath);
        assert!(
            deviation < tolerance * 2.0,
            "deviation {deviation} exceeds {tolerance}"
        );
    }

    #[test]
    fn looping_cubic_stays_within_tolerance() {
        let cubic = CubicBez::new(
            Point::new(0.0, 0.0),
            Point::new(200.0, 100.0),
            Point::new(-100.0, 100.0),
            Point::new(0.0, 0.0),
        );
        let mut builder = PathBuilder::new();
        builder.move_to(cubic.p0);
        builder.cubic_to(cubic.p1, cubic.p2, cubic.p3);
        let path = builder.build(PathUsage::Static);
        let tolerance = path_tolerance(&path);
        let pp = flatten(&path);
        let subpath = &pp.subpaths[0];
        assert!(!subpath.is_cyclic());
        let deviation = max_deviation(cubic, subpath);
        assert!(
            deviation < tolerance * 2.0,
            "deviation {deviation} exceeds {tolerance}"
        );
    }

    #[test]
    fn full_circle_needs_several_arcs() {
        let mut builder = PathBuilder::new();
        builder.arc((0.0, 0.0), 50.0, 0.0, std::f64::consts::TAU, false);
        let path = builder.build(PathUsage::Static);
        let pp = flatten(&path);
        let subpath = &pp.subpaths[0];
        assert!((4..=16).contains(&subpath.num_segments()));

        // every on-curve point stays on the circle, control points push out
        let tolerance = path_tolerance(&path);
        for segment in subpath.segments() {
            let Segment::Quad { from, ctrl, to } = segment else {
                panic!("expected quads only");
            };
            assert!((from.to_vec2().hypot() - 50.0).abs() < 1e-9);
            assert!((to.to_vec2().hypot() - 50.0).abs() < 1e-9);
            assert!(ctrl.to_vec2().hypot() > 50.0);
            let quad = QuadBez::new(from, ctrl, to);
            for k in 0..=64 {
                let r = quad.eval(k as f64 / 64.0).to_vec2().hypot();
                assert!((r - 50.0).abs() < tolerance * 1.5);
            }
        }
    }
}
