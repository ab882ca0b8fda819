// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Path geometry and the builder that produces it.

use std::f64::consts::{SQRT_2, TAU};
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use peniko::kurbo::{CubicBez, ParamCurveExtrema, Point, QuadBez, Rect, Vec2};

use crate::geometry::ArcSegment;
use crate::style::{Cap, Join, StrokeStyle};

/// Identity handle for a [`Path`], used as a cache and residency key.
///
/// Ids are process-unique and never reused; clones of a path share its id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PathId(pub NonZeroU64);

impl PathId {
    fn next() -> Self {
        // We initialize with 1 so that the conversion below succeeds
        static ID_COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(NonZeroU64::new(ID_COUNTER.fetch_add(1, Ordering::Relaxed)).unwrap())
    }
}

/// How a path's tessellation is expected to be reused across frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathUsage {
    /// Tessellated once; the vertices stay resident for reuse on later
    /// frames.
    Static,
    /// Re-uploaded on every frame that draws the path.
    Dynamic,
}

/// Element tags stored inline in subpath data.
///
/// A subpath is a flat `f64` buffer: the start point `[x, y]` followed by
/// tagged elements. Each element stores its tag and then its operands, so
/// the two values before a tag are always the element's start point.
///
/// | tag | operands |
/// |---|---|
/// | `Close` | none |
/// | `Line` | `x, y` |
/// | `Quad` | `cx, cy, x, y` |
/// | `Cubic` | `c1x, c1y, c2x, c2y, x, y` |
/// | `Arc` | `cx, cy, rx, ry, rotation, start_angle, end_angle, x, y` |
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Verb {
    Close = 0,
    Line = 1,
    Quad = 2,
    Cubic = 3,
    Arc = 4,
}

impl Verb {
    pub(crate) fn tag(self) -> f64 {
        self as u8 as f64
    }

    pub(crate) fn from_tag(tag: f64) -> Self {
        match tag as u8 {
            0 => Self::Close,
            1 => Self::Line,
            2 => Self::Quad,
            3 => Self::Cubic,
            4 => Self::Arc,
            _ => unreachable!("bad path element tag"),
        }
    }

    /// Buffer stride of an element, tag included.
    fn stride(self) -> usize {
        match self {
            Self::Close => 1,
            Self::Line => 3,
            Self::Quad => 5,
            Self::Cubic => 7,
            Self::Arc => 10,
        }
    }
}

/// A decoded subpath element together with its resolved start point.
#[derive(Clone, Copy, Debug)]
pub(crate) enum SubpathElement {
    Line {
        from: Point,
        to: Point,
    },
    Quad {
        from: Point,
        ctrl: Point,
        to: Point,
    },
    Cubic {
        from: Point,
        ctrl0: Point,
        ctrl1: Point,
        to: Point,
    },
    Arc {
        from: Point,
        arc: ArcSegment,
        to: Point,
    },
}

impl SubpathElement {
    pub(crate) fn start_point(&self) -> Point {
        match *self {
            Self::Line { from, .. }
            | Self::Quad { from, .. }
            | Self::Cubic { from, .. }
            | Self::Arc { from, .. } => from,
        }
    }

    pub(crate) fn end_point(&self) -> Point {
        match *self {
            Self::Line { to, .. }
            | Self::Quad { to, .. }
            | Self::Cubic { to, .. }
            | Self::Arc { to, .. } => to,
        }
    }

    /// Unnormalized tangent at the element's start.
    pub(crate) fn start_direction(&self) -> Vec2 {
        match *self {
            Self::Line { from, to } => to - from,
            Self::Quad { from, ctrl, .. } => 2.0 * (ctrl - from),
            Self::Cubic { from, ctrl0, .. } => 3.0 * (ctrl0 - from),
            Self::Arc { arc, .. } => arc.eval_derivative(0.0),
        }
    }

    /// Unnormalized tangent at the element's end.
    pub(crate) fn end_direction(&self) -> Vec2 {
        match *self {
            Self::Line { from, to } => to - from,
            Self::Quad { ctrl, to, .. } => 2.0 * (to - ctrl),
            Self::Cubic { ctrl1, to, .. } => 3.0 * (to - ctrl1),
            Self::Arc { arc, .. } => arc.eval_derivative(1.0),
        }
    }
}

/// One figure of a [`Path`], stored as a flat buffer of tagged elements.
#[derive(Clone, Debug)]
pub(crate) struct Subpath {
    data: Vec<f64>,
}

impl Subpath {
    pub(crate) fn start(&self) -> Point {
        Point::new(self.data[0], self.data[1])
    }

    /// Whether the subpath ends with a close element.
    pub(crate) fn is_closed(&self) -> bool {
        let mut index = 2;
        while index < self.data.len() {
            let verb = Verb::from_tag(self.data[index]);
            if verb == Verb::Close {
                return true;
            }
            index += verb.stride();
        }
        false
    }

    /// Iterates the real elements of the subpath.
    ///
    /// The terminating close element, when present, is not yielded;
    /// consumers that need the closing edge check [`Self::is_closed`].
    pub(crate) fn elements(&self) -> Elements<'_> {
        Elements {
            data: &self.data,
            index: 2,
            last: self.start(),
        }
    }

    fn accumulate_bounds(&self, stroke: Option<&StrokeStyle>, min: &mut Point, max: &mut Point) {
        let mut elements = self.elements().peekable();
        let Some(&first) = elements.peek() else {
            return;
        };
        let first_direction = first.start_direction();
        let closed = self.is_closed();

        let width = stroke.map_or(0.0, |style| style.width());
        let cap_radius = match stroke {
            Some(style) if style.cap() == Cap::Square => style.width() * SQRT_2,
            Some(style) => style.width(),
            None => 0.0,
        };
        // Depending on the join angle, a miter tip can reach far past the
        // width padding.
        let miter_limit = stroke
            .filter(|style| style.join() == Join::Miter)
            .map(|style| style.miter_cos_limit());

        while let Some(element) = elements.next() {
            include_point(element.start_point(), cap_radius, min, max);
            include_point(element.end_point(), cap_radius, min, max);
            match element {
                SubpathElement::Line { .. } => {}
                SubpathElement::Quad { from, ctrl, to } => include_rect(
                    QuadBez::new(from, ctrl, to)
                        .bounding_box()
                        .inflate(width, width),
                    min,
                    max,
                ),
                SubpathElement::Cubic {
                    from,
                    ctrl0,
                    ctrl1,
                    to,
                } => include_rect(
                    CubicBez::new(from, ctrl0, ctrl1, to)
                        .bounding_box()
                        .inflate(width, width),
                    min,
                    max,
                ),
                SubpathElement::Arc { arc, .. } => {
                    include_rect(arc.bounding_box().inflate(width, width), min, max);
                }
            }

            let Some(cos_limit) = miter_limit else {
                continue;
            };
            // The junction at the closing seam joins the last element to the
            // first one.
            let next_direction = match elements.peek() {
                Some(next) => next.start_direction(),
                None if closed => first_direction,
                None => continue,
            };
            let t1 = element.end_direction();
            let t1 = t1 / t1.hypot();
            let t2 = next_direction / next_direction.hypot();
            if t1.dot(t2) > cos_limit {
                let sum = t1 + t2;
                let outward = if t1.cross(t2) > 0.0 {
                    Vec2::new(sum.y, -sum.x)
                } else {
                    Vec2::new(-sum.y, sum.x)
                };
                let tip = element.end_point() + outward * (width / sum.hypot2());
                include_point(tip, 0.0, min, max);
            }
        }
    }
}

fn include_point(point: Point, radius: f64, min: &mut Point, max: &mut Point) {
    min.x = min.x.min(point.x - radius);
    min.y = min.y.min(point.y - radius);
    max.x = max.x.max(point.x + radius);
    max.y = max.y.max(point.y + radius);
}

fn include_rect(rect: Rect, min: &mut Point, max: &mut Point) {
    min.x = min.x.min(rect.x0);
    min.y = min.y.min(rect.y0);
    max.x = max.x.max(rect.x1);
    max.y = max.y.max(rect.y1);
}

/// Iterator over the real elements of a subpath.
pub(crate) struct Elements<'a> {
    data: &'a [f64],
    index: usize,
    last: Point,
}

impl Iterator for Elements<'_> {
    type Item = SubpathElement;

    fn next(&mut self) -> Option<SubpathElement> {
        let d = self.data;
        if self.index >= d.len() {
            return None;
        }
        let i = self.index;
        let from = self.last;
        let verb = Verb::from_tag(d[i]);
        self.index += verb.stride();
        let element = match verb {
            Verb::Close => return None,
            Verb::Line => SubpathElement::Line {
                from,
                to: Point::new(d[i + 1], d[i + 2]),
            },
            Verb::Quad => SubpathElement::Quad {
                from,
                ctrl: Point::new(d[i + 1], d[i + 2]),
                to: Point::new(d[i + 3], d[i + 4]),
            },
            Verb::Cubic => SubpathElement::Cubic {
                from,
                ctrl0: Point::new(d[i + 1], d[i + 2]),
                ctrl1: Point::new(d[i + 3], d[i + 4]),
                to: Point::new(d[i + 5], d[i + 6]),
            },
            Verb::Arc => SubpathElement::Arc {
                from,
                arc: ArcSegment {
                    center: Point::new(d[i + 1], d[i + 2]),
                    radii: Vec2::new(d[i + 3], d[i + 4]),
                    rotation: d[i + 5],
                    start_angle: d[i + 6],
                    end_angle: d[i + 7],
                },
                to: Point::new(d[i + 8], d[i + 9]),
            },
        };
        self.last = element.end_point();
        Some(element)
    }
}

/// An immutable sequence of figures produced by a [`PathBuilder`].
///
/// Paths carry a process-unique [`PathId`] so that compiled tessellations
/// and resident vertex ranges can be keyed by identity rather than by
/// geometric content.
#[derive(Clone, Debug)]
pub struct Path {
    id: PathId,
    usage: PathUsage,
    subpaths: Vec<Subpath>,
}

impl Path {
    pub fn id(&self) -> PathId {
        self.id
    }

    pub fn usage(&self) -> PathUsage {
        self.usage
    }

    pub(crate) fn subpaths(&self) -> &[Subpath] {
        &self.subpaths
    }

    /// Conservative axis-aligned bounds of the path, or `None` for a path
    /// with no usable figures.
    ///
    /// With a stroke style the bounds cover the stroked outline: on-curve
    /// points are padded by the stroke width (square caps by `width *
    /// sqrt(2)`), curve interiors by their padded extrema boxes, and miter
    /// joins by the exact miter tip whenever the join angle is within the
    /// miter limit.
    pub fn bounding_box(&self, stroke: Option<&StrokeStyle>) -> Option<Rect> {
        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for subpath in &self.subpaths {
            subpath.accumulate_bounds(stroke, &mut min, &mut max);
        }
        (min.x <= max.x && min.y <= max.y).then(|| Rect::new(min.x, min.y, max.x, max.y))
    }
}

/// Builds [`Path`]s with a canvas-like figure API.
///
/// A figure is opened by [`Self::move_to`] and stays open until
/// [`Self::close`] or the next [`Self::move_to`]. Segment methods extend
/// the open figure and panic when none is open.
#[derive(Clone, Debug, Default)]
pub struct PathBuilder {
    subpaths: Vec<Vec<f64>>,
    current: Vec<f64>,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new figure at `point`.
    pub fn move_to(&mut self, point: impl Into<Point>) {
        let point = point.into();
        check_coord(point);
        self.flush();
        self.current.extend([point.x, point.y]);
    }

    /// Extends the open figure with a line segment to `point`.
    pub fn line_to(&mut self, point: impl Into<Point>) {
        let point = point.into();
        check_coord(point);
        self.check_active();
        self.current.extend([Verb::Line.tag(), point.x, point.y]);
    }

    /// Extends the open figure with a quadratic bézier segment.
    pub fn quad_to(&mut self, ctrl: impl Into<Point>, point: impl Into<Point>) {
        let ctrl = ctrl.into();
        let point = point.into();
        check_coord(ctrl);
        check_coord(point);
        self.check_active();
        self.current
            .extend([Verb::Quad.tag(), ctrl.x, ctrl.y, point.x, point.y]);
    }

    /// Extends the open figure with a cubic bézier segment.
    pub fn cubic_to(
        &mut self,
        ctrl0: impl Into<Point>,
        ctrl1: impl Into<Point>,
        point: impl Into<Point>,
    ) {
        let ctrl0 = ctrl0.into();
        let ctrl1 = ctrl1.into();
        let point = point.into();
        check_coord(ctrl0);
        check_coord(ctrl1);
        check_coord(point);
        self.check_active();
        self.current.extend([
            Verb::Cubic.tag(),
            ctrl0.x,
            ctrl0.y,
            ctrl1.x,
            ctrl1.y,
            point.x,
            point.y,
        ]);
    }

    /// Closes and ends the open figure.
    pub fn close(&mut self) {
        self.check_active();
        self.current.push(Verb::Close.tag());
        self.flush();
    }

    /// Appends a circular arc around `center`.
    ///
    /// The arc connects to the open figure with a line segment, or starts a
    /// new figure at its first point. Angles are in radians and sweep
    /// towards increasing angles unless `anticlockwise` is set.
    pub fn arc(
        &mut self,
        center: impl Into<Point>,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        anticlockwise: bool,
    ) {
        self.ellipse(
            center,
            Vec2::new(radius, radius),
            0.0,
            start_angle,
            end_angle,
            anticlockwise,
        );
    }

    /// Appends an elliptic arc with per-axis radii.
    ///
    /// `rotation` turns the whole ellipse around its center while the start
    /// and end angles are measured on the unrotated ellipse. The sweep is
    /// normalized to cover at most one full turn in the requested
    /// direction; an exact full turn is kept whole.
    pub fn ellipse(
        &mut self,
        center: impl Into<Point>,
        radii: Vec2,
        rotation: f64,
        start_angle: f64,
        end_angle: f64,
        anticlockwise: bool,
    ) {
        let center = center.into();
        check_coord(center);
        assert!(
            radii.x.is_finite() && radii.y.is_finite(),
            "arc radii must be finite"
        );
        assert!(
            rotation.is_finite() && start_angle.is_finite() && end_angle.is_finite(),
            "arc angles must be finite"
        );

        let start = wrap_angle(start_angle);
        let mut end = wrap_angle(end_angle);
        if anticlockwise {
            if end >= start {
                end -= TAU;
            }
        } else if end <= start {
            end += TAU;
        }

        let arc = ArcSegment {
            center,
            radii,
            rotation,
            start_angle: start,
            end_angle: end,
        };
        let first = arc.eval_angle(start);
        if self.current.is_empty() {
            self.move_to(first);
        } else {
            self.line_to(first);
        }
        let last = arc.eval_angle(end);
        self.current.extend([
            Verb::Arc.tag(),
            center.x,
            center.y,
            radii.x,
            radii.y,
            rotation,
            start,
            end,
            last.x,
            last.y,
        ]);
    }

    /// Builds a path from the figures collected so far.
    ///
    /// Figures too short to draw anything, such as a bare `move_to`, are
    /// dropped. The builder keeps its figures and can go on extending them
    /// afterwards.
    pub fn build(&self, usage: PathUsage) -> Path {
        let subpaths = self
            .subpaths
            .iter()
            .chain((!self.current.is_empty()).then_some(&self.current))
            .filter(|data| data.len() > 3)
            .map(|data| Subpath { data: data.clone() })
            .collect();
        Path {
            id: PathId::next(),
            usage,
            subpaths,
        }
    }

    fn check_active(&self) {
        assert!(!self.current.is_empty(), "no active figure");
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.subpaths.push(std::mem::take(&mut self.current));
        }
    }
}

fn check_coord(point: Point) {
    assert!(
        point.x.is_finite() && point.y.is_finite(),
        "path coordinates must be finite"
    );
}

fn wrap_angle(angle: f64) -> f64 {
    angle - (angle / TAU).floor() * TAU
}
