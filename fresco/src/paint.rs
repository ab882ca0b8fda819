// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Solid and gradient paints.

use fresco_encoding::math::unmix;
use peniko::kurbo::Point;
use peniko::{Color, ColorStop, ColorStops, Extend};

use crate::Error;

/// Which stroke parameter a [`StrokeGradient`] follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GradientDirection {
    /// The `[0, 1]` length fraction along the stroke.
    Along,
    /// The `[0, 1]` offset from one stroke edge to the other.
    Across,
}

/// A gradient between two points.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearGradient {
    pub start: Point,
    pub end: Point,
    pub extend: Extend,
    pub stops: ColorStops,
}

impl LinearGradient {
    pub fn new(
        start: impl Into<Point>,
        end: impl Into<Point>,
        stops: &[ColorStop],
        extend: Extend,
    ) -> Result<Self, Error> {
        Ok(Self {
            start: start.into(),
            end: end.into(),
            extend,
            stops: normalize_stops(stops)?,
        })
    }
}

/// A circular gradient centered on `start`; the radius is the distance
/// from `start` to `end`.
#[derive(Clone, Debug, PartialEq)]
pub struct RadialGradient {
    pub start: Point,
    pub end: Point,
    pub extend: Extend,
    pub stops: ColorStops,
}

impl RadialGradient {
    pub fn new(
        start: impl Into<Point>,
        end: impl Into<Point>,
        stops: &[ColorStop],
        extend: Extend,
    ) -> Result<Self, Error> {
        Ok(Self {
            start: start.into(),
            end: end.into(),
            extend,
            stops: normalize_stops(stops)?,
        })
    }
}

/// A gradient in stroke space, following the along or across parameter
/// that stroke tessellation writes into every vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokeGradient {
    pub direction: GradientDirection,
    pub extend: Extend,
    pub stops: ColorStops,
}

impl StrokeGradient {
    pub fn new(
        direction: GradientDirection,
        stops: &[ColorStop],
        extend: Extend,
    ) -> Result<Self, Error> {
        Ok(Self {
            direction,
            extend,
            stops: normalize_stops(stops)?,
        })
    }
}

/// What a shape is painted with.
#[derive(Clone, Debug, PartialEq)]
pub enum Paint {
    Solid(Color),
    Linear(LinearGradient),
    Radial(RadialGradient),
    Stroke(StrokeGradient),
}

impl From<Color> for Paint {
    fn from(color: Color) -> Self {
        Self::Solid(color)
    }
}

fn lerp_color(a: Color, b: Color, t: f32) -> Color {
    let channel = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8;
    Color::rgba8(
        channel(a.r, b.r),
        channel(a.g, b.g),
        channel(a.b, b.b),
        channel(a.a, b.a),
    )
}

/// Sorts, deduplicates and clips gradient stops so that they are
/// ascending, the first sits at offset 0 and the last at offset 1.
///
/// Stops outside `[0, 1]` are dropped with the boundary color
/// interpolated at the cut; runs of three or more stops sharing an
/// offset keep only the first and last. The stop count limit comes from
/// the gradient evaluation, which addresses stops with a fixed-depth
/// search.
fn normalize_stops(stops: &[ColorStop]) -> Result<ColorStops, Error> {
    if stops.is_empty() {
        return Err(Error::EmptyGradient);
    }
    if stops.len() > 200 {
        return Err(Error::TooManyGradientStops);
    }

    let mut stops = stops.to_vec();
    stops.sort_by(|a, b| a.offset.total_cmp(&b.offset));

    // Collapse runs of equal offsets down to their first and last stop.
    let mut last_offset = stops[stops.len() - 1].offset;
    let mut same_count = 1;
    for i in (0..stops.len() - 1).rev() {
        let offset = stops[i].offset;
        if offset == last_offset {
            same_count += 1;
            if same_count >= 3 {
                stops.remove(i + 1);
            }
        } else {
            same_count = 1;
        }
        last_offset = offset;
    }

    // A constant gradient still needs both endpoints.
    if stops.len() == 1 {
        let color = stops[0].color;
        stops[0] = ColorStop { offset: 0.0, color };
        stops.push(ColorStop { offset: 1.0, color });
    }

    while stops[0].offset < 0.0 && stops.len() > 1 {
        if stops[1].offset <= 0.0 {
            stops.remove(0);
        } else {
            let t = unmix(stops[0].offset.into(), stops[1].offset.into(), 0.0);
            stops[0].color = lerp_color(stops[0].color, stops[1].color, t as f32);
            stops[0].offset = 0.0;
            break;
        }
    }
    if stops[0].offset < 0.0 {
        stops[0].offset = 0.0;
    } else if stops[0].offset > 0.0 {
        let color = stops[0].color;
        stops.insert(0, ColorStop { offset: 0.0, color });
    }

    while stops[stops.len() - 1].offset > 1.0 && stops.len() > 1 {
        let last = stops.len() - 1;
        if stops[last - 1].offset >= 1.0 {
            stops.pop();
        } else {
            let t = unmix(stops[last].offset.into(), stops[last - 1].offset.into(), 1.0);
            stops[last].color = lerp_color(stops[last].color, stops[last - 1].color, t as f32);
            stops[last].offset = 1.0;
            break;
        }
    }
    let last = stops.len() - 1;
    if stops[last].offset > 1.0 {
        stops[last].offset = 1.0;
    } else if stops[last].offset < 1.0 {
        let color = stops[last].color;
        stops.push(ColorStop { offset: 1.0, color });
    }

    Ok(stops.into_iter().collect())
}
