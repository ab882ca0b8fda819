// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stroke styles.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// Appearance of the corner where two stroked segments meet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Join {
    /// A direct triangle between the outer offset points.
    Bevel,
    /// Extension to the tangent intersection, falling back to [`Join::Bevel`]
    /// past the miter limit.
    Miter,
    /// A circular wedge.
    Round,
}

/// Appearance of the ends of an open stroked subpath.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cap {
    /// The stroke stops at the endpoint.
    Butt,
    /// A half disk beyond the endpoint.
    Round,
    /// A half square beyond the endpoint.
    Square,
}

/// Identity handle for a [`StrokeStyle`], used as a cache key.
///
/// Ids are process-unique and never reused; clones of a style share its id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StrokeStyleId(pub NonZeroU64);

impl StrokeStyleId {
    fn next() -> Self {
        // We initialize with 1 so that the conversion below succeeds
        static ID_COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(NonZeroU64::new(ID_COUNTER.fetch_add(1, Ordering::Relaxed)).unwrap())
    }
}

/// Immutable description of how a path outline is stroked.
///
/// Compiled stroke tessellations are cached per `(path, style)` identity,
/// which is why the fields are frozen at construction.
#[derive(Clone, Debug)]
pub struct StrokeStyle {
    id: StrokeStyleId,
    width: f64,
    join: Join,
    cap: Cap,
    miter_limit: f64,
}

impl StrokeStyle {
    /// Creates a style.
    ///
    /// `miter_limit` is the largest allowed ratio of miter length to stroke
    /// width; joins sharper than that render as bevels.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `miter_limit` is not finite and positive.
    pub fn new(width: f64, join: Join, cap: Cap, miter_limit: f64) -> Self {
        assert!(width.is_finite() && width > 0.0, "invalid stroke width");
        assert!(
            miter_limit.is_finite() && miter_limit > 0.0,
            "invalid miter limit"
        );
        Self {
            id: StrokeStyleId::next(),
            width,
            join,
            cap,
            miter_limit,
        }
    }

    pub fn id(&self) -> StrokeStyleId {
        self.id
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn join(&self) -> Join {
        self.join
    }

    pub fn cap(&self) -> Cap {
        self.cap
    }

    pub fn miter_limit(&self) -> f64 {
        self.miter_limit
    }

    /// Cosine threshold of the miter test: a join with tangent dot product
    /// above `2 / miter_limit^2 - 1` stays mitered.
    pub fn miter_cos_limit(&self) -> f64 {
        2.0 / (self.miter_limit * self.miter_limit) - 1.0
    }
}
