// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Memoized path compilation.

use std::collections::HashMap;
use std::rc::Rc;

use crate::analysis::StrokeAnalysis;
use crate::compile::CompiledPathset;
use crate::decompose::PreprocessedPath;
use crate::path::{Path, PathId};
use crate::style::{StrokeStyle, StrokeStyleId};

/// Caches every stage of path compilation.
///
/// Flattening and stroke analysis are keyed by path, compiled pathsets by
/// path and stroke style, so restyling a path reuses its flattening and
/// redrawing reuses everything. [`PathCache::invalidate_path`] drops all
/// stages of one path, [`PathCache::invalidate_stroke_style`] the
/// compilations built on one style.
#[derive(Default)]
pub struct PathCache {
    preprocessed: HashMap<PathId, Rc<PreprocessedPath>>,
    analyses: HashMap<PathId, Rc<Vec<StrokeAnalysis>>>,
    compiled: HashMap<(PathId, Option<StrokeStyleId>), Rc<CompiledPathset>>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `path` as a fill, or as a stroke when a style is given,
    /// reusing every cached stage. Returns `None` for a path without
    /// subpaths, which draws nothing under any style.
    pub fn compile(
        &mut self,
        path: &Path,
        stroke: Option<&StrokeStyle>,
    ) -> Option<Rc<CompiledPathset>> {
        if path.subpaths().is_empty() {
            return None;
        }
        let key = (path.id(), stroke.map(StrokeStyle::id));
        if let Some(pathset) = self.compiled.get(&key) {
            return Some(pathset.clone());
        }
        let prep = self.preprocessed(path);
        let pathset = Rc::new(match stroke {
            Some(style) => {
                let analyses = self.analyses(path, &prep);
                CompiledPathset::stroke(&prep, path, style, &analyses)
            }
            None => CompiledPathset::fill(&prep, path),
        });
        log::trace!(
            "compiled {:?} with {} vertices",
            key,
            pathset.shape_path.vertices.len()
        );
        self.compiled.insert(key, pathset.clone());
        Some(pathset)
    }

    fn preprocessed(&mut self, path: &Path) -> Rc<PreprocessedPath> {
        self.preprocessed
            .entry(path.id())
            .or_insert_with(|| Rc::new(PreprocessedPath::new(path)))
            .clone()
    }

    fn analyses(&mut self, path: &Path, prep: &PreprocessedPath) -> Rc<Vec<StrokeAnalysis>> {
        self.analyses
            .entry(path.id())
            .or_insert_with(|| Rc::new(prep.subpaths.iter().map(StrokeAnalysis::new).collect()))
            .clone()
    }

    /// Drops every cached stage of one path, called when the path is
    /// discarded so its geometry can be reclaimed.
    pub fn invalidate_path(&mut self, id: PathId) {
        self.preprocessed.remove(&id);
        self.analyses.remove(&id);
        self.compiled.retain(|(path, _), _| *path != id);
    }

    /// Drops the compiled pathsets built on one stroke style. Flattening
    /// and stroke analyses are per path and stay cached.
    pub fn invalidate_stroke_style(&mut self, id: StrokeStyleId) {
        self.compiled.retain(|(_, stroke), _| *stroke != Some(id));
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::PathCache;
    use crate::path::{Path, PathBuilder, PathUsage};
    use crate::style::{Cap, Join, StrokeStyle};

    fn triangle() -> Path {
        let mut builder = PathBuilder::new();
        builder.move_to((0.0, 0.0));
        builder.line_to((100.0, 0.0));
        builder.line_to((0.0, 80.0));
        builder.close();
        builder.build(PathUsage::Static)
    }

    #[test]
    fn compilation_is_memoized_per_path_and_style() {
        let mut cache = PathCache::new();
        let path = triangle();
        let style = StrokeStyle::new(4.0, Join::Bevel, Cap::Butt, 4.0);
        let wider = StrokeStyle::new(8.0, Join::Bevel, Cap::Butt, 4.0);

        let fill = cache.compile(&path, None).unwrap();
        assert!(Rc::ptr_eq(&fill, &cache.compile(&path, None).unwrap()));

        let stroked = cache.compile(&path, Some(&style)).unwrap();
        assert!(!Rc::ptr_eq(&fill, &stroked));
        assert!(Rc::ptr_eq(
            &stroked,
            &cache.compile(&path, Some(&style)).unwrap()
        ));
        assert!(!Rc::ptr_eq(
            &stroked,
            &cache.compile(&path, Some(&wider)).unwrap()
        ));
    }

    #[test]
    fn a_path_without_subpaths_compiles_to_none() {
        let mut cache = PathCache::new();
        let path = PathBuilder::new().build(PathUsage::Static);
        assert!(cache.compile(&path, None).is_none());
    }

    #[test]
    fn invalidation_only_affects_the_named_path() {
        let mut cache = PathCache::new();
        let first = triangle();
        let second = triangle();

        let compiled_first = cache.compile(&first, None).unwrap();
        let compiled_second = cache.compile(&second, None).unwrap();
        cache.invalidate_path(first.id());

        assert!(!Rc::ptr_eq(
            &compiled_first,
            &cache.compile(&first, None).unwrap()
        ));
        assert!(Rc::ptr_eq(
            &compiled_second,
            &cache.compile(&second, None).unwrap()
        ));
    }

    #[test]
    fn stroke_invalidation_keeps_the_fill_and_the_flattening() {
        let mut cache = PathCache::new();
        let path = triangle();
        let style = StrokeStyle::new(4.0, Join::Bevel, Cap::Butt, 4.0);

        let stroked = cache.compile(&path, Some(&style)).unwrap();
        let filled = cache.compile(&path, None).unwrap();
        cache.invalidate_stroke_style(style.id());

        assert!(!Rc::ptr_eq(
            &stroked,
            &cache.compile(&path, Some(&style)).unwrap()
        ));
        assert!(Rc::ptr_eq(&filled, &cache.compile(&path, None).unwrap()));
    }
}
