// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame scene graph storage.

use peniko::Fill;
use peniko::kurbo::{Affine, Rect};
use smallvec::SmallVec;

use crate::paint::Paint;
use crate::residency::ResidentPath;

/// Index of a node in a [`SceneArena`], valid until the next reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeId(u32);

/// A shape scheduled for stencil-and-cover rendering.
///
/// Fills stencil their exact outline and cover it with the convex draw
/// hull. Strokes stencil the stroke hull and cover it with the stroke
/// body, then wipe the hull again because stroke geometry overdraws
/// itself.
#[derive(Clone, Debug)]
pub struct Shape {
    pub stencil_path: ResidentPath,
    pub draw_path: ResidentPath,
    pub unstencil_path: Option<ResidentPath>,
    pub fill_rule: Fill,
    /// `None` for clip mask shapes, which never run a cover pass.
    pub paint: Option<Paint>,
    pub matrix: Affine,
    /// Device-space bounds, already intersected with the enclosing scope.
    pub bounds: Rect,
    /// Clip depth the shape tests against. Assigned by the scheduler.
    pub rendering_layer: u32,
}

/// A clip scope: the mask shapes and the content they reveal.
#[derive(Clone, Debug)]
pub struct ClippingNode {
    pub masks: SmallVec<[NodeId; 2]>,
    pub children: Vec<NodeId>,
    pub bounds: Rect,
}

/// A run of neighboring shapes the scheduler carries as one unit.
#[derive(Clone, Debug)]
pub struct ShapeGroup {
    pub children: Vec<NodeId>,
    pub bounds: Rect,
}

#[derive(Clone, Debug)]
pub enum SceneNode {
    Shape(Shape),
    Clip(ClippingNode),
    Group(ShapeGroup),
}

/// Flat storage for one frame's scene tree.
///
/// Nodes refer to each other by [`NodeId`] and live until [`reset`]
/// reclaims the whole frame at once.
///
/// [`reset`]: Self::reset
#[derive(Clone, Debug, Default)]
pub struct SceneArena {
    nodes: Vec<SceneNode>,
}

impl SceneArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every node. Ids handed out before the reset must not be
    /// used again.
    pub fn reset(&mut self) {
        self.nodes.clear();
    }

    pub fn push_shape(&mut self, shape: Shape) -> NodeId {
        self.push(SceneNode::Shape(shape))
    }

    pub fn push_clip(&mut self, masks: SmallVec<[NodeId; 2]>) -> NodeId {
        self.push(SceneNode::Clip(ClippingNode {
            masks,
            children: Vec::new(),
            bounds: Rect::ZERO,
        }))
    }

    /// Groups neighboring shapes under one node with their united bounds.
    pub fn push_group(&mut self, children: Vec<NodeId>) -> NodeId {
        let bounds = self.union_bounds(&children);
        self.push(SceneNode::Group(ShapeGroup { children, bounds }))
    }

    fn push(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0 as usize]
    }

    pub fn shape(&self, id: NodeId) -> &Shape {
        match self.node(id) {
            SceneNode::Shape(shape) => shape,
            _ => panic!("node is not a shape"),
        }
    }

    pub fn shape_mut(&mut self, id: NodeId) -> &mut Shape {
        match &mut self.nodes[id.0 as usize] {
            SceneNode::Shape(shape) => shape,
            _ => panic!("node is not a shape"),
        }
    }

    pub fn clip(&self, id: NodeId) -> &ClippingNode {
        match self.node(id) {
            SceneNode::Clip(clip) => clip,
            _ => panic!("node is not a clip"),
        }
    }

    pub fn clip_mut(&mut self, id: NodeId) -> &mut ClippingNode {
        match &mut self.nodes[id.0 as usize] {
            SceneNode::Clip(clip) => clip,
            _ => panic!("node is not a clip"),
        }
    }

    pub fn group(&self, id: NodeId) -> &ShapeGroup {
        match self.node(id) {
            SceneNode::Group(group) => group,
            _ => panic!("node is not a group"),
        }
    }

    fn group_mut(&mut self, id: NodeId) -> &mut ShapeGroup {
        match &mut self.nodes[id.0 as usize] {
            SceneNode::Group(group) => group,
            _ => panic!("node is not a group"),
        }
    }

    /// Device-space bounds of any node kind.
    pub fn bounds(&self, id: NodeId) -> Rect {
        match self.node(id) {
            SceneNode::Shape(shape) => shape.bounds,
            SceneNode::Clip(clip) => clip.bounds,
            SceneNode::Group(group) => group.bounds,
        }
    }

    fn union_bounds(&self, ids: &[NodeId]) -> Rect {
        ids.iter()
            .map(|id| self.bounds(*id))
            .reduce(|a, b| a.union(b))
            .unwrap_or(Rect::ZERO)
    }

    /// Resolves bounds bottom-up: clips and groups take the union of
    /// their children, and each mask shape is cut down to the content it
    /// reveals.
    pub fn prepare(&mut self, id: NodeId) -> Rect {
        match &self.nodes[id.0 as usize] {
            SceneNode::Shape(shape) => shape.bounds,
            SceneNode::Group(group) => {
                let children = group.children.clone();
                let bounds = self.union_bounds(&children);
                self.group_mut(id).bounds = bounds;
                bounds
            }
            SceneNode::Clip(clip) => {
                let masks = clip.masks.clone();
                let children = clip.children.clone();
                let mut union: Option<Rect> = None;
                for child in children {
                    let child_bounds = self.prepare(child);
                    union = Some(union.map_or(child_bounds, |u| u.union(child_bounds)));
                }
                let bounds = union.unwrap_or(Rect::ZERO);
                self.clip_mut(id).bounds = bounds;
                for mask in masks {
                    let mask_shape = self.shape_mut(mask);
                    mask_shape.bounds = mask_shape.bounds.intersect(bounds);
                }
                bounds
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use peniko::Fill;
    use peniko::kurbo::{Affine, Rect};
    use smallvec::smallvec;

    use super::{SceneArena, Shape};
    use crate::residency::ResidentPath;

    fn shape(bounds: Rect) -> Shape {
        let path = ResidentPath {
            address: 0,
            num_vertices: 0,
            bounding_box: Rect::ZERO,
        };
        Shape {
            stencil_path: path,
            draw_path: path,
            unstencil_path: None,
            fill_rule: Fill::NonZero,
            paint: None,
            matrix: Affine::IDENTITY,
            bounds,
            rendering_layer: 0,
        }
    }

    #[test]
    fn prepare_unions_children_and_cuts_masks_down() {
        let mut arena = SceneArena::new();
        let a = arena.push_shape(shape(Rect::new(10.0, 10.0, 50.0, 50.0)));
        let b = arena.push_shape(shape(Rect::new(40.0, 40.0, 100.0, 100.0)));
        let mask = arena.push_shape(shape(Rect::new(0.0, 0.0, 200.0, 200.0)));
        let clip = arena.push_clip(smallvec![mask]);
        arena.clip_mut(clip).children.extend([a, b]);

        let bounds = arena.prepare(clip);
        assert_eq!(bounds, Rect::new(10.0, 10.0, 100.0, 100.0));
        assert_eq!(arena.clip(clip).bounds, bounds);
        assert_eq!(arena.shape(mask).bounds, bounds);
    }

    #[test]
    fn groups_take_the_union_of_their_shapes() {
        let mut arena = SceneArena::new();
        let a = arena.push_shape(shape(Rect::new(0.0, 0.0, 20.0, 20.0)));
        let b = arena.push_shape(shape(Rect::new(30.0, 10.0, 60.0, 40.0)));
        let group = arena.push_group(vec![a, b]);
        assert_eq!(arena.group(group).bounds, Rect::new(0.0, 0.0, 60.0, 40.0));
    }

    #[test]
    fn reset_recycles_node_ids() {
        let mut arena = SceneArena::new();
        let first = arena.push_shape(shape(Rect::ZERO));
        arena.reset();
        let second = arena.push_shape(shape(Rect::ZERO));
        assert_eq!(first, second);
    }
}
