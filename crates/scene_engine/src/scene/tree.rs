//! Renderable forest
//!
//! Nodes live in a `slotmap` arena and refer to each other by [`NodeId`].
//! Each node keeps its parent id and an ordered child list; the root list is
//! ordered the same way. Order within a list is draw order.

use slotmap::SlotMap;

use crate::foundation::math::Vec2;
use crate::render::camera::Camera;
use crate::scene::renderable::{NodeId, Renderable};

/// Errors from structural tree operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// The id does not refer to a live node
    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),

    /// The move would make a node its own ancestor
    #[error("Cannot move {node:?} under {parent:?}: it would become its own ancestor")]
    CycleDetected {
        /// Node being moved
        node: NodeId,
        /// Requested parent
        parent: NodeId,
    },
}

/// Parameters of one cull pass
#[derive(Debug, Clone, Copy)]
pub struct CullParams<'a> {
    /// Active camera, if any
    pub camera: Option<&'a Camera>,
    /// Viewport size in pixels
    pub viewport: Vec2,
    /// When false every node is on-screen
    pub culling_enabled: bool,
}

/// Forest of renderables
#[derive(Default)]
pub struct SceneTree {
    nodes: SlotMap<NodeId, Renderable>,
    roots: Vec<NodeId>,
}

impl SceneTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check whether `id` is alive
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Get a node
    pub fn get(&self, id: NodeId) -> Option<&Renderable> {
        self.nodes.get(id)
    }

    /// Get a node mutably
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Renderable> {
        self.nodes.get_mut(id)
    }

    /// Root nodes in draw order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Children of `id` in draw order
    pub fn children(&self, id: NodeId) -> Option<&[NodeId]> {
        self.nodes.get(id).map(|node| node.children.as_slice())
    }

    /// Parent of `id`
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    /// Iterate all nodes in arena order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Renderable)> {
        self.nodes.iter()
    }

    /// Insert a node at the end of `parent`'s children, or of the root list
    pub fn insert(&mut self, mut node: Renderable, parent: Option<NodeId>) -> Result<NodeId, SceneError> {
        if let Some(parent) = parent {
            if !self.nodes.contains_key(parent) {
                return Err(SceneError::UnknownNode(parent));
            }
        }

        node.parent = parent;
        node.children.clear();
        let id = self.nodes.insert(node);
        self.link(id, parent);
        Ok(id)
    }

    fn link(&mut self, id: NodeId, parent: Option<NodeId>) {
        match parent.and_then(|parent| self.nodes.get_mut(parent)) {
            Some(parent_node) => parent_node.children.push(id),
            None => self.roots.push(id),
        }
    }

    fn unlink(&mut self, id: NodeId, parent: Option<NodeId>) {
        let list = match parent.and_then(|parent| self.nodes.get_mut(parent)) {
            Some(parent_node) => &mut parent_node.children,
            None => &mut self.roots,
        };
        list.retain(|child| *child != id);
    }

    /// Remove a subtree, children first
    ///
    /// `teardown` sees every removed node in post-order, after its own
    /// children are gone and before it is unlinked from its parent. Returns
    /// false if `id` was not in the tree.
    pub fn remove_with<F>(&mut self, id: NodeId, mut teardown: F) -> bool
    where
        F: FnMut(NodeId, &mut Renderable),
    {
        if !self.nodes.contains_key(id) {
            return false;
        }

        for victim in self.post_order(id) {
            if let Some(mut node) = self.nodes.remove(victim) {
                teardown(victim, &mut node);
                self.unlink(victim, node.parent);
            }
        }
        true
    }

    /// Remove a subtree without a teardown callback
    pub fn remove(&mut self, id: NodeId) -> bool {
        self.remove_with(id, |_, _| {})
    }

    fn post_order(&self, id: NodeId) -> Vec<NodeId> {
        // Reverse of a pre-order that visits children right to left
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            if let Some(node) = self.nodes.get(current) {
                stack.extend(node.children.iter().copied());
            }
        }
        order.reverse();
        order
    }

    /// All nodes below `id`, depth-first pre-order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = self.pre_order_from(&[id]);
        if !result.is_empty() {
            result.remove(0);
        }
        result
    }

    /// Whole forest, depth-first pre-order in draw order
    pub fn pre_order(&self) -> Vec<NodeId> {
        self.pre_order_from(&self.roots)
    }

    fn pre_order_from(&self, start: &[NodeId]) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = start.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                order.push(current);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        order
    }

    /// First node named `name`, depth-first
    ///
    /// With a scope the search covers that subtree, scope root included;
    /// otherwise the whole forest.
    pub fn find_by_name(&self, name: &str, scope: Option<NodeId>) -> Option<NodeId> {
        let order = match scope {
            Some(scope) => self.pre_order_from(&[scope]),
            None => self.pre_order(),
        };
        order.into_iter().find(|id| self.nodes[*id].name == name)
    }

    /// Check whether `ancestor` is `id` or one of its ancestors
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Move a subtree under another parent, or to the root list
    pub fn reparent(&mut self, id: NodeId, new_parent: Option<NodeId>) -> Result<(), SceneError> {
        let old_parent = self.nodes.get(id).ok_or(SceneError::UnknownNode(id))?.parent;

        if let Some(parent) = new_parent {
            if !self.nodes.contains_key(parent) {
                return Err(SceneError::UnknownNode(parent));
            }
            if self.is_ancestor(id, parent) {
                return Err(SceneError::CycleDetected { node: id, parent });
            }
        }

        self.unlink(id, old_parent);
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = new_parent;
        }
        self.link(id, new_parent);
        Ok(())
    }

    /// Stable-sort the root list and every child list by z-index
    pub fn sort_by_z(&mut self) {
        let mut roots = std::mem::take(&mut self.roots);
        roots.sort_by_key(|id| self.nodes.get(*id).map_or(0, |node| node.z_index));
        self.roots = roots;

        let ids: Vec<NodeId> = self.nodes.keys().collect();
        for id in ids {
            let Some(node) = self.nodes.get_mut(id) else { continue };
            if node.children.len() < 2 {
                continue;
            }
            let mut children = std::mem::take(&mut node.children);
            children.sort_by_key(|child| self.nodes.get(*child).map_or(0, |node| node.z_index));
            if let Some(node) = self.nodes.get_mut(id) {
                node.children = children;
            }
        }
    }

    /// Compute render positions and on-screen flags; returns the on-screen count
    pub fn cull(&mut self, params: CullParams<'_>) -> usize {
        let mut on_screen_count = 0;
        for node in self.nodes.values_mut() {
            let render_position = match params.camera {
                Some(camera) if !node.snap_to_screen => {
                    node.position - camera.position + camera.focus_delta()
                }
                _ => node.position,
            };

            let on_screen = node.not_cullable
                || !params.culling_enabled
                || within_inflated_viewport(render_position, node.size, params.viewport);

            node.set_cull_result(render_position, on_screen);
            if on_screen {
                on_screen_count += 1;
            }
        }
        on_screen_count
    }
}

/// `x ∈ [−w, viewport_w + w]` and `y ∈ [−h, viewport_h + h]`
fn within_inflated_viewport(position: Vec2, size: Vec2, viewport: Vec2) -> bool {
    position.x >= -size.x
        && position.x <= viewport.x + size.x
        && position.y >= -size.y
        && position.y <= viewport.y + size.y
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tree: &SceneTree, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|id| tree.get(*id).unwrap().name.clone()).collect()
    }

    #[test]
    fn test_insert_and_query() {
        let mut tree = SceneTree::new();
        let root = tree.insert(Renderable::new("root"), None).unwrap();
        let a = tree.insert(Renderable::new("a"), Some(root)).unwrap();
        let b = tree.insert(Renderable::new("b"), Some(root)).unwrap();

        assert_eq!(tree.len(), 3);
        assert_eq!(tree.roots(), &[root]);
        assert_eq!(tree.children(root).unwrap(), &[a, b]);
        assert_eq!(tree.parent(a), Some(root));
        assert_eq!(tree.descendants(root), vec![a, b]);
    }

    #[test]
    fn test_insert_under_unknown_parent() {
        let mut tree = SceneTree::new();
        let gone = tree.insert(Renderable::new("gone"), None).unwrap();
        tree.remove(gone);
        assert_eq!(
            tree.insert(Renderable::new("x"), Some(gone)),
            Err(SceneError::UnknownNode(gone))
        );
        assert!(tree.is_empty());
    }

    #[test]
    fn test_sort_is_stable_per_list() {
        let mut tree = SceneTree::new();
        let parent = tree.insert(Renderable::new("p"), None).unwrap();
        for (name, z) in [("a", 2), ("b", 1), ("c", 2), ("d", -1), ("e", 1)] {
            tree.insert(Renderable::new(name).with_z_index(z), Some(parent)).unwrap();
        }
        tree.insert(Renderable::new("r2").with_z_index(-5), None).unwrap();

        tree.sort_by_z();
        let children = tree.children(parent).unwrap().to_vec();
        assert_eq!(names(&tree, &children), vec!["d", "b", "e", "a", "c"]);
        assert_eq!(names(&tree, &tree.roots().to_vec()), vec!["r2", "p"]);

        // Sorting again keeps the order
        tree.sort_by_z();
        assert_eq!(tree.children(parent).unwrap(), children.as_slice());
    }

    #[test]
    fn test_remove_is_post_order() {
        let mut tree = SceneTree::new();
        let root = tree.insert(Renderable::new("root"), None).unwrap();
        let a = tree.insert(Renderable::new("a"), Some(root)).unwrap();
        tree.insert(Renderable::new("a1"), Some(a)).unwrap();
        tree.insert(Renderable::new("a2"), Some(a)).unwrap();
        let keep = tree.insert(Renderable::new("keep"), Some(root)).unwrap();

        let mut torn_down = Vec::new();
        assert!(tree.remove_with(a, |_, node| torn_down.push(node.name.clone())));
        assert_eq!(torn_down, vec!["a1", "a2", "a"]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.children(root).unwrap(), &[keep]);
        assert_eq!(tree.find_by_name("a1", None), None);
        assert!(!tree.remove(a));
    }

    #[test]
    fn test_find_by_name_scope() {
        let mut tree = SceneTree::new();
        let left = tree.insert(Renderable::new("left"), None).unwrap();
        let right = tree.insert(Renderable::new("right"), None).unwrap();
        let left_item = tree.insert(Renderable::new("item"), Some(left)).unwrap();
        let right_item = tree.insert(Renderable::new("item"), Some(right)).unwrap();

        assert_eq!(tree.find_by_name("item", None), Some(left_item));
        assert_eq!(tree.find_by_name("item", Some(right)), Some(right_item));
        assert_eq!(tree.find_by_name("right", Some(right)), Some(right));
        assert_eq!(tree.find_by_name("left", Some(right)), None);
    }

    #[test]
    fn test_reparent() {
        let mut tree = SceneTree::new();
        let a = tree.insert(Renderable::new("a"), None).unwrap();
        let b = tree.insert(Renderable::new("b"), Some(a)).unwrap();
        let c = tree.insert(Renderable::new("c"), Some(b)).unwrap();

        assert_eq!(
            tree.reparent(a, Some(c)),
            Err(SceneError::CycleDetected { node: a, parent: c })
        );
        assert_eq!(tree.reparent(a, Some(a)), Err(SceneError::CycleDetected { node: a, parent: a }));

        tree.reparent(c, None).unwrap();
        assert_eq!(tree.roots(), &[a, c]);
        assert!(tree.children(b).unwrap().is_empty());

        tree.reparent(a, Some(c)).unwrap();
        assert_eq!(tree.roots(), &[c]);
        assert_eq!(tree.descendants(c), vec![a, b]);
    }

    #[test]
    fn test_cull_bounds() {
        let mut tree = SceneTree::new();
        let viewport = Vec2::new(100.0, 50.0);
        let cases = [
            (Vec2::new(-10.0, 0.0), true),
            (Vec2::new(-10.5, 0.0), false),
            (Vec2::new(110.0, 60.0), true),
            (Vec2::new(110.0, 60.5), false),
            (Vec2::new(50.0, -11.0), false),
        ];
        let ids: Vec<_> = cases
            .iter()
            .map(|(position, _)| {
                tree.insert(Renderable::new("n").with_position(position.x, position.y).with_size(10.0, 10.0), None)
                    .unwrap()
            })
            .collect();

        let on_screen = tree.cull(CullParams {
            camera: None,
            viewport,
            culling_enabled: true,
        });
        assert_eq!(on_screen, 2);
        for (id, (_, expected)) in ids.iter().zip(cases) {
            assert_eq!(tree.get(*id).unwrap().is_on_screen(), expected);
        }
    }

    #[test]
    fn test_cull_applies_camera() {
        let mut tree = SceneTree::new();
        let world = tree.insert(Renderable::new("world").with_position(500.0, 0.0).with_size(10.0, 10.0), None).unwrap();
        let hud = tree
            .insert(
                Renderable::new("hud").with_position(500.0, 0.0).with_size(10.0, 10.0).with_snap_to_screen(true),
                None,
            )
            .unwrap();
        let pinned = tree
            .insert(Renderable::new("pinned").with_position(-900.0, 0.0).with_not_cullable(true), None)
            .unwrap();

        let mut camera = Camera::new(Vec2::new(450.0, 0.0));
        camera.focus = Vec2::new(5.0, 5.0);
        tree.cull(CullParams {
            camera: Some(&camera),
            viewport: Vec2::new(100.0, 100.0),
            culling_enabled: true,
        });

        let world = tree.get(world).unwrap();
        assert_eq!(world.render_position(), Vec2::new(55.0, 5.0));
        assert!(world.is_on_screen());
        let hud = tree.get(hud).unwrap();
        assert_eq!(hud.render_position(), Vec2::new(500.0, 0.0));
        assert!(!hud.is_on_screen());
        assert!(tree.get(pinned).unwrap().is_on_screen());
    }

    #[test]
    fn test_cull_override() {
        let mut tree = SceneTree::new();
        let far = tree.insert(Renderable::new("far").with_position(1e6, 1e6), None).unwrap();
        tree.cull(CullParams {
            camera: None,
            viewport: Vec2::new(10.0, 10.0),
            culling_enabled: false,
        });
        assert!(tree.get(far).unwrap().is_on_screen());
    }
}
