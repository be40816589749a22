//! Deferred scene mutations requested from hooks

use std::sync::Arc;

use crate::animation::animation::Animation;
use crate::scene::renderable::{NodeId, Renderable};

/// A queued scene mutation
#[derive(Debug)]
pub enum SceneCommand {
    /// Insert a node
    Add {
        /// Node to insert
        node: Renderable,
        /// Parent, or `None` for a root
        parent: Option<NodeId>,
    },
    /// Remove a node and its subtree
    Remove(NodeId),
    /// Bind an animation to a node
    BindAnimation(NodeId, Arc<Animation>),
    /// Start the node's animation
    StartAnimation(NodeId),
    /// Stop the node's animation
    StopAnimation(NodeId),
    /// Show or hide a node
    SetVisible(NodeId, bool),
}

/// FIFO of scene mutations
#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: Vec<SceneCommand>,
}

impl CommandQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command
    pub fn push(&mut self, command: SceneCommand) {
        self.commands.push(command);
    }

    /// Queue an insertion
    pub fn add(&mut self, node: Renderable, parent: Option<NodeId>) {
        self.push(SceneCommand::Add { node, parent });
    }

    /// Queue a removal
    pub fn remove(&mut self, id: NodeId) {
        self.push(SceneCommand::Remove(id));
    }

    /// Queue an animation binding
    pub fn bind_animation(&mut self, id: NodeId, animation: Arc<Animation>) {
        self.push(SceneCommand::BindAnimation(id, animation));
    }

    /// Queue an animation start
    pub fn start_animation(&mut self, id: NodeId) {
        self.push(SceneCommand::StartAnimation(id));
    }

    /// Queue an animation stop
    pub fn stop_animation(&mut self, id: NodeId) {
        self.push(SceneCommand::StopAnimation(id));
    }

    /// Queue a visibility change
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        self.push(SceneCommand::SetVisible(id, visible));
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Take all commands in request order
    pub fn take(&mut self) -> Vec<SceneCommand> {
        std::mem::take(&mut self.commands)
    }
}
