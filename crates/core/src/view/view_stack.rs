//! Navigation history of the direct children of one tree node.
//!
//! A [`ViewStack`] is attached to an owner node with
//! [`ViewTree::attach_stack`] and is reached from any descendant through
//! [`ViewTree::find_stack`], which returns a [`StackId`]. All operations go
//! through the tree:
//!
//! - [`ViewTree::show_view`] pushes a view on top and suspends the previous top.
//! - [`ViewTree::latest_view`] peeks at the top.
//! - [`ViewTree::switch_back_to_last_view`] destroys the top and brings back
//!   the view beneath it, then publishes [`Event::SwitchedBack`].
//!
//! # Invariants
//!
//! - Among the tracked views exactly the top one is [`ViewState::Active`].
//! - The bottom view is never popped. It goes away with the owner only.
//! - A popped view is destroyed exactly once.
//!
//! # Untracked children
//!
//! When the stack is attached, the first child the owner already has becomes
//! its active bottom. An empty stack does the same with children attached
//! later through [`ViewTree::attach`], on the next stack operation. A tracked
//! view destroyed directly is forgotten and the view beneath it reactivated.

use super::{Event, Id, Publish, ViewError, ViewState, ViewTree};
use tracing::{debug, error, warn};

/// Name under which [`Event::SwitchedBack`] is published unless configured otherwise.
pub const SWITCHED_BACK_EVENT: &str = "view_switched_back";

/// Handle on the stack attached to a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackId(pub(crate) Id);

impl StackId {
    /// The node carrying the stack.
    pub fn owner(self) -> Id {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct ViewStack {
    owner: Id,
    /// Bottom first, top last.
    entries: Vec<Id>,
    event_name: String,
}

impl ViewStack {
    pub(crate) fn new(owner: Id, event_name: String) -> ViewStack {
        ViewStack {
            owner,
            entries: Vec::new(),
            event_name,
        }
    }

    pub fn owner(&self) -> Id {
        self.owner
    }

    pub fn entries(&self) -> &[Id] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top(&self) -> Option<Id> {
        self.entries.last().copied()
    }

    pub fn contains(&self, id: Id) -> bool {
        self.entries.contains(&id)
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// The view a caller would see on top, without recording anything.
    pub(crate) fn peek(&self, tree: &ViewTree) -> Option<Id> {
        self.entries
            .iter()
            .rev()
            .copied()
            .find(|&id| self.is_live_child(tree, id))
            .or_else(|| self.first_untracked_child(tree, None))
    }

    /// Pushes `id`, a live child of the owner, on top of the stack.
    pub(crate) fn show(&mut self, tree: &mut ViewTree, id: Id) -> Result<Id, ViewError> {
        self.observe(tree, Some(id));

        if self.contains(id) {
            return Err(ViewError::AlreadyTracked(id, self.owner));
        }

        if let Some(top) = self.top() {
            tree.apply_state(top, ViewState::Inactive)?;
        }

        self.entries.push(id);
        tree.apply_state(id, ViewState::Active)?;

        debug!(owner = self.owner, view = id, depth = self.len(), "view shown");

        Ok(id)
    }

    /// Destroys the top of the stack if it is `expected_top` and something lies beneath it.
    pub(crate) fn switch_back(
        &mut self,
        tree: &mut ViewTree,
        expected_top: Id,
        publisher: &mut dyn Publish,
    ) -> bool {
        self.observe(tree, None);

        let &[.., current, top] = self.entries.as_slice() else {
            debug!(
                owner = self.owner,
                view = expected_top,
                "refusing to switch back from the bottom view"
            );
            return false;
        };

        if top != expected_top {
            debug!(
                owner = self.owner,
                view = expected_top,
                top,
                "refusing to switch back from a view that isn't on top"
            );
            return false;
        }

        let from = tree.name(top).unwrap_or_default().to_string();

        if let Err(err) = tree.destroy(top) {
            error!(owner = self.owner, view = top, %err, "can't destroy the top view");
            return false;
        }
        self.entries.pop();

        if let Err(err) = tree.apply_state(current, ViewState::Active) {
            error!(owner = self.owner, view = current, %err, "can't reactivate view");
        }

        debug!(owner = self.owner, from = %from, to = current, "switched back");

        publisher.publish(&self.event_name, &Event::SwitchedBack { from, to: current });

        true
    }

    /// Brings the entries in line with the tree before an operation.
    ///
    /// Entries destroyed behind the stack's back are dropped, and an empty
    /// stack adopts the first live child of the owner other than `incoming`.
    /// Whatever ends up on top is made active.
    pub(crate) fn observe(&mut self, tree: &mut ViewTree, incoming: Option<Id>) {
        let previous_top = self.top();
        let before = self.entries.len();
        let owner = self.owner;
        self.entries
            .retain(|&id| tree.contains(id) && tree.parent(id) == Some(owner));

        if self.entries.len() != before {
            warn!(
                owner = self.owner,
                dropped = before - self.entries.len(),
                "dropped views destroyed outside of the stack"
            );
        }

        if self.entries.is_empty() {
            if let Some(bottom) = self.first_untracked_child(tree, incoming) {
                debug!(owner = self.owner, view = bottom, "adopted bottom view");
                self.entries.push(bottom);
            }
        }

        let top = self.top();
        if top != previous_top {
            if let Some(top) = top {
                if let Err(err) = tree.apply_state(top, ViewState::Active) {
                    error!(owner = self.owner, view = top, %err, "can't activate view");
                }
            }
        }
    }

    fn is_live_child(&self, tree: &ViewTree, id: Id) -> bool {
        tree.contains(id) && tree.parent(id) == Some(self.owner)
    }

    fn first_untracked_child(&self, tree: &ViewTree, excluded: Option<Id>) -> Option<Id> {
        tree.children(self.owner)
            .iter()
            .copied()
            .find(|&id| Some(id) != excluded && !self.contains(id))
    }
}
