//! Arena-backed view tree.
//!
//! Nodes are stored by [`Id`] and point to their parent with a plain id, so a
//! child never owns its parent. Destroyed nodes leave the arena. Ids are
//! handed out by the tree itself and never reused, so an id the tree issued
//! that no longer has a node is destroyed, and [`ViewTree::is_destroyed`]
//! keeps answering for it without any per-node record.

use super::view_stack::{StackId, ViewStack, SWITCHED_BACK_EVENT};
use super::{Id, IdFeeder, Publish, View, ViewError, ViewState};
use crate::settings::NavigationSettings;
use fxhash::FxHashMap;
use std::fmt;
use std::iter;
use tracing::{debug, trace};

struct Node {
    parent: Option<Id>,
    children: Vec<Id>,
    state: ViewState,
    view: Box<dyn View>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.view.name())
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("state", &self.state)
            .finish()
    }
}

/// A tree of views, some of which carry a navigation stack.
#[derive(Debug)]
pub struct ViewTree {
    root: Id,
    ids: IdFeeder,
    nodes: FxHashMap<Id, Node>,
    stacks: FxHashMap<Id, ViewStack>,
    switched_back_event: String,
}

/// Iterator over the ancestors of a node, nearest first.
pub struct Ancestors<'a> {
    tree: &'a ViewTree,
    next: Option<Id>,
}

impl Iterator for Ancestors<'_> {
    type Item = Id;

    fn next(&mut self) -> Option<Id> {
        let id = self.next?;
        self.next = self.tree.parent(id);
        Some(id)
    }
}

impl ViewTree {
    /// Creates a tree whose root hosts `view`. The root is active.
    pub fn new(view: Box<dyn View>) -> ViewTree {
        let ids = IdFeeder::new(1);
        let root = ids.next();
        let mut nodes = FxHashMap::default();
        nodes.insert(
            root,
            Node {
                parent: None,
                children: Vec::new(),
                state: ViewState::Active,
                view,
            },
        );

        ViewTree {
            root,
            ids,
            nodes,
            stacks: FxHashMap::default(),
            switched_back_event: SWITCHED_BACK_EVENT.to_string(),
        }
    }

    /// Applies the navigation settings to the stacks attached from now on.
    pub fn with_settings(mut self, settings: &NavigationSettings) -> ViewTree {
        self.switched_back_event = settings.switched_back_event.clone();
        self
    }

    pub fn root(&self) -> Id {
        self.root
    }

    /// Returns `true` if `id` is attached to the tree and not destroyed.
    pub fn contains(&self, id: Id) -> bool {
        self.nodes
            .get(&id)
            .is_some_and(|node| !node.state.is_destroyed())
    }

    pub fn state(&self, id: Id) -> Option<ViewState> {
        match self.nodes.get(&id) {
            Some(node) => Some(node.state),
            None => self.ids.has_issued(id).then_some(ViewState::Destroyed),
        }
    }

    pub fn is_active(&self, id: Id) -> bool {
        self.state(id).is_some_and(ViewState::is_active)
    }

    pub fn is_destroyed(&self, id: Id) -> bool {
        self.state(id).is_some_and(ViewState::is_destroyed)
    }

    pub fn parent(&self, id: Id) -> Option<Id> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    /// Live children of `id`, in attachment order.
    pub fn children(&self, id: Id) -> &[Id] {
        self.nodes
            .get(&id)
            .map_or(&[][..], |node| node.children.as_slice())
    }

    pub fn ancestors(&self, id: Id) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    pub fn view(&self, id: Id) -> Option<&(dyn View + 'static)> {
        self.nodes.get(&id).map(|node| &*node.view)
    }

    pub fn view_mut(&mut self, id: Id) -> Option<&mut (dyn View + 'static)> {
        self.nodes.get_mut(&id).map(|node| &mut *node.view)
    }

    /// Display name of the view hosted by `id`.
    pub fn name(&self, id: Id) -> Option<&str> {
        self.view(id).map(|view| view.name())
    }

    /// Attaches `view` as the last child of `parent` and returns the new node.
    ///
    /// The node starts active when `parent` carries a stack, inactive otherwise.
    pub fn attach(&mut self, parent: Id, view: Box<dyn View>) -> Result<Id, ViewError> {
        self.check_live(parent)?;

        let state = if self.stacks.contains_key(&parent) {
            ViewState::Active
        } else {
            ViewState::Inactive
        };

        let id = self.ids.next();
        trace!(parent, view = id, name = view.name(), ?state, "attaching view");
        self.nodes.insert(
            id,
            Node {
                parent: Some(parent),
                children: Vec::new(),
                state,
                view,
            },
        );
        self.link(parent, id);

        Ok(id)
    }

    /// Makes `id` active or inactive.
    pub fn set_active(&mut self, id: Id, active: bool) -> Result<(), ViewError> {
        let next = if active {
            ViewState::Active
        } else {
            ViewState::Inactive
        };
        self.apply_state(id, next)
    }

    /// Destroys `id` and its whole subtree, children first, and detaches it
    /// from its parent. Stacks carried by destroyed nodes go away with them.
    ///
    /// When `id` was tracked by its parent's stack, the stack forgets it and
    /// the view beneath becomes active, as if it had been popped silently.
    ///
    /// Destroying a node twice is a programming error: it fails a debug
    /// assertion and returns [`ViewError::DoubleDestroy`] in release builds.
    pub fn destroy(&mut self, id: Id) -> Result<(), ViewError> {
        let state = self.state(id).ok_or(ViewError::UnknownView(id))?;
        debug_assert!(!state.is_destroyed(), "view {id} destroyed twice");
        if state.is_destroyed() {
            return Err(ViewError::DoubleDestroy(id));
        }
        if id == self.root {
            return Err(ViewError::TreeRoot(id));
        }

        let parent = self.parent(id);
        if let Some(parent) = parent {
            self.unlink(parent, id);
        }

        for victim in self.post_order(id) {
            self.apply_state(victim, ViewState::Destroyed)?;
            self.nodes.remove(&victim);
            if self.stacks.remove(&victim).is_some() {
                debug!(owner = victim, "dropped stack with its owner");
            }
        }

        debug!(view = id, "destroyed view");

        let tracker = parent.filter(|owner| {
            self.stacks
                .get(owner)
                .is_some_and(|view_stack| view_stack.contains(id))
        });
        if let Some(parent) = tracker {
            self.with_stack(StackId(parent), |view_stack, tree| {
                view_stack.observe(tree, None)
            });
        }

        Ok(())
    }

    /// Attaches a navigation stack to `owner`.
    ///
    /// A child `owner` already has becomes the active bottom of the stack.
    pub fn attach_stack(&mut self, owner: Id) -> Result<StackId, ViewError> {
        self.check_live(owner)?;
        if self.stacks.contains_key(&owner) {
            return Err(ViewError::StackAlreadyAttached(owner));
        }

        self.stacks.insert(
            owner,
            ViewStack::new(owner, self.switched_back_event.clone()),
        );
        debug!(owner, "attached stack");

        let stack = StackId(owner);
        self.with_stack(stack, |view_stack, tree| view_stack.observe(tree, None));

        Ok(stack)
    }

    /// Finds the stack governing `id`: the one carried by `id` itself or by
    /// its nearest ancestor.
    pub fn find_stack(&self, id: Id) -> Option<StackId> {
        if !self.contains(id) {
            return None;
        }

        iter::once(id)
            .chain(self.ancestors(id))
            .find(|owner| self.stacks.contains_key(owner))
            .map(StackId)
    }

    pub fn stack(&self, stack: StackId) -> Option<&ViewStack> {
        self.stacks.get(&stack.owner())
    }

    /// Number of views tracked by `stack`.
    pub fn stack_depth(&self, stack: StackId) -> usize {
        self.stack(stack).map_or(0, ViewStack::len)
    }

    /// Views tracked by `stack`, bottom first.
    pub fn tracked_views(&self, stack: StackId) -> &[Id] {
        self.stack(stack).map_or(&[][..], ViewStack::entries)
    }

    /// Attaches `view` under the owner of `stack` and puts it on top.
    ///
    /// The previous top becomes inactive but stays alive.
    #[tracing::instrument(level = "debug", skip(self, view), fields(owner = stack.owner(), name = view.name()))]
    pub fn show_view(&mut self, stack: StackId, view: Box<dyn View>) -> Result<Id, ViewError> {
        if !self.stacks.contains_key(&stack.owner()) {
            return Err(ViewError::UnknownStack(stack.owner()));
        }

        let id = self.attach(stack.owner(), view)?;
        self.with_stack(stack, |view_stack, tree| view_stack.show(tree, id))
            .unwrap_or(Err(ViewError::UnknownStack(stack.owner())))
    }

    /// Moves the live node `id` under the owner of `stack` and puts it on top.
    #[tracing::instrument(level = "debug", skip(self), fields(owner = stack.owner()))]
    pub fn show_existing_view(&mut self, stack: StackId, id: Id) -> Result<Id, ViewError> {
        let owner = stack.owner();
        if !self.stacks.contains_key(&owner) {
            return Err(ViewError::UnknownStack(owner));
        }
        self.check_live(id)?;

        if id == owner || self.ancestors(owner).any(|ancestor| ancestor == id) {
            return Err(ViewError::WouldCycle(id, owner));
        }

        if let Some(tracker) = self.stacks.values().find(|s| s.contains(id)) {
            return Err(ViewError::AlreadyTracked(id, tracker.owner()));
        }

        if self.parent(id) != Some(owner) {
            if let Some(parent) = self.parent(id) {
                self.unlink(parent, id);
            }
            if let Some(node) = self.nodes.get_mut(&id) {
                node.parent = Some(owner);
            }
            self.link(owner, id);
        }

        self.with_stack(stack, |view_stack, tree| view_stack.show(tree, id))
            .unwrap_or(Err(ViewError::UnknownStack(owner)))
    }

    /// The view currently on top of `stack`, if any.
    pub fn latest_view(&self, stack: StackId) -> Option<Id> {
        self.stack(stack)?.peek(self)
    }

    /// Pops `expected_top` off `stack`.
    ///
    /// Succeeds only if `expected_top` is the top and is not the bottom view.
    /// On success the popped view is destroyed, the view beneath it becomes
    /// active, and [`Event::SwitchedBack`](super::Event::SwitchedBack) is
    /// published through `publisher` once the tree reflects the change.
    #[tracing::instrument(level = "debug", skip(self, publisher), fields(owner = stack.owner()))]
    pub fn switch_back_to_last_view(
        &mut self,
        stack: StackId,
        expected_top: Id,
        publisher: &mut dyn Publish,
    ) -> bool {
        self.with_stack(stack, |view_stack, tree| {
            view_stack.switch_back(tree, expected_top, publisher)
        })
        .unwrap_or(false)
    }

    /// Moves `id` to `next` if the lifecycle allows it and notifies its view.
    pub(crate) fn apply_state(&mut self, id: Id, next: ViewState) -> Result<(), ViewError> {
        let current = self.state(id).ok_or(ViewError::UnknownView(id))?;

        let Some(next) = current.transition(next) else {
            return Err(if next.is_destroyed() {
                ViewError::DoubleDestroy(id)
            } else {
                ViewError::Destroyed(id)
            });
        };

        if current == next {
            return Ok(());
        }

        let Some(node) = self.nodes.get_mut(&id) else {
            return Err(ViewError::Destroyed(id));
        };
        trace!(view = id, from = ?current, to = ?next, "state change");
        node.state = next;
        node.view.state_changed(next);

        Ok(())
    }

    /// Runs `f` with the stack temporarily taken out of the tree.
    fn with_stack<R>(
        &mut self,
        stack: StackId,
        f: impl FnOnce(&mut ViewStack, &mut ViewTree) -> R,
    ) -> Option<R> {
        let owner = stack.owner();
        let mut view_stack = self.stacks.remove(&owner)?;
        let result = f(&mut view_stack, self);
        if self.contains(owner) {
            self.stacks.insert(owner, view_stack);
        }
        Some(result)
    }

    fn check_live(&self, id: Id) -> Result<(), ViewError> {
        match self.state(id) {
            None => Err(ViewError::UnknownView(id)),
            Some(ViewState::Destroyed) => Err(ViewError::Destroyed(id)),
            Some(_) => Ok(()),
        }
    }

    fn link(&mut self, parent: Id, child: Id) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
    }

    fn unlink(&mut self, parent: Id, child: Id) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|&id| id != child);
        }
    }

    /// The subtree rooted at `id`, every node after its descendants.
    fn post_order(&self, id: Id) -> Vec<Id> {
        let mut order = Vec::new();
        let mut pending = vec![(id, false)];

        while let Some((id, expanded)) = pending.pop() {
            if expanded {
                order.push(id);
                continue;
            }

            pending.push((id, true));
            pending.extend(self.children(id).iter().rev().map(|&child| (child, false)));
        }

        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::label::Label;
    use crate::view::{Bus, Event, EventChannel};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every lifecycle change it goes through.
    struct Probe {
        name: String,
        log: Rc<RefCell<Vec<(String, ViewState)>>>,
    }

    impl View for Probe {
        fn name(&self) -> &str {
            &self.name
        }

        fn state_changed(&mut self, state: ViewState) {
            self.log.borrow_mut().push((self.name.clone(), state));
        }
    }

    fn label(text: &str) -> Box<dyn View> {
        Box::new(Label::new(text))
    }

    /// Tree with an owner carrying a stack and one directly attached child.
    fn stacked_tree() -> (ViewTree, StackId, Id) {
        let mut tree = ViewTree::new(label("Shell"));
        let owner = tree.attach(tree.root(), label("Home")).unwrap();
        let stack = tree.attach_stack(owner).unwrap();
        let bottom = tree.attach(owner, label("Root")).unwrap();
        (tree, stack, bottom)
    }

    fn active_tracked(tree: &ViewTree, stack: StackId) -> Vec<Id> {
        tree.tracked_views(stack)
            .iter()
            .copied()
            .filter(|&id| tree.is_active(id))
            .collect()
    }

    #[test]
    fn test_attach_state_depends_on_parent_stack() {
        let (mut tree, stack, bottom) = stacked_tree();
        assert!(tree.is_active(bottom));

        let nested = tree.attach(bottom, label("Nested")).unwrap();
        assert_eq!(tree.state(nested), Some(ViewState::Inactive));
        assert_eq!(tree.parent(nested), Some(bottom));
        assert_eq!(tree.children(stack.owner()), &[bottom]);
    }

    #[test]
    fn test_attach_under_destroyed_parent_fails() {
        let (mut tree, _, bottom) = stacked_tree();
        let child = tree.attach(bottom, label("Child")).unwrap();
        tree.destroy(child).unwrap();

        assert_eq!(
            tree.attach(child, label("Orphan")).err(),
            Some(ViewError::Destroyed(child))
        );
        assert_eq!(
            tree.attach(9_999_999, label("Orphan")).err(),
            Some(ViewError::UnknownView(9_999_999))
        );
    }

    #[test]
    fn test_find_stack_walks_ancestors() {
        let (mut tree, stack, bottom) = stacked_tree();
        let deep = tree.attach(bottom, label("Deep")).unwrap();
        let deeper = tree.attach(deep, label("Deeper")).unwrap();

        assert_eq!(tree.find_stack(deeper), Some(stack));
        assert_eq!(tree.find_stack(bottom), Some(stack));
        assert_eq!(tree.find_stack(stack.owner()), Some(stack));
        assert_eq!(tree.find_stack(tree.root()), None);
    }

    #[test]
    fn test_find_stack_picks_nearest_owner() {
        let (mut tree, outer, bottom) = stacked_tree();
        let inner = tree.attach_stack(bottom).unwrap();
        let leaf = tree.attach(bottom, label("Leaf")).unwrap();

        assert_eq!(tree.find_stack(leaf), Some(inner));
        assert_eq!(tree.find_stack(bottom), Some(inner));
        assert_eq!(tree.find_stack(outer.owner()), Some(outer));
    }

    #[test]
    fn test_find_stack_in_disjoint_subtrees() {
        let mut tree = ViewTree::new(label("Shell"));
        let left = tree.attach(tree.root(), label("Left")).unwrap();
        let right = tree.attach(tree.root(), label("Right")).unwrap();
        let left_stack = tree.attach_stack(left).unwrap();
        let right_stack = tree.attach_stack(right).unwrap();
        let left_child = tree.attach(left, label("L1")).unwrap();
        let right_child = tree.attach(right, label("R1")).unwrap();

        assert_eq!(tree.find_stack(left_child), Some(left_stack));
        assert_eq!(tree.find_stack(right_child), Some(right_stack));

        tree.destroy(left).unwrap();
        assert_eq!(tree.find_stack(left_child), None);
        assert_eq!(tree.find_stack(right_child), Some(right_stack));
    }

    #[test]
    fn test_attach_stack_twice_fails() {
        let (mut tree, stack, _) = stacked_tree();
        assert_eq!(
            tree.attach_stack(stack.owner()).err(),
            Some(ViewError::StackAlreadyAttached(stack.owner()))
        );
    }

    #[test]
    fn test_latest_view_without_operations_is_first_child() {
        let (tree, stack, bottom) = stacked_tree();
        assert_eq!(tree.latest_view(stack), Some(bottom));
        assert_eq!(tree.stack_depth(stack), 0);
    }

    #[test]
    fn test_latest_view_of_empty_stack() {
        let mut tree = ViewTree::new(label("Shell"));
        let stack = tree.attach_stack(tree.root()).unwrap();
        assert_eq!(tree.latest_view(stack), None);
    }

    #[test]
    fn test_show_view_keeps_a_single_active_view() {
        let (mut tree, stack, bottom) = stacked_tree();
        let mut shown = vec![bottom];

        for name in ["V2", "V3", "V4", "V5"] {
            let id = tree.show_view(stack, label(name)).unwrap();
            shown.push(id);

            assert_eq!(tree.latest_view(stack), Some(id));
            assert_eq!(active_tracked(&tree, stack), vec![id]);
            assert_eq!(tree.tracked_views(stack), shown.as_slice());
        }

        assert!(shown.iter().all(|&id| !tree.is_destroyed(id)));
    }

    #[test]
    fn test_show_view_on_empty_owner_becomes_bottom() {
        let mut tree = ViewTree::new(label("Shell"));
        let stack = tree.attach_stack(tree.root()).unwrap();

        let first = tree.show_view(stack, label("First")).unwrap();

        assert_eq!(tree.tracked_views(stack), &[first]);
        assert!(tree.is_active(first));

        let mut bus = Bus::new();
        assert!(!tree.switch_back_to_last_view(stack, first, &mut bus));
        assert!(tree.is_active(first));
        assert!(bus.is_empty());
    }

    #[test]
    fn test_show_view_with_unknown_stack() {
        let mut tree = ViewTree::new(label("Shell"));
        let root = tree.root();
        assert_eq!(
            tree.show_view(StackId(root), label("Lost")).err(),
            Some(ViewError::UnknownStack(root))
        );
        assert!(tree.children(root).is_empty());
    }

    #[test]
    fn test_attach_stack_adopts_existing_child_as_active_bottom() {
        let mut tree = ViewTree::new(label("Shell"));
        let owner = tree.attach(tree.root(), label("Home")).unwrap();
        let early = tree.attach(owner, label("Early")).unwrap();
        let late = tree.attach(owner, label("Late")).unwrap();
        assert!(!tree.is_active(early));

        let stack = tree.attach_stack(owner).unwrap();

        assert_eq!(tree.latest_view(stack), Some(early));
        assert!(tree.is_active(early));
        assert!(!tree.is_active(late));
        assert_eq!(tree.tracked_views(stack), &[early]);

        let mut bus = Bus::new();
        assert!(!tree.switch_back_to_last_view(stack, early, &mut bus));
        assert_eq!(active_tracked(&tree, stack), vec![early]);
    }

    #[test]
    fn test_switch_back_pops_and_publishes() {
        let (mut tree, stack, bottom) = stacked_tree();
        let v2 = tree.show_view(stack, label("V2")).unwrap();
        let mut bus = Bus::new();

        assert!(tree.switch_back_to_last_view(stack, v2, &mut bus));

        assert!(tree.is_destroyed(v2));
        assert!(tree.is_active(bottom));
        assert_eq!(tree.tracked_views(stack), &[bottom]);
        assert_eq!(tree.children(stack.owner()), &[bottom]);
        assert_eq!(
            bus.into_iter().collect::<Vec<_>>(),
            vec![Event::SwitchedBack {
                from: "V2".to_string(),
                to: bottom
            }]
        );
    }

    #[test]
    fn test_switch_back_from_non_top_mutates_nothing() {
        let (mut tree, stack, bottom) = stacked_tree();
        let v2 = tree.show_view(stack, label("V2")).unwrap();
        let v3 = tree.show_view(stack, label("V3")).unwrap();
        let mut bus = Bus::new();

        assert!(!tree.switch_back_to_last_view(stack, v2, &mut bus));
        assert!(!tree.switch_back_to_last_view(stack, bottom, &mut bus));

        assert_eq!(tree.tracked_views(stack), &[bottom, v2, v3]);
        assert_eq!(active_tracked(&tree, stack), vec![v3]);
        assert!(!tree.is_destroyed(v2));
        assert!(bus.is_empty());
    }

    #[test]
    fn test_switch_back_on_bottom_fails_whatever_the_id() {
        let (mut tree, stack, bottom) = stacked_tree();
        let stranger = tree.attach(tree.root(), label("Stranger")).unwrap();
        let mut bus = Bus::new();

        for id in [bottom, stranger, stack.owner(), 9_999_999] {
            assert!(!tree.switch_back_to_last_view(stack, id, &mut bus));
            assert!(tree.is_active(bottom));
            assert!(!tree.is_destroyed(bottom));
        }
        assert!(bus.is_empty());
    }

    #[test]
    fn test_switch_back_with_unknown_stack() {
        let (mut tree, _, bottom) = stacked_tree();
        let mut bus = Bus::new();
        assert!(!tree.switch_back_to_last_view(StackId(bottom), bottom, &mut bus));
    }

    #[test]
    fn test_event_is_published_after_state_change() {
        let (mut tree, stack, bottom) = stacked_tree();
        let log = Rc::new(RefCell::new(Vec::new()));
        let probe = |name: &str| -> Box<dyn View> {
            Box::new(Probe {
                name: name.to_string(),
                log: Rc::clone(&log),
            })
        };
        let v2 = tree.show_view(stack, probe("V2")).unwrap();
        let v3 = tree.show_view(stack, probe("V3")).unwrap();

        let events = Rc::clone(&log);
        let mut channel = EventChannel::new();
        channel.subscribe(1, SWITCHED_BACK_EVENT, move |evt: &Event| {
            let Event::SwitchedBack { from, .. } = evt;
            events
                .borrow_mut()
                .push((format!("published from {from}"), ViewState::Active));
        });

        assert!(tree.switch_back_to_last_view(stack, v3, &mut channel));
        assert!(tree.is_active(v2));
        assert!(!tree.is_active(bottom));

        assert_eq!(
            log.borrow().as_slice(),
            &[
                ("V2".to_string(), ViewState::Inactive),
                ("V3".to_string(), ViewState::Destroyed),
                ("V2".to_string(), ViewState::Active),
                ("published from V3".to_string(), ViewState::Active),
            ]
        );
    }

    #[test]
    fn test_configured_event_name() {
        let settings = NavigationSettings {
            switched_back_event: "back".to_string(),
        };
        let mut tree = ViewTree::new(label("Shell")).with_settings(&settings);
        let stack = tree.attach_stack(tree.root()).unwrap();
        let bottom = tree.show_view(stack, label("Bottom")).unwrap();
        let top = tree.show_view(stack, label("Top")).unwrap();

        let seen = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&seen);
        let mut channel = EventChannel::new();
        channel.subscribe(1, "back", move |_: &Event| *counter.borrow_mut() += 1);
        channel.subscribe(2, SWITCHED_BACK_EVENT, |_: &Event| panic!("wrong name"));

        assert!(tree.switch_back_to_last_view(stack, top, &mut channel));
        assert!(tree.is_active(bottom));
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn test_show_existing_view_moves_node() {
        let (mut tree, stack, bottom) = stacked_tree();
        let elsewhere = tree.attach(tree.root(), label("Elsewhere")).unwrap();
        let child = tree.attach(elsewhere, label("Moved")).unwrap();

        assert_eq!(tree.show_existing_view(stack, elsewhere), Ok(elsewhere));

        assert_eq!(tree.parent(elsewhere), Some(stack.owner()));
        assert_eq!(tree.children(tree.root()), &[stack.owner()]);
        assert_eq!(tree.parent(child), Some(elsewhere));
        assert_eq!(tree.tracked_views(stack), &[bottom, elsewhere]);
        assert!(tree.is_active(elsewhere));
        assert!(!tree.is_active(bottom));
    }

    #[test]
    fn test_show_existing_view_rejects_tracked_node() {
        let (mut tree, stack, bottom) = stacked_tree();
        let v2 = tree.show_view(stack, label("V2")).unwrap();

        assert_eq!(
            tree.show_existing_view(stack, v2),
            Err(ViewError::AlreadyTracked(v2, stack.owner()))
        );
        assert_eq!(
            tree.show_existing_view(stack, bottom),
            Err(ViewError::AlreadyTracked(bottom, stack.owner()))
        );
        assert_eq!(active_tracked(&tree, stack), vec![v2]);
    }

    #[test]
    fn test_show_existing_view_rejects_cycles() {
        let (mut tree, stack, bottom) = stacked_tree();
        let root = tree.root();
        let owner = stack.owner();

        assert_eq!(
            tree.show_existing_view(stack, owner),
            Err(ViewError::WouldCycle(owner, owner))
        );
        assert_eq!(
            tree.show_existing_view(stack, root),
            Err(ViewError::WouldCycle(root, owner))
        );
        assert_eq!(tree.parent(owner), Some(root));
        assert!(tree.is_active(bottom));
    }

    #[test]
    fn test_show_existing_untracked_child_of_owner() {
        let (mut tree, stack, bottom) = stacked_tree();
        let sibling = tree.attach(stack.owner(), label("Sibling")).unwrap();

        assert_eq!(tree.show_existing_view(stack, sibling), Ok(sibling));
        assert_eq!(tree.tracked_views(stack), &[bottom, sibling]);
        assert_eq!(tree.children(stack.owner()), &[bottom, sibling]);
        assert_eq!(active_tracked(&tree, stack), vec![sibling]);
    }

    #[test]
    fn test_externally_destroyed_top_is_dropped() {
        let (mut tree, stack, bottom) = stacked_tree();
        let v2 = tree.show_view(stack, label("V2")).unwrap();
        let v3 = tree.show_view(stack, label("V3")).unwrap();

        tree.destroy(v3).unwrap();
        assert_eq!(tree.latest_view(stack), Some(v2));
        assert!(tree.is_active(v2));
        assert_eq!(tree.tracked_views(stack), &[bottom, v2]);
        assert_eq!(active_tracked(&tree, stack), vec![v2]);

        let mut bus = Bus::new();
        assert!(!tree.switch_back_to_last_view(stack, v3, &mut bus));
        assert_eq!(tree.tracked_views(stack), &[bottom, v2]);
        assert!(tree.is_active(v2));

        assert!(tree.switch_back_to_last_view(stack, v2, &mut bus));
        assert!(tree.is_active(bottom));
    }

    #[test]
    fn test_destroy_owner_destroys_tracked_views() {
        let (mut tree, stack, bottom) = stacked_tree();
        let v2 = tree.show_view(stack, label("V2")).unwrap();
        let nested = tree.attach(v2, label("Nested")).unwrap();

        tree.destroy(stack.owner()).unwrap();

        for id in [stack.owner(), bottom, v2, nested] {
            assert!(tree.is_destroyed(id));
            assert!(tree.view(id).is_none());
        }
        assert!(tree.stack(stack).is_none());
        assert!(tree.children(tree.root()).is_empty());
        assert_eq!(tree.latest_view(stack), None);

        let mut bus = Bus::new();
        assert!(!tree.switch_back_to_last_view(stack, v2, &mut bus));
        assert_eq!(
            tree.show_view(stack, label("Late")).err(),
            Some(ViewError::UnknownStack(stack.owner()))
        );
    }

    #[test]
    fn test_destroy_runs_children_first() {
        let mut tree = ViewTree::new(label("Shell"));
        let log = Rc::new(RefCell::new(Vec::new()));
        let probe = |name: &str| -> Box<dyn View> {
            Box::new(Probe {
                name: name.to_string(),
                log: Rc::clone(&log),
            })
        };
        let parent = tree.attach(tree.root(), probe("Parent")).unwrap();
        tree.attach(parent, probe("Child")).unwrap();

        tree.destroy(parent).unwrap();

        assert_eq!(
            log.borrow().as_slice(),
            &[
                ("Child".to_string(), ViewState::Destroyed),
                ("Parent".to_string(), ViewState::Destroyed),
            ]
        );
    }

    #[test]
    fn test_destroyed_views_leave_the_arena() {
        let (mut tree, stack, bottom) = stacked_tree();
        let before = tree.nodes.len();
        let mut bus = Bus::new();

        let mut popped = Vec::new();
        for _ in 0..10_000 {
            let top = tree.show_view(stack, label("Transient")).unwrap();
            assert!(tree.switch_back_to_last_view(stack, top, &mut bus));
            popped.push(top);
        }

        assert_eq!(tree.nodes.len(), before);
        assert_eq!(bus.len(), 10_000);
        assert!(popped.iter().all(|&id| tree.is_destroyed(id)));
        assert_eq!(tree.state(popped[0]), Some(ViewState::Destroyed));
        assert!(tree.is_active(bottom));
        assert_eq!(tree.state(9_999_999), None);
    }

    #[test]
    fn test_destroy_deep_chain() {
        let mut tree = ViewTree::new(label("Shell"));
        let top = tree.attach(tree.root(), label("Level")).unwrap();
        let mut deepest = top;
        for _ in 0..100_000 {
            deepest = tree.attach(deepest, label("Level")).unwrap();
        }

        tree.destroy(top).unwrap();

        assert!(tree.is_destroyed(top));
        assert!(tree.is_destroyed(deepest));
        assert_eq!(tree.nodes.len(), 1);
        assert!(tree.children(tree.root()).is_empty());
    }

    #[test]
    fn test_set_active_on_destroyed_view_fails() {
        let (mut tree, _, bottom) = stacked_tree();
        let child = tree.attach(bottom, label("Child")).unwrap();

        tree.set_active(child, true).unwrap();
        assert!(tree.is_active(child));
        tree.set_active(child, false).unwrap();
        assert_eq!(tree.state(child), Some(ViewState::Inactive));

        tree.destroy(child).unwrap();
        assert_eq!(tree.set_active(child, true), Err(ViewError::Destroyed(child)));
        assert_eq!(tree.state(child), Some(ViewState::Destroyed));
    }

    #[test]
    fn test_destroy_tree_root_fails() {
        let mut tree = ViewTree::new(label("Shell"));
        let root = tree.root();
        assert_eq!(tree.destroy(root), Err(ViewError::TreeRoot(root)));
        assert!(tree.is_active(root));
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "destroyed twice"))]
    fn test_destroy_twice_is_rejected() {
        let (mut tree, _, bottom) = stacked_tree();
        let child = tree.attach(bottom, label("Child")).unwrap();
        tree.destroy(child).unwrap();

        assert_eq!(tree.destroy(child), Err(ViewError::DoubleDestroy(child)));
    }

    #[test]
    fn test_views_are_downcastable() {
        let (mut tree, _, bottom) = stacked_tree();

        let text_view = tree
            .view_mut(bottom)
            .and_then(|view| view.downcast_mut::<Label>())
            .unwrap();
        text_view.set_text("Renamed");

        assert_eq!(tree.name(bottom), Some("Renamed"));
        assert_eq!(
            tree.view(bottom)
                .and_then(|view| view.downcast_ref::<Label>())
                .and_then(Label::state),
            None
        );
    }
}
