//! View tree primitives and the navigation stack built on top of them.
//!
//! A [`ViewTree`] is an arena of nodes, each wrapping a boxed [`View`] and a
//! [`ViewState`]. Any node of the tree can carry a [`ViewStack`]: the stack
//! tracks the navigation history of the owner's direct children and decides
//! which one of them is on top.
//!
//! # Navigating
//!
//! ```
//! use quire_core::view::label::Label;
//! use quire_core::view::{Bus, Event, ViewTree};
//!
//! let mut tree = ViewTree::new(Box::new(Label::new("Shell")));
//! let home = tree.attach(tree.root(), Box::new(Label::new("Home")))?;
//! tree.attach_stack(home)?;
//! let library = tree.attach(home, Box::new(Label::new("Library")))?;
//!
//! let stack = tree.find_stack(library).expect("home carries a stack");
//! let book = tree.show_view(stack, Box::new(Label::new("Book")))?;
//! assert!(!tree.is_active(library));
//!
//! let mut bus = Bus::new();
//! assert!(tree.switch_back_to_last_view(stack, book, &mut bus));
//! assert!(tree.is_destroyed(book));
//! assert!(tree.is_active(library));
//! assert_eq!(
//!     bus.pop_front(),
//!     Some(Event::SwitchedBack { from: "Book".to_string(), to: library })
//! );
//! # Ok::<(), quire_core::view::ViewError>(())
//! ```

pub mod channel;
pub mod error;
pub mod label;
pub mod state;
pub mod tree;
pub mod view_stack;

use downcast_rs::{impl_downcast, Downcast};
use lazy_static::lazy_static;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;

pub use self::channel::{EventChannel, Publish, SubscriberId};
pub use self::error::ViewError;
pub use self::state::ViewState;
pub use self::tree::ViewTree;
pub use self::view_stack::{StackId, ViewStack, SWITCHED_BACK_EVENT};

/// Identifier of a node in a [`ViewTree`], unique within that tree.
pub type Id = u64;

/// Sender half of the application-wide event channel.
pub type Hub = Sender<Event>;

/// Queue of events waiting to bubble up to a parent.
pub type Bus = VecDeque<Event>;

/// Hands out increasing ids, never the same one twice.
#[derive(Debug)]
pub struct IdFeeder {
    first: Id,
    next: AtomicU64,
}

impl IdFeeder {
    pub const fn new(first: Id) -> Self {
        IdFeeder {
            first,
            next: AtomicU64::new(first),
        }
    }

    pub fn next(&self) -> Id {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns `true` if `id` was already handed out by this feeder.
    pub fn has_issued(&self, id: Id) -> bool {
        id >= self.first && id < self.next.load(Ordering::Relaxed)
    }
}

lazy_static! {
    /// Process-wide ids for identities living outside a tree, such as event subscribers.
    pub static ref ID_FEEDER: IdFeeder = IdFeeder::new(1);
}

/// Events published by the navigation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A stack popped its top view.
    ///
    /// `from` is the display name of the view that was left (and destroyed),
    /// `to` is the view that is now active.
    SwitchedBack { from: String, to: Id },
}

/// A displayable unit hosted by a [`ViewTree`] node.
///
/// The tree owns the view for the whole lifetime of its node and drops it
/// when the node is destroyed. Drawing and input handling are left to the
/// host; the tree only informs the view of lifecycle changes.
pub trait View: Downcast {
    /// Informational name, carried by [`Event::SwitchedBack`].
    fn name(&self) -> &str;

    /// Called after the node hosting this view moved to `state`.
    ///
    /// [`ViewState::Destroyed`] is the last call a view receives before
    /// being dropped.
    fn state_changed(&mut self, _state: ViewState) {}
}

impl_downcast!(View);
