//! Navigation stacks for view trees.
//!
//! [`view`] holds the tree of views, their lifecycle and the stacks that
//! decide which child of a node is on top. [`settings`] and [`logging`] are
//! the ambient pieces an application wires around them.

pub mod logging;
pub mod settings;
pub mod view;
