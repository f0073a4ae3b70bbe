use super::Id;

/// Misuse of the view tree or of a navigation stack.
///
/// Ordinary navigation outcomes are not errors: a refused pop is reported as
/// `false` and a missing stack as `None`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// No node with this id was ever attached to the tree.
    #[error("view {0} does not exist")]
    UnknownView(Id),

    /// The node is destroyed and can't change state or receive children.
    #[error("view {0} is destroyed")]
    Destroyed(Id),

    /// The node was destroyed before.
    #[error("view {0} was already destroyed")]
    DoubleDestroy(Id),

    /// The tree root lives as long as the tree itself.
    #[error("view {0} is the tree root")]
    TreeRoot(Id),

    /// The node is already part of the history of the stack owned by the second id.
    #[error("view {0} is already tracked by the stack of view {1}")]
    AlreadyTracked(Id, Id),

    /// Moving the node under the second id would make it its own ancestor.
    #[error("moving view {0} under view {1} would create a cycle")]
    WouldCycle(Id, Id),

    #[error("view {0} already carries a stack")]
    StackAlreadyAttached(Id),

    #[error("view {0} carries no stack")]
    UnknownStack(Id),
}
