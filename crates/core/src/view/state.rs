/// Lifecycle state of a view node.
///
/// `Destroyed` is absorbing: once reached, no other state can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewState {
    Active,
    Inactive,
    Destroyed,
}

impl ViewState {
    /// Returns the state reached by moving to `next`, or `None` when the move
    /// is not allowed.
    ///
    /// This is the single place deciding which lifecycle transitions are legal.
    pub fn transition(self, next: ViewState) -> Option<ViewState> {
        match self {
            ViewState::Destroyed => None,
            ViewState::Active | ViewState::Inactive => Some(next),
        }
    }

    pub fn is_active(self) -> bool {
        self == ViewState::Active
    }

    pub fn is_destroyed(self) -> bool {
        self == ViewState::Destroyed
    }
}
