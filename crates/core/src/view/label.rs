use super::{View, ViewState};

/// A view identified by its text.
///
/// Labels are the simplest hosted view: the text doubles as the display
/// name reported in navigation events.
#[derive(Debug, Clone)]
pub struct Label {
    text: String,
    state: Option<ViewState>,
}

impl Label {
    pub fn new(text: impl Into<String>) -> Label {
        Label {
            text: text.into(),
            state: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Last lifecycle state reported by the tree, if any.
    pub fn state(&self) -> Option<ViewState> {
        self.state
    }
}

impl View for Label {
    fn name(&self) -> &str {
        &self.text
    }

    fn state_changed(&mut self, state: ViewState) {
        self.state = Some(state);
    }
}
