use std::sync::Arc;

use arc_swap::ArcSwap;

/// Transcript-wide multi-select mode.
///
/// `generation` bumps on every change so a cell can tell whether it has already
/// applied the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditMode {
    pub is_editing: bool,
    pub generation: u64,
}

/// Shared edit-mode value, set by the host and observed by every bound cell on its
/// next layout pass.
#[derive(Debug, Clone, Default)]
pub struct EditModeBroadcast {
    state: Arc<ArcSwap<EditMode>>,
}

impl EditModeBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> EditMode {
        **self.state.load()
    }

    pub fn is_editing(&self) -> bool {
        self.snapshot().is_editing
    }

    /// Enters or leaves multi-select mode. Setting the current value again is a no-op.
    pub fn set_editing(&self, is_editing: bool) {
        self.state.rcu(|current| {
            if current.is_editing == is_editing {
                return Arc::clone(current);
            }
            Arc::new(EditMode {
                is_editing,
                generation: current.generation + 1,
            })
        });
        tracing::debug!(is_editing, "edit mode broadcast");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_observe_the_same_value() {
        let host = EditModeBroadcast::new();
        let cell_view = host.clone();
        assert!(!cell_view.is_editing());

        host.set_editing(true);
        assert!(cell_view.is_editing());
        assert_eq!(cell_view.snapshot().generation, 1);
    }

    #[test]
    fn repeated_value_keeps_generation() {
        let host = EditModeBroadcast::new();
        host.set_editing(true);
        host.set_editing(true);
        assert_eq!(host.snapshot().generation, 1);

        host.set_editing(false);
        assert_eq!(host.snapshot(), EditMode { is_editing: false, generation: 2 });
    }
}
