use tracing::debug;

/// Lifecycle of one invocation. Dry runs terminate at `Composing`;
/// every submitted run ends in `TornDown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Composing,
    Submitted,
    Running,
    Stopped,
    Failed,
    TornDown,
}

impl TaskState {
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;

        matches!(
            (self, next),
            (Idle, Composing)
                | (Composing, Submitted)
                | (Composing, Failed)
                | (Submitted, Running)
                | (Submitted, Stopped)
                | (Submitted, Failed)
                | (Running, Stopped)
                | (Running, Failed)
                | (Running, TornDown)
                | (Stopped, TornDown)
                | (Failed, TornDown)
        )
    }
}

#[derive(Debug)]
pub(crate) struct StateTracker {
    state: TaskState,
}

impl StateTracker {
    pub fn new() -> Self {
        Self {
            state: TaskState::Idle,
        }
    }

    pub fn advance(&mut self, next: TaskState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid lifecycle transition: {:?} -> {:?}",
            self.state,
            next
        );
        debug!(from = ?self.state, to = ?next, "lifecycle transition");
        self.state = next;
    }
}
