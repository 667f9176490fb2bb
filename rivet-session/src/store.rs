//! State container
//!
//! Holds the current session state and applies actions to it. A dispatch runs the
//! reducer atomically: no other dispatch can observe or interleave with a half-applied
//! transition. Observers get state snapshots through a watch channel and every applied
//! action through a broadcast channel.

use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::action::Action;
use crate::reducer::reduce;
use crate::state::SessionState;

const ACTION_CHANNEL_CAPACITY: usize = 256;

pub(crate) struct StateStore {
    state: watch::Sender<SessionState>,
    actions: broadcast::Sender<Action>,
}

impl StateStore {
    pub(crate) fn new(initial: SessionState) -> Self {
        let (state, _) = watch::channel(initial);
        let (actions, _) = broadcast::channel(ACTION_CHANNEL_CAPACITY);
        Self { state, actions }
    }

    /// Applies `action` through the reducer and notifies observers
    pub(crate) fn dispatch(&self, action: Action) {
        debug!("Dispatching {}", action.name());
        let published = action.clone();
        self.state.send_modify(|state| {
            let current = std::mem::take(state);
            *state = reduce(current, action);
        });
        // No receivers is not an error; nobody is listening.
        let _ = self.actions.send(published);
    }

    /// Runs `f` against the current state without cloning it
    pub(crate) fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.state.borrow())
    }

    pub(crate) fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub(crate) fn actions(&self) -> broadcast::Receiver<Action> {
        self.actions.subscribe()
    }
}
