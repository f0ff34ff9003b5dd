use super::actions::AppAction;
use super::reducer::reduce;
use super::reducer::AgentflowEffect;
use super::state::AppState;

type Listener = Box<dyn FnMut(&AppState) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Single owner of [`AppState`]. Every mutation goes through [`Store::dispatch`]
/// as a whole-state transition; listeners only ever see finished states.
pub struct Store {
    state: AppState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl Store {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            listeners: Vec::new(),
            next_subscription: 1,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Reduces `action` against a copy of the current state and swaps it in.
    /// Listeners are notified when the state actually changed.
    pub fn dispatch(&mut self, action: AppAction) -> Vec<AgentflowEffect> {
        let mut next = self.state.clone();
        let effects = reduce(&mut next, action);
        if next != self.state {
            self.state = next;
            for (_, listener) in self.listeners.iter_mut() {
                listener(&self.state);
            }
        }
        effects
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&AppState) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn into_state(self) -> AppState {
        self.state
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::actions::UserAction;
    use crate::state::Language;
    use crate::state::Tab;

    fn recording_store() -> (Store, Arc<Mutex<Vec<Language>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut store = Store::new(AppState::new());
        store.subscribe(move |state| {
            sink.lock().expect("lock").push(state.preferences.language);
        });
        (store, seen)
    }

    #[test]
    fn listeners_see_each_completed_transition() {
        let (mut store, seen) = recording_store();
        store.dispatch(AppAction::User(UserAction::SetLanguage(Language::Zh)));
        store.dispatch(AppAction::User(UserAction::SetLanguage(Language::Bg)));

        assert_eq!(*seen.lock().expect("lock"), vec![Language::Zh, Language::Bg]);
        assert_eq!(store.state().preferences.language, Language::Bg);
    }

    #[test]
    fn no_op_actions_do_not_notify() {
        let (mut store, seen) = recording_store();
        store.dispatch(AppAction::User(UserAction::ExecutePlan));
        store.dispatch(AppAction::User(UserAction::ClearAllHistory));
        assert!(seen.lock().expect("lock").is_empty());
    }

    #[test]
    fn unsubscribed_listener_stops_receiving() {
        let (mut store, seen) = recording_store();
        let counter = Arc::new(Mutex::new(0usize));
        let count = Arc::clone(&counter);
        let id = store.subscribe(move |_| *count.lock().expect("lock") += 1);

        store.dispatch(AppAction::User(UserAction::SelectTab(Tab::History)));
        assert!(store.unsubscribe(id));
        store.dispatch(AppAction::User(UserAction::SelectTab(Tab::Agents)));

        assert_eq!(*counter.lock().expect("lock"), 1);
        assert_eq!(seen.lock().expect("lock").len(), 2);
    }
}
