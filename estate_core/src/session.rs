// Session/account synchronization
// One broadcast channel fed by both wallet backends; the session store is the
// single subscriber that turns account announcements into the active session.

use crate::error::CoreError;
use crate::models::{AccountId, WalletKind};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Process-wide record of the connected account and the backend that owns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalletSession {
    pub account: Option<AccountId>,
    pub connected: bool,
    pub backend: Option<WalletKind>,
}

/// A backend's announcement of its current account. `account: None` means the
/// backend has no account (disconnected, or the wallet returned an empty list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub backend: WalletKind,
    pub account: Option<AccountId>,
    pub at: DateTime<Utc>,
}

impl SessionEvent {
    pub fn new(backend: WalletKind, account: Option<AccountId>) -> Self {
        Self { backend, account, at: Utc::now() }
    }
}

pub type SessionListener = Rc<dyn Fn(&SessionEvent)>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, SessionListener)>,
}

/// Publish/subscribe channel without persistence: late subscribers do not
/// see earlier events.
#[derive(Clone, Default)]
pub struct SessionSync {
    listeners: Rc<RefCell<Listeners>>,
}

/// Keeps a listener registered; dropping it unsubscribes.
pub struct Subscription {
    listeners: Weak<RefCell<Listeners>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.borrow_mut().entries.retain(|(id, _)| *id != self.id);
        }
    }
}

fn same_listener(a: &SessionListener, b: &SessionListener) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

impl SessionSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Registering the same listener twice is rejected
    /// so that one event is never applied twice.
    pub fn subscribe(&self, listener: SessionListener) -> Result<Subscription, CoreError> {
        let mut listeners = self.listeners.borrow_mut();
        if listeners.entries.iter().any(|(_, existing)| same_listener(existing, &listener)) {
            return Err(CoreError::Validation("Session listener is already subscribed".to_string()));
        }
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, listener));
        Ok(Subscription { listeners: Rc::downgrade(&self.listeners), id })
    }

    pub fn publish(&self, event: SessionEvent) {
        // Snapshot so listeners may (un)subscribe while being notified.
        let listeners: Vec<SessionListener> =
            self.listeners.borrow().entries.iter().map(|(_, l)| l.clone()).collect();
        debug!("Session event from {}: {:?} ({} listeners)", event.backend, event.account, listeners.len());
        for listener in listeners {
            listener(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }
}

/// Current [`WalletSession`], kept up to date from a [`SessionSync`].
pub struct SessionStore {
    session: Rc<RefCell<WalletSession>>,
    _subscription: Subscription,
}

impl SessionStore {
    pub fn bind(sync: &SessionSync) -> Result<Self, CoreError> {
        let session = Rc::new(RefCell::new(WalletSession::default()));
        let target = Rc::downgrade(&session);
        let listener: SessionListener = Rc::new(move |event: &SessionEvent| {
            if let Some(session) = target.upgrade() {
                apply_event(&mut session.borrow_mut(), event);
            }
        });
        let subscription = sync.subscribe(listener)?;
        Ok(Self { session, _subscription: subscription })
    }

    pub fn snapshot(&self) -> WalletSession {
        self.session.borrow().clone()
    }

    pub fn account(&self) -> Option<AccountId> {
        self.session.borrow().account
    }

    pub fn is_connected(&self) -> bool {
        self.session.borrow().connected
    }

    pub fn active_backend(&self) -> Option<WalletKind> {
        let session = self.session.borrow();
        session.backend.filter(|_| session.connected)
    }
}

/// Only one backend owns the session; the other must disconnect before its
/// account is accepted.
fn apply_event(session: &mut WalletSession, event: &SessionEvent) {
    let owned_by_other = session.connected && session.backend.is_some_and(|b| b != event.backend);
    match event.account {
        Some(account) if owned_by_other => {
            warn!(
                "Ignoring {} account {} while a {:?} session is active; disconnect it first",
                event.backend, account, session.backend
            );
        }
        Some(account) => {
            session.account = Some(account);
            session.connected = true;
            session.backend = Some(event.backend);
        }
        None if owned_by_other => {}
        None => *session = WalletSession::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn account(num: u64) -> AccountId {
        AccountId::new(0, 0, num)
    }

    #[test]
    fn test_duplicate_subscription_rejected() {
        let sync = SessionSync::new();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let listener: SessionListener = Rc::new(move |_: &SessionEvent| counter.set(counter.get() + 1));

        let _sub = sync.subscribe(listener.clone()).unwrap();
        assert!(sync.subscribe(listener).is_err());

        sync.publish(SessionEvent::new(WalletKind::Remote, Some(account(1))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let sync = SessionSync::new();
        let store = SessionStore::bind(&sync).unwrap();
        assert_eq!(sync.listener_count(), 1);
        drop(store);
        assert_eq!(sync.listener_count(), 0);
    }

    #[test]
    fn test_store_tracks_account_and_clears_on_empty() {
        let sync = SessionSync::new();
        let store = SessionStore::bind(&sync).unwrap();

        sync.publish(SessionEvent::new(WalletKind::Injected, Some(account(7))));
        assert_eq!(store.account(), Some(account(7)));
        assert_eq!(store.active_backend(), Some(WalletKind::Injected));

        sync.publish(SessionEvent::new(WalletKind::Injected, None));
        assert_eq!(store.snapshot(), WalletSession::default());
        assert_eq!(store.active_backend(), None);
    }

    #[test]
    fn test_other_backend_cannot_take_over_connected_session() {
        let sync = SessionSync::new();
        let store = SessionStore::bind(&sync).unwrap();

        sync.publish(SessionEvent::new(WalletKind::Remote, Some(account(1))));
        sync.publish(SessionEvent::new(WalletKind::Injected, Some(account(2))));
        assert_eq!(store.account(), Some(account(1)));

        // An idle backend reporting "no account" leaves the session alone.
        sync.publish(SessionEvent::new(WalletKind::Injected, None));
        assert!(store.is_connected());

        sync.publish(SessionEvent::new(WalletKind::Remote, None));
        sync.publish(SessionEvent::new(WalletKind::Injected, Some(account(2))));
        assert_eq!(store.account(), Some(account(2)));
        assert_eq!(store.active_backend(), Some(WalletKind::Injected));
    }
}
