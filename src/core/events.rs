//! Lifecycle notifications and the switch token.

use crate::core::profile::ProfileInfo;
use crate::core::queue::Scheduler;

/// Version marker bumped whenever the attached store, the object graph or
/// the roster changes. Dependent state compares tokens to learn that the
/// data underneath it is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SwitchToken(u64);

impl SwitchToken {
    pub fn next(self) -> Self {
        SwitchToken(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SwitchToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The attached store is about to be replaced. Drop in-flight edits and
    /// selections that point into the old store.
    WillSwitch { from: ProfileInfo, to: ProfileInfo },
    /// The current profile is about to be archived or deleted.
    WillDelete { profile: ProfileInfo },
    /// A transition finished; `token` is the new switch token.
    Invalidated {
        current: ProfileInfo,
        token: SwitchToken,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Handler = Box<dyn FnMut(&LifecycleEvent, &Scheduler)>;

#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Handler)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: Handler) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.handlers.push((id, handler));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sid, _)| *sid != id);
        before != self.handlers.len()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Delivers `event` to every handler, in subscription order, before returning.
    pub fn publish(&mut self, event: &LifecycleEvent, scheduler: &Scheduler) {
        log::debug!("publishing {:?} to {} subscriber(s)", event, self.handlers.len());
        for (_, handler) in self.handlers.iter_mut() {
            handler(event, scheduler);
        }
    }
}
