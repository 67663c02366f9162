//! Trace Event Bus
//!
//! Decouples observation points from pipelines: taps publish into the bus and
//! every subscribed actor receives each event. Delivery is a synchronous loop
//! of non-blocking `send` calls, so publishing never waits on I/O.
//! Subscribers that report themselves terminated are pruned on the next
//! publish.

use crate::actor::{Actor, ActorState};
use crate::pipeline::SharedActor;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::debug;
use types::{TraceEvent, TracePublisher};

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Default)]
pub struct TraceEventBus {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(SubscriptionId, SharedActor)>>,
}

static GLOBAL_BUS: OnceLock<Arc<TraceEventBus>> = OnceLock::new();

impl TraceEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide bus shared by every tap that is not given its own
    pub fn global() -> Arc<TraceEventBus> {
        Arc::clone(GLOBAL_BUS.get_or_init(|| Arc::new(TraceEventBus::new())))
    }

    pub fn subscribe(&self, actor: SharedActor) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, actor));
        debug!(subscription = %id, "Subscriber added");
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        let removed = subscribers.len() != before;
        if removed {
            debug!(subscription = %id, "Subscriber removed");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn publish(&self, event: TraceEvent) {
        let mut dead = Vec::new();
        {
            let subscribers = self.subscribers.read();
            let Some(((last_id, last), rest)) = subscribers.split_last() else {
                return;
            };
            for (id, actor) in rest {
                if !actor.send(event.clone()) && actor.state() == ActorState::Terminated {
                    dead.push(*id);
                }
            }
            if !last.send(event) && last.state() == ActorState::Terminated {
                dead.push(*last_id);
            }
        }

        if !dead.is_empty() {
            self.subscribers.write().retain(|(id, _)| !dead.contains(id));
            debug!(pruned = dead.len(), "Pruned terminated subscribers");
        }
    }
}

impl TracePublisher for TraceEventBus {
    fn publish(&self, event: TraceEvent) {
        TraceEventBus::publish(self, event)
    }
}
