//! Single-Consumer Actor Core
//!
//! Many producer threads hand messages to one consumer that applies them
//! strictly one at a time, in the order they were accepted. Producers only
//! ever enqueue: `send` takes a shared lock and pushes onto an unbounded
//! channel, so a slow consumer never stalls the protocol path.
//!
//! ## Lifecycle
//!
//! ```text
//! Waiting ──message──> Running ──queue empty──> Waiting
//!    │                    │
//!    └──stop / failure────┴──────────────> Terminated
//! ```
//!
//! `stop` closes the mailbox under the exclusive lock, which orders it after
//! every `send` that already succeeded. The consumer drains those messages,
//! runs `Handler::on_stop` exactly once, and exits; `stop` joins it unless it
//! was called from the consumer itself.
//!
//! A handler error is fail-fast: the actor terminates, the rest of the queue
//! is discarded and `on_stop` still runs.
//!
//! # Lock Ordering
//!
//! Only one lock is ever held at a time (`sender`, then separately
//! `consumer`), so there is no ordering to get wrong.

use crate::error::{ActorError, Result};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Observable actor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ActorState {
    /// Idle, accepting messages
    Waiting = 0,
    /// Consumer is applying queued messages
    Running = 1,
    /// Rejects all messages; terminal
    Terminated = 2,
}

impl ActorState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ActorState::Waiting,
            1 => ActorState::Running,
            _ => ActorState::Terminated,
        }
    }
}

/// Message sink with a stop lifecycle
pub trait Actor<M>: Send + Sync {
    /// Enqueue without blocking. `false` once the actor is terminated.
    fn send(&self, msg: M) -> bool;

    fn state(&self) -> ActorState;

    /// Terminate after everything already accepted has been applied.
    /// `true` only for the call that performed the transition.
    fn stop(&self) -> bool;
}

impl<M, A: Actor<M> + ?Sized> Actor<M> for Arc<A> {
    fn send(&self, msg: M) -> bool {
        (**self).send(msg)
    }

    fn state(&self) -> ActorState {
        (**self).state()
    }

    fn stop(&self) -> bool {
        (**self).stop()
    }
}

impl<M, A: Actor<M> + ?Sized> Actor<M> for Box<A> {
    fn send(&self, msg: M) -> bool {
        (**self).send(msg)
    }

    fn state(&self) -> ActorState {
        (**self).state()
    }

    fn stop(&self) -> bool {
        (**self).stop()
    }
}

/// Behavior run on the consumer thread
pub trait Handler<M>: Send + 'static {
    fn apply(&mut self, msg: M) -> Result<()>;

    /// Runs once after the last message, on every exit path
    fn on_stop(&mut self) -> Result<()> {
        Ok(())
    }
}

struct Shared<M> {
    name: String,
    state: AtomicU8,
    processed: AtomicU64,
    sender: RwLock<Option<mpsc::UnboundedSender<M>>>,
}

impl<M> Shared<M> {
    fn state(&self) -> ActorState {
        ActorState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move between the live states; never leaves `Terminated`
    fn transition(&self, from: ActorState, to: ActorState) {
        let _ = self.state.compare_exchange(
            from as u8,
            to as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    fn terminate(&self) -> Option<mpsc::UnboundedSender<M>> {
        let sender = self.sender.write().take();
        self.state.store(ActorState::Terminated as u8, Ordering::Release);
        sender
    }
}

/// Actor backed by a dedicated consumer thread
pub struct MailboxActor<M> {
    shared: Arc<Shared<M>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    consumer_id: ThreadId,
}

impl<M: Send + 'static> MailboxActor<M> {
    /// Start the consumer thread for `handler`
    pub fn spawn<H: Handler<M>>(name: impl Into<String>, handler: H) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            name: name.clone(),
            state: AtomicU8::new(ActorState::Waiting as u8),
            processed: AtomicU64::new(0),
            sender: RwLock::new(Some(sender)),
        });

        let consumer = thread::Builder::new()
            .name(format!("actor-{}", name))
            .spawn({
                let shared = Arc::clone(&shared);
                move || run_consumer(shared, receiver, handler)
            })
            .map_err(|source| ActorError::Spawn {
                name: name.clone(),
                source,
            })?;
        let consumer_id = consumer.thread().id();

        debug!(actor = %name, "Actor spawned");
        Ok(Self {
            shared,
            consumer: Mutex::new(Some(consumer)),
            consumer_id,
        })
    }
}

impl<M> MailboxActor<M> {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Messages applied successfully so far
    pub fn processed(&self) -> u64 {
        self.shared.processed.load(Ordering::Relaxed)
    }
}

impl<M: Send + 'static> Actor<M> for MailboxActor<M> {
    fn send(&self, msg: M) -> bool {
        match self.shared.sender.read().as_ref() {
            Some(sender) => sender.send(msg).is_ok(),
            None => false,
        }
    }

    fn state(&self) -> ActorState {
        self.shared.state()
    }

    fn stop(&self) -> bool {
        let sender = self.shared.terminate();
        let stopped_now = sender.is_some();
        // Dropping the last sender lets the consumer see the end of the queue.
        drop(sender);

        if thread::current().id() != self.consumer_id {
            if let Some(consumer) = self.consumer.lock().take() {
                if consumer.join().is_err() {
                    error!(actor = %self.shared.name, "Actor consumer panicked");
                }
            }
        }
        stopped_now
    }
}

impl<M> Drop for MailboxActor<M> {
    fn drop(&mut self) {
        drop(self.shared.terminate());
        if thread::current().id() == self.consumer_id {
            return;
        }
        if let Some(consumer) = self.consumer.get_mut().take() {
            if consumer.join().is_err() {
                error!(actor = %self.shared.name, "Actor consumer panicked");
            }
        }
    }
}

fn run_consumer<M, H: Handler<M>>(
    shared: Arc<Shared<M>>,
    mut receiver: mpsc::UnboundedReceiver<M>,
    mut handler: H,
) {
    let started = Instant::now();
    debug!(actor = %shared.name, "Actor consumer started");

    while let Some(msg) = receiver.blocking_recv() {
        shared.transition(ActorState::Waiting, ActorState::Running);

        if let Err(e) = handler.apply(msg) {
            error!(
                actor = %shared.name,
                error = %e,
                error_category = e.category(),
                processed = shared.processed.load(Ordering::Relaxed),
                "Actor message processing failed, terminating"
            );
            drop(shared.terminate());
            receiver.close();
            let mut discarded = 0u64;
            while receiver.try_recv().is_ok() {
                discarded += 1;
            }
            if discarded > 0 {
                warn!(actor = %shared.name, discarded, "Discarded queued messages");
            }
            break;
        }

        shared.processed.fetch_add(1, Ordering::Relaxed);
        if receiver.is_empty() {
            shared.transition(ActorState::Running, ActorState::Waiting);
        }
    }

    if let Err(e) = handler.on_stop() {
        error!(actor = %shared.name, error = %e, "Actor failed to stop cleanly");
    }
    info!(
        actor = %shared.name,
        processed = shared.processed.load(Ordering::Relaxed),
        runtime_ms = started.elapsed().as_millis() as u64,
        "Actor stopped"
    );
}
