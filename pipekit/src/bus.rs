// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! In-process message bus.
//!
//! Any number of producer threads [`Bus::post`] messages; one logical
//! consumer drains them in post order with [`Bus::pop`], [`Bus::timed_pop`]
//! and friends, or hands them to connected callbacks with
//! [`Bus::dispatch_pending`].
//!
//! A synchronous handler installed with [`Bus::set_sync_handler`] sees every
//! message on the producer thread before it is queued and decides what
//! happens to it:
//!
//! - [`BusSyncReply::Pass`]: queue it.
//! - [`BusSyncReply::Drop`]: discard it.
//! - [`BusSyncReply::Async`]: queue it and block the producer until the
//!   consumer has dropped the last handle to the message.
//!
//! ```text
//!  producer ──► post ──► sync handler ──► queue ──► pop / timed_pop ──► consumer
//!                            │                        dispatch_pending ──► callbacks
//!                            └─► Drop
//! ```
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use pipekit::{Bus, Message, MessageType};
//!
//! let bus = Bus::new();
//! let producer = {
//!     let bus = bus.clone();
//!     std::thread::spawn(move || {
//!         bus.post(Message::new_eos(None));
//!     })
//! };
//! let msg = bus.timed_pop(None).expect("infinite wait returns a message");
//! assert_eq!(msg.kind(), MessageType::Eos);
//! producer.join().unwrap();
//! ```

use std::{
    collections::VecDeque,
    sync::{
        Arc, Condvar, Mutex, MutexGuard, RwLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use tracing::{debug, trace, warn};

use crate::{
    Message, MessageType, MessageTypeMask, config::BusConfig, message::Completion,
};

/// Decision returned by a synchronous handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusSyncReply {
    /// Queue the message.
    Pass,
    /// Discard the message. `post` still reports success.
    Drop,
    /// Queue the message and block the producer until it is released.
    Async,
}

type SyncHandler = dyn Fn(&Bus, &Message) -> BusSyncReply + Send + Sync + 'static;
type MessageCallback = dyn Fn(&Bus, &Message) + Send + Sync + 'static;

/// Identifies a callback connected with [`Bus::connect_message`] or
/// [`crate::Object::connect_notify_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalHandlerId(pub(crate) u64);

struct Watch {
    id: SignalHandlerId,
    detail: Option<MessageType>,
    callback: Arc<MessageCallback>,
}

#[derive(Default)]
struct Queue {
    messages: VecDeque<Message>,
    flushing: bool,
}

struct BusInner {
    name: String,
    enable_async: bool,
    queue: Mutex<Queue>,
    /// Signalled on every enqueue and when flushing starts.
    cond: Condvar,
    sync_handler: RwLock<Option<Arc<SyncHandler>>>,
    watches: Mutex<Vec<Watch>>,
    next_watch_id: AtomicU64,
}

/// A thread-safe, ordered message channel.
///
/// `Bus` is a cheap handle; clones share the same queue.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    /// Creates a bus with the default [`BusConfig`].
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Creates a bus from `config`.
    ///
    /// Without a configured name the bus is called `bus<N>`.
    pub fn with_config(config: BusConfig) -> Self {
        let name = config.resolve_name();
        debug!("Creating bus {name} (async delivery: {})", config.enable_async);
        Self {
            inner: Arc::new(BusInner {
                name,
                enable_async: config.enable_async,
                queue: Mutex::new(Queue::default()),
                cond: Condvar::new(),
                sync_handler: RwLock::new(None),
                watches: Mutex::new(Vec::new()),
                next_watch_id: AtomicU64::new(1),
            }),
        }
    }

    /// Returns the bus name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    fn lock_queue(&self) -> MutexGuard<'_, Queue> {
        self.inner.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_watches(&self) -> MutexGuard<'_, Vec<Watch>> {
        self.inner.watches.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Posts `message` on the bus.
    ///
    /// Runs the sync handler (if any) on the calling thread first. Under
    /// [`BusSyncReply::Async`] this call blocks until the consumer drops the
    /// last handle to the message, so the producer must not keep a clone of
    /// it.
    ///
    /// # Returns
    ///
    /// `false` if the bus is flushing and the message was discarded, `true`
    /// otherwise (including when the sync handler dropped it).
    pub fn post(&self, message: Message) -> bool {
        if self.lock_queue().flushing {
            debug!(
                "Bus {} is flushing, discarding {} message #{}",
                self.inner.name,
                message.kind(),
                message.seqnum()
            );
            return false;
        }

        let handler = self
            .inner
            .sync_handler
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let mut reply = match handler {
            Some(handler) => handler(self, &message),
            None => BusSyncReply::Pass,
        };
        if !self.inner.enable_async && reply != BusSyncReply::Drop {
            warn!(
                "Bus {} has async delivery disabled, dropping {} message #{}",
                self.inner.name,
                message.kind(),
                message.seqnum()
            );
            reply = BusSyncReply::Drop;
        }

        match reply {
            BusSyncReply::Drop => {
                trace!(
                    "Sync handler of bus {} dropped {} message #{}",
                    self.inner.name,
                    message.kind(),
                    message.seqnum()
                );
                true
            }
            BusSyncReply::Pass => self.enqueue(message),
            BusSyncReply::Async => {
                let completion = Arc::new(Completion::new());
                message.set_completion(completion.clone());
                let seqnum = message.seqnum();
                if !self.enqueue(message) {
                    return false;
                }
                trace!("Waiting for message #{seqnum} to be released on bus {}", self.inner.name);
                completion.wait();
                trace!("Message #{seqnum} released on bus {}", self.inner.name);
                true
            }
        }
    }

    fn enqueue(&self, message: Message) -> bool {
        let mut queue = self.lock_queue();
        if queue.flushing {
            debug!(
                "Bus {} started flushing, discarding {} message #{}",
                self.inner.name,
                message.kind(),
                message.seqnum()
            );
            return false;
        }
        trace!(
            "Queueing {} message #{} on bus {}",
            message.kind(),
            message.seqnum(),
            self.inner.name
        );
        queue.messages.push_back(message);
        drop(queue);
        self.inner.cond.notify_all();
        true
    }

    /// Installs the synchronous handler, replacing any previous one.
    ///
    /// The handler runs on producer threads without any bus lock held, so it
    /// may post on other buses.
    pub fn set_sync_handler<F>(&self, handler: F)
    where
        F: Fn(&Bus, &Message) -> BusSyncReply + Send + Sync + 'static,
    {
        debug!("Installing sync handler on bus {}", self.inner.name);
        *self
            .inner
            .sync_handler
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(handler));
    }

    /// Removes the sync handler; later posts are queued unconditionally.
    pub fn unset_sync_handler(&self) {
        debug!("Removing sync handler from bus {}", self.inner.name);
        *self
            .inner
            .sync_handler
            .write()
            .unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Removes and returns the head message without blocking.
    pub fn pop(&self) -> Option<Message> {
        self.lock_queue().messages.pop_front()
    }

    /// Returns the head message without removing it.
    ///
    /// Repeated peeks return the same instance (see [`Message::ptr_eq`]).
    pub fn peek(&self) -> Option<Message> {
        self.lock_queue().messages.front().cloned()
    }

    /// Returns `true` if at least one message is queued.
    pub fn have_pending(&self) -> bool {
        !self.lock_queue().messages.is_empty()
    }

    /// Removes and returns the first queued message whose kind is in `types`,
    /// without blocking. Other messages stay queued in order.
    pub fn pop_filtered(&self, types: impl Into<MessageTypeMask>) -> Option<Message> {
        self.timed_pop_filtered(Some(Duration::ZERO), types)
    }

    /// Waits up to `timeout` for a message. `None` waits forever,
    /// `Some(Duration::ZERO)` behaves like [`Bus::pop`].
    ///
    /// Returns `None` on timeout or if the bus is, or starts, flushing.
    pub fn timed_pop(&self, timeout: Option<Duration>) -> Option<Message> {
        self.timed_pop_filtered(timeout, MessageTypeMask::all())
    }

    /// Like [`Bus::timed_pop`], but only a message whose kind is in `types`
    /// ends the wait.
    ///
    /// Non-matching messages are skipped, not consumed: they remain queued
    /// in their original order and can still be popped afterwards.
    pub fn timed_pop_filtered(
        &self,
        timeout: Option<Duration>,
        types: impl Into<MessageTypeMask>,
    ) -> Option<Message> {
        let types = types.into();
        // A deadline too far away to represent is the same as no deadline.
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        let mut queue = self.lock_queue();
        loop {
            if queue.flushing {
                return None;
            }
            if let Some(index) = queue.messages.iter().position(|m| types.matches(m.kind())) {
                return queue.messages.remove(index);
            }
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    queue = self
                        .inner
                        .cond
                        .wait_timeout(queue, deadline - now)
                        .unwrap_or_else(|e| e.into_inner())
                        .0;
                }
                None => {
                    queue = self
                        .inner
                        .cond
                        .wait(queue)
                        .unwrap_or_else(|e| e.into_inner());
                }
            }
        }
    }

    /// Starts or stops flushing.
    ///
    /// Starting discards every queued message, wakes blocked consumers and
    /// makes later posts fail until flushing is stopped again. Discarded
    /// messages are released, which unblocks producers waiting under
    /// [`BusSyncReply::Async`] unless someone else still holds their message.
    pub fn set_flushing(&self, flushing: bool) {
        let discarded = {
            let mut queue = self.lock_queue();
            queue.flushing = flushing;
            if flushing {
                std::mem::take(&mut queue.messages)
            } else {
                VecDeque::new()
            }
        };
        if flushing {
            debug!(
                "Bus {} flushing, discarded {} message(s)",
                self.inner.name,
                discarded.len()
            );
            self.inner.cond.notify_all();
        } else {
            debug!("Bus {} stopped flushing", self.inner.name);
        }
        // Released outside the queue lock.
        drop(discarded);
    }

    /// Connects `callback` to messages dispatched by
    /// [`Bus::dispatch_pending`].
    ///
    /// With `detail` set, the callback only sees messages of that kind (the
    /// `message::eos` style of connection); with `None` it sees all of them.
    pub fn connect_message<F>(&self, detail: Option<MessageType>, callback: F) -> SignalHandlerId
    where
        F: Fn(&Bus, &Message) + Send + Sync + 'static,
    {
        let id = SignalHandlerId(self.inner.next_watch_id.fetch_add(1, Ordering::Relaxed));
        self.lock_watches().push(Watch {
            id,
            detail,
            callback: Arc::new(callback),
        });
        id
    }

    /// Disconnects a callback. Returns `false` if it was not connected.
    pub fn disconnect(&self, id: SignalHandlerId) -> bool {
        let mut watches = self.lock_watches();
        let before = watches.len();
        watches.retain(|w| w.id != id);
        watches.len() != before
    }

    /// Pops every pending message, including ones posted by the callbacks
    /// themselves, and hands each to the matching connected callbacks.
    ///
    /// Returns the number of messages dispatched.
    pub fn dispatch_pending(&self) -> usize {
        let mut dispatched = 0;
        while let Some(message) = self.pop() {
            let callbacks: Vec<Arc<MessageCallback>> = self
                .lock_watches()
                .iter()
                .filter(|w| w.detail.is_none_or(|kind| kind == message.kind()))
                .map(|w| w.callback.clone())
                .collect();
            for callback in callbacks {
                callback(self, &message);
            }
            dispatched += 1;
        }
        dispatched
    }

    /// Iterates over messages with [`Bus::pop`] until the queue is empty.
    pub fn iter(&self) -> Iter<'_> {
        self.iter_timed(Some(Duration::ZERO))
    }

    /// Iterates over messages with [`Bus::timed_pop`], ending at the first
    /// timeout.
    pub fn iter_timed(&self, timeout: Option<Duration>) -> Iter<'_> {
        Iter { bus: self, timeout }
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.lock_queue();
        f.debug_struct("Bus")
            .field("name", &self.inner.name)
            .field("pending", &queue.messages.len())
            .field("flushing", &queue.flushing)
            .finish()
    }
}

/// Iterator returned by [`Bus::iter`] and [`Bus::iter_timed`].
pub struct Iter<'a> {
    bus: &'a Bus,
    timeout: Option<Duration>,
}

impl Iterator for Iter<'_> {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        self.bus.timed_pop(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use tracing_test::traced_test;

    use super::*;
    use crate::Structure;

    fn app_msg(id: i32) -> Message {
        Message::new_application(
            None,
            Structure::builder("test_message")
                .field("msg_id", id)
                .build()
                .unwrap(),
        )
    }

    fn msg_id(msg: &Message) -> i32 {
        msg.structure().unwrap().get::<i32>("msg_id").unwrap()
    }

    #[test]
    fn fifo_order() {
        let bus = Bus::new();
        for i in 0..3 {
            assert!(bus.post(app_msg(i)));
        }
        let ids: Vec<i32> = bus.iter().map(|m| msg_id(&m)).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(!bus.have_pending());
    }

    #[test]
    fn filtered_pop_leaves_others_in_place() {
        let bus = Bus::new();
        bus.post(Message::new_eos(None));
        bus.post(app_msg(1));
        bus.post(Message::new_eos(None));

        let app = bus.pop_filtered(MessageType::Application).unwrap();
        assert_eq!(msg_id(&app), 1);
        assert!(bus.pop_filtered(MessageType::Application).is_none());
        assert_eq!(bus.iter().count(), 2);
    }

    #[test]
    fn zero_timeout_does_not_block() {
        let bus = Bus::new();
        let started = Instant::now();
        assert!(bus.timed_pop(Some(Duration::ZERO)).is_none());
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn flushing_wakes_blocked_consumer() {
        let bus = Bus::new();
        let consumer = {
            let bus = bus.clone();
            std::thread::spawn(move || bus.timed_pop(None))
        };
        std::thread::sleep(Duration::from_millis(50));
        bus.set_flushing(true);
        assert!(consumer.join().unwrap().is_none());
    }

    #[test]
    fn disabled_async_delivery_still_runs_sync_handler() {
        let bus = Bus::with_config(BusConfig::default().enable_async(false));
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        bus.set_sync_handler(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            BusSyncReply::Pass
        });
        assert!(bus.post(app_msg(0)));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(!bus.have_pending());
    }

    #[test]
    fn disconnect_stops_callbacks() {
        let bus = Bus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let id = bus.connect_message(None, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        bus.post(app_msg(0));
        assert_eq!(bus.dispatch_pending(), 1);
        assert!(bus.disconnect(id));
        assert!(!bus.disconnect(id));
        bus.post(app_msg(1));
        assert_eq!(bus.dispatch_pending(), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[traced_test]
    #[test]
    fn flushing_is_logged() {
        let bus = Bus::with_config(BusConfig::default().name("logged"));
        bus.post(app_msg(0));
        bus.set_flushing(true);
        assert!(logs_contain("Bus logged flushing, discarded 1 message(s)"));
        assert!(!bus.post(app_msg(1)));
        assert!(logs_contain("Bus logged is flushing, discarding application message"));
    }
}
