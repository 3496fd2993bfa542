// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! Messages delivered over a [`crate::Bus`].
//!
//! A [`Message`] is a reference-counted handle: cloning it (for example via
//! [`crate::Bus::peek`]) yields the same instance, which can be checked with
//! [`Message::ptr_eq`]. The payload structure can only be modified while the
//! handle is the sole owner.

pub mod types;

use std::sync::{
    Arc, Condvar, Mutex,
    atomic::{AtomicU32, Ordering},
};

use crate::{Error, Object, Result, Structure, Value, object::WeakObject};
pub use types::{MessageType, MessageTypeMask};

static NEXT_SEQNUM: AtomicU32 = AtomicU32::new(1);

/// Next process-wide sequence number, shared by messages and events.
pub(crate) fn next_seqnum() -> u32 {
    NEXT_SEQNUM.fetch_add(1, Ordering::Relaxed)
}

/// Name of the structure carried by error, warning and info messages.
const ERROR_STRUCTURE: &str = "GstMessageError";
const WARNING_STRUCTURE: &str = "GstMessageWarning";
const INFO_STRUCTURE: &str = "GstMessageInfo";

/// One-shot signal fired when a message is destroyed.
///
/// A producer posting under [`crate::BusSyncReply::Async`] waits on it until
/// the consumer drops the last reference to the message.
pub(crate) struct Completion {
    done: Mutex<bool>,
    cond: Condvar,
}

impl Completion {
    pub(crate) fn new() -> Self {
        Self {
            done: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    fn signal(&self) {
        let mut done = self.done.lock().unwrap_or_else(|e| e.into_inner());
        *done = true;
        self.cond.notify_all();
    }

    pub(crate) fn wait(&self) {
        let mut done = self.done.lock().unwrap_or_else(|e| e.into_inner());
        while !*done {
            done = self.cond.wait(done).unwrap_or_else(|e| e.into_inner());
        }
    }
}

struct MessageInner {
    kind: MessageType,
    seqnum: u32,
    src: Option<WeakObject>,
    structure: Option<Structure>,
    details: Option<Structure>,
    completion: Mutex<Option<Arc<Completion>>>,
}

impl Drop for MessageInner {
    fn drop(&mut self) {
        let completion = self
            .completion
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(completion) = completion {
            tracing::trace!("Releasing producer of {} message #{}", self.kind, self.seqnum);
            completion.signal();
        }
    }
}

/// An event record posted on a bus.
#[derive(Clone)]
pub struct Message {
    inner: Arc<MessageInner>,
}

impl Message {
    /// Creates a message of any kind with an optional payload.
    ///
    /// The source is held weakly.
    pub fn new_custom(kind: MessageType, src: Option<&Object>, structure: Option<Structure>) -> Self {
        Self {
            inner: Arc::new(MessageInner {
                kind,
                seqnum: next_seqnum(),
                src: src.map(Object::downgrade),
                structure,
                details: None,
                completion: Mutex::new(None),
            }),
        }
    }

    /// End-of-stream message without payload.
    pub fn new_eos(src: Option<&Object>) -> Self {
        Self::new_custom(MessageType::Eos, src, None)
    }

    /// Application-defined message; `structure` is required.
    pub fn new_application(src: Option<&Object>, structure: Structure) -> Self {
        Self::new_custom(MessageType::Application, src, Some(structure))
    }

    /// Element-specific message; `structure` is required.
    pub fn new_element(src: Option<&Object>, structure: Structure) -> Self {
        Self::new_custom(MessageType::Element, src, Some(structure))
    }

    /// Stream-start message without payload.
    pub fn new_stream_start(src: Option<&Object>) -> Self {
        Self::new_custom(MessageType::StreamStart, src, None)
    }

    /// Error message carrying a human readable `text` and optional `debug`
    /// details, read back with [`Message::parse_error`].
    pub fn new_error(src: Option<&Object>, text: &str, debug: Option<&str>) -> Self {
        Self::new_report(MessageType::Error, ERROR_STRUCTURE, src, text, debug)
    }

    /// Warning message, read back with [`Message::parse_warning`].
    pub fn new_warning(src: Option<&Object>, text: &str, debug: Option<&str>) -> Self {
        Self::new_report(MessageType::Warning, WARNING_STRUCTURE, src, text, debug)
    }

    /// Informational message, read back with [`Message::parse_info`].
    pub fn new_info(src: Option<&Object>, text: &str, debug: Option<&str>) -> Self {
        Self::new_report(MessageType::Info, INFO_STRUCTURE, src, text, debug)
    }

    fn new_report(
        kind: MessageType,
        name: &'static str,
        src: Option<&Object>,
        text: &str,
        debug: Option<&str>,
    ) -> Self {
        let mut fields = vec![("text", Value::from(text))];
        if let Some(debug) = debug {
            fields.push(("debug", Value::from(debug)));
        }
        Self::new_custom(kind, src, Some(Structure::from_static(name, fields)))
    }

    /// Returns the message kind.
    pub fn kind(&self) -> MessageType {
        self.inner.kind
    }

    /// Process-wide sequence number, unique per message and increasing in
    /// creation order.
    pub fn seqnum(&self) -> u32 {
        self.inner.seqnum
    }

    /// Returns the source if one was given and it is still alive.
    pub fn src(&self) -> Option<Object> {
        self.inner.src.as_ref()?.upgrade()
    }

    /// Returns the payload, if any.
    pub fn structure(&self) -> Option<&Structure> {
        self.inner.structure.as_ref()
    }

    /// Returns a writable view of the payload, creating an empty structure
    /// named after the message kind (`eos`, `application`, ...) if there is
    /// none.
    ///
    /// # Errors
    ///
    /// [`Error::NotWritable`] if another handle to this message exists.
    pub fn structure_mut(&mut self) -> Result<&mut Structure> {
        let inner = Arc::get_mut(&mut self.inner).ok_or(Error::NotWritable)?;
        let kind = inner.kind;
        Ok(inner
            .structure
            .get_or_insert_with(|| Structure::from_static(kind.name(), Vec::new())))
    }

    /// Extra information attached next to the payload, if any.
    pub fn details(&self) -> Option<&Structure> {
        self.inner.details.as_ref()
    }

    /// Returns the details structure, creating an empty `details` structure
    /// if none was set.
    ///
    /// # Errors
    ///
    /// [`Error::NotWritable`] if another handle to this message exists.
    pub fn details_mut(&mut self) -> Result<&mut Structure> {
        let inner = Arc::get_mut(&mut self.inner).ok_or(Error::NotWritable)?;
        Ok(inner
            .details
            .get_or_insert_with(|| Structure::from_static("details", Vec::new())))
    }

    /// Returns `true` if this handle is the only one, so `*_mut` accessors
    /// will succeed.
    pub fn is_writable(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }

    /// Returns `true` if both handles refer to the same message instance.
    pub fn ptr_eq(&self, other: &Message) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns `(text, debug)` for an error message, `None` otherwise.
    pub fn parse_error(&self) -> Option<(String, Option<String>)> {
        self.parse_report(MessageType::Error)
    }

    /// Returns `(text, debug)` for a warning message, `None` otherwise.
    pub fn parse_warning(&self) -> Option<(String, Option<String>)> {
        self.parse_report(MessageType::Warning)
    }

    /// Returns `(text, debug)` for an info message, `None` otherwise.
    pub fn parse_info(&self) -> Option<(String, Option<String>)> {
        self.parse_report(MessageType::Info)
    }

    fn parse_report(&self, kind: MessageType) -> Option<(String, Option<String>)> {
        if self.kind() != kind {
            return None;
        }
        let structure = self.structure()?;
        let text = structure.get_str("text")?.to_owned();
        let debug = structure.get_str("debug").map(str::to_owned);
        Some((text, debug))
    }

    /// Registers the signal fired when the last handle is dropped.
    pub(crate) fn set_completion(&self, completion: Arc<Completion>) {
        *self
            .inner
            .completion
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(completion);
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("kind", &self.inner.kind)
            .field("seqnum", &self.inner.seqnum)
            .field("src", &self.inner.src)
            .field("structure", &self.inner.structure.as_ref().map(ToString::to_string))
            .finish()
    }
}
