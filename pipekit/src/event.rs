// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! Events travelling along a pipeline, as opposed to [`crate::Message`]s
//! which travel to the application over a [`crate::Bus`].
//!
//! An [`Event`] has a kind, a sequence number from the same counter as
//! messages, and an optional [`Structure`] payload. Like messages, events are
//! shared handles whose payload can only be modified through the sole handle.
//!
//! # Examples
//!
//! ```
//! use pipekit::{Event, EventType, Structure};
//!
//! # fn main() -> Result<(), pipekit::Error> {
//! let payload = Structure::builder("seek-hint").field("position", 42).build()?;
//! let mut event = Event::new_custom(EventType::CustomUpstream, Some(payload));
//! assert!(event.kind().is_upstream());
//!
//! event.structure_mut()?.set_value("accurate", true)?;
//! assert_eq!(event.structure().unwrap().n_fields(), 2);
//! # Ok(())
//! # }
//! ```

use std::{fmt, sync::Arc};

use crate::{Error, Result, Structure, message::next_seqnum};

/// The kind of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Start discarding data; travels out of band.
    FlushStart,
    /// Stop discarding data.
    FlushStop,
    /// A new stream starts.
    StreamStart,
    /// The media format changed.
    Caps,
    /// A new playback segment.
    Segment,
    /// Metadata tags.
    Tag,
    /// No more data follows.
    Eos,
    /// Application event travelling towards the sources.
    CustomUpstream,
    /// Application event travelling towards the sinks, in order with data.
    CustomDownstream,
    /// Application event travelling towards the sinks, out of band.
    CustomDownstreamOob,
    /// Application event travelling both ways.
    CustomBoth,
}

impl EventType {
    /// Short name, also used as the name of a payload created on demand.
    pub fn name(self) -> &'static str {
        match self {
            EventType::FlushStart => "flush-start",
            EventType::FlushStop => "flush-stop",
            EventType::StreamStart => "stream-start",
            EventType::Caps => "caps",
            EventType::Segment => "segment",
            EventType::Tag => "tag",
            EventType::Eos => "eos",
            EventType::CustomUpstream => "custom-upstream",
            EventType::CustomDownstream => "custom-downstream",
            EventType::CustomDownstreamOob => "custom-downstream-oob",
            EventType::CustomBoth => "custom-both",
        }
    }

    /// Returns `true` for kinds that travel from sinks towards sources.
    pub fn is_upstream(self) -> bool {
        matches!(
            self,
            EventType::FlushStart
                | EventType::FlushStop
                | EventType::CustomUpstream
                | EventType::CustomBoth
        )
    }

    /// Returns `true` for kinds that travel from sources towards sinks.
    pub fn is_downstream(self) -> bool {
        !matches!(self, EventType::CustomUpstream)
    }

    /// Returns `true` for kinds that stay ordered with the data flow.
    pub fn is_serialized(self) -> bool {
        !matches!(
            self,
            EventType::FlushStart | EventType::CustomUpstream | EventType::CustomDownstreamOob
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct EventInner {
    kind: EventType,
    seqnum: u32,
    structure: Option<Structure>,
}

/// A pipeline event.
#[derive(Clone)]
pub struct Event {
    inner: Arc<EventInner>,
}

impl Event {
    /// Creates an event of any kind with an optional payload.
    pub fn new_custom(kind: EventType, structure: Option<Structure>) -> Self {
        Self {
            inner: Arc::new(EventInner {
                kind,
                seqnum: next_seqnum(),
                structure,
            }),
        }
    }

    /// End-of-stream event without payload.
    pub fn new_eos() -> Self {
        Self::new_custom(EventType::Eos, None)
    }

    /// Flush-start event without payload.
    pub fn new_flush_start() -> Self {
        Self::new_custom(EventType::FlushStart, None)
    }

    /// Returns the event kind.
    pub fn kind(&self) -> EventType {
        self.inner.kind
    }

    /// Sequence number, drawn from the counter messages use.
    pub fn seqnum(&self) -> u32 {
        self.inner.seqnum
    }

    /// Returns the payload given at construction, if any.
    pub fn structure(&self) -> Option<&Structure> {
        self.inner.structure.as_ref()
    }

    /// Returns a writable view of the payload: the structure given at
    /// construction, or a new empty one named after the kind.
    ///
    /// # Errors
    ///
    /// [`Error::NotWritable`] if another handle to this event exists.
    pub fn structure_mut(&mut self) -> Result<&mut Structure> {
        let inner = Arc::get_mut(&mut self.inner).ok_or(Error::NotWritable)?;
        let kind = inner.kind;
        Ok(inner
            .structure
            .get_or_insert_with(|| Structure::from_static(kind.name(), Vec::new())))
    }

    /// Returns `true` if this handle is the only one.
    pub fn is_writable(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }

    /// Returns `true` if both handles refer to the same event instance.
    pub fn ptr_eq(&self, other: &Event) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.inner.kind)
            .field("seqnum", &self.inner.seqnum)
            .field("structure", &self.inner.structure.as_ref().map(ToString::to_string))
            .finish()
    }
}
