// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! # pipekit
//!
//! Building blocks for media pipeline control planes: a thread-safe message
//! bus and the dynamically typed records that travel over it.
//!
//! ## Overview
//!
//! ### Key Concepts
//!
//! - **Bus**: an ordered, multi-producer message queue ([`Bus`]) with an
//!   optional synchronous handler that sees every message before it is queued
//! - **Message**: a typed event ([`Message`], [`MessageType`]) with an optional
//!   [`Structure`] payload and a weak reference to its source [`Object`]
//! - **Structure**: a named list of typed fields ([`Value`]) with a canonical,
//!   round-trippable text form
//! - **Caps**: a list of structures describing media formats ([`Caps`])
//! - **Event**: a typed record travelling along the pipeline ([`Event`]),
//!   sharing the message sequence counter
//!
//! ## Architecture
//!
//! ```text
//!  Object ──► Message { kind, src, Structure }
//!                 │
//!   producers ────┴──► Bus::post ──► sync handler ──► queue ──► pop / timed_pop
//!                                        │                      dispatch_pending
//!                                        └─► Drop / Async (blocks producer)
//! ```
//!
//! ## Examples
//!
//! ### Posting and draining
//!
//! ```
//! use pipekit::{Bus, BusSyncReply, Message, MessageType, Structure};
//!
//! # fn main() -> Result<(), pipekit::Error> {
//! let bus = Bus::new();
//! bus.set_sync_handler(|_, msg| match msg.kind() {
//!     MessageType::Tag => BusSyncReply::Drop,
//!     _ => BusSyncReply::Pass,
//! });
//!
//! let payload = Structure::builder("progress").field("percent", 42).build()?;
//! bus.post(Message::new_application(None, payload));
//! bus.post(Message::new_eos(None));
//!
//! let first = bus.pop().expect("queued");
//! assert_eq!(first.structure().unwrap().get::<i32>("percent")?, 42);
//! assert_eq!(bus.pop().unwrap().kind(), MessageType::Eos);
//! assert!(!bus.have_pending());
//! # Ok(())
//! # }
//! ```
//!
//! ### Filtering with a timeout
//!
//! ```
//! use std::time::Duration;
//! use pipekit::{Bus, Message, MessageType};
//!
//! let bus = Bus::new();
//! bus.post(Message::new_stream_start(None));
//! bus.post(Message::new_error(None, "boom", None));
//!
//! let err = bus
//!     .timed_pop_filtered(Some(Duration::from_millis(10)), MessageType::Error | MessageType::Eos)
//!     .unwrap();
//! assert_eq!(err.parse_error().unwrap().0, "boom");
//! // The skipped stream-start message is still there.
//! assert_eq!(bus.pop().unwrap().kind(), MessageType::StreamStart);
//! ```
//!
//! ## Thread Safety
//!
//! - [`Bus`] and [`Object`] are cheap `Send + Sync` handles; clones share state
//! - [`Message`] is `Send + Sync`; its payload is writable only through the
//!   sole handle
//! - Logging goes through `tracing`; install a subscriber to see it

mod bus;
mod caps;
mod error;
mod event;
mod message;
mod object;

pub mod config;
pub mod structure;

pub use bus::{Bus, BusSyncReply, Iter as BusIter, SignalHandlerId};
pub use caps::{Caps, CapsFlags};
pub use config::BusConfig;
pub use error::{Error, Result};
pub use event::{Event, EventType};
pub use message::{Message, MessageType, MessageTypeMask};
pub use object::{Object, WeakObject};
pub use structure::{
    DoubleRange, Fraction, IntRange, Structure, Value, is_valid_name, value::FromValue,
};
