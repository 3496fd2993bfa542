// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for [`Event`].
//!
//! # Test Coverage
//!
//! - Creation with and without a payload
//! - Writable payload access and on-demand creation
//! - Sequence numbers shared with messages

use pipekit::{Error, Event, EventType, Message, Structure};

/// Ensures logging is initialized only once across all tests.
static LOG_ONCE: std::sync::Once = std::sync::Once::new();

fn setup_test() {
    // Initialize logging once (respects RUST_LOG environment variable)
    LOG_ONCE.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::builder()
                    .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                    .from_env_lossy(),
            )
            .init();
    });
}

fn payload() -> Structure {
    Structure::builder("application/x-custom")
        .field("foo", "bar")
        .build()
        .unwrap()
}

/// An event created from a kind alone has that kind and no payload.
#[test]
fn create_with_type() {
    setup_test();
    let event = Event::new_custom(EventType::FlushStart, None);
    assert_eq!(event.kind(), EventType::FlushStart);
    assert!(event.structure().is_none());
    assert!(event.is_writable());
}

/// An event created with a payload returns that payload.
#[test]
fn create_with_type_and_structure() {
    setup_test();
    let event = Event::new_custom(EventType::CustomUpstream, Some(payload()));
    assert_eq!(event.kind(), EventType::CustomUpstream);
    assert_eq!(event.structure(), Some(&payload()));
}

/// The writable payload is the one given at construction.
#[test]
fn writable_structure_returns_given_structure() {
    setup_test();
    let mut event = Event::new_custom(EventType::CustomDownstream, Some(payload()));
    let s = event.structure_mut().unwrap();
    assert_eq!(*s, payload());
    s.set_value("count", 3).unwrap();

    let s = event.structure().unwrap();
    assert_eq!(s.get_str("foo"), Some("bar"));
    assert_eq!(s.get::<i32>("count").unwrap(), 3);
}

/// Without a payload, a writable one is created and then kept.
#[test]
fn writable_structure_is_created_if_missing() {
    setup_test();
    let mut event = Event::new_custom(EventType::CustomDownstream, None);
    let s = event.structure_mut().unwrap();
    assert_eq!(s.name(), "custom-downstream");
    assert!(s.is_empty());
    s.set_value("foo", "bar").unwrap();

    assert_eq!(event.structure().unwrap().get_str("foo"), Some("bar"));
}

/// A shared event refuses writes until the other handle goes away.
#[test]
fn shared_event_is_read_only() {
    setup_test();
    let mut event = Event::new_custom(EventType::CustomBoth, Some(payload()));
    let copy = event.clone();
    assert!(!event.is_writable());
    assert_eq!(event.structure_mut().unwrap_err(), Error::NotWritable);
    drop(copy);
    assert!(event.structure_mut().is_ok());
}

/// Events and messages draw from one increasing sequence.
#[test]
fn seqnums_are_shared_with_messages() {
    setup_test();
    let first = Event::new_eos();
    let msg = Message::new_eos(None);
    let last = Event::new_flush_start();
    assert!(first.seqnum() < msg.seqnum());
    assert!(msg.seqnum() < last.seqnum());
    assert_eq!(EventType::FlushStart.to_string(), "flush-start");
}
