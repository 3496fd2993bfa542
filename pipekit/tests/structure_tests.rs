// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for [`Structure`].
//!
//! # Test Coverage
//!
//! - Name validation and renaming
//! - Field access, replacement and removal
//! - Canonical text form and parsing
//! - Equality, copies and subset checks

use pipekit::{DoubleRange, Error, Fraction, IntRange, Structure, Value};
use tracing::debug;

/// Ensures logging is initialized only once across all tests.
static LOG_ONCE: std::sync::Once = std::sync::Once::new();

/// Initializes logging and returns the `test, message=hello` structure most
/// tests start from.
fn setup_test() -> Structure {
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

    Structure::builder("test")
        .field("message", "hello")
        .build()
        .unwrap()
}

fn parse(text: &str) -> Structure {
    text.parse().unwrap()
}

/// A new structure has the given name and no fields.
#[test]
fn new_empty_has_name_and_no_fields() {
    setup_test();
    let s = Structure::new_empty("test").unwrap();
    assert_eq!(s.name(), "test");
    assert!(s.has_name("test"));
    assert_eq!(s.n_fields(), 0);
    assert!(s.is_empty());
}

/// Invalid names are rejected.
#[test]
fn invalid_names_are_rejected() {
    setup_test();
    assert_eq!(
        Structure::new_empty("").unwrap_err(),
        Error::InvalidName(String::new())
    );
    assert!(matches!(
        Structure::new_empty("0day"),
        Err(Error::InvalidName(_))
    ));
    assert!(matches!(
        Structure::new("ok", [("bad key", 1)]),
        Err(Error::InvalidFieldName(_))
    ));
}

/// Renaming keeps the fields.
#[test]
fn rename_keeps_fields() {
    let mut s = setup_test();
    s.set_name("renamed").unwrap();
    assert_eq!(s.name(), "renamed");
    assert_eq!(s.get_str("message"), Some("hello"));
    assert!(s.set_name("not valid").is_err());
    assert_eq!(s.name(), "renamed");
}

/// Fields can be read back with their type.
#[test]
fn typed_field_access() {
    let s = setup_test();
    assert_eq!(s.get::<String>("message").unwrap(), "hello");
    assert_eq!(
        s.get::<String>("missing").unwrap_err(),
        Error::FieldNotFound("missing".to_owned())
    );
    assert!(matches!(
        s.get::<i32>("message"),
        Err(Error::TypeMismatch { expected: "int", actual: "string", .. })
    ));
    assert!(s.has_field_with_type("message", "string"));
    assert!(!s.has_field_with_type("message", "int"));
}

/// Setting an existing key replaces its value in place; a new key is appended.
#[test]
fn set_replaces_or_appends() {
    let mut s = setup_test();
    s.set_value("count", 1).unwrap();
    s.set_value("message", "bye").unwrap();

    assert_eq!(s.n_fields(), 2);
    assert_eq!(s.nth_field_name(0), Some("message"));
    assert_eq!(s.nth_field_name(1), Some("count"));
    assert_eq!(s.get_str("message"), Some("bye"));
    assert_eq!(s.to_string(), "test, message=(string)bye, count=(int)1;");
}

/// Removing a field makes it absent; removing an absent field is a no-op.
#[test]
fn remove_field() {
    let mut s = setup_test();
    assert_eq!(s.remove_field("message"), Some(Value::from("hello")));
    assert!(s.value("message").is_none());
    assert!(s.remove_field("message").is_none());

    s.set_value("a", 1).unwrap();
    s.set_value("b", 2).unwrap();
    s.remove_all_fields();
    assert!(s.is_empty());
}

/// The text form matches the canonical output exactly.
#[test]
fn to_string_is_canonical() {
    let s = setup_test();
    assert_eq!(s.to_string(), "test, message=(string)hello;");
    assert_eq!(Structure::new_empty("bare").unwrap().to_string(), "bare;");
}

/// Parsing the text form gives back an equal structure.
#[test]
fn text_round_trip() {
    let s = Structure::builder("video/x-raw")
        .field("format", "I420")
        .field("width", 1920)
        .field("height", 1080)
        .field("framerate", Fraction::new(30000, 1001).unwrap())
        .field("interlaced", false)
        .field("timestamp", 1_234_567_890_123_i64)
        .field("gain", 0.25)
        .field("title", "A \"quoted\" title, with; punctuation")
        .field("channels", IntRange::new(1, 8))
        .field("formats", Value::List(vec!["I420".into(), "NV12".into()]))
        .field("matrix", Value::Array(vec![Value::Int(1), Value::Int(0)]))
        .build()
        .unwrap();

    let text = s.to_string();
    debug!("Serialized: {text}");
    let parsed: Structure = text.parse().unwrap();
    assert_eq!(parsed, s);
    assert_eq!(parsed.to_string(), text);
}

/// Values at the edge of what the constructors accept still render to text
/// that parses back to an equal structure.
#[test]
fn edge_values_round_trip() {
    setup_test();
    let s = Structure::builder("edges")
        .field("reversed", IntRange::new(3, 1))
        .field("stepped", IntRange::with_step(10, 0, -4))
        .field("extremes", IntRange::new(i32::MAX, i32::MIN))
        .field("gain", DoubleRange::new(1.5, -0.5))
        .field("negative", Fraction::new(1, -2).unwrap())
        .field("smallest", Fraction::new(i32::MIN, i32::MAX).unwrap())
        .field("big", u32::MAX)
        .field("wide", i64::MIN)
        .field("inf", f64::INFINITY)
        .field("empty", "")
        .field("numeric_text", "42")
        .field("keyword_text", "true")
        .build()
        .unwrap();

    let text = s.to_string();
    debug!("Serialized: {text}");
    let parsed: Structure = text.parse().unwrap();
    assert_eq!(parsed, s);
    assert_eq!(parsed.get::<IntRange>("reversed").unwrap(), IntRange::new(1, 3));
}

/// A zero denominator never makes it into a structure.
#[test]
fn zero_denominator_fraction_is_rejected() {
    setup_test();
    assert!(matches!(Fraction::new(1, 0), Err(Error::InvalidValue(_))));
    assert!("t, f=(fraction)1/0".parse::<Structure>().is_err());
}

/// Parsing without the trailing `;` also works.
#[test]
fn parse_without_terminator() {
    let s = setup_test();
    assert_eq!(parse("test, message=(string)hello"), s);
    assert_eq!(parse("test, message=hello"), s);
}

/// Malformed text fails without a partial result.
#[test]
fn malformed_text_fails() {
    for bad in ["", "test, message", "test, message=(string)\"open", "9test"] {
        assert!(bad.parse::<Structure>().is_err(), "{bad:?}");
    }
}

/// Copies are equal and independent.
#[test]
fn copy_is_equal_and_independent() {
    let s = setup_test();
    let mut copy = s.clone();
    assert_eq!(copy, s);
    copy.set_value("message", "changed").unwrap();
    assert_ne!(copy, s);
    assert_eq!(s.get_str("message"), Some("hello"));
}

/// Equality ignores field order but not names or values.
#[test]
fn equality() {
    assert_eq!(
        parse("test, a=(int)1, b=(int)2"),
        parse("test, b=(int)2, a=(int)1")
    );
    assert_ne!(parse("test, a=(int)1"), parse("other, a=(int)1"));
    assert_ne!(parse("test, a=(int)1"), parse("test, a=(int)2"));
    assert_ne!(parse("test, a=(int)1"), parse("test, a=(int)1, b=(int)2"));
}

/// A fixed value is a subset of a range containing it, not the reverse.
#[test]
fn subset_is_asymmetric() {
    let sub = parse("test/test, channels=(int)1");
    let sup = parse("test/test, channels=(int)[ 1, 2 ]");
    assert!(sub.is_subset(&sup));
    assert!(!sup.is_subset(&sub));
    assert!(sub.is_subset(&sub));
}

/// Structures with different names are never subsets of each other.
#[test]
fn subset_requires_same_name() {
    let a = parse("test/test, channels=(int)1");
    let b = parse("test/test2, channels=(int)1");
    assert!(!a.is_subset(&b));
    assert!(!b.is_subset(&a));
}

/// Every field of the superset must be present in the subset.
#[test]
fn subset_requires_superset_fields() {
    let narrow = parse("test/test, channels=(int)1");
    let wide = parse("test/test, channels=(int)1, rate=(int)1");
    assert!(!narrow.is_subset(&wide));
    assert!(wide.is_subset(&narrow));
}

/// Lists act as sets of alternatives.
#[test]
fn subset_with_lists() {
    let sub = parse("audio/x-raw, format=(string)S16LE");
    let sup = parse("audio/x-raw, format=(string){ S16LE, F32LE }");
    assert!(sub.is_subset(&sup));
    assert!(!sup.is_subset(&sub));
}
