// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for [`Caps`].

use pipekit::{Caps, CapsFlags, Fraction, Structure};

/// Empty caps have no structure and no flags.
#[test]
fn empty_caps() {
    let caps = Caps::new_empty();
    assert!(caps.is_empty());
    assert!(!caps.is_any());
    assert_eq!(caps.size(), 0);
    assert!(caps.structure(0).is_none());
    assert_eq!(caps.flags(), CapsFlags::empty());
}

/// ANY caps carry the ANY flag and are not empty.
#[test]
fn any_caps() {
    let caps = Caps::new_any();
    assert!(caps.is_any());
    assert!(!caps.is_empty());
    assert_eq!(caps.size(), 0);
    assert!(caps.flags().contains(CapsFlags::ANY));
}

/// Simple caps hold one field-less structure named after the media type.
#[test]
fn empty_simple_caps() {
    let caps = Caps::new_empty_simple("video/x-raw").unwrap();
    assert_eq!(caps.size(), 1);
    assert!(!caps.is_empty());
    let s = caps.structure(0).unwrap();
    assert_eq!(s.name(), "video/x-raw");
    assert!(s.is_empty());
    assert!(caps.flags().is_empty());
    assert!(Caps::new_empty_simple("bad name").is_err());
}

/// Built caps expose their fields through the first structure.
#[test]
fn built_caps() {
    let mut caps = Caps::builder("video/x-raw")
        .field("format", "RGB")
        .field("framerate", Fraction::new(25, 1).unwrap())
        .build()
        .unwrap();
    assert_eq!(
        caps.to_string(),
        "video/x-raw, format=(string)RGB, framerate=(fraction)25/1"
    );

    caps.structure_mut(0).unwrap().set_value("width", 640).unwrap();
    caps.append_structure(Structure::new_empty("video/x-bayer").unwrap());
    assert_eq!(caps.size(), 2);
    assert_eq!(caps.structure(0).unwrap().get::<i32>("width").unwrap(), 640);
    assert_eq!(caps.iter().map(Structure::name).collect::<Vec<_>>(), ["video/x-raw", "video/x-bayer"]);
}

/// Parsing the text form gives back equal caps.
#[test]
fn text_round_trip() {
    let text = "audio/x-raw, format=(string){ S16LE, F32LE }, channels=(int)[ 1, 2 ]; audio/x-alaw";
    let caps: Caps = text.parse().unwrap();
    assert_eq!(caps.size(), 2);
    assert_eq!(caps.to_string(), text);
    assert_eq!(caps.to_string().parse::<Caps>().unwrap(), caps);

    for keyword in ["ANY", "EMPTY"] {
        assert_eq!(keyword.parse::<Caps>().unwrap().to_string(), keyword);
    }
}
