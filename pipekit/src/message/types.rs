// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! Message kinds and kind masks.

use std::{fmt, ops::BitOr, str::FromStr};

use crate::Error;

/// The kind of a [`crate::Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// End of stream reached.
    Eos,
    /// A fatal error; carries text and optional debug info.
    Error,
    /// A recoverable problem.
    Warning,
    /// Informational notice.
    Info,
    /// Metadata tags were found.
    Tag,
    /// Buffering progress.
    Buffering,
    /// A component changed state.
    StateChanged,
    /// Component-specific message with a structure payload.
    Element,
    /// Application-defined message with a structure payload.
    Application,
    /// Latency needs to be recalculated.
    Latency,
    /// A new stream started.
    StreamStart,
}

impl MessageType {
    /// Every kind, in declaration order.
    pub const ALL: [MessageType; 11] = [
        MessageType::Eos,
        MessageType::Error,
        MessageType::Warning,
        MessageType::Info,
        MessageType::Tag,
        MessageType::Buffering,
        MessageType::StateChanged,
        MessageType::Element,
        MessageType::Application,
        MessageType::Latency,
        MessageType::StreamStart,
    ];

    /// Short name, also used as the detail in `message::<name>` callbacks and
    /// as the name of a structure created on demand for the message.
    pub fn name(self) -> &'static str {
        match self {
            MessageType::Eos => "eos",
            MessageType::Error => "error",
            MessageType::Warning => "warning",
            MessageType::Info => "info",
            MessageType::Tag => "tag",
            MessageType::Buffering => "buffering",
            MessageType::StateChanged => "state-changed",
            MessageType::Element => "element",
            MessageType::Application => "application",
            MessageType::Latency => "latency",
            MessageType::StreamStart => "stream-start",
        }
    }

}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MessageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| Error::Other(format!("Unknown message type: {s}")))
    }
}

bitflags::bitflags! {
    /// A set of [`MessageType`]s, used to filter pops.
    ///
    /// Single kinds convert with `From`, and `|` combines kinds and masks.
    ///
    /// # Examples
    ///
    /// ```
    /// use pipekit::{MessageType, MessageTypeMask};
    ///
    /// let mask = MessageType::Eos | MessageType::Error;
    /// assert!(mask.matches(MessageType::Error));
    /// assert!(!mask.matches(MessageType::Application));
    /// assert!(MessageTypeMask::all().matches(MessageType::Latency));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MessageTypeMask: u32 {
        const EOS = 1 << 0;
        const ERROR = 1 << 1;
        const WARNING = 1 << 2;
        const INFO = 1 << 3;
        const TAG = 1 << 4;
        const BUFFERING = 1 << 5;
        const STATE_CHANGED = 1 << 6;
        const ELEMENT = 1 << 7;
        const APPLICATION = 1 << 8;
        const LATENCY = 1 << 9;
        const STREAM_START = 1 << 10;
    }
}

impl MessageTypeMask {
    /// Returns `true` if `kind` is in the set.
    pub fn matches(self, kind: MessageType) -> bool {
        self.contains(kind.into())
    }
}

impl From<MessageType> for MessageTypeMask {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::Eos => MessageTypeMask::EOS,
            MessageType::Error => MessageTypeMask::ERROR,
            MessageType::Warning => MessageTypeMask::WARNING,
            MessageType::Info => MessageTypeMask::INFO,
            MessageType::Tag => MessageTypeMask::TAG,
            MessageType::Buffering => MessageTypeMask::BUFFERING,
            MessageType::StateChanged => MessageTypeMask::STATE_CHANGED,
            MessageType::Element => MessageTypeMask::ELEMENT,
            MessageType::Application => MessageTypeMask::APPLICATION,
            MessageType::Latency => MessageTypeMask::LATENCY,
            MessageType::StreamStart => MessageTypeMask::STREAM_START,
        }
    }
}

impl FromIterator<MessageType> for MessageTypeMask {
    fn from_iter<I: IntoIterator<Item = MessageType>>(iter: I) -> Self {
        iter.into_iter().map(MessageTypeMask::from).collect()
    }
}

impl BitOr<MessageType> for MessageTypeMask {
    type Output = MessageTypeMask;

    fn bitor(self, rhs: MessageType) -> Self::Output {
        self | MessageTypeMask::from(rhs)
    }
}

impl BitOr for MessageType {
    type Output = MessageTypeMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        MessageTypeMask::from(self) | MessageTypeMask::from(rhs)
    }
}
