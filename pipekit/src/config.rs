// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! Bus configuration.
//!
//! [`BusConfig`] holds the settings a [`crate::Bus`] is created with. They
//! cannot be changed afterwards.

use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_BUS_INDEX: AtomicU32 = AtomicU32::new(0);

/// Settings for [`crate::Bus::with_config`].
///
/// # Examples
///
/// ```
/// use pipekit::{Bus, config::BusConfig};
///
/// let bus = Bus::with_config(BusConfig::default().name("pipeline-bus"));
/// assert_eq!(bus.name(), "pipeline-bus");
/// ```
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Bus name used in logs. `None` picks `bus<N>`.
    pub name: Option<String>,

    /// When `false`, messages are never queued: after the sync handler has
    /// run, every message is dropped. Such a bus only serves synchronous
    /// delivery through [`crate::Bus::set_sync_handler`].
    pub enable_async: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            name: None,
            enable_async: true,
        }
    }
}

impl BusConfig {
    /// Sets the bus name reported by [`crate::Bus::name`].
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Enables message delivery. A bus with delivery disabled drops every
    /// posted message with a warning.
    #[must_use]
    pub fn enable_async(mut self, enable_async: bool) -> Self {
        self.enable_async = enable_async;
        self
    }

    /// The configured name, or a fresh `bus<N>` name.
    pub(crate) fn resolve_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            format!("bus{}", NEXT_BUS_INDEX.fetch_add(1, Ordering::Relaxed))
        })
    }
}
