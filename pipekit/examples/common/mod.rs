// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! Common utilities shared across examples.

/// Initializes the tracing subscriber for examples.
///
/// Logs to stdout at INFO unless `RUST_LOG` says otherwise, e.g.
/// `RUST_LOG=pipekit=trace` to follow every post and pop.
pub fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();
}
